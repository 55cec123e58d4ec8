//! Nucleotide sequence helpers shared by the graph and path code.

use bstr::{BString, ByteSlice};

/// Complement of a single base. Handles the IUPAC ambiguity codes and
/// keeps the case of the input; unknown bytes are left unchanged.
#[inline]
pub fn complement(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'T' => b'A',
        b'C' => b'G',
        b'G' => b'C',
        b'a' => b't',
        b't' => b'a',
        b'c' => b'g',
        b'g' => b'c',
        b'U' => b'A',
        b'u' => b'a',
        b'R' => b'Y',
        b'Y' => b'R',
        b'r' => b'y',
        b'y' => b'r',
        b'K' => b'M',
        b'M' => b'K',
        b'k' => b'm',
        b'm' => b'k',
        b'B' => b'V',
        b'V' => b'B',
        b'b' => b'v',
        b'v' => b'b',
        b'D' => b'H',
        b'H' => b'D',
        b'd' => b'h',
        b'h' => b'd',
        // S, W, N and their lowercase forms are self-complementary
        other => other,
    }
}

pub fn reverse_complement(seq: &[u8]) -> BString {
    seq.iter().rev().copied().map(complement).collect::<Vec<u8>>().into()
}

/// `true` if the sequence equals its own reverse complement.
pub fn is_palindromic(seq: &[u8]) -> bool {
    let n = seq.len();
    (0..n / 2 + n % 2).all(|i| seq[i] == complement(seq[n - 1 - i]))
}

/// Drops the first `overlap` bases of a sequence, saturating at the
/// sequence length.
#[inline]
pub fn trim_overlap(seq: &[u8], overlap: usize) -> &[u8] {
    &seq[overlap.min(seq.len())..]
}

/// Write a FASTA record, wrapping the sequence at 70 columns.
pub fn write_fasta<W: std::fmt::Write>(
    header: &str,
    seq: &[u8],
    stream: &mut W,
) -> std::fmt::Result {
    writeln!(stream, ">{}", header)?;
    for chunk in seq.chunks(70) {
        writeln!(stream, "{}", chunk.as_bstr())?;
    }
    Ok(())
}

pub fn fasta_string(header: &str, seq: &[u8]) -> String {
    let mut result = String::new();
    // writing into a String can't fail
    let _ = write_fasta(header, seq, &mut result);
    result
}
