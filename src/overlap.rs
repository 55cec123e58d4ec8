//! Overlap lengths from the CIGAR strings on GFA links.

use nom::{bytes::complete::*, IResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CigarOp {
    M,
    I,
    D,
    N,
    S,
    H,
    P,
    E,
    X,
}

impl CigarOp {
    fn to_u8_char(self) -> u8 {
        use CigarOp::*;
        match self {
            M => b'M',
            I => b'I',
            D => b'D',
            N => b'N',
            S => b'S',
            H => b'H',
            P => b'P',
            E => b'=',
            X => b'X',
        }
    }

    /// `true` for the operations that cover bases of the downstream
    /// node of a link.
    #[inline]
    pub fn covers_downstream(&self) -> bool {
        use CigarOp::*;
        matches!(self, M | E | X | I)
    }
}

impl std::fmt::Display for CigarOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", char::from(self.to_u8_char()))
    }
}

fn parse_op_cmd(input: &[u8]) -> IResult<&[u8], CigarOp> {
    use nom::{branch::alt, combinator::map};
    use CigarOp::*;
    alt((
        map(tag("M"), |_| M),
        map(tag("I"), |_| I),
        map(tag("D"), |_| D),
        map(tag("N"), |_| N),
        map(tag("S"), |_| S),
        map(tag("H"), |_| H),
        map(tag("P"), |_| P),
        map(tag("="), |_| E),
        map(tag("X"), |_| X),
    ))(input)
}

fn parse_cigar(input: &[u8]) -> IResult<&[u8], Vec<(usize, CigarOp)>> {
    use nom::{
        character::complete::digit1,
        combinator::{all_consuming, map_res},
        multi::many1,
        sequence::pair,
    };
    all_consuming(many1(pair(
        map_res(digit1, |bs: &[u8]| {
            std::str::from_utf8(bs)
                .map_err(|_| ())
                .and_then(|s| s.parse::<usize>().map_err(|_| ()))
        }),
        parse_op_cmd,
    )))(input)
}

/// Parses a link overlap into its operations. `*` and the empty
/// string stand for an unspecified overlap and give no operations.
pub fn parse_overlap(input: &[u8]) -> Option<Vec<(usize, CigarOp)>> {
    match input {
        b"" | b"*" => Some(Vec::new()),
        _ => parse_cigar(input).ok().map(|(_, ops)| ops),
    }
}

/// The number of bases of the downstream node covered by the overlap,
/// e.g. 55 for `55M`. Returns `None` if the overlap isn't a valid
/// CIGAR string.
///
/// ```
/// use asmgraph::overlap::overlap_length;
///
/// assert_eq!(overlap_length(b"55M"), Some(55));
/// assert_eq!(overlap_length(b"*"), Some(0));
/// assert_eq!(overlap_length(b"M5"), None);
/// ```
pub fn overlap_length(input: &[u8]) -> Option<usize> {
    let ops = parse_overlap(input)?;
    Some(
        ops.into_iter()
            .filter(|(_, op)| op.covers_downstream())
            .map(|(len, _)| len)
            .sum(),
    )
}
