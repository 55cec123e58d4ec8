use bstr::{BStr, BString, ByteSlice};
use lazy_static::lazy_static;
use regex::bytes::Regex;

use super::Strand;

/// Returns `true` if the input is usable as the base name of a contig,
/// i.e. printable ASCII without whitespace, not starting with `*` or
/// `=`.
pub fn is_valid_base_name(input: &[u8]) -> bool {
    lazy_static! {
        static ref RE: Regex =
            Regex::new(r"(?-u)^[!-)+-<>-~][!-~]*$").unwrap();
    }
    RE.is_match(input)
}

/// Splits a node name such as `5+` into its base name and strand.
/// Returns `None` if the name has no strand suffix or the base name
/// isn't valid.
pub fn split_node_name(name: &[u8]) -> Option<(&BStr, Strand)> {
    let (&last, base) = name.split_last()?;
    let strand = Strand::from_byte(last)?;
    if is_valid_base_name(base) {
        Some((base.as_bstr(), strand))
    } else {
        None
    }
}

/// Builds a node name from a base name and strand.
pub fn node_name<N: AsRef<[u8]>>(base: N, strand: Strand) -> BString {
    let mut name = BString::from(base.as_ref());
    name.push(strand.plus_minus_as_byte());
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_names() {
        assert_eq!(
            split_node_name(b"5+"),
            Some((b"5".as_bstr(), Strand::Forward))
        );
        assert_eq!(
            split_node_name(b"NODE_12_length_40-"),
            Some((b"NODE_12_length_40".as_bstr(), Strand::Reverse))
        );
        assert_eq!(split_node_name(b"5"), None);
        assert_eq!(split_node_name(b"+"), None);
        assert_eq!(split_node_name(b"a b+"), None);
        assert_eq!(split_node_name(b"*x+"), None);
        assert_eq!(split_node_name(b""), None);
    }
}
