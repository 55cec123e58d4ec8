#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use crate::error::LoadFieldError;

/// The strand a node's sequence is read on. Every node in the graph
/// has a twin on the opposite strand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
pub enum Strand {
    Forward,
    Reverse,
}

impl Strand {
    /// Parse a strand from a single-element, where + is Forward, - is
    /// Reverse
    #[inline]
    pub fn from_bytes_plus_minus<T: AsRef<[u8]>>(bs: T) -> Option<Self> {
        match bs.as_ref() {
            b"+" => Some(Strand::Forward),
            b"-" => Some(Strand::Reverse),
            _ => None,
        }
    }

    #[inline]
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            b'+' => Some(Strand::Forward),
            b'-' => Some(Strand::Reverse),
            _ => None,
        }
    }

    #[inline]
    pub fn parse_error(opt: Option<Self>) -> Result<Self, LoadFieldError> {
        opt.ok_or(LoadFieldError::OrientationError)
    }

    #[inline]
    pub fn plus_minus_as_byte(&self) -> u8 {
        match self {
            Self::Forward => b'+',
            Self::Reverse => b'-',
        }
    }

    #[inline]
    pub fn opposite(&self) -> Self {
        match self {
            Self::Forward => Self::Reverse,
            Self::Reverse => Self::Forward,
        }
    }
}

/// Display maps `Forward` to "+" and `Reverse` to "-", the same
/// suffix used in node names.
///
/// # Examples
///
/// ```
/// use asmgraph::graph::Strand;
///
/// assert_eq!(&format!("{}", Strand::Forward), "+");
/// assert_eq!(&format!("{}", Strand::Reverse), "-");
/// ```
impl std::fmt::Display for Strand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", char::from(self.plus_minus_as_byte()))
    }
}
