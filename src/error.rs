use std::{error, fmt};

use bstr::{BString, ByteSlice};

pub type GraphResult<T> = Result<T, GraphError>;
pub type LoadFieldResult<T> = Result<T, LoadFieldError>;
pub type LoadResult<T> = Result<T, LoadError>;

/// Errors raised while building or querying the assembly graph.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphError {
    /// An edge or query referenced a node name that isn't in the
    /// graph.
    UnknownNode(BString),
    /// A node with this name (or a node whose twin has this name)
    /// already exists.
    DuplicateNode(BString),
    /// Node names must be a printable base name followed by `+` or
    /// `-`.
    InvalidNodeName(BString),
    /// A node was declared its own reverse complement, but its
    /// sequence isn't a reverse-complement palindrome.
    NotPalindromic(BString),
    /// An edge exists without its reverse-complement counterpart.
    MissingTwinEdge { from: BString, to: BString },
    /// An edge was added with a different overlap from the existing
    /// edge `from -> to`, or an edge and its twin disagree.
    OverlapMismatch {
        from: BString,
        to: BString,
        overlap: usize,
        existing: usize,
    },
    /// The barcode has no recorded occurrences.
    UnknownBarcode(BString),
    BarcodeAlreadySelected(BString),
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use GraphError as GE;
        match self {
            GE::UnknownNode(name) => write!(f, "Unknown node `{}`", name),
            GE::DuplicateNode(name) => {
                write!(f, "Node `{}` already exists in the graph", name)
            }
            GE::InvalidNodeName(name) => write!(
                f,
                "Invalid node name `{}`, expected a name ending in + or -",
                name
            ),
            GE::NotPalindromic(name) => write!(
                f,
                "Node `{}` is not its own reverse complement",
                name
            ),
            GE::MissingTwinEdge { from, to } => write!(
                f,
                "Edge {} -> {} has no reverse-complement edge",
                from, to
            ),
            GE::OverlapMismatch {
                from,
                to,
                overlap,
                existing,
            } => write!(
                f,
                "Edge {} -> {} has overlap {}, expected {}",
                from, to, existing, overlap
            ),
            GE::UnknownBarcode(bc) => {
                write!(f, "Barcode `{}` doesn't exist in the data", bc)
            }
            GE::BarcodeAlreadySelected(bc) => {
                write!(f, "Barcode `{}` is already selected", bc)
            }
        }
    }
}

impl error::Error for GraphError {}

/// A single field of a graph file record couldn't be read.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadFieldError {
    /// A bytestring couldn't be parsed as UTF-8.
    Utf8Error,
    /// A numeric field couldn't be parsed.
    ParseFromStringError,
    /// Attempted to parse an orientation that wasn't + or -.
    OrientationError,
    /// A required field was incorrectly formatted. Includes the field
    /// name.
    InvalidField(&'static str),
    MissingFields,
}

macro_rules! impl_many_from {
    ($to:ty, ($from:ty, $out:expr)) => (
        impl From<$from> for $to {
            fn from(_: $from) -> Self {
                $out
            }
        }
    );
    ($to:ty, ($from:ty, $out:expr), $(($f:ty, $o:expr)),* $(,)?) => (
        impl From<$from> for $to {
            fn from(_: $from) -> Self {
                $out
            }
        }
        impl_many_from!($to, $(($f, $o)),*);
    );
}

impl_many_from!(
    LoadFieldError,
    (std::str::Utf8Error, LoadFieldError::Utf8Error),
    (bstr::Utf8Error, LoadFieldError::Utf8Error),
    (std::num::ParseIntError, LoadFieldError::ParseFromStringError),
    (std::num::ParseFloatError, LoadFieldError::ParseFromStringError),
);

impl fmt::Display for LoadFieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use LoadFieldError as LFE;
        match self {
            LFE::Utf8Error => {
                write!(f, "Failed to parse a bytestring as a UTF-8 string")
            }
            LFE::ParseFromStringError => {
                write!(f, "Failed to parse a field from a string")
            }
            LFE::OrientationError => {
                write!(f, "Failed to parse an orientation character")
            }
            LFE::InvalidField(field) => {
                write!(f, "Failed to parse field `{}`", field)
            }
            LFE::MissingFields => write!(f, "Line is missing required fields"),
        }
    }
}

impl error::Error for LoadFieldError {}

/// Errors from reading a graph file into an `AssemblyGraph`.
#[derive(Debug)]
pub enum LoadError {
    /// A line couldn't be parsed. Includes the problem line and a
    /// variant describing the error.
    InvalidLine(LoadFieldError, String),
    /// The records were well-formed but describe an invalid graph.
    Graph(GraphError),
    /// Wrapper for an IO error.
    IOError(std::io::Error),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use LoadError as LE;
        match self {
            LE::InvalidLine(field_err, line) => {
                write!(f, "Failed to parse line {}, error: {}", line, field_err)
            }
            LE::Graph(err) => write!(f, "Invalid graph: {}", err),
            LE::IOError(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl From<std::io::Error> for LoadError {
    #[inline]
    fn from(err: std::io::Error) -> Self {
        Self::IOError(err)
    }
}

impl From<GraphError> for LoadError {
    #[inline]
    fn from(err: GraphError) -> Self {
        Self::Graph(err)
    }
}

impl error::Error for LoadError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            LoadError::Graph(err) => Some(err),
            LoadError::IOError(err) => Some(err),
            LoadError::InvalidLine(err, _) => Some(err),
        }
    }
}

impl LoadError {
    #[inline]
    pub(crate) fn invalid_line(error: LoadFieldError, line: &[u8]) -> Self {
        let mut dest = String::new();
        line.to_str_lossy_into(&mut dest);
        Self::InvalidLine(error, dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_error_display() {
        let err = GraphError::UnknownNode("7+".into());
        assert_eq!(err.to_string(), "Unknown node `7+`");

        let err = GraphError::MissingTwinEdge {
            from: "1+".into(),
            to: "2+".into(),
        };
        assert_eq!(
            err.to_string(),
            "Edge 1+ -> 2+ has no reverse-complement edge"
        );
    }

    #[test]
    fn field_errors_convert() {
        let err: LoadFieldError = "x".parse::<usize>().unwrap_err().into();
        assert_eq!(err, LoadFieldError::ParseFromStringError);

        let load: LoadError =
            LoadError::invalid_line(err, b"L\t1\t+\t2\tx\t0M");
        assert!(load.to_string().starts_with("Failed to parse line L"));
    }
}
