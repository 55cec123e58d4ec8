//! Assembly graphs for interactive viewing.
//!
//! An [`AssemblyGraph`] holds the contigs of a genome assembly as pairs
//! of nodes, one per strand, joined by overlapping edges. On top of
//! the graph the crate provides contiguity inference from seed nodes,
//! reconstruction of an unambiguous path through a node set, node
//! colouring, and the segments used to draw alignment hits and
//! barcodes along nodes.

pub mod barcode;
pub mod cancel;
pub mod colour;
pub mod contiguity;
pub mod error;
pub mod graph;
pub mod loader;
pub mod overlap;
pub mod overlay;
pub mod path;
pub mod sequence;
pub mod settings;

pub use crate::{
    barcode::BarcodeRegistry,
    cancel::CancelToken,
    colour::{Colour, ColourAssigner, NodeColourScheme},
    contiguity::{ContiguitySearch, ContiguityStatus, SearchOutcome},
    error::{GraphError, GraphResult, LoadError, LoadResult},
    graph::{AssemblyGraph, Edge, EdgeId, Node, NodeId, Strand},
    overlay::{AnnotationPart, BarcodeMark, Hit, OverlayMode, OverlaySegmenter},
    path::{Path, PathReconstructor},
    settings::Settings,
};
