//! Annotation overlays: the alignment hits and barcodes attached to
//! nodes, and their conversion into coloured segments along a node,
//! given as fractions of the node's length.

use bstr::BString;

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use crate::{
    colour::Colour,
    graph::{AssemblyGraph, NodeId},
    settings::Settings,
};

/// Rainbow hues run from red up to this fraction of the colour wheel,
/// so the two ends of a query never share a colour.
const RAINBOW_HUE_RANGE: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
pub enum OverlayMode {
    /// One segment per hit in the hit's colour.
    Solid,
    /// Each hit is split into parts coloured by position in the query.
    Rainbow,
}

impl Default for OverlayMode {
    fn default() -> Self {
        OverlayMode::Solid
    }
}

/// An alignment of part of a query sequence to a node.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    /// 1-based first aligned base on the node.
    pub node_start: usize,
    /// 1-based last aligned base on the node.
    pub node_end: usize,
    /// Where the alignment starts in the query, as a fraction of the
    /// query length.
    pub query_start: f64,
    pub query_end: f64,
    pub colour: Colour,
}

impl Hit {
    /// The hit's start and end as fractions of the node length.
    pub fn node_fractions(&self, node_length: usize) -> (f64, f64) {
        let span = (self.node_end + 1).saturating_sub(self.node_start);
        node_fractions(node_length, self.node_start, span)
    }
}

/// A barcode occurrence attached to a node.
#[derive(Debug, Clone, PartialEq)]
pub struct BarcodeMark {
    pub barcode: BString,
    /// 1-based position on the node.
    pub position: usize,
    pub colour: Colour,
}

/// A coloured segment of a node. `start` may be greater than `end`
/// for segments drawn on a mirrored node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnotationPart {
    colour: Colour,
    start: f64,
    end: f64,
}

impl AnnotationPart {
    fn new(colour: Colour, start: f64, end: f64) -> Self {
        AnnotationPart {
            colour,
            start: clamp_fraction(start),
            end: clamp_fraction(end),
        }
    }

    pub fn colour(&self) -> Colour {
        self.colour
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }
}

/// Converts a 1-based start position and a span in bases into start
/// and end fractions of the node length. The end fraction is the
/// start of the last base in the span.
///
/// ```
/// use asmgraph::overlay::node_fractions;
///
/// let (start, end) = node_fractions(10000, 1001, 100);
/// assert!((start - 0.1).abs() < 1e-9);
/// assert!((end - 0.1099).abs() < 1e-9);
/// ```
pub fn node_fractions(
    node_length: usize,
    start: usize,
    span: usize,
) -> (f64, f64) {
    if node_length == 0 {
        return (0.0, 0.0);
    }
    let len = node_length as f64;
    let start = start as f64;
    let span = span as f64;
    ((start - 1.0) / len, (start + span - 2.0) / len)
}

/// The same position seen from the other end of the node.
#[inline]
pub fn mirror(fraction: f64) -> f64 {
    1.0 - fraction
}

#[inline]
pub fn clamp_fraction(fraction: f64) -> f64 {
    if fraction.is_nan() {
        0.0
    } else {
        fraction.max(0.0).min(1.0)
    }
}

pub struct OverlaySegmenter {
    mode: OverlayMode,
    max_parts: usize,
}

impl OverlaySegmenter {
    pub fn new(settings: &Settings) -> Self {
        OverlaySegmenter {
            mode: settings.overlay_mode,
            max_parts: settings.rainbow_parts_per_query,
        }
    }

    pub fn mode(mut self, mode: OverlayMode) -> Self {
        self.mode = mode;
        self
    }

    /// Segments for a hit on a node. `scaled_length` is the drawn
    /// length of the node, used to keep rainbow parts from becoming
    /// much smaller than a pixel.
    pub fn hit_segments(
        &self,
        hit: &Hit,
        node_length: usize,
        reverse: bool,
        scaled_length: f64,
    ) -> Vec<AnnotationPart> {
        let (start, end) = hit.node_fractions(node_length);
        let orient = |f: f64| if reverse { mirror(f) } else { f };

        match self.mode {
            OverlayMode::Solid => {
                let part =
                    AnnotationPart::new(hit.colour, orient(start), orient(end));
                vec![part]
            }
            OverlayMode::Rainbow => {
                let query_span = hit.query_end - hit.query_start;
                let scaled_hit_length = (end - start) * scaled_length;

                let by_query =
                    (self.max_parts as f64 * query_span.abs()).ceil();
                let by_length = (scaled_hit_length * 2.0).floor();
                let count = by_query.min(by_length).max(1.0) as usize;

                let node_step = (end - start) / count as f64;
                let query_step = query_span / count as f64;

                (0..count)
                    .map(|i| {
                        let from = start + node_step * i as f64;
                        let to = from + node_step;
                        let query = hit.query_start + query_step * i as f64;
                        let hue = clamp_fraction(query) * RAINBOW_HUE_RANGE;
                        AnnotationPart::new(
                            Colour::from_hsv(hue, 1.0, 1.0),
                            orient(from),
                            orient(to),
                        )
                    })
                    .collect()
            }
        }
    }

    /// Segments for every hit attached to the node.
    pub fn hit_parts(
        &self,
        graph: &AssemblyGraph,
        node: NodeId,
        scaled_length: f64,
    ) -> Vec<AnnotationPart> {
        self.hits_on(graph, node, false, scaled_length)
    }

    /// Segments for the hits on either strand of a contig, drawn on
    /// its positive node. Hits on the negative node are mirrored.
    pub fn hit_parts_or_twin(
        &self,
        graph: &AssemblyGraph,
        node: NodeId,
        scaled_length: f64,
    ) -> Vec<AnnotationPart> {
        let (positive, negative) = strand_pair(graph, node);
        let mut parts = self.hits_on(graph, positive, false, scaled_length);
        if let Some(negative) = negative {
            parts.extend(self.hits_on(graph, negative, true, scaled_length));
        }
        parts
    }

    fn hits_on(
        &self,
        graph: &AssemblyGraph,
        node: NodeId,
        reverse: bool,
        scaled_length: f64,
    ) -> Vec<AnnotationPart> {
        let node = graph.node(node);
        node.hits()
            .iter()
            .flat_map(|hit| {
                self.hit_segments(hit, node.length(), reverse, scaled_length)
            })
            .collect()
    }
}

/// The positive node of a contig and, unless the node is its own
/// twin, the negative one.
fn strand_pair(
    graph: &AssemblyGraph,
    node: NodeId,
) -> (NodeId, Option<NodeId>) {
    let twin = graph.twin(node);
    if twin == node {
        (node, None)
    } else if graph.node(node).is_positive() {
        (node, Some(twin))
    } else {
        (twin, Some(node))
    }
}

/// A barcode covers the single base at its position.
pub fn barcode_segment(
    mark: &BarcodeMark,
    node_length: usize,
    reverse: bool,
) -> AnnotationPart {
    let (start, end) = node_fractions(node_length, mark.position, 1);
    if reverse {
        AnnotationPart::new(mark.colour, mirror(start), mirror(end))
    } else {
        AnnotationPart::new(mark.colour, start, end)
    }
}

pub fn barcode_parts(
    graph: &AssemblyGraph,
    node: NodeId,
) -> Vec<AnnotationPart> {
    barcodes_on(graph, node, false)
}

/// Barcodes on either strand of a contig, drawn on its positive node.
pub fn barcode_parts_or_twin(
    graph: &AssemblyGraph,
    node: NodeId,
) -> Vec<AnnotationPart> {
    let (positive, negative) = strand_pair(graph, node);
    let mut parts = barcodes_on(graph, positive, false);
    if let Some(negative) = negative {
        parts.extend(barcodes_on(graph, negative, true));
    }
    parts
}

fn barcodes_on(
    graph: &AssemblyGraph,
    node: NodeId,
    reverse: bool,
) -> Vec<AnnotationPart> {
    let node = graph.node(node);
    node.barcodes()
        .iter()
        .map(|mark| barcode_segment(mark, node.length(), reverse))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < EPS
    }

    fn hit(node_start: usize, node_end: usize, q: (f64, f64)) -> Hit {
        Hit {
            node_start,
            node_end,
            query_start: q.0,
            query_end: q.1,
            colour: Colour::rgb(0, 0, 255),
        }
    }

    fn segmenter(mode: OverlayMode) -> OverlaySegmenter {
        OverlaySegmenter::new(&Settings::default()).mode(mode)
    }

    #[test]
    fn fractions_and_mirroring() {
        let (start, end) = node_fractions(10000, 1001, 100);
        assert!(close(start, 0.1));
        assert!(close(end, 0.1099));
        assert!(close(mirror(start), 0.9));
        assert!(close(mirror(end), 0.8901));

        assert_eq!(node_fractions(0, 5, 5), (0.0, 0.0));
    }

    #[test]
    fn fractions_are_clamped() {
        assert_eq!(clamp_fraction(1.05), 1.0);
        assert_eq!(clamp_fraction(-0.2), 0.0);
        assert_eq!(clamp_fraction(f64::NAN), 0.0);

        // a hit running past the end of the node
        let parts = segmenter(OverlayMode::Solid).hit_segments(
            &hit(90, 120, (0.0, 1.0)),
            100,
            false,
            100.0,
        );
        assert_eq!(parts.len(), 1);
        assert!(close(parts[0].start(), 0.89));
        assert_eq!(parts[0].end(), 1.0);
    }

    #[test]
    fn solid_hits_keep_their_colour() {
        let h = hit(1001, 1100, (0.0, 0.5));
        let seg = segmenter(OverlayMode::Solid);

        let parts = seg.hit_segments(&h, 10000, false, 50.0);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].colour(), h.colour);
        assert!(close(parts[0].start(), 0.1));
        assert!(close(parts[0].end(), 0.1099));

        let mirrored = seg.hit_segments(&h, 10000, true, 50.0);
        assert!(close(mirrored[0].start(), 0.9));
        assert!(close(mirrored[0].end(), 0.8901));
    }

    #[test]
    fn degenerate_hits_still_produce_a_segment() {
        let seg = segmenter(OverlayMode::Solid);
        // zero-length span: end is before start
        let parts = seg.hit_segments(
            &hit(50, 49, (0.2, 0.2)),
            100,
            false,
            10.0,
        );
        assert_eq!(parts.len(), 1);
        assert!(parts[0].end() <= parts[0].start());

        let rainbow = segmenter(OverlayMode::Rainbow);
        let parts = rainbow.hit_segments(
            &hit(50, 50, (0.2, 0.2)),
            100,
            false,
            0.0,
        );
        assert_eq!(parts.len(), 1);
    }

    #[test]
    fn rainbow_parts_follow_the_query() {
        let rainbow = segmenter(OverlayMode::Rainbow);

        // limited by the query span
        let parts = rainbow.hit_segments(
            &hit(1, 100, (0.0, 1.0)),
            100,
            false,
            1000.0,
        );
        assert_eq!(parts.len(), 100);
        assert_eq!(parts[0].colour(), Colour::rgb(255, 0, 0));
        assert!(close(parts[0].start(), 0.0));
        assert!(close(parts[99].end(), 0.99));
        for pair in parts.windows(2) {
            assert!(close(pair[0].end(), pair[1].start()));
        }

        // limited by the drawn size of the hit
        let parts = rainbow.hit_segments(
            &hit(1, 100, (0.0, 1.0)),
            100,
            false,
            10.0,
        );
        assert_eq!(parts.len(), 19);

        // hue tracks the query position, not the node position
        let parts = rainbow.hit_segments(
            &hit(1, 100, (0.5, 0.75)),
            100,
            false,
            1000.0,
        );
        assert_eq!(parts.len(), 25);
        assert_eq!(parts[0].colour(), Colour::from_hsv(0.45, 1.0, 1.0));
    }

    #[test]
    fn twin_annotations_are_mirrored() {
        let mut graph = AssemblyGraph::new();
        let pos = graph.add_node("1+", "A".repeat(100), 1.0).unwrap();
        let neg = graph.twin(pos);
        graph.attach_hit(pos, hit(1, 10, (0.0, 0.1)));
        graph.attach_hit(neg, hit(1, 10, (0.0, 0.1)));
        graph.attach_barcode(
            neg,
            BarcodeMark {
                barcode: "AACCGGTT".into(),
                position: 21,
                colour: Colour::rgb(0, 255, 0),
            },
        );

        let seg = segmenter(OverlayMode::Solid);
        assert_eq!(seg.hit_parts(&graph, pos, 100.0).len(), 1);

        let parts = seg.hit_parts_or_twin(&graph, neg, 100.0);
        assert_eq!(parts.len(), 2);
        assert!(close(parts[0].start(), 0.0));
        assert!(close(parts[1].start(), 1.0));
        assert!(close(parts[1].end(), 0.91));

        assert!(barcode_parts(&graph, pos).is_empty());
        let marks = barcode_parts_or_twin(&graph, pos);
        assert_eq!(marks.len(), 1);
        assert!(close(marks[0].start(), 0.8));
        assert!(close(marks[0].end(), 0.8));
        assert_eq!(marks[0].colour(), Colour::rgb(0, 255, 0));
    }
}
