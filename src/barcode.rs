//! Linked-read barcodes: where each barcode occurs in the assembly,
//! which barcodes the user has picked out, and how they are shown.

use bstr::{BStr, BString, ByteSlice};
use fnv::FnvHashMap;
use log::{debug, warn};

use crate::{
    colour::Colour,
    error::{GraphError, GraphResult},
    graph::{node_name, AssemblyGraph, NodeId, Strand},
    overlay::BarcodeMark,
};

/// Number of distinct hues in the preset palette.
pub const PRESET_COLOUR_COUNT: usize = 12;

/// The preset colour for the barcode selected at `index`. Hues are
/// evenly spaced and repeat after `PRESET_COLOUR_COUNT` barcodes.
pub fn preset_colour(index: usize) -> Colour {
    let hue = (index % PRESET_COLOUR_COUNT) as f64 / PRESET_COLOUR_COUNT as f64;
    Colour::from_hsv(hue, 1.0, 1.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarcodeOccurrence {
    pub contig: BString,
    /// 1-based position on the contig.
    pub position: usize,
    pub strand: Strand,
}

impl BarcodeOccurrence {
    /// Name of the node the occurrence lies on.
    pub fn node_name(&self) -> BString {
        node_name(&self.contig, self.strand)
    }
}

/// User changes to how a barcode is shown. Without a colour of its
/// own, a barcode takes the preset colour for its selection index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarcodeSetting {
    pub colour: Option<Colour>,
    pub shown: bool,
}

impl Default for BarcodeSetting {
    fn default() -> Self {
        BarcodeSetting {
            colour: None,
            shown: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BarcodeRegistry {
    occurrences: FnvHashMap<BString, Vec<BarcodeOccurrence>>,
    selected: Vec<BString>,
    settings: FnvHashMap<BString, BarcodeSetting>,
}

impl BarcodeRegistry {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn add_occurrence<B, C>(
        &mut self,
        barcode: B,
        contig: C,
        position: usize,
        strand: Strand,
    ) where
        B: AsRef<[u8]>,
        C: AsRef<[u8]>,
    {
        self.occurrences
            .entry(barcode.as_ref().into())
            .or_default()
            .push(BarcodeOccurrence {
                contig: contig.as_ref().into(),
                position,
                strand,
            });
    }

    pub fn contains<B: AsRef<[u8]>>(&self, barcode: B) -> bool {
        self.occurrences.contains_key(barcode.as_ref().as_bstr())
    }

    /// Number of recorded occurrences of the barcode.
    pub fn count<B: AsRef<[u8]>>(&self, barcode: B) -> usize {
        self.occurrences
            .get(barcode.as_ref().as_bstr())
            .map_or(0, |occ| occ.len())
    }

    pub fn occurrences<B: AsRef<[u8]>>(
        &self,
        barcode: B,
    ) -> &[BarcodeOccurrence] {
        self.occurrences
            .get(barcode.as_ref().as_bstr())
            .map_or(&[], |occ| occ.as_slice())
    }

    /// The selected barcodes in selection order.
    pub fn selected(&self) -> &[BString] {
        &self.selected
    }

    pub fn select<B: AsRef<[u8]>>(&mut self, barcode: B) -> GraphResult<()> {
        let barcode = barcode.as_ref().as_bstr();
        if self.selected.iter().any(|b| b.as_bstr() == barcode) {
            return Err(GraphError::BarcodeAlreadySelected(barcode.into()));
        }
        if !self.contains(barcode) {
            return Err(GraphError::UnknownBarcode(barcode.into()));
        }
        self.selected.push(barcode.into());
        debug!("Selected barcode {}", barcode);
        Ok(())
    }

    fn selection_index(&self, barcode: &BStr) -> Option<usize> {
        self.selected.iter().position(|b| b.as_bstr() == barcode)
    }

    fn setting_mut(
        &mut self,
        barcode: &BStr,
    ) -> GraphResult<&mut BarcodeSetting> {
        if !self.contains(barcode) {
            return Err(GraphError::UnknownBarcode(barcode.into()));
        }
        Ok(self.settings.entry(barcode.into()).or_default())
    }

    pub fn set_colour<B: AsRef<[u8]>>(
        &mut self,
        barcode: B,
        colour: Colour,
    ) -> GraphResult<()> {
        self.setting_mut(barcode.as_ref().as_bstr())?.colour = Some(colour);
        Ok(())
    }

    /// Hidden barcodes keep their colour and are drawn with alpha 0.
    pub fn set_shown<B: AsRef<[u8]>>(
        &mut self,
        barcode: B,
        shown: bool,
    ) -> GraphResult<()> {
        self.setting_mut(barcode.as_ref().as_bstr())?.shown = shown;
        Ok(())
    }

    pub fn setting<B: AsRef<[u8]>>(
        &self,
        barcode: B,
    ) -> Option<&BarcodeSetting> {
        self.settings.get(barcode.as_ref().as_bstr())
    }

    /// The colour a selected barcode is drawn with: its own colour if
    /// it has one, otherwise the preset colour for its position in the
    /// selection.
    pub fn colour<B: AsRef<[u8]>>(&self, barcode: B) -> Option<Colour> {
        let barcode = barcode.as_ref().as_bstr();
        let index = self.selection_index(barcode)?;
        let setting = self.settings.get(barcode).copied().unwrap_or_default();
        let colour = setting.colour.unwrap_or_else(|| preset_colour(index));
        Some(if setting.shown {
            colour
        } else {
            colour.with_alpha(0)
        })
    }

    /// Replaces the barcodes attached to the graph's nodes with the
    /// occurrences of the selected barcodes. Occurrences on contigs
    /// that aren't in the graph are skipped. Returns the number of
    /// marks attached.
    pub fn attach_selected(&self, graph: &mut AssemblyGraph) -> usize {
        graph.clear_barcodes();

        let mut attached = 0;
        for barcode in self.selected.iter() {
            let colour = match self.colour(barcode) {
                Some(colour) => colour,
                None => continue,
            };
            for occ in self.occurrences(barcode) {
                let name = occ.node_name();
                match graph.find_node(&name) {
                    Some(id) => {
                        graph.attach_barcode(
                            id,
                            BarcodeMark {
                                barcode: barcode.clone(),
                                position: occ.position,
                                colour,
                            },
                        );
                        attached += 1;
                    }
                    None => {
                        warn!("Barcode {} is on missing node {}", barcode, name)
                    }
                }
            }
        }
        debug!(
            "Attached {} marks for {} selected barcodes",
            attached,
            self.selected.len()
        );
        attached
    }

    /// The nodes holding occurrences of any of the given barcodes,
    /// sorted by id.
    pub fn nodes_for<B: AsRef<[u8]>>(
        &self,
        graph: &AssemblyGraph,
        barcodes: &[B],
    ) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = barcodes
            .iter()
            .flat_map(|b| self.occurrences(b))
            .filter_map(|occ| graph.find_node(occ.node_name()))
            .collect();
        nodes.sort();
        nodes.dedup();
        nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> BarcodeRegistry {
        let mut reg = BarcodeRegistry::new();
        reg.add_occurrence("AAAC", "1", 5, Strand::Forward);
        reg.add_occurrence("AAAC", "2", 2, Strand::Reverse);
        reg.add_occurrence("AAAC", "9", 1, Strand::Forward);
        reg.add_occurrence("GGTT", "2", 7, Strand::Forward);
        reg
    }

    fn graph() -> AssemblyGraph {
        let mut graph = AssemblyGraph::new();
        graph.add_node("1+", "ACGTACGTAC", 1.0).unwrap();
        graph.add_node("2+", "CCCCGGGG", 1.0).unwrap();
        graph
    }

    #[test]
    fn counting_and_selection() {
        let mut reg = registry();
        assert_eq!(reg.count("AAAC"), 3);
        assert_eq!(reg.count("TTTT"), 0);
        assert!(reg.contains("GGTT"));

        assert_eq!(
            reg.select("TTTT"),
            Err(GraphError::UnknownBarcode("TTTT".into()))
        );
        reg.select("AAAC").unwrap();
        assert_eq!(
            reg.select("AAAC"),
            Err(GraphError::BarcodeAlreadySelected("AAAC".into()))
        );
        reg.select("GGTT").unwrap();
        assert_eq!(
            reg.selected(),
            &[BString::from("AAAC"), BString::from("GGTT")]
        );
    }

    #[test]
    fn preset_colours_follow_selection_order() {
        let mut reg = registry();
        reg.select("GGTT").unwrap();
        reg.select("AAAC").unwrap();
        assert_eq!(reg.colour("GGTT"), Some(preset_colour(0)));
        assert_eq!(reg.colour("AAAC"), Some(preset_colour(1)));
        assert_ne!(preset_colour(0), preset_colour(1));
        assert_eq!(preset_colour(0), preset_colour(PRESET_COLOUR_COUNT));
    }

    #[test]
    fn colour_and_visibility_settings() {
        let mut reg = registry();
        reg.select("AAAC").unwrap();
        let blue = Colour::rgb(0, 0, 255);

        reg.set_colour("AAAC", blue).unwrap();
        assert_eq!(reg.colour("AAAC"), Some(blue));

        reg.set_shown("AAAC", false).unwrap();
        assert_eq!(reg.colour("AAAC"), Some(blue.with_alpha(0)));
        assert!(!reg.setting("AAAC").unwrap().shown);

        reg.set_shown("AAAC", true).unwrap();
        assert_eq!(reg.colour("AAAC"), Some(blue));

        assert!(reg.set_shown("TTTT", true).is_err());
    }

    #[test]
    fn settings_before_selection_keep_the_preset_order() {
        let mut reg = registry();
        reg.set_shown("GGTT", false).unwrap();
        assert_eq!(reg.setting("GGTT").unwrap().colour, None);

        reg.select("AAAC").unwrap();
        reg.select("GGTT").unwrap();
        assert_eq!(reg.colour("AAAC"), Some(preset_colour(0)));
        assert_eq!(reg.colour("GGTT"), Some(preset_colour(1).with_alpha(0)));

        reg.set_shown("GGTT", true).unwrap();
        assert_eq!(reg.colour("GGTT"), Some(preset_colour(1)));
    }

    #[test]
    fn attaching_selected_barcodes() {
        let mut reg = registry();
        let mut graph = graph();
        reg.select("AAAC").unwrap();

        // contig 9 isn't in the graph
        assert_eq!(reg.attach_selected(&mut graph), 2);

        let one = graph.find_node("1+").unwrap();
        let two_rc = graph.find_node("2-").unwrap();
        let marks = graph.node(one).barcodes();
        assert_eq!(marks.len(), 1);
        assert_eq!(marks[0].position, 5);
        assert_eq!(marks[0].colour, preset_colour(0));
        assert_eq!(graph.node(two_rc).barcodes().len(), 1);

        // attaching again replaces the earlier marks
        reg.select("GGTT").unwrap();
        assert_eq!(reg.attach_selected(&mut graph), 3);
        assert_eq!(graph.node(one).barcodes().len(), 1);
    }

    #[test]
    fn nodes_for_barcodes() {
        let reg = registry();
        let graph = graph();
        let nodes = reg.nodes_for(&graph, &["AAAC", "GGTT"]);
        let names: Vec<String> = nodes
            .into_iter()
            .map(|id| graph.node(id).name().to_string())
            .collect();
        assert_eq!(names, vec!["1+", "2+", "2-"]);
    }
}
