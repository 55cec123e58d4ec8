//! Tunables consumed by the contiguity search, the overlay segmenter
//! and the colour assigner. Settings are passed to each of them
//! explicitly.

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use crate::{
    colour::{Colour, NodeColourScheme},
    contiguity::{ContiguityStatus, DEFAULT_SEARCH_STEPS},
    overlay::OverlayMode,
};

/// HSL parameters for the random colour scheme, each in `0..=255`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
pub struct StrandColourParams {
    pub saturation: u8,
    pub lightness: u8,
    pub opacity: u8,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
pub struct ContiguityColours {
    pub strand_specific: Colour,
    pub either_strand: Colour,
    pub maybe: Colour,
    pub not_contiguous: Colour,
}

impl ContiguityColours {
    pub fn for_status(&self, status: ContiguityStatus) -> Colour {
        match status {
            ContiguityStatus::ContiguousStrandSpecific => self.strand_specific,
            ContiguityStatus::ContiguousEitherStrand => self.either_strand,
            ContiguityStatus::MaybeContiguous => self.maybe,
            ContiguityStatus::NotContiguous => self.not_contiguous,
        }
    }
}

impl Default for ContiguityColours {
    fn default() -> Self {
        ContiguityColours {
            strand_specific: Colour::rgb(0, 155, 0),
            either_strand: Colour::rgb(0, 155, 0),
            maybe: Colour::rgb(190, 240, 190),
            not_contiguous: Colour::rgb(220, 220, 220),
        }
    }
}

/// Read-depth colour gradient. With `auto` set, the range is derived
/// from the mean read depth of the drawn nodes instead of the two
/// values.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
pub struct ReadDepthColours {
    pub auto: bool,
    pub low_value: f64,
    pub low_colour: Colour,
    pub high_value: f64,
    pub high_colour: Colour,
}

impl Default for ReadDepthColours {
    fn default() -> Self {
        ReadDepthColours {
            auto: true,
            low_value: 5.0,
            low_colour: Colour::rgb(0, 0, 0),
            high_value: 50.0,
            high_colour: Colour::rgb(255, 0, 0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(default))]
pub struct Settings {
    /// Display both strands of every contig instead of one.
    pub double_mode: bool,
    pub contiguity_search_steps: usize,
    pub rainbow_parts_per_query: usize,
    pub overlay_mode: OverlayMode,
    pub colour_scheme: NodeColourScheme,
    pub contiguity_colours: ContiguityColours,
    pub random_positive: StrandColourParams,
    pub random_negative: StrandColourParams,
    pub uniform_positive_colour: Colour,
    pub uniform_negative_colour: Colour,
    pub read_depth: ReadDepthColours,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            double_mode: false,
            contiguity_search_steps: DEFAULT_SEARCH_STEPS,
            rainbow_parts_per_query: 100,
            overlay_mode: OverlayMode::default(),
            colour_scheme: NodeColourScheme::default(),
            contiguity_colours: ContiguityColours::default(),
            random_positive: StrandColourParams {
                saturation: 127,
                lightness: 127,
                opacity: 255,
            },
            random_negative: StrandColourParams {
                saturation: 127,
                lightness: 63,
                opacity: 255,
            },
            uniform_positive_colour: Colour::rgb(178, 34, 34),
            uniform_negative_colour: Colour::rgb(128, 0, 0),
            read_depth: ReadDepthColours::default(),
        }
    }
}

#[cfg(feature = "serde1")]
impl Settings {
    /// Read settings from a JSON file. Missing fields take their
    /// default values.
    pub fn load_json<P: AsRef<std::path::Path>>(
        path: P,
    ) -> std::io::Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let settings = serde_json::from_reader(reader)?;
        Ok(settings)
    }

    pub fn save_json<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> std::io::Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}
