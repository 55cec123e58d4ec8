//! Node colours: the colour value type and the scheme-driven
//! assignment of colours to nodes.

use std::hash::Hasher;

use fnv::FnvHasher;

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use crate::{
    contiguity::display_status,
    graph::{AssemblyGraph, NodeId},
    settings::{Settings, StrandColourParams},
};

/// An 8-bit RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
pub struct Colour {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Default for Colour {
    fn default() -> Self {
        Colour::rgb(0, 0, 0)
    }
}

#[inline]
fn channel(x: f64) -> u8 {
    (x * 255.0).round().max(0.0).min(255.0) as u8
}

impl Colour {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Colour { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Colour { r, g, b, a }
    }

    /// Hue, saturation and value all in `[0, 1]`. A hue of 1.0 wraps
    /// around to red.
    pub fn from_hsv(hue: f64, saturation: f64, value: f64) -> Self {
        let h = hue.rem_euclid(1.0) * 6.0;
        let s = saturation.max(0.0).min(1.0);
        let v = value.max(0.0).min(1.0);

        let i = h.floor();
        let f = h - i;
        let p = v * (1.0 - s);
        let q = v * (1.0 - s * f);
        let t = v * (1.0 - s * (1.0 - f));

        let (r, g, b) = match i as u8 {
            0 => (v, t, p),
            1 => (q, v, p),
            2 => (p, v, t),
            3 => (p, q, v),
            4 => (t, p, v),
            _ => (v, p, q),
        };
        Colour::rgb(channel(r), channel(g), channel(b))
    }

    /// Hue, saturation and lightness all in `[0, 1]`.
    pub fn from_hsl(hue: f64, saturation: f64, lightness: f64) -> Self {
        let h = hue.rem_euclid(1.0) * 6.0;
        let s = saturation.max(0.0).min(1.0);
        let l = lightness.max(0.0).min(1.0);

        let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
        let x = c * (1.0 - (h % 2.0 - 1.0).abs());
        let m = l - c / 2.0;

        let (r, g, b) = match h.floor() as u8 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        Colour::rgb(channel(r + m), channel(g + m), channel(b + m))
    }

    pub fn with_alpha(self, a: u8) -> Self {
        Colour { a, ..self }
    }

    /// Linear interpolation, `t` is clamped to `[0, 1]`.
    pub fn lerp(self, other: Colour, t: f64) -> Self {
        let t = if t.is_nan() { 0.0 } else { t.max(0.0).min(1.0) };
        let mix = |a: u8, b: u8| {
            (a as f64 + (b as f64 - a as f64) * t).round() as u8
        };
        Colour {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
            a: mix(self.a, other.a),
        }
    }
}

/// `#rrggbb`, or `#rrggbbaa` if the colour isn't opaque.
impl std::fmt::Display for Colour {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)?;
        if self.a != 255 {
            write!(f, "{:02x}", self.a)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
pub enum NodeColourScheme {
    Random,
    Uniform,
    ReadDepth,
    Contiguity,
    Custom,
}

impl Default for NodeColourScheme {
    fn default() -> Self {
        NodeColourScheme::Random
    }
}

/// Colour used by the custom scheme for nodes without their own.
pub const DEFAULT_CUSTOM_COLOUR: Colour = Colour::rgb(190, 190, 190);

/// A stable hue in `[0, 1)` for a contig name. Both strands of a
/// contig share the base name and so the hue.
pub fn name_hue(base_name: &[u8]) -> f64 {
    let mut hasher = FnvHasher::default();
    hasher.write(base_name);
    (hasher.finish() % 360) as f64 / 360.0
}

fn hsl_with_params(hue: f64, params: &StrandColourParams) -> Colour {
    Colour::from_hsl(
        hue,
        params.saturation as f64 / 255.0,
        params.lightness as f64 / 255.0,
    )
    .with_alpha(params.opacity)
}

/// Assigns colours to nodes according to the scheme in the settings.
/// A node's custom colour always takes precedence.
pub struct ColourAssigner<'a> {
    graph: &'a AssemblyGraph,
    settings: &'a Settings,
    depth_range: (f64, f64),
}

impl<'a> ColourAssigner<'a> {
    pub fn new(graph: &'a AssemblyGraph, settings: &'a Settings) -> Self {
        let depth = &settings.read_depth;
        let depth_range = if depth.auto {
            let mean = graph.mean_drawn_read_depth();
            (mean * 0.5, mean * 2.0)
        } else {
            (depth.low_value, depth.high_value)
        };
        ColourAssigner {
            graph,
            settings,
            depth_range,
        }
    }

    /// The read depths mapped to the low and high read-depth colours.
    pub fn depth_range(&self) -> (f64, f64) {
        self.depth_range
    }

    pub fn node_colour(&self, id: NodeId) -> Colour {
        let node = self.graph.node(id);
        if let Some(colour) = node.custom_colour() {
            return colour;
        }

        let settings = self.settings;
        match settings.colour_scheme {
            NodeColourScheme::Random => {
                let params = if node.is_positive() {
                    &settings.random_positive
                } else {
                    &settings.random_negative
                };
                hsl_with_params(name_hue(node.base_name()), params)
            }
            NodeColourScheme::Uniform => {
                if node.is_positive() {
                    settings.uniform_positive_colour
                } else {
                    settings.uniform_negative_colour
                }
            }
            NodeColourScheme::ReadDepth => {
                let depth = &settings.read_depth;
                let (low, high) = self.depth_range;
                let read_depth = node.read_depth();
                if read_depth <= low {
                    depth.low_colour
                } else if read_depth >= high {
                    depth.high_colour
                } else {
                    let t = (read_depth - low) / (high - low);
                    depth.low_colour.lerp(depth.high_colour, t)
                }
            }
            NodeColourScheme::Contiguity => {
                let status =
                    display_status(self.graph, id, !settings.double_mode);
                settings.contiguity_colours.for_status(status)
            }
            NodeColourScheme::Custom => DEFAULT_CUSTOM_COLOUR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contiguity::ContiguityStatus;

    fn graph() -> AssemblyGraph {
        let mut graph = AssemblyGraph::new();
        graph.add_node("1+", "ACGTACGT", 10.0).unwrap();
        graph.add_node("2+", "CCCC", 40.0).unwrap();
        graph.add_node("3+", "GGGGGGGG", 100.0).unwrap();
        graph
    }

    #[test]
    fn hsv_and_hsl_conversion() {
        assert_eq!(Colour::from_hsv(0.0, 1.0, 1.0), Colour::rgb(255, 0, 0));
        assert_eq!(Colour::from_hsv(0.5, 1.0, 1.0), Colour::rgb(0, 255, 255));
        assert_eq!(Colour::from_hsv(0.5, 0.0, 0.5), Colour::rgb(128, 128, 128));
        assert_eq!(Colour::from_hsl(0.5, 1.0, 0.5), Colour::rgb(0, 255, 255));
        assert_eq!(Colour::from_hsl(0.0, 0.0, 1.0), Colour::rgb(255, 255, 255));
    }

    #[test]
    fn display_and_lerp() {
        assert_eq!(Colour::rgb(178, 34, 34).to_string(), "#b22222");
        assert_eq!(Colour::rgba(0, 0, 0, 60).to_string(), "#0000003c");

        let black = Colour::rgb(0, 0, 0);
        let red = Colour::rgb(255, 0, 0);
        assert_eq!(black.lerp(red, 0.5), Colour::rgb(128, 0, 0));
        assert_eq!(black.lerp(red, 2.0), red);
    }

    #[test]
    fn random_colours_are_stable_and_shared_by_twins() {
        let graph = graph();
        let settings = Settings::default();
        let assigner = ColourAssigner::new(&graph, &settings);

        let pos = graph.find_node("1+").unwrap();
        let neg = graph.find_node("1-").unwrap();
        let hue = name_hue(b"1");

        assert_eq!(
            assigner.node_colour(pos),
            hsl_with_params(hue, &settings.random_positive)
        );
        assert_eq!(
            assigner.node_colour(neg),
            hsl_with_params(hue, &settings.random_negative)
        );
        assert_eq!(
            assigner.node_colour(pos),
            ColourAssigner::new(&graph, &settings).node_colour(pos)
        );
    }

    #[test]
    fn custom_colour_wins() {
        let mut graph = graph();
        let id = graph.find_node("2+").unwrap();
        let teal = Colour::rgb(0, 128, 128);
        graph.set_custom_colour(id, Some(teal));

        for &scheme in [
            NodeColourScheme::Random,
            NodeColourScheme::Uniform,
            NodeColourScheme::ReadDepth,
            NodeColourScheme::Contiguity,
            NodeColourScheme::Custom,
        ]
        .iter()
        {
            let settings = Settings {
                colour_scheme: scheme,
                ..Settings::default()
            };
            let assigner = ColourAssigner::new(&graph, &settings);
            assert_eq!(assigner.node_colour(id), teal);
        }

        let settings = Settings {
            colour_scheme: NodeColourScheme::Custom,
            ..Settings::default()
        };
        let other = graph.find_node("1+").unwrap();
        assert_eq!(
            ColourAssigner::new(&graph, &settings).node_colour(other),
            DEFAULT_CUSTOM_COLOUR
        );
    }

    #[test]
    fn uniform_colours_by_strand() {
        let graph = graph();
        let settings = Settings {
            colour_scheme: NodeColourScheme::Uniform,
            ..Settings::default()
        };
        let assigner = ColourAssigner::new(&graph, &settings);
        let pos = graph.find_node("3+").unwrap();
        let neg = graph.find_node("3-").unwrap();
        assert_eq!(assigner.node_colour(pos), Colour::rgb(178, 34, 34));
        assert_eq!(assigner.node_colour(neg), Colour::rgb(128, 0, 0));
    }

    #[test]
    fn read_depth_gradient() {
        let graph = graph();
        let mut settings = Settings {
            colour_scheme: NodeColourScheme::ReadDepth,
            ..Settings::default()
        };
        settings.read_depth.auto = false;
        settings.read_depth.low_value = 10.0;
        settings.read_depth.high_value = 70.0;

        let assigner = ColourAssigner::new(&graph, &settings);
        let colour = |name: &str| {
            assigner.node_colour(graph.find_node(name).unwrap())
        };
        assert_eq!(colour("1+"), Colour::rgb(0, 0, 0));
        assert_eq!(colour("2+"), Colour::rgb(128, 0, 0));
        assert_eq!(colour("3+"), Colour::rgb(255, 0, 0));
    }

    #[test]
    fn auto_read_depth_range_follows_the_mean() {
        let graph = graph();
        let settings = Settings {
            colour_scheme: NodeColourScheme::ReadDepth,
            ..Settings::default()
        };
        let mean = graph.mean_drawn_read_depth();
        let assigner = ColourAssigner::new(&graph, &settings);
        assert_eq!(assigner.depth_range(), (mean * 0.5, mean * 2.0));
    }

    #[test]
    fn contiguity_colours_follow_the_display_mode() {
        let mut graph = graph();
        let pos = graph.find_node("1+").unwrap();
        graph.upgrade_contiguity(
            pos,
            ContiguityStatus::ContiguousStrandSpecific,
        );

        let mut settings = Settings {
            colour_scheme: NodeColourScheme::Contiguity,
            ..Settings::default()
        };
        let colours = settings.contiguity_colours.clone();

        // single-strand mode shows the weaker of the node and its twin
        let assigner = ColourAssigner::new(&graph, &settings);
        assert_eq!(assigner.node_colour(pos), colours.not_contiguous);

        settings.double_mode = true;
        let assigner = ColourAssigner::new(&graph, &settings);
        assert_eq!(assigner.node_colour(pos), colours.strand_specific);
    }
}
