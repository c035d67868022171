use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use crate::data::model::StationKey;

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Color mapping: station → Color32
// ---------------------------------------------------------------------------

/// Maps every station of a table to a distinct colour, so a station keeps its
/// colour across the map and the scatter plot.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<StationKey, Color32>,
    default_color: Color32,
}

impl ColorMap {
    pub fn new(stations: &[StationKey]) -> Self {
        let palette = generate_palette(stations.len());
        let mapping = stations.iter().cloned().zip(palette).collect();

        ColorMap {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    /// Look up the colour for a given station.
    pub fn color_for(&self, station: &StationKey) -> Color32 {
        self.mapping
            .get(station)
            .copied()
            .unwrap_or(self.default_color)
    }
}
