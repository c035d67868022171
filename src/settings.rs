use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable naming an optional JSON settings file.
pub const CONFIG_ENV: &str = "WATER_DASHBOARD_CONFIG";

// ---------------------------------------------------------------------------
// Column names
// ---------------------------------------------------------------------------

/// Names of the columns the dashboard gives a meaning to.
/// Matched against the sheet header by exact string comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub date: String,
    pub station: String,
    pub x: String,
    pub y: String,
    pub year: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            date: "Data".to_string(),
            station: "Estação".to_string(),
            x: "x".to_string(),
            y: "y".to_string(),
            year: "Ano".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub columns: ColumnNames,
    /// Rows shown in the data preview.
    pub preview_rows: usize,
    pub window_size: [f32; 2],
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            columns: ColumnNames::default(),
            preview_rows: 5,
            window_size: [1280.0, 860.0],
        }
    }
}

impl Settings {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings file {}", path.display()))?;
        serde_json::from_str(&text).context("parsing settings JSON")
    }

    /// Settings from `$WATER_DASHBOARD_CONFIG`, falling back to defaults.
    pub fn load() -> Self {
        let Some(path) = std::env::var_os(CONFIG_ENV) else {
            return Self::default();
        };
        match Self::from_file(Path::new(&path)) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", Path::new(&path).display());
                settings
            }
            Err(e) => {
                log::warn!("Ignoring settings file: {e:#}");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_settings_keep_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{ "columns": { "station": "Station" } }"#).unwrap();
        assert_eq!(settings.columns.station, "Station");
        assert_eq!(settings.columns.date, "Data");
        assert_eq!(settings.preview_rows, 5);
    }

    #[test]
    fn missing_file_is_an_error() {
        let path = std::env::temp_dir().join("water-dashboard-no-such-settings.json");
        assert!(Settings::from_file(&path).is_err());
    }
}
