//! Session-wide defaults

use serde::{Deserialize, Serialize};

/// Defaults applied when files are loaded and exported
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Rows of each sheet kept in its configuration preview
    pub preview_rows: usize,
    /// Header row (1-based) given to newly loaded sheets
    pub default_header_row: usize,
    /// Data start row (1-based) given to newly loaded sheets
    pub default_data_start_row: usize,
    /// Export file name prefix
    pub label: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            preview_rows: 10,
            default_header_row: 1,
            default_data_start_row: 2,
            label: "merged_report".to_string(),
        }
    }
}

impl Settings {
    /// Header row default, never below 1
    pub fn header_row(&self) -> usize {
        self.default_header_row.max(1)
    }

    /// Data start row default, never below 1
    pub fn data_start_row(&self) -> usize {
        self.default_data_start_row.max(1)
    }
}
