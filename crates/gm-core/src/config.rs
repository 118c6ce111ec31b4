//! Per-file, per-sheet merge configuration

use crate::error::{Error, Result};
use crate::grid::{FileId, Row};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Merge settings for one sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetConfig {
    /// Sheet name, unique within its file
    pub name: String,
    /// Whether the sheet takes part in the merge
    pub enabled: bool,
    /// 1-based row holding the column names
    pub header_row: usize,
    /// 1-based row where data begins
    pub data_start_row: usize,
    /// Leading rows of the sheet, for display only
    pub preview_rows: Vec<Row>,
}

impl SheetConfig {
    /// Create an enabled sheet config
    pub fn new(name: impl Into<String>, header_row: usize, data_start_row: usize) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            header_row: header_row.max(1),
            data_start_row: data_start_row.max(1),
            preview_rows: Vec::new(),
        }
    }

    /// Attach preview rows
    pub fn with_preview(mut self, preview_rows: Vec<Row>) -> Self {
        self.preview_rows = preview_rows;
        self
    }

    /// Preview row at the configured header row, if it is within the preview
    pub fn preview_header(&self) -> Option<&Row> {
        self.header_row
            .checked_sub(1)
            .and_then(|idx| self.preview_rows.get(idx))
    }

    /// Preview row at the configured data start row, if it is within the preview
    pub fn preview_first_data_row(&self) -> Option<&Row> {
        self.data_start_row
            .checked_sub(1)
            .and_then(|idx| self.preview_rows.get(idx))
    }
}

/// A loaded file and the configuration of its sheets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Key into the grid repository
    pub id: FileId,
    /// Display name (usually the file name)
    pub name: String,
    /// File size in bytes
    pub size: u64,
    /// Last modification time, when known
    pub last_modified: Option<DateTime<Utc>>,
    /// Sheets in workbook order
    pub sheets: Vec<SheetConfig>,
}

impl FileEntry {
    pub fn new(id: FileId, name: impl Into<String>, sheets: Vec<SheetConfig>) -> Self {
        Self {
            id,
            name: name.into(),
            size: 0,
            last_modified: None,
            sheets,
        }
    }

    pub fn sheet(&self, name: &str) -> Option<&SheetConfig> {
        self.sheets.iter().find(|s| s.name == name)
    }

    fn sheet_mut(&mut self, name: &str) -> Result<&mut SheetConfig> {
        let file = self.name.clone();
        self.sheets
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| Error::SheetNotFound {
                file,
                sheet: name.to_string(),
            })
    }

    pub fn enabled_sheets(&self) -> impl Iterator<Item = &SheetConfig> {
        self.sheets.iter().filter(|s| s.enabled)
    }
}

/// The ordered set of loaded files and their sheet settings.
///
/// File order here is merge order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigStore {
    files: Vec<FileEntry>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a file at the end of the merge order
    pub fn add(&mut self, entry: FileEntry) {
        self.files.push(entry);
    }

    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    pub fn file(&self, id: &FileId) -> Option<&FileEntry> {
        self.files.iter().find(|f| f.id == *id)
    }

    fn file_mut(&mut self, id: &FileId) -> Result<&mut FileEntry> {
        self.files
            .iter_mut()
            .find(|f| f.id == *id)
            .ok_or_else(|| Error::FileNotFound(id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Number of sheets across all files
    pub fn total_sheets(&self) -> usize {
        self.files.iter().map(|f| f.sheets.len()).sum()
    }

    /// Flip a sheet's inclusion flag and return the new value
    pub fn toggle_sheet(&mut self, id: &FileId, sheet: &str) -> Result<bool> {
        let config = self.file_mut(id)?.sheet_mut(sheet)?;
        config.enabled = !config.enabled;
        Ok(config.enabled)
    }

    pub fn set_sheet_enabled(&mut self, id: &FileId, sheet: &str, enabled: bool) -> Result<()> {
        self.file_mut(id)?.sheet_mut(sheet)?.enabled = enabled;
        Ok(())
    }

    /// Set the header row, clamped to at least 1. No upper bound is checked.
    pub fn set_header_row(&mut self, id: &FileId, sheet: &str, row: usize) -> Result<usize> {
        let config = self.file_mut(id)?.sheet_mut(sheet)?;
        config.header_row = row.max(1);
        Ok(config.header_row)
    }

    /// Set the data start row, clamped to at least 1. Independent of the header row.
    pub fn set_data_start_row(&mut self, id: &FileId, sheet: &str, row: usize) -> Result<usize> {
        let config = self.file_mut(id)?.sheet_mut(sheet)?;
        config.data_start_row = row.max(1);
        Ok(config.data_start_row)
    }

    /// Remove a file and return its entry
    pub fn remove_file(&mut self, id: &FileId) -> Result<FileEntry> {
        let idx = self
            .files
            .iter()
            .position(|f| f.id == *id)
            .ok_or_else(|| Error::FileNotFound(id.to_string()))?;
        Ok(self.files.remove(idx))
    }

    /// `(file name, sheet name)` of every enabled sheet, in merge order
    pub fn selected_sheets(&self) -> Vec<(&str, &str)> {
        self.files
            .iter()
            .flat_map(|f| f.enabled_sheets().map(move |s| (f.name.as_str(), s.name.as_str())))
            .collect()
    }
}
