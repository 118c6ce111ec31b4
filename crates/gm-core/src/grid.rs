//! Raw sheet grids and the repository that owns them

use crate::cell::CellValue;
use crate::error::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// One row of cells. Rows within a sheet may differ in length.
pub type Row = Vec<CellValue>;

/// The full, unfiltered content of one decoded sheet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SheetGrid {
    pub rows: Vec<Row>,
}

impl SheetGrid {
    /// Create a grid from rows
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Get a row by 0-based index
    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    /// First `n` rows, cloned
    pub fn preview(&self, n: usize) -> Vec<Row> {
        self.rows.iter().take(n).cloned().collect()
    }
}

/// Every sheet of one decoded file, keyed by sheet name in workbook order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridBundle {
    sheets: IndexMap<String, SheetGrid>,
}

impl GridBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sheet, replacing any sheet with the same name
    pub fn insert(&mut self, name: impl Into<String>, grid: SheetGrid) {
        self.sheets.insert(name.into(), grid);
    }

    pub fn sheet(&self, name: &str) -> Option<&SheetGrid> {
        self.sheets.get(name)
    }

    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.keys().map(String::as_str)
    }

    pub fn sheets(&self) -> impl Iterator<Item = (&str, &SheetGrid)> {
        self.sheets.iter().map(|(n, g)| (n.as_str(), g))
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, SheetGrid)> for GridBundle {
    fn from_iter<I: IntoIterator<Item = (S, SheetGrid)>>(iter: I) -> Self {
        Self {
            sheets: iter.into_iter().map(|(n, g)| (n.into(), g)).collect(),
        }
    }
}

/// Opaque identifier assigned to each loaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(Uuid);

impl FileId {
    /// Generate a fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an id previously produced by `Display`
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for FileId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Access to full grid bundles by file id, as needed by the merge engine.
///
/// `Ok(None)` means the file's grids are not retained and the file is
/// skipped. An error aborts the merge.
pub trait GridSource {
    fn lookup(&self, id: &FileId) -> Result<Option<&GridBundle>>;
}

/// Owns the full grids of every loaded file
#[derive(Debug, Clone, Default)]
pub struct GridRepository {
    bundles: HashMap<FileId, GridBundle>,
}

impl GridRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: FileId, bundle: GridBundle) {
        self.bundles.insert(id, bundle);
    }

    pub fn get(&self, id: &FileId) -> Option<&GridBundle> {
        self.bundles.get(id)
    }

    pub fn remove(&mut self, id: &FileId) -> Option<GridBundle> {
        self.bundles.remove(id)
    }

    pub fn contains(&self, id: &FileId) -> bool {
        self.bundles.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }
}

impl GridSource for GridRepository {
    fn lookup(&self, id: &FileId) -> Result<Option<&GridBundle>> {
        Ok(self.bundles.get(id))
    }
}

impl GridSource for HashMap<FileId, GridBundle> {
    fn lookup(&self, id: &FileId) -> Result<Option<&GridBundle>> {
        Ok(self.get(id))
    }
}
