//! Merge engine for combining configured sheets into one table

use crate::cell::CellValue;
use crate::config::{FileEntry, SheetConfig};
use crate::error::Result;
use crate::filter::is_empty_row;
use crate::grid::{GridSource, Row, SheetGrid};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// The single table produced by a merge
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnifiedTable {
    /// Trimmed header row of the first sheet that had one
    pub headers: Vec<String>,
    /// Surviving data rows, unmodified, in file/sheet/row order
    pub rows: Vec<Row>,
}

impl UnifiedTable {
    /// Get the number of data rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Get the number of header columns. Rows may be wider or narrower.
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Widest row or header, whichever is larger
    pub fn max_width(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.headers.len()))
            .max()
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell by position; `None` past the end of a short row
    pub fn cell(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.rows.get(row).and_then(|r| r.get(col))
    }
}

/// Merge every enabled sheet of `files` into one table.
///
/// Files whose grids are not retained, disabled or missing sheets, and
/// sheets whose header row lies outside the grid all contribute nothing.
/// Only an error from `grids` fails the merge.
pub fn merge<G: GridSource + ?Sized>(files: &[FileEntry], grids: &G) -> Result<UnifiedTable> {
    let mut headers: Vec<String> = Vec::new();
    let mut rows: Vec<Row> = Vec::new();

    for file in files {
        let Some(bundle) = grids.lookup(&file.id)? else {
            debug!(file = %file.name, "grids not retained, skipping file");
            continue;
        };

        for sheet in &file.sheets {
            if !sheet.enabled {
                debug!(file = %file.name, sheet = %sheet.name, "sheet disabled");
                continue;
            }

            let Some(grid) = bundle.sheet(&sheet.name) else {
                debug!(file = %file.name, sheet = %sheet.name, "sheet missing from grid bundle");
                continue;
            };

            let Some(header) = header_row(sheet, grid) else {
                debug!(
                    file = %file.name,
                    sheet = %sheet.name,
                    header_row = sheet.header_row,
                    row_count = grid.row_count(),
                    "header row out of range"
                );
                continue;
            };

            if headers.is_empty() {
                headers = header.iter().map(CellValue::header_text).collect();
            }

            let before = rows.len();
            rows.extend(
                data_rows(sheet, grid)
                    .iter()
                    .filter(|row| !is_empty_row(row))
                    .cloned(),
            );
            debug!(
                file = %file.name,
                sheet = %sheet.name,
                rows = rows.len() - before,
                "sheet merged"
            );
        }
    }

    info!(columns = headers.len(), rows = rows.len(), "merge complete");
    Ok(UnifiedTable { headers, rows })
}

/// The configured header row, if it exists in the grid
fn header_row<'a>(sheet: &SheetConfig, grid: &'a SheetGrid) -> Option<&'a Row> {
    sheet.header_row.checked_sub(1).and_then(|idx| grid.row(idx))
}

/// Rows from the configured data start row to the end, empty when past the end
fn data_rows<'a>(sheet: &SheetConfig, grid: &'a SheetGrid) -> &'a [Row] {
    let start = sheet.data_start_row.saturating_sub(1);
    grid.rows.get(start..).unwrap_or(&[])
}
