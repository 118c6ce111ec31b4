//! Row emptiness test used by the merge engine

use crate::cell::CellValue;

/// A row is empty when it has no cells or every cell is blank.
///
/// `0`, `false` make a row non-empty; whitespace-only text does not.
pub fn is_empty_row(row: &[CellValue]) -> bool {
    row.iter().all(CellValue::is_blank)
}
