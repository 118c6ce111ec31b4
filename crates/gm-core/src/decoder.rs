//! Decoding spreadsheet files into grid bundles

use crate::cell::CellValue;
use crate::config::{FileEntry, SheetConfig};
use crate::error::{Error, Result};
use crate::grid::{FileId, GridBundle, Row, SheetGrid};
use crate::settings::Settings;
use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Sheet name given to the single sheet of a CSV file
pub const CSV_SHEET_NAME: &str = "Sheet1";

/// Spreadsheet formats we can decode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    /// Anything calamine reads: xlsx, xlsm, xlsb, xls, ods
    Workbook,
}

impl InputFormat {
    /// Detect the format from a file name's extension
    pub fn from_name(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(InputFormat::Csv),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(InputFormat::Workbook),
            _ => None,
        }
    }
}

/// Decode raw file bytes. `name` selects the format by extension.
pub fn decode_bytes(name: &str, bytes: Vec<u8>) -> Result<GridBundle> {
    match InputFormat::from_name(name) {
        Some(InputFormat::Csv) => decode_csv(name, &bytes),
        Some(InputFormat::Workbook) => decode_workbook(name, bytes),
        None => Err(Error::UnsupportedFormat {
            name: name.to_string(),
        }),
    }
}

/// Read and decode a file from disk
pub fn decode_path<P: AsRef<Path>>(path: P) -> Result<GridBundle> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    decode_bytes(&display_name(path), bytes)
}

fn decode_workbook(name: &str, bytes: Vec<u8>) -> Result<GridBundle> {
    let decode_err = |e: calamine::Error| Error::Decode {
        name: name.to_string(),
        message: e.to_string(),
    };

    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(decode_err)?;

    let mut bundle = GridBundle::new();
    for sheet_name in workbook.sheet_names() {
        let range = workbook.worksheet_range(&sheet_name).map_err(decode_err)?;
        bundle.insert(sheet_name, range_to_grid(&range));
    }

    debug!(file = name, sheets = bundle.len(), "decoded workbook");
    Ok(bundle)
}

/// Convert a calamine range into a grid addressed from A1.
///
/// calamine ranges start at the first used cell, so leading rows and
/// columns are padded back in to keep row numbers aligned with the sheet.
fn range_to_grid(range: &Range<Data>) -> SheetGrid {
    let Some((start_row, start_col)) = range.start() else {
        return SheetGrid::default();
    };

    let mut rows: Vec<Row> = vec![Vec::new(); start_row as usize];
    for row in range.rows() {
        let mut cells = vec![CellValue::Empty; start_col as usize];
        cells.extend(row.iter().map(data_to_cell_value));
        rows.push(cells);
    }
    SheetGrid::new(rows)
}

/// Convert calamine Data to CellValue
fn data_to_cell_value(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::Bool(b) => CellValue::Boolean(*b),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::Text(s.clone()),
        // Excel serial date, days since 1899-12-30
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(format!("#ERROR:{e}")),
    }
}

fn decode_csv(name: &str, bytes: &[u8]) -> Result<GridBundle> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true) // Allow varying number of fields
        .from_reader(bytes);

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| Error::Csv {
            name: name.to_string(),
            source: e,
        })?;
        rows.push(record.iter().map(CellValue::parse_text).collect());
    }

    let mut bundle = GridBundle::new();
    bundle.insert(CSV_SHEET_NAME, SheetGrid::new(rows));
    Ok(bundle)
}

/// A decoded file: its configuration entry plus its full grids
#[derive(Debug, Clone)]
pub struct LoadedFile {
    pub entry: FileEntry,
    pub grids: GridBundle,
    /// Where the file was read from, if it came from disk
    pub path: Option<PathBuf>,
}

impl LoadedFile {
    /// Build a fresh entry for `grids` with a new id and default sheet settings
    pub fn from_bundle(name: impl Into<String>, grids: GridBundle, settings: &Settings) -> Self {
        let sheets = grids
            .sheets()
            .map(|(sheet_name, grid)| {
                SheetConfig::new(sheet_name, settings.header_row(), settings.data_start_row())
                    .with_preview(grid.preview(settings.preview_rows))
            })
            .collect();

        Self {
            entry: FileEntry::new(FileId::new(), name, sheets),
            grids,
            path: None,
        }
    }
}

/// Read, decode and configure one file
pub fn load_path<P: AsRef<Path>>(path: P, settings: &Settings) -> Result<LoadedFile> {
    let path = path.as_ref();
    let metadata = fs::metadata(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let grids = decode_path(path)?;
    let mut loaded = LoadedFile::from_bundle(display_name(path), grids, settings);
    loaded.entry.size = metadata.len();
    loaded.entry.last_modified = metadata.modified().ok().map(DateTime::<Utc>::from);
    loaded.path = Some(path.to_path_buf());
    Ok(loaded)
}

/// Outcome of loading several files
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Files that decoded, in input order, with their index in the input
    pub loaded: Vec<(usize, LoadedFile)>,
    /// Files that failed, in input order
    pub failures: Vec<(PathBuf, Error)>,
}

/// Load several files concurrently. A failing file never affects the others.
pub fn load_all<P: AsRef<Path> + Sync>(paths: &[P], settings: &Settings) -> LoadReport {
    let results: Vec<(PathBuf, Result<LoadedFile>)> = paths
        .par_iter()
        .map(|p| (p.as_ref().to_path_buf(), load_path(p, settings)))
        .collect();

    let mut report = LoadReport::default();
    for (idx, (path, result)) in results.into_iter().enumerate() {
        match result {
            Ok(file) => report.loaded.push((idx, file)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load file");
                report.failures.push((path, e));
            }
        }
    }
    report
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(InputFormat::from_name("a.CSV"), Some(InputFormat::Csv));
        assert_eq!(InputFormat::from_name("b.xlsx"), Some(InputFormat::Workbook));
        assert_eq!(InputFormat::from_name("c.ods"), Some(InputFormat::Workbook));
        assert_eq!(InputFormat::from_name("d.txt"), None);
        assert_eq!(InputFormat::from_name("noext"), None);
    }

    #[test]
    fn test_decode_csv_ragged() {
        let csv = "\u{feff}Name,Age\nAl,30\nBo\n,,\n";
        let bundle = decode_bytes("people.csv", csv.as_bytes().to_vec()).unwrap();
        let grid = bundle.sheet(CSV_SHEET_NAME).unwrap();

        assert_eq!(grid.row_count(), 4);
        assert_eq!(grid.rows[0], vec![CellValue::from("Name"), CellValue::from("Age")]);
        assert_eq!(grid.rows[1][1], CellValue::Number(30.0));
        assert_eq!(grid.rows[2].len(), 1);
        assert_eq!(grid.rows[3], vec![CellValue::Empty; 3]);
    }

    #[test]
    fn test_unsupported_format() {
        let err = decode_bytes("notes.txt", b"hi".to_vec()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_corrupt_workbook_is_decode_error() {
        let err = decode_bytes("broken.xlsx", b"not a zip".to_vec()).unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn test_range_padding() {
        let mut range: Range<Data> = Range::new((2, 1), (3, 2));
        range.set_value((2, 1), Data::String("H".to_string()));
        range.set_value((3, 2), Data::Int(7));

        let grid = range_to_grid(&range);
        assert_eq!(grid.row_count(), 4);
        assert!(grid.rows[0].is_empty());
        assert_eq!(grid.rows[2], vec![CellValue::Empty, CellValue::from("H"), CellValue::Empty]);
        assert_eq!(grid.rows[3][2], CellValue::Number(7.0));
    }

    #[test]
    fn test_from_bundle_defaults() {
        let rows: Vec<Row> = (0..15).map(|i| vec![CellValue::from(i as i64)]).collect();
        let bundle: GridBundle = vec![("Data", SheetGrid::new(rows))].into_iter().collect();

        let loaded = LoadedFile::from_bundle("x.xlsx", bundle, &Settings::default());
        let sheet = &loaded.entry.sheets[0];
        assert_eq!(sheet.name, "Data");
        assert!(sheet.enabled);
        assert_eq!((sheet.header_row, sheet.data_start_row), (1, 2));
        assert_eq!(sheet.preview_rows.len(), 10);
    }

    #[test]
    fn test_load_all_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.csv");
        fs::write(&good, "A\n1\n").unwrap();
        let missing = dir.path().join("missing.csv");
        let bad = dir.path().join("bad.xlsx");
        fs::write(&bad, "garbage").unwrap();

        let report = load_all(&[missing.clone(), good.clone(), bad.clone()], &Settings::default());
        assert_eq!(report.loaded.len(), 1);
        let (idx, file) = &report.loaded[0];
        assert_eq!(*idx, 0);
        assert_eq!(file.entry.name, "good.csv");
        assert_eq!(file.entry.size, 4);
        assert!(file.entry.last_modified.is_some());
        let failed: Vec<&PathBuf> = report.failures.iter().map(|(p, _)| p).collect();
        assert_eq!(failed, vec![&missing, &bad]);
    }
}
