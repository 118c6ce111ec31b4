//! Writing a merged table out as a workbook, CSV or JSON file

use crate::cell::CellValue;
use crate::error::{Error, Result};
use crate::merger::UnifiedTable;
use chrono::NaiveDateTime;
use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

/// Name of the single worksheet in exported workbooks
pub const EXPORT_SHEET_NAME: &str = "MergedResults";

/// Output file format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Xlsx,
    Csv,
    Json,
}

impl ExportFormat {
    /// File extension, without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "xlsx" => Ok(ExportFormat::Xlsx),
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            _ => Err(Error::UnknownFormat(s.to_string())),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// `<label>_<YYYYMMDD>_<HHmm>`, without extension
pub fn export_file_name(label: &str, now: NaiveDateTime) -> String {
    format!("{}_{}", label, now.format("%Y%m%d_%H%M"))
}

/// Write `table` into `dir` under a timestamped name and return the path
pub fn export_table<P: AsRef<Path>>(
    table: &UnifiedTable,
    dir: P,
    label: &str,
    format: ExportFormat,
    now: NaiveDateTime,
) -> Result<PathBuf> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let path = dir.join(format!("{}.{}", export_file_name(label, now), format.extension()));

    match format {
        ExportFormat::Xlsx => write_xlsx(table, &path)?,
        ExportFormat::Csv => {
            let file = File::create(&path)?;
            write_csv(table, BufWriter::new(file), &path.display().to_string())?;
        }
        ExportFormat::Json => {
            let mut writer = BufWriter::new(File::create(&path)?);
            write_json(table, &mut writer)?;
            writer.flush()?;
        }
    }

    info!(path = %path.display(), rows = table.row_count(), "exported merge result");
    Ok(path)
}

/// Save `table` as a one-sheet workbook: headers in row 1, data below
pub fn write_xlsx<P: AsRef<Path>>(table: &UnifiedTable, path: P) -> Result<()> {
    let path = path.as_ref();
    let encode_err = |e: XlsxError| Error::Encode {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(EXPORT_SHEET_NAME).map_err(encode_err)?;
    fill_worksheet(worksheet, table).map_err(encode_err)?;
    workbook.save(path).map_err(encode_err)?;
    Ok(())
}

fn fill_worksheet(worksheet: &mut Worksheet, table: &UnifiedTable) -> std::result::Result<(), XlsxError> {
    for (col_idx, header) in table.headers.iter().enumerate() {
        worksheet.write_string(0, column_number(col_idx)?, header)?;
    }

    for (row_idx, row) in table.rows.iter().enumerate() {
        let row_num = u32::try_from(row_idx + 1).map_err(|_| XlsxError::RowColumnLimitError)?;
        for (col_idx, cell) in row.iter().enumerate() {
            let col_num = column_number(col_idx)?;
            match cell {
                CellValue::Empty => {} // Leave empty
                CellValue::Boolean(b) => {
                    worksheet.write_boolean(row_num, col_num, *b)?;
                }
                CellValue::Number(n) if n.is_finite() => {
                    worksheet.write_number(row_num, col_num, *n)?;
                }
                CellValue::Number(_) | CellValue::Text(_) => {
                    worksheet.write_string(row_num, col_num, cell.render())?;
                }
            }
        }
    }
    Ok(())
}

fn column_number(idx: usize) -> std::result::Result<u16, XlsxError> {
    u16::try_from(idx).map_err(|_| XlsxError::RowColumnLimitError)
}

/// Write `table` as CSV. Rows keep their own width and a table without
/// headers starts with a blank line.
pub fn write_csv<W: Write>(table: &UnifiedTable, writer: W, name: &str) -> Result<()> {
    let csv_err = |e: csv::Error| Error::Csv {
        name: name.to_string(),
        source: e,
    };

    let mut writer = writer;
    if table.headers.is_empty() {
        // csv writes a zero-field record as `""`
        writer.write_all(b"\n")?;
    }
    let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(writer);
    if !table.headers.is_empty() {
        writer.write_record(&table.headers).map_err(csv_err)?;
    }
    for row in &table.rows {
        writer
            .write_record(row.iter().map(CellValue::render))
            .map_err(csv_err)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write `table` as pretty-printed JSON
pub fn write_json<W: Write>(table: &UnifiedTable, writer: W) -> Result<()> {
    serde_json::to_writer_pretty(writer, table)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> UnifiedTable {
        UnifiedTable {
            headers: vec!["Name".to_string(), "Age".to_string()],
            rows: vec![
                vec![CellValue::from("Al, Jr."), CellValue::Number(30.0)],
                vec![CellValue::from("Bo")],
                vec![CellValue::Empty, CellValue::Boolean(true), CellValue::from("x")],
            ],
        }
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 7)
            .unwrap()
            .and_hms_opt(h, m, 59)
            .unwrap()
    }

    #[test]
    fn test_export_file_name() {
        assert_eq!(export_file_name("merged_report", at(9, 5)), "merged_report_20240307_0905");
        assert_eq!(export_file_name("q", at(23, 59)), "q_20240307_2359");
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("XLSX".parse::<ExportFormat>().unwrap(), ExportFormat::Xlsx);
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert!(matches!(
            "pdf".parse::<ExportFormat>(),
            Err(Error::UnknownFormat(_))
        ));
    }

    #[test]
    fn test_write_csv_ragged() {
        let mut out = Vec::new();
        write_csv(&sample(), &mut out, "mem").unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "Name,Age\n\"Al, Jr.\",30\nBo\n,true,x\n");
    }

    #[test]
    fn test_write_csv_without_headers() {
        let table = UnifiedTable {
            headers: Vec::new(),
            rows: vec![vec![CellValue::from("x")], vec![CellValue::Number(1e21)]],
        };
        let mut out = Vec::new();
        write_csv(&table, &mut out, "mem").unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "\nx\n1e+21\n");
    }

    #[test]
    fn test_write_json() {
        let mut out = Vec::new();
        write_json(&sample(), &mut out).unwrap();
        let back: UnifiedTable = serde_json::from_slice(&out).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn test_export_table_names_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested");

        let path = export_table(&sample(), &out, "report", ExportFormat::Xlsx, at(14, 30)).unwrap();
        assert_eq!(path, out.join("report_20240307_1430.xlsx"));
        assert!(path.exists());

        let path = export_table(&sample(), &out, "report", ExportFormat::Csv, at(14, 31)).unwrap();
        assert_eq!(path.file_name().unwrap(), "report_20240307_1431.csv");
    }
}
