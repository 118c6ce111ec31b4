//! gm-core: Core library for merging sheets from multiple spreadsheet files
//!
//! This library provides functionality to:
//! - Decode CSV and workbook files into raw sheet grids
//! - Hold per-sheet merge settings (inclusion, header row, data start row)
//! - Merge every configured sheet into one table, dropping empty rows
//! - Export the merged table as a workbook, CSV or JSON file
//! - Save and replay merge plans

pub mod cell;
pub mod config;
pub mod decoder;
pub mod error;
pub mod export;
pub mod filter;
pub mod grid;
pub mod merger;
pub mod plan;
pub mod scanner;
pub mod session;
pub mod settings;

pub use cell::CellValue;
pub use config::{ConfigStore, FileEntry, SheetConfig};
pub use decoder::{decode_bytes, decode_path, load_all, load_path, LoadReport, LoadedFile};
pub use error::{Error, Result};
pub use export::{export_file_name, export_table, ExportFormat};
pub use filter::is_empty_row;
pub use grid::{FileId, GridBundle, GridRepository, GridSource, Row, SheetGrid};
pub use merger::{merge, UnifiedTable};
pub use plan::{MergePlan, PlanFile, PlanSheet};
pub use scanner::discover_inputs;
pub use session::Session;
pub use settings::Settings;
