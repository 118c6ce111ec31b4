//! Merge plans: saved per-sheet settings for a set of input files
//!
//! A plan is a JSON file listing input paths and how each of their sheets
//! takes part in the merge, so a configuration can be replayed without
//! editing it again.

use crate::decoder::load_all;
use crate::error::{Error, Result};
use crate::grid::FileId;
use crate::session::Session;
use crate::settings::Settings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Settings for one sheet within a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSheet {
    /// Sheet name
    pub name: String,
    /// Whether the sheet is merged
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// 1-based header row
    pub header_row: usize,
    /// 1-based data start row
    pub data_start_row: usize,
}

fn default_enabled() -> bool {
    true
}

/// One input file within a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanFile {
    /// Path to the file, relative paths resolve against the plan's directory
    pub path: PathBuf,
    /// Disable sheets that are not listed
    #[serde(default)]
    pub strict: bool,
    /// Per-sheet settings
    #[serde(default)]
    pub sheets: Vec<PlanSheet>,
}

impl PlanFile {
    /// Apply this entry's sheet settings to a loaded file
    pub fn apply(&self, session: &mut Session, id: &FileId) -> Result<()> {
        let entry = session
            .store()
            .file(id)
            .ok_or_else(|| Error::FileNotFound(id.to_string()))?;
        let file_name = entry.name.clone();
        let sheet_names: Vec<String> = entry.sheets.iter().map(|s| s.name.clone()).collect();

        for sheet in &self.sheets {
            if !sheet_names.contains(&sheet.name) {
                warn!(file = %file_name, sheet = %sheet.name, "plan names a sheet the file does not have");
                continue;
            }
            session.set_sheet_enabled(id, &sheet.name, sheet.enabled)?;
            session.set_header_row(id, &sheet.name, sheet.header_row)?;
            session.set_data_start_row(id, &sheet.name, sheet.data_start_row)?;
        }

        if self.strict {
            for name in &sheet_names {
                if !self.sheets.iter().any(|s| &s.name == name) {
                    session.set_sheet_enabled(id, name, false)?;
                }
            }
        }
        Ok(())
    }
}

/// A saved merge configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergePlan {
    /// Session settings (label, defaults)
    #[serde(default)]
    pub settings: Settings,
    /// Input files in merge order
    pub files: Vec<PlanFile>,
}

impl MergePlan {
    /// Load a plan from JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save the plan to JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Capture the current settings of every file in `session` that was read from disk
    pub fn from_session(session: &Session) -> Self {
        let files = session
            .store()
            .files()
            .iter()
            .filter_map(|entry| {
                let path = session.source_path(&entry.id)?;
                Some(PlanFile {
                    path: path.to_path_buf(),
                    strict: false,
                    sheets: entry
                        .sheets
                        .iter()
                        .map(|s| PlanSheet {
                            name: s.name.clone(),
                            enabled: s.enabled,
                            header_row: s.header_row,
                            data_start_row: s.data_start_row,
                        })
                        .collect(),
                })
            })
            .collect();

        Self {
            settings: session.settings().clone(),
            files,
        }
    }

    /// Load every listed file into a new session and apply its settings.
    ///
    /// Files that fail to load are returned alongside the session.
    pub fn build_session<P: AsRef<Path>>(&self, base_dir: P) -> Result<(Session, Vec<(PathBuf, Error)>)> {
        let base_dir = base_dir.as_ref();
        let paths: Vec<PathBuf> = self
            .files
            .iter()
            .map(|f| base_dir.join(&f.path))
            .collect();

        let mut session = Session::new(self.settings.clone());
        let report = load_all(&paths, session.settings());

        for (idx, loaded) in report.loaded {
            let id = session.add_loaded(loaded);
            self.files[idx].apply(&mut session, &id)?;
        }

        Ok((session, report.failures))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellValue;
    use crate::decoder::LoadedFile;
    use crate::grid::{GridBundle, SheetGrid};

    fn two_sheet_session() -> (Session, FileId) {
        let bundle: GridBundle = vec![
            ("Summary", SheetGrid::new(vec![vec![CellValue::from("x")]])),
            ("Data", SheetGrid::new(vec![vec![CellValue::from("y")]])),
        ]
        .into_iter()
        .collect();
        let mut session = Session::default();
        let id = session.add_loaded(LoadedFile::from_bundle("book.xlsx", bundle, &Settings::default()));
        (session, id)
    }

    #[test]
    fn test_plan_parse_defaults() {
        let json = r#"{
            "files": [
                { "path": "a.xlsx", "sheets": [ { "name": "S", "header_row": 3, "data_start_row": 4 } ] }
            ]
        }"#;
        let plan: MergePlan = serde_json::from_str(json).unwrap();
        assert_eq!(plan.settings, Settings::default());
        assert!(!plan.files[0].strict);
        assert!(plan.files[0].sheets[0].enabled);
        assert_eq!(plan.files[0].sheets[0].header_row, 3);
    }

    #[test]
    fn test_apply_sets_rows_and_skips_unknown() {
        let (mut session, id) = two_sheet_session();
        let plan_file = PlanFile {
            path: PathBuf::from("book.xlsx"),
            strict: false,
            sheets: vec![
                PlanSheet {
                    name: "Data".to_string(),
                    enabled: true,
                    header_row: 0,
                    data_start_row: 6,
                },
                PlanSheet {
                    name: "Ghost".to_string(),
                    enabled: true,
                    header_row: 1,
                    data_start_row: 2,
                },
            ],
        };

        plan_file.apply(&mut session, &id).unwrap();
        let entry = session.store().file(&id).unwrap();
        let data = entry.sheet("Data").unwrap();
        assert_eq!((data.header_row, data.data_start_row), (1, 6));
        assert!(entry.sheet("Summary").unwrap().enabled);
    }

    #[test]
    fn test_strict_disables_unlisted() {
        let (mut session, id) = two_sheet_session();
        let plan_file = PlanFile {
            path: PathBuf::from("book.xlsx"),
            strict: true,
            sheets: vec![PlanSheet {
                name: "Data".to_string(),
                enabled: true,
                header_row: 1,
                data_start_row: 2,
            }],
        };

        plan_file.apply(&mut session, &id).unwrap();
        assert_eq!(session.store().selected_sheets(), vec![("book.xlsx", "Data")]);
    }

    #[test]
    fn test_save_load_and_build_session() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.csv"), "Title\nName\nAl\n").unwrap();

        let plan = MergePlan {
            settings: Settings::default(),
            files: vec![
                PlanFile {
                    path: PathBuf::from("a.csv"),
                    strict: false,
                    sheets: vec![PlanSheet {
                        name: "Sheet1".to_string(),
                        enabled: true,
                        header_row: 2,
                        data_start_row: 3,
                    }],
                },
                PlanFile {
                    path: PathBuf::from("missing.csv"),
                    strict: false,
                    sheets: Vec::new(),
                },
            ],
        };
        let plan_path = dir.path().join("plan.json");
        plan.save(&plan_path).unwrap();
        let loaded = MergePlan::load(&plan_path).unwrap();
        assert_eq!(loaded, plan);

        let (mut session, failures) = loaded.build_session(dir.path()).unwrap();
        assert_eq!(failures.len(), 1);
        let table = session.run_merge().unwrap();
        assert_eq!(table.headers, vec!["Name"]);
        assert_eq!(table.rows, vec![vec![CellValue::from("Al")]]);

        let captured = MergePlan::from_session(&session);
        assert_eq!(captured.files.len(), 1);
        assert_eq!(captured.files[0].path, dir.path().join("a.csv"));
        assert_eq!(captured.files[0].sheets[0].header_row, 2);
    }

    #[test]
    fn test_same_path_listed_twice_keeps_each_window() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.csv"), "Name\nAl\nBo\nCy\n").unwrap();

        let window = |data_start_row| PlanFile {
            path: PathBuf::from("a.csv"),
            strict: false,
            sheets: vec![PlanSheet {
                name: "Sheet1".to_string(),
                enabled: true,
                header_row: 1,
                data_start_row,
            }],
        };
        let plan = MergePlan {
            settings: Settings::default(),
            files: vec![window(2), window(4)],
        };

        let (mut session, failures) = plan.build_session(dir.path()).unwrap();
        assert!(failures.is_empty());
        let starts: Vec<usize> = session
            .store()
            .files()
            .iter()
            .map(|f| f.sheet("Sheet1").unwrap().data_start_row)
            .collect();
        assert_eq!(starts, vec![2, 4]);

        let table = session.run_merge().unwrap();
        let names: Vec<String> = table.rows.iter().map(|r| r[0].render()).collect();
        assert_eq!(names, vec!["Al", "Bo", "Cy", "Cy"]);
    }
}
