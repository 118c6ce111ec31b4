//! One in-memory working session: loaded files, their settings and the
//! last good merge result

use crate::config::ConfigStore;
use crate::decoder::{load_all, LoadReport, LoadedFile};
use crate::error::{Error, Result};
use crate::export::{export_table, ExportFormat};
use crate::grid::{FileId, GridRepository, GridSource};
use crate::merger::{merge, UnifiedTable};
use crate::settings::Settings;
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Configuration store, grid repository and merge result, kept together.
///
/// The result is only ever replaced by a successful merge.
#[derive(Debug, Default)]
pub struct Session {
    settings: Settings,
    store: ConfigStore,
    grids: GridRepository,
    sources: HashMap<FileId, PathBuf>,
    result: Option<UnifiedTable>,
}

impl Session {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn grids(&self) -> &GridRepository {
        &self.grids
    }

    /// Register a decoded file at the end of the merge order
    pub fn add_loaded(&mut self, file: LoadedFile) -> FileId {
        let id = file.entry.id;
        if let Some(path) = file.path {
            self.sources.insert(id, path);
        }
        self.grids.insert(id, file.grids);
        self.store.add(file.entry);
        id
    }

    /// Decode `paths` and register every file that loads.
    ///
    /// Returns the ids of the new files, in input order.
    pub fn load_paths<P: AsRef<Path> + Sync>(&mut self, paths: &[P]) -> (Vec<FileId>, Vec<(PathBuf, Error)>) {
        let LoadReport { loaded, failures } = load_all(paths, &self.settings);
        let ids = loaded.into_iter().map(|(_, f)| self.add_loaded(f)).collect();
        (ids, failures)
    }

    /// Path a loaded file was read from
    pub fn source_path(&self, id: &FileId) -> Option<&Path> {
        self.sources.get(id).map(PathBuf::as_path)
    }

    pub fn toggle_sheet(&mut self, id: &FileId, sheet: &str) -> Result<bool> {
        self.store.toggle_sheet(id, sheet)
    }

    pub fn set_sheet_enabled(&mut self, id: &FileId, sheet: &str, enabled: bool) -> Result<()> {
        self.store.set_sheet_enabled(id, sheet, enabled)
    }

    pub fn set_header_row(&mut self, id: &FileId, sheet: &str, row: usize) -> Result<usize> {
        self.store.set_header_row(id, sheet, row)
    }

    pub fn set_data_start_row(&mut self, id: &FileId, sheet: &str, row: usize) -> Result<usize> {
        self.store.set_data_start_row(id, sheet, row)
    }

    /// Drop a file and its grids. The held result is discarded once one
    /// file or fewer remains.
    pub fn remove_file(&mut self, id: &FileId) -> Result<()> {
        let entry = self.store.remove_file(id)?;
        self.grids.remove(id);
        self.sources.remove(id);
        if self.store.len() <= 1 {
            self.result = None;
        }
        info!(file = %entry.name, remaining = self.store.len(), "removed file");
        Ok(())
    }

    /// Merge all loaded files and keep the result.
    ///
    /// On any failure the previous result stays in place.
    pub fn run_merge(&mut self) -> Result<&UnifiedTable> {
        let table = merge_store(&self.store, &self.grids)?;
        Ok(self.result.insert(table))
    }

    /// Like [`Session::run_merge`], reading grids from `grids` instead of
    /// the session's own repository.
    pub fn run_merge_with<G: GridSource + ?Sized>(&mut self, grids: &G) -> Result<&UnifiedTable> {
        let table = merge_store(&self.store, grids)?;
        Ok(self.result.insert(table))
    }

    /// Last successful merge result
    pub fn result(&self) -> Option<&UnifiedTable> {
        self.result.as_ref()
    }

    pub fn clear_result(&mut self) {
        self.result = None;
    }

    /// Export the held result into `dir` using the session label
    pub fn export<P: AsRef<Path>>(&self, dir: P, format: ExportFormat, now: NaiveDateTime) -> Result<PathBuf> {
        let table = self.result.as_ref().ok_or(Error::NoResult)?;
        export_table(table, dir, &self.settings.label, format, now)
    }
}

fn merge_store<G: GridSource + ?Sized>(store: &ConfigStore, grids: &G) -> Result<UnifiedTable> {
    if store.is_empty() {
        return Err(Error::NoFiles);
    }

    let table = merge(store.files(), grids).map_err(|e| {
        warn!(error = %e, "merge failed");
        Error::MergeFailed(Box::new(e))
    })?;

    if table.is_empty() {
        warn!("merge produced no rows");
        return Err(Error::EmptyResult);
    }
    Ok(table)
}
