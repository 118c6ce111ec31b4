//! Input discovery: expand files and directories into spreadsheet paths

use crate::decoder::InputFormat;
use crate::error::Result;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Expand `roots` into the list of spreadsheet files to load.
///
/// A root that is a file is kept as given, whatever its extension, so that
/// an unsupported file surfaces as a decode failure. Directories are walked
/// for supported extensions and their files sorted by path. Each path
/// appears once, at its first position.
pub fn discover_inputs<P: AsRef<Path>>(roots: &[P]) -> Result<Vec<PathBuf>> {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut inputs = Vec::new();

    for root in roots {
        let root = root.as_ref();

        let mut found: Vec<PathBuf> = if root.is_dir() {
            let mut files = Vec::new();
            for entry in WalkDir::new(root).follow_links(true) {
                let entry = entry?;
                if entry.file_type().is_file() && is_supported(entry.path()) {
                    files.push(entry.into_path());
                }
            }
            files.sort();
            files
        } else {
            vec![root.to_path_buf()]
        };

        found.retain(|p| seen.insert(p.clone()));
        inputs.extend(found);
    }

    Ok(inputs)
}

fn is_supported(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| !n.starts_with("~$") && InputFormat::from_name(n).is_some())
}
