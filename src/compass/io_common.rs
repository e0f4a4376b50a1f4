use std::fs;
use std::path::{Path, PathBuf};

use snafu::ResultExt;

use crate::compass::{CompassResult, WritingFileSnafu};

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// Paths in the configuration are relative to the configuration file.
pub fn resolve_path(root: &Path, path: &str) -> String {
    let p: PathBuf = root.join(path);
    p.as_path().display().to_string()
}

/// Writes the file next to its destination first, then moves it in place.
/// Readers of `path` see either the old content or the new one.
pub fn write_atomically(path: &str, contents: &str) -> CompassResult<()> {
    let tmp_path = format!("{}.tmp", path);
    fs::write(&tmp_path, contents).context(WritingFileSnafu { path: &tmp_path })?;
    fs::rename(&tmp_path, path).context(WritingFileSnafu { path })?;
    Ok(())
}

/// Pairs the cells of a row with the headers. Missing cells are empty, cells
/// without a header are dropped.
pub fn zip_row(headers: &[String], cells: &[String]) -> Vec<(String, String)> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, h)| (h.clone(), cells.get(idx).cloned().unwrap_or_default()))
        .collect()
}
