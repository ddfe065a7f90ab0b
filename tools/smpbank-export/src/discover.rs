//! Input discovery
//!
//! The bank layout depends on sample order, so discovery never trusts the
//! platform's directory listing order: sources are sorted lexicographically by
//! file name (byte order on Unix). Only the top level of the input directory
//! is scanned.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::ExportError;

/// One input file and the sample name derived from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// File stem, e.g. `kick` for `kick.wav`
    pub name: String,
    pub path: PathBuf,
}

/// List input files in bank order
pub fn discover_sources(dir: &Path, extensions: &[String]) -> Result<Vec<SourceFile>, ExportError> {
    let mut sources = Vec::new();

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();

    for entry in walker {
        let entry = entry.map_err(|err| {
            let path = err.path().unwrap_or(dir).to_path_buf();
            ExportError::io(path, err.into())
        })?;

        if !entry.file_type().is_file() || !has_extension(entry.path(), extensions) {
            continue;
        }

        let name = entry
            .path()
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        sources.push(SourceFile {
            name,
            path: entry.into_path(),
        });
    }

    Ok(sources)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            extensions
                .iter()
                .any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(ext))
        })
}
