//! Directory build: mirror a source tree of models into compiled `.nui` files

use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::compile::compile_file;
use crate::config::ExportConfig;
use crate::import::is_supported;

/// Outcome of one [`build_directory`] run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub compiled: usize,
    pub up_to_date: usize,
    pub failed: usize,
}

/// Path of the compiled output for `file`, mirrored from `source_root` into
/// `output_root` with the extension replaced.
pub fn output_path_for(
    source_root: &Path,
    output_root: &Path,
    file: &Path,
    extension: &str,
) -> Result<PathBuf> {
    let relative = file
        .strip_prefix(source_root)
        .with_context(|| format!("{} is not inside {}", file.display(), source_root.display()))?;
    Ok(output_root.join(relative).with_extension(extension))
}

/// True when `dest` is missing or strictly older than `source`
pub fn needs_rebuild(source: &Path, dest: &Path) -> io::Result<bool> {
    if !fs::exists(dest)? {
        return Ok(true);
    }

    let source_mtime = fs::metadata(source)?.modified()?;
    let dest_mtime = fs::metadata(dest)?.modified()?;

    Ok(dest_mtime < source_mtime)
}

/// Compile every stale model under `source` into `output`.
///
/// With `force` every recognised file is recompiled. A file that fails to
/// compile is logged and counted; the walk continues.
pub fn build_directory(
    source: &Path,
    output: &Path,
    config: &ExportConfig,
    force: bool,
) -> Result<BuildReport> {
    if !source.is_dir() {
        anyhow::bail!("Source directory not found: {}", source.display());
    }

    let mut report = BuildReport::default();

    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", source.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if !is_supported(path) {
            tracing::debug!("Skipping {} (unrecognised format)", path.display());
            continue;
        }

        let dest = output_path_for(source, output, path, &config.output_extension)?;

        if !force && !needs_rebuild(path, &dest)? {
            tracing::info!("Up to date: {}", dest.display());
            report.up_to_date += 1;
            continue;
        }

        match compile_one(path, &dest, config) {
            Ok(size) => {
                tracing::info!(
                    "Compiled {} -> {} ({} bytes)",
                    path.display(),
                    dest.display(),
                    size
                );
                report.compiled += 1;
            }
            Err(e) => {
                tracing::error!("Failed to compile {}: {:#}", path.display(), e);
                report.failed += 1;
            }
        }
    }

    tracing::info!(
        "Build finished: {} compiled, {} up to date, {} failed",
        report.compiled,
        report.up_to_date,
        report.failed
    );

    Ok(report)
}

fn compile_one(source: &Path, dest: &Path, config: &ExportConfig) -> Result<usize> {
    let bytes = compile_file(source, config)?;

    if let Some(dir) = dest.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    }
    fs::write(dest, &bytes).with_context(|| format!("Failed to write {}", dest.display()))?;

    Ok(bytes.len())
}
