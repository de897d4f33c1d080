//! File-level operations behind the CLI commands.
//!
//! Import is the full pipeline:
//!
//! ```text
//! incoming.yw7 ──read──▶ Project ──split──▶ Project ─┐
//!                                                    ├─merge──▶ Project ──write──▶ base.yw7
//! base.yw7     ──read──▶ Project ────────────────────┘
//! ```
//!
//! The incoming file plays the part of an edited external document: every
//! field it carries overwrites the base, and the base keeps everything else,
//! including elements the model does not manage.

use crate::config::ConverterConfig;
use crate::error::YwError;
use crate::merge::{MergeReport, merge};
use crate::model::Project;
use crate::splitter::Splitter;
use crate::yw7::Yw7File;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportOutcome {
    pub incoming: PathBuf,
    pub base: PathBuf,
    /// Whether dividers in the incoming text created chapters or scenes.
    pub split: bool,
    pub report: MergeReport,
    pub chapters: usize,
    pub scenes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitOutcome {
    pub path: PathBuf,
    pub changed: bool,
    pub chapters: usize,
    pub scenes: usize,
}

/// A project file found below a directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectEntry {
    pub path: PathBuf,
    pub locked: bool,
}

/// Read a project file.
pub fn read_project(path: &Path, config: &ConverterConfig) -> Result<Project, YwError> {
    Yw7File::new(path, config)?.read()
}

/// Merge `incoming` into `base` and write `base` back.
pub fn import(
    incoming: &Path,
    base: &Path,
    config: &ConverterConfig,
    split: bool,
) -> Result<ImportOutcome, YwError> {
    let mut source = read_project(incoming, config)?;
    let was_split = split && Splitter::new(&config.splitter, &config.messages).split(&mut source);

    let mut target_file = Yw7File::new(base, config)?;
    let mut target = target_file.read()?;
    let report = merge(&mut target, &source);
    target_file.write(&target)?;

    info!(
        incoming = %incoming.display(),
        base = %base.display(),
        split = was_split,
        "Imported project"
    );
    Ok(ImportOutcome {
        incoming: incoming.to_path_buf(),
        base: base.to_path_buf(),
        split: was_split,
        report,
        chapters: target.chapters.len(),
        scenes: target.scenes.len(),
    })
}

/// Split the scenes of a project file at their dividers, writing it back
/// only if anything changed.
pub fn split_file(path: &Path, config: &ConverterConfig) -> Result<SplitOutcome, YwError> {
    let mut file = Yw7File::new(path, config)?;
    let mut project = file.read()?;
    let changed = Splitter::new(&config.splitter, &config.messages).split(&mut project);
    if changed {
        file.write(&project)?;
    }
    Ok(SplitOutcome {
        path: path.to_path_buf(),
        changed,
        chapters: project.chapters.len(),
        scenes: project.scenes.len(),
    })
}

/// Project files below `dir`, sorted by path. Unreadable directories are
/// skipped with a warning.
pub fn find_projects(dir: &Path, config: &ConverterConfig) -> Vec<ProjectEntry> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| Yw7File::new(entry.path(), config).ok())
        .map(|file| ProjectEntry {
            path: file.path().to_path_buf(),
            locked: file.is_locked(),
        })
        .collect()
}
