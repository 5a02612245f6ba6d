use std::collections::HashSet;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tower_lsp::lsp_types::Url;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::WorkspaceError;
use crate::types::{Config, SourceText};

/// Include/exclude glob matching for declaration sources
#[derive(Debug, Clone)]
pub struct SourceMatcher {
    lookup: GlobSet,
    ignore: GlobSet,
}

impl SourceMatcher {
    pub fn from_config(config: &Config) -> Result<Self, WorkspaceError> {
        Ok(Self {
            lookup: build_glob_set("lookup", &config.lookup_files)?,
            ignore: build_glob_set("ignore", &config.ignore_globs)?,
        })
    }

    /// Whether a path relative to a workspace root is a declaration source
    pub fn matches_relative(&self, relative: &Path) -> bool {
        let path_str = relative.to_string_lossy();
        !self.ignore.is_match(&*path_str) && self.lookup.is_match(&*path_str)
    }

    /// Whether every file below a directory (relative to its root) is ignored
    pub fn is_ignored_dir(&self, relative: &Path) -> bool {
        let dir = format!("{}/", relative.to_string_lossy());
        self.ignore.is_match(dir.as_str())
    }

    /// Whether `path` is a declaration source under any of `roots`
    pub fn matches(&self, path: &Path, roots: &[PathBuf]) -> bool {
        roots.iter().any(|root| {
            path.strip_prefix(root)
                .map(|relative| self.matches_relative(relative))
                .unwrap_or(false)
        })
    }
}

fn build_glob_set(kind: &'static str, patterns: &[String]) -> Result<GlobSet, WorkspaceError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        match Glob::new(pattern) {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(e) => warn!(%pattern, error = %e, "skipping invalid {kind} glob"),
        }
    }
    builder
        .build()
        .map_err(|source| WorkspaceError::GlobSet { kind, source })
}

/// Walk workspace folders and list matching files in discovery order.
///
/// Folders are visited in the given order and entries within a folder are
/// sorted by file name, so the order is stable across runs. Ignored
/// directories are pruned without being entered.
pub fn discover_sources(folders: &[PathBuf], matcher: &SourceMatcher) -> Vec<PathBuf> {
    let mut all_files = Vec::new();
    let mut seen = HashSet::new();

    for folder_path in folders {
        let walker = WalkDir::new(folder_path)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                if entry.depth() == 0 || !entry.file_type().is_dir() {
                    return true;
                }
                entry
                    .path()
                    .strip_prefix(folder_path)
                    .map(|relative| !matcher.is_ignored_dir(relative))
                    .unwrap_or(true)
            });

        for entry in walker.filter_map(|e| e.ok()) {
            // Skip if not a file
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let relative = match path.strip_prefix(folder_path) {
                Ok(rel) => rel,
                Err(_) => continue,
            };

            if matcher.matches_relative(relative) && seen.insert(path.to_path_buf()) {
                all_files.push(path.to_path_buf());
            }
        }
    }

    all_files
}

/// Scan workspace folders for declaration sources and read them.
///
/// Files are read concurrently; results are joined back in discovery order so
/// first-wins merges stay reproducible. Unreadable files are skipped.
pub async fn scan_workspace(
    folders: Vec<Url>,
    config: &Config,
    mut on_progress: impl FnMut(usize, usize),
) -> Result<Vec<SourceText>, WorkspaceError> {
    let matcher = SourceMatcher::from_config(config)?;

    let mut roots = Vec::new();
    for folder in folders {
        let path = folder
            .to_file_path()
            .map_err(|_| WorkspaceError::NotAFileUri(folder.to_string()))?;
        roots.push(path);
    }

    let files = tokio::task::spawn_blocking(move || discover_sources(&roots, &matcher))
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, "workspace walk task failed");
            Vec::new()
        });

    let total = files.len();
    let handles: Vec<_> = files
        .into_iter()
        .map(|path| {
            tokio::spawn(async move {
                let text = tokio::fs::read_to_string(&path).await;
                (path, text)
            })
        })
        .collect();

    let mut sources = Vec::with_capacity(total);
    for (i, handle) in handles.into_iter().enumerate() {
        on_progress(i + 1, total);

        let (path, text) = match handle.await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "source read task failed");
                continue;
            }
        };

        let text = match text {
            Ok(text) => text,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "skipping unreadable source");
                continue;
            }
        };

        match Url::from_file_path(&path) {
            Ok(uri) => sources.push(SourceText { uri, text }),
            Err(_) => debug!(path = %path.display(), "skipping path without file URI"),
        }
    }

    Ok(sources)
}
