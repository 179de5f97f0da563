//! Parallel scan orchestration.
//!
//! A directory scan is an embarrassingly parallel map: one extractor call
//! per file with no cross-file ordering, fanned out over rayon's pool.
//! Cross-file aggregates, hotspot ranking, and import-graph construction
//! all wait for every file to come back. Per-file failures accumulate as
//! diagnostics and never abort the batch.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use globset::{Glob, GlobSet, GlobSetBuilder};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;
use walkdir::WalkDir;

use crate::analysis::{
    extract, languages, ParseDiagnostic, RawImport, StructuralElement,
};
use crate::config::ScoreConfig;
use crate::lines::count_lines;
use crate::score::{rank_hotspots, score, FileSummary, HotspotRecord};

/// Directory names never descended into.
const SKIP_DIRS: &[&str] = &[
    "vendor",
    "node_modules",
    "target",
    "dist",
    "build",
    "__pycache__",
];

/// One file handed to the scanner by the directory-walker collaborator.
#[derive(Debug, Clone)]
pub struct ScanInput {
    pub path: String,
    pub source: Vec<u8>,
    pub language: String,
}

/// Everything a scan learned about one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    pub path: String,
    pub language: String,
    pub summary: FileSummary,
    pub elements: Vec<StructuralElement>,
    pub imports: Vec<RawImport>,
    pub references: std::collections::BTreeSet<String>,
}

/// Aggregate scan output. Recomputed from scratch per scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanReport {
    /// Per-file reports, sorted by path for deterministic output.
    pub files: Vec<FileReport>,
    /// Diagnostics from files that produced no report.
    pub diagnostics: Vec<ParseDiagnostic>,
    pub total_elements: usize,
    /// Top files by hotspot score.
    pub hotspots: Vec<HotspotRecord>,
}

/// Cooperative cancellation flag, checked between files.
///
/// Abandoning a scan has no side effects: nothing mutates state outside
/// the current call's return value, so cancelled files are simply absent.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Scan a batch of in-memory sources.
pub fn scan_sources(
    inputs: &[ScanInput],
    config: &ScoreConfig,
    cancel: &CancelToken,
) -> ScanReport {
    let results: Vec<(Option<FileReport>, Vec<ParseDiagnostic>)> = inputs
        .par_iter()
        .map(|input| {
            if cancel.is_cancelled() {
                return (None, Vec::new());
            }
            scan_one(input, config)
        })
        .collect();

    // Barrier: every file is in before aggregates and ranking.
    let mut files = Vec::new();
    let mut diagnostics = Vec::new();
    for (report, mut file_diagnostics) in results {
        if let Some(report) = report {
            files.push(report);
        }
        diagnostics.append(&mut file_diagnostics);
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    diagnostics.sort_by(|a, b| a.file.cmp(&b.file));

    let total_elements = files.iter().map(|f| f.elements.len()).sum();
    let summaries: Vec<FileSummary> = files.iter().map(|f| f.summary.clone()).collect();
    let hotspots = rank_hotspots(&summaries);

    ScanReport {
        files,
        diagnostics,
        total_elements,
        hotspots,
    }
}

fn scan_one(input: &ScanInput, config: &ScoreConfig) -> (Option<FileReport>, Vec<ParseDiagnostic>) {
    let extraction = extract(&input.path, &input.source, &input.language);
    if !extraction.diagnostics.is_empty() {
        return (None, extraction.diagnostics);
    }

    let Some(backend) = languages::get_backend(&input.language) else {
        // Unknown tags already surfaced as diagnostics from extract().
        return (
            None,
            vec![ParseDiagnostic::unsupported(&input.path, &input.language)],
        );
    };

    let text = String::from_utf8_lossy(&input.source);
    let lines = count_lines(&text, backend);
    let summary = score(
        &input.path,
        &extraction.elements,
        lines,
        extraction.imports.len(),
        config,
    );

    (
        Some(FileReport {
            path: input.path.clone(),
            language: backend.language_id().to_string(),
            summary,
            elements: extraction.elements,
            imports: extraction.imports,
            references: extraction.references,
        }),
        Vec::new(),
    )
}

/// Read and scan files from disk. The language tag comes from each file's
/// extension; unreadable files are logged and skipped.
pub fn scan_paths(
    paths: &[PathBuf],
    config: &ScoreConfig,
    cancel: &CancelToken,
) -> ScanReport {
    let inputs: Vec<ScanInput> = paths
        .iter()
        .filter_map(|path| {
            let source = match std::fs::read(path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable file");
                    return None;
                }
            };
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            Some(ScanInput {
                path: path.to_string_lossy().to_string(),
                source,
                // Unknown extensions flow through and come back as
                // unsupported-language diagnostics.
                language: languages::tag_for_extension(ext)
                    .map(str::to_string)
                    .unwrap_or_else(|| ext.to_string()),
            })
        })
        .collect();

    scan_sources(&inputs, config, cancel)
}

/// Collect source files with a registered backend under `root`, skipping
/// hidden directories, vendor trees, and any paths matching `excludes`.
pub fn collect_source_files(root: &Path, excludes: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let exclude_set = build_globset(excludes)?;
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| {
            // The root itself is always entered, whatever its name.
            if e.depth() == 0 {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            if e.file_type().is_dir() && name.starts_with('.') {
                return false;
            }
            if e.file_type().is_dir() && SKIP_DIRS.contains(&name.as_ref()) {
                return false;
            }
            true
        })
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if languages::tag_for_extension(ext).is_none() {
            continue;
        }
        if let Some(set) = &exclude_set {
            let relative = path.strip_prefix(root).unwrap_or(path);
            if set.is_match(relative) {
                continue;
            }
        }
        files.push(path.to_path_buf());
    }

    files.sort();
    Ok(files)
}

fn build_globset(patterns: &[String]) -> anyhow::Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(
            Glob::new(pattern)
                .map_err(|e| anyhow::anyhow!("invalid exclude pattern {:?}: {}", pattern, e))?,
        );
    }
    Ok(Some(builder.build()?))
}
