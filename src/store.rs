//! Snapshot persistence.
//!
//! Two JSON documents per output directory, each keyed by provider tag:
//! a counts snapshot (per-keyword and ranked combination totals) and a
//! results snapshot (extended-mode extractions). A new run replaces only
//! the entries of the providers it ran; everything else is preserved.
//! Writes go through a temp file and an atomic rename, so readers never
//! observe a partially written snapshot.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};
use crate::types::{AggregateOutput, ExtendedOutput, Provider, RunReport};

/// Persisted counting outputs, keyed by provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CountsSnapshot {
    /// One aggregate per provider that has ever completed a run.
    pub providers: BTreeMap<Provider, AggregateOutput>,
}

/// Persisted extraction outputs, keyed by provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultsSnapshot {
    /// One extraction per provider that has run extended mode.
    pub providers: BTreeMap<Provider, ExtendedOutput>,
}

/// Both snapshots after a merge.
#[derive(Debug, Clone)]
pub struct PersistedSnapshots {
    /// The merged counts snapshot, as written.
    pub counts: CountsSnapshot,
    /// The merged results snapshot, as written.
    pub results: ResultsSnapshot,
}

/// Owns the snapshot files for one output directory.
#[derive(Debug, Clone)]
pub struct ResultStore {
    counts_path: PathBuf,
    results_path: PathBuf,
    dir: PathBuf,
}

impl ResultStore {
    /// A store writing `counts.json` and `results.json` under `dir`.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref().to_path_buf();
        Self {
            counts_path: dir.join("counts.json"),
            results_path: dir.join("results.json"),
            dir,
        }
    }

    /// Path of the counts snapshot.
    pub fn counts_path(&self) -> &Path {
        &self.counts_path
    }

    /// Path of the results snapshot.
    pub fn results_path(&self) -> &Path {
        &self.results_path
    }

    /// Merge a run report into the persisted snapshots.
    ///
    /// Completed providers replace their own snapshot entries; failed
    /// providers leave their previous entries untouched, so a partial
    /// re-run never erases older data. Returns the snapshots as written.
    pub fn merge_and_persist(&self, report: &RunReport) -> Result<PersistedSnapshots> {
        let mut counts: CountsSnapshot = load_or_default(&self.counts_path)?;
        let mut results: ResultsSnapshot = load_or_default(&self.results_path)?;

        for (provider, aggregate, extended) in report.completed() {
            counts.providers.insert(provider, aggregate.clone());
            if let Some(extended) = extended {
                results.providers.insert(provider, extended.clone());
            }
        }

        fs::create_dir_all(&self.dir)
            .map_err(|e| SearchError::Persist(format!("create {}: {e}", self.dir.display())))?;
        write_atomic(&self.counts_path, &counts)?;
        write_atomic(&self.results_path, &results)?;
        tracing::debug!(
            counts = %self.counts_path.display(),
            results = %self.results_path.display(),
            "snapshots persisted"
        );

        Ok(PersistedSnapshots { counts, results })
    }

    /// Load the counts snapshot; a missing file is an empty snapshot.
    pub fn load_counts(&self) -> Result<CountsSnapshot> {
        load_or_default(&self.counts_path)
    }

    /// Load the results snapshot; a missing file is an empty snapshot.
    pub fn load_results(&self) -> Result<ResultsSnapshot> {
        load_or_default(&self.results_path)
    }

    /// Write the human-readable consolidated report next to the
    /// snapshots and return its path.
    pub fn write_consolidated_report(&self, report: &RunReport) -> Result<PathBuf> {
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let path = self.dir.join(format!("consolidated_{stamp}.txt"));
        fs::create_dir_all(&self.dir)
            .map_err(|e| SearchError::Persist(format!("create {}: {e}", self.dir.display())))?;
        fs::write(&path, consolidated_report(report))
            .map_err(|e| SearchError::Persist(format!("write {}: {e}", path.display())))?;
        Ok(path)
    }
}

fn load_or_default<T: Default + DeserializeOwned>(path: &Path) -> Result<T> {
    match fs::read_to_string(path) {
        Ok(body) => serde_json::from_str(&body)
            .map_err(|e| SearchError::Persist(format!("parse {}: {e}", path.display()))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(SearchError::Persist(format!(
            "read {}: {e}",
            path.display()
        ))),
    }
}

fn write_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let body = serde_json::to_vec_pretty(value)
        .map_err(|e| SearchError::Persist(format!("serialize {}: {e}", path.display())))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| SearchError::Persist(format!("bad snapshot path: {}", path.display())))?;
    let tmp = path.with_file_name(format!("{file_name}.tmp"));
    fs::write(&tmp, body).map_err(|e| SearchError::Persist(format!("write {}: {e}", tmp.display())))?;
    fs::rename(&tmp, path)
        .map_err(|e| SearchError::Persist(format!("rename {}: {e}", path.display())))
}

/// Render the cross-provider top-combinations report as plain text.
pub fn consolidated_report(report: &RunReport) -> String {
    let mut lines: Vec<String> = Vec::new();
    let rule = "=".repeat(100);

    lines.push(rule.clone());
    lines.push("  TOP COMBINATIONS - CONSOLIDATED REPORT".to_owned());
    lines.push(rule.clone());
    lines.push(String::new());
    lines.push(format!("Generated: {}", Utc::now().format("%Y-%m-%d %H:%M:%S")));
    let executed: Vec<&str> = report.providers.keys().map(Provider::name).collect();
    lines.push(format!("Providers: {}", executed.join(", ")));
    lines.push(String::new());

    let mut completed = 0usize;
    for (provider, aggregate, _) in report.completed() {
        completed += 1;
        lines.push(rule.clone());
        lines.push(format!(
            "  [{}] TOP {} COMBINATIONS",
            provider.name().to_uppercase(),
            aggregate.top_combinations.len()
        ));
        lines.push(rule.clone());
        if aggregate.top_combinations.is_empty() {
            lines.push("  (no combinations with results)".to_owned());
        } else {
            lines.push(format!(
                "{:<6} | {:>12} | {:<28} | {:<28} | {:<28}",
                "Rank", "Count", "Keyword 1", "Keyword 2", "Keyword 3"
            ));
            lines.push("-".repeat(110));
            for (rank, entry) in aggregate.top_combinations.iter().enumerate() {
                lines.push(format!(
                    "{:<6} | {:>12} | {:<28} | {:<28} | {:<28}",
                    rank + 1,
                    entry.count,
                    clip(&entry.terms[0]),
                    clip(&entry.terms[1]),
                    clip(&entry.terms[2]),
                ));
            }
            lines.push(String::new());
            lines.push("Queries:".to_owned());
            for (rank, entry) in aggregate.top_combinations.iter().enumerate() {
                lines.push(format!("  {:2}. {}", rank + 1, entry.query));
            }
        }
        lines.push(String::new());
    }

    if completed > 1 {
        let mut all: Vec<(Provider, &crate::types::RankingEntry)> = report
            .completed()
            .flat_map(|(p, aggregate, _)| {
                aggregate.top_combinations.iter().map(move |e| (p, e))
            })
            .collect();
        all.sort_by(|a, b| b.1.count.cmp(&a.1.count));
        all.truncate(30);

        lines.push(rule.clone());
        lines.push("  GLOBAL TOP 30 (ALL PROVIDERS)".to_owned());
        lines.push(rule.clone());
        lines.push(format!(
            "{:<6} | {:<8} | {:>12} | {:<25} | {:<25} | {:<25}",
            "Rank", "Provider", "Count", "Keyword 1", "Keyword 2", "Keyword 3"
        ));
        lines.push("-".repeat(115));
        for (rank, (provider, entry)) in all.iter().enumerate() {
            lines.push(format!(
                "{:<6} | {:<8} | {:>12} | {:<25} | {:<25} | {:<25}",
                rank + 1,
                provider.name(),
                entry.count,
                clip(&entry.terms[0]),
                clip(&entry.terms[1]),
                clip(&entry.terms[2]),
            ));
        }
        lines.push(String::new());
    }

    lines.push(rule);
    lines.join("\n")
}

fn clip(term: &str) -> String {
    if term.chars().count() > 25 {
        let cut: String = term.chars().take(22).collect();
        format!("{cut}...")
    } else {
        term.to_owned()
    }
}
