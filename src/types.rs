//! Core types: provider identification, normalized records, and the
//! aggregate result envelope persisted per provider.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Supported bibliographic search providers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Scopus (Elsevier) — largest abstract/citation database.
    Scopus,
    /// IEEE Xplore — engineering and computer science.
    Ieee,
    /// Web of Science Starter (Clarivate).
    Wos,
}

impl Provider {
    /// Returns the lowercase tag used as snapshot key and log label.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Scopus => "scopus",
            Self::Ieee => "ieee",
            Self::Wos => "wos",
        }
    }

    /// Maximum records one request may return, per the provider's API docs.
    pub fn page_limit(&self) -> usize {
        match self {
            Self::Scopus => 25,
            Self::Ieee => 200,
            Self::Wos => 50,
        }
    }

    /// Provider-wide ceiling on retrievable results for one query. Reaching
    /// it ends extraction without error, flagged as cap-truncated.
    pub fn result_cap(&self) -> usize {
        match self {
            Self::Scopus => 5_000,
            Self::Ieee => 10_000,
            Self::Wos => 100_000,
        }
    }

    /// Default minimum spacing between consecutive requests, derived from
    /// each provider's published rate ceiling.
    pub fn min_request_interval(&self) -> Duration {
        match self {
            Self::Scopus => Duration::from_millis(250),
            Self::Ieee => Duration::from_millis(350),
            Self::Wos => Duration::from_millis(500),
        }
    }

    /// Returns all provider variants.
    pub fn all() -> &'static [Provider] {
        &[Self::Scopus, Self::Ieee, Self::Wos]
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Normalized publication metadata. Fields a provider does not report are
/// absent, never fabricated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    /// Publication title.
    pub title: String,
    /// Author names, in the order the provider lists them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    /// Publication year.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    /// Digital Object Identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    /// Venue (journal, conference, or source title).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// One page of a provider response: the server-reported grand total plus
/// the records in this window.
#[derive(Debug, Clone)]
pub struct Page {
    /// Total hits the provider reports for the query.
    pub total_count: u64,
    /// Records in this page, in provider order.
    pub records: Vec<Record>,
}

/// A ranked keyword combination with its hit count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingEntry {
    /// The three keywords, in canonical order.
    pub terms: [String; 3],
    /// The query text sent to the provider.
    pub query: String,
    /// Total hits for the combination.
    pub count: u64,
    /// Sample document titles for this combination (one page's worth),
    /// collected only when title collection is enabled.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub titles: Vec<String>,
}

/// A query that failed after client-level retries were exhausted.
///
/// Kept in a dedicated list so consumers can tell "zero results" apart
/// from "query failed".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryFailure {
    /// The query text, as it identifies the keyword or combination.
    pub query: String,
    /// Stable error message.
    pub reason: String,
}

/// Aggregated counting output for one provider run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateOutput {
    /// Which provider produced this output.
    pub provider: Provider,
    /// When the run finished.
    pub generated_at: DateTime<Utc>,
    /// Per-keyword hit counts. `None` marks a keyword whose query failed
    /// after retries; the run continued past it.
    pub per_keyword: BTreeMap<String, Option<u64>>,
    /// Highest-counting combinations, descending, ties in first-seen order.
    pub top_combinations: Vec<RankingEntry>,
    /// Queries that failed without aborting the run.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<QueryFailure>,
}

/// Full extraction output for one provider in extended mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtendedOutput {
    /// The extraction query.
    pub query: String,
    /// Total hits the provider reports for the query.
    pub total_count: u64,
    /// Retrieved records, in provider order.
    pub records: Vec<Record>,
    /// True when extraction stopped at the provider's hard result cap
    /// rather than at the requested maximum or natural exhaustion.
    pub cap_truncated: bool,
}

/// Outcome of one provider's pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProviderOutcome {
    /// The pipeline ran to completion (possibly with recorded partial
    /// failures inside the aggregate).
    Completed {
        /// Counting output.
        aggregate: AggregateOutput,
        /// Extraction output, present only in extended mode.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        extended: Option<ExtendedOutput>,
    },
    /// The pipeline was aborted by a fatal, provider-scoped error
    /// (missing/rejected API key, cancellation).
    Failed {
        /// Stable error message.
        error: String,
    },
}

/// Per-provider keyed result of one engine run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Outcome per provider. Providers run isolated; one entry failing
    /// says nothing about its siblings.
    pub providers: BTreeMap<Provider, ProviderOutcome>,
}

impl RunReport {
    /// Iterate over providers that completed, with their outputs.
    pub fn completed(
        &self,
    ) -> impl Iterator<Item = (Provider, &AggregateOutput, Option<&ExtendedOutput>)> {
        self.providers.iter().filter_map(|(p, outcome)| match outcome {
            ProviderOutcome::Completed { aggregate, extended } => {
                Some((*p, aggregate, extended.as_ref()))
            }
            ProviderOutcome::Failed { .. } => None,
        })
    }
}
