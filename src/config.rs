//! Run configuration with validation.
//!
//! [`RunConfig`] mirrors the unified input structure consumers load from
//! JSON: the keyword list, a shared year range, one facet block per
//! provider, and credentials. [`RunConfig::validate`] rejects anything a
//! provider would silently misinterpret — unknown facet values, duplicate
//! keywords, inverted year ranges — before a single request is issued.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};
use crate::providers;
use crate::retry::RetryPolicy;
use crate::types::Provider;

/// Pipeline mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Counting only: per-keyword and per-combination totals, ranked.
    #[default]
    Simple,
    /// Counting plus full metadata extraction for one chosen query.
    Extended,
}

/// Inclusive publication-year window shared by all providers.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct YearRange {
    /// Earliest year, inclusive. `None` leaves the lower bound open.
    pub from: Option<i32>,
    /// Latest year, inclusive. `None` leaves the upper bound open.
    pub to: Option<i32>,
}

impl YearRange {
    /// True when neither bound is set.
    pub fn is_open(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }
}

/// API keys, one per provider. A provider without a key fails its run
/// with an auth error before any network call; siblings are unaffected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    /// Scopus (Elsevier) key, sent as the `X-ELS-APIKey` header.
    pub scopus_api_key: Option<String>,
    /// IEEE Xplore key, sent as the `apikey` query parameter.
    pub ieee_api_key: Option<String>,
    /// Web of Science key, sent as the `X-ApiKey` header.
    pub wos_api_key: Option<String>,
}

impl Credentials {
    /// The key configured for `provider`, if any.
    pub fn for_provider(&self, provider: Provider) -> Option<&str> {
        match provider {
            Provider::Scopus => self.scopus_api_key.as_deref(),
            Provider::Ieee => self.ieee_api_key.as_deref(),
            Provider::Wos => self.wos_api_key.as_deref(),
        }
    }
}

/// Per-provider overrides for the minimum inter-request interval, in
/// milliseconds. Unset providers use their built-in default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RateConfig {
    /// Scopus pacing override.
    pub scopus_interval_ms: Option<u64>,
    /// IEEE pacing override.
    pub ieee_interval_ms: Option<u64>,
    /// WOS pacing override.
    pub wos_interval_ms: Option<u64>,
}

impl RateConfig {
    /// Effective pacing interval for `provider`.
    pub fn interval_for(&self, provider: Provider) -> Duration {
        let override_ms = match provider {
            Provider::Scopus => self.scopus_interval_ms,
            Provider::Ieee => self.ieee_interval_ms,
            Provider::Wos => self.wos_interval_ms,
        };
        override_ms.map_or_else(|| provider.min_request_interval(), Duration::from_millis)
    }
}

/// Retry schedule knobs, serde-friendly. Converted to [`RetryPolicy`]
/// when clients are built.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts per request, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds.
    pub base_delay_ms: u64,
    /// Ceiling on a single backoff delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Ceiling on total wait across all retries, in milliseconds.
    pub max_elapsed_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            base_delay_ms: policy.base_delay.as_millis() as u64,
            max_delay_ms: policy.max_delay.as_millis() as u64,
            max_elapsed_ms: policy.max_elapsed.as_millis() as u64,
        }
    }
}

impl RetryConfig {
    /// Build the runtime retry policy.
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            max_elapsed: Duration::from_millis(self.max_elapsed_ms),
        }
    }
}

/// Extraction request for extended mode: a single term or an explicit
/// boolean expression, plus the result cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtendedQuery {
    /// Query text, e.g. `"machine learning" AND "healthcare"`.
    pub query: String,
    /// Maximum records to retrieve across pages.
    #[serde(default = "default_extended_max_results")]
    pub max_results: usize,
}

fn default_extended_max_results() -> usize {
    200
}

/// Scopus facet block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopusFilters {
    /// Document type codes, e.g. `ar`, `re`, `cp`.
    pub doc_types: Vec<String>,
    /// Subject area codes, e.g. `COMP`, `ENGI`.
    pub subject_areas: Vec<String>,
}

/// IEEE Xplore facet block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IeeeFilters {
    /// Content types, e.g. `Journals`, `Conferences`. The API accepts a
    /// single value per request; only the first entry is sent.
    pub content_types: Vec<String>,
}

/// Web of Science facet block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WosFilters {
    /// Database identifier, e.g. `WOS`, `MEDLINE`, `WOK`.
    pub database: String,
    /// Core Collection edition, e.g. `SCI`, `SSCI`.
    pub edition: Option<String>,
    /// Document types, e.g. `Article`, `Review`.
    pub document_types: Vec<String>,
    /// Sort order: `LD+D` (load date), `PY+D` (year), `TC+D` (citations),
    /// `RS+D` (relevance).
    pub sort_field: String,
}

impl Default for WosFilters {
    fn default() -> Self {
        Self {
            database: "WOS".to_owned(),
            edition: None,
            document_types: Vec::new(),
            sort_field: "LD+D".to_owned(),
        }
    }
}

/// Complete configuration for one engine run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Keywords to count, in input order. Must be non-empty and unique.
    pub keywords: Vec<String>,
    /// Publication-year window applied to every provider.
    pub years: YearRange,
    /// Scopus facets.
    pub scopus: ScopusFilters,
    /// IEEE facets.
    pub ieee: IeeeFilters,
    /// WOS facets.
    pub wos: WosFilters,
    /// API keys.
    pub credentials: Credentials,
    /// Pipeline mode.
    pub mode: Mode,
    /// Extraction request; required when `mode` is extended.
    pub extended: Option<ExtendedQuery>,
    /// Fetch one page of document titles for each top-ranked combination.
    pub collect_titles: bool,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
    /// Pacing overrides.
    pub rate: RateConfig,
    /// Retry schedule.
    pub retry: RetryConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            keywords: Vec::new(),
            years: YearRange::default(),
            scopus: ScopusFilters::default(),
            ieee: IeeeFilters::default(),
            wos: WosFilters::default(),
            credentials: Credentials::default(),
            mode: Mode::Simple,
            extended: None,
            collect_titles: true,
            timeout_seconds: 30,
            rate: RateConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl RunConfig {
    /// Validate the whole configuration.
    ///
    /// Checks, in order: keyword list shape (non-empty, no blank entries,
    /// exact-string unique), year-range ordering, per-provider facet
    /// enumerations, timeout, and the extended-mode query. Keywords that
    /// collide case-insensitively are allowed but logged as a warning,
    /// since provider-side case sensitivity differs.
    pub fn validate(&self) -> Result<()> {
        if self.keywords.is_empty() {
            return Err(SearchError::Config("keywords must not be empty".into()));
        }
        for keyword in &self.keywords {
            if keyword.trim().is_empty() {
                return Err(SearchError::Config("keywords must not be blank".into()));
            }
        }
        let mut seen = std::collections::HashSet::new();
        let mut seen_folded = std::collections::HashSet::new();
        for keyword in &self.keywords {
            if !seen.insert(keyword.as_str()) {
                return Err(SearchError::Config(format!(
                    "duplicate keyword: {keyword}"
                )));
            }
            if !seen_folded.insert(keyword.to_lowercase()) {
                tracing::warn!(%keyword, "keywords differ only in case; providers may merge them");
            }
        }

        if let (Some(from), Some(to)) = (self.years.from, self.years.to) {
            if from > to {
                return Err(SearchError::Config(format!(
                    "year_from ({from}) must not exceed year_to ({to})"
                )));
            }
        }

        providers::scopus::validate_filters(&self.scopus)?;
        providers::ieee::validate_filters(&self.ieee)?;
        providers::wos::validate_filters(&self.wos)?;

        if self.timeout_seconds == 0 {
            return Err(SearchError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }

        if self.mode == Mode::Extended {
            match &self.extended {
                None => {
                    return Err(SearchError::Config(
                        "extended mode requires an extraction query".into(),
                    ))
                }
                Some(extended) => {
                    if extended.query.trim().is_empty() {
                        return Err(SearchError::Config(
                            "extraction query must not be blank".into(),
                        ));
                    }
                    if extended.max_results == 0 {
                        return Err(SearchError::Config(
                            "extraction max_results must be greater than 0".into(),
                        ));
                    }
                }
            }
        }

        Ok(())
    }
}
