//! Scopus (Elsevier) backend.
//!
//! Scopus takes the whole query — keywords, year window, facets — as one
//! boolean expression in the `query` parameter and authenticates via the
//! `X-ELS-APIKey` header. Results arrive under the Atom-flavoured
//! `search-results` envelope with `opensearch:totalResults` as a string.

use std::sync::Arc;

use crate::config::{RunConfig, ScopusFilters, YearRange};
use crate::error::{Result, SearchError};
use crate::http::{build_client, HttpExecutor, RequestSpec};
use crate::provider::{ProviderClient, QueryInput};
use crate::providers::{effective_page_size, PageRequest};
use crate::rate_limit::RateLimiter;
use crate::types::{Page, Provider, Record};

/// Search endpoint.
pub const BASE_URL: &str = "https://api.elsevier.com/content/search/scopus";

/// Recognized document type codes.
pub const DOC_TYPES: &[&str] = &["ar", "re", "cp", "ch", "bk", "ed", "le", "no", "sh"];

/// Recognized subject area codes.
pub const SUBJECT_AREAS: &[&str] = &[
    "COMP", "MEDI", "ENGI", "SOCI", "BUSI", "MATH", "PHYS", "CHEM", "BIOC", "ARTS",
];

/// Reject facet values Scopus does not document.
pub(crate) fn validate_filters(filters: &ScopusFilters) -> Result<()> {
    for code in &filters.doc_types {
        if !DOC_TYPES.contains(&code.as_str()) {
            return Err(SearchError::Config(format!(
                "unknown Scopus document type: {code}"
            )));
        }
    }
    for area in &filters.subject_areas {
        if !SUBJECT_AREAS.contains(&area.as_str()) {
            return Err(SearchError::Config(format!(
                "unknown Scopus subject area: {area}"
            )));
        }
    }
    Ok(())
}

/// Build the full Scopus boolean expression for a query.
///
/// Year bounds use the exclusive `PUBYEAR > / <` comparators, facets
/// become OR-groups of `DOCTYPE(..)` / `SUBJAREA(..)` clauses. Empty
/// filter fields are omitted entirely.
pub fn build_search_expression(
    input: &QueryInput,
    years: &YearRange,
    filters: &ScopusFilters,
) -> String {
    let mut expr = input.text();

    match (years.from, years.to) {
        (Some(from), Some(to)) => {
            expr = format!("({expr}) AND PUBYEAR > {} AND PUBYEAR < {}", from - 1, to + 1);
        }
        (Some(from), None) => {
            expr = format!("({expr}) AND PUBYEAR > {}", from - 1);
        }
        (None, Some(to)) => {
            expr = format!("({expr}) AND PUBYEAR < {}", to + 1);
        }
        (None, None) => {}
    }

    if !filters.doc_types.is_empty() {
        let clause = filters
            .doc_types
            .iter()
            .map(|dt| format!("DOCTYPE({dt})"))
            .collect::<Vec<_>>()
            .join(" OR ");
        expr = format!("({expr}) AND ({clause})");
    }

    if !filters.subject_areas.is_empty() {
        let clause = filters
            .subject_areas
            .iter()
            .map(|sa| format!("SUBJAREA({sa})"))
            .collect::<Vec<_>>()
            .join(" OR ");
        expr = format!("({expr}) AND ({clause})");
    }

    expr
}

/// Translate a logical query into a Scopus request. Pure; the caller
/// attaches credentials.
pub fn build_request(
    input: &QueryInput,
    years: &YearRange,
    filters: &ScopusFilters,
    page: &PageRequest,
) -> Result<RequestSpec> {
    let size = effective_page_size(Provider::Scopus, page)?;
    Ok(RequestSpec {
        base_url: BASE_URL.to_owned(),
        query: vec![
            ("query".into(), build_search_expression(input, years, filters)),
            ("count".into(), size.to_string()),
            ("start".into(), page.offset.to_string()),
            ("view".into(), "STANDARD".into()),
            ("sort".into(), "-citedby-count".into()),
        ],
        headers: Vec::new(),
    })
}

fn envelope(value: &serde_json::Value) -> Result<&serde_json::Value> {
    value
        .get("search-results")
        .ok_or_else(|| SearchError::Provider("missing search-results envelope".into()))
}

/// Total hits from the response. Scopus encodes the number as a string.
pub fn parse_total(value: &serde_json::Value) -> Result<u64> {
    let total = envelope(value)?
        .get("opensearch:totalResults")
        .ok_or_else(|| SearchError::Provider("missing opensearch:totalResults".into()))?;
    match total {
        serde_json::Value::String(s) => s
            .parse::<u64>()
            .map_err(|_| SearchError::Provider(format!("unparseable total: {s}"))),
        serde_json::Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| SearchError::Provider(format!("negative total: {n}"))),
        other => Err(SearchError::Provider(format!(
            "unexpected total type: {other}"
        ))),
    }
}

/// Normalize the entry list. A single error entry (Scopus reports empty
/// result sets this way) is an empty page; entries without a title are
/// skipped.
pub fn parse_records(value: &serde_json::Value) -> Result<Vec<Record>> {
    let entries = match envelope(value)?.get("entry") {
        Some(serde_json::Value::Array(entries)) => entries,
        Some(other) => {
            return Err(SearchError::Provider(format!(
                "entry is not an array: {other}"
            )))
        }
        None => return Ok(Vec::new()),
    };
    if entries.len() == 1 && entries[0].get("error").is_some() {
        return Ok(Vec::new());
    }

    let mut records = Vec::with_capacity(entries.len());
    for entry in entries {
        let Some(title) = entry.get("dc:title").and_then(|t| t.as_str()) else {
            tracing::debug!("skipping Scopus entry without dc:title");
            continue;
        };
        let authors = entry
            .get("dc:creator")
            .and_then(|c| c.as_str())
            .map(|c| vec![c.to_owned()])
            .unwrap_or_default();
        let year = entry
            .get("prism:coverDate")
            .and_then(|d| d.as_str())
            .and_then(|d| d.get(..4))
            .and_then(|y| y.parse::<i32>().ok());
        records.push(Record {
            title: title.to_owned(),
            authors,
            year,
            doi: entry
                .get("prism:doi")
                .and_then(|d| d.as_str())
                .map(str::to_owned),
            source: entry
                .get("prism:publicationName")
                .and_then(|s| s.as_str())
                .map(str::to_owned),
        });
    }
    Ok(records)
}

/// Scopus API client for one run.
#[derive(Debug)]
pub struct ScopusClient {
    exec: HttpExecutor,
    api_key: String,
    years: YearRange,
    filters: ScopusFilters,
    base_url: String,
}

impl ScopusClient {
    /// Build a client from the run configuration and credential.
    pub fn new(api_key: impl Into<String>, config: &RunConfig) -> Result<Self> {
        let limiter = Arc::new(RateLimiter::new(config.rate.interval_for(Provider::Scopus)));
        Ok(Self {
            exec: HttpExecutor::new(
                build_client(config.timeout_seconds)?,
                limiter,
                config.retry.to_policy(),
            ),
            api_key: api_key.into(),
            years: config.years,
            filters: config.scopus.clone(),
            base_url: BASE_URL.to_owned(),
        })
    }

    /// Point the client at a different endpoint (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn request_for(&self, input: &QueryInput, page: &PageRequest) -> Result<RequestSpec> {
        let mut spec = build_request(input, &self.years, &self.filters, page)?;
        spec.base_url = self.base_url.clone();
        spec.headers = vec![
            ("X-ELS-APIKey".into(), self.api_key.clone()),
            ("Accept".into(), "application/json".into()),
        ];
        Ok(spec)
    }
}

impl ProviderClient for ScopusClient {
    fn provider(&self) -> Provider {
        Provider::Scopus
    }

    async fn count(&self, input: &QueryInput) -> Result<u64> {
        let spec = self.request_for(input, &PageRequest::count_probe())?;
        let body = self.exec.get_json(&spec).await?;
        parse_total(&body)
    }

    async fn fetch_page(&self, input: &QueryInput, offset: usize, size: usize) -> Result<Page> {
        let page = PageRequest {
            offset,
            size,
            paginated: true,
        };
        let spec = self.request_for(input, &page)?;
        let body = self.exec.get_json(&spec).await?;
        Ok(Page {
            total_count: parse_total(&body)?,
            records: parse_records(&body)?,
        })
    }
}
