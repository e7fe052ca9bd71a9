//! Web of Science Starter (Clarivate) backend.
//!
//! WOS queries use field tags (`TS=` topic, `PY=` year, `DT=` document
//! type); bare quoted terms are rewritten into `TS=(…)` clauses before
//! sending. The Starter API authenticates via the `X-ApiKey` header and
//! paginates by page number rather than record offset, so the client maps
//! offsets onto `page`/`limit` pairs.

use std::sync::Arc;

use crate::config::{RunConfig, WosFilters, YearRange};
use crate::error::{Result, SearchError};
use crate::http::{build_client, HttpExecutor, RequestSpec};
use crate::provider::{ProviderClient, QueryInput};
use crate::providers::{effective_page_size, PageRequest};
use crate::rate_limit::RateLimiter;
use crate::types::{Page, Provider, Record};

/// Documents endpoint.
pub const BASE_URL: &str = "https://api.clarivate.com/apis/wos-starter/v1/documents";

/// Recognized database identifiers.
pub const DATABASES: &[&str] = &[
    "WOS", "BIOABS", "BCI", "BIOSIS", "CCC", "DIIDW", "DRCI", "MEDLINE", "PPRN", "ZOOREC", "WOK",
];

/// Recognized Core Collection editions.
pub const EDITIONS: &[&str] = &["SCI", "SSCI", "AHCI", "ESCI", "CPCI-S", "CPCI-SSH"];

/// Common document types.
pub const DOCUMENT_TYPES: &[&str] = &[
    "Article",
    "Review",
    "Proceedings Paper",
    "Editorial Material",
    "Book Chapter",
    "Letter",
    "Meeting Abstract",
    "Book Review",
    "Correction",
    "News Item",
];

/// Recognized sort orders: load date, year, citations, relevance.
pub const SORT_FIELDS: &[&str] = &["LD+D", "PY+D", "TC+D", "RS+D"];

/// Reject facet values the Starter API does not document.
pub(crate) fn validate_filters(filters: &WosFilters) -> Result<()> {
    if !DATABASES.contains(&filters.database.as_str()) {
        return Err(SearchError::Config(format!(
            "unknown WOS database: {}",
            filters.database
        )));
    }
    if let Some(edition) = &filters.edition {
        if !EDITIONS.contains(&edition.as_str()) {
            return Err(SearchError::Config(format!(
                "unknown WOS edition: {edition}"
            )));
        }
    }
    for dt in &filters.document_types {
        if !DOCUMENT_TYPES.contains(&dt.as_str()) {
            return Err(SearchError::Config(format!(
                "unknown WOS document type: {dt}"
            )));
        }
    }
    if !SORT_FIELDS.contains(&filters.sort_field.as_str()) {
        return Err(SearchError::Config(format!(
            "unknown WOS sort field: {}",
            filters.sort_field
        )));
    }
    Ok(())
}

/// Rewrite a bare boolean expression into WOS field-tag syntax.
///
/// An expression already using field tags (`TS=`, `TI=`, …) passes
/// through untouched. Otherwise each term between top-level AND/OR
/// connectors is stripped of surrounding quotes and wrapped in `TS=(…)`,
/// searching title, abstract, and keywords.
fn rewrite_expression(expr: &str) -> String {
    let trimmed = expr.trim();
    if trimmed.contains('=') && !trimmed.starts_with('"') {
        return trimmed.to_owned();
    }

    let mut parts: Vec<String> = Vec::new();
    let mut rest = trimmed;
    loop {
        let and_pos = rest.find(" AND ");
        let or_pos = rest.find(" OR ");
        let (pos, connector, sep_len) = match (and_pos, or_pos) {
            (Some(a), Some(o)) if a <= o => (a, "AND", " AND ".len()),
            (_, Some(o)) => (o, "OR", " OR ".len()),
            (Some(a), None) => (a, "AND", " AND ".len()),
            (None, None) => {
                parts.push(wrap_topic(rest));
                break;
            }
        };
        parts.push(wrap_topic(&rest[..pos]));
        parts.push(connector.to_owned());
        rest = &rest[pos + sep_len..];
    }
    parts.join(" ")
}

fn wrap_topic(term: &str) -> String {
    format!("TS=({})", term.trim().trim_matches('"'))
}

/// Build the full WOS query string for a logical query.
pub fn build_search_expression(
    input: &QueryInput,
    years: &YearRange,
    filters: &WosFilters,
) -> String {
    let mut expr = match input {
        QueryInput::Terms(terms) => terms
            .iter()
            .map(|t| wrap_topic(t))
            .collect::<Vec<_>>()
            .join(" AND "),
        QueryInput::Expression(raw) => rewrite_expression(raw),
    };

    match (years.from, years.to) {
        (Some(from), Some(to)) if from == to => expr = format!("{expr} AND PY={from}"),
        (Some(from), Some(to)) => expr = format!("{expr} AND PY={from}-{to}"),
        (Some(from), None) => expr = format!("{expr} AND PY>={from}"),
        (None, Some(to)) => expr = format!("{expr} AND PY<={to}"),
        (None, None) => {}
    }

    if !filters.document_types.is_empty() {
        let clause = filters
            .document_types
            .iter()
            .map(|dt| format!("DT=(\"{dt}\")"))
            .collect::<Vec<_>>()
            .join(" OR ");
        expr = format!("{expr} AND ({clause})");
    }

    expr
}

/// Translate a logical query into a Starter API request. Pure; the
/// caller attaches credentials.
///
/// The Starter API paginates by page number. Offsets aligned to the
/// requested size map directly; an offset aligned only to the provider
/// page maximum requests a full page (the client slices it down). Any
/// other offset cannot be expressed and is rejected.
pub fn build_request(
    input: &QueryInput,
    years: &YearRange,
    filters: &WosFilters,
    page: &PageRequest,
) -> Result<RequestSpec> {
    let size = effective_page_size(Provider::Wos, page)?;
    let max = Provider::Wos.page_limit();
    let (limit, page_number) = if page.offset % size == 0 {
        (size, page.offset / size + 1)
    } else if page.offset % max == 0 {
        (max, page.offset / max + 1)
    } else {
        return Err(SearchError::Config(format!(
            "WOS offset {} is not addressable with page size {size}",
            page.offset
        )));
    };

    let mut query = vec![
        ("q".into(), build_search_expression(input, years, filters)),
        ("db".into(), filters.database.clone()),
        ("limit".into(), limit.to_string()),
        ("page".into(), page_number.to_string()),
        ("sortField".into(), filters.sort_field.clone()),
    ];
    if let Some(edition) = &filters.edition {
        query.push(("edition".into(), format!("WOS+{edition}")));
    }

    Ok(RequestSpec {
        base_url: BASE_URL.to_owned(),
        query,
        headers: Vec::new(),
    })
}

/// Total hits from the response metadata.
pub fn parse_total(value: &serde_json::Value) -> Result<u64> {
    value
        .get("metadata")
        .and_then(|m| m.get("total"))
        .and_then(|t| t.as_u64())
        .ok_or_else(|| SearchError::Provider("missing metadata.total".into()))
}

/// Normalize the hit list. Hits without a title are skipped.
pub fn parse_records(value: &serde_json::Value) -> Result<Vec<Record>> {
    let hits = match value.get("hits") {
        Some(serde_json::Value::Array(hits)) => hits,
        Some(other) => {
            return Err(SearchError::Provider(format!(
                "hits is not an array: {other}"
            )))
        }
        None => return Ok(Vec::new()),
    };

    let mut records = Vec::with_capacity(hits.len());
    for hit in hits {
        let Some(title) = hit.get("title").and_then(|t| t.as_str()) else {
            tracing::debug!("skipping WOS hit without title");
            continue;
        };
        let authors = hit
            .get("names")
            .and_then(|n| n.get("authors"))
            .and_then(|a| a.as_array())
            .map(|list| {
                list.iter()
                    .filter_map(|a| a.get("displayName").and_then(|n| n.as_str()))
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();
        let source = hit.get("source");
        let year = source
            .and_then(|s| s.get("publishYear"))
            .and_then(|y| match y {
                serde_json::Value::Number(n) => n.as_i64().map(|n| n as i32),
                serde_json::Value::String(s) => s.parse::<i32>().ok(),
                _ => None,
            });
        records.push(Record {
            title: title.to_owned(),
            authors,
            year,
            doi: hit
                .get("identifiers")
                .and_then(|i| i.get("doi"))
                .and_then(|d| d.as_str())
                .map(str::to_owned),
            source: source
                .and_then(|s| s.get("sourceTitle"))
                .and_then(|t| t.as_str())
                .map(str::to_owned),
        });
    }
    Ok(records)
}

/// Web of Science Starter API client for one run.
#[derive(Debug)]
pub struct WosClient {
    exec: HttpExecutor,
    api_key: String,
    years: YearRange,
    filters: WosFilters,
    base_url: String,
}

impl WosClient {
    /// Build a client from the run configuration and credential.
    pub fn new(api_key: impl Into<String>, config: &RunConfig) -> Result<Self> {
        let limiter = Arc::new(RateLimiter::new(config.rate.interval_for(Provider::Wos)));
        Ok(Self {
            exec: HttpExecutor::new(
                build_client(config.timeout_seconds)?,
                limiter,
                config.retry.to_policy(),
            ),
            api_key: api_key.into(),
            years: config.years,
            filters: config.wos.clone(),
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
            ("X-ApiKey".into(), self.api_key.clone()),
            ("Accept".into(), "application/json".into()),
        ];
        Ok(spec)
    }
}

impl ProviderClient for WosClient {
    fn provider(&self) -> Provider {
        Provider::Wos
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
        let mut records = parse_records(&body)?;
        // A full-page request on behalf of a smaller window: keep only
        // the records the caller asked for.
        records.truncate(size.min(Provider::Wos.page_limit()));
        Ok(Page {
            total_count: parse_total(&body)?,
            records,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MOCK_RESPONSE: &str = r#"{
        "metadata": {"total": 73, "page": 1, "limit": 50},
        "hits": [
            {
                "uid": "WOS:000900000001",
                "title": "Threat intelligence sharing between CSIRTs",
                "names": {"authors": [{"displayName": "García, M."}]},
                "source": {"sourceTitle": "Journal of Cybersecurity", "publishYear": 2024},
                "identifiers": {"doi": "10.1093/cybsec/0001"}
            },
            {
                "uid": "WOS:000900000002",
                "title": "Risk scoring for security operations"
            }
        ]
    }"#;

    fn terms(words: &[&str]) -> QueryInput {
        QueryInput::Terms(words.iter().map(|w| (*w).to_string()).collect())
    }

    #[test]
    fn terms_are_wrapped_in_topic_clauses() {
        let expr = build_search_expression(
            &terms(&["CSIRT", "SOC", "risk"]),
            &YearRange::default(),
            &WosFilters::default(),
        );
        assert_eq!(expr, "TS=(CSIRT) AND TS=(SOC) AND TS=(risk)");
    }

    #[test]
    fn quoted_expression_is_rewritten() {
        let input = QueryInput::expression("\"CSIRT\" AND \"risk management\"");
        let expr =
            build_search_expression(&input, &YearRange::default(), &WosFilters::default());
        assert_eq!(expr, "TS=(CSIRT) AND TS=(risk management)");
    }

    #[test]
    fn or_connectors_survive_rewriting() {
        let input = QueryInput::expression("\"SOC\" OR \"Security Operations Center\"");
        let expr =
            build_search_expression(&input, &YearRange::default(), &WosFilters::default());
        assert_eq!(expr, "TS=(SOC) OR TS=(Security Operations Center)");
    }

    #[test]
    fn field_tagged_expression_passes_through() {
        let input = QueryInput::expression("TI=(ransomware) AND PY=2023");
        let expr =
            build_search_expression(&input, &YearRange::default(), &WosFilters::default());
        assert_eq!(expr, "TI=(ransomware) AND PY=2023");
    }

    #[test]
    fn year_window_appends_py_range() {
        let years = YearRange {
            from: Some(2020),
            to: Some(2025),
        };
        let expr =
            build_search_expression(&QueryInput::term("SOC"), &years, &WosFilters::default());
        assert_eq!(expr, "TS=(SOC) AND PY=2020-2025");
    }

    #[test]
    fn single_year_collapses_range() {
        let years = YearRange {
            from: Some(2024),
            to: Some(2024),
        };
        let expr =
            build_search_expression(&QueryInput::term("SOC"), &years, &WosFilters::default());
        assert_eq!(expr, "TS=(SOC) AND PY=2024");
    }

    #[test]
    fn document_types_append_dt_clause() {
        let filters = WosFilters {
            document_types: vec!["Article".into(), "Review".into()],
            ..Default::default()
        };
        let expr =
            build_search_expression(&QueryInput::term("SOC"), &YearRange::default(), &filters);
        assert_eq!(expr, "TS=(SOC) AND (DT=(\"Article\") OR DT=(\"Review\"))");
    }

    #[test]
    fn request_maps_aligned_offset_to_page_number() {
        let page = PageRequest {
            offset: 100,
            size: 50,
            paginated: true,
        };
        let spec = build_request(
            &QueryInput::term("x"),
            &YearRange::default(),
            &WosFilters::default(),
            &page,
        )
        .expect("request");
        assert!(spec.query.contains(&("limit".to_string(), "50".to_string())));
        assert!(spec.query.contains(&("page".to_string(), "3".to_string())));
        assert!(spec.query.contains(&("db".to_string(), "WOS".to_string())));
        assert!(spec.query.contains(&("sortField".to_string(), "LD+D".to_string())));
    }

    #[test]
    fn request_short_final_window_uses_matching_page() {
        // Offset 100 with a 20-record window: 100 % 20 == 0, page 6.
        let page = PageRequest {
            offset: 100,
            size: 20,
            paginated: true,
        };
        let spec = build_request(
            &QueryInput::term("x"),
            &YearRange::default(),
            &WosFilters::default(),
            &page,
        )
        .expect("request");
        assert!(spec.query.contains(&("limit".to_string(), "20".to_string())));
        assert!(spec.query.contains(&("page".to_string(), "6".to_string())));
    }

    #[test]
    fn request_offset_aligned_to_page_limit_requests_full_page() {
        // Offset 50 with a 30-record window: not a multiple of 30, but a
        // full page starting at 50 covers it.
        let page = PageRequest {
            offset: 50,
            size: 30,
            paginated: true,
        };
        let spec = build_request(
            &QueryInput::term("x"),
            &YearRange::default(),
            &WosFilters::default(),
            &page,
        )
        .expect("request");
        assert!(spec.query.contains(&("limit".to_string(), "50".to_string())));
        assert!(spec.query.contains(&("page".to_string(), "2".to_string())));
    }

    #[test]
    fn request_rejects_unaddressable_offset() {
        let page = PageRequest {
            offset: 37,
            size: 25,
            paginated: true,
        };
        assert!(build_request(
            &QueryInput::term("x"),
            &YearRange::default(),
            &WosFilters::default(),
            &page,
        )
        .is_err());
    }

    #[test]
    fn request_includes_edition_when_set() {
        let filters = WosFilters {
            edition: Some("SCI".into()),
            ..Default::default()
        };
        let spec = build_request(
            &QueryInput::term("x"),
            &YearRange::default(),
            &filters,
            &PageRequest::count_probe(),
        )
        .expect("request");
        assert!(spec.query.contains(&("edition".to_string(), "WOS+SCI".to_string())));
    }

    #[test]
    fn parse_total_reads_metadata() {
        let body: serde_json::Value = serde_json::from_str(MOCK_RESPONSE).expect("json");
        assert_eq!(parse_total(&body).expect("total"), 73);
    }

    #[test]
    fn parse_total_missing_is_provider_error() {
        let body = serde_json::json!({"hits": []});
        assert!(matches!(parse_total(&body), Err(SearchError::Provider(_))));
    }

    #[test]
    fn parse_records_normalizes_hits() {
        let body: serde_json::Value = serde_json::from_str(MOCK_RESPONSE).expect("json");
        let records = parse_records(&body).expect("records");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "Threat intelligence sharing between CSIRTs");
        assert_eq!(records[0].authors, vec!["García, M.".to_string()]);
        assert_eq!(records[0].year, Some(2024));
        assert_eq!(records[0].doi.as_deref(), Some("10.1093/cybsec/0001"));
        assert!(records[1].doi.is_none());
        assert!(records[1].source.is_none());
    }

    #[test]
    fn validate_rejects_unknown_values() {
        let bad_db = WosFilters {
            database: "EVERYTHING".into(),
            ..Default::default()
        };
        assert!(validate_filters(&bad_db).is_err());

        let bad_edition = WosFilters {
            edition: Some("XYZ".into()),
            ..Default::default()
        };
        assert!(validate_filters(&bad_edition).is_err());

        let bad_sort = WosFilters {
            sort_field: "XX+D".into(),
            ..Default::default()
        };
        assert!(validate_filters(&bad_sort).is_err());
    }

    #[test]
    fn validate_accepts_defaults() {
        assert!(validate_filters(&WosFilters::default()).is_ok());
    }
}
