//! IEEE Xplore backend.
//!
//! IEEE takes the query text verbatim in `querytext`, year bounds as
//! separate `start_year`/`end_year` parameters, and the API key as a URL
//! parameter — which is why request logging masks `apikey` values.
//! Pagination is record-offset based via `start_record` (1-based).

use std::sync::Arc;

use crate::config::{IeeeFilters, RunConfig, YearRange};
use crate::error::{Result, SearchError};
use crate::http::{build_client, HttpExecutor, RequestSpec};
use crate::provider::{ProviderClient, QueryInput};
use crate::providers::{effective_page_size, PageRequest};
use crate::rate_limit::RateLimiter;
use crate::types::{Page, Provider, Record};

/// Search endpoint.
pub const BASE_URL: &str = "https://ieeexploreapi.ieee.org/api/v1/search/articles";

/// Recognized content types. Case sensitive on the IEEE side.
pub const CONTENT_TYPES: &[&str] = &[
    "Books",
    "Conferences",
    "Courses",
    "Early Access",
    "Journals",
    "Magazines",
    "Standards",
];

/// Reject content types IEEE does not document.
pub(crate) fn validate_filters(filters: &IeeeFilters) -> Result<()> {
    for ct in &filters.content_types {
        if !CONTENT_TYPES.contains(&ct.as_str()) {
            return Err(SearchError::Config(format!(
                "unknown IEEE content type: {ct}"
            )));
        }
    }
    Ok(())
}

/// Translate a logical query into an IEEE request. Pure; the caller
/// attaches the `apikey` parameter.
pub fn build_request(
    input: &QueryInput,
    years: &YearRange,
    filters: &IeeeFilters,
    page: &PageRequest,
) -> Result<RequestSpec> {
    let size = effective_page_size(Provider::Ieee, page)?;
    let mut query = vec![
        ("querytext".into(), input.text()),
        ("max_records".into(), size.to_string()),
        ("start_record".into(), (page.offset + 1).to_string()),
    ];
    if let Some(from) = years.from {
        query.push(("start_year".into(), from.to_string()));
    }
    if let Some(to) = years.to {
        query.push(("end_year".into(), to.to_string()));
    }
    // The API accepts a single content type per request.
    if let Some(first) = filters.content_types.first() {
        if filters.content_types.len() > 1 {
            tracing::debug!(
                dropped = filters.content_types.len() - 1,
                "IEEE accepts one content type per request; sending the first"
            );
        }
        query.push(("content_type".into(), first.clone()));
    }
    Ok(RequestSpec {
        base_url: BASE_URL.to_owned(),
        query,
        headers: Vec::new(),
    })
}

/// Total hits from the response.
pub fn parse_total(value: &serde_json::Value) -> Result<u64> {
    value
        .get("total_records")
        .and_then(|t| t.as_u64())
        .ok_or_else(|| SearchError::Provider("missing total_records".into()))
}

/// Normalize the article list. Articles without a title are skipped.
pub fn parse_records(value: &serde_json::Value) -> Result<Vec<Record>> {
    let articles = match value.get("articles") {
        Some(serde_json::Value::Array(articles)) => articles,
        Some(other) => {
            return Err(SearchError::Provider(format!(
                "articles is not an array: {other}"
            )))
        }
        None => return Ok(Vec::new()),
    };

    let mut records = Vec::with_capacity(articles.len());
    for article in articles {
        let Some(title) = article.get("title").and_then(|t| t.as_str()) else {
            tracing::debug!("skipping IEEE article without title");
            continue;
        };
        let authors = article
            .get("authors")
            .and_then(|a| a.get("authors"))
            .and_then(|a| a.as_array())
            .map(|list| {
                list.iter()
                    .filter_map(|a| a.get("full_name").and_then(|n| n.as_str()))
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();
        let year = article.get("publication_year").and_then(|y| match y {
            serde_json::Value::String(s) => s.parse::<i32>().ok(),
            serde_json::Value::Number(n) => n.as_i64().map(|n| n as i32),
            _ => None,
        });
        records.push(Record {
            title: title.to_owned(),
            authors,
            year,
            doi: article
                .get("doi")
                .and_then(|d| d.as_str())
                .map(str::to_owned),
            source: article
                .get("publication_title")
                .and_then(|s| s.as_str())
                .map(str::to_owned),
        });
    }
    Ok(records)
}

/// IEEE Xplore API client for one run.
#[derive(Debug)]
pub struct IeeeClient {
    exec: HttpExecutor,
    api_key: String,
    years: YearRange,
    filters: IeeeFilters,
    base_url: String,
}

impl IeeeClient {
    /// Build a client from the run configuration and credential.
    pub fn new(api_key: impl Into<String>, config: &RunConfig) -> Result<Self> {
        let limiter = Arc::new(RateLimiter::new(config.rate.interval_for(Provider::Ieee)));
        Ok(Self {
            exec: HttpExecutor::new(
                build_client(config.timeout_seconds)?,
                limiter,
                config.retry.to_policy(),
            ),
            api_key: api_key.into(),
            years: config.years,
            filters: config.ieee.clone(),
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
        // Key travels as a URL parameter; it is masked in display_url().
        spec.query.insert(0, ("apikey".into(), self.api_key.clone()));
        spec.headers = vec![("Accept".into(), "application/json".into())];
        Ok(spec)
    }
}

impl ProviderClient for IeeeClient {
    fn provider(&self) -> Provider {
        Provider::Ieee
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

#[cfg(test)]
mod tests {
    use super::*;

    const MOCK_RESPONSE: &str = r#"{
        "total_records": 412,
        "articles": [
            {
                "title": "SOC analyst workload characterization",
                "authors": {"authors": [
                    {"full_name": "Jane Doe"},
                    {"full_name": "Juan Pérez"}
                ]},
                "publication_year": "2022",
                "doi": "10.1109/ACCESS.2022.0001",
                "publication_title": "IEEE Access"
            },
            {
                "title": "CSIRT playbook generation"
            }
        ]
    }"#;

    #[test]
    fn request_carries_query_and_window() {
        let page = PageRequest {
            offset: 200,
            size: 200,
            paginated: true,
        };
        let spec = build_request(
            &QueryInput::term("CSIRT"),
            &YearRange::default(),
            &IeeeFilters::default(),
            &page,
        )
        .expect("request");
        assert!(spec.query.contains(&("querytext".to_string(), "\"CSIRT\"".to_string())));
        assert!(spec.query.contains(&("max_records".to_string(), "200".to_string())));
        // start_record is 1-based.
        assert!(spec.query.contains(&("start_record".to_string(), "201".to_string())));
    }

    #[test]
    fn request_omits_unset_years() {
        let spec = build_request(
            &QueryInput::term("x"),
            &YearRange::default(),
            &IeeeFilters::default(),
            &PageRequest::count_probe(),
        )
        .expect("request");
        assert!(!spec.query.iter().any(|(k, _)| k == "start_year" || k == "end_year"));
    }

    #[test]
    fn request_maps_year_bounds() {
        let years = YearRange {
            from: Some(2020),
            to: Some(2025),
        };
        let spec = build_request(
            &QueryInput::term("x"),
            &years,
            &IeeeFilters::default(),
            &PageRequest::count_probe(),
        )
        .expect("request");
        assert!(spec.query.contains(&("start_year".to_string(), "2020".to_string())));
        assert!(spec.query.contains(&("end_year".to_string(), "2025".to_string())));
    }

    #[test]
    fn request_sends_first_content_type_only() {
        let filters = IeeeFilters {
            content_types: vec!["Journals".into(), "Conferences".into()],
        };
        let spec = build_request(
            &QueryInput::term("x"),
            &YearRange::default(),
            &filters,
            &PageRequest::count_probe(),
        )
        .expect("request");
        let content: Vec<_> = spec.query.iter().filter(|(k, _)| k == "content_type").collect();
        assert_eq!(content.len(), 1);
        assert_eq!(content[0].1, "Journals");
    }

    #[test]
    fn request_rejects_oversize_without_pagination() {
        let page = PageRequest {
            offset: 0,
            size: 500,
            paginated: false,
        };
        assert!(build_request(
            &QueryInput::term("x"),
            &YearRange::default(),
            &IeeeFilters::default(),
            &page,
        )
        .is_err());
    }

    #[test]
    fn parse_total_reads_number() {
        let body: serde_json::Value = serde_json::from_str(MOCK_RESPONSE).expect("json");
        assert_eq!(parse_total(&body).expect("total"), 412);
    }

    #[test]
    fn parse_total_missing_is_provider_error() {
        let body = serde_json::json!({"articles": []});
        assert!(matches!(parse_total(&body), Err(SearchError::Provider(_))));
    }

    #[test]
    fn parse_records_normalizes_articles() {
        let body: serde_json::Value = serde_json::from_str(MOCK_RESPONSE).expect("json");
        let records = parse_records(&body).expect("records");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "SOC analyst workload characterization");
        assert_eq!(records[0].authors.len(), 2);
        assert_eq!(records[0].year, Some(2022));
        assert_eq!(records[0].source.as_deref(), Some("IEEE Access"));
        assert!(records[1].authors.is_empty());
        assert!(records[1].year.is_none());
    }

    #[test]
    fn parse_records_missing_articles_is_empty_page() {
        let body = serde_json::json!({"total_records": 0});
        assert!(parse_records(&body).expect("empty").is_empty());
    }

    #[test]
    fn validate_rejects_unknown_content_type() {
        let filters = IeeeFilters {
            content_types: vec!["Webinars".into()],
        };
        assert!(validate_filters(&filters).is_err());
    }

    #[test]
    fn validate_accepts_documented_content_types() {
        let filters = IeeeFilters {
            content_types: vec!["Early Access".into(), "Standards".into()],
        };
        assert!(validate_filters(&filters).is_ok());
    }
}
