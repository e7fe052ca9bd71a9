//! Trait definition for pluggable provider backends.
//!
//! Each provider (Scopus, IEEE Xplore, Web of Science) implements
//! [`ProviderClient`] to expose a uniform count/fetch interface. The
//! pagination driver [`search`] is provider-agnostic and lives here.

use std::future::Future;

use crate::error::Result;
use crate::types::{Page, Provider, Record};

/// A logical query, before provider-specific translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryInput {
    /// One or more keywords, joined with logical AND.
    Terms(Vec<String>),
    /// An explicit boolean expression, passed through to the provider's
    /// query grammar (extended mode).
    Expression(String),
}

impl QueryInput {
    /// A single-term query.
    pub fn term(term: impl Into<String>) -> Self {
        Self::Terms(vec![term.into()])
    }

    /// A multi-term AND query.
    pub fn terms(terms: &[String]) -> Self {
        Self::Terms(terms.to_vec())
    }

    /// A raw boolean expression.
    pub fn expression(expr: impl Into<String>) -> Self {
        Self::Expression(expr.into())
    }

    /// Canonical query text: quoted terms joined with AND, or the raw
    /// expression verbatim. This is the identity under which outcomes
    /// and failures are recorded.
    pub fn text(&self) -> String {
        match self {
            Self::Terms(terms) => terms
                .iter()
                .map(|t| format!("\"{t}\""))
                .collect::<Vec<_>>()
                .join(" AND "),
            Self::Expression(expr) => expr.clone(),
        }
    }
}

/// Records retrieved by a full paginated extraction.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Total hits the provider reports for the query.
    pub total_count: u64,
    /// Retrieved records, in provider order.
    pub records: Vec<Record>,
    /// True when the provider's hard result cap ended the extraction.
    pub cap_truncated: bool,
}

/// A pluggable provider backend.
///
/// Implementors own their credential, filter set, rate limiter handle,
/// and retry policy; nothing is shared across providers except the
/// common types. All implementations must be `Send + Sync` so provider
/// pipelines can run concurrently.
pub trait ProviderClient: Send + Sync {
    /// Which provider this client talks to.
    fn provider(&self) -> Provider;

    /// Total hits for the query, without retrieving records.
    fn count(&self, input: &QueryInput) -> impl Future<Output = Result<u64>> + Send;

    /// Fetch one page of records starting at the 0-based `offset`.
    ///
    /// `size` is the desired page length; implementations clamp it to
    /// their per-request maximum. This is the restartable pagination
    /// primitive — callers may resume from any offset a prior page
    /// ended at.
    fn fetch_page(
        &self,
        input: &QueryInput,
        offset: usize,
        size: usize,
    ) -> impl Future<Output = Result<Page>> + Send;
}

/// Drive [`ProviderClient::fetch_page`] until `max_results` records are
/// collected, the provider runs out of pages, or its hard result cap is
/// reached.
///
/// The final page request is shrunk to the remaining count, so exactly
/// `max_results` records come back when the provider has that many.
/// Hitting the cap terminates without error, with
/// [`SearchOutcome::cap_truncated`] set.
pub async fn search<C: ProviderClient>(
    client: &C,
    input: &QueryInput,
    max_results: usize,
) -> Result<SearchOutcome> {
    let provider = client.provider();
    let page_limit = provider.page_limit();
    let cap = provider.result_cap();

    let mut records: Vec<Record> = Vec::new();
    let mut total_count: Option<u64> = None;
    let mut cap_truncated = false;

    while records.len() < max_results {
        let offset = records.len();
        if offset >= cap {
            tracing::debug!(%provider, cap, "extraction stopped at provider result cap");
            cap_truncated = true;
            break;
        }

        let want = (max_results - offset).min(page_limit).min(cap - offset);
        let page = client.fetch_page(input, offset, want).await?;

        if total_count.is_none() {
            total_count = Some(page.total_count);
            tracing::debug!(%provider, total = page.total_count, "extraction started");
        }

        if page.records.is_empty() {
            break;
        }
        let received = page.records.len();
        records.extend(page.records);

        tracing::debug!(
            %provider,
            page_records = received,
            accumulated = records.len(),
            "page retrieved"
        );

        // A short page means the provider has no more records.
        if received < want {
            break;
        }
        if let Some(total) = total_count {
            if records.len() as u64 >= total {
                break;
            }
        }
    }

    records.truncate(max_results);
    Ok(SearchOutcome {
        total_count: total_count.unwrap_or(0),
        records,
        cap_truncated,
    })
}
