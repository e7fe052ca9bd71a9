//! The engine run: keyword counts, combination counts, ranking, and
//! (extended mode) full extraction, per provider.
//!
//! Providers run concurrently and fully isolated — one provider's auth
//! failure or cancellation never touches its siblings. Within a provider
//! every query flows through one sequential stream, so the rate limiter's
//! pacing guarantee holds without cross-provider coordination.

use std::collections::BTreeMap;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::combinations;
use crate::config::{Mode, RunConfig};
use crate::error::{Result, SearchError};
use crate::provider::{search, ProviderClient, QueryInput};
use crate::providers::{IeeeClient, ScopusClient, WosClient};
use crate::types::{
    AggregateOutput, ExtendedOutput, Provider, ProviderOutcome, QueryFailure, RunReport,
};

use super::ranking::{self, CombinationCount, TOP_N};

/// Run the counting pipeline (and extraction, in extended mode) for each
/// selected provider.
///
/// Configuration problems abort before any network call. Per-provider
/// fatal errors (missing/rejected API key, cancellation) mark only that
/// provider's entry as failed; individual query failures are recorded
/// inside the aggregate and never abort a run.
pub async fn run(
    providers: &[Provider],
    config: &RunConfig,
    cancel: &CancellationToken,
) -> Result<RunReport> {
    config.validate()?;

    let pipelines = providers.iter().map(|&provider| async move {
        (provider, run_provider(provider, config, cancel).await)
    });
    let outcomes = futures::future::join_all(pipelines).await;

    let mut report = BTreeMap::new();
    for (provider, outcome) in outcomes {
        if let ProviderOutcome::Failed { error } = &outcome {
            tracing::warn!(%provider, error = %error, "provider run failed");
        }
        report.insert(provider, outcome);
    }
    Ok(RunReport { providers: report })
}

/// Build the provider's client and drive its pipeline, folding fatal
/// errors into a failed outcome.
async fn run_provider(
    provider: Provider,
    config: &RunConfig,
    cancel: &CancellationToken,
) -> ProviderOutcome {
    let Some(api_key) = config.credentials.for_provider(provider) else {
        return ProviderOutcome::Failed {
            error: SearchError::Auth(format!("no API key configured for {provider}")).to_string(),
        };
    };

    let result = match provider {
        Provider::Scopus => match ScopusClient::new(api_key, config) {
            Ok(client) => run_pipeline(&client, config, cancel).await,
            Err(err) => Err(err),
        },
        Provider::Ieee => match IeeeClient::new(api_key, config) {
            Ok(client) => run_pipeline(&client, config, cancel).await,
            Err(err) => Err(err),
        },
        Provider::Wos => match WosClient::new(api_key, config) {
            Ok(client) => run_pipeline(&client, config, cancel).await,
            Err(err) => Err(err),
        },
    };

    match result {
        Ok((aggregate, extended)) => ProviderOutcome::Completed { aggregate, extended },
        Err(err) => ProviderOutcome::Failed {
            error: err.to_string(),
        },
    }
}

/// The per-provider pipeline over any backend.
///
/// Public so alternative [`ProviderClient`] implementations can reuse the
/// orchestration (the integration tests drive it with a scripted one).
pub async fn run_pipeline<C: ProviderClient>(
    client: &C,
    config: &RunConfig,
    cancel: &CancellationToken,
) -> Result<(AggregateOutput, Option<ExtendedOutput>)> {
    let provider = client.provider();
    let mut per_keyword: BTreeMap<String, Option<u64>> = BTreeMap::new();
    let mut failures: Vec<QueryFailure> = Vec::new();

    tracing::debug!(%provider, keywords = config.keywords.len(), "counting keywords");
    for keyword in &config.keywords {
        ensure_active(cancel)?;
        let input = QueryInput::term(keyword.clone());
        match client.count(&input).await {
            Ok(count) => {
                tracing::debug!(%provider, %keyword, count, "keyword counted");
                per_keyword.insert(keyword.clone(), Some(count));
            }
            Err(err) => {
                record_or_bail(&mut failures, &input, err)?;
                per_keyword.insert(keyword.clone(), None);
            }
        }
    }

    let combos = combinations::triples(&config.keywords);
    tracing::debug!(%provider, combinations = combos.len(), "counting combinations");
    let mut counts: Vec<CombinationCount> = Vec::with_capacity(combos.len());
    for combination in combos {
        ensure_active(cancel)?;
        let input = QueryInput::terms(combination.terms());
        let count = match client.count(&input).await {
            Ok(count) => {
                tracing::debug!(%provider, query = %input.text(), count, "combination counted");
                Some(count)
            }
            Err(err) => {
                record_or_bail(&mut failures, &input, err)?;
                None
            }
        };
        counts.push(CombinationCount {
            combination,
            query: input.text(),
            count,
        });
    }

    let mut top_combinations = ranking::rank(&counts, TOP_N);
    tracing::debug!(%provider, ranked = top_combinations.len(), "combinations ranked");

    if config.collect_titles {
        for entry in &mut top_combinations {
            ensure_active(cancel)?;
            let input = QueryInput::expression(entry.query.clone());
            match client.fetch_page(&input, 0, provider.page_limit()).await {
                Ok(page) => {
                    entry.titles = page.records.into_iter().map(|r| r.title).collect();
                }
                Err(SearchError::Auth(reason)) => return Err(SearchError::Auth(reason)),
                Err(err) => {
                    tracing::warn!(%provider, query = %entry.query, error = %err, "title fetch failed");
                }
            }
        }
    }

    let extended = if config.mode == Mode::Extended {
        ensure_active(cancel)?;
        // Validated ahead of the run; absent only if the pipeline is
        // driven directly with an inconsistent config.
        let request = config.extended.as_ref().ok_or_else(|| {
            SearchError::Config("extended mode requires an extraction query".into())
        })?;
        let input = QueryInput::expression(request.query.clone());
        match search(client, &input, request.max_results).await {
            Ok(outcome) => {
                tracing::debug!(
                    %provider,
                    records = outcome.records.len(),
                    cap_truncated = outcome.cap_truncated,
                    "extraction finished"
                );
                Some(ExtendedOutput {
                    query: request.query.clone(),
                    total_count: outcome.total_count,
                    records: outcome.records,
                    cap_truncated: outcome.cap_truncated,
                })
            }
            Err(err) => {
                record_or_bail(&mut failures, &input, err)?;
                None
            }
        }
    } else {
        None
    };

    Ok((
        AggregateOutput {
            provider,
            generated_at: Utc::now(),
            per_keyword,
            top_combinations,
            failures,
        },
        extended,
    ))
}

/// Record a query failure, or propagate it when it is fatal to the whole
/// provider run (auth rejection, cancellation).
fn record_or_bail(
    failures: &mut Vec<QueryFailure>,
    input: &QueryInput,
    err: SearchError,
) -> Result<()> {
    match err {
        SearchError::Auth(_) | SearchError::Cancelled => Err(err),
        other => {
            tracing::warn!(query = %input.text(), error = %other, "query failed; run continues");
            failures.push(QueryFailure {
                query: input.text(),
                reason: other.to_string(),
            });
            Ok(())
        }
    }
}

fn ensure_active(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(SearchError::Cancelled)
    } else {
        Ok(())
    }
}
