//! # terna
//!
//! Combinatorial keyword search and counting across bibliographic APIs —
//! Scopus, IEEE Xplore, and Web of Science Starter.
//!
//! Given a keyword list, terna counts publications per keyword and per
//! unordered three-keyword combination on each selected provider, ranks
//! the combinations, and (in extended mode) extracts full metadata for a
//! chosen query with automatic pagination. Providers differ wildly in
//! query grammar, page limits, and rate ceilings; this crate hides those
//! differences behind one interface.
//!
//! ## Design
//!
//! - One pluggable client per provider, composed via [`ProviderClient`];
//!   each owns its credential, query translation, and pacing
//! - Per-provider rate limiting with a single serialized request clock
//! - Transient failures retried with bounded exponential backoff; a
//!   failed query records a `null` count instead of aborting the run
//! - Providers run concurrently and fully isolated — an invalid API key
//!   fails one provider's run, never its siblings
//! - Snapshots merge per provider: a re-run replaces only its own entry
//!
//! ## Security
//!
//! - API keys live in the run configuration, never in global state
//! - Keys are masked before any URL reaches a log line
//! - Queries are logged at debug/trace level only

pub mod combinations;
pub mod config;
pub mod error;
pub mod http;
pub mod orchestrator;
pub mod provider;
pub mod providers;
pub mod rate_limit;
pub mod retry;
pub mod store;
pub mod types;

use tokio_util::sync::CancellationToken;

pub use config::{Mode, RunConfig};
pub use error::{Result, SearchError};
pub use provider::{ProviderClient, QueryInput};
pub use store::ResultStore;
pub use types::{AggregateOutput, Provider, ProviderOutcome, Record, RunReport};

/// Run the counting pipeline (and extraction, in extended mode) for the
/// selected providers.
///
/// Each provider runs its own isolated pipeline; the report carries one
/// outcome per provider. The token cancels the run between queries — no
/// new request is issued after cancellation is observed.
///
/// # Errors
///
/// Returns [`SearchError::Config`] when the configuration is invalid;
/// nothing is sent in that case. Provider-scoped failures (missing or
/// rejected API keys) appear as failed entries in the report instead.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> terna::Result<()> {
/// use tokio_util::sync::CancellationToken;
///
/// let config = terna::RunConfig {
///     keywords: vec!["CSIRT".into(), "SOC".into(), "risk".into()],
///     ..Default::default()
/// };
/// let report = terna::run(
///     &[terna::Provider::Scopus],
///     &config,
///     &CancellationToken::new(),
/// )
/// .await?;
/// for (provider, aggregate, _) in report.completed() {
///     println!("{provider}: {} keywords counted", aggregate.per_keyword.len());
/// }
/// # Ok(())
/// # }
/// ```
pub async fn run(
    providers: &[Provider],
    config: &RunConfig,
    cancel: &CancellationToken,
) -> Result<RunReport> {
    orchestrator::run::run(providers, config, cancel).await
}

/// Run every provider with a fresh cancellation token.
///
/// Convenience wrapper around [`run`] for consumers that do not need
/// cancellation.
///
/// # Errors
///
/// Same as [`run`].
pub async fn run_all(config: &RunConfig) -> Result<RunReport> {
    run(Provider::all(), config, &CancellationToken::new()).await
}
