//! Provider backend implementations.
//!
//! Each module owns one provider's query translation (pure functions,
//! tested without network), response normalization, and the client struct
//! implementing [`crate::provider::ProviderClient`].

pub mod ieee;
pub mod scopus;
pub mod wos;

pub use ieee::IeeeClient;
pub use scopus::ScopusClient;
pub use wos::WosClient;

use crate::error::{Result, SearchError};
use crate::types::Provider;

/// Pagination window for one translated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 0-based record offset.
    pub offset: usize,
    /// Desired page length.
    pub size: usize,
    /// Whether the caller drives pagination. When false, a size above
    /// the provider maximum is a configuration error instead of being
    /// silently clamped.
    pub paginated: bool,
}

impl PageRequest {
    /// The cheapest request that still reports the total: one record.
    pub fn count_probe() -> Self {
        Self {
            offset: 0,
            size: 1,
            paginated: true,
        }
    }
}

/// Resolve the page size actually sent to `provider`.
///
/// Clamps to the provider's documented per-request maximum; without
/// pagination enabled the clamp would silently drop records, so that
/// case fails fast instead.
pub(crate) fn effective_page_size(provider: Provider, page: &PageRequest) -> Result<usize> {
    let max = provider.page_limit();
    if page.size > max && !page.paginated {
        return Err(SearchError::Config(format!(
            "page size {} exceeds the {} per-request maximum of {max}; enable pagination",
            page.size,
            provider.name()
        )));
    }
    Ok(page.size.clamp(1, max))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_within_limit_passes_through() {
        let page = PageRequest {
            offset: 0,
            size: 10,
            paginated: false,
        };
        assert_eq!(effective_page_size(Provider::Scopus, &page).expect("valid"), 10);
    }

    #[test]
    fn oversized_page_without_pagination_is_config_error() {
        let page = PageRequest {
            offset: 0,
            size: 100,
            paginated: false,
        };
        let err = effective_page_size(Provider::Scopus, &page).unwrap_err();
        assert!(matches!(err, SearchError::Config(_)));
        assert!(err.to_string().contains("25"));
    }

    #[test]
    fn oversized_page_with_pagination_clamps() {
        let page = PageRequest {
            offset: 50,
            size: 100,
            paginated: true,
        };
        assert_eq!(effective_page_size(Provider::Wos, &page).expect("clamped"), 50);
    }

    #[test]
    fn zero_size_raised_to_one() {
        let page = PageRequest {
            offset: 0,
            size: 0,
            paginated: true,
        };
        assert_eq!(effective_page_size(Provider::Ieee, &page).expect("raised"), 1);
    }
}
