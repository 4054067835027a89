//! External catalog providers
//!
//! Each provider searches its upstream catalog and adapts the response into
//! [`CatalogEntry`] values, whatever the upstream field names are (TMDB says
//! `title` for movies and `name` for tv, OpenLibrary has its own shape).
use crate::{
    error::AppResult,
    models::{CatalogEntry, MediaKind},
};

pub mod openlibrary;
pub mod tmdb;

pub use openlibrary::OpenLibraryProvider;
pub use tmdb::TmdbProvider;

/// Cache TTL of search results, in seconds
pub const SEARCH_CACHE_TTL: u64 = 3600;

/// Cache TTL of detail lookups, in seconds
pub const DETAILS_CACHE_TTL: u64 = 86400;

/// Trait for catalog data providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Searches the catalog, returning results in upstream relevance order
    async fn search(&self, kind: MediaKind, query: &str) -> AppResult<Vec<CatalogEntry>>;

    /// Completes a search result with fields only the detail endpoint has
    async fn details(&self, entry: &CatalogEntry) -> AppResult<CatalogEntry>;

    /// Whether this provider serves the given media kind
    fn supports(&self, kind: MediaKind) -> bool;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Turns a non-success upstream response into an error
pub(crate) async fn ensure_success(
    provider: &str,
    response: reqwest::Response,
) -> AppResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    tracing::error!(provider, status = %status, body = %body, "Catalog request failed");
    Err(crate::error::AppError::ExternalApi(format!(
        "{} API returned status {}: {}",
        provider, status, body
    )))
}
