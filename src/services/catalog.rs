use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{CatalogEntry, MediaKind},
    services::{matching, providers::CatalogProvider},
};

/// Routes catalog lookups to the provider serving each media kind
#[derive(Clone)]
pub struct CatalogService {
    providers: Vec<Arc<dyn CatalogProvider>>,
}

impl CatalogService {
    pub fn new(providers: Vec<Arc<dyn CatalogProvider>>) -> Self {
        Self { providers }
    }

    fn provider_for(&self, kind: MediaKind) -> AppResult<&Arc<dyn CatalogProvider>> {
        self.providers
            .iter()
            .find(|provider| provider.supports(kind))
            .ok_or_else(|| AppError::Internal(format!("No catalog provider for {}", kind.plural())))
    }

    /// Raw search results in upstream order
    pub async fn search(&self, kind: MediaKind, query: &str) -> AppResult<Vec<CatalogEntry>> {
        self.provider_for(kind)?.search(kind, query).await
    }

    /// Best catalog match for a title, completed with detail fields
    ///
    /// A title the catalog does not know, or a catalog that is unreachable,
    /// yields `None`: adding an item never depends on the catalog.
    #[tracing::instrument(skip(self))]
    pub async fn lookup(&self, kind: MediaKind, title: &str) -> Option<CatalogEntry> {
        let provider = match self.provider_for(kind) {
            Ok(provider) => provider,
            Err(e) => {
                tracing::warn!(error = %e, "Catalog lookup skipped");
                return None;
            }
        };

        let candidates = match provider.search(kind, title).await {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    title = %title,
                    provider = provider.name(),
                    "Catalog search failed, continuing without metadata"
                );
                return None;
            }
        };

        let Some((best, score)) = matching::find_best_match_scored(title, &candidates) else {
            tracing::info!(title = %title, provider = provider.name(), "No catalog match");
            return None;
        };

        tracing::info!(
            title = %title,
            matched = %best.title,
            id = %best.id,
            score,
            candidates = candidates.len(),
            "Resolved catalog match"
        );

        match provider.details(best).await {
            Ok(detailed) => Some(detailed),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    id = %best.id,
                    "Catalog details failed, using search result"
                );
                Some(best.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CatalogId;
    use crate::services::providers::MockCatalogProvider;
    use mockall::predicate::*;

    fn entry(id: i64, title: &str, original: Option<&str>) -> CatalogEntry {
        let mut entry = CatalogEntry::new(CatalogId::Tmdb(id), MediaKind::Movie, title);
        entry.original_title = original.map(str::to_string);
        entry
    }

    fn movie_provider() -> MockCatalogProvider {
        let mut provider = MockCatalogProvider::new();
        provider
            .expect_supports()
            .returning(|kind| kind == MediaKind::Movie);
        provider.expect_name().return_const("mock");
        provider
    }

    #[tokio::test]
    async fn test_lookup_picks_best_match_not_first() {
        let mut provider = movie_provider();
        provider
            .expect_search()
            .with(eq(MediaKind::Movie), eq("Inception"))
            .times(1)
            .returning(|_, _| {
                Ok(vec![
                    entry(1, "Inception: The Cobol Job", None),
                    entry(2, "Origen", Some("Inception")),
                ])
            });
        provider
            .expect_details()
            .times(1)
            .returning(|e| {
                let mut detailed = e.clone();
                detailed.director = Some("Christopher Nolan".to_string());
                Ok(detailed)
            });

        let service = CatalogService::new(vec![Arc::new(provider)]);
        let found = service.lookup(MediaKind::Movie, "Inception").await.unwrap();

        assert_eq!(found.id, CatalogId::Tmdb(2));
        assert_eq!(found.director.as_deref(), Some("Christopher Nolan"));
    }

    #[tokio::test]
    async fn test_lookup_no_candidates() {
        let mut provider = movie_provider();
        provider.expect_search().returning(|_, _| Ok(vec![]));
        provider.expect_details().never();

        let service = CatalogService::new(vec![Arc::new(provider)]);
        assert!(service.lookup(MediaKind::Movie, "Nothing").await.is_none());
    }

    #[tokio::test]
    async fn test_lookup_search_failure_is_not_fatal() {
        let mut provider = movie_provider();
        provider
            .expect_search()
            .returning(|_, _| Err(AppError::ExternalApi("down".to_string())));

        let service = CatalogService::new(vec![Arc::new(provider)]);
        assert!(service.lookup(MediaKind::Movie, "Inception").await.is_none());
    }

    #[tokio::test]
    async fn test_lookup_details_failure_falls_back() {
        let mut provider = movie_provider();
        provider
            .expect_search()
            .returning(|_, _| Ok(vec![entry(7, "Heat", None)]));
        provider
            .expect_details()
            .returning(|_| Err(AppError::ExternalApi("timeout".to_string())));

        let service = CatalogService::new(vec![Arc::new(provider)]);
        let found = service.lookup(MediaKind::Movie, "Heat").await.unwrap();
        assert_eq!(found.id, CatalogId::Tmdb(7));
        assert_eq!(found.director, None);
    }

    #[tokio::test]
    async fn test_search_without_provider() {
        let service = CatalogService::new(vec![Arc::new(movie_provider())]);
        let result = service.search(MediaKind::Book, "Dune").await;
        assert!(matches!(result, Err(AppError::Internal(_))));
        assert!(service.lookup(MediaKind::Book, "Dune").await.is_none());
    }
}
