//! TMDB (The Movie Database) provider
//!
//! Serves movies and tv series.
//!
//! API Flow:
//! 1. Search: /search/movie or /search/tv → ranked results with TMDB ids
//! 2. Details: /movie/{id}?append_to_response=credits → genres, director
//!    /tv/{id} → genres, number of seasons
use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{
        CatalogEntry, CatalogId, MediaKind, TmdbMovieDetails, TmdbMovieResult, TmdbTvDetails,
        TmdbTvResult,
    },
    services::providers::{
        ensure_success, CatalogProvider, DETAILS_CACHE_TTL, SEARCH_CACHE_TTL,
    },
};
use reqwest::Client as HttpClient;

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    language: String,
    cache: Cache,
}

impl TmdbProvider {
    pub fn new(cache: Cache, api_key: String, api_url: String, language: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
            language,
            cache,
        }
    }

    fn search_path(kind: MediaKind) -> AppResult<&'static str> {
        match kind {
            MediaKind::Movie => Ok("search/movie"),
            MediaKind::Series => Ok("search/tv"),
            MediaKind::Book => Err(AppError::InvalidInput(
                "TMDB does not catalog books".to_string(),
            )),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_url.trim_end_matches('/'), path)
    }

    async fn get_json(&self, path: &str, extra: &[(&str, &str)]) -> AppResult<serde_json::Value> {
        let mut params: Vec<(&str, &str)> = vec![
            ("api_key", self.api_key.as_str()),
            ("language", self.language.as_str()),
        ];
        params.extend_from_slice(extra);

        let response = self
            .http_client
            .get(self.url(path))
            .query(&params)
            .send()
            .await?;
        let response = ensure_success(self.name(), response).await?;

        Ok(response.json().await?)
    }

    async fn fetch_search(&self, kind: MediaKind, query: &str) -> AppResult<Vec<CatalogEntry>> {
        let path = Self::search_path(kind)?;
        let body = self.get_json(path, &[("query", query)]).await?;
        let entries = parse_search_results(kind, &body)?;

        tracing::info!(
            query = %query,
            kind = %kind,
            results = entries.len(),
            provider = "tmdb",
            "Catalog search completed"
        );

        Ok(entries)
    }

    async fn fetch_details(&self, entry: &CatalogEntry) -> AppResult<CatalogEntry> {
        let id = entry.tmdb_id().ok_or_else(|| {
            AppError::InvalidInput(format!("{} is not a TMDB entry", entry.id))
        })?;

        let enriched = match entry.kind {
            MediaKind::Movie => {
                let body = self
                    .get_json(&format!("movie/{}", id), &[("append_to_response", "credits")])
                    .await?;
                let details: TmdbMovieDetails = serde_json::from_value(body).map_err(|e| {
                    AppError::ExternalApi(format!("Failed to parse TMDB movie details: {}", e))
                })?;
                details.enrich(entry.clone())
            }
            MediaKind::Series => {
                let body = self.get_json(&format!("tv/{}", id), &[]).await?;
                let details: TmdbTvDetails = serde_json::from_value(body).map_err(|e| {
                    AppError::ExternalApi(format!("Failed to parse TMDB tv details: {}", e))
                })?;
                details.enrich(entry.clone())
            }
            MediaKind::Book => {
                return Err(AppError::InvalidInput(
                    "TMDB does not catalog books".to_string(),
                ))
            }
        };

        tracing::debug!(id, kind = %entry.kind, provider = "tmdb", "Details fetched");

        Ok(enriched)
    }

    async fn cached_details(&self, entry: &CatalogEntry) -> AppResult<CatalogEntry> {
        cached!(
            self.cache,
            CacheKey::CatalogDetails(entry.kind, entry.id.clone()),
            DETAILS_CACHE_TTL,
            self.fetch_details(entry)
        )
    }
}

/// Adapts a TMDB search response into catalog entries
///
/// Results that fail to deserialize are skipped rather than failing the
/// whole search.
pub fn parse_search_results(
    kind: MediaKind,
    body: &serde_json::Value,
) -> AppResult<Vec<CatalogEntry>> {
    let results = body["results"]
        .as_array()
        .ok_or_else(|| AppError::ExternalApi("Invalid TMDB response format".to_string()))?;

    let entries = results
        .iter()
        .enumerate()
        .filter_map(|(index, result)| match kind {
            MediaKind::Movie => serde_json::from_value::<TmdbMovieResult>(result.clone())
                .map(|r| r.into_entry(index))
                .ok(),
            MediaKind::Series => serde_json::from_value::<TmdbTvResult>(result.clone())
                .map(|r| r.into_entry(index))
                .ok(),
            MediaKind::Book => None,
        })
        .collect();

    Ok(entries)
}

#[async_trait::async_trait]
impl CatalogProvider for TmdbProvider {
    async fn search(&self, kind: MediaKind, query: &str) -> AppResult<Vec<CatalogEntry>> {
        if query.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }
        Self::search_path(kind)?;

        cached!(
            self.cache,
            CacheKey::CatalogSearch(kind, query.to_string()),
            SEARCH_CACHE_TTL,
            self.fetch_search(kind, query)
        )
    }

    async fn details(&self, entry: &CatalogEntry) -> AppResult<CatalogEntry> {
        if !matches!(entry.id, CatalogId::Tmdb(_)) {
            return Err(AppError::InvalidInput(format!(
                "{} is not a TMDB entry",
                entry.id
            )));
        }

        let mut enriched = self.cached_details(entry).await?;
        enriched.search_index = entry.search_index;
        Ok(enriched)
    }

    fn supports(&self, kind: MediaKind) -> bool {
        matches!(kind, MediaKind::Movie | MediaKind::Series)
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}
