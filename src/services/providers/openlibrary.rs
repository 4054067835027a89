//! OpenLibrary provider
//!
//! Book search by title, author or ISBN. No API key is required.
use std::collections::HashMap;

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{
        catalog::publish_year, CatalogEntry, CatalogId, MediaKind, OpenLibraryDoc,
        OpenLibraryEdition,
    },
    services::providers::{ensure_success, CatalogProvider, SEARCH_CACHE_TTL},
};
use reqwest::Client as HttpClient;
use serde::Deserialize;

/// Default number of results per search
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Subjects kept as genres
const MAX_GENRES: usize = 5;

/// Cover image size: S, M or L
const COVER_SIZE: &str = "M";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    docs: Vec<serde_json::Value>,
}

#[derive(Clone)]
pub struct OpenLibraryProvider {
    http_client: HttpClient,
    api_url: String,
    covers_url: String,
    cache: Cache,
}

impl OpenLibraryProvider {
    pub fn new(cache: Cache, api_url: String, covers_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_url,
            covers_url,
            cache,
        }
    }

    /// Cover image URL, preferring the cover id over the ISBN
    pub fn cover_url(&self, cover_id: Option<i64>, isbn: Option<&str>) -> Option<String> {
        let base = self.covers_url.trim_end_matches('/');
        match (cover_id, isbn) {
            (Some(id), _) => Some(format!("{}/b/id/{}-{}.jpg", base, id, COVER_SIZE)),
            (None, Some(isbn)) => Some(format!("{}/b/isbn/{}-{}.jpg", base, isbn, COVER_SIZE)),
            (None, None) => None,
        }
    }

    /// Adapts one search document into a catalog entry
    pub fn normalize_doc(&self, doc: OpenLibraryDoc, search_index: usize) -> CatalogEntry {
        let isbn = doc.isbn.as_ref().and_then(|list| list.first().cloned());
        let mut entry = CatalogEntry::new(
            CatalogId::OpenLibrary(doc.catalog_key()),
            MediaKind::Book,
            doc.title.clone(),
        );
        entry.author = Some(doc.authors());
        entry.year = doc.year();
        entry.poster_path = self.cover_url(doc.cover_i, isbn.as_deref());
        entry.isbn = isbn;
        entry.total_pages = doc.number_of_pages_median;
        entry.genres = doc
            .subject
            .unwrap_or_default()
            .into_iter()
            .take(MAX_GENRES)
            .collect();
        entry.search_index = search_index;
        entry
    }

    /// Adapts a `/search.json` body, dropping untitled documents
    pub fn parse_search(&self, body: serde_json::Value) -> AppResult<Vec<CatalogEntry>> {
        let response: SearchResponse = serde_json::from_value(body).map_err(|e| {
            AppError::ExternalApi(format!("Invalid OpenLibrary response: {}", e))
        })?;

        Ok(response
            .docs
            .into_iter()
            .enumerate()
            .filter_map(|(index, doc)| {
                serde_json::from_value::<OpenLibraryDoc>(doc)
                    .ok()
                    .map(|doc| self.normalize_doc(doc, index))
            })
            .filter(|entry| !entry.title.trim().is_empty())
            .collect())
    }

    /// Adapts an `/api/books?jscmd=data` body for one ISBN
    pub fn parse_isbn(&self, isbn: &str, body: serde_json::Value) -> AppResult<CatalogEntry> {
        let editions: HashMap<String, OpenLibraryEdition> = serde_json::from_value(body)
            .map_err(|e| AppError::ExternalApi(format!("Invalid OpenLibrary response: {}", e)))?;

        let (key, edition) = editions
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(format!("ISBN {}", isbn)))?;

        let mut entry = CatalogEntry::new(CatalogId::OpenLibrary(key), MediaKind::Book, edition.title);
        entry.author = Some(
            edition
                .authors
                .first()
                .map(|a| a.name.clone())
                .unwrap_or_else(|| "Unknown Author".to_string()),
        );
        entry.year = edition.publish_date.as_deref().and_then(publish_year);
        entry.isbn = Some(clean_isbn(isbn));
        entry.total_pages = edition.number_of_pages;
        entry.genres = edition
            .subjects
            .into_iter()
            .map(|s| s.name)
            .take(MAX_GENRES)
            .collect();
        entry.poster_path = edition.cover.and_then(|c| c.medium.or(c.large).or(c.small));
        Ok(entry)
    }

    async fn get_json(&self, path: &str, params: &[(&str, String)]) -> AppResult<serde_json::Value> {
        let url = format!("{}/{}", self.api_url.trim_end_matches('/'), path);
        let response = self.http_client.get(&url).query(params).send().await?;
        let response = ensure_success(self.name(), response).await?;
        Ok(response.json().await?)
    }

    async fn fetch_search(&self, field: &str, value: &str, limit: usize) -> AppResult<Vec<CatalogEntry>> {
        let body = self
            .get_json(
                "search.json",
                &[(field, value.to_string()), ("limit", limit.to_string())],
            )
            .await?;
        let entries = self.parse_search(body)?;

        tracing::info!(
            field,
            query = %value,
            results = entries.len(),
            provider = "openlibrary",
            "Catalog search completed"
        );

        Ok(entries)
    }

    /// Books whose title matches
    pub async fn search_by_title(&self, title: &str, limit: usize) -> AppResult<Vec<CatalogEntry>> {
        self.fetch_search("title", title, limit).await
    }

    /// Books by a matching author
    pub async fn search_by_author(&self, author: &str, limit: usize) -> AppResult<Vec<CatalogEntry>> {
        self.fetch_search("author", author, limit).await
    }

    /// Exact edition lookup
    pub async fn search_by_isbn(&self, isbn: &str) -> AppResult<CatalogEntry> {
        if !is_valid_isbn(isbn) {
            return Err(AppError::InvalidInput(format!(
                "'{}' is not a valid 10 or 13 digit ISBN",
                isbn
            )));
        }

        let cleaned = clean_isbn(isbn);
        let body = self
            .get_json(
                "api/books",
                &[
                    ("bibkeys", format!("ISBN:{}", cleaned)),
                    ("jscmd", "data".to_string()),
                    ("format", "json".to_string()),
                ],
            )
            .await?;

        self.parse_isbn(&cleaned, body)
    }

    /// Title search, falling back to author search when nothing matches
    async fn search_any(&self, query: &str) -> AppResult<Vec<CatalogEntry>> {
        let by_title = self.search_by_title(query, DEFAULT_SEARCH_LIMIT).await?;
        if !by_title.is_empty() {
            return Ok(by_title);
        }

        tracing::debug!(query = %query, "No title matches, trying author search");
        self.search_by_author(query, DEFAULT_SEARCH_LIMIT).await
    }
}

/// ISBN stripped of separators and an optional `ISBN` prefix
pub fn clean_isbn(isbn: &str) -> String {
    let trimmed = isbn.trim();
    let without_prefix = trimmed
        .strip_prefix("ISBN-13")
        .or_else(|| trimmed.strip_prefix("ISBN-10"))
        .or_else(|| trimmed.strip_prefix("ISBN"))
        .unwrap_or(trimmed);

    without_prefix
        .chars()
        .filter(|c| !matches!(c, '-' | ' ' | ':'))
        .collect()
}

/// Shape check for ISBN-10 (nine digits and a digit or `X`) and ISBN-13
pub fn is_valid_isbn(isbn: &str) -> bool {
    let cleaned = clean_isbn(isbn);
    let chars: Vec<char> = cleaned.chars().collect();

    match chars.len() {
        10 => {
            chars[..9].iter().all(|c| c.is_ascii_digit())
                && (chars[9].is_ascii_digit() || chars[9] == 'X' || chars[9] == 'x')
        }
        13 => chars.iter().all(|c| c.is_ascii_digit()),
        _ => false,
    }
}

#[async_trait::async_trait]
impl CatalogProvider for OpenLibraryProvider {
    async fn search(&self, kind: MediaKind, query: &str) -> AppResult<Vec<CatalogEntry>> {
        if kind != MediaKind::Book {
            return Err(AppError::InvalidInput(format!(
                "OpenLibrary does not catalog {}",
                kind.plural()
            )));
        }
        if query.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }

        cached!(
            self.cache,
            CacheKey::CatalogSearch(kind, query.to_string()),
            SEARCH_CACHE_TTL,
            self.search_any(query)
        )
    }

    async fn details(&self, entry: &CatalogEntry) -> AppResult<CatalogEntry> {
        Ok(entry.clone())
    }

    fn supports(&self, kind: MediaKind) -> bool {
        kind == MediaKind::Book
    }

    fn name(&self) -> &'static str {
        "openlibrary"
    }
}
