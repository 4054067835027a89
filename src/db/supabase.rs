//! Supabase (PostgREST) library store
//!
//! Supabase exposes every table of the project as a REST resource under
//! `/rest/v1/{table}`. Filters are query parameters (`id=eq.5`), and writes
//! return the affected rows when asked with `Prefer: return=representation`.
use reqwest::{Client as HttpClient, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::{
    error::{AppError, AppResult},
    models::{ItemUpdate, LibraryItem, MediaKind, NewItem, Status, StatusRow},
};

/// Trait for the persistence backend of the library
///
/// Writes are last-write-wins; the store performs no conflict detection.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LibraryStore: Send + Sync {
    /// Lists items newest first, optionally filtered by status and paged
    async fn list(&self, kind: MediaKind, query: &ListQuery) -> AppResult<Vec<LibraryItem>>;

    /// Number of items, optionally restricted to one status
    async fn count(&self, kind: MediaKind, status: Option<Status>) -> AppResult<u64>;

    /// Fetches a single item by id
    async fn get(&self, kind: MediaKind, id: i64) -> AppResult<LibraryItem>;

    /// Inserts an item and returns the stored row
    async fn create(&self, kind: MediaKind, item: &NewItem) -> AppResult<LibraryItem>;

    /// Applies a partial update and returns the stored row
    async fn update(&self, kind: MediaKind, id: i64, update: &ItemUpdate)
        -> AppResult<LibraryItem>;

    /// Removes an item
    async fn delete(&self, kind: MediaKind, id: i64) -> AppResult<()>;

    /// Rows of the `statuses` lookup table
    async fn statuses(&self) -> AppResult<Vec<StatusRow>>;

    /// Store name for logging
    fn name(&self) -> &'static str;
}

/// Filter and paging parameters for [`LibraryStore::list`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub status: Option<Status>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

impl ListQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: Option<Status>) -> Self {
        self.status = status;
        self
    }

    /// Zero-based page of `page_size` items
    pub fn page(mut self, page: usize, page_size: usize) -> Self {
        self.offset = Some(page * page_size);
        self.limit = Some(page_size);
        self
    }

    /// PostgREST query parameters for this listing
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("select".to_string(), "*".to_string()),
            ("order".to_string(), "created_at.desc".to_string()),
        ];
        if let Some(status) = self.status {
            pairs.push(("status_id".to_string(), format!("eq.{}", status.id())));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset".to_string(), offset.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        pairs
    }
}

/// Total row count from a PostgREST `Content-Range` header ("0-19/42", "*/0")
pub fn parse_content_range_total(header: &str) -> Option<u64> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}

#[derive(Clone)]
pub struct SupabaseStore {
    http_client: HttpClient,
    base_url: String,
    anon_key: String,
    /// Session token sent as the bearer; falls back to the anon key
    access_token: Option<String>,
}

impl SupabaseStore {
    pub fn new(base_url: String, anon_key: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            base_url,
            anon_key,
            access_token: None,
        }
    }

    /// Uses the given session token as the bearer for every request
    pub fn with_access_token(mut self, token: Option<String>) -> Self {
        self.access_token = token;
        self
    }

    pub fn endpoint(&self, resource: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url.trim_end_matches('/'), resource)
    }

    fn request(&self, method: Method, resource: &str) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.anon_key);
        self.http_client
            .request(method, self.endpoint(resource))
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", bearer))
            .header("Content-Type", "application/json")
    }

    /// Write request that returns the affected rows
    fn write_request(&self, method: Method, resource: &str) -> RequestBuilder {
        self.request(method, resource).header("Prefer", "return=representation")
    }

    /// Exact row count, read back from `Content-Range`
    fn count_request(&self, kind: MediaKind, status: Option<Status>) -> RequestBuilder {
        let mut params = vec![
            ("select".to_string(), "id".to_string()),
            ("limit".to_string(), "1".to_string()),
        ];
        if let Some(status) = status {
            params.push(("status_id".to_string(), format!("eq.{}", status.id())));
        }

        self.request(Method::GET, kind.table())
            .header("Prefer", "count=exact")
            .query(&params)
    }

    async fn check(response: Response) -> AppResult<Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        tracing::error!(status = %status, body = %body, "Supabase request failed");
        Err(AppError::ExternalApi(format!(
            "Supabase error: {} {}",
            status, body
        )))
    }

    async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> AppResult<T> {
        let response = Self::check(builder.send().await?).await?;
        Ok(response.json().await?)
    }

    fn first_row(rows: Vec<LibraryItem>, kind: MediaKind, id: Option<i64>) -> AppResult<LibraryItem> {
        rows.into_iter().next().ok_or_else(|| match id {
            Some(id) => AppError::NotFound(format!("{} {}", kind, id)),
            None => AppError::ExternalApi(format!("Supabase returned no {} row", kind)),
        })
    }
}

#[async_trait::async_trait]
impl LibraryStore for SupabaseStore {
    async fn list(&self, kind: MediaKind, query: &ListQuery) -> AppResult<Vec<LibraryItem>> {
        let items: Vec<LibraryItem> =
            Self::send_json(self.request(Method::GET, kind.table()).query(&query.query_pairs()))
                .await?;

        tracing::debug!(
            table = kind.table(),
            count = items.len(),
            offset = ?query.offset,
            "Listed library items"
        );

        Ok(items)
    }

    async fn count(&self, kind: MediaKind, status: Option<Status>) -> AppResult<u64> {
        let response = self.count_request(kind, status).send().await?;
        let response = Self::check(response).await?;

        response
            .headers()
            .get("content-range")
            .and_then(|value| value.to_str().ok())
            .and_then(parse_content_range_total)
            .ok_or_else(|| AppError::ExternalApi("Supabase response missing row count".to_string()))
    }

    async fn get(&self, kind: MediaKind, id: i64) -> AppResult<LibraryItem> {
        let rows: Vec<LibraryItem> = Self::send_json(
            self.request(Method::GET, kind.table())
                .query(&[("select", "*".to_string()), ("id", format!("eq.{}", id))]),
        )
        .await?;

        Self::first_row(rows, kind, Some(id))
    }

    async fn create(&self, kind: MediaKind, item: &NewItem) -> AppResult<LibraryItem> {
        let rows: Vec<LibraryItem> =
            Self::send_json(self.write_request(Method::POST, kind.table()).json(item)).await?;
        let created = Self::first_row(rows, kind, None)?;

        tracing::info!(
            table = kind.table(),
            id = created.id,
            title = %created.title,
            "Library item created"
        );

        Ok(created)
    }

    async fn update(
        &self,
        kind: MediaKind,
        id: i64,
        update: &ItemUpdate,
    ) -> AppResult<LibraryItem> {
        let rows: Vec<LibraryItem> = Self::send_json(
            self.write_request(Method::PATCH, kind.table())
                .query(&[("id", format!("eq.{}", id))])
                .json(update),
        )
        .await?;

        tracing::info!(table = kind.table(), id, "Library item updated");

        Self::first_row(rows, kind, Some(id))
    }

    async fn delete(&self, kind: MediaKind, id: i64) -> AppResult<()> {
        let response = self
            .request(Method::DELETE, kind.table())
            .query(&[("id", format!("eq.{}", id))])
            .send()
            .await?;
        Self::check(response).await?;

        tracing::info!(table = kind.table(), id, "Library item deleted");

        Ok(())
    }

    async fn statuses(&self) -> AppResult<Vec<StatusRow>> {
        Self::send_json(self.request(Method::GET, "statuses").query(&[("select", "*")])).await
    }

    fn name(&self) -> &'static str {
        "supabase"
    }
}
