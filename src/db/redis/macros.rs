/// Read-through caching around a future.
///
/// Expands to an `AppResult`, so it is meant as the tail expression of a
/// function returning `AppResult<T>`.
///
/// Returns the cached value when present. Otherwise awaits the future, queues
/// its result for a background write with the given TTL, and returns it.
///
/// # Arguments
/// * `$cache`: a [`Cache`](crate::db::Cache)
/// * `$key`: the [`CacheKey`](crate::db::CacheKey) to read and write
/// * `$ttl`: time-to-live of the written value, in seconds
/// * `$block`: future computing the value on a miss
///
/// # Example
/// ```rust,ignore
/// async fn search(&self, kind: MediaKind, query: &str) -> AppResult<Vec<CatalogEntry>> {
///     cached!(
///         self.cache,
///         CacheKey::CatalogSearch(kind, query.to_string()),
///         SEARCH_CACHE_TTL,
///         self.fetch_search(kind, query)
///     )
/// }
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let key = $key;
        if let Some(cached) = $cache.get_from_cache(&key).await? {
            Ok(cached)
        } else {
            let value = $block.await?;
            $cache.set_in_background(&key, &value, $ttl);
            Ok(value)
        }
    }};
}
