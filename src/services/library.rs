use std::sync::Arc;

use serde::Serialize;

use crate::{
    db::{LibraryStore, ListQuery},
    error::{AppError, AppResult},
    models::{CatalogEntry, ItemUpdate, LibraryItem, MediaKind, NewItem, Rating, Status},
    services::{
        catalog::CatalogService,
        filters::{LibraryStats, Page},
    },
};

/// Outcome of a bulk import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Library operations on top of a store and the catalog
#[derive(Clone)]
pub struct LibraryService {
    store: Arc<dyn LibraryStore>,
    catalog: CatalogService,
}

impl LibraryService {
    pub fn new(store: Arc<dyn LibraryStore>, catalog: CatalogService) -> Self {
        Self { store, catalog }
    }

    pub fn catalog(&self) -> &CatalogService {
        &self.catalog
    }

    /// Every item of a kind, newest first
    pub async fn items(&self, kind: MediaKind, status: Option<Status>) -> AppResult<Vec<LibraryItem>> {
        self.store
            .list(kind, &ListQuery::all().with_status(status))
            .await
    }

    pub async fn count(&self, kind: MediaKind, status: Option<Status>) -> AppResult<u64> {
        self.store.count(kind, status).await
    }

    /// One zero-based page, sliced by the store rather than in memory
    pub async fn page(
        &self,
        kind: MediaKind,
        status: Option<Status>,
        page: usize,
        page_size: usize,
    ) -> AppResult<Page<LibraryItem>> {
        let page_size = page_size.max(1);
        let total_items = self.count(kind, status).await? as usize;
        let items = self
            .store
            .list(kind, &ListQuery::all().with_status(status).page(page, page_size))
            .await?;

        Ok(Page {
            items,
            page,
            page_size,
            total_items,
            total_pages: total_items.div_ceil(page_size),
        })
    }

    /// Per-status counts from the store, with the average over rated items
    pub async fn stats(&self, kind: MediaKind) -> AppResult<LibraryStats> {
        let total = self.count(kind, None).await? as usize;

        let mut by_status = Vec::with_capacity(Status::ALL.len());
        for status in Status::ALL {
            by_status.push((status, self.count(kind, Some(status)).await? as usize));
        }

        let ratings: Vec<f32> = self
            .items(kind, None)
            .await?
            .iter()
            .filter_map(|item| item.rating)
            .collect();

        Ok(LibraryStats::from_counts(total, by_status, &ratings))
    }

    /// Fails when the `statuses` table has no row for `status`
    async fn ensure_known_status(&self, status: Status) -> AppResult<()> {
        let rows = self.store.statuses().await?;
        if rows.iter().any(|row| row.id == status.id()) {
            return Ok(());
        }
        Err(AppError::InvalidInput(format!(
            "Status '{}' (id {}) is not in the statuses table",
            status,
            status.id()
        )))
    }

    pub async fn get(&self, kind: MediaKind, id: i64) -> AppResult<LibraryItem> {
        self.store.get(kind, id).await
    }

    /// Adds a title, enriched with catalog metadata when a match is found
    pub async fn add(&self, kind: MediaKind, title: &str, status: Status) -> AppResult<LibraryItem> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::InvalidInput("Title cannot be empty".to_string()));
        }

        let mut item = NewItem::titled(title, status);
        if let Some(entry) = self.catalog.lookup(kind, title).await {
            item = item.with_metadata(&entry);
        }

        self.store.create(kind, &item).await
    }

    /// Adds an explicitly chosen catalog entry under its catalog title
    pub async fn add_entry(&self, entry: &CatalogEntry, status: Status) -> AppResult<LibraryItem> {
        let item = NewItem::titled(entry.title.clone(), status).with_metadata(entry);
        self.store.create(entry.kind, &item).await
    }

    /// Changes the status; pending items lose their rating
    pub async fn set_status(&self, kind: MediaKind, id: i64, status: Status) -> AppResult<LibraryItem> {
        self.ensure_known_status(status).await?;

        let update = ItemUpdate {
            status_id: Some(status.id()),
            rating: (status == Status::Pending).then_some(None),
            ..Default::default()
        };
        self.store.update(kind, id, &update).await
    }

    pub async fn set_rating(&self, kind: MediaKind, id: i64, rating: Rating) -> AppResult<LibraryItem> {
        let item = self.store.get(kind, id).await?;
        if item.is_pending() {
            return Err(AppError::InvalidInput(format!(
                "'{}' is still pending; mark it watched before rating it",
                item.title
            )));
        }

        let update = ItemUpdate {
            rating: Some(Some(rating.value())),
            ..Default::default()
        };
        self.store.update(kind, id, &update).await
    }

    /// Moves a series to another season
    pub async fn set_current_season(&self, id: i64, season: u32) -> AppResult<LibraryItem> {
        if season == 0 {
            return Err(AppError::InvalidInput("Season must be at least 1".to_string()));
        }

        let item = self.store.get(MediaKind::Series, id).await?;
        if let Some(total) = item.total_seasons {
            if season > total {
                return Err(AppError::InvalidInput(format!(
                    "'{}' has only {} season(s)",
                    item.title, total
                )));
            }
        }

        let update = ItemUpdate {
            current_season: Some(season),
            ..Default::default()
        };
        self.store.update(MediaKind::Series, id, &update).await
    }

    pub async fn delete(&self, kind: MediaKind, id: i64) -> AppResult<()> {
        self.store.delete(kind, id).await
    }

    /// Imports `Title,Status` lines, one item per line
    ///
    /// Fields may be double-quoted, so `"Crouching Tiger, Hidden Dragon",vista`
    /// keeps its comma. Only the first two columns are read; a file written by
    /// the CSV export has an id column first and is not an import file.
    /// Lines are processed in order; a failing line is counted and logged
    /// without stopping the import.
    #[tracing::instrument(skip(self, text))]
    pub async fn import_csv(&self, kind: MediaKind, text: &str) -> AppResult<ImportReport> {
        let mut report = ImportReport::default();

        for (line_no, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let fields = split_fields(line);
            let title = fields.first().map(String::as_str).unwrap_or_default();
            if title.is_empty() {
                report.skipped += 1;
                continue;
            }
            let status = import_status(fields.get(1).map(String::as_str));

            match self.add(kind, title, status).await {
                Ok(_) => report.imported += 1,
                Err(e) => {
                    tracing::warn!(error = %e, line = line_no + 1, title = %title, "Import line failed");
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            kind = %kind,
            imported = report.imported,
            skipped = report.skipped,
            failed = report.failed,
            "Import finished"
        );

        Ok(report)
    }
}

/// Splits one import line on commas outside double quotes
///
/// Quotes are removed and `""` inside a quoted field stands for one quote.
/// Fields are trimmed.
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut field).trim().to_string()),
            _ => field.push(c),
        }
    }
    fields.push(field.trim().to_string());
    fields
}

fn import_status(field: Option<&str>) -> Status {
    match field.map(str::to_lowercase).as_deref() {
        Some("vista") | Some("watched") => Status::Watched,
        _ => Status::Pending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::supabase::MockLibraryStore;
    use crate::models::{CatalogId, StatusRow};
    use crate::services::providers::MockCatalogProvider;
    use mockall::predicate::*;
    use serde_json::json;

    fn row(id: i64, title: &str, status_id: i32) -> LibraryItem {
        serde_json::from_value(json!({"id": id, "title": title, "status_id": status_id})).unwrap()
    }

    fn no_catalog() -> CatalogService {
        let mut provider = MockCatalogProvider::new();
        provider.expect_supports().return_const(true);
        provider.expect_name().return_const("mock");
        provider.expect_search().returning(|_, _| Ok(vec![]));
        CatalogService::new(vec![Arc::new(provider)])
    }

    fn status_rows(store: &mut MockLibraryStore, statuses: &'static [Status]) {
        store.expect_statuses().returning(move || {
            Ok(statuses
                .iter()
                .map(|s| StatusRow {
                    id: s.id(),
                    description: s.description().to_string(),
                })
                .collect())
        });
    }

    fn service(store: MockLibraryStore) -> LibraryService {
        LibraryService::new(Arc::new(store), no_catalog())
    }

    #[tokio::test]
    async fn test_add_rejects_blank_title() {
        let mut store = MockLibraryStore::new();
        store.expect_create().never();

        let result = service(store).add(MediaKind::Movie, "  ", Status::Pending).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_add_keeps_user_title_with_metadata() {
        let mut provider = MockCatalogProvider::new();
        provider.expect_supports().return_const(true);
        provider.expect_name().return_const("mock");
        provider.expect_search().returning(|kind, _| {
            let mut entry = CatalogEntry::new(CatalogId::Tmdb(1396), kind, "Breaking Bad");
            entry.year = Some(2008);
            Ok(vec![entry])
        });
        provider.expect_details().returning(|e| {
            let mut detailed = e.clone();
            detailed.total_seasons = Some(5);
            Ok(detailed)
        });

        let mut store = MockLibraryStore::new();
        store
            .expect_create()
            .withf(|kind, item| {
                *kind == MediaKind::Series
                    && item.title == "breaking bad"
                    && item.year == Some(2008)
                    && item.tmdb_id == Some(1396)
                    && item.total_seasons == Some(5)
                    && item.current_season == Some(1)
                    && item.status_id == Status::Watching.id()
            })
            .times(1)
            .returning(|_, item| Ok(row(1, &item.title, item.status_id)));

        let service = LibraryService::new(
            Arc::new(store),
            CatalogService::new(vec![Arc::new(provider)]),
        );
        let created = service
            .add(MediaKind::Series, " breaking bad ", Status::Watching)
            .await
            .unwrap();
        assert_eq!(created.id, 1);
    }

    #[tokio::test]
    async fn test_add_without_catalog_match() {
        let mut store = MockLibraryStore::new();
        store
            .expect_create()
            .withf(|_, item| item.title == "Home Video" && item.year.is_none())
            .returning(|_, item| Ok(row(2, &item.title, item.status_id)));

        let created = service(store)
            .add(MediaKind::Movie, "Home Video", Status::Pending)
            .await
            .unwrap();
        assert_eq!(created.title, "Home Video");
    }

    #[tokio::test]
    async fn test_set_status_pending_clears_rating() {
        let mut store = MockLibraryStore::new();
        status_rows(&mut store, &Status::ALL);
        store
            .expect_update()
            .with(
                eq(MediaKind::Movie),
                eq(5),
                eq(ItemUpdate {
                    status_id: Some(1),
                    rating: Some(None),
                    current_season: None,
                }),
            )
            .times(1)
            .returning(|_, id, _| Ok(row(id, "Heat", 1)));

        service(store)
            .set_status(MediaKind::Movie, 5, Status::Pending)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_set_status_keeps_rating_otherwise() {
        let mut store = MockLibraryStore::new();
        status_rows(&mut store, &Status::ALL);
        store
            .expect_update()
            .withf(|_, _, update| update.status_id == Some(4) && update.rating.is_none())
            .returning(|_, id, _| Ok(row(id, "Heat", 4)));

        tokio_test::assert_ok!(
            service(store)
                .set_status(MediaKind::Movie, 5, Status::Favorite)
                .await
        );
    }

    #[tokio::test]
    async fn test_set_status_rejects_status_missing_from_table() {
        let mut store = MockLibraryStore::new();
        status_rows(&mut store, &[Status::Pending, Status::Watched]);
        store.expect_update().never();

        let result = service(store)
            .set_status(MediaKind::Movie, 5, Status::Favorite)
            .await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_page_is_sliced_by_store() {
        let mut store = MockLibraryStore::new();
        store
            .expect_count()
            .with(eq(MediaKind::Book), eq(Some(Status::Watched)))
            .returning(|_, _| Ok(45));
        store
            .expect_list()
            .withf(|kind, query| {
                *kind == MediaKind::Book
                    && query.status == Some(Status::Watched)
                    && query.offset == Some(40)
                    && query.limit == Some(20)
            })
            .times(1)
            .returning(|_, _| Ok((41..=45).map(|id| row(id, "Book", 2)).collect()));

        let page = service(store)
            .page(MediaKind::Book, Some(Status::Watched), 2, 20)
            .await
            .unwrap();

        assert_eq!(page.items.len(), 5);
        assert_eq!(page.total_items, 45);
        assert_eq!(page.total_pages, 3);
        assert!(!page.has_next());
    }

    #[tokio::test]
    async fn test_stats_uses_store_counts() {
        let mut store = MockLibraryStore::new();
        store.expect_count().returning(|_, status| {
            Ok(match status {
                None => 6,
                Some(Status::Pending) => 2,
                Some(Status::Watched) => 3,
                Some(Status::Watching) => 0,
                Some(Status::Favorite) => 1,
            })
        });
        store.expect_list().returning(|_, _| {
            let mut rated = row(1, "Heat", 2);
            rated.rating = Some(4.0);
            let mut favorite = row(2, "Alien", 4);
            favorite.rating = Some(5.0);
            Ok(vec![rated, favorite, row(3, "Dune", 1)])
        });

        let stats = service(store).stats(MediaKind::Movie).await.unwrap();

        assert_eq!(stats.total, 6);
        assert_eq!(stats.count(Status::Watched), 3);
        assert_eq!(stats.count(Status::Favorite), 1);
        assert_eq!(stats.rated, 2);
        assert_eq!(stats.average_rating, Some(4.5));
    }

    #[tokio::test]
    async fn test_set_rating_rejects_pending() {
        let mut store = MockLibraryStore::new();
        store.expect_get().returning(|_, id| Ok(row(id, "Heat", 1)));
        store.expect_update().never();

        let result = service(store)
            .set_rating(MediaKind::Movie, 5, Rating::new(4.0).unwrap())
            .await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_set_rating_on_watched() {
        let mut store = MockLibraryStore::new();
        store.expect_get().returning(|_, id| Ok(row(id, "Heat", 2)));
        store
            .expect_update()
            .withf(|_, _, update| update.rating == Some(Some(3.5)))
            .times(1)
            .returning(|_, id, _| Ok(row(id, "Heat", 2)));

        service(store)
            .set_rating(MediaKind::Movie, 5, Rating::new(3.5).unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_set_current_season_bounds() {
        let mut store = MockLibraryStore::new();
        store.expect_get().returning(|_, id| {
            let mut item = row(id, "Dark", 3);
            item.total_seasons = Some(3);
            Ok(item)
        });
        store
            .expect_update()
            .withf(|kind, _, update| *kind == MediaKind::Series && update.current_season == Some(3))
            .times(1)
            .returning(|_, id, _| Ok(row(id, "Dark", 3)));

        let service = service(store);
        assert!(matches!(
            service.set_current_season(9, 0).await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            service.set_current_season(9, 4).await,
            Err(AppError::InvalidInput(_))
        ));
        tokio_test::assert_ok!(service.set_current_season(9, 3).await);
    }

    #[tokio::test]
    async fn test_import_csv_counts() {
        let mut store = MockLibraryStore::new();
        store
            .expect_create()
            .withf(|_, item| item.title == "Inception" && item.status_id == 2)
            .returning(|_, item| Ok(row(1, &item.title, item.status_id)));
        store
            .expect_create()
            .withf(|_, item| item.title == "Dune" && item.status_id == 1)
            .returning(|_, item| Ok(row(2, &item.title, item.status_id)));
        store
            .expect_create()
            .withf(|_, item| item.title == "Heat" && item.status_id == 2)
            .returning(|_, _| Err(AppError::ExternalApi("Supabase error".to_string())));

        let text = "Inception,vista\n\nDune,pendiente\n ,vista\nHeat, WATCHED\n";
        let report = service(store).import_csv(MediaKind::Movie, text).await.unwrap();

        assert_eq!(
            report,
            ImportReport {
                imported: 2,
                skipped: 1,
                failed: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_import_csv_keeps_quoted_commas() {
        let mut store = MockLibraryStore::new();
        store
            .expect_create()
            .withf(|_, item| item.title == "Crouching Tiger, Hidden Dragon" && item.status_id == 2)
            .times(1)
            .returning(|_, item| Ok(row(1, &item.title, item.status_id)));

        let text = "\"Crouching Tiger, Hidden Dragon\",\"vista\"\n";
        let report = service(store).import_csv(MediaKind::Movie, text).await.unwrap();
        assert_eq!(report.imported, 1);
    }

    #[test]
    fn test_split_fields() {
        assert_eq!(split_fields("Heat, vista"), vec!["Heat", "vista"]);
        assert_eq!(
            split_fields("\"Say \"\"Hi\"\", Bob\",pendiente"),
            vec!["Say \"Hi\", Bob", "pendiente"]
        );
        assert_eq!(split_fields(" ,vista"), vec!["", "vista"]);
    }

    #[test]
    fn test_import_status() {
        assert_eq!(import_status(Some("Vista")), Status::Watched);
        assert_eq!(import_status(Some("watched")), Status::Watched);
        assert_eq!(import_status(Some("favorite")), Status::Pending);
        assert_eq!(import_status(None), Status::Pending);
    }
}
