//! In-memory views over a fully loaded library: filtering, paging, stats.
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{LibraryItem, Status};

/// Criteria applied to a loaded list of items
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    /// Case-insensitive text matched against title, year, director and author
    pub search: Option<String>,
    pub status: Option<Status>,
    /// Minimum rating; 0 keeps everything, unrated items included
    pub min_rating: f32,
    /// Exact genre name, case-insensitive
    pub genre: Option<String>,
}

impl ItemFilter {
    pub fn matches(&self, item: &LibraryItem) -> bool {
        self.matches_search(item)
            && self.status.map_or(true, |s| item.status_id == s.id())
            && self.matches_rating(item)
            && self.matches_genre(item)
    }

    fn matches_search(&self, item: &LibraryItem) -> bool {
        let Some(term) = self
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
        else {
            return true;
        };

        let contains = |field: Option<&str>| {
            field.is_some_and(|value| value.to_lowercase().contains(&term))
        };

        contains(Some(&item.title))
            || item.year.is_some_and(|year| year.to_string().contains(&term))
            || contains(item.director.as_deref())
            || contains(item.author.as_deref())
    }

    fn matches_rating(&self, item: &LibraryItem) -> bool {
        if self.min_rating <= 0.0 {
            return true;
        }
        item.rating.is_some_and(|rating| rating >= self.min_rating)
    }

    fn matches_genre(&self, item: &LibraryItem) -> bool {
        match self.genre.as_deref().map(str::trim).filter(|g| !g.is_empty()) {
            Some(genre) => item.genres.iter().any(|g| g.eq_ignore_ascii_case(genre)),
            None => true,
        }
    }

    /// True when only the status is set, so the store can filter and page
    pub fn is_status_only(&self) -> bool {
        self.search.as_deref().map_or(true, |s| s.trim().is_empty())
            && self.min_rating <= 0.0
            && self.genre.as_deref().map_or(true, |g| g.trim().is_empty())
    }

    pub fn apply<'a>(&self, items: &'a [LibraryItem]) -> Vec<&'a LibraryItem> {
        items.iter().filter(|item| self.matches(item)).collect()
    }
}

/// One page of a filtered list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Zero-based page index
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    /// Page count for display; an empty list still shows "page 1 of 1"
    pub fn display_pages(&self) -> usize {
        self.total_pages.max(1)
    }

    pub fn has_previous(&self) -> bool {
        self.page > 0
    }

    pub fn has_next(&self) -> bool {
        self.page + 1 < self.total_pages
    }
}

/// Slices `items` into the zero-based `page` of `page_size`
///
/// Pages past the end come back empty rather than clamped.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(page_size);

    let from = page.saturating_mul(page_size).min(total_items);
    let to = from.saturating_add(page_size).min(total_items);

    Page {
        items: items[from..to].to_vec(),
        page,
        page_size,
        total_items,
        total_pages,
    }
}

/// Per-status counts of a library
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryStats {
    pub total: usize,
    pub by_status: Vec<(Status, usize)>,
    /// Items whose status id maps to no known status
    pub unknown_status: usize,
    pub rated: usize,
    pub average_rating: Option<f32>,
}

impl LibraryStats {
    pub fn compute(items: &[LibraryItem]) -> Self {
        let by_status: Vec<(Status, usize)> = Status::ALL
            .into_iter()
            .map(|status| {
                let count = items.iter().filter(|i| i.status_id == status.id()).count();
                (status, count)
            })
            .collect();
        let ratings: Vec<f32> = items.iter().filter_map(|i| i.rating).collect();

        Self::from_counts(items.len(), by_status, &ratings)
    }

    /// Builds stats from counts taken elsewhere, such as the store
    pub fn from_counts(total: usize, by_status: Vec<(Status, usize)>, ratings: &[f32]) -> Self {
        let known: usize = by_status.iter().map(|(_, count)| count).sum();
        let average_rating = if ratings.is_empty() {
            None
        } else {
            Some(ratings.iter().sum::<f32>() / ratings.len() as f32)
        };

        Self {
            total,
            by_status,
            unknown_status: total.saturating_sub(known),
            rated: ratings.len(),
            average_rating,
        }
    }

    pub fn count(&self, status: Status) -> usize {
        self.by_status
            .iter()
            .find(|(s, _)| *s == status)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }
}

/// Human-readable age of a timestamp ("3 days ago")
pub fn relative_time(date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(date) = date else {
        return "Unknown".to_string();
    };

    let elapsed = now.signed_duration_since(date);
    let plural = |n: i64, unit: &str| format!("{} {}{} ago", n, unit, if n > 1 { "s" } else { "" });

    if elapsed.num_seconds() < 60 {
        "just now".to_string()
    } else if elapsed.num_minutes() < 60 {
        plural(elapsed.num_minutes(), "minute")
    } else if elapsed.num_hours() < 24 {
        plural(elapsed.num_hours(), "hour")
    } else if elapsed.num_days() < 30 {
        plural(elapsed.num_days(), "day")
    } else {
        date.format("%Y-%m-%d").to_string()
    }
}
