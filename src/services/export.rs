use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::{
    error::AppResult,
    models::{LibraryItem, Status},
};

pub const EXPORT_VERSION: &str = "1.0";

const CSV_HEADER: [&str; 7] = [
    "ID",
    "Title",
    "Year",
    "Status",
    "Rating",
    "Poster Path",
    "Added Date",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    /// Default file name for an export taken on `date`
    pub fn file_name(&self, date: NaiveDate) -> String {
        format!("watchlog-{}.{}", date.format("%Y-%m-%d"), self.extension())
    }

    /// Renders `items` in this format
    ///
    /// Returns an empty string when there is nothing to export.
    pub fn render(&self, items: &[LibraryItem], now: DateTime<Utc>) -> AppResult<String> {
        match self {
            ExportFormat::Csv => Ok(to_csv(items)),
            ExportFormat::Json if items.is_empty() => Ok(String::new()),
            ExportFormat::Json => to_json(items, now),
        }
    }
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Library as CSV, every field quoted
pub fn to_csv(items: &[LibraryItem]) -> String {
    if items.is_empty() {
        return String::new();
    }

    let mut lines = Vec::with_capacity(items.len() + 1);
    lines.push(CSV_HEADER.join(","));

    for item in items {
        let fields = [
            item.id.to_string(),
            item.title.clone(),
            item.year.map(|y| y.to_string()).unwrap_or_default(),
            Status::describe_id(item.status_id).to_string(),
            item.rating.map(|r| r.to_string()).unwrap_or_default(),
            item.poster_path.clone().unwrap_or_default(),
            item.created_at
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        ];
        lines.push(
            fields
                .iter()
                .map(|f| quote(f))
                .collect::<Vec<_>>()
                .join(","),
        );
    }

    lines.join("\n")
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportDocument<'a> {
    export_date: DateTime<Utc>,
    total_items: usize,
    version: &'static str,
    items: Vec<ExportItem<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportItem<'a> {
    id: i64,
    title: &'a str,
    year: Option<i32>,
    status: &'static str,
    rating: Option<f32>,
    poster_path: Option<&'a str>,
    added_date: Option<DateTime<Utc>>,
    updated_date: Option<DateTime<Utc>>,
}

impl<'a> From<&'a LibraryItem> for ExportItem<'a> {
    fn from(item: &'a LibraryItem) -> Self {
        Self {
            id: item.id,
            title: &item.title,
            year: item.year,
            status: Status::describe_id(item.status_id),
            rating: item.rating,
            poster_path: item.poster_path.as_deref(),
            added_date: item.created_at,
            updated_date: item.updated_at,
        }
    }
}

/// Library as a pretty-printed JSON document with export metadata
pub fn to_json(items: &[LibraryItem], now: DateTime<Utc>) -> AppResult<String> {
    let document = ExportDocument {
        export_date: now,
        total_items: items.len(),
        version: EXPORT_VERSION,
        items: items.iter().map(ExportItem::from).collect(),
    };

    Ok(serde_json::to_string_pretty(&document)?)
}
