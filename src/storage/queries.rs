// Book Tracker - Reading Progress Tracker
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Listing query construction
//!
//! Builds the filtered, paginated `SELECT` used by `list`.
//!
//! # Query Rules
//! - Each non-empty filter becomes an equality predicate, AND-combined in the
//!   fixed order status → title → author
//! - Results are always ordered by title, then id, so pages tile the full set
//! - LIMIT and OFFSET are always bound as parameters, never interpolated

use crate::storage::models::Book;
use serde::{Deserialize, Serialize};

/// Columns selected for every book read
pub(crate) const BOOK_COLUMNS: &str = "id, title, author, status";

/// Optional predicates plus a pagination window
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListFilter {
    pub status: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl ListFilter {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            limit,
            offset,
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Status filter, if present and non-empty
    pub fn status(&self) -> Option<&str> {
        non_empty(&self.status)
    }

    /// Title filter, if present and non-empty
    pub fn title(&self) -> Option<&str> {
        non_empty(&self.title)
    }

    /// Author filter, if present and non-empty
    pub fn author(&self) -> Option<&str> {
        non_empty(&self.author)
    }

    /// LIMIT actually bound: a non-positive limit selects no rows
    ///
    /// SQLite treats a negative LIMIT as "no limit", so it is clamped to 0.
    pub fn effective_limit(&self) -> i64 {
        self.limit.max(0)
    }

    /// OFFSET actually bound
    pub fn effective_offset(&self) -> i64 {
        self.offset.max(0)
    }

    /// Check whether a book satisfies every predicate (ignores pagination)
    pub fn matches(&self, book: &Book) -> bool {
        self.status().map_or(true, |s| book.status.as_str() == s)
            && self.title().map_or(true, |t| book.title == t)
            && self.author().map_or(true, |a| book.author == a)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Positional argument for a built query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryArg {
    Text(String),
    Int(i64),
}

/// Query text plus its positional arguments, in bind order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub sql: String,
    pub args: Vec<QueryArg>,
}

/// Build the listing query for `filter`
pub fn build_list_query(filter: &ListFilter) -> ListQuery {
    let mut predicates = Vec::new();
    let mut args = Vec::new();

    for (column, value) in [
        ("status", filter.status()),
        ("title", filter.title()),
        ("author", filter.author()),
    ] {
        if let Some(value) = value {
            predicates.push(format!("{} = ?", column));
            args.push(QueryArg::Text(value.to_string()));
        }
    }

    let mut sql = format!("SELECT {} FROM books", BOOK_COLUMNS);
    if !predicates.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&predicates.join(" AND "));
    }
    sql.push_str(" ORDER BY title ASC, id ASC LIMIT ? OFFSET ?");

    args.push(QueryArg::Int(filter.effective_limit()));
    args.push(QueryArg::Int(filter.effective_offset()));

    ListQuery { sql, args }
}
