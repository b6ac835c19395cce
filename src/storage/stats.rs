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


//! Reading statistics
//!
//! Derived, never persisted. Every call re-reads the current table.

use crate::context::OpContext;
use crate::error::Result;
use crate::storage::models::BookStatus;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Popular author reported for an empty collection
pub const NO_AUTHOR: &str = "N/A";

/// Aggregate reading statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// Number of books marked complete
    pub total_read: u64,
    /// Floor of the percentage of books currently being read
    pub reading_progress: u64,
    /// Author with the most books, ties broken alphabetically
    pub popular_author: String,
}

impl Stats {
    /// Stats for an empty collection
    pub fn empty() -> Self {
        Self {
            total_read: 0,
            reading_progress: 0,
            popular_author: NO_AUTHOR.to_string(),
        }
    }

    /// Combine raw counts into stats
    ///
    /// `reading_progress` uses integer division, so 1 of 3 gives 33, not 34.
    pub fn from_counts(
        total: u64,
        by_status: &HashMap<BookStatus, u64>,
        popular_author: Option<String>,
    ) -> Self {
        let count = |status: BookStatus| by_status.get(&status).copied().unwrap_or(0);
        let reading_progress = if total > 0 {
            count(BookStatus::Reading) * 100 / total
        } else {
            0
        };

        Self {
            total_read: count(BookStatus::Complete),
            reading_progress,
            popular_author: popular_author.unwrap_or_else(|| NO_AUTHOR.to_string()),
        }
    }
}

/// Source of aggregate statistics
#[async_trait]
pub trait StatsStore: Send + Sync {
    /// Compute stats over the whole collection
    ///
    /// Either every figure is computed or the call fails as a whole.
    async fn compute_stats(&self, ctx: &OpContext) -> Result<Stats>;
}

/// Pick the most frequent author, ties broken by ascending name
pub(crate) fn most_frequent_author<'a, I>(authors: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for author in authors {
        *counts.entry(author).or_default() += 1;
    }

    counts
        .into_iter()
        .max_by(|(a_name, a_count), (b_name, b_count)| {
            a_count.cmp(b_count).then_with(|| b_name.cmp(a_name))
        })
        .map(|(name, _)| name.to_string())
}
