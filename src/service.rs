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


//! Boundary service
//!
//! Applies the request rules that sit between a caller and the store:
//! id assignment on create, path id override on update, page bounds and
//! status filter normalization on list.

use crate::context::OpContext;
use crate::error::{Result, TrackerError};
use crate::storage::models::{Book, BookPayload};
use crate::storage::queries::ListFilter;
use crate::storage::repository::BookStore;
use crate::storage::stats::{Stats, StatsStore};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 1000;

/// Listing request as received from a caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListParams {
    pub status: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListParams {
    /// Check page bounds and build the store filter
    ///
    /// # Errors
    /// `InvalidPagination` if `limit` is outside `1..=1000` or `offset` is negative
    pub fn into_filter(self) -> Result<ListFilter> {
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT);
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(TrackerError::invalid_pagination(format!(
                "limit must be between 1 and {}, got {}",
                MAX_LIMIT, limit
            )));
        }

        let offset = self.offset.unwrap_or(0);
        if offset < 0 {
            return Err(TrackerError::invalid_pagination(format!(
                "offset must not be negative, got {}",
                offset
            )));
        }

        Ok(ListFilter {
            status: self.status.map(|s| s.trim().to_lowercase()),
            title: self.title,
            author: self.author,
            limit,
            offset,
        })
    }
}

/// Book operations over any store
#[derive(Debug, Clone)]
pub struct BookService<S> {
    store: S,
}

impl<S> BookService<S>
where
    S: BookStore + StatsStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Add a book under a freshly generated id
    ///
    /// Any id already in the payload is discarded.
    pub async fn create(&self, ctx: &OpContext, mut payload: BookPayload) -> Result<Book> {
        payload.generate_id();
        let book = payload.validate()?;
        self.store.create(ctx, &book).await?;
        debug!(id = %book.id, "created book");
        Ok(book)
    }

    pub async fn get(&self, ctx: &OpContext, id: &str) -> Result<Book> {
        self.store.get(ctx, id).await
    }

    pub async fn list(&self, ctx: &OpContext, params: ListParams) -> Result<Vec<Book>> {
        let filter = params.into_filter()?;
        self.store.list(ctx, &filter).await
    }

    /// Overwrite the book at `id`; the payload's own id is ignored
    pub async fn update(&self, ctx: &OpContext, id: &str, payload: BookPayload) -> Result<Book> {
        let mut payload = payload.with_id(id);
        let book = payload.validate()?;
        self.store.update(ctx, &book).await?;
        debug!(id = %book.id, "updated book");
        Ok(book)
    }

    pub async fn delete(&self, ctx: &OpContext, id: &str) -> Result<()> {
        self.store.delete(ctx, id).await?;
        debug!(id, "deleted book");
        Ok(())
    }

    pub async fn stats(&self, ctx: &OpContext) -> Result<Stats> {
        self.store.compute_stats(ctx).await
    }
}
