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


//! In-memory book store for testing.
//!
//! [`InMemoryBookStore`] mirrors the SQLite gateway's semantics (ordering,
//! pagination, affected-row `NotFound`, duplicate-id rejection) without a
//! database, so service logic can be tested in isolation.

use crate::context::OpContext;
use crate::error::{Result, TrackerError};
use crate::storage::models::{Book, BookStatus};
use crate::storage::queries::ListFilter;
use crate::storage::repository::BookStore;
use crate::storage::stats::{most_frequent_author, Stats, StatsStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Thread-safe in-memory store keyed by book id
#[derive(Debug, Clone, Default)]
pub struct InMemoryBookStore {
    books: Arc<RwLock<HashMap<String, Book>>>,
}

impl InMemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Book>> {
        // Writers never leave a row half-applied; poisoning is ignored.
        self.books.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Book>> {
        self.books.write().unwrap_or_else(|e| e.into_inner())
    }

    fn count_statuses(books: &HashMap<String, Book>) -> HashMap<BookStatus, u64> {
        let mut counts = HashMap::new();
        for book in books.values() {
            *counts.entry(book.status).or_insert(0) += 1;
        }
        counts
    }

    fn popular(books: &HashMap<String, Book>) -> Option<String> {
        most_frequent_author(books.values().map(|b| b.author.as_str()))
    }
}

#[async_trait]
impl BookStore for InMemoryBookStore {
    async fn create(&self, ctx: &OpContext, book: &Book) -> Result<()> {
        ctx.run("insert book", async {
            let mut books = self.write();
            if books.contains_key(&book.id) {
                return Err(TrackerError::storage(
                    "insert book",
                    format!("duplicate book id {}", book.id),
                ));
            }
            books.insert(book.id.clone(), book.clone());
            Ok(())
        })
        .await
    }

    async fn get(&self, ctx: &OpContext, id: &str) -> Result<Book> {
        ctx.run("get book", async {
            self.read()
                .get(id)
                .cloned()
                .ok_or_else(|| TrackerError::not_found(id))
        })
        .await
    }

    async fn list(&self, ctx: &OpContext, filter: &ListFilter) -> Result<Vec<Book>> {
        ctx.run("list books", async {
            let mut matching: Vec<Book> = self
                .read()
                .values()
                .filter(|b| filter.matches(b))
                .cloned()
                .collect();
            matching.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));

            let offset = usize::try_from(filter.effective_offset()).unwrap_or(usize::MAX);
            let limit = usize::try_from(filter.effective_limit()).unwrap_or(usize::MAX);
            Ok(matching.into_iter().skip(offset).take(limit).collect())
        })
        .await
    }

    async fn update(&self, ctx: &OpContext, book: &Book) -> Result<()> {
        ctx.run("update book", async {
            match self.write().get_mut(&book.id) {
                Some(existing) => {
                    existing.title = book.title.clone();
                    existing.author = book.author.clone();
                    existing.status = book.status;
                    Ok(())
                }
                None => Err(TrackerError::not_found(&book.id)),
            }
        })
        .await
    }

    async fn delete(&self, ctx: &OpContext, id: &str) -> Result<()> {
        ctx.run("delete book", async {
            self.write()
                .remove(id)
                .map(|_| ())
                .ok_or_else(|| TrackerError::not_found(id))
        })
        .await
    }

    async fn count_all(&self, ctx: &OpContext) -> Result<u64> {
        ctx.run("count books", async { Ok(self.read().len() as u64) })
            .await
    }

    async fn count_by_status(&self, ctx: &OpContext) -> Result<HashMap<BookStatus, u64>> {
        ctx.run("count books by status", async {
            Ok(Self::count_statuses(&self.read()))
        })
        .await
    }

    async fn popular_author(&self, ctx: &OpContext) -> Result<Option<String>> {
        ctx.run("query popular author", async { Ok(Self::popular(&self.read())) })
            .await
    }
}

#[async_trait]
impl StatsStore for InMemoryBookStore {
    async fn compute_stats(&self, ctx: &OpContext) -> Result<Stats> {
        ctx.run("compute stats", async {
            // One read guard for all figures, like the SQLite transaction
            let books = self.read();
            Ok(Stats::from_counts(
                books.len() as u64,
                &Self::count_statuses(&books),
                Self::popular(&books),
            ))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::storage::models::BookPayload;

    fn book(title: &str, author: &str, status: &str) -> Book {
        let mut payload = BookPayload::new(title, author, status);
        payload.generate_id();
        payload.validate().unwrap()
    }

    #[tokio::test]
    async fn test_crud_cycle() {
        let store = InMemoryBookStore::new();
        let ctx = OpContext::background();
        let created = book("Kindred", "Octavia Butler", "unread");

        store.create(&ctx, &created).await.unwrap();
        assert_eq!(store.get(&ctx, &created.id).await.unwrap(), created);

        let err = store.create(&ctx, &created).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert_eq!(
            err.to_string(),
            format!("insert book: duplicate book id {}", created.id)
        );

        let mut changed = created.clone();
        changed.status = BookStatus::Reading;
        store.update(&ctx, &changed).await.unwrap();
        assert_eq!(store.get(&ctx, &created.id).await.unwrap().status, BookStatus::Reading);

        store.delete(&ctx, &created.id).await.unwrap();
        assert_eq!(
            store.delete(&ctx, &created.id).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            store.update(&ctx, &changed).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn test_list_window() {
        let store = InMemoryBookStore::new();
        let ctx = OpContext::background();
        for title in ["c", "a", "b"] {
            store.create(&ctx, &book(title, "x", "unread")).await.unwrap();
        }

        let page = store.list(&ctx, &ListFilter::new(2, 1)).await.unwrap();
        let titles: Vec<_> = page.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["b", "c"]);
        assert!(store.list(&ctx, &ListFilter::new(-3, 0)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stats_single_author() {
        let store = InMemoryBookStore::new();
        let ctx = OpContext::background();
        store.create(&ctx, &book("One", "Ted Chiang", "complete")).await.unwrap();
        store.create(&ctx, &book("Two", "Ted Chiang", "reading")).await.unwrap();

        let stats = store.compute_stats(&ctx).await.unwrap();
        assert_eq!(stats.total_read, 1);
        assert_eq!(stats.reading_progress, 50);
        assert_eq!(stats.popular_author, "Ted Chiang");
    }
}
