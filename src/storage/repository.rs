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


//! Persistence gateway
//!
//! [`BookStore`] is the capability interface the boundary talks to.
//! [`SqliteBookStore`] is the production implementation on top of sqlx;
//! [`InMemoryBookStore`](crate::storage::InMemoryBookStore) is the fake used
//! in tests.
//!
//! # Gateway Rules
//! - The store never validates; it only accepts an already validated [`Book`]
//! - `update` and `delete` report `NotFound` when the statement affected zero
//!   rows, never from a pre-check read or an engine-specific error code
//! - Every driver error is wrapped with the logical operation name
//! - Every call runs under the caller's [`OpContext`]
//! - Writes commit inside the context, so a write that misses its deadline
//!   or is cancelled is rolled back, never half-reported

use crate::context::OpContext;
use crate::error::{Result, TrackerError};
use crate::storage::database::Database;
use crate::storage::models::{Book, BookStatus};
use crate::storage::queries::{build_list_query, ListFilter, QueryArg, BOOK_COLUMNS};
use crate::storage::stats::{Stats, StatsStore};
use async_trait::async_trait;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteQueryResult};
use sqlx::{Sqlite, SqlitePool};
use std::collections::HashMap;

/// CRUD and count operations over the book collection
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Insert a validated, id-assigned book
    async fn create(&self, ctx: &OpContext, book: &Book) -> Result<()>;

    /// Fetch one book, or `NotFound`
    async fn get(&self, ctx: &OpContext, id: &str) -> Result<Book>;

    /// Filtered, ordered, paginated listing; empty is not an error
    async fn list(&self, ctx: &OpContext, filter: &ListFilter) -> Result<Vec<Book>>;

    /// Overwrite title, author and status of the book with `book.id`
    async fn update(&self, ctx: &OpContext, book: &Book) -> Result<()>;

    /// Remove the book with `id`
    async fn delete(&self, ctx: &OpContext, id: &str) -> Result<()>;

    /// Total number of books
    async fn count_all(&self, ctx: &OpContext) -> Result<u64>;

    /// Book count per status; statuses with no books are absent
    async fn count_by_status(&self, ctx: &OpContext) -> Result<HashMap<BookStatus, u64>>;

    /// Author with the most books, ties broken alphabetically; `None` if empty
    async fn popular_author(&self, ctx: &OpContext) -> Result<Option<String>>;
}

const POPULAR_AUTHOR_SQL: &str = r#"
    SELECT author
    FROM books
    GROUP BY author
    ORDER BY COUNT(*) DESC, author ASC
    LIMIT 1
"#;

const COUNT_BY_STATUS_SQL: &str = "SELECT status, COUNT(*) FROM books GROUP BY status";

/// SQLite-backed book store
#[derive(Debug, Clone)]
pub struct SqliteBookStore {
    pool: SqlitePool,
}

impl SqliteBookStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn from_database(db: &Database) -> Self {
        Self::new(db.pool().clone())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn to_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn collect_status_counts(rows: Vec<(BookStatus, i64)>) -> HashMap<BookStatus, u64> {
    rows.into_iter()
        .map(|(status, count)| (status, to_count(count)))
        .collect()
}

#[async_trait]
impl BookStore for SqliteBookStore {
    #[tracing::instrument(skip(self, ctx, book), fields(id = %book.id))]
    async fn create(&self, ctx: &OpContext, book: &Book) -> Result<()> {
        let insert = sqlx::query("INSERT INTO books (id, title, author, status) VALUES (?, ?, ?, ?)")
            .bind(&book.id)
            .bind(&book.title)
            .bind(&book.author)
            .bind(book.status);
        ctx.run("insert book", self.execute_write("insert book", insert))
            .await?;

        tracing::debug!("book created");
        Ok(())
    }

    #[tracing::instrument(skip(self, ctx))]
    async fn get(&self, ctx: &OpContext, id: &str) -> Result<Book> {
        let sql = format!("SELECT {} FROM books WHERE id = ?", BOOK_COLUMNS);
        let book = ctx
            .run("get book", async {
                sqlx::query_as::<_, Book>(&sql)
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(TrackerError::storage_in("get book"))
            })
            .await?;

        book.ok_or_else(|| TrackerError::not_found(id))
    }

    #[tracing::instrument(skip(self, ctx))]
    async fn list(&self, ctx: &OpContext, filter: &ListFilter) -> Result<Vec<Book>> {
        let query = build_list_query(filter);

        ctx.run("list books", async {
            let mut statement = sqlx::query_as::<_, Book>(&query.sql);
            for arg in &query.args {
                statement = match arg {
                    QueryArg::Text(value) => statement.bind(value.as_str()),
                    QueryArg::Int(value) => statement.bind(*value),
                };
            }
            statement
                .fetch_all(&self.pool)
                .await
                .map_err(TrackerError::storage_in("list books"))
        })
        .await
    }

    #[tracing::instrument(skip(self, ctx, book), fields(id = %book.id))]
    async fn update(&self, ctx: &OpContext, book: &Book) -> Result<()> {
        let update = sqlx::query("UPDATE books SET title = ?, author = ?, status = ? WHERE id = ?")
            .bind(&book.title)
            .bind(&book.author)
            .bind(book.status)
            .bind(&book.id);
        let result = ctx
            .run("update book", self.execute_write("update book", update))
            .await?;

        if result.rows_affected() == 0 {
            tracing::warn!("update matched no rows");
            return Err(TrackerError::not_found(&book.id));
        }

        tracing::debug!("book updated");
        Ok(())
    }

    #[tracing::instrument(skip(self, ctx))]
    async fn delete(&self, ctx: &OpContext, id: &str) -> Result<()> {
        let delete = sqlx::query("DELETE FROM books WHERE id = ?").bind(id);
        let result = ctx
            .run("delete book", self.execute_write("delete book", delete))
            .await?;

        if result.rows_affected() == 0 {
            tracing::warn!("delete matched no rows");
            return Err(TrackerError::not_found(id));
        }

        tracing::debug!("book deleted");
        Ok(())
    }

    #[tracing::instrument(skip(self, ctx))]
    async fn count_all(&self, ctx: &OpContext) -> Result<u64> {
        let count: i64 = ctx
            .run("count books", async {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM books")
                    .fetch_one(&self.pool)
                    .await
                    .map_err(TrackerError::storage_in("count books"))
            })
            .await?;

        Ok(to_count(count))
    }

    #[tracing::instrument(skip(self, ctx))]
    async fn count_by_status(&self, ctx: &OpContext) -> Result<HashMap<BookStatus, u64>> {
        let rows = ctx
            .run("count books by status", async {
                sqlx::query_as::<_, (BookStatus, i64)>(COUNT_BY_STATUS_SQL)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(TrackerError::storage_in("count books by status"))
            })
            .await?;

        Ok(collect_status_counts(rows))
    }

    #[tracing::instrument(skip(self, ctx))]
    async fn popular_author(&self, ctx: &OpContext) -> Result<Option<String>> {
        ctx.run("query popular author", async {
            sqlx::query_scalar::<_, String>(POPULAR_AUTHOR_SQL)
                .fetch_optional(&self.pool)
                .await
                .map_err(TrackerError::storage_in("query popular author"))
        })
        .await
    }
}

#[async_trait]
impl StatsStore for SqliteBookStore {
    #[tracing::instrument(skip(self, ctx))]
    async fn compute_stats(&self, ctx: &OpContext) -> Result<Stats> {
        ctx.run("compute stats", self.read_stats()).await
    }
}

impl SqliteBookStore {
    /// Run one write statement in its own transaction
    ///
    /// The commit is part of the returned future. If the caller stops polling
    /// it (deadline or cancel), the transaction is dropped and its rollback is
    /// queued behind the statement, so nothing is persisted.
    async fn execute_write<'q>(
        &self,
        operation: &'static str,
        statement: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Result<SqliteQueryResult> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(TrackerError::storage_in(operation))?;

        let result = statement
            .execute(&mut *tx)
            .await
            .map_err(TrackerError::storage_in(operation))?;

        tx.commit()
            .await
            .map_err(TrackerError::storage_in(operation))?;

        Ok(result)
    }

    /// All three queries run in one transaction, so the figures describe a
    /// single snapshot. Dropping the future mid-way drops the transaction,
    /// which rolls back.
    async fn read_stats(&self) -> Result<Stats> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(TrackerError::storage_in("begin stats transaction"))?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&mut *tx)
            .await
            .map_err(TrackerError::storage_in("query total books"))?;

        let rows = sqlx::query_as::<_, (BookStatus, i64)>(COUNT_BY_STATUS_SQL)
            .fetch_all(&mut *tx)
            .await
            .map_err(TrackerError::storage_in("query books by status"))?;

        let popular_author: Option<String> = sqlx::query_scalar(POPULAR_AUTHOR_SQL)
            .fetch_optional(&mut *tx)
            .await
            .map_err(TrackerError::storage_in("query popular author"))?;

        tx.commit()
            .await
            .map_err(TrackerError::storage_in("end stats transaction"))?;

        Ok(Stats::from_counts(
            to_count(total),
            &collect_status_counts(rows),
            popular_author,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::storage::migrations::run_migrations;
    use crate::storage::models::BookPayload;
    use sqlx::pool::PoolConnection;
    use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
    use std::time::Duration;
    use tempfile::TempDir;

    async fn store() -> SqliteBookStore {
        let db = Database::new_in_memory().await.expect("Failed to create database");
        SqliteBookStore::from_database(&db)
    }

    fn book(title: &str, author: &str, status: &str) -> Book {
        let mut payload = BookPayload::new(title, author, status);
        payload.generate_id();
        payload.validate().expect("valid book")
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = store().await;
        let ctx = OpContext::background();
        let created = book("Test Book", "Test Author", "unread");

        store.create(&ctx, &created).await.expect("Failed to create book");
        let found = store.get(&ctx, &created.id).await.expect("Failed to get book");

        assert_eq!(found, created);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let store = store().await;
        let err = store
            .get(&OpContext::background(), "nonexistent")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_duplicate_id_is_storage_error() {
        let store = store().await;
        let ctx = OpContext::background();
        let created = book("Test Book", "Test Author", "unread");

        store.create(&ctx, &created).await.unwrap();
        let err = store.create(&ctx, &created).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(err.to_string().starts_with("insert book: "));
    }

    #[tokio::test]
    async fn test_update_uses_affected_rows() {
        let store = store().await;
        let ctx = OpContext::background();

        let missing = book("Ghost", "Nobody", "unread");
        let err = store.update(&ctx, &missing).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let original = book("Original Book", "Original Author", "unread");
        store.create(&ctx, &original).await.unwrap();

        let changed = Book {
            id: original.id.clone(),
            title: "Updated Book".into(),
            author: "Updated Author".into(),
            status: BookStatus::Complete,
        };
        store.update(&ctx, &changed).await.unwrap();
        assert_eq!(store.get(&ctx, &original.id).await.unwrap(), changed);
    }

    #[tokio::test]
    async fn test_delete_uses_affected_rows() {
        let store = store().await;
        let ctx = OpContext::background();
        let doomed = book("Doomed", "Author", "reading");
        store.create(&ctx, &doomed).await.unwrap();

        store.delete(&ctx, &doomed.id).await.unwrap();

        let err = store.delete(&ctx, &doomed.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = store.get(&ctx, &doomed.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_list_filters_and_order() {
        let store = store().await;
        let ctx = OpContext::background();
        for (title, author, status) in [
            ("Book C", "Author A", "reading"),
            ("Book A", "Author A", "unread"),
            ("Book B", "Author B", "reading"),
        ] {
            store.create(&ctx, &book(title, author, status)).await.unwrap();
        }

        let all = store.list(&ctx, &ListFilter::new(10, 0)).await.unwrap();
        let titles: Vec<_> = all.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["Book A", "Book B", "Book C"]);

        let reading = store
            .list(&ctx, &ListFilter::new(10, 0).with_status("reading"))
            .await
            .unwrap();
        let titles: Vec<_> = reading.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["Book B", "Book C"]);

        let by_author = store
            .list(
                &ctx,
                &ListFilter::new(10, 0).with_status("reading").with_author("Author A"),
            )
            .await
            .unwrap();
        assert_eq!(by_author.len(), 1);
        assert_eq!(by_author[0].title, "Book C");

        assert!(store.list(&ctx, &ListFilter::new(0, 0)).await.unwrap().is_empty());
        assert!(store.list(&ctx, &ListFilter::new(-1, 0)).await.unwrap().is_empty());
        assert!(store.list(&ctx, &ListFilter::new(10, 3)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_counts() {
        let store = store().await;
        let ctx = OpContext::background();
        for status in ["complete", "complete", "unread"] {
            store.create(&ctx, &book("T", "A", status)).await.unwrap();
        }

        assert_eq!(store.count_all(&ctx).await.unwrap(), 3);

        let by_status = store.count_by_status(&ctx).await.unwrap();
        assert_eq!(by_status.get(&BookStatus::Complete), Some(&2));
        assert_eq!(by_status.get(&BookStatus::Unread), Some(&1));
        assert!(!by_status.contains_key(&BookStatus::Reading));
    }

    #[tokio::test]
    async fn test_popular_author() {
        let store = store().await;
        let ctx = OpContext::background();
        assert_eq!(store.popular_author(&ctx).await.unwrap(), None);

        for author in ["Zadie Smith", "Anne Carson", "Zadie Smith", "Anne Carson"] {
            store.create(&ctx, &book("T", author, "unread")).await.unwrap();
        }
        assert_eq!(
            store.popular_author(&ctx).await.unwrap().as_deref(),
            Some("Anne Carson")
        );
    }

    #[tokio::test]
    async fn test_compute_stats() {
        let store = store().await;
        let ctx = OpContext::background();
        assert_eq!(store.compute_stats(&ctx).await.unwrap(), Stats::empty());

        for status in ["complete", "complete", "reading", "unread"] {
            store.create(&ctx, &book("T", "Octavia Butler", status)).await.unwrap();
        }

        let stats = store.compute_stats(&ctx).await.unwrap();
        assert_eq!(stats.total_read, 2);
        assert_eq!(stats.reading_progress, 25);
        assert_eq!(stats.popular_author, "Octavia Butler");
    }

    #[tokio::test]
    async fn test_cancelled_context_skips_query() {
        let store = store().await;
        let (ctx, handle) = OpContext::background().cancellable();
        handle.cancel();

        let err = store.compute_stats(&ctx).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);

        let err = store.create(&ctx, &book("T", "A", "unread")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert_eq!(store.count_all(&OpContext::background()).await.unwrap(), 0);
    }

    async fn file_store(dir: &TempDir) -> (Database, SqliteBookStore) {
        let db = Database::new(dir.path().join("books.db"))
            .await
            .expect("Failed to create database");
        let store = SqliteBookStore::from_database(&db);
        (db, store)
    }

    /// Hold the write lock on a separate connection
    async fn lock_writes(pool: &SqlitePool, begin: &str) -> PoolConnection<Sqlite> {
        let mut conn = pool.acquire().await.expect("Failed to acquire connection");
        sqlx::query(begin)
            .execute(&mut *conn)
            .await
            .expect("Failed to take lock");
        conn
    }

    async fn unlock(mut conn: PoolConnection<Sqlite>) {
        sqlx::query("ROLLBACK")
            .execute(&mut *conn)
            .await
            .expect("Failed to release lock");
    }

    /// Close the pool so every queued statement has finished, then reopen
    async fn reopen(db: Database, dir: &TempDir) -> SqliteBookStore {
        db.close().await.expect("Failed to close database");
        let (_, store) = file_store(dir).await;
        store
    }

    fn cancel_after(delay: Duration) -> (OpContext, tokio::task::JoinHandle<()>) {
        let (ctx, handle) = OpContext::background().cancellable();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            handle.cancel();
        });
        (ctx, task)
    }

    #[tokio::test]
    async fn test_create_past_deadline_is_rolled_back() {
        let dir = tempfile::tempdir().unwrap();
        let (db, store) = file_store(&dir).await;
        let late = book("Late", "Nobody", "unread");

        let lock = lock_writes(db.pool(), "BEGIN IMMEDIATE").await;
        let ctx = OpContext::background().with_timeout(Duration::from_millis(200));
        let err = store.create(&ctx, &late).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeadlineExceeded);
        unlock(lock).await;

        let store = reopen(db, &dir).await;
        let ctx = OpContext::background();
        assert_eq!(store.get(&ctx, &late.id).await.unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(store.count_all(&ctx).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_past_deadline_is_rolled_back() {
        let dir = tempfile::tempdir().unwrap();
        let (db, store) = file_store(&dir).await;
        let original = book("Before", "Author", "unread");
        store.create(&OpContext::background(), &original).await.unwrap();

        let changed = Book {
            title: "After".into(),
            status: BookStatus::Complete,
            ..original.clone()
        };
        let lock = lock_writes(db.pool(), "BEGIN IMMEDIATE").await;
        let ctx = OpContext::background().with_timeout(Duration::from_millis(200));
        let err = store.update(&ctx, &changed).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeadlineExceeded);
        unlock(lock).await;

        let store = reopen(db, &dir).await;
        assert_eq!(
            store.get(&OpContext::background(), &original.id).await.unwrap(),
            original
        );
    }

    #[tokio::test]
    async fn test_delete_cancelled_in_flight_keeps_row() {
        let dir = tempfile::tempdir().unwrap();
        let (db, store) = file_store(&dir).await;
        let kept = book("Kept", "Author", "reading");
        store.create(&OpContext::background(), &kept).await.unwrap();

        let lock = lock_writes(db.pool(), "BEGIN IMMEDIATE").await;
        let (ctx, canceller) = cancel_after(Duration::from_millis(200));
        let err = store.delete(&ctx, &kept.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        canceller.await.unwrap();
        unlock(lock).await;

        let store = reopen(db, &dir).await;
        assert_eq!(store.get(&OpContext::background(), &kept.id).await.unwrap(), kept);
    }

    #[tokio::test]
    async fn test_stats_cancelled_mid_read() {
        let dir = tempfile::tempdir().unwrap();
        // Rollback-journal mode: an exclusive writer also blocks readers
        let options = SqliteConnectOptions::new()
            .filename(dir.path().join("books.db"))
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Delete)
            .busy_timeout(Duration::from_secs(30));
        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .connect_with(options)
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();
        let store = SqliteBookStore::new(pool.clone());
        let ctx = OpContext::background();
        for status in ["complete", "reading"] {
            store.create(&ctx, &book("T", "Ursula K. Le Guin", status)).await.unwrap();
        }

        let lock = lock_writes(&pool, "BEGIN EXCLUSIVE").await;
        let (cancel_ctx, canceller) = cancel_after(Duration::from_millis(200));
        let err = store.compute_stats(&cancel_ctx).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        canceller.await.unwrap();
        unlock(lock).await;

        let stats = store.compute_stats(&ctx).await.unwrap();
        assert_eq!(stats.total_read, 1);
        assert_eq!(stats.reading_progress, 50);
        assert_eq!(stats.popular_author, "Ursula K. Le Guin");

        // No transaction was left open on the cancelled connection
        store.create(&ctx, &book("U", "Ursula K. Le Guin", "unread")).await.unwrap();
        assert_eq!(store.count_all(&ctx).await.unwrap(), 3);
    }
}
