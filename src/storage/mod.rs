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


//! Database storage and models
//!
//! This module handles all database operations using SQLite via sqlx.
//!
//! # Layers
//! - `models`: Book entity, reading status, validation
//! - `queries`: listing query construction
//! - `repository`: `BookStore` gateway and its SQLite implementation
//! - `in_memory`: `BookStore` fake for tests
//! - `stats`: aggregate statistics
//! - `database` / `migrations`: pool setup and schema
//!
//! # Usage Example
//! ```no_run
//! use book_tracker::context::OpContext;
//! use book_tracker::storage::{BookPayload, BookStore, Database, ListFilter, SqliteBookStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new("./books.db").await?;
//! let store = SqliteBookStore::from_database(&db);
//! let ctx = OpContext::background();
//!
//! let mut payload = BookPayload::new("The Left Hand of Darkness", "Ursula K. Le Guin", "reading");
//! payload.generate_id();
//! let book = payload.validate()?;
//! store.create(&ctx, &book).await?;
//!
//! let reading = store.list(&ctx, &ListFilter::new(10, 0).with_status("reading")).await?;
//! # Ok(())
//! # }
//! ```

pub mod database;
pub mod in_memory;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod repository;
pub mod stats;

// Re-export commonly used types
pub use database::Database;
pub use in_memory::InMemoryBookStore;
pub use models::{Book, BookPayload, BookStatus};
pub use queries::{build_list_query, ListFilter, ListQuery, QueryArg};
pub use repository::{BookStore, SqliteBookStore};
pub use stats::{Stats, StatsStore, NO_AUTHOR};
