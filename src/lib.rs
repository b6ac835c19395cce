//! Book Tracker core library
//!
//! Persists a personal reading list in SQLite and derives reading statistics
//! from it. [`BookService`] is the entry point; storage backends implement
//! [`BookStore`] and [`StatsStore`].

pub mod config;
pub mod context;
pub mod error;
pub mod service;
pub mod storage;

pub use config::Config;
pub use context::{CancelHandle, OpContext};
pub use error::{ErrorKind, Result, TrackerError};
pub use service::{BookService, ListParams};
pub use storage::{
    Book, BookPayload, BookStatus, BookStore, Database, InMemoryBookStore, ListFilter,
    SqliteBookStore, Stats, StatsStore,
};
