//! Database models
//!
//! Book entity, reading status and the validation rules that every book
//! must pass before it reaches the store.
//!
//! Raw input arrives as a [`BookPayload`] (free-form strings, as decoded from
//! a request body or CLI arguments). [`BookPayload::validate`] normalizes it
//! and returns a [`Book`], the only type the persistence gateway accepts.

use crate::error::{Result, TrackerError};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// ENUMS
// ============================================================================

/// Reading status of a book
///
/// Stored as lowercase TEXT in the `books.status` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
pub enum BookStatus {
    Unread,
    Reading,
    Complete,
}

impl BookStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::Unread => "unread",
            BookStatus::Reading => "reading",
            BookStatus::Complete => "complete",
        }
    }
}

impl fmt::Display for BookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive and whitespace-tolerant parse
///
/// An all-whitespace input is `EmptyStatus`; anything else outside the
/// enumeration is `InvalidStatus` carrying the lowercased value.
impl FromStr for BookStatus {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(TrackerError::EmptyStatus);
        }
        match trimmed.to_lowercase().as_str() {
            "unread" => Ok(BookStatus::Unread),
            "reading" => Ok(BookStatus::Reading),
            "complete" => Ok(BookStatus::Complete),
            other => Err(TrackerError::InvalidStatus(other.to_string())),
        }
    }
}

// ============================================================================
// MAIN ENTITIES
// ============================================================================

/// Validated book record
///
/// Every `Book` has a UUID id, non-empty trimmed title and author, and a
/// status from the closed enumeration. Obtain one through
/// [`BookPayload::validate`] or by reading it back from the store.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: String,
    pub status: BookStatus,
}

/// Unvalidated book input
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookPayload {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub status: String,
}

impl BookPayload {
    pub fn new(title: impl Into<String>, author: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            title: title.into(),
            author: author.into(),
            status: status.into(),
        }
    }

    /// Set the id (builder style)
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Assign a fresh random UUID (v4), replacing any existing id
    pub fn generate_id(&mut self) {
        self.id = Uuid::new_v4().to_string();
    }

    /// Normalize and validate, failing on the first broken rule
    ///
    /// Title and author are trimmed in place before any check runs, so the
    /// payload is normalized even when validation fails. On success the
    /// status field is rewritten to its canonical lowercase form.
    pub fn validate(&mut self) -> Result<Book> {
        self.title = self.title.trim().to_string();
        self.author = self.author.trim().to_string();

        if self.id.is_empty() {
            return Err(TrackerError::MissingId);
        }
        if Uuid::parse_str(&self.id).is_err() {
            return Err(TrackerError::InvalidId);
        }
        if self.title.is_empty() {
            return Err(TrackerError::MissingTitle);
        }
        if self.author.is_empty() {
            return Err(TrackerError::MissingAuthor);
        }

        let status: BookStatus = self.status.parse()?;
        self.status = status.as_str().to_string();

        Ok(Book {
            id: self.id.clone(),
            title: self.title.clone(),
            author: self.author.clone(),
            status,
        })
    }
}

impl From<Book> for BookPayload {
    fn from(book: Book) -> Self {
        Self {
            id: book.id,
            title: book.title,
            author: book.author,
            status: book.status.as_str().to_string(),
        }
    }
}
