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


//! Per-call execution context
//!
//! Every gateway operation runs under an [`OpContext`], which can carry a
//! deadline, a cancellation signal, or both. When either fires the in-flight
//! query future is dropped, which aborts it, and the caller receives a single
//! `Cancelled` or `DeadlineExceeded` error.
//!
//! # Usage Example
//! ```no_run
//! use book_tracker::context::OpContext;
//! use std::time::Duration;
//!
//! let (ctx, handle) = OpContext::background()
//!     .with_timeout(Duration::from_secs(5))
//!     .cancellable();
//! // hand `handle` to whatever may abort the work, e.g. a Ctrl-C listener
//! handle.cancel();
//! assert!(ctx.is_cancelled());
//! ```

use crate::error::{Result, TrackerError};
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Cancellation and deadline scope for one or more operations
#[derive(Debug, Clone, Default)]
pub struct OpContext {
    deadline: Option<Instant>,
    cancel: Option<watch::Receiver<bool>>,
}

/// Trigger for a cancellable [`OpContext`]
///
/// Cancelling is sticky: every clone of the context observes it.
#[derive(Debug)]
pub struct CancelHandle {
    sender: watch::Sender<bool>,
}

impl CancelHandle {
    /// Cancel all operations running under the paired context
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }
}

impl OpContext {
    /// Context with no deadline that can never be cancelled
    pub fn background() -> Self {
        Self::default()
    }

    /// Add a timeout relative to now; the earliest deadline wins
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Add an absolute deadline; the earliest deadline wins
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// Make the context cancellable, returning the handle that cancels it
    pub fn cancellable(mut self) -> (Self, CancelHandle) {
        let (sender, receiver) = watch::channel(false);
        self.cancel = Some(receiver);
        (self, CancelHandle { sender })
    }

    /// Deadline, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Check whether the paired handle has cancelled this context
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
    }

    /// Check whether the deadline has already passed
    pub fn is_expired(&self) -> bool {
        self.deadline.map(|d| Instant::now() >= d).unwrap_or(false)
    }

    /// Run `fut` under this context
    ///
    /// Fails without polling `fut` if the context is already cancelled or
    /// expired. Otherwise `fut` is raced against both signals and dropped as
    /// soon as one fires.
    pub async fn run<T, F>(&self, operation: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.is_cancelled() {
            return Err(TrackerError::Cancelled { operation });
        }
        if self.is_expired() {
            return Err(TrackerError::DeadlineExceeded { operation });
        }

        let cancelled = wait_cancelled(self.cancel.clone());
        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            result = fut => result,
            _ = cancelled => Err(TrackerError::Cancelled { operation }),
            _ = expired => Err(TrackerError::DeadlineExceeded { operation }),
        }
    }
}

async fn wait_cancelled(receiver: Option<watch::Receiver<bool>>) {
    let Some(mut rx) = receiver else {
        return std::future::pending().await;
    };
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        // Handle dropped without cancelling: this context can no longer fire.
        if rx.changed().await.is_err() {
            return std::future::pending().await;
        }
    }
}
