//! Cooperative cancellation for long-running work.
//!
//! Long-running work started from inside a wizard step or overlay page runs
//! on the UI thread and must stay interruptible. This module provides the
//! token half of that contract: the engine (or the user, via a cancel
//! button) trips a [`CancelToken`], and the work polls it between units of
//! progress via [`CancelToken::checkpoint`].
//!
//! When a [`Cancelled`] error escapes a step hook, the navigation engine
//! treats it as "abort this transition" rather than as a failure; it is
//! never propagated further.
//!
//! # Example
//!
//! ```
//! use horizon_waypoint_core::{CancelToken, Cancelled};
//!
//! fn copy_files(token: &CancelToken) -> Result<usize, Cancelled> {
//!     let mut copied = 0;
//!     for _file in 0..100 {
//!         token.checkpoint()?;
//!         // ... copy one file ...
//!         copied += 1;
//!     }
//!     Ok(copied)
//! }
//!
//! let token = CancelToken::new();
//! assert_eq!(copy_files(&token), Ok(100));
//!
//! token.cancel();
//! assert_eq!(copy_files(&token), Err(Cancelled));
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Error returned when an operation was cancelled by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cancelled;

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "operation cancelled by user")
    }
}

impl std::error::Error for Cancelled {}

/// A cloneable handle for cooperative cancellation.
///
/// All clones share the same underlying flag: cancelling any clone cancels
/// them all. The flag is one-way; once tripped, a token stays cancelled for
/// the rest of its life.
///
/// # Example
///
/// ```
/// use horizon_waypoint_core::CancelToken;
///
/// let token = CancelToken::new();
/// let handle = token.clone();
///
/// assert!(!token.is_cancelled());
/// handle.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a new token in the not-cancelled state.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Trip the token, requesting cancellation.
    ///
    /// Idempotent; cancelling an already-cancelled token has no effect.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            tracing::debug!(target: "horizon_waypoint_core::cancel", "cancellation requested");
        }
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Return `Err(Cancelled)` if cancellation has been requested.
    ///
    /// Call this between units of work so the `?` operator can unwind
    /// long-running operations promptly.
    pub fn checkpoint(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

static_assertions::assert_impl_all!(CancelToken: Send, Sync);
