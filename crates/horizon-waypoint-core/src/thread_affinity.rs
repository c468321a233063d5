//! Thread affinity verification for Horizon Waypoint.
//!
//! The navigation engine is single-threaded by contract: every operation
//! must run on the one thread that owns the host surface's display loop.
//! This module provides debug assertions and runtime checks to catch
//! violations of that contract early.
//!
//! # Usage
//!
//! The UI thread is tracked once at startup via [`set_ui_thread`]. After
//! that, the provided macros and functions verify thread affinity:
//!
//! ```ignore
//! use horizon_waypoint_core::{debug_assert_ui_thread, is_ui_thread};
//!
//! fn apply_transition(&mut self) {
//!     // Panic in debug builds if not on the UI thread
//!     debug_assert_ui_thread!();
//!
//!     // ... mutate navigation state ...
//! }
//! ```
//!
//! # Object Thread Affinity
//!
//! For objects that must stay on the thread that created them, use
//! [`ThreadAffinity`]:
//!
//! ```
//! use horizon_waypoint_core::ThreadAffinity;
//!
//! struct Controller {
//!     affinity: ThreadAffinity,
//! }
//!
//! impl Controller {
//!     fn new() -> Self {
//!         Self { affinity: ThreadAffinity::current() }
//!     }
//!
//!     fn forward(&mut self) {
//!         self.affinity.debug_assert_same_thread();
//!         // ... safe to mutate ...
//!     }
//! }
//! ```

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::ThreadId;

/// Global storage for the UI thread ID.
static UI_THREAD_ID: OnceLock<ThreadId> = OnceLock::new();

/// Flag to enable/disable runtime thread checks globally.
static THREAD_CHECKS_ENABLED: AtomicBool = AtomicBool::new(cfg!(debug_assertions));

/// Set the UI thread ID to the current thread.
///
/// Should be called once, from the thread that will run the host surface's
/// display loop, at application startup.
///
/// # Panics
///
/// Panics if called again from a different thread.
pub fn set_ui_thread() {
    let current = std::thread::current().id();
    if UI_THREAD_ID.set(current).is_err() && UI_THREAD_ID.get() != Some(&current) {
        panic!(
            "set_ui_thread() called from different thread than original. \
             The UI thread ID can only be set once."
        );
    }
}

/// Get the UI thread ID if it has been set.
#[inline]
pub fn ui_thread_id() -> Option<ThreadId> {
    UI_THREAD_ID.get().copied()
}

/// Check if the current thread is the UI thread.
///
/// Returns `true` if we are on the UI thread, or if the UI thread has not
/// been set yet (graceful fallback during early initialization).
#[inline]
pub fn is_ui_thread() -> bool {
    match UI_THREAD_ID.get() {
        Some(&ui_id) => std::thread::current().id() == ui_id,
        None => true,
    }
}

/// Enable or disable runtime thread checks.
///
/// By default, thread checks are enabled in debug builds and disabled in
/// release builds. Call this function to override the default behavior.
pub fn set_thread_checks_enabled(enabled: bool) {
    THREAD_CHECKS_ENABLED.store(enabled, Ordering::SeqCst);
}

/// Check if runtime thread checks are currently enabled.
#[inline]
pub fn are_thread_checks_enabled() -> bool {
    THREAD_CHECKS_ENABLED.load(Ordering::Relaxed)
}

/// Panics if the current thread is not the UI thread.
///
/// Always active, in both debug and release builds. Use
/// [`debug_assert_ui_thread!`](crate::debug_assert_ui_thread) for checks
/// that should only run in debug builds.
#[track_caller]
pub fn assert_ui_thread() {
    assert!(
        is_ui_thread(),
        "operation invoked from thread {:?}, but the navigation engine is confined to the UI thread {:?}",
        std::thread::current().id(),
        ui_thread_id(),
    );
}

/// Panic if the current thread is not the UI thread.
///
/// Always active. Accepts an optional message like `assert!`.
#[macro_export]
macro_rules! assert_ui_thread {
    () => {
        $crate::thread_affinity::assert_ui_thread()
    };
    ($($arg:tt)+) => {
        assert!($crate::is_ui_thread(), $($arg)+)
    };
}

/// Panic in debug builds if the current thread is not the UI thread.
///
/// Compiles to nothing in release builds unless runtime thread checks were
/// explicitly enabled via [`set_thread_checks_enabled`].
#[macro_export]
macro_rules! debug_assert_ui_thread {
    () => {
        if $crate::are_thread_checks_enabled() {
            $crate::thread_affinity::assert_ui_thread();
        }
    };
}

/// Captures the creating thread so an object can verify it is only touched
/// from that thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadAffinity {
    thread: ThreadId,
}

impl ThreadAffinity {
    /// Capture the current thread.
    pub fn current() -> Self {
        Self {
            thread: std::thread::current().id(),
        }
    }

    /// The captured thread ID.
    pub fn thread_id(&self) -> ThreadId {
        self.thread
    }

    /// Check whether the current thread matches the captured one.
    pub fn is_same_thread(&self) -> bool {
        std::thread::current().id() == self.thread
    }

    /// Panic if the current thread does not match the captured one.
    #[track_caller]
    pub fn assert_same_thread(&self) {
        assert!(
            self.is_same_thread(),
            "object confined to thread {:?} was accessed from thread {:?}",
            self.thread,
            std::thread::current().id(),
        );
    }

    /// Panic if the current thread does not match, when thread checks are
    /// enabled. Compiles down to a flag read otherwise.
    #[track_caller]
    pub fn debug_assert_same_thread(&self) {
        if are_thread_checks_enabled() {
            self.assert_same_thread();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affinity_same_thread() {
        let affinity = ThreadAffinity::current();
        assert!(affinity.is_same_thread());
        affinity.assert_same_thread();
    }

    #[test]
    fn test_affinity_other_thread() {
        let affinity = ThreadAffinity::current();
        let handle = std::thread::spawn(move || affinity.is_same_thread());
        assert!(!handle.join().unwrap());
    }

    #[test]
    #[should_panic(expected = "was accessed from thread")]
    fn test_affinity_assert_panics_cross_thread() {
        let affinity = ThreadAffinity::current();
        let handle = std::thread::spawn(move || affinity.assert_same_thread());
        // Re-raise the panic from the spawned thread.
        if let Err(payload) = handle.join() {
            std::panic::resume_unwind(payload);
        }
    }

    #[test]
    fn test_thread_checks_toggle() {
        let original = are_thread_checks_enabled();

        set_thread_checks_enabled(true);
        assert!(are_thread_checks_enabled());
        set_thread_checks_enabled(false);
        assert!(!are_thread_checks_enabled());

        set_thread_checks_enabled(original);
    }
}
