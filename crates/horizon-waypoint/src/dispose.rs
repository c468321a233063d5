//! Disposal registration for session-scoped resources.
//!
//! Application code frequently opens resources whose lifetime should match
//! the wizard session: temp directories, watcher handles, connections used
//! by several steps. Registering them with the wizard guarantees they are
//! released exactly once when the session ends, on every termination path.
//!
//! Disposal is best-effort: a failure from one disposable is logged and
//! swallowed so the remaining ones (and the rest of teardown) still run.

use std::fmt;

/// Error type returned by a failed disposal.
pub type DisposeError = Box<dyn std::error::Error + Send + Sync>;

/// A resource released at session end.
///
/// Registered via [`Wizard::register_disposable`](crate::Wizard::register_disposable)
/// and released in reverse registration order when the session is disposed.
pub trait Disposable: Send {
    /// Release the resource.
    ///
    /// Called exactly once. Errors are logged and swallowed; disposal of
    /// the session always completes.
    fn dispose(&mut self) -> Result<(), DisposeError>;
}

impl<F> Disposable for F
where
    F: FnMut() -> Result<(), DisposeError> + Send,
{
    fn dispose(&mut self) -> Result<(), DisposeError> {
        self()
    }
}

impl fmt::Debug for dyn Disposable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Disposable")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_closure_disposable() {
        let released = Arc::new(AtomicBool::new(false));
        let released_clone = released.clone();

        let mut disposable = move || -> Result<(), DisposeError> {
            released_clone.store(true, Ordering::SeqCst);
            Ok(())
        };

        disposable.dispose().unwrap();
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn test_failing_disposable_reports_error() {
        let mut disposable = || -> Result<(), DisposeError> { Err("handle already closed".into()) };

        let err = disposable.dispose().unwrap_err();
        assert_eq!(err.to_string(), "handle already closed");
    }
}
