//! Transient overlay pages.
//!
//! An [`OverlayPage`] is a view container shown *in place of* the current
//! step, without disturbing the navigation stack. The standard use is a
//! cancellable progress display while a step runs a long operation on the
//! UI thread. Overlay pages stack: pushing while one is already visible
//! simply covers it, and popping restores whatever was underneath,
//! supporting progress-within-progress without re-entering step logic.
//!
//! The wizard owns the overlay stack; pages are pushed with
//! [`Wizard::push_overlay`](crate::Wizard::push_overlay) and popped with
//! [`Wizard::pop_overlay`](crate::Wizard::pop_overlay). While any overlay
//! is visible, forward and back are disabled and cancel is routed to the
//! top overlay instead of the current step.
//!
//! # Example
//!
//! ```
//! use horizon_waypoint::OverlayPage;
//! use horizon_waypoint_core::global_registry;
//!
//! let container = global_registry().register("scan-progress");
//!
//! let page = OverlayPage::new(container);
//! let token = page.cancel_token();
//!
//! page.cancelled.connect(|()| {
//!     println!("User cancelled the scan");
//! });
//!
//! // The long-running work polls `token.checkpoint()` between files.
//! # let _ = token;
//! ```

use std::any::Any;
use std::fmt;

use horizon_waypoint_core::{CancelToken, ContainerId, Signal};

/// A transient view container shown instead of the current step.
///
/// # Signals
///
/// - `cancelled()`: Emitted when the user cancels the overlay
pub struct OverlayPage {
    /// The view container displayed while this page is on top.
    container: ContainerId,

    /// Whether the cancel control stays enabled while this page is on top.
    cancel_enabled: bool,

    /// Arbitrary user data.
    tag: Option<Box<dyn Any + Send>>,

    /// Token tripped when the user cancels this page.
    token: CancelToken,

    /// Signal emitted when the user cancels this page.
    pub cancelled: Signal<()>,
}

impl OverlayPage {
    /// Create an overlay page for the given container.
    ///
    /// Cancel is enabled by default.
    pub fn new(container: ContainerId) -> Self {
        Self {
            container,
            cancel_enabled: true,
            tag: None,
            token: CancelToken::new(),
            cancelled: Signal::new(),
        }
    }

    // =========================================================================
    // Builder Pattern Methods
    // =========================================================================

    /// Set whether cancel is enabled, using builder pattern.
    ///
    /// While a non-cancellable overlay is on top, the host surface's cancel
    /// control is disabled and close requests are suppressed.
    pub fn with_cancel_enabled(mut self, enabled: bool) -> Self {
        self.cancel_enabled = enabled;
        self
    }

    /// Set the user tag using builder pattern.
    pub fn with_tag<T: Any + Send>(mut self, tag: T) -> Self {
        self.tag = Some(Box::new(tag));
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The view container displayed while this page is on top.
    pub fn container(&self) -> ContainerId {
        self.container
    }

    /// Check whether cancel is enabled for this page.
    pub fn cancel_enabled(&self) -> bool {
        self.cancel_enabled
    }

    /// Set whether cancel is enabled for this page.
    pub fn set_cancel_enabled(&mut self, enabled: bool) {
        self.cancel_enabled = enabled;
    }

    /// A token that is tripped when the user cancels this page.
    ///
    /// Clone it into the long-running work and poll
    /// [`checkpoint`](CancelToken::checkpoint) between units of progress.
    pub fn cancel_token(&self) -> CancelToken {
        self.token.clone()
    }

    /// Borrow the user tag, downcast to `T`.
    pub fn tag_ref<T: Any>(&self) -> Option<&T> {
        self.tag.as_ref().and_then(|tag| tag.downcast_ref::<T>())
    }

    /// Cancel this page: trip the token and notify listeners.
    ///
    /// Called by the wizard when a cancel request arrives while this page
    /// is on top. Application code normally has no reason to call it.
    pub(crate) fn cancel(&self) {
        self.token.cancel();
        self.cancelled.emit(());
    }
}

impl fmt::Debug for OverlayPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayPage")
            .field("container", &self.container)
            .field("cancel_enabled", &self.cancel_enabled)
            .field("cancelled", &self.token.is_cancelled())
            .field("has_tag", &self.tag.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use horizon_waypoint_core::global_registry;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_overlay_defaults() {
        let container = global_registry().register("overlay");
        let page = OverlayPage::new(container);

        assert_eq!(page.container(), container);
        assert!(page.cancel_enabled());
        assert!(!page.cancel_token().is_cancelled());
    }

    #[test]
    fn test_cancel_trips_token_and_signal() {
        let container = global_registry().register("overlay");
        let page = OverlayPage::new(container);
        let token = page.cancel_token();

        let notified = Arc::new(AtomicBool::new(false));
        let notified_clone = notified.clone();
        page.cancelled.connect(move |()| {
            notified_clone.store(true, Ordering::SeqCst);
        });

        page.cancel();

        assert!(token.is_cancelled());
        assert!(notified.load(Ordering::SeqCst));
    }

    #[test]
    fn test_non_cancellable_overlay() {
        let container = global_registry().register("overlay");
        let page = OverlayPage::new(container).with_cancel_enabled(false);
        assert!(!page.cancel_enabled());
    }

    #[test]
    fn test_overlay_tag() {
        let container = global_registry().register("overlay");
        let page = OverlayPage::new(container).with_tag("scan".to_string());
        assert_eq!(page.tag_ref::<String>().map(String::as_str), Some("scan"));
    }
}
