//! Host surface boundary.
//!
//! The navigation engine does not render, lay out, or run an event loop;
//! all of that belongs to the *host surface*: the window or dialog shell
//! that displays whichever container is current and owns the
//! forward/back/cancel/finish controls. This module defines the one trait
//! the engine needs from it.
//!
//! Control flows in both directions across this boundary: the host forwards
//! raw input by calling [`Wizard::forward`](crate::Wizard::forward),
//! [`Wizard::back`](crate::Wizard::back), and
//! [`Wizard::cancel`](crate::Wizard::cancel); the engine answers through
//! the methods below.
//!
//! # Example
//!
//! ```ignore
//! struct DialogShell { /* windowing handles */ }
//!
//! impl HostSurface for DialogShell {
//!     fn show_container(&mut self, container: ContainerId) {
//!         // swap the visible child widget
//!     }
//!     // ...
//! }
//! ```

use horizon_waypoint_core::ContainerId;

/// The answer to a host-surface close request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseResponse {
    /// The close may proceed; the session has been disposed.
    Allow,
    /// The close must be suppressed; the session continues.
    Deny,
}

impl CloseResponse {
    /// Check if the close may proceed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, CloseResponse::Allow)
    }
}

/// The rendering/windowing side of a wizard session.
///
/// Implemented by the dialog shell that hosts the wizard. The engine calls
/// these methods during transitions; none of them may call back into the
/// wizard (the engine is not reentrant).
pub trait HostSurface {
    /// Display the given container in the content area, replacing whatever
    /// was visible.
    fn show_container(&mut self, container: ContainerId);

    /// Enable or disable the forward (Next/Finish) control.
    fn set_forward_enabled(&mut self, enabled: bool);

    /// Enable or disable the back control.
    fn set_back_enabled(&mut self, enabled: bool);

    /// Enable or disable the cancel/close control.
    fn set_cancel_enabled(&mut self, enabled: bool);

    /// Set the surface title.
    fn set_title(&mut self, title: &str);

    /// Set the help context shown for the current step.
    fn set_help_context(&mut self, context: &str);

    /// Close the surface, ending the modal display loop.
    fn close(&mut self);

    /// Display a non-fatal error message to the user.
    ///
    /// Used for validation failures, hook failures, and "no next step"
    /// programming errors. Must not block and must not re-enter the wizard.
    fn report_error(&mut self, message: &str);
}
