//! Error types for the navigation engine.
//!
//! These errors are the loud half of the engine's failure taxonomy: they
//! report protocol misuse by the caller (navigating past the first step,
//! popping an empty overlay stack, showing a destroyed container) and are
//! returned immediately rather than absorbed. Per-transition failures
//! raised by application hooks are the quiet half; those never surface
//! here. The engine absorbs them, reports them through the host surface,
//! and leaves the navigation state unchanged.

use horizon_waypoint_core::ContainerId;
use thiserror::Error;

use crate::step::StepId;

/// Errors reporting misuse of the navigation protocol.
///
/// Each of these indicates a defect in the calling code, not a recoverable
/// runtime condition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WizardError {
    /// Back was requested with only one step on the stack.
    #[error("cannot navigate back past the first step")]
    BackAtFirstStep,

    /// An operation that requires a started session was invoked before `start`.
    #[error("wizard session has not been started")]
    NotStarted,

    /// `start` was invoked more than once.
    #[error("wizard session has already been started")]
    AlreadyStarted,

    /// An operation was invoked after the session was disposed.
    #[error("wizard session has been disposed")]
    Disposed,

    /// A step id does not belong to this wizard.
    #[error("step {0:?} is not registered with this wizard")]
    UnknownStep(StepId),

    /// Two steps were given the same view container.
    #[error("container {0:?} is already owned by another step")]
    ContainerInUse(ContainerId),

    /// A step or overlay page refers to a container that no longer exists.
    #[error("container {0:?} has been destroyed")]
    DeadContainer(ContainerId),

    /// An overlay page for this container is already on the overlay stack.
    #[error("an overlay for container {0:?} is already on the overlay stack")]
    OverlayAlreadyPushed(ContainerId),

    /// Pop was requested with no overlay on the stack.
    #[error("no overlay page to pop")]
    NoOverlay,
}

/// Result type for navigation engine operations.
pub type WizardResult<T> = std::result::Result<T, WizardError>;
