//! Validation gating for forward transitions.
//!
//! A single validation gate is bound to each wizard and consulted before
//! every forward transition, never before back or cancel. The gate
//! inspects the current step's container (typically walking its input
//! fields) and answers with a tri-state outcome: accept, warn-but-proceed,
//! or reject.
//!
//! The gate is supplied by the host surface as an opaque capability; the
//! engine only needs the single [`ValidationGate::validate`] call.
//!
//! # Example
//!
//! ```
//! use horizon_waypoint::{ValidationGate, ValidationOutcome};
//! use horizon_waypoint_core::ContainerId;
//!
//! struct RequiredFields;
//!
//! impl ValidationGate for RequiredFields {
//!     fn validate(&mut self, _container: ContainerId) -> ValidationOutcome {
//!         // ... inspect the container's fields ...
//!         ValidationOutcome::Reject("Name must not be empty".into())
//!     }
//! }
//! ```

use horizon_waypoint_core::ContainerId;

/// The result of running the validation gate over a step's container.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ValidationOutcome {
    /// The container's contents are valid; the transition proceeds.
    #[default]
    Accept,
    /// The contents are questionable; the message is surfaced but the
    /// transition proceeds.
    Warn(String),
    /// The contents are invalid; the message is surfaced and the
    /// transition is aborted with no state change.
    Reject(String),
}

impl ValidationOutcome {
    /// Check if the transition may proceed (accept or warn).
    pub fn allows_transition(&self) -> bool {
        !matches!(self, ValidationOutcome::Reject(_))
    }

    /// The message carried by a warn or reject outcome, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            ValidationOutcome::Accept => None,
            ValidationOutcome::Warn(msg) | ValidationOutcome::Reject(msg) => Some(msg),
        }
    }
}

/// Validates the current step's container before a forward transition.
///
/// # Thread Safety
///
/// Gates must be `Send` so a wizard holding one can move between threads
/// before its session starts; during the session everything stays on the
/// UI thread.
pub trait ValidationGate: Send {
    /// Validate the container of the current step.
    fn validate(&mut self, container: ContainerId) -> ValidationOutcome;
}

impl<F> ValidationGate for F
where
    F: FnMut(ContainerId) -> ValidationOutcome + Send,
{
    fn validate(&mut self, container: ContainerId) -> ValidationOutcome {
        self(container)
    }
}

impl ValidationGate for Box<dyn ValidationGate> {
    fn validate(&mut self, container: ContainerId) -> ValidationOutcome {
        (**self).validate(container)
    }
}

/// A gate that accepts every container.
///
/// This is the default gate bound to a wizard when the host supplies none.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl ValidationGate for AcceptAll {
    fn validate(&mut self, _container: ContainerId) -> ValidationOutcome {
        ValidationOutcome::Accept
    }
}
