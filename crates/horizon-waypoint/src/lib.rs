//! Horizon Waypoint - a multi-step wizard navigation engine for desktop
//! dialog flows.
//!
//! Waypoint drives the navigation of wizard-style dialogs: a stack-based
//! state machine with forward/back/finish/cancel transitions, cycle-
//! collapsing "rejoin" transitions, transient overlay pages for cancellable
//! long-running work, validation gating, and a strict disposal protocol.
//! Rendering and the modal event loop stay on the application's side of the
//! [`HostSurface`] boundary.
//!
//! # Example
//!
//! ```ignore
//! use horizon_waypoint::{FnBehavior, NextStep, Step, Wizard};
//! use horizon_waypoint_core::global_registry;
//!
//! let welcome = global_registry().register("welcome");
//! let summary = global_registry().register("summary");
//!
//! let first = Step::new(welcome)
//!     .with_title("Welcome")
//!     .with_behavior(FnBehavior::new().compute_next(move |_| {
//!         Ok(Some(NextStep::New(
//!             Step::new(summary).with_title("Summary").final_step(),
//!         )))
//!     }));
//!
//! let mut wizard = Wizard::new(first);
//! wizard.finished.connect(|()| println!("Wizard completed!"));
//!
//! wizard.start(&mut shell)?;
//! // ... the host surface forwards input to wizard.forward / back / cancel
//! ```

pub mod dispose;
pub mod error;
pub mod host;
pub mod overlay;
pub mod step;
pub mod store;
pub mod validate;
pub mod wizard;

pub use dispose::{Disposable, DisposeError};
pub use error::{WizardError, WizardResult};
pub use host::{CloseResponse, HostSurface};
pub use overlay::OverlayPage;
pub use step::{
    EnterReason, FnBehavior, LeaveDecision, LeaveReason, NextStep, Step, StepBehavior, StepData,
    StepError, StepId, StepResult, StepState,
};
pub use store::{LAST_STEP_TITLE_KEY, MemoryStore, SessionStore, StoreValue};
pub use validate::{AcceptAll, ValidationGate, ValidationOutcome};
pub use wizard::{Transition, Wizard};

pub use horizon_waypoint_core::*;
