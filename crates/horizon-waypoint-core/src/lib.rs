//! Core systems for Horizon Waypoint.
//!
//! This crate provides the foundational components of the Horizon Waypoint
//! navigation engine:
//!
//! - **Container Registry**: Arena-based identity for view containers
//! - **Signal/Slot System**: Type-safe notification of navigation events
//! - **Cancellation**: Cooperative cancellation tokens for long-running work
//! - **Thread Affinity**: Debug checks for the UI-thread confinement contract
//!
//! # Signal/Slot Example
//!
//! ```
//! use horizon_waypoint_core::Signal;
//!
//! // Create a signal that notifies when a value changes
//! let value_changed = Signal::<i32>::new();
//!
//! // Connect a slot to handle the signal
//! let conn_id = value_changed.connect(|value| {
//!     println!("Value changed to: {}", value);
//! });
//!
//! // Emit the signal
//! value_changed.emit(42);
//!
//! // Disconnect when done
//! value_changed.disconnect(conn_id);
//! ```
//!
//! # Cancellation Example
//!
//! ```
//! use horizon_waypoint_core::CancelToken;
//!
//! let token = CancelToken::new();
//! let handle = token.clone();
//!
//! // Long-running work polls the token between units of progress
//! while token.checkpoint().is_ok() {
//!     // ... do one unit of work, then someone cancels ...
//!     handle.cancel();
//! }
//! assert!(token.is_cancelled());
//! ```

pub mod cancel;
pub mod container;
pub mod logging;
pub mod signal;
pub mod thread_affinity;

pub use cancel::{CancelToken, Cancelled};
pub use container::{
    ContainerError, ContainerId, ContainerRegistry, ContainerResult, SharedContainerRegistry,
    global_registry, init_global_registry,
};
pub use signal::{ConnectionGuard, ConnectionId, Signal};
pub use thread_affinity::{
    ThreadAffinity, are_thread_checks_enabled, is_ui_thread, set_thread_checks_enabled,
    set_ui_thread, ui_thread_id,
};
