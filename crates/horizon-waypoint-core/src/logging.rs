//! Logging facilities for Horizon Waypoint.
//!
//! Horizon Waypoint uses the `tracing` crate for instrumentation. To see
//! logs, install a tracing subscriber in your application:
//!
//! ```ignore
//! use tracing_subscriber;
//!
//! fn main() {
//!     // Initialize tracing (you can customize this)
//!     tracing_subscriber::fmt::init();
//!
//!     // Your application code...
//! }
//! ```
//!
//! Every subsystem logs under its own target so output can be filtered with
//! standard `tracing` directives, e.g.
//! `RUST_LOG=horizon_waypoint::wizard=trace`.

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "horizon_waypoint_core";
    /// Container registry target.
    pub const CONTAINER: &str = "horizon_waypoint_core::container";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "horizon_waypoint_core::signal";
    /// Cancellation target.
    pub const CANCEL: &str = "horizon_waypoint_core::cancel";
    /// Navigation engine target.
    pub const WIZARD: &str = "horizon_waypoint::wizard";
    /// Overlay stack target.
    pub const OVERLAY: &str = "horizon_waypoint::overlay";
    /// Validation gate target.
    pub const VALIDATE: &str = "horizon_waypoint::validate";
}
