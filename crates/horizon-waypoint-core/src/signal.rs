//! Signal/slot system for Horizon Waypoint.
//!
//! This module provides a type-safe signal/slot mechanism for notifying
//! application code about navigation events. Signals are emitted by the
//! engine when its state changes, and connected slots (callbacks) are
//! invoked in response.
//!
//! # Key Types
//!
//! - [`Signal<Args>`] - The main signal type for emitting notifications
//! - [`ConnectionId`] - Unique identifier returned when connecting a slot
//! - [`ConnectionGuard`] - RAII guard that disconnects when dropped
//!
//! # Threading
//!
//! The navigation engine is confined to the thread that owns the host
//! surface's display loop, so slots are always invoked directly on the
//! emitting thread; there is no queued delivery. Slots still must be
//! `Send + Sync` so types holding signals can themselves be `Send`.
//!
//! # Example
//!
//! ```
//! use horizon_waypoint_core::Signal;
//!
//! // Create a signal that passes a string argument
//! let title_changed = Signal::<String>::new();
//!
//! // Connect a slot (closure)
//! let conn_id = title_changed.connect(|title| {
//!     println!("Title changed to: {}", title);
//! });
//!
//! // Emit the signal
//! title_changed.emit("Hello, World!".to_string());
//!
//! // Disconnect when done
//! title_changed.disconnect(conn_id);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

new_key_type! {
    /// A unique identifier for a signal-slot connection.
    ///
    /// Use this ID to disconnect a specific connection via [`Signal::disconnect`].
    /// The ID remains valid until the connection is explicitly disconnected or
    /// the signal is dropped.
    pub struct ConnectionId;
}

/// Internal storage for a single connection.
struct Connection<Args> {
    /// The slot function to invoke.
    slot: Arc<dyn Fn(&Args) + Send + Sync>,
}

/// A type-safe signal that can have multiple connected slots.
///
/// When a signal is emitted, all connected slots are invoked with a shared
/// reference to the provided arguments, in no guaranteed order.
///
/// # Type Parameter
///
/// - `Args`: The argument type passed to connected slots. Use `()` for
///   signals with no arguments.
///
/// # Related Types
///
/// - [`ConnectionId`] - Returned by [`connect`](Self::connect), used to disconnect
/// - [`ConnectionGuard`] - RAII-style connection that auto-disconnects on drop
pub struct Signal<Args> {
    /// All active connections.
    connections: Mutex<SlotMap<ConnectionId, Connection<Args>>>,
    /// Whether signal emission is temporarily blocked.
    blocked: AtomicBool,
}

impl<Args: 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: 'static> Signal<Args> {
    /// Create a new signal with no connections.
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(SlotMap::with_key()),
            blocked: AtomicBool::new(false),
        }
    }

    /// Connect a slot (closure) to this signal.
    ///
    /// Returns a `ConnectionId` that can be used to disconnect the slot later.
    ///
    /// # Example
    ///
    /// ```
    /// use horizon_waypoint_core::Signal;
    ///
    /// let signal = Signal::<String>::new();
    /// let id = signal.connect(|s| println!("Got: {}", s));
    /// signal.emit("Hello".to_string());
    /// ```
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let connection = Connection {
            slot: Arc::new(slot),
        };
        self.connections.lock().insert(connection)
    }

    /// Connect a slot and receive an RAII guard that disconnects on drop.
    ///
    /// This is the preferred way to connect when the slot borrows from state
    /// with a shorter lifetime than the signal.
    pub fn connect_guarded<F>(&self, slot: F) -> ConnectionGuard<'_, Args>
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        ConnectionGuard {
            signal: self,
            id: Some(self.connect(slot)),
        }
    }

    /// Disconnect a specific slot by its connection ID.
    ///
    /// Returns `true` if the connection was found and removed, `false` otherwise.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.connections.lock().remove(id).is_some()
    }

    /// Disconnect all slots from this signal.
    pub fn disconnect_all(&self) {
        self.connections.lock().clear();
    }

    /// Get the number of connected slots.
    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Block signal emission temporarily.
    ///
    /// While blocked, calls to `emit()` will do nothing. This is useful
    /// during initialization or batch updates to prevent cascading
    /// notifications.
    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }

    /// Check if signal emission is currently blocked.
    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }

    /// Emit the signal, invoking all connected slots.
    ///
    /// If the signal is blocked, this does nothing. Slots are invoked
    /// directly on the calling thread.
    pub fn emit(&self, args: Args) {
        if self.is_blocked() {
            tracing::trace!(target: "horizon_waypoint_core::signal", "signal blocked, skipping emit");
            return;
        }

        // Clone the slot handles out so a slot that connects or disconnects
        // during emission does not deadlock on the connection table.
        let slots: Vec<_> = {
            let connections = self.connections.lock();
            tracing::trace!(target: "horizon_waypoint_core::signal", connection_count = connections.len(), "emitting signal");
            connections.iter().map(|(_, c)| c.slot.clone()).collect()
        };

        for slot in slots {
            slot(&args);
        }
    }
}

// Signal is Send + Sync because slots are Send + Sync and the connection
// table is behind a Mutex.
static_assertions::assert_impl_all!(Signal<()>: Send, Sync);

/// RAII guard for a signal connection.
///
/// Disconnects the slot when dropped. Obtained from
/// [`Signal::connect_guarded`].
pub struct ConnectionGuard<'a, Args> {
    signal: &'a Signal<Args>,
    id: Option<ConnectionId>,
}

impl<'a, Args: 'static> ConnectionGuard<'a, Args> {
    /// Get the underlying connection ID.
    pub fn id(&self) -> Option<ConnectionId> {
        self.id
    }

    /// Release the guard without disconnecting, leaving the connection alive.
    pub fn detach(mut self) -> Option<ConnectionId> {
        self.id.take()
    }
}

impl<'a, Args> Drop for ConnectionGuard<'a, Args> {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            self.signal.connections.lock().remove(id);
        }
    }
}
