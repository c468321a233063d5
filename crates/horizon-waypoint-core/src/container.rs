//! Container registry for Horizon Waypoint.
//!
//! The navigation engine never draws anything itself: every step and overlay
//! page refers to a *view container* that some external rendering system owns
//! and paints. All the engine needs from a container is a stable identity and
//! a liveness check, which this module provides through arena-based storage.
//!
//! # Key Types
//!
//! - [`ContainerId`] - Unique stable identifier for a view container
//! - [`ContainerRegistry`] - Central arena managing container records
//! - [`SharedContainerRegistry`] - Thread-safe wrapper around [`ContainerRegistry`]
//!
//! # Example
//!
//! ```
//! use horizon_waypoint_core::{global_registry, init_global_registry};
//!
//! init_global_registry();
//!
//! let id = global_registry().register("welcome-page");
//! assert!(global_registry().contains(id));
//!
//! global_registry().destroy(id).unwrap();
//! assert!(!global_registry().contains(id));
//! ```

use std::fmt;
use std::sync::OnceLock;

use parking_lot::RwLock;
use slotmap::{SlotMap, new_key_type};

new_key_type! {
    /// A unique identifier for a view container in the registry.
    ///
    /// `ContainerId`s are stable handles: they remain valid while the
    /// container is alive and become invalid when it is destroyed. A
    /// destroyed id is never reused for a different container.
    pub struct ContainerId;
}

impl ContainerId {
    /// Convert the ContainerId to a raw u64 value.
    ///
    /// This is useful for interop with external systems that need a numeric ID.
    /// The raw value can be converted back using [`ContainerId::from_raw`].
    #[inline]
    pub fn as_raw(self) -> u64 {
        use slotmap::Key;
        self.data().as_ffi()
    }

    /// Create a ContainerId from a raw u64 value.
    ///
    /// Returns `Some` if the raw value could be a valid ContainerId.
    /// Note: This does not check if the container exists in the registry.
    #[inline]
    pub fn from_raw(raw: u64) -> Option<Self> {
        let key_data = slotmap::KeyData::from_ffi(raw);
        Some(Self::from(key_data))
    }
}

/// Errors that can occur during container registry operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerError {
    /// The container ID is invalid or has been destroyed.
    InvalidContainerId,
}

impl fmt::Display for ContainerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidContainerId => write!(f, "Invalid or destroyed container ID"),
        }
    }
}

impl std::error::Error for ContainerError {}

/// Result type for container registry operations.
pub type ContainerResult<T> = std::result::Result<T, ContainerError>;

/// Internal data stored in the registry for each container.
struct ContainerData {
    /// Human-readable name for debugging and lookup.
    name: String,
}

/// The central arena that manages view container records.
///
/// Uses arena-based storage via SlotMap so container ids stay stable as
/// containers come and go, and a destroyed id can be distinguished from a
/// live one instead of aliasing a newer container.
///
/// # Related Types
///
/// - [`SharedContainerRegistry`] - Thread-safe wrapper for concurrent access
/// - [`ContainerId`] - Keys into this registry
/// - [`global_registry`] - Access the singleton instance
pub struct ContainerRegistry {
    containers: SlotMap<ContainerId, ContainerData>,
}

impl ContainerRegistry {
    /// Create a new empty container registry.
    pub fn new() -> Self {
        Self {
            containers: SlotMap::with_key(),
        }
    }

    /// Register a new container and return its ID.
    pub fn register(&mut self, name: impl Into<String>) -> ContainerId {
        let name = name.into();
        let id = self.containers.insert(ContainerData { name: name.clone() });
        tracing::trace!(target: "horizon_waypoint_core::container", ?id, %name, "registered container");
        id
    }

    /// Remove a container from the registry.
    ///
    /// After this call the id is invalid; any step or overlay page still
    /// referring to it will be rejected at display time.
    #[tracing::instrument(skip(self), target = "horizon_waypoint_core::container", level = "trace")]
    pub fn destroy(&mut self, id: ContainerId) -> ContainerResult<()> {
        if self.containers.remove(id).is_none() {
            return Err(ContainerError::InvalidContainerId);
        }
        tracing::trace!(target: "horizon_waypoint_core::container", ?id, "destroyed container");
        Ok(())
    }

    /// Check if a container exists in the registry.
    pub fn contains(&self, id: ContainerId) -> bool {
        self.containers.contains_key(id)
    }

    /// Get the debug name of a container.
    pub fn name(&self, id: ContainerId) -> ContainerResult<String> {
        self.containers
            .get(id)
            .map(|data| data.name.clone())
            .ok_or(ContainerError::InvalidContainerId)
    }

    /// Set the debug name of a container.
    pub fn set_name(&mut self, id: ContainerId, name: impl Into<String>) -> ContainerResult<()> {
        let data = self
            .containers
            .get_mut(id)
            .ok_or(ContainerError::InvalidContainerId)?;
        data.name = name.into();
        Ok(())
    }

    /// Get the number of live containers.
    pub fn len(&self) -> usize {
        self.containers.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }
}

impl Default for ContainerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe wrapper around [`ContainerRegistry`].
///
/// All methods take `&self` and use an internal `RwLock`, so the shared
/// registry can be reached from anywhere without threading a mutable
/// reference through the call graph.
pub struct SharedContainerRegistry {
    inner: RwLock<ContainerRegistry>,
}

impl SharedContainerRegistry {
    /// Create a new shared registry.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(ContainerRegistry::new()),
        }
    }

    /// Register a new container and return its ID.
    pub fn register(&self, name: impl Into<String>) -> ContainerId {
        self.inner.write().register(name)
    }

    /// Remove a container from the registry.
    pub fn destroy(&self, id: ContainerId) -> ContainerResult<()> {
        self.inner.write().destroy(id)
    }

    /// Check if a container exists in the registry.
    pub fn contains(&self, id: ContainerId) -> bool {
        self.inner.read().contains(id)
    }

    /// Get the debug name of a container.
    pub fn name(&self, id: ContainerId) -> ContainerResult<String> {
        self.inner.read().name(id)
    }

    /// Set the debug name of a container.
    pub fn set_name(&self, id: ContainerId, name: impl Into<String>) -> ContainerResult<()> {
        self.inner.write().set_name(id, name)
    }

    /// Get the number of live containers.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl Default for SharedContainerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The global container registry instance.
static GLOBAL_REGISTRY: OnceLock<SharedContainerRegistry> = OnceLock::new();

/// Initialize the global container registry.
///
/// Safe to call multiple times; only the first call creates the registry.
/// Typically called once at application startup, before any containers are
/// created.
pub fn init_global_registry() {
    let _ = GLOBAL_REGISTRY.get_or_init(SharedContainerRegistry::new);
}

/// Access the global container registry.
///
/// Initializes the registry on first access if [`init_global_registry`]
/// has not been called yet.
pub fn global_registry() -> &'static SharedContainerRegistry {
    GLOBAL_REGISTRY.get_or_init(SharedContainerRegistry::new)
}

static_assertions::assert_impl_all!(SharedContainerRegistry: Send, Sync);
