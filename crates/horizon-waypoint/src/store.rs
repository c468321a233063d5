//! Session key/value store.
//!
//! Some wizard state is worth remembering between sessions, most notably
//! the last active step title, which is restored when a later session
//! starts with an untitled first step. Rather than a process-wide static,
//! that state lives in an explicit store injected into the wizard, with a
//! lifecycle owned by the host application.
//!
//! The engine only needs `get`/`set`/`remove` over string keys; the
//! in-memory [`MemoryStore`] is the default, and applications that persist
//! settings can back the trait with their own storage.
//!
//! # Example
//!
//! ```
//! use horizon_waypoint::{MemoryStore, SessionStore, StoreValue};
//!
//! let mut store = MemoryStore::new();
//! store.set("wizard.width", StoreValue::Integer(640));
//!
//! assert_eq!(
//!     store.get("wizard.width"),
//!     Some(StoreValue::Integer(640)),
//! );
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Store key under which the wizard remembers the last active step title.
pub const LAST_STEP_TITLE_KEY: &str = "wizard.last_step_title";

/// A value that can be stored in a session store.
///
/// This enum represents the primitive types the engine stores directly.
/// It serializes untagged so stores backed by JSON files stay readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoreValue {
    /// A null/empty value.
    Null,
    /// A boolean value.
    Bool(bool),
    /// A 64-bit signed integer.
    Integer(i64),
    /// A string value.
    String(String),
}

impl StoreValue {
    /// Returns true if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, StoreValue::Null)
    }

    /// Returns this value as a boolean, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            StoreValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns this value as an integer, if it is one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            StoreValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns this value as a string, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            StoreValue::String(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for StoreValue {
    fn from(v: bool) -> Self {
        StoreValue::Bool(v)
    }
}

impl From<i64> for StoreValue {
    fn from(v: i64) -> Self {
        StoreValue::Integer(v)
    }
}

impl From<String> for StoreValue {
    fn from(v: String) -> Self {
        StoreValue::String(v)
    }
}

impl From<&str> for StoreValue {
    fn from(v: &str) -> Self {
        StoreValue::String(v.to_string())
    }
}

/// Key/value storage scoped to the host application.
///
/// The engine treats the store as opaque: keys are plain strings and no
/// correctness obligation attaches to the stored values. Dropping or
/// resetting a store is always safe.
pub trait SessionStore: Send {
    /// Get the value stored under a key.
    fn get(&self, key: &str) -> Option<StoreValue>;

    /// Store a value under a key, replacing any previous value.
    fn set(&mut self, key: &str, value: StoreValue);

    /// Remove the value stored under a key.
    fn remove(&mut self, key: &str);
}

/// An in-memory session store.
///
/// The default store bound to a wizard when the host supplies none. State
/// lives only as long as the store itself.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, StoreValue>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// The number of stored values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Option<StoreValue> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: StoreValue) {
        self.values.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }
}
