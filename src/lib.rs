//! # Statio
//!
//! A keyed, observable state store for backing reactive UI bindings.
//!
//! Components read a value by key, subscribe to be told when it changes,
//! and write through a single mutation path that fans out to listeners and
//! to cross-cutting middleware.
//!
//! ## Store
//!
//! - [`Store`] - the container: `get`, `set`, `update`, `subscribe`,
//!   middleware registration and `batch`
//! - [`Value`] - type-erased payload; typed access is a downcast
//! - [`Subscription`] - RAII listener handle
//! - [`BatchScope`] - RAII batch window; notifications flush when the
//!   outermost scope closes
//!
//! ## Middleware
//!
//! [`Middleware`] observers see every accepted write, even inside a batch.
//! The [`middleware`] module ships persistence, logging, validation,
//! per-key effects and an inspector bridge.
//!
//! ```
//! use statio::Store;
//! use std::sync::{Arc, Mutex};
//!
//! let store = Store::new();
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let _sub = store.subscribe::<i32>("count", {
//!     let seen = Arc::clone(&seen);
//!     move |n| seen.lock().unwrap().push(*n)
//! });
//!
//! store.batch(|| {
//!     store.set("count", 1);
//!     store.set("count", 2);
//! });
//! assert_eq!(*seen.lock().unwrap(), vec![2]);
//! ```

pub mod error;
pub mod middleware;
pub mod store;

// Re-export main types for convenience
pub use error::{PersistError, StorageError, StoreError};
pub use middleware::Middleware;
pub use store::{BatchScope, Store, Subscription, Value, WeakStore};
