//! The keyed state store.
//!
//! A [`Store`] holds type-erased [`Value`]s under string keys, notifies
//! per-key listeners on change, runs middleware on every accepted write
//! and can defer notification through [`Store::batch`].

mod batch;
pub(crate) mod guard;
mod registry;
mod selector;
mod store;
mod table;

pub use batch::BatchScope;
pub use store::{Store, Subscription, WeakStore};
pub use table::Value;
