//! Middleware: observers of every accepted write.
//!
//! The [`Middleware`] trait is the contract; the rest of this module holds
//! ready-made middlewares for common side effects:
//! - [`effect_on`] - run a callback when one key changes
//! - [`Persist`] - write values to a [`Storage`] as JSON
//! - [`logger`] - log each change
//! - [`validate`] - warn when a value fails a predicate
//! - [`devtools`] - forward changes to an external inspector

mod codec;
mod devtools;
mod effect;
mod logger;
mod persist;
pub(crate) mod pipeline;
mod storage;
mod validate;

pub use codec::JsonCodec;
pub use devtools::{
    devtools, DevTools, InspectorConnection, InspectorProvider, DEFAULT_INSPECTOR_NAME,
};
pub use effect::{effect_on, EffectOn};
pub use logger::{logger, logger_with, Logger};
pub use persist::{persist, restore, Persist, PersistOptions, DEFAULT_KEY_PREFIX};
pub use pipeline::Middleware;
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use validate::{validate, Validate};
