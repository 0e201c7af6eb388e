use std::any::{self, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A type-erased, cheaply cloneable payload stored under a key.
///
/// The store is untyped at rest. Typed access is a downcast: asking for the
/// wrong type yields `None`, never a panic.
#[derive(Clone)]
pub struct Value {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Value {
    /// Wrap an owned value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wrap an already shared value without copying it.
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            inner: value,
            type_name: any::type_name::<T>(),
        }
    }

    /// Borrow the payload as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Get a shared handle to the payload as `T`.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.inner).downcast::<T>().ok()
    }

    /// Whether the payload is a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }

    /// `TypeId` of the payload (not of the handle).
    pub fn payload_type_id(&self) -> TypeId {
        (*self.inner).type_id()
    }

    /// Name of the payload's concrete type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Reference identity: both handles point at the same allocation.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.inner), Arc::as_ptr(&other.inner))
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value<{}>", self.type_name)
    }
}

/// Authoritative key -> value map.
///
/// Slots are created on first write and live as long as the table; there is
/// no delete.
#[derive(Default)]
pub(crate) struct KeyedTable {
    slots: HashMap<String, Value>,
}

impl KeyedTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get(&self, key: &str) -> Option<&Value> {
        self.slots.get(key)
    }

    /// Replace the slot's value, returning what was there before.
    pub(crate) fn set(&mut self, key: &str, value: Value) -> Option<Value> {
        match self.slots.get_mut(key) {
            Some(slot) => Some(std::mem::replace(slot, value)),
            None => {
                self.slots.insert(key.to_owned(), value);
                None
            }
        }
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        self.slots.keys().cloned().collect()
    }
}
