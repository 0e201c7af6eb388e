use super::batch::{BatchController, BatchScope};
use super::registry::{self, ListenerId, SubscriberRegistry};
use super::table::{KeyedTable, Value};
use crate::error::StoreError;
use crate::middleware::pipeline::{self, Middleware, MiddlewarePipeline};
use std::any::{self, Any};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};

struct StoreInner {
    table: Mutex<KeyedTable>,
    registry: Mutex<SubscriberRegistry>,
    pipeline: Mutex<MiddlewarePipeline>,
    batch: Mutex<BatchController>,
}

/// Observers run outside every lock, so poisoning can only come from a bug
/// in the store itself; the data is still consistent.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A keyed, observable state container.
///
/// Values of any type live under string keys. Writes go through a single
/// path: identical writes are dropped, accepted writes update the table,
/// run every middleware and then notify the key's listeners (or, inside a
/// batch, defer that notification until the batch closes).
///
/// `Store` is a handle; clones share the same state. Construct isolated
/// stores with [`Store::new`] or use the process-wide [`Store::global`].
///
/// The store is meant to be driven from one logical thread. Listeners and
/// middlewares may write back into the store; capture a [`WeakStore`] from
/// [`Store::downgrade`] for that, since a registered observer holding a
/// `Store` keeps the store alive.
///
/// Listeners receive the value of the write that triggered them. When a
/// middleware replaces that value during the write, the listener sees the
/// replacement first and the original write after it, while the table
/// keeps the replacement.
///
/// # Examples
///
/// ```
/// use statio::Store;
///
/// let store = Store::new();
/// store.set("count", 1);
/// assert_eq!(store.get_cloned::<i32>("count"), Some(1));
///
/// store.update::<i32>("count", |n| *n += 1).unwrap();
/// assert_eq!(store.get_cloned::<i32>("count"), Some(2));
/// ```
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    /// Create a new, empty, isolated store.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StoreInner {
                table: Mutex::new(KeyedTable::new()),
                registry: Mutex::new(SubscriberRegistry::new()),
                pipeline: Mutex::new(MiddlewarePipeline::new()),
                batch: Mutex::new(BatchController::new()),
            }),
        }
    }

    /// A handle that does not keep the store alive.
    pub fn downgrade(&self) -> WeakStore {
        WeakStore {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// The process-wide default store, created on first use.
    pub fn global() -> Store {
        static GLOBAL: OnceLock<Store> = OnceLock::new();
        GLOBAL.get_or_init(Store::new).clone()
    }

    /// Read the value under `key` as `T`.
    ///
    /// Returns `None` if the key was never set or holds another type.
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.get_value(key)?.downcast::<T>()
    }

    /// Read and clone the value under `key`.
    pub fn get_cloned<T: Any + Send + Sync + Clone>(&self, key: &str) -> Option<T> {
        self.get_value(key)?.downcast_ref::<T>().cloned()
    }

    /// Read the untyped value under `key`.
    pub fn get_value(&self, key: &str) -> Option<Value> {
        lock(&self.inner.table).get(key).cloned()
    }

    /// Whether `key` has been set.
    pub fn contains(&self, key: &str) -> bool {
        lock(&self.inner.table).contains(key)
    }

    /// Number of keys that have ever been set.
    pub fn len(&self) -> usize {
        lock(&self.inner.table).len()
    }

    /// Whether no key has been set yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the keys currently in the table, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        lock(&self.inner.table).keys()
    }

    /// Write `value` under `key`.
    ///
    /// A write equal to the current value of the same type is a no-op: no
    /// table mutation, no middleware, no notification.
    pub fn set<T: Any + Send + Sync + PartialEq>(&self, key: &str, value: T) {
        self.write(key, Value::new(value), |prev, next| {
            match (prev.downcast_ref::<T>(), next.downcast_ref::<T>()) {
                (Some(prev), Some(next)) => prev == next,
                _ => false,
            }
        });
    }

    /// Write an already shared value under `key`.
    ///
    /// Only a pointer-identical write (the same `Arc` that is stored) is
    /// dropped; no `PartialEq` is needed.
    pub fn set_shared<T: Any + Send + Sync>(&self, key: &str, value: Arc<T>) {
        self.write_value(key, Value::from_arc(value));
    }

    /// Write an untyped value; short-circuits on reference identity.
    pub fn set_value(&self, key: &str, value: Value) {
        self.write_value(key, value);
    }

    fn write_value(&self, key: &str, value: Value) {
        self.write(key, value, |_, _| false);
    }

    fn write(&self, key: &str, value: Value, same: impl FnOnce(&Value, &Value) -> bool) {
        let prev = {
            let mut table = lock(&self.inner.table);
            if let Some(prev) = table.get(key) {
                if prev.ptr_eq(&value) || same(prev, &value) {
                    tracing::trace!(target: "statio", key, "write skipped: value unchanged");
                    return;
                }
            }
            table.set(key, value.clone())
        };
        tracing::trace!(target: "statio", key, type_name = value.type_name(), "write accepted");

        let middlewares = lock(&self.inner.pipeline).snapshot();
        pipeline::run_all(&middlewares, prev.as_ref(), &value, key);

        {
            let mut batch = lock(&self.inner.batch);
            if batch.is_active() {
                batch.record_touched(key);
                return;
            }
        }
        self.notify(key, &value);
    }

    fn notify(&self, key: &str, value: &Value) {
        let listeners = lock(&self.inner.registry).snapshot(key);
        if !listeners.is_empty() {
            registry::notify(key, value, &listeners);
        }
    }

    /// Produce a new value for `key` by mutating a draft copy of the current one.
    ///
    /// The stored `Arc<T>` is never mutated in place, so anyone still
    /// holding it keeps seeing the old value. A draft left equal to the
    /// current value writes nothing.
    ///
    /// # Errors
    ///
    /// [`StoreError::MissingValue`] if `key` was never set, and
    /// [`StoreError::TypeMismatch`] if it holds something other than `T`.
    pub fn update<T>(&self, key: &str, updater: impl FnOnce(&mut T)) -> Result<(), StoreError>
    where
        T: Any + Send + Sync + Clone + PartialEq,
    {
        let current = self.get_value(key).ok_or_else(|| StoreError::MissingValue {
            key: key.to_owned(),
        })?;
        let mut draft = current
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| StoreError::TypeMismatch {
                key: key.to_owned(),
                expected: any::type_name::<T>(),
                found: current.type_name(),
            })?;
        updater(&mut draft);
        self.set(key, draft);
        Ok(())
    }

    /// Subscribe to changes of `key`.
    ///
    /// The listener receives the new value on every accepted write (or once
    /// per batch). Values of another type than `T` are skipped with a
    /// warning. Dropping the returned [`Subscription`] unsubscribes.
    ///
    /// The store owns the listener, so a listener that needs the store
    /// should capture [`Store::downgrade`] rather than a clone.
    pub fn subscribe<T: Any + Send + Sync>(
        &self,
        key: &str,
        listener: impl Fn(&T) + Send + Sync + 'static,
    ) -> Subscription {
        self.subscribe_value(key, move |value: &Value| match value.downcast_ref::<T>() {
            Some(typed) => listener(typed),
            None => tracing::warn!(
                target: "statio",
                expected = any::type_name::<T>(),
                found = value.type_name(),
                "listener skipped: value has unexpected type"
            ),
        })
    }

    /// Subscribe an untyped listener to `key`.
    pub fn subscribe_value<F>(&self, key: &str, listener: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let id = lock(&self.inner.registry).subscribe(key, Arc::new(listener));
        tracing::debug!(target: "statio", key, id, "subscribed");
        Subscription {
            key: key.to_owned(),
            id,
            store: Some(Arc::downgrade(&self.inner)),
        }
    }

    /// Number of live listeners on `key`.
    pub fn subscriber_count(&self, key: &str) -> usize {
        lock(&self.inner.registry).count(key)
    }

    /// Whether the registry holds an entry for `key`.
    pub fn has_subscribers(&self, key: &str) -> bool {
        lock(&self.inner.registry).contains_key(key)
    }

    /// Register a middleware.
    pub fn use_middleware<M: Middleware + 'static>(&self, middleware: M) {
        self.use_shared(Arc::new(middleware));
    }

    /// Register a closure middleware.
    pub fn use_fn<F>(&self, middleware: F)
    where
        F: Fn(Option<&Value>, &Value, &str) + Send + Sync + 'static,
    {
        self.use_shared(Arc::new(middleware));
    }

    /// Register a shared middleware. Returns `false` if that same object is
    /// already registered.
    pub fn use_shared(&self, middleware: Arc<dyn Middleware>) -> bool {
        lock(&self.inner.pipeline).register(middleware)
    }

    /// Register a middleware that only sees writes whose value is a `T`.
    /// The previous value is passed only if it was a `T` as well.
    pub fn use_typed<T: Any + Send + Sync>(
        &self,
        middleware: impl Fn(Option<&T>, &T, &str) + Send + Sync + 'static,
    ) {
        self.use_fn(move |prev: Option<&Value>, next: &Value, key: &str| {
            if let Some(next) = next.downcast_ref::<T>() {
                middleware(prev.and_then(Value::downcast_ref::<T>), next, key);
            }
        });
    }

    /// Number of registered middlewares.
    pub fn middleware_count(&self) -> usize {
        lock(&self.inner.pipeline).len()
    }

    /// Run `f` inside a batch window and return its result.
    ///
    /// Writes inside the window update the table and run middleware
    /// immediately; listeners are notified once per touched key, in
    /// first-touched order, with the value current when the outermost
    /// window closes. Nested calls run inline and share the outer flush.
    /// The window closes even if `f` panics.
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        let _scope = self.batch_scope();
        f()
    }

    /// Open a batch window that lasts until the returned scope drops.
    pub fn batch_scope(&self) -> BatchScope {
        BatchScope::new(self.clone())
    }

    /// Whether a batch window is open.
    pub fn is_batching(&self) -> bool {
        lock(&self.inner.batch).is_active()
    }

    pub(crate) fn enter_batch(&self) {
        lock(&self.inner.batch).enter();
    }

    pub(crate) fn exit_batch(&self) {
        let touched = lock(&self.inner.batch).exit();
        if touched.is_empty() {
            return;
        }
        tracing::debug!(target: "statio", keys = touched.len(), "flushing batch");
        for key in &touched {
            if let Some(value) = self.get_value(key) {
                self.notify(key, &value);
            }
        }
    }
}

/// Non-owning handle to a [`Store`].
///
/// ```
/// use statio::Store;
///
/// let store = Store::new();
/// let weak = store.downgrade();
/// let _sub = store.subscribe::<i32>("a", move |a| {
///     if let Some(store) = weak.upgrade() {
///         store.set("double", a * 2);
///     }
/// });
///
/// store.set("a", 4);
/// assert_eq!(store.get_cloned::<i32>("double"), Some(8));
/// ```
#[derive(Clone)]
pub struct WeakStore {
    inner: Weak<StoreInner>,
}

impl WeakStore {
    /// The store, if it is still alive.
    pub fn upgrade(&self) -> Option<Store> {
        self.inner.upgrade().map(|inner| Store { inner })
    }
}

/// Handle to one listener registration.
///
/// Dropping it, or calling [`unsubscribe`](Self::unsubscribe), removes the
/// listener. [`detach`](Self::detach) keeps it for the store's lifetime.
#[must_use = "dropping a Subscription unsubscribes the listener immediately"]
pub struct Subscription {
    key: String,
    id: ListenerId,
    store: Option<Weak<StoreInner>>,
}

impl Subscription {
    /// The key this listener is registered on.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Remove the listener now.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    /// Keep the listener registered for as long as the store lives.
    pub fn detach(mut self) {
        self.store = None;
    }

    fn release(&mut self) {
        let Some(inner) = self.store.take().and_then(|weak| weak.upgrade()) else {
            return;
        };
        if lock(&inner.registry).unsubscribe(&self.key, self.id) {
            tracing::debug!(target: "statio", key = %self.key, id = self.id, "unsubscribed");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}
