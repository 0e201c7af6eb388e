use super::pipeline::Middleware;
use crate::store::Value;
use std::any::Any;
use std::marker::PhantomData;

/// Middleware that runs a side effect when one key changes.
///
/// Unlike a listener it runs synchronously on every accepted write, batch
/// or not. Writes of another type than `T` are ignored.
pub struct EffectOn<T, F> {
    key: String,
    effect: F,
    _marker: PhantomData<fn(&T)>,
}

/// Run `effect` with the new value whenever `key` changes.
///
/// ```
/// use statio::Store;
/// use statio::middleware::effect_on;
/// use std::sync::{Arc, Mutex};
///
/// let store = Store::new();
/// let saved = Arc::new(Mutex::new(None));
/// store.use_middleware(effect_on::<String, _>("draft", {
///     let saved = Arc::clone(&saved);
///     move |text| *saved.lock().unwrap() = Some(text.clone())
/// }));
///
/// store.set("draft", String::from("hello"));
/// assert_eq!(saved.lock().unwrap().as_deref(), Some("hello"));
/// ```
pub fn effect_on<T, F>(key: impl Into<String>, effect: F) -> EffectOn<T, F>
where
    T: Any,
    F: Fn(&T) + Send + Sync,
{
    EffectOn {
        key: key.into(),
        effect,
        _marker: PhantomData,
    }
}

impl<T, F> Middleware for EffectOn<T, F>
where
    T: Any,
    F: Fn(&T) + Send + Sync,
{
    fn on_write(&self, prev: Option<&Value>, next: &Value, key: &str) {
        if key != self.key || prev.is_some_and(|prev| prev.ptr_eq(next)) {
            return;
        }
        if let Some(next) = next.downcast_ref::<T>() {
            (self.effect)(next);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Store;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Arc;

    #[test]
    fn fires_only_for_its_key() {
        let store = Store::new();
        let last = Arc::new(AtomicI32::new(0));
        store.use_middleware(effect_on::<i32, _>("count", {
            let last = Arc::clone(&last);
            move |n| last.store(*n, Ordering::SeqCst)
        }));

        store.set("other", 99);
        assert_eq!(last.load(Ordering::SeqCst), 0);

        store.set("count", 5);
        assert_eq!(last.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn fires_inside_batch() {
        let store = Store::new();
        let hits = Arc::new(AtomicI32::new(0));
        store.use_middleware(effect_on::<i32, _>("count", {
            let hits = Arc::clone(&hits);
            move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            }
        }));

        store.batch(|| {
            store.set("count", 1);
            store.set("count", 2);
            assert_eq!(hits.load(Ordering::SeqCst), 2);
        });
    }
}
