use super::store::Store;
use indexmap::IndexSet;

/// Batch window state for one store.
///
/// `depth` counts open windows; only the outermost one collects and hands
/// back the touched keys.
#[derive(Default)]
pub(crate) struct BatchController {
    depth: usize,
    touched: IndexSet<String>,
}

impl BatchController {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_active(&self) -> bool {
        self.depth > 0
    }

    /// Open a window. Returns `true` if this is the outermost one.
    pub(crate) fn enter(&mut self) -> bool {
        self.depth += 1;
        self.depth == 1
    }

    /// Record a key written during the window. Repeats keep their first position.
    pub(crate) fn record_touched(&mut self, key: &str) {
        if !self.touched.contains(key) {
            self.touched.insert(key.to_owned());
        }
    }

    /// Close a window. The outermost exit drains the touched keys in
    /// first-touched order; inner exits return nothing.
    pub(crate) fn exit(&mut self) -> Vec<String> {
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            self.touched.drain(..).collect()
        } else {
            Vec::new()
        }
    }
}

/// RAII guard for a batch window.
///
/// While any scope is alive, writes to the store still update the table and
/// run middleware, but listener delivery is deferred. When the outermost
/// scope drops (including during a panic unwind) the window closes and
/// every touched key is delivered once with its current value.
///
/// # Examples
///
/// ```
/// use statio::Store;
/// use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
///
/// let store = Store::new();
/// let calls = Arc::new(AtomicUsize::new(0));
/// let _sub = store.subscribe::<i32>("x", {
///     let calls = Arc::clone(&calls);
///     move |_| { calls.fetch_add(1, Ordering::SeqCst); }
/// });
///
/// {
///     let _scope = store.batch_scope();
///     store.set("x", 1);
///     store.set("x", 2);
///     assert_eq!(calls.load(Ordering::SeqCst), 0);
/// }
/// assert_eq!(calls.load(Ordering::SeqCst), 1);
/// ```
#[must_use = "the batch window closes as soon as the scope is dropped"]
pub struct BatchScope {
    store: Store,
}

impl BatchScope {
    pub(crate) fn new(store: Store) -> Self {
        store.enter_batch();
        Self { store }
    }
}

impl Drop for BatchScope {
    fn drop(&mut self) {
        self.store.exit_batch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_windows_fold_into_outer() {
        let mut batch = BatchController::new();
        assert!(batch.enter());
        batch.record_touched("x");
        assert!(!batch.enter());
        batch.record_touched("y");
        assert!(batch.exit().is_empty());
        assert!(batch.is_active());
        assert_eq!(batch.exit(), vec!["x", "y"]);
        assert!(!batch.is_active());
    }

    #[test]
    fn touched_keys_keep_first_order() {
        let mut batch = BatchController::new();
        batch.enter();
        for key in ["b", "a", "b", "c", "a"] {
            batch.record_touched(key);
        }
        assert_eq!(batch.exit(), vec!["b", "a", "c"]);

        batch.enter();
        assert!(batch.exit().is_empty());
    }
}
