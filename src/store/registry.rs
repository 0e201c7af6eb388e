use super::guard::run_observer;
use super::table::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub(crate) type Listener = Arc<dyn Fn(&Value) + Send + Sync>;

/// Unique identity of one subscription within a store.
pub(crate) type ListenerId = u64;

/// Per-key listener lists, kept in subscription order.
///
/// A key is present only while it has at least one listener.
#[derive(Default)]
pub(crate) struct SubscriberRegistry {
    next_id: ListenerId,
    listeners: HashMap<String, Vec<(ListenerId, Listener)>>,
}

impl SubscriberRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn subscribe(&mut self, key: &str, listener: Listener) -> ListenerId {
        let id = self.next_id;
        self.next_id += 1;
        self.listeners
            .entry(key.to_owned())
            .or_default()
            .push((id, listener));
        id
    }

    /// Remove exactly one listener. Drops the key's entry once it is empty.
    pub(crate) fn unsubscribe(&mut self, key: &str, id: ListenerId) -> bool {
        let Some(entries) = self.listeners.get_mut(key) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(existing, _)| *existing != id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            self.listeners.remove(key);
        }
        removed
    }

    /// Copy of the key's listeners, so they can be invoked without holding
    /// the registry (listeners may subscribe, unsubscribe or write).
    pub(crate) fn snapshot(&self, key: &str) -> Vec<Listener> {
        self.listeners
            .get(key)
            .map(|entries| entries.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default()
    }

    pub(crate) fn count(&self, key: &str) -> usize {
        self.listeners.get(key).map_or(0, Vec::len)
    }

    pub(crate) fn contains_key(&self, key: &str) -> bool {
        self.listeners.contains_key(key)
    }
}

/// Invoke a snapshot of listeners in order. A panicking listener is logged
/// and skipped.
pub(crate) fn notify(key: &str, value: &Value, listeners: &[Listener]) {
    for listener in listeners {
        run_observer("listener", key, || listener(value));
    }
}
