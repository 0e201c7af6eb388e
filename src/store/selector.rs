use super::store::{Store, Subscription};
use std::any::Any;
use std::sync::{Mutex, PoisonError};

impl Store {
    /// Subscribe to a projection of the value under `key`.
    ///
    /// `selector` runs on every delivered value; `listener` only fires when
    /// the projection differs from the last one seen. The first projection
    /// is taken from the current value at subscribe time, if any.
    ///
    /// # Examples
    ///
    /// ```
    /// use statio::Store;
    /// use std::sync::{Arc, Mutex};
    ///
    /// #[derive(Clone, PartialEq)]
    /// struct User { name: String, visits: u32 }
    ///
    /// let store = Store::new();
    /// store.set("user", User { name: "ada".into(), visits: 0 });
    ///
    /// let names = Arc::new(Mutex::new(Vec::new()));
    /// let _sub = store.select::<User, String>("user", |u| u.name.clone(), {
    ///     let names = Arc::clone(&names);
    ///     move |name| names.lock().unwrap().push(name.clone())
    /// });
    ///
    /// store.update::<User>("user", |u| u.visits += 1).unwrap();
    /// store.update::<User>("user", |u| u.name = "grace".into()).unwrap();
    /// assert_eq!(*names.lock().unwrap(), vec!["grace".to_string()]);
    /// ```
    pub fn select<T, R>(
        &self,
        key: &str,
        selector: impl Fn(&T) -> R + Send + Sync + 'static,
        listener: impl Fn(&R) + Send + Sync + 'static,
    ) -> Subscription
    where
        T: Any + Send + Sync,
        R: Clone + PartialEq + Send + 'static,
    {
        let initial = self.get::<T>(key).map(|value| selector(&*value));
        let last = Mutex::new(initial);

        self.subscribe::<T>(key, move |value| {
            let next = selector(value);
            {
                let mut last = last.lock().unwrap_or_else(PoisonError::into_inner);
                if last.as_ref() == Some(&next) {
                    return;
                }
                *last = Some(next.clone());
            }
            listener(&next);
        })
    }
}
