use super::pipeline::Middleware;
use crate::store::Value;
use std::any::{self, Any};
use std::marker::PhantomData;

/// Middleware that warns when a key receives a value failing a predicate.
///
/// Validation is advisory: the value is stored either way.
pub struct Validate<T, F> {
    key: String,
    validator: F,
    _marker: PhantomData<fn(&T)>,
}

/// Check every write to `key` with `validator`.
pub fn validate<T, F>(key: impl Into<String>, validator: F) -> Validate<T, F>
where
    T: Any,
    F: Fn(&T) -> bool + Send + Sync,
{
    Validate {
        key: key.into(),
        validator,
        _marker: PhantomData,
    }
}

impl<T, F> Validate<T, F>
where
    T: Any,
    F: Fn(&T) -> bool + Send + Sync,
{
    /// `true` if the value passes, or belongs to another key.
    fn check(&self, next: &Value, key: &str) -> bool {
        if key != self.key {
            return true;
        }
        match next.downcast_ref::<T>() {
            Some(next) if (self.validator)(next) => true,
            Some(_) => {
                tracing::warn!(target: "statio", key, "invalid value for key \"{key}\"");
                false
            }
            None => {
                tracing::warn!(
                    target: "statio",
                    key,
                    expected = any::type_name::<T>(),
                    found = next.type_name(),
                    "invalid value for key \"{key}\": unexpected type"
                );
                false
            }
        }
    }
}

impl<T, F> Middleware for Validate<T, F>
where
    T: Any,
    F: Fn(&T) -> bool + Send + Sync,
{
    fn on_write(&self, _prev: Option<&Value>, next: &Value, key: &str) {
        self.check(next, key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Store;

    #[test]
    fn flags_failing_values() {
        let check = validate::<i32, _>("age", |age| (0..150).contains(age));
        assert!(check.check(&Value::new(30), "age"));
        assert!(!check.check(&Value::new(-1), "age"));
        assert!(!check.check(&Value::new("thirty"), "age"));
        assert!(check.check(&Value::new(-1), "other"));
    }

    #[test]
    fn invalid_values_are_still_stored() {
        let store = Store::new();
        store.use_middleware(validate::<i32, _>("age", |age| *age >= 0));
        store.set("age", -5);
        assert_eq!(store.get_cloned::<i32>("age"), Some(-5));
    }
}
