use crate::store::guard::run_observer;
use crate::store::Value;
use std::sync::Arc;

/// Observer of every accepted write.
///
/// Middlewares see the previous value (absent on the first write to a key),
/// the new value and the key. They run synchronously, before listeners are
/// notified or the write is deferred into a batch, and cannot change or
/// cancel the write.
///
/// Any `Fn(Option<&Value>, &Value, &str)` closure is a middleware.
pub trait Middleware: Send + Sync {
    fn on_write(&self, prev: Option<&Value>, next: &Value, key: &str);
}

impl<F> Middleware for F
where
    F: Fn(Option<&Value>, &Value, &str) + Send + Sync,
{
    fn on_write(&self, prev: Option<&Value>, next: &Value, key: &str) {
        self(prev, next, key)
    }
}

/// Ordered middleware registrations.
#[derive(Default)]
pub(crate) struct MiddlewarePipeline {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewarePipeline {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append a middleware unless the same object is already registered.
    pub(crate) fn register(&mut self, middleware: Arc<dyn Middleware>) -> bool {
        let already = self
            .middlewares
            .iter()
            .any(|existing| std::ptr::addr_eq(Arc::as_ptr(existing), Arc::as_ptr(&middleware)));
        if already {
            return false;
        }
        self.middlewares.push(middleware);
        true
    }

    pub(crate) fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<dyn Middleware>> {
        self.middlewares.clone()
    }
}

/// Run every middleware in registration order. A panicking middleware is
/// logged and the rest still run.
pub(crate) fn run_all(
    middlewares: &[Arc<dyn Middleware>],
    prev: Option<&Value>,
    next: &Value,
    key: &str,
) {
    for middleware in middlewares {
        run_observer("middleware", key, || middleware.on_write(prev, next, key));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn runs_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = MiddlewarePipeline::new();
        for tag in ["first", "second"] {
            let log = Arc::clone(&log);
            pipeline.register(Arc::new(move |prev: Option<&Value>, _: &Value, key: &str| {
                log.lock().unwrap().push(format!("{tag}:{key}:{}", prev.is_some()));
            }));
        }

        run_all(&pipeline.snapshot(), None, &Value::new(1), "count");
        assert_eq!(*log.lock().unwrap(), vec!["first:count:false", "second:count:false"]);
    }

    #[test]
    fn same_object_is_registered_once() {
        let mut pipeline = MiddlewarePipeline::new();
        let shared: Arc<dyn Middleware> = Arc::new(|_: Option<&Value>, _: &Value, _: &str| {});
        assert!(pipeline.register(Arc::clone(&shared)));
        assert!(!pipeline.register(shared));
        assert!(pipeline.register(Arc::new(|_: Option<&Value>, _: &Value, _: &str| {})));
        assert_eq!(pipeline.len(), 2);
    }

    #[test]
    fn panicking_middleware_does_not_block_others() {
        let seen = Arc::new(Mutex::new(0));
        let mut pipeline = MiddlewarePipeline::new();
        pipeline.register(Arc::new(|_: Option<&Value>, _: &Value, _: &str| panic!("bad middleware")));
        pipeline.register(Arc::new({
            let seen = Arc::clone(&seen);
            move |_: Option<&Value>, _: &Value, _: &str| *seen.lock().unwrap() += 1
        }));

        run_all(&pipeline.snapshot(), None, &Value::new(()), "k");
        assert_eq!(*seen.lock().unwrap(), 1);
    }
}
