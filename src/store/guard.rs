use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Run one observer callback, containing a panic so the observers after it
/// still run. Returns `false` if the callback panicked.
pub(crate) fn run_observer(kind: &'static str, key: &str, f: impl FnOnce()) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => true,
        Err(payload) => {
            tracing::error!(
                target: "statio",
                observer = kind,
                key,
                panic = panic_message(payload.as_ref()),
                "observer panicked"
            );
            false
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "<non-string panic payload>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_panics() {
        assert!(run_observer("listener", "k", || {}));
        assert!(!run_observer("listener", "k", || panic!("boom")));
        assert!(!run_observer("middleware", "k", || panic!("{}", String::from("owned"))));
    }

    #[test]
    fn extracts_message() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "<non-string panic payload>");
    }
}
