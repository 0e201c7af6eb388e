use super::codec::JsonCodec;
use super::pipeline::Middleware;
use crate::store::Value;

/// Middleware that logs every write as `key: prev -> next` at `info` level
/// under the `statio` target.
#[derive(Debug, Default)]
pub struct Logger {
    codec: JsonCodec,
}

/// Log writes, rendering values as their type names.
pub fn logger() -> Logger {
    Logger::default()
}

/// Log writes, rendering values the codec knows as JSON.
pub fn logger_with(codec: JsonCodec) -> Logger {
    Logger { codec }
}

impl Logger {
    fn line(&self, prev: Option<&Value>, next: &Value, key: &str) -> String {
        let prev = prev.map_or_else(|| "<absent>".to_owned(), |prev| self.codec.describe(prev));
        format!("{key}: {prev} -> {}", self.codec.describe(next))
    }
}

impl Middleware for Logger {
    fn on_write(&self, prev: Option<&Value>, next: &Value, key: &str) {
        tracing::info!(target: "statio", key, "{}", self.line(prev, next, key));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_change() {
        let logger = logger_with(JsonCodec::standard());
        assert_eq!(
            logger.line(Some(&Value::new(1)), &Value::new(2), "count"),
            "count: 1 -> 2"
        );
        assert_eq!(
            logger.line(None, &Value::new(String::from("dark")), "theme"),
            "theme: <absent> -> \"dark\""
        );
    }

    #[test]
    fn unknown_types_show_type_name() {
        assert_eq!(
            logger().line(None, &Value::new(vec![1_u8]), "bytes"),
            "bytes: <absent> -> <alloc::vec::Vec<u8>>"
        );
    }
}
