use crate::error::PersistError;
use crate::store::Value;
use serde::Serialize;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

type Encoder = Arc<dyn Fn(&Value) -> Option<serde_json::Result<serde_json::Value>> + Send + Sync>;

/// Turns type-erased store values into JSON.
///
/// The store keeps values as `dyn Any`, so every payload type that should be
/// persisted, logged as JSON or sent to an inspector has to be registered
/// with [`with`](Self::with).
///
/// ```
/// use statio::middleware::JsonCodec;
/// use statio::Value;
///
/// let codec = JsonCodec::new().with::<u32>().with::<String>();
/// assert_eq!(codec.encode(&Value::new(7_u32)).unwrap(), serde_json::json!(7));
/// assert!(codec.encode(&Value::new(1.5_f32)).is_err());
/// ```
#[derive(Clone, Default)]
pub struct JsonCodec {
    encoders: HashMap<TypeId, Encoder>,
}

impl JsonCodec {
    /// An empty codec.
    pub fn new() -> Self {
        Self::default()
    }

    /// A codec for the primitive numbers, `bool` and strings.
    pub fn standard() -> Self {
        Self::new()
            .with::<bool>()
            .with::<i8>()
            .with::<i16>()
            .with::<i32>()
            .with::<i64>()
            .with::<isize>()
            .with::<u8>()
            .with::<u16>()
            .with::<u32>()
            .with::<u64>()
            .with::<usize>()
            .with::<f32>()
            .with::<f64>()
            .with::<char>()
            .with::<String>()
            .with::<&'static str>()
    }

    /// Register `T` as encodable.
    pub fn with<T: Serialize + Any + Send + Sync>(mut self) -> Self {
        let encoder: Encoder = Arc::new(|value: &Value| {
            value.downcast_ref::<T>().map(serde_json::to_value)
        });
        self.encoders.insert(TypeId::of::<T>(), encoder);
        self
    }

    /// Whether the payload's type is registered.
    pub fn supports(&self, value: &Value) -> bool {
        self.encoders.contains_key(&value.payload_type_id())
    }

    /// Encode a value.
    ///
    /// # Errors
    ///
    /// [`PersistError::Unregistered`] if the payload type was never
    /// registered, [`PersistError::Serialize`] if serde rejects it.
    pub fn encode(&self, value: &Value) -> Result<serde_json::Value, PersistError> {
        let unregistered = || PersistError::Unregistered {
            type_name: value.type_name(),
        };
        let encoder = self
            .encoders
            .get(&value.payload_type_id())
            .ok_or_else(unregistered)?;
        Ok(encoder(value).ok_or_else(unregistered)??)
    }

    /// Encode to a compact JSON string.
    pub fn encode_string(&self, value: &Value) -> Result<String, PersistError> {
        Ok(serde_json::to_string(&self.encode(value)?)?)
    }

    /// Human readable form for logs: JSON when the type is registered,
    /// otherwise the type name.
    pub(crate) fn describe(&self, value: &Value) -> String {
        match self.encode_string(value) {
            Ok(json) => json,
            Err(_) => format!("<{}>", value.type_name()),
        }
    }
}

impl std::fmt::Debug for JsonCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonCodec")
            .field("types", &self.encoders.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[test]
    fn encodes_registered_types() {
        let codec = JsonCodec::standard().with::<Point>();
        assert_eq!(
            codec.encode(&Value::new(Point { x: 1, y: 2 })).unwrap(),
            serde_json::json!({ "x": 1, "y": 2 })
        );
        assert_eq!(
            codec.encode_string(&Value::new(String::from("hi"))).unwrap(),
            "\"hi\""
        );
    }

    #[test]
    fn standard_covers_small_numbers() {
        let codec = JsonCodec::standard();
        assert_eq!(codec.encode_string(&Value::new(200_u8)).unwrap(), "200");
        assert_eq!(codec.encode_string(&Value::new(-3_i16)).unwrap(), "-3");
        assert_eq!(codec.encode_string(&Value::new(1.5_f32)).unwrap(), "1.5");
        assert_eq!(codec.encode_string(&Value::new('x')).unwrap(), "\"x\"");
        assert!(!codec.supports(&Value::new(vec![1_u8])));
    }

    #[test]
    fn unregistered_type_is_an_error() {
        let codec = JsonCodec::new();
        let err = codec.encode(&Value::new(Point { x: 0, y: 0 })).unwrap_err();
        assert!(matches!(err, PersistError::Unregistered { .. }));
        assert!(err.to_string().contains("Point"));
    }

    #[test]
    fn describe_falls_back_to_type_name() {
        let codec = JsonCodec::new().with::<i32>();
        assert_eq!(codec.describe(&Value::new(5)), "5");
        assert_eq!(codec.describe(&Value::new(5_u8)), "<u8>");
    }
}
