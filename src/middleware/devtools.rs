use super::codec::JsonCodec;
use super::pipeline::Middleware;
use crate::store::Value;

/// An open connection to an external state inspector.
pub trait InspectorConnection: Send + Sync {
    /// Report one change: a human readable action label and the changed
    /// slice of state.
    fn send(&self, action: &str, state: serde_json::Value);
}

/// Something that can open an [`InspectorConnection`], such as a browser
/// extension bridge or a debugging socket.
pub trait InspectorProvider {
    /// Returns `None` if the inspector refuses or is unavailable.
    fn connect(&self, name: &str) -> Option<Box<dyn InspectorConnection>>;
}

/// Middleware that forwards writes to an inspector.
///
/// Without a connection it does nothing, so it can stay registered in
/// builds where no inspector exists.
pub struct DevTools {
    connection: Option<Box<dyn InspectorConnection>>,
    codec: JsonCodec,
}

pub const DEFAULT_INSPECTOR_NAME: &str = "Statio";

/// Connect to `provider` (if any) under `name`.
pub fn devtools(name: &str, provider: Option<&dyn InspectorProvider>, codec: JsonCodec) -> DevTools {
    let connection = provider.and_then(|provider| provider.connect(name));
    if connection.is_none() {
        tracing::debug!(target: "statio", name, "no inspector connected");
    }
    DevTools { connection, codec }
}

impl DevTools {
    /// Whether an inspector accepted the connection.
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }
}

impl Middleware for DevTools {
    fn on_write(&self, _prev: Option<&Value>, next: &Value, key: &str) {
        let Some(connection) = &self.connection else {
            return;
        };
        let json = match self.codec.encode(next) {
            Ok(json) => json,
            Err(err) => {
                tracing::warn!(target: "statio", key, error = %err, "inspector update skipped");
                return;
            }
        };
        let action = format!("{key} -> {json}");
        let mut state = serde_json::Map::new();
        state.insert(key.to_owned(), json);
        connection.send(&action, serde_json::Value::Object(state));
    }
}
