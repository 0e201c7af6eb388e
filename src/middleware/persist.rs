use super::codec::JsonCodec;
use super::pipeline::Middleware;
use super::storage::Storage;
use crate::error::PersistError;
use crate::store::{Store, Value};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::any::Any;
use std::sync::Arc;

pub const DEFAULT_KEY_PREFIX: &str = "statio:";

/// Options for [`Persist`].
///
/// Deserializable so it can live in an application's JSON config:
///
/// ```
/// use statio::middleware::PersistOptions;
///
/// let options: PersistOptions = serde_json::from_str(r#"{ "whitelist": ["theme"] }"#).unwrap();
/// assert_eq!(options.key_prefix, "statio:");
/// assert!(options.allows("theme"));
/// assert!(!options.allows("session"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PersistOptions {
    /// Prepended to every store key to form the storage key.
    pub key_prefix: String,
    /// When set, only these keys are persisted.
    pub whitelist: Option<Vec<String>>,
}

impl Default for PersistOptions {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_owned(),
            whitelist: None,
        }
    }
}

impl PersistOptions {
    /// Default prefix, no whitelist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the storage key prefix.
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Persist only the given keys.
    pub fn whitelist<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.whitelist = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    /// Whether `key` passes the whitelist.
    pub fn allows(&self, key: &str) -> bool {
        self.whitelist
            .as_ref()
            .map_or(true, |keys| keys.iter().any(|k| k == key))
    }

    /// The storage key `key` is persisted under.
    pub fn storage_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }
}

/// Middleware that writes every accepted value to a [`Storage`] as JSON.
///
/// Persistence is best effort: an unregistered type, a serde failure or a
/// storage error is logged as a warning and never reaches the writer.
pub struct Persist {
    storage: Arc<dyn Storage>,
    options: PersistOptions,
    codec: JsonCodec,
}

impl Persist {
    /// Persist every key into `storage` with default options.
    pub fn new(storage: Arc<dyn Storage>, codec: JsonCodec) -> Self {
        Self {
            storage,
            options: PersistOptions::default(),
            codec,
        }
    }

    /// Replace the options.
    pub fn with_options(mut self, options: PersistOptions) -> Self {
        self.options = options;
        self
    }

    /// The options in effect.
    pub fn options(&self) -> &PersistOptions {
        &self.options
    }

    /// The backend values are written to.
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    fn write(&self, next: &Value, key: &str) -> Result<(), PersistError> {
        let json = self.codec.encode_string(next)?;
        self.storage
            .set_item(&self.options.storage_key(key), &json)?;
        Ok(())
    }
}

impl Middleware for Persist {
    fn on_write(&self, _prev: Option<&Value>, next: &Value, key: &str) {
        if !self.options.allows(key) {
            return;
        }
        if let Err(err) = self.write(next, key) {
            tracing::warn!(target: "statio", key, error = %err, "persist failed");
        }
    }
}

/// Persist accepted writes into `storage`.
///
/// ```
/// use statio::middleware::{persist, JsonCodec, MemoryStorage, PersistOptions, Storage};
/// use statio::Store;
/// use std::sync::Arc;
///
/// let storage = Arc::new(MemoryStorage::new());
/// let store = Store::new();
/// store.use_middleware(persist(storage.clone(), PersistOptions::new(), JsonCodec::standard()));
///
/// store.set("count", 3);
/// assert_eq!(storage.get_item("statio:count").unwrap().as_deref(), Some("3"));
/// ```
pub fn persist(storage: Arc<dyn Storage>, options: PersistOptions, codec: JsonCodec) -> Persist {
    Persist::new(storage, codec).with_options(options)
}

/// Load a persisted value back into `store`.
///
/// Returns `Ok(false)` if nothing was stored under the key (or the key is
/// not whitelisted).
///
/// # Errors
///
/// Storage failures and JSON that does not decode into `T`.
pub fn restore<T>(
    store: &Store,
    storage: &dyn Storage,
    options: &PersistOptions,
    key: &str,
) -> Result<bool, PersistError>
where
    T: DeserializeOwned + Any + Send + Sync + PartialEq,
{
    if !options.allows(key) {
        return Ok(false);
    }
    let Some(raw) = storage.get_item(&options.storage_key(key))? else {
        return Ok(false);
    };
    let value: T = serde_json::from_str(&raw)?;
    store.set(key, value);
    tracing::debug!(target: "statio", key, "restored persisted value");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::middleware::MemoryStorage;
    use serde::Serialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Settings {
        theme: String,
        font_size: u8,
    }

    struct BrokenStorage;

    impl Storage for BrokenStorage {
        fn get_item(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Ok(None)
        }
        fn set_item(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Backend("quota exceeded".into()))
        }
        fn remove_item(&self, _key: &str) -> Result<(), StorageError> {
            Ok(())
        }
    }

    #[test]
    fn writes_under_prefix() {
        let storage = Arc::new(MemoryStorage::new());
        let store = Store::new();
        store.use_middleware(Persist::new(storage.clone(), JsonCodec::standard()));

        store.set("count", 3);
        assert_eq!(storage.get_item("statio:count").unwrap().as_deref(), Some("3"));
    }

    #[test]
    fn honours_whitelist_and_prefix() {
        let storage = Arc::new(MemoryStorage::new());
        let store = Store::new();
        store.use_middleware(
            Persist::new(storage.clone(), JsonCodec::standard())
                .with_options(PersistOptions::new().key_prefix("app/").whitelist(["theme"])),
        );

        store.set("theme", String::from("dark"));
        store.set("session", String::from("secret"));

        assert_eq!(storage.get_item("app/theme").unwrap().as_deref(), Some("\"dark\""));
        assert_eq!(storage.get_item("app/session").unwrap(), None);
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn persist_writes_through_given_storage() {
        let storage = Arc::new(MemoryStorage::new());
        let middleware = persist(
            storage.clone(),
            PersistOptions::new().whitelist(["theme"]),
            JsonCodec::standard(),
        );
        middleware.storage().set_item("statio:theme", "\"light\"").unwrap();
        assert_eq!(storage.get_item("statio:theme").unwrap().as_deref(), Some("\"light\""));

        let store = Store::new();
        store.use_middleware(middleware);
        store.set("theme", String::from("dark"));
        store.set("count", 2);

        assert_eq!(storage.get_item("statio:theme").unwrap().as_deref(), Some("\"dark\""));
        assert_eq!(storage.get_item("statio:count").unwrap(), None);

        let restored = Store::new();
        let options = PersistOptions::new().whitelist(["theme"]);
        assert!(restore::<String>(&restored, storage.as_ref(), &options, "theme").unwrap());
        assert_eq!(restored.get_cloned::<String>("theme"), Some("dark".to_string()));
    }

    #[test]
    fn failures_do_not_break_the_write() {
        let store = Store::new();
        store.use_middleware(Persist::new(Arc::new(BrokenStorage), JsonCodec::standard()));
        store.use_middleware(persist(
            Arc::new(MemoryStorage::new()),
            PersistOptions::new(),
            JsonCodec::new(),
        ));

        store.set("count", 1);
        store.set("blob", vec![1_u8, 2, 3]);
        assert_eq!(store.get_cloned::<i32>("count"), Some(1));
        assert_eq!(store.get_cloned::<Vec<u8>>("blob"), Some(vec![1, 2, 3]));
    }

    #[test]
    fn restore_reads_back() {
        let storage = Arc::new(MemoryStorage::new());
        let options = PersistOptions::default();
        let codec = JsonCodec::new().with::<Settings>();

        let first = Store::new();
        first.use_middleware(Persist::new(storage.clone(), codec));
        let settings = Settings {
            theme: "light".into(),
            font_size: 14,
        };
        first.set("settings", settings.clone());

        let second = Store::new();
        assert!(restore::<Settings>(&second, storage.as_ref(), &options, "settings").unwrap());
        assert_eq!(second.get_cloned::<Settings>("settings"), Some(settings));
        assert!(!restore::<Settings>(&second, storage.as_ref(), &options, "missing").unwrap());
    }

    #[test]
    fn restore_rejects_bad_json() {
        let storage = MemoryStorage::new();
        storage.set_item("statio:n", "\"text\"").unwrap();
        let err = restore::<i32>(&Store::new(), &storage, &PersistOptions::default(), "n").unwrap_err();
        assert!(matches!(err, PersistError::Serialize(_)));
    }
}
