//! Demonstration of the bundled middlewares
//!
//! Run with `RUST_LOG=statio=info` to see logger and validation output.

use serde::{Deserialize, Serialize};
use statio::middleware::{
    effect_on, logger_with, restore, validate, FileStorage, JsonCodec, Persist, PersistOptions,
};
use statio::Store;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct Settings {
    theme: String,
    font_size: u8,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("statio=info")),
        )
        .init();

    let path = std::env::temp_dir().join("statio-demo").join("state.json");
    let storage = Arc::new(FileStorage::open(&path)?);
    let codec = JsonCodec::standard().with::<Settings>();
    let options = PersistOptions::new().whitelist(["settings"]);

    let store = Store::new();
    if restore::<Settings>(&store, storage.as_ref(), &options, "settings")? {
        println!("Restored settings from {}", path.display());
    }

    store.use_middleware(logger_with(codec.clone()));
    store.use_middleware(validate::<Settings, _>("settings", |s| (8..=32).contains(&s.font_size)));
    store.use_middleware(effect_on::<Settings, _>("settings", |s| {
        println!("Applying theme {}", s.theme);
    }));
    store.use_middleware(Persist::new(storage.clone(), codec).with_options(options));

    if !store.contains("settings") {
        store.set(
            "settings",
            Settings {
                theme: "light".into(),
                font_size: 14,
            },
        );
    }

    store.update::<Settings>("settings", |s| {
        s.theme = if s.theme == "light" { "dark".into() } else { "light".into() };
    })?;
    store.update::<Settings>("settings", |s| s.font_size = 64)?;
    store.set("session", String::from("not persisted"));

    println!("Persisted to {}", path.display());
    Ok(())
}
