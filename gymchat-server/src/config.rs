use anyhow::Result;
use gymchat_core::{ConfigSnapshot, ConfigStore};

/// Environment prefix: `GYMCHAT__PROVIDER__API_KEY` -> `provider.api_key`.
pub const ENV_PREFIX: &str = "GYMCHAT__";

/// Configure every setting from defaults and the environment.
pub fn config() -> Result<ConfigSnapshot> {
    let mut store = ConfigStore::new();
    configure_defaults(&mut store);
    store.load_env(ENV_PREFIX);
    Ok(store.snapshot())
}

/// Defaults the environment may override.
pub fn configure_defaults(store: &mut ConfigStore) {
    // HTTP Server Configuration
    store.set_default("http.host", "127.0.0.1");
    store.set_default("http.port", "3000");

    // Chat credentials
    store.set_default("auth.ttl", "1h");
    store.set_default("auth.subject_prefix", "user_");
}
