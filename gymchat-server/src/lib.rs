mod config;

use std::sync::Arc;

use anyhow::Result;
use gymchat_auth::{ChatAuthOptions, ChatAuthService, InMemoryMembershipStore, LoggingHandler};
use gymchat_axum::AxumApp;
use gymchat_core::ConfigSnapshot;

pub use config::{config, configure_defaults, ENV_PREFIX};

pub struct GymChatApp {
    pub ax: AxumApp,
    pub config: ConfigSnapshot,
}

impl GymChatApp {
    pub fn addr(&self) -> String {
        let host = self
            .config
            .get_non_empty("http.host")
            .unwrap_or_else(|| "127.0.0.1".to_string());
        let port = self
            .config
            .get_non_empty("http.port")
            .unwrap_or_else(|| "3000".to_string());
        format!("{host}:{port}")
    }
}

pub fn build() -> Result<GymChatApp> {
    build_with(config()?)
}

/// Wire the service from a configuration snapshot.
pub fn build_with(config: ConfigSnapshot) -> Result<GymChatApp> {
    let options = ChatAuthOptions::from_snapshot(&config).map_err(|e| e.into_anyhow())?;

    let store = match config.get_non_empty("memberships.file") {
        Some(path) => {
            let store = InMemoryMembershipStore::from_json_file(&path)?;
            tracing::info!(path = %path, rows = store.len(), "memberships loaded");
            store
        }
        None => {
            tracing::warn!("memberships.file is not set; every membership check will fail");
            InMemoryMembershipStore::new()
        }
    };

    let service = ChatAuthService::from_options(options, Arc::new(store), Arc::new(LoggingHandler))
        .map_err(|e| e.into_anyhow())?;

    let ax = gymchat_axum::axum(service).use_get("/health", || async { "ok" });

    Ok(GymChatApp { ax, config })
}
