//! gymchat-axum: Axum adapter for GymChat.
//!
//! Mounts the chat credential, webhook and authorization callback
//! endpoints of a [`gymchat_auth::ChatAuthService`] on an axum router.

pub mod app;
pub mod routes;
pub mod state;
mod error;
pub use error::ChatAxumError;
pub use state::ChatAxumState;

pub use app::{axum, AxumApp};
