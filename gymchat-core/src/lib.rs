//! gymchat-core: framework-agnostic core for GymChat.
//!
//! Holds the pieces every other crate agrees on: tenant and user
//! identifiers, the structured error carried to the HTTP edge, and the
//! key/value configuration store.

pub mod config;
pub mod errors;
pub mod tenant;

pub use config::{ConfigSnapshot, ConfigStore};
pub use errors::{ChatError, ErrorKind};
pub use tenant::{GymContext, GymId, UserId};
