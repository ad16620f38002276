//! Configuration management for kvgate server
//!
//! Loaded once at startup from TOML; there is no hot reload.

mod defaults;
mod loader;
mod schema;

pub use defaults::DEFAULT_CONFIG_TOML;
pub use loader::ConfigLoader;
pub use schema::*;
