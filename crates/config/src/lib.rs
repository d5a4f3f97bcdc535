//! SDK configuration loading.
//!
//! Config files: `pushmill.toml` or `pushmill.json`, searched in `./` then
//! the platform config directory.

pub mod loader;
pub mod schema;

pub use {
    loader::{config_dir, discover_and_load, load_config},
    schema::{ApiConfig, EnrichConfig, PushmillConfig, StorageConfig},
};
