pub mod config;
pub mod store;

pub use config::{Config, ConfigError};
pub use store::{Store, StoreError, StoreTable, SyncStore};
