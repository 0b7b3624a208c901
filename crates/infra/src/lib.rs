//! Infrastructure layer: entity storage, command handlers, configuration.

pub mod config;
pub mod service;
pub mod store;

pub use config::{Config, ConfigError};
pub use service::{JobService, ServiceError, ServiceResult, ServiceSettings};
pub use store::{EntityStore, InMemoryEntityStore, SqliteEntityStore, StoreError, StoreTransaction};
