//! # modhub-database
//!
//! PostgreSQL connection management and the SQL-backed implementations of
//! the module record store and the system settings store.

pub mod connection;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
pub use repositories::module::PgModuleStore;
pub use repositories::setting::PgSettingsStore;
