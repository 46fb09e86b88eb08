//! Persistence traits for module records and system settings.
//!
//! Implementations only promise single-record atomicity. A
//! read-mutate-write sequence spanning several calls is not atomic across
//! concurrent requests.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::module::{Module, ModuleFilter};

/// Persisted module record store.
#[async_trait]
pub trait ModuleStore: Send + Sync + std::fmt::Debug + 'static {
    /// Find a record by slug.
    async fn find(&self, slug: &str) -> AppResult<Option<Module>>;

    /// Insert or update a record keyed by slug. Returns the stored record.
    async fn save(&self, module: &Module) -> AppResult<Module>;

    /// Delete a record by slug. Returns `true` if a record was removed.
    async fn delete(&self, slug: &str) -> AppResult<bool>;

    /// List records matching the filter in iteration (insertion) order.
    async fn list(&self, filter: &ModuleFilter) -> AppResult<Vec<Module>>;

    /// Set `enabled = false` on every record except `slug`. Returns the count changed.
    async fn disable_all_except(&self, slug: &str) -> AppResult<u64>;
}

/// Persisted named system settings (maintenance flag, debug flag, ...).
#[async_trait]
pub trait SettingsStore: Send + Sync + std::fmt::Debug + 'static {
    /// Get a setting value.
    async fn get(&self, name: &str) -> AppResult<Option<String>>;

    /// Set a setting value. `None` deletes the setting.
    async fn set(&self, name: &str, value: Option<&str>) -> AppResult<()>;

    /// Get a setting, creating it with `default` when absent.
    async fn get_or_init(&self, name: &str, default: &str) -> AppResult<String> {
        match self.get(name).await? {
            Some(value) => Ok(value),
            None => {
                self.set(name, Some(default)).await?;
                Ok(default.to_string())
            }
        }
    }

    /// Read a `"1"`/`"0"` flag, defaulting to off.
    async fn flag(&self, name: &str) -> AppResult<bool> {
        Ok(self.get_or_init(name, "0").await? == "1")
    }
}
