//! In-memory system settings store using `dashmap`.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use modhub_core::result::AppResult;
use modhub_core::traits::store::SettingsStore;

/// Settings held in a concurrent map.
#[derive(Debug, Clone, Default)]
pub struct MemorySettingsStore {
    values: Arc<DashMap<String, String>>,
}

impl MemorySettingsStore {
    /// Creates an empty settings store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with the given settings.
    pub fn with_values<'a>(values: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let store = Self::new();
        for (name, value) in values {
            store.values.insert(name.to_string(), value.to_string());
        }
        store
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn get(&self, name: &str) -> AppResult<Option<String>> {
        Ok(self.values.get(name).map(|v| v.value().clone()))
    }

    async fn set(&self, name: &str, value: Option<&str>) -> AppResult<()> {
        match value {
            Some(value) => {
                self.values.insert(name.to_string(), value.to_string());
            }
            None => {
                self.values.remove(name);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_or_init_creates_default() {
        let store = MemorySettingsStore::new();
        assert_eq!(store.get_or_init("maintenance_mode", "0").await.unwrap(), "0");
        assert_eq!(store.get("maintenance_mode").await.unwrap().as_deref(), Some("0"));
    }

    #[tokio::test]
    async fn test_flag() {
        let store = MemorySettingsStore::with_values([("maintenance_mode", "1")]);
        assert!(store.flag("maintenance_mode").await.unwrap());
        store.set("maintenance_mode", None).await.unwrap();
        assert!(!store.flag("maintenance_mode").await.unwrap());
    }
}
