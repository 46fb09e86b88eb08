//! In-memory module record store.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use modhub_core::result::AppResult;
use modhub_core::traits::store::ModuleStore;
use modhub_core::types::module::{Module, ModuleFilter};

/// Records keyed by id (iteration order) with a slug index.
#[derive(Debug, Default)]
struct ModuleTable {
    /// Id → record. Ids grow monotonically, so this is insertion order.
    rows: BTreeMap<i64, Module>,
    /// Slug → id.
    by_slug: HashMap<String, i64>,
    /// Next id to hand out.
    next_id: i64,
}

/// Module store held entirely in process memory.
///
/// Iteration order is insertion order, matching the default row order of
/// the SQL store. Each call takes the table lock once, so single-record
/// writes are atomic.
#[derive(Debug, Default)]
pub struct MemoryModuleStore {
    table: RwLock<ModuleTable>,
}

impl MemoryModuleStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored records.
    pub async fn len(&self) -> usize {
        self.table.read().await.rows.len()
    }

    /// Returns whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.table.read().await.rows.is_empty()
    }
}

#[async_trait]
impl ModuleStore for MemoryModuleStore {
    async fn find(&self, slug: &str) -> AppResult<Option<Module>> {
        let table = self.table.read().await;
        Ok(table
            .by_slug
            .get(slug)
            .and_then(|id| table.rows.get(id))
            .cloned())
    }

    async fn save(&self, module: &Module) -> AppResult<Module> {
        let mut table = self.table.write().await;
        let mut stored = module.clone();
        stored.updated_at = Utc::now();

        match table.by_slug.get(&module.slug).copied() {
            Some(id) => {
                stored.id = id;
                if let Some(existing) = table.rows.get(&id) {
                    stored.created_at = existing.created_at;
                }
                table.rows.insert(id, stored.clone());
            }
            None => {
                table.next_id += 1;
                let id = table.next_id;
                stored.id = id;
                table.by_slug.insert(stored.slug.clone(), id);
                table.rows.insert(id, stored.clone());
                debug!(slug = %stored.slug, id, "Module record created");
            }
        }

        Ok(stored)
    }

    async fn delete(&self, slug: &str) -> AppResult<bool> {
        let mut table = self.table.write().await;
        match table.by_slug.remove(slug) {
            Some(id) => {
                table.rows.remove(&id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list(&self, filter: &ModuleFilter) -> AppResult<Vec<Module>> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect())
    }

    async fn disable_all_except(&self, slug: &str) -> AppResult<u64> {
        let mut table = self.table.write().await;
        let now = Utc::now();
        let mut changed = 0u64;
        for module in table.rows.values_mut() {
            if module.enabled && module.slug != slug {
                module.enabled = false;
                module.updated_at = now;
                changed += 1;
            }
        }
        Ok(changed)
    }
}
