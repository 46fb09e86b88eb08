//! System settings store backed by the `system_settings` table.

use async_trait::async_trait;
use sqlx::PgPool;

use modhub_core::error::{AppError, ErrorKind};
use modhub_core::result::AppResult;
use modhub_core::traits::store::SettingsStore;

/// PostgreSQL implementation of [`SettingsStore`].
#[derive(Debug, Clone)]
pub struct PgSettingsStore {
    pool: PgPool,
}

impl PgSettingsStore {
    /// Create a new settings store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsStore for PgSettingsStore {
    async fn get(&self, name: &str) -> AppResult<Option<String>> {
        sqlx::query_scalar::<_, String>("SELECT value FROM system_settings WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to read setting", e))
    }

    async fn set(&self, name: &str, value: Option<&str>) -> AppResult<()> {
        let query = match value {
            Some(value) => sqlx::query(
                "INSERT INTO system_settings (name, value) VALUES ($1, $2) \
                 ON CONFLICT (name) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()",
            )
            .bind(name)
            .bind(value),
            None => sqlx::query("DELETE FROM system_settings WHERE name = $1").bind(name),
        };

        query
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to write setting", e))?;
        Ok(())
    }
}
