//! PostgreSQL connection pool management.

use std::sync::Arc;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use modhub_core::config::DatabaseConfig;
use modhub_core::error::{AppError, ErrorKind};

use crate::repositories::module::PgModuleStore;
use crate::repositories::setting::PgSettingsStore;

/// Shared PostgreSQL pool that hands out the SQL-backed stores.
#[derive(Debug, Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    /// Connect using the configured pool limits.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        info!(
            url = %mask_password(&config.url),
            max_connections = config.max_connections,
            "Connecting module registry database"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout())
            .idle_timeout(config.idle_timeout())
            .connect(&config.url)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    format!("Failed to connect to database: {e}"),
                    e,
                )
            })?;

        Ok(Self { pool })
    }

    /// Connect and, unless `migrate` is off, bring the schema up to date.
    pub async fn connect_and_migrate(config: &DatabaseConfig) -> Result<Self, AppError> {
        let db = Self::connect(config).await?;
        if config.migrate {
            crate::migration::run_migrations(&db.pool).await?;
        }
        Ok(db)
    }

    /// Module record store over this pool.
    pub fn module_store(&self) -> Arc<PgModuleStore> {
        Arc::new(PgModuleStore::new(self.pool.clone()))
    }

    /// System settings store over this pool.
    pub fn settings_store(&self) -> Arc<PgSettingsStore> {
        Arc::new(PgSettingsStore::new(self.pool.clone()))
    }

    /// Return a reference to the underlying sqlx pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close all connections in the pool.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Module registry database closed");
    }
}

/// Mask the password portion of a database URL for safe logging.
fn mask_password(url: &str) -> String {
    let scheme_end = url.find("://").map(|p| p + 3).unwrap_or(0);
    match url.find('@') {
        Some(at) => match url[..at].rfind(':') {
            Some(colon) if colon > scheme_end => {
                format!("{}:****@{}", &url[..colon], &url[at + 1..])
            }
            _ => url.to_string(),
        },
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_password() {
        assert_eq!(
            mask_password("postgres://modhub:secret@db:5432/modhub"),
            "postgres://modhub:****@db:5432/modhub"
        );
        assert_eq!(
            mask_password("postgres://db:5432/modhub"),
            "postgres://db:5432/modhub"
        );
        assert_eq!(
            mask_password("postgres://modhub@db/modhub"),
            "postgres://modhub@db/modhub"
        );
    }
}
