//! Module record store backed by the `modules` table.

use async_trait::async_trait;
use sqlx::PgPool;

use modhub_core::error::{AppError, ErrorKind};
use modhub_core::result::AppResult;
use modhub_core::traits::store::ModuleStore;
use modhub_core::types::module::{Module, ModuleFilter};

/// PostgreSQL implementation of [`ModuleStore`].
///
/// Rows are returned in `id` order so registry iteration order is stable
/// across calls and matches discovery order.
#[derive(Debug, Clone)]
pub struct PgModuleStore {
    pool: PgPool,
}

impl PgModuleStore {
    /// Create a new module store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_error(message: &str) -> impl FnOnce(sqlx::Error) -> AppError + '_ {
    move |e| AppError::with_source(ErrorKind::Database, message, e)
}

#[async_trait]
impl ModuleStore for PgModuleStore {
    async fn find(&self, slug: &str) -> AppResult<Option<Module>> {
        sqlx::query_as::<_, Module>("SELECT * FROM modules WHERE slug = $1 LIMIT 1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to find module"))
    }

    async fn save(&self, module: &Module) -> AppResult<Module> {
        sqlx::query_as::<_, Module>(
            "INSERT INTO modules \
             (slug, name, description, author, version, min_core_version, dependencies, enabled, installed_version) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (slug) DO UPDATE SET \
             name = EXCLUDED.name, description = EXCLUDED.description, author = EXCLUDED.author, \
             version = EXCLUDED.version, min_core_version = EXCLUDED.min_core_version, \
             dependencies = EXCLUDED.dependencies, enabled = EXCLUDED.enabled, \
             installed_version = EXCLUDED.installed_version, updated_at = NOW() \
             RETURNING *",
        )
        .bind(&module.slug)
        .bind(&module.name)
        .bind(&module.description)
        .bind(&module.author)
        .bind(&module.version)
        .bind(&module.min_core_version)
        .bind(&module.dependencies)
        .bind(module.enabled)
        .bind(&module.installed_version)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to save module"))
    }

    async fn delete(&self, slug: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM modules WHERE slug = $1")
            .bind(slug)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete module"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, filter: &ModuleFilter) -> AppResult<Vec<Module>> {
        let query = match filter {
            ModuleFilter::All => {
                sqlx::query_as::<_, Module>("SELECT * FROM modules ORDER BY id ASC")
            }
            ModuleFilter::Enabled { excluding: None } => sqlx::query_as::<_, Module>(
                "SELECT * FROM modules WHERE enabled = TRUE ORDER BY id ASC",
            ),
            ModuleFilter::Enabled {
                excluding: Some(slug),
            } => sqlx::query_as::<_, Module>(
                "SELECT * FROM modules WHERE enabled = TRUE AND slug <> $1 ORDER BY id ASC",
            )
            .bind(slug.clone()),
            ModuleFilter::SlugNotIn(slugs) => sqlx::query_as::<_, Module>(
                "SELECT * FROM modules WHERE slug <> ALL($1) ORDER BY id ASC",
            )
            .bind(slugs.clone()),
        };

        query
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list modules"))
    }

    async fn disable_all_except(&self, slug: &str) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE modules SET enabled = FALSE, updated_at = NOW() WHERE enabled = TRUE AND slug <> $1",
        )
        .bind(slug)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to disable modules"))?;
        Ok(result.rows_affected())
    }
}
