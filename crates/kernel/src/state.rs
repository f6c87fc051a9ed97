//! Application state shared across all handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::catalog::{CategoryService, CustomService};
use crate::config::Config;
use crate::criteria::QueryOptions;
use crate::db;
use crate::sync::{GoogleSheets, SheetSource, SyncService};

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// PostgreSQL connection pool.
    db: PgPool,

    /// Read-only engine configuration, loaded once at startup.
    options: Arc<QueryOptions>,

    /// Category service.
    categories: Arc<CategoryService>,

    /// Custom service.
    customs: Arc<CustomService>,

    /// Spreadsheet sync service (available when a spreadsheet is configured).
    sync: Option<Arc<SyncService>>,
}

impl AppState {
    /// Create new application state with database connections.
    pub async fn new(config: &Config) -> Result<Self> {
        let db = db::create_pool(config)
            .await
            .context("failed to create database pool")?;

        db::run_migrations(&db)
            .await
            .context("failed to run migrations")?;

        let options = Arc::new(config.query.clone());

        let categories = CategoryService::new(db.clone(), options.clone());
        let customs = CustomService::new(db.clone(), options.clone(), categories.clone());

        let sync = config.sync.as_ref().map(|sync_config| {
            let source: Arc<dyn SheetSource> = Arc::new(GoogleSheets::new(
                sync_config.spreadsheet_id.clone(),
                sync_config.api_key.clone(),
                sync_config.layout.clone(),
            ));
            SyncService::new(db.clone(), source, sync_config.interval)
        });

        Ok(Self {
            inner: Arc::new(AppStateInner {
                db,
                options,
                categories,
                customs,
                sync,
            }),
        })
    }

    /// Get the database pool.
    pub fn db(&self) -> &PgPool {
        &self.inner.db
    }

    /// Get the engine configuration.
    pub fn options(&self) -> &Arc<QueryOptions> {
        &self.inner.options
    }

    /// Get the category service.
    pub fn categories(&self) -> &Arc<CategoryService> {
        &self.inner.categories
    }

    /// Get the custom service.
    pub fn customs(&self) -> &Arc<CustomService> {
        &self.inner.customs
    }

    /// Get the sync service (if a spreadsheet is configured).
    pub fn sync(&self) -> Option<&Arc<SyncService>> {
        self.inner.sync.as_ref()
    }

    /// Check if PostgreSQL is healthy.
    pub async fn postgres_healthy(&self) -> bool {
        db::check_health(&self.inner.db).await
    }
}
