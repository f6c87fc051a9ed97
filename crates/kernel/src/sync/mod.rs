//! Spreadsheet sync: periodic refresh of the customs table.
//!
//! Each tick fetches the full product list from the configured sheet source
//! and writes it through idempotent per-row upserts. A failing row is logged
//! and counted but does not abort the batch; a failing fetch is logged and
//! retried at the next tick. The sync job never crashes the process.

mod sheet;

pub use sheet::{parse_grid, GoogleSheets, SheetLayout, SheetSource};

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::PgPool;
use tracing::{error, info, warn};

use crate::models::Custom;

/// Outcome of one sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    /// Rows fetched from the sheet.
    pub total: usize,

    /// Rows written successfully.
    pub synced: usize,

    /// Rows whose write failed.
    pub failed: usize,
}

/// Periodic customs sync service.
pub struct SyncService {
    pool: PgPool,
    source: Arc<dyn SheetSource>,
    interval: Duration,
}

impl SyncService {
    pub fn new(pool: PgPool, source: Arc<dyn SheetSource>, interval: Duration) -> Arc<Self> {
        Arc::new(Self {
            pool,
            source,
            interval,
        })
    }

    /// Run one sync pass: fetch everything, upsert row by row.
    pub async fn run(&self) -> Result<SyncReport> {
        let customs = self
            .source
            .fetch_all()
            .await
            .context("failed to fetch customs from sheet")?;

        let mut synced = 0;
        let mut failed = 0;

        for custom in &customs {
            match Custom::upsert(&self.pool, custom).await {
                Ok(()) => synced += 1,
                Err(e) => {
                    failed += 1;
                    warn!(code = custom.code, error = %e, "failed to upsert custom");
                }
            }
        }

        Ok(SyncReport {
            total: customs.len(),
            synced,
            failed,
        })
    }

    /// Run forever: one pass immediately, then one per interval.
    pub async fn run_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            match self.run().await {
                Ok(report) => info!(
                    total = report.total,
                    synced = report.synced,
                    failed = report.failed,
                    "customs sync completed"
                ),
                Err(e) => error!(error = %e, "customs sync failed, retrying at next tick"),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn report_accounts_for_every_row() {
        let report = SyncReport {
            total: 10,
            synced: 8,
            failed: 2,
        };
        assert_eq!(report.synced + report.failed, report.total);
    }
}
