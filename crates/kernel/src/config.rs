//! Configuration loaded from environment variables.
//!
//! Everything is read once at startup; the engine components receive their
//! configuration (operator table, value templates) by reference and never
//! consult the environment themselves.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::criteria::{OperatorTable, QueryOptions, ValueTemplates};
use crate::sync::SheetLayout;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 3000).
    pub port: u16,

    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Maximum database connections in pool (default: 10).
    pub database_max_connections: u32,

    /// CORS allowed origins (comma-separated, default: "*").
    pub cors_allowed_origins: Vec<String>,

    /// Criteria engine configuration: operator symbols and value templates.
    pub query: QueryOptions,

    /// Spreadsheet sync configuration. When None, sync is disabled.
    pub sync: Option<SyncConfig>,
}

/// Spreadsheet sync configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Google spreadsheet identifier.
    pub spreadsheet_id: String,

    /// Google Sheets API key.
    pub api_key: String,

    /// Interval between sync runs (default: 3600 seconds).
    pub interval: Duration,

    /// Row-title layout of each model sheet.
    pub layout: SheetLayout,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("PORT must be a valid u16")?;

        let database_url =
            env::var("DATABASE_URL").context("DATABASE_URL environment variable is required")?;

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a valid u32")?;

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_else(|_| vec!["*".to_string()]);

        let query = QueryOptions {
            operators: OperatorTable {
                eq: env_or("DB_EQ_OPERATOR", "="),
                gt: env_or("DB_GT_OPERATOR", ">"),
                gte: env_or("DB_GTE_OPERATOR", ">="),
                lt: env_or("DB_LT_OPERATOR", "<"),
                lte: env_or("DB_LTE_OPERATOR", "<="),
                matches_insensitive: env_or("DB_MATCHES_CI_OPERATOR", "~*"),
                matches_sensitive: env_or("DB_MATCHES_CS_OPERATOR", "~"),
                contain_all: env_or("DB_CONTAINS_ALL_OPERATOR", "@>"),
                contained_by: env_or("DB_CONTAINED_BY_OPERATOR", "<@"),
            },
            templates: ValueTemplates {
                array: env_or("DB_ARRAY_TYPE_TEMPLATE", "{<VALUE>}"),
                string_matches: env_or("DB_STRING_MATCHES_TYPE_TEMPLATE", "<VALUE>"),
            },
        };

        let sync = match (env::var("SPREADSHEET_ID"), env::var("SHEETS_API_KEY")) {
            (Ok(spreadsheet_id), Ok(api_key)) => {
                let interval_secs: u64 = env::var("SYNC_INTERVAL_SECS")
                    .unwrap_or_else(|_| "3600".to_string())
                    .parse()
                    .context("SYNC_INTERVAL_SECS must be a valid u64")?;

                Some(SyncConfig {
                    spreadsheet_id,
                    api_key,
                    interval: Duration::from_secs(interval_secs),
                    layout: SheetLayout {
                        name_row: env_or("SHEET_NAME_ROW_TITLE", "name"),
                        price_row: env_or("SHEET_PRICE_ROW_TITLE", "price"),
                        code_row: env_or("SHEET_CODE_ROW_TITLE", "code"),
                        sizes_row: env_or("SHEET_SIZES_ROW_TITLE", "sizes"),
                        available_sign: env_or("SHEET_SIZE_AVAILABLE_SIGN", "+"),
                    },
                })
            }
            _ => None,
        };

        Ok(Self {
            port,
            database_url,
            database_max_connections,
            cors_allowed_origins,
            query,
            sync,
        })
    }
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}
