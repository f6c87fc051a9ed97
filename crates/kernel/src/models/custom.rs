//! Custom model: a product variant (code, model, name, price, sizes).
//!
//! Customs are owned and refreshed by the spreadsheet sync job; the criteria
//! engine only reads them through the query builder.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// A persisted custom.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Custom {
    /// Unique product code (primary key).
    pub code: i32,

    /// Model line the custom belongs to (one spreadsheet tab per model).
    pub model: String,

    /// Display name.
    pub name: String,

    /// Price in whole currency units.
    pub price: i32,

    /// Available sizes.
    pub sizes: Vec<i32>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A custom reconstructed from the spreadsheet, before persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustom {
    pub code: i32,
    pub model: String,
    pub name: String,
    pub price: i32,
    pub sizes: Vec<i32>,
}

/// Input for updating a custom; absent fields keep their current value.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCustom {
    pub name: Option<String>,
    pub sizes: Option<Vec<i32>>,
}

impl Custom {
    /// Find a custom by code.
    pub async fn find_by_code(pool: &PgPool, code: i32) -> Result<Option<Self>> {
        let custom = sqlx::query_as::<_, Self>(
            "SELECT code, model, name, price, sizes, created_at, updated_at FROM customs WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(pool)
        .await
        .context("failed to fetch custom")?;

        Ok(custom)
    }

    /// Update a custom and return the stored row.
    pub async fn update(
        pool: &PgPool,
        code: i32,
        name: &str,
        sizes: &[i32],
    ) -> Result<Option<Self>> {
        let custom = sqlx::query_as::<_, Self>(
            r#"
            UPDATE customs
            SET name = $1, sizes = $2, updated_at = now()
            WHERE code = $3
            RETURNING code, model, name, price, sizes, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(sizes)
        .bind(code)
        .fetch_optional(pool)
        .await
        .context("failed to update custom")?;

        Ok(custom)
    }

    /// Idempotent per-row sync write.
    ///
    /// New codes insert the full row; existing codes refresh their sizes.
    pub async fn upsert(pool: &PgPool, new: &NewCustom) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO customs (code, model, name, price, sizes)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (code) DO UPDATE
            SET sizes = EXCLUDED.sizes, updated_at = now()
            "#,
        )
        .bind(new.code)
        .bind(&new.model)
        .bind(&new.name)
        .bind(new.price)
        .bind(&new.sizes)
        .execute(pool)
        .await
        .context("failed to upsert custom")?;

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn custom_serialization() {
        let custom = Custom {
            code: 10234,
            model: "Lebron".to_string(),
            name: "Lebron Witness 7".to_string(),
            price: 2800,
            sizes: vec![40, 41, 42],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&custom).unwrap();
        assert_eq!(json["code"], 10234);
        assert_eq!(json["sizes"], serde_json::json!([40, 41, 42]));

        let parsed: Custom = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.price, 2800);
    }

    #[test]
    fn update_input_fields_are_optional() {
        let input: UpdateCustom = serde_json::from_str(r#"{"name": "new name"}"#).unwrap();
        assert_eq!(input.name.as_deref(), Some("new name"));
        assert!(input.sizes.is_none());
    }
}
