//! Category model: a named, reusable, persisted filter expression.
//!
//! A category classifies customs through its criterion tree. References to
//! other categories are stored un-expanded and re-resolved on every use, so
//! referenced categories may be created, renamed, or deleted after a
//! referencing category exists.

use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::criteria::Criterion;

/// Category classification kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "category_kind", rename_all = "lowercase")]
pub enum CategoryKind {
    #[default]
    Category,
    Brand,
    Model,
}

impl FromStr for CategoryKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "category" => Ok(CategoryKind::Category),
            "brand" => Ok(CategoryKind::Brand),
            "model" => Ok(CategoryKind::Model),
            _ => Err(()),
        }
    }
}

/// A persisted category.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    /// Generated identifier.
    pub id: i32,

    /// Unique name, at least 3 characters.
    pub name: String,

    /// Classification kind (wire key `type`).
    #[serde(rename = "type")]
    pub kind: CategoryKind,

    /// Criterion tree, stored as structured JSON, at least one element.
    pub criterias: Json<Vec<Criterion>>,
}

/// Input for creating a category. `criterias` stays untyped here; the
/// criteria validator classifies it.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCategory {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: Option<CategoryKind>,
    pub criterias: Vec<JsonValue>,
}

/// Input for updating a category; absent fields keep their current value.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCategory {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<CategoryKind>,
    pub criterias: Option<Vec<JsonValue>>,
}

impl Category {
    /// Find a category by id.
    pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Self>> {
        let category = sqlx::query_as::<_, Self>(
            "SELECT id, name, kind, criterias FROM categories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch category")?;

        Ok(category)
    }

    /// Find a category by name, optionally narrowed to a kind.
    pub async fn find_by_name(
        pool: &PgPool,
        name: &str,
        kind: Option<CategoryKind>,
    ) -> Result<Option<Self>> {
        let category = sqlx::query_as::<_, Self>(
            r#"
            SELECT id, name, kind, criterias
            FROM categories
            WHERE name = $1 AND ($2::category_kind IS NULL OR kind = $2)
            "#,
        )
        .bind(name)
        .bind(kind)
        .fetch_optional(pool)
        .await
        .context("failed to fetch category by name")?;

        Ok(category)
    }

    /// Create a new category with an already-validated criterion tree.
    pub async fn create(
        pool: &PgPool,
        name: &str,
        kind: CategoryKind,
        criterias: &[Criterion],
    ) -> Result<Self> {
        let category = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO categories (name, kind, criterias)
            VALUES ($1, $2, $3)
            RETURNING id, name, kind, criterias
            "#,
        )
        .bind(name)
        .bind(kind)
        .bind(Json(criterias))
        .fetch_one(pool)
        .await
        .context("failed to create category")?;

        Ok(category)
    }

    /// Update a category and return the stored row.
    pub async fn update(
        pool: &PgPool,
        id: i32,
        name: &str,
        kind: CategoryKind,
        criterias: &[Criterion],
    ) -> Result<Option<Self>> {
        let category = sqlx::query_as::<_, Self>(
            r#"
            UPDATE categories
            SET name = $1, kind = $2, criterias = $3
            WHERE id = $4
            RETURNING id, name, kind, criterias
            "#,
        )
        .bind(name)
        .bind(kind)
        .bind(Json(criterias))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to update category")?;

        Ok(category)
    }

    /// Delete a category.
    pub async fn delete(pool: &PgPool, id: i32) -> Result<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .context("failed to delete category")?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::criteria::{ComparisonOp, CriterionValue};

    #[test]
    fn kind_defaults_to_category() {
        assert_eq!(CategoryKind::default(), CategoryKind::Category);
    }

    #[test]
    fn kind_parses_wire_names() {
        assert_eq!("brand".parse::<CategoryKind>(), Ok(CategoryKind::Brand));
        assert_eq!("model".parse::<CategoryKind>(), Ok(CategoryKind::Model));
        assert!("shoes".parse::<CategoryKind>().is_err());
    }

    #[test]
    fn serializes_kind_under_type_key() {
        let category = Category {
            id: 1,
            name: "price-under-3000".to_string(),
            kind: CategoryKind::Category,
            criterias: Json(vec![Criterion::Field {
                field: "price".to_string(),
                comparison: ComparisonOp::Lt,
                value: CriterionValue::Integer(3000),
            }]),
        };

        let json = serde_json::to_value(&category).unwrap();
        assert_eq!(json["type"], "category");
        assert_eq!(json["criterias"][0]["comparison"], "lt");

        let parsed: Category = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.name, "price-under-3000");
        assert_eq!(parsed.criterias.0.len(), 1);
    }

    #[test]
    fn create_input_accepts_untyped_criterias() {
        let input: CreateCategory = serde_json::from_value(serde_json::json!({
            "name": "nike",
            "type": "brand",
            "criterias": [{"field": "model", "comparison": "matchesSensitive", "value": "nike"}]
        }))
        .unwrap();

        assert_eq!(input.kind, Some(CategoryKind::Brand));
        assert_eq!(input.criterias.len(), 1);
    }
}
