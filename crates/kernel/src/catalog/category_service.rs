//! Category service.
//!
//! Creation validates the name, classifies the criterion tree, and verifies
//! every category reference by running a full resolution; the stored form
//! keeps the references un-expanded so later reads re-resolve against the
//! current state of the referenced categories.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::PgPool;

use crate::criteria::{
    validate_criterias, CategorySource, ComparisonOp, Criterion, CriterionValue, JoinOperator,
    QueryOptions, Resolver,
};
use crate::error::{AppError, AppResult};
use crate::listing::{fetch_rows, shaped_select, ListingParams};
use crate::models::{Category, CategoryKind, CreateCategory, UpdateCategory};

/// Minimum length for category and custom names.
const MIN_NAME_LEN: usize = 3;

/// How a single category is addressed.
#[derive(Debug, Clone)]
pub enum CategorySelector {
    Id(i32),
    Name(String),
    NameAndKind(String, CategoryKind),
}

/// Service for managing categories.
pub struct CategoryService {
    pool: PgPool,
    options: Arc<QueryOptions>,
}

impl CategoryService {
    pub fn new(pool: PgPool, options: Arc<QueryOptions>) -> Arc<Self> {
        Arc::new(Self { pool, options })
    }

    /// List categories shaped by the request query.
    pub async fn list(&self, query: &HashMap<String, String>) -> AppResult<Vec<JsonValue>> {
        let params = ListingParams::from_query(query)?;
        let select = shaped_select("categories", &params, &self.options)?;
        Ok(fetch_rows(&self.pool, &select).await?)
    }

    /// Create a category from client input.
    pub async fn create(&self, input: CreateCategory) -> AppResult<Category> {
        validate_name(&input.name)?;
        let criterias = self.validate_input_criterias(&input.criterias).await?;

        Ok(Category::create(
            &self.pool,
            &input.name,
            input.kind.unwrap_or_default(),
            &criterias,
        )
        .await?)
    }

    /// Create a brand category: matches customs whose model carries the brand
    /// name exactly or whose display name carries it case-insensitively.
    pub async fn create_brand(&self, name: &str) -> AppResult<Category> {
        validate_name(name)?;

        let criterias = vec![Criterion::Join {
            operator: JoinOperator::Or,
            conditions: vec![
                Criterion::Field {
                    field: "model".to_string(),
                    comparison: ComparisonOp::MatchesSensitive,
                    value: CriterionValue::String(name.to_string()),
                },
                Criterion::Field {
                    field: "name".to_string(),
                    comparison: ComparisonOp::MatchesInsensitive,
                    value: CriterionValue::String(name.to_string()),
                },
            ],
        }];

        Ok(Category::create(&self.pool, name, CategoryKind::Brand, &criterias).await?)
    }

    /// Create a model category: matches customs of that model line.
    pub async fn create_model(&self, name: &str) -> AppResult<Category> {
        validate_name(name)?;

        let criterias = vec![Criterion::Field {
            field: "model".to_string(),
            comparison: ComparisonOp::MatchesSensitive,
            value: CriterionValue::String(name.to_string()),
        }];

        Ok(Category::create(&self.pool, name, CategoryKind::Model, &criterias).await?)
    }

    /// Fetch one category or fail with 404.
    pub async fn get(&self, selector: &CategorySelector) -> AppResult<Category> {
        let found = match selector {
            CategorySelector::Id(id) => Category::find_by_id(&self.pool, *id).await?,
            CategorySelector::Name(name) => Category::find_by_name(&self.pool, name, None).await?,
            CategorySelector::NameAndKind(name, kind) => {
                Category::find_by_name(&self.pool, name, Some(*kind)).await?
            }
        };

        found.ok_or(AppError::NotFound("Category"))
    }

    /// Patch a category; absent fields keep their stored value.
    pub async fn update(&self, id: i32, input: UpdateCategory) -> AppResult<Category> {
        let current = self.get(&CategorySelector::Id(id)).await?;

        let name = input.name.unwrap_or(current.name);
        validate_name(&name)?;
        let kind = input.kind.unwrap_or(current.kind);
        let criterias = match &input.criterias {
            Some(raw) => self.validate_input_criterias(raw).await?,
            None => current.criterias.0,
        };

        Category::update(&self.pool, id, &name, kind, &criterias)
            .await?
            .ok_or(AppError::NotFound("Category"))
    }

    /// Delete a category and return the removed row.
    pub async fn remove(&self, id: i32) -> AppResult<Category> {
        let category = self.get(&CategorySelector::Id(id)).await?;
        Category::delete(&self.pool, id).await?;
        Ok(category)
    }

    /// Classify an untyped criterion tree and verify that every category it
    /// references resolves right now. The expanded form is discarded;
    /// resolution happens again on every read.
    async fn validate_input_criterias(&self, raw: &[JsonValue]) -> AppResult<Vec<Criterion>> {
        ensure_criterias_present(raw)?;
        let criterias = validate_criterias(raw)?;
        Resolver::new(self).resolve(&criterias).await?;
        Ok(criterias)
    }
}

#[async_trait]
impl CategorySource for CategoryService {
    async fn find(
        &self,
        name: &str,
        kind: Option<CategoryKind>,
    ) -> anyhow::Result<Option<Category>> {
        Category::find_by_name(&self.pool, name, kind).await
    }
}

/// Shared name-length rule for categories and customs.
pub(crate) fn validate_name(name: &str) -> AppResult<()> {
    if name.len() < MIN_NAME_LEN {
        return Err(AppError::Validation(
            "name must be longer than or equal to 3 characters".to_string(),
        ));
    }
    Ok(())
}

/// A category must define at least one criterion.
fn ensure_criterias_present(raw: &[JsonValue]) -> AppResult<()> {
    if raw.is_empty() {
        return Err(AppError::Validation(
            "criterias must contain at least 1 elements".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn short_names_are_rejected() {
        let err = validate_name("ab").unwrap_err();
        assert_eq!(
            err.to_string(),
            "name must be longer than or equal to 3 characters"
        );
        assert!(validate_name("abc").is_ok());
    }

    #[test]
    fn empty_criterias_are_rejected() {
        let err = ensure_criterias_present(&[]).unwrap_err();
        assert_eq!(err.to_string(), "criterias must contain at least 1 elements");

        let one = vec![serde_json::json!({"field": "price", "comparison": "lt", "value": 1})];
        assert!(ensure_criterias_present(&one).is_ok());
    }
}
