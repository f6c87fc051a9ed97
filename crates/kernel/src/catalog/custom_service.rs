//! Custom service.
//!
//! Category-scoped listing is where the criteria engine comes together: the
//! category's stored tree is resolved (references expanded), compiled into a
//! predicate over the customs table, and the ad-hoc request query is shaped
//! on top.

use std::collections::HashMap;
use std::sync::Arc;

use sea_query::{Alias, Query};
use serde_json::Value as JsonValue;
use sqlx::PgPool;

use super::category_service::{validate_name, CategorySelector, CategoryService};
use crate::criteria::{compile_criterias, JoinOperator, QueryOptions, Resolver};
use crate::error::{AppError, AppResult};
use crate::listing::{fetch_rows, shaped_select, ListingBuilder, ListingParams};
use crate::models::{Custom, UpdateCustom};

/// Service for reading and updating customs.
pub struct CustomService {
    pool: PgPool,
    options: Arc<QueryOptions>,
    categories: Arc<CategoryService>,
}

impl CustomService {
    pub fn new(
        pool: PgPool,
        options: Arc<QueryOptions>,
        categories: Arc<CategoryService>,
    ) -> Arc<Self> {
        Arc::new(Self {
            pool,
            options,
            categories,
        })
    }

    /// List customs shaped by the request query.
    pub async fn list(&self, query: &HashMap<String, String>) -> AppResult<Vec<JsonValue>> {
        let params = ListingParams::from_query(query)?;
        let select = shaped_select("customs", &params, &self.options)?;
        Ok(fetch_rows(&self.pool, &select).await?)
    }

    /// List the customs matching a category's criterias, with the request
    /// query shaped on top.
    pub async fn list_by_category(
        &self,
        selector: &CategorySelector,
        query: &HashMap<String, String>,
    ) -> AppResult<Vec<JsonValue>> {
        let category = self.categories.get(selector).await?;

        let resolved = Resolver::new(self.categories.as_ref())
            .resolve(&category.criterias.0)
            .await?;
        let predicate = compile_criterias(&resolved, JoinOperator::And, &self.options)?;

        let params = ListingParams::from_query(query)?;

        let mut select = Query::select();
        select.from(Alias::new("customs"));
        select.cond_where(predicate);
        ListingBuilder::new("customs", &params, &self.options).apply(&mut select)?;

        Ok(fetch_rows(&self.pool, &select).await?)
    }

    /// Fetch one custom by code or fail with 404.
    pub async fn get(&self, code: i32) -> AppResult<Custom> {
        Custom::find_by_code(&self.pool, code)
            .await?
            .ok_or(AppError::NotFound("Custom"))
    }

    /// Patch a custom; absent fields keep their stored value.
    pub async fn update(&self, code: i32, input: UpdateCustom) -> AppResult<Custom> {
        let current = self.get(code).await?;

        let name = input.name.unwrap_or(current.name);
        validate_name(&name)?;
        let sizes = input.sizes.unwrap_or(current.sizes);

        Custom::update(&self.pool, code, &name, &sizes)
            .await?
            .ok_or(AppError::NotFound("Custom"))
    }
}
