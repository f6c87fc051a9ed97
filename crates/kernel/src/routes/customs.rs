//! Custom API routes.
//!
//! Listing endpoints accept the flat shaping query (filters, `sort`, `page`,
//! `limit`, `fields`). Category-scoped listings resolve the named category's
//! criterias before applying the shaping on top.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde_json::Value as JsonValue;

use crate::catalog::CategorySelector;
use crate::error::AppResult;
use crate::models::{CategoryKind, Custom, UpdateCustom};
use crate::state::AppState;

/// Create the customs router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/customs", get(list))
        .route("/customs/{code}", get(find_by_code).patch(update))
        .route("/customs/category/{id}", get(by_category))
        .route("/customs/category/name/{name}", get(by_category_name))
        .route("/customs/brand/{name}", get(by_brand))
        .route("/customs/model/{name}", get(by_model))
}

// -------------------------------------------------------------------------
// Handlers
// -------------------------------------------------------------------------

async fn list(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> AppResult<Json<Vec<JsonValue>>> {
    let customs = state.customs().list(&query).await?;
    Ok(Json(customs))
}

async fn find_by_code(
    State(state): State<AppState>,
    Path(code): Path<i32>,
) -> AppResult<Json<Custom>> {
    let custom = state.customs().get(code).await?;
    Ok(Json(custom))
}

async fn update(
    State(state): State<AppState>,
    Path(code): Path<i32>,
    Json(input): Json<UpdateCustom>,
) -> AppResult<Json<Custom>> {
    let custom = state.customs().update(code, input).await?;
    Ok(Json(custom))
}

async fn by_category(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<HashMap<String, String>>,
) -> AppResult<Json<Vec<JsonValue>>> {
    let customs = state
        .customs()
        .list_by_category(&CategorySelector::Id(id), &query)
        .await?;
    Ok(Json(customs))
}

async fn by_category_name(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> AppResult<Json<Vec<JsonValue>>> {
    let customs = state
        .customs()
        .list_by_category(&CategorySelector::Name(name), &query)
        .await?;
    Ok(Json(customs))
}

async fn by_brand(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> AppResult<Json<Vec<JsonValue>>> {
    let customs = state
        .customs()
        .list_by_category(
            &CategorySelector::NameAndKind(name, CategoryKind::Brand),
            &query,
        )
        .await?;
    Ok(Json(customs))
}

async fn by_model(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> AppResult<Json<Vec<JsonValue>>> {
    let customs = state
        .customs()
        .list_by_category(
            &CategorySelector::NameAndKind(name, CategoryKind::Model),
            &query,
        )
        .await?;
    Ok(Json(customs))
}
