//! Category API routes.
//!
//! REST endpoints for managing categories: CRUD plus the brand/model
//! shortcuts that synthesize their criterias from a bare name.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::catalog::CategorySelector;
use crate::error::AppResult;
use crate::models::{Category, CreateCategory, UpdateCategory};
use crate::state::AppState;

/// Create the category router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", post(create).get(list))
        .route("/categories/brand", post(create_brand))
        .route("/categories/model", post(create_model))
        .route("/categories/name/{name}", get(find_by_name))
        .route(
            "/categories/{id}",
            get(find_by_id).patch(update).delete(remove),
        )
}

/// Body for the brand/model creation shortcuts.
#[derive(Deserialize)]
struct CreateNamed {
    name: String,
}

// -------------------------------------------------------------------------
// Handlers
// -------------------------------------------------------------------------

async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateCategory>,
) -> AppResult<(StatusCode, Json<Category>)> {
    let category = state.categories().create(input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn create_brand(
    State(state): State<AppState>,
    Json(input): Json<CreateNamed>,
) -> AppResult<(StatusCode, Json<Category>)> {
    let category = state.categories().create_brand(&input.name).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn create_model(
    State(state): State<AppState>,
    Json(input): Json<CreateNamed>,
) -> AppResult<(StatusCode, Json<Category>)> {
    let category = state.categories().create_model(&input.name).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> AppResult<Json<Vec<JsonValue>>> {
    let categories = state.categories().list(&query).await?;
    Ok(Json(categories))
}

async fn find_by_id(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Category>> {
    let category = state.categories().get(&CategorySelector::Id(id)).await?;
    Ok(Json(category))
}

async fn find_by_name(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<Category>> {
    let category = state
        .categories()
        .get(&CategorySelector::Name(name))
        .await?;
    Ok(Json(category))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(input): Json<UpdateCategory>,
) -> AppResult<Json<Category>> {
    let category = state.categories().update(id, input).await?;
    Ok(Json(category))
}

async fn remove(State(state): State<AppState>, Path(id): Path<i32>) -> AppResult<Json<Category>> {
    let category = state.categories().remove(id).await?;
    Ok(Json(category))
}
