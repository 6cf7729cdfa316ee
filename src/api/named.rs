//! Lookup table endpoints (customers, roles, job types, security levels,
//! inspection methods). The same handlers serve every kind; the router
//! attaches the kind as a request extension.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        bulk::BulkResult,
        named::{CreateNamedEntity, EntityKind, NamedEntity, UpdateNamedEntity},
    },
    AppState,
};

use super::validate_batch;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/bulk", post(create_bulk).put(update_bulk).delete(delete_bulk))
        .route("/:id", get(get_one).put(update))
        .route("/by-name/:name", get(get_by_name))
}

/// List every entity of a kind
#[utoipa::path(
    get,
    path = "/{kind}",
    tag = "lookups",
    params(("kind" = EntityKind, Path, description = "Lookup table")),
    responses(
        (status = 200, description = "Entities", body = Vec<NamedEntity>)
    )
)]
pub async fn list(
    State(state): State<AppState>,
    Extension(kind): Extension<EntityKind>,
) -> AppResult<Json<Vec<NamedEntity>>> {
    let entities = state.services.named(kind).list().await?;
    Ok(Json(entities))
}

/// Get one entity
#[utoipa::path(
    get,
    path = "/{kind}/{id}",
    tag = "lookups",
    params(
        ("kind" = EntityKind, Path, description = "Lookup table"),
        ("id" = i32, Path, description = "Entity ID")
    ),
    responses(
        (status = 200, description = "Entity", body = NamedEntity),
        (status = 404, description = "Not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_one(
    State(state): State<AppState>,
    Extension(kind): Extension<EntityKind>,
    Path(id): Path<i32>,
) -> AppResult<Json<NamedEntity>> {
    let entity = state.services.named(kind).get_by_id(id).await?;
    Ok(Json(entity))
}

/// Find an entity by name, compared the way bulk conflicts are
#[utoipa::path(
    get,
    path = "/{kind}/by-name/{name}",
    tag = "lookups",
    params(
        ("kind" = EntityKind, Path, description = "Lookup table"),
        ("name" = String, Path, description = "Entity name")
    ),
    responses(
        (status = 200, description = "Entity", body = NamedEntity),
        (status = 404, description = "Not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_by_name(
    State(state): State<AppState>,
    Extension(kind): Extension<EntityKind>,
    Path(name): Path<String>,
) -> AppResult<Json<NamedEntity>> {
    let entity = state.services.named(kind).get_by_name(&name).await?;
    Ok(Json(entity))
}

/// Create one entity
#[utoipa::path(
    post,
    path = "/{kind}",
    tag = "lookups",
    params(("kind" = EntityKind, Path, description = "Lookup table")),
    request_body = CreateNamedEntity,
    responses(
        (status = 201, description = "Created", body = NamedEntity),
        (status = 409, description = "Name already taken", body = crate::error::ErrorResponse)
    )
)]
pub async fn create(
    State(state): State<AppState>,
    Extension(kind): Extension<EntityKind>,
    Json(data): Json<CreateNamedEntity>,
) -> AppResult<(StatusCode, Json<NamedEntity>)> {
    data.validate()?;
    let created = state.services.named(kind).create(data).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update one entity; the body id must match the path
#[utoipa::path(
    put,
    path = "/{kind}/{id}",
    tag = "lookups",
    params(
        ("kind" = EntityKind, Path, description = "Lookup table"),
        ("id" = i32, Path, description = "Entity ID")
    ),
    request_body = UpdateNamedEntity,
    responses(
        (status = 200, description = "Updated", body = NamedEntity),
        (status = 400, description = "Body id differs from the path", body = crate::error::ErrorResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Name already taken", body = crate::error::ErrorResponse)
    )
)]
pub async fn update(
    State(state): State<AppState>,
    Extension(kind): Extension<EntityKind>,
    Path(id): Path<i32>,
    Json(data): Json<UpdateNamedEntity>,
) -> AppResult<Json<NamedEntity>> {
    data.validate()?;
    if data.id != id {
        return Err(AppError::BadRequest(format!(
            "Body id {} does not match path id {}",
            data.id, id
        )));
    }
    let updated = state.services.named(kind).update(data).await?;
    Ok(Json(updated))
}

/// Create a batch; conflicting items are reported, the rest are created
#[utoipa::path(
    post,
    path = "/{kind}/bulk",
    tag = "lookups",
    params(("kind" = EntityKind, Path, description = "Lookup table")),
    request_body = Vec<CreateNamedEntity>,
    responses(
        (status = 200, description = "Created items, rejected items and one reason per rejection"),
        (status = 400, description = "Invalid item or batch too large", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_bulk(
    State(state): State<AppState>,
    Extension(kind): Extension<EntityKind>,
    Json(items): Json<Vec<CreateNamedEntity>>,
) -> AppResult<Json<BulkResult<NamedEntity, CreateNamedEntity>>> {
    validate_batch(&items)?;
    let result = state.services.named(kind).create_bulk(items).await?;
    Ok(Json(result))
}

/// Update a batch
#[utoipa::path(
    put,
    path = "/{kind}/bulk",
    tag = "lookups",
    params(("kind" = EntityKind, Path, description = "Lookup table")),
    request_body = Vec<UpdateNamedEntity>,
    responses(
        (status = 200, description = "Updated items, rejected items and one reason per rejection")
    )
)]
pub async fn update_bulk(
    State(state): State<AppState>,
    Extension(kind): Extension<EntityKind>,
    Json(items): Json<Vec<UpdateNamedEntity>>,
) -> AppResult<Json<BulkResult<NamedEntity, UpdateNamedEntity>>> {
    validate_batch(&items)?;
    let result = state.services.named(kind).update_bulk(items).await?;
    Ok(Json(result))
}

/// Delete a batch of ids
#[utoipa::path(
    delete,
    path = "/{kind}/bulk",
    tag = "lookups",
    params(("kind" = EntityKind, Path, description = "Lookup table")),
    request_body = Vec<i32>,
    responses(
        (status = 200, description = "Deleted entities, failed ids and one reason per failure")
    )
)]
pub async fn delete_bulk(
    State(state): State<AppState>,
    Extension(kind): Extension<EntityKind>,
    Json(ids): Json<Vec<i32>>,
) -> AppResult<Json<BulkResult<NamedEntity, i32>>> {
    let result = state.services.named(kind).delete_bulk(ids).await?;
    Ok(Json(result))
}
