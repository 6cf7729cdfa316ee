//! Equipment API endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        bulk::BulkResult,
        equipment::{CreateEquipment, Equipment, UpdateEquipment},
    },
    AppState,
};

use super::validate_batch;

/// List equipment trees
#[utoipa::path(
    get,
    path = "/equipment",
    tag = "equipment",
    responses(
        (status = 200, description = "Root equipment with nested components", body = Vec<Equipment>)
    )
)]
pub async fn list_equipment(State(state): State<AppState>) -> AppResult<Json<Vec<Equipment>>> {
    let equipment = state.services.equipment.list().await?;
    Ok(Json(equipment))
}

/// Get equipment by ID, with its components
#[utoipa::path(
    get,
    path = "/equipment/{id}",
    tag = "equipment",
    params(("id" = Uuid, Path, description = "Equipment ID")),
    responses(
        (status = 200, description = "Equipment tree", body = Equipment),
        (status = 404, description = "Equipment not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_equipment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Equipment>> {
    let equipment = state.services.equipment.get_tree(id).await?;
    Ok(Json(equipment))
}

/// Delete equipment and all its components
#[utoipa::path(
    delete,
    path = "/equipment/{id}",
    tag = "equipment",
    params(("id" = Uuid, Path, description = "Equipment ID")),
    responses(
        (status = 204, description = "Equipment deleted"),
        (status = 404, description = "Equipment not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_equipment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.services.equipment.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Create a batch of equipment trees
#[utoipa::path(
    post,
    path = "/equipment/bulk",
    tag = "equipment",
    request_body = Vec<CreateEquipment>,
    responses(
        (status = 200, description = "Created trees, rejected roots and one reason per rejection"),
        (status = 400, description = "Invalid item or batch too large", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_bulk(
    State(state): State<AppState>,
    Json(items): Json<Vec<CreateEquipment>>,
) -> AppResult<Json<BulkResult<Equipment, CreateEquipment>>> {
    validate_batch(&items)?;
    let result = state.services.equipment.create_bulk(items).await?;
    Ok(Json(result))
}

/// Update a batch of equipment nodes
#[utoipa::path(
    put,
    path = "/equipment/bulk",
    tag = "equipment",
    request_body = Vec<UpdateEquipment>,
    responses(
        (status = 200, description = "Updated nodes, rejected items and one reason per rejection")
    )
)]
pub async fn update_bulk(
    State(state): State<AppState>,
    Json(items): Json<Vec<UpdateEquipment>>,
) -> AppResult<Json<BulkResult<Equipment, UpdateEquipment>>> {
    validate_batch(&items)?;
    let result = state.services.equipment.update_bulk(items).await?;
    Ok(Json(result))
}

/// Delete a batch of equipment, each with its components
#[utoipa::path(
    delete,
    path = "/equipment/bulk",
    tag = "equipment",
    request_body = Vec<Uuid>,
    responses(
        (status = 200, description = "Deleted trees, failed ids and one reason per failure")
    )
)]
pub async fn delete_bulk(
    State(state): State<AppState>,
    Json(ids): Json<Vec<Uuid>>,
) -> AppResult<Json<BulkResult<Equipment, Uuid>>> {
    let result = state.services.equipment.delete_bulk(ids).await?;
    Ok(Json(result))
}

/// Add a component (with nested components) under existing equipment
#[utoipa::path(
    post,
    path = "/equipment/{id}/components",
    tag = "equipment",
    params(("id" = Uuid, Path, description = "Parent equipment ID")),
    request_body = CreateEquipment,
    responses(
        (status = 201, description = "Component created", body = Equipment),
        (status = 404, description = "Parent not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Serial number already used", body = crate::error::ErrorResponse)
    )
)]
pub async fn add_component(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(data): Json<CreateEquipment>,
) -> AppResult<(StatusCode, Json<Equipment>)> {
    data.validate()?;
    let created = state.services.equipment.add_component(id, data).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Get a direct component
#[utoipa::path(
    get,
    path = "/equipment/{id}/components/{component_id}",
    tag = "equipment",
    params(
        ("id" = Uuid, Path, description = "Parent equipment ID"),
        ("component_id" = Uuid, Path, description = "Component ID")
    ),
    responses(
        (status = 200, description = "Component tree", body = Equipment),
        (status = 404, description = "Not a component of this equipment", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_component(
    State(state): State<AppState>,
    Path((id, component_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<Equipment>> {
    let component = state.services.equipment.get_component(id, component_id).await?;
    Ok(Json(component))
}

/// Remove a direct component and its subtree
#[utoipa::path(
    delete,
    path = "/equipment/{id}/components/{component_id}",
    tag = "equipment",
    params(
        ("id" = Uuid, Path, description = "Parent equipment ID"),
        ("component_id" = Uuid, Path, description = "Component ID")
    ),
    responses(
        (status = 200, description = "Removed component tree", body = Equipment),
        (status = 404, description = "Not a component of this equipment", body = crate::error::ErrorResponse)
    )
)]
pub async fn remove_component(
    State(state): State<AppState>,
    Path((id, component_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<Equipment>> {
    let removed = state.services.equipment.remove_component(id, component_id).await?;
    Ok(Json(removed))
}
