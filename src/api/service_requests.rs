//! Service request endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        bulk::BulkResult,
        service_request::{AssignUser, AttachEquipment, CreateServiceRequest, ServiceRequest},
    },
    AppState,
};

use super::validate_batch;

/// List service requests with their links
#[utoipa::path(
    get,
    path = "/service-requests",
    tag = "service-requests",
    responses(
        (status = 200, description = "Service requests", body = Vec<ServiceRequest>)
    )
)]
pub async fn list_requests(State(state): State<AppState>) -> AppResult<Json<Vec<ServiceRequest>>> {
    let requests = state.services.service_requests.list().await?;
    Ok(Json(requests))
}

#[utoipa::path(
    get,
    path = "/service-requests/{id}",
    tag = "service-requests",
    params(("id" = i32, Path, description = "Service request ID")),
    responses(
        (status = 200, description = "Service request", body = ServiceRequest),
        (status = 404, description = "Service request not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<ServiceRequest>> {
    let request = state.services.service_requests.get_by_id(id).await?;
    Ok(Json(request))
}

/// Create a batch of service requests, all or nothing
#[utoipa::path(
    post,
    path = "/service-requests/bulk",
    tag = "service-requests",
    request_body = Vec<CreateServiceRequest>,
    responses(
        (status = 201, description = "Every request created", body = Vec<ServiceRequest>),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 409, description = "Contract id repeated or already used", body = crate::error::ErrorResponse),
        (status = 422, description = "Unknown customer, job type, user or equipment", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_bulk(
    State(state): State<AppState>,
    Json(items): Json<Vec<CreateServiceRequest>>,
) -> AppResult<(StatusCode, Json<Vec<ServiceRequest>>)> {
    validate_batch(&items)?;
    let created = state.services.service_requests.create_bulk(items).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Delete a batch of service requests
#[utoipa::path(
    delete,
    path = "/service-requests/bulk",
    tag = "service-requests",
    request_body = Vec<i32>,
    responses(
        (status = 200, description = "Deleted requests, failed ids and one reason per failure")
    )
)]
pub async fn delete_bulk(
    State(state): State<AppState>,
    Json(ids): Json<Vec<i32>>,
) -> AppResult<Json<BulkResult<ServiceRequest, i32>>> {
    let result = state.services.service_requests.delete_bulk(ids).await?;
    Ok(Json(result))
}

/// Assign a user; a primary assignment replaces the current primary
#[utoipa::path(
    post,
    path = "/service-requests/{id}/assignees",
    tag = "service-requests",
    params(("id" = i32, Path, description = "Service request ID")),
    request_body = AssignUser,
    responses(
        (status = 200, description = "Updated service request", body = ServiceRequest),
        (status = 404, description = "Request or user not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn assign_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(data): Json<AssignUser>,
) -> AppResult<Json<ServiceRequest>> {
    let request = state.services.service_requests.assign_user(id, data).await?;
    Ok(Json(request))
}

#[utoipa::path(
    delete,
    path = "/service-requests/{id}/assignees/{user_id}",
    tag = "service-requests",
    params(
        ("id" = i32, Path, description = "Service request ID"),
        ("user_id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Current service request", body = ServiceRequest),
        (status = 404, description = "Service request not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn unassign_user(
    State(state): State<AppState>,
    Path((id, user_id)): Path<(i32, i32)>,
) -> AppResult<Json<ServiceRequest>> {
    let request = state.services.service_requests.unassign_user(id, user_id).await?;
    Ok(Json(request))
}

#[utoipa::path(
    post,
    path = "/service-requests/{id}/equipment",
    tag = "service-requests",
    params(("id" = i32, Path, description = "Service request ID")),
    request_body = AttachEquipment,
    responses(
        (status = 200, description = "Updated service request", body = ServiceRequest),
        (status = 404, description = "Request or equipment not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn attach_equipment(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(data): Json<AttachEquipment>,
) -> AppResult<Json<ServiceRequest>> {
    let request = state.services.service_requests.attach_equipment(id, data).await?;
    Ok(Json(request))
}

#[utoipa::path(
    delete,
    path = "/service-requests/{id}/equipment/{equipment_id}",
    tag = "service-requests",
    params(
        ("id" = i32, Path, description = "Service request ID"),
        ("equipment_id" = Uuid, Path, description = "Equipment ID")
    ),
    responses(
        (status = 200, description = "Current service request", body = ServiceRequest),
        (status = 404, description = "Service request not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn detach_equipment(
    State(state): State<AppState>,
    Path((id, equipment_id)): Path<(i32, Uuid)>,
) -> AppResult<Json<ServiceRequest>> {
    let request = state
        .services
        .service_requests
        .detach_equipment(id, equipment_id)
        .await?;
    Ok(Json(request))
}

/// Mark a service request completed
#[utoipa::path(
    post,
    path = "/service-requests/{id}/complete",
    tag = "service-requests",
    params(("id" = i32, Path, description = "Service request ID")),
    responses(
        (status = 200, description = "Completed service request", body = ServiceRequest),
        (status = 404, description = "Service request not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn complete(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<ServiceRequest>> {
    let request = state.services.service_requests.complete(id).await?;
    Ok(Json(request))
}
