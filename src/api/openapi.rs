//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{equipment, health, named, service_requests, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Field Service API",
        version = "0.3.0",
        description = "Bulk management of lookup tables, equipment trees and service requests"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Lookup tables
        named::list,
        named::get_one,
        named::get_by_name,
        named::create,
        named::update,
        named::create_bulk,
        named::update_bulk,
        named::delete_bulk,
        // Equipment
        equipment::list_equipment,
        equipment::get_equipment,
        equipment::delete_equipment,
        equipment::create_bulk,
        equipment::update_bulk,
        equipment::delete_bulk,
        equipment::add_component,
        equipment::get_component,
        equipment::remove_component,
        // Service requests
        service_requests::list_requests,
        service_requests::get_request,
        service_requests::create_bulk,
        service_requests::delete_bulk,
        service_requests::assign_user,
        service_requests::unassign_user,
        service_requests::attach_equipment,
        service_requests::detach_equipment,
        service_requests::complete,
        // Users
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_user,
        users::deactivate_user,
    ),
    components(
        schemas(
            // Lookup tables
            crate::models::named::EntityKind,
            crate::models::named::NamedEntity,
            crate::models::named::CreateNamedEntity,
            crate::models::named::UpdateNamedEntity,
            // Equipment
            crate::models::equipment::Equipment,
            crate::models::equipment::Attachment,
            crate::models::equipment::CreateEquipment,
            crate::models::equipment::CreateAttachment,
            crate::models::equipment::UpdateEquipment,
            // Service requests
            crate::models::service_request::ServiceRequest,
            crate::models::service_request::UserServiceRequest,
            crate::models::service_request::ServiceRequestEquipment,
            crate::models::service_request::CreateServiceRequest,
            crate::models::service_request::AssignUser,
            crate::models::service_request::AttachEquipment,
            // Users
            crate::models::user::User,
            crate::models::user::CreateUser,
            crate::models::user::UpdateUser,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "lookups", description = "Customers, roles, job types, security levels and inspection methods"),
        (name = "equipment", description = "Equipment trees and components"),
        (name = "service-requests", description = "Service requests and their assignments"),
        (name = "users", description = "User management")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
