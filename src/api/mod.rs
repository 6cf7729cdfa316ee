//! API handlers for the field service REST endpoints

pub mod equipment;
pub mod health;
pub mod named;
pub mod openapi;
pub mod service_requests;
pub mod users;

use axum::{
    routing::{delete, get, post},
    Extension, Router,
};
use validator::Validate;

use crate::{error::AppResult, models::named::EntityKind, AppState};

/// Every `/api/v1` route, state attached
pub fn routes(state: AppState) -> Router {
    let mut router = Router::new()
        // Health
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Equipment
        .route("/equipment", get(equipment::list_equipment))
        .route(
            "/equipment/bulk",
            post(equipment::create_bulk)
                .put(equipment::update_bulk)
                .delete(equipment::delete_bulk),
        )
        .route(
            "/equipment/:id",
            get(equipment::get_equipment).delete(equipment::delete_equipment),
        )
        .route("/equipment/:id/components", post(equipment::add_component))
        .route(
            "/equipment/:id/components/:component_id",
            get(equipment::get_component).delete(equipment::remove_component),
        )
        // Service requests
        .route("/service-requests", get(service_requests::list_requests))
        .route(
            "/service-requests/bulk",
            post(service_requests::create_bulk).delete(service_requests::delete_bulk),
        )
        .route("/service-requests/:id", get(service_requests::get_request))
        .route("/service-requests/:id/assignees", post(service_requests::assign_user))
        .route(
            "/service-requests/:id/assignees/:user_id",
            delete(service_requests::unassign_user),
        )
        .route("/service-requests/:id/equipment", post(service_requests::attach_equipment))
        .route(
            "/service-requests/:id/equipment/:equipment_id",
            delete(service_requests::detach_equipment),
        )
        .route("/service-requests/:id/complete", post(service_requests::complete))
        // Users
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::deactivate_user),
        );

    // Lookup tables share one set of handlers, told apart by the kind extension
    for kind in EntityKind::ALL {
        router = router.nest(
            &format!("/{}", kind.slug()),
            named::routes().layer(Extension(kind)),
        );
    }

    router.with_state(state)
}

/// Validate every item of a batch, failing on the first invalid one
pub(crate) fn validate_batch<T: Validate>(items: &[T]) -> AppResult<()> {
    for item in items {
        item.validate()?;
    }
    Ok(())
}
