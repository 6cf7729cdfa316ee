//! Business logic services

pub mod assignments;
pub mod conflicts;
pub mod equipment;
pub mod hierarchy;
pub mod named;
pub mod service_requests;
pub mod users;

#[cfg(test)]
pub(crate) mod testing;

use crate::{
    config::BulkConfig,
    error::{AppError, AppResult},
    models::named::EntityKind,
    repository::Stores,
};

use conflicts::ConflictDetector;

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub customers: named::NamedEntityService,
    pub roles: named::NamedEntityService,
    pub job_types: named::NamedEntityService,
    pub security_levels: named::NamedEntityService,
    pub inspection_methods: named::NamedEntityService,
    pub equipment: equipment::EquipmentService,
    pub service_requests: service_requests::ServiceRequestService,
    pub users: users::UsersService,
}

impl Services {
    /// Create all services over the given stores
    pub fn new(stores: Stores, bulk: &BulkConfig) -> Self {
        let detector = ConflictDetector::new(bulk.key_matching);
        let max = bulk.max_batch_size;
        let named = |kind: EntityKind| named::NamedEntityService::new(kind, stores.named(kind), detector, max);

        Self {
            customers: named(EntityKind::Customers),
            roles: named(EntityKind::Roles),
            job_types: named(EntityKind::JobTypes),
            security_levels: named(EntityKind::SecurityLevels),
            inspection_methods: named(EntityKind::InspectionMethods),
            equipment: equipment::EquipmentService::new(
                stores.equipment.clone(),
                stores.security_levels.clone(),
                stores.inspection_methods.clone(),
                stores.users.clone(),
                detector,
                max,
            ),
            service_requests: service_requests::ServiceRequestService::new(
                stores.service_requests.clone(),
                stores.customers.clone(),
                stores.job_types.clone(),
                stores.users.clone(),
                stores.equipment.clone(),
                detector,
                max,
            ),
            users: users::UsersService::new(stores.users.clone()),
        }
    }

    pub fn named(&self, kind: EntityKind) -> &named::NamedEntityService {
        match kind {
            EntityKind::Customers => &self.customers,
            EntityKind::Roles => &self.roles,
            EntityKind::JobTypes => &self.job_types,
            EntityKind::SecurityLevels => &self.security_levels,
            EntityKind::InspectionMethods => &self.inspection_methods,
        }
    }
}

/// Refuse a batch larger than the configured limit before touching the store
pub(crate) fn check_batch_size(len: usize, max: usize) -> AppResult<()> {
    if len > max {
        return Err(AppError::Validation(format!(
            "Batch of {} items exceeds the limit of {}",
            len, max
        )));
    }
    Ok(())
}
