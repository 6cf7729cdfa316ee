//! Repository layer for database operations.
//!
//! Each submodule declares the store port the services depend on and its
//! PostgreSQL implementation.

pub mod equipment;
pub mod named;
pub mod service_requests;
pub mod users;

use std::sync::Arc;

use sqlx::{Pool, Postgres};

use crate::models::named::EntityKind;

pub use equipment::EquipmentStore;
pub use named::NamedEntityStore;
pub use service_requests::ServiceRequestStore;
pub use users::UserStore;

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub customers: named::NamedEntityRepository,
    pub roles: named::NamedEntityRepository,
    pub job_types: named::NamedEntityRepository,
    pub security_levels: named::NamedEntityRepository,
    pub inspection_methods: named::NamedEntityRepository,
    pub equipment: equipment::EquipmentRepository,
    pub service_requests: service_requests::ServiceRequestsRepository,
    pub users: users::UsersRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            customers: named::NamedEntityRepository::new(pool.clone(), EntityKind::Customers),
            roles: named::NamedEntityRepository::new(pool.clone(), EntityKind::Roles),
            job_types: named::NamedEntityRepository::new(pool.clone(), EntityKind::JobTypes),
            security_levels: named::NamedEntityRepository::new(pool.clone(), EntityKind::SecurityLevels),
            inspection_methods: named::NamedEntityRepository::new(pool.clone(), EntityKind::InspectionMethods),
            equipment: equipment::EquipmentRepository::new(pool.clone()),
            service_requests: service_requests::ServiceRequestsRepository::new(pool.clone()),
            users: users::UsersRepository::new(pool),
        }
    }

    /// Erase the concrete repositories behind their store ports
    pub fn stores(&self) -> Stores {
        Stores {
            customers: Arc::new(self.customers.clone()),
            roles: Arc::new(self.roles.clone()),
            job_types: Arc::new(self.job_types.clone()),
            security_levels: Arc::new(self.security_levels.clone()),
            inspection_methods: Arc::new(self.inspection_methods.clone()),
            equipment: Arc::new(self.equipment.clone()),
            service_requests: Arc::new(self.service_requests.clone()),
            users: Arc::new(self.users.clone()),
        }
    }
}

/// One handle per store port, as consumed by the services
#[derive(Clone)]
pub struct Stores {
    pub customers: Arc<dyn NamedEntityStore>,
    pub roles: Arc<dyn NamedEntityStore>,
    pub job_types: Arc<dyn NamedEntityStore>,
    pub security_levels: Arc<dyn NamedEntityStore>,
    pub inspection_methods: Arc<dyn NamedEntityStore>,
    pub equipment: Arc<dyn EquipmentStore>,
    pub service_requests: Arc<dyn ServiceRequestStore>,
    pub users: Arc<dyn UserStore>,
}

impl Stores {
    pub fn named(&self, kind: EntityKind) -> Arc<dyn NamedEntityStore> {
        match kind {
            EntityKind::Customers => self.customers.clone(),
            EntityKind::Roles => self.roles.clone(),
            EntityKind::JobTypes => self.job_types.clone(),
            EntityKind::SecurityLevels => self.security_levels.clone(),
            EntityKind::InspectionMethods => self.inspection_methods.clone(),
        }
    }
}
