//! In-memory store implementations backing the service tests

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    config::BulkConfig,
    error::{AppError, AppResult},
    models::{
        equipment::Equipment,
        named::{CreateNamedEntity, EntityKind, NamedEntity, NewNamedEntity},
        service_request::{NewServiceRequest, ServiceRequest},
        user::{CreateUser, NewUser, User},
    },
    repository::{EquipmentStore, NamedEntityStore, ServiceRequestStore, Stores, UserStore},
};

use super::Services;

#[derive(Default)]
pub struct MemoryNamedStore {
    rows: Mutex<Vec<NamedEntity>>,
    next_id: Mutex<i32>,
}

impl MemoryNamedStore {
    fn next_id(&self) -> i32 {
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        *next
    }
}

#[async_trait]
impl NamedEntityStore for MemoryNamedStore {
    async fn get_by_id(&self, id: i32) -> AppResult<Option<NamedEntity>> {
        Ok(self.rows.lock().unwrap().iter().find(|e| e.id == id).cloned())
    }

    async fn get_by_key(&self, name: &str) -> AppResult<Option<NamedEntity>> {
        Ok(self.rows.lock().unwrap().iter().find(|e| e.name == name).cloned())
    }

    async fn get_all(&self) -> AppResult<Vec<NamedEntity>> {
        Ok(self.rows.lock().unwrap().clone())
    }

    async fn create(&self, entity: &NewNamedEntity) -> AppResult<NamedEntity> {
        let mut created = self.create_bulk(std::slice::from_ref(entity)).await?;
        Ok(created.remove(0))
    }

    async fn create_bulk(&self, entities: &[NewNamedEntity]) -> AppResult<Vec<NamedEntity>> {
        let created: Vec<NamedEntity> = entities
            .iter()
            .map(|new| NamedEntity {
                id: self.next_id(),
                name: new.name.clone(),
                description: new.description.clone(),
                created_at: new.created_at,
                updated_at: None,
            })
            .collect();
        self.rows.lock().unwrap().extend(created.iter().cloned());
        Ok(created)
    }

    async fn update(&self, entity: &NamedEntity) -> AppResult<NamedEntity> {
        let mut updated = self.update_bulk(std::slice::from_ref(entity)).await?;
        Ok(updated.remove(0))
    }

    async fn update_bulk(&self, entities: &[NamedEntity]) -> AppResult<Vec<NamedEntity>> {
        let mut rows = self.rows.lock().unwrap();
        for entity in entities {
            if !rows.iter().any(|row| row.id == entity.id) {
                return Err(AppError::NotFound(format!("row {} not found", entity.id)));
            }
        }
        for entity in entities {
            if let Some(row) = rows.iter_mut().find(|row| row.id == entity.id) {
                *row = entity.clone();
            }
        }
        Ok(entities.to_vec())
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|row| row.id != id);
        if rows.len() == before {
            return Err(AppError::NotFound(format!("row {} not found", id)));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryEquipmentStore {
    nodes: Mutex<Vec<Equipment>>,
}

#[async_trait]
impl EquipmentStore for MemoryEquipmentStore {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Equipment>> {
        Ok(self.nodes.lock().unwrap().iter().find(|n| n.id == id).cloned())
    }

    async fn get_all(&self) -> AppResult<Vec<Equipment>> {
        Ok(self.nodes.lock().unwrap().clone())
    }

    async fn get_subtree(&self, id: Uuid) -> AppResult<Vec<Equipment>> {
        let nodes = self.nodes.lock().unwrap();
        let mut subtree: Vec<Equipment> = nodes.iter().filter(|n| n.id == id).cloned().collect();
        let mut frontier: HashSet<Uuid> = subtree.iter().map(|n| n.id).collect();

        while !frontier.is_empty() {
            let children: Vec<Equipment> = nodes
                .iter()
                .filter(|n| n.parent_id.map_or(false, |p| frontier.contains(&p)))
                .cloned()
                .collect();
            frontier = children.iter().map(|n| n.id).collect();
            subtree.extend(children);
        }
        Ok(subtree)
    }

    async fn create_bulk(&self, nodes: &[Equipment]) -> AppResult<()> {
        let mut stored = self.nodes.lock().unwrap();
        for node in nodes {
            if let Some(parent) = node.parent_id {
                let known = stored.iter().chain(nodes.iter()).any(|n| n.id == parent);
                if !known {
                    return Err(AppError::InvalidReference(format!("parent {} not found", parent)));
                }
            }
        }
        stored.extend(nodes.iter().cloned());
        Ok(())
    }

    async fn update_bulk(&self, nodes: &[Equipment]) -> AppResult<Vec<Equipment>> {
        let mut stored = self.nodes.lock().unwrap();
        for node in nodes {
            if let Some(row) = stored.iter_mut().find(|n| n.id == node.id) {
                *row = node.clone();
            }
        }
        Ok(nodes.to_vec())
    }

    async fn delete_subtree(&self, ids: &[Uuid]) -> AppResult<()> {
        let mut stored = self.nodes.lock().unwrap();
        for id in ids {
            if !stored.iter().any(|n| n.id == *id) {
                return Err(AppError::NotFound(format!("Equipment {} not found", id)));
            }
        }
        stored.retain(|n| !ids.contains(&n.id));
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryServiceRequestStore {
    rows: Mutex<Vec<ServiceRequest>>,
    next_id: Mutex<i32>,
}

#[async_trait]
impl ServiceRequestStore for MemoryServiceRequestStore {
    async fn get_by_id(&self, id: i32) -> AppResult<Option<ServiceRequest>> {
        Ok(self.rows.lock().unwrap().iter().find(|r| r.id == id).cloned())
    }

    async fn get_all(&self) -> AppResult<Vec<ServiceRequest>> {
        Ok(self.rows.lock().unwrap().clone())
    }

    async fn create_bulk(&self, requests: &[NewServiceRequest]) -> AppResult<Vec<ServiceRequest>> {
        let mut next_id = self.next_id.lock().unwrap();
        let created: Vec<ServiceRequest> = requests
            .iter()
            .map(|new| {
                *next_id += 1;
                ServiceRequest {
                    id: *next_id,
                    contract_id: new.contract_id.clone(),
                    customer_id: new.customer_id,
                    job_type_id: new.job_type_id,
                    description: new.description.clone(),
                    is_completed: false,
                    completed_at: None,
                    created_at: new.created_at,
                    updated_at: None,
                    assignees: new.assignees.clone(),
                    equipment: new.equipment.clone(),
                }
            })
            .collect();
        self.rows.lock().unwrap().extend(created.iter().cloned());
        Ok(created)
    }

    async fn update(&self, request: &ServiceRequest) -> AppResult<ServiceRequest> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|r| r.id == request.id)
            .ok_or_else(|| AppError::NotFound(format!("Service request {} not found", request.id)))?;
        *row = request.clone();
        Ok(request.clone())
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| r.id != id);
        if rows.len() == before {
            return Err(AppError::NotFound(format!("Service request {} not found", id)));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryUserStore {
    rows: Mutex<Vec<User>>,
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get_by_id(&self, id: i32) -> AppResult<Option<User>> {
        Ok(self.rows.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn get_by_login(&self, login: &str) -> AppResult<Option<User>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.login.eq_ignore_ascii_case(login))
            .cloned())
    }

    async fn get_all(&self) -> AppResult<Vec<User>> {
        Ok(self.rows.lock().unwrap().clone())
    }

    async fn create(&self, user: &NewUser) -> AppResult<User> {
        let mut rows = self.rows.lock().unwrap();
        let created = User {
            id: rows.len() as i32 + 1,
            login: user.login.clone(),
            display_name: user.display_name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            is_alive: true,
            created_at: user.created_at,
            updated_at: None,
        };
        rows.push(created.clone());
        Ok(created)
    }

    async fn update(&self, user: &User) -> AppResult<User> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", user.id)))?;
        *row = user.clone();
        Ok(user.clone())
    }
}

/// A fresh, empty set of in-memory stores
pub fn memory_stores() -> Stores {
    Stores {
        customers: Arc::new(MemoryNamedStore::default()),
        roles: Arc::new(MemoryNamedStore::default()),
        job_types: Arc::new(MemoryNamedStore::default()),
        security_levels: Arc::new(MemoryNamedStore::default()),
        inspection_methods: Arc::new(MemoryNamedStore::default()),
        equipment: Arc::new(MemoryEquipmentStore::default()),
        service_requests: Arc::new(MemoryServiceRequestStore::default()),
        users: Arc::new(MemoryUserStore::default()),
    }
}

/// Services over empty in-memory stores, default bulk settings
pub fn memory_services() -> Services {
    Services::new(memory_stores(), &BulkConfig::default())
}

/// Insert a named entity of `kind`, returning its id
pub async fn seed_named(services: &Services, kind: EntityKind, name: &str) -> i32 {
    services
        .named(kind)
        .create(CreateNamedEntity {
            name: name.to_string(),
            description: None,
        })
        .await
        .unwrap()
        .id
}

/// Insert a live user, returning their id
pub async fn seed_user(services: &Services, login: &str) -> i32 {
    services
        .users
        .create(CreateUser {
            login: login.to_string(),
            display_name: None,
            email: None,
            phone: None,
        })
        .await
        .unwrap()
        .id
}
