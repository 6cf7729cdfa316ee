//! Equipment service: tree-shaped bulk create, bulk update, cascading delete
//! and component management

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        bulk::{BulkResult, RejectReason},
        equipment::{CreateEquipment, Equipment, UpdateEquipment},
    },
    repository::{EquipmentStore, NamedEntityStore, UserStore},
};

use super::{
    check_batch_size,
    conflicts::{ConflictDetector, KeyIndex},
    hierarchy,
};

#[derive(Clone)]
pub struct EquipmentService {
    store: Arc<dyn EquipmentStore>,
    security_levels: Arc<dyn NamedEntityStore>,
    inspection_methods: Arc<dyn NamedEntityStore>,
    users: Arc<dyn UserStore>,
    detector: ConflictDetector,
    max_batch_size: usize,
}

impl EquipmentService {
    pub fn new(
        store: Arc<dyn EquipmentStore>,
        security_levels: Arc<dyn NamedEntityStore>,
        inspection_methods: Arc<dyn NamedEntityStore>,
        users: Arc<dyn UserStore>,
        detector: ConflictDetector,
        max_batch_size: usize,
    ) -> Self {
        Self {
            store,
            security_levels,
            inspection_methods,
            users,
            detector,
            max_batch_size,
        }
    }

    /// Every root with its components assembled
    pub async fn list(&self) -> AppResult<Vec<Equipment>> {
        let nodes = self.store.get_all().await?;
        Ok(hierarchy::assemble_forest(nodes))
    }

    /// A node with its components assembled
    pub async fn get_tree(&self, id: Uuid) -> AppResult<Equipment> {
        let nodes = self.store.get_subtree(id).await?;
        hierarchy::assemble(id, nodes)
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    /// Create a batch of trees. A root is rejected when any serial number in
    /// its subtree repeats within the batch or is already persisted, or when
    /// any node references a missing security level, executor or inspection
    /// method. All admitted trees are flattened and inserted in one call.
    pub async fn create_bulk(
        &self,
        items: Vec<CreateEquipment>,
    ) -> AppResult<BulkResult<Equipment, CreateEquipment>> {
        check_batch_size(items.len(), self.max_batch_size)?;
        let mut result = BulkResult::new();
        if items.is_empty() {
            return Ok(result);
        }

        let persisted = self.store.get_all().await?;
        let classification = self.detector.classify(
            items,
            persisted.iter().filter_map(|e| e.serial_number.as_deref()),
        );

        for (item, reason) in classification.rejected {
            tracing::debug!("Equipment '{}' rejected: {}", item.name, reason);
            result.push_failure(item, reason);
        }

        let now = Utc::now();
        let mut admitted: Vec<(CreateEquipment, Equipment)> = Vec::new();
        for item in classification.admitted {
            if let Some(reference) = self.missing_reference(&item).await? {
                tracing::debug!("Equipment '{}' rejected: {} not found", item.name, reference);
                result.push_failure(item, RejectReason::InvalidReference(reference));
                continue;
            }
            let tree = hierarchy::build_tree(&item, None, now);
            admitted.push((item, tree));
        }

        if !admitted.is_empty() {
            let flat = hierarchy::flatten(admitted.iter().map(|(_, tree)| tree.clone()));
            let node_count = flat.len();

            match self.store.create_bulk(&flat).await {
                Ok(()) => {
                    tracing::debug!("Inserted {} equipment nodes", node_count);
                    for (_, tree) in admitted {
                        result.push_success(tree);
                    }
                }
                Err(e) => {
                    tracing::error!("Equipment bulk insert failed: {}", e);
                    let message = e.to_string();
                    for (item, _) in admitted {
                        result.push_failure(item, RejectReason::Store(message.clone()));
                    }
                }
            }
        }

        tracing::info!(
            "Equipment bulk create: {} created, {} rejected",
            result.succeeded().len(),
            result.failed().len()
        );
        Ok(result)
    }

    /// Update a batch of nodes in order; serial number changes are checked
    /// against the working set of serials, excluding the node itself.
    pub async fn update_bulk(
        &self,
        items: Vec<UpdateEquipment>,
    ) -> AppResult<BulkResult<Equipment, UpdateEquipment>> {
        check_batch_size(items.len(), self.max_batch_size)?;
        let mut result = BulkResult::new();
        if items.is_empty() {
            return Ok(result);
        }

        let mut index = self.detector.index::<Uuid>();
        for node in self.store.get_all().await? {
            if let Some(ref serial) = node.serial_number {
                index.set(node.id, serial);
            }
        }

        let now = Utc::now();
        let mut seen_ids = HashSet::new();
        let mut admitted: Vec<(UpdateEquipment, Equipment)> = Vec::new();

        for item in items {
            if !seen_ids.insert(item.id) {
                result.push_failure(item, RejectReason::DuplicateInBatch);
                continue;
            }

            match self.stage_update(&item, &mut index, now).await? {
                Ok(node) => admitted.push((item, node)),
                Err(reason) => {
                    tracing::debug!("Equipment {} update rejected: {}", item.id, reason);
                    result.push_failure(item, reason);
                }
            }
        }

        if !admitted.is_empty() {
            let nodes: Vec<Equipment> = admitted.iter().map(|(_, node)| node.clone()).collect();
            match self.store.update_bulk(&nodes).await {
                Ok(updated) => {
                    for node in updated {
                        result.push_success(node);
                    }
                }
                Err(e) => {
                    tracing::error!("Equipment bulk update failed: {}", e);
                    let message = e.to_string();
                    for (item, _) in admitted {
                        result.push_failure(item, RejectReason::Store(message.clone()));
                    }
                }
            }
        }

        tracing::info!(
            "Equipment bulk update: {} updated, {} rejected",
            result.succeeded().len(),
            result.failed().len()
        );
        Ok(result)
    }

    /// Delete each id with its whole subtree. Missing ids and store failures
    /// are reported per item without stopping the batch.
    pub async fn delete_bulk(&self, ids: Vec<Uuid>) -> AppResult<BulkResult<Equipment, Uuid>> {
        check_batch_size(ids.len(), self.max_batch_size)?;
        let mut result = BulkResult::new();

        for id in ids {
            match self.cascade_delete(id).await {
                Ok(Some(tree)) => result.push_success(tree),
                Ok(None) => result.push_failure(id, RejectReason::NotFound),
                Err(e) => {
                    tracing::warn!("Equipment {} delete failed: {}", id, e);
                    result.push_failure(id, RejectReason::Store(e.to_string()));
                }
            }
        }

        tracing::info!(
            "Equipment bulk delete: {} deleted, {} failed",
            result.succeeded().len(),
            result.failed().len()
        );
        Ok(result)
    }

    /// Delete a node and its subtree, returning what was removed
    pub async fn delete(&self, id: Uuid) -> AppResult<Equipment> {
        self.cascade_delete(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    /// Create a (possibly nested) component under an existing node
    pub async fn add_component(&self, parent_id: Uuid, data: CreateEquipment) -> AppResult<Equipment> {
        if self.store.get_by_id(parent_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Equipment {} not found", parent_id)));
        }

        let persisted = self.store.get_all().await?;
        let classification = self.detector.classify(
            vec![&data],
            persisted.iter().filter_map(|e| e.serial_number.as_deref()),
        );
        if let Some((_, reason)) = classification.rejected.first() {
            return Err(AppError::Conflict(format!(
                "Component '{}' serial number {}",
                data.name, reason
            )));
        }

        if let Some(reference) = self.missing_reference(&data).await? {
            return Err(AppError::InvalidReference(format!("{} not found", reference)));
        }

        let tree = hierarchy::build_tree(&data, Some(parent_id), Utc::now());
        self.store
            .create_bulk(&hierarchy::flatten(vec![tree.clone()]))
            .await?;

        tracing::info!("Component {} added under {}", tree.id, parent_id);
        Ok(tree)
    }

    /// A direct component of `parent_id`, with its own components
    pub async fn get_component(&self, parent_id: Uuid, component_id: Uuid) -> AppResult<Equipment> {
        self.ensure_component_of(parent_id, component_id).await?;
        self.get_tree(component_id).await
    }

    /// Remove a direct component of `parent_id` and its subtree
    pub async fn remove_component(&self, parent_id: Uuid, component_id: Uuid) -> AppResult<Equipment> {
        self.ensure_component_of(parent_id, component_id).await?;
        let removed = self.delete(component_id).await?;
        tracing::info!("Component {} removed from {}", component_id, parent_id);
        Ok(removed)
    }

    async fn ensure_component_of(&self, parent_id: Uuid, component_id: Uuid) -> AppResult<()> {
        let component = self
            .store
            .get_by_id(component_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", component_id)))?;

        if component.parent_id != Some(parent_id) {
            return Err(AppError::NotFound(format!(
                "Equipment {} is not a component of {}",
                component_id, parent_id
            )));
        }
        Ok(())
    }

    /// Collect the subtree ids first, then remove them children-first in one
    /// store call. `None` when `id` does not exist.
    async fn cascade_delete(&self, id: Uuid) -> AppResult<Option<Equipment>> {
        let subtree = self.store.get_subtree(id).await?;
        if subtree.is_empty() {
            return Ok(None);
        }

        let order = hierarchy::deletion_order(id, &subtree);
        let tree = hierarchy::assemble(id, subtree);
        self.store.delete_subtree(&order).await?;

        tracing::debug!("Equipment {} deleted with {} nodes", id, order.len());
        Ok(tree)
    }

    async fn stage_update(
        &self,
        item: &UpdateEquipment,
        index: &mut KeyIndex<Uuid>,
        now: DateTime<Utc>,
    ) -> AppResult<Result<Equipment, RejectReason>> {
        let mut node = match self.store.get_by_id(item.id).await? {
            Some(node) => node,
            None => return Ok(Err(RejectReason::NotFound)),
        };

        let new_serial = match item.serial_number {
            Some(ref serial) if index.changes(serial, &node.id) => {
                if index.is_taken(serial, &node.id) {
                    return Ok(Err(RejectReason::AlreadyExists));
                }
                Some(serial.as_str())
            }
            _ => None,
        };

        if let Some(id) = item.security_level_id {
            if self.security_levels.get_by_id(id).await?.is_none() {
                return Ok(Err(RejectReason::InvalidReference(format!("security level {}", id))));
            }
        }
        if let Some(id) = item.executor_id {
            if !self.is_live_user(id).await? {
                return Ok(Err(RejectReason::InvalidReference(format!("executor {}", id))));
            }
        }

        // Claimed only once the item is admitted
        if let Some(serial) = new_serial {
            index.set(node.id, serial);
        }

        item.merge_into(&mut node);
        node.updated_at = Some(now);
        Ok(Ok(node))
    }

    /// First reference of the subtree that does not resolve, described for
    /// the rejection reason
    async fn missing_reference(&self, data: &CreateEquipment) -> AppResult<Option<String>> {
        let mut nodes = Vec::new();
        data.walk(&mut |node| nodes.push(node));

        for node in nodes {
            if let Some(id) = node.security_level_id {
                if self.security_levels.get_by_id(id).await?.is_none() {
                    return Ok(Some(format!("security level {}", id)));
                }
            }
            if let Some(id) = node.executor_id {
                if !self.is_live_user(id).await? {
                    return Ok(Some(format!("executor {}", id)));
                }
            }
            for id in &node.inspection_method_ids {
                if self.inspection_methods.get_by_id(*id).await?.is_none() {
                    return Ok(Some(format!("inspection method {}", id)));
                }
            }
        }
        Ok(None)
    }

    async fn is_live_user(&self, id: i32) -> AppResult<bool> {
        Ok(self
            .users
            .get_by_id(id)
            .await?
            .map(|user| user.is_alive)
            .unwrap_or(false))
    }
}
