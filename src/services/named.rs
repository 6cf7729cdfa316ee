//! Bulk create/update/delete for named lookup entities

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    error::{AppError, AppResult},
    models::{
        bulk::{BulkResult, RejectReason},
        named::{CreateNamedEntity, EntityKind, NamedEntity, NewNamedEntity, UpdateNamedEntity},
    },
    repository::NamedEntityStore,
};

use super::{
    check_batch_size,
    conflicts::{ConflictDetector, KeyIndex, KeyMatching},
};

#[derive(Clone)]
pub struct NamedEntityService {
    kind: EntityKind,
    store: Arc<dyn NamedEntityStore>,
    detector: ConflictDetector,
    max_batch_size: usize,
}

impl NamedEntityService {
    pub fn new(
        kind: EntityKind,
        store: Arc<dyn NamedEntityStore>,
        detector: ConflictDetector,
        max_batch_size: usize,
    ) -> Self {
        Self {
            kind,
            store,
            detector,
            max_batch_size,
        }
    }

    pub async fn list(&self) -> AppResult<Vec<NamedEntity>> {
        self.store.get_all().await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<NamedEntity> {
        self.store
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {} not found", self.kind, id)))
    }

    /// Find by name, compared with the configured key matching
    pub async fn get_by_name(&self, name: &str) -> AppResult<NamedEntity> {
        let found = match self.detector.matching() {
            KeyMatching::Exact => self.store.get_by_key(name).await?,
            matching => {
                let key = matching.normalize(name);
                self.store
                    .get_all()
                    .await?
                    .into_iter()
                    .find(|entity| matching.normalize(&entity.name) == key)
            }
        };
        found.ok_or_else(|| AppError::NotFound(format!("{} '{}' not found", self.kind, name)))
    }

    /// Create a single entity; a name collision is a `Conflict` error
    pub async fn create(&self, data: CreateNamedEntity) -> AppResult<NamedEntity> {
        let persisted = self.store.get_all().await?;
        let classification = self
            .detector
            .classify(vec![&data], persisted.iter().map(|e| e.name.as_str()));

        if let Some((_, reason)) = classification.rejected.first() {
            return Err(AppError::Conflict(format!("{} '{}' {}", self.kind, data.name, reason)));
        }

        let entity = self
            .store
            .create(&NewNamedEntity::from_request(&data, Utc::now()))
            .await?;
        tracing::info!("{} {} created", self.kind, entity.id);
        Ok(entity)
    }

    /// Update a single entity; reported as `NotFound` or `Conflict` errors
    pub async fn update(&self, data: UpdateNamedEntity) -> AppResult<NamedEntity> {
        let mut index = self.key_index().await?;
        match self.stage_update(&data, &mut index, Utc::now()).await? {
            Ok(entity) => self.store.update(&entity).await,
            Err(RejectReason::NotFound) => Err(AppError::NotFound(format!(
                "{} {} not found",
                self.kind, data.id
            ))),
            Err(reason) => Err(AppError::Conflict(format!(
                "{} '{}' {}",
                self.kind,
                data.name.unwrap_or_default(),
                reason
            ))),
        }
    }

    /// Create a batch. Intra-batch duplicates and names already persisted are
    /// rejected per item; the admitted subset is written in one store call,
    /// and a failure of that call fails every admitted item with its message.
    pub async fn create_bulk(
        &self,
        items: Vec<CreateNamedEntity>,
    ) -> AppResult<BulkResult<NamedEntity, CreateNamedEntity>> {
        self.check_batch_size(items.len())?;
        let mut result = BulkResult::new();
        if items.is_empty() {
            return Ok(result);
        }

        let persisted = self.store.get_all().await?;
        let classification = self
            .detector
            .classify(items, persisted.iter().map(|e| e.name.as_str()));

        for (item, reason) in classification.rejected {
            tracing::debug!("{} '{}' rejected: {}", self.kind, item.name, reason);
            result.push_failure(item, reason);
        }

        if !classification.admitted.is_empty() {
            let now = Utc::now();
            let new: Vec<NewNamedEntity> = classification
                .admitted
                .iter()
                .map(|item| NewNamedEntity::from_request(item, now))
                .collect();

            match self.store.create_bulk(&new).await {
                Ok(created) => {
                    for entity in created {
                        result.push_success(entity);
                    }
                }
                Err(e) => {
                    tracing::error!("{} bulk insert failed: {}", self.kind, e);
                    let message = e.to_string();
                    for item in classification.admitted {
                        result.push_failure(item, RejectReason::Store(message.clone()));
                    }
                }
            }
        }

        tracing::info!(
            "{} bulk create: {} created, {} rejected",
            self.kind,
            result.succeeded().len(),
            result.failed().len()
        );
        Ok(result)
    }

    /// Update a batch. Items are checked in order against a working copy of
    /// the persisted names, so a rename claimed by an earlier item blocks a
    /// later one. Admitted changes are written in one store call.
    pub async fn update_bulk(
        &self,
        items: Vec<UpdateNamedEntity>,
    ) -> AppResult<BulkResult<NamedEntity, UpdateNamedEntity>> {
        self.check_batch_size(items.len())?;
        let mut result = BulkResult::new();
        if items.is_empty() {
            return Ok(result);
        }

        let mut index = self.key_index().await?;
        let now = Utc::now();
        let mut seen_ids = HashSet::new();
        let mut admitted: Vec<(UpdateNamedEntity, NamedEntity)> = Vec::new();

        for item in items {
            if !seen_ids.insert(item.id) {
                result.push_failure(item, RejectReason::DuplicateInBatch);
                continue;
            }

            match self.stage_update(&item, &mut index, now).await? {
                Ok(entity) => admitted.push((item, entity)),
                Err(reason) => {
                    tracing::debug!("{} {} update rejected: {}", self.kind, item.id, reason);
                    result.push_failure(item, reason);
                }
            }
        }

        if !admitted.is_empty() {
            let entities: Vec<NamedEntity> = admitted.iter().map(|(_, e)| e.clone()).collect();
            match self.store.update_bulk(&entities).await {
                Ok(updated) => {
                    for entity in updated {
                        result.push_success(entity);
                    }
                }
                Err(e) => {
                    tracing::error!("{} bulk update failed: {}", self.kind, e);
                    let message = e.to_string();
                    for (item, _) in admitted {
                        result.push_failure(item, RejectReason::Store(message.clone()));
                    }
                }
            }
        }

        tracing::info!(
            "{} bulk update: {} updated, {} rejected",
            self.kind,
            result.succeeded().len(),
            result.failed().len()
        );
        Ok(result)
    }

    /// Delete a batch of ids, one at a time. Missing ids and store failures
    /// are reported per item; the remaining ids are still processed.
    pub async fn delete_bulk(&self, ids: Vec<i32>) -> AppResult<BulkResult<NamedEntity, i32>> {
        self.check_batch_size(ids.len())?;
        let mut result = BulkResult::new();

        for id in ids {
            let entity = match self.store.get_by_id(id).await {
                Ok(Some(entity)) => entity,
                Ok(None) => {
                    result.push_failure(id, RejectReason::NotFound);
                    continue;
                }
                Err(e) => {
                    tracing::warn!("{} {} lookup failed: {}", self.kind, id, e);
                    result.push_failure(id, RejectReason::Store(e.to_string()));
                    continue;
                }
            };

            match self.store.delete(id).await {
                Ok(()) => result.push_success(entity),
                Err(e) => {
                    tracing::warn!("{} {} delete failed: {}", self.kind, id, e);
                    result.push_failure(id, RejectReason::Store(e.to_string()));
                }
            }
        }

        tracing::info!(
            "{} bulk delete: {} deleted, {} failed",
            self.kind,
            result.succeeded().len(),
            result.failed().len()
        );
        Ok(result)
    }

    /// Persisted names keyed by id
    async fn key_index(&self) -> AppResult<KeyIndex<i32>> {
        let mut index = self.detector.index::<i32>();
        for entity in self.store.get_all().await? {
            index.set(entity.id, &entity.name);
        }
        Ok(index)
    }

    /// Resolve the target of `item` and apply its changes in memory. A new
    /// name is checked against every other record's current name, then
    /// claimed in `index`.
    async fn stage_update(
        &self,
        item: &UpdateNamedEntity,
        index: &mut KeyIndex<i32>,
        now: DateTime<Utc>,
    ) -> AppResult<Result<NamedEntity, RejectReason>> {
        let mut entity = match self.store.get_by_id(item.id).await? {
            Some(entity) => entity,
            None => return Ok(Err(RejectReason::NotFound)),
        };

        if let Some(ref name) = item.name {
            if index.changes(name, &entity.id) {
                if index.is_taken(name, &entity.id) {
                    return Ok(Err(RejectReason::AlreadyExists));
                }
                index.set(entity.id, name);
            }
        }

        item.merge_into(&mut entity);
        entity.updated_at = Some(now);
        Ok(Ok(entity))
    }

    fn check_batch_size(&self, len: usize) -> AppResult<()> {
        check_batch_size(len, self.max_batch_size)
    }
}
