//! Service requests: all-or-nothing batch creation, per-item bulk delete and
//! user/equipment assignment

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        bulk::{BulkResult, RejectReason},
        service_request::{AssignUser, AttachEquipment, CreateServiceRequest, NewServiceRequest, ServiceRequest},
    },
    repository::{EquipmentStore, NamedEntityStore, ServiceRequestStore, UserStore},
};

use super::{assignments, check_batch_size, conflicts::ConflictDetector};

#[derive(Clone)]
pub struct ServiceRequestService {
    store: Arc<dyn ServiceRequestStore>,
    customers: Arc<dyn NamedEntityStore>,
    job_types: Arc<dyn NamedEntityStore>,
    users: Arc<dyn UserStore>,
    equipment: Arc<dyn EquipmentStore>,
    detector: ConflictDetector,
    max_batch_size: usize,
}

impl ServiceRequestService {
    pub fn new(
        store: Arc<dyn ServiceRequestStore>,
        customers: Arc<dyn NamedEntityStore>,
        job_types: Arc<dyn NamedEntityStore>,
        users: Arc<dyn UserStore>,
        equipment: Arc<dyn EquipmentStore>,
        detector: ConflictDetector,
        max_batch_size: usize,
    ) -> Self {
        Self {
            store,
            customers,
            job_types,
            users,
            equipment,
            detector,
            max_batch_size,
        }
    }

    pub async fn list(&self) -> AppResult<Vec<ServiceRequest>> {
        self.store.get_all().await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<ServiceRequest> {
        self.store
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Service request {} not found", id)))
    }

    /// Create a batch of requests with their initial links.
    ///
    /// Unlike other bulk creates this is all or nothing: a repeated or
    /// already persisted contract id, an unresolved reference, or more than
    /// one primary assignee in a request fails the whole call with the first
    /// problem found, and nothing is written.
    pub async fn create_bulk(&self, items: Vec<CreateServiceRequest>) -> AppResult<Vec<ServiceRequest>> {
        check_batch_size(items.len(), self.max_batch_size)?;
        if items.is_empty() {
            return Ok(Vec::new());
        }

        if let Some(contract_id) = self
            .detector
            .first_duplicate(items.iter().map(|item| item.contract_id.as_str()))
        {
            return Err(AppError::Conflict(format!(
                "Contract id '{}' appears more than once in the batch",
                contract_id
            )));
        }

        let persisted = self.store.get_all().await?;
        let classification = self.detector.classify(
            items.iter().collect::<Vec<_>>(),
            persisted.iter().map(|r| r.contract_id.as_str()),
        );
        if let Some((item, _)) = classification.rejected.first() {
            return Err(AppError::Conflict(format!(
                "Contract id '{}' already exists",
                item.contract_id
            )));
        }

        for item in &items {
            self.check_references(item).await?;

            if item.assignees.iter().filter(|user| user.is_primary).count() > 1 {
                return Err(AppError::Validation(format!(
                    "Service request '{}' has more than one primary assignee",
                    item.contract_id
                )));
            }
        }

        let now = Utc::now();
        let new: Vec<NewServiceRequest> = items
            .into_iter()
            .map(|item| {
                let mut assignees = Vec::new();
                for user in &item.assignees {
                    assignments::assign(&mut assignees, user.user_id, user.is_primary, now);
                }
                let mut equipment = Vec::new();
                for link in item.equipment {
                    assignments::attach(&mut equipment, link.equipment_id, link.notes, now);
                }

                NewServiceRequest {
                    contract_id: item.contract_id,
                    customer_id: item.customer_id,
                    job_type_id: item.job_type_id,
                    description: item.description,
                    created_at: now,
                    assignees,
                    equipment,
                }
            })
            .collect();

        let created = self.store.create_bulk(&new).await?;
        tracing::info!("Service request bulk create: {} created", created.len());
        Ok(created)
    }

    /// Delete a batch of ids, capturing each failure per item
    pub async fn delete_bulk(&self, ids: Vec<i32>) -> AppResult<BulkResult<ServiceRequest, i32>> {
        check_batch_size(ids.len(), self.max_batch_size)?;
        let mut result = BulkResult::new();

        for id in ids {
            let request = match self.store.get_by_id(id).await {
                Ok(Some(request)) => request,
                Ok(None) => {
                    result.push_failure(id, RejectReason::NotFound);
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Service request {} lookup failed: {}", id, e);
                    result.push_failure(id, RejectReason::Store(e.to_string()));
                    continue;
                }
            };

            match self.store.delete(id).await {
                Ok(()) => result.push_success(request),
                Err(e) => {
                    tracing::warn!("Service request {} delete failed: {}", id, e);
                    result.push_failure(id, RejectReason::Store(e.to_string()));
                }
            }
        }

        tracing::info!(
            "Service request bulk delete: {} deleted, {} failed",
            result.succeeded().len(),
            result.failed().len()
        );
        Ok(result)
    }

    /// Link a user; a primary assignment demotes any current primary
    pub async fn assign_user(&self, id: i32, data: AssignUser) -> AppResult<ServiceRequest> {
        let mut request = self.get_by_id(id).await?;
        if !self.is_live_user(data.user_id).await? {
            return Err(AppError::NotFound(format!("User {} not found", data.user_id)));
        }

        let now = Utc::now();
        assignments::assign(&mut request.assignees, data.user_id, data.is_primary, now);
        request.updated_at = Some(now);

        let request = self.store.update(&request).await?;
        tracing::info!(
            "User {} assigned to service request {} (primary: {})",
            data.user_id,
            id,
            data.is_primary
        );
        Ok(request)
    }

    /// Unlink a user. Unlinking a user who is not assigned changes nothing.
    pub async fn unassign_user(&self, id: i32, user_id: i32) -> AppResult<ServiceRequest> {
        let mut request = self.get_by_id(id).await?;
        if !assignments::unassign(&mut request.assignees, user_id) {
            return Ok(request);
        }

        request.updated_at = Some(Utc::now());
        let request = self.store.update(&request).await?;
        tracing::info!("User {} unassigned from service request {}", user_id, id);
        Ok(request)
    }

    pub async fn attach_equipment(&self, id: i32, data: AttachEquipment) -> AppResult<ServiceRequest> {
        let mut request = self.get_by_id(id).await?;
        if self.equipment.get_by_id(data.equipment_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Equipment {} not found", data.equipment_id)));
        }

        let now = Utc::now();
        assignments::attach(&mut request.equipment, data.equipment_id, data.notes, now);
        request.updated_at = Some(now);

        let request = self.store.update(&request).await?;
        tracing::info!("Equipment {} attached to service request {}", data.equipment_id, id);
        Ok(request)
    }

    /// Remove every link to the equipment; a no-op when none exists
    pub async fn detach_equipment(&self, id: i32, equipment_id: Uuid) -> AppResult<ServiceRequest> {
        let mut request = self.get_by_id(id).await?;
        if !assignments::detach(&mut request.equipment, equipment_id) {
            return Ok(request);
        }

        request.updated_at = Some(Utc::now());
        let request = self.store.update(&request).await?;
        tracing::info!("Equipment {} detached from service request {}", equipment_id, id);
        Ok(request)
    }

    /// Mark a request completed. Completing twice keeps the first timestamp.
    pub async fn complete(&self, id: i32) -> AppResult<ServiceRequest> {
        let mut request = self.get_by_id(id).await?;
        if request.is_completed {
            return Ok(request);
        }

        let now = Utc::now();
        request.is_completed = true;
        request.completed_at = Some(now);
        request.updated_at = Some(now);

        let request = self.store.update(&request).await?;
        tracing::info!("Service request {} completed", id);
        Ok(request)
    }

    async fn check_references(&self, item: &CreateServiceRequest) -> AppResult<()> {
        let invalid = |what: String| {
            AppError::InvalidReference(format!(
                "Service request '{}': {} not found",
                item.contract_id, what
            ))
        };

        if self.job_types.get_by_id(item.job_type_id).await?.is_none() {
            return Err(invalid(format!("job type {}", item.job_type_id)));
        }
        if self.customers.get_by_id(item.customer_id).await?.is_none() {
            return Err(invalid(format!("customer {}", item.customer_id)));
        }
        for user in &item.assignees {
            if !self.is_live_user(user.user_id).await? {
                return Err(invalid(format!("user {}", user.user_id)));
            }
        }
        for link in &item.equipment {
            if self.equipment.get_by_id(link.equipment_id).await?.is_none() {
                return Err(invalid(format!("equipment {}", link.equipment_id)));
            }
        }
        Ok(())
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::BulkConfig,
        models::{equipment::CreateEquipment, named::EntityKind},
        repository::{service_requests::MockServiceRequestStore, Stores},
        services::{
            testing::{memory_services, memory_stores, seed_named, seed_user},
            Services,
        },
    };

    struct Fixture {
        services: Services,
        customer: i32,
        job_type: i32,
    }

    async fn fixture() -> Fixture {
        let services = memory_services();
        let customer = seed_named(&services, EntityKind::Customers, "Acme").await;
        let job_type = seed_named(&services, EntityKind::JobTypes, "Calibration").await;
        Fixture {
            services,
            customer,
            job_type,
        }
    }

    impl Fixture {
        fn request(&self, contract_id: &str) -> CreateServiceRequest {
            CreateServiceRequest {
                contract_id: contract_id.to_string(),
                customer_id: self.customer,
                job_type_id: self.job_type,
                description: None,
                assignees: Vec::new(),
                equipment: Vec::new(),
            }
        }

        async fn created(&self, contract_id: &str) -> ServiceRequest {
            self.services
                .service_requests
                .create_bulk(vec![self.request(contract_id)])
                .await
                .unwrap()
                .remove(0)
        }
    }

    #[tokio::test]
    async fn test_create_bulk_with_links() {
        let f = fixture().await;
        let alice = seed_user(&f.services, "alice").await;
        let bob = seed_user(&f.services, "bob").await;
        let pump = f
            .services
            .equipment
            .create_bulk(vec![CreateEquipment {
                name: "pump".into(),
                model: None,
                serial_number: None,
                manufacturer: None,
                quantity: None,
                security_level_id: None,
                executor_id: None,
                inspection_method_ids: Vec::new(),
                attachments: Vec::new(),
                components: Vec::new(),
            }])
            .await
            .unwrap()
            .succeeded()[0]
            .id;

        let mut item = f.request("C-1");
        item.assignees = vec![
            AssignUser { user_id: alice, is_primary: false },
            AssignUser { user_id: bob, is_primary: true },
        ];
        item.equipment = vec![AttachEquipment { equipment_id: pump, notes: Some("inlet".into()) }];

        let created = f
            .services
            .service_requests
            .create_bulk(vec![item, f.request("C-2")])
            .await
            .unwrap();

        assert_eq!(created.len(), 2);
        assert_eq!(created[0].assignees.len(), 2);
        assert_eq!(created[0].primary_assignee().map(|l| l.user_id), Some(bob));
        assert_eq!(created[0].equipment[0].equipment_id, pump);
        assert_eq!(f.services.service_requests.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_contract_fails_whole_batch() {
        let f = fixture().await;
        let err = f
            .services
            .service_requests
            .create_bulk(vec![f.request("C-1"), f.request("C-2"), f.request("C-1")])
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
        assert!(f.services.service_requests.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persisted_contract_fails_whole_batch() {
        let f = fixture().await;
        f.created("C-1").await;

        let err = f
            .services
            .service_requests
            .create_bulk(vec![f.request("C-2"), f.request("c-1")])
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(f.services.service_requests.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_reference_names_first_problem() {
        let f = fixture().await;
        let mut bad_customer = f.request("C-2");
        bad_customer.customer_id = 404;
        let mut bad_job = f.request("C-3");
        bad_job.job_type_id = 405;

        let err = f
            .services
            .service_requests
            .create_bulk(vec![f.request("C-1"), bad_customer, bad_job])
            .await
            .unwrap_err();

        match err {
            AppError::InvalidReference(message) => {
                assert_eq!(message, "Service request 'C-2': customer 404 not found")
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(f.services.service_requests.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_two_initial_primaries_refused() {
        let f = fixture().await;
        let alice = seed_user(&f.services, "alice").await;
        let bob = seed_user(&f.services, "bob").await;

        let mut item = f.request("C-1");
        item.assignees = vec![
            AssignUser { user_id: alice, is_primary: true },
            AssignUser { user_id: bob, is_primary: true },
        ];

        let err = f.services.service_requests.create_bulk(vec![item]).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_primary_moves_to_latest_assignee() {
        let f = fixture().await;
        let request = f.created("C-1").await;
        let alice = seed_user(&f.services, "alice").await;
        let bob = seed_user(&f.services, "bob").await;

        let svc = &f.services.service_requests;
        svc.assign_user(request.id, AssignUser { user_id: alice, is_primary: true })
            .await
            .unwrap();
        let updated = svc
            .assign_user(request.id, AssignUser { user_id: bob, is_primary: true })
            .await
            .unwrap();

        let primaries: Vec<i32> = updated
            .assignees
            .iter()
            .filter(|l| l.is_primary_assignee)
            .map(|l| l.user_id)
            .collect();
        assert_eq!(primaries, vec![bob]);

        let stored = svc.get_by_id(request.id).await.unwrap();
        assert_eq!(stored.primary_assignee().map(|l| l.user_id), Some(bob));
    }

    #[tokio::test]
    async fn test_assign_unknown_targets() {
        let f = fixture().await;
        let request = f.created("C-1").await;
        let svc = &f.services.service_requests;

        let err = svc
            .assign_user(request.id, AssignUser { user_id: 999, is_primary: false })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let alice = seed_user(&f.services, "alice").await;
        let err = svc
            .assign_user(request.id + 1, AssignUser { user_id: alice, is_primary: false })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_unassign_absent_user_changes_nothing() {
        let f = fixture().await;
        let request = f.created("C-1").await;
        let alice = seed_user(&f.services, "alice").await;
        let svc = &f.services.service_requests;

        let assigned = svc
            .assign_user(request.id, AssignUser { user_id: alice, is_primary: true })
            .await
            .unwrap();
        let unchanged = svc.unassign_user(request.id, alice + 1).await.unwrap();
        assert_eq!(unchanged, assigned);

        let unassigned = svc.unassign_user(request.id, alice).await.unwrap();
        assert!(unassigned.assignees.is_empty());
    }

    #[tokio::test]
    async fn test_equipment_attach_and_detach() {
        let f = fixture().await;
        let request = f.created("C-1").await;
        let svc = &f.services.service_requests;

        let missing = AttachEquipment { equipment_id: Uuid::new_v4(), notes: None };
        assert!(matches!(
            svc.attach_equipment(request.id, missing).await,
            Err(AppError::NotFound(_))
        ));

        let unchanged = svc.detach_equipment(request.id, Uuid::new_v4()).await.unwrap();
        assert!(unchanged.equipment.is_empty());
    }

    #[tokio::test]
    async fn test_complete_is_idempotent() {
        let f = fixture().await;
        let request = f.created("C-1").await;
        let svc = &f.services.service_requests;

        let done = svc.complete(request.id).await.unwrap();
        assert!(done.is_completed);
        let again = svc.complete(request.id).await.unwrap();
        assert_eq!(again.completed_at, done.completed_at);
    }

    #[tokio::test]
    async fn test_delete_bulk_reports_missing() {
        let f = fixture().await;
        let request = f.created("C-1").await;

        let result = f
            .services
            .service_requests
            .delete_bulk(vec![request.id, request.id + 1])
            .await
            .unwrap();

        assert_eq!(result.succeeded()[0].contract_id, "C-1");
        assert_eq!(result.failed(), &[request.id + 1]);
        assert_eq!(result.reasons(), &["not found"]);
        assert!(f.services.service_requests.list().await.unwrap().is_empty());
    }

    fn stored(id: i32) -> ServiceRequest {
        ServiceRequest {
            id,
            contract_id: format!("C-{}", id),
            customer_id: 1,
            job_type_id: 1,
            description: None,
            is_completed: false,
            completed_at: None,
            created_at: Utc::now(),
            updated_at: None,
            assignees: Vec::new(),
            equipment: Vec::new(),
        }
    }

    fn with_store(store: MockServiceRequestStore, stores: Stores) -> ServiceRequestService {
        ServiceRequestService::new(
            Arc::new(store),
            stores.customers,
            stores.job_types,
            stores.users,
            stores.equipment,
            ConflictDetector::default(),
            10,
        )
    }

    #[tokio::test]
    async fn test_delete_failure_is_captured_per_item() {
        let mut store = MockServiceRequestStore::new();
        store.expect_get_by_id().returning(|id| Ok(Some(stored(id))));
        store.expect_delete().returning(|id| {
            if id == 2 {
                Err(AppError::Internal("deadlock detected".into()))
            } else {
                Ok(())
            }
        });

        let service = with_store(store, memory_stores());
        let result = service.delete_bulk(vec![1, 2, 3]).await.unwrap();

        let deleted: Vec<i32> = result.succeeded().iter().map(|r| r.id).collect();
        assert_eq!(deleted, vec![1, 3]);
        assert_eq!(result.failed(), &[2]);
        assert_eq!(result.reasons(), &["Internal server error: deadlock detected"]);
    }

    #[tokio::test]
    async fn test_create_store_failure_propagates() {
        let stores = memory_stores();
        let services = Services::new(stores.clone(), &BulkConfig::default());
        let customer = seed_named(&services, EntityKind::Customers, "Acme").await;
        let job_type = seed_named(&services, EntityKind::JobTypes, "Repair").await;

        let mut store = MockServiceRequestStore::new();
        store.expect_get_all().returning(|| Ok(Vec::new()));
        store
            .expect_create_bulk()
            .withf(|requests| requests.len() == 2)
            .returning(|_| Err(AppError::Internal("connection reset".into())));

        let service = with_store(store, stores);
        let request = |contract_id: &str| CreateServiceRequest {
            contract_id: contract_id.to_string(),
            customer_id: customer,
            job_type_id: job_type,
            description: None,
            assignees: Vec::new(),
            equipment: Vec::new(),
        };

        let err = service
            .create_bulk(vec![request("C-1"), request("C-2")])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }
}
