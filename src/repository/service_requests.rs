//! Service requests repository for database operations

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Transaction};

use crate::{
    error::{AppError, AppResult},
    models::service_request::{
        NewServiceRequest, ServiceRequest, ServiceRequestEquipment, UserServiceRequest,
    },
};

/// Persistence port for service requests and their link rows
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ServiceRequestStore: Send + Sync {
    async fn get_by_id(&self, id: i32) -> AppResult<Option<ServiceRequest>>;

    async fn get_all(&self) -> AppResult<Vec<ServiceRequest>>;

    /// Insert requests and their links in one transaction
    async fn create_bulk(&self, requests: &[NewServiceRequest]) -> AppResult<Vec<ServiceRequest>>;

    /// Persist root columns and replace the link rows, in one transaction
    async fn update(&self, request: &ServiceRequest) -> AppResult<ServiceRequest>;

    async fn delete(&self, id: i32) -> AppResult<()>;
}

#[derive(Clone)]
pub struct ServiceRequestsRepository {
    pool: Pool<Postgres>,
}

#[derive(sqlx::FromRow)]
struct AssigneeRow {
    service_request_id: i32,
    #[sqlx(flatten)]
    link: UserServiceRequest,
}

#[derive(sqlx::FromRow)]
struct EquipmentRow {
    service_request_id: i32,
    #[sqlx(flatten)]
    link: ServiceRequestEquipment,
}

impl ServiceRequestsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn load_links(&self, requests: &mut [ServiceRequest]) -> AppResult<()> {
        if requests.is_empty() {
            return Ok(());
        }
        let ids: Vec<i32> = requests.iter().map(|r| r.id).collect();

        let assignees = sqlx::query_as::<_, AssigneeRow>(
            r#"
            SELECT service_request_id, user_id, assigned_at, is_primary_assignee
            FROM user_service_requests
            WHERE service_request_id = ANY($1)
            ORDER BY assigned_at, user_id
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let equipment = sqlx::query_as::<_, EquipmentRow>(
            r#"
            SELECT service_request_id, equipment_id, attached_at, notes
            FROM service_request_equipment
            WHERE service_request_id = ANY($1)
            ORDER BY attached_at, id
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_id: HashMap<i32, &mut ServiceRequest> =
            requests.iter_mut().map(|r| (r.id, r)).collect();
        for row in assignees {
            if let Some(request) = by_id.get_mut(&row.service_request_id) {
                request.assignees.push(row.link);
            }
        }
        for row in equipment {
            if let Some(request) = by_id.get_mut(&row.service_request_id) {
                request.equipment.push(row.link);
            }
        }

        Ok(())
    }

    async fn insert_links(
        tx: &mut Transaction<'_, Postgres>,
        request_id: i32,
        assignees: &[UserServiceRequest],
        equipment: &[ServiceRequestEquipment],
    ) -> AppResult<()> {
        for link in assignees {
            sqlx::query(
                r#"
                INSERT INTO user_service_requests (service_request_id, user_id, assigned_at, is_primary_assignee)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(request_id)
            .bind(link.user_id)
            .bind(link.assigned_at)
            .bind(link.is_primary_assignee)
            .execute(&mut **tx)
            .await?;
        }

        for link in equipment {
            sqlx::query(
                r#"
                INSERT INTO service_request_equipment (service_request_id, equipment_id, attached_at, notes)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(request_id)
            .bind(link.equipment_id)
            .bind(link.attached_at)
            .bind(&link.notes)
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }
}

#[async_trait]
impl ServiceRequestStore for ServiceRequestsRepository {
    async fn get_by_id(&self, id: i32) -> AppResult<Option<ServiceRequest>> {
        let row = sqlx::query_as::<_, ServiceRequest>("SELECT * FROM service_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(request) => {
                let mut requests = [request];
                self.load_links(&mut requests).await?;
                let [request] = requests;
                Ok(Some(request))
            }
            None => Ok(None),
        }
    }

    async fn get_all(&self) -> AppResult<Vec<ServiceRequest>> {
        let mut rows = sqlx::query_as::<_, ServiceRequest>("SELECT * FROM service_requests ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        self.load_links(&mut rows).await?;
        Ok(rows)
    }

    async fn create_bulk(&self, requests: &[NewServiceRequest]) -> AppResult<Vec<ServiceRequest>> {
        let mut tx = self.pool.begin().await?;
        let mut created = Vec::with_capacity(requests.len());

        for new in requests {
            let mut row = sqlx::query_as::<_, ServiceRequest>(
                r#"
                INSERT INTO service_requests (contract_id, customer_id, job_type_id, description, is_completed, created_at)
                VALUES ($1, $2, $3, $4, FALSE, $5)
                RETURNING *
                "#,
            )
            .bind(&new.contract_id)
            .bind(new.customer_id)
            .bind(new.job_type_id)
            .bind(&new.description)
            .bind(new.created_at)
            .fetch_one(&mut *tx)
            .await?;

            Self::insert_links(&mut tx, row.id, &new.assignees, &new.equipment).await?;
            row.assignees = new.assignees.clone();
            row.equipment = new.equipment.clone();
            created.push(row);
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn update(&self, request: &ServiceRequest) -> AppResult<ServiceRequest> {
        let mut tx = self.pool.begin().await?;

        let mut row = sqlx::query_as::<_, ServiceRequest>(
            r#"
            UPDATE service_requests SET
                customer_id = $1, job_type_id = $2, description = $3,
                is_completed = $4, completed_at = $5, updated_at = $6
            WHERE id = $7
            RETURNING *
            "#,
        )
        .bind(request.customer_id)
        .bind(request.job_type_id)
        .bind(&request.description)
        .bind(request.is_completed)
        .bind(request.completed_at)
        .bind(request.updated_at)
        .bind(request.id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Service request {} not found", request.id)))?;

        sqlx::query("DELETE FROM user_service_requests WHERE service_request_id = $1")
            .bind(request.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM service_request_equipment WHERE service_request_id = $1")
            .bind(request.id)
            .execute(&mut *tx)
            .await?;
        Self::insert_links(&mut tx, request.id, &request.assignees, &request.equipment).await?;

        tx.commit().await?;

        row.assignees = request.assignees.clone();
        row.equipment = request.equipment.clone();
        Ok(row)
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM user_service_requests WHERE service_request_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM service_request_equipment WHERE service_request_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM service_requests WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Service request {} not found", id)));
        }

        tx.commit().await?;
        Ok(())
    }
}
