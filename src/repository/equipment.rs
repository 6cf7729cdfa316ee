//! Equipment repository for database operations

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::equipment::{Attachment, Equipment},
};

/// Persistence port for equipment nodes. Reads return flat nodes (with
/// their attachments and inspection-method ids, `components` left empty).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EquipmentStore: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Equipment>>;

    async fn get_all(&self) -> AppResult<Vec<Equipment>>;

    /// The node and all its transitive components, root first.
    /// Empty when `id` does not exist.
    async fn get_subtree(&self, id: Uuid) -> AppResult<Vec<Equipment>>;

    /// Insert pre-ordered nodes (parents before children) with their
    /// attachments and inspection-method links, all or nothing
    async fn create_bulk(&self, nodes: &[Equipment]) -> AppResult<()>;

    /// Update descriptive fields of every node, all or nothing
    async fn update_bulk(&self, nodes: &[Equipment]) -> AppResult<Vec<Equipment>>;

    /// Remove the given nodes and every row depending on them, all or nothing.
    /// `ids` lists children before their parents.
    async fn delete_subtree(&self, ids: &[Uuid]) -> AppResult<()>;
}

#[derive(Clone)]
pub struct EquipmentRepository {
    pool: Pool<Postgres>,
}

#[derive(sqlx::FromRow)]
struct InspectionLink {
    equipment_id: Uuid,
    inspection_method_id: i32,
}

impl EquipmentRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Fill attachments and inspection-method ids of the given nodes
    async fn load_dependents(&self, nodes: &mut [Equipment]) -> AppResult<()> {
        if nodes.is_empty() {
            return Ok(());
        }
        let ids: Vec<Uuid> = nodes.iter().map(|n| n.id).collect();

        let attachments = sqlx::query_as::<_, Attachment>(
            "SELECT * FROM equipment_attachments WHERE equipment_id = ANY($1) ORDER BY created_at",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let links = sqlx::query_as::<_, InspectionLink>(
            r#"
            SELECT equipment_id, inspection_method_id FROM equipment_inspection_methods
            WHERE equipment_id = ANY($1)
            ORDER BY inspection_method_id
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_node: HashMap<Uuid, &mut Equipment> =
            nodes.iter_mut().map(|n| (n.id, n)).collect();
        for attachment in attachments {
            if let Some(node) = by_node.get_mut(&attachment.equipment_id) {
                node.attachments.push(attachment);
            }
        }
        for link in links {
            if let Some(node) = by_node.get_mut(&link.equipment_id) {
                node.inspection_method_ids.push(link.inspection_method_id);
            }
        }

        Ok(())
    }
}

#[async_trait]
impl EquipmentStore for EquipmentRepository {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Equipment>> {
        let row = sqlx::query_as::<_, Equipment>("SELECT * FROM equipment WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(node) => {
                let mut nodes = [node];
                self.load_dependents(&mut nodes).await?;
                let [node] = nodes;
                Ok(Some(node))
            }
            None => Ok(None),
        }
    }

    async fn get_all(&self) -> AppResult<Vec<Equipment>> {
        let mut rows = sqlx::query_as::<_, Equipment>("SELECT * FROM equipment ORDER BY created_at, name")
            .fetch_all(&self.pool)
            .await?;
        self.load_dependents(&mut rows).await?;
        Ok(rows)
    }

    async fn get_subtree(&self, id: Uuid) -> AppResult<Vec<Equipment>> {
        let mut rows = sqlx::query_as::<_, Equipment>(
            r#"
            WITH RECURSIVE subtree AS (
                SELECT e.*, 0 AS depth FROM equipment e WHERE e.id = $1
                UNION ALL
                SELECT c.*, s.depth + 1 FROM equipment c
                JOIN subtree s ON c.parent_id = s.id
            )
            SELECT id, parent_id, name, model, serial_number, manufacturer, quantity,
                   security_level_id, executor_id, created_at, updated_at
            FROM subtree
            ORDER BY depth, created_at
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        self.load_dependents(&mut rows).await?;
        Ok(rows)
    }

    async fn create_bulk(&self, nodes: &[Equipment]) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        for node in nodes {
            sqlx::query(
                r#"
                INSERT INTO equipment (
                    id, parent_id, name, model, serial_number, manufacturer, quantity,
                    security_level_id, executor_id, created_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(node.id)
            .bind(node.parent_id)
            .bind(&node.name)
            .bind(&node.model)
            .bind(&node.serial_number)
            .bind(&node.manufacturer)
            .bind(node.quantity)
            .bind(node.security_level_id)
            .bind(node.executor_id)
            .bind(node.created_at)
            .execute(&mut *tx)
            .await?;

            for method_id in &node.inspection_method_ids {
                sqlx::query(
                    "INSERT INTO equipment_inspection_methods (equipment_id, inspection_method_id) VALUES ($1, $2)",
                )
                .bind(node.id)
                .bind(method_id)
                .execute(&mut *tx)
                .await?;
            }

            for attachment in &node.attachments {
                sqlx::query(
                    r#"
                    INSERT INTO equipment_attachments (id, equipment_id, file_name, content_type, size_bytes, created_at)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    "#,
                )
                .bind(attachment.id)
                .bind(node.id)
                .bind(&attachment.file_name)
                .bind(&attachment.content_type)
                .bind(attachment.size_bytes)
                .bind(attachment.created_at)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn update_bulk(&self, nodes: &[Equipment]) -> AppResult<Vec<Equipment>> {
        let mut tx = self.pool.begin().await?;
        let mut updated = Vec::with_capacity(nodes.len());

        for node in nodes {
            let mut row = sqlx::query_as::<_, Equipment>(
                r#"
                UPDATE equipment SET
                    name = $1, model = $2, serial_number = $3, manufacturer = $4,
                    quantity = $5, security_level_id = $6, executor_id = $7, updated_at = $8
                WHERE id = $9
                RETURNING *
                "#,
            )
            .bind(&node.name)
            .bind(&node.model)
            .bind(&node.serial_number)
            .bind(&node.manufacturer)
            .bind(node.quantity)
            .bind(node.security_level_id)
            .bind(node.executor_id)
            .bind(node.updated_at)
            .bind(node.id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", node.id)))?;

            row.attachments = node.attachments.clone();
            row.inspection_method_ids = node.inspection_method_ids.clone();
            updated.push(row);
        }

        tx.commit().await?;
        Ok(updated)
    }

    async fn delete_subtree(&self, ids: &[Uuid]) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM equipment_attachments WHERE equipment_id = ANY($1)")
            .bind(ids)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM equipment_inspection_methods WHERE equipment_id = ANY($1)")
            .bind(ids)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM service_request_equipment WHERE equipment_id = ANY($1)")
            .bind(ids)
            .execute(&mut *tx)
            .await?;

        for id in ids {
            let result = sqlx::query("DELETE FROM equipment WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            if result.rows_affected() == 0 {
                // Rolled back on drop
                return Err(AppError::NotFound(format!("Equipment {} not found", id)));
            }
        }

        tx.commit().await?;
        Ok(())
    }
}
