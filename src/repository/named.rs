//! Named entity repository, shared by every lookup table

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::named::{EntityKind, NamedEntity, NewNamedEntity},
};

/// Persistence port for one kind of named entity
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NamedEntityStore: Send + Sync {
    async fn get_by_id(&self, id: i32) -> AppResult<Option<NamedEntity>>;

    /// Exact lookup on the stored name
    async fn get_by_key(&self, name: &str) -> AppResult<Option<NamedEntity>>;

    async fn get_all(&self) -> AppResult<Vec<NamedEntity>>;

    async fn create(&self, entity: &NewNamedEntity) -> AppResult<NamedEntity>;

    /// Insert every row or none
    async fn create_bulk(&self, entities: &[NewNamedEntity]) -> AppResult<Vec<NamedEntity>>;

    async fn update(&self, entity: &NamedEntity) -> AppResult<NamedEntity>;

    /// Update every row or none
    async fn update_bulk(&self, entities: &[NamedEntity]) -> AppResult<Vec<NamedEntity>>;

    async fn delete(&self, id: i32) -> AppResult<()>;
}

#[derive(Clone)]
pub struct NamedEntityRepository {
    pool: Pool<Postgres>,
    kind: EntityKind,
}

impl NamedEntityRepository {
    pub fn new(pool: Pool<Postgres>, kind: EntityKind) -> Self {
        Self { pool, kind }
    }
}

#[async_trait]
impl NamedEntityStore for NamedEntityRepository {
    async fn get_by_id(&self, id: i32) -> AppResult<Option<NamedEntity>> {
        let query = format!("SELECT * FROM {} WHERE id = $1", self.kind.table());
        let row = sqlx::query_as::<_, NamedEntity>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_by_key(&self, name: &str) -> AppResult<Option<NamedEntity>> {
        let query = format!("SELECT * FROM {} WHERE name = $1", self.kind.table());
        let row = sqlx::query_as::<_, NamedEntity>(&query)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_all(&self) -> AppResult<Vec<NamedEntity>> {
        let query = format!("SELECT * FROM {} ORDER BY name", self.kind.table());
        let rows = sqlx::query_as::<_, NamedEntity>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn create(&self, entity: &NewNamedEntity) -> AppResult<NamedEntity> {
        self.create_bulk(std::slice::from_ref(entity))
            .await?
            .pop()
            .ok_or_else(|| AppError::Internal(format!("{} insert returned no row", self.kind)))
    }

    async fn create_bulk(&self, entities: &[NewNamedEntity]) -> AppResult<Vec<NamedEntity>> {
        let query = format!(
            "INSERT INTO {} (name, description, created_at) VALUES ($1, $2, $3) RETURNING *",
            self.kind.table()
        );

        let mut tx = self.pool.begin().await?;
        let mut created = Vec::with_capacity(entities.len());
        for entity in entities {
            let row = sqlx::query_as::<_, NamedEntity>(&query)
                .bind(&entity.name)
                .bind(&entity.description)
                .bind(entity.created_at)
                .fetch_one(&mut *tx)
                .await?;
            created.push(row);
        }
        tx.commit().await?;

        Ok(created)
    }

    async fn update(&self, entity: &NamedEntity) -> AppResult<NamedEntity> {
        self.update_bulk(std::slice::from_ref(entity))
            .await?
            .pop()
            .ok_or_else(|| AppError::Internal(format!("{} update returned no row", self.kind)))
    }

    async fn update_bulk(&self, entities: &[NamedEntity]) -> AppResult<Vec<NamedEntity>> {
        let query = format!(
            r#"
            UPDATE {} SET name = $1, description = $2, updated_at = $3
            WHERE id = $4
            RETURNING *
            "#,
            self.kind.table()
        );

        let mut tx = self.pool.begin().await?;
        let mut updated = Vec::with_capacity(entities.len());
        for entity in entities {
            let row = sqlx::query_as::<_, NamedEntity>(&query)
                .bind(&entity.name)
                .bind(&entity.description)
                .bind(entity.updated_at)
                .bind(entity.id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("{} {} not found", self.kind, entity.id)))?;
            updated.push(row);
        }
        tx.commit().await?;

        Ok(updated)
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let query = format!("DELETE FROM {} WHERE id = $1", self.kind.table());
        let result = sqlx::query(&query)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("{} {} not found", self.kind, id)));
        }
        Ok(())
    }
}
