//! User management service

use std::sync::Arc;

use chrono::Utc;

use crate::{
    error::{AppError, AppResult},
    models::user::{CreateUser, NewUser, UpdateUser, User},
    repository::UserStore,
};

#[derive(Clone)]
pub struct UsersService {
    store: Arc<dyn UserStore>,
}

impl UsersService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.store
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    pub async fn list(&self) -> AppResult<Vec<User>> {
        self.store.get_all().await
    }

    /// Create a user; the login must not be taken (case-insensitive)
    pub async fn create(&self, data: CreateUser) -> AppResult<User> {
        if self.store.get_by_login(&data.login).await?.is_some() {
            return Err(AppError::Conflict(format!("Login '{}' already exists", data.login)));
        }

        let user = self.store.create(&NewUser::from_request(&data, Utc::now())).await?;
        tracing::info!("User {} created", user.id);
        Ok(user)
    }

    /// Apply the provided fields only
    pub async fn update(&self, id: i32, data: UpdateUser) -> AppResult<User> {
        let mut user = self.get_by_id(id).await?;

        if let Some(ref login) = data.login {
            if let Some(existing) = self.store.get_by_login(login).await? {
                if existing.id != id {
                    return Err(AppError::Conflict(format!("Login '{}' already exists", login)));
                }
            }
        }

        data.merge_into(&mut user);
        user.updated_at = Some(Utc::now());
        self.store.update(&user).await
    }

    /// Soft delete: the row stays, `is_alive` is cleared
    pub async fn deactivate(&self, id: i32) -> AppResult<User> {
        let mut user = self.get_by_id(id).await?;
        if !user.is_alive {
            return Ok(user);
        }

        user.is_alive = false;
        user.updated_at = Some(Utc::now());
        let user = self.store.update(&user).await?;
        tracing::info!("User {} deactivated", id);
        Ok(user)
    }
}
