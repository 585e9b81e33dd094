//! In-memory repositories.
//!
//! Each repository keeps its records and secondary indexes behind a single
//! `RwLock` so uniqueness checks and inserts happen atomically.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{DriverRepository, UserRepository};
use crate::error::{CoreError, CoreResult};
use crate::model::driver::Driver;
use crate::model::user::User;

#[derive(Default)]
struct UserTable {
    by_id: HashMap<String, User>,
    email_index: HashMap<String, String>,
    phone_index: HashMap<String, String>,
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    table: RwLock<UserTable>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.by_id.len()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: User) -> CoreResult<()> {
        let mut table = self.table.write().await;
        if table.email_index.contains_key(&user.email) {
            return Err(CoreError::EmailTaken);
        }
        if table.phone_index.contains_key(&user.phone) {
            return Err(CoreError::PhoneTaken);
        }
        table.email_index.insert(user.email.clone(), user.id.clone());
        table.phone_index.insert(user.phone.clone(), user.id.clone());
        tracing::debug!(user_id = %user.id, category = %user.category, "user stored");
        table.by_id.insert(user.id.clone(), user);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> CoreResult<Option<User>> {
        Ok(self.table.read().await.by_id.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> CoreResult<Option<User>> {
        let email = email.trim().to_lowercase();
        let table = self.table.read().await;
        Ok(table
            .email_index
            .get(&email)
            .and_then(|id| table.by_id.get(id))
            .cloned())
    }

    async fn find_by_phone(&self, phone: &str) -> CoreResult<Option<User>> {
        let table = self.table.read().await;
        Ok(table
            .phone_index
            .get(phone)
            .and_then(|id| table.by_id.get(id))
            .cloned())
    }

    async fn find_by_verify_token(&self, token: &str) -> CoreResult<Option<User>> {
        let table = self.table.read().await;
        Ok(table
            .by_id
            .values()
            .find(|u| u.verify_token.as_deref() == Some(token))
            .cloned())
    }

    async fn find_by_reset_token(&self, token: &str) -> CoreResult<Option<User>> {
        let table = self.table.read().await;
        Ok(table
            .by_id
            .values()
            .find(|u| u.reset_token.as_deref() == Some(token))
            .cloned())
    }

    async fn update(&self, user: User) -> CoreResult<()> {
        let mut table = self.table.write().await;
        let previous = table.by_id.get(&user.id).ok_or(CoreError::UserNotFound)?;
        let (old_email, old_phone) = (previous.email.clone(), previous.phone.clone());

        if old_email != user.email {
            if table.email_index.contains_key(&user.email) {
                return Err(CoreError::EmailTaken);
            }
            table.email_index.remove(&old_email);
            table.email_index.insert(user.email.clone(), user.id.clone());
        }
        if old_phone != user.phone {
            if table.phone_index.contains_key(&user.phone) {
                return Err(CoreError::PhoneTaken);
            }
            table.phone_index.remove(&old_phone);
            table.phone_index.insert(user.phone.clone(), user.id.clone());
        }
        table.by_id.insert(user.id.clone(), user);
        Ok(())
    }
}

#[derive(Default)]
struct DriverTable {
    by_id: HashMap<String, Driver>,
    user_index: HashMap<String, String>,
    license_index: HashMap<String, String>,
}

#[derive(Default)]
pub struct InMemoryDriverRepository {
    table: RwLock<DriverTable>,
}

impl InMemoryDriverRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DriverRepository for InMemoryDriverRepository {
    async fn create(&self, driver: Driver) -> CoreResult<()> {
        let mut table = self.table.write().await;
        if table.user_index.contains_key(&driver.user_id) {
            return Err(CoreError::DriverExists);
        }
        if table.license_index.contains_key(&driver.license_number) {
            return Err(CoreError::LicenseTaken);
        }
        table
            .user_index
            .insert(driver.user_id.clone(), driver.id.clone());
        table
            .license_index
            .insert(driver.license_number.clone(), driver.id.clone());
        table.by_id.insert(driver.id.clone(), driver);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> CoreResult<Option<Driver>> {
        Ok(self.table.read().await.by_id.get(id).cloned())
    }

    async fn find_by_user_id(&self, user_id: &str) -> CoreResult<Option<Driver>> {
        let table = self.table.read().await;
        Ok(table
            .user_index
            .get(user_id)
            .and_then(|id| table.by_id.get(id))
            .cloned())
    }

    async fn find_by_license_number(&self, license_number: &str) -> CoreResult<Option<Driver>> {
        let table = self.table.read().await;
        Ok(table
            .license_index
            .get(license_number)
            .and_then(|id| table.by_id.get(id))
            .cloned())
    }

    async fn update(&self, driver: Driver) -> CoreResult<()> {
        let mut table = self.table.write().await;
        let previous = table
            .by_id
            .get(&driver.id)
            .ok_or(CoreError::DriverNotFound)?;
        if previous.license_number != driver.license_number {
            if table.license_index.contains_key(&driver.license_number) {
                return Err(CoreError::LicenseTaken);
            }
            let old = previous.license_number.clone();
            table.license_index.remove(&old);
            table
                .license_index
                .insert(driver.license_number.clone(), driver.id.clone());
        }
        table.by_id.insert(driver.id.clone(), driver);
        Ok(())
    }
}
