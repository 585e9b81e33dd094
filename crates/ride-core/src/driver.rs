//! Driver onboarding, location and availability.

use std::sync::Arc;

use crate::error::{CoreError, CoreResult};
use crate::model::driver::{Document, DocumentType, Driver, Location, Vehicle};
use crate::model::user::User;
use crate::repo::DriverRepository;

/// A document reference submitted during onboarding.
#[derive(Debug, Clone)]
pub struct DocumentInput {
    pub kind: DocumentType,
    pub file_url: String,
}

#[derive(Debug, Clone)]
pub struct OnboardInput {
    pub license_number: String,
    pub vehicle: Vehicle,
    pub documents: Vec<DocumentInput>,
}

/// Domain operations on driver records, keyed by the owning user.
#[derive(Clone)]
pub struct DriverService {
    drivers: Arc<dyn DriverRepository>,
}

impl DriverService {
    pub fn new(drivers: Arc<dyn DriverRepository>) -> Self {
        Self { drivers }
    }

    /// Submits a driver for verification.
    ///
    /// # Errors
    ///
    /// - [`CoreError::NotADriver`] if `user` is not of category driver.
    /// - [`CoreError::InvalidInput`] if the licence or documents are missing.
    /// - [`CoreError::DriverExists`] / [`CoreError::LicenseTaken`] on duplicates.
    pub async fn onboard(&self, user: &User, input: OnboardInput) -> CoreResult<Driver> {
        if !user.is_driver() {
            return Err(CoreError::NotADriver);
        }
        let license_number = input.license_number.trim();
        if license_number.is_empty() {
            return Err(CoreError::InvalidInput(
                "license number is required".to_string(),
            ));
        }
        if input.documents.is_empty() {
            return Err(CoreError::InvalidInput(
                "at least one document is required".to_string(),
            ));
        }

        let mut driver = Driver::new(&user.id, license_number, input.vehicle);
        driver.documents = input
            .documents
            .into_iter()
            .map(|doc| Document::new(&driver.id, doc.kind, doc.file_url))
            .collect();

        self.drivers.create(driver.clone()).await?;
        tracing::info!(driver_id = %driver.id, user_id = %user.id, "driver submitted for verification");
        Ok(driver)
    }

    pub async fn profile(&self, user_id: &str) -> CoreResult<Driver> {
        self.drivers
            .find_by_user_id(user_id)
            .await?
            .ok_or(CoreError::DriverNotFound)
    }

    pub async fn documents(&self, user_id: &str) -> CoreResult<Vec<Document>> {
        Ok(self.profile(user_id).await?.documents)
    }

    pub async fn update_location(&self, user_id: &str, latitude: f64, longitude: f64) -> CoreResult<Driver> {
        let location = Location::new(latitude, longitude)?;
        let mut driver = self.profile(user_id).await?;
        driver.update_location(location);
        self.drivers.update(driver.clone()).await?;
        Ok(driver)
    }

    /// # Errors
    ///
    /// [`CoreError::DriverNotVerified`] until an administrator verifies the driver.
    pub async fn set_availability(&self, user_id: &str, available: bool) -> CoreResult<Driver> {
        let mut driver = self.profile(user_id).await?;
        if !driver.is_verified {
            return Err(CoreError::DriverNotVerified);
        }
        driver.update_availability(available);
        self.drivers.update(driver.clone()).await?;
        Ok(driver)
    }

    /// Administrative verification decision, keyed by driver id.
    pub async fn set_verified(&self, driver_id: &str, verified: bool) -> CoreResult<Driver> {
        let mut driver = self
            .drivers
            .find_by_id(driver_id)
            .await?
            .ok_or(CoreError::DriverNotFound)?;
        driver.set_verified(verified);
        self.drivers.update(driver.clone()).await?;
        tracing::info!(driver_id, verified, "driver verification updated");
        Ok(driver)
    }
}
