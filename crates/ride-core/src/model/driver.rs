use serde::{Deserialize, Serialize};

use super::unix_now;
use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleType {
    Car,
    Bike,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    License,
    Registration,
    Insurance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    #[serde(rename = "type")]
    pub kind: VehicleType,
    pub model: String,
    pub plate_number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub id: String,
    pub driver_id: String,
    #[serde(rename = "type")]
    pub kind: DocumentType,
    pub file_url: String,
    pub created_at: u64,
}

impl Document {
    pub fn new(driver_id: &str, kind: DocumentType, file_url: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            driver_id: driver_id.to_string(),
            kind,
            file_url: file_url.into(),
            created_at: unix_now(),
        }
    }
}

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    /// Builds a location, rejecting coordinates outside
    /// `[-90, 90] x [-180, 180]` and non-finite values.
    pub fn new(latitude: f64, longitude: f64) -> CoreResult<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        if !valid {
            return Err(CoreError::InvalidLocation);
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// Driver onboarding record attached to a user of category driver.
#[derive(Debug, Clone, Serialize)]
pub struct Driver {
    pub id: String,
    pub user_id: String,
    pub license_number: String,
    pub vehicle: Vehicle,
    pub is_verified: bool,
    pub is_available: bool,
    pub current_location: Location,
    pub documents: Vec<Document>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Driver {
    /// New drivers start unverified and unavailable.
    pub fn new(user_id: &str, license_number: impl Into<String>, vehicle: Vehicle) -> Self {
        let now = unix_now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            license_number: license_number.into(),
            vehicle,
            is_verified: false,
            is_available: false,
            current_location: Location::default(),
            documents: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn update_location(&mut self, location: Location) {
        self.current_location = location;
        self.updated_at = unix_now();
    }

    pub fn update_availability(&mut self, available: bool) {
        self.is_available = available;
        self.updated_at = unix_now();
    }

    /// Revoking verification also takes the driver offline.
    pub fn set_verified(&mut self, verified: bool) {
        self.is_verified = verified;
        if !verified {
            self.is_available = false;
        }
        self.updated_at = unix_now();
    }
}
