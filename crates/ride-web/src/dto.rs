use ride_core::{
    AccountCategory, DocumentInput, DocumentType, Driver, OnboardInput, User, Vehicle,
};
use serde::{Deserialize, Serialize};

use crate::auth::{Principal, TokenPair};

/// Success envelope: `{"success": true, "data": ...}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    #[serde(alias = "user_type")]
    pub category: AccountCategory,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub tokens: TokenPair,
}

/// The refresh flow resolves the subject through the principal lookup, so it
/// answers with the principal rather than the stored account.
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub user: Principal,
    pub tokens: TokenPair,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailQuery {
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct DocumentRequest {
    #[serde(rename = "type")]
    pub kind: DocumentType,
    pub file_url: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyDriverRequest {
    pub license_number: String,
    pub vehicle: Vehicle,
    #[serde(default)]
    pub documents: Vec<DocumentRequest>,
}

impl From<VerifyDriverRequest> for OnboardInput {
    fn from(req: VerifyDriverRequest) -> Self {
        Self {
            license_number: req.license_number,
            vehicle: req.vehicle,
            documents: req
                .documents
                .into_iter()
                .map(|doc| DocumentInput {
                    kind: doc.kind,
                    file_url: doc.file_url,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VerificationSubmitted {
    pub verification_id: String,
    pub status: &'static str,
    pub submitted_at: u64,
}

impl From<&Driver> for VerificationSubmitted {
    fn from(driver: &Driver) -> Self {
        Self {
            verification_id: driver.id.clone(),
            status: "pending",
            submitted_at: driver.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateLocationRequest {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAvailabilityRequest {
    pub is_available: bool,
}

#[derive(Debug, Deserialize)]
pub struct SetVerificationRequest {
    pub verified: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}
