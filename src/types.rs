//! Domain types for the profile operations.
//!
//! One typed request/response pair per operation. Optional fields are
//! `Option<String>`: `None` means "caller did not specify", which is
//! distinct from "caller specified empty string" everywhere except at the
//! RPC wire boundary (see `backend::codec`).
//!
//! HTTP request bodies use snake_case field names while responses use
//! camelCase; the asymmetry is part of the published wire contract.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Verified identity attributes for one request.
///
/// Produced once by the authentication middleware, read-only thereafter.
#[derive(Debug, Clone)]
pub struct Claims {
    /// The authenticated subject's identifier.
    pub subject: String,

    /// Remaining claims as reported by the verifier.
    pub extra: HashMap<String, serde_json::Value>,
}

impl Claims {
    /// Create a claim set with just a subject.
    pub fn for_subject(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            extra: HashMap::new(),
        }
    }
}

/// Authentication outcome attached to a request by the middleware.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Verified claims.
    pub claims: Claims,

    /// Identifying name of the verification mechanism that produced them.
    pub provider: String,
}

/// Parameters for the create-profile operation.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProfileRequest {
    pub uuid: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub user_name: Option<String>,
    pub profile_picture: Option<String>,
    pub bio: Option<String>,
    pub auth_provider: Option<String>,
}

/// Result of the create-profile operation.
#[derive(Debug, Clone, Serialize)]
pub struct CreateProfileResponse {}

/// Parameters for the get-profile operation.
///
/// `authenticated` records whether the requested uid matches the caller's
/// own subject. It never crosses the RPC boundary; it only shapes the HTTP
/// response.
#[derive(Debug, Clone)]
pub struct GetProfileRequest {
    pub uuid: String,
    pub authenticated: bool,
}

/// Result of the get-profile operation.
#[derive(Debug, Clone, Serialize)]
pub struct GetProfileResponse {
    #[serde(rename = "uid")]
    pub uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "phoneNumber", skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(rename = "userName", skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(rename = "profilePicture", skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

/// Parameters for the update-profile operation.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProfileRequest {
    pub uuid: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub user_name: Option<String>,
    pub profile_picture: Option<String>,
    pub bio: Option<String>,
}

/// Result of the update-profile operation.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateProfileResponse {}

/// Parameters for the delete-profile operation.
#[derive(Debug, Clone)]
pub struct DeleteProfileRequest {
    pub uuid: String,
}

/// Result of the delete-profile operation.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteProfileResponse {}
