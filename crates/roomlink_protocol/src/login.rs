//! Login request and response bodies.

use serde::{Deserialize, Serialize};

/// Body of the unauthenticated `POST /login` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Account identifier on the homeserver.
    pub id: String,
    /// Account password (for signaling accounts usually a signature over the
    /// public key).
    pub password: String,
    /// Stable device identifier for this client installation.
    #[serde(rename = "deviceId")]
    pub device_id: String,
}

impl LoginRequest {
    /// Creates a new login request.
    pub fn new(
        id: impl Into<String>,
        password: impl Into<String>,
        device_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            password: password.into(),
            device_id: device_id.into(),
        }
    }
}

/// Body of a successful login response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Fully qualified user id assigned by the homeserver.
    pub user_id: String,
    /// Bearer token for all authenticated calls.
    pub access_token: String,
    /// Name of the homeserver that issued the session.
    pub home_server: String,
    /// Device id echoed (or assigned) by the homeserver.
    pub device_id: String,
}
