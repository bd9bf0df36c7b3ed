//! DTO definitions used by the admin REST API.

use serde::Serialize;
use utoipa::ToSchema;

/// Generic action acknowledgement used by command endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    pub message: String,
}

impl ActionResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Result of enabling debates.
#[derive(Debug, Serialize, ToSchema)]
pub struct EnableResponse {
    /// Number of rooms created.
    pub rooms: usize,
}
