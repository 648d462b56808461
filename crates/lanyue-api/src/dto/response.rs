//! Response DTOs.

use axum::Json;
use serde::{Deserialize, Serialize};

use lanyue_entity::storage::OrderField;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }

    /// Wrap into a JSON response.
    pub fn json(data: T) -> Json<Self> {
        Json(Self::ok(data))
    }
}

/// One selectable listing order.
#[derive(Debug, Clone, Serialize)]
pub struct OrderFieldOption {
    pub value: OrderField,
    pub label: &'static str,
}

impl From<OrderField> for OrderFieldOption {
    fn from(field: OrderField) -> Self {
        Self {
            value: field,
            label: field.label(),
        }
    }
}

/// Outcome of a batch operation: the names it applied to.
#[derive(Debug, Clone, Serialize)]
pub struct BatchResponse {
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CountResponse {
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelResponse {
    /// Whether an active writer was signalled.
    pub cancelled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeletedResponse {
    pub deleted: bool,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub database: String,
    pub cache: String,
    pub mounts: usize,
}
