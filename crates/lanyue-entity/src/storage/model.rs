//! Storage mount entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::order::OrderField;

/// A physical directory registered as a mount of the virtual namespace.
///
/// An inactive record may exist without a live mount.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StorageMount {
    /// Unique storage identifier.
    pub id: i64,
    /// First path segment routed to this storage. Unique.
    pub mount_name: String,
    /// Absolute physical root directory.
    pub root_path: String,
    /// Position in the mount listing.
    pub sort_order: i32,
    /// Field directory listings are ordered by.
    pub order_field: OrderField,
    /// Whether listings are reversed.
    pub reverse: bool,
    /// Byte quota of this mount.
    pub capacity: i64,
    /// Whether the storage is mounted.
    pub activated: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StorageMount {
    /// Quota as an unsigned byte count.
    pub fn capacity_bytes(&self) -> u64 {
        u64::try_from(self.capacity).unwrap_or(0)
    }
}

/// Data required to register a new storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStorage {
    pub mount_name: String,
    pub root_path: String,
    pub sort_order: i32,
    pub order_field: OrderField,
    pub reverse: bool,
    pub capacity: i64,
    pub activated: bool,
}

/// Replacement values for an existing storage record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStorage {
    pub mount_name: String,
    pub root_path: String,
    pub sort_order: i32,
    pub order_field: OrderField,
    pub reverse: bool,
    pub capacity: i64,
}
