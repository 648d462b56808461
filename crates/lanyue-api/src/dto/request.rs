//! Request DTOs.

use serde::Deserialize;

use lanyue_core::result::AppResult;
use lanyue_core::types::VirtualPath;
use lanyue_entity::storage::{CreateStorage, OrderField, UpdateStorage};
use lanyue_entity::upload::UploadStatus;

fn first_page() -> u64 {
    1
}

/// A virtual path, optionally with a page number.
#[derive(Debug, Clone, Deserialize)]
pub struct PathRequest {
    pub path: String,
    #[serde(default = "first_page")]
    pub page: u64,
}

impl PathRequest {
    pub fn virtual_path(&self) -> AppResult<VirtualPath> {
        VirtualPath::parse(&self.path)
    }
}

/// A path plus a single entry name (mkdir, rename).
#[derive(Debug, Clone, Deserialize)]
pub struct NamedPathRequest {
    pub path: String,
    pub name: String,
}

/// Move or copy named entries between directories.
#[derive(Debug, Clone, Deserialize)]
pub struct TransferRequest {
    pub src_dir: String,
    pub dst_dir: String,
    pub names: Vec<String>,
}

/// Remove named entries of one directory.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoveRequest {
    pub path: String,
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub path: String,
    pub name: String,
    #[serde(default)]
    pub is_dir: bool,
    #[serde(default = "first_page")]
    pub page: u64,
}

/// Query of `GET /fs/source`.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceQuery {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionRequest {
    pub session_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClearRequest {
    pub status: UploadStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdRequest {
    pub id: i64,
}

/// New storage. Omitted fields take their defaults; an omitted capacity
/// takes the configured default mount capacity.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateStorageRequest {
    pub mount_name: String,
    pub root_path: String,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub order_field: OrderField,
    #[serde(default)]
    pub reverse: bool,
    pub capacity: Option<i64>,
    #[serde(default = "default_activated")]
    pub activated: bool,
}

fn default_activated() -> bool {
    true
}

impl CreateStorageRequest {
    pub fn into_create(self, default_capacity: u64) -> CreateStorage {
        CreateStorage {
            mount_name: self.mount_name,
            root_path: self.root_path,
            sort_order: self.sort_order,
            order_field: self.order_field,
            reverse: self.reverse,
            capacity: self
                .capacity
                .unwrap_or_else(|| i64::try_from(default_capacity).unwrap_or(i64::MAX)),
            activated: self.activated,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStorageRequest {
    pub id: i64,
    #[serde(flatten)]
    pub data: UpdateStorage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_storage_defaults() {
        let req: CreateStorageRequest =
            serde_json::from_str(r#"{"mount_name":"docs","root_path":"/srv/docs"}"#).unwrap();
        let data = req.into_create(1024);
        assert_eq!(data.capacity, 1024);
        assert!(data.activated);
        assert_eq!(data.order_field, OrderField::Name);
    }

    #[test]
    fn test_path_request_defaults_to_first_page() {
        let req: PathRequest = serde_json::from_str(r#"{"path":"/docs//a/"}"#).unwrap();
        assert_eq!(req.page, 1);
        assert_eq!(req.virtual_path().unwrap().to_string(), "/docs/a");
    }
}
