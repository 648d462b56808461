//! Deterministic upload session identifiers.

use uuid::Uuid;

/// Session id of an upload: a UUIDv3 in the OID namespace over the file's
/// name, declared size, modification time and media type. Re-submitting
/// the same logical file always yields the same id.
pub fn session_id(name: &str, size: u64, modified: i64, mime_type: &str) -> String {
    Uuid::new_v3(
        &Uuid::NAMESPACE_OID,
        format!("{name}_{size}_{modified}_{mime_type}").as_bytes(),
    )
    .to_string()
}
