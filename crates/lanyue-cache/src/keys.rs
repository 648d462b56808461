//! Key builders for every entry Lanyue writes to the ephemeral store.

/// Marker that is present while an upload session is being written.
/// Removing it asks the writer to stop.
pub fn upload_marker(session_id: &str) -> String {
    format!("upload_{session_id}")
}
