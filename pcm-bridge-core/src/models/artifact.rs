use serde::{Deserialize, Serialize};

/// Metadata recorded alongside an artifact persisted by a store.
///
/// Serialized as a JSON sidecar next to the stored bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredArtifact {
    pub id: String,
    pub name: String,
    pub locator: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub checksum: String,
    pub created_at: String,
}

impl StoredArtifact {
    pub fn new(name: &str, locator: &str, mime_type: &str, size_bytes: u64, checksum: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            locator: locator.to_string(),
            mime_type: mime_type.to_string(),
            size_bytes,
            checksum: checksum.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Result of exporting a captured recording.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedRecording {
    pub locator: String,
    pub duration_secs: f64,
    pub sample_count: usize,
    pub byte_count: usize,
}
