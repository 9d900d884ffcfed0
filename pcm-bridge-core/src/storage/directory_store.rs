use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::models::artifact::StoredArtifact;
use crate::models::error::{BridgeError, BridgeResult};
use crate::traits::artifact_store::ArtifactStore;

const FILE_SCHEME: &str = "file://";

/// [`ArtifactStore`] backed by a local directory.
///
/// Each artifact is written under a sanitized, uniquified file name with a
/// `{stem}.metadata.json` sidecar holding its [`StoredArtifact`] record.
/// Locators are `file://` URLs.
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a locator returned by [`store`](ArtifactStore::store) to a path.
    pub fn path_for(&self, locator: &str) -> BridgeResult<PathBuf> {
        locator
            .strip_prefix(FILE_SCHEME)
            .map(PathBuf::from)
            .ok_or_else(|| BridgeError::Storage(format!("not a file locator: {}", locator)))
    }

    /// Read the sidecar record of a stored artifact.
    pub fn read_metadata(&self, locator: &str) -> BridgeResult<StoredArtifact> {
        let metadata_path = self.path_for(locator)?.with_extension("metadata.json");
        let json = fs::read_to_string(&metadata_path)
            .map_err(|e| BridgeError::Storage(format!("failed to read metadata: {}", e)))?;
        serde_json::from_str(&json).map_err(|e| BridgeError::Storage(format!("failed to parse metadata: {}", e)))
    }
}

impl ArtifactStore for DirectoryStore {
    fn store(&self, bytes: &[u8], name: &str, mime_type: &str) -> BridgeResult<String> {
        fs::create_dir_all(&self.root)
            .map_err(|e| BridgeError::Storage(format!("failed to create directory: {}", e)))?;

        let path = self.root.join(unique_file_name(name));
        fs::write(&path, bytes).map_err(|e| BridgeError::Storage(format!("failed to write artifact: {}", e)))?;

        let locator = format!("{}{}", FILE_SCHEME, path.display());
        let artifact = StoredArtifact::new(name, &locator, mime_type, bytes.len() as u64, &sha256_hex(bytes));
        write_metadata(&artifact, &path)?;

        log::info!("Stored {} ({} bytes, {}) at {}", name, bytes.len(), mime_type, path.display());
        Ok(locator)
    }
}

fn write_metadata(artifact: &StoredArtifact, artifact_path: &Path) -> BridgeResult<()> {
    let metadata_path = artifact_path.with_extension("metadata.json");
    let json = serde_json::to_string_pretty(artifact)
        .map_err(|e| BridgeError::Storage(format!("failed to serialize metadata: {}", e)))?;
    fs::write(&metadata_path, json).map_err(|e| BridgeError::Storage(format!("failed to write metadata: {}", e)))
}

/// SHA-256 hex digest.
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes).iter().map(|b| format!("{:02x}", b)).collect()
}

/// `{sanitized stem}_{short uuid}.{ext}` so repeated names never collide.
fn unique_file_name(name: &str) -> String {
    let sanitized = sanitize_file_name(name);
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let suffix = &suffix[..8];

    match sanitized.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => format!("{}_{}.{}", stem, suffix, ext),
        _ => format!("{}_{}", sanitized, suffix),
    }
}

/// Keep ASCII alphanumerics, `-`, `_` and `.`; replace everything else.
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "artifact".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store_dir() -> PathBuf {
        std::env::temp_dir().join(format!("pcm_bridge_store_{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn store_writes_bytes_and_sidecar() {
        let dir = temp_store_dir();
        let store = DirectoryStore::new(&dir);

        let locator = store.store(b"hello", "greeting.wav", "audio/wav").unwrap();
        assert!(locator.starts_with("file://"));

        let path = store.path_for(&locator).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"hello");

        let metadata = store.read_metadata(&locator).unwrap();
        assert_eq!(metadata.name, "greeting.wav");
        assert_eq!(metadata.locator, locator);
        assert_eq!(metadata.mime_type, "audio/wav");
        assert_eq!(metadata.size_bytes, 5);
        assert_eq!(
            metadata.checksum,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn repeated_names_do_not_collide() {
        let dir = temp_store_dir();
        let store = DirectoryStore::new(&dir);

        let first = store.store(b"a", "take.wav", "audio/wav").unwrap();
        let second = store.store(b"b", "take.wav", "audio/wav").unwrap();
        assert_ne!(first, second);
        assert_eq!(fs::read(store.path_for(&first).unwrap()).unwrap(), b"a");
        assert_eq!(fs::read(store.path_for(&second).unwrap()).unwrap(), b"b");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn hostile_names_stay_inside_root() {
        let dir = temp_store_dir();
        let store = DirectoryStore::new(&dir);

        let locator = store.store(b"x", "../../etc/passwd", "text/plain").unwrap();
        let path = store.path_for(&locator).unwrap();
        assert_eq!(path.parent().unwrap(), dir.as_path());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn sanitize_examples() {
        assert_eq!(sanitize_file_name("call 1.wav"), "call_1.wav");
        assert_eq!(sanitize_file_name("..."), "artifact");
        assert_eq!(sanitize_file_name(""), "artifact");
        assert!(unique_file_name("rec.wav").starts_with("rec_"));
        assert!(unique_file_name("rec.wav").ends_with(".wav"));
    }

    #[test]
    fn foreign_locator_is_rejected() {
        let store = DirectoryStore::new(temp_store_dir());
        assert!(matches!(store.path_for("content://media/1"), Err(BridgeError::Storage(_))));
    }
}
