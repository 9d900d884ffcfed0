use crate::models::error::BridgeResult;

/// Persists generated artifacts (exported recordings) outside the bridge.
pub trait ArtifactStore: Send + Sync {
    /// Store `bytes` under `name` and return a locator for the stored copy.
    fn store(&self, bytes: &[u8], name: &str, mime_type: &str) -> BridgeResult<String>;
}
