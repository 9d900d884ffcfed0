pub mod directory_store;
pub mod recording_export;
