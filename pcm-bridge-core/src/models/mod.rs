pub mod artifact;
pub mod audio_models;
pub mod config;
pub mod error;
pub mod frame;
pub mod state;
