pub mod artifact_store;
pub mod audio_effect;
pub mod audio_platform;
pub mod frame_callback;
pub mod input_device;
pub mod output_device;
pub mod routing_backend;
