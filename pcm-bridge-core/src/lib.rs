//! # pcm-bridge-core
//!
//! Platform-agnostic real-time PCM16 audio bridge.
//!
//! Plays caller-supplied PCM16 through an output device and streams
//! microphone PCM16 back as ordered frames. Platform backends (Windows
//! WASAPI, or the in-process simulated platform) implement the
//! `AudioPlatform` and `RoutingBackend` traits and plug into the engines.
//!
//! ## Architecture
//!
//! ```text
//! pcm-bridge-core (this crate)
//! ├── traits/       ← AudioPlatform, OutputDevice, InputDevice, AudioEffect, RoutingBackend, ArtifactStore
//! ├── models/       ← BridgeError, AudioSessionConfig, AudioFrame, PlaybackState, diagnostics
//! ├── sizing/       ← DeviceBufferSizer
//! ├── routing/      ← AudioRoutingController (reference-counted communication mode)
//! ├── playback/     ← PlaybackEngine (synchronous, caller's thread)
//! ├── capture/      ← CaptureEngine (one worker thread per session)
//! ├── session/      ← DuplexSession (both halves, shared routing)
//! ├── processing/   ← PCM16 LE codec, test tone, WAV container
//! ├── storage/      ← DirectoryStore, RecordingExporter
//! ├── sync/         ← CancellationToken, WorkerHandle
//! └── simulated/    ← SimulatedPlatform, SimulatedRouting
//! ```

pub mod capture;
pub mod models;
pub mod playback;
pub mod processing;
pub mod routing;
pub mod session;
pub mod simulated;
pub mod sizing;
pub mod storage;
pub mod sync;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use capture::engine::CaptureEngine;
pub use models::artifact::{ExportedRecording, StoredArtifact};
pub use models::audio_models::{
    AudioMode, Availability, Capability, CaptureDiagnostics, ChannelLayout, ContentType, EffectStatus, InputSource,
    OutputRoute, PcmEncoding, PlaybackDiagnostics, StreamDirection, StreamUsage, VolumeStream, WriteReport,
};
pub use models::config::{AudioSessionConfig, BridgeConfiguration, CaptureOptions, PlaybackOptions};
pub use models::error::{BridgeError, BridgeResult};
pub use models::frame::AudioFrame;
pub use models::state::{CaptureState, PlaybackState};
pub use playback::engine::PlaybackEngine;
pub use routing::controller::AudioRoutingController;
pub use session::duplex::DuplexSession;
pub use simulated::{SimulatedPlatform, SimulatedRouting};
pub use sizing::buffer_sizer::DeviceBufferSizer;
pub use storage::directory_store::DirectoryStore;
pub use storage::recording_export::RecordingExporter;
pub use sync::cancellation::CancellationToken;
pub use sync::worker::WorkerHandle;
pub use traits::artifact_store::ArtifactStore;
pub use traits::audio_effect::AudioEffect;
pub use traits::audio_platform::{AudioPlatform, InputStreamRequest, OutputStreamRequest};
pub use traits::frame_callback::FrameCallback;
pub use traits::input_device::InputDevice;
pub use traits::output_device::OutputDevice;
pub use traits::routing_backend::RoutingBackend;
