use std::sync::Arc;

use crate::models::audio_models::{
    Availability, Capability, ChannelLayout, ContentType, InputSource, PcmEncoding, StreamDirection, StreamUsage,
};
use crate::models::config::AudioSessionConfig;
use crate::models::error::BridgeResult;
use crate::traits::audio_effect::AudioEffect;
use crate::traits::input_device::InputDevice;
use crate::traits::output_device::OutputDevice;

/// Parameters for opening an output stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputStreamRequest {
    pub config: AudioSessionConfig,
    pub buffer_size_bytes: u32,
    pub usage: StreamUsage,
    pub content: ContentType,
}

/// Parameters for opening an input stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputStreamRequest {
    pub config: AudioSessionConfig,
    pub buffer_size_bytes: u32,
    pub source: InputSource,
}

/// Entry point into a concrete audio backend.
///
/// Implemented by:
/// - `WasapiPlatform` (Windows)
/// - [`SimulatedPlatform`](crate::simulated::SimulatedPlatform) (in-process, deterministic)
pub trait AudioPlatform: Send + Sync {
    /// Minimum device buffer in bytes, or `None` when the combination is unsupported.
    fn min_buffer_size(
        &self,
        direction: StreamDirection,
        sample_rate_hz: u32,
        channels: ChannelLayout,
        encoding: PcmEncoding,
    ) -> Option<u32>;

    /// Allocate an output handle. The caller checks [`OutputDevice::is_ready`].
    fn open_output(&self, request: &OutputStreamRequest) -> BridgeResult<Box<dyn OutputDevice>>;

    /// Allocate an input handle. The caller checks [`InputDevice::is_ready`].
    ///
    /// Returned as `Arc` because the capture worker reads while the owner may stop it.
    fn open_input(&self, request: &InputStreamRequest) -> BridgeResult<Arc<dyn InputDevice>>;

    fn capability(&self, capability: Capability) -> Availability;

    /// Create `effect` bound to the input session, if the platform has one.
    fn create_effect(&self, effect: Capability, input: &dyn InputDevice) -> Option<Box<dyn AudioEffect>>;
}
