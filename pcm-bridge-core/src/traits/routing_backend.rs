use crate::models::audio_models::{AudioMode, VolumeStream};
use crate::models::error::BridgeResult;

/// Platform hooks for global audio routing state.
///
/// This state is shared by every audio client on the device; callers go
/// through [`AudioRoutingController`](crate::routing::controller::AudioRoutingController)
/// rather than using a backend directly.
pub trait RoutingBackend: Send + Sync {
    fn set_audio_mode(&self, mode: AudioMode) -> BridgeResult<()>;

    fn set_speakerphone(&self, enabled: bool) -> BridgeResult<()>;

    fn max_volume(&self, stream: VolumeStream) -> BridgeResult<u32>;

    fn set_volume(&self, stream: VolumeStream, level: u32) -> BridgeResult<()>;

    /// Whether a wired or Bluetooth headset is currently an output.
    fn headset_connected(&self) -> bool;
}
