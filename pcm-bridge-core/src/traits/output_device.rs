use crate::models::error::BridgeResult;

/// A live output device handle.
///
/// Owned exclusively by the playback engine and only touched between a
/// successful ready check and [`release`](OutputDevice::release).
pub trait OutputDevice: Send {
    /// Whether the handle reached its initialized state.
    fn is_ready(&self) -> bool;

    /// Start (or resume) pulling written data to the hardware.
    fn play(&mut self) -> BridgeResult<()>;

    fn pause(&mut self) -> BridgeResult<()>;

    /// Blocking write of little-endian PCM16 bytes.
    ///
    /// Returns once the device accepted the buffer; the count may be short.
    fn write_blocking(&mut self, bytes: &[u8]) -> BridgeResult<usize>;

    /// Linear gain, `0.0..=1.0`.
    fn set_volume(&mut self, gain: f32) -> BridgeResult<()>;

    fn stop(&mut self) -> BridgeResult<()>;

    /// Free the underlying resource. No call is valid afterwards.
    fn release(&mut self);
}
