use crate::models::error::BridgeResult;

/// A live input device handle.
///
/// Shared between the capture engine and its worker thread, so every method
/// takes `&self`. [`stop`](InputDevice::stop) must unblock a pending
/// [`read_blocking`](InputDevice::read_blocking).
pub trait InputDevice: Send + Sync {
    fn is_ready(&self) -> bool;

    /// Platform audio session id, used to attach effects such as AEC.
    fn session_id(&self) -> u32;

    fn start_recording(&self) -> BridgeResult<()>;

    /// Blocking read of up to `buffer.len()` samples.
    ///
    /// `Ok(0)` means nothing was produced this cycle (including after stop).
    fn read_blocking(&self, buffer: &mut [i16]) -> BridgeResult<usize>;

    fn stop(&self) -> BridgeResult<()>;

    fn release(&self);
}
