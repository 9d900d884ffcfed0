use crate::models::audio_models::Capability;
use crate::models::error::BridgeResult;

/// A voice-processing effect (echo cancellation, noise suppression or
/// automatic gain control) attached to one input session.
pub trait AudioEffect: Send {
    /// Which effect this handle controls.
    fn capability(&self) -> Capability;

    fn set_enabled(&mut self, enabled: bool) -> BridgeResult<()>;

    fn is_enabled(&self) -> bool;

    /// Whether this instance controls the effect (another client may own it).
    fn has_control(&self) -> bool;
}
