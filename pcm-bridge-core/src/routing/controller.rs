use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::audio_models::{AudioMode, OutputRoute, VolumeStream};
use crate::models::error::BridgeResult;
use crate::traits::routing_backend::RoutingBackend;

/// Owner of the device-wide audio mode, speaker routing and call volume.
///
/// Shared (`Arc`) between both engines. Communication mode is reference
/// counted: every [`enable_communication_routing`](Self::enable_communication_routing)
/// takes a hold and every [`reset_routing`](Self::reset_routing) gives one
/// back; the device returns to normal mode only when the last hold is
/// released. Speaker routing and volume are last-writer-wins.
///
/// Every operation is best effort. Backend failures are logged and counted
/// but never returned, since they affect audio quality rather than the
/// read/write path.
pub struct AudioRoutingController {
    backend: Arc<dyn RoutingBackend>,
    holds: Mutex<usize>,
    failures: AtomicU64,
}

impl AudioRoutingController {
    pub fn new(backend: Arc<dyn RoutingBackend>) -> Self {
        Self {
            backend,
            holds: Mutex::new(0),
            failures: AtomicU64::new(0),
        }
    }

    /// Enter communication mode with output forced to the loudspeaker.
    pub fn enable_communication_routing(&self) {
        self.enable_communication_routing_to(OutputRoute::Speaker);
    }

    /// Enter communication mode with the given output route.
    pub fn enable_communication_routing_to(&self, route: OutputRoute) {
        let holds = self.acquire();
        let speaker = match route {
            OutputRoute::Speaker => true,
            OutputRoute::Earpiece => false,
            OutputRoute::Auto => !self.backend.headset_connected(),
        };
        self.report("set speakerphone", self.backend.set_speakerphone(speaker));
        log::debug!("Communication routing held ({} holder(s)), speaker={}", holds, speaker);
    }

    /// Take a communication hold without touching speaker routing.
    ///
    /// Used by the capture side, which needs the communication mode for the
    /// voice input path but has no say in where output goes.
    pub fn hold_communication_mode(&self) {
        let holds = self.acquire();
        log::debug!("Communication mode held ({} holder(s))", holds);
    }

    /// Raise the voice-call stream to its maximum level.
    pub fn set_max_voice_call_volume(&self) {
        let result = self
            .backend
            .max_volume(VolumeStream::VoiceCall)
            .and_then(|max| self.backend.set_volume(VolumeStream::VoiceCall, max));
        self.report("set voice call volume", result);
    }

    /// Release one communication hold; restore normal mode when none remain.
    pub fn reset_routing(&self) {
        let mut holds = self.holds.lock();
        *holds = holds.saturating_sub(1);
        if *holds > 0 {
            log::debug!("Routing reset deferred, {} holder(s) remain", *holds);
            return;
        }
        self.report("restore normal mode", self.backend.set_audio_mode(AudioMode::Normal));
        self.report("clear speakerphone", self.backend.set_speakerphone(false));
    }

    /// Number of outstanding communication holds.
    pub fn communication_holds(&self) -> usize {
        *self.holds.lock()
    }

    /// Routing operations that failed since creation.
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    fn acquire(&self) -> usize {
        let mut holds = self.holds.lock();
        *holds += 1;
        if *holds == 1 {
            self.report("set communication mode", self.backend.set_audio_mode(AudioMode::InCommunication));
        }
        *holds
    }

    fn report(&self, operation: &str, result: BridgeResult<()>) {
        if let Err(e) = result {
            self.failures.fetch_add(1, Ordering::Relaxed);
            log::warn!("Routing: {} failed: {}", operation, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulated::{RoutingCall, SimulatedRouting};

    fn controller() -> (SimulatedRouting, AudioRoutingController) {
        let backend = SimulatedRouting::new();
        let controller = AudioRoutingController::new(Arc::new(backend.clone()));
        (backend, controller)
    }

    #[test]
    fn enable_enters_communication_on_speaker() {
        let (backend, controller) = controller();
        controller.enable_communication_routing();

        assert_eq!(backend.mode(), AudioMode::InCommunication);
        assert!(backend.speakerphone());
        assert_eq!(controller.communication_holds(), 1);
    }

    #[test]
    fn max_volume_uses_backend_maximum() {
        let (backend, controller) = controller();
        controller.set_max_voice_call_volume();
        assert_eq!(backend.volume(VolumeStream::VoiceCall), backend.max_level());
    }

    #[test]
    fn reset_waits_for_last_holder() {
        let (backend, controller) = controller();
        controller.enable_communication_routing();
        controller.enable_communication_routing();

        controller.reset_routing();
        assert_eq!(backend.mode(), AudioMode::InCommunication);

        controller.reset_routing();
        assert_eq!(backend.mode(), AudioMode::Normal);
        assert!(!backend.speakerphone());
        assert_eq!(controller.communication_holds(), 0);
    }

    #[test]
    fn reset_without_holds_restores_normal() {
        let (backend, controller) = controller();
        controller.reset_routing();
        assert_eq!(backend.mode(), AudioMode::Normal);
        assert_eq!(controller.communication_holds(), 0);
    }

    #[test]
    fn auto_route_prefers_earpiece_with_headset() {
        let (backend, controller) = controller();
        backend.set_headset_connected(true);
        controller.enable_communication_routing_to(OutputRoute::Auto);
        assert!(!backend.speakerphone());

        backend.set_headset_connected(false);
        controller.enable_communication_routing_to(OutputRoute::Auto);
        assert!(backend.speakerphone());
    }

    #[test]
    fn failures_are_counted_not_raised() {
        let (backend, controller) = controller();
        backend.set_failing(true);

        controller.enable_communication_routing();
        controller.set_max_voice_call_volume();
        controller.reset_routing();

        assert_eq!(backend.mode(), AudioMode::Normal);
        assert!(controller.failure_count() >= 3);
    }

    #[test]
    fn mode_hold_keeps_speaker_untouched() {
        let (backend, controller) = controller();
        controller.hold_communication_mode();

        assert_eq!(backend.mode(), AudioMode::InCommunication);
        assert!(backend.calls().iter().all(|c| !matches!(c, RoutingCall::SetSpeakerphone(_))));

        controller.enable_communication_routing();
        controller.reset_routing();
        assert_eq!(backend.mode(), AudioMode::InCommunication);
        controller.reset_routing();
        assert_eq!(backend.mode(), AudioMode::Normal);
    }
}
