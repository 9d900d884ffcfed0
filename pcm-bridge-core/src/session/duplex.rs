use std::sync::Arc;

use crate::capture::engine::CaptureEngine;
use crate::models::config::BridgeConfiguration;
use crate::models::error::BridgeResult;
use crate::playback::engine::PlaybackEngine;
use crate::routing::controller::AudioRoutingController;
use crate::traits::audio_platform::AudioPlatform;
use crate::traits::frame_callback::FrameCallback;
use crate::traits::routing_backend::RoutingBackend;

/// Two-way audio: one playback and one capture engine sharing a routing controller.
///
/// ```text
///                 ┌→ PlaybackEngine ─┐
/// [AudioPlatform] ┤                  ├→ AudioRoutingController → [RoutingBackend]
///                 └→ CaptureEngine ──┘
/// ```
///
/// Both halves run at the format in [`BridgeConfiguration::session`].
/// [`suspend`](Self::suspend)/[`resume`](Self::resume) pause only the
/// playback half, which is what an application moving to the background needs.
pub struct DuplexSession {
    config: BridgeConfiguration,
    routing: Arc<AudioRoutingController>,
    playback: PlaybackEngine,
    capture: CaptureEngine,
}

impl DuplexSession {
    pub fn new(
        platform: Arc<dyn AudioPlatform>,
        routing_backend: Arc<dyn RoutingBackend>,
        config: BridgeConfiguration,
    ) -> BridgeResult<Self> {
        config.validate()?;
        let routing = Arc::new(AudioRoutingController::new(routing_backend));
        let playback = PlaybackEngine::new(Arc::clone(&platform), Arc::clone(&routing), config.playback);
        let capture = CaptureEngine::new(platform, Arc::clone(&routing), config.capture);
        Ok(Self {
            config,
            routing,
            playback,
            capture,
        })
    }

    /// Initialize playback, then start capture. Either both run or neither does.
    pub fn start(&mut self, on_frame: FrameCallback) -> BridgeResult<()> {
        let session = self.config.session;
        self.playback.init(session.sample_rate_hz, session.channels.count())?;
        if let Err(e) = self.capture.start(session.sample_rate_hz, session.channels.count(), on_frame) {
            self.playback.stop()?;
            return Err(e);
        }
        Ok(())
    }

    /// Stop capture and playback. Both are attempted; the first error is returned.
    pub fn stop(&mut self) -> BridgeResult<()> {
        let capture = self.capture.stop();
        let playback = self.playback.stop();
        capture.and(playback)
    }

    /// Pause playback while capture keeps running.
    pub fn suspend(&mut self) -> BridgeResult<()> {
        self.playback.pause()
    }

    pub fn resume(&mut self) -> BridgeResult<()> {
        self.playback.resume()
    }

    pub fn is_active(&self) -> bool {
        self.playback.state().has_session() || self.capture.state().is_capturing()
    }

    pub fn config(&self) -> &BridgeConfiguration {
        &self.config
    }

    pub fn playback(&mut self) -> &mut PlaybackEngine {
        &mut self.playback
    }

    pub fn capture(&self) -> &CaptureEngine {
        &self.capture
    }

    pub fn routing(&self) -> &Arc<AudioRoutingController> {
        &self.routing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::audio_models::AudioMode;
    use crate::models::config::AudioSessionConfig;
    use crate::models::error::BridgeError;
    use crate::models::frame::AudioFrame;
    use crate::models::state::{CaptureState, PlaybackState};
    use crate::simulated::{SimulatedPlatform, SimulatedRouting};

    fn noop() -> FrameCallback {
        Arc::new(|_frame: AudioFrame| {})
    }

    fn session_with(platform: &SimulatedPlatform, routing: &SimulatedRouting, config: BridgeConfiguration) -> DuplexSession {
        DuplexSession::new(Arc::new(platform.clone()), Arc::new(routing.clone()), config).unwrap()
    }

    #[test]
    fn start_and_stop_both_halves() {
        let platform = SimulatedPlatform::new();
        let routing = SimulatedRouting::new();
        let mut session = session_with(&platform, &routing, BridgeConfiguration::default());

        session.start(noop()).unwrap();
        assert!(session.is_active());
        assert_eq!(platform.open_outputs(), 1);
        assert_eq!(platform.open_inputs(), 1);
        assert_eq!(session.routing().communication_holds(), 2);

        session.stop().unwrap();
        assert!(!session.is_active());
        assert_eq!(platform.open_outputs(), 0);
        assert_eq!(platform.open_inputs(), 0);
        assert_eq!(routing.mode(), AudioMode::Normal);
    }

    #[test]
    fn capture_failure_rolls_back_playback() {
        let platform = SimulatedPlatform::new();
        platform.set_input_ready(false);
        let routing = SimulatedRouting::new();
        let mut session = session_with(&platform, &routing, BridgeConfiguration::default());

        assert!(matches!(session.start(noop()), Err(BridgeError::Initialization(_))));
        assert_eq!(session.playback().state(), PlaybackState::Uninitialized);
        assert_eq!(platform.open_outputs(), 0);
        assert_eq!(routing.mode(), AudioMode::Normal);
    }

    #[test]
    fn suspend_pauses_playback_only() {
        let platform = SimulatedPlatform::new();
        let routing = SimulatedRouting::new();
        let mut session = session_with(&platform, &routing, BridgeConfiguration::default());
        session.start(noop()).unwrap();

        session.suspend().unwrap();
        assert_eq!(session.playback().state(), PlaybackState::Paused);
        assert_eq!(session.capture().state(), CaptureState::Capturing);

        session.resume().unwrap();
        assert_eq!(session.playback().state(), PlaybackState::Ready);
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        let mut config = BridgeConfiguration::default();
        config.session = AudioSessionConfig {
            sample_rate_hz: 1,
            ..AudioSessionConfig::default()
        };
        let result = DuplexSession::new(
            Arc::new(SimulatedPlatform::new()),
            Arc::new(SimulatedRouting::new()),
            config,
        );
        assert!(matches!(result, Err(BridgeError::Configuration(_))));
    }
}
