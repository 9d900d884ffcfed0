use std::sync::Arc;

use crate::models::audio_models::{
    ContentType, OutputRoute, PlaybackDiagnostics, StreamDirection, StreamUsage, WriteReport,
};
use crate::models::config::{AudioSessionConfig, PlaybackOptions};
use crate::models::error::{BridgeError, BridgeResult};
use crate::models::state::PlaybackState;
use crate::processing::{pcm, tone};
use crate::routing::controller::AudioRoutingController;
use crate::sizing::buffer_sizer::DeviceBufferSizer;
use crate::traits::audio_platform::{AudioPlatform, OutputStreamRequest};
use crate::traits::output_device::OutputDevice;

/// One live output session. Dropped only through [`PlaybackEngine::stop`].
struct PlaybackSession {
    device: Box<dyn OutputDevice>,
    config: AudioSessionConfig,
    buffer_size_bytes: u32,
    paused: bool,
    // Whether this session took a communication hold on the routing controller.
    holds_routing: bool,
}

/// Synchronous PCM16 playback on the caller's thread.
///
/// ```text
/// init(rate, ch) → [sizer] → [OutputDevice] → play(&[i16]) → [LE bytes] → write_blocking
/// ```
///
/// Every write blocks until the device accepted it, so calls are ordered by
/// construction. Methods take `&mut self`; callers that share an engine
/// across threads wrap it in a mutex.
pub struct PlaybackEngine {
    platform: Arc<dyn AudioPlatform>,
    sizer: DeviceBufferSizer,
    routing: Arc<AudioRoutingController>,
    options: PlaybackOptions,
    session: Option<PlaybackSession>,
    diagnostics: PlaybackDiagnostics,
}

impl PlaybackEngine {
    pub fn new(
        platform: Arc<dyn AudioPlatform>,
        routing: Arc<AudioRoutingController>,
        options: PlaybackOptions,
    ) -> Self {
        let sizer = DeviceBufferSizer::new(Arc::clone(&platform));
        let options = PlaybackOptions {
            gain: clamp_gain(options.gain),
            ..options
        };
        Self {
            platform,
            sizer,
            routing,
            options,
            session: None,
            diagnostics: PlaybackDiagnostics::default(),
        }
    }

    /// Open an output session. Transitions: any → ready.
    ///
    /// An existing session is torn down first. On error no device handle is
    /// left open and the engine stays uninitialized.
    pub fn init(&mut self, sample_rate_hz: u32, channels: u16) -> BridgeResult<()> {
        if self.session.is_some() {
            log::debug!("Playback re-initialized, releasing previous session");
            self.stop()?;
        }

        let config = AudioSessionConfig::new(sample_rate_hz, channels)?;
        let buffer_size_bytes = self.sizer.require(StreamDirection::Output, &config)?;

        let voice = self.options.voice_communication;
        let (usage, content) = if voice {
            (StreamUsage::VoiceCommunication, ContentType::Speech)
        } else {
            (StreamUsage::Media, ContentType::Music)
        };
        let request = OutputStreamRequest {
            config,
            buffer_size_bytes,
            usage,
            content,
        };

        let mut device = self.platform.open_output(&request)?;
        if !device.is_ready() {
            device.release();
            return Err(BridgeError::Initialization(format!(
                "output device not ready at {}Hz, {} channel(s)",
                sample_rate_hz, channels
            )));
        }

        if let Err(e) = device.set_volume(self.options.gain) {
            log::warn!("Failed to apply output gain {}: {}", self.options.gain, e);
        }

        if voice {
            self.routing.enable_communication_routing_to(self.options.output_route);
            if self.options.max_voice_call_volume {
                self.routing.set_max_voice_call_volume();
            }
        }

        if let Err(e) = device.play() {
            device.release();
            if voice {
                self.routing.reset_routing();
            }
            return Err(BridgeError::Initialization(format!("output device failed to start: {}", e)));
        }

        log::info!(
            "Playback initialized: {}Hz, {} channel(s), buffer {} bytes, usage {:?}",
            sample_rate_hz,
            channels,
            buffer_size_bytes,
            usage
        );

        self.session = Some(PlaybackSession {
            device,
            config,
            buffer_size_bytes,
            paused: false,
            holds_routing: voice,
        });
        Ok(())
    }

    /// Blocking write of PCM16 samples, encoded little-endian.
    ///
    /// A short write is reported in the returned [`WriteReport`], not raised.
    pub fn play(&mut self, samples: &[i16]) -> BridgeResult<WriteReport> {
        ready_session(&mut self.session)?;
        let bytes = pcm::encode_le(samples);
        self.write(&bytes)
    }

    /// Blocking write of already encoded little-endian PCM16 bytes.
    pub fn play_bytes(&mut self, bytes: &[u8]) -> BridgeResult<WriteReport> {
        ready_session(&mut self.session)?;
        if !bytes.len().is_multiple_of(2) {
            return Err(BridgeError::Configuration(format!(
                "PCM16 payload has odd length {}",
                bytes.len()
            )));
        }
        self.write(bytes)
    }

    /// Play two seconds of a full-scale 440 Hz sine through the normal write path.
    pub fn test_tone(&mut self) -> BridgeResult<WriteReport> {
        let sample_rate_hz = ready_session(&mut self.session)?.config.sample_rate_hz;
        let samples = tone::test_tone(sample_rate_hz)?;
        log::debug!("Playing test tone: {} samples at {}Hz", samples.len(), sample_rate_hz);
        self.play(&samples)
    }

    /// Halt and release the device. Idempotent.
    ///
    /// Device stop failures are logged; the handle is released regardless.
    pub fn stop(&mut self) -> BridgeResult<()> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };

        if let Err(e) = session.device.stop() {
            log::warn!("Failed to stop output device: {}", e);
        }
        session.device.release();

        if session.holds_routing {
            self.routing.reset_routing();
        }
        log::info!("Playback stopped");
        Ok(())
    }

    /// Pause the device, keeping the handle. Transitions: ready → paused.
    pub fn pause(&mut self) -> BridgeResult<()> {
        let session = self.session.as_mut().ok_or(BridgeError::NotInitialized)?;
        if session.paused {
            return Ok(());
        }
        session.device.pause()?;
        session.paused = true;
        log::debug!("Playback paused");
        Ok(())
    }

    /// Transitions: paused → ready.
    pub fn resume(&mut self) -> BridgeResult<()> {
        let session = self.session.as_mut().ok_or(BridgeError::NotInitialized)?;
        if !session.paused {
            return Ok(());
        }
        session.device.play()?;
        session.paused = false;
        log::debug!("Playback resumed");
        Ok(())
    }

    /// Set the linear output gain, clamped to `0.0..=1.0`. Kept across re-init.
    pub fn set_gain(&mut self, gain: f32) -> BridgeResult<()> {
        if gain.is_nan() {
            return Err(BridgeError::Configuration("gain is NaN".into()));
        }
        let gain = clamp_gain(gain);
        self.options.gain = gain;
        if let Some(session) = self.session.as_mut() {
            session.device.set_volume(gain)?;
        }
        Ok(())
    }

    /// Change where communication audio is routed.
    ///
    /// A live session is rebuilt at the same format so the route applies
    /// immediately; a paused session comes back paused.
    pub fn set_output_route(&mut self, route: OutputRoute) -> BridgeResult<()> {
        self.options.output_route = route;
        let Some(session) = self.session.as_ref() else {
            return Ok(());
        };
        if !session.holds_routing {
            return Ok(());
        }

        let config = session.config;
        let was_paused = session.paused;
        log::debug!("Rebuilding playback session for output route {:?}", route);
        self.init(config.sample_rate_hz, config.channels.count())?;
        if was_paused {
            self.pause()?;
        }
        Ok(())
    }

    pub fn state(&self) -> PlaybackState {
        match &self.session {
            None => PlaybackState::Uninitialized,
            Some(session) if session.paused => PlaybackState::Paused,
            Some(_) => PlaybackState::Ready,
        }
    }

    /// Session format, if a session is live.
    pub fn config(&self) -> Option<AudioSessionConfig> {
        self.session.as_ref().map(|s| s.config)
    }

    pub fn sample_rate_hz(&self) -> Option<u32> {
        self.session.as_ref().map(|s| s.config.sample_rate_hz)
    }

    /// Device buffer negotiated at init, in bytes.
    pub fn buffer_size_bytes(&self) -> Option<u32> {
        self.session.as_ref().map(|s| s.buffer_size_bytes)
    }

    pub fn diagnostics(&self) -> PlaybackDiagnostics {
        self.diagnostics
    }

    fn write(&mut self, bytes: &[u8]) -> BridgeResult<WriteReport> {
        let session = ready_session(&mut self.session)?;
        let bytes_written = session.device.write_blocking(bytes)?;
        let report = WriteReport {
            bytes_requested: bytes.len(),
            bytes_written,
        };
        self.diagnostics.record(&report);

        log::debug!("Playback wrote {}/{} bytes", report.bytes_written, report.bytes_requested);
        if report.is_short() {
            log::warn!(
                "Short playback write: {} of {} bytes accepted",
                report.bytes_written,
                report.bytes_requested
            );
        }
        Ok(report)
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

fn ready_session(session: &mut Option<PlaybackSession>) -> BridgeResult<&mut PlaybackSession> {
    match session {
        None => Err(BridgeError::NotInitialized),
        Some(s) if s.paused => Err(BridgeError::Paused),
        Some(s) => Ok(s),
    }
}

fn clamp_gain(gain: f32) -> f32 {
    if gain.is_nan() {
        return 1.0;
    }
    gain.clamp(0.0, 1.0)
}
