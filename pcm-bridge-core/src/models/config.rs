use serde::{Deserialize, Serialize};

use super::audio_models::{Capability, ChannelLayout, OutputRoute, PcmEncoding};
use super::error::{BridgeError, BridgeResult};

/// Lowest sample rate accepted by any backend.
pub const MIN_SAMPLE_RATE_HZ: u32 = 4_000;

/// Highest sample rate accepted by any backend.
pub const MAX_SAMPLE_RATE_HZ: u32 = 192_000;

/// Format of one live audio session.
///
/// Immutable once a session is created: changing the rate or layout means
/// tearing the session down and opening a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioSessionConfig {
    pub sample_rate_hz: u32,
    pub channels: ChannelLayout,
}

impl AudioSessionConfig {
    /// Build a config from raw caller values, validating both.
    pub fn new(sample_rate_hz: u32, channel_count: u16) -> BridgeResult<Self> {
        let config = Self {
            sample_rate_hz,
            channels: ChannelLayout::try_from(channel_count)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> BridgeResult<()> {
        if !(MIN_SAMPLE_RATE_HZ..=MAX_SAMPLE_RATE_HZ).contains(&self.sample_rate_hz) {
            return Err(BridgeError::Configuration(format!(
                "sample rate {}Hz outside {}..={}Hz",
                self.sample_rate_hz, MIN_SAMPLE_RATE_HZ, MAX_SAMPLE_RATE_HZ
            )));
        }
        Ok(())
    }

    /// Always 16: the bridge only speaks signed linear PCM16.
    pub fn bits_per_sample(&self) -> u16 {
        PcmEncoding::Pcm16.bits_per_sample()
    }

    pub fn encoding(&self) -> PcmEncoding {
        PcmEncoding::Pcm16
    }

    /// Bytes per interleaved frame (all channels of one sample instant).
    pub fn block_align(&self) -> u16 {
        self.channels.count() * PcmEncoding::Pcm16.bytes_per_sample() as u16
    }
}

impl Default for AudioSessionConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 24_000,
            channels: ChannelLayout::Mono,
        }
    }
}

/// Playback-side session options.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackOptions {
    /// Open the output with voice-communication usage and speech content,
    /// and switch global routing into communication mode.
    pub voice_communication: bool,

    /// Where communication audio is routed while the session is live.
    pub output_route: OutputRoute,

    /// Raise the voice-call stream to its maximum level on init.
    pub max_voice_call_volume: bool,

    /// Linear gain applied to the output device, `0.0..=1.0`.
    pub gain: f32,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            voice_communication: true,
            output_route: OutputRoute::Speaker,
            max_voice_call_volume: true,
            gain: 1.0,
        }
    }
}

/// Capture-side session options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureOptions {
    /// Record from the voice-communication source instead of the raw mic.
    pub voice_communication_source: bool,

    /// Attach and enable an echo canceller when the platform offers one.
    pub enable_echo_cancellation: bool,

    /// Attach and enable a noise suppressor when the platform offers one.
    pub enable_noise_suppression: bool,

    /// Attach and enable automatic gain control when the platform offers it.
    pub enable_automatic_gain_control: bool,

    /// Consecutive read failures tolerated before the worker starts backing off.
    pub read_error_threshold: u32,

    /// Pause between reads once the failure threshold is reached.
    pub read_error_backoff_ms: u64,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            voice_communication_source: true,
            enable_echo_cancellation: true,
            enable_noise_suppression: true,
            enable_automatic_gain_control: true,
            read_error_threshold: 8,
            read_error_backoff_ms: 20,
        }
    }
}

impl CaptureOptions {
    /// Whether the caller asked for `effect` on voice capture.
    pub fn wants_effect(&self, effect: Capability) -> bool {
        match effect {
            Capability::EchoCancellation => self.enable_echo_cancellation,
            Capability::NoiseSuppression => self.enable_noise_suppression,
            Capability::AutomaticGainControl => self.enable_automatic_gain_control,
        }
    }
}

/// Complete bridge configuration, loadable from JSON.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfiguration {
    pub session: AudioSessionConfig,
    pub playback: PlaybackOptions,
    pub capture: CaptureOptions,
}

impl BridgeConfiguration {
    pub fn from_json(json: &str) -> BridgeResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| BridgeError::Configuration(format!("invalid bridge configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> BridgeResult<()> {
        self.session.validate()?;
        if !(0.0..=1.0).contains(&self.playback.gain) {
            return Err(BridgeError::Configuration(format!(
                "playback gain {} outside 0.0..=1.0",
                self.playback.gain
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_mono_and_stereo() {
        let mono = AudioSessionConfig::new(16_000, 1).unwrap();
        assert_eq!(mono.channels, ChannelLayout::Mono);
        assert_eq!(mono.block_align(), 2);

        let stereo = AudioSessionConfig::new(48_000, 2).unwrap();
        assert_eq!(stereo.channels, ChannelLayout::Stereo);
        assert_eq!(stereo.block_align(), 4);
        assert_eq!(stereo.bits_per_sample(), 16);
    }

    #[test]
    fn rejects_unsupported_channel_counts() {
        for channels in [0u16, 3, 6] {
            let err = AudioSessionConfig::new(48_000, channels).unwrap_err();
            assert!(matches!(err, BridgeError::Configuration(_)));
        }
    }

    #[test]
    fn rejects_out_of_range_rates() {
        assert!(matches!(
            AudioSessionConfig::new(0, 1),
            Err(BridgeError::Configuration(_))
        ));
        assert!(matches!(
            AudioSessionConfig::new(MAX_SAMPLE_RATE_HZ + 1, 1),
            Err(BridgeError::Configuration(_))
        ));
        assert!(AudioSessionConfig::new(MIN_SAMPLE_RATE_HZ, 1).is_ok());
    }

    #[test]
    fn configuration_from_json_fills_defaults() {
        let config = BridgeConfiguration::from_json(
            r#"{ "session": { "sample_rate_hz": 16000, "channels": 1 },
                 "playback": { "output_route": "earpiece" } }"#,
        )
        .unwrap();

        assert_eq!(config.session.sample_rate_hz, 16_000);
        assert_eq!(config.playback.output_route, OutputRoute::Earpiece);
        assert!(config.playback.voice_communication);
        assert_eq!(config.capture, CaptureOptions::default());
    }

    #[test]
    fn configuration_from_json_rejects_bad_channels() {
        let err = BridgeConfiguration::from_json(
            r#"{ "session": { "sample_rate_hz": 16000, "channels": 5 } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, BridgeError::Configuration(_)));
    }

    #[test]
    fn capture_effects_can_be_switched_off_individually() {
        let config = BridgeConfiguration::from_json(r#"{ "capture": { "enable_noise_suppression": false } }"#).unwrap();
        assert!(config.capture.wants_effect(Capability::EchoCancellation));
        assert!(!config.capture.wants_effect(Capability::NoiseSuppression));
        assert!(config.capture.wants_effect(Capability::AutomaticGainControl));
    }

    #[test]
    fn configuration_rejects_gain_out_of_range() {
        let err = BridgeConfiguration::from_json(r#"{ "playback": { "gain": 1.5 } }"#).unwrap_err();
        assert!(matches!(err, BridgeError::Configuration(_)));
    }
}
