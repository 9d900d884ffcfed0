use std::sync::Arc;
use std::time::Duration;

use crate::models::audio_models::{ChannelLayout, PcmEncoding, StreamDirection};
use crate::models::config::{AudioSessionConfig, MAX_SAMPLE_RATE_HZ, MIN_SAMPLE_RATE_HZ};
use crate::models::error::{BridgeError, BridgeResult};
use crate::traits::audio_platform::AudioPlatform;

/// Minimum device buffer sizing, shared by both engines.
///
/// A `None` answer is the "unsupported" sentinel; engines turn it into
/// [`BridgeError::Configuration`] before any device is created.
#[derive(Clone)]
pub struct DeviceBufferSizer {
    platform: Arc<dyn AudioPlatform>,
}

impl DeviceBufferSizer {
    pub fn new(platform: Arc<dyn AudioPlatform>) -> Self {
        Self { platform }
    }

    /// Minimum buffer size in bytes for the given stream shape.
    pub fn minimum_buffer_size(
        &self,
        direction: StreamDirection,
        sample_rate_hz: u32,
        channels: ChannelLayout,
        encoding: PcmEncoding,
    ) -> Option<u32> {
        if !(MIN_SAMPLE_RATE_HZ..=MAX_SAMPLE_RATE_HZ).contains(&sample_rate_hz) {
            return None;
        }
        let size = self
            .platform
            .min_buffer_size(direction, sample_rate_hz, channels, encoding)?;
        // A zero-byte buffer can never carry a frame; treat it as unsupported.
        if size == 0 {
            return None;
        }
        Some(size)
    }

    /// Like [`minimum_buffer_size`](Self::minimum_buffer_size), but as a `Result`.
    pub fn require(&self, direction: StreamDirection, config: &AudioSessionConfig) -> BridgeResult<u32> {
        self.minimum_buffer_size(direction, config.sample_rate_hz, config.channels, config.encoding())
            .ok_or_else(|| {
                BridgeError::Configuration(format!(
                    "{:?} stream unsupported: {}Hz, {} channel(s), PCM16",
                    direction,
                    config.sample_rate_hz,
                    config.channels.count()
                ))
            })
    }
}

/// Bytes needed to hold `period` of PCM16 audio, rounded up to whole frames.
///
/// Used by backends whose hardware reports a period rather than a byte size.
pub fn bytes_for_period(sample_rate_hz: u32, channels: ChannelLayout, period: Duration) -> u32 {
    let frames = (sample_rate_hz as u128 * period.as_nanos()).div_ceil(1_000_000_000);
    let bytes = frames * channels.count() as u128 * PcmEncoding::Pcm16.bytes_per_sample() as u128;
    u32::try_from(bytes).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulated::SimulatedPlatform;

    fn sizer(platform: &SimulatedPlatform) -> DeviceBufferSizer {
        DeviceBufferSizer::new(Arc::new(platform.clone()))
    }

    #[test]
    fn supported_rates_yield_platform_minimum() {
        let platform = SimulatedPlatform::new();
        let sizer = sizer(&platform);

        for rate in [8_000u32, 16_000, 24_000, 48_000] {
            for channels in [ChannelLayout::Mono, ChannelLayout::Stereo] {
                let size = sizer
                    .minimum_buffer_size(StreamDirection::Output, rate, channels, PcmEncoding::Pcm16)
                    .unwrap();
                let platform_min = platform
                    .min_buffer_size(StreamDirection::Output, rate, channels, PcmEncoding::Pcm16)
                    .unwrap();
                assert!(size >= platform_min);
            }
        }
    }

    #[test]
    fn unsupported_rate_is_none() {
        let platform = SimulatedPlatform::new().with_supported_rates(&[16_000]);
        let sizer = sizer(&platform);

        assert!(sizer
            .minimum_buffer_size(StreamDirection::Input, 44_100, ChannelLayout::Mono, PcmEncoding::Pcm16)
            .is_none());
        assert!(sizer
            .minimum_buffer_size(StreamDirection::Input, 16_000, ChannelLayout::Mono, PcmEncoding::Pcm16)
            .is_some());
    }

    #[test]
    fn out_of_range_rate_never_reaches_platform() {
        let platform = SimulatedPlatform::new().with_supported_rates(&[1_000, 500_000]);
        let sizer = sizer(&platform);

        assert!(sizer
            .minimum_buffer_size(StreamDirection::Output, 1_000, ChannelLayout::Mono, PcmEncoding::Pcm16)
            .is_none());
        assert!(sizer
            .minimum_buffer_size(StreamDirection::Output, 500_000, ChannelLayout::Mono, PcmEncoding::Pcm16)
            .is_none());
    }

    #[test]
    fn require_maps_to_configuration_error() {
        let platform = SimulatedPlatform::new().with_supported_rates(&[16_000]);
        let config = AudioSessionConfig::new(22_050, 1).unwrap();

        let err = sizer(&platform).require(StreamDirection::Output, &config).unwrap_err();
        assert!(matches!(err, BridgeError::Configuration(_)));
    }

    #[test]
    fn period_to_bytes() {
        assert_eq!(bytes_for_period(48_000, ChannelLayout::Mono, Duration::from_millis(20)), 1_920);
        assert_eq!(bytes_for_period(48_000, ChannelLayout::Stereo, Duration::from_millis(20)), 3_840);
        // 44.1 kHz * 10 ms = 441 frames exactly; 11025 Hz * 10 ms rounds 110.25 up.
        assert_eq!(bytes_for_period(44_100, ChannelLayout::Mono, Duration::from_millis(10)), 882);
        assert_eq!(bytes_for_period(11_025, ChannelLayout::Mono, Duration::from_millis(10)), 222);
    }
}
