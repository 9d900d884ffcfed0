//! `AudioPlatform` over the default WASAPI endpoints.

use std::sync::Arc;
use std::time::Duration;

use windows::Win32::Media::Audio::IAudioClient;
use windows::Win32::System::Com::CLSCTX_ALL;

use pcm_bridge_core::models::audio_models::{Availability, Capability, ChannelLayout, PcmEncoding, StreamDirection};
use pcm_bridge_core::models::error::BridgeResult;
use pcm_bridge_core::sizing::buffer_sizer::bytes_for_period;
use pcm_bridge_core::traits::audio_effect::AudioEffect;
use pcm_bridge_core::traits::audio_platform::{AudioPlatform, InputStreamRequest, OutputStreamRequest};
use pcm_bridge_core::traits::input_device::InputDevice;
use pcm_bridge_core::traits::output_device::OutputDevice;

use crate::capture::WasapiInput;
use crate::com;
use crate::endpoint::{self, EndpointRole};
use crate::error::WasapiError;
use crate::render::WasapiOutput;

/// Shared-mode WASAPI platform.
///
/// Minimum buffers are the endpoint's default device period expressed at the
/// requested format; the stream converts to the mix format itself, so any
/// rate the sizer accepts is playable.
///
/// Echo cancellation is reported unavailable: shared-mode WASAPI has no
/// per-session toggle. Voice streams are tagged with the communications
/// category instead, which lets the endpoint apply its own voice processing.
#[derive(Debug, Default, Clone, Copy)]
pub struct WasapiPlatform;

impl WasapiPlatform {
    pub fn new() -> Self {
        Self
    }

    fn device_period(direction: StreamDirection) -> Result<Duration, WasapiError> {
        com::with_mta(|| {
            let device = endpoint::default_endpoint(direction, EndpointRole::Console)?;
            unsafe {
                let client: IAudioClient = device
                    .Activate(CLSCTX_ALL, None)
                    .map_err(WasapiError::call("IMMDevice::Activate"))?;
                let mut default_period: i64 = 0;
                client
                    .GetDevicePeriod(Some(&mut default_period as *mut i64), None)
                    .map_err(WasapiError::call("IAudioClient::GetDevicePeriod"))?;
                // Reported in 100-nanosecond units.
                Ok(Duration::from_nanos(default_period.max(0) as u64 * 100))
            }
        })
    }
}

impl AudioPlatform for WasapiPlatform {
    fn min_buffer_size(
        &self,
        direction: StreamDirection,
        sample_rate_hz: u32,
        channels: ChannelLayout,
        _encoding: PcmEncoding,
    ) -> Option<u32> {
        match Self::device_period(direction) {
            Ok(period) if !period.is_zero() => Some(bytes_for_period(sample_rate_hz, channels, period)),
            Ok(_) => None,
            Err(e) => {
                log::warn!("Cannot size {:?} buffer: {}", direction, e);
                None
            }
        }
    }

    fn open_output(&self, request: &OutputStreamRequest) -> BridgeResult<Box<dyn OutputDevice>> {
        Ok(Box::new(WasapiOutput::open(*request)?))
    }

    fn open_input(&self, request: &InputStreamRequest) -> BridgeResult<Arc<dyn InputDevice>> {
        Ok(Arc::new(WasapiInput::open(*request)?))
    }

    /// Shared-mode streams get the endpoint's own voice processing through
    /// the communications category; none of it is switchable per session.
    fn capability(&self, capability: Capability) -> Availability {
        match capability {
            Capability::EchoCancellation | Capability::NoiseSuppression | Capability::AutomaticGainControl => {
                Availability::Unavailable
            }
        }
    }

    fn create_effect(&self, _effect: Capability, _input: &dyn InputDevice) -> Option<Box<dyn AudioEffect>> {
        None
    }
}
