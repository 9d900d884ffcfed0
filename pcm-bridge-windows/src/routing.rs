//! Routing backend over endpoint volume and form factor.
//!
//! Desktop Windows has no global call mode and no earpiece, so the mode and
//! speakerphone preference are recorded for inspection only. Volume and
//! headset detection go to the default render endpoint.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use windows::Win32::Media::Audio::Endpoints::IAudioEndpointVolume;
use windows::Win32::System::Com::CLSCTX_ALL;

use pcm_bridge_core::models::audio_models::{AudioMode, StreamDirection, VolumeStream};
use pcm_bridge_core::models::error::{BridgeError, BridgeResult};
use pcm_bridge_core::traits::routing_backend::RoutingBackend;

use crate::com;
use crate::endpoint::{self, EndpointRole};
use crate::error::WasapiError;

pub struct WasapiRouting {
    mode: Mutex<AudioMode>,
    speakerphone: AtomicBool,
}

impl WasapiRouting {
    pub fn new() -> Self {
        Self {
            mode: Mutex::new(AudioMode::Normal),
            speakerphone: AtomicBool::new(false),
        }
    }

    pub fn mode(&self) -> AudioMode {
        *self.mode.lock()
    }

    pub fn speakerphone(&self) -> bool {
        self.speakerphone.load(Ordering::SeqCst)
    }

    fn endpoint_volume(stream: VolumeStream) -> Result<IAudioEndpointVolume, WasapiError> {
        let role = match stream {
            VolumeStream::VoiceCall => EndpointRole::Communications,
            VolumeStream::Music => EndpointRole::Console,
        };
        let device = endpoint::default_endpoint(StreamDirection::Output, role)?;
        unsafe { device.Activate(CLSCTX_ALL, None) }.map_err(WasapiError::call("Activate(IAudioEndpointVolume)"))
    }

    /// Number of discrete volume steps, minus one: the highest level index.
    fn step_count(volume: &IAudioEndpointVolume) -> Result<u32, WasapiError> {
        let mut step = 0u32;
        let mut count = 0u32;
        unsafe { volume.GetVolumeStepInfo(&mut step, &mut count) }
            .map_err(WasapiError::call("IAudioEndpointVolume::GetVolumeStepInfo"))?;
        Ok(count.saturating_sub(1))
    }
}

impl Default for WasapiRouting {
    fn default() -> Self {
        Self::new()
    }
}

impl RoutingBackend for WasapiRouting {
    fn set_audio_mode(&self, mode: AudioMode) -> BridgeResult<()> {
        *self.mode.lock() = mode;
        log::debug!("Audio mode recorded as {:?}", mode);
        Ok(())
    }

    fn set_speakerphone(&self, enabled: bool) -> BridgeResult<()> {
        self.speakerphone.store(enabled, Ordering::SeqCst);
        Ok(())
    }

    fn max_volume(&self, stream: VolumeStream) -> BridgeResult<u32> {
        com::with_mta(|| {
            let volume = Self::endpoint_volume(stream)?;
            Self::step_count(&volume)
        })
        .map_err(|e| BridgeError::Routing(e.to_string()))
    }

    fn set_volume(&self, stream: VolumeStream, level: u32) -> BridgeResult<()> {
        com::with_mta(|| {
            let volume = Self::endpoint_volume(stream)?;
            let max = Self::step_count(&volume)?;
            let scalar = if max == 0 {
                1.0
            } else {
                (level.min(max) as f32) / max as f32
            };
            unsafe { volume.SetMasterVolumeLevelScalar(scalar, std::ptr::null()) }
                .map_err(WasapiError::call("IAudioEndpointVolume::SetMasterVolumeLevelScalar"))
        })
        .map_err(|e| BridgeError::Routing(e.to_string()))
    }

    fn headset_connected(&self) -> bool {
        com::with_mta(|| {
            let device = endpoint::default_endpoint(StreamDirection::Output, EndpointRole::Console)?;
            Ok(endpoint::is_headset(&device))
        })
        .unwrap_or_else(|e| {
            log::debug!("Headset detection failed: {}", e);
            false
        })
    }
}
