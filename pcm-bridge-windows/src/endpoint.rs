//! Default endpoint lookup and property reads via the MMDevice API.

use windows::Win32::Devices::FunctionDiscovery::*;
use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::StructuredStorage::{PropVariantClear, PROPVARIANT};
use windows::Win32::System::Com::*;
use windows::Win32::System::Variant::*;

use pcm_bridge_core::models::audio_models::StreamDirection;

use crate::error::WasapiError;

const FORM_FACTOR_HEADPHONES: u32 = 3;
const FORM_FACTOR_HEADSET: u32 = 5;

/// Which default device to resolve for a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointRole {
    /// The default device for ordinary media.
    Console,
    /// The default device the user picked for calls.
    Communications,
}

impl EndpointRole {
    fn as_erole(self) -> ERole {
        match self {
            Self::Console => eConsole,
            Self::Communications => eCommunications,
        }
    }
}

/// Resolve the default endpoint for a direction and role.
///
/// Requires COM to be initialized on the calling thread.
pub fn default_endpoint(direction: StreamDirection, role: EndpointRole) -> Result<IMMDevice, WasapiError> {
    let flow = match direction {
        StreamDirection::Output => eRender,
        StreamDirection::Input => eCapture,
    };
    unsafe {
        let enumerator: IMMDeviceEnumerator = CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL)
            .map_err(WasapiError::call("CoCreateInstance(MMDeviceEnumerator)"))?;
        enumerator
            .GetDefaultAudioEndpoint(flow, role.as_erole())
            .map_err(|_| WasapiError::NoEndpoint(direction))
    }
}

/// Read `PKEY_Device_FriendlyName`, falling back to a placeholder.
pub fn friendly_name(device: &IMMDevice) -> String {
    unsafe {
        let Ok(store) = device.OpenPropertyStore(STGM_READ) else {
            return "Unknown endpoint".into();
        };
        read_string(&store, &PKEY_Device_FriendlyName).unwrap_or_else(|| "Unknown endpoint".into())
    }
}

/// Whether the endpoint is headphones, a headset, or a Bluetooth device.
pub fn is_headset(device: &IMMDevice) -> bool {
    unsafe {
        let Ok(store) = device.OpenPropertyStore(STGM_READ) else {
            return false;
        };

        if let Ok(mut prop) = store.GetValue(&PKEY_AudioEndpoint_FormFactor) {
            let form_factor = if prop.Anonymous.Anonymous.vt == VT_UI4 {
                Some(prop.Anonymous.Anonymous.Anonymous.ulVal)
            } else {
                None
            };
            PropVariantClear(&mut prop).ok();
            if matches!(form_factor, Some(FORM_FACTOR_HEADPHONES | FORM_FACTOR_HEADSET)) {
                return true;
            }
        }

        read_string(&store, &PKEY_Device_EnumeratorName)
            .map(|name| name.contains("BTHENUM") || name.contains("BTHLEENUM"))
            .unwrap_or(false)
    }
}

unsafe fn read_string(
    store: &windows::Win32::UI::Shell::PropertiesSystem::IPropertyStore,
    key: &windows::Win32::Foundation::PROPERTYKEY,
) -> Option<String> {
    let mut prop: PROPVARIANT = store.GetValue(key).ok()?;

    let value = if prop.Anonymous.Anonymous.vt == VT_LPWSTR {
        let pwsz = prop.Anonymous.Anonymous.Anonymous.pwszVal;
        if pwsz.is_null() {
            None
        } else {
            pwsz.to_string().ok()
        }
    } else {
        None
    };

    PropVariantClear(&mut prop).ok();
    value
}
