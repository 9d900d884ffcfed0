use thiserror::Error;

use pcm_bridge_core::models::audio_models::StreamDirection;
use pcm_bridge_core::models::error::BridgeError;

/// Failures inside the WASAPI backend, mapped to [`BridgeError`] at the trait boundary.
#[derive(Debug, Error)]
pub enum WasapiError {
    #[error("CoInitializeEx failed: {0}")]
    ComInit(String),

    #[error("no default {0:?} endpoint")]
    NoEndpoint(StreamDirection),

    /// Access to the capture endpoint was refused (privacy settings) or it is held exclusively.
    #[error("endpoint access denied: {0}")]
    AccessDenied(String),

    #[error("{call} failed: {source}")]
    Call {
        call: &'static str,
        #[source]
        source: windows::core::Error,
    },

    #[error("stream thread: {0}")]
    Thread(String),
}

impl WasapiError {
    pub(crate) fn call(call: &'static str) -> impl FnOnce(windows::core::Error) -> Self {
        move |source| Self::Call { call, source }
    }
}

impl From<WasapiError> for BridgeError {
    fn from(e: WasapiError) -> Self {
        match e {
            WasapiError::NoEndpoint(_) | WasapiError::AccessDenied(_) | WasapiError::ComInit(_) => {
                BridgeError::Initialization(e.to_string())
            }
            WasapiError::Call { .. } | WasapiError::Thread(_) => BridgeError::Io(e.to_string()),
        }
    }
}
