//! # pcm-bridge-windows
//!
//! Windows WASAPI backend for pcm-bridge.
//!
//! Provides:
//! - `WasapiPlatform`: `AudioPlatform` over shared-mode render and capture endpoints
//! - `WasapiRouting`: `RoutingBackend` over endpoint volume and form factor
//!
//! Every stream owns a dedicated thread that initializes COM and holds the
//! WASAPI interfaces; handles talk to it through channels, so no COM pointer
//! crosses a thread boundary.
//!
//! ## Platform Requirements
//! - Windows 10+ (`AUDCLNT_STREAMFLAGS_AUTOCONVERTPCM` for arbitrary PCM16 rates)
//! - Visual Studio Build Tools 2022 + Windows SDK for linking
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use pcm_bridge_core::{BridgeConfiguration, DuplexSession};
//! use pcm_bridge_windows::{WasapiPlatform, WasapiRouting};
//!
//! let mut session = DuplexSession::new(
//!     Arc::new(WasapiPlatform::new()),
//!     Arc::new(WasapiRouting::new()),
//!     BridgeConfiguration::default(),
//! )?;
//! ```

#[cfg(target_os = "windows")]
pub mod capture;
#[cfg(target_os = "windows")]
mod com;
#[cfg(target_os = "windows")]
pub mod endpoint;
#[cfg(target_os = "windows")]
pub mod error;
#[cfg(target_os = "windows")]
pub mod platform;
#[cfg(target_os = "windows")]
pub mod render;
#[cfg(target_os = "windows")]
pub mod routing;

#[cfg(target_os = "windows")]
pub use error::WasapiError;
#[cfg(target_os = "windows")]
pub use platform::WasapiPlatform;
#[cfg(target_os = "windows")]
pub use routing::WasapiRouting;
