//! Deterministic in-process backend for tests, demos and headless hosts.

pub mod platform;
pub mod routing;

pub use platform::{DeviceEvent, SimulatedPlatform};
pub use routing::{RoutingCall, SimulatedRouting};
