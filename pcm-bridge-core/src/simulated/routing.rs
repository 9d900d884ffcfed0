use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::audio_models::{AudioMode, VolumeStream};
use crate::models::error::{BridgeError, BridgeResult};
use crate::traits::routing_backend::RoutingBackend;

/// Maximum level of every simulated volume stream.
pub const SIMULATED_MAX_VOLUME: u32 = 7;

/// A routing change applied to the simulated device, in call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingCall {
    SetMode(AudioMode),
    SetSpeakerphone(bool),
    SetVolume(VolumeStream, u32),
}

struct RoutingState {
    mode: AudioMode,
    speakerphone: bool,
    volumes: HashMap<VolumeStream, u32>,
    failing: bool,
    headset: bool,
    calls: Vec<RoutingCall>,
}

/// In-memory stand-in for the device-wide routing state.
#[derive(Clone)]
pub struct SimulatedRouting {
    state: Arc<Mutex<RoutingState>>,
}

impl SimulatedRouting {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(RoutingState {
                mode: AudioMode::Normal,
                speakerphone: false,
                volumes: HashMap::new(),
                failing: false,
                headset: false,
                calls: Vec::new(),
            })),
        }
    }

    pub fn mode(&self) -> AudioMode {
        self.state.lock().mode
    }

    pub fn speakerphone(&self) -> bool {
        self.state.lock().speakerphone
    }

    pub fn volume(&self, stream: VolumeStream) -> u32 {
        self.state.lock().volumes.get(&stream).copied().unwrap_or(0)
    }

    pub fn max_level(&self) -> u32 {
        SIMULATED_MAX_VOLUME
    }

    /// Make every routing call fail until cleared.
    pub fn set_failing(&self, failing: bool) {
        self.state.lock().failing = failing;
    }

    pub fn set_headset_connected(&self, connected: bool) {
        self.state.lock().headset = connected;
    }

    pub fn calls(&self) -> Vec<RoutingCall> {
        self.state.lock().calls.clone()
    }

    fn apply(&self, call: RoutingCall) -> BridgeResult<()> {
        let mut state = self.state.lock();
        if state.failing {
            return Err(BridgeError::Routing(format!("simulated failure for {:?}", call)));
        }
        match call {
            RoutingCall::SetMode(mode) => state.mode = mode,
            RoutingCall::SetSpeakerphone(enabled) => state.speakerphone = enabled,
            RoutingCall::SetVolume(stream, level) => {
                state.volumes.insert(stream, level);
            }
        }
        state.calls.push(call);
        Ok(())
    }
}

impl Default for SimulatedRouting {
    fn default() -> Self {
        Self::new()
    }
}

impl RoutingBackend for SimulatedRouting {
    fn set_audio_mode(&self, mode: AudioMode) -> BridgeResult<()> {
        self.apply(RoutingCall::SetMode(mode))
    }

    fn set_speakerphone(&self, enabled: bool) -> BridgeResult<()> {
        self.apply(RoutingCall::SetSpeakerphone(enabled))
    }

    fn max_volume(&self, _stream: VolumeStream) -> BridgeResult<u32> {
        if self.state.lock().failing {
            return Err(BridgeError::Routing("simulated failure reading max volume".into()));
        }
        Ok(SIMULATED_MAX_VOLUME)
    }

    fn set_volume(&self, stream: VolumeStream, level: u32) -> BridgeResult<()> {
        if level > SIMULATED_MAX_VOLUME {
            return Err(BridgeError::Routing(format!("volume {} above maximum", level)));
        }
        self.apply(RoutingCall::SetVolume(stream, level))
    }

    fn headset_connected(&self) -> bool {
        self.state.lock().headset
    }
}
