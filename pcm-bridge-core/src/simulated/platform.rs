use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::models::audio_models::{Availability, Capability, ChannelLayout, PcmEncoding, StreamDirection};
use crate::models::error::{BridgeError, BridgeResult};
use crate::sizing::buffer_sizer::bytes_for_period;
use crate::traits::audio_effect::AudioEffect;
use crate::traits::audio_platform::{AudioPlatform, InputStreamRequest, OutputStreamRequest};
use crate::traits::input_device::InputDevice;
use crate::traits::output_device::OutputDevice;

/// Rates the simulated hardware accepts unless told otherwise.
pub const DEFAULT_SUPPORTED_RATES: [u32; 8] = [8_000, 11_025, 16_000, 22_050, 24_000, 32_000, 44_100, 48_000];

/// Lifecycle events recorded by simulated devices, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEvent {
    OutputOpened,
    OutputPlay,
    OutputPause,
    OutputStop,
    OutputReleased,
    InputOpened,
    InputStarted,
    InputStopped,
    InputReleased,
    EffectCreated(Capability),
    EffectEnabled(Capability, bool),
}

enum ReadStep {
    Samples(Vec<i16>),
    Error(String),
}

struct PlatformState {
    supported_rates: Vec<u32>,
    stereo_supported: bool,
    period: Duration,
    output_ready: bool,
    input_ready: bool,
    effects: HashMap<Capability, Availability>,
    write_limit: Option<usize>,
    fail_writes: bool,
    fail_start: bool,
    reads: VecDeque<ReadStep>,
    writes: Vec<Vec<u8>>,
    open_outputs: usize,
    open_inputs: usize,
    next_session_id: u32,
    last_output_request: Option<OutputStreamRequest>,
    last_input_request: Option<InputStreamRequest>,
    output_volume: Option<f32>,
    output_playing: bool,
    effect_enabled: HashMap<Capability, bool>,
    events: Vec<DeviceEvent>,
}

struct Shared {
    state: Mutex<PlatformState>,
    // Signalled when reads are queued or an input is stopped.
    data_ready: Condvar,
}

/// Deterministic in-process audio backend.
///
/// Outputs record every write; inputs replay a scripted queue of reads and
/// block while the queue is empty, just like a real device waiting for the
/// next hardware period. Clones share state, so a test keeps one handle for
/// scripting and inspection while the engines own another.
#[derive(Clone)]
pub struct SimulatedPlatform {
    shared: Arc<Shared>,
}

impl SimulatedPlatform {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(PlatformState {
                    supported_rates: DEFAULT_SUPPORTED_RATES.to_vec(),
                    stereo_supported: true,
                    period: Duration::from_millis(20),
                    output_ready: true,
                    input_ready: true,
                    effects: Capability::VOICE_EFFECTS
                        .into_iter()
                        .map(|effect| (effect, Availability::Available))
                        .collect(),
                    write_limit: None,
                    fail_writes: false,
                    fail_start: false,
                    reads: VecDeque::new(),
                    writes: Vec::new(),
                    open_outputs: 0,
                    open_inputs: 0,
                    next_session_id: 1,
                    last_output_request: None,
                    last_input_request: None,
                    output_volume: None,
                    output_playing: false,
                    effect_enabled: HashMap::new(),
                    events: Vec::new(),
                }),
                data_ready: Condvar::new(),
            }),
        }
    }

    pub fn with_supported_rates(self, rates: &[u32]) -> Self {
        self.shared.state.lock().supported_rates = rates.to_vec();
        self
    }

    pub fn with_stereo_supported(self, supported: bool) -> Self {
        self.shared.state.lock().stereo_supported = supported;
        self
    }

    /// Hardware period used to derive minimum buffer sizes.
    pub fn with_period(self, period: Duration) -> Self {
        self.shared.state.lock().period = period;
        self
    }

    /// Whether newly opened outputs reach the ready state.
    pub fn set_output_ready(&self, ready: bool) {
        self.shared.state.lock().output_ready = ready;
    }

    /// Whether newly opened inputs reach the ready state.
    pub fn set_input_ready(&self, ready: bool) {
        self.shared.state.lock().input_ready = ready;
    }

    /// Whether the platform offers `effect`. Every effect starts available.
    pub fn set_effect(&self, effect: Capability, availability: Availability) {
        self.shared.state.lock().effects.insert(effect, availability);
    }

    /// Cap how many bytes a single write accepts, producing short writes.
    pub fn set_write_limit(&self, limit: Option<usize>) {
        self.shared.state.lock().write_limit = limit;
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.shared.state.lock().fail_writes = fail;
    }

    /// Make `play` on outputs and `start_recording` on inputs fail on
    /// otherwise healthy handles.
    pub fn set_fail_start(&self, fail: bool) {
        self.shared.state.lock().fail_start = fail;
    }

    /// Queue one hardware read worth of samples.
    pub fn push_read(&self, samples: Vec<i16>) {
        self.shared.state.lock().reads.push_back(ReadStep::Samples(samples));
        self.shared.data_ready.notify_all();
    }

    /// Queue one failed read.
    pub fn push_read_error(&self, message: &str) {
        self.shared
            .state
            .lock()
            .reads
            .push_back(ReadStep::Error(message.to_string()));
        self.shared.data_ready.notify_all();
    }

    pub fn pending_reads(&self) -> usize {
        self.shared.state.lock().reads.len()
    }

    /// Every write accepted by any output, in order.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.shared.state.lock().writes.clone()
    }

    /// All accepted bytes concatenated.
    pub fn written_bytes(&self) -> Vec<u8> {
        self.shared.state.lock().writes.concat()
    }

    /// Output handles opened and not yet released.
    pub fn open_outputs(&self) -> usize {
        self.shared.state.lock().open_outputs
    }

    /// Input handles opened and not yet released.
    pub fn open_inputs(&self) -> usize {
        self.shared.state.lock().open_inputs
    }

    pub fn last_output_request(&self) -> Option<OutputStreamRequest> {
        self.shared.state.lock().last_output_request
    }

    pub fn last_input_request(&self) -> Option<InputStreamRequest> {
        self.shared.state.lock().last_input_request
    }

    pub fn output_volume(&self) -> Option<f32> {
        self.shared.state.lock().output_volume
    }

    pub fn output_playing(&self) -> bool {
        self.shared.state.lock().output_playing
    }

    /// Last enabled state set on `effect`, if one was ever touched.
    pub fn effect_enabled(&self, effect: Capability) -> Option<bool> {
        self.shared.state.lock().effect_enabled.get(&effect).copied()
    }

    pub fn events(&self) -> Vec<DeviceEvent> {
        self.shared.state.lock().events.clone()
    }
}

impl Default for SimulatedPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioPlatform for SimulatedPlatform {
    fn min_buffer_size(
        &self,
        _direction: StreamDirection,
        sample_rate_hz: u32,
        channels: ChannelLayout,
        _encoding: PcmEncoding,
    ) -> Option<u32> {
        let state = self.shared.state.lock();
        if !state.supported_rates.contains(&sample_rate_hz) {
            return None;
        }
        if channels == ChannelLayout::Stereo && !state.stereo_supported {
            return None;
        }
        Some(bytes_for_period(sample_rate_hz, channels, state.period))
    }

    fn open_output(&self, request: &OutputStreamRequest) -> BridgeResult<Box<dyn OutputDevice>> {
        let mut state = self.shared.state.lock();
        state.open_outputs += 1;
        state.last_output_request = Some(*request);
        state.events.push(DeviceEvent::OutputOpened);
        Ok(Box::new(SimulatedOutput {
            shared: Arc::clone(&self.shared),
            ready: state.output_ready,
            released: false,
        }))
    }

    fn open_input(&self, request: &InputStreamRequest) -> BridgeResult<Arc<dyn InputDevice>> {
        let mut state = self.shared.state.lock();
        state.open_inputs += 1;
        state.last_input_request = Some(*request);
        state.events.push(DeviceEvent::InputOpened);
        let session_id = state.next_session_id;
        state.next_session_id += 1;
        Ok(Arc::new(SimulatedInput {
            shared: Arc::clone(&self.shared),
            session_id,
            ready: state.input_ready,
            recording: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            released: AtomicBool::new(false),
        }))
    }

    fn capability(&self, capability: Capability) -> Availability {
        self.shared
            .state
            .lock()
            .effects
            .get(&capability)
            .copied()
            .unwrap_or_default()
    }

    fn create_effect(&self, effect: Capability, _input: &dyn InputDevice) -> Option<Box<dyn AudioEffect>> {
        if !self.capability(effect).is_available() {
            return None;
        }
        self.shared.state.lock().events.push(DeviceEvent::EffectCreated(effect));
        Some(Box::new(SimulatedEffect {
            shared: Arc::clone(&self.shared),
            effect,
            enabled: false,
        }))
    }
}

struct SimulatedOutput {
    shared: Arc<Shared>,
    ready: bool,
    released: bool,
}

impl SimulatedOutput {
    fn ensure_live(&self) -> BridgeResult<()> {
        if self.released {
            return Err(BridgeError::Io("output handle already released".into()));
        }
        if !self.ready {
            return Err(BridgeError::Io("output handle not initialized".into()));
        }
        Ok(())
    }
}

impl OutputDevice for SimulatedOutput {
    fn is_ready(&self) -> bool {
        self.ready && !self.released
    }

    fn play(&mut self) -> BridgeResult<()> {
        self.ensure_live()?;
        let mut state = self.shared.state.lock();
        if state.fail_start {
            return Err(BridgeError::Io("simulated start failure".into()));
        }
        state.output_playing = true;
        state.events.push(DeviceEvent::OutputPlay);
        Ok(())
    }

    fn pause(&mut self) -> BridgeResult<()> {
        self.ensure_live()?;
        let mut state = self.shared.state.lock();
        state.output_playing = false;
        state.events.push(DeviceEvent::OutputPause);
        Ok(())
    }

    fn write_blocking(&mut self, bytes: &[u8]) -> BridgeResult<usize> {
        self.ensure_live()?;
        let mut state = self.shared.state.lock();
        if state.fail_writes {
            return Err(BridgeError::Io("simulated write failure".into()));
        }
        let accepted = state.write_limit.map_or(bytes.len(), |limit| limit.min(bytes.len()));
        state.writes.push(bytes[..accepted].to_vec());
        Ok(accepted)
    }

    fn set_volume(&mut self, gain: f32) -> BridgeResult<()> {
        self.ensure_live()?;
        self.shared.state.lock().output_volume = Some(gain);
        Ok(())
    }

    fn stop(&mut self) -> BridgeResult<()> {
        self.ensure_live()?;
        let mut state = self.shared.state.lock();
        state.output_playing = false;
        state.events.push(DeviceEvent::OutputStop);
        Ok(())
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        let mut state = self.shared.state.lock();
        state.open_outputs -= 1;
        state.output_playing = false;
        state.events.push(DeviceEvent::OutputReleased);
    }
}

struct SimulatedInput {
    shared: Arc<Shared>,
    session_id: u32,
    ready: bool,
    recording: AtomicBool,
    stopped: AtomicBool,
    released: AtomicBool,
}

impl InputDevice for SimulatedInput {
    fn is_ready(&self) -> bool {
        self.ready && !self.released.load(Ordering::SeqCst)
    }

    fn session_id(&self) -> u32 {
        self.session_id
    }

    fn start_recording(&self) -> BridgeResult<()> {
        if !self.is_ready() {
            return Err(BridgeError::Io("input handle not usable".into()));
        }
        if self.shared.state.lock().fail_start {
            return Err(BridgeError::Io("simulated start failure".into()));
        }
        self.stopped.store(false, Ordering::SeqCst);
        self.recording.store(true, Ordering::SeqCst);
        self.shared.state.lock().events.push(DeviceEvent::InputStarted);
        Ok(())
    }

    fn read_blocking(&self, buffer: &mut [i16]) -> BridgeResult<usize> {
        if self.released.load(Ordering::SeqCst) {
            return Err(BridgeError::Io("input handle already released".into()));
        }
        if !self.recording.load(Ordering::SeqCst) {
            return Err(BridgeError::Io("input not recording".into()));
        }

        let mut state = self.shared.state.lock();
        loop {
            if self.stopped.load(Ordering::SeqCst) {
                return Ok(0);
            }
            match state.reads.pop_front() {
                Some(ReadStep::Samples(samples)) => {
                    let count = samples.len().min(buffer.len());
                    buffer[..count].copy_from_slice(&samples[..count]);
                    if count < samples.len() {
                        state.reads.push_front(ReadStep::Samples(samples[count..].to_vec()));
                    }
                    return Ok(count);
                }
                Some(ReadStep::Error(message)) => return Err(BridgeError::Io(message)),
                None => {
                    self.shared.data_ready.wait_for(&mut state, Duration::from_millis(50));
                }
            }
        }
    }

    fn stop(&self) -> BridgeResult<()> {
        self.stopped.store(true, Ordering::SeqCst);
        self.recording.store(false, Ordering::SeqCst);
        let mut state = self.shared.state.lock();
        state.events.push(DeviceEvent::InputStopped);
        self.shared.data_ready.notify_all();
        Ok(())
    }

    fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut state = self.shared.state.lock();
        state.open_inputs -= 1;
        state.events.push(DeviceEvent::InputReleased);
    }
}

struct SimulatedEffect {
    shared: Arc<Shared>,
    effect: Capability,
    enabled: bool,
}

impl AudioEffect for SimulatedEffect {
    fn capability(&self) -> Capability {
        self.effect
    }

    fn set_enabled(&mut self, enabled: bool) -> BridgeResult<()> {
        self.enabled = enabled;
        let mut state = self.shared.state.lock();
        state.effect_enabled.insert(self.effect, enabled);
        state.events.push(DeviceEvent::EffectEnabled(self.effect, enabled));
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn has_control(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::audio_models::{ContentType, InputSource, StreamUsage};
    use crate::models::config::AudioSessionConfig;

    fn output_request() -> OutputStreamRequest {
        OutputStreamRequest {
            config: AudioSessionConfig::default(),
            buffer_size_bytes: 960,
            usage: StreamUsage::Media,
            content: ContentType::Music,
        }
    }

    fn input_request() -> InputStreamRequest {
        InputStreamRequest {
            config: AudioSessionConfig::default(),
            buffer_size_bytes: 960,
            source: InputSource::Microphone,
        }
    }

    #[test]
    fn released_output_rejects_writes() {
        let platform = SimulatedPlatform::new();
        let mut output = platform.open_output(&output_request()).unwrap();
        assert_eq!(platform.open_outputs(), 1);

        output.release();
        assert_eq!(platform.open_outputs(), 0);
        assert!(output.write_blocking(&[0, 0]).is_err());

        // Releasing twice must not double count.
        output.release();
        assert_eq!(platform.open_outputs(), 0);
    }

    #[test]
    fn write_limit_produces_short_writes() {
        let platform = SimulatedPlatform::new();
        platform.set_write_limit(Some(4));
        let mut output = platform.open_output(&output_request()).unwrap();

        assert_eq!(output.write_blocking(&[1, 2, 3, 4, 5, 6]).unwrap(), 4);
        assert_eq!(platform.written_bytes(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn oversized_read_is_split_by_device() {
        let platform = SimulatedPlatform::new();
        let input = platform.open_input(&input_request()).unwrap();
        input.start_recording().unwrap();
        platform.push_read(vec![1, 2, 3, 4, 5]);

        let mut buffer = [0i16; 3];
        assert_eq!(input.read_blocking(&mut buffer).unwrap(), 3);
        assert_eq!(buffer, [1, 2, 3]);
        assert_eq!(input.read_blocking(&mut buffer).unwrap(), 2);
        assert_eq!(&buffer[..2], &[4, 5]);
    }

    #[test]
    fn stop_unblocks_pending_read() {
        let platform = SimulatedPlatform::new();
        let input = platform.open_input(&input_request()).unwrap();
        input.start_recording().unwrap();

        let reader = Arc::clone(&input);
        let handle = std::thread::spawn(move || {
            let mut buffer = [0i16; 8];
            reader.read_blocking(&mut buffer)
        });

        std::thread::sleep(Duration::from_millis(20));
        input.stop().unwrap();
        assert_eq!(handle.join().unwrap().unwrap(), 0);
    }

    #[test]
    fn fail_start_rejects_healthy_handles() {
        let platform = SimulatedPlatform::new();
        platform.set_fail_start(true);
        let mut output = platform.open_output(&output_request()).unwrap();
        let input = platform.open_input(&input_request()).unwrap();

        assert!(output.is_ready());
        assert!(output.play().is_err());
        assert!(!platform.output_playing());
        assert!(input.is_ready());
        assert!(input.start_recording().is_err());
        assert!(!platform.events().contains(&DeviceEvent::InputStarted));
    }

    #[test]
    fn effects_follow_configured_availability() {
        let platform = SimulatedPlatform::new();
        platform.set_effect(Capability::NoiseSuppression, Availability::Unavailable);
        let input = platform.open_input(&input_request()).unwrap();

        assert!(platform.create_effect(Capability::NoiseSuppression, input.as_ref()).is_none());
        let mut agc = platform
            .create_effect(Capability::AutomaticGainControl, input.as_ref())
            .unwrap();
        assert_eq!(agc.capability(), Capability::AutomaticGainControl);
        agc.set_enabled(true).unwrap();
        assert_eq!(platform.effect_enabled(Capability::AutomaticGainControl), Some(true));
        assert_eq!(platform.effect_enabled(Capability::EchoCancellation), None);
    }

    #[test]
    fn unsupported_stereo() {
        let platform = SimulatedPlatform::new().with_stereo_supported(false);
        assert!(platform
            .min_buffer_size(StreamDirection::Input, 16_000, ChannelLayout::Stereo, PcmEncoding::Pcm16)
            .is_none());
        assert_eq!(
            platform.min_buffer_size(StreamDirection::Input, 16_000, ChannelLayout::Mono, PcmEncoding::Pcm16),
            Some(640)
        );
    }
}
