use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::models::audio_models::{
    Availability, Capability, CaptureDiagnostics, ChannelLayout, EffectStatus, InputSource, StreamDirection,
};
use crate::models::config::{AudioSessionConfig, CaptureOptions};
use crate::models::error::{BridgeError, BridgeResult};
use crate::models::frame::AudioFrame;
use crate::models::state::CaptureState;
use crate::routing::controller::AudioRoutingController;
use crate::sizing::buffer_sizer::DeviceBufferSizer;
use crate::sync::cancellation::CancellationToken;
use crate::sync::worker::WorkerHandle;
use crate::traits::audio_effect::AudioEffect;
use crate::traits::audio_platform::{AudioPlatform, InputStreamRequest};
use crate::traits::frame_callback::FrameCallback;
use crate::traits::input_device::InputDevice;

/// Counters updated by the worker and snapshotted by the owner.
#[derive(Default)]
struct CaptureCounters {
    frames_emitted: AtomicU64,
    samples_emitted: AtomicU64,
    read_errors: AtomicU64,
    consecutive_read_errors: AtomicU64,
    empty_reads: AtomicU64,
}

impl CaptureCounters {
    fn reset(&self) {
        self.frames_emitted.store(0, Ordering::SeqCst);
        self.samples_emitted.store(0, Ordering::SeqCst);
        self.read_errors.store(0, Ordering::SeqCst);
        self.consecutive_read_errors.store(0, Ordering::SeqCst);
        self.empty_reads.store(0, Ordering::SeqCst);
    }
}

struct CaptureSession {
    device: Arc<dyn InputDevice>,
    worker: WorkerHandle,
    effects: Vec<Box<dyn AudioEffect>>,
    config: AudioSessionConfig,
    buffer_size_bytes: u32,
    holds_routing: bool,
}

/// Microphone capture on one dedicated worker thread per session.
///
/// ```text
/// [InputDevice] → read_blocking(buffer_size samples) → AudioFrame → on_frame
///       ↑ stop() unblocks                 (one read = one frame, in read order)
/// ```
///
/// `stop` cancels the worker, stops the device, and joins before releasing
/// anything, so the consumer is never invoked after `stop` returns.
pub struct CaptureEngine {
    platform: Arc<dyn AudioPlatform>,
    sizer: DeviceBufferSizer,
    routing: Arc<AudioRoutingController>,
    options: CaptureOptions,
    session: Option<CaptureSession>,
    counters: Arc<CaptureCounters>,
    effect_status: HashMap<Capability, EffectStatus>,
}

impl CaptureEngine {
    pub fn new(
        platform: Arc<dyn AudioPlatform>,
        routing: Arc<AudioRoutingController>,
        options: CaptureOptions,
    ) -> Self {
        let sizer = DeviceBufferSizer::new(Arc::clone(&platform));
        Self {
            platform,
            sizer,
            routing,
            options,
            session: None,
            counters: Arc::new(CaptureCounters::default()),
            effect_status: HashMap::new(),
        }
    }

    /// Open the input, attach voice effects and spawn the read worker.
    ///
    /// Transitions: idle → capturing. A running session is stopped first.
    /// On error no device handle is left open.
    pub fn start(&mut self, sample_rate_hz: u32, channels: u16, on_frame: FrameCallback) -> BridgeResult<()> {
        if self.session.is_some() {
            log::debug!("Capture restarted, stopping previous session");
            self.stop()?;
        }

        let config = AudioSessionConfig::new(sample_rate_hz, channels)?;
        let buffer_size_bytes = self.sizer.require(StreamDirection::Input, &config)?;

        let source = if self.options.voice_communication_source {
            InputSource::VoiceCommunication
        } else {
            InputSource::Microphone
        };
        let request = InputStreamRequest {
            config,
            buffer_size_bytes,
            source,
        };

        let device = self.platform.open_input(&request)?;
        if !device.is_ready() {
            device.release();
            return Err(BridgeError::Initialization(format!(
                "input device not ready at {}Hz, {} channel(s)",
                sample_rate_hz, channels
            )));
        }

        let mut effects = self.attach_effects(device.as_ref());

        if let Err(e) = device.start_recording() {
            self.disable_effects(&mut effects);
            device.release();
            return Err(BridgeError::Initialization(format!("input device failed to start: {}", e)));
        }

        self.counters.reset();
        let worker_device = Arc::clone(&device);
        let counters = Arc::clone(&self.counters);
        let options = self.options;
        // The read window equals the platform minimum counted in samples,
        // which is never smaller than the minimum itself.
        let read_len = buffer_size_bytes as usize;
        let layout = config.channels;

        let worker = WorkerHandle::spawn("pcm-capture", CancellationToken::new(), move |token| {
            run_capture_loop(token, worker_device, on_frame, counters, layout, read_len, options);
        });
        let worker = match worker {
            Ok(worker) => worker,
            Err(e) => {
                if let Err(stop_err) = device.stop() {
                    log::warn!("Failed to stop input device: {}", stop_err);
                }
                self.disable_effects(&mut effects);
                device.release();
                return Err(BridgeError::Initialization(format!("failed to spawn capture worker: {}", e)));
            }
        };

        let holds_routing = self.options.voice_communication_source;
        if holds_routing {
            self.routing.hold_communication_mode();
        }

        log::info!(
            "Capture started: {}Hz, {} channel(s), buffer {} bytes, source {:?}, session {}",
            sample_rate_hz,
            channels,
            buffer_size_bytes,
            source,
            device.session_id()
        );

        self.session = Some(CaptureSession {
            device,
            worker,
            effects,
            config,
            buffer_size_bytes,
            holds_routing,
        });
        Ok(())
    }

    /// Stop capture and release the device. Idempotent.
    ///
    /// Returns only after the worker has exited.
    pub fn stop(&mut self) -> BridgeResult<()> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };

        session.worker.cancel();
        if let Err(e) = session.device.stop() {
            log::warn!("Failed to stop input device: {}", e);
        }
        if !session.worker.join() {
            log::error!("Capture worker panicked");
        }

        self.disable_effects(&mut session.effects);
        session.device.release();

        if session.holds_routing {
            self.routing.reset_routing();
        }

        log::info!(
            "Capture stopped after {} frame(s), {} read error(s)",
            self.counters.frames_emitted.load(Ordering::SeqCst),
            self.counters.read_errors.load(Ordering::SeqCst)
        );
        Ok(())
    }

    pub fn state(&self) -> CaptureState {
        if self.session.is_some() {
            CaptureState::Capturing
        } else {
            CaptureState::Idle
        }
    }

    pub fn config(&self) -> Option<AudioSessionConfig> {
        self.session.as_ref().map(|s| s.config)
    }

    pub fn sample_rate_hz(&self) -> Option<u32> {
        self.session.as_ref().map(|s| s.config.sample_rate_hz)
    }

    /// Device buffer negotiated at start, in bytes.
    pub fn buffer_size_bytes(&self) -> Option<u32> {
        self.session.as_ref().map(|s| s.buffer_size_bytes)
    }

    /// Counters for the current (or most recent) session.
    pub fn diagnostics(&self) -> CaptureDiagnostics {
        CaptureDiagnostics {
            frames_emitted: self.counters.frames_emitted.load(Ordering::SeqCst),
            samples_emitted: self.counters.samples_emitted.load(Ordering::SeqCst),
            read_errors: self.counters.read_errors.load(Ordering::SeqCst),
            consecutive_read_errors: self.counters.consecutive_read_errors.load(Ordering::SeqCst),
            empty_reads: self.counters.empty_reads.load(Ordering::SeqCst),
            echo_cancellation: self.effect(Capability::EchoCancellation),
            noise_suppression: self.effect(Capability::NoiseSuppression),
            automatic_gain_control: self.effect(Capability::AutomaticGainControl),
        }
    }

    fn effect(&self, capability: Capability) -> EffectStatus {
        self.effect_status.get(&capability).copied().unwrap_or_default()
    }

    /// Attach every requested effect the platform offers, enabled.
    ///
    /// A missing or failing effect is logged and skipped; capture goes ahead
    /// without it.
    fn attach_effects(&mut self, device: &dyn InputDevice) -> Vec<Box<dyn AudioEffect>> {
        self.effect_status.clear();
        let mut effects = Vec::new();

        for capability in Capability::VOICE_EFFECTS {
            let mut status = EffectStatus {
                availability: self.platform.capability(capability),
                enabled: false,
            };

            if self.options.wants_effect(capability) {
                if let Some(effect) = self.attach_effect(capability, device, &mut status) {
                    effects.push(effect);
                }
            }
            self.effect_status.insert(capability, status);
        }
        effects
    }

    fn attach_effect(
        &self,
        capability: Capability,
        device: &dyn InputDevice,
        status: &mut EffectStatus,
    ) -> Option<Box<dyn AudioEffect>> {
        if !status.availability.is_available() {
            log::warn!("{:?} unavailable, capturing without it", capability);
            return None;
        }

        let Some(mut effect) = self.platform.create_effect(capability, device) else {
            log::warn!("{:?} could not be created for session {}", capability, device.session_id());
            status.availability = Availability::Unavailable;
            return None;
        };
        if let Err(e) = effect.set_enabled(true) {
            log::warn!("Failed to enable {:?}: {}", capability, e);
            return None;
        }
        if !effect.has_control() {
            log::debug!("{:?} is controlled by another client", capability);
        }

        status.enabled = effect.is_enabled();
        log::debug!("{:?} enabled for session {}", capability, device.session_id());
        Some(effect)
    }

    /// Disable and drop every attached effect. Runs before the input is released.
    fn disable_effects(&mut self, effects: &mut Vec<Box<dyn AudioEffect>>) {
        for mut effect in effects.drain(..) {
            if let Err(e) = effect.set_enabled(false) {
                log::warn!("Failed to disable {:?}: {}", effect.capability(), e);
            }
        }
        for status in self.effect_status.values_mut() {
            status.enabled = false;
        }
    }
}

impl Drop for CaptureEngine {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Worker body: one blocking read per iteration, one frame per non-empty read.
///
/// Read failures and empty reads count as "no data this cycle". Once either
/// streak reaches the configured threshold the loop waits on the token
/// between reads, so a backend that returns immediately cannot spin it.
fn run_capture_loop(
    token: CancellationToken,
    device: Arc<dyn InputDevice>,
    on_frame: FrameCallback,
    counters: Arc<CaptureCounters>,
    channels: ChannelLayout,
    read_len: usize,
    options: CaptureOptions,
) {
    let mut buffer = vec![0i16; read_len.max(1)];
    let mut sequence = 0u64;
    let backoff = Duration::from_millis(options.read_error_backoff_ms);
    let threshold = u64::from(options.read_error_threshold.max(1));
    let mut empty_streak = 0u64;

    while !token.is_cancelled() {
        match device.read_blocking(&mut buffer) {
            Ok(0) => {
                counters.empty_reads.fetch_add(1, Ordering::SeqCst);
                empty_streak += 1;
                if empty_streak >= threshold && token.wait_timeout(backoff) {
                    break;
                }
            }
            Ok(count) => {
                empty_streak = 0;
                counters.consecutive_read_errors.store(0, Ordering::SeqCst);
                // A read that completed after stop was requested is dropped.
                if token.is_cancelled() {
                    break;
                }
                let frame = AudioFrame::new(buffer[..count].to_vec(), channels, sequence);
                sequence += 1;
                counters.frames_emitted.fetch_add(1, Ordering::SeqCst);
                counters.samples_emitted.fetch_add(count as u64, Ordering::SeqCst);
                on_frame(frame);
            }
            Err(e) => {
                counters.read_errors.fetch_add(1, Ordering::SeqCst);
                let streak = counters.consecutive_read_errors.fetch_add(1, Ordering::SeqCst) + 1;
                if streak == 1 {
                    log::warn!("Capture read failed: {}", e);
                }
                if streak == threshold {
                    log::warn!("{} consecutive capture read failures, backing off", streak);
                }
                if streak >= threshold && token.wait_timeout(backoff) {
                    break;
                }
            }
        }
    }

    log::debug!("Capture worker exiting after {} frame(s)", sequence);
}
