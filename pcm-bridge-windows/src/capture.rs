//! WASAPI shared-mode PCM16 input.
//!
//! A `wasapi-capture` thread owns the COM interfaces, polls the endpoint for
//! packets and queues samples; [`WasapiInput::read_blocking`] drains the
//! queue from the engine's worker.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use windows::Win32::Foundation::{E_ACCESSDENIED, HANDLE};
use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::*;
use windows::Win32::System::Threading::*;
use windows::core::PCWSTR;

use pcm_bridge_core::models::audio_models::{InputSource, StreamDirection};
use pcm_bridge_core::models::error::{BridgeError, BridgeResult};
use pcm_bridge_core::traits::audio_platform::InputStreamRequest;
use pcm_bridge_core::traits::input_device::InputDevice;

use crate::com;
use crate::endpoint::{self, EndpointRole};
use crate::error::WasapiError;
use crate::render::{pcm16_format, set_communications_category, HNS_PER_SEC};

const PACKET_POLL: Duration = Duration::from_millis(10);

/// Seconds of audio queued before the oldest samples are discarded.
const MAX_QUEUED_SECS: usize = 2;

static NEXT_SESSION_ID: AtomicU32 = AtomicU32::new(1);

#[derive(Default)]
struct CaptureQueue {
    samples: VecDeque<i16>,
    error: Option<String>,
    overflowed: bool,
}

struct CaptureShared {
    queue: Mutex<CaptureQueue>,
    data_ready: Condvar,
    recording: AtomicBool,
    stopped: AtomicBool,
    shutdown: AtomicBool,
}

/// Input handle backed by a `wasapi-capture` thread.
pub struct WasapiInput {
    shared: Arc<CaptureShared>,
    thread: Mutex<Option<JoinHandle<()>>>,
    session_id: u32,
    ready: bool,
}

impl WasapiInput {
    /// Spawn the capture thread and wait until the stream is initialized.
    pub fn open(request: InputStreamRequest) -> BridgeResult<Self> {
        let shared = Arc::new(CaptureShared {
            queue: Mutex::new(CaptureQueue::default()),
            data_ready: Condvar::new(),
            recording: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
        });
        let (ready_tx, ready_rx) = mpsc::channel();

        let thread_shared = Arc::clone(&shared);
        let thread = thread::Builder::new()
            .name("wasapi-capture".into())
            .spawn(move || capture_thread(request, thread_shared, ready_tx))
            .map_err(|e| BridgeError::Initialization(format!("failed to spawn capture thread: {}", e)))?;

        let ready = match ready_rx.recv() {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                log::error!("Capture stream initialization failed: {}", e);
                false
            }
            Err(_) => {
                log::error!("Capture thread exited before reporting readiness");
                false
            }
        };

        Ok(Self {
            shared,
            thread: Mutex::new(Some(thread)),
            session_id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            ready,
        })
    }
}

impl InputDevice for WasapiInput {
    fn is_ready(&self) -> bool {
        self.ready && !self.shared.shutdown.load(Ordering::SeqCst)
    }

    fn session_id(&self) -> u32 {
        self.session_id
    }

    fn start_recording(&self) -> BridgeResult<()> {
        if !self.is_ready() {
            return Err(BridgeError::Io("capture stream not initialized".into()));
        }
        self.shared.stopped.store(false, Ordering::SeqCst);
        self.shared.recording.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn read_blocking(&self, buffer: &mut [i16]) -> BridgeResult<usize> {
        let mut queue = self.shared.queue.lock();
        loop {
            if self.shared.stopped.load(Ordering::SeqCst) || self.shared.shutdown.load(Ordering::SeqCst) {
                return Ok(0);
            }
            if let Some(message) = queue.error.take() {
                return Err(BridgeError::Io(message));
            }
            if !queue.samples.is_empty() {
                let count = queue.samples.len().min(buffer.len());
                for (slot, sample) in buffer.iter_mut().zip(queue.samples.drain(..count)) {
                    *slot = sample;
                }
                return Ok(count);
            }
            self.shared.data_ready.wait_for(&mut queue, PACKET_POLL * 5);
        }
    }

    fn stop(&self) -> BridgeResult<()> {
        self.shared.stopped.store(true, Ordering::SeqCst);
        self.shared.recording.store(false, Ordering::SeqCst);
        let _queue = self.shared.queue.lock();
        self.shared.data_ready.notify_all();
        Ok(())
    }

    fn release(&self) {
        self.shared.shutdown.store(true, Ordering::SeqCst);
        {
            let _queue = self.shared.queue.lock();
            self.shared.data_ready.notify_all();
        }
        if let Some(handle) = self.thread.lock().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for WasapiInput {
    fn drop(&mut self) {
        self.release();
    }
}

/// Owner thread body.
///
/// Sequence:
/// 1. CoInitializeEx (MTA)
/// 2. Open the capture stream and report readiness
/// 3. Register with MMCSS for real-time priority (reverted when the thread exits)
/// 4. Follow the recording flag with Start/Stop, polling packets while running
fn capture_thread(
    request: InputStreamRequest,
    shared: Arc<CaptureShared>,
    ready: mpsc::Sender<Result<(), WasapiError>>,
) {
    let _com = match com::initialize_mta() {
        Ok(guard) => guard,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    let stream = match CaptureStream::open(&request) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };
    let _ = ready.send(Ok(()));

    let _mmcss = MmcssRegistration::pro_audio();

    let max_queued = request.config.sample_rate_hz as usize * request.config.channels.count() as usize * MAX_QUEUED_SECS;
    let mut running = false;

    while !shared.shutdown.load(Ordering::SeqCst) {
        let wanted = shared.recording.load(Ordering::SeqCst);
        if wanted != running {
            let result = if wanted { stream.start() } else { stream.stop() };
            match result {
                Ok(()) => running = wanted,
                Err(e) => report_error(&shared, e),
            }
        }

        thread::sleep(PACKET_POLL);

        if running {
            if let Err(e) = stream.drain_packets(&shared, max_queued) {
                report_error(&shared, e);
            }
        }
    }

    if running {
        if let Err(e) = stream.stop() {
            log::warn!("Failed to stop capture stream on release: {}", e);
        }
    }
}

/// MMCSS "Pro Audio" registration of the current thread.
///
/// Reverted on drop, which must happen on the registering thread.
struct MmcssRegistration(HANDLE);

impl MmcssRegistration {
    fn pro_audio() -> Option<Self> {
        let mut task_index: u32 = 0;
        let task_name: Vec<u16> = "Pro Audio\0".encode_utf16().collect();
        match unsafe { AvSetMmThreadCharacteristicsW(PCWSTR(task_name.as_ptr()), &mut task_index) } {
            Ok(handle) => Some(Self(handle)),
            Err(e) => {
                log::warn!("MMCSS registration failed, capturing at normal priority: {}", e);
                None
            }
        }
    }
}

impl Drop for MmcssRegistration {
    fn drop(&mut self) {
        if let Err(e) = unsafe { AvRevertMmThreadCharacteristics(self.0) } {
            log::warn!("Failed to revert MMCSS registration: {}", e);
        }
    }
}

fn report_error(shared: &CaptureShared, e: WasapiError) {
    log::error!("Capture stream error: {}", e);
    let mut queue = shared.queue.lock();
    queue.error = Some(e.to_string());
    shared.data_ready.notify_all();
}

struct CaptureStream {
    client: IAudioClient,
    capture: IAudioCaptureClient,
    channels: usize,
}

impl CaptureStream {
    fn open(request: &InputStreamRequest) -> Result<Self, WasapiError> {
        let voice = request.source == InputSource::VoiceCommunication;
        let role = if voice {
            EndpointRole::Communications
        } else {
            EndpointRole::Console
        };
        let device = endpoint::default_endpoint(StreamDirection::Input, role)?;
        let format = pcm16_format(request.config.sample_rate_hz, request.config.channels.count());

        unsafe {
            let client: IAudioClient = device.Activate(CLSCTX_ALL, None).map_err(|e| {
                if e.code() == E_ACCESSDENIED || e.code() == AUDCLNT_E_DEVICE_IN_USE {
                    WasapiError::AccessDenied(e.message().to_string())
                } else {
                    WasapiError::call("IMMDevice::Activate")(e)
                }
            })?;

            if voice {
                set_communications_category(&client);
            }

            let frames = request.buffer_size_bytes as i64 / format.nBlockAlign as i64;
            let duration = frames * HNS_PER_SEC / format.nSamplesPerSec as i64;
            client
                .Initialize(
                    AUDCLNT_SHAREMODE_SHARED,
                    AUDCLNT_STREAMFLAGS_AUTOCONVERTPCM | AUDCLNT_STREAMFLAGS_SRC_DEFAULT_QUALITY,
                    duration,
                    0,
                    &format,
                    None,
                )
                .map_err(WasapiError::call("IAudioClient::Initialize"))?;

            let capture: IAudioCaptureClient = client
                .GetService()
                .map_err(WasapiError::call("GetService(IAudioCaptureClient)"))?;

            log::info!(
                "Opened capture endpoint \"{}\": {}Hz, {} channel(s)",
                endpoint::friendly_name(&device),
                format.nSamplesPerSec,
                format.nChannels
            );

            Ok(Self {
                client,
                capture,
                channels: format.nChannels as usize,
            })
        }
    }

    fn start(&self) -> Result<(), WasapiError> {
        unsafe { self.client.Start() }.map_err(WasapiError::call("IAudioClient::Start"))
    }

    fn stop(&self) -> Result<(), WasapiError> {
        unsafe {
            self.client.Stop().map_err(WasapiError::call("IAudioClient::Stop"))?;
            self.client.Reset().map_err(WasapiError::call("IAudioClient::Reset"))
        }
    }

    /// Move every pending packet into the shared queue.
    fn drain_packets(&self, shared: &CaptureShared, max_queued: usize) -> Result<(), WasapiError> {
        unsafe {
            let mut packet_length = self
                .capture
                .GetNextPacketSize()
                .map_err(WasapiError::call("IAudioCaptureClient::GetNextPacketSize"))?;

            while packet_length > 0 {
                let mut buffer_ptr: *mut u8 = std::ptr::null_mut();
                let mut num_frames: u32 = 0;
                let mut flags: u32 = 0;

                self.capture
                    .GetBuffer(&mut buffer_ptr, &mut num_frames, &mut flags, None, None)
                    .map_err(WasapiError::call("IAudioCaptureClient::GetBuffer"))?;

                if num_frames > 0 && !buffer_ptr.is_null() {
                    let total_samples = num_frames as usize * self.channels;
                    let mut queue = shared.queue.lock();
                    if flags & (AUDCLNT_BUFFERFLAGS_SILENT.0 as u32) != 0 {
                        queue.samples.extend(std::iter::repeat(0i16).take(total_samples));
                    } else {
                        let samples = std::slice::from_raw_parts(buffer_ptr as *const i16, total_samples);
                        queue.samples.extend(samples.iter().copied());
                    }

                    if queue.samples.len() > max_queued {
                        let excess = queue.samples.len() - max_queued;
                        queue.samples.drain(..excess);
                        if !queue.overflowed {
                            log::warn!("Capture queue overflowed, discarding oldest audio");
                            queue.overflowed = true;
                        }
                    }
                    shared.data_ready.notify_all();
                }

                self.capture
                    .ReleaseBuffer(num_frames)
                    .map_err(WasapiError::call("IAudioCaptureClient::ReleaseBuffer"))?;

                packet_length = self
                    .capture
                    .GetNextPacketSize()
                    .map_err(WasapiError::call("IAudioCaptureClient::GetNextPacketSize"))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mmcss_registration_is_reverted_on_drop() {
        // The Audio Service may be absent on build machines.
        let Some(first) = MmcssRegistration::pro_audio() else {
            return;
        };
        drop(first);

        let second = MmcssRegistration::pro_audio();
        assert!(second.is_some());
    }
}
