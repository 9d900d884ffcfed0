//! WASAPI shared-mode PCM16 output.
//!
//! The stream lives on a dedicated `wasapi-render` thread that owns every
//! COM interface. [`WasapiOutput`] forwards commands over a channel and
//! waits for exactly one reply per command, which keeps writes blocking and
//! ordered like the engine expects.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use windows::core::*;
use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::*;

use pcm_bridge_core::models::audio_models::{StreamDirection, StreamUsage};
use pcm_bridge_core::models::error::{BridgeError, BridgeResult};
use pcm_bridge_core::traits::audio_platform::OutputStreamRequest;
use pcm_bridge_core::traits::output_device::OutputDevice;

use crate::com;
use crate::endpoint::{self, EndpointRole};
use crate::error::WasapiError;

/// 100-nanosecond units per second, the WASAPI duration unit.
pub(crate) const HNS_PER_SEC: i64 = 10_000_000;

const PADDING_POLL: Duration = Duration::from_millis(2);

enum RenderCommand {
    Play,
    Pause,
    Stop,
    SetVolume(f32),
    Write(Vec<u8>),
    Release,
}

/// Output handle backed by a `wasapi-render` thread.
pub struct WasapiOutput {
    commands: Sender<RenderCommand>,
    replies: Receiver<BridgeResult<usize>>,
    thread: Option<JoinHandle<()>>,
    ready: bool,
}

impl WasapiOutput {
    /// Spawn the render thread and wait until the stream is initialized.
    ///
    /// Initialization failures produce a handle that is not ready, so the
    /// caller's ready check decides what to do with it.
    pub fn open(request: OutputStreamRequest) -> BridgeResult<Self> {
        let (command_tx, command_rx) = mpsc::channel();
        let (reply_tx, reply_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        let thread = thread::Builder::new()
            .name("wasapi-render".into())
            .spawn(move || render_thread(request, command_rx, reply_tx, ready_tx))
            .map_err(|e| BridgeError::Initialization(format!("failed to spawn render thread: {}", e)))?;

        let ready = match ready_rx.recv() {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                log::error!("Render stream initialization failed: {}", e);
                false
            }
            Err(_) => {
                log::error!("Render thread exited before reporting readiness");
                false
            }
        };

        Ok(Self {
            commands: command_tx,
            replies: reply_rx,
            thread: Some(thread),
            ready,
        })
    }

    fn call(&mut self, command: RenderCommand) -> BridgeResult<usize> {
        if !self.ready {
            return Err(BridgeError::Io("render stream not initialized".into()));
        }
        self.commands
            .send(command)
            .map_err(|_| BridgeError::Io("render thread is gone".into()))?;
        self.replies
            .recv()
            .map_err(|_| BridgeError::Io("render thread is gone".into()))?
    }
}

impl OutputDevice for WasapiOutput {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn play(&mut self) -> BridgeResult<()> {
        self.call(RenderCommand::Play).map(|_| ())
    }

    fn pause(&mut self) -> BridgeResult<()> {
        self.call(RenderCommand::Pause).map(|_| ())
    }

    fn write_blocking(&mut self, bytes: &[u8]) -> BridgeResult<usize> {
        self.call(RenderCommand::Write(bytes.to_vec()))
    }

    fn set_volume(&mut self, gain: f32) -> BridgeResult<()> {
        self.call(RenderCommand::SetVolume(gain)).map(|_| ())
    }

    fn stop(&mut self) -> BridgeResult<()> {
        self.call(RenderCommand::Stop).map(|_| ())
    }

    fn release(&mut self) {
        if self.ready {
            let _ = self.commands.send(RenderCommand::Release);
            self.ready = false;
        }
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for WasapiOutput {
    fn drop(&mut self) {
        self.release();
    }
}

/// Owner thread body.
///
/// Sequence:
/// 1. CoInitializeEx (MTA)
/// 2. Open the render stream and report readiness
/// 3. Serve commands until `Release` or the handle is dropped
fn render_thread(
    request: OutputStreamRequest,
    commands: Receiver<RenderCommand>,
    replies: Sender<BridgeResult<usize>>,
    ready: Sender<BridgeResult<()>>,
) {
    let _com = match com::initialize_mta() {
        Ok(guard) => guard,
        Err(e) => {
            let _ = ready.send(Err(e.into()));
            return;
        }
    };

    let mut stream = match RenderStream::open(&request) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready.send(Err(e.into()));
            return;
        }
    };
    let _ = ready.send(Ok(()));

    for command in commands.iter() {
        let result = match command {
            RenderCommand::Play => stream.start().map(|_| 0),
            RenderCommand::Pause => stream.pause().map(|_| 0),
            RenderCommand::Stop => stream.stop().map(|_| 0),
            RenderCommand::SetVolume(gain) => stream.set_volume(gain).map(|_| 0),
            RenderCommand::Write(bytes) => stream.write(&bytes),
            RenderCommand::Release => break,
        };
        if replies.send(result.map_err(BridgeError::from)).is_err() {
            break;
        }
    }

    if let Err(e) = stream.stop() {
        log::warn!("Failed to stop render stream on release: {}", e);
    }
}

struct RenderStream {
    client: IAudioClient,
    render: IAudioRenderClient,
    volume: ISimpleAudioVolume,
    buffer_frames: u32,
    block_align: usize,
    running: bool,
}

impl RenderStream {
    fn open(request: &OutputStreamRequest) -> std::result::Result<Self, WasapiError> {
        let voice = request.usage == StreamUsage::VoiceCommunication;
        let role = if voice {
            EndpointRole::Communications
        } else {
            EndpointRole::Console
        };
        let device = endpoint::default_endpoint(StreamDirection::Output, role)?;
        let format = pcm16_format(request.config.sample_rate_hz, request.config.channels.count());

        unsafe {
            let client: IAudioClient = device
                .Activate(CLSCTX_ALL, None)
                .map_err(WasapiError::call("IMMDevice::Activate"))?;

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

            let buffer_frames = client
                .GetBufferSize()
                .map_err(WasapiError::call("IAudioClient::GetBufferSize"))?;
            let render: IAudioRenderClient = client
                .GetService()
                .map_err(WasapiError::call("GetService(IAudioRenderClient)"))?;
            let volume: ISimpleAudioVolume = client
                .GetService()
                .map_err(WasapiError::call("GetService(ISimpleAudioVolume)"))?;

            log::info!(
                "Opened render endpoint \"{}\": {}Hz, {} channel(s), {} frame buffer",
                endpoint::friendly_name(&device),
                format.nSamplesPerSec,
                format.nChannels,
                buffer_frames
            );

            Ok(Self {
                client,
                render,
                volume,
                buffer_frames,
                block_align: format.nBlockAlign as usize,
                running: false,
            })
        }
    }

    fn start(&mut self) -> std::result::Result<(), WasapiError> {
        if !self.running {
            unsafe { self.client.Start() }.map_err(WasapiError::call("IAudioClient::Start"))?;
            self.running = true;
        }
        Ok(())
    }

    fn pause(&mut self) -> std::result::Result<(), WasapiError> {
        if self.running {
            unsafe { self.client.Stop() }.map_err(WasapiError::call("IAudioClient::Stop"))?;
            self.running = false;
        }
        Ok(())
    }

    /// Pause and drop whatever is still queued.
    fn stop(&mut self) -> std::result::Result<(), WasapiError> {
        self.pause()?;
        unsafe { self.client.Reset() }.map_err(WasapiError::call("IAudioClient::Reset"))
    }

    fn set_volume(&mut self, gain: f32) -> std::result::Result<(), WasapiError> {
        unsafe { self.volume.SetMasterVolume(gain.clamp(0.0, 1.0), std::ptr::null()) }
            .map_err(WasapiError::call("ISimpleAudioVolume::SetMasterVolume"))
    }

    /// Copy whole frames into the endpoint buffer as space frees up.
    ///
    /// Returns bytes accepted; a trailing partial frame is never written.
    fn write(&mut self, bytes: &[u8]) -> std::result::Result<usize, WasapiError> {
        if !self.running {
            return Err(WasapiError::Thread("write on a stream that is not playing".into()));
        }

        let total_frames = bytes.len() / self.block_align;
        let mut written = 0usize;

        while written < total_frames {
            let padding = unsafe { self.client.GetCurrentPadding() }
                .map_err(WasapiError::call("IAudioClient::GetCurrentPadding"))?;
            let available = self.buffer_frames.saturating_sub(padding) as usize;
            if available == 0 {
                thread::sleep(PADDING_POLL);
                continue;
            }

            let frames = available.min(total_frames - written);
            unsafe {
                let buffer = self
                    .render
                    .GetBuffer(frames as u32)
                    .map_err(WasapiError::call("IAudioRenderClient::GetBuffer"))?;
                let offset = written * self.block_align;
                std::ptr::copy_nonoverlapping(bytes[offset..].as_ptr(), buffer, frames * self.block_align);
                self.render
                    .ReleaseBuffer(frames as u32, 0)
                    .map_err(WasapiError::call("IAudioRenderClient::ReleaseBuffer"))?;
            }
            written += frames;
        }

        Ok(written * self.block_align)
    }
}

/// Signed 16-bit little-endian PCM, the only format the bridge speaks.
pub(crate) fn pcm16_format(sample_rate_hz: u32, channels: u16) -> WAVEFORMATEX {
    let block_align = channels * 2;
    WAVEFORMATEX {
        wFormatTag: WAVE_FORMAT_PCM as u16,
        nChannels: channels,
        nSamplesPerSec: sample_rate_hz,
        nAvgBytesPerSec: sample_rate_hz * block_align as u32,
        nBlockAlign: block_align,
        wBitsPerSample: 16,
        cbSize: 0,
    }
}

/// Tag the stream as communications audio so the endpoint applies its voice processing.
///
/// Must run before `Initialize`. Failure only costs the voice processing.
pub(crate) unsafe fn set_communications_category(client: &IAudioClient) {
    let result = client.cast::<IAudioClient2>().and_then(|client2| {
        let properties = AudioClientProperties {
            cbSize: std::mem::size_of::<AudioClientProperties>() as u32,
            bIsOffload: false.into(),
            eCategory: AudioCategory_Communications,
            Options: AUDCLNT_STREAMOPTIONS_NONE,
        };
        client2.SetClientProperties(&properties)
    });
    if let Err(e) = result {
        log::warn!("Failed to set communications stream category: {}", e);
    }
}
