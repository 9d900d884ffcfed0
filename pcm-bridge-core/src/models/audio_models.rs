use serde::{Deserialize, Serialize};

use super::error::BridgeError;

/// Channel layout of a PCM16 stream. Stereo samples are interleaved `[L, R, ...]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum ChannelLayout {
    Mono,
    Stereo,
}

impl ChannelLayout {
    pub fn count(self) -> u16 {
        match self {
            Self::Mono => 1,
            Self::Stereo => 2,
        }
    }
}

impl TryFrom<u16> for ChannelLayout {
    type Error = BridgeError;

    fn try_from(count: u16) -> Result<Self, Self::Error> {
        match count {
            1 => Ok(Self::Mono),
            2 => Ok(Self::Stereo),
            other => Err(BridgeError::Configuration(format!(
                "unsupported channel count: {}",
                other
            ))),
        }
    }
}

impl From<ChannelLayout> for u16 {
    fn from(layout: ChannelLayout) -> Self {
        layout.count()
    }
}

/// Sample encoding. Only signed 16-bit little-endian PCM exists here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PcmEncoding {
    #[default]
    Pcm16,
}

impl PcmEncoding {
    pub fn bits_per_sample(self) -> u16 {
        16
    }

    pub fn bytes_per_sample(self) -> usize {
        2
    }
}

/// Which side of the duplex a buffer-size query or device belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamDirection {
    Output,
    Input,
}

/// Declared purpose of an output stream.
///
/// `VoiceCommunication` is what lets platform echo cancellation pair the
/// output with a capture stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamUsage {
    Media,
    VoiceCommunication,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    Music,
    Speech,
}

/// Source an input stream records from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputSource {
    Microphone,
    /// Mic path tuned for calls; the input-side half of echo cancellation.
    VoiceCommunication,
}

/// Global device audio mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioMode {
    Normal,
    InCommunication,
}

/// Volume streams the routing backend can adjust.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VolumeStream {
    VoiceCall,
    Music,
}

/// Output routing while communication mode is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputRoute {
    /// Force the loudspeaker.
    #[default]
    Speaker,
    /// Earpiece, or whatever default device the platform picks.
    Earpiece,
    /// Earpiece when a headset is connected, loudspeaker otherwise.
    Auto,
}

/// Optional platform capabilities queried at session start.
///
/// Each one is a voice-processing effect bound to an input session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    EchoCancellation,
    NoiseSuppression,
    AutomaticGainControl,
}

impl Capability {
    /// Effects attached to a capture session, in attach order.
    pub const VOICE_EFFECTS: [Capability; 3] = [
        Capability::EchoCancellation,
        Capability::NoiseSuppression,
        Capability::AutomaticGainControl,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Availability {
    Available,
    #[default]
    Unavailable,
}

impl Availability {
    pub fn is_available(self) -> bool {
        matches!(self, Self::Available)
    }
}

/// Outcome of one blocking write. A short write is reported, not raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteReport {
    pub bytes_requested: usize,
    pub bytes_written: usize,
}

impl WriteReport {
    pub fn is_short(&self) -> bool {
        self.bytes_written < self.bytes_requested
    }
}

/// Counters for the playback path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackDiagnostics {
    pub writes: u64,
    pub bytes_requested: u64,
    pub bytes_written: u64,
    pub short_writes: u64,
}

impl PlaybackDiagnostics {
    pub(crate) fn record(&mut self, report: &WriteReport) {
        self.writes += 1;
        self.bytes_requested += report.bytes_requested as u64;
        self.bytes_written += report.bytes_written as u64;
        if report.is_short() {
            self.short_writes += 1;
        }
    }
}

/// Availability and live state of one capture effect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EffectStatus {
    pub availability: Availability,
    pub enabled: bool,
}

/// Counters for the capture path, snapshotted from the worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureDiagnostics {
    pub frames_emitted: u64,
    pub samples_emitted: u64,
    pub read_errors: u64,
    /// Length of the current run of failed reads; reset by any good read.
    pub consecutive_read_errors: u64,
    /// Reads that completed without producing samples.
    pub empty_reads: u64,
    pub echo_cancellation: EffectStatus,
    pub noise_suppression: EffectStatus,
    pub automatic_gain_control: EffectStatus,
}

impl CaptureDiagnostics {
    pub fn effect(&self, capability: Capability) -> EffectStatus {
        match capability {
            Capability::EchoCancellation => self.echo_cancellation,
            Capability::NoiseSuppression => self.noise_suppression,
            Capability::AutomaticGainControl => self.automatic_gain_control,
        }
    }
}
