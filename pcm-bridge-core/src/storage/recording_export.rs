use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::artifact::ExportedRecording;
use crate::models::config::AudioSessionConfig;
use crate::models::error::{BridgeError, BridgeResult};
use crate::models::frame::AudioFrame;
use crate::processing::wav_format::{self, WAV_MIME_TYPE};
use crate::traits::artifact_store::ArtifactStore;
use crate::traits::frame_callback::FrameCallback;

/// Collects captured frames and exports them as a WAV artifact.
///
/// Clones share the same buffer, so one clone can be handed to
/// [`CaptureEngine::start`](crate::capture::engine::CaptureEngine::start)
/// through [`callback`](Self::callback) while another exports.
#[derive(Clone)]
pub struct RecordingExporter {
    config: AudioSessionConfig,
    samples: Arc<Mutex<Vec<i16>>>,
}

impl RecordingExporter {
    pub fn new(config: AudioSessionConfig) -> Self {
        Self {
            config,
            samples: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn config(&self) -> AudioSessionConfig {
        self.config
    }

    /// A frame consumer that appends into this exporter.
    pub fn callback(&self) -> FrameCallback {
        let exporter = self.clone();
        Arc::new(move |frame: AudioFrame| exporter.push_frame(&frame))
    }

    /// Append one frame. Frames with a different channel layout are skipped.
    pub fn push_frame(&self, frame: &AudioFrame) {
        if frame.channels != self.config.channels {
            log::warn!(
                "Dropping frame {} with {} channel(s), recording is {} channel(s)",
                frame.sequence,
                frame.channels.count(),
                self.config.channels.count()
            );
            return;
        }
        self.samples.lock().extend_from_slice(&frame.samples);
    }

    pub fn sample_count(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn duration_secs(&self) -> f64 {
        let per_second = self.config.sample_rate_hz as f64 * self.config.channels.count() as f64;
        self.sample_count() as f64 / per_second
    }

    pub fn clear(&self) {
        self.samples.lock().clear();
    }

    /// Encode everything collected so far as WAV and hand it to `store`.
    ///
    /// The buffer is left intact, so a failed export can be retried.
    pub fn export(&self, store: &dyn ArtifactStore, name: &str) -> BridgeResult<ExportedRecording> {
        let samples = self.samples.lock().clone();
        if samples.is_empty() {
            return Err(BridgeError::Storage("no audio captured to export".into()));
        }

        let wav = wav_format::encode_wav(&self.config, &samples)?;
        let locator = store.store(&wav, name, WAV_MIME_TYPE)?;
        let exported = ExportedRecording {
            locator,
            duration_secs: self.duration_secs(),
            sample_count: samples.len(),
            byte_count: wav.len(),
        };
        log::info!(
            "Exported recording {}: {:.2}s, {} bytes",
            name,
            exported.duration_secs,
            exported.byte_count
        );
        Ok(exported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::audio_models::ChannelLayout;
    use crate::processing::wav_format::WAV_HEADER_SIZE;
    use approx::assert_relative_eq;

    /// Keeps the last stored payload in memory.
    #[derive(Default)]
    struct MemoryStore {
        stored: Mutex<Vec<(String, String, Vec<u8>)>>,
    }

    impl ArtifactStore for MemoryStore {
        fn store(&self, bytes: &[u8], name: &str, mime_type: &str) -> BridgeResult<String> {
            let mut stored = self.stored.lock();
            stored.push((name.to_string(), mime_type.to_string(), bytes.to_vec()));
            Ok(format!("memory://{}", stored.len()))
        }
    }

    struct FailingStore;

    impl ArtifactStore for FailingStore {
        fn store(&self, _bytes: &[u8], _name: &str, _mime_type: &str) -> BridgeResult<String> {
            Err(BridgeError::Storage("disk full".into()))
        }
    }

    #[test]
    fn callback_accumulates_frames_in_order() {
        let exporter = RecordingExporter::new(AudioSessionConfig::default());
        let callback = exporter.callback();
        callback(AudioFrame::new(vec![1, 2], ChannelLayout::Mono, 0));
        callback(AudioFrame::new(vec![3], ChannelLayout::Mono, 1));

        assert_eq!(exporter.sample_count(), 3);
        assert_eq!(*exporter.samples.lock(), vec![1, 2, 3]);
    }

    #[test]
    fn mismatched_layout_is_skipped() {
        let exporter = RecordingExporter::new(AudioSessionConfig::default());
        exporter.push_frame(&AudioFrame::new(vec![1, 2], ChannelLayout::Stereo, 0));
        assert_eq!(exporter.sample_count(), 0);
    }

    #[test]
    fn duration_accounts_for_channels() {
        let config = AudioSessionConfig::new(16_000, 2).unwrap();
        let exporter = RecordingExporter::new(config);
        exporter.push_frame(&AudioFrame::new(vec![0; 16_000], ChannelLayout::Stereo, 0));
        assert_relative_eq!(exporter.duration_secs(), 0.5);
    }

    #[test]
    fn export_stores_wav_payload() {
        let exporter = RecordingExporter::new(AudioSessionConfig::default());
        exporter.push_frame(&AudioFrame::new(vec![0x1234; 240], ChannelLayout::Mono, 0));
        let store = MemoryStore::default();

        let exported = exporter.export(&store, "call.wav").unwrap();
        assert_eq!(exported.locator, "memory://1");
        assert_eq!(exported.sample_count, 240);
        assert_eq!(exported.byte_count, WAV_HEADER_SIZE + 480);
        assert_relative_eq!(exported.duration_secs, 0.01);

        let stored = store.stored.lock();
        let (name, mime, bytes) = &stored[0];
        assert_eq!(name, "call.wav");
        assert_eq!(mime, WAV_MIME_TYPE);
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[WAV_HEADER_SIZE..WAV_HEADER_SIZE + 2], &[0x34, 0x12]);
    }

    #[test]
    fn empty_export_is_rejected() {
        let exporter = RecordingExporter::new(AudioSessionConfig::default());
        assert!(matches!(
            exporter.export(&MemoryStore::default(), "empty.wav"),
            Err(BridgeError::Storage(_))
        ));
    }

    #[test]
    fn failed_export_keeps_samples() {
        let exporter = RecordingExporter::new(AudioSessionConfig::default());
        exporter.push_frame(&AudioFrame::new(vec![1; 10], ChannelLayout::Mono, 0));

        assert!(exporter.export(&FailingStore, "x.wav").is_err());
        assert_eq!(exporter.sample_count(), 10);

        exporter.clear();
        assert_eq!(exporter.sample_count(), 0);
    }
}
