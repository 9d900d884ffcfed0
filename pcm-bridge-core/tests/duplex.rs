use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pcm_bridge_core::processing::pcm;
use pcm_bridge_core::{
    ArtifactStore, AudioFrame, AudioMode, AudioRoutingController, AudioSessionConfig, BridgeConfiguration,
    CaptureEngine, CaptureOptions, DirectoryStore, DuplexSession, FrameCallback, PlaybackEngine, PlaybackOptions,
    RecordingExporter, SimulatedPlatform, SimulatedRouting,
};

fn wait_until(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    condition()
}

#[test]
fn echo_loop_plays_back_captured_frames() {
    let platform = SimulatedPlatform::new();
    let routing = SimulatedRouting::new();
    let controller = Arc::new(AudioRoutingController::new(Arc::new(routing.clone())));

    let mut playback = PlaybackEngine::new(Arc::new(platform.clone()), Arc::clone(&controller), PlaybackOptions::default());
    let mut capture = CaptureEngine::new(Arc::new(platform.clone()), Arc::clone(&controller), CaptureOptions::default());

    let (sender, receiver) = std::sync::mpsc::channel::<AudioFrame>();
    let on_frame: FrameCallback = Arc::new(move |frame: AudioFrame| {
        let _ = sender.send(frame);
    });

    playback.init(16_000, 1).unwrap();
    capture.start(16_000, 1, on_frame).unwrap();

    platform.push_read(vec![100, -100]);
    platform.push_read(vec![0x1234]);

    for _ in 0..2 {
        let frame = receiver.recv_timeout(Duration::from_secs(2)).unwrap();
        playback.play(&frame.samples).unwrap();
    }

    let played = pcm::decode_le(&platform.written_bytes()).unwrap();
    assert_eq!(played, vec![100, -100, 0x1234]);

    // Stopping one half keeps communication mode for the other.
    playback.stop().unwrap();
    assert_eq!(routing.mode(), AudioMode::InCommunication);
    capture.stop().unwrap();
    assert_eq!(routing.mode(), AudioMode::Normal);

    assert_eq!(platform.open_outputs(), 0);
    assert_eq!(platform.open_inputs(), 0);
}

#[test]
fn duplex_session_records_and_exports() {
    let platform = SimulatedPlatform::new();
    let routing = SimulatedRouting::new();
    let config = BridgeConfiguration::from_json(r#"{ "session": { "sample_rate_hz": 16000, "channels": 1 } }"#).unwrap();
    let mut session = DuplexSession::new(Arc::new(platform.clone()), Arc::new(routing.clone()), config).unwrap();

    let exporter = RecordingExporter::new(AudioSessionConfig::new(16_000, 1).unwrap());
    session.start(exporter.callback()).unwrap();

    platform.push_read(vec![1; 160]);
    platform.push_read(vec![2; 160]);
    assert!(wait_until(|| exporter.sample_count() == 320));

    session.playback().test_tone().unwrap();
    assert_eq!(platform.written_bytes().len(), 16_000 * 2 * 2);

    session.stop().unwrap();
    assert_eq!(routing.mode(), AudioMode::Normal);

    let dir = std::env::temp_dir().join(format!("pcm_bridge_export_{}", uuid::Uuid::new_v4()));
    let store = DirectoryStore::new(&dir);
    let exported = exporter.export(&store, "interview.wav").unwrap();
    assert_eq!(exported.sample_count, 320);

    let bytes = fs::read(store.path_for(&exported.locator).unwrap()).unwrap();
    assert_eq!(bytes.len(), exported.byte_count);
    assert_eq!(&bytes[0..4], b"RIFF");

    let metadata = store.read_metadata(&exported.locator).unwrap();
    assert_eq!(metadata.size_bytes, bytes.len() as u64);
    assert_eq!(metadata.mime_type, "audio/wav");

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn store_is_usable_as_trait_object() {
    let dir = std::env::temp_dir().join(format!("pcm_bridge_trait_{}", uuid::Uuid::new_v4()));
    let store: Box<dyn ArtifactStore> = Box::new(DirectoryStore::new(&dir));
    let locator = store.store(&[0, 1, 2, 3], "raw.pcm", "audio/L16").unwrap();
    assert!(locator.ends_with(".pcm"));
    fs::remove_dir_all(&dir).ok();
}
