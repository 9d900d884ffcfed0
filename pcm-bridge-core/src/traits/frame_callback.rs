use std::sync::Arc;

use crate::models::frame::AudioFrame;

/// Consumer invoked once per captured chunk, in read order.
///
/// Runs on the capture worker thread; keep processing minimal.
pub type FrameCallback = Arc<dyn Fn(AudioFrame) + Send + Sync + 'static>;
