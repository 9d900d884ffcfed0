/// Playback engine lifecycle.
///
/// ```text
/// Uninitialized → Ready ⇄ Paused
///       ↑           │        │
///       └── stop ───┴────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Uninitialized,
    Ready,
    Paused,
}

impl PlaybackState {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Whether a device handle is currently held.
    pub fn has_session(&self) -> bool {
        !matches!(self, Self::Uninitialized)
    }
}

/// Capture engine lifecycle: `Idle → Capturing → Idle` (after stop joins the worker).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureState {
    #[default]
    Idle,
    Capturing,
}

impl CaptureState {
    pub fn is_capturing(&self) -> bool {
        matches!(self, Self::Capturing)
    }
}
