use super::audio_models::ChannelLayout;

/// One chunk of PCM16 samples, interleaved by channel when stereo.
///
/// For capture, a frame is exactly one hardware read: the engine never
/// merges or splits reads. `sequence` counts frames within a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    pub samples: Vec<i16>,
    pub channels: ChannelLayout,
    pub sequence: u64,
}

impl AudioFrame {
    pub fn new(samples: Vec<i16>, channels: ChannelLayout, sequence: u64) -> Self {
        Self {
            samples,
            channels,
            sequence,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of complete sample instants across all channels.
    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels.count() as usize
    }

    /// Largest absolute sample value.
    pub fn peak(&self) -> u16 {
        self.samples
            .iter()
            .map(|s| s.unsigned_abs())
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stereo_frame_count() {
        let frame = AudioFrame::new(vec![1, 2, 3, 4, 5, 6], ChannelLayout::Stereo, 0);
        assert_eq!(frame.len(), 6);
        assert_eq!(frame.frame_count(), 3);
    }

    #[test]
    fn peak_handles_min_value() {
        let frame = AudioFrame::new(vec![0, -32768, 100], ChannelLayout::Mono, 0);
        assert_eq!(frame.peak(), 32768);
        assert_eq!(AudioFrame::new(Vec::new(), ChannelLayout::Mono, 0).peak(), 0);
    }
}
