/// Non-interleaved PCM audio: one sample vector per channel.
///
/// Every channel has exactly `frames()` samples.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    sample_rate: f64,
    channels: Vec<Vec<f32>>,
}

impl PcmBuffer {
    /// Duplicate a mono signal into `channel_count` identical channels.
    pub fn from_mono(samples: Vec<f32>, sample_rate: f64, channel_count: usize) -> Self {
        let mut channels = Vec::with_capacity(channel_count);
        for _ in 1..channel_count {
            channels.push(samples.clone());
        }
        if channel_count > 0 {
            channels.push(samples);
        }

        Self {
            sample_rate,
            channels,
        }
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of sample frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    pub fn channels(&self) -> impl Iterator<Item = &[f32]> {
        self.channels.iter().map(Vec::as_slice)
    }

    /// Sample at `frame` on `channel`, folding extra output channels onto the
    /// last available one.
    #[inline]
    pub fn sample(&self, channel: usize, frame: usize) -> f32 {
        let ch = channel.min(self.channels.len().saturating_sub(1));
        self.channels
            .get(ch)
            .and_then(|c| c.get(frame))
            .copied()
            .unwrap_or(0.0)
    }

    /// Playback length in seconds.
    pub fn duration(&self) -> f64 {
        self.frames() as f64 / self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_is_duplicated() {
        let buf = PcmBuffer::from_mono(vec![0.1, -0.2, 0.3], 48_000.0, 3);
        assert_eq!(buf.channel_count(), 3);
        assert_eq!(buf.frames(), 3);
        for ch in buf.channels() {
            assert_eq!(ch, &[0.1, -0.2, 0.3]);
        }
    }

    #[test]
    fn sample_folds_missing_channels() {
        let buf = PcmBuffer::from_mono(vec![0.5, 0.25], 48_000.0, 1);
        assert_eq!(buf.sample(3, 1), 0.25);
        assert_eq!(buf.sample(0, 9), 0.0);
    }
}
