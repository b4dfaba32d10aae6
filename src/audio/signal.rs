/// Decoded PCM held as one buffer per channel.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioSignal {
    /// One sample buffer per channel, all the same length.
    pub channels: Vec<Vec<f32>>,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
}

impl AudioSignal {
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32, bits_per_sample: u16) -> Self {
        Self {
            channels,
            sample_rate,
            bits_per_sample,
        }
    }

    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self::new(vec![samples], sample_rate, 16)
    }

    /// Split interleaved samples into per-channel buffers. A trailing
    /// partial sample frame is dropped.
    pub fn from_interleaved(samples: &[f32], channel_count: usize, sample_rate: u32, bits_per_sample: u16) -> Self {
        let channel_count = channel_count.max(1);
        let frames = samples.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (ch, &s) in frame.iter().enumerate() {
                channels[ch].push(s);
            }
        }
        Self::new(channels, sample_rate, bits_per_sample)
    }

    pub fn to_interleaved(&self) -> Vec<f32> {
        let frames = self.frames_per_channel();
        let mut out = Vec::with_capacity(frames * self.channel_count());
        for i in 0..frames {
            for ch in &self.channels {
                out.push(ch[i]);
            }
        }
        out
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn frames_per_channel(&self) -> usize {
        self.channels.iter().map(Vec::len).min().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.frames_per_channel() == 0
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames_per_channel() as f64 / self.sample_rate as f64
    }

    /// Average all channels into one buffer.
    pub fn downmix(&self) -> Vec<f32> {
        let count = self.channel_count();
        if count == 1 {
            return self.channels[0].clone();
        }
        (0..self.frames_per_channel())
            .map(|i| self.channels.iter().map(|ch| ch[i]).sum::<f32>() / count as f32)
            .collect()
    }

    /// Keep at most `seconds` of audio.
    pub fn truncate_secs(&mut self, seconds: f64) {
        let max_frames = (seconds * self.sample_rate as f64) as usize;
        for ch in &mut self.channels {
            ch.truncate(max_frames);
        }
    }

    pub fn peak(&self) -> f32 {
        self.channels
            .iter()
            .flat_map(|ch| ch.iter())
            .fold(0.0f32, |m, s| m.max(s.abs()))
    }
}
