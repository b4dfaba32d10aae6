//! Frame scheduling for the STFT loops.
//!
//! Edit passes always produce at least one frame and zero-pad past the end
//! of the channel. Feature analysis only visits frames that fit entirely
//! inside the signal.

use rustfft::num_complex::Complex64;

/// Samples per analysis frame.
pub const FRAME_SIZE: usize = 4096;
/// Distance between consecutive frame starts (50% overlap).
pub const HOP_SIZE: usize = FRAME_SIZE / 2;

/// Number of frames an edit pass runs over a channel of `len` samples.
pub fn edit_frame_count(len: usize) -> usize {
    (len.saturating_sub(FRAME_SIZE) / HOP_SIZE + 1).max(1)
}

/// Number of full frames available for feature analysis.
pub fn analysis_frame_count(len: usize) -> usize {
    if len < FRAME_SIZE {
        0
    } else {
        (len - FRAME_SIZE) / HOP_SIZE + 1
    }
}

/// Start offsets of the edit-pass frames.
pub fn edit_frame_starts(len: usize) -> impl Iterator<Item = usize> {
    (0..edit_frame_count(len)).map(|f| f * HOP_SIZE)
}

/// Start offsets of the full analysis frames.
pub fn analysis_frame_starts(len: usize) -> impl Iterator<Item = usize> {
    (0..analysis_frame_count(len)).map(|f| f * HOP_SIZE)
}

/// Copy one windowed frame starting at `pos` into a complex buffer.
/// Samples past the end of `samples` read as zero.
pub fn read_frame<S: Copy + Into<f64>>(samples: &[S], pos: usize, window: &[f64]) -> Vec<Complex64> {
    window
        .iter()
        .enumerate()
        .map(|(i, &w)| {
            let s = samples.get(pos + i).map_or(0.0, |&s| s.into());
            Complex64::new(s * w, 0.0)
        })
        .collect()
}
