use rayon::prelude::*;

use super::stft::{centered_frame_count, padded_window};

/// Scale so the track's peak becomes 1.0. A zero peak leaves the track as-is.
pub fn normalize_peak(track: &mut [f32]) {
    let peak = track.iter().copied().fold(0.0f32, f32::max);
    if peak > 0.0 {
        for v in track.iter_mut() {
            *v /= peak;
        }
    } else {
        log::debug!("Zero peak over {} frames; skipping normalization", track.len());
    }
}

/// Sliding median of odd length `kernel`, treating samples past either end
/// as zero.
pub fn median_filter(track: &[f32], kernel: usize) -> Vec<f32> {
    debug_assert!(kernel % 2 == 1);
    let half = kernel / 2;
    let n = track.len();
    let mut window = Vec::with_capacity(kernel);

    (0..n)
        .map(|i| {
            window.clear();
            for j in 0..kernel {
                let idx = (i + j).checked_sub(half).filter(|&idx| idx < n);
                window.push(idx.map_or(0.0, |idx| track[idx]));
            }
            window.sort_by(|a, b| a.total_cmp(b));
            window[half]
        })
        .collect()
}

/// Root-mean-square over centred, unwindowed frames of `frame_length` at `hop`.
/// Yields the same frame count as the spectrogram.
pub fn rms_frames(samples: &[f32], frame_length: usize, hop: usize) -> Vec<f32> {
    let pad = frame_length / 2;
    (0..centered_frame_count(samples.len(), hop))
        .into_par_iter()
        .map(|t| {
            let frame = padded_window(samples, t * hop, frame_length, pad);
            let energy: f64 = frame.iter().map(|&s| (s as f64) * (s as f64)).sum();
            (energy / frame_length as f64).sqrt() as f32
        })
        .collect()
}
