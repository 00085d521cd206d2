//! Onset strength and peak picking.
//!
//! Strength is log-power spectral flux: the mean positive dB increase across
//! bins between consecutive frames. Peaks mark the frame where the strength
//! curve peaks; detections are never moved back to an earlier attack point.

use super::stft::Spectrogram;
use crate::config::OnsetConfig;

const AMIN: f32 = 1e-10;

/// Peak-picking windows in frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PeakPicking {
    pub pre_max: usize,
    pub post_max: usize,
    pub pre_avg: usize,
    pub post_avg: usize,
    pub wait: usize,
    pub delta: f32,
}

impl PeakPicking {
    /// Convert second-based windows to frames at the given hop. `post_*`
    /// windows always include the current frame.
    pub fn from_config(config: &OnsetConfig, sample_rate: u32, hop: usize) -> Self {
        // Nudge before flooring so 0.03 s at 100 fps is 3 frames, not 2.
        let frames = |secs: f32| {
            (secs as f64 * sample_rate as f64 / hop as f64 + 1e-6).floor() as usize
        };
        Self {
            pre_max: frames(config.pre_max),
            post_max: frames(config.post_max) + 1,
            pre_avg: frames(config.pre_avg),
            post_avg: frames(config.post_avg) + 1,
            wait: frames(config.wait),
            delta: config.delta,
        }
    }
}

/// Onset strength per spectrogram frame.
pub fn onset_strength(spec: &Spectrogram, top_db: f32) -> Vec<f32> {
    let num_frames = spec.num_frames();
    let mut strength = vec![0.0f32; num_frames];
    if num_frames < 2 || spec.num_bins() == 0 {
        return strength;
    }

    let mut db = spec.magnitudes.mapv(|m| 10.0 * (m * m).max(AMIN).log10());
    let floor = db.iter().copied().fold(f32::NEG_INFINITY, f32::max) - top_db;
    db.mapv_inplace(|v| v.max(floor));

    let num_bins = spec.num_bins() as f32;
    let flux: Vec<f32> = (1..num_frames)
        .map(|t| {
            let rise: f32 = db
                .column(t)
                .iter()
                .zip(db.column(t - 1).iter())
                .map(|(cur, prev)| (cur - prev).max(0.0))
                .sum();
            rise / num_bins
        })
        .collect();

    // Shift by the lag plus the centring offset so a rise lines up with the
    // frame whose window first contains it.
    let delay = 1 + spec.window_size / (2 * spec.hop_length.max(1));
    for (t, slot) in strength.iter_mut().enumerate().skip(delay) {
        if let Some(&value) = flux.get(t - delay) {
            *slot = value;
        }
    }
    strength
}

/// Onset frames, in increasing order.
pub fn detect_onsets(strength: &[f32], picking: &PeakPicking) -> Vec<usize> {
    if strength.iter().all(|&v| v == 0.0) {
        return Vec::new();
    }

    let min = strength.iter().copied().fold(f32::INFINITY, f32::min);
    let max = strength.iter().copied().fold(f32::NEG_INFINITY, f32::max) - min;
    let normalized: Vec<f32> = strength
        .iter()
        .map(|&v| (v - min) / (max + f32::MIN_POSITIVE))
        .collect();

    pick_peaks(&normalized, picking)
}

/// Frame `n` is a peak when it is the maximum of `x[n - pre_max .. n + post_max]`,
/// reaches `delta` above the mean of `x[n - pre_avg .. n + post_avg]`, and
/// comes more than `wait` frames after the previous peak. Windows are
/// truncated at the ends.
pub fn pick_peaks(x: &[f32], picking: &PeakPicking) -> Vec<usize> {
    let n = x.len();
    let mut peaks = Vec::new();
    let mut last: Option<usize> = None;

    for i in 0..n {
        let value = x[i];
        if value <= 0.0 {
            continue;
        }

        let max_start = i.saturating_sub(picking.pre_max);
        let max_end = (i + picking.post_max.max(1)).min(n);
        let local_max = x[max_start..max_end]
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max);
        if value != local_max {
            continue;
        }

        let avg_start = i.saturating_sub(picking.pre_avg);
        let avg_end = (i + picking.post_avg.max(1)).min(n);
        let window = &x[avg_start..avg_end];
        let mean = window.iter().sum::<f32>() / window.len() as f32;
        if value < mean + picking.delta {
            continue;
        }

        if last.map_or(true, |prev| i > prev + picking.wait) {
            peaks.push(i);
            last = Some(i);
        }
    }

    peaks
}

pub fn pulse_track(onsets: &[usize], len: usize) -> Vec<bool> {
    let mut pulse = vec![false; len];
    for &idx in onsets {
        if let Some(slot) = pulse.get_mut(idx) {
            *slot = true;
        }
    }
    pulse
}
