use ndarray::{s, Axis};

use super::features::{BAND_COUNT, BAND_NAMES};
use super::stft::Spectrogram;

/// A frequency band: half-open range `[low_hz, high_hz)` and its weight.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BandSpec {
    pub name: &'static str,
    pub low_hz: f32,
    pub high_hz: f32,
    pub weight: f32,
}

impl BandSpec {
    pub const fn new(name: &'static str, low_hz: f32, high_hz: f32, weight: f32) -> Self {
        Self {
            name,
            low_hz,
            high_hz,
            weight,
        }
    }

    pub fn contains(&self, freq: f32) -> bool {
        freq >= self.low_hz && freq < self.high_hz
    }
}

// Low end is weighted up.
pub const DEFAULT_BANDS: [BandSpec; BAND_COUNT] = [
    BandSpec::new(BAND_NAMES[0], 20.0, 60.0, 1.2),
    BandSpec::new(BAND_NAMES[1], 60.0, 120.0, 1.1),
    BandSpec::new(BAND_NAMES[2], 120.0, 250.0, 1.0),
    BandSpec::new(BAND_NAMES[3], 250.0, 2000.0, 0.9),
    BandSpec::new(BAND_NAMES[4], 2000.0, 4000.0, 0.8),
    BandSpec::new(BAND_NAMES[5], 4000.0, 6000.0, 0.7),
    BandSpec::new(BAND_NAMES[6], 6000.0, 12000.0, 0.5),
];

/// Contiguous bin range whose centre frequencies fall inside the band.
pub fn band_bins(spec: &Spectrogram, band: &BandSpec) -> std::ops::Range<usize> {
    let bins: Vec<usize> = (0..spec.num_bins())
        .filter(|&k| band.contains(spec.bin_freq(k)))
        .collect();
    match (bins.first(), bins.last()) {
        (Some(&first), Some(&last)) => first..last + 1,
        _ => 0..0,
    }
}

/// Mean magnitude per frame across the band's bins. A band with no bins
/// yields zeros.
pub fn band_energy(spec: &Spectrogram, band: &BandSpec) -> Vec<f32> {
    let bins = band_bins(spec, band);
    if bins.is_empty() {
        log::debug!(
            "Band '{}' [{}, {}) Hz has no bins at {} Hz / window {}",
            band.name,
            band.low_hz,
            band.high_hz,
            spec.sample_rate,
            spec.window_size
        );
        return vec![0.0; spec.num_frames()];
    }
    spec.magnitudes
        .slice(s![bins, ..])
        .mean_axis(Axis(0))
        .map(|mean| mean.to_vec())
        .unwrap_or_else(|| vec![0.0; spec.num_frames()])
}

/// Per-band energy tracks scaled by each band's weight.
pub fn weighted_band_tracks(spec: &Spectrogram, bands: &[BandSpec]) -> Vec<Vec<f32>> {
    bands
        .iter()
        .map(|band| {
            band_energy(spec, band)
                .into_iter()
                .map(|e| e * band.weight)
                .collect()
        })
        .collect()
}
