use indicatif::ProgressBar;
use ndarray::Array2;
use rayon::prelude::*;
use rustfft::{num_complex::Complex, FftPlanner};

pub const DEFAULT_WINDOW_SIZE: usize = 2048;

/// Magnitude spectrogram, shape `(window_size / 2 + 1, frames)`.
#[derive(Clone, Debug)]
pub struct Spectrogram {
    pub magnitudes: Array2<f32>,
    pub sample_rate: u32,
    pub window_size: usize,
    pub hop_length: usize,
}

impl Spectrogram {
    pub fn num_bins(&self) -> usize {
        self.magnitudes.nrows()
    }

    pub fn num_frames(&self) -> usize {
        self.magnitudes.ncols()
    }

    /// Centre frequency of bin `k` in Hz.
    pub fn bin_freq(&self, bin: usize) -> f32 {
        (bin as f64 * self.sample_rate as f64 / self.window_size as f64) as f32
    }
}

/// Windowed frequency transform applied at a fixed stride.
pub trait ShortTimeTransform {
    fn window_size(&self) -> usize;

    /// Frames are centred: frame `t` covers samples around `t * hop`.
    fn magnitudes(&self, samples: &[f32], sample_rate: u32, hop: usize) -> Spectrogram;
}

/// Number of centred frames for a signal of `len` samples.
pub fn centered_frame_count(len: usize, hop: usize) -> usize {
    1 + len / hop
}

/// Copy the window starting at `start` in the zero-padded signal, where the
/// padding is `pad` samples on the left.
pub fn padded_window(samples: &[f32], start: usize, size: usize, pad: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            (start + i)
                .checked_sub(pad)
                .and_then(|idx| samples.get(idx))
                .copied()
                .unwrap_or(0.0)
        })
        .collect()
}

/// Periodic Hann window.
pub fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            0.5 * (1.0 - (2.0 * std::f64::consts::PI * i as f64 / size as f64).cos()) as f32
        })
        .collect()
}

pub struct RustFftStft {
    window_size: usize,
    window: Vec<f32>,
    progress: ProgressBar,
}

impl RustFftStft {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size,
            window: hann_window(window_size),
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }
}

impl ShortTimeTransform for RustFftStft {
    fn window_size(&self) -> usize {
        self.window_size
    }

    fn magnitudes(&self, samples: &[f32], sample_rate: u32, hop: usize) -> Spectrogram {
        let size = self.window_size;
        let pad = size / 2;
        let num_bins = size / 2 + 1;
        let num_frames = centered_frame_count(samples.len(), hop);

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(size);

        self.progress.set_length(num_frames as u64);

        // Each frame is independent; collect keeps frame order.
        let columns: Vec<Vec<f32>> = (0..num_frames)
            .into_par_iter()
            .map(|t| {
                let mut buffer: Vec<Complex<f32>> = padded_window(samples, t * hop, size, pad)
                    .iter()
                    .zip(self.window.iter())
                    .map(|(&s, &w)| Complex::new(s * w, 0.0))
                    .collect();
                fft.process(&mut buffer);
                self.progress.inc(1);
                buffer[..num_bins].iter().map(|c| c.norm()).collect()
            })
            .collect();

        self.progress.finish_and_clear();

        let mut magnitudes = Array2::<f32>::zeros((num_bins, num_frames));
        for (t, column) in columns.iter().enumerate() {
            for (k, &mag) in column.iter().enumerate() {
                magnitudes[[k, t]] = mag;
            }
        }

        Spectrogram {
            magnitudes,
            sample_rate,
            window_size: size,
            hop_length: hop,
        }
    }
}
