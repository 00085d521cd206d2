use indicatif::ProgressBar;

use super::bands::{weighted_band_tracks, BandSpec};
use super::decode::SampleBuffer;
use super::dsp::{median_filter, normalize_peak, rms_frames};
use super::features::{FeatureFrame, FeatureTrack, BAND_COUNT};
use super::grid::AnalysisGrid;
use super::onset::{detect_onsets, onset_strength, pulse_track, PeakPicking};
use super::stft::{RustFftStft, ShortTimeTransform};
use crate::config::{Config, OnsetConfig};
use crate::error::{AnalysisError, AnalysisResult};

pub struct FeatureEngine<T: ShortTimeTransform> {
    transform: T,
    bands: [BandSpec; BAND_COUNT],
    onset: OnsetConfig,
    median_kernel: usize,
}

impl FeatureEngine<RustFftStft> {
    pub fn from_config(config: &Config, progress: ProgressBar) -> AnalysisResult<Self> {
        config.validate()?;
        let transform = RustFftStft::new(config.analysis.window_size).with_progress(progress);
        Ok(Self::new(
            transform,
            config.bands.layout()?,
            config.onset.clone(),
            config.analysis.median_kernel,
        ))
    }
}

impl<T: ShortTimeTransform> FeatureEngine<T> {
    pub fn new(
        transform: T,
        bands: [BandSpec; BAND_COUNT],
        onset: OnsetConfig,
        median_kernel: usize,
    ) -> Self {
        Self {
            transform,
            bands,
            onset,
            median_kernel,
        }
    }

    pub fn analyze(
        &self,
        audio: &SampleBuffer,
        grid: &AnalysisGrid,
    ) -> AnalysisResult<FeatureTrack> {
        let samples = &audio.samples;
        let sr = audio.sample_rate;
        let hop = grid.hop_length;
        let required = grid.total_frames;

        log::info!(
            "Pass 1: Short-time transform (window={}, hop={})...",
            self.transform.window_size(),
            hop
        );
        let spec = self.transform.magnitudes(samples, sr, hop);
        let available = spec.num_frames();
        if available < required {
            return Err(AnalysisError::Consistency { required, available });
        }

        log::info!("Pass 2: Band energy ({} frames)...", available);
        let band_tracks: Vec<Vec<f32>> = weighted_band_tracks(&spec, &self.bands)
            .into_iter()
            .map(|mut track| {
                normalize_peak(&mut track);
                median_filter(&track, self.median_kernel)
            })
            .collect();

        log::info!("Pass 3: Loudness...");
        let mut rms = rms_frames(samples, self.transform.window_size(), hop);
        if rms.len() < required {
            return Err(AnalysisError::Consistency {
                required,
                available: rms.len(),
            });
        }
        normalize_peak(&mut rms);
        let loudness = median_filter(&rms, self.median_kernel);

        log::info!("Pass 4: Onsets...");
        let strength = onset_strength(&spec, self.onset.top_db);
        let picking = PeakPicking::from_config(&self.onset, sr, hop);
        let onsets = detect_onsets(&strength, &picking);
        let pulse = pulse_track(&onsets, available);

        // Everything past the grid is dropped.
        let frames: Vec<FeatureFrame> = (0..required)
            .map(|i| FeatureFrame {
                index: i,
                loudness: loudness[i],
                bands: std::array::from_fn(|b| band_tracks[b][i]),
                pulse: pulse[i],
            })
            .collect();

        let track = FeatureTrack {
            frame_rate: grid.frame_rate,
            frames,
        };
        log::info!(
            "Track: {} frames, {} pulses ({} transform frames dropped)",
            track.len(),
            track.pulse_count(),
            available - required
        );
        Ok(track)
    }
}

/// Plan the grid for `audio` at `fps` and run the engine over it.
pub fn analyze(
    audio: &SampleBuffer,
    fps: u32,
    config: &Config,
    progress: ProgressBar,
) -> AnalysisResult<(AnalysisGrid, FeatureTrack)> {
    let grid = AnalysisGrid::plan(
        audio.sample_rate,
        audio.samples.len(),
        fps,
        config.analysis.hop_rounding,
    )?;
    log::info!(
        "Grid: {} frames @ {}fps, hop {} samples ({:.1}s)",
        grid.total_frames,
        grid.frame_rate,
        grid.hop_length,
        audio.duration_secs()
    );

    let engine = FeatureEngine::from_config(config, progress)?;
    let track = engine.analyze(audio, &grid)?;
    Ok((grid, track))
}
