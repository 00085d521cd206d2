use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::audio::bands::{BandSpec, DEFAULT_BANDS};
use crate::audio::features::BAND_COUNT;
use crate::audio::grid::HopRounding;
use crate::audio::stft::DEFAULT_WINDOW_SIZE;
use crate::error::{AnalysisError, AnalysisResult};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub bands: BandsConfig,
    #[serde(default)]
    pub onset: OnsetConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub decoder: DecoderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    #[serde(default)]
    pub hop_rounding: HopRounding,
    #[serde(default = "default_median_kernel")]
    pub median_kernel: usize,
}

/// Band edges in Hz and perceptual weights, one entry per output band column.
#[derive(Debug, Clone, Deserialize)]
pub struct BandsConfig {
    #[serde(default = "default_edges")]
    pub edges: Vec<[f32; 2]>,
    #[serde(default = "default_weights")]
    pub weights: Vec<f32>,
}

/// Peak-picking windows are in seconds and converted to frames per run.
#[derive(Debug, Clone, Deserialize)]
pub struct OnsetConfig {
    #[serde(default = "default_pre_max")]
    pub pre_max: f32,
    #[serde(default)]
    pub post_max: f32,
    #[serde(default = "default_avg")]
    pub pre_avg: f32,
    #[serde(default = "default_avg")]
    pub post_avg: f32,
    #[serde(default = "default_wait")]
    pub wait: f32,
    #[serde(default = "default_delta")]
    pub delta: f32,
    #[serde(default = "default_top_db")]
    pub top_db: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_precision")]
    pub precision: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DecoderConfig {
    #[serde(default)]
    pub ffmpeg: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub ffmpeg_fallback: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            frame_rate: default_frame_rate(),
            window_size: default_window_size(),
            hop_rounding: HopRounding::default(),
            median_kernel: default_median_kernel(),
        }
    }
}

impl Default for BandsConfig {
    fn default() -> Self {
        Self {
            edges: default_edges(),
            weights: default_weights(),
        }
    }
}

impl Default for OnsetConfig {
    fn default() -> Self {
        Self {
            pre_max: default_pre_max(),
            post_max: 0.0,
            pre_avg: default_avg(),
            post_avg: default_avg(),
            wait: default_wait(),
            delta: default_delta(),
            top_db: default_top_db(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            precision: default_precision(),
        }
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg: None,
            ffmpeg_fallback: true,
        }
    }
}

fn default_frame_rate() -> u32 { 24 }
fn default_window_size() -> usize { DEFAULT_WINDOW_SIZE }
fn default_median_kernel() -> usize { 3 }
fn default_edges() -> Vec<[f32; 2]> {
    DEFAULT_BANDS.iter().map(|b| [b.low_hz, b.high_hz]).collect()
}
fn default_weights() -> Vec<f32> { DEFAULT_BANDS.iter().map(|b| b.weight).collect() }
fn default_pre_max() -> f32 { 0.03 }
fn default_avg() -> f32 { 0.10 }
fn default_wait() -> f32 { 0.03 }
fn default_delta() -> f32 { 0.07 }
fn default_top_db() -> f32 { 80.0 }
fn default_precision() -> usize { 6 }
fn default_true() -> bool { true }

impl BandsConfig {
    /// Resolve the configured edges and weights onto the fixed band names.
    pub fn layout(&self) -> AnalysisResult<[BandSpec; BAND_COUNT]> {
        if self.edges.len() != BAND_COUNT || self.weights.len() != BAND_COUNT {
            return Err(AnalysisError::Config(format!(
                "bands need exactly {} edges and {} weights (got {} and {})",
                BAND_COUNT,
                BAND_COUNT,
                self.edges.len(),
                self.weights.len()
            )));
        }

        let mut layout = DEFAULT_BANDS;
        for (i, band) in layout.iter_mut().enumerate() {
            let [low, high] = self.edges[i];
            let weight = self.weights[i];
            if !(low.is_finite() && high.is_finite() && low >= 0.0 && low < high) {
                return Err(AnalysisError::Config(format!(
                    "band '{}' has invalid edges [{}, {})",
                    band.name, low, high
                )));
            }
            if !(weight.is_finite() && weight >= 0.0) {
                return Err(AnalysisError::Config(format!(
                    "band '{}' has invalid weight {}",
                    band.name, weight
                )));
            }
            band.low_hz = low;
            band.high_hz = high;
            band.weight = weight;
        }
        Ok(layout)
    }
}

impl Config {
    pub fn validate(&self) -> AnalysisResult<()> {
        let window = self.analysis.window_size;
        if window < 16 || window % 2 != 0 {
            return Err(AnalysisError::Config(format!(
                "window_size must be an even number >= 16, got {}",
                window
            )));
        }
        let kernel = self.analysis.median_kernel;
        if kernel == 0 || kernel % 2 == 0 {
            return Err(AnalysisError::Config(format!(
                "median_kernel must be odd and positive, got {}",
                kernel
            )));
        }
        if self.output.precision > 9 {
            return Err(AnalysisError::Config(format!(
                "output precision must be at most 9 decimals, got {}",
                self.output.precision
            )));
        }
        let onset = &self.onset;
        let windows = [onset.pre_max, onset.post_max, onset.pre_avg, onset.post_avg, onset.wait];
        if windows.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(AnalysisError::Config(
                "onset windows must be non-negative seconds".into(),
            ));
        }
        if !onset.delta.is_finite() || !(onset.top_db.is_finite() && onset.top_db > 0.0) {
            return Err(AnalysisError::Config(
                "onset delta must be finite and top_db positive".into(),
            ));
        }
        self.bands.layout().map(|_| ())
    }
}

pub fn load_config(path: &Path) -> AnalysisResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        AnalysisError::Config(format!("cannot read {}: {}", path.display(), e))
    })?;
    let config: Config = toml::from_str(&content).map_err(|e| {
        AnalysisError::Config(format!("cannot parse {}: {}", path.display(), e))
    })?;
    config.validate()?;
    Ok(config)
}

/// Explicit path first, then `pulsetrack.toml` in the working directory,
/// then the per-user config locations.
pub fn discover_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("pulsetrack.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("pulsetrack").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("pulsetrack").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}
