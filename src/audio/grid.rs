use serde::Deserialize;

use crate::error::{AnalysisError, AnalysisResult};

/// Highest frame rate hosts are expected to ask for.
pub const HOST_MAX_FRAME_RATE: u32 = 240;

/// How `sample_rate / frame_rate` is turned into a whole hop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum HopRounding {
    /// Truncate. The hop never exceeds the exact frame period, so the
    /// transform always covers every output frame.
    #[default]
    Floor,
    /// Nearest integer, halves away from zero. When this rounds up, long
    /// clips can fall a frame short of the grid.
    Nearest,
}

/// Fixed analysis grid shared by the transform and the output track.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnalysisGrid {
    pub hop_length: usize,
    pub total_frames: usize,
    pub frame_rate: u32,
}

pub fn validate_frame_rate(requested: i64) -> AnalysisResult<u32> {
    if requested <= 0 {
        return Err(AnalysisError::Config(format!(
            "frame rate must be a positive integer, got {}",
            requested
        )));
    }
    let fps = u32::try_from(requested)
        .map_err(|_| AnalysisError::Config(format!("frame rate {} is out of range", requested)))?;
    if fps > HOST_MAX_FRAME_RATE {
        log::warn!(
            "Frame rate {} is above the usual host limit of {}",
            fps,
            HOST_MAX_FRAME_RATE
        );
    }
    Ok(fps)
}

impl AnalysisGrid {
    pub fn plan(
        sample_rate: u32,
        sample_count: usize,
        frame_rate: u32,
        rounding: HopRounding,
    ) -> AnalysisResult<Self> {
        if sample_rate == 0 {
            return Err(AnalysisError::Config("sample rate must be positive".into()));
        }
        if frame_rate == 0 {
            return Err(AnalysisError::Config("frame rate must be positive".into()));
        }

        let period = sample_rate as f64 / frame_rate as f64;
        let hop_length = match rounding {
            HopRounding::Nearest => period.round(),
            HopRounding::Floor => period.floor(),
        } as usize;
        if hop_length == 0 {
            return Err(AnalysisError::Config(format!(
                "frame rate {} exceeds sample rate {}; hop would be zero samples",
                frame_rate, sample_rate
            )));
        }

        // floor(duration * fps) without going through a float duration
        let total_frames = (sample_count as u64 * frame_rate as u64 / sample_rate as u64) as usize;
        if total_frames == 0 {
            log::debug!(
                "Input is shorter than one frame at {}fps ({} samples); track will be empty",
                frame_rate,
                sample_count
            );
        }

        Ok(Self {
            hop_length,
            total_frames,
            frame_rate,
        })
    }

    pub fn duration_secs(&self) -> f32 {
        self.total_frames as f32 / self.frame_rate as f32
    }
}
