pub const BAND_COUNT: usize = 7;

/// Band column names, lowest band first.
pub const BAND_NAMES: [&str; BAND_COUNT] = [
    "sub_bass",
    "bass",
    "low_mid",
    "mid",
    "high_mid",
    "presence",
    "brilliance",
];

pub const HEADER: &str = "loudness,sub_bass,bass,low_mid,mid,high_mid,presence,brilliance,pulse";

/// One row of the control track.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureFrame {
    pub index: usize,
    /// RMS energy, normalized and smoothed (0.0-1.0)
    pub loudness: f32,
    /// Weighted, normalized, smoothed band energies (0.0-1.0)
    pub bands: [f32; BAND_COUNT],
    /// Onset detected at this frame
    pub pulse: bool,
}

/// Complete per-frame feature table for one input.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureTrack {
    pub frame_rate: u32,
    pub frames: Vec<FeatureFrame>,
}

impl FeatureTrack {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn pulse_count(&self) -> usize {
        self.frames.iter().filter(|f| f.pulse).count()
    }
}
