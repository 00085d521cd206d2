pub mod analysis;
pub mod bands;
pub mod decode;
pub mod dsp;
pub mod features;
pub mod ffmpeg;
pub mod grid;
pub mod onset;
pub mod stft;
