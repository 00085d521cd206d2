use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::DecoderConfig;

pub const FFMPEG_ENV: &str = "PULSETRACK_FFMPEG";

static TEMP_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// External `ffmpeg` used when symphonia cannot read a file.
pub struct FfmpegDecoder {
    binary: PathBuf,
}

/// Transcoded WAV in the temp directory, removed on drop.
pub struct TempWav {
    path: PathBuf,
}

impl TempWav {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempWav {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            log::debug!("Could not remove {}: {}", self.path.display(), err);
        }
    }
}

impl FfmpegDecoder {
    /// The configured path, else `$PULSETRACK_FFMPEG`, else `ffmpeg` on PATH.
    /// Only the first source that is set is tried.
    pub fn locate(config: &DecoderConfig) -> Result<Self, String> {
        let (binary, source) = if let Some(ref path) = config.ffmpeg {
            (path.clone(), "config")
        } else if let Some(path) = std::env::var_os(FFMPEG_ENV).filter(|v| !v.is_empty()) {
            (PathBuf::from(path), FFMPEG_ENV)
        } else {
            (PathBuf::from("ffmpeg"), "PATH")
        };

        if !is_available(&binary) {
            return Err(format!(
                "ffmpeg not usable at '{}' (from {}). Install ffmpeg or set {}",
                binary.display(),
                source,
                FFMPEG_ENV
            ));
        }
        Ok(Self { binary })
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Transcode `input` to mono 32-bit float WAV at its native rate.
    pub fn transcode_to_wav(&self, input: &Path) -> Result<TempWav, String> {
        let output = temp_wav_path();
        let result = Command::new(&self.binary)
            .arg("-nostdin")
            .args(["-v", "error", "-y", "-i"])
            .arg(input)
            .args(["-vn", "-ac", "1", "-c:a", "pcm_f32le", "-f", "wav"])
            .arg(&output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| format!("failed to run {}: {}", self.binary.display(), e))?;

        let wav = TempWav { path: output };
        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(format!("ffmpeg exited with {}: {}", result.status, stderr.trim()));
        }

        log::debug!("ffmpeg transcoded {} to {}", input.display(), wav.path().display());
        Ok(wav)
    }
}

fn is_available(binary: &Path) -> bool {
    Command::new(binary)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

fn temp_wav_path() -> PathBuf {
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("pulsetrack-{}-{}.wav", std::process::id(), n))
}
