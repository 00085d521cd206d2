use std::path::Path;
use symphonia::core::audio::SampleBuffer as InterleavedBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::ffmpeg::FfmpegDecoder;
use crate::config::DecoderConfig;
use crate::error::{AnalysisError, AnalysisResult, DecodeFailure};

/// Mono samples at the file's native rate.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl SampleBuffer {
    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

pub fn decode_audio(path: &Path, config: &DecoderConfig) -> AnalysisResult<SampleBuffer> {
    if !path.is_file() {
        return Err(AnalysisError::decode(path, DecodeFailure::NotFound));
    }

    let failure = match decode_native(path) {
        Ok(buffer) => return Ok(buffer),
        Err(DecodeFailure::Unsupported(reason)) if config.ffmpeg_fallback => {
            log::warn!("Native decoder rejected {}: {}", path.display(), reason);
            match decode_via_ffmpeg(path, config) {
                Ok(buffer) => return Ok(buffer),
                Err(fallback) => fallback,
            }
        }
        Err(failure) => failure,
    };
    Err(AnalysisError::decode(path, failure))
}

fn decode_via_ffmpeg(path: &Path, config: &DecoderConfig) -> Result<SampleBuffer, DecodeFailure> {
    let ffmpeg = FfmpegDecoder::locate(config).map_err(DecodeFailure::DecoderUnavailable)?;
    log::info!("Retrying with {}", ffmpeg.binary().display());
    let wav = ffmpeg.transcode_to_wav(path).map_err(DecodeFailure::Unsupported)?;
    decode_native(wav.path())
}

/// Decode the first audio track with symphonia, downmixing to mono.
pub fn decode_native(path: &Path) -> Result<SampleBuffer, DecodeFailure> {
    let file = std::fs::File::open(path).map_err(DecodeFailure::Unreadable)?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| DecodeFailure::Unsupported(format!("probe failed: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| DecodeFailure::Unsupported("no audio tracks found".into()))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .filter(|&sr| sr > 0)
        .ok_or_else(|| DecodeFailure::Unsupported("unknown sample rate".into()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| DecodeFailure::Unsupported(format!("no decoder: {}", e)))?;

    let mut all_samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(DecodeFailure::Unsupported(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(msg)) => {
                log::debug!("Skipping corrupt packet: {}", msg);
                continue;
            }
            Err(e) => return Err(DecodeFailure::Unsupported(e.to_string())),
        };

        // Channel layout comes from the decoded buffer; some demuxers leave
        // it out of the track parameters.
        let spec = *decoded.spec();
        let num_frames = decoded.frames();

        let mut sample_buf = InterleavedBuffer::<f32>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        downmix_into(sample_buf.samples(), spec.channels.count(), &mut all_samples);
    }

    if all_samples.is_empty() {
        return Err(DecodeFailure::Empty);
    }

    let mut replaced = 0usize;
    for s in all_samples.iter_mut().filter(|s| !s.is_finite()) {
        *s = 0.0;
        replaced += 1;
    }
    if replaced > 0 {
        log::warn!("Replaced {} non-finite samples with silence", replaced);
    }

    log::info!(
        "Decoded audio: {} samples, {}Hz, {:.1}s",
        all_samples.len(),
        sample_rate,
        all_samples.len() as f32 / sample_rate as f32
    );

    Ok(SampleBuffer {
        samples: all_samples,
        sample_rate,
    })
}

/// Average interleaved frames of `channels` samples onto `out`.
fn downmix_into(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    match channels {
        0 | 1 => out.extend_from_slice(interleaved),
        _ => out.extend(
            interleaved
                .chunks(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32),
        ),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::PathBuf;

    pub(crate) fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "pulsetrack-{}-{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    pub(crate) fn write_wav(path: &Path, sample_rate: u32, channels: u16, samples: &[f32]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer
                .write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                .unwrap();
        }
        writer.finalize().unwrap();
    }

    fn no_fallback() -> DecoderConfig {
        DecoderConfig {
            ffmpeg: None,
            ffmpeg_fallback: false,
        }
    }

    #[test]
    fn decodes_mono_wav() {
        let dir = scratch_dir("decode-mono");
        let path = dir.join("tone.wav");
        let samples: Vec<f32> = (0..8000).map(|i| if i % 2 == 0 { 0.5 } else { -0.5 }).collect();
        write_wav(&path, 8000, 1, &samples);

        let buffer = decode_audio(&path, &no_fallback()).unwrap();
        assert_eq!(buffer.sample_rate, 8000);
        assert_eq!(buffer.samples.len(), 8000);
        assert!((buffer.duration_secs() - 1.0).abs() < 1e-6);
        assert!((buffer.samples[0] - 0.5).abs() < 1e-3);
        assert!((buffer.samples[1] + 0.5).abs() < 1e-3);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn downmixes_stereo() {
        let dir = scratch_dir("decode-stereo");
        let path = dir.join("stereo.wav");
        // left 0.5, right -0.5 cancels; left 0.5, right 0.5 stays
        let samples = [0.5, -0.5, 0.5, 0.5];
        write_wav(&path, 16_000, 2, &samples);

        let buffer = decode_audio(&path, &no_fallback()).unwrap();
        assert_eq!(buffer.samples.len(), 2);
        assert!(buffer.samples[0].abs() < 1e-3);
        assert!((buffer.samples[1] - 0.5).abs() < 1e-3);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn downmix_follows_buffer_channel_count() {
        let mut out = Vec::new();
        downmix_into(&[0.5, -0.5, 0.5, 0.5], 2, &mut out);
        assert_eq!(out, vec![0.0, 0.5]);

        // a later packet with a different layout appends at its own width
        downmix_into(&[0.3, 0.3, 0.3], 3, &mut out);
        downmix_into(&[0.1, 0.2], 1, &mut out);
        assert_eq!(out.len(), 5);
        assert!((out[2] - 0.3).abs() < 1e-6);
        assert_eq!(&out[3..], &[0.1, 0.2]);
    }

    #[test]
    fn stereo_frame_count_matches_duration() {
        let dir = scratch_dir("decode-stereo-length");
        let path = dir.join("stereo.wav");
        let samples: Vec<f32> = (0..2 * 22_050).map(|i| (i % 7) as f32 * 0.1).collect();
        write_wav(&path, 22_050, 2, &samples);

        let buffer = decode_audio(&path, &no_fallback()).unwrap();
        assert_eq!(buffer.samples.len(), 22_050);
        assert!((buffer.duration_secs() - 1.0).abs() < 1e-6);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = decode_audio(Path::new("/no/such/file.wav"), &no_fallback()).unwrap_err();
        match err {
            AnalysisError::Decode { path, failure } => {
                assert_eq!(path, PathBuf::from("/no/such/file.wav"));
                assert!(matches!(failure, DecodeFailure::NotFound));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn garbage_is_unsupported_without_fallback() {
        let dir = scratch_dir("decode-garbage");
        let path = dir.join("noise.bin");
        std::fs::write(&path, b"definitely not audio data").unwrap();

        let err = decode_audio(&path, &no_fallback()).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Decode {
                failure: DecodeFailure::Unsupported(_),
                ..
            }
        ));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_fallback_binary_is_typed() {
        let dir = scratch_dir("decode-nobinary");
        let path = dir.join("noise.bin");
        std::fs::write(&path, b"definitely not audio data").unwrap();
        let config = DecoderConfig {
            ffmpeg: Some(dir.join("not-an-ffmpeg")),
            ffmpeg_fallback: true,
        };

        let err = decode_audio(&path, &config).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Decode {
                failure: DecodeFailure::DecoderUnavailable(_),
                ..
            }
        ));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn empty_wav_is_rejected() {
        let dir = scratch_dir("decode-empty");
        let path = dir.join("empty.wav");
        write_wav(&path, 44_100, 1, &[]);

        // Some demuxers refuse a data chunk of length zero outright.
        let err = decode_audio(&path, &no_fallback()).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Decode {
                failure: DecodeFailure::Empty | DecodeFailure::Unsupported(_),
                ..
            }
        ));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
