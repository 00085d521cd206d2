use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::audio::features::{FeatureFrame, FeatureTrack, HEADER};
use crate::error::{AnalysisError, AnalysisResult};

/// `<input stem>.csv` in the working directory.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .filter(|s| !s.is_empty())
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| "track".into());
    let mut name = stem;
    name.push(".csv");
    PathBuf::from(name)
}

/// Write the header and one row per frame.
pub fn write_rows<W: Write>(
    track: &FeatureTrack,
    out: &mut W,
    precision: usize,
) -> std::io::Result<()> {
    writeln!(out, "{}", HEADER)?;
    for frame in &track.frames {
        write_row(frame, out, precision)?;
    }
    Ok(())
}

fn write_row<W: Write>(
    frame: &FeatureFrame,
    out: &mut W,
    precision: usize,
) -> std::io::Result<()> {
    write!(out, "{}", fixed(frame.loudness, precision))?;
    for &band in &frame.bands {
        write!(out, ",{}", fixed(band, precision))?;
    }
    writeln!(out, ",{}", u8::from(frame.pulse))
}

/// Plain decimal, never exponent notation; negative zero prints as zero.
fn fixed(value: f32, precision: usize) -> String {
    let value = if value == 0.0 { 0.0 } else { value };
    format!("{:.*}", precision, value)
}

/// Write `track` to `path` through a temporary sibling file, so the
/// destination either holds the complete table or is left untouched.
pub fn write_track(track: &FeatureTrack, path: &Path, precision: usize) -> AnalysisResult<PathBuf> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(|e| AnalysisError::io(&parent, e))?;

    let file_name = path
        .file_name()
        .ok_or_else(|| {
            AnalysisError::io(
                path,
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "output path has no file name",
                ),
            )
        })?
        .to_string_lossy()
        .into_owned();
    let temp = parent.join(format!(".{}.{}.tmp", file_name, std::process::id()));

    let result = write_temp(track, &temp, precision).and_then(|()| std::fs::rename(&temp, path));
    if let Err(err) = result {
        let _ = std::fs::remove_file(&temp);
        return Err(AnalysisError::io(path, err));
    }

    log::info!("Wrote {} rows to {}", track.len(), path.display());
    Ok(path.to_path_buf())
}

fn write_temp(track: &FeatureTrack, temp: &Path, precision: usize) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(temp)?);
    write_rows(track, &mut writer, precision)?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::features::BAND_COUNT;

    fn track() -> FeatureTrack {
        FeatureTrack {
            frame_rate: 24,
            frames: vec![
                FeatureFrame {
                    index: 0,
                    loudness: 0.812345,
                    bands: [0.221, 1.0, 0.0, 0.5, 0.25, 0.126, 0.0000001],
                    pulse: false,
                },
                FeatureFrame {
                    index: 1,
                    loudness: 1.0,
                    bands: [-0.0; BAND_COUNT],
                    pulse: true,
                },
            ],
        }
    }

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("pulsetrack-csv-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn formats_rows() {
        let mut out = Vec::new();
        write_rows(&track(), &mut out, 6).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], HEADER);
        assert_eq!(
            lines[1],
            "0.812345,0.221000,1.000000,0.000000,0.500000,0.250000,0.126000,0.000000,0"
        );
        assert_eq!(
            lines[2],
            "1.000000,0.000000,0.000000,0.000000,0.000000,0.000000,0.000000,0.000000,1"
        );
        assert!(text.ends_with('\n'));
        assert!(!text.contains('e'));
    }

    #[test]
    fn precision_is_configurable() {
        let mut out = Vec::new();
        write_rows(&track(), &mut out, 2).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().nth(1).unwrap(), "0.81,0.22,1.00,0.00,0.50,0.25,0.13,0.00,0");
    }

    #[test]
    fn empty_track_is_header_only() {
        let empty = FeatureTrack {
            frame_rate: 24,
            frames: Vec::new(),
        };
        let mut out = Vec::new();
        write_rows(&empty, &mut out, 6).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), format!("{}\n", HEADER));
    }

    #[test]
    fn creates_parent_directories() {
        let dir = scratch("parents");
        let path = dir.join("nested").join("deeper").join("song.csv");
        let written = write_track(&track(), &path, 6).unwrap();
        assert_eq!(written, path);
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);

        // no temporary file is left behind
        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers.len(), 1);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn replaces_existing_file() {
        let dir = scratch("replace");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("song.csv");
        std::fs::write(&path, "stale\n").unwrap();
        write_track(&track(), &path, 6).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().starts_with(HEADER));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn unwritable_destination_is_io_error() {
        let dir = scratch("unwritable");
        // a directory where the file should go
        let path = dir.join("occupied");
        std::fs::create_dir_all(path.join("child")).unwrap();

        let err = write_track(&track(), &path, 6).unwrap_err();
        assert!(matches!(err, AnalysisError::Io { .. }));
        assert!(path.join("child").is_dir());
        let entries = std::fs::read_dir(&dir).unwrap().count();
        assert_eq!(entries, 1, "temporary file was not cleaned up");
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn default_path_uses_stem() {
        assert_eq!(default_output_path(Path::new("/music/song.mp3")), PathBuf::from("song.csv"));
        assert_eq!(default_output_path(Path::new("take.2.wav")), PathBuf::from("take.2.csv"));
        assert_eq!(default_output_path(Path::new("/")), PathBuf::from("track.csv"));
    }
}
