use std::path::PathBuf;
use thiserror::Error;

pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Failed to decode {}: {failure}", path.display())]
    Decode {
        path: PathBuf,
        failure: DecodeFailure,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The transform produced fewer frames than the output grid needs.
    #[error("Transform yielded {available} frames but the track needs {required}")]
    Consistency { required: usize, available: usize },

    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum DecodeFailure {
    #[error("file not found")]
    NotFound,

    #[error("file could not be read ({0})")]
    Unreadable(std::io::Error),

    #[error("unsupported or corrupt audio ({0})")]
    Unsupported(String),

    #[error("decoded stream contains no samples")]
    Empty,

    #[error("no usable fallback decoder ({0})")]
    DecoderUnavailable(String),
}

impl AnalysisError {
    pub fn decode(path: impl Into<PathBuf>, failure: DecodeFailure) -> Self {
        Self::Decode {
            path: path.into(),
            failure,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit status for this kind of failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Decode { .. } => 3,
            Self::Config(_) => 4,
            Self::Consistency { .. } => 5,
            Self::Io { .. } => 6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_path() {
        let err = AnalysisError::decode("songs/missing.wav", DecodeFailure::NotFound);
        assert_eq!(err.to_string(), "Failed to decode songs/missing.wav: file not found");
    }

    #[test]
    fn exit_codes_are_distinct_and_nonzero() {
        let errors = [
            AnalysisError::decode("a", DecodeFailure::Empty),
            AnalysisError::Config("bad".into()),
            AnalysisError::Consistency { required: 2, available: 1 },
            AnalysisError::io("b", std::io::Error::other("disk full")),
        ];
        let mut codes: Vec<u8> = errors.iter().map(|e| e.exit_code()).collect();
        assert!(codes.iter().all(|&c| c != 0 && c != 1 && c != 2));
        codes.dedup();
        assert_eq!(codes.len(), 4);
    }
}
