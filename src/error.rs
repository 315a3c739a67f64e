use thiserror::Error;

use crate::engine::MAX_BANDS;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("sample rate must be non-zero")]
    ZeroSampleRate,
    #[error("band count {0} outside 1..={max}", max = MAX_BANDS)]
    BandCount(usize),
    #[error("wavetable size {0} is too small (need at least 4)")]
    TableSize(usize),
    #[error("control queue is full, update dropped")]
    QueueFull,
    #[error("invalid config: {0}")]
    Config(String),
    #[error("audio device: {0}")]
    Device(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
