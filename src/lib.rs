//! Real-time binaural beat rendering.
//!
//! A [`BinauralEngine`] renders one or two stereo oscillator bands with
//! optional isochronic pulsing and a right-channel interleave delay. A
//! [`NoiseEngine`] renders a noise bed next to it. Both are driven through
//! lock-free control channels and owned by an [`AudioSession`], which the
//! audio callback pumps one block at a time.

pub mod band;
pub mod command;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod models;
pub mod session;
pub mod streaming_noise;

#[cfg(not(target_arch = "wasm32"))]
pub mod audio_io;

pub use config::BackendConfig;
pub use engine::{BinauralEngine, EngineSettings, MAX_BANDS};
pub use error::{EngineError, Result};
pub use models::{NoiseColor, NoiseUpdate, ParamUpdate, SessionScript};
pub use session::{AudioSession, SessionHandle, SharedHandle, Voice};
pub use streaming_noise::NoiseEngine;
