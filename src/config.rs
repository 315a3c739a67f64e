use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::command::{ControlLimits, VOLUME_CEILING};
use crate::engine::{EngineSettings, MAX_BANDS};
use crate::error::{EngineError, Result};

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct BackendConfig {
    /// Forced render rate; the output device's default rate when absent.
    pub sample_rate: Option<u32>,
    pub block_frames: usize,
    pub control_capacity: usize,
    pub max_volume: f32,
    pub band_count: usize,
    pub wavetable_size: usize,
    pub freq_smooth: f32,
    pub gain_smooth: f32,
    pub noise_smooth: f32,
    pub band_defaults: [[f32; 2]; MAX_BANDS],
}

impl Default for BackendConfig {
    fn default() -> Self {
        let engine = EngineSettings::default();
        Self {
            sample_rate: None,
            block_frames: 512,
            control_capacity: 64,
            max_volume: VOLUME_CEILING,
            band_count: engine.band_count,
            wavetable_size: engine.table_size,
            freq_smooth: engine.freq_smooth,
            gain_smooth: engine.gain_smooth,
            noise_smooth: 0.1,
            band_defaults: engine.band_defaults,
        }
    }
}

impl BackendConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let txt = std::fs::read_to_string(path)?;
        let cfg: Self = toml::from_str(&txt)?;
        cfg.validate()?;
        log::info!("loaded config from {}", path.display());
        Ok(cfg)
    }

    /// Load `path` when given and present, otherwise fall back to defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) if p.as_ref().exists() => Self::load(p),
            Some(p) => {
                log::warn!("config {} not found, using defaults", p.as_ref().display());
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    pub fn generate_default<P: AsRef<Path>>(path: P) -> Result<()> {
        let txt = toml::to_string_pretty(&Self::default())?;
        std::fs::write(path, txt)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == Some(0) {
            return Err(EngineError::ZeroSampleRate);
        }
        if self.band_count == 0 || self.band_count > MAX_BANDS {
            return Err(EngineError::BandCount(self.band_count));
        }
        if self.wavetable_size < 4 {
            return Err(EngineError::TableSize(self.wavetable_size));
        }
        if self.block_frames == 0 {
            return Err(EngineError::Config("block_frames must be at least 1".into()));
        }
        if self.control_capacity == 0 {
            return Err(EngineError::Config("control_capacity must be at least 1".into()));
        }
        if !(0.0..=VOLUME_CEILING).contains(&self.max_volume) {
            return Err(EngineError::Config(format!(
                "max_volume {} outside 0..={}",
                self.max_volume, VOLUME_CEILING
            )));
        }
        for (name, v) in [
            ("freq_smooth", self.freq_smooth),
            ("gain_smooth", self.gain_smooth),
            ("noise_smooth", self.noise_smooth),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(EngineError::Config(format!("{name} must be a non-negative number")));
            }
        }
        if self.band_defaults.iter().flatten().any(|f| !f.is_finite() || *f <= 0.0) {
            return Err(EngineError::Config("band_defaults must be positive frequencies".into()));
        }
        Ok(())
    }

    pub fn engine_settings(&self, sample_rate: u32) -> Result<EngineSettings> {
        if sample_rate == 0 {
            return Err(EngineError::ZeroSampleRate);
        }
        Ok(EngineSettings {
            sample_rate,
            band_count: self.band_count,
            table_size: self.wavetable_size,
            freq_smooth: self.freq_smooth,
            gain_smooth: self.gain_smooth,
            band_defaults: self.band_defaults,
        })
    }

    pub fn control_limits(&self, sample_rate: u32) -> ControlLimits {
        ControlLimits::new(sample_rate as f32, self.max_volume)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = BackendConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.max_volume, 0.8);
        assert_eq!(cfg.band_count, 2);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: BackendConfig = toml::from_str("sample_rate = 44100\nmax_volume = 0.5\n").unwrap();
        assert_eq!(cfg.sample_rate, Some(44_100));
        assert_eq!(cfg.max_volume, 0.5);
        assert_eq!(cfg.block_frames, 512);
        assert_eq!(cfg.band_defaults, BackendConfig::default().band_defaults);
    }

    #[test]
    fn generated_default_loads_back() {
        let path = std::env::temp_dir().join(format!("binaural_cfg_{}.toml", std::process::id()));
        BackendConfig::generate_default(&path).unwrap();
        let cfg = BackendConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(cfg.wavetable_size, 2048);
        assert_eq!(cfg.sample_rate, None);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = BackendConfig::load_or_default(Some("/definitely/not/here.toml")).unwrap();
        assert_eq!(cfg.control_capacity, 64);
        assert!(BackendConfig::load_or_default::<&str>(None).is_ok());
    }

    #[test]
    fn rejects_invalid_values() {
        let bad = [
            BackendConfig { sample_rate: Some(0), ..BackendConfig::default() },
            BackendConfig { band_count: 3, ..BackendConfig::default() },
            BackendConfig { wavetable_size: 2, ..BackendConfig::default() },
            BackendConfig { max_volume: 0.95, ..BackendConfig::default() },
            BackendConfig { gain_smooth: -1.0, ..BackendConfig::default() },
            BackendConfig { band_defaults: [[0.0, 10.0], [1.0, 2.0]], ..BackendConfig::default() },
        ];
        for cfg in bad {
            assert!(cfg.validate().is_err(), "{cfg:?}");
        }
    }

    #[test]
    fn engine_settings_reject_zero_rate() {
        assert!(matches!(
            BackendConfig::default().engine_settings(0),
            Err(EngineError::ZeroSampleRate)
        ));
    }
}
