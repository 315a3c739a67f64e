use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// Sparse parameter record for the binaural engine. Every field is optional;
/// absent fields leave the engine's current target untouched.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq)]
#[serde(default)]
pub struct ParamUpdate {
    #[serde(rename = "freq1L", skip_serializing_if = "Option::is_none")]
    pub freq1_left: Option<f32>,
    #[serde(rename = "freq1R", skip_serializing_if = "Option::is_none")]
    pub freq1_right: Option<f32>,
    #[serde(rename = "freq2L", skip_serializing_if = "Option::is_none")]
    pub freq2_left: Option<f32>,
    #[serde(rename = "freq2R", skip_serializing_if = "Option::is_none")]
    pub freq2_right: Option<f32>,
    #[serde(rename = "band2Enabled", skip_serializing_if = "Option::is_none")]
    pub band2_enabled: Option<bool>,
    #[serde(rename = "band2Mix", skip_serializing_if = "Option::is_none")]
    pub band2_mix: Option<f32>,
    #[serde(rename = "isoEnabled", skip_serializing_if = "Option::is_none")]
    pub iso_enabled: Option<bool>,
    #[serde(rename = "interleaveMs", skip_serializing_if = "Option::is_none")]
    pub interleave_ms: Option<f32>,
    #[serde(rename = "freqSmooth", skip_serializing_if = "Option::is_none")]
    pub freq_smooth: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gain: Option<f32>,
    #[serde(rename = "gainSmooth", skip_serializing_if = "Option::is_none")]
    pub gain_smooth: Option<f32>,
}

impl ParamUpdate {
    pub fn from_json(data: &str) -> Result<Self> {
        Ok(serde_json::from_str(data)?)
    }

    /// Left/right frequency targets addressed to band `index`.
    pub fn band_freqs(&self, index: usize) -> (Option<f32>, Option<f32>) {
        match index {
            0 => (self.freq1_left, self.freq1_right),
            1 => (self.freq2_left, self.freq2_right),
            _ => (None, None),
        }
    }

    pub fn gain_ramp(gain: f32, seconds: f32) -> Self {
        Self {
            gain: Some(gain),
            gain_smooth: Some(seconds),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoiseColor {
    #[default]
    White,
    Pink,
    Brown,
}

/// Sparse parameter record for the noise companion.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq)]
#[serde(default)]
pub struct NoiseUpdate {
    #[serde(alias = "amp", skip_serializing_if = "Option::is_none")]
    pub gain: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smooth: Option<f32>,
    #[serde(alias = "type", skip_serializing_if = "Option::is_none")]
    pub color: Option<NoiseColor>,
}

impl NoiseUpdate {
    pub fn from_json(data: &str) -> Result<Self> {
        Ok(serde_json::from_str(data)?)
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ScriptEvent {
    #[serde(alias = "time", alias = "atSeconds")]
    pub at: f64,
    #[serde(default)]
    pub params: Option<ParamUpdate>,
    #[serde(default)]
    pub noise: Option<NoiseUpdate>,
}

/// Timed list of updates played by the CLI. The engine itself never sees
/// the timeline, only the updates as they are posted.
#[derive(Deserialize, Debug, Clone)]
pub struct SessionScript {
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub events: Vec<ScriptEvent>,
}

impl SessionScript {
    pub fn from_json(data: &str) -> Result<Self> {
        let mut script: Self = serde_json::from_str(data)?;
        script
            .events
            .sort_by(|a, b| a.at.partial_cmp(&b.at).unwrap_or(std::cmp::Ordering::Equal));
        Ok(script)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let txt = std::fs::read_to_string(path)?;
        Self::from_json(&txt)
    }

    /// Time of the last event, or the explicit duration when longer.
    pub fn total_seconds(&self) -> f64 {
        let last = self.events.last().map(|e| e.at).unwrap_or(0.0);
        self.duration.map_or(last, |d| d.max(last))
    }
}
