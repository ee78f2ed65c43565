//! Static pipeline configuration.
//!
//! A [`HapticConfig`] is built once (defaults or TOML) and handed to every
//! component at construction. Nothing reads configuration from global state.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::material::MaterialTable;

pub const SAMPLE_RATE: u32 = 44_100;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HapticConfig {
    /// Integrator timestep and tick period in milliseconds.
    pub tick_ms: f32,
    pub sample_rate: u32,
    pub history_capacity: usize,
    /// Publish a snapshot every N ticks.
    pub snapshot_interval: u64,
    pub neurons: NeuronConfig,
    pub adaptation: AdaptationConfig,
    pub encoder: EncoderConfig,
    pub pointer: PointerConfig,
    pub sound: SoundConfig,
    pub volume: VolumeConfig,
    pub materials: MaterialTable,
}

impl Default for HapticConfig {
    fn default() -> Self {
        Self {
            tick_ms: 1.0,
            sample_rate: SAMPLE_RATE,
            history_capacity: 500,
            snapshot_interval: 8,
            neurons: NeuronConfig::default(),
            adaptation: AdaptationConfig::default(),
            encoder: EncoderConfig::default(),
            pointer: PointerConfig::default(),
            sound: SoundConfig::default(),
            volume: VolumeConfig::default(),
            materials: MaterialTable::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct IzhikevichParams {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub v_init: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeuronConfig {
    pub sa: IzhikevichParams,
    pub ra_motion: IzhikevichParams,
    pub ra_click: IzhikevichParams,
}

impl Default for NeuronConfig {
    fn default() -> Self {
        Self {
            sa: IzhikevichParams {
                a: 0.05,
                b: 0.25,
                c: -65.0,
                d: 6.0,
                v_init: -70.0,
            },
            ra_motion: IzhikevichParams {
                a: 0.4,
                b: 0.25,
                c: -65.0,
                d: 1.5,
                v_init: -65.0,
            },
            ra_click: IzhikevichParams {
                a: 0.3,
                b: 0.25,
                c: -65.0,
                d: 6.0,
                v_init: -65.0,
            },
        }
    }
}

/// SA habituation. The decay law is a tuning knob, not a fitted model.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptationConfig {
    pub enabled: bool,
    /// Each SA spike divides `a` by this ratio.
    pub decay_ratio: f32,
    pub floor: f32,
}

impl Default for AdaptationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            decay_ratio: 1.05,
            floor: 0.01,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    pub click_magnitude: f32,
    pub motion_gain: f32,
    pub motion_clip: f32,
    pub click_gain: f32,
    pub click_clip: f32,
    pub click_hold_ticks: u32,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            click_magnitude: 12.0,
            motion_gain: 0.02,
            motion_clip: 30.0,
            click_gain: 100.0,
            click_clip: 40.0,
            click_hold_ticks: 3,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointerConfig {
    /// Speeds below this (px/s) read as stationary.
    pub min_speed: f32,
    pub max_speed: f32,
    /// Speed drops to zero after this long without movement.
    pub stop_after_ms: f32,
    /// Report zero speed while the button is up.
    pub require_contact: bool,
}

impl Default for PointerConfig {
    fn default() -> Self {
        Self {
            min_speed: 1.0,
            max_speed: 100_000.0,
            stop_after_ms: 20.0,
            require_contact: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundConfig {
    pub background_hz: f32,
    pub background_ms: f32,
    pub background_mod_hz: f32,
    pub background_mod_depth: f32,
    pub background_amp: f32,
    pub click_hz: f32,
    pub click_ms: f32,
    pub click_amp: f32,
    pub texture_base_hz: f32,
    pub texture_ms: f32,
    pub texture_amp: f32,
    /// Width of one speed bucket in px/s.
    pub speed_bucket_width: f32,
    pub speed_buckets: u8,
    /// Texture pitch rises by this fraction per speed bucket.
    pub pitch_per_bucket: f32,
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            background_hz: 50.0,
            background_ms: 200.0,
            background_mod_hz: 10.0,
            background_mod_depth: 0.35,
            background_amp: 0.8,
            click_hz: 25.0,
            click_ms: 60.0,
            click_amp: 1.0,
            texture_base_hz: 30.0,
            texture_ms: 500.0,
            texture_amp: 0.8,
            speed_bucket_width: 500.0,
            speed_buckets: 8,
            pitch_per_bucket: 0.05,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    pub background: f32,
    pub click: f32,
    pub master: f32,
    pub master_step: f32,
    pub rate_window_s: f32,
    pub rate_floor_hz: f32,
    pub rate_ceiling_hz: f32,
    pub texture_floor: f32,
    pub texture_ceiling: f32,
    pub smooth_factor: f32,
    /// Per-tick approach factor used while the texture volume is falling.
    pub release_factor: f32,
    pub snap_epsilon: f32,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            background: 0.3,
            click: 1.0,
            master: 0.8,
            master_step: 0.1,
            rate_window_s: 1.0,
            rate_floor_hz: 20.0,
            rate_ceiling_hz: 120.0,
            texture_floor: 0.5,
            texture_ceiling: 0.8,
            smooth_factor: 0.02,
            release_factor: 0.8,
            snap_epsilon: 0.005,
        }
    }
}

impl HapticConfig {
    /// Loads a TOML file; missing sections fall back to defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let nyquist = self.sample_rate as f32 / 2.0;

        check(self.tick_ms > 0.0 && self.tick_ms.is_finite(), "tick_ms", "must be positive")?;
        check(self.sample_rate > 0, "sample_rate", "must be positive")?;
        check(self.history_capacity > 0, "history_capacity", "must be positive")?;
        check(self.snapshot_interval > 0, "snapshot_interval", "must be positive")?;
        check(
            (40.0..=60.0).contains(&self.sound.background_hz),
            "sound.background_hz",
            "must lie in 40..=60 Hz",
        )?;
        check(
            (20.0..=30.0).contains(&self.sound.click_hz),
            "sound.click_hz",
            "must lie in 20..=30 Hz",
        )?;
        check(
            self.sound.texture_base_hz > 0.0 && self.sound.texture_base_hz < nyquist,
            "sound.texture_base_hz",
            "must lie inside the audio band",
        )?;
        check(
            self.sound.background_ms > 0.0 && self.sound.click_ms > 0.0 && self.sound.texture_ms > 0.0,
            "sound",
            "durations must be positive",
        )?;
        check(self.sound.speed_buckets > 0, "sound.speed_buckets", "must be positive")?;
        check(
            self.sound.speed_bucket_width > 0.0,
            "sound.speed_bucket_width",
            "must be positive",
        )?;
        check(
            self.volume.rate_ceiling_hz > self.volume.rate_floor_hz,
            "volume.rate_ceiling_hz",
            "must exceed rate_floor_hz",
        )?;
        check(self.volume.rate_window_s > 0.0, "volume.rate_window_s", "must be positive")?;
        check(
            self.volume.smooth_factor > 0.0 && self.volume.smooth_factor <= 1.0,
            "volume.smooth_factor",
            "must lie in (0, 1]",
        )?;
        check(
            self.volume.release_factor > 0.0 && self.volume.release_factor <= 1.0,
            "volume.release_factor",
            "must lie in (0, 1]",
        )?;
        check(
            self.adaptation.decay_ratio >= 1.0,
            "adaptation.decay_ratio",
            "must be at least 1",
        )?;

        for (material, profile) in self.materials.iter() {
            if !(0.0..=1.0).contains(&profile.roughness) {
                return Err(ConfigError::InvalidValue {
                    field: "materials.roughness",
                    reason: format!("{material} roughness {} outside [0, 1]", profile.roughness),
                });
            }
            if profile.freq_factor <= 0.0 || profile.lowpass_hz <= 0.0 || profile.smoothing == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "materials",
                    reason: format!("{material} needs positive freq_factor, lowpass_hz and smoothing"),
                });
            }
        }

        Ok(())
    }

    pub fn tick_seconds(&self) -> f32 {
        self.tick_ms / 1000.0
    }

    /// Converts a duration in milliseconds to a whole number of ticks, at least one.
    pub fn ms_to_ticks(&self, ms: f32) -> u64 {
        ((ms / self.tick_ms).round() as u64).max(1)
    }
}

fn check(ok: bool, field: &'static str, reason: &str) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field,
            reason: reason.to_owned(),
        })
    }
}
