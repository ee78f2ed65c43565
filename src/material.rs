//! Surface materials and their synthesis tables.
//!
//! The material set is closed: seven variants selected with keys `1`–`7`.
//! Everything that makes one material sound different from another lives in
//! its [`MaterialProfile`]; the synthesizer reads the table and never branches
//! on the variant.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of overtone weights per profile, covering harmonics 2 through 7.
pub const HARMONIC_COUNT: usize = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Material {
    Glass,
    Metal,
    Wood,
    Plastic,
    Fabric,
    Ceramic,
    Rubber,
}

impl Material {
    pub const ALL: [Material; 7] = [
        Material::Glass,
        Material::Metal,
        Material::Wood,
        Material::Plastic,
        Material::Fabric,
        Material::Ceramic,
        Material::Rubber,
    ];

    /// Maps the 1-based keyboard selector to a material.
    pub fn from_selector(selector: u8) -> Option<Self> {
        match selector {
            1..=7 => Some(Self::ALL[usize::from(selector) - 1]),
            _ => None,
        }
    }

    pub fn selector(self) -> u8 {
        self.index() as u8 + 1
    }

    pub fn index(self) -> usize {
        match self {
            Self::Glass => 0,
            Self::Metal => 1,
            Self::Wood => 2,
            Self::Plastic => 3,
            Self::Fabric => 4,
            Self::Ceramic => 5,
            Self::Rubber => 6,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Glass => "Glass",
            Self::Metal => "Metal",
            Self::Wood => "Wood",
            Self::Plastic => "Plastic",
            Self::Fabric => "Fabric",
            Self::Ceramic => "Ceramic",
            Self::Rubber => "Rubber",
        }
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Texture term added on top of the harmonic stack.
///
/// `mod_level * sin(mod_ratio * w * t) * (1 + mod_depth * sin(2 pi mod_rate_hz t))`
/// plus `noise_level` of one-pole smoothed noise.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextureParams {
    pub mod_level: f32,
    pub mod_ratio: f32,
    pub mod_depth: f32,
    pub mod_rate_hz: f32,
    pub noise_level: f32,
    /// Weight of the previous noise sample, in `[0, 1)`.
    pub noise_smoothing: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialProfile {
    /// Scales the motion current and the texture term, in `[0, 1]`.
    pub roughness: f32,
    /// Multiplier on the configured texture base frequency.
    pub freq_factor: f32,
    pub fundamental: f32,
    /// Weights for harmonics 2..=7.
    pub harmonics: [f32; HARMONIC_COUNT],
    pub attack_ms: f32,
    pub release_ms: f32,
    pub texture: TextureParams,
    /// Moving-average kernel width; 1 disables smoothing.
    pub smoothing: usize,
    pub lowpass_hz: f32,
}

impl MaterialProfile {
    pub fn builtin(material: Material) -> Self {
        match material {
            // Near-pure tone, heavily smoothed.
            Material::Glass => Self {
                roughness: 0.05,
                freq_factor: 1.6,
                fundamental: 0.85,
                harmonics: [0.03, 0.006, 0.0, 0.0, 0.0, 0.0],
                attack_ms: 1.0,
                release_ms: 10.0,
                texture: TextureParams {
                    mod_level: 0.001,
                    mod_ratio: 8.0,
                    mod_depth: 0.1,
                    mod_rate_hz: 2.0,
                    noise_level: 0.0,
                    noise_smoothing: 0.0,
                },
                smoothing: 15,
                lowpass_hz: 2_000.0,
            },
            Material::Metal => Self {
                roughness: 0.65,
                freq_factor: 1.0,
                fundamental: 0.7,
                harmonics: [0.55, 0.33, 0.0, 0.176, 0.0, 0.11],
                attack_ms: 1.0,
                release_ms: 10.0,
                texture: TextureParams {
                    mod_level: 0.03,
                    mod_ratio: 1.3,
                    mod_depth: 0.3,
                    mod_rate_hz: 4.0,
                    noise_level: 0.0,
                    noise_smoothing: 0.0,
                },
                smoothing: 5,
                lowpass_hz: 8_000.0,
            },
            Material::Wood => Self {
                roughness: 0.9,
                freq_factor: 0.8,
                fundamental: 0.65,
                harmonics: [0.375, 0.2, 0.0, 0.0, 0.0, 0.0],
                attack_ms: 3.0,
                release_ms: 10.0,
                texture: TextureParams {
                    mod_level: 0.04,
                    mod_ratio: 0.3,
                    mod_depth: 0.5,
                    mod_rate_hz: 0.8,
                    noise_level: 0.08,
                    noise_smoothing: 0.4,
                },
                smoothing: 8,
                lowpass_hz: 3_000.0,
            },
            Material::Plastic => Self {
                roughness: 0.3,
                freq_factor: 1.1,
                fundamental: 0.78,
                harmonics: [0.0405, 0.0, 0.015, 0.0, 0.0, 0.0],
                attack_ms: 1.0,
                release_ms: 10.0,
                texture: TextureParams {
                    mod_level: 0.0008,
                    mod_ratio: 6.0,
                    mod_depth: 0.0,
                    mod_rate_hz: 0.0,
                    noise_level: 0.0,
                    noise_smoothing: 0.0,
                },
                smoothing: 12,
                lowpass_hz: 4_000.0,
            },
            // Noise dominated, slow attack.
            Material::Fabric => Self {
                roughness: 0.02,
                freq_factor: 0.6,
                fundamental: 0.4,
                harmonics: [0.0; HARMONIC_COUNT],
                attack_ms: 15.0,
                release_ms: 15.0,
                texture: TextureParams {
                    mod_level: 0.1,
                    mod_ratio: 0.1,
                    mod_depth: 0.2,
                    mod_rate_hz: 3.0,
                    noise_level: 0.5,
                    noise_smoothing: 0.8,
                },
                smoothing: 1,
                lowpass_hz: 1_500.0,
            },
            Material::Ceramic => Self {
                roughness: 0.55,
                freq_factor: 1.3,
                fundamental: 0.7,
                harmonics: [0.54, 0.36, 0.18, 0.0, 0.0, 0.0],
                attack_ms: 2.0,
                release_ms: 10.0,
                texture: TextureParams {
                    mod_level: 0.0,
                    mod_ratio: 1.0,
                    mod_depth: 0.0,
                    mod_rate_hz: 0.0,
                    noise_level: 0.0,
                    noise_smoothing: 0.0,
                },
                smoothing: 1,
                lowpass_hz: 6_000.0,
            },
            Material::Rubber => Self {
                roughness: 0.4,
                freq_factor: 0.7,
                fundamental: 0.8,
                harmonics: [0.4, 0.0, 0.0, 0.0, 0.0, 0.0],
                attack_ms: 5.0,
                release_ms: 20.0,
                texture: TextureParams {
                    mod_level: 0.16,
                    mod_ratio: 1.0,
                    mod_depth: 0.2,
                    mod_rate_hz: 3.0,
                    noise_level: 0.0,
                    noise_smoothing: 0.0,
                },
                smoothing: 1,
                lowpass_hz: 2_500.0,
            },
        }
    }
}

/// One profile per material, deserializable as `[materials.<name>]` tables.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialTable {
    pub glass: MaterialProfile,
    pub metal: MaterialProfile,
    pub wood: MaterialProfile,
    pub plastic: MaterialProfile,
    pub fabric: MaterialProfile,
    pub ceramic: MaterialProfile,
    pub rubber: MaterialProfile,
}

impl MaterialTable {
    pub fn get(&self, material: Material) -> &MaterialProfile {
        match material {
            Material::Glass => &self.glass,
            Material::Metal => &self.metal,
            Material::Wood => &self.wood,
            Material::Plastic => &self.plastic,
            Material::Fabric => &self.fabric,
            Material::Ceramic => &self.ceramic,
            Material::Rubber => &self.rubber,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Material, &MaterialProfile)> + '_ {
        Material::ALL.into_iter().map(move |material| (material, self.get(material)))
    }
}

impl Default for MaterialTable {
    fn default() -> Self {
        Self {
            glass: MaterialProfile::builtin(Material::Glass),
            metal: MaterialProfile::builtin(Material::Metal),
            wood: MaterialProfile::builtin(Material::Wood),
            plastic: MaterialProfile::builtin(Material::Plastic),
            fabric: MaterialProfile::builtin(Material::Fabric),
            ceramic: MaterialProfile::builtin(Material::Ceramic),
            rubber: MaterialProfile::builtin(Material::Rubber),
        }
    }
}
