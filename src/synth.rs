//! Offline waveform synthesis for the three sound kinds.
//!
//! Every function here is pure: the same key and configuration always give the
//! same samples. Noise comes from a xorshift generator seeded by the
//! [`SoundKey`], never from a global source.

use std::f32::consts::{PI, TAU};

use crate::config::SoundConfig;
use crate::material::{Material, MaterialProfile};

/// Harmonics at or above this fraction of the sample rate are left out.
const HARMONIC_CEILING: f32 = 0.45;
const BACKGROUND_SMOOTHING: [usize; 3] = [8, 6, 4];
const BACKGROUND_DRIVE: f32 = 1.6;
const CLICK_DECAY: f32 = 8.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SoundKind {
    Background,
    Click,
    Texture,
}

/// Cache key. Background and click are material independent and always
/// carry `material: None, bucket: 0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SoundKey {
    pub kind: SoundKind,
    pub material: Option<Material>,
    pub bucket: u8,
}

impl SoundKey {
    pub fn background() -> Self {
        Self {
            kind: SoundKind::Background,
            material: None,
            bucket: 0,
        }
    }

    pub fn click() -> Self {
        Self {
            kind: SoundKind::Click,
            material: None,
            bucket: 0,
        }
    }

    pub fn texture(material: Material, bucket: u8) -> Self {
        Self {
            kind: SoundKind::Texture,
            material: Some(material),
            bucket,
        }
    }

    pub fn seed(&self) -> u64 {
        let kind = self.kind as u64 + 1;
        let material = self.material.map_or(0, |m| m.index() as u64 + 1);
        let mixed = 0xA7F4_19B3_14C0_77E1 ^ (kind << 32) ^ (material << 16) ^ u64::from(self.bucket);
        // xorshift must never start from zero
        mixed.max(1)
    }
}

/// Maps a pointer speed (px/s) to a texture bucket in `0..speed_buckets`.
pub fn speed_bucket(speed: f32, sound: &SoundConfig) -> u8 {
    let last = sound.speed_buckets.saturating_sub(1);
    if speed.is_nan() || speed <= 0.0 {
        return 0;
    }
    let bucket = (speed / sound.speed_bucket_width).floor();
    if bucket >= f32::from(last) {
        last
    } else {
        bucket as u8
    }
}

pub fn texture_frequency(profile: &MaterialProfile, sound: &SoundConfig, bucket: u8) -> f32 {
    sound.texture_base_hz * profile.freq_factor * (1.0 + f32::from(bucket) * sound.pitch_per_bucket)
}

/// Count of overtones (from harmonic 2 up) that stay below the aliasing ceiling.
pub fn audible_harmonics(fundamental_hz: f32, sample_rate: u32, max: usize) -> usize {
    let ceiling = HARMONIC_CEILING * sample_rate as f32;
    (0..max)
        .take_while(|k| fundamental_hz * (*k as f32 + 2.0) < ceiling)
        .count()
}

/// Looping SA background: an amplitude-modulated low tone with sub and second
/// harmonics, smoothed and softly saturated.
///
/// The segment is snapped to whole cycles of the sub-harmonic and of the
/// modulator so that looping it has no seam.
pub fn background(sound: &SoundConfig, sample_rate: u32) -> Vec<f32> {
    let sr = sample_rate as f32;
    let freq = sound.background_hz.clamp(40.0, 60.0);
    let nominal_s = sound.background_ms / 1000.0;

    let cycles = ((freq * nominal_s / 2.0).round() * 2.0).max(2.0);
    let len = ((cycles / freq) * sr).round().max(1.0) as usize;
    let mod_cycles = (sound.background_mod_hz * nominal_s).round().max(1.0);
    let depth = sound.background_mod_depth.clamp(0.0, 1.0);

    let mut samples: Vec<f32> = (0..len)
        .map(|i| {
            let pos = i as f32 / len as f32;
            let phase = TAU * cycles * pos;
            let am = 1.0 + depth * (TAU * mod_cycles * pos).sin();
            let tone = phase.sin() + 0.35 * (0.5 * phase).sin() + 0.2 * (2.0 * phase).sin();
            am * tone
        })
        .collect();

    for kernel in BACKGROUND_SMOOTHING {
        samples = circular_moving_average(&samples, kernel);
    }
    for sample in &mut samples {
        *sample = (*sample * BACKGROUND_DRIVE).tanh();
    }
    normalize_peak(&mut samples, sound.background_amp);
    samples
}

/// One-shot RA click: a short low sine under an exponential decay.
pub fn click(sound: &SoundConfig, sample_rate: u32) -> Vec<f32> {
    let sr = sample_rate as f32;
    let freq = sound.click_hz.clamp(20.0, 30.0);
    let len = (sound.click_ms / 1000.0 * sr).round().max(1.0) as usize;

    (0..len)
        .map(|i| {
            let t = i as f32 / sr;
            let env = (-CLICK_DECAY * i as f32 / len as f32).exp();
            (TAU * freq * t).sin() * env * sound.click_amp
        })
        .collect()
}

/// Material texture grain for one speed bucket.
pub fn texture(
    profile: &MaterialProfile,
    sound: &SoundConfig,
    bucket: u8,
    sample_rate: u32,
    seed: u64,
) -> Vec<f32> {
    let sr = sample_rate as f32;
    let freq = texture_frequency(profile, sound, bucket);
    let omega = TAU * freq;
    let len = (sound.texture_ms / 1000.0 * sr).round().max(1.0) as usize;
    let overtones = audible_harmonics(freq, sample_rate, profile.harmonics.len());
    let params = &profile.texture;
    let noise_smoothing = params.noise_smoothing.clamp(0.0, 0.999);

    let mut noise = XorShift::new(seed);
    let mut smoothed_noise = 0.0;
    let mut lowpass = LowPass::new();

    let mut samples: Vec<f32> = (0..len)
        .map(|i| {
            let t = i as f32 / sr;
            let mut sample = profile.fundamental * (omega * t).sin();
            for (k, weight) in profile.harmonics.iter().take(overtones).enumerate() {
                sample += weight * ((k as f32 + 2.0) * omega * t).sin();
            }

            smoothed_noise = smoothed_noise * noise_smoothing + noise.next_noise() * (1.0 - noise_smoothing);
            let modulation = params.mod_level
                * (params.mod_ratio * omega * t).sin()
                * (1.0 + params.mod_depth * (TAU * params.mod_rate_hz * t).sin());
            sample += modulation + params.noise_level * profile.roughness * smoothed_noise;

            sample *= envelope(i, len, profile.attack_ms, profile.release_ms, sr);
            lowpass.process(sample, profile.lowpass_hz, sr)
        })
        .collect();

    if profile.smoothing > 1 {
        samples = circular_moving_average(&samples, profile.smoothing);
    }
    normalize_peak(&mut samples, sound.texture_amp);
    samples
}

/// Raised-cosine attack and release at the ends of a segment.
fn envelope(index: usize, len: usize, attack_ms: f32, release_ms: f32, sample_rate: f32) -> f32 {
    let attack = (attack_ms / 1000.0 * sample_rate).max(1.0);
    let release = (release_ms / 1000.0 * sample_rate).max(1.0);
    let from_start = index as f32;
    let to_end = (len - 1 - index.min(len - 1)) as f32;

    let mut gain = 1.0;
    if from_start < attack {
        gain *= 0.5 - 0.5 * (PI * from_start / attack).cos();
    }
    if to_end < release {
        gain *= 0.5 - 0.5 * (PI * to_end / release).cos();
    }
    gain
}

/// Centered moving average that wraps at the buffer ends.
fn circular_moving_average(samples: &[f32], kernel: usize) -> Vec<f32> {
    let len = samples.len();
    if kernel <= 1 || len == 0 {
        return samples.to_vec();
    }
    let half = kernel / 2;
    (0..len)
        .map(|i| {
            let sum: f32 = (0..kernel)
                .map(|k| samples[(i + len * kernel + k - half) % len])
                .sum();
            sum / kernel as f32
        })
        .collect()
}

fn normalize_peak(samples: &mut [f32], amplitude: f32) {
    let peak = samples.iter().fold(0.0_f32, |acc, s| acc.max(s.abs()));
    if peak > f32::EPSILON {
        let scale = amplitude / peak;
        for sample in samples.iter_mut() {
            *sample *= scale;
        }
    }
}

struct XorShift {
    state: u64,
}

impl XorShift {
    fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    fn next_noise(&mut self) -> f32 {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        let normalized = (self.state as f64 / u64::MAX as f64) as f32;
        normalized * 2.0 - 1.0
    }
}

/// One-pole RC low-pass.
pub(crate) struct LowPass {
    y1: f32,
}

impl LowPass {
    pub(crate) fn new() -> Self {
        Self { y1: 0.0 }
    }

    pub(crate) fn process(&mut self, input: f32, cutoff_hz: f32, sample_rate: f32) -> f32 {
        let rc = 1.0 / (TAU * cutoff_hz.max(20.0));
        let dt = 1.0 / sample_rate;
        let alpha = dt / (rc + dt);
        self.y1 += alpha * (input - self.y1);
        self.y1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SAMPLE_RATE;
    use crate::material::MaterialTable;
    use approx::assert_relative_eq;

    fn peak(samples: &[f32]) -> f32 {
        samples.iter().fold(0.0_f32, |acc, s| acc.max(s.abs()))
    }

    #[test]
    fn background_loops_without_a_seam() {
        let samples = background(&SoundConfig::default(), SAMPLE_RATE);
        assert_eq!(samples.len(), 8820);
        assert_relative_eq!(peak(&samples), 0.8, epsilon = 1e-5);

        let max_step = samples
            .windows(2)
            .map(|w| (w[1] - w[0]).abs())
            .fold(0.0_f32, f32::max);
        let seam = (samples[0] - samples[samples.len() - 1]).abs();
        assert!(seam <= max_step * 1.5, "seam {seam} vs step {max_step}");
    }

    #[test]
    fn background_frequency_is_clamped() {
        let sound = SoundConfig {
            background_hz: 500.0,
            ..SoundConfig::default()
        };
        assert_eq!(
            background(&sound, SAMPLE_RATE),
            background(
                &SoundConfig {
                    background_hz: 60.0,
                    ..SoundConfig::default()
                },
                SAMPLE_RATE
            )
        );
    }

    #[test]
    fn click_is_short_and_decays() {
        let samples = click(&SoundConfig::default(), SAMPLE_RATE);
        assert_eq!(samples.len(), 2646);
        assert!(peak(&samples) <= 1.0);
        let tail = peak(&samples[samples.len() - 100..]);
        assert!(tail < 0.01, "tail {tail}");
    }

    #[test]
    fn textures_are_deterministic_and_bounded() {
        let sound = SoundConfig::default();
        let table = MaterialTable::default();
        for (material, profile) in table.iter() {
            let seed = SoundKey::texture(material, 3).seed();
            let first = texture(profile, &sound, 3, SAMPLE_RATE, seed);
            let second = texture(profile, &sound, 3, SAMPLE_RATE, seed);
            assert_eq!(first, second, "{material}");
            assert!(first.iter().all(|s| s.is_finite()));
            assert!(peak(&first) <= sound.texture_amp + 1e-5);
        }
    }

    #[test]
    fn materials_sound_different() {
        let sound = SoundConfig::default();
        let table = MaterialTable::default();
        let glass = texture(&table.glass, &sound, 0, SAMPLE_RATE, 1);
        let wood = texture(&table.wood, &sound, 0, SAMPLE_RATE, 1);
        assert_ne!(glass, wood);
    }

    #[test]
    fn pitch_rises_with_bucket() {
        let sound = SoundConfig::default();
        let profile = MaterialTable::default().metal;
        assert_relative_eq!(texture_frequency(&profile, &sound, 0), 30.0);
        assert_relative_eq!(texture_frequency(&profile, &sound, 4), 36.0, epsilon = 1e-4);
    }

    #[test]
    fn overtones_near_nyquist_are_dropped() {
        assert_eq!(audible_harmonics(5_000.0, SAMPLE_RATE, 6), 2);
        assert_eq!(audible_harmonics(30.0, SAMPLE_RATE, 6), 6);
        assert_eq!(audible_harmonics(15_000.0, SAMPLE_RATE, 6), 0);
    }

    #[test]
    fn speed_buckets_saturate() {
        let sound = SoundConfig::default();
        assert_eq!(speed_bucket(0.0, &sound), 0);
        assert_eq!(speed_bucket(f32::NAN, &sound), 0);
        assert_eq!(speed_bucket(499.0, &sound), 0);
        assert_eq!(speed_bucket(1_200.0, &sound), 2);
        assert_eq!(speed_bucket(1.0e9, &sound), 7);
    }

    #[test]
    fn seeds_differ_per_key() {
        let a = SoundKey::texture(Material::Wood, 0).seed();
        let b = SoundKey::texture(Material::Wood, 1).seed();
        let c = SoundKey::texture(Material::Metal, 0).seed();
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(SoundKey::background().seed(), SoundKey::click().seed());
    }

    #[test]
    fn lowpass_passes_dc() {
        let mut filter = LowPass::new();
        let mut out = 0.0;
        for _ in 0..10_000 {
            out = filter.process(1.0, 100.0, 44_100.0);
        }
        assert_relative_eq!(out, 1.0, epsilon = 1e-4);
    }
}
