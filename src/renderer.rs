//! Spike to sound rendering.
//!
//! SA spikes keep the background loop alive, RA-click spikes fire a one-shot,
//! and RA-motion spikes drive the texture loop whose volume follows the
//! motion channel's firing rate.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::config::{HapticConfig, VolumeConfig};
use crate::material::Material;
use crate::neuron::StepReport;
use crate::rate::SpikeRateWindow;
use crate::sink::{AudioCommand, SampleBuffer, Voice};
use crate::synth::{self, SoundKey, SoundKind};
use crate::types::NeuronId;

/// Texture gain changes smaller than this are not sent.
const GAIN_EPSILON: f32 = 1.0e-3;

/// Maps a motion firing rate to the texture's target volume.
pub fn target_volume_for_rate(rate_hz: f32, volume: &VolumeConfig) -> f32 {
    if rate_hz < volume.rate_floor_hz {
        volume.texture_floor
    } else if rate_hz > volume.rate_ceiling_hz {
        volume.texture_ceiling
    } else {
        let t = (rate_hz - volume.rate_floor_hz) / (volume.rate_ceiling_hz - volume.rate_floor_hz);
        volume.texture_floor + (volume.texture_ceiling - volume.texture_floor) * t
    }
}

/// Exponential approach of `current` towards `target`, one step per tick.
/// Rising uses `smooth_factor`, falling uses the faster `release_factor`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VolumeController {
    pub current: f32,
    pub target: f32,
    smooth_factor: f32,
    release_factor: f32,
    snap_epsilon: f32,
}

impl VolumeController {
    pub fn new(smooth_factor: f32, release_factor: f32, snap_epsilon: f32) -> Self {
        Self {
            current: 0.0,
            target: 0.0,
            smooth_factor,
            release_factor,
            snap_epsilon,
        }
    }

    pub fn update(&mut self, target: f32) -> f32 {
        self.target = target;
        let factor = if self.target < self.current {
            self.release_factor
        } else {
            self.smooth_factor
        };
        self.current += (self.target - self.current) * factor;
        if (self.target - self.current).abs() < self.snap_epsilon {
            self.current = self.target;
        }
        self.current
    }

    pub fn reset(&mut self) {
        self.current = 0.0;
        self.target = 0.0;
    }
}

/// Per-tick context the renderer needs besides the spike flags.
#[derive(Clone, Copy, Debug)]
pub struct RenderContext {
    pub tick: u64,
    pub material: Material,
    /// Pointer speed in px/s.
    pub speed: f32,
    pub contact: bool,
}

pub struct HapticRenderer {
    config: HapticConfig,
    cache: HashMap<SoundKey, SampleBuffer>,
    motion_rate: SpikeRateWindow,
    texture_volume: VolumeController,
    texture_key: Option<SoundKey>,
    sent_texture_gain: f32,
}

impl HapticRenderer {
    pub fn new(config: &HapticConfig) -> Self {
        Self {
            config: config.clone(),
            cache: HashMap::new(),
            motion_rate: SpikeRateWindow::new(config.volume.rate_window_s, config.tick_seconds()),
            texture_volume: VolumeController::new(
                config.volume.smooth_factor,
                config.volume.release_factor,
                config.volume.snap_epsilon,
            ),
            texture_key: None,
            sent_texture_gain: 0.0,
        }
    }

    /// Returns the cached buffer for `key`, synthesizing it on first use.
    pub fn sound(&mut self, key: SoundKey) -> SampleBuffer {
        if let Some(buffer) = self.cache.get(&key) {
            return Arc::clone(buffer);
        }

        let sound = &self.config.sound;
        let sample_rate = self.config.sample_rate;
        let samples = match (key.kind, key.material) {
            (SoundKind::Background, _) => synth::background(sound, sample_rate),
            (SoundKind::Click, _) => synth::click(sound, sample_rate),
            (SoundKind::Texture, Some(material)) => synth::texture(
                self.config.materials.get(material),
                sound,
                key.bucket,
                sample_rate,
                key.seed(),
            ),
            (SoundKind::Texture, None) => Vec::new(),
        };
        debug!(?key, samples = samples.len(), "synthesized sound");

        let buffer: SampleBuffer = samples.into();
        self.cache.insert(key, Arc::clone(&buffer));
        buffer
    }

    /// Synthesizes every texture bucket for `material` ahead of use.
    pub fn prewarm(&mut self, material: Material) {
        self.sound(SoundKey::background());
        self.sound(SoundKey::click());
        for bucket in 0..self.config.sound.speed_buckets {
            self.sound(SoundKey::texture(material, bucket));
        }
    }

    pub fn render(&mut self, report: &StepReport, ctx: &RenderContext, out: &mut Vec<AudioCommand>) {
        if report.fired(NeuronId::Sa) {
            out.push(AudioCommand::Trigger {
                voice: Voice::Background,
                buffer: self.sound(SoundKey::background()),
                gain: self.config.volume.background,
            });
        }

        if report.fired(NeuronId::RaClick) {
            out.push(AudioCommand::Trigger {
                voice: Voice::Click,
                buffer: self.sound(SoundKey::click()),
                gain: self.config.volume.click,
            });
        }

        if report.fired(NeuronId::RaMotion) {
            self.motion_rate.record(ctx.tick);
        }
        self.motion_rate.advance(ctx.tick);
        self.render_texture(ctx, out);
    }

    fn render_texture(&mut self, ctx: &RenderContext, out: &mut Vec<AudioCommand>) {
        // lift-off silences the texture at once instead of fading it
        if !ctx.contact {
            self.texture_volume.reset();
            if self.texture_key.is_some() {
                if self.sent_texture_gain != 0.0 {
                    out.push(AudioCommand::Gain {
                        voice: Voice::Texture,
                        gain: 0.0,
                    });
                }
                out.push(AudioCommand::Stop {
                    voice: Voice::Texture,
                });
                self.forget_texture();
            }
            return;
        }

        let rate = self.motion_rate.rate_hz();
        let active = ctx.speed > 0.0 && rate > 0.0;
        let target = if active {
            target_volume_for_rate(rate, &self.config.volume)
        } else {
            0.0
        };
        let gain = self.texture_volume.update(target);

        if active {
            let bucket = synth::speed_bucket(ctx.speed, &self.config.sound);
            let key = SoundKey::texture(ctx.material, bucket);
            if self.texture_key != Some(key) {
                out.push(AudioCommand::Loop {
                    buffer: self.sound(key),
                    gain,
                });
                self.texture_key = Some(key);
                self.sent_texture_gain = gain;
                return;
            }
        }

        if self.texture_key.is_none() {
            return;
        }
        if (gain - self.sent_texture_gain).abs() > GAIN_EPSILON {
            out.push(AudioCommand::Gain {
                voice: Voice::Texture,
                gain,
            });
            self.sent_texture_gain = gain;
        }
        if !active && gain == 0.0 {
            out.push(AudioCommand::Stop {
                voice: Voice::Texture,
            });
            self.forget_texture();
        }
    }

    /// Marks the texture voice as not playing, so the next active tick sends
    /// a fresh `Loop`. Used when playback rejected the last one.
    pub fn forget_texture(&mut self) {
        self.texture_key = None;
        self.sent_texture_gain = 0.0;
    }

    pub fn reset(&mut self, out: &mut Vec<AudioCommand>) {
        self.motion_rate.clear();
        self.texture_volume.reset();
        self.forget_texture();
        out.push(AudioCommand::StopAll);
    }

    pub fn texture_volume(&self) -> VolumeController {
        self.texture_volume
    }

    pub fn motion_rate_hz(&self) -> f32 {
        self.motion_rate.rate_hz()
    }

    pub fn texture_playing(&self) -> bool {
        self.texture_key.is_some()
    }

    pub fn cached_sounds(&self) -> usize {
        self.cache.len()
    }
}
