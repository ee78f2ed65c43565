//! Sample-accurate voice mixer run on the audio thread.

use crate::sink::{AudioCommand, SampleBuffer, Voice};

const LIMITER_THRESHOLD: f32 = 0.92;
const LIMITER_RELEASE: f32 = 0.999;

#[derive(Clone, Default)]
struct VoiceState {
    buffer: Option<SampleBuffer>,
    /// Read position in source frames.
    position: f64,
    gain: f32,
    looping: bool,
    /// Source frames left before a held loop lets go; `None` loops forever.
    hold: Option<f64>,
}

impl VoiceState {
    fn start(&mut self, buffer: SampleBuffer, gain: f32, looping: bool, hold: Option<f64>) {
        self.buffer = Some(buffer);
        self.position = 0.0;
        self.gain = gain;
        self.looping = looping;
        self.hold = hold;
    }

    fn stop(&mut self) {
        *self = Self::default();
    }

    fn is_playing(&self) -> bool {
        self.buffer.is_some()
    }

    fn next_sample(&mut self, step: f64) -> f32 {
        let Some(buffer) = &self.buffer else {
            return 0.0;
        };
        let len = buffer.len();
        if len == 0 {
            self.stop();
            return 0.0;
        }

        let idx0 = self.position.floor() as usize % len;
        let frac = (self.position - self.position.floor()) as f32;
        let next = if idx0 + 1 < len {
            buffer[idx0 + 1]
        } else if self.looping {
            buffer[0]
        } else {
            0.0
        };
        let sample = (buffer[idx0] + (next - buffer[idx0]) * frac) * self.gain;

        self.position += step;
        if self.position >= len as f64 {
            if self.looping {
                self.position -= len as f64;
            } else {
                self.stop();
                return sample;
            }
        }
        if let Some(hold) = &mut self.hold {
            *hold -= step;
            if *hold <= 0.0 {
                self.stop();
            }
        }
        sample
    }
}

struct Limiter {
    envelope: f32,
}

impl Limiter {
    fn new() -> Self {
        Self { envelope: 0.0 }
    }

    fn process(&mut self, input: f32, gain: f32) -> f32 {
        let peak = input.abs();
        if peak > self.envelope {
            self.envelope = peak;
        } else {
            self.envelope *= LIMITER_RELEASE;
        }

        let limiter_gain = if self.envelope > LIMITER_THRESHOLD {
            LIMITER_THRESHOLD / self.envelope
        } else {
            1.0
        };
        (input * limiter_gain * gain).clamp(-1.0, 1.0)
    }
}

/// Plays [`AudioCommand`]s against a device running at its own rate.
///
/// Source buffers are resampled by linear interpolation. The background voice
/// loops for one buffer length after its latest trigger, so a steady stream
/// of SA spikes keeps it sounding without restarts.
pub struct Mixer {
    step: f64,
    voices: [VoiceState; 3],
    master: f32,
    limiter: Limiter,
}

impl Mixer {
    pub fn new(source_rate: u32, device_rate: u32) -> Self {
        Self {
            step: f64::from(source_rate) / f64::from(device_rate.max(1)),
            voices: Default::default(),
            master: 1.0,
            limiter: Limiter::new(),
        }
    }

    pub fn apply(&mut self, command: AudioCommand) {
        match command {
            AudioCommand::Trigger {
                voice: Voice::Background,
                buffer,
                gain,
            } => {
                let hold = buffer.len() as f64;
                let state = &mut self.voices[Voice::Background.index()];
                let same = state
                    .buffer
                    .as_ref()
                    .is_some_and(|playing| SampleBuffer::ptr_eq(playing, &buffer));
                if same {
                    state.gain = gain;
                    state.hold = Some(hold);
                } else {
                    state.start(buffer, gain, true, Some(hold));
                }
            }
            AudioCommand::Trigger {
                voice,
                buffer,
                gain,
            } => self.voices[voice.index()].start(buffer, gain, false, None),
            AudioCommand::Loop { buffer, gain } => {
                let state = &mut self.voices[Voice::Texture.index()];
                let position = state.position;
                state.start(buffer, gain, true, None);
                // keep the phase across bucket swaps
                if let Some(buffer) = &state.buffer {
                    if !buffer.is_empty() {
                        state.position = position % buffer.len() as f64;
                    }
                }
            }
            AudioCommand::Gain { voice, gain } => self.set_gain(voice, gain),
            AudioCommand::MasterGain(gain) => self.set_master(gain),
            AudioCommand::Stop { voice } => self.voices[voice.index()].stop(),
            AudioCommand::StopAll => {
                for voice in &mut self.voices {
                    voice.stop();
                }
            }
        }
    }

    pub fn set_gain(&mut self, voice: Voice, gain: f32) {
        self.voices[voice.index()].gain = gain;
    }

    pub fn set_master(&mut self, gain: f32) {
        self.master = gain.clamp(0.0, 1.0);
    }

    pub fn is_playing(&self, voice: Voice) -> bool {
        self.voices[voice.index()].is_playing()
    }

    pub fn next_sample(&mut self) -> f32 {
        let step = self.step;
        let mix: f32 = self.voices.iter_mut().map(|v| v.next_sample(step)).sum();
        self.limiter.process(mix, self.master)
    }

    pub fn fill(&mut self, out: &mut [f32]) {
        for sample in out {
            *sample = self.next_sample();
        }
    }
}
