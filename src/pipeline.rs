//! The fixed-tick loop: pointer input in, audio commands and snapshots out.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::HapticConfig;
use crate::encoder::{PointerTracker, StimulusEncoder};
use crate::error::{HapticError, SinkError};
use crate::history::SpikeHistory;
use crate::material::Material;
use crate::neuron::{NeuronArray, SaAdaptation, StepReport};
use crate::rate::SpikeRateWindow;
use crate::renderer::{HapticRenderer, RenderContext};
use crate::sink::{AudioCommand, AudioSink};
use crate::types::{NeuronId, PointerInput, SpikeEvent};

/// Keyboard-level control surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineCommand {
    SelectMaterial(u8),
    VolumeUp,
    VolumeDown,
    Reset,
    Quit,
}

impl PipelineCommand {
    pub fn from_key(key: char) -> Option<Self> {
        match key {
            '1'..='7' => key.to_digit(10).map(|d| Self::SelectMaterial(d as u8)),
            '+' | '=' => Some(Self::VolumeUp),
            '-' => Some(Self::VolumeDown),
            'r' | 'R' => Some(Self::Reset),
            'q' | 'Q' => Some(Self::Quit),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub step: StepReport,
    pub commands: usize,
}

impl TickReport {
    pub fn spikes(&self) -> impl Iterator<Item = SpikeEvent> + '_ {
        NeuronId::ALL
            .into_iter()
            .filter(move |id| self.step.fired(*id))
            .map(move |neuron| SpikeEvent {
                neuron,
                tick: self.tick,
            })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NeuronSnapshot {
    pub v: f32,
    pub u: f32,
    pub last_spike: Option<u64>,
    pub rate_hz: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PipelineSnapshot {
    /// Ticks completed since start or the last reset.
    pub tick: u64,
    pub neurons: [NeuronSnapshot; 3],
    pub material: Material,
    pub roughness: f32,
    pub speed: f32,
    pub master_volume: f32,
    pub background_volume: f32,
    pub click_volume: f32,
    pub texture_volume: f32,
    pub texture_target: f32,
    pub audio_online: bool,
    pub fault_count: u64,
}

impl PipelineSnapshot {
    pub fn neuron(&self, id: NeuronId) -> &NeuronSnapshot {
        &self.neurons[id.index()]
    }
}

pub struct PipelineCoordinator<S: AudioSink> {
    config: HapticConfig,
    tracker: PointerTracker,
    encoder: StimulusEncoder,
    neurons: NeuronArray,
    adaptation: SaAdaptation,
    renderer: HapticRenderer,
    history: SpikeHistory,
    rates: [SpikeRateWindow; 3],
    last_spike: [Option<u64>; 3],
    sink: S,
    material: Material,
    master_volume: f32,
    tick: u64,
    button_was_down: bool,
    speed: f32,
    audio_online: bool,
    fault_count: u64,
    outbox: Vec<AudioCommand>,
    snapshot: Arc<PipelineSnapshot>,
}

impl<S: AudioSink> PipelineCoordinator<S> {
    pub fn new(config: HapticConfig, sink: S) -> Result<Self, HapticError> {
        config.validate()?;

        let tick_s = config.tick_seconds();
        let material = Material::Glass;
        let master_volume = config.volume.master.clamp(0.0, 1.0);
        let mut coordinator = Self {
            tracker: PointerTracker::new(&config),
            encoder: StimulusEncoder::new(config.encoder),
            neurons: NeuronArray::new(&config.neurons),
            adaptation: SaAdaptation::new(config.adaptation, &config.neurons.sa),
            renderer: HapticRenderer::new(&config),
            history: SpikeHistory::new(config.history_capacity),
            rates: std::array::from_fn(|_| SpikeRateWindow::new(config.volume.rate_window_s, tick_s)),
            last_spike: [None; 3],
            sink,
            material,
            master_volume,
            tick: 0,
            button_was_down: false,
            speed: 0.0,
            audio_online: true,
            fault_count: 0,
            outbox: Vec::new(),
            snapshot: Arc::new(PipelineSnapshot {
                tick: 0,
                neurons: [NeuronSnapshot::default(); 3],
                material,
                roughness: 0.0,
                speed: 0.0,
                master_volume,
                background_volume: 0.0,
                click_volume: 0.0,
                texture_volume: 0.0,
                texture_target: 0.0,
                audio_online: true,
                fault_count: 0,
            }),
            config,
        };

        coordinator.renderer.prewarm(material);
        coordinator.outbox.push(AudioCommand::MasterGain(master_volume));
        coordinator.flush();
        coordinator.publish();
        info!(material = %material, master_volume, "pipeline ready");
        Ok(coordinator)
    }

    /// Runs one integration step and forwards any resulting audio.
    pub fn tick(&mut self, input: PointerInput) -> TickReport {
        let tick = self.tick;
        let roughness = self.config.materials.get(self.material).roughness;

        let sample = self.tracker.sample(input, roughness);
        self.speed = sample.speed;
        let currents = self.encoder.encode(&sample);
        let report = self.neurons.step(self.config.tick_ms, currents);

        let pressed = input.button_down && !self.button_was_down;
        self.button_was_down = input.button_down;
        self.adaptation.apply(&mut self.neurons, &report, pressed);

        for id in NeuronId::ALL {
            let idx = id.index();
            if report.fired[idx] {
                self.rates[idx].record(tick);
                self.last_spike[idx] = Some(tick);
            }
            self.rates[idx].advance(tick);
            if report.faults[idx] {
                self.fault_count += 1;
            }
        }

        let ctx = RenderContext {
            tick,
            material: self.material,
            speed: sample.speed,
            contact: input.button_down,
        };
        self.renderer.render(&report, &ctx, &mut self.outbox);
        let commands = self.flush();

        self.history.record(self.neurons.states(), &report);
        self.tick += 1;
        if self.tick % self.config.snapshot_interval == 0 {
            self.publish();
        }

        TickReport {
            tick,
            step: report,
            commands,
        }
    }

    pub fn apply(&mut self, command: PipelineCommand) -> Result<Flow, HapticError> {
        match command {
            PipelineCommand::SelectMaterial(selector) => self.set_material(selector)?,
            PipelineCommand::VolumeUp => self.adjust_master(self.config.volume.master_step),
            PipelineCommand::VolumeDown => self.adjust_master(-self.config.volume.master_step),
            PipelineCommand::Reset => self.reset(),
            PipelineCommand::Quit => {
                info!("quit requested");
                self.outbox.push(AudioCommand::StopAll);
                self.flush();
                return Ok(Flow::Quit);
            }
        }
        Ok(Flow::Continue)
    }

    /// Switches material by its 1-based selector. Unknown selectors leave the
    /// pipeline untouched.
    pub fn set_material(&mut self, selector: u8) -> Result<(), HapticError> {
        let Some(material) = Material::from_selector(selector) else {
            warn!(selector, "unknown material selector");
            return Err(HapticError::UnknownMaterial { selector });
        };
        if material != self.material {
            self.material = material;
            self.renderer.prewarm(material);
            info!(material = %material, "material selected");
        }
        self.publish();
        Ok(())
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        self.master_volume = volume.clamp(0.0, 1.0);
        info!(master_volume = self.master_volume, "master volume");
        self.outbox.push(AudioCommand::MasterGain(self.master_volume));
        self.flush();
        self.publish();
    }

    fn adjust_master(&mut self, delta: f32) {
        // keep repeated steps on the 0.1 grid
        let stepped = ((self.master_volume + delta) * 1000.0).round() / 1000.0;
        self.set_master_volume(stepped);
    }

    /// Returns to the initial dynamic state. Material, master volume and the
    /// sound cache are kept.
    pub fn reset(&mut self) {
        self.neurons.reset();
        self.encoder.reset();
        self.tracker.reset();
        self.history.clear();
        for rate in &mut self.rates {
            rate.clear();
        }
        self.last_spike = [None; 3];
        self.tick = 0;
        self.button_was_down = false;
        self.speed = 0.0;
        self.renderer.reset(&mut self.outbox);
        self.flush();
        self.publish();
        info!("pipeline reset");
    }

    fn flush(&mut self) -> usize {
        let count = self.outbox.len();
        for command in self.outbox.drain(..) {
            let is_loop = matches!(command, AudioCommand::Loop { .. });
            let result = self.sink.submit(command);
            if is_loop && result.is_err() {
                // a dropped Loop never started, so resend it on the next active tick
                self.renderer.forget_texture();
            }
            match result {
                Ok(()) => {
                    if !self.audio_online {
                        info!("audio output back online");
                        self.audio_online = true;
                    }
                }
                Err(SinkError::Saturated) => debug!("audio queue full, command dropped"),
                Err(err @ SinkError::Unavailable(_)) => {
                    if self.audio_online {
                        warn!(error = %err, "audio output lost, continuing silently");
                        self.audio_online = false;
                    }
                }
            }
        }
        count
    }

    fn publish(&mut self) {
        let states = self.neurons.states();
        let texture = self.renderer.texture_volume();
        let neurons = std::array::from_fn(|idx| NeuronSnapshot {
            v: states[idx].v,
            u: states[idx].u,
            last_spike: self.last_spike[idx],
            rate_hz: self.rates[idx].rate_hz(),
        });
        self.snapshot = Arc::new(PipelineSnapshot {
            tick: self.tick,
            neurons,
            material: self.material,
            roughness: self.config.materials.get(self.material).roughness,
            speed: self.speed,
            master_volume: self.master_volume,
            background_volume: self.config.volume.background,
            click_volume: self.config.volume.click,
            texture_volume: texture.current,
            texture_target: texture.target,
            audio_online: self.audio_online,
            fault_count: self.fault_count,
        });
    }

    pub fn snapshot(&self) -> Arc<PipelineSnapshot> {
        Arc::clone(&self.snapshot)
    }

    pub fn history(&self) -> &SpikeHistory {
        &self.history
    }

    pub fn neurons(&self) -> &NeuronArray {
        &self.neurons
    }

    /// Fault injection and inspection hook for tests and diagnostics.
    pub fn neurons_mut(&mut self) -> &mut NeuronArray {
        &mut self.neurons
    }

    pub fn renderer(&self) -> &HapticRenderer {
        &self.renderer
    }

    pub fn material(&self) -> Material {
        self.material
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    pub fn ticks(&self) -> u64 {
        self.tick
    }

    pub fn audio_online(&self) -> bool {
        self.audio_online
    }

    pub fn config(&self) -> &HapticConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}
