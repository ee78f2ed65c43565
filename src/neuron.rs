//! Izhikevich integrator for the three receptor models.

use tracing::warn;

use crate::config::{AdaptationConfig, IzhikevichParams, NeuronConfig};
use crate::types::NeuronId;

const SPIKE_THRESHOLD_MV: f32 = 30.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NeuronState {
    pub v: f32,
    pub u: f32,
    pub params: IzhikevichParams,
}

impl NeuronState {
    pub fn new(params: IzhikevichParams) -> Self {
        Self {
            v: params.v_init,
            u: params.b * params.v_init,
            params,
        }
    }

    /// Post-spike default, also used when the state stops being finite.
    fn recover(&mut self) {
        self.v = self.params.c;
        self.u = self.params.b * self.params.c;
    }

    fn dv(&self, current: f32) -> f32 {
        0.04 * self.v * self.v + 5.0 * self.v + 140.0 - self.u + current
    }

    /// Returns `(fired, fault)`.
    fn step(&mut self, dt: f32, current: f32) -> (bool, bool) {
        let half = 0.5 * dt;
        self.v += half * self.dv(current);
        self.v += half * self.dv(current);
        self.u += dt * self.params.a * (self.params.b * self.v - self.u);

        if !self.v.is_finite() || !self.u.is_finite() {
            self.recover();
            return (false, true);
        }

        if self.v >= SPIKE_THRESHOLD_MV {
            self.v = self.params.c;
            self.u += self.params.d;
            return (true, false);
        }
        (false, false)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepReport {
    pub fired: [bool; 3],
    pub faults: [bool; 3],
}

impl StepReport {
    pub fn fired(&self, id: NeuronId) -> bool {
        self.fired[id.index()]
    }
}

/// Three independent neurons sharing one timestep. There is no synaptic
/// coupling; each only sees its own input current.
#[derive(Clone, Debug)]
pub struct NeuronArray {
    initial: [NeuronState; 3],
    neurons: [NeuronState; 3],
}

impl NeuronArray {
    pub fn new(config: &NeuronConfig) -> Self {
        let initial = [
            NeuronState::new(config.sa),
            NeuronState::new(config.ra_motion),
            NeuronState::new(config.ra_click),
        ];
        Self {
            initial,
            neurons: initial,
        }
    }

    pub fn step(&mut self, dt: f32, currents: [f32; 3]) -> StepReport {
        let mut report = StepReport::default();
        for id in NeuronId::ALL {
            let idx = id.index();
            let (fired, fault) = self.neurons[idx].step(dt, currents[idx]);
            if fault {
                warn!(neuron = %id, current = currents[idx], "non-finite neuron state, recovered");
            }
            report.fired[idx] = fired;
            report.faults[idx] = fault;
        }
        report
    }

    pub fn state(&self, id: NeuronId) -> &NeuronState {
        &self.neurons[id.index()]
    }

    pub fn states(&self) -> &[NeuronState; 3] {
        &self.neurons
    }

    /// Mutable parameters. Only the SA adaptation policy writes through this.
    pub fn params_mut(&mut self, id: NeuronId) -> &mut IzhikevichParams {
        &mut self.neurons[id.index()].params
    }

    /// Overwrites `(v, u)` of one neuron; used to exercise fault recovery.
    pub fn inject(&mut self, id: NeuronId, v: f32, u: f32) {
        let neuron = &mut self.neurons[id.index()];
        neuron.v = v;
        neuron.u = u;
    }

    pub fn reset(&mut self) {
        self.neurons = self.initial;
    }
}

/// SA habituation: sustained firing slows the recovery variable.
#[derive(Clone, Debug)]
pub struct SaAdaptation {
    config: AdaptationConfig,
    base_a: f32,
}

impl SaAdaptation {
    pub fn new(config: AdaptationConfig, sa: &IzhikevichParams) -> Self {
        Self {
            config,
            base_a: sa.a,
        }
    }

    /// Runs after each integrator step.
    pub fn apply(&self, neurons: &mut NeuronArray, report: &StepReport, pressed: bool) {
        if !self.config.enabled {
            return;
        }
        let params = neurons.params_mut(NeuronId::Sa);
        if pressed {
            params.a = self.base_a;
        }
        if report.fired(NeuronId::Sa) {
            params.a = (params.a / self.config.decay_ratio).max(self.config.floor);
        }
    }
}
