use std::fmt;

use serde::{Deserialize, Serialize};

/// Receptor channels, in integrator order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NeuronId {
    Sa,
    RaMotion,
    RaClick,
}

impl NeuronId {
    pub const ALL: [NeuronId; 3] = [NeuronId::Sa, NeuronId::RaMotion, NeuronId::RaClick];

    pub fn index(self) -> usize {
        match self {
            Self::Sa => 0,
            Self::RaMotion => 1,
            Self::RaClick => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Sa => "SA",
            Self::RaMotion => "RA motion",
            Self::RaClick => "RA click",
        }
    }
}

impl fmt::Display for NeuronId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw pointer state as the host sees it at a tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PointerInput {
    pub x: f32,
    pub y: f32,
    pub button_down: bool,
}

impl PointerInput {
    pub fn new(x: f32, y: f32, button_down: bool) -> Self {
        Self { x, y, button_down }
    }
}

/// One tick of encoder input.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StimulusSample {
    pub position: [f32; 2],
    pub button_down: bool,
    /// Zero, or the click magnitude while the button is held.
    pub pressure: f32,
    /// Pointer speed in px/s.
    pub speed: f32,
    pub roughness: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SpikeEvent {
    pub neuron: NeuronId,
    pub tick: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HistorySample {
    pub v: f32,
    pub u: f32,
    pub fired: bool,
}
