use std::collections::VecDeque;

use crate::neuron::{NeuronState, StepReport};
use crate::types::{HistorySample, NeuronId};

/// Bounded per-neuron trace of recent `(v, u, fired)` samples, oldest first.
#[derive(Clone, Debug)]
pub struct SpikeHistory {
    capacity: usize,
    traces: [VecDeque<HistorySample>; 3],
}

impl SpikeHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            traces: std::array::from_fn(|_| VecDeque::with_capacity(capacity)),
        }
    }

    pub fn record(&mut self, states: &[NeuronState; 3], report: &StepReport) {
        for id in NeuronId::ALL {
            let idx = id.index();
            let trace = &mut self.traces[idx];
            if trace.len() == self.capacity {
                trace.pop_front();
            }
            trace.push_back(HistorySample {
                v: states[idx].v,
                u: states[idx].u,
                fired: report.fired[idx],
            });
        }
    }

    pub fn trace(&self, id: NeuronId) -> &VecDeque<HistorySample> {
        &self.traces[id.index()]
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.traces[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        for trace in &mut self.traces {
            trace.clear();
        }
    }
}
