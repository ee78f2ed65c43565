use std::collections::VecDeque;

/// Counts spikes over a trailing window of ticks.
#[derive(Clone, Debug)]
pub struct SpikeRateWindow {
    window_ticks: u64,
    window_s: f32,
    spikes: VecDeque<u64>,
}

impl SpikeRateWindow {
    pub fn new(window_s: f32, tick_s: f32) -> Self {
        let window_ticks = ((window_s / tick_s).round() as u64).max(1);
        Self {
            window_ticks,
            window_s,
            spikes: VecDeque::new(),
        }
    }

    pub fn record(&mut self, tick: u64) {
        self.spikes.push_back(tick);
    }

    /// Drops spikes that fell out of the window ending at `tick`.
    pub fn advance(&mut self, tick: u64) {
        while let Some(&oldest) = self.spikes.front() {
            if tick.saturating_sub(oldest) >= self.window_ticks {
                self.spikes.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn count(&self) -> usize {
        self.spikes.len()
    }

    pub fn rate_hz(&self) -> f32 {
        self.spikes.len() as f32 / self.window_s
    }

    pub fn clear(&mut self) {
        self.spikes.clear();
    }
}
