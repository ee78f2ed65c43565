//! Pointer to receptor-current encoding.

use crate::config::{EncoderConfig, HapticConfig, PointerConfig};
use crate::types::{PointerInput, StimulusSample};

/// Converts one stimulus sample into `[I_sa, I_ra_motion, I_ra_click]`.
///
/// The only retained state is the previous pressure and the click hold
/// countdown.
#[derive(Clone, Debug)]
pub struct StimulusEncoder {
    config: EncoderConfig,
    prev_pressure: f32,
    click_current: f32,
    click_remaining: u32,
}

impl StimulusEncoder {
    pub fn new(config: EncoderConfig) -> Self {
        Self {
            config,
            prev_pressure: 0.0,
            click_current: 0.0,
            click_remaining: 0,
        }
    }

    pub fn encode(&mut self, sample: &StimulusSample) -> [f32; 3] {
        let pressure = non_negative(sample.pressure);
        let speed = non_negative(sample.speed);
        let roughness = finite_or_zero(sample.roughness).clamp(0.0, 1.0);

        let i_sa = if sample.button_down {
            self.config.click_magnitude
        } else {
            0.0
        };

        let i_motion = if speed > 0.0 {
            let clip = self.config.motion_clip;
            (speed * roughness * self.config.motion_gain).clamp(-clip, clip)
        } else {
            0.0
        };

        let delta = (pressure - self.prev_pressure).abs();
        self.prev_pressure = pressure;
        if delta > 0.0 {
            let clip = self.config.click_clip;
            self.click_current = (delta * self.config.click_gain).clamp(-clip, clip);
            self.click_remaining = self.config.click_hold_ticks;
        }

        let i_click = if self.click_remaining > 0 {
            self.click_remaining -= 1;
            self.click_current
        } else {
            0.0
        };

        [i_sa, i_motion, i_click]
    }

    pub fn reset(&mut self) {
        self.prev_pressure = 0.0;
        self.click_current = 0.0;
        self.click_remaining = 0;
    }
}

/// Derives a [`StimulusSample`] from raw pointer positions, one call per tick.
///
/// Speed is the distance covered since the last observed movement divided by
/// the time that movement spanned, so hosts that report the pointer slower
/// than the tick rate still yield a steady speed. It falls to zero once the
/// pointer has been still for `stop_after_ms`.
#[derive(Clone, Debug)]
pub struct PointerTracker {
    config: PointerConfig,
    click_magnitude: f32,
    tick_s: f32,
    stop_after_ticks: u64,
    last_position: Option<[f32; 2]>,
    ticks_since_move: u64,
    speed: f32,
}

impl PointerTracker {
    pub fn new(config: &HapticConfig) -> Self {
        Self {
            config: config.pointer,
            click_magnitude: config.encoder.click_magnitude,
            tick_s: config.tick_seconds(),
            stop_after_ticks: config.ms_to_ticks(config.pointer.stop_after_ms),
            last_position: None,
            ticks_since_move: 0,
            speed: 0.0,
        }
    }

    pub fn sample(&mut self, input: PointerInput, roughness: f32) -> StimulusSample {
        let position = [finite_or_zero(input.x), finite_or_zero(input.y)];
        self.ticks_since_move = self.ticks_since_move.saturating_add(1);

        match self.last_position {
            Some(last) if last != position => {
                let dx = position[0] - last[0];
                let dy = position[1] - last[1];
                let elapsed = self.ticks_since_move as f32 * self.tick_s;
                self.speed = ((dx * dx + dy * dy).sqrt() / elapsed).min(self.config.max_speed);
                self.ticks_since_move = 0;
                self.last_position = Some(position);
            }
            Some(_) => {
                if self.ticks_since_move >= self.stop_after_ticks {
                    self.speed = 0.0;
                }
            }
            None => {
                self.last_position = Some(position);
                self.ticks_since_move = 0;
            }
        }

        if self.config.require_contact && !input.button_down {
            self.speed = 0.0;
        }
        let speed = if self.speed < self.config.min_speed {
            0.0
        } else {
            self.speed
        };

        StimulusSample {
            position,
            button_down: input.button_down,
            pressure: if input.button_down {
                self.click_magnitude
            } else {
                0.0
            },
            speed,
            roughness,
        }
    }

    pub fn reset(&mut self) {
        self.last_position = None;
        self.ticks_since_move = 0;
        self.speed = 0.0;
    }
}

fn finite_or_zero(value: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

fn non_negative(value: f32) -> f32 {
    finite_or_zero(value).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pressed(pressure: f32) -> StimulusSample {
        StimulusSample {
            button_down: pressure > 0.0,
            pressure,
            ..StimulusSample::default()
        }
    }

    #[test]
    fn sa_current_follows_the_button() {
        let mut encoder = StimulusEncoder::new(EncoderConfig::default());
        assert_eq!(encoder.encode(&pressed(12.0))[0], 12.0);
        assert_eq!(encoder.encode(&pressed(12.0))[0], 12.0);
        assert_eq!(encoder.encode(&pressed(0.0))[0], 0.0);
    }

    #[test]
    fn click_current_holds_for_exactly_three_ticks() {
        let mut encoder = StimulusEncoder::new(EncoderConfig::default());
        let clicks: Vec<f32> = (0..8).map(|_| encoder.encode(&pressed(12.0))[2]).collect();
        assert_eq!(clicks, vec![40.0, 40.0, 40.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn small_deltas_are_scaled_not_clipped() {
        let mut encoder = StimulusEncoder::new(EncoderConfig::default());
        let current = encoder.encode(&pressed(0.25))[2];
        assert_relative_eq!(current, 25.0);
    }

    #[test]
    fn release_retriggers_the_click_window() {
        let mut encoder = StimulusEncoder::new(EncoderConfig::default());
        for _ in 0..10 {
            encoder.encode(&pressed(12.0));
        }
        let clicks: Vec<f32> = (0..4).map(|_| encoder.encode(&pressed(0.0))[2]).collect();
        assert_eq!(clicks, vec![40.0, 40.0, 40.0, 0.0]);
    }

    #[test]
    fn new_delta_inside_window_restarts_it() {
        let mut encoder = StimulusEncoder::new(EncoderConfig::default());
        assert_eq!(encoder.encode(&pressed(12.0))[2], 40.0);
        assert_eq!(encoder.encode(&pressed(12.0))[2], 40.0);
        assert_eq!(encoder.encode(&pressed(0.0))[2], 40.0);
        assert_eq!(encoder.encode(&pressed(0.0))[2], 40.0);
        assert_eq!(encoder.encode(&pressed(0.0))[2], 40.0);
        assert_eq!(encoder.encode(&pressed(0.0))[2], 0.0);
    }

    #[test]
    fn motion_current_scales_and_clips() {
        let mut encoder = StimulusEncoder::new(EncoderConfig::default());
        let mut sample = StimulusSample {
            speed: 1000.0,
            roughness: 0.5,
            ..StimulusSample::default()
        };
        assert_relative_eq!(encoder.encode(&sample)[1], 10.0);

        sample.speed = 1.0e6;
        assert_eq!(encoder.encode(&sample)[1], 30.0);

        sample.speed = 0.0;
        assert_eq!(encoder.encode(&sample)[1], 0.0);
    }

    #[test]
    fn bad_inputs_are_clamped() {
        let mut encoder = StimulusEncoder::new(EncoderConfig::default());
        let sample = StimulusSample {
            pressure: -5.0,
            speed: f32::NAN,
            roughness: 4.0,
            ..StimulusSample::default()
        };
        assert_eq!(encoder.encode(&sample), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn reset_clears_pending_click() {
        let mut encoder = StimulusEncoder::new(EncoderConfig::default());
        encoder.encode(&pressed(12.0));
        encoder.reset();
        assert_eq!(encoder.encode(&pressed(0.0)), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn tracker_reports_speed_in_pixels_per_second() {
        let mut tracker = PointerTracker::new(&HapticConfig::default());
        tracker.sample(PointerInput::new(0.0, 0.0, true), 0.5);
        let sample = tracker.sample(PointerInput::new(3.0, 4.0, true), 0.5);
        assert_relative_eq!(sample.speed, 5000.0);
        assert_eq!(sample.pressure, 12.0);
        assert_eq!(sample.roughness, 0.5);
    }

    #[test]
    fn tracker_spreads_sparse_updates_over_elapsed_ticks() {
        let mut tracker = PointerTracker::new(&HapticConfig::default());
        tracker.sample(PointerInput::new(0.0, 0.0, true), 1.0);
        for _ in 0..9 {
            tracker.sample(PointerInput::new(0.0, 0.0, true), 1.0);
        }
        let sample = tracker.sample(PointerInput::new(10.0, 0.0, true), 1.0);
        assert_relative_eq!(sample.speed, 1000.0);
    }

    #[test]
    fn tracker_stops_after_idle_period() {
        let mut tracker = PointerTracker::new(&HapticConfig::default());
        tracker.sample(PointerInput::new(0.0, 0.0, true), 1.0);
        tracker.sample(PointerInput::new(1.0, 0.0, true), 1.0);
        for _ in 0..19 {
            assert!(tracker.sample(PointerInput::new(1.0, 0.0, true), 1.0).speed > 0.0);
        }
        assert_eq!(tracker.sample(PointerInput::new(1.0, 0.0, true), 1.0).speed, 0.0);
    }

    #[test]
    fn hovering_produces_no_speed() {
        let mut tracker = PointerTracker::new(&HapticConfig::default());
        tracker.sample(PointerInput::new(0.0, 0.0, false), 1.0);
        let sample = tracker.sample(PointerInput::new(50.0, 0.0, false), 1.0);
        assert_eq!(sample.speed, 0.0);
        assert_eq!(sample.pressure, 0.0);
    }

    #[test]
    fn hover_speed_does_not_leak_into_a_still_press() {
        let mut tracker = PointerTracker::new(&HapticConfig::default());
        for i in 0..10 {
            tracker.sample(PointerInput::new(i as f32 * 5.0, 0.0, false), 1.0);
        }
        let sample = tracker.sample(PointerInput::new(45.0, 0.0, true), 1.0);
        assert_eq!(sample.speed, 0.0);
        assert_eq!(sample.pressure, 12.0);
    }
}
