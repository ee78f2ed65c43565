//! Pointer input to haptic audio through three Izhikevich receptor neurons.
//!
//! A [`PipelineCoordinator`] runs the fixed-tick loop: a [`PointerTracker`]
//! and [`StimulusEncoder`] turn pointer state into receptor currents, the
//! [`NeuronArray`] integrates them, and the [`HapticRenderer`] turns spikes
//! into [`AudioCommand`]s for an [`AudioSink`].

pub mod config;
pub mod encoder;
pub mod error;
pub mod history;
pub mod material;
pub mod mixer;
pub mod neuron;
pub mod pipeline;
pub mod rate;
pub mod renderer;
pub mod sink;
pub mod synth;
pub mod types;

#[cfg(feature = "playback")]
pub mod audio_engine;

pub use config::HapticConfig;
pub use encoder::{PointerTracker, StimulusEncoder};
pub use error::{ConfigError, HapticError, SinkError};
pub use history::SpikeHistory;
pub use material::{Material, MaterialProfile, MaterialTable};
pub use neuron::{NeuronArray, NeuronState, SaAdaptation, StepReport};
pub use pipeline::{Flow, PipelineCommand, PipelineCoordinator, PipelineSnapshot, TickReport};
pub use renderer::HapticRenderer;
pub use sink::{AudioCommand, AudioSink, NullSink, RecordingSink, SampleBuffer, Voice};
pub use types::{NeuronId, PointerInput, SpikeEvent, StimulusSample};
