//! Error types for the haptic pipeline.
//!
//! Neuron faults are not errors: they are recovered inside the integrator and
//! reported through [`crate::neuron::StepReport`].

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating a [`crate::config::HapticConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// Path that was requested
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field holds a value the pipeline cannot run with
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue {
        /// Dotted field name
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },
}

/// Errors reported by an [`crate::sink::AudioSink`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// No playback device, or the device went away
    #[error("Audio output unavailable: {0}")]
    Unavailable(String),

    /// The handoff queue is full; the command was dropped
    #[error("Audio command queue saturated")]
    Saturated,
}

/// Top-level error for pipeline operations.
#[derive(Error, Debug)]
pub enum HapticError {
    /// Material selector outside `1..=7`
    #[error("Unknown material selector {selector}")]
    UnknownMaterial {
        /// The rejected selector
        selector: u8,
    },

    /// Configuration problem
    #[error(transparent)]
    Config(#[from] ConfigError),
}
