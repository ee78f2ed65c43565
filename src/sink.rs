//! The playback seam.
//!
//! The pipeline never blocks on audio: it hands [`AudioCommand`]s to an
//! [`AudioSink`] and moves on. Buffers are shared, never copied.

use std::fmt;
use std::sync::Arc;

use crate::error::SinkError;

/// Mono PCM at the configured sample rate.
pub type SampleBuffer = Arc<[f32]>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Voice {
    Background,
    Click,
    Texture,
}

impl Voice {
    pub const ALL: [Voice; 3] = [Voice::Background, Voice::Click, Voice::Texture];

    pub fn index(self) -> usize {
        match self {
            Self::Background => 0,
            Self::Click => 1,
            Self::Texture => 2,
        }
    }
}

#[derive(Clone, PartialEq)]
pub enum AudioCommand {
    /// Start a voice. A background trigger while the background voice is
    /// already playing the same buffer keeps it going instead of restarting.
    Trigger {
        voice: Voice,
        buffer: SampleBuffer,
        gain: f32,
    },
    /// Loop a buffer on the texture voice until stopped.
    Loop { buffer: SampleBuffer, gain: f32 },
    Gain { voice: Voice, gain: f32 },
    MasterGain(f32),
    Stop { voice: Voice },
    StopAll,
}

impl fmt::Debug for AudioCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trigger {
                voice,
                buffer,
                gain,
            } => f
                .debug_struct("Trigger")
                .field("voice", voice)
                .field("samples", &buffer.len())
                .field("gain", gain)
                .finish(),
            Self::Loop { buffer, gain } => f
                .debug_struct("Loop")
                .field("samples", &buffer.len())
                .field("gain", gain)
                .finish(),
            Self::Gain { voice, gain } => f
                .debug_struct("Gain")
                .field("voice", voice)
                .field("gain", gain)
                .finish(),
            Self::MasterGain(gain) => f.debug_tuple("MasterGain").field(gain).finish(),
            Self::Stop { voice } => f.debug_struct("Stop").field("voice", voice).finish(),
            Self::StopAll => f.write_str("StopAll"),
        }
    }
}

pub trait AudioSink {
    /// Hands one command to playback. Must not block.
    fn submit(&mut self, command: AudioCommand) -> Result<(), SinkError>;
}

impl<S: AudioSink + ?Sized> AudioSink for Box<S> {
    fn submit(&mut self, command: AudioCommand) -> Result<(), SinkError> {
        (**self).submit(command)
    }
}

/// Discards everything. Used when no playback device is wanted.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl AudioSink for NullSink {
    fn submit(&mut self, _command: AudioCommand) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Keeps every accepted command in order; can be told to fail.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    commands: Vec<AudioCommand>,
    failure: Option<SinkError>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(error: SinkError) -> Self {
        Self {
            commands: Vec::new(),
            failure: Some(error),
        }
    }

    pub fn set_failure(&mut self, failure: Option<SinkError>) {
        self.failure = failure;
    }

    pub fn commands(&self) -> &[AudioCommand] {
        &self.commands
    }

    pub fn take(&mut self) -> Vec<AudioCommand> {
        std::mem::take(&mut self.commands)
    }
}

impl AudioSink for RecordingSink {
    fn submit(&mut self, command: AudioCommand) -> Result<(), SinkError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        self.commands.push(command);
        Ok(())
    }
}
