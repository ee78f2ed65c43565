use std::sync::{Arc, RwLock};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use tracing::{error, info};

use crate::error::SinkError;
use crate::mixer::Mixer;
use crate::sink::{AudioCommand, AudioSink, Voice};

const COMMAND_QUEUE: usize = 256;

/// Gains the audio thread reads every buffer. Written through a lock so they
/// are never lost to a full command queue.
#[derive(Clone, Copy, Debug)]
struct Gains {
    master: f32,
    texture: Option<f32>,
}

#[derive(Clone)]
struct SharedAudioState {
    gains: Arc<RwLock<Gains>>,
}

/// `cpal` output stream fed from the tick thread.
pub struct AudioEngine {
    shared: SharedAudioState,
    commands: Sender<AudioCommand>,
    _stream: cpal::Stream,
    pub device_name: String,
    pub sample_rate: u32,
}

impl AudioEngine {
    /// Opens the default output device. `source_rate` is the rate the
    /// synthesized buffers were rendered at.
    pub fn new(source_rate: u32) -> Result<Self, SinkError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| SinkError::Unavailable("No default audio output device found".to_owned()))?;
        let device_name = device
            .name()
            .unwrap_or_else(|_| "Unknown output device".to_owned());

        let supported_config = device.default_output_config().map_err(|err| {
            SinkError::Unavailable(format!("Failed to read default output config: {err}"))
        })?;
        let config = supported_config.config();
        let sample_rate = config.sample_rate.0;

        let shared = SharedAudioState {
            gains: Arc::new(RwLock::new(Gains {
                master: 1.0,
                texture: None,
            })),
        };
        let (commands, receiver) = channel::bounded(COMMAND_QUEUE);
        let mixer = Mixer::new(source_rate, sample_rate);

        let stream = match supported_config.sample_format() {
            cpal::SampleFormat::F32 => {
                build_stream::<f32>(&device, &config, shared.clone(), receiver, mixer)?
            }
            cpal::SampleFormat::I16 => {
                build_stream::<i16>(&device, &config, shared.clone(), receiver, mixer)?
            }
            cpal::SampleFormat::U16 => {
                build_stream::<u16>(&device, &config, shared.clone(), receiver, mixer)?
            }
            other => {
                return Err(SinkError::Unavailable(format!(
                    "Unsupported output sample format from audio device: {other:?}"
                )));
            }
        };

        stream
            .play()
            .map_err(|err| SinkError::Unavailable(format!("Failed to start audio stream: {err}")))?;

        info!(device = %device_name, sample_rate, "audio output started");

        Ok(Self {
            shared,
            commands,
            _stream: stream,
            device_name,
            sample_rate,
        })
    }

    fn update_gains(&self, update: impl FnOnce(&mut Gains)) {
        let mut gains = read_copy(&self.shared.gains);
        update(&mut gains);
        write_copy(&self.shared.gains, gains);
    }
}

impl AudioSink for AudioEngine {
    fn submit(&mut self, command: AudioCommand) -> Result<(), SinkError> {
        match command {
            AudioCommand::MasterGain(master) => {
                self.update_gains(|gains| gains.master = master);
                return Ok(());
            }
            AudioCommand::Gain {
                voice: Voice::Texture,
                gain,
            } => {
                self.update_gains(|gains| gains.texture = Some(gain));
                return Ok(());
            }
            AudioCommand::Loop { gain, .. } => {
                self.update_gains(|gains| gains.texture = Some(gain));
            }
            _ => {}
        }

        self.commands.try_send(command).map_err(|err| match err {
            TrySendError::Full(_) => SinkError::Saturated,
            TrySendError::Disconnected(_) => SinkError::Unavailable("audio stream closed".to_owned()),
        })
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    shared: SharedAudioState,
    commands: Receiver<AudioCommand>,
    mut mixer: Mixer,
) -> Result<cpal::Stream, SinkError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let channels = config.channels as usize;
    let gains_handle = shared.gains.clone();

    let stream = device
        .build_output_stream(
            config,
            move |data: &mut [T], _| {
                while let Ok(command) = commands.try_recv() {
                    mixer.apply(command);
                }
                let gains = read_copy(&gains_handle);
                mixer.set_master(gains.master);
                if let Some(texture) = gains.texture {
                    mixer.set_gain(Voice::Texture, texture);
                }
                write_audio_buffer(data, channels, &mut mixer);
            },
            move |err| {
                error!("Audio stream error: {err}");
            },
            None,
        )
        .map_err(|err| SinkError::Unavailable(format!("Failed to build output stream: {err}")))?;

    Ok(stream)
}

fn write_audio_buffer<T>(output: &mut [T], channels: usize, mixer: &mut Mixer)
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    for frame in output.chunks_mut(channels) {
        let sample = T::from_sample(mixer.next_sample());
        for slot in frame.iter_mut() {
            *slot = sample;
        }
    }
}

fn read_copy<T: Copy>(lock: &RwLock<T>) -> T {
    match lock.read() {
        Ok(guard) => *guard,
        Err(poisoned) => *poisoned.into_inner(),
    }
}

fn write_copy<T: Copy>(lock: &RwLock<T>, value: T) {
    match lock.write() {
        Ok(mut guard) => *guard = value,
        Err(poisoned) => *poisoned.into_inner() = value,
    }
}
