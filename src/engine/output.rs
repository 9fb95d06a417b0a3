//! Playback sinks: where finished chime buffers go.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::{Consumer, Producer, RingBuffer};

use crate::engine::voice::{VoiceCommand, VoiceMixer};
use crate::error::{Error, Result};
use crate::synth::PcmBuffer;

/// Capacity of the scheduling thread → audio callback command ring.
const COMMAND_RING_CAPACITY: usize = 256;
/// Capacity of the audio callback → scheduling thread ring of spent buffers.
const SPENT_RING_CAPACITY: usize = 256;

/// Sample rate and channel layout buffers must be rendered in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputFormat {
    pub sample_rate: f64,
    pub channels: usize,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            channels: 2,
        }
    }
}

/// A pool of playback voices, driven from the scheduling thread.
///
/// Mirrors a player-node API: buffers queue behind the one a voice is
/// playing (a short, bounded queue), and a voice must be started once
/// before it makes sound. A started voice stays
/// started (rendering silence when idle) until stopped.
pub trait PlaybackSink {
    fn format(&self) -> OutputFormat;

    fn voice_count(&self) -> usize;

    /// Queue `buffer` on `voice`.
    fn schedule(&mut self, voice: usize, buffer: PcmBuffer);

    fn is_playing(&self, voice: usize) -> bool;

    fn play(&mut self, voice: usize);

    /// Halt `voice` immediately, discarding queued audio.
    fn stop(&mut self, voice: usize);

    /// Free buffers the sink has finished with. Returns how many.
    fn reclaim(&mut self) -> usize {
        0
    }
}

/// Scheduling-thread end of the voice command ring.
///
/// Tracks which voices it has started. A voice only counts as playing once
/// its `Play` command is actually in the ring, so a dropped command is
/// retried on the next dispatch.
struct VoiceControl {
    commands: Producer<VoiceCommand>,
    playing: Vec<bool>,
}

impl VoiceControl {
    fn new(commands: Producer<VoiceCommand>, voice_count: usize) -> Self {
        Self {
            commands,
            playing: vec![false; voice_count],
        }
    }

    fn send(&mut self, cmd: VoiceCommand) -> bool {
        if self.commands.push(cmd).is_err() {
            tracing::warn!("voice command ring full, dropping command");
            return false;
        }
        true
    }

    fn play(&mut self, voice: usize) {
        if voice < self.playing.len() && self.send(VoiceCommand::Play { voice }) {
            self.playing[voice] = true;
        }
    }

    fn stop(&mut self, voice: usize) {
        if voice < self.playing.len() && self.send(VoiceCommand::Stop { voice }) {
            self.playing[voice] = false;
        }
    }

    fn is_playing(&self, voice: usize) -> bool {
        self.playing.get(voice).copied().unwrap_or(false)
    }
}

/// Default output device via cpal.
///
/// The [`VoiceMixer`] lives inside the stream callback; this side only
/// pushes [`VoiceCommand`]s, tracks which voices it has started and frees
/// the buffers the callback hands back.
pub struct CpalOutput {
    _stream: cpal::Stream,
    control: VoiceControl,
    spent: Consumer<PcmBuffer>,
    format: OutputFormat,
}

impl CpalOutput {
    /// Open the default output device with `voice_count` voices.
    ///
    /// When `tap` is given, the first channel of every rendered frame is
    /// pushed into it (dropping samples when full) for visualisation.
    pub fn open(voice_count: usize, tap: Option<Producer<f32>>) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::EngineUnavailable("no default output device available".into()))?;
        let config = device.default_output_config()?;

        let format = OutputFormat {
            sample_rate: config.sample_rate().0 as f64,
            channels: config.channels() as usize,
        };
        let channels = format.channels;

        let (commands, command_rx) = RingBuffer::<VoiceCommand>::new(COMMAND_RING_CAPACITY);
        let (spent_tx, spent) = RingBuffer::<PcmBuffer>::new(SPENT_RING_CAPACITY);
        let mut mixer = VoiceMixer::new(voice_count, command_rx, spent_tx);
        let mut tap = tap;

        let stream = device.build_output_stream(
            &config.into(),
            move |data: &mut [f32], _| {
                mixer.render_block(data, channels);

                if let Some(tap) = tap.as_mut() {
                    for frame in data.chunks(channels) {
                        if tap.push(frame[0]).is_err() {
                            break;
                        }
                    }
                }
            },
            |err| tracing::error!(%err, "audio stream error"),
            None,
        )?;
        stream.play()?;

        tracing::debug!(
            sample_rate = format.sample_rate,
            channels = format.channels,
            voice_count,
            "audio output started"
        );

        Ok(Self {
            _stream: stream,
            control: VoiceControl::new(commands, voice_count),
            spent,
            format,
        })
    }
}

impl PlaybackSink for CpalOutput {
    fn format(&self) -> OutputFormat {
        self.format
    }

    fn voice_count(&self) -> usize {
        self.control.playing.len()
    }

    fn schedule(&mut self, voice: usize, buffer: PcmBuffer) {
        self.control.send(VoiceCommand::Schedule { voice, buffer });
    }

    fn is_playing(&self, voice: usize) -> bool {
        self.control.is_playing(voice)
    }

    fn play(&mut self, voice: usize) {
        self.control.play(voice);
    }

    fn stop(&mut self, voice: usize) {
        self.control.stop(voice);
    }

    fn reclaim(&mut self) -> usize {
        let mut freed = 0;
        while self.spent.pop().is_ok() {
            freed += 1;
        }
        freed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn play_counts_only_once_sent() {
        let (tx, mut rx) = RingBuffer::new(1);
        let mut control = VoiceControl::new(tx, 2);

        control.play(0);
        assert!(control.is_playing(0));

        // Ring is full: the command is lost, so the voice is not started
        control.play(1);
        assert!(!control.is_playing(1));

        assert!(matches!(rx.pop(), Ok(VoiceCommand::Play { voice: 0 })));
        control.play(1);
        assert!(control.is_playing(1));
    }

    #[test]
    fn stop_kept_playing_when_dropped() {
        let (tx, mut rx) = RingBuffer::new(1);
        let mut control = VoiceControl::new(tx, 1);
        control.play(0);

        control.stop(0);
        assert!(control.is_playing(0));

        let _ = rx.pop();
        control.stop(0);
        assert!(!control.is_playing(0));
    }

    #[test]
    fn out_of_range_voice_sends_nothing() {
        let (tx, rx) = RingBuffer::new(4);
        let mut control = VoiceControl::new(tx, 1);
        control.play(3);
        control.stop(3);
        assert!(!control.is_playing(3));
        assert_eq!(rx.slots(), 0);
    }
}
