use std::collections::VecDeque;

use rtrb::{Consumer, Producer};

use crate::synth::PcmBuffer;

/// Buffers allowed to wait behind the one playing. With 0.35 s notes this
/// keeps a voice at most ~0.7 s behind the moment a note fired.
pub const MAX_WAITING: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Stopped, // Silent, queue empty
    Playing, // Consuming its queue (silence while the queue is empty)
}

/// Commands sent from the scheduling thread to the audio callback.
#[derive(Debug)]
pub enum VoiceCommand {
    /// Append a buffer to a voice's queue
    Schedule { voice: usize, buffer: PcmBuffer },
    Play { voice: usize },
    /// Halt immediately and drop anything queued
    Stop { voice: usize },
}

/// One playback channel: the buffer at the front plays, the rest wait.
///
/// The buffer in progress always plays to its last frame unless the voice
/// is explicitly stopped. Buffers leaving the voice are handed to `retire`
/// rather than dropped, so the audio thread never frees memory.
pub struct Voice {
    state: VoiceState,
    queue: VecDeque<PcmBuffer>,
    /// Frame position inside the buffer at the front of the queue
    cursor: usize,
}

impl Voice {
    pub fn new() -> Self {
        Self {
            state: VoiceState::Stopped,
            queue: VecDeque::with_capacity(MAX_WAITING + 1),
            cursor: 0,
        }
    }

    /// Queue `buffer` behind the one in progress.
    ///
    /// When the waiting slots are full the oldest waiting buffer is retired
    /// to make room. The buffer in progress and the new arrival are kept.
    pub fn schedule(&mut self, buffer: PcmBuffer, mut retire: impl FnMut(PcmBuffer)) {
        if self.queue.len() > MAX_WAITING {
            if let Some(stale) = self.queue.remove(1) {
                retire(stale);
            }
        }
        self.queue.push_back(buffer);
    }

    pub fn play(&mut self) {
        self.state = VoiceState::Playing;
    }

    pub fn stop(&mut self, retire: impl FnMut(PcmBuffer)) {
        self.state = VoiceState::Stopped;
        self.queue.drain(..).for_each(retire);
        self.cursor = 0;
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == VoiceState::Playing
    }

    /// Buffers not yet finished, including the one in progress.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Frames left to play across every queued buffer.
    pub fn backlog_frames(&self) -> usize {
        let total: usize = self.queue.iter().map(PcmBuffer::frames).sum();
        total.saturating_sub(self.cursor)
    }

    /// Add this voice's output into an interleaved block.
    pub fn render_add(
        &mut self,
        out: &mut [f32],
        channels: usize,
        mut retire: impl FnMut(PcmBuffer),
    ) {
        if self.state != VoiceState::Playing || channels == 0 {
            return;
        }

        for frame in out.chunks_mut(channels) {
            let Some(current) = self.queue.front() else {
                return;
            };
            for (ch, sample) in frame.iter_mut().enumerate() {
                *sample += current.sample(ch, self.cursor);
            }

            self.cursor += 1;
            if self.cursor >= current.frames() {
                self.cursor = 0;
                if let Some(done) = self.queue.pop_front() {
                    retire(done);
                }
            }
        }
    }
}

impl Default for Voice {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed pool of voices living on the audio thread.
///
/// Drains its command ring at the top of every block, then mixes all
/// playing voices. Finished and discarded buffers go back out through
/// `spent` to be freed on the scheduling thread.
pub struct VoiceMixer {
    voices: Vec<Voice>,
    rx: Consumer<VoiceCommand>,
    spent: Producer<PcmBuffer>,
}

impl VoiceMixer {
    pub fn new(
        voice_count: usize,
        rx: Consumer<VoiceCommand>,
        spent: Producer<PcmBuffer>,
    ) -> Self {
        Self {
            voices: (0..voice_count).map(|_| Voice::new()).collect(),
            rx,
            spent,
        }
    }

    /// Render one interleaved block of `channels`-channel audio.
    pub fn render_block(&mut self, out: &mut [f32], channels: usize) {
        while let Ok(cmd) = self.rx.pop() {
            self.apply(cmd);
        }

        out.fill(0.0);
        let spent = &mut self.spent;
        for voice in &mut self.voices {
            voice.render_add(out, channels, |b| retire(spent, b));
        }
        for s in out.iter_mut() {
            *s = s.clamp(-1.0, 1.0);
        }
    }

    pub fn voice(&self, index: usize) -> Option<&Voice> {
        self.voices.get(index)
    }

    fn apply(&mut self, cmd: VoiceCommand) {
        let spent = &mut self.spent;
        match cmd {
            VoiceCommand::Schedule { voice, buffer } => match self.voices.get_mut(voice) {
                Some(v) => v.schedule(buffer, |b| retire(spent, b)),
                None => retire(spent, buffer),
            },
            VoiceCommand::Play { voice } => {
                if let Some(v) = self.voices.get_mut(voice) {
                    v.play();
                }
            }
            VoiceCommand::Stop { voice } => {
                if let Some(v) = self.voices.get_mut(voice) {
                    v.stop(|b| retire(spent, b));
                }
            }
        }
    }
}

/// Send a buffer back for freeing. If the return ring is full the buffer is
/// dropped here; the ring is sized so that only happens when the scheduling
/// thread has stopped draining it.
fn retire(spent: &mut Producer<PcmBuffer>, buffer: PcmBuffer) {
    let _ = spent.push(buffer);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtrb::RingBuffer;

    fn ramp(len: usize, value: f32) -> PcmBuffer {
        PcmBuffer::from_mono(vec![value; len], 48_000.0, 1)
    }

    fn mixer(voices: usize) -> (Producer<VoiceCommand>, Consumer<PcmBuffer>, VoiceMixer) {
        let (tx, rx) = RingBuffer::new(16);
        let (spent_tx, spent_rx) = RingBuffer::new(16);
        (tx, spent_rx, VoiceMixer::new(voices, rx, spent_tx))
    }

    #[test]
    fn stopped_voice_is_silent() {
        let mut voice = Voice::new();
        voice.schedule(ramp(8, 0.5), drop);
        let mut out = vec![0.0; 8];
        voice.render_add(&mut out, 1, drop);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn queued_buffers_play_back_to_back() {
        let mut voice = Voice::new();
        voice.schedule(ramp(3, 0.1), drop);
        voice.schedule(ramp(3, 0.2), drop);
        voice.play();

        let mut out = vec![0.0; 8];
        voice.render_add(&mut out, 1, drop);
        assert_eq!(out, vec![0.1, 0.1, 0.1, 0.2, 0.2, 0.2, 0.0, 0.0]);
        assert_eq!(voice.queued(), 0);
        assert!(voice.is_playing());
    }

    #[test]
    fn buffer_spans_blocks() {
        let mut voice = Voice::new();
        voice.schedule(ramp(6, 0.3), drop);
        voice.play();

        let mut out = vec![0.0; 4];
        voice.render_add(&mut out, 1, drop);
        assert_eq!(voice.queued(), 1);
        assert_eq!(voice.backlog_frames(), 2);
        out.fill(0.0);
        voice.render_add(&mut out, 1, drop);
        assert_eq!(out, vec![0.3, 0.3, 0.0, 0.0]);
    }

    #[test]
    fn mono_buffer_fills_every_output_channel() {
        let mut voice = Voice::new();
        voice.schedule(ramp(2, 0.25), drop);
        voice.play();

        let mut out = vec![0.0; 4];
        voice.render_add(&mut out, 2, drop);
        assert_eq!(out, vec![0.25; 4]);
    }

    #[test]
    fn overflow_replaces_oldest_waiting() {
        let mut voice = Voice::new();
        let mut retired = Vec::new();
        voice.schedule(ramp(4, 0.1), |b| retired.push(b));
        voice.play();
        let mut out = vec![0.0; 1];
        voice.render_add(&mut out, 1, |b| retired.push(b));

        voice.schedule(ramp(4, 0.2), |b| retired.push(b));
        voice.schedule(ramp(4, 0.3), |b| retired.push(b));

        // In-progress 0.1 keeps going, stale 0.2 is gone, newest 0.3 waits
        assert_eq!(voice.queued(), 2);
        assert_eq!(retired.len(), 1);
        assert_eq!(retired[0].sample(0, 0), 0.2);

        let mut out = vec![0.0; 7];
        voice.render_add(&mut out, 1, |b| retired.push(b));
        assert_eq!(out, vec![0.1, 0.1, 0.1, 0.3, 0.3, 0.3, 0.3]);
    }

    #[test]
    fn backlog_stays_bounded_under_dense_notes() {
        // Frame counts as at 1 kHz: 350-frame notes, and 10 notes firing
        // every 180 ms over 4 voices is one arrival per ~72 frames.
        const NOTE: usize = 350;
        const ARRIVAL: usize = 72;

        let mut voice = Voice::new();
        voice.play();
        let level = |i: usize| i as f32 * 0.001;
        let mut dropped = 0;
        let mut block = vec![0.0; ARRIVAL];

        for i in 1..=100 {
            voice.schedule(ramp(NOTE, level(i)), |_| dropped += 1);
            assert!(voice.backlog_frames() <= 2 * NOTE);

            block.fill(0.0);
            voice.render_add(&mut block, 1, |_| {});
        }
        assert!(dropped > 0);

        // The last note to arrive is the last one heard
        let mut tail = vec![0.0; 3 * NOTE];
        voice.render_add(&mut tail, 1, |_| {});
        let last = tail.iter().rev().find(|&&s| s != 0.0).copied();
        assert_eq!(last, Some(level(100)));
    }

    #[test]
    fn mixer_applies_commands_and_sums() {
        let (mut tx, _spent, mut mixer) = mixer(2);

        tx.push(VoiceCommand::Schedule {
            voice: 0,
            buffer: ramp(4, 0.25),
        })
        .unwrap();
        tx.push(VoiceCommand::Schedule {
            voice: 1,
            buffer: ramp(4, 0.5),
        })
        .unwrap();
        tx.push(VoiceCommand::Play { voice: 0 }).unwrap();
        tx.push(VoiceCommand::Play { voice: 1 }).unwrap();

        let mut out = vec![0.0; 4];
        mixer.render_block(&mut out, 1);
        assert_eq!(out, vec![0.75; 4]);
    }

    #[test]
    fn finished_buffers_come_back() {
        let (mut tx, mut spent, mut mixer) = mixer(1);
        tx.push(VoiceCommand::Schedule {
            voice: 0,
            buffer: ramp(3, 0.5),
        })
        .unwrap();
        tx.push(VoiceCommand::Play { voice: 0 }).unwrap();

        let mut out = vec![0.0; 2];
        mixer.render_block(&mut out, 1);
        assert!(spent.pop().is_err());

        mixer.render_block(&mut out, 1);
        let done = spent.pop().unwrap();
        assert_eq!(done.frames(), 3);
        assert!(spent.pop().is_err());
    }

    #[test]
    fn stop_drops_queue() {
        let (mut tx, mut spent, mut mixer) = mixer(1);
        for value in [0.5, 0.4] {
            tx.push(VoiceCommand::Schedule {
                voice: 0,
                buffer: ramp(16, value),
            })
            .unwrap();
        }
        tx.push(VoiceCommand::Play { voice: 0 }).unwrap();

        let mut out = vec![0.0; 4];
        mixer.render_block(&mut out, 1);
        tx.push(VoiceCommand::Stop { voice: 0 }).unwrap();
        mixer.render_block(&mut out, 1);

        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(mixer.voice(0).map(Voice::state), Some(VoiceState::Stopped));
        // Both queued buffers are handed back, not freed in the callback
        assert_eq!(spent.slots(), 2);
    }

    #[test]
    fn out_of_range_voice_is_ignored() {
        let (mut tx, mut spent, mut mixer) = mixer(1);
        tx.push(VoiceCommand::Play { voice: 9 }).unwrap();
        tx.push(VoiceCommand::Schedule {
            voice: 9,
            buffer: ramp(2, 0.1),
        })
        .unwrap();
        let mut out = vec![0.0; 2];
        mixer.render_block(&mut out, 1);
        assert!(mixer.voice(9).is_none());
        assert!(spent.pop().is_ok());
    }
}
