use std::{collections::HashMap, time::Duration};

use rtrb::{Consumer, RingBuffer};

use crate::config::ChimeConfig;
use crate::engine::output::{CpalOutput, OutputFormat, PlaybackSink};
use crate::engine::timer::TimerId;
use crate::engine::worker::{RenderedChime, SynthWorker, TimerKey, WorkerCommand};
use crate::error::Result;
use crate::scene::NodeId;
use crate::synth::ChimeSynth;

/// The audio side of the effect coordinator.
///
/// One repeating note per node id. `start_note` is idempotent and
/// `stop_note` never cuts audio that has already been handed to a voice.
pub trait NotePlayer {
    /// Start repeating chimes for `id`, every `interval` (or the default).
    fn start_note(&mut self, id: NodeId, interval: Option<Duration>);

    /// Stop repeating chimes for `id`. Unknown ids are ignored.
    fn stop_note(&mut self, id: NodeId);

    /// Move finished audio onto voices. Called once per frame from the
    /// scheduling thread.
    fn pump(&mut self) {}
}

struct Output {
    sink: Box<dyn PlaybackSink>,
    worker: SynthWorker,
    handoff: Consumer<RenderedChime>,
}

/// Voice pool scheduler.
///
/// Lives on the scheduling thread. Timers run on a background synthesis
/// worker; their buffers come back through a ring drained by [`pump`], which
/// assigns each one to the next voice round-robin. The note map and the
/// voice index are only touched here.
///
/// Without an output (engine unavailable) every operation still keeps the
/// note bookkeeping exact; it just never makes sound.
///
/// [`pump`]: ChimeScheduler::pump
pub struct ChimeScheduler {
    config: ChimeConfig,
    notes: HashMap<NodeId, TimerId>,
    continuous: Option<TimerId>,
    next_timer: u64,
    next_voice: usize,
    output: Option<Output>,
}

impl ChimeScheduler {
    /// Build a scheduler feeding `sink`, spawning the synthesis worker.
    ///
    /// The sink's own voice count decides the round-robin; `pool_size` is
    /// only what [`CpalOutput`] is opened with. A mismatch is logged.
    pub fn new(config: ChimeConfig, sink: Box<dyn PlaybackSink>) -> Result<Self> {
        config.validate()?;
        if sink.voice_count() != config.pool_size {
            tracing::warn!(
                pool_size = config.pool_size,
                voices = sink.voice_count(),
                "sink voice count differs from configured pool size, using the sink's"
            );
        }

        let (producer, handoff) = RingBuffer::new(config.handoff_capacity);
        let synth = ChimeSynth::new(config.seed);
        let worker = SynthWorker::spawn(synth, sink.format(), producer)?;

        Ok(Self {
            config,
            notes: HashMap::new(),
            continuous: None,
            next_timer: 0,
            next_voice: 0,
            output: Some(Output {
                sink,
                worker,
                handoff,
            }),
        })
    }

    /// A scheduler with no audio output. Bookkeeping only.
    pub fn silent(config: ChimeConfig) -> Self {
        Self {
            config,
            notes: HashMap::new(),
            continuous: None,
            next_timer: 0,
            next_voice: 0,
            output: None,
        }
    }

    /// Open the default audio device, degrading to [`silent`] on any failure.
    ///
    /// [`silent`]: ChimeScheduler::silent
    pub fn with_default_output(config: ChimeConfig) -> Self {
        Self::with_tap(config, None)
    }

    /// Like [`with_default_output`], also mirroring the mix into `tap`.
    ///
    /// [`with_default_output`]: ChimeScheduler::with_default_output
    pub fn with_tap(config: ChimeConfig, tap: Option<rtrb::Producer<f32>>) -> Self {
        let opened = CpalOutput::open(config.pool_size, tap)
            .and_then(|out| Self::new(config.clone(), Box::new(out)));

        match opened {
            Ok(scheduler) => scheduler,
            Err(err) => {
                tracing::warn!(%err, "audio engine unavailable, continuing silently");
                Self::silent(config)
            }
        }
    }

    pub fn config(&self) -> &ChimeConfig {
        &self.config
    }

    pub fn is_silent(&self) -> bool {
        self.output.is_none()
    }

    /// Format of the active output, `None` when silent.
    pub fn output_format(&self) -> Option<OutputFormat> {
        self.output.as_ref().map(|o| o.sink.format())
    }

    pub fn is_note_active(&self, id: NodeId) -> bool {
        self.notes.contains_key(&id)
    }

    pub fn active_notes(&self) -> usize {
        self.notes.len()
    }

    pub fn is_continuous(&self) -> bool {
        self.continuous.is_some()
    }

    /// Start a repeating note for `id`. A second start for a live id is a no-op.
    ///
    /// A missing or zero `interval` uses the configured note interval.
    pub fn start_note(&mut self, id: NodeId, interval: Option<Duration>) {
        if self.notes.contains_key(&id) {
            return;
        }
        // A zero period would spin the worker
        let interval = interval
            .filter(|i| !i.is_zero())
            .unwrap_or_else(|| self.default_interval());
        let timer = self.arm(TimerKey::Note(id), interval);
        self.notes.insert(id, timer);
        tracing::trace!(%id, ?interval, "note started");
    }

    /// Cancel `id`'s timer. Audio already handed off keeps playing.
    pub fn stop_note(&mut self, id: NodeId) {
        if let Some(timer) = self.notes.remove(&id) {
            self.disarm(timer);
            tracing::trace!(%id, "note stopped");
        }
    }

    /// Start the ambient chime, not tied to any node.
    pub fn start_continuous(&mut self) {
        if self.continuous.is_some() {
            return;
        }
        let interval = self.default_interval();
        self.continuous = Some(self.arm(TimerKey::Continuous, interval));
    }

    /// Stop the ambient chime and silence every playing voice.
    pub fn stop_continuous(&mut self) {
        let Some(timer) = self.continuous.take() else {
            return;
        };
        self.disarm(timer);

        if let Some(output) = self.output.as_mut() {
            for voice in 0..output.sink.voice_count() {
                if output.sink.is_playing(voice) {
                    output.sink.stop(voice);
                }
            }
        }
    }

    /// Fire-and-forget single chime of `duration` seconds.
    pub fn play_one_shot(&mut self, duration: f64) {
        if let Some(output) = self.output.as_ref() {
            output.worker.send(WorkerCommand::OneShot { duration });
        }
    }

    /// Single chime using the configured tap length.
    pub fn play_chime(&mut self) {
        self.play_one_shot(self.config.one_shot_duration);
    }

    /// Drain finished buffers onto voices. Returns how many were dispatched.
    pub fn pump(&mut self) -> usize {
        let Some(output) = self.output.as_mut() else {
            return 0;
        };
        output.sink.reclaim();

        let voice_count = output.sink.voice_count();
        if voice_count == 0 {
            return 0;
        }

        let mut dispatched = 0;
        while let Ok(rendered) = output.handoff.pop() {
            let voice = self.next_voice % voice_count;
            self.next_voice = (self.next_voice + 1) % voice_count;
            tracing::trace!(source = ?rendered.source, voice, "chime dispatched");

            output.sink.schedule(voice, rendered.buffer);
            if !output.sink.is_playing(voice) {
                output.sink.play(voice);
            }
            dispatched += 1;
        }
        dispatched
    }

    /// Cancel every timer and stop the worker.
    pub fn shutdown(&mut self) {
        let notes: Vec<NodeId> = self.notes.keys().copied().collect();
        for id in notes {
            self.stop_note(id);
        }
        if let Some(timer) = self.continuous.take() {
            self.disarm(timer);
        }
        if let Some(mut output) = self.output.take() {
            output.worker.shutdown();
        }
    }

    fn default_interval(&self) -> Duration {
        Duration::from_secs_f64(self.config.note_interval)
    }

    fn arm(&mut self, key: TimerKey, interval: Duration) -> TimerId {
        self.next_timer += 1;
        let id = TimerId(self.next_timer);
        if let Some(output) = self.output.as_ref() {
            output.worker.send(WorkerCommand::Start {
                id,
                key,
                interval,
                duration: self.config.note_duration,
            });
        }
        id
    }

    fn disarm(&mut self, timer: TimerId) {
        if let Some(output) = self.output.as_ref() {
            output.worker.send(WorkerCommand::Cancel(timer));
        }
    }
}

impl NotePlayer for ChimeScheduler {
    fn start_note(&mut self, id: NodeId, interval: Option<Duration>) {
        ChimeScheduler::start_note(self, id, interval);
    }

    fn stop_note(&mut self, id: NodeId) {
        ChimeScheduler::stop_note(self, id);
    }

    fn pump(&mut self) {
        ChimeScheduler::pump(self);
    }
}

impl Drop for ChimeScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::PcmBuffer;
    use std::{
        sync::{Arc, Mutex},
        thread,
        time::Instant,
    };

    #[derive(Debug, Clone, PartialEq)]
    enum SinkEvent {
        Schedule { voice: usize, frames: usize },
        Play(usize),
        Stop(usize),
    }

    /// Records sink calls so tests can inspect them after the scheduler has
    /// taken ownership.
    #[derive(Clone, Default)]
    struct RecordingSink {
        events: Arc<Mutex<Vec<SinkEvent>>>,
        playing: Arc<Mutex<Vec<bool>>>,
        reclaims: Arc<Mutex<usize>>,
    }

    impl RecordingSink {
        fn new(voices: usize) -> Self {
            Self {
                events: Arc::default(),
                playing: Arc::new(Mutex::new(vec![false; voices])),
                reclaims: Arc::default(),
            }
        }

        fn events(&self) -> Vec<SinkEvent> {
            self.events.lock().unwrap().clone()
        }

        fn scheduled_voices(&self) -> Vec<usize> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    SinkEvent::Schedule { voice, .. } => Some(voice),
                    _ => None,
                })
                .collect()
        }
    }

    impl PlaybackSink for RecordingSink {
        fn format(&self) -> OutputFormat {
            OutputFormat {
                sample_rate: 8_000.0,
                channels: 2,
            }
        }

        fn voice_count(&self) -> usize {
            self.playing.lock().unwrap().len()
        }

        fn schedule(&mut self, voice: usize, buffer: PcmBuffer) {
            self.events.lock().unwrap().push(SinkEvent::Schedule {
                voice,
                frames: buffer.frames(),
            });
        }

        fn is_playing(&self, voice: usize) -> bool {
            self.playing.lock().unwrap()[voice]
        }

        fn play(&mut self, voice: usize) {
            self.playing.lock().unwrap()[voice] = true;
            self.events.lock().unwrap().push(SinkEvent::Play(voice));
        }

        fn stop(&mut self, voice: usize) {
            self.playing.lock().unwrap()[voice] = false;
            self.events.lock().unwrap().push(SinkEvent::Stop(voice));
        }

        fn reclaim(&mut self) -> usize {
            *self.reclaims.lock().unwrap() += 1;
            0
        }
    }

    fn scheduler(sink: &RecordingSink) -> ChimeScheduler {
        let config = ChimeConfig::default()
            .with_note_duration(0.05)
            .with_seed(11);
        ChimeScheduler::new(config, Box::new(sink.clone())).unwrap()
    }

    /// Pump until `done` holds or two seconds pass.
    fn pump_until(sched: &mut ChimeScheduler, mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            sched.pump();
            if done() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        false
    }

    #[test]
    fn note_repeats_round_robin() {
        let sink = RecordingSink::new(4);
        let mut sched = scheduler(&sink);

        sched.start_note(NodeId(1), Some(Duration::from_millis(5)));
        assert!(pump_until(&mut sched, || sink.scheduled_voices().len() >= 6));
        sched.stop_note(NodeId(1));

        let voices = sink.scheduled_voices();
        for (i, voice) in voices.iter().enumerate() {
            assert_eq!(*voice, i % 4);
        }
        // 0.05 s at 8 kHz
        assert!(sink
            .events()
            .iter()
            .all(|e| !matches!(e, SinkEvent::Schedule { frames, .. } if *frames != 400)));
    }

    #[test]
    fn idle_voice_is_started_once() {
        let sink = RecordingSink::new(2);
        let mut sched = scheduler(&sink);

        sched.start_note(NodeId(3), Some(Duration::from_millis(5)));
        assert!(pump_until(&mut sched, || sink.scheduled_voices().len() >= 5));
        sched.stop_note(NodeId(3));

        let plays: Vec<_> = sink
            .events()
            .into_iter()
            .filter(|e| matches!(e, SinkEvent::Play(_)))
            .collect();
        assert_eq!(plays, vec![SinkEvent::Play(0), SinkEvent::Play(1)]);
    }

    #[test]
    fn start_is_idempotent() {
        let sink = RecordingSink::new(4);
        let mut sched = scheduler(&sink);

        sched.start_note(NodeId(7), None);
        sched.start_note(NodeId(7), None);
        assert_eq!(sched.active_notes(), 1);

        sched.stop_note(NodeId(7));
        assert_eq!(sched.active_notes(), 0);
        assert!(!sched.is_note_active(NodeId(7)));
    }

    #[test]
    fn stop_unknown_is_noop() {
        let sink = RecordingSink::new(4);
        let mut sched = scheduler(&sink);
        sched.stop_note(NodeId(99));
        sched.stop_note(NodeId(99));
        assert_eq!(sched.active_notes(), 0);
    }

    #[test]
    fn stopped_note_goes_quiet() {
        let sink = RecordingSink::new(4);
        let mut sched = scheduler(&sink);

        sched.start_note(NodeId(5), Some(Duration::from_millis(5)));
        assert!(pump_until(&mut sched, || !sink.scheduled_voices().is_empty()));
        sched.stop_note(NodeId(5));

        // Let anything in flight land, then expect silence
        thread::sleep(Duration::from_millis(50));
        sched.pump();
        let settled = sink.scheduled_voices().len();
        thread::sleep(Duration::from_millis(50));
        sched.pump();
        assert_eq!(sink.scheduled_voices().len(), settled);
        // Stopping a note never halts voices
        assert!(!sink.events().iter().any(|e| matches!(e, SinkEvent::Stop(_))));
    }

    #[test]
    fn stop_continuous_halts_voices() {
        let sink = RecordingSink::new(4);
        let mut sched = scheduler(&sink);

        sched.start_continuous();
        sched.start_continuous();
        assert!(sched.is_continuous());
        assert!(pump_until(&mut sched, || !sink.scheduled_voices().is_empty()));

        sched.stop_continuous();
        assert!(!sched.is_continuous());
        assert!(sink.events().contains(&SinkEvent::Stop(0)));
    }

    #[test]
    fn one_shot_plays_once() {
        let sink = RecordingSink::new(4);
        let mut sched = scheduler(&sink);

        sched.play_one_shot(0.1);
        assert!(pump_until(&mut sched, || !sink.scheduled_voices().is_empty()));
        assert_eq!(
            sink.events()[0],
            SinkEvent::Schedule {
                voice: 0,
                frames: 800
            }
        );
    }

    #[test]
    fn silent_mode_tracks_notes() {
        let mut sched = ChimeScheduler::silent(ChimeConfig::default());
        assert!(sched.is_silent());

        sched.start_note(NodeId(1), None);
        sched.start_note(NodeId(2), None);
        sched.start_continuous();
        sched.play_chime();
        assert_eq!(sched.pump(), 0);
        assert_eq!(sched.active_notes(), 2);

        sched.stop_note(NodeId(1));
        sched.stop_continuous();
        assert_eq!(sched.active_notes(), 1);
        assert!(!sched.is_continuous());
    }

    #[test]
    fn shutdown_clears_timers() {
        let sink = RecordingSink::new(4);
        let mut sched = scheduler(&sink);
        sched.start_note(NodeId(1), None);
        sched.start_continuous();

        sched.shutdown();
        assert_eq!(sched.active_notes(), 0);
        assert!(!sched.is_continuous());
        assert!(sched.is_silent());
    }

    #[test]
    fn full_handoff_drops_until_pumped() {
        let sink = RecordingSink::new(4);
        let config = ChimeConfig::default()
            .with_note_duration(0.01)
            .with_handoff_capacity(1)
            .with_seed(3);
        let mut sched = ChimeScheduler::new(config, Box::new(sink.clone())).unwrap();

        sched.start_note(NodeId(1), Some(Duration::from_millis(5)));
        // Many firings while nobody drains; only the ring's worth survives
        thread::sleep(Duration::from_millis(100));
        let first = sched.pump();
        assert!((1..=2).contains(&first), "dispatched {first}");

        // Once drained again the note keeps flowing
        assert!(pump_until(&mut sched, || sink.scheduled_voices().len() >= first + 3));
        sched.stop_note(NodeId(1));
    }

    #[test]
    fn sink_voice_count_drives_round_robin() {
        let sink = RecordingSink::new(2);
        let config = ChimeConfig::default()
            .with_pool_size(4)
            .with_note_duration(0.05);
        let mut sched = ChimeScheduler::new(config, Box::new(sink.clone())).unwrap();

        sched.start_note(NodeId(2), Some(Duration::from_millis(5)));
        assert!(pump_until(&mut sched, || sink.scheduled_voices().len() >= 5));
        sched.stop_note(NodeId(2));

        assert!(sink.scheduled_voices().iter().all(|&v| v < 2));
    }

    #[test]
    fn pump_reclaims_spent_buffers() {
        let sink = RecordingSink::new(4);
        let mut sched = scheduler(&sink);
        sched.pump();
        sched.pump();
        assert_eq!(*sink.reclaims.lock().unwrap(), 2);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let sink = RecordingSink::new(4);
        let config = ChimeConfig::default().with_note_duration(-1.0);
        assert!(ChimeScheduler::new(config, Box::new(sink)).is_err());
    }
}
