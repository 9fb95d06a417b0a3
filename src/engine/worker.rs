//! Background synthesis thread.
//!
//! The worker owns the timer wheel and the synthesizer. It never touches
//! voices or the note map: finished buffers go back to the scheduling thread
//! through a single-producer/single-consumer ring, tagged with the timer key
//! that produced them.

use std::{
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use rtrb::{Producer, PushError};

use crate::engine::output::OutputFormat;
use crate::engine::timer::{TimerId, TimerWheel};
use crate::error::{Error, Result};
use crate::scene::NodeId;
use crate::synth::{ChimeSynth, PcmBuffer};

/// What a rendered buffer was produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKey {
    /// Repeating note bound to a live node
    Note(NodeId),
    /// The ambient repeating chime
    Continuous,
    /// A single tap chime
    OneShot,
}

/// A finished buffer on its way back to the scheduling thread.
#[derive(Debug)]
pub struct RenderedChime {
    pub source: TimerKey,
    pub buffer: PcmBuffer,
}

#[derive(Debug, Clone, Copy)]
struct ChimeJob {
    key: TimerKey,
    duration: f64,
}

pub(crate) enum WorkerCommand {
    Start {
        id: TimerId,
        key: TimerKey,
        interval: Duration,
        duration: f64,
    },
    Cancel(TimerId),
    OneShot {
        duration: f64,
    },
    Shutdown,
}

pub(crate) struct SynthWorker {
    tx: Sender<WorkerCommand>,
    handle: Option<JoinHandle<()>>,
}

impl SynthWorker {
    pub fn spawn(
        synth: ChimeSynth,
        format: OutputFormat,
        handoff: Producer<RenderedChime>,
    ) -> Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let handle = thread::Builder::new()
            .name("chime-synth".into())
            .spawn(move || WorkerLoop::new(synth, format, handoff).run(rx))
            .map_err(|err| Error::EngineUnavailable(format!("failed to spawn synth worker: {err}")))?;

        Ok(Self {
            tx,
            handle: Some(handle),
        })
    }

    pub fn send(&self, cmd: WorkerCommand) {
        if self.tx.send(cmd).is_err() {
            tracing::warn!("synth worker is gone, command dropped");
        }
    }

    /// Stop the thread and wait for it. Timers die with it.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.tx.send(WorkerCommand::Shutdown);
            if handle.join().is_err() {
                tracing::error!("synth worker panicked");
            }
        }
    }
}

impl Drop for SynthWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct WorkerLoop {
    synth: ChimeSynth,
    format: OutputFormat,
    handoff: Producer<RenderedChime>,
    timers: TimerWheel<ChimeJob>,
}

impl WorkerLoop {
    fn new(synth: ChimeSynth, format: OutputFormat, handoff: Producer<RenderedChime>) -> Self {
        Self {
            synth,
            format,
            handoff,
            timers: TimerWheel::new(),
        }
    }

    fn run(mut self, rx: Receiver<WorkerCommand>) {
        tracing::debug!("synth worker started");
        loop {
            let cmd = match self.timers.next_deadline() {
                Some(deadline) => {
                    let now = Instant::now();
                    if deadline <= now {
                        None
                    } else {
                        match rx.recv_timeout(deadline - now) {
                            Ok(cmd) => Some(cmd),
                            Err(RecvTimeoutError::Timeout) => None,
                            Err(RecvTimeoutError::Disconnected) => break,
                        }
                    }
                }
                None => match rx.recv() {
                    Ok(cmd) => Some(cmd),
                    Err(_) => break,
                },
            };

            match cmd {
                Some(WorkerCommand::Start {
                    id,
                    key,
                    interval,
                    duration,
                }) => {
                    // First firing is immediate
                    self.timers
                        .insert(id, Instant::now(), interval, ChimeJob { key, duration });
                }
                Some(WorkerCommand::Cancel(id)) => {
                    self.timers.cancel(id);
                }
                Some(WorkerCommand::OneShot { duration }) => {
                    self.render(ChimeJob {
                        key: TimerKey::OneShot,
                        duration,
                    });
                }
                Some(WorkerCommand::Shutdown) => break,
                None => {}
            }

            for (_, job) in self.timers.pop_due(Instant::now()) {
                self.render(job);
            }
        }
        self.timers.clear();
        tracing::debug!("synth worker stopped");
    }

    fn render(&mut self, job: ChimeJob) {
        let OutputFormat {
            sample_rate,
            channels,
        } = self.format;
        let buffer = match self.synth.synthesize(job.duration, sample_rate, channels) {
            Ok(buffer) => buffer,
            Err(err) => {
                tracing::warn!(%err, source = ?job.key, "chime synthesis failed");
                return;
            }
        };

        let rendered = RenderedChime {
            source: job.key,
            buffer,
        };
        if let Err(PushError::Full(dropped)) = self.handoff.push(rendered) {
            tracing::warn!(source = ?dropped.source, "chime handoff full, dropping buffer");
        }
    }
}
