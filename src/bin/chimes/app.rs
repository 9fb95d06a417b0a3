//! ChimesApp - event loop tying terminal input to the touch effects

use std::time::{Duration, Instant};

use color_eyre::eyre::Result as EyreResult;
use crossterm::event::{
    self, Event, KeyCode, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::{layout::Rect, DefaultTerminal};
use rtrb::{Consumer, RingBuffer};

use touch_chimes::{ChimeConfig, ChimeScheduler, NodeSimulation, SceneConfig, TouchEffects};

use crate::ui::{self, spectrum::SpectrumAnalyzer, Surface};

/// One frame at 30 steps/second
const FRAME: Duration = Duration::from_millis(33);
/// Scope/analysis window in samples
const VIS_BUFFER_SIZE: usize = 1024;
/// Capacity of the audio → UI tap, in windows
const TAP_RING_BLOCKS: usize = 16;
/// Used for the analyzer when no device could be opened
const FALLBACK_SAMPLE_RATE: f32 = 48_000.0;

pub struct ChimesApp {
    effects: TouchEffects<ChimeScheduler>,
    audio_rx: Consumer<f32>,
    audio_buffer: Vec<f32>,
    spectrum: SpectrumAnalyzer,
    /// Where the touch surface was last drawn, for mapping mouse cells
    surface: Surface,
    should_quit: bool,
}

impl ChimesApp {
    pub fn new(scene: SceneConfig, audio: ChimeConfig) -> EyreResult<Self> {
        let (tap_tx, audio_rx) = RingBuffer::<f32>::new(VIS_BUFFER_SIZE * TAP_RING_BLOCKS);
        let scheduler = ChimeScheduler::with_tap(audio, Some(tap_tx));

        let sample_rate = scheduler
            .output_format()
            .map_or(FALLBACK_SAMPLE_RATE, |f| f.sample_rate as f32);

        let effects = TouchEffects::new(NodeSimulation::new(scene)?, scheduler);

        Ok(Self {
            effects,
            audio_rx,
            audio_buffer: vec![0.0; VIS_BUFFER_SIZE],
            spectrum: SpectrumAnalyzer::new(VIS_BUFFER_SIZE, sample_rate),
            surface: Surface::new(Rect::default()),
            should_quit: false,
        })
    }

    /// Run until the user quits.
    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        self.effects.frame(Instant::now());

        while !self.should_quit {
            let frame_start = Instant::now();

            self.poll_audio();
            self.effects.frame(frame_start);

            terminal.draw(|frame| {
                let panes = ui::Panes::split(frame.area());
                self.surface = Surface::new(panes.surface);
                ui::render(
                    frame,
                    &panes,
                    &self.surface,
                    &self.effects,
                    &self.audio_buffer,
                    self.spectrum.data(),
                );
            })?;

            // Input until the next frame is due
            while let Some(remaining) = FRAME.checked_sub(frame_start.elapsed()) {
                if !event::poll(remaining)? {
                    break;
                }
                self.handle_event(event::read()?);
                if self.should_quit {
                    break;
                }
            }
        }

        self.effects.player_mut().shutdown();
        Ok(())
    }

    fn poll_audio(&mut self) {
        let mut fresh = 0;
        while let Ok(sample) = self.audio_rx.pop() {
            self.audio_buffer.push(sample);
            fresh += 1;
        }
        if self.audio_buffer.len() > VIS_BUFFER_SIZE {
            let excess = self.audio_buffer.len() - VIS_BUFFER_SIZE;
            self.audio_buffer.drain(0..excess);
        }
        if fresh > 0 {
            self.spectrum.update(&self.audio_buffer);
        }
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key.code),
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            _ => {}
        }
    }

    fn handle_key(&mut self, key: KeyCode) {
        let player = self.effects.player_mut();
        match key {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Char('c') | KeyCode::Char('C') => {
                if player.is_continuous() {
                    player.stop_continuous();
                } else {
                    player.start_continuous();
                }
            }
            KeyCode::Char(' ') => player.play_chime(),
            _ => {}
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let Some(point) = self.surface.to_view(mouse.column, mouse.row) else {
            return;
        };
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) | MouseEventKind::Drag(MouseButton::Left) => {
                self.effects.begin_effect(point);
            }
            MouseEventKind::Down(MouseButton::Right) => {
                self.effects.player_mut().play_chime();
            }
            _ => {}
        }
    }
}
