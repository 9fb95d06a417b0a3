//! Spectrum of the mixed output, zoomed on the band the chimes occupy
//!
//! Base tones sit in 420-820 Hz and the top partial reaches ~3.1 kHz, so the
//! analyzer shows 200 Hz - 4 kHz on a linear axis, where the inharmonic
//! partial spacing is easy to see.

use std::sync::Arc;

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame,
};
use rustfft::{num_complex::Complex, Fft, FftPlanner};

const BAND_LOW_HZ: f64 = 200.0;
const BAND_HIGH_HZ: f64 = 4_000.0;
const FLOOR_DB: f64 = -100.0;

/// Hann-windowed FFT over a fixed-size window of the mix.
pub struct SpectrumAnalyzer {
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex<f32>>,
    /// FFT bins inside the chime band
    bins: std::ops::Range<usize>,
    bin_hz: f64,
    /// (frequency_hz, magnitude_db)
    spectrum: Vec<(f64, f64)>,
}

impl SpectrumAnalyzer {
    pub fn new(window_len: usize, sample_rate: f32) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(window_len);

        let window = (0..window_len)
            .map(|i| {
                if window_len > 1 {
                    let denom = (window_len - 1) as f32;
                    0.5 * (1.0 - (std::f32::consts::TAU * i as f32 / denom).cos())
                } else {
                    1.0
                }
            })
            .collect();

        let bin_hz = sample_rate as f64 / window_len.max(1) as f64;
        let nyquist_bin = window_len / 2;
        let low = ((BAND_LOW_HZ / bin_hz).floor() as usize).min(nyquist_bin);
        let high = ((BAND_HIGH_HZ / bin_hz).ceil() as usize).clamp(low, nyquist_bin);
        let spectrum = (low..high).map(|b| (b as f64 * bin_hz, FLOOR_DB)).collect();

        Self {
            window,
            fft,
            scratch: vec![Complex::new(0.0, 0.0); window_len],
            bins: low..high,
            bin_hz,
            spectrum,
        }
    }

    /// Re-analyze `buffer`; ignored unless it fills the window exactly.
    pub fn update(&mut self, buffer: &[f32]) {
        if buffer.len() != self.window.len() {
            return;
        }

        for ((slot, &sample), &w) in self.scratch.iter_mut().zip(buffer).zip(&self.window) {
            *slot = Complex::new(sample * w, 0.0);
        }
        self.fft.process(&mut self.scratch);

        for (point, bin) in self.spectrum.iter_mut().zip(self.bins.clone()) {
            let c = self.scratch[bin];
            let power = (c.re * c.re + c.im * c.im).max(1e-12) as f64;
            *point = (bin as f64 * self.bin_hz, (10.0 * power.log10()).max(FLOOR_DB));
        }
    }

    pub fn data(&self) -> &[(f64, f64)] {
        &self.spectrum
    }
}

/// Render the spectrum, titling it with the loudest frequency.
pub fn render_spectrum(frame: &mut Frame, area: Rect, spectrum: &[(f64, f64)]) {
    let loudest = spectrum
        .iter()
        .copied()
        .filter(|&(_, db)| db > FLOOR_DB + 20.0)
        .max_by(|a, b| a.1.total_cmp(&b.1));
    let title = match loudest {
        Some((hz, _)) => format!(" Spectrum  peak {hz:.0} Hz "),
        None => " Spectrum ".to_string(),
    };

    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Green))
        .data(spectrum);

    let max_db = spectrum.iter().map(|&(_, db)| db).fold(FLOOR_DB, f64::max);

    let chart = Chart::new(vec![dataset])
        .block(Block::default().title(title).borders(Borders::ALL))
        .x_axis(
            Axis::default()
                .bounds([BAND_LOW_HZ, BAND_HIGH_HZ])
                .labels(vec!["200", "2k", "4k"])
                .style(Style::default().fg(Color::DarkGray)),
        )
        .y_axis(
            Axis::default()
                .bounds([FLOOR_DB, max_db.max(0.0) + 10.0])
                .style(Style::default().fg(Color::DarkGray)),
        );

    frame.render_widget(chart, area);
}
