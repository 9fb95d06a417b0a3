use rand::{rngs::StdRng, Rng, SeedableRng};
use std::f64::consts::TAU;

use crate::error::{Error, Result};
use crate::synth::buffer::PcmBuffer;

/*
Wind Chime Tone
===============

A struck metal tube rings with a handful of strong modes that are *nearly*
but not quite harmonic. That slight inharmonicity, plus a fast exponential
decay, is most of what makes a sound read as "chime" rather than "organ".

Vocabulary
----------

  partial     One sinusoidal component of the tone. Partial 0 is the base
              frequency; the others sit at fixed ratios above it.

  ratio       Partial frequency divided by the base frequency. A pure
              harmonic series would be 1, 2, 3, 4. Chimes drift off it:

                  1.0   2.01   2.9   3.8

  detune      A tiny per-partial multiplier (within ±0.5%) drawn once per
              tone. Two tones with the same base never beat identically.

  vibrato     A slow 0.5 Hz phase wobble of depth 0.2 rad shared by every
              partial and every channel.

  decay       Exponent of the amplitude envelope exp(-t * decay). Drawn in
              [2.2, 3.2): the tone is ~-20 dB after roughly 0.7-1.0 s.


The Sample Formula
------------------

    s(t) = 0.25 * exp(-t * decay) * Σ_i a_i * sin(2π f_i t + 0.2 sin(2π 0.5 t))

    with  f_i = base * ratio_i * detune_i
          a_i = 1.0, 0.5, 0.28, 0.14

The 0.25 headroom keeps the worst case (all partials in phase) at
0.25 * 1.92 = 0.48, far from clipping even when several voices overlap.


Channels
--------

The tone is rendered once in mono and copied to every output channel.
*/

/// Frequency ratios of the four partials relative to the base.
pub const PARTIAL_RATIOS: [f64; 4] = [1.0, 2.01, 2.9, 3.8];

/// Relative amplitude of each partial.
pub const PARTIAL_AMPLITUDES: [f64; 4] = [1.0, 0.5, 0.28, 0.14];

/// Fixed output scale that keeps the partial sum well inside [-1, 1].
pub const HEADROOM: f64 = 0.25;

const BASE_FREQUENCY_RANGE: std::ops::Range<f64> = 420.0..820.0;
const DECAY_RANGE: std::ops::Range<f64> = 2.2..3.2;
const DETUNE_SPREAD: f64 = 0.005;
const VIBRATO_RATE: f64 = 0.5;
const VIBRATO_DEPTH: f64 = 0.2;

/// The randomized parameters of a single chime tone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChimeParams {
    /// Fundamental in Hz
    pub base_frequency: f64,
    /// Envelope exponent (per second)
    pub decay: f64,
    /// Per-partial frequency multiplier, close to 1.0
    pub detune: [f64; 4],
}

impl ChimeParams {
    /// Draw a fresh set of tone parameters.
    pub fn draw<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let base_frequency = rng.gen_range(BASE_FREQUENCY_RANGE);
        let decay = rng.gen_range(DECAY_RANGE);
        let mut detune = [1.0; 4];
        for d in &mut detune {
            *d = 1.0 + rng.gen_range(-DETUNE_SPREAD..DETUNE_SPREAD);
        }

        Self {
            base_frequency,
            decay,
            detune,
        }
    }

    /// Frequency of partial `index` in Hz, detune included.
    pub fn partial_frequency(&self, index: usize) -> f64 {
        self.base_frequency * PARTIAL_RATIOS[index] * self.detune[index]
    }

    /// Mono sample value `t` seconds after the strike.
    #[inline]
    pub fn sample_at(&self, t: f64) -> f64 {
        let vibrato = VIBRATO_DEPTH * (TAU * VIBRATO_RATE * t).sin();
        let mut sum = 0.0;
        for (i, amp) in PARTIAL_AMPLITUDES.iter().enumerate() {
            sum += amp * (TAU * self.partial_frequency(i) * t + vibrato).sin();
        }
        sum * (-t * self.decay).exp() * HEADROOM
    }

    /// Render `frames` mono samples at `sample_rate`.
    pub fn render_mono(&self, frames: usize, sample_rate: f64) -> Vec<f32> {
        (0..frames)
            .map(|i| self.sample_at(i as f64 / sample_rate) as f32)
            .collect()
    }
}

/// Wind chime generator owning its own random source.
///
/// Seed it for reproducible output (tests, offline renders).
pub struct ChimeSynth {
    rng: StdRng,
}

impl ChimeSynth {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(Some(seed))
    }

    /// Generate one chime tone.
    ///
    /// The buffer holds exactly `round(sample_rate * duration)` frames on each
    /// of `channel_count` identical channels. Non-positive (or non-finite)
    /// arguments are rejected before any randomness is consumed.
    pub fn synthesize(
        &mut self,
        duration: f64,
        sample_rate: f64,
        channel_count: usize,
    ) -> Result<PcmBuffer> {
        if !(duration.is_finite() && duration > 0.0) {
            return Err(Error::invalid("duration", duration));
        }
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(Error::invalid("sample_rate", sample_rate));
        }
        if channel_count == 0 {
            return Err(Error::invalid("channel_count", 0.0));
        }

        let frames = (sample_rate * duration).round() as usize;
        let params = ChimeParams::draw(&mut self.rng);
        let mono = params.render_mono(frames, sample_rate);

        Ok(PcmBuffer::from_mono(mono, sample_rate, channel_count))
    }
}

impl Default for ChimeSynth {
    fn default() -> Self {
        Self::new(None)
    }
}
