//! Indicator readings to musical parameters.
//!
//! Everything here is a pure function of its inputs plus an explicit random
//! source, so callers can seed humanization deterministically.

use std::time::Duration;

use common::config::MusicConfig;
use rand::Rng;

use crate::indicators::{Indicators, PriceBounds};

pub const VELOCITY_MIN: u8 = 40;
pub const VELOCITY_MAX: u8 = 120;
pub const VELOCITY_JITTER: i16 = 10;

/// Hold at RSI 0 and RSI 100, in seconds.
pub const SLOWEST_DELAY: f64 = 0.5;
pub const FASTEST_DELAY: f64 = 0.1;
pub const TIMING_JITTER: f64 = 0.01;

/// Bass, snare, closed hat, open hat.
pub const DRUM_NOTES: [u8; 4] = [36, 38, 42, 46];
pub const PERCUSSION_VELOCITY: u8 = 100;
pub const PERCUSSION_HOLD: Duration = Duration::from_millis(100);

const ASCENDING_STEP: u8 = 4;
const DESCENDING_STEP: u8 = 3;
const MAX_PITCH: u8 = 127;

#[derive(Debug, Clone, PartialEq)]
pub struct MelodicEvent {
    pub pitches: Vec<u8>,
    pub velocity: u8,
    pub hold: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PercussionHit {
    pub note: u8,
    pub velocity: u8,
    pub hold: Duration,
}

/// What one trade sounds like.
#[derive(Debug, Clone, PartialEq)]
pub struct MusicalPlan {
    pub melody: MelodicEvent,
    pub percussion: Option<PercussionHit>,
}

/// Linear map of `value` from `[from_min, from_max]` onto `[to_min, to_max]`.
/// A degenerate source range maps everything to `to_min`.
pub fn scale_linear(value: f64, from_min: f64, from_max: f64, to_min: f64, to_max: f64) -> f64 {
    let span = from_max - from_min;
    if !(span > 0.0) {
        return to_min;
    }
    to_min + (value - from_min) / span * (to_max - to_min)
}

/// Position of `price` inside the window, as a note in `[low, high]`.
pub fn scale_price(price: f64, bounds: &PriceBounds, low: u8, high: u8) -> u8 {
    let scaled = scale_linear(price, bounds.min, bounds.max, low as f64, high as f64);
    if scaled.is_nan() {
        return low;
    }
    scaled.clamp(low as f64, high as f64) as u8
}

/// A rising trend pairs the note with the major third above it; anything
/// else pairs it with the minor third below.
pub fn shape(note: u8, trend: f64) -> Vec<u8> {
    if trend > 0.0 {
        vec![note.saturating_add(ASCENDING_STEP).min(MAX_PITCH), note.min(MAX_PITCH)]
    } else {
        vec![note.min(MAX_PITCH), note.saturating_sub(DESCENDING_STEP).min(MAX_PITCH)]
    }
}

pub fn humanized_velocity<R: Rng + ?Sized>(base: u8, rng: &mut R) -> u8 {
    let jitter = rng.gen_range(-VELOCITY_JITTER..=VELOCITY_JITTER);
    (base as i16 + jitter).clamp(VELOCITY_MIN as i16, VELOCITY_MAX as i16) as u8
}

/// RSI 0 holds for the slowest delay, RSI 100 for the fastest.
pub fn base_delay(rsi: f64) -> f64 {
    let rsi = if rsi.is_nan() { 50.0 } else { rsi.clamp(0.0, 100.0) };
    scale_linear(rsi, 0.0, 100.0, SLOWEST_DELAY, FASTEST_DELAY)
}

/// Swing is applied on every other half-second tick of the wall clock.
pub fn swing_addend(wall_clock: Duration, swing_amount: f64) -> f64 {
    let half_second_ticks = (wall_clock.as_secs_f64() * 2.0) as u64;
    if half_second_ticks % 2 == 1 {
        swing_amount
    } else {
        0.0
    }
}

pub fn tempo_delay<R: Rng + ?Sized>(
    rsi: f64,
    wall_clock: Duration,
    swing_amount: f64,
    rng: &mut R,
) -> Duration {
    let jitter = rng.gen_range(-TIMING_JITTER..=TIMING_JITTER);
    let seconds = base_delay(rsi) + swing_addend(wall_clock, swing_amount) + jitter;
    Duration::from_secs_f64(seconds.max(0.0))
}

pub fn pick_drum<R: Rng + ?Sized>(rng: &mut R) -> u8 {
    DRUM_NOTES[rng.gen_range(0..DRUM_NOTES.len())]
}

#[derive(Debug, Clone)]
pub struct Mapper {
    config: MusicConfig,
}

impl Mapper {
    pub fn new(config: MusicConfig) -> Self {
        Self { config }
    }

    /// `wall_clock` is time since the Unix epoch; it only drives swing.
    pub fn plan<R: Rng + ?Sized>(
        &self,
        indicators: &Indicators,
        wall_clock: Duration,
        rng: &mut R,
    ) -> MusicalPlan {
        let note = scale_price(
            indicators.price,
            &indicators.bounds,
            self.config.note_low,
            self.config.note_high,
        );

        let melody = MelodicEvent {
            pitches: shape(note, indicators.trend),
            velocity: humanized_velocity(self.config.base_velocity, rng),
            hold: tempo_delay(indicators.rsi, wall_clock, self.config.swing_amount, rng),
        };

        let percussion = indicators.volume_spike.then(|| PercussionHit {
            note: pick_drum(rng),
            velocity: PERCUSSION_VELOCITY,
            hold: PERCUSSION_HOLD,
        });

        MusicalPlan { melody, percussion }
    }
}
