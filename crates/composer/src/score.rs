//! Offline rendering of a finite price/volume series into timed notes.
//!
//! Shares the window, trend and linear scaling pieces with the live path but
//! has no scheduler: notes are laid out on a fixed grid and returned in memory.

use rand::Rng;

use common::models::Trade;

use crate::indicators::{BoundedWindow, trend};
use crate::mapping::scale_linear;

/// Major scale degrees relative to the root.
pub const MAJOR_SCALE: [u8; 7] = [0, 2, 4, 5, 7, 9, 11];
pub const MAJOR_TRIAD: [u8; 3] = [0, 4, 7];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreConfig {
    /// Lowest note and scale root (60 = middle C).
    pub base_note: u8,
    pub octaves: u8,
    /// Grid step and note length, in seconds.
    pub note_duration: f64,
    pub velocity_low: u8,
    pub velocity_high: u8,
    /// Number of preceding bars averaged for the trend.
    pub trend_window: usize,
    pub start_jitter: f64,
    pub velocity_jitter: i16,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            base_note: 60,
            octaves: 2,
            note_duration: 0.5,
            velocity_low: 40,
            velocity_high: 100,
            trend_window: 3,
            start_jitter: 0.05,
            velocity_jitter: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreNote {
    pub pitch: u8,
    pub velocity: u8,
    pub start: f64,
    pub end: f64,
}

/// Snaps `note` to the nearest major-scale degree above `root` in its octave.
pub fn quantize_to_scale(note: u8, root: u8) -> u8 {
    let root = (root % 12) as i16;
    let octave = (note / 12) as i16;
    let degree = (note % 12) as i16 - root;

    let closest = MAJOR_SCALE
        .iter()
        .map(|&d| d as i16)
        .min_by_key(|d| (d - degree).abs())
        .unwrap_or(0);

    (octave * 12 + root + closest).clamp(0, 127) as u8
}

/// One bar per element of `series` (closing price and volume).
pub fn compose<R: Rng + ?Sized>(series: &[Trade], config: &ScoreConfig, rng: &mut R) -> Vec<ScoreNote> {
    let Some((min_price, max_price)) = min_max(series.iter().map(|t| t.price)) else {
        return Vec::new();
    };
    let (min_volume, max_volume) =
        min_max(series.iter().map(|t| t.quantity)).unwrap_or((0.0, 0.0));

    let top_note = config.base_note as f64 + 12.0 * config.octaves as f64;
    let mut previous = BoundedWindow::new(config.trend_window.max(1));
    let mut notes = Vec::with_capacity(series.len() * MAJOR_TRIAD.len());

    for (i, bar) in series.iter().enumerate() {
        let raw_note = scale_linear(bar.price, min_price, max_price, config.base_note as f64, top_note)
            .clamp(0.0, 127.0) as u8;
        let root = quantize_to_scale(raw_note, config.base_note);

        let velocity = scale_linear(
            bar.quantity,
            min_volume,
            max_volume,
            config.velocity_low as f64,
            config.velocity_high as f64,
        ) as i16;
        let jitter = rng.gen_range(-config.velocity_jitter..=config.velocity_jitter);
        let velocity = (velocity + jitter).clamp(0, 127) as u8;

        let bar_trend = if previous.is_full() {
            trend(bar.price, &previous)
        } else {
            0.0
        };
        previous.push(bar.price);

        let grid = i as f64 * config.note_duration;
        let start = (grid + rng.gen_range(-config.start_jitter..=config.start_jitter)).max(0.0);
        let end = start + config.note_duration;

        let intervals: &[u8] = if bar_trend > 0.0 { &MAJOR_TRIAD } else { &[0] };
        notes.extend(intervals.iter().map(|&interval| ScoreNote {
            pitch: root.saturating_add(interval).min(127),
            velocity,
            start,
            end,
        }));
    }

    notes
}

fn min_max(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}
