//! Startup configuration, read once from the environment and immutable afterwards.

use std::collections::HashSet;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::models::MidiChannel;

pub const DEFAULT_SYMBOLS: &str = "btcusdt:1,ethusdt:2";
pub const DEFAULT_WS_BASE_URL: &str = "wss://stream.binance.com:9443/stream?streams=";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("Validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolAssignment {
    pub symbol: String,
    pub channel: MidiChannel,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorConfig {
    pub rsi_period: usize,
    pub trend_window: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MusicConfig {
    pub note_low: u8,
    pub note_high: u8,
    pub base_velocity: u8,
    /// Extra hold added on swung ticks, in seconds.
    pub swing_amount: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// Physical port if present, otherwise a virtual port.
    Device,
    /// Headless: messages are only traced.
    Log,
}

impl FromStr for OutputKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "device" => Ok(Self::Device),
            "log" => Ok(Self::Log),
            other => Err(format!("unknown output kind '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputConfig {
    pub kind: OutputKind,
    pub port_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedConfig {
    pub ws_base_url: String,
    pub reconnect_delay: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub symbols: Vec<SymbolAssignment>,
    pub percussion_channel: MidiChannel,
    pub indicators: IndicatorConfig,
    pub music: MusicConfig,
    pub output: OutputConfig,
    pub feed: FeedConfig,
    pub humanize_seed: Option<u64>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup. Missing keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let symbols_raw = lookup("MUSIC_SYMBOLS").unwrap_or_else(|| DEFAULT_SYMBOLS.to_string());
        let symbols = parse_symbol_channels(&symbols_raw)?;

        let percussion_channel = parse_channel(
            "PERCUSSION_CHANNEL",
            &lookup("PERCUSSION_CHANNEL").unwrap_or_else(|| "10".to_string()),
        )?;

        let humanize_seed = match lookup("HUMANIZE_SEED") {
            Some(raw) => Some(parse_value("HUMANIZE_SEED", &raw)?),
            None => None,
        };

        let config = Self {
            symbols,
            percussion_channel,
            indicators: IndicatorConfig {
                rsi_period: var_or(&lookup, "RSI_PERIOD", 14)?,
                trend_window: var_or(&lookup, "TREND_WINDOW", 10)?,
            },
            music: MusicConfig {
                note_low: var_or(&lookup, "NOTE_LOW", 48)?,
                note_high: var_or(&lookup, "NOTE_HIGH", 72)?,
                base_velocity: var_or(&lookup, "BASE_VELOCITY", 80)?,
                swing_amount: var_or(&lookup, "SWING_AMOUNT", 0.02)?,
            },
            output: OutputConfig {
                kind: var_or(&lookup, "MIDI_OUTPUT", OutputKind::Device)?,
                port_name: lookup("MIDI_PORT_NAME").unwrap_or_else(|| "Market_Music".to_string()),
            },
            feed: FeedConfig {
                ws_base_url: lookup("BINANCE_WS_URL")
                    .unwrap_or_else(|| DEFAULT_WS_BASE_URL.to_string()),
                reconnect_delay: Duration::from_millis(var_or(&lookup, "RECONNECT_DELAY_MS", 2000)?),
            },
            humanize_seed,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbols.is_empty() {
            return Err(ConfigError::Validation("no symbols configured".into()));
        }

        let mut seen_symbols = HashSet::new();
        let mut seen_channels = HashSet::new();
        for assignment in &self.symbols {
            if !seen_symbols.insert(assignment.symbol.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "symbol {} configured twice",
                    assignment.symbol
                )));
            }
            if !seen_channels.insert(assignment.channel) {
                return Err(ConfigError::Validation(format!(
                    "channel {} assigned to more than one symbol",
                    assignment.channel.number()
                )));
            }
        }
        if seen_channels.contains(&self.percussion_channel) {
            return Err(ConfigError::Validation(format!(
                "percussion channel {} is also a symbol channel",
                self.percussion_channel.number()
            )));
        }

        if self.indicators.rsi_period < 2 || self.indicators.trend_window < 2 {
            return Err(ConfigError::Validation(
                "RSI_PERIOD and TREND_WINDOW must be at least 2".into(),
            ));
        }

        let music = &self.music;
        if music.note_low >= music.note_high || music.note_high > 127 {
            return Err(ConfigError::Validation(format!(
                "note range {}..={} must be ascending and within 0..=127",
                music.note_low, music.note_high
            )));
        }
        if music.base_velocity > 127 {
            return Err(ConfigError::Validation(format!(
                "base velocity {} exceeds 127",
                music.base_velocity
            )));
        }
        if !music.swing_amount.is_finite() || music.swing_amount < 0.0 {
            return Err(ConfigError::Validation(format!(
                "swing amount {} must be a non-negative number of seconds",
                music.swing_amount
            )));
        }

        Ok(())
    }
}

/// Parses `symbol:channel` pairs separated by commas, e.g. `btcusdt:1,ethusdt:2`.
pub fn parse_symbol_channels(raw: &str) -> Result<Vec<SymbolAssignment>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (symbol, channel) = entry.split_once(':').ok_or_else(|| ConfigError::Invalid {
                key: "MUSIC_SYMBOLS",
                value: entry.to_string(),
                reason: "expected symbol:channel".into(),
            })?;

            let symbol = symbol.trim().to_lowercase();
            if symbol.is_empty() {
                return Err(ConfigError::Invalid {
                    key: "MUSIC_SYMBOLS",
                    value: entry.to_string(),
                    reason: "empty symbol".into(),
                });
            }

            Ok(SymbolAssignment {
                symbol,
                channel: parse_channel("MUSIC_SYMBOLS", channel.trim())?,
            })
        })
        .collect()
}

fn parse_channel(key: &'static str, raw: &str) -> Result<MidiChannel, ConfigError> {
    let number: u8 = parse_value(key, raw)?;
    MidiChannel::try_from(number).map_err(|e| ConfigError::Invalid {
        key,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn parse_value<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
        key,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn var_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}
