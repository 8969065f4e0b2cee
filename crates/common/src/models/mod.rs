pub mod midi;
pub mod trade;

pub use midi::{MidiChannel, MidiMessage};
pub use trade::{DataAnomaly, Trade};
