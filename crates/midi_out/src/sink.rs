use common::models::MidiMessage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("MIDI output unavailable: {0}")]
    Unavailable(String),
    #[error("MIDI send failed: {0}")]
    SendFailed(String),
}

/// The single shared MIDI destination.
///
/// One `send` call is one atomic unit: implementations serialize concurrent
/// callers so no partial message is ever observed.
pub trait OutputSink: Send + Sync {
    fn send(&self, message: &MidiMessage) -> Result<(), OutputError>;

    fn name(&self) -> &str;
}
