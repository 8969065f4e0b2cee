use common::models::MidiMessage;
use tracing::debug;

use crate::sink::{OutputError, OutputSink};

/// Headless sink: every message is traced instead of played.
pub struct LoggingSink {
    name: String,
}

impl LoggingSink {
    pub fn new(name: &str) -> Self {
        Self {
            name: format!("{} (log)", name),
        }
    }
}

impl OutputSink for LoggingSink {
    fn send(&self, message: &MidiMessage) -> Result<(), OutputError> {
        debug!(
            channel = message.channel().number(),
            bytes = ?message.to_bytes(),
            "{:?}",
            message
        );
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
