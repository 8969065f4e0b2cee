use parking_lot::Mutex;

use common::models::{MidiChannel, MidiMessage};

use crate::sink::{OutputError, OutputSink};

/// Keeps every message in send order. Used for dry runs and tests.
#[derive(Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<MidiMessage>>,
    fail_after: Option<usize>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts `count` messages, then fails every later send.
    pub fn failing_after(count: usize) -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            fail_after: Some(count),
        }
    }

    pub fn messages(&self) -> Vec<MidiMessage> {
        self.messages.lock().clone()
    }

    pub fn on_channel(&self, channel: MidiChannel) -> Vec<MidiMessage> {
        self.messages
            .lock()
            .iter()
            .filter(|m| m.channel() == channel)
            .copied()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }
}

impl OutputSink for RecordingSink {
    fn send(&self, message: &MidiMessage) -> Result<(), OutputError> {
        let mut messages = self.messages.lock();
        if self.fail_after.is_some_and(|limit| messages.len() >= limit) {
            return Err(OutputError::SendFailed("recording sink closed".into()));
        }
        messages.push(*message);
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}
