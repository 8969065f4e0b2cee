use midir::{MidiOutput, MidiOutputConnection};
use parking_lot::Mutex;
use tracing::{info, warn};

use common::models::MidiMessage;

use crate::sink::{OutputError, OutputSink};

/// midir-backed device output, opened once and held for the process lifetime.
pub struct MidirSink {
    name: String,
    connection: Mutex<MidiOutputConnection>,
}

impl MidirSink {
    /// Connects to the first physical output port, or exposes a virtual port
    /// called `port_name` when none is present.
    pub fn open(port_name: &str) -> Result<Self, OutputError> {
        let output =
            MidiOutput::new(port_name).map_err(|e| OutputError::Unavailable(e.to_string()))?;

        let ports = output.ports();
        let Some(port) = ports.first() else {
            warn!("No MIDI output ports found, opening virtual port '{}'", port_name);
            return Self::open_virtual(output, port_name);
        };

        let name = output
            .port_name(port)
            .unwrap_or_else(|_| "unnamed port".to_string());
        info!("Opening MIDI output port: {}", name);

        let connection = output
            .connect(port, port_name)
            .map_err(|e| OutputError::Unavailable(format!("{}: {}", name, e)))?;

        Ok(Self {
            name,
            connection: Mutex::new(connection),
        })
    }

    #[cfg(unix)]
    fn open_virtual(output: MidiOutput, port_name: &str) -> Result<Self, OutputError> {
        use midir::os::unix::VirtualOutput;

        let connection = output
            .create_virtual(port_name)
            .map_err(|e| OutputError::Unavailable(e.to_string()))?;

        Ok(Self {
            name: format!("{} (virtual)", port_name),
            connection: Mutex::new(connection),
        })
    }

    #[cfg(not(unix))]
    fn open_virtual(_output: MidiOutput, port_name: &str) -> Result<Self, OutputError> {
        Err(OutputError::Unavailable(format!(
            "no output ports and virtual port '{}' is not supported on this platform",
            port_name
        )))
    }
}

impl OutputSink for MidirSink {
    fn send(&self, message: &MidiMessage) -> Result<(), OutputError> {
        self.connection
            .lock()
            .send(&message.to_bytes())
            .map_err(|e| OutputError::SendFailed(e.to_string()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::models::MidiChannel;

    // Hosts without a MIDI subsystem (no ALSA sequencer, CI containers) can
    // only report the port as unavailable; everywhere else a port opens.
    #[test]
    fn opens_a_port_or_reports_unavailable() {
        match MidirSink::open("market-music-test") {
            Ok(sink) => {
                assert!(!sink.name().is_empty());
                let channel = MidiChannel::try_from(1).unwrap();
                sink.send(&MidiMessage::NoteOn {
                    channel,
                    note: 60,
                    velocity: 1,
                })
                .unwrap();
                sink.send(&MidiMessage::NoteOff { channel, note: 60 })
                    .unwrap();
            }
            Err(e) => assert!(matches!(e, OutputError::Unavailable(_)), "{}", e),
        }
    }
}
