use std::sync::Arc;

use common::config::{OutputConfig, OutputKind};
use tracing::info;

pub mod logging_sink;
#[cfg(feature = "device")]
pub mod midir_sink;
pub mod recording;
pub mod sink;

pub use logging_sink::LoggingSink;
#[cfg(feature = "device")]
pub use midir_sink::MidirSink;
pub use recording::RecordingSink;
pub use sink::{OutputError, OutputSink};

/// Opens the process-wide sink. Called exactly once at startup.
pub fn open_sink(config: &OutputConfig) -> Result<Arc<dyn OutputSink>, OutputError> {
    let sink: Arc<dyn OutputSink> = match config.kind {
        OutputKind::Device => open_device(&config.port_name)?,
        OutputKind::Log => Arc::new(LoggingSink::new(&config.port_name)),
    };
    info!("MIDI output ready: {}", sink.name());
    Ok(sink)
}

#[cfg(feature = "device")]
fn open_device(port_name: &str) -> Result<Arc<dyn OutputSink>, OutputError> {
    Ok(Arc::new(MidirSink::open(port_name)?))
}

#[cfg(not(feature = "device"))]
fn open_device(port_name: &str) -> Result<Arc<dyn OutputSink>, OutputError> {
    Err(OutputError::Unavailable(format!(
        "cannot open '{}': built without the `device` feature (set MIDI_OUTPUT=log for headless runs)",
        port_name
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_output_always_opens() {
        let config = OutputConfig {
            kind: OutputKind::Log,
            port_name: "Market_Music".to_string(),
        };
        let sink = open_sink(&config).unwrap();
        assert_eq!(sink.name(), "Market_Music (log)");
    }

    #[cfg(feature = "device")]
    #[test]
    fn default_config_reaches_midir() {
        let output = common::config::AppConfig::from_lookup(|_| None).unwrap().output;
        assert_eq!(output.kind, OutputKind::Device);

        // Only a host without a MIDI subsystem may still refuse the port.
        match open_sink(&output) {
            Ok(sink) => assert!(!sink.name().ends_with("(log)")),
            Err(OutputError::Unavailable(reason)) => {
                assert!(!reason.contains("`device` feature"), "{}", reason)
            }
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    #[cfg(not(feature = "device"))]
    #[test]
    fn device_output_unavailable_without_feature() {
        let config = OutputConfig {
            kind: OutputKind::Device,
            port_name: "Market_Music".to_string(),
        };
        assert!(matches!(open_sink(&config), Err(OutputError::Unavailable(_))));
    }
}
