use common::models::DataAnomaly;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Feed disconnected: {0}")]
    Disconnected(String),

    #[error("Malformed payload: {0}")]
    Malformed(String),

    #[error("Data anomaly: {0}")]
    Anomaly(#[from] DataAnomaly),
}

impl TransportError {
    /// True when the offending message should be dropped and reading continue
    /// on the same connection. Everything else requires a reconnect.
    pub fn is_discard(&self) -> bool {
        matches!(self, Self::Malformed(_) | Self::Anomaly(_))
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(e: serde_json::Error) -> Self {
        TransportError::Malformed(e.to_string())
    }
}
