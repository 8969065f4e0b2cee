use async_trait::async_trait;
use common::models::Trade;

use crate::error::TransportError;

/// One symbol's duplex trade stream.
#[async_trait]
pub trait TradeFeed: Send {
    /// (Re)establishes the connection. Safe to call after any error.
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Waits for the next trade. A quiet market simply keeps this pending.
    async fn next_trade(&mut self) -> Result<Trade, TransportError>;
}
