use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

use common::models::Trade;

use crate::error::TransportError;
use crate::remote::{decode_trade, trade_stream_url};
use crate::traits::TradeFeed;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Binance `<symbol>@trade` stream for a single symbol.
pub struct BinanceTradeFeed {
    symbol: String,
    url: String,
    socket: Option<WsStream>,
}

impl BinanceTradeFeed {
    pub fn new(symbol: &str, ws_base_url: &str) -> Self {
        Self {
            symbol: symbol.to_lowercase(),
            url: trade_stream_url(ws_base_url, symbol),
            socket: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TradeFeed for BinanceTradeFeed {
    async fn connect(&mut self) -> Result<(), TransportError> {
        if let Some(mut old) = self.socket.take() {
            let _ = old.close(None).await;
        }

        debug!("Connecting to web socket: {}", self.url);
        let (ws_stream, _) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        info!("Connected to {} trade stream", self.symbol);
        self.socket = Some(ws_stream);
        Ok(())
    }

    async fn next_trade(&mut self) -> Result<Trade, TransportError> {
        let socket = self
            .socket
            .as_mut()
            .ok_or_else(|| TransportError::Disconnected("not connected".into()))?;

        loop {
            match socket.next().await {
                Some(Ok(Message::Text(text))) => return decode_trade(&text, &self.symbol),
                Some(Ok(Message::Ping(payload))) => {
                    if let Err(e) = socket.send(Message::Pong(payload)).await {
                        self.socket = None;
                        return Err(TransportError::Disconnected(e.to_string()));
                    }
                    debug!("Ping - Pong sent on {} stream", self.symbol);
                }
                Some(Ok(Message::Close(frame))) => {
                    self.socket = None;
                    return Err(TransportError::Disconnected(format!(
                        "close frame received: {:?}",
                        frame
                    )));
                }
                Some(Ok(_)) => {
                    debug!("Unexpected message received on {} stream, continuing...", self.symbol);
                }
                Some(Err(e)) => {
                    self.socket = None;
                    return Err(TransportError::Disconnected(e.to_string()));
                }
                None => {
                    self.socket = None;
                    return Err(TransportError::Disconnected("stream ended".into()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_symbol_in_url() {
        let feed = BinanceTradeFeed::new("ETHUSDT", "wss://example.test/stream?streams=");
        assert_eq!(feed.url(), "wss://example.test/stream?streams=ethusdt@trade");
    }

    #[tokio::test]
    async fn reading_before_connect_reports_disconnect() {
        let mut feed = BinanceTradeFeed::new("btcusdt", "wss://example.test/stream?streams=");
        let err = feed.next_trade().await.unwrap_err();
        assert!(matches!(err, TransportError::Disconnected(_)));
        assert!(!err.is_discard());
    }
}
