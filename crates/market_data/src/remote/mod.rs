pub mod trade_response;

pub use trade_response::{TradeEvent, TradePayload, decode_trade};

pub fn trade_stream_url(ws_base_url: &str, symbol: &str) -> String {
    format!("{}{}@trade", ws_base_url, symbol.to_lowercase())
}
