use serde::Deserialize;

use common::models::Trade;

use crate::error::TransportError;

#[derive(Deserialize, Debug)]
pub struct TradeEvent {
    #[serde(rename(deserialize = "s"), default)]
    pub symbol: Option<String>,
    #[serde(rename(deserialize = "p"))]
    pub price: String,
    #[serde(rename(deserialize = "q"))]
    pub quantity: String,
}

/// Combined-stream envelope or the bare single-stream object.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum TradePayload {
    Combined { stream: String, data: TradeEvent },
    Raw(TradeEvent),
}

impl TradePayload {
    pub fn event(&self) -> &TradeEvent {
        match self {
            Self::Combined { data, .. } => data,
            Self::Raw(event) => event,
        }
    }
}

impl TradeEvent {
    pub fn to_trade(&self) -> Result<Trade, TransportError> {
        let price = parse_decimal("price", &self.price)?;
        let quantity = parse_decimal("quantity", &self.quantity)?;
        Ok(Trade::new(price, quantity)?)
    }
}

fn parse_decimal(field: &str, raw: &str) -> Result<f64, TransportError> {
    raw.parse::<f64>()
        .map_err(|e| TransportError::Malformed(format!("{} {:?}: {}", field, raw, e)))
}

/// Decodes one stream message. A message tagged with another symbol is
/// rejected as malformed; untagged messages are accepted.
pub fn decode_trade(text: &str, expected_symbol: &str) -> Result<Trade, TransportError> {
    let payload = serde_json::from_str::<TradePayload>(text)?;
    let event = payload.event();
    if let Some(symbol) = &event.symbol {
        if !symbol.eq_ignore_ascii_case(expected_symbol) {
            return Err(TransportError::Malformed(format!(
                "trade for {} on the {} stream",
                symbol, expected_symbol
            )));
        }
    }
    event.to_trade()
}
