use common::config::IndicatorConfig;
use common::models::{MidiChannel, Trade};

use super::{BoundedWindow, Indicators, PriceBounds, rsi, trend, volume_spike};

/// Rolling state of one symbol, owned by that symbol's task alone.
#[derive(Debug, Clone)]
pub struct SymbolState {
    symbol: String,
    channel: MidiChannel,
    rsi_period: usize,
    prices: BoundedWindow,
    volumes: BoundedWindow,
}

impl SymbolState {
    pub fn new(symbol: &str, channel: MidiChannel, config: &IndicatorConfig) -> Self {
        Self {
            symbol: symbol.to_string(),
            channel,
            rsi_period: config.rsi_period,
            prices: BoundedWindow::new(config.rsi_period),
            volumes: BoundedWindow::new(config.trend_window),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn channel(&self) -> MidiChannel {
        self.channel
    }

    pub fn prices(&self) -> &BoundedWindow {
        &self.prices
    }

    pub fn volumes(&self) -> &BoundedWindow {
        &self.volumes
    }

    /// Pushes the trade into both windows and derives the indicators.
    pub fn update(&mut self, trade: &Trade) -> Indicators {
        self.prices.push(trade.price);
        self.volumes.push(trade.quantity);

        let bounds = PriceBounds::of(&self.prices).unwrap_or(PriceBounds {
            min: trade.price,
            max: trade.price,
        });

        Indicators {
            price: trade.price,
            rsi: rsi(&self.prices, self.rsi_period),
            bounds,
            trend: trend(trade.price, &self.prices),
            volume_spike: volume_spike(&self.volumes),
        }
    }
}
