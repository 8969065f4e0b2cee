mod rsi;
mod state;
mod volume;
mod window;

pub use rsi::{NEUTRAL_RSI, rsi};
pub use state::SymbolState;
pub use volume::{SPIKE_RATIO, volume_spike};
pub use window::BoundedWindow;

/// Min and max of the current price window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBounds {
    pub min: f64,
    pub max: f64,
}

impl PriceBounds {
    pub fn of(window: &BoundedWindow) -> Option<Self> {
        Some(Self {
            min: window.min()?,
            max: window.max()?,
        })
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

/// Signed deviation of `price` from the window mean.
pub fn trend(price: f64, window: &BoundedWindow) -> f64 {
    price - window.mean()
}

/// Everything derived from one trade. Never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Indicators {
    pub price: f64,
    pub rsi: f64,
    pub bounds: PriceBounds,
    pub trend: f64,
    pub volume_spike: bool,
}
