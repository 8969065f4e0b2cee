pub mod error;
pub mod remote;
pub mod services;
pub mod traits;

pub use error::TransportError;
pub use services::binance_feed::BinanceTradeFeed;
pub use traits::TradeFeed;
