pub mod binance_feed;

pub use binance_feed::BinanceTradeFeed;
