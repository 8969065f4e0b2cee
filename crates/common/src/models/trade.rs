use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataAnomaly {
    #[error("Price is not a finite number: {0}")]
    NonFinitePrice(f64),
    #[error("Price must be positive: {0}")]
    NonPositivePrice(f64),
    #[error("Quantity is not a finite number: {0}")]
    NonFiniteQuantity(f64),
    #[error("Negative quantity: {0}")]
    NegativeQuantity(f64),
}

/// A single executed trade, validated at the transport boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trade {
    pub price: f64,
    pub quantity: f64,
}

impl Trade {
    pub fn new(price: f64, quantity: f64) -> Result<Self, DataAnomaly> {
        if !price.is_finite() {
            return Err(DataAnomaly::NonFinitePrice(price));
        }
        if price <= 0.0 {
            return Err(DataAnomaly::NonPositivePrice(price));
        }
        if !quantity.is_finite() {
            return Err(DataAnomaly::NonFiniteQuantity(quantity));
        }
        if quantity < 0.0 {
            return Err(DataAnomaly::NegativeQuantity(quantity));
        }
        Ok(Self { price, quantity })
    }
}
