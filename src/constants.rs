use std::collections::HashMap;

use once_cell::sync::Lazy;
use rust_decimal::Decimal;

use crate::queue::Payload;

/// Trade direction codes, as stored upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderType {
    Buy = 0,
    Sell = 1,
    Balance = 6,
}

impl OrderType {
    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn from_code(code: i64) -> Option<OrderType> {
        match code {
            0 => Some(OrderType::Buy),
            1 => Some(OrderType::Sell),
            6 => Some(OrderType::Balance),
            _ => None,
        }
    }
}

impl From<OrderType> for Payload {
    fn from(value: OrderType) -> Self {
        Payload::Int(value.code())
    }
}

static ASSET_PIP: Lazy<HashMap<&'static str, Decimal>> = Lazy::new(|| {
    HashMap::from([
        ("JPY", Decimal::new(1, 2)),
        ("XAU", Decimal::new(1, 1)),
    ])
});

/// Pip size for assets that deviate from the usual four decimal places.
pub fn asset_pip(asset: &str) -> Option<Decimal> {
    ASSET_PIP.get(asset).copied()
}
