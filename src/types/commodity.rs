// src/types/commodity.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Identity of a tradeable good, e.g. a class of cloud instance.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Commodity {
    name: String,
}

impl Commodity {
    pub fn new<T: Into<String>>(name: T) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Commodity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Buy => Direction::Sell,
            Direction::Sell => Direction::Buy,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Buy => f.write_str("BUY"),
            Direction::Sell => f.write_str("SELL"),
        }
    }
}

/// A (price, volume) step of a schedule.
///
/// Invalid input (negative or non-finite price, zero volume) collapses to the
/// empty tuple `(0.0, 0)` instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PriceVolumeTuple {
    price: f64,
    volume: u64,
}

impl PriceVolumeTuple {
    pub fn new(price: f64, volume: u64) -> Self {
        if !price.is_finite() || price < 0.0 || volume == 0 {
            warn!(price, volume, "invalid price/volume tuple, using empty tuple");
            return Self::empty();
        }
        Self { price, volume }
    }

    pub fn empty() -> Self {
        Self { price: 0.0, volume: 0 }
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn volume(&self) -> u64 {
        self.volume
    }

    pub fn is_empty(&self) -> bool {
        self.volume == 0
    }

    pub(crate) fn add_volume(&mut self, volume: u64) {
        self.volume += volume;
    }
}
