// src/error.rs

//! Errors raised when a market object cannot be constructed.
//!
//! Runtime conditions such as "order already gone" or "assignment already
//! completed" are not errors: those paths return `bool` and log a warning.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MarketError>;

#[derive(Error, Debug)]
pub enum MarketError {
    #[error("price must be positive and finite, got {0}")]
    InvalidPrice(f64),

    #[error("volume must be greater than zero")]
    InvalidVolume,

    #[error("cannot split {requested} units off an order of {current}")]
    InvalidSplit { requested: u64, current: u64 },

    #[error("orders are not on opposite sides of the book")]
    DirectionMismatch,

    #[error("commodity mismatch: expected {expected}, found {found}")]
    CommodityMismatch { expected: String, found: String },

    #[error("unknown trader type: {0}")]
    UnknownTraderType(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("could not read configuration file")]
    ConfigIo(#[from] std::io::Error),

    #[error("could not parse configuration")]
    ConfigParse(#[from] serde_json::Error),
}
