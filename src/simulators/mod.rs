// src/simulators/mod.rs

pub mod exchange;
pub mod order_book;

pub use exchange::Exchange;
pub use order_book::{BookEvent, BookUpdate, BookUpdateKind, OrderBook, PriceLevel};
