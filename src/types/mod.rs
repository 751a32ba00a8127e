// src/types/mod.rs

pub mod commodity;
pub mod ids;
pub mod order;
pub mod trade;

pub use commodity::{Commodity, Direction, PriceVolumeTuple};
pub use ids::{AssignmentId, IdGenerator, OrderId, TradeId, TraderId};
pub use order::{Order, OrderRequest};
pub use trade::Trade;
