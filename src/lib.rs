// src/lib.rs

// === 1. Declare all the top-level modules ===
pub mod agents;
pub mod assignment;
pub mod assignment_server;
pub mod config;
pub mod error;
pub mod market;
pub mod oms;
pub mod schedule;
pub mod simulators;
pub mod types;

// === 2. Re-export the public-facing components ===

// --- From `agents` ---
pub use agents::agent_trait::{Ledger, Trader, TraderCore};
pub use agents::agent_type::TraderType;
pub use agents::instance_trader::{Instance, InstanceState, InstanceTrader};
pub use agents::report::{REPORT_HEADER, TraderReport};
pub use agents::test_trader::TestTrader;
pub use agents::zip_trader::ZipTrader;

// --- Trading goals and their bookkeeping ---
pub use assignment::{Assignment, AssignmentRequest, AssignmentState};
pub use assignment_server::AssignmentServer;
pub use oms::OrderManagementSystem;

// --- From our `market` engine ---
pub use config::{AssignmentServerConfig, ServerMode, SimulationConfig, TraderSpec};
pub use error::{MarketError, Result};
pub use market::Market;
pub use schedule::{
    DemandSchedule, Equilibrium, PriceVolumeSchedule, SupplySchedule, get_equilibrium,
    get_surplus_profit,
};

// --- From `simulators` ---
pub use simulators::{BookEvent, BookUpdate, BookUpdateKind, Exchange, OrderBook};

// --- From `types` ---
pub use types::{
    AssignmentId, Commodity, Direction, IdGenerator, Order, OrderId, OrderRequest,
    PriceVolumeTuple, Trade, TradeId, TraderId,
};
