// src/types/ids.rs

//! Identifier types and the id generator shared by one simulation run.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Traders are addressed by their index in the market's population.
pub type TraderId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssignmentId(pub u64);

impl fmt::Display for AssignmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Assignment#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Order#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TradeId(pub u64);

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Trade#{}", self.0)
    }
}

/// Hands out monotonically increasing ids for assignments, orders and trades.
///
/// One generator is created per run and shared (behind an `Arc`) by the
/// exchange, the assignment servers and every trader, so ids are unique for
/// the whole run. `reset` rewinds the counters for a deterministic rerun.
#[derive(Debug)]
pub struct IdGenerator {
    next_assignment: AtomicU64,
    next_order: AtomicU64,
    next_trade: AtomicU64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self {
            next_assignment: AtomicU64::new(1),
            next_order: AtomicU64::new(1),
            next_trade: AtomicU64::new(1),
        }
    }

    pub fn next_assignment_id(&self) -> AssignmentId {
        AssignmentId(self.next_assignment.fetch_add(1, Ordering::Relaxed))
    }

    pub fn next_order_id(&self) -> OrderId {
        OrderId(self.next_order.fetch_add(1, Ordering::Relaxed))
    }

    pub fn next_trade_id(&self) -> TradeId {
        TradeId(self.next_trade.fetch_add(1, Ordering::Relaxed))
    }

    pub fn reset(&self) {
        self.next_assignment.store(1, Ordering::Relaxed);
        self.next_order.store(1, Ordering::Relaxed);
        self.next_trade.store(1, Ordering::Relaxed);
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_increase_independently_per_kind() {
        let ids = IdGenerator::new();
        assert_eq!(ids.next_order_id(), OrderId(1));
        assert_eq!(ids.next_order_id(), OrderId(2));
        assert_eq!(ids.next_trade_id(), TradeId(1));
        assert_eq!(ids.next_assignment_id(), AssignmentId(1));
        assert_eq!(ids.next_order_id(), OrderId(3));
    }

    #[test]
    fn reset_rewinds_all_counters() {
        let ids = IdGenerator::new();
        ids.next_order_id();
        ids.next_trade_id();
        ids.next_assignment_id();
        ids.reset();
        assert_eq!(ids.next_order_id(), OrderId(1));
        assert_eq!(ids.next_trade_id(), TradeId(1));
        assert_eq!(ids.next_assignment_id(), AssignmentId(1));
    }
}
