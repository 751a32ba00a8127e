// src/agents/test_trader.rs

//! Zero-intelligence constrained trader: quotes a fresh random price inside
//! its limit every tick and never learns.

use super::agent_trait::{Trader, TraderCore};
use super::agent_type::TraderType;
use super::config::{TEST_TRADER_MAX_PRICE, TEST_TRADER_MIN_PRICE};
use crate::simulators::{BookUpdate, Exchange};
use crate::types::{AssignmentId, Direction, IdGenerator, Order, Trade, TraderId};
use rand::Rng;
use rand::rngs::StdRng;
use std::sync::Arc;

pub struct TestTrader {
    core: TraderCore,
    min_price: f64,
    max_price: f64,
}

impl TestTrader {
    pub fn new(id: TraderId, ids: Arc<IdGenerator>, rng: StdRng) -> Self {
        Self::with_bounds(id, ids, rng, TEST_TRADER_MIN_PRICE, TEST_TRADER_MAX_PRICE)
    }

    pub fn with_bounds(
        id: TraderId,
        ids: Arc<IdGenerator>,
        rng: StdRng,
        min_price: f64,
        max_price: f64,
    ) -> Self {
        Self {
            core: TraderCore::new(id, format!("test-{}", id), ids, rng),
            min_price,
            max_price,
        }
    }

    /// Buys draw from `[min, limit]`, sells from `[limit, max]`. A limit
    /// outside the bounds pins the quote to the limit.
    fn draw_price(&mut self, limit: f64, direction: Direction) -> f64 {
        let (lo, hi) = match direction {
            Direction::Buy => (self.min_price, limit),
            Direction::Sell => (limit, self.max_price),
        };
        if hi <= lo {
            return limit;
        }
        self.core.rng.gen_range(lo..=hi)
    }
}

impl Trader for TestTrader {
    fn core(&self) -> &TraderCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TraderCore {
        &mut self.core
    }

    fn trader_type(&self) -> TraderType {
        TraderType::Test
    }

    fn generate_order(
        &mut self,
        assignment: AssignmentId,
        exchange: &mut Exchange,
        time: u64,
    ) -> Option<Order> {
        let (limit, direction) = {
            let a = self.core.oms.assignment(assignment)?;
            if a.is_completed() {
                return None;
            }
            (a.limit_price(), a.direction())
        };
        let price = self.draw_price(limit, direction);
        if price <= 0.0 {
            return None;
        }
        self.core.requote(assignment, price, exchange, time)
    }

    fn order_book_updated(&mut self, _update: &BookUpdate) {}

    fn execute(&mut self, _exchange: &mut Exchange, _time: u64) -> bool {
        false
    }

    fn perform_clearing(&mut self, _order: &Order, _trade: &Trade) -> bool {
        true
    }
}
