// src/agents/agent_trait.rs

use super::agent_type::TraderType;
use super::report::TraderReport;
use crate::assignment::Assignment;
use crate::oms::OrderManagementSystem;
use crate::simulators::{BookUpdate, Exchange};
use crate::types::{AssignmentId, Direction, IdGenerator, Order, OrderId, Trade, TraderId};
use rand::rngs::StdRng;
use std::sync::Arc;
use tracing::{debug, warn};

/// Prices closer than this are treated as the same quote.
pub const PRICE_EPSILON: f64 = 1e-9;

/// Running totals over a trader's executions.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ledger {
    /// Sale proceeds minus purchase cost.
    pub balance: f64,
    /// Surplus against the assignment limit prices.
    pub profit: f64,
    pub buys: u64,
    pub sells: u64,
    pub buy_volume: u64,
    pub sell_volume: u64,
}

/// State every trader carries: identity, its OMS, a trade history, and its
/// own random source.
pub struct TraderCore {
    pub id: TraderId,
    pub name: String,
    pub oms: OrderManagementSystem,
    pub history: Vec<Trade>,
    pub ledger: Ledger,
    pub ids: Arc<IdGenerator>,
    pub rng: StdRng,
}

impl TraderCore {
    pub fn new(id: TraderId, name: String, ids: Arc<IdGenerator>, rng: StdRng) -> Self {
        Self {
            id,
            name,
            oms: OrderManagementSystem::new(id),
            history: Vec::new(),
            ledger: Ledger::default(),
            ids,
            rng,
        }
    }

    /// Books the cash and surplus of an execution against its assignment.
    pub fn record_execution(&mut self, order: &Order, trade: &Trade) {
        let limit = self
            .oms
            .assignment(order.assignment())
            .map(Assignment::limit_price);
        let volume = trade.volume();
        match order.direction() {
            Direction::Buy => {
                self.ledger.balance -= trade.value();
                self.ledger.buys += 1;
                self.ledger.buy_volume += volume;
                if let Some(limit) = limit {
                    self.ledger.profit += (limit - trade.price()) * volume as f64;
                }
            }
            Direction::Sell => {
                self.ledger.balance += trade.value();
                self.ledger.sells += 1;
                self.ledger.sell_volume += volume;
                if let Some(limit) = limit {
                    self.ledger.profit += (trade.price() - limit) * volume as f64;
                }
            }
        }
        self.history.push(trade.clone());
    }

    /// Quotes the remaining volume of an assignment at `price`.
    ///
    /// Live orders at the same price that already cover the remaining volume
    /// are left alone; otherwise they are cancelled and one fresh order is
    /// posted.
    pub fn requote(
        &mut self,
        assignment_id: AssignmentId,
        price: f64,
        exchange: &mut Exchange,
        time: u64,
    ) -> Option<Order> {
        let Some(assignment) = self.oms.assignment_mut(assignment_id) else {
            warn!(trader = self.id, assignment = %assignment_id, "quote for unknown assignment");
            return None;
        };
        if assignment.is_completed() || assignment.remaining_volume() == 0 {
            return None;
        }
        let unchanged = assignment.unplaced_volume() == 0
            && assignment
                .live_orders()
                .iter()
                .all(|o| (o.price() - price).abs() < PRICE_EPSILON);
        if unchanged {
            return None;
        }

        assignment.cancel_orders(exchange);
        let order = match assignment.create_order(&self.ids, price, assignment.remaining_volume(), time) {
            Ok(order) => order,
            Err(e) => {
                warn!(trader = self.id, assignment = %assignment.id(), error = %e, "could not create order");
                return None;
            }
        };
        if !assignment.new_order(order.clone()) {
            return None;
        }
        let Some(book) = exchange.book_mut(order.commodity()) else {
            warn!(trader = self.id, commodity = %order.commodity(), "no book for commodity");
            assignment.delete_order(order.id());
            return None;
        };
        debug!(
            trader = self.id,
            order = %order.id(),
            direction = %order.direction(),
            price,
            volume = order.volume(),
            "posting order"
        );
        book.add_order(order.clone());
        Some(order)
    }
}

/// The contract every trading strategy implements.
///
/// Traders never call each other or the book's subscribers directly: book
/// activity is queued and the market routes it back through
/// `order_split`, `executed_order` and `order_book_updated`.
pub trait Trader {
    fn core(&self) -> &TraderCore;
    fn core_mut(&mut self) -> &mut TraderCore;
    fn trader_type(&self) -> TraderType;

    fn id(&self) -> TraderId {
        self.core().id
    }

    fn name(&self) -> &str {
        &self.core().name
    }

    fn oms(&self) -> &OrderManagementSystem {
        &self.core().oms
    }

    fn history(&self) -> &[Trade] {
        &self.core().history
    }

    fn add_assignment(&mut self, assignment: Assignment) -> bool {
        self.core_mut().oms.add(assignment)
    }

    /// Posts or refreshes the order for one assignment.
    fn generate_order(
        &mut self,
        assignment: AssignmentId,
        exchange: &mut Exchange,
        time: u64,
    ) -> Option<Order>;

    /// Per-tick entry point: tidy the OMS and quote every open assignment.
    fn trade(&mut self, exchange: &mut Exchange, time: u64) {
        self.core_mut().oms.perform_admin();
        for id in self.core().oms.open_ids() {
            self.generate_order(id, exchange, time);
        }
    }

    /// Passive reaction to a book-state change. Must not touch the book.
    fn order_book_updated(&mut self, update: &BookUpdate);

    /// Aggressively takes a favourable resting quote. Returns whether an
    /// order was sent.
    fn execute(&mut self, exchange: &mut Exchange, time: u64) -> bool;

    fn order_split(&mut self, original: OrderId, fragment: Order) -> bool {
        self.core_mut().oms.order_split(original, fragment)
    }

    /// One of this trader's orders took part in `trade`.
    fn executed_order(&mut self, order: &Order, trade: &Trade, exchange: &mut Exchange) -> bool {
        let core = self.core_mut();
        core.record_execution(order, trade);
        if !core.oms.order_executed(order, exchange) {
            return false;
        }
        self.perform_clearing(order, trade)
    }

    /// Transfers the underlying good after a trade.
    fn perform_clearing(&mut self, order: &Order, trade: &Trade) -> bool;

    fn end_time_step(&mut self, _exchange: &mut Exchange, _time: u64) {
        self.core_mut().oms.perform_admin();
    }

    fn report(&self) -> TraderReport {
        let core = self.core();
        let ledger = core.ledger;
        let traded = ledger.buy_volume + ledger.sell_volume;
        TraderReport {
            id: core.id,
            name: core.name.clone(),
            profit: ledger.profit,
            buys: ledger.buys,
            sells: ledger.sells,
            balance: ledger.balance,
            balance_per_volume: if traded > 0 {
                ledger.balance / traded as f64
            } else {
                0.0
            },
            buy_volume_assigned: core.oms.buy_volume_assigned(),
            sell_volume_assigned: core.oms.sell_volume_assigned(),
            ..TraderReport::default()
        }
    }
}
