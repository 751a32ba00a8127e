// src/assignment.rs

//! Trading goals and the orders they spawn.

use crate::error::{MarketError, Result};
use crate::simulators::Exchange;
use crate::types::{
    AssignmentId, Commodity, Direction, IdGenerator, Order, OrderId, OrderRequest, TraderId,
};
use std::cmp::Ordering;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentState {
    Open,
    PartiallyFilled,
    Completed,
    Cancelled,
}

/// Terms of a new assignment.
#[derive(Debug, Clone)]
pub struct AssignmentRequest {
    pub owner: TraderId,
    pub commodity: Commodity,
    pub direction: Direction,
    pub limit_price: f64,
    pub volume: u64,
    pub timestamp: u64,
    pub deadline: u64,
}

/// A trader's goal: trade `original_volume` units no worse than `limit_price`.
///
/// While the assignment is open, the volume of its live orders plus the
/// executed volume never exceeds the original volume. The deadline is
/// advisory and never enforced here.
#[derive(Debug, Clone)]
pub struct Assignment {
    id: AssignmentId,
    owner: TraderId,
    commodity: Commodity,
    direction: Direction,
    limit_price: f64,
    original_volume: u64,
    volume_executed: u64,
    timestamp: u64,
    deadline: u64,
    state: AssignmentState,
    orders: Vec<Order>,
}

impl Assignment {
    pub fn new(id: AssignmentId, request: AssignmentRequest) -> Result<Self> {
        if !request.limit_price.is_finite() || request.limit_price < 0.0 {
            return Err(MarketError::InvalidPrice(request.limit_price));
        }
        if request.volume == 0 {
            return Err(MarketError::InvalidVolume);
        }
        Ok(Self {
            id,
            owner: request.owner,
            commodity: request.commodity,
            direction: request.direction,
            limit_price: request.limit_price,
            original_volume: request.volume,
            volume_executed: 0,
            timestamp: request.timestamp,
            deadline: request.deadline,
            state: AssignmentState::Open,
            orders: Vec::new(),
        })
    }

    pub fn id(&self) -> AssignmentId {
        self.id
    }

    pub fn owner(&self) -> TraderId {
        self.owner
    }

    pub fn commodity(&self) -> &Commodity {
        &self.commodity
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn limit_price(&self) -> f64 {
        self.limit_price
    }

    pub fn original_volume(&self) -> u64 {
        self.original_volume
    }

    pub fn volume_executed(&self) -> u64 {
        self.volume_executed
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn deadline(&self) -> u64 {
        self.deadline
    }

    pub fn state(&self) -> AssignmentState {
        self.state
    }

    /// Completed by execution or explicitly cancelled.
    pub fn is_completed(&self) -> bool {
        matches!(
            self.state,
            AssignmentState::Completed | AssignmentState::Cancelled
        )
    }

    pub fn live_orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn remaining_volume(&self) -> u64 {
        self.original_volume - self.volume_executed
    }

    pub fn live_volume(&self) -> u64 {
        self.orders.iter().map(Order::volume).sum()
    }

    /// Remaining volume not yet covered by a live order.
    pub fn unplaced_volume(&self) -> u64 {
        self.remaining_volume().saturating_sub(self.live_volume())
    }

    /// Builds (but does not attach) an order on behalf of this assignment.
    pub fn create_order(
        &self,
        ids: &IdGenerator,
        price: f64,
        volume: u64,
        timestamp: u64,
    ) -> Result<Order> {
        Order::new(
            ids.next_order_id(),
            OrderRequest {
                owner: self.owner,
                assignment: self.id,
                commodity: self.commodity.clone(),
                direction: self.direction,
                price,
                volume,
                timestamp,
            },
        )
    }

    /// Attaches a live order. Refused once completed, or when the order
    /// belongs elsewhere or would overcommit the remaining volume.
    pub fn new_order(&mut self, order: Order) -> bool {
        if self.is_completed() {
            warn!(assignment = %self.id, order = %order.id(), "assignment already completed");
            return false;
        }
        if order.assignment() != self.id
            || order.direction() != self.direction
            || order.commodity() != &self.commodity
        {
            warn!(assignment = %self.id, order = %order.id(), "order does not belong to assignment");
            return false;
        }
        if order.volume() > self.unplaced_volume() {
            warn!(
                assignment = %self.id,
                order = %order.id(),
                volume = order.volume(),
                unplaced = self.unplaced_volume(),
                "order would exceed assignment volume"
            );
            return false;
        }
        self.orders.push(order);
        true
    }

    /// Records that the book split `fragment` off the live order `original`,
    /// so both pieces stay tracked.
    pub fn order_split(&mut self, original: OrderId, fragment: Order) -> bool {
        let Some(live) = self.orders.iter_mut().find(|o| o.id() == original) else {
            warn!(assignment = %self.id, order = %original, "split of unknown order");
            return false;
        };
        if fragment.volume() >= live.volume() {
            warn!(assignment = %self.id, order = %original, "split fragment too large");
            return false;
        }
        live.reduce_volume(fragment.volume());
        self.orders.push(fragment);
        true
    }

    /// Applies an execution of `order` and detaches it.
    ///
    /// Completing the assignment cancels any other live orders so it can
    /// never trade beyond its committed volume.
    pub fn order_executes(&mut self, order: &Order, exchange: &mut Exchange) -> bool {
        if self.is_completed() {
            warn!(assignment = %self.id, order = %order.id(), "execution on completed assignment");
            return false;
        }
        let Some(pos) = self.orders.iter().position(|o| o.id() == order.id()) else {
            warn!(assignment = %self.id, order = %order.id(), "execution of unknown order");
            return false;
        };
        let executed = order.volume().min(self.remaining_volume());
        if executed >= self.orders[pos].volume() {
            self.orders.remove(pos);
        } else {
            self.orders[pos].reduce_volume(executed);
        }
        self.volume_executed += executed;
        debug!(
            assignment = %self.id,
            executed = self.volume_executed,
            original = self.original_volume,
            "assignment executed"
        );
        if self.volume_executed == self.original_volume {
            self.state = AssignmentState::Completed;
            self.cancel_orders(exchange);
        } else {
            self.state = AssignmentState::PartiallyFilled;
        }
        true
    }

    /// Fills up to `volume` units without touching the book. Live orders are
    /// withdrawn so the remainder can be re-quoted. Returns the volume used.
    pub fn execute_off_book(&mut self, volume: u64, exchange: &mut Exchange) -> u64 {
        if self.is_completed() || volume == 0 {
            return 0;
        }
        let used = volume.min(self.remaining_volume());
        self.cancel_orders(exchange);
        self.volume_executed += used;
        self.state = if self.volume_executed == self.original_volume {
            AssignmentState::Completed
        } else {
            AssignmentState::PartiallyFilled
        };
        used
    }

    /// Forgets a live order the owner already withdrew from the book.
    pub fn delete_order(&mut self, order_id: OrderId) -> bool {
        let before = self.orders.len();
        self.orders.retain(|o| o.id() != order_id);
        self.orders.len() != before
    }

    /// Withdraws every live order from the book. A no-op without live orders.
    pub fn cancel_orders(&mut self, exchange: &mut Exchange) -> bool {
        if self.orders.is_empty() {
            return true;
        }
        match exchange.book_mut(&self.commodity) {
            Some(book) => {
                for order in self.orders.drain(..) {
                    book.cancel_order(order.id());
                }
            }
            None => {
                warn!(assignment = %self.id, commodity = %self.commodity, "no book for commodity");
                self.orders.clear();
            }
        }
        true
    }

    /// Marks the assignment completed regardless of executed volume.
    pub fn set_completed(&mut self, exchange: &mut Exchange) -> bool {
        if self.is_completed() {
            warn!(assignment = %self.id, "assignment completed twice");
            return false;
        }
        self.cancel_orders(exchange);
        self.state = AssignmentState::Completed;
        true
    }

    pub fn cancel(&mut self, exchange: &mut Exchange) -> bool {
        if self.is_completed() {
            warn!(assignment = %self.id, "cannot cancel a completed assignment");
            return false;
        }
        self.cancel_orders(exchange);
        self.state = AssignmentState::Cancelled;
        true
    }

    /// Ranking for same-direction assignments: `Less` means `self` is the
    /// better one to trade first.
    ///
    /// Buys favour the higher limit price, sells the lower. Equal prices
    /// favour the earlier timestamp, the same tie-break as
    /// `Order::priority_cmp` uses for the book.
    pub fn rank_cmp(&self, other: &Assignment) -> Ordering {
        let by_price = match self.direction {
            Direction::Buy => other.limit_price.total_cmp(&self.limit_price),
            Direction::Sell => self.limit_price.total_cmp(&other.limit_price),
        };
        by_price
            .then(self.timestamp.cmp(&other.timestamp))
            .then(self.id.cmp(&other.id))
    }

    pub fn is_better_than(&self, other: &Assignment) -> bool {
        if self.direction != other.direction {
            warn!(a = %self.id, b = %other.id, "comparing assignments of opposite direction");
            return false;
        }
        self.rank_cmp(other) == Ordering::Less
    }
}
