// src/types/order.rs

use super::commodity::{Commodity, Direction};
use super::ids::{AssignmentId, IdGenerator, OrderId, TraderId};
use crate::error::{MarketError, Result};
use std::cmp::Ordering;
use tracing::warn;

/// Everything needed to create an order except its id.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub owner: TraderId,
    pub assignment: AssignmentId,
    pub commodity: Commodity,
    pub direction: Direction,
    pub price: f64,
    pub volume: u64,
    pub timestamp: u64,
}

/// A live quote on an order book, owned by one trader and linked to one assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    id: OrderId,
    owner: TraderId,
    assignment: AssignmentId,
    commodity: Commodity,
    direction: Direction,
    price: f64,
    volume: u64,
    timestamp: u64,
}

impl Order {
    /// Malformed orders are rejected here, never inside the book.
    pub fn new(id: OrderId, request: OrderRequest) -> Result<Self> {
        if !request.price.is_finite() || request.price <= 0.0 {
            return Err(MarketError::InvalidPrice(request.price));
        }
        if request.volume == 0 {
            return Err(MarketError::InvalidVolume);
        }
        Ok(Self {
            id,
            owner: request.owner,
            assignment: request.assignment,
            commodity: request.commodity,
            direction: request.direction,
            price: request.price,
            volume: request.volume,
            timestamp: request.timestamp,
        })
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn owner(&self) -> TraderId {
        self.owner
    }

    pub fn assignment(&self) -> AssignmentId {
        self.assignment
    }

    pub fn commodity(&self) -> &Commodity {
        &self.commodity
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn volume(&self) -> u64 {
        self.volume
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Splits `new_volume` units off this order.
    ///
    /// The original keeps its id and shrinks in place; the returned fragment
    /// has a fresh id and the same owner, assignment, price, direction and
    /// timestamp. Requires `0 < new_volume < self.volume()`.
    pub fn split_order(&mut self, new_volume: u64, ids: &IdGenerator) -> Result<Order> {
        if new_volume == 0 || new_volume >= self.volume {
            return Err(MarketError::InvalidSplit {
                requested: new_volume,
                current: self.volume,
            });
        }
        self.volume -= new_volume;
        Ok(Order {
            id: ids.next_order_id(),
            volume: new_volume,
            ..self.clone()
        })
    }

    pub(crate) fn reduce_volume(&mut self, by: u64) {
        self.volume = self.volume.saturating_sub(by);
    }

    /// True when `self` and `other` are on opposite sides of the same
    /// commodity and their prices overlap.
    pub fn crosses(&self, other: &Order) -> bool {
        if self.direction == other.direction || self.commodity != other.commodity {
            return false;
        }
        let (bid, ask) = match self.direction {
            Direction::Buy => (self, other),
            Direction::Sell => (other, self),
        };
        bid.price >= ask.price
    }

    /// Book priority of two same-side orders: `Less` means `self` matches first.
    ///
    /// Bids rank by price descending, asks by price ascending; equal prices
    /// favour the earlier timestamp, then the lower id.
    pub fn priority_cmp(&self, other: &Order) -> Ordering {
        let by_price = match self.direction {
            Direction::Buy => other.price.total_cmp(&self.price),
            Direction::Sell => self.price.total_cmp(&other.price),
        };
        by_price
            .then(self.timestamp.cmp(&other.timestamp))
            .then(self.id.cmp(&other.id))
    }

    /// Whether `self` would match before `other`. Comparing orders of
    /// opposite directions is misuse and yields `false`.
    pub fn is_better_than(&self, other: &Order) -> bool {
        if self.direction != other.direction {
            warn!(a = %self.id, b = %other.id, "comparing orders of opposite direction");
            return false;
        }
        self.priority_cmp(other) == Ordering::Less
    }
}
