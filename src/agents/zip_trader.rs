// src/agents/zip_trader.rs

//! Zero-Intelligence-Plus trader (Cliff & Bruten, 1997).
//!
//! Each side keeps a profit margin on its limit price. Every observed shout
//! nudges the margin towards a perturbed target derived from the shout
//! price, smoothed with momentum.

use super::agent_trait::{Trader, TraderCore};
use super::agent_type::TraderType;
use super::config::{
    ZIP_BUY_MARGIN_CEILING, ZIP_INITIAL_BUY_MARGIN_MAX, ZIP_INITIAL_BUY_MARGIN_MIN,
    ZIP_INITIAL_SELL_MARGIN_MAX, ZIP_INITIAL_SELL_MARGIN_MIN, ZIP_LEARNING_RATE_MAX,
    ZIP_LEARNING_RATE_MIN, ZIP_LOWER_A_MIN, ZIP_LOWER_R_MIN, ZIP_MOMENTUM_MAX, ZIP_MOMENTUM_MIN,
    ZIP_RAISE_A_MAX, ZIP_RAISE_R_MAX,
};
use crate::simulators::{BookUpdate, BookUpdateKind, Exchange};
use crate::types::{AssignmentId, Direction, IdGenerator, Order, Trade, TraderId};
use rand::Rng;
use rand::rngs::StdRng;
use std::sync::Arc;
use tracing::{trace, warn};

/// Margin and momentum for one side of the book.
#[derive(Debug, Clone, Copy)]
pub struct ZipSide {
    pub margin: f64,
    pub momentum: f64,
}

pub struct ZipTrader {
    core: TraderCore,
    buy: ZipSide,
    sell: ZipSide,
    learning_rate: f64,
    momentum_coefficient: f64,
}

impl ZipTrader {
    pub fn new(id: TraderId, ids: Arc<IdGenerator>, rng: StdRng) -> Self {
        Self::with_name(id, format!("zip-{}", id), ids, rng)
    }

    pub fn with_name(id: TraderId, name: String, ids: Arc<IdGenerator>, mut rng: StdRng) -> Self {
        let learning_rate = rng.gen_range(ZIP_LEARNING_RATE_MIN..=ZIP_LEARNING_RATE_MAX);
        let momentum_coefficient = rng.gen_range(ZIP_MOMENTUM_MIN..=ZIP_MOMENTUM_MAX);
        let buy_margin = rng.gen_range(ZIP_INITIAL_BUY_MARGIN_MIN..=ZIP_INITIAL_BUY_MARGIN_MAX);
        let sell_margin = rng.gen_range(ZIP_INITIAL_SELL_MARGIN_MIN..=ZIP_INITIAL_SELL_MARGIN_MAX);
        Self {
            core: TraderCore::new(id, name, ids, rng),
            buy: ZipSide {
                margin: buy_margin,
                momentum: 0.0,
            },
            sell: ZipSide {
                margin: sell_margin,
                momentum: 0.0,
            },
            learning_rate,
            momentum_coefficient,
        }
    }

    pub fn margin(&self, direction: Direction) -> f64 {
        self.side(direction).margin
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn momentum_coefficient(&self) -> f64 {
        self.momentum_coefficient
    }

    fn side(&self, direction: Direction) -> &ZipSide {
        match direction {
            Direction::Buy => &self.buy,
            Direction::Sell => &self.sell,
        }
    }

    fn side_mut(&mut self, direction: Direction) -> &mut ZipSide {
        match direction {
            Direction::Buy => &mut self.buy,
            Direction::Sell => &mut self.sell,
        }
    }

    /// Quote for one unit with limit price `limit`: `limit * (1 + margin)`.
    pub fn price_for(&self, limit: f64, direction: Direction) -> f64 {
        limit * (1.0 + self.margin(direction))
    }

    /// Perturbed target around the shout price `q`.
    fn target_price(&mut self, q: f64, increase: bool) -> f64 {
        let rng = &mut self.core.rng;
        let (r, a) = if increase {
            (rng.gen_range(1.0..=ZIP_RAISE_R_MAX), rng.gen_range(0.0..=ZIP_RAISE_A_MAX))
        } else {
            (rng.gen_range(ZIP_LOWER_R_MIN..=1.0), rng.gen_range(ZIP_LOWER_A_MIN..=0.0))
        };
        r * q + a
    }

    /// Widrow-Hoff step with momentum towards `target`, then clamps the margin
    /// into its side's range.
    fn update_margin(&mut self, direction: Direction, limit: f64, target: f64) {
        if limit <= 0.0 {
            return;
        }
        let price = self.price_for(limit, direction);
        let delta = self.learning_rate * (target - price);
        let gamma = self.momentum_coefficient;
        let side = self.side_mut(direction);
        side.momentum = gamma * side.momentum + (1.0 - gamma) * delta;
        let margin = (price + side.momentum) / limit - 1.0;
        side.margin = match direction {
            Direction::Buy => margin.clamp(-1.0, ZIP_BUY_MARGIN_CEILING),
            Direction::Sell => margin.max(0.0),
        };
    }

    /// Whether the price should move up (`Some(true)`), down
    /// (`Some(false)`), or stay for a trader quoting `price` in `direction`.
    fn price_move(direction: Direction, price: f64, update: &BookUpdate) -> Option<bool> {
        let q = update.price;
        match (direction, update.executed()) {
            (Direction::Sell, true) if price <= q => Some(true),
            (Direction::Sell, true) if update.direction == Direction::Buy && price >= q => Some(false),
            (Direction::Sell, false) if update.direction == Direction::Sell && price >= q => Some(false),
            (Direction::Buy, true) if price >= q => Some(false),
            (Direction::Buy, true) if update.direction == Direction::Sell && price <= q => Some(true),
            (Direction::Buy, false) if update.direction == Direction::Buy && price <= q => Some(true),
            _ => None,
        }
    }

    /// Applies the learning rule for both sides. A side is only updated while
    /// the trader has an open assignment on it for the shout's commodity.
    pub fn react(&mut self, update: &BookUpdate) {
        if update.kind == BookUpdateKind::Cancelled || update.price <= 0.0 {
            return;
        }
        for direction in [Direction::Buy, Direction::Sell] {
            let Some(limit) = self
                .core
                .oms
                .best_assignment(&update.commodity, direction)
                .map(|a| a.limit_price())
            else {
                continue;
            };
            let price = self.price_for(limit, direction);
            let Some(increase) = Self::price_move(direction, price, update) else {
                continue;
            };
            let target = self.target_price(update.price, increase);
            self.update_margin(direction, limit, target);
            trace!(
                trader = self.core.id,
                %direction,
                shout = update.price,
                target,
                margin = self.margin(direction),
                "zip margin update"
            );
        }
    }
}

impl Trader for ZipTrader {
    fn core(&self) -> &TraderCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TraderCore {
        &mut self.core
    }

    fn trader_type(&self) -> TraderType {
        TraderType::Zip
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
        let price = self.price_for(limit, direction);
        if price <= 0.0 {
            warn!(trader = self.core.id, assignment = %assignment, price, "zip quote is not positive");
            return None;
        }
        self.core.requote(assignment, price, exchange, time)
    }

    fn order_book_updated(&mut self, update: &BookUpdate) {
        self.react(update);
    }

    /// Hits the best opposing quote for any assignment it is profitable for.
    fn execute(&mut self, exchange: &mut Exchange, time: u64) -> bool {
        let mut sent = false;
        for id in self.core.oms.open_ids() {
            let Some(a) = self.core.oms.assignment(id) else { continue };
            if a.is_completed() {
                continue;
            }
            let (limit, direction) = (a.limit_price(), a.direction());
            let Some(book) = exchange.book(a.commodity()) else { continue };
            let best = match direction {
                Direction::Buy => book.best_ask(),
                Direction::Sell => book.best_bid(),
            };
            let Some(quote) = best.filter(|o| o.owner() != self.core.id) else { continue };
            let favourable = match direction {
                Direction::Buy => quote.price() <= limit,
                Direction::Sell => quote.price() >= limit,
            };
            if !favourable {
                continue;
            }
            let price = quote.price();
            sent |= self.core.requote(id, price, exchange, time).is_some();
        }
        sent
    }

    fn perform_clearing(&mut self, _order: &Order, _trade: &Trade) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::{Assignment, AssignmentRequest};
    use crate::types::Commodity;
    use rand::SeedableRng;

    fn trader(id: TraderId, seed: u64) -> ZipTrader {
        ZipTrader::new(id, Arc::new(IdGenerator::new()), StdRng::seed_from_u64(seed))
    }

    fn give(trader: &mut ZipTrader, direction: Direction, limit: f64) {
        let ids = trader.core.ids.clone();
        let assignment = Assignment::new(
            ids.next_assignment_id(),
            AssignmentRequest {
                owner: trader.id(),
                commodity: Commodity::new("small"),
                direction,
                limit_price: limit,
                volume: 1,
                timestamp: 0,
                deadline: 100,
            },
        )
        .unwrap();
        assert!(trader.add_assignment(assignment));
    }

    fn shout(direction: Direction, price: f64, kind: BookUpdateKind) -> BookUpdate {
        BookUpdate {
            commodity: Commodity::new("small"),
            direction,
            price,
            volume: 1,
            kind,
            timestamp: 0,
        }
    }

    #[test]
    fn parameters_drawn_within_ranges() {
        for seed in 0..50 {
            let t = trader(0, seed);
            assert!((ZIP_LEARNING_RATE_MIN..=ZIP_LEARNING_RATE_MAX).contains(&t.learning_rate()));
            assert!((ZIP_MOMENTUM_MIN..=ZIP_MOMENTUM_MAX).contains(&t.momentum_coefficient()));
            assert!(t.margin(Direction::Buy) >= -1.0 && t.margin(Direction::Buy) < 0.0);
            assert!(t.margin(Direction::Sell) >= 0.0);
        }
    }

    #[test]
    fn inactive_trader_ignores_shouts() {
        let mut t = trader(0, 1);
        let before = (t.margin(Direction::Buy), t.margin(Direction::Sell));
        t.order_book_updated(&shout(Direction::Sell, 5.0, BookUpdateKind::Executed));
        assert_eq!(before, (t.margin(Direction::Buy), t.margin(Direction::Sell)));
    }

    #[test]
    fn seller_raises_margin_after_trade_above_its_price() {
        let mut t = trader(0, 2);
        give(&mut t, Direction::Sell, 10.0);
        let price = t.price_for(10.0, Direction::Sell);
        let before = t.margin(Direction::Sell);

        t.order_book_updated(&shout(Direction::Buy, price * 1.5, BookUpdateKind::Executed));

        assert!(t.margin(Direction::Sell) > before);
    }

    #[test]
    fn seller_lowers_margin_when_undercut() {
        let mut t = trader(0, 3);
        give(&mut t, Direction::Sell, 10.0);
        let price = t.price_for(10.0, Direction::Sell);
        let before = t.margin(Direction::Sell);

        t.order_book_updated(&shout(Direction::Sell, price * 0.9, BookUpdateKind::Accepted));

        assert!(t.margin(Direction::Sell) < before);
    }

    #[test]
    fn buyer_raises_price_when_outbid() {
        let mut t = trader(0, 4);
        give(&mut t, Direction::Buy, 10.0);
        let price = t.price_for(10.0, Direction::Buy);

        t.order_book_updated(&shout(Direction::Buy, price * 1.05, BookUpdateKind::Accepted));

        assert!(t.price_for(10.0, Direction::Buy) > price);
    }

    #[test]
    fn buyer_lowers_price_after_cheap_trade() {
        let mut t = trader(0, 5);
        give(&mut t, Direction::Buy, 10.0);
        let price = t.price_for(10.0, Direction::Buy);

        t.order_book_updated(&shout(Direction::Sell, price * 0.5, BookUpdateKind::Executed));

        assert!(t.price_for(10.0, Direction::Buy) < price);
    }

    #[test]
    fn cancellations_are_not_shouts() {
        let mut t = trader(0, 6);
        give(&mut t, Direction::Sell, 10.0);
        let before = t.margin(Direction::Sell);
        t.order_book_updated(&shout(Direction::Sell, 1.0, BookUpdateKind::Cancelled));
        assert_eq!(t.margin(Direction::Sell), before);
    }

    #[test]
    fn margins_stay_bounded_under_random_shouts() {
        let mut t = trader(0, 7);
        give(&mut t, Direction::Buy, 10.0);
        give(&mut t, Direction::Sell, 10.0);
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..10_000 {
            let direction = if rng.gen_bool(0.5) { Direction::Buy } else { Direction::Sell };
            let kind = if rng.gen_bool(0.5) {
                BookUpdateKind::Executed
            } else {
                BookUpdateKind::Accepted
            };
            let price = rng.gen_range(0.01..100.0);
            t.order_book_updated(&shout(direction, price, kind));

            let buy = t.margin(Direction::Buy);
            assert!((-1.0..0.0).contains(&buy), "buy margin escaped: {}", buy);
            assert!(t.margin(Direction::Sell) >= 0.0);
        }
    }
}
