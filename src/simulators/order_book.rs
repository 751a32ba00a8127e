// src/simulators/order_book.rs

use crate::types::{
    Commodity, Direction, IdGenerator, Order, OrderId, PriceVolumeTuple, Trade, TraderId,
};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, warn};

/// Float price usable as a `BTreeMap` key.
#[derive(Debug, Clone, Copy)]
pub struct PriceKey(pub f64);

impl PartialEq for PriceKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for PriceKey {}

impl PartialOrd for PriceKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PriceKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// All resting orders at one price, oldest first.
#[derive(Debug, Default)]
pub struct PriceLevel {
    pub total_volume: u64,
    pub orders: VecDeque<Order>,
}

impl PriceLevel {
    fn insert(&mut self, order: Order) {
        self.total_volume += order.volume();
        let pos = self
            .orders
            .partition_point(|o| o.timestamp() <= order.timestamp());
        self.orders.insert(pos, order);
    }

    fn pop_front(&mut self) -> Option<Order> {
        let order = self.orders.pop_front()?;
        self.total_volume = self.total_volume.saturating_sub(order.volume());
        Some(order)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookUpdateKind {
    Accepted,
    Cancelled,
    Executed,
}

/// Book-state record broadcast to subscribers after every accept, cancel or match.
///
/// For executions `direction` is the side of the incoming (aggressing) order
/// and `price` is the trade price.
#[derive(Debug, Clone, PartialEq)]
pub struct BookUpdate {
    pub commodity: Commodity,
    pub direction: Direction,
    pub price: f64,
    pub volume: u64,
    pub kind: BookUpdateKind,
    pub timestamp: u64,
}

impl BookUpdate {
    pub fn executed(&self) -> bool {
        self.kind == BookUpdateKind::Executed
    }
}

/// What the book produced, in the order it happened. The market drains these
/// and routes them: splits and trades to the owners, updates to subscribers.
#[derive(Debug, Clone)]
pub enum BookEvent {
    Split {
        owner: TraderId,
        original: OrderId,
        fragment: Order,
    },
    Trade(Trade),
    Update(BookUpdate),
}

pub struct OrderBook {
    commodity: Commodity,
    bids: BTreeMap<PriceKey, PriceLevel>,
    asks: BTreeMap<PriceKey, PriceLevel>,
    index: HashMap<OrderId, (Direction, PriceKey)>,
    subscribers: Vec<TraderId>,
    outbox: VecDeque<BookEvent>,
    last_trade_price: Option<f64>,
    ids: Arc<IdGenerator>,
}

impl OrderBook {
    pub fn new(commodity: Commodity, ids: Arc<IdGenerator>) -> Self {
        Self {
            commodity,
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            index: HashMap::new(),
            subscribers: Vec::new(),
            outbox: VecDeque::new(),
            last_trade_price: None,
            ids,
        }
    }

    pub fn commodity(&self) -> &Commodity {
        &self.commodity
    }

    /// Matches `order` against the opposite side with price-time priority and
    /// rests whatever is left.
    ///
    /// Each match trades at the resting order's price. When volumes differ the
    /// larger order is split so that both sides of every trade carry exactly
    /// the traded volume.
    pub fn add_order(&mut self, order: Order) -> Vec<Trade> {
        if order.commodity() != &self.commodity {
            warn!(order = %order.id(), book = %self.commodity, "order for another commodity");
            return Vec::new();
        }
        if self.index.contains_key(&order.id()) {
            warn!(order = %order.id(), "order is already on the book");
            return Vec::new();
        }

        let mut trades = Vec::new();
        let mut incoming = Some(order);
        let direction = incoming.as_ref().map_or(Direction::Buy, |o| o.direction());
        let timestamp = incoming.as_ref().map_or(0, |o| o.timestamp());

        let book_to_match = match direction {
            Direction::Buy => &mut self.asks,
            Direction::Sell => &mut self.bids,
        };

        while let Some(taker) = incoming.as_mut() {
            let best = match direction {
                Direction::Buy => book_to_match.keys().next().copied(),
                Direction::Sell => book_to_match.keys().next_back().copied(),
            };
            let Some(key) = best else { break };
            let price_is_good = match direction {
                Direction::Buy => key.0 <= taker.price(),
                Direction::Sell => key.0 >= taker.price(),
            };
            if !price_is_good {
                break;
            }
            let Some(level) = book_to_match.get_mut(&key) else { break };
            let Some(maker) = level.orders.front_mut() else {
                book_to_match.remove(&key);
                continue;
            };

            let maker_volume = maker.volume();
            let taker_volume = taker.volume();
            let (maker_fill, taker_fill) = if maker_volume > taker_volume {
                let fragment = match maker.split_order(taker_volume, &self.ids) {
                    Ok(fragment) => fragment,
                    Err(e) => {
                        warn!(error = %e, "could not split resting order");
                        break;
                    }
                };
                level.total_volume = level.total_volume.saturating_sub(taker_volume);
                self.outbox.push_back(BookEvent::Split {
                    owner: maker.owner(),
                    original: maker.id(),
                    fragment: fragment.clone(),
                });
                let Some(taker_fill) = incoming.take() else { break };
                (fragment, taker_fill)
            } else {
                let taker_fill = if maker_volume < taker_volume {
                    let fragment = match taker.split_order(maker_volume, &self.ids) {
                        Ok(fragment) => fragment,
                        Err(e) => {
                            warn!(error = %e, "could not split incoming order");
                            break;
                        }
                    };
                    self.outbox.push_back(BookEvent::Split {
                        owner: taker.owner(),
                        original: taker.id(),
                        fragment: fragment.clone(),
                    });
                    fragment
                } else {
                    let Some(whole) = incoming.take() else { break };
                    whole
                };
                let Some(maker_fill) = level.pop_front() else { break };
                self.index.remove(&maker_fill.id());
                if level.orders.is_empty() {
                    book_to_match.remove(&key);
                }
                (maker_fill, taker_fill)
            };

            let (buy, sell) = match direction {
                Direction::Buy => (taker_fill, maker_fill),
                Direction::Sell => (maker_fill, taker_fill),
            };
            let trade = match Trade::new(&self.ids, key.0, timestamp, buy, sell) {
                Ok(trade) => trade,
                Err(e) => {
                    warn!(error = %e, "rejected trade");
                    break;
                }
            };
            debug!(
                trade = %trade.id(),
                commodity = %self.commodity,
                price = trade.price(),
                volume = trade.volume(),
                "orders matched"
            );
            self.last_trade_price = Some(trade.price());
            self.outbox.push_back(BookEvent::Trade(trade.clone()));
            self.outbox.push_back(BookEvent::Update(BookUpdate {
                commodity: self.commodity.clone(),
                direction,
                price: trade.price(),
                volume: trade.volume(),
                kind: BookUpdateKind::Executed,
                timestamp,
            }));
            trades.push(trade);
        }

        if let Some(rest) = incoming {
            self.rest_order(rest);
        }
        trades
    }

    fn rest_order(&mut self, order: Order) {
        let key = PriceKey(order.price());
        let update = BookUpdate {
            commodity: self.commodity.clone(),
            direction: order.direction(),
            price: order.price(),
            volume: order.volume(),
            kind: BookUpdateKind::Accepted,
            timestamp: order.timestamp(),
        };
        debug!(order = %order.id(), price = order.price(), volume = order.volume(), "order rests");
        self.index.insert(order.id(), (order.direction(), key));
        let book_side = match order.direction() {
            Direction::Buy => &mut self.bids,
            Direction::Sell => &mut self.asks,
        };
        book_side.entry(key).or_default().insert(order);
        self.outbox.push_back(BookEvent::Update(update));
    }

    /// Removes a resting order. Returns `false` if it is no longer on the book.
    pub fn cancel_order(&mut self, order_id: OrderId) -> bool {
        let Some((direction, key)) = self.index.remove(&order_id) else {
            return false;
        };
        let book_side = match direction {
            Direction::Buy => &mut self.bids,
            Direction::Sell => &mut self.asks,
        };
        let Some(level) = book_side.get_mut(&key) else {
            return false;
        };
        let Some(pos) = level.orders.iter().position(|o| o.id() == order_id) else {
            return false;
        };
        let Some(cancelled) = level.orders.remove(pos) else {
            return false;
        };
        level.total_volume = level.total_volume.saturating_sub(cancelled.volume());
        if level.orders.is_empty() {
            book_side.remove(&key);
        }
        debug!(order = %order_id, "order cancelled");
        self.outbox.push_back(BookEvent::Update(BookUpdate {
            commodity: self.commodity.clone(),
            direction,
            price: cancelled.price(),
            volume: cancelled.volume(),
            kind: BookUpdateKind::Cancelled,
            timestamp: cancelled.timestamp(),
        }));
        true
    }

    pub fn best_bid(&self) -> Option<&Order> {
        self.bids.values().next_back().and_then(|l| l.orders.front())
    }

    pub fn best_ask(&self) -> Option<&Order> {
        self.asks.values().next().and_then(|l| l.orders.front())
    }

    pub fn is_empty_bids(&self) -> bool {
        self.bids.is_empty()
    }

    pub fn is_empty_asks(&self) -> bool {
        self.asks.is_empty()
    }

    pub fn last_trade_price(&self) -> Option<f64> {
        self.last_trade_price
    }

    pub fn contains(&self, order_id: OrderId) -> bool {
        self.index.contains_key(&order_id)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Aggregated (price, volume) per level, best level first.
    pub fn depth(&self, direction: Direction) -> Vec<PriceVolumeTuple> {
        let to_tuple = |(key, level): (&PriceKey, &PriceLevel)| {
            PriceVolumeTuple::new(key.0, level.total_volume)
        };
        match direction {
            Direction::Buy => self.bids.iter().rev().map(to_tuple).collect(),
            Direction::Sell => self.asks.iter().map(to_tuple).collect(),
        }
    }

    pub fn orders_of(&self, owner: TraderId) -> Vec<&Order> {
        self.bids
            .values()
            .chain(self.asks.values())
            .flat_map(|level| level.orders.iter())
            .filter(|o| o.owner() == owner)
            .collect()
    }

    /// Registers a trader for book-state updates. Delivery follows
    /// subscription order.
    pub fn subscribe(&mut self, trader: TraderId) -> bool {
        if self.subscribers.contains(&trader) {
            return false;
        }
        self.subscribers.push(trader);
        true
    }

    pub fn unsubscribe(&mut self, trader: TraderId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|&t| t != trader);
        self.subscribers.len() != before
    }

    pub fn subscribers(&self) -> &[TraderId] {
        &self.subscribers
    }

    pub fn drain_events(&mut self) -> Vec<BookEvent> {
        self.outbox.drain(..).collect()
    }

    pub fn has_pending_events(&self) -> bool {
        !self.outbox.is_empty()
    }
}

// -----------------------------------------------------------------------------
//  Unit Tests
// -----------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AssignmentId, OrderRequest};

    fn new_book() -> (OrderBook, Arc<IdGenerator>) {
        let ids = Arc::new(IdGenerator::new());
        (OrderBook::new(Commodity::new("small"), ids.clone()), ids)
    }

    // Helper to create an order with less boilerplate.
    fn new_order(
        ids: &IdGenerator,
        owner: TraderId,
        direction: Direction,
        price: f64,
        volume: u64,
        timestamp: u64,
    ) -> Order {
        Order::new(
            ids.next_order_id(),
            OrderRequest {
                owner,
                assignment: AssignmentId(owner as u64),
                commodity: Commodity::new("small"),
                direction,
                price,
                volume,
                timestamp,
            },
        )
        .unwrap()
    }

    fn assert_not_crossed(book: &OrderBook) {
        if let (Some(bid), Some(ask)) = (book.best_bid(), book.best_ask()) {
            assert!(bid.price() < ask.price(), "book is crossed: {} >= {}", bid.price(), ask.price());
        }
    }

    #[test]
    fn test_add_simple_limit_order() {
        let (mut book, ids) = new_book();
        let order = new_order(&ids, 1, Direction::Buy, 100.0, 50, 0);
        let id = order.id();

        let trades = book.add_order(order);

        assert!(trades.is_empty());
        assert_eq!(book.best_bid().map(|o| o.id()), Some(id));
        assert!(book.is_empty_asks());
        assert_eq!(book.depth(Direction::Buy), vec![PriceVolumeTuple::new(100.0, 50)]);
    }

    #[test]
    fn test_marketable_order_trades_at_resting_price() {
        let (mut book, ids) = new_book();
        book.add_order(new_order(&ids, 1, Direction::Sell, 100.0, 50, 0));

        let trades = book.add_order(new_order(&ids, 2, Direction::Buy, 101.0, 30, 1));

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].price(), 100.0, "maker sets the price");
        assert_eq!(trades[0].volume(), 30);
        assert_eq!(trades[0].buy_order().owner(), 2);
        assert_eq!(trades[0].sell_order().owner(), 1);
        assert_eq!(book.depth(Direction::Sell), vec![PriceVolumeTuple::new(100.0, 20)]);
        assert!(book.is_empty_bids(), "fully filled taker must not rest");
        assert_eq!(book.last_trade_price(), Some(100.0));
    }

    #[test]
    fn test_partial_fill_rests_remainder() {
        let (mut book, ids) = new_book();
        book.add_order(new_order(&ids, 1, Direction::Sell, 100.0, 30, 0));
        let taker = new_order(&ids, 2, Direction::Buy, 101.0, 50, 1);
        let taker_id = taker.id();

        let trades = book.add_order(taker);

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].volume(), 30);
        assert!(book.is_empty_asks());
        let bid = book.best_bid().unwrap();
        assert_eq!(bid.id(), taker_id, "the remainder keeps the original id");
        assert_eq!(bid.volume(), 20);
        assert_eq!(bid.price(), 101.0);
        assert_not_crossed(&book);
    }

    #[test]
    fn test_sweep_across_levels() {
        let (mut book, ids) = new_book();
        book.add_order(new_order(&ids, 1, Direction::Sell, 100.0, 10, 0));
        book.add_order(new_order(&ids, 1, Direction::Sell, 101.0, 10, 1));
        book.add_order(new_order(&ids, 1, Direction::Sell, 105.0, 10, 2));

        let trades = book.add_order(new_order(&ids, 2, Direction::Buy, 102.0, 25, 3));

        let prices: Vec<f64> = trades.iter().map(|t| t.price()).collect();
        assert_eq!(prices, vec![100.0, 101.0]);
        assert_eq!(book.best_bid().map(|o| o.volume()), Some(5));
        assert_eq!(book.best_ask().map(|o| o.price()), Some(105.0));
        assert_not_crossed(&book);
    }

    #[test]
    fn test_price_time_priority() {
        let (mut book, ids) = new_book();
        let low = new_order(&ids, 1, Direction::Buy, 99.0, 5, 0);
        let early = new_order(&ids, 2, Direction::Buy, 100.0, 5, 1);
        let late = new_order(&ids, 3, Direction::Buy, 100.0, 5, 2);
        book.add_order(late);
        book.add_order(low);
        book.add_order(early);

        let first = book.add_order(new_order(&ids, 9, Direction::Sell, 90.0, 5, 3));
        let second = book.add_order(new_order(&ids, 9, Direction::Sell, 90.0, 5, 4));
        let third = book.add_order(new_order(&ids, 9, Direction::Sell, 90.0, 5, 5));

        assert_eq!(first[0].buy_order().owner(), 2, "earlier of the best price first");
        assert_eq!(second[0].buy_order().owner(), 3);
        assert_eq!(third[0].buy_order().owner(), 1, "lower price last");
        assert_eq!(third[0].price(), 99.0);
    }

    #[test]
    fn test_split_event_precedes_trade() {
        let (mut book, ids) = new_book();
        let resting = new_order(&ids, 1, Direction::Sell, 10.0, 8, 0);
        let resting_id = resting.id();
        book.add_order(resting);
        book.drain_events();

        book.add_order(new_order(&ids, 2, Direction::Buy, 10.0, 3, 1));
        let events = book.drain_events();

        assert_eq!(events.len(), 3);
        match &events[0] {
            BookEvent::Split { owner, original, fragment } => {
                assert_eq!(*owner, 1);
                assert_eq!(*original, resting_id);
                assert_eq!(fragment.volume(), 3);
            }
            other => panic!("expected split, got {:?}", other),
        }
        match &events[1] {
            BookEvent::Trade(trade) => assert_eq!(trade.volume(), 3),
            other => panic!("expected trade, got {:?}", other),
        }
        match &events[2] {
            BookEvent::Update(update) => {
                assert!(update.executed());
                assert_eq!(update.direction, Direction::Buy);
            }
            other => panic!("expected update, got {:?}", other),
        }
        assert_eq!(book.best_ask().map(|o| (o.id(), o.volume())), Some((resting_id, 5)));
    }

    #[test]
    fn test_cancel_order_simple() {
        let (mut book, ids) = new_book();
        let order = new_order(&ids, 1, Direction::Buy, 100.0, 50, 0);
        let id = order.id();
        book.add_order(order);

        assert!(book.cancel_order(id));
        assert!(book.is_empty_bids());
        assert!(!book.cancel_order(id), "second cancel reports the order is gone");

        let kinds: Vec<BookUpdateKind> = book
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                BookEvent::Update(u) => Some(u.kind),
                _ => None,
            })
            .collect();
        assert_eq!(kinds, vec![BookUpdateKind::Accepted, BookUpdateKind::Cancelled]);
    }

    #[test]
    fn test_rejects_foreign_commodity() {
        let (mut book, ids) = new_book();
        let order = Order::new(
            ids.next_order_id(),
            OrderRequest {
                owner: 1,
                assignment: AssignmentId(1),
                commodity: Commodity::new("large"),
                direction: Direction::Buy,
                price: 10.0,
                volume: 1,
                timestamp: 0,
            },
        )
        .unwrap();
        assert!(book.add_order(order).is_empty());
        assert!(book.is_empty());
        assert!(!book.has_pending_events());
    }

    #[test]
    fn test_subscription_is_ordered_and_unique() {
        let (mut book, _) = new_book();
        assert!(book.subscribe(3));
        assert!(book.subscribe(1));
        assert!(!book.subscribe(3));
        assert_eq!(book.subscribers(), &[3, 1]);
        assert!(book.unsubscribe(3));
        assert!(!book.unsubscribe(3));
        assert_eq!(book.subscribers(), &[1]);
    }

    #[test]
    fn test_random_flow_never_leaves_book_crossed() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let (mut book, ids) = new_book();
        let mut rng = StdRng::seed_from_u64(7);
        for t in 0..2_000 {
            let direction = if rng.gen_bool(0.5) { Direction::Buy } else { Direction::Sell };
            let price = rng.gen_range(90..=110) as f64;
            let volume = rng.gen_range(1..=20);
            let order = new_order(&ids, rng.gen_range(0..10), direction, price, volume, t);
            for trade in book.add_order(order) {
                assert!(trade.volume() > 0);
                assert_eq!(trade.buy_order().volume(), trade.volume());
                assert_eq!(trade.sell_order().volume(), trade.volume());
            }
            assert_not_crossed(&book);
        }
    }
}
