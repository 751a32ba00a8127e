// src/simulators/exchange.rs

use super::order_book::{BookEvent, OrderBook};
use crate::types::{Commodity, IdGenerator, TraderId};
use std::collections::BTreeMap;
use std::sync::Arc;

/// The retail market: one order book per registered commodity.
pub struct Exchange {
    books: BTreeMap<Commodity, OrderBook>,
    ids: Arc<IdGenerator>,
}

impl Exchange {
    pub fn new(ids: Arc<IdGenerator>) -> Self {
        Self {
            books: BTreeMap::new(),
            ids,
        }
    }

    pub fn with_commodities<I>(ids: Arc<IdGenerator>, commodities: I) -> Self
    where
        I: IntoIterator<Item = Commodity>,
    {
        let mut exchange = Self::new(ids);
        for commodity in commodities {
            exchange.add_commodity(commodity);
        }
        exchange
    }

    /// Returns `false` if the commodity already has a book.
    pub fn add_commodity(&mut self, commodity: Commodity) -> bool {
        if self.books.contains_key(&commodity) {
            return false;
        }
        let book = OrderBook::new(commodity.clone(), self.ids.clone());
        self.books.insert(commodity, book);
        true
    }

    pub fn ids(&self) -> &Arc<IdGenerator> {
        &self.ids
    }

    pub fn book(&self, commodity: &Commodity) -> Option<&OrderBook> {
        self.books.get(commodity)
    }

    pub fn book_mut(&mut self, commodity: &Commodity) -> Option<&mut OrderBook> {
        self.books.get_mut(commodity)
    }

    pub fn commodities(&self) -> impl Iterator<Item = &Commodity> {
        self.books.keys()
    }

    pub fn subscribe_all(&mut self, trader: TraderId) {
        for book in self.books.values_mut() {
            book.subscribe(trader);
        }
    }

    pub fn has_pending_events(&self) -> bool {
        self.books.values().any(OrderBook::has_pending_events)
    }

    /// Takes the pending events of every book, paired with the subscriber
    /// list that was current when they were drained.
    pub fn drain_events(&mut self) -> Vec<(Vec<TraderId>, BookEvent)> {
        let mut drained = Vec::new();
        for book in self.books.values_mut() {
            let subscribers = book.subscribers().to_vec();
            for event in book.drain_events() {
                drained.push((subscribers.clone(), event));
            }
        }
        drained
    }
}
