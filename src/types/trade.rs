// src/types/trade.rs

use super::commodity::{Commodity, Direction};
use super::ids::{IdGenerator, TradeId, TraderId};
use super::order::Order;
use crate::error::{MarketError, Result};

/// Immutable record of one execution between a buy and a sell order.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    id: TradeId,
    price: f64,
    volume: u64,
    timestamp: u64,
    buy_order: Order,
    sell_order: Order,
}

impl Trade {
    /// The two orders carry exactly the executed volume.
    pub fn new(
        ids: &IdGenerator,
        price: f64,
        timestamp: u64,
        buy_order: Order,
        sell_order: Order,
    ) -> Result<Self> {
        if buy_order.direction() != Direction::Buy || sell_order.direction() != Direction::Sell {
            return Err(MarketError::DirectionMismatch);
        }
        if buy_order.commodity() != sell_order.commodity() {
            return Err(MarketError::CommodityMismatch {
                expected: buy_order.commodity().to_string(),
                found: sell_order.commodity().to_string(),
            });
        }
        let volume = buy_order.volume().min(sell_order.volume());
        Ok(Self {
            id: ids.next_trade_id(),
            price,
            volume,
            timestamp,
            buy_order,
            sell_order,
        })
    }

    pub fn id(&self) -> TradeId {
        self.id
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

    pub fn commodity(&self) -> &Commodity {
        self.buy_order.commodity()
    }

    pub fn buy_order(&self) -> &Order {
        &self.buy_order
    }

    pub fn sell_order(&self) -> &Order {
        &self.sell_order
    }

    pub fn value(&self) -> f64 {
        self.price * self.volume as f64
    }

    /// Calls `notify` once per side with the owning trader and the order that
    /// executed on its behalf, buyer first.
    pub fn update_owners<F>(&self, mut notify: F)
    where
        F: FnMut(TraderId, &Order),
    {
        notify(self.buy_order.owner(), &self.buy_order);
        notify(self.sell_order.owner(), &self.sell_order);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ids::AssignmentId;
    use crate::types::order::OrderRequest;

    fn order(ids: &IdGenerator, owner: TraderId, direction: Direction, commodity: &str, volume: u64) -> Order {
        Order::new(
            ids.next_order_id(),
            OrderRequest {
                owner,
                assignment: AssignmentId(owner as u64),
                commodity: Commodity::new(commodity),
                direction,
                price: 10.0,
                volume,
                timestamp: 0,
            },
        )
        .unwrap()
    }

    #[test]
    fn pairs_one_buy_and_one_sell() {
        let ids = IdGenerator::new();
        let buy = order(&ids, 1, Direction::Buy, "small", 5);
        let sell = order(&ids, 2, Direction::Sell, "small", 5);
        let trade = Trade::new(&ids, 10.0, 7, buy, sell).unwrap();
        assert_eq!(trade.volume(), 5);
        assert_eq!(trade.value(), 50.0);

        let mut notified = Vec::new();
        trade.update_owners(|owner, order| notified.push((owner, order.direction())));
        assert_eq!(notified, vec![(1, Direction::Buy), (2, Direction::Sell)]);
    }

    #[test]
    fn rejects_same_side_or_mixed_commodity() {
        let ids = IdGenerator::new();
        let a = order(&ids, 1, Direction::Buy, "small", 5);
        let b = order(&ids, 2, Direction::Buy, "small", 5);
        assert!(matches!(
            Trade::new(&ids, 10.0, 0, a, b),
            Err(MarketError::DirectionMismatch)
        ));

        let buy = order(&ids, 1, Direction::Buy, "small", 5);
        let sell = order(&ids, 2, Direction::Sell, "large", 5);
        assert!(matches!(
            Trade::new(&ids, 10.0, 0, buy, sell),
            Err(MarketError::CommodityMismatch { .. })
        ));
    }
}
