// src/agents/instance_trader.rs

//! A ZIP trader that owns compute instances.
//!
//! Reserved instances are bought from the provider for a multi-month term.
//! Each month an instance is either used to cover the owner's own demand or
//! resold on the exchange for the rest of the month. Demand still unmet at
//! its deadline is bought on demand from the provider.

use super::agent_trait::{Trader, TraderCore};
use super::agent_type::TraderType;
use super::config::{
    INSTANCE_PROB_BUYING_RI, MM_INITIAL_PROB_BUYING_RI, MM_PROB_STEP, ON_DEMAND_PRICE,
    RESALE_DEADLINE_TICKS, RESALE_LIMIT_PRICE, RESERVED_INSTANCE_PRICE, RESERVED_TERM_MONTHS,
    TICKS_PER_MONTH,
};
use super::report::TraderReport;
use super::zip_trader::ZipTrader;
use crate::assignment::{Assignment, AssignmentRequest};
use crate::simulators::{BookUpdate, Exchange};
use crate::types::{AssignmentId, Commodity, Direction, IdGenerator, Order, Trade, TraderId};
use rand::Rng;
use rand::rngs::StdRng;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    Available,
    InUse,
    /// Resold to another trader until the month ends.
    Sold,
}

/// One unit of owned capacity.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub commodity: Commodity,
    /// First tick at which the instance is no longer owned.
    pub expires_at: u64,
    pub state: InstanceState,
}

#[derive(Debug, Clone, Copy, Default)]
struct InstanceStats {
    on_demand_purchased: u64,
    reserved_purchased: u64,
    market_purchased: u64,
    total_cost: f64,
    owned_unit_ticks: u64,
    used_unit_ticks: u64,
}

pub struct InstanceTrader {
    zip: ZipTrader,
    market_maker: bool,
    prob_buying_ri: f64,
    inventory: Vec<Instance>,
    resale_this_month: Vec<AssignmentId>,
    stats: InstanceStats,
}

impl InstanceTrader {
    pub fn new(id: TraderId, ids: Arc<IdGenerator>, rng: StdRng) -> Self {
        Self::build(id, format!("instance-{}", id), false, INSTANCE_PROB_BUYING_RI, ids, rng)
    }

    /// Buys reserved instances purely for resale and adapts its purchase
    /// probability to how well the previous month sold.
    pub fn market_maker(id: TraderId, ids: Arc<IdGenerator>, rng: StdRng) -> Self {
        Self::build(
            id,
            format!("market_maker-{}", id),
            true,
            MM_INITIAL_PROB_BUYING_RI,
            ids,
            rng,
        )
    }

    fn build(
        id: TraderId,
        name: String,
        market_maker: bool,
        prob_buying_ri: f64,
        ids: Arc<IdGenerator>,
        rng: StdRng,
    ) -> Self {
        Self {
            zip: ZipTrader::with_name(id, name, ids, rng),
            market_maker,
            prob_buying_ri,
            inventory: Vec::new(),
            resale_this_month: Vec::new(),
            stats: InstanceStats::default(),
        }
    }

    pub fn is_market_maker(&self) -> bool {
        self.market_maker
    }

    pub fn prob_buying_ri(&self) -> f64 {
        self.prob_buying_ri
    }

    pub fn set_prob_buying_ri(&mut self, prob: f64) {
        self.prob_buying_ri = prob.clamp(0.0, 1.0);
    }

    pub fn zip(&self) -> &ZipTrader {
        &self.zip
    }

    pub fn inventory(&self) -> &[Instance] {
        &self.inventory
    }

    pub fn available(&self, commodity: &Commodity) -> u64 {
        self.count(commodity, InstanceState::Available)
    }

    pub fn in_use(&self, commodity: &Commodity) -> u64 {
        self.count(commodity, InstanceState::InUse)
    }

    pub fn sold(&self, commodity: &Commodity) -> u64 {
        self.count(commodity, InstanceState::Sold)
    }

    fn count(&self, commodity: &Commodity, state: InstanceState) -> u64 {
        self.inventory
            .iter()
            .filter(|i| i.state == state && &i.commodity == commodity)
            .count() as u64
    }

    /// Adds `count` available instances owned until `expires_at`.
    pub fn add_instances(&mut self, commodity: &Commodity, count: u64, expires_at: u64) {
        self.push_instances(commodity, count, expires_at, InstanceState::Available);
    }

    fn push_instances(&mut self, commodity: &Commodity, count: u64, expires_at: u64, state: InstanceState) {
        for _ in 0..count {
            self.inventory.push(Instance {
                commodity: commodity.clone(),
                expires_at,
                state,
            });
        }
    }

    /// Flips up to `count` instances of `commodity` from `from` to `to`.
    fn transition(&mut self, commodity: &Commodity, count: u64, from: InstanceState, to: InstanceState) {
        let mut left = count;
        for instance in self.inventory.iter_mut() {
            if left == 0 {
                break;
            }
            if instance.state == from && &instance.commodity == commodity {
                instance.state = to;
                left -= 1;
            }
        }
    }

    fn maybe_buy_reserved(&mut self, commodity: &Commodity, time: u64) {
        let prob = self.prob_buying_ri;
        if prob <= 0.0 || !self.zip.core_mut().rng.gen_bool(prob.min(1.0)) {
            return;
        }
        self.add_instances(commodity, 1, time + RESERVED_TERM_MONTHS * TICKS_PER_MONTH);
        self.stats.reserved_purchased += 1;
        self.stats.total_cost += RESERVED_INSTANCE_PRICE;
        debug!(trader = self.id(), %commodity, "bought reserved instance");
    }

    /// Covers open demand with available instances, off the book. Matched
    /// instances are in use until the month ends. Returns the volume matched.
    pub fn internalize_trades(&mut self, commodity: &Commodity, exchange: &mut Exchange) -> u64 {
        let oms = &self.zip.core().oms;
        let amount = self.available(commodity).min(oms.get_demand_volume(commodity));
        if amount == 0 {
            return 0;
        }
        let unmatched = self.zip.core_mut().oms.match_demand(commodity, amount, exchange);
        let matched = amount - unmatched;
        self.transition(commodity, matched, InstanceState::Available, InstanceState::InUse);
        debug!(trader = self.id(), %commodity, matched, "internalised demand");
        matched
    }

    /// Offers available instances not already on sale through one new SELL
    /// assignment. Open resale that is no longer backed by inventory is
    /// withdrawn first.
    pub fn assign_excess_volume_for_sale(
        &mut self,
        commodity: &Commodity,
        exchange: &mut Exchange,
        time: u64,
    ) -> Option<AssignmentId> {
        let available = self.available(commodity);
        let mut on_sale = self.zip.core().oms.get_supply_volume(commodity);
        if on_sale > available {
            self.cancel_resale(commodity, exchange);
            on_sale = 0;
        }
        let excess = available - on_sale;
        if excess == 0 {
            return None;
        }
        let core = self.zip.core_mut();
        let assignment = match Assignment::new(
            core.ids.next_assignment_id(),
            AssignmentRequest {
                owner: core.id,
                commodity: commodity.clone(),
                direction: Direction::Sell,
                limit_price: RESALE_LIMIT_PRICE,
                volume: excess,
                timestamp: time,
                deadline: time + RESALE_DEADLINE_TICKS,
            },
        ) {
            Ok(assignment) => assignment,
            Err(e) => {
                warn!(trader = core.id, error = %e, "could not create resale assignment");
                return None;
            }
        };
        let id = assignment.id();
        if !core.oms.add(assignment) {
            return None;
        }
        self.resale_this_month.push(id);
        debug!(trader = self.id(), %commodity, volume = excess, assignment = %id, "offered excess capacity");
        Some(id)
    }

    fn cancel_resale(&mut self, commodity: &Commodity, exchange: &mut Exchange) {
        let oms = &mut self.zip.core_mut().oms;
        if !oms.has_active(commodity, Direction::Sell) {
            return;
        }
        let ids: Vec<_> = oms
            .get_supply_assignments(commodity)
            .iter()
            .map(|a| a.id())
            .collect();
        for id in ids {
            oms.cancel(id, exchange);
        }
    }

    /// Buys unmet demand past its deadline from the provider.
    fn buy_on_demand(&mut self, exchange: &mut Exchange, time: u64) {
        let core = self.zip.core_mut();
        let mut bought = 0;
        for id in core.oms.open_ids() {
            let Some(a) = core.oms.assignment_mut(id) else { continue };
            if a.is_completed() || a.direction() != Direction::Buy || a.deadline() > time {
                continue;
            }
            let volume = a.remaining_volume();
            bought += a.execute_off_book(volume, exchange);
        }
        if bought > 0 {
            self.stats.on_demand_purchased += bought;
            self.stats.total_cost += bought as f64 * ON_DEMAND_PRICE;
            debug!(trader = self.id(), volume = bought, "bought on demand");
        }
    }

    /// Start of a new month: used and resold capacity becomes available
    /// again, expired reservations are dropped, and last month's resale is
    /// withdrawn.
    fn roll_month(&mut self, exchange: &mut Exchange, month_start: u64) {
        if self.market_maker && !self.resale_this_month.is_empty() {
            let oms = &self.zip.core().oms;
            let sold_out = self.resale_this_month.iter().all(|id| {
                oms.assignment(*id)
                    .is_some_and(|a| a.volume_executed() == a.original_volume())
            });
            let step = if sold_out { MM_PROB_STEP } else { -MM_PROB_STEP };
            self.set_prob_buying_ri(self.prob_buying_ri + step);
            info!(
                trader = self.id(),
                sold_out,
                prob_buying_ri = self.prob_buying_ri,
                "market maker adjusted purchase rate"
            );
        }
        self.resale_this_month.clear();

        let commodities: Vec<Commodity> = exchange.commodities().cloned().collect();
        for commodity in &commodities {
            self.cancel_resale(commodity, exchange);
        }
        self.inventory.retain(|i| i.expires_at > month_start);
        for instance in self.inventory.iter_mut() {
            instance.state = InstanceState::Available;
        }
    }
}

impl Trader for InstanceTrader {
    fn core(&self) -> &TraderCore {
        self.zip.core()
    }

    fn core_mut(&mut self) -> &mut TraderCore {
        self.zip.core_mut()
    }

    fn trader_type(&self) -> TraderType {
        if self.market_maker {
            TraderType::MarketMaker
        } else {
            TraderType::Instance
        }
    }

    fn generate_order(
        &mut self,
        assignment: AssignmentId,
        exchange: &mut Exchange,
        time: u64,
    ) -> Option<Order> {
        self.zip.generate_order(assignment, exchange, time)
    }

    fn trade(&mut self, exchange: &mut Exchange, time: u64) {
        self.core_mut().oms.perform_admin();
        let commodities: Vec<Commodity> = exchange.commodities().cloned().collect();
        for commodity in &commodities {
            self.maybe_buy_reserved(commodity, time);
            self.internalize_trades(commodity, exchange);
            self.assign_excess_volume_for_sale(commodity, exchange, time);
        }
        self.core_mut().oms.perform_admin();
        for id in self.core().oms.open_ids() {
            self.zip.generate_order(id, exchange, time);
        }
    }

    fn order_book_updated(&mut self, update: &BookUpdate) {
        self.zip.react(update);
    }

    fn execute(&mut self, exchange: &mut Exchange, time: u64) -> bool {
        self.zip.execute(exchange, time)
    }

    /// Sold units stay owned but are out for the rest of the month; bought
    /// units are used until the end of the current month.
    fn perform_clearing(&mut self, order: &Order, trade: &Trade) -> bool {
        let commodity = trade.commodity();
        let volume = trade.volume();
        match order.direction() {
            Direction::Sell => {
                let available = self.available(commodity);
                if available < volume {
                    warn!(
                        trader = self.id(),
                        %commodity,
                        available,
                        sold = volume,
                        "sold more instances than available"
                    );
                    return false;
                }
                self.transition(commodity, volume, InstanceState::Available, InstanceState::Sold);
            }
            Direction::Buy => {
                let month_end = (trade.timestamp() / TICKS_PER_MONTH + 1) * TICKS_PER_MONTH;
                self.push_instances(commodity, volume, month_end, InstanceState::InUse);
                self.stats.market_purchased += volume;
                self.stats.total_cost += trade.value();
            }
        }
        true
    }

    fn end_time_step(&mut self, exchange: &mut Exchange, time: u64) {
        self.buy_on_demand(exchange, time);
        self.stats.owned_unit_ticks += self.inventory.len() as u64;
        self.stats.used_unit_ticks += self
            .inventory
            .iter()
            .filter(|i| i.state == InstanceState::InUse)
            .count() as u64;
        let next = time + 1;
        if next % TICKS_PER_MONTH == 0 {
            self.roll_month(exchange, next);
        }
        self.core_mut().oms.perform_admin();
    }

    fn report(&self) -> TraderReport {
        let stats = self.stats;
        let acquired = stats.reserved_purchased + stats.on_demand_purchased + stats.market_purchased;
        let ratio = |num: f64, den: u64| if den > 0 { num / den as f64 } else { 0.0 };
        let core = self.core();
        let ledger = core.ledger;
        TraderReport {
            id: core.id,
            name: core.name.clone(),
            is_market_maker: self.market_maker,
            profit: ledger.profit,
            utilisation: ratio(stats.used_unit_ticks as f64, stats.owned_unit_ticks),
            cost_per_util: ratio(stats.total_cost, stats.used_unit_ticks),
            prob_buying_ri: self.prob_buying_ri,
            on_demand_purchased: stats.on_demand_purchased,
            reserved_purchased: stats.reserved_purchased,
            total_cost: stats.total_cost,
            unit_cost: ratio(stats.total_cost, acquired),
            buys: ledger.buys,
            sells: ledger.sells,
            balance: ledger.balance,
            balance_per_volume: ratio(ledger.balance, ledger.buy_volume + ledger.sell_volume),
            buy_volume_assigned: core.oms.buy_volume_assigned(),
            sell_volume_assigned: core.oms.sell_volume_assigned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::AssignmentState;
    use rand::SeedableRng;

    fn setup(market_maker: bool) -> (InstanceTrader, Exchange, Commodity) {
        let ids = Arc::new(IdGenerator::new());
        let commodity = Commodity::new("small");
        let exchange = Exchange::with_commodities(ids.clone(), [commodity.clone()]);
        let rng = StdRng::seed_from_u64(11);
        let mut trader = if market_maker {
            InstanceTrader::market_maker(0, ids, rng)
        } else {
            InstanceTrader::new(0, ids, rng)
        };
        trader.set_prob_buying_ri(0.0);
        (trader, exchange, commodity)
    }

    fn demand(trader: &mut InstanceTrader, commodity: &Commodity, volume: u64, deadline: u64) -> AssignmentId {
        let ids = trader.core().ids.clone();
        let assignment = Assignment::new(
            ids.next_assignment_id(),
            AssignmentRequest {
                owner: 0,
                commodity: commodity.clone(),
                direction: Direction::Buy,
                limit_price: 0.1,
                volume,
                timestamp: 0,
                deadline,
            },
        )
        .unwrap();
        let id = assignment.id();
        assert!(trader.add_assignment(assignment));
        id
    }

    #[test]
    fn internalises_then_offers_the_rest() {
        let (mut trader, mut exchange, commodity) = setup(false);
        trader.add_instances(&commodity, 3, 10_000);
        let buy = demand(&mut trader, &commodity, 2, 100);

        assert_eq!(trader.internalize_trades(&commodity, &mut exchange), 2);
        assert_eq!(trader.available(&commodity), 1);
        assert_eq!(trader.in_use(&commodity), 2);
        assert_eq!(
            trader.oms().assignment(buy).map(|a| a.state()),
            Some(AssignmentState::Completed)
        );

        let sell = trader
            .assign_excess_volume_for_sale(&commodity, &mut exchange, 0)
            .unwrap();
        let sell = trader.oms().assignment(sell).unwrap();
        assert_eq!(sell.direction(), Direction::Sell);
        assert_eq!(sell.original_volume(), 1);
        assert_eq!(trader.oms().get_supply_assignments(&commodity).len(), 1);

        // Already on sale: nothing new to offer.
        assert!(trader.assign_excess_volume_for_sale(&commodity, &mut exchange, 1).is_none());
    }

    #[test]
    fn unmet_demand_is_bought_on_demand_after_deadline() {
        let (mut trader, mut exchange, commodity) = setup(false);
        let buy = demand(&mut trader, &commodity, 3, 5);

        trader.end_time_step(&mut exchange, 4);
        assert_eq!(trader.report().on_demand_purchased, 0);

        trader.end_time_step(&mut exchange, 5);
        let report = trader.report();
        assert_eq!(report.on_demand_purchased, 3);
        assert!((report.total_cost - 3.0 * ON_DEMAND_PRICE).abs() < 1e-12);
        assert!(trader.oms().completed_assignments().iter().any(|a| a.id() == buy));
    }

    #[test]
    fn month_rollover_frees_used_and_drops_expired() {
        let (mut trader, mut exchange, commodity) = setup(false);
        trader.add_instances(&commodity, 2, TICKS_PER_MONTH);
        trader.add_instances(&commodity, 1, 10 * TICKS_PER_MONTH);
        demand(&mut trader, &commodity, 3, 10_000);
        trader.internalize_trades(&commodity, &mut exchange);
        assert_eq!(trader.in_use(&commodity), 3);

        trader.end_time_step(&mut exchange, TICKS_PER_MONTH - 1);

        assert_eq!(trader.inventory().len(), 1);
        assert_eq!(trader.available(&commodity), 1);
    }

    #[test]
    fn clearing_moves_inventory() {
        let (mut trader, mut exchange, commodity) = setup(false);
        trader.add_instances(&commodity, 2, 10_000);
        let sell_id = trader
            .assign_excess_volume_for_sale(&commodity, &mut exchange, 0)
            .unwrap();
        let ids = trader.core().ids.clone();
        let sell = trader
            .oms()
            .assignment(sell_id)
            .unwrap()
            .create_order(&ids, 0.07, 2, 0)
            .unwrap();
        let buyer = Order::new(
            ids.next_order_id(),
            crate::types::OrderRequest {
                owner: 1,
                assignment: ids.next_assignment_id(),
                commodity: commodity.clone(),
                direction: Direction::Buy,
                price: 0.07,
                volume: 2,
                timestamp: 1,
            },
        )
        .unwrap();
        let trade = Trade::new(&ids, 0.07, 1, buyer, sell.clone()).unwrap();

        assert!(trader.perform_clearing(&sell, &trade));
        assert_eq!(trader.available(&commodity), 0);
        assert_eq!(trader.sold(&commodity), 2);
        assert_eq!(trader.inventory().len(), 2);
        assert!(!trader.perform_clearing(&sell, &trade));
    }

    #[test]
    fn resold_reservation_returns_next_month() {
        let (mut trader, mut exchange, commodity) = setup(false);
        trader.add_instances(&commodity, 1, 10 * TICKS_PER_MONTH);
        let sell_id = trader
            .assign_excess_volume_for_sale(&commodity, &mut exchange, 0)
            .unwrap();
        let ids = trader.core().ids.clone();
        let sell = trader
            .oms()
            .assignment(sell_id)
            .unwrap()
            .create_order(&ids, 0.07, 1, 0)
            .unwrap();
        let buyer = Order::new(
            ids.next_order_id(),
            crate::types::OrderRequest {
                owner: 1,
                assignment: ids.next_assignment_id(),
                commodity: commodity.clone(),
                direction: Direction::Buy,
                price: 0.07,
                volume: 1,
                timestamp: 1,
            },
        )
        .unwrap();
        let trade = Trade::new(&ids, 0.07, 1, buyer, sell.clone()).unwrap();
        assert!(trader.perform_clearing(&sell, &trade));
        assert_eq!(trader.sold(&commodity), 1);

        trader.end_time_step(&mut exchange, TICKS_PER_MONTH - 1);

        assert_eq!(trader.inventory().len(), 1);
        assert_eq!(trader.available(&commodity), 1);
        assert_eq!(trader.sold(&commodity), 0);
        assert!(
            trader
                .assign_excess_volume_for_sale(&commodity, &mut exchange, TICKS_PER_MONTH)
                .is_some()
        );
    }

    #[test]
    fn market_maker_adapts_purchase_rate() {
        let (mut trader, mut exchange, commodity) = setup(true);
        trader.set_prob_buying_ri(0.5);
        trader.add_instances(&commodity, 1, 10 * TICKS_PER_MONTH);
        trader.assign_excess_volume_for_sale(&commodity, &mut exchange, 0);

        // Nothing sold this month.
        trader.end_time_step(&mut exchange, TICKS_PER_MONTH - 1);
        assert!((trader.prob_buying_ri() - (0.5 - MM_PROB_STEP)).abs() < 1e-12);
        assert!(trader.oms().get_supply_assignments(&commodity).is_empty());

        let resale = trader
            .assign_excess_volume_for_sale(&commodity, &mut exchange, TICKS_PER_MONTH)
            .unwrap();
        trader
            .core_mut()
            .oms
            .assignment_mut(resale)
            .unwrap()
            .execute_off_book(1, &mut exchange);
        trader.end_time_step(&mut exchange, 2 * TICKS_PER_MONTH - 1);
        assert!((trader.prob_buying_ri() - 0.5).abs() < 1e-12);
    }
}
