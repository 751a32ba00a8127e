// src/market.rs

use crate::agents::agent_trait::Trader;
use crate::agents::agent_type::TraderType;
use crate::agents::report::TraderReport;
use crate::assignment_server::AssignmentServer;
use crate::config::SimulationConfig;
use crate::error::Result;
use crate::schedule::{DemandSchedule, Equilibrium, SupplySchedule, get_equilibrium};
use crate::simulators::{BookEvent, Exchange};
use crate::types::{Commodity, IdGenerator, Trade, TraderId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The simulation engine. It owns the exchange, the trader population and
/// the assignment servers, and runs the per-tick interaction loop.
///
/// Books never call traders. Everything a book produces is queued and
/// delivered here, after the call that caused it has returned.
pub struct Market {
    config: SimulationConfig,
    ids: Arc<IdGenerator>,
    exchange: Exchange,
    traders: Vec<Box<dyn Trader>>,
    servers: Vec<AssignmentServer>,
    trades: Vec<Trade>,
    time: u64,
    seeds: StdRng,
}

impl Market {
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let ids = Arc::new(IdGenerator::new());
        let mut market = Self {
            exchange: Exchange::new(ids.clone()),
            traders: Vec::new(),
            servers: Vec::new(),
            trades: Vec::new(),
            time: 0,
            seeds: StdRng::seed_from_u64(config.seed),
            ids,
            config,
        };
        market.populate()?;
        Ok(market)
    }

    fn populate(&mut self) -> Result<()> {
        for name in &self.config.commodities {
            self.exchange.add_commodity(Commodity::new(name.clone()));
        }
        let kinds: Vec<TraderType> = self
            .config
            .traders
            .iter()
            .flat_map(|entry| std::iter::repeat_n(entry.kind, entry.count))
            .collect();
        for kind in kinds {
            self.add_trader(kind);
        }
        for server in self.config.servers.clone() {
            let rng = StdRng::seed_from_u64(self.seeds.r#gen());
            self.servers
                .push(AssignmentServer::with_config(rng, server, self.ids.clone())?);
        }
        info!(
            traders = self.traders.len(),
            commodities = self.config.commodities.len(),
            servers = self.servers.len(),
            seed = self.config.seed,
            "market ready"
        );
        Ok(())
    }

    /// Creates a trader of `kind`, subscribes it to every book and returns
    /// its id.
    pub fn add_trader(&mut self, kind: TraderType) -> TraderId {
        self.add_trader_with(|id, ids, rng| kind.create(id, ids, rng))
    }

    /// Like `add_trader`, for traders built outside the factory. `build`
    /// receives the new id, the shared id generator and a seeded rng.
    pub fn add_trader_with<F>(&mut self, build: F) -> TraderId
    where
        F: FnOnce(TraderId, Arc<IdGenerator>, StdRng) -> Box<dyn Trader>,
    {
        let id = self.traders.len();
        let rng = StdRng::seed_from_u64(self.seeds.r#gen());
        self.traders.push(build(id, self.ids.clone(), rng));
        self.exchange.subscribe_all(id);
        id
    }

    /// Starts over from the stored configuration. Id counters restart too,
    /// so a reset run reproduces the first one.
    pub fn reset(&mut self) -> Result<()> {
        self.ids.reset();
        self.exchange = Exchange::new(self.ids.clone());
        self.traders.clear();
        self.servers.clear();
        self.trades.clear();
        self.time = 0;
        self.seeds = StdRng::seed_from_u64(self.config.seed);
        self.populate()
    }

    /// One tick: assignments are issued, then every trader quotes, then
    /// every trader may take a resting quote, then every trader closes the
    /// step. Book events are delivered after each trader call.
    pub fn step(&mut self) {
        let time = self.time;
        let traded_before = self.trades.len();

        for server in self.servers.iter_mut() {
            server.run(&mut self.traders, time);
        }
        for i in 0..self.traders.len() {
            self.traders[i].trade(&mut self.exchange, time);
            self.dispatch_events();
        }
        for i in 0..self.traders.len() {
            self.traders[i].execute(&mut self.exchange, time);
            self.dispatch_events();
        }
        for i in 0..self.traders.len() {
            self.traders[i].end_time_step(&mut self.exchange, time);
            self.dispatch_events();
        }

        self.time += 1;
        let traded = self.trades.len() - traded_before;
        debug!(
            tick = time,
            trades = traded,
            last_price = self.trades.last().map(Trade::price),
            "tick complete"
        );
    }

    /// Runs `ticks` steps, logging the trader reports every
    /// `report_every` ticks.
    pub fn run(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.step();
            let every = self.config.report_every;
            if every > 0 && self.time % every == 0 {
                info!(tick = self.time, trades = self.trades.len(), "progress");
                for report in self.reports() {
                    info!(tick = self.time, "{}", report);
                }
            }
        }
    }

    /// Delivers queued book events until none are left: splits and
    /// executions to the owning traders, book updates to every subscriber
    /// in subscription order.
    pub fn dispatch_events(&mut self) {
        while self.exchange.has_pending_events() {
            for (subscribers, event) in self.exchange.drain_events() {
                match event {
                    BookEvent::Split {
                        owner,
                        original,
                        fragment,
                    } => match self.traders.get_mut(owner) {
                        Some(trader) => {
                            trader.order_split(original, fragment);
                        }
                        None => warn!(owner, order = %original, "split for unknown trader"),
                    },
                    BookEvent::Trade(trade) => {
                        let traders = &mut self.traders;
                        let exchange = &mut self.exchange;
                        trade.update_owners(|owner, order| match traders.get_mut(owner) {
                            Some(trader) => {
                                trader.executed_order(order, &trade, exchange);
                            }
                            None => warn!(owner, order = %order.id(), "trade for unknown trader"),
                        });
                        self.trades.push(trade);
                    }
                    BookEvent::Update(update) => {
                        for id in subscribers {
                            if let Some(trader) = self.traders.get_mut(id) {
                                trader.order_book_updated(&update);
                            }
                        }
                    }
                }
            }
        }
    }

    pub fn reports(&self) -> Vec<TraderReport> {
        self.traders.iter().map(|t| t.report()).collect()
    }

    pub fn demand_schedule(&self, commodity: &Commodity) -> DemandSchedule {
        DemandSchedule::from_population(commodity, &self.traders)
    }

    pub fn supply_schedule(&self, commodity: &Commodity) -> SupplySchedule {
        SupplySchedule::from_population(commodity, &self.traders)
    }

    /// Competitive equilibrium of the open assignments for `commodity`.
    pub fn equilibrium(&self, commodity: &Commodity) -> Option<Equilibrium> {
        get_equilibrium(&self.demand_schedule(commodity), &self.supply_schedule(commodity))
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn ids(&self) -> &Arc<IdGenerator> {
        &self.ids
    }

    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn exchange(&self) -> &Exchange {
        &self.exchange
    }

    pub fn traders(&self) -> &[Box<dyn Trader>] {
        &self.traders
    }

    pub fn trader(&self, id: TraderId) -> Option<&dyn Trader> {
        self.traders.get(id).map(|t| t.as_ref())
    }

    /// A trader together with the exchange, for driving it by hand.
    /// Call `dispatch_events` afterwards to deliver what the books queued.
    pub fn trader_mut(&mut self, id: TraderId) -> Option<(&mut dyn Trader, &mut Exchange)> {
        let exchange = &mut self.exchange;
        self.traders
            .get_mut(id)
            .map(move |t| (t.as_mut() as &mut dyn Trader, exchange))
    }
}
