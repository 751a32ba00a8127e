// src/assignment_server.rs

//! Issues trading goals to the trader population each tick.

use crate::agents::agent_trait::Trader;
use crate::agents::agent_type::TraderType;
use crate::assignment::{Assignment, AssignmentRequest};
use crate::config::{AssignmentServerConfig, ServerMode};
use crate::error::Result;
use crate::types::{Commodity, Direction, IdGenerator};
use rand::Rng;
use rand::rngs::StdRng;
use rand_distr::StandardNormal;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Demand limits drawn from the normal distribution are floored here.
const MIN_DEMAND_LIMIT: f64 = 0.01;

pub struct AssignmentServer {
    rng: StdRng,
    commodity: Commodity,
    ids: Arc<IdGenerator>,
    config: AssignmentServerConfig,
}

impl AssignmentServer {
    pub fn new(rng: StdRng, commodity: Commodity, ids: Arc<IdGenerator>) -> Self {
        let config = AssignmentServerConfig {
            commodity: commodity.name().to_string(),
            ..AssignmentServerConfig::default()
        };
        Self {
            rng,
            commodity,
            ids,
            config,
        }
    }

    pub fn with_config(rng: StdRng, config: AssignmentServerConfig, ids: Arc<IdGenerator>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            rng,
            commodity: Commodity::new(config.commodity.clone()),
            ids,
            config,
        })
    }

    pub fn commodity(&self) -> &Commodity {
        &self.commodity
    }

    pub fn config(&self) -> &AssignmentServerConfig {
        &self.config
    }

    /// Runs the configured mode. Returns the number of assignments issued.
    pub fn run(&mut self, traders: &mut [Box<dyn Trader>], time: u64) -> usize {
        match self.config.mode {
            ServerMode::Mixed => self.assign(traders, time),
            ServerMode::Demand => self.assign_demand(traders, time),
        }
    }

    /// Mixed buy and sell goals. Even positions buy, odd positions sell;
    /// instance traders only ever buy since they sell from inventory, and
    /// market makers get nothing.
    pub fn assign(&mut self, traders: &mut [Box<dyn Trader>], time: u64) -> usize {
        let mut issued = 0;
        for (index, trader) in traders.iter_mut().enumerate() {
            let direction = match trader.trader_type() {
                TraderType::MarketMaker => continue,
                TraderType::Instance => Direction::Buy,
                TraderType::Zip | TraderType::Test => {
                    if index % 2 == 0 {
                        Direction::Buy
                    } else {
                        Direction::Sell
                    }
                }
            };
            if !self.rng.gen_bool(self.config.probability) {
                continue;
            }
            let (lo, hi) = match direction {
                Direction::Buy => (self.config.buy_limit_min, self.config.buy_limit_max),
                Direction::Sell => (self.config.sell_limit_min, self.config.sell_limit_max),
            };
            let limit = self.rng.gen_range(lo..=hi);
            issued += usize::from(self.issue(trader.as_mut(), direction, limit, time));
        }
        if issued > 0 {
            info!(commodity = %self.commodity, time, issued, "assignments issued");
        }
        issued
    }

    /// Buy goals only, with normally distributed limits.
    pub fn assign_demand(&mut self, traders: &mut [Box<dyn Trader>], time: u64) -> usize {
        let mut issued = 0;
        for trader in traders.iter_mut() {
            if trader.trader_type() == TraderType::MarketMaker {
                continue;
            }
            if !self.rng.gen_bool(self.config.probability) {
                continue;
            }
            let z: f64 = self.rng.sample(StandardNormal);
            let limit = (self.config.demand_mean + z * self.config.demand_std_dev).max(MIN_DEMAND_LIMIT);
            issued += usize::from(self.issue(trader.as_mut(), Direction::Buy, limit, time));
        }
        if issued > 0 {
            info!(commodity = %self.commodity, time, issued, "demand assignments issued");
        }
        issued
    }

    fn issue(&mut self, trader: &mut dyn Trader, direction: Direction, limit: f64, time: u64) -> bool {
        let volume = self.rng.gen_range(1..=self.config.max_volume);
        let assignment = match Assignment::new(
            self.ids.next_assignment_id(),
            AssignmentRequest {
                owner: trader.id(),
                commodity: self.commodity.clone(),
                direction,
                limit_price: limit,
                volume,
                timestamp: time,
                deadline: time + self.config.deadline_horizon,
            },
        ) {
            Ok(assignment) => assignment,
            Err(e) => {
                warn!(trader = trader.id(), error = %e, "could not create assignment");
                return false;
            }
        };
        debug!(
            trader = trader.id(),
            assignment = %assignment.id(),
            %direction,
            limit,
            volume,
            "assigning"
        );
        trader.add_assignment(assignment)
    }
}
