// src/agents/report.rs

use serde::Serialize;
use std::fmt;

/// Column names of the report line, in output order.
pub const REPORT_HEADER: &str = "id,name,isMarketMaker,profit,utilisation,costPerUtil,probBuyingRI,\
onDemandPurchased,reservedPurchased,totalCost,unitCost,buys,sells,balance,balancePerVolume,\
buyVolumeAssigned,sellVolumeAssigned";

/// Fixed-field summary of one trader, consumed by external loggers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TraderReport {
    pub id: usize,
    pub name: String,
    pub is_market_maker: bool,
    pub profit: f64,
    pub utilisation: f64,
    pub cost_per_util: f64,
    pub prob_buying_ri: f64,
    pub on_demand_purchased: u64,
    pub reserved_purchased: u64,
    pub total_cost: f64,
    pub unit_cost: f64,
    pub buys: u64,
    pub sells: u64,
    pub balance: f64,
    pub balance_per_volume: f64,
    pub buy_volume_assigned: u64,
    pub sell_volume_assigned: u64,
}

impl fmt::Display for TraderReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{:.4},{:.4},{:.4},{:.4},{},{},{:.4},{:.4},{},{},{:.4},{:.4},{},{}",
            self.id,
            self.name,
            self.is_market_maker,
            self.profit,
            self.utilisation,
            self.cost_per_util,
            self.prob_buying_ri,
            self.on_demand_purchased,
            self.reserved_purchased,
            self.total_cost,
            self.unit_cost,
            self.buys,
            self.sells,
            self.balance,
            self.balance_per_volume,
            self.buy_volume_assigned,
            self.sell_volume_assigned,
        )
    }
}
