// src/agents/agent_type.rs

use super::agent_trait::Trader;
use super::instance_trader::InstanceTrader;
use super::test_trader::TestTrader;
use super::zip_trader::ZipTrader;
use crate::error::MarketError;
use crate::types::{IdGenerator, TraderId};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraderType {
    Zip,
    Instance,
    MarketMaker,
    Test,
}

impl TraderType {
    pub fn as_str(self) -> &'static str {
        match self {
            TraderType::Zip => "zip",
            TraderType::Instance => "instance",
            TraderType::MarketMaker => "market_maker",
            TraderType::Test => "test",
        }
    }

    /// Builds a boxed trader of this kind, named `<kind>-<id>`.
    pub fn create(self, id: TraderId, ids: Arc<IdGenerator>, rng: StdRng) -> Box<dyn Trader> {
        match self {
            TraderType::Zip => Box::new(ZipTrader::new(id, ids, rng)),
            TraderType::Instance => Box::new(InstanceTrader::new(id, ids, rng)),
            TraderType::MarketMaker => Box::new(InstanceTrader::market_maker(id, ids, rng)),
            TraderType::Test => Box::new(TestTrader::new(id, ids, rng)),
        }
    }
}

impl fmt::Display for TraderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TraderType {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "zip" => Ok(TraderType::Zip),
            "instance" => Ok(TraderType::Instance),
            "market_maker" | "marketmaker" => Ok(TraderType::MarketMaker),
            "test" => Ok(TraderType::Test),
            _ => Err(MarketError::UnknownTraderType(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn parses_names_and_rejects_unknown() {
        assert_eq!("zip".parse::<TraderType>().unwrap(), TraderType::Zip);
        assert_eq!("Market-Maker".parse::<TraderType>().unwrap(), TraderType::MarketMaker);
        assert!(matches!(
            "whale".parse::<TraderType>(),
            Err(MarketError::UnknownTraderType(name)) if name == "whale"
        ));
    }

    #[test]
    fn factory_builds_matching_kind() {
        let ids = Arc::new(IdGenerator::new());
        for kind in [TraderType::Zip, TraderType::Instance, TraderType::MarketMaker, TraderType::Test] {
            let trader = kind.create(4, ids.clone(), StdRng::seed_from_u64(1));
            assert_eq!(trader.trader_type(), kind);
            assert_eq!(trader.id(), 4);
            assert_eq!(trader.name(), format!("{}-4", kind));
        }
    }
}
