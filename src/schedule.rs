// src/schedule.rs

//! Aggregate demand and supply curves and their discrete intersection.

use crate::agents::agent_trait::Trader;
use crate::assignment::Assignment;
use crate::types::{Commodity, Direction, PriceVolumeTuple};

const PRICE_MERGE_EPSILON: f64 = 1e-9;

/// Step curve of (price, volume) points for one direction.
///
/// Demand steps run from the highest price down, supply steps from the
/// lowest price up. Neighbouring steps never share a price.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceVolumeSchedule {
    direction: Direction,
    steps: Vec<PriceVolumeTuple>,
}

impl PriceVolumeSchedule {
    pub fn new<I>(direction: Direction, points: I) -> Self
    where
        I: IntoIterator<Item = PriceVolumeTuple>,
    {
        let mut points: Vec<_> = points.into_iter().filter(|p| !p.is_empty()).collect();
        match direction {
            Direction::Buy => points.sort_by(|a, b| b.price().total_cmp(&a.price())),
            Direction::Sell => points.sort_by(|a, b| a.price().total_cmp(&b.price())),
        }
        let mut steps: Vec<PriceVolumeTuple> = Vec::with_capacity(points.len());
        for point in points {
            match steps.last_mut() {
                Some(last) if (last.price() - point.price()).abs() < PRICE_MERGE_EPSILON => {
                    last.add_volume(point.volume());
                }
                _ => steps.push(point),
            }
        }
        Self { direction, steps }
    }

    /// Schedule of the remaining volume of every live assignment in
    /// `direction` for `commodity`.
    pub fn from_assignments<'a, I>(commodity: &Commodity, direction: Direction, assignments: I) -> Self
    where
        I: IntoIterator<Item = &'a Assignment>,
    {
        let points = assignments
            .into_iter()
            .filter(|a| {
                !a.is_completed() && a.direction() == direction && a.commodity() == commodity
            })
            .map(|a| PriceVolumeTuple::new(a.limit_price(), a.remaining_volume()));
        Self::new(direction, points)
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn steps(&self) -> &[PriceVolumeTuple] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn total_volume(&self) -> u64 {
        self.steps.iter().map(PriceVolumeTuple::volume).sum()
    }

    /// One price per unit of volume, in schedule order.
    pub fn unit_prices(&self) -> Vec<f64> {
        self.steps
            .iter()
            .flat_map(|s| std::iter::repeat_n(s.price(), s.volume() as usize))
            .collect()
    }
}

macro_rules! schedule_side {
    ($name:ident, $direction:expr) => {
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name(PriceVolumeSchedule);

        impl $name {
            pub fn new<I>(points: I) -> Self
            where
                I: IntoIterator<Item = PriceVolumeTuple>,
            {
                Self(PriceVolumeSchedule::new($direction, points))
            }

            pub fn from_assignments<'a, I>(commodity: &Commodity, assignments: I) -> Self
            where
                I: IntoIterator<Item = &'a Assignment>,
            {
                Self(PriceVolumeSchedule::from_assignments(commodity, $direction, assignments))
            }

            /// Aggregates the open assignments of a whole trader population.
            pub fn from_population(commodity: &Commodity, traders: &[Box<dyn Trader>]) -> Self {
                Self::from_assignments(
                    commodity,
                    traders.iter().flat_map(|t| t.oms().open_assignments()),
                )
            }

            pub fn schedule(&self) -> &PriceVolumeSchedule {
                &self.0
            }
        }
    };
}

schedule_side!(DemandSchedule, Direction::Buy);
schedule_side!(SupplySchedule, Direction::Sell);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Equilibrium {
    pub price: f64,
    pub volume: u64,
}

/// Intersects the two curves unit by unit.
///
/// Returns `None` when either side is empty or the cheapest supply is dearer
/// than the highest bid. The price is the midpoint of the interval that
/// clears exactly the matched volume.
pub fn get_equilibrium(demand: &DemandSchedule, supply: &SupplySchedule) -> Option<Equilibrium> {
    let d = demand.schedule().unit_prices();
    let s = supply.schedule().unit_prices();
    if d.is_empty() || s.is_empty() || s[0] > d[0] {
        return None;
    }

    let mut i = 0;
    while i < d.len() && i < s.len() && d[i] >= s[i] {
        i += 1;
    }

    let (lo, hi) = match (i < d.len(), i < s.len()) {
        (true, true) => (s[i - 1].max(d[i]), d[i - 1].min(s[i])),
        (false, true) => (s[i - 1], d[i - 1].min(s[i])),
        (true, false) => (s[i - 1].max(d[i]), d[i - 1]),
        (false, false) => (s[i - 1], d[i - 1]),
    };
    Some(Equilibrium {
        price: (lo + hi) / 2.0,
        volume: i as u64,
    })
}

/// Total gains from trade: sum of `demand_i - supply_i` over the units that
/// clear.
pub fn get_surplus_profit(demand: &DemandSchedule, supply: &SupplySchedule) -> f64 {
    let d = demand.schedule().unit_prices();
    let s = supply.schedule().unit_prices();
    d.iter()
        .zip(&s)
        .take_while(|(d, s)| d >= s)
        .map(|(d, s)| d - s)
        .sum()
}
