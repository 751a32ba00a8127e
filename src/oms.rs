// src/oms.rs

//! Per-trader bookkeeping of open and completed assignments.

use crate::assignment::Assignment;
use crate::simulators::Exchange;
use crate::types::{AssignmentId, Commodity, Direction, Order, OrderId, TraderId};
use tracing::warn;

#[derive(Debug, Default)]
pub struct OrderManagementSystem {
    owner: TraderId,
    open: Vec<Assignment>,
    completed: Vec<Assignment>,
    buy_volume_assigned: u64,
    sell_volume_assigned: u64,
}

impl OrderManagementSystem {
    pub fn new(owner: TraderId) -> Self {
        Self {
            owner,
            ..Self::default()
        }
    }

    pub fn owner(&self) -> TraderId {
        self.owner
    }

    /// Registers an assignment owned by this trader.
    pub fn add(&mut self, assignment: Assignment) -> bool {
        if assignment.owner() != self.owner {
            warn!(
                assignment = %assignment.id(),
                owner = assignment.owner(),
                oms = self.owner,
                "assignment belongs to another trader"
            );
            return false;
        }
        if self.contains(assignment.id()) {
            warn!(assignment = %assignment.id(), "assignment already registered");
            return false;
        }
        match assignment.direction() {
            Direction::Buy => self.buy_volume_assigned += assignment.original_volume(),
            Direction::Sell => self.sell_volume_assigned += assignment.original_volume(),
        }
        self.open.push(assignment);
        true
    }

    pub fn cancel(&mut self, id: AssignmentId, exchange: &mut Exchange) -> bool {
        match self.assignment_mut(id) {
            Some(assignment) => assignment.cancel(exchange),
            None => {
                warn!(assignment = %id, "cancel of unknown assignment");
                false
            }
        }
    }

    pub fn contains(&self, id: AssignmentId) -> bool {
        self.open.iter().chain(&self.completed).any(|a| a.id() == id)
    }

    pub fn assignment(&self, id: AssignmentId) -> Option<&Assignment> {
        self.open.iter().chain(&self.completed).find(|a| a.id() == id)
    }

    pub fn assignment_mut(&mut self, id: AssignmentId) -> Option<&mut Assignment> {
        self.open.iter_mut().find(|a| a.id() == id)
    }

    pub fn open_assignments(&self) -> &[Assignment] {
        &self.open
    }

    pub fn completed_assignments(&self) -> &[Assignment] {
        &self.completed
    }

    pub fn open_ids(&self) -> Vec<AssignmentId> {
        self.open.iter().map(Assignment::id).collect()
    }

    fn active<'a, 'c>(
        &'a self,
        commodity: &'c Commodity,
        direction: Direction,
    ) -> impl Iterator<Item = &'a Assignment> + use<'a, 'c> {
        self.open.iter().filter(move |a| {
            !a.is_completed() && a.direction() == direction && a.commodity() == commodity
        })
    }

    pub fn get_demand_assignments(&self, commodity: &Commodity) -> Vec<&Assignment> {
        self.active(commodity, Direction::Buy).collect()
    }

    pub fn get_supply_assignments(&self, commodity: &Commodity) -> Vec<&Assignment> {
        self.active(commodity, Direction::Sell).collect()
    }

    /// Remaining (unexecuted) demand volume.
    pub fn get_demand_volume(&self, commodity: &Commodity) -> u64 {
        self.active(commodity, Direction::Buy)
            .map(Assignment::remaining_volume)
            .sum()
    }

    pub fn get_supply_volume(&self, commodity: &Commodity) -> u64 {
        self.active(commodity, Direction::Sell)
            .map(Assignment::remaining_volume)
            .sum()
    }

    pub fn has_active(&self, commodity: &Commodity, direction: Direction) -> bool {
        self.active(commodity, direction).next().is_some()
    }

    /// The assignment that should trade first in `direction`.
    pub fn best_assignment(&self, commodity: &Commodity, direction: Direction) -> Option<&Assignment> {
        self.active(commodity, direction).min_by(|a, b| a.rank_cmp(b))
    }

    pub fn buy_volume_assigned(&self) -> u64 {
        self.buy_volume_assigned
    }

    pub fn sell_volume_assigned(&self) -> u64 {
        self.sell_volume_assigned
    }

    /// Moves completed assignments to the completed list. Safe to call every tick.
    pub fn perform_admin(&mut self) {
        if !self.open.iter().any(Assignment::is_completed) {
            return;
        }
        let (done, open): (Vec<_>, Vec<_>) =
            self.open.drain(..).partition(Assignment::is_completed);
        self.open = open;
        self.completed.extend(done);
    }

    pub fn order_executed(&mut self, order: &Order, exchange: &mut Exchange) -> bool {
        match self.assignment_mut(order.assignment()) {
            Some(assignment) => assignment.order_executes(order, exchange),
            None => {
                warn!(order = %order.id(), oms = self.owner, "execution of order unknown to OMS");
                false
            }
        }
    }

    pub fn order_split(&mut self, original: OrderId, fragment: Order) -> bool {
        match self.assignment_mut(fragment.assignment()) {
            Some(assignment) => assignment.order_split(original, fragment),
            None => {
                warn!(order = %original, oms = self.owner, "split of order unknown to OMS");
                false
            }
        }
    }

    pub fn delete_order(&mut self, order: &Order) -> bool {
        match self.assignment_mut(order.assignment()) {
            Some(assignment) => assignment.delete_order(order.id()),
            None => {
                warn!(order = %order.id(), oms = self.owner, "delete of order unknown to OMS");
                false
            }
        }
    }

    /// Fills up to `amount` units of open demand off-book, in list order.
    /// Returns the part of `amount` that found no demand.
    pub fn match_demand(&mut self, commodity: &Commodity, amount: u64, exchange: &mut Exchange) -> u64 {
        let mut remaining = amount;
        for assignment in self.open.iter_mut() {
            if remaining == 0 {
                break;
            }
            if assignment.is_completed()
                || assignment.direction() != Direction::Buy
                || assignment.commodity() != commodity
            {
                continue;
            }
            remaining -= assignment.execute_off_book(remaining, exchange);
        }
        remaining
    }
}
