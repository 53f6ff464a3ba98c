use std::collections::BTreeMap;

use crate::{
    db_types::{Deposit, Order},
    matcher::rules::is_candidate,
};

/// The orders still available to the current cycle, keyed by id.
///
/// An order leaves the set as soon as a deposit has been claimed for it, so no later deposit in the same cycle can be
/// offered it. The set lives for one cycle only.
#[derive(Debug, Clone, Default)]
pub struct OrderWorkingSet {
    orders: BTreeMap<i64, Order>,
}

impl OrderWorkingSet {
    pub fn new(orders: Vec<Order>) -> Self {
        let orders = orders.into_iter().map(|o| (o.id, o)).collect();
        Self { orders }
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// All orders that `deposit` may fund, highest id first.
    pub fn candidates<'a>(&'a self, deposit: &'a Deposit) -> impl Iterator<Item = &'a Order> + 'a {
        self.orders.values().rev().filter(move |order| is_candidate(deposit, order))
    }

    /// The tie-break winner for `deposit`: the candidate with the highest id, i.e. the most recently created order.
    pub fn best_candidate<'a>(&'a self, deposit: &'a Deposit) -> Option<&'a Order> {
        self.candidates(deposit).next()
    }

    pub fn remove(&mut self, order_id: i64) -> Option<Order> {
        self.orders.remove(&order_id)
    }
}
