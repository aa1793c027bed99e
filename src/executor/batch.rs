use std::fmt::{self, Debug};

use crate::executor::Rule;

/// How many passes a batch may make over the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// A single pass.
    Once,
    /// Repeat until a pass changes nothing or `max_iterations` passes ran.
    FixedPoint { max_iterations: usize, error_on_exceed: bool },
}

impl Strategy {
    /// Fixed point that only warns when the cap is hit.
    pub fn fixed_point(max_iterations: usize) -> Self {
        Strategy::FixedPoint { max_iterations, error_on_exceed: false }
    }

    pub fn max_iterations(&self) -> usize {
        match self {
            Strategy::Once => 1,
            Strategy::FixedPoint { max_iterations, .. } => *max_iterations,
        }
    }
}

/// Ordered rules run together under one strategy.
pub struct Batch<T> {
    pub name: String,
    pub strategy: Strategy,
    pub rules: Vec<Box<dyn Rule<T>>>,
}

impl<T> Batch<T> {
    pub fn new(name: impl Into<String>, strategy: Strategy, rules: Vec<Box<dyn Rule<T>>>) -> Self {
        Self { name: name.into(), strategy, rules }
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }
}

impl<T> Debug for Batch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Batch")
            .field("name", &self.name)
            .field("strategy", &self.strategy)
            .field("rules", &self.rule_names())
            .finish()
    }
}
