//! Routing solver configuration

use std::time::Duration;

use crate::defaults::{DEFAULT_SOLVER_TIME_BUDGET_SECS, DEFAULT_SPAN_COST_COEFFICIENT};

/// Configuration for the routing solver
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Hard wall-clock limit for construction plus local search
    pub time_budget: Duration,
    /// Cost added per unit of (max jobs per route - min jobs per route)
    pub span_cost_coefficient: u64,
    /// Escape local optima with arc penalties; plain descent when false
    pub guided: bool,
    /// Scales the arc penalty weight relative to the first local optimum
    pub gls_alpha: f64,
    /// Penalization rounds allowed without a new best before stopping early;
    /// `None` searches until the time budget runs out
    pub max_stall_rounds: Option<usize>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_budget: Duration::from_secs(DEFAULT_SOLVER_TIME_BUDGET_SECS),
            span_cost_coefficient: DEFAULT_SPAN_COST_COEFFICIENT,
            guided: true,
            gls_alpha: 0.2,
            max_stall_rounds: None,
        }
    }
}

impl SolverConfig {
    /// Create config with custom budget and balance weight
    pub fn new(time_budget_seconds: u64, span_cost_coefficient: u64) -> Self {
        Self {
            time_budget: Duration::from_secs(time_budget_seconds),
            span_cost_coefficient,
            ..Default::default()
        }
    }

    /// Sub-second configuration for tests
    #[cfg(test)]
    pub fn quick() -> Self {
        Self {
            time_budget: Duration::from_millis(500),
            max_stall_rounds: Some(100),
            ..Default::default()
        }
    }

    pub fn with_time_budget(mut self, time_budget: Duration) -> Self {
        self.time_budget = time_budget;
        self
    }

    pub fn with_max_stall_rounds(mut self, rounds: usize) -> Self {
        self.max_stall_rounds = Some(rounds);
        self
    }

    #[cfg(test)]
    pub fn with_span_cost_coefficient(mut self, coefficient: u64) -> Self {
        self.span_cost_coefficient = coefficient;
        self
    }

    pub fn without_guidance(mut self) -> Self {
        self.guided = false;
        self
    }
}
