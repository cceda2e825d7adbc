//! Multi-vehicle routing solver
//!
//! Every technician starts and ends at their own depot; each job is visited
//! exactly once. The objective is total round-trip travel seconds plus
//! `span_cost_coefficient * (max jobs per route - min jobs per route)`.
//! A cheapest-insertion construction is improved by guided local search
//! within a wall-clock budget.

mod config;
mod construction;
mod local_search;
mod plan;

pub use config::SolverConfig;

use std::time::Instant;

use thiserror::Error;

use crate::services::matrix::TravelTimeMatrix;

use plan::RoutingProblem;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolverError {
    #[error("matrix has {nodes} nodes but {vehicles} vehicles and {jobs} jobs were given")]
    DimensionMismatch {
        nodes: usize,
        vehicles: usize,
        jobs: usize,
    },

    #[error("at least one vehicle is required")]
    NoVehicles,

    #[error("no feasible plan: {0}")]
    Infeasible(String),
}

/// One vehicle's visit order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Job indices in `0..J`, in visit order
    pub jobs: Vec<usize>,
    /// Depot -> jobs -> depot
    pub travel_seconds: u64,
}

/// Solver output
#[derive(Debug, Clone)]
pub struct Solution {
    /// One route per vehicle, in vehicle order
    pub routes: Vec<Route>,
    pub total_travel_seconds: u64,
    pub objective: u64,
    pub construction_objective: u64,
    pub moves_applied: usize,
    pub penalty_rounds: usize,
    pub solve_time_ms: u64,
}

/// Solve the routing problem over a `(V + J)` square matrix where the first
/// `n_vehicles` nodes are depots and the remaining `n_jobs` nodes are jobs.
pub fn solve(
    matrix: &TravelTimeMatrix,
    n_vehicles: usize,
    n_jobs: usize,
    config: &SolverConfig,
) -> Result<Solution, SolverError> {
    let start = Instant::now();
    let deadline = start + config.time_budget;
    let problem = RoutingProblem::new(matrix, n_vehicles, n_jobs)?;

    let initial = construction::cheapest_insertion(&problem, config.span_cost_coefficient)?;
    let construction_objective = initial.objective(&problem, config.span_cost_coefficient);

    let outcome = local_search::improve(&problem, initial, config, deadline);

    if !outcome.plan.is_complete(&problem) {
        return Err(SolverError::Infeasible(
            "improved plan lost or duplicated a job".to_string(),
        ));
    }

    let routes: Vec<Route> = outcome
        .plan
        .routes
        .iter()
        .enumerate()
        .map(|(vehicle, nodes)| Route {
            jobs: nodes.iter().map(|&node| node - n_vehicles).collect(),
            travel_seconds: problem.route_travel(vehicle, nodes.iter().copied()),
        })
        .collect();
    let total_travel_seconds = routes.iter().map(|r| r.travel_seconds).sum();
    let solve_time_ms = start.elapsed().as_millis() as u64;

    Ok(Solution {
        routes,
        total_travel_seconds,
        objective: outcome.objective,
        construction_objective,
        moves_applied: outcome.moves_applied,
        penalty_rounds: outcome.penalty_rounds,
        solve_time_ms,
    })
}
