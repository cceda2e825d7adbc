//! Request orchestration: validate, build the matrix, solve, shape the answer.

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::defaults::{default_job_name, default_technician_name, DEFAULT_MAX_JOBS, DEFAULT_MAX_TECHNICIANS};
use crate::services::matrix::{MatrixBuilder, MatrixConfig, MatrixError, TravelTimeMatrix};
use crate::services::solver::{self, Solution, SolverConfig, SolverError};
use crate::services::travel_time::{ProviderError, TravelTimeProvider};
use crate::types::{
    AssignedStop, OptimizeRequest, OptimizeResponse, RouteRequest, RouteResponse, TechnicianAssignment,
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OptimizeError {
    /// Caller-fixable input problem
    #[error("{0}")]
    Validation(String),

    #[error("Could not get drive time between '{from}' and '{to}'. Status: {reason}")]
    UnresolvableLocation {
        from: String,
        to: String,
        reason: String,
    },

    /// Transport failure, timeout or missing credentials
    #[error("{0}")]
    ProviderUnavailable(String),

    #[error("Travel-time provider error: {0}")]
    Provider(String),

    #[error("{0}")]
    Infeasible(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl OptimizeError {
    /// Machine-readable code used in NATS error envelopes
    pub fn code(&self) -> &'static str {
        match self {
            OptimizeError::Validation(_) => "INVALID_REQUEST",
            OptimizeError::UnresolvableLocation { .. } => "UNRESOLVABLE_LOCATION",
            OptimizeError::ProviderUnavailable(_) => "PROVIDER_UNAVAILABLE",
            OptimizeError::Provider(_) => "PROVIDER_ERROR",
            OptimizeError::Infeasible(_) => "SOLVER_ERROR",
            OptimizeError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to return to the caller; internal details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            OptimizeError::Internal(_) => "An unexpected server error occurred.".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<MatrixError> for OptimizeError {
    fn from(e: MatrixError) -> Self {
        match e {
            MatrixError::UnresolvableLocation { from, to, reason } => {
                OptimizeError::UnresolvableLocation { from, to, reason }
            }
            MatrixError::Provider(ProviderError::NotConfigured(msg)) => OptimizeError::ProviderUnavailable(msg),
            MatrixError::Provider(ProviderError::Unavailable(msg)) => OptimizeError::ProviderUnavailable(format!(
                "Could not reach the travel-time provider. Check your network. ({})",
                msg
            )),
            MatrixError::Provider(ProviderError::Api(msg)) => OptimizeError::Provider(msg),
            MatrixError::DeadlineExceeded(limit) => OptimizeError::ProviderUnavailable(format!(
                "Travel-time lookups did not finish within {} seconds.",
                limit.as_secs()
            )),
            other @ MatrixError::NotSquare { .. } => OptimizeError::Internal(other.to_string()),
        }
    }
}

impl From<SolverError> for OptimizeError {
    fn from(e: SolverError) -> Self {
        match e {
            SolverError::Infeasible(reason) => {
                OptimizeError::Infeasible(format!("No valid route solution could be found ({})", reason))
            }
            other => OptimizeError::Internal(other.to_string()),
        }
    }
}

/// Per-request cardinality limits
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub max_technicians: usize,
    pub max_jobs: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_technicians: DEFAULT_MAX_TECHNICIANS,
            max_jobs: DEFAULT_MAX_JOBS,
        }
    }
}

/// Validated, trimmed (name, address) pair
#[derive(Debug, Clone)]
struct Named {
    name: String,
    location: String,
}

/// Round seconds to whole minutes, halves to even.
pub fn seconds_to_minutes(seconds: u64) -> u64 {
    (seconds as f64 / 60.0).round_ties_even() as u64
}

fn clean(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Shared orchestrator; one instance serves all requests.
pub struct RouteOptimizer {
    matrix_builder: MatrixBuilder,
    solver_config: SolverConfig,
    limits: Limits,
}

impl RouteOptimizer {
    pub fn new(
        provider: Arc<dyn TravelTimeProvider>,
        matrix_config: MatrixConfig,
        solver_config: SolverConfig,
        limits: Limits,
    ) -> Self {
        Self {
            matrix_builder: MatrixBuilder::new(provider, matrix_config),
            solver_config,
            limits,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.matrix_builder.provider_name()
    }

    /// Assign jobs to technicians and order each technician's stops.
    pub async fn optimize(&self, request: OptimizeRequest) -> Result<OptimizeResponse, OptimizeError> {
        let (technicians, jobs) = self.validate(request)?;
        let solution = self.run(&technicians, &jobs).await?;

        let assignments: Vec<TechnicianAssignment> = technicians
            .into_iter()
            .zip(&solution.routes)
            .map(|(technician, route)| TechnicianAssignment {
                technician: technician.name,
                start_location: technician.location,
                stops: route
                    .jobs
                    .iter()
                    .map(|&j| AssignedStop {
                        job_name: jobs[j].name.clone(),
                        location: jobs[j].location.clone(),
                    })
                    .collect(),
                drive_time_minutes: seconds_to_minutes(route.travel_seconds),
            })
            .collect();

        Ok(OptimizeResponse {
            assignments,
            total_drive_time_minutes: seconds_to_minutes(solution.total_travel_seconds),
            total_jobs: jobs.len(),
        })
    }

    /// Order the stops of a single technician.
    pub async fn optimize_route(&self, request: RouteRequest) -> Result<RouteResponse, OptimizeError> {
        let start = clean(request.start_location.as_deref())
            .ok_or_else(|| OptimizeError::Validation("A start location is required.".to_string()))?;

        if request.job_locations.is_empty() {
            return Err(OptimizeError::Validation(
                "At least one job location is required.".to_string(),
            ));
        }
        if request.job_locations.len() > self.limits.max_jobs {
            return Err(OptimizeError::Validation(format!(
                "Maximum {} jobs per request.",
                self.limits.max_jobs
            )));
        }

        let jobs = request
            .job_locations
            .iter()
            .enumerate()
            .map(|(i, location)| {
                clean(Some(location.as_str()))
                    .map(|location| Named {
                        name: default_job_name(i),
                        location,
                    })
                    .ok_or_else(|| OptimizeError::Validation(format!("Job location {} is empty.", i + 1)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let technician = Named {
            name: default_technician_name(0),
            location: start,
        };
        let solution = self.run(std::slice::from_ref(&technician), &jobs).await?;

        let mut optimized_route = vec![technician.location];
        let mut total_seconds = 0;
        if let Some(route) = solution.routes.first() {
            optimized_route.extend(route.jobs.iter().map(|&j| jobs[j].location.clone()));
            total_seconds = route.travel_seconds;
        }

        Ok(RouteResponse {
            optimized_route,
            total_drive_time_minutes: seconds_to_minutes(total_seconds),
            stop_count: jobs.len(),
        })
    }

    fn validate(&self, request: OptimizeRequest) -> Result<(Vec<Named>, Vec<Named>), OptimizeError> {
        if request.technicians.is_empty() {
            return Err(OptimizeError::Validation(
                "At least one technician is required.".to_string(),
            ));
        }
        if request.jobs.is_empty() {
            return Err(OptimizeError::Validation("At least one job is required.".to_string()));
        }
        if request.technicians.len() > self.limits.max_technicians {
            return Err(OptimizeError::Validation(format!(
                "Maximum {} technicians per request.",
                self.limits.max_technicians
            )));
        }
        if request.jobs.len() > self.limits.max_jobs {
            return Err(OptimizeError::Validation(format!(
                "Maximum {} jobs per request.",
                self.limits.max_jobs
            )));
        }

        let mut technicians = Vec::with_capacity(request.technicians.len());
        for (i, t) in request.technicians.iter().enumerate() {
            let name = clean(t.name.as_deref()).unwrap_or_else(|| default_technician_name(i));
            let location = clean(t.start_location.as_deref()).ok_or_else(|| {
                OptimizeError::Validation(format!("Technician '{}' is missing a start location.", name))
            })?;
            technicians.push(Named { name, location });
        }

        let mut jobs = Vec::with_capacity(request.jobs.len());
        for (i, j) in request.jobs.iter().enumerate() {
            let name = clean(j.name.as_deref()).unwrap_or_else(|| default_job_name(i));
            let location = clean(j.location.as_deref())
                .ok_or_else(|| OptimizeError::Validation(format!("Job '{}' is missing a location.", name)))?;
            jobs.push(Named { name, location });
        }

        Ok((technicians, jobs))
    }

    /// Matrix over technician starts then job locations, then solve.
    async fn run(&self, technicians: &[Named], jobs: &[Named]) -> Result<Solution, OptimizeError> {
        let addresses: Vec<String> = technicians
            .iter()
            .chain(jobs)
            .map(|n| n.location.clone())
            .collect();

        info!(
            "Building travel-time matrix for {} nodes ({} technicians + {} jobs) via {}",
            addresses.len(),
            technicians.len(),
            jobs.len(),
            self.provider_name()
        );
        let matrix = self.matrix_builder.build(&addresses).await.map_err(|e| {
            warn!("Matrix build failed: {}", e);
            OptimizeError::from(e)
        })?;

        info!("Running routing solver ({} vehicles, {} jobs)", technicians.len(), jobs.len());
        self.solve(matrix, technicians.len(), jobs.len()).await
    }

    async fn solve(
        &self,
        matrix: TravelTimeMatrix,
        n_vehicles: usize,
        n_jobs: usize,
    ) -> Result<Solution, OptimizeError> {
        let config = self.solver_config.clone();
        let result = tokio::task::spawn_blocking(move || solver::solve(&matrix, n_vehicles, n_jobs, &config))
            .await
            .map_err(|e| {
                error!("Solver task failed: {}", e);
                OptimizeError::Internal(e.to_string())
            })?;

        let solution = result.map_err(|e| {
            match &e {
                SolverError::Infeasible(_) => warn!("Solver error: {}", e),
                _ => error!("Solver error: {}", e),
            }
            OptimizeError::from(e)
        })?;

        info!(
            "Solved {} jobs on {} vehicles in {}ms: objective {} -> {} ({} moves, {} penalty rounds)",
            n_jobs,
            n_vehicles,
            solution.solve_time_ms,
            solution.construction_objective,
            solution.objective,
            solution.moves_applied,
            solution.penalty_rounds
        );
        Ok(solution)
    }
}
