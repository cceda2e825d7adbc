//! Problem view over the matrix and the working solution representation

use std::ops::Range;

use crate::services::matrix::TravelTimeMatrix;

use super::SolverError;

/// Multi-depot round-trip problem: depots are nodes `0..V`, jobs `V..V+J`
#[derive(Debug, Clone, Copy)]
pub struct RoutingProblem<'a> {
    matrix: &'a TravelTimeMatrix,
    n_vehicles: usize,
    n_jobs: usize,
}

impl<'a> RoutingProblem<'a> {
    pub fn new(
        matrix: &'a TravelTimeMatrix,
        n_vehicles: usize,
        n_jobs: usize,
    ) -> Result<Self, SolverError> {
        if n_vehicles == 0 {
            return Err(SolverError::NoVehicles);
        }
        if matrix.size() != n_vehicles + n_jobs {
            return Err(SolverError::DimensionMismatch {
                nodes: matrix.size(),
                vehicles: n_vehicles,
                jobs: n_jobs,
            });
        }
        Ok(Self {
            matrix,
            n_vehicles,
            n_jobs,
        })
    }

    pub fn n_vehicles(&self) -> usize {
        self.n_vehicles
    }

    pub fn n_jobs(&self) -> usize {
        self.n_jobs
    }

    /// Job node indices
    pub fn jobs(&self) -> Range<usize> {
        self.n_vehicles..self.n_vehicles + self.n_jobs
    }

    /// Depot node of a vehicle
    pub fn depot(&self, vehicle: usize) -> usize {
        vehicle
    }

    pub fn arc(&self, from: usize, to: usize) -> u64 {
        self.matrix.duration(from, to)
    }

    /// Round-trip travel seconds: depot -> nodes... -> depot.
    pub fn route_travel<I>(&self, vehicle: usize, nodes: I) -> u64
    where
        I: IntoIterator<Item = usize>,
    {
        let depot = self.depot(vehicle);
        let mut prev = depot;
        let mut total = 0u64;
        for node in nodes {
            total = total.saturating_add(self.arc(prev, node));
            prev = node;
        }
        total.saturating_add(self.arc(prev, depot))
    }
}

/// One job sequence per vehicle, depots excluded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub routes: Vec<Vec<usize>>,
}

impl Plan {
    pub fn empty(n_vehicles: usize) -> Self {
        Self {
            routes: vec![Vec::new(); n_vehicles],
        }
    }

    pub fn travel(&self, problem: &RoutingProblem) -> u64 {
        self.routes
            .iter()
            .enumerate()
            .map(|(vehicle, route)| problem.route_travel(vehicle, route.iter().copied()))
            .sum()
    }

    /// Max minus min jobs per route
    pub fn span(&self) -> u64 {
        load_span(self.routes.iter().map(Vec::len))
    }

    /// Travel seconds plus the imbalance penalty
    pub fn objective(&self, problem: &RoutingProblem, span_cost_coefficient: u64) -> u64 {
        self.travel(problem)
            .saturating_add(span_cost_coefficient.saturating_mul(self.span()))
    }

    /// Every job node appears exactly once and nothing else is routed.
    pub fn is_complete(&self, problem: &RoutingProblem) -> bool {
        if self.routes.len() != problem.n_vehicles() {
            return false;
        }
        let mut seen = vec![false; problem.n_jobs()];
        for &node in self.routes.iter().flatten() {
            if !problem.jobs().contains(&node) {
                return false;
            }
            let slot = &mut seen[node - problem.n_vehicles()];
            if *slot {
                return false;
            }
            *slot = true;
        }
        seen.into_iter().all(|s| s)
    }
}

/// Span of a set of route loads; 0 for no routes
pub fn load_span<I>(loads: I) -> u64
where
    I: IntoIterator<Item = usize>,
{
    let mut min = usize::MAX;
    let mut max = 0usize;
    let mut any = false;
    for load in loads {
        any = true;
        min = min.min(load);
        max = max.max(load);
    }
    if any {
        (max - min) as u64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: Vec<Vec<u64>>) -> TravelTimeMatrix {
        TravelTimeMatrix::from_rows(rows).unwrap()
    }

    #[test]
    fn test_problem_rejects_dimension_mismatch() {
        let m = matrix(vec![vec![0, 1], vec![1, 0]]);
        let err = RoutingProblem::new(&m, 1, 2).unwrap_err();
        assert_eq!(
            err,
            SolverError::DimensionMismatch {
                nodes: 2,
                vehicles: 1,
                jobs: 2
            }
        );
    }

    #[test]
    fn test_problem_rejects_zero_vehicles() {
        let m = matrix(vec![vec![0]]);
        assert_eq!(RoutingProblem::new(&m, 0, 1).unwrap_err(), SolverError::NoVehicles);
    }

    #[test]
    fn test_route_travel_round_trip() {
        let m = matrix(vec![vec![0, 100, 40], vec![90, 0, 10], vec![35, 12, 0]]);
        let problem = RoutingProblem::new(&m, 1, 2).unwrap();

        // 0 -> 1 -> 2 -> 0
        assert_eq!(problem.route_travel(0, [1, 2]), 100 + 10 + 35);
        // 0 -> 2 -> 1 -> 0 (asymmetric)
        assert_eq!(problem.route_travel(0, [2, 1]), 40 + 12 + 90);
        // idle vehicle stays home
        assert_eq!(problem.route_travel(0, Vec::new()), 0);
    }

    #[test]
    fn test_plan_objective_includes_span() {
        let m = matrix(vec![
            vec![0, 0, 10, 10],
            vec![0, 0, 10, 10],
            vec![10, 10, 0, 5],
            vec![10, 10, 5, 0],
        ]);
        let problem = RoutingProblem::new(&m, 2, 2).unwrap();
        let plan = Plan {
            routes: vec![vec![2, 3], vec![]],
        };

        assert_eq!(plan.travel(&problem), 25);
        assert_eq!(plan.span(), 2);
        assert_eq!(plan.objective(&problem, 100), 225);
    }

    #[test]
    fn test_is_complete() {
        let m = matrix(vec![vec![0; 4]; 4]);
        let problem = RoutingProblem::new(&m, 2, 2).unwrap();

        assert!(Plan { routes: vec![vec![2], vec![3]] }.is_complete(&problem));
        assert!(!Plan { routes: vec![vec![2], vec![]] }.is_complete(&problem));
        assert!(!Plan { routes: vec![vec![2, 2], vec![3]] }.is_complete(&problem));
        assert!(!Plan { routes: vec![vec![1, 2, 3], vec![]] }.is_complete(&problem));
    }

    #[test]
    fn test_load_span() {
        assert_eq!(load_span([3, 1, 2]), 2);
        assert_eq!(load_span([4]), 0);
        assert_eq!(load_span(std::iter::empty()), 0);
    }
}
