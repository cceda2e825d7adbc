//! Cheapest-insertion construction.
//!
//! Starting from empty routes, repeatedly commits the (job, vehicle, position)
//! triple whose insertion raises the penalized objective the least. The span
//! term is part of the insertion cost, so early choices already spread jobs
//! over the fleet instead of piling them onto the nearest depot.

use tracing::debug;

use super::plan::{load_span, Plan, RoutingProblem};
use super::SolverError;

#[derive(Debug, Clone, Copy)]
struct Insertion {
    job: usize,
    vehicle: usize,
    position: usize,
    delta: i64,
}

/// Build a complete initial plan or fail with `Infeasible`.
pub fn cheapest_insertion(
    problem: &RoutingProblem,
    span_cost_coefficient: u64,
) -> Result<Plan, SolverError> {
    let mut plan = Plan::empty(problem.n_vehicles());
    let mut unassigned: Vec<usize> = problem.jobs().collect();

    while !unassigned.is_empty() {
        let best = best_insertion(problem, &plan, &unassigned, span_cost_coefficient).ok_or_else(|| {
            SolverError::Infeasible(format!("{} jobs could not be inserted", unassigned.len()))
        })?;

        plan.routes[best.vehicle].insert(best.position, best.job);
        unassigned.retain(|&job| job != best.job);
    }

    if !plan.is_complete(problem) {
        return Err(SolverError::Infeasible(
            "construction left jobs unassigned".to_string(),
        ));
    }

    debug!(
        "Construction finished: travel={}s span={}",
        plan.travel(problem),
        plan.span()
    );

    Ok(plan)
}

fn best_insertion(
    problem: &RoutingProblem,
    plan: &Plan,
    unassigned: &[usize],
    span_cost_coefficient: u64,
) -> Option<Insertion> {
    let loads: Vec<usize> = plan.routes.iter().map(Vec::len).collect();
    let current_span = load_span(loads.iter().copied()) as i64;
    let mut best: Option<Insertion> = None;

    for (vehicle, route) in plan.routes.iter().enumerate() {
        let depot = problem.depot(vehicle);
        let new_span = load_span(
            loads
                .iter()
                .enumerate()
                .map(|(v, &load)| if v == vehicle { load + 1 } else { load }),
        ) as i64;
        let span_delta = (new_span - current_span) * span_cost_coefficient as i64;

        for position in 0..=route.len() {
            let prev = if position == 0 { depot } else { route[position - 1] };
            let next = if position == route.len() { depot } else { route[position] };
            let removed = problem.arc(prev, next) as i64;

            for &job in unassigned {
                let added = problem.arc(prev, job) as i64 + problem.arc(job, next) as i64;
                let delta = added - removed + span_delta;

                if best.as_ref().is_none_or(|b| delta < b.delta) {
                    best = Some(Insertion {
                        job,
                        vehicle,
                        position,
                        delta,
                    });
                }
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::matrix::TravelTimeMatrix;

    fn matrix(rows: Vec<Vec<u64>>) -> TravelTimeMatrix {
        TravelTimeMatrix::from_rows(rows).unwrap()
    }

    #[test]
    fn test_single_job_single_vehicle() {
        let m = matrix(vec![vec![0, 100], vec![100, 0]]);
        let problem = RoutingProblem::new(&m, 1, 1).unwrap();

        let plan = cheapest_insertion(&problem, 600).unwrap();

        assert_eq!(plan.routes, vec![vec![1]]);
        assert_eq!(plan.travel(&problem), 200);
    }

    #[test]
    fn test_no_jobs_gives_idle_routes() {
        let m = matrix(vec![vec![0, 5], vec![5, 0]]);
        let problem = RoutingProblem::new(&m, 2, 0).unwrap();

        let plan = cheapest_insertion(&problem, 600).unwrap();

        assert_eq!(plan.routes, vec![Vec::<usize>::new(), Vec::new()]);
    }

    #[test]
    fn test_jobs_go_to_nearest_depot_when_balanced() {
        // depots 0, 1; jobs 2, 3 near depot 0; jobs 4, 5 near depot 1
        let near = 60;
        let far = 3000;
        let mut rows = vec![vec![far; 6]; 6];
        for (i, row) in rows.iter_mut().enumerate() {
            row[i] = 0;
        }
        for &(a, b) in &[(0, 2), (0, 3), (2, 3), (1, 4), (1, 5), (4, 5)] {
            rows[a][b] = near;
            rows[b][a] = near;
        }
        let m = matrix(rows);
        let problem = RoutingProblem::new(&m, 2, 4).unwrap();

        let plan = cheapest_insertion(&problem, 600).unwrap();

        let mut first = plan.routes[0].clone();
        let mut second = plan.routes[1].clone();
        first.sort();
        second.sort();
        assert_eq!(first, vec![2, 3]);
        assert_eq!(second, vec![4, 5]);
    }

    #[test]
    fn test_every_job_placed_once() {
        let n = 3 + 12;
        let rows: Vec<Vec<u64>> = (0..n)
            .map(|i| (0..n).map(|j| if i == j { 0 } else { ((i * 7 + j * 13) % 50 + 10) as u64 }).collect())
            .collect();
        let m = matrix(rows);
        let problem = RoutingProblem::new(&m, 3, 12).unwrap();

        let plan = cheapest_insertion(&problem, 600).unwrap();

        assert!(plan.is_complete(&problem));
        assert_eq!(plan.routes.iter().map(Vec::len).sum::<usize>(), 12);
    }

    #[test]
    fn test_span_weight_spreads_jobs() {
        // Both jobs sit on top of depot 0; depot 1 is slightly farther away
        let m = matrix(vec![
            vec![0, 500, 10, 10],
            vec![500, 0, 100, 100],
            vec![10, 100, 0, 10],
            vec![10, 100, 10, 0],
        ]);
        let problem = RoutingProblem::new(&m, 2, 2).unwrap();

        let unbalanced = cheapest_insertion(&problem, 0).unwrap();
        let balanced = cheapest_insertion(&problem, 1000).unwrap();

        assert_eq!(unbalanced.routes[1].len(), 0);
        assert_eq!(balanced.routes[0].len(), 1);
        assert_eq!(balanced.routes[1].len(), 1);
    }
}
