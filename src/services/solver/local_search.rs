//! Guided local search over relocate, exchange and 2-opt neighborhoods.
//!
//! Descent runs on the augmented objective `g = f + λ·Σ penalty(arc)`. At each
//! local optimum of `g`, the arcs of the current plan with the highest utility
//! `cost / (1 + penalty)` are penalized, pushing the search away from them. The
//! plan with the best *true* objective `f` is kept aside and returned, so the
//! search can be stopped at any point.

use std::iter::once;
use std::time::Instant;

use tracing::debug;

use super::config::SolverConfig;
use super::plan::{load_span, Plan, RoutingProblem};

/// Result of the improvement phase
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Best plan by true objective
    pub plan: Plan,
    /// Travel plus imbalance penalty of `plan`
    pub objective: u64,
    pub moves_applied: usize,
    pub penalty_rounds: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Move {
    /// Take the job at `from_pos`, put it at `to_pos` of `to_route`.
    /// For the same route, `to_pos` indexes the route with the job removed.
    Relocate {
        from_route: usize,
        from_pos: usize,
        to_route: usize,
        to_pos: usize,
    },
    Exchange {
        route_a: usize,
        pos_a: usize,
        route_b: usize,
        pos_b: usize,
    },
    /// Reverse `start..=end` within one route
    TwoOpt { route: usize, start: usize, end: usize },
}

/// Augmented cost model: matrix arcs plus weighted arc penalties
struct Evaluator<'a, 'p> {
    problem: &'a RoutingProblem<'p>,
    n_nodes: usize,
    penalties: Vec<u64>,
    lambda: u64,
    span_cost_coefficient: u64,
}

impl<'a, 'p> Evaluator<'a, 'p> {
    fn new(problem: &'a RoutingProblem<'p>, span_cost_coefficient: u64) -> Self {
        let n_nodes = problem.n_vehicles() + problem.n_jobs();
        Self {
            problem,
            n_nodes,
            penalties: vec![0; n_nodes * n_nodes],
            lambda: 0,
            span_cost_coefficient,
        }
    }

    fn penalty(&self, from: usize, to: usize) -> u64 {
        self.penalties[from * self.n_nodes + to]
    }

    fn arc(&self, from: usize, to: usize) -> i64 {
        (self.problem.arc(from, to) + self.lambda * self.penalty(from, to)) as i64
    }

    fn route_cost<I>(&self, vehicle: usize, nodes: I) -> i64
    where
        I: IntoIterator<Item = usize>,
    {
        let depot = self.problem.depot(vehicle);
        let mut prev = depot;
        let mut total = 0i64;
        for node in nodes {
            total += self.arc(prev, node);
            prev = node;
        }
        total + self.arc(prev, depot)
    }

    fn route_costs(&self, plan: &Plan) -> Vec<i64> {
        plan.routes
            .iter()
            .enumerate()
            .map(|(vehicle, route)| self.route_cost(vehicle, route.iter().copied()))
            .collect()
    }

    /// Span penalty change when one job moves from route `from` to route `to`
    fn relocation_span_delta(&self, loads: &[usize], from: usize, to: usize) -> i64 {
        let before = load_span(loads.iter().copied());
        let after = load_span(loads.iter().enumerate().map(|(v, &load)| {
            if v == from {
                load - 1
            } else if v == to {
                load + 1
            } else {
                load
            }
        }));
        (after as i64 - before as i64) * self.span_cost_coefficient as i64
    }

    /// Best strictly improving move of the augmented objective, if any
    fn best_move(&self, plan: &Plan, route_costs: &[i64]) -> Option<(Move, i64)> {
        let mut best: Option<(Move, i64)> = None;
        let mut consider = |mv: Move, delta: i64| {
            if delta < 0 && best.as_ref().is_none_or(|&(_, d)| delta < d) {
                best = Some((mv, delta));
            }
        };

        let loads: Vec<usize> = plan.routes.iter().map(Vec::len).collect();

        // Relocate
        for (r1, route1) in plan.routes.iter().enumerate() {
            for p1 in 0..route1.len() {
                let job = route1[p1];
                let reduced: Vec<usize> = route1[..p1]
                    .iter()
                    .chain(&route1[p1 + 1..])
                    .copied()
                    .collect();

                for p2 in 0..=reduced.len() {
                    if p2 == p1 {
                        continue;
                    }
                    let cost = self.route_cost(r1, with_inserted(&reduced, p2, job));
                    consider(
                        Move::Relocate {
                            from_route: r1,
                            from_pos: p1,
                            to_route: r1,
                            to_pos: p2,
                        },
                        cost - route_costs[r1],
                    );
                }

                let reduced_delta = self.route_cost(r1, reduced.iter().copied()) - route_costs[r1];

                for (r2, route2) in plan.routes.iter().enumerate() {
                    if r2 == r1 {
                        continue;
                    }
                    let span_delta = self.relocation_span_delta(&loads, r1, r2);
                    for p2 in 0..=route2.len() {
                        let cost = self.route_cost(r2, with_inserted(route2, p2, job));
                        consider(
                            Move::Relocate {
                                from_route: r1,
                                from_pos: p1,
                                to_route: r2,
                                to_pos: p2,
                            },
                            reduced_delta + cost - route_costs[r2] + span_delta,
                        );
                    }
                }
            }
        }

        // Exchange
        for (r1, route1) in plan.routes.iter().enumerate() {
            for p1 in 0..route1.len() {
                let a = route1[p1];

                for p2 in p1 + 1..route1.len() {
                    let b = route1[p2];
                    let cost = self.route_cost(
                        r1,
                        route1.iter().enumerate().map(|(i, &node)| {
                            if i == p1 {
                                b
                            } else if i == p2 {
                                a
                            } else {
                                node
                            }
                        }),
                    );
                    consider(
                        Move::Exchange {
                            route_a: r1,
                            pos_a: p1,
                            route_b: r1,
                            pos_b: p2,
                        },
                        cost - route_costs[r1],
                    );
                }

                for (r2, route2) in plan.routes.iter().enumerate().skip(r1 + 1) {
                    for (p2, &b) in route2.iter().enumerate() {
                        let cost_a = self.route_cost(r1, with_replaced(route1, p1, b));
                        let cost_b = self.route_cost(r2, with_replaced(route2, p2, a));
                        consider(
                            Move::Exchange {
                                route_a: r1,
                                pos_a: p1,
                                route_b: r2,
                                pos_b: p2,
                            },
                            cost_a - route_costs[r1] + cost_b - route_costs[r2],
                        );
                    }
                }
            }
        }

        // 2-opt
        for (r, route) in plan.routes.iter().enumerate() {
            for start in 0..route.len() {
                for end in start + 1..route.len() {
                    let nodes = route[..start]
                        .iter()
                        .chain(route[start..=end].iter().rev())
                        .chain(&route[end + 1..])
                        .copied();
                    let cost = self.route_cost(r, nodes);
                    consider(Move::TwoOpt { route: r, start, end }, cost - route_costs[r]);
                }
            }
        }

        best
    }

    /// Arcs used by non-empty routes
    fn plan_arcs(&self, plan: &Plan) -> Vec<(usize, usize)> {
        let mut arcs = Vec::new();
        for (vehicle, route) in plan.routes.iter().enumerate() {
            if route.is_empty() {
                continue;
            }
            let depot = self.problem.depot(vehicle);
            let mut prev = depot;
            for &node in route {
                arcs.push((prev, node));
                prev = node;
            }
            arcs.push((prev, depot));
        }
        arcs
    }

    /// Increment penalties of the maximum-utility arcs of `plan`.
    fn penalize(&mut self, plan: &Plan) {
        let arcs = self.plan_arcs(plan);
        let utility = |&(from, to): &(usize, usize)| {
            self.problem.arc(from, to) as f64 / (1 + self.penalty(from, to)) as f64
        };

        let max_utility = arcs.iter().map(&utility).fold(f64::NEG_INFINITY, f64::max);
        let selected: Vec<(usize, usize)> = arcs
            .iter()
            .filter(|arc| utility(*arc) >= max_utility - 1e-9)
            .copied()
            .collect();

        for (from, to) in selected {
            self.penalties[from * self.n_nodes + to] += 1;
        }
    }
}

fn with_inserted(route: &[usize], position: usize, job: usize) -> impl Iterator<Item = usize> + '_ {
    route[..position]
        .iter()
        .copied()
        .chain(once(job))
        .chain(route[position..].iter().copied())
}

fn with_replaced(route: &[usize], position: usize, job: usize) -> impl Iterator<Item = usize> + '_ {
    route
        .iter()
        .enumerate()
        .map(move |(i, &node)| if i == position { job } else { node })
}

fn apply(plan: &mut Plan, mv: Move) -> Vec<usize> {
    match mv {
        Move::Relocate {
            from_route,
            from_pos,
            to_route,
            to_pos,
        } => {
            let job = plan.routes[from_route].remove(from_pos);
            plan.routes[to_route].insert(to_pos, job);
            if from_route == to_route {
                vec![from_route]
            } else {
                vec![from_route, to_route]
            }
        }
        Move::Exchange {
            route_a,
            pos_a,
            route_b,
            pos_b,
        } => {
            let a = plan.routes[route_a][pos_a];
            let b = plan.routes[route_b][pos_b];
            plan.routes[route_a][pos_a] = b;
            plan.routes[route_b][pos_b] = a;
            if route_a == route_b {
                vec![route_a]
            } else {
                vec![route_a, route_b]
            }
        }
        Move::TwoOpt { route, start, end } => {
            plan.routes[route][start..=end].reverse();
            vec![route]
        }
    }
}

/// Improve `initial` until the deadline, a plain local optimum (unguided),
/// or too many penalization rounds without a new best.
pub fn improve(
    problem: &RoutingProblem,
    initial: Plan,
    config: &SolverConfig,
    deadline: Instant,
) -> SearchOutcome {
    let coefficient = config.span_cost_coefficient;
    let mut evaluator = Evaluator::new(problem, coefficient);

    let mut plan = initial;
    let mut best_objective = plan.objective(problem, coefficient);
    let mut best_plan = plan.clone();
    let mut route_costs = evaluator.route_costs(&plan);

    let mut moves_applied = 0usize;
    let mut penalty_rounds = 0usize;
    let mut stall_rounds = 0usize;

    if problem.n_jobs() == 0 {
        return SearchOutcome {
            plan: best_plan,
            objective: best_objective,
            moves_applied,
            penalty_rounds,
        };
    }

    loop {
        if Instant::now() >= deadline {
            debug!("Local search stopped by time budget");
            break;
        }

        match evaluator.best_move(&plan, &route_costs) {
            Some((mv, _delta)) => {
                for route in apply(&mut plan, mv) {
                    route_costs[route] = evaluator.route_cost(route, plan.routes[route].iter().copied());
                }
                moves_applied += 1;

                let objective = plan.objective(problem, coefficient);
                if objective < best_objective {
                    best_objective = objective;
                    best_plan = plan.clone();
                    stall_rounds = 0;
                }
            }
            None => {
                if !config.guided {
                    debug!("Local optimum reached");
                    break;
                }
                if config.max_stall_rounds.is_some_and(|limit| stall_rounds >= limit) {
                    debug!("Guided search stalled after {} rounds", penalty_rounds);
                    break;
                }

                if evaluator.lambda == 0 {
                    let arcs = evaluator.plan_arcs(&plan).len().max(1);
                    let objective = plan.objective(problem, coefficient);
                    evaluator.lambda =
                        ((config.gls_alpha * objective as f64) / arcs as f64).round().max(1.0) as u64;
                    debug!("Guided search penalty weight λ={}", evaluator.lambda);
                }

                evaluator.penalize(&plan);
                route_costs = evaluator.route_costs(&plan);
                penalty_rounds += 1;
                stall_rounds += 1;
            }
        }
    }

    debug!(
        "Local search: {} moves, {} penalty rounds, best objective {}",
        moves_applied, penalty_rounds, best_objective
    );

    SearchOutcome {
        plan: best_plan,
        objective: best_objective,
        moves_applied,
        penalty_rounds,
    }
}
