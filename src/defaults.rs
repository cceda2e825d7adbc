pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

pub const DEFAULT_MAX_TECHNICIANS: usize = 10;
pub const DEFAULT_MAX_JOBS: usize = 24;

pub const DEFAULT_MATRIX_BLOCK_SIZE: usize = 10;
pub const DEFAULT_MATRIX_MAX_CONCURRENCY: usize = 4;
pub const DEFAULT_MATRIX_DEADLINE_SECS: u64 = 60;

pub const DEFAULT_SOLVER_TIME_BUDGET_SECS: u64 = 15;
/// Seconds of travel one unit of job-count imbalance is worth
pub const DEFAULT_SPAN_COST_COEFFICIENT: u64 = 600;

/// Days after the last service when a customer is due again (~11 months)
pub const SERVICE_INTERVAL_DAYS: i64 = 335;

pub fn default_technician_name(index: usize) -> String {
    format!("Technician {}", index + 1)
}

pub fn default_job_name(index: usize) -> String {
    format!("Job {}", index + 1)
}
