//! Configuration management

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::defaults::{
    DEFAULT_BIND_ADDR, DEFAULT_MATRIX_BLOCK_SIZE, DEFAULT_MATRIX_DEADLINE_SECS,
    DEFAULT_MATRIX_MAX_CONCURRENCY, DEFAULT_MAX_JOBS, DEFAULT_MAX_TECHNICIANS,
    DEFAULT_SOLVER_TIME_BUDGET_SECS, DEFAULT_SPAN_COST_COEFFICIENT,
};
use crate::services::matrix::MatrixConfig;
use crate::services::optimizer::Limits;
use crate::services::solver::SolverConfig;
use crate::services::travel_time::{GoogleConfig, ProviderConfig, TravelTimeBackend};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listen address
    pub bind_addr: String,

    /// NATS server URL; the NATS front end is disabled when unset
    pub nats_url: Option<String>,

    pub provider: ProviderConfig,
    pub matrix: MatrixConfig,
    pub solver: SolverConfig,
    pub limits: Limits,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup (environment, map in tests)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = match (var("BIND_ADDR"), var("PORT")) {
            (Some(addr), _) => addr,
            (None, Some(port)) => {
                let port: u16 = port.parse().context("PORT must be a valid port number")?;
                format!("0.0.0.0:{}", port)
            }
            (None, None) => DEFAULT_BIND_ADDR.to_string(),
        };

        let nats_url = var("NATS_URL");

        let backend = match var("TRAVEL_TIME_BACKEND") {
            Some(value) => TravelTimeBackend::from_str(&value)?,
            None => TravelTimeBackend::Google,
        };

        let mut google = GoogleConfig {
            api_key: var("GOOGLE_MAPS_API_KEY"),
            ..Default::default()
        };
        if let Some(url) = var("DISTANCE_MATRIX_URL") {
            google.base_url = url.trim_end_matches('/').to_string();
        }
        google.timeout_seconds = parse_or(&var, "PROVIDER_TIMEOUT_SECS", google.timeout_seconds)?;

        let matrix = MatrixConfig {
            block_size: parse_or(&var, "MATRIX_BLOCK_SIZE", DEFAULT_MATRIX_BLOCK_SIZE)?,
            max_concurrent_requests: parse_or(&var, "MATRIX_MAX_CONCURRENCY", DEFAULT_MATRIX_MAX_CONCURRENCY)?,
            deadline: Duration::from_secs(parse_or(&var, "MATRIX_DEADLINE_SECS", DEFAULT_MATRIX_DEADLINE_SECS)?),
        };
        if matrix.block_size == 0 || matrix.max_concurrent_requests == 0 {
            anyhow::bail!("MATRIX_BLOCK_SIZE and MATRIX_MAX_CONCURRENCY must be at least 1");
        }
        google.max_block_size = google.max_block_size.min(matrix.block_size);

        let mut solver = SolverConfig::new(
            parse_or(&var, "SOLVER_TIME_BUDGET_SECS", DEFAULT_SOLVER_TIME_BUDGET_SECS)?,
            parse_or(&var, "SPAN_COST_COEFFICIENT", DEFAULT_SPAN_COST_COEFFICIENT)?,
        );
        if !parse_or(&var, "SOLVER_GUIDED", true)? {
            solver = solver.without_guidance();
        }
        if let Some(rounds) = var("SOLVER_MAX_STALL_ROUNDS") {
            let rounds = rounds
                .parse()
                .with_context(|| format!("SOLVER_MAX_STALL_ROUNDS has an invalid value '{}'", rounds))?;
            solver = solver.with_max_stall_rounds(rounds);
        }

        let limits = Limits {
            max_technicians: parse_or(&var, "MAX_TECHNICIANS", DEFAULT_MAX_TECHNICIANS)?,
            max_jobs: parse_or(&var, "MAX_JOBS", DEFAULT_MAX_JOBS)?,
        };

        Ok(Self {
            bind_addr,
            nats_url,
            provider: ProviderConfig { backend, google },
            matrix,
            solver,
            limits,
        })
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(value) => value
            .parse()
            .with_context(|| format!("{} has an invalid value '{}'", key, value)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert!(config.nats_url.is_none());
        assert_eq!(config.provider.backend, TravelTimeBackend::Google);
        assert!(config.provider.google.api_key.is_none());
        assert_eq!(config.matrix.block_size, 10);
        assert_eq!(config.matrix.max_concurrent_requests, 4);
        assert_eq!(config.solver.time_budget, Duration::from_secs(15));
        assert_eq!(config.solver.span_cost_coefficient, 600);
        assert_eq!(config.limits.max_technicians, 10);
        assert_eq!(config.limits.max_jobs, 24);
        assert!(config.solver.guided);
        assert_eq!(config.solver.max_stall_rounds, None);
    }

    #[test]
    fn test_stall_limit_is_opt_in() {
        let config = config_from(&[("SOLVER_MAX_STALL_ROUNDS", "250")]).unwrap();
        assert_eq!(config.solver.max_stall_rounds, Some(250));
        assert!(config_from(&[("SOLVER_MAX_STALL_ROUNDS", "-1")]).is_err());
    }

    #[test]
    fn test_guidance_can_be_disabled() {
        let config = config_from(&[("SOLVER_GUIDED", "false")]).unwrap();
        assert!(!config.solver.guided);
        assert!(config_from(&[("SOLVER_GUIDED", "maybe")]).is_err());
    }

    #[test]
    fn test_port_fallback() {
        let config = config_from(&[("PORT", "5000")]).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:5000");

        let config = config_from(&[("PORT", "5000"), ("BIND_ADDR", "127.0.0.1:9000")]).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:9000");
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("TRAVEL_TIME_BACKEND", "mock"),
            ("GOOGLE_MAPS_API_KEY", "abc"),
            ("DISTANCE_MATRIX_URL", "http://localhost:9999/matrix/"),
            ("MATRIX_BLOCK_SIZE", "5"),
            ("SOLVER_TIME_BUDGET_SECS", "3"),
            ("SPAN_COST_COEFFICIENT", "0"),
            ("NATS_URL", "nats://localhost:4222"),
        ])
        .unwrap();

        assert_eq!(config.provider.backend, TravelTimeBackend::Mock);
        assert_eq!(config.provider.google.api_key.as_deref(), Some("abc"));
        assert_eq!(config.provider.google.base_url, "http://localhost:9999/matrix");
        assert_eq!(config.provider.google.max_block_size, 5);
        assert_eq!(config.solver.time_budget, Duration::from_secs(3));
        assert_eq!(config.solver.span_cost_coefficient, 0);
        assert_eq!(config.nats_url.as_deref(), Some("nats://localhost:4222"));
    }

    #[test]
    fn test_blank_api_key_is_unset() {
        let config = config_from(&[("GOOGLE_MAPS_API_KEY", "  ")]).unwrap();
        assert!(config.provider.google.api_key.is_none());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(config_from(&[("MAX_JOBS", "lots")]).is_err());
        assert!(config_from(&[("TRAVEL_TIME_BACKEND", "osrm")]).is_err());
        assert!(config_from(&[("MATRIX_BLOCK_SIZE", "0")]).is_err());
        assert!(config_from(&[("PORT", "http")]).is_err());
    }
}
