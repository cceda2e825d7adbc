//! Travel-time provider abstraction
//!
//! Uses the Google Distance Matrix API for production, an offline estimate
//! for development and tests.

mod google;
#[cfg(test)]
pub mod scripted;

pub use google::{GoogleConfig, GoogleDistanceMatrixClient};

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::services::geo::{
    address_to_coordinates, travel_time_seconds, AVERAGE_SPEED_KMH, ROAD_COEFFICIENT,
};

/// Outcome for a single origin/destination pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TravelTime {
    /// Driving time in seconds
    Seconds(u64),
    /// The provider could not route this pair; carries its status
    Unresolved(String),
}

/// Failures not tied to a specific pair
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("travel-time provider is not configured: {0}")]
    NotConfigured(String),
    #[error("could not reach travel-time provider: {0}")]
    Unavailable(String),
    #[error("travel-time provider error: {0}")]
    Api(String),
}

/// Point-to-point travel-time source (Google, offline estimate, ...)
#[async_trait]
pub trait TravelTimeProvider: Send + Sync {
    /// Travel times for one block: `result[i][j]` is origins[i] -> destinations[j].
    async fn travel_times(
        &self,
        origins: &[String],
        destinations: &[String],
    ) -> Result<Vec<Vec<TravelTime>>, ProviderError>;

    /// Largest number of origins (and of destinations) accepted per call
    fn max_block_size(&self) -> usize;

    /// Get service name for logging
    fn name(&self) -> &str;
}

/// Offline provider: hashed pseudo-coordinates, Haversine × road coefficient
pub struct MockTravelTimeProvider {
    road_coefficient: f64,
    average_speed_kmh: f64,
}

impl Default for MockTravelTimeProvider {
    fn default() -> Self {
        Self {
            road_coefficient: ROAD_COEFFICIENT,
            average_speed_kmh: AVERAGE_SPEED_KMH,
        }
    }
}

impl MockTravelTimeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn with_params(road_coefficient: f64, average_speed_kmh: f64) -> Self {
        Self {
            road_coefficient,
            average_speed_kmh,
        }
    }
}

#[async_trait]
impl TravelTimeProvider for MockTravelTimeProvider {
    async fn travel_times(
        &self,
        origins: &[String],
        destinations: &[String],
    ) -> Result<Vec<Vec<TravelTime>>, ProviderError> {
        let rows = origins
            .iter()
            .map(|origin| {
                let from = address_to_coordinates(origin);
                destinations
                    .iter()
                    .map(|destination| {
                        let to = address_to_coordinates(destination);
                        TravelTime::Seconds(travel_time_seconds(
                            &from,
                            &to,
                            self.road_coefficient,
                            self.average_speed_kmh,
                        ))
                    })
                    .collect()
            })
            .collect();

        Ok(rows)
    }

    fn max_block_size(&self) -> usize {
        25
    }

    fn name(&self) -> &str {
        "MockTravelTime"
    }
}

/// Which provider backs the matrix builder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TravelTimeBackend {
    Google,
    Mock,
}

impl std::str::FromStr for TravelTimeBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "mock" => Ok(Self::Mock),
            other => anyhow::bail!("unknown travel-time backend '{}' (expected google or mock)", other),
        }
    }
}

/// Provider selection plus backend-specific settings
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub backend: TravelTimeBackend,
    pub google: GoogleConfig,
}

/// Create travel-time provider based on configuration
pub fn create_travel_time_provider(config: &ProviderConfig) -> anyhow::Result<Arc<dyn TravelTimeProvider>> {
    match config.backend {
        TravelTimeBackend::Google => {
            if config.google.api_key.is_none() {
                tracing::warn!(
                    "GOOGLE_MAPS_API_KEY is not set. Optimization requests will fail until it is configured."
                );
            }
            Ok(Arc::new(GoogleDistanceMatrixClient::new(config.google.clone())?))
        }
        TravelTimeBackend::Mock => {
            tracing::info!("Using offline travel-time estimates (TRAVEL_TIME_BACKEND=mock)");
            Ok(Arc::new(MockTravelTimeProvider::new()))
        }
    }
}
