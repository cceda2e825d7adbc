//! Travel-time matrix construction
//!
//! The provider only answers small origin × destination blocks, so an N×N
//! matrix is assembled from ⌈N/B⌉² block calls issued with bounded
//! concurrency. Any failed pair aborts the whole build; when several fail, the
//! one reported is the first in row-major order.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use thiserror::Error;
use tracing::{debug, info};

use crate::defaults::{
    DEFAULT_MATRIX_BLOCK_SIZE, DEFAULT_MATRIX_DEADLINE_SECS, DEFAULT_MATRIX_MAX_CONCURRENCY,
};
use crate::services::travel_time::{ProviderError, TravelTime, TravelTimeProvider};

/// Directed travel durations in seconds; `duration(i, j)` is i -> j
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TravelTimeMatrix {
    durations: Vec<Vec<u64>>,
}

impl TravelTimeMatrix {
    /// Create an empty matrix
    pub fn empty() -> Self {
        Self { durations: vec![] }
    }

    /// Wrap pre-computed rows; rows must form a square.
    pub fn from_rows(durations: Vec<Vec<u64>>) -> Result<Self, MatrixError> {
        let size = durations.len();
        if let Some((row, cells)) = durations.iter().enumerate().find(|(_, r)| r.len() != size) {
            return Err(MatrixError::NotSquare {
                row,
                len: cells.len(),
                size,
            });
        }
        Ok(Self { durations })
    }

    /// Number of nodes
    pub fn size(&self) -> usize {
        self.durations.len()
    }

    /// Travel time from node i to node j in seconds
    pub fn duration(&self, from: usize, to: usize) -> u64 {
        self.durations[from][to]
    }

    #[cfg(test)]
    pub fn rows(&self) -> &[Vec<u64>] {
        &self.durations
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MatrixError {
    #[error("Could not get drive time between '{from}' and '{to}'. Status: {reason}")]
    UnresolvableLocation {
        from: String,
        to: String,
        reason: String,
    },
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("travel-time matrix build exceeded its {0:?} deadline")]
    DeadlineExceeded(Duration),
    #[error("matrix is not square: row {row} has {len} entries, expected {size}")]
    NotSquare { row: usize, len: usize, size: usize },
}

/// Block and fan-out limits for one build
#[derive(Debug, Clone)]
pub struct MatrixConfig {
    /// Origins/destinations per provider call (capped by the provider's own limit)
    pub block_size: usize,
    /// Provider calls in flight at once
    pub max_concurrent_requests: usize,
    /// Wall-clock limit for the whole build
    pub deadline: Duration,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_MATRIX_BLOCK_SIZE,
            max_concurrent_requests: DEFAULT_MATRIX_MAX_CONCURRENCY,
            deadline: Duration::from_secs(DEFAULT_MATRIX_DEADLINE_SECS),
        }
    }
}

/// Builds full matrices from a block-limited provider
pub struct MatrixBuilder {
    provider: Arc<dyn TravelTimeProvider>,
    config: MatrixConfig,
}

impl MatrixBuilder {
    pub fn new(provider: Arc<dyn TravelTimeProvider>, config: MatrixConfig) -> Self {
        Self { provider, config }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Effective block edge: configured size capped by the provider limit
    fn block_size(&self) -> usize {
        self.config
            .block_size
            .min(self.provider.max_block_size())
            .max(1)
    }

    /// Build the N×N matrix for `locations`, in their given order.
    pub async fn build(&self, locations: &[String]) -> Result<TravelTimeMatrix, MatrixError> {
        let deadline = self.config.deadline;
        match tokio::time::timeout(deadline, self.build_blocks(locations)).await {
            Ok(result) => result,
            Err(_) => Err(MatrixError::DeadlineExceeded(deadline)),
        }
    }

    async fn build_blocks(&self, locations: &[String]) -> Result<TravelTimeMatrix, MatrixError> {
        let n = locations.len();
        if n == 0 {
            return Ok(TravelTimeMatrix::empty());
        }

        let block = self.block_size();
        let offsets: Vec<(usize, usize)> = (0..n)
            .step_by(block)
            .flat_map(|i| (0..n).step_by(block).map(move |j| (i, j)))
            .collect();

        info!(
            "Building {}x{} travel-time matrix via {} ({} blocks of up to {}x{})",
            n,
            n,
            self.provider.name(),
            offsets.len(),
            block,
            block
        );

        let provider = &self.provider;
        let mut blocks = stream::iter(offsets.into_iter().map(|(row, col)| async move {
            let origins = &locations[row..(row + block).min(n)];
            let destinations = &locations[col..(col + block).min(n)];
            let cells = provider.travel_times(origins, destinations).await?;
            Ok::<_, MatrixError>((row, col, cells))
        }))
        .buffered(self.config.max_concurrent_requests.max(1));

        let mut durations = vec![vec![0u64; n]; n];

        // Blocks run concurrently but are consumed in offset order. Returning
        // early drops the stream, which cancels the blocks still in flight.
        while let Some(result) = blocks.next().await {
            let (row, col, cells) = result?;
            let rows_expected = (row + block).min(n) - row;
            let cols_expected = (col + block).min(n) - col;

            if cells.len() != rows_expected || cells.iter().any(|r| r.len() != cols_expected) {
                return Err(ProviderError::Api(format!(
                    "expected a {}x{} block at ({}, {}), got {} rows",
                    rows_expected,
                    cols_expected,
                    row,
                    col,
                    cells.len()
                ))
                .into());
            }

            for (i_offset, cell_row) in cells.into_iter().enumerate() {
                for (j_offset, cell) in cell_row.into_iter().enumerate() {
                    let (i, j) = (row + i_offset, col + j_offset);
                    match cell {
                        TravelTime::Seconds(seconds) => durations[i][j] = seconds,
                        TravelTime::Unresolved(reason) => {
                            return Err(MatrixError::UnresolvableLocation {
                                from: locations[i].clone(),
                                to: locations[j].clone(),
                                reason,
                            });
                        }
                    }
                }
            }

            debug!("Matrix block ({}, {}) filled", row, col);
        }

        for (i, row) in durations.iter_mut().enumerate() {
            row[i] = 0;
        }

        TravelTimeMatrix::from_rows(durations)
    }
}
