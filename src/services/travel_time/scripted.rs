//! In-memory provider for tests: fixed tables, injected failures, call log

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{ProviderError, TravelTime, TravelTimeProvider};

/// Answers from a lookup table keyed by (origin, destination)
pub struct ScriptedProvider {
    times: HashMap<(String, String), u64>,
    failures: HashMap<(String, String), String>,
    outage: Option<ProviderError>,
    block_size: usize,
    calls: AtomicUsize,
    blocks: Mutex<Vec<(usize, usize)>>,
}

impl ScriptedProvider {
    /// Table from a square matrix over `addresses`.
    pub fn from_matrix(addresses: &[&str], matrix: &[Vec<u64>]) -> Self {
        let mut times = HashMap::new();
        for (i, from) in addresses.iter().enumerate() {
            for (j, to) in addresses.iter().enumerate() {
                times.insert((from.to_string(), to.to_string()), matrix[i][j]);
            }
        }
        Self {
            times,
            failures: HashMap::new(),
            outage: None,
            block_size: 10,
            calls: AtomicUsize::new(0),
            blocks: Mutex::new(Vec::new()),
        }
    }

    /// Unknown pairs fall back to `|len(a) - len(b)| * 60 + 60` seconds.
    pub fn synthetic() -> Self {
        Self::from_matrix(&[], &[])
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_failure(mut self, from: &str, to: &str, status: &str) -> Self {
        self.failures
            .insert((from.to_string(), to.to_string()), status.to_string());
        self
    }

    pub fn with_outage(mut self, error: ProviderError) -> Self {
        self.outage = Some(error);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// (origins, destinations) sizes of every call, in call order
    pub fn blocks(&self) -> Vec<(usize, usize)> {
        self.blocks.lock().map(|b| b.clone()).unwrap_or_default()
    }

    fn lookup(&self, from: &str, to: &str) -> TravelTime {
        let key = (from.to_string(), to.to_string());
        if let Some(status) = self.failures.get(&key) {
            return TravelTime::Unresolved(status.clone());
        }
        match self.times.get(&key) {
            Some(seconds) => TravelTime::Seconds(*seconds),
            None if from == to => TravelTime::Seconds(0),
            None => TravelTime::Seconds((from.len().abs_diff(to.len()) as u64) * 60 + 60),
        }
    }
}

#[async_trait]
impl TravelTimeProvider for ScriptedProvider {
    async fn travel_times(
        &self,
        origins: &[String],
        destinations: &[String],
    ) -> Result<Vec<Vec<TravelTime>>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut blocks) = self.blocks.lock() {
            blocks.push((origins.len(), destinations.len()));
        }
        if let Some(error) = &self.outage {
            return Err(error.clone());
        }

        Ok(origins
            .iter()
            .map(|from| destinations.iter().map(|to| self.lookup(from, to)).collect())
            .collect())
    }

    fn max_block_size(&self) -> usize {
        self.block_size
    }

    fn name(&self) -> &str {
        "Scripted"
    }
}
