//! Google Distance Matrix API client
//!
//! API documentation:
//! https://developers.google.com/maps/documentation/distance-matrix/distance-matrix

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{ProviderError, TravelTime, TravelTimeProvider};

/// Google client configuration
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// API key; requests fail with `NotConfigured` while unset
    pub api_key: Option<String>,
    /// Endpoint without the output format suffix
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Origins (and destinations) per request; 10 × 10 keeps us at 100 elements
    pub max_block_size: usize,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://maps.googleapis.com/maps/api/distancematrix".to_string(),
            timeout_seconds: 30,
            max_block_size: 10,
        }
    }
}

impl GoogleConfig {
    #[cfg(test)]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Default::default()
        }
    }
}

/// Google Distance Matrix client
pub struct GoogleDistanceMatrixClient {
    client: Client,
    config: GoogleConfig,
}

impl GoogleDistanceMatrixClient {
    pub fn new(config: GoogleConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, config })
    }

    /// Query parameters for one block (key excluded)
    fn build_query(&self, origins: &[String], destinations: &[String]) -> Vec<(&'static str, String)> {
        vec![
            ("origins", origins.join("|")),
            ("destinations", destinations.join("|")),
            ("mode", "driving".to_string()),
            ("units", "imperial".to_string()),
        ]
    }
}

#[async_trait]
impl TravelTimeProvider for GoogleDistanceMatrixClient {
    async fn travel_times(
        &self,
        origins: &[String],
        destinations: &[String],
    ) -> Result<Vec<Vec<TravelTime>>, ProviderError> {
        let api_key = self.config.api_key.as_deref().ok_or_else(|| {
            ProviderError::NotConfigured("GOOGLE_MAPS_API_KEY environment variable is not set".to_string())
        })?;

        if origins.is_empty() || destinations.is_empty() {
            return Ok(vec![Vec::new(); origins.len()]);
        }

        let url = format!("{}/json", self.config.base_url);
        let mut query = self.build_query(origins, destinations);
        query.push(("key", api_key.to_string()));

        debug!(
            "Requesting distance matrix block from Google: {} origins x {} destinations",
            origins.len(),
            destinations.len()
        );

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(e.without_url().to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            warn!("Google Distance Matrix returned HTTP {}", status);
            return Err(ProviderError::Unavailable(format!("HTTP {}", status)));
        }

        let body: DistanceMatrixResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Api(format!("unreadable response: {}", e.without_url())))?;

        parse_response(body)
    }

    fn max_block_size(&self) -> usize {
        self.config.max_block_size.max(1)
    }

    fn name(&self) -> &str {
        "GoogleDistanceMatrix"
    }
}

/// Convert a decoded response into per-pair outcomes
fn parse_response(body: DistanceMatrixResponse) -> Result<Vec<Vec<TravelTime>>, ProviderError> {
    if body.status != "OK" {
        let detail = body.error_message.unwrap_or_default();
        return Err(ProviderError::Api(if detail.is_empty() {
            body.status
        } else {
            format!("{}: {}", body.status, detail)
        }));
    }

    Ok(body
        .rows
        .into_iter()
        .map(|row| {
            row.elements
                .into_iter()
                .map(|element| match (element.status.as_str(), element.duration) {
                    ("OK", Some(duration)) => TravelTime::Seconds(duration.value),
                    ("OK", None) => TravelTime::Unresolved("MISSING_DURATION".to_string()),
                    _ => TravelTime::Unresolved(element.status),
                })
                .collect()
        })
        .collect())
}

// Distance Matrix API types

#[derive(Debug, Deserialize)]
struct DistanceMatrixResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    rows: Vec<MatrixRow>,
}

#[derive(Debug, Deserialize)]
struct MatrixRow {
    elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
struct MatrixElement {
    status: String,
    #[serde(default)]
    duration: Option<TextValue>,
}

#[derive(Debug, Deserialize)]
struct TextValue {
    /// Seconds for durations
    value: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(json: &str) -> DistanceMatrixResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_google_config_default() {
        let config = GoogleConfig::default();
        assert!(config.api_key.is_none());
        assert_eq!(config.timeout_seconds, 30);
        assert_eq!(config.max_block_size, 10);
    }

    #[test]
    fn test_google_config_with_key() {
        let config = GoogleConfig::new("abc");
        assert_eq!(config.api_key.as_deref(), Some("abc"));
        assert!(config.base_url.starts_with("https://maps.googleapis.com"));
    }

    #[test]
    fn test_build_query_joins_addresses() {
        let client = GoogleDistanceMatrixClient::new(GoogleConfig::default()).unwrap();
        let origins = vec!["1 Main St".to_string(), "2 Elm St".to_string()];
        let destinations = vec!["3 Oak Ave".to_string()];

        let query = client.build_query(&origins, &destinations);

        assert!(query.contains(&("origins", "1 Main St|2 Elm St".to_string())));
        assert!(query.contains(&("destinations", "3 Oak Ave".to_string())));
        assert!(query.contains(&("mode", "driving".to_string())));
        assert!(!query.iter().any(|(k, _)| *k == "key"));
    }

    #[test]
    fn test_parse_response_ok() {
        let body = decode(
            r#"{
                "status": "OK",
                "rows": [
                    {"elements": [
                        {"status": "OK", "duration": {"text": "1 min", "value": 60}, "distance": {"text": "1 mi", "value": 1609}},
                        {"status": "OK", "duration": {"text": "2 mins", "value": 125}}
                    ]}
                ]
            }"#,
        );

        let rows = parse_response(body).unwrap();

        assert_eq!(rows, vec![vec![TravelTime::Seconds(60), TravelTime::Seconds(125)]]);
    }

    #[test]
    fn test_parse_response_element_failure() {
        let body = decode(
            r#"{
                "status": "OK",
                "rows": [{"elements": [{"status": "ZERO_RESULTS"}, {"status": "OK"}]}]
            }"#,
        );

        let rows = parse_response(body).unwrap();

        assert_eq!(rows[0][0], TravelTime::Unresolved("ZERO_RESULTS".to_string()));
        assert_eq!(rows[0][1], TravelTime::Unresolved("MISSING_DURATION".to_string()));
    }

    #[test]
    fn test_parse_response_top_level_error() {
        let body = decode(r#"{"status": "REQUEST_DENIED", "error_message": "The provided API key is invalid.", "rows": []}"#);

        let err = parse_response(body).unwrap_err();

        assert_eq!(
            err,
            ProviderError::Api("REQUEST_DENIED: The provided API key is invalid.".to_string())
        );
    }

    #[tokio::test]
    async fn test_missing_api_key_is_not_configured() {
        let client = GoogleDistanceMatrixClient::new(GoogleConfig::default()).unwrap();
        let list = vec!["1 Main St".to_string()];

        let err = client.travel_times(&list, &list).await.unwrap_err();

        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_unavailable() {
        let config = GoogleConfig {
            api_key: Some("test".to_string()),
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_seconds: 2,
            max_block_size: 10,
        };
        let client = GoogleDistanceMatrixClient::new(config).unwrap();
        let list = vec!["1 Main St".to_string()];

        let err = client.travel_times(&list, &list).await.unwrap_err();

        assert!(matches!(err, ProviderError::Unavailable(_)), "got {:?}", err);
    }

    #[tokio::test]
    #[ignore = "Requires GOOGLE_MAPS_API_KEY and network access"]
    async fn test_google_integration_two_addresses() {
        let key = std::env::var("GOOGLE_MAPS_API_KEY").unwrap();
        let client = GoogleDistanceMatrixClient::new(GoogleConfig::new(key)).unwrap();
        let list = vec![
            "Denver Union Station, Denver, CO".to_string(),
            "Pearl Street Mall, Boulder, CO".to_string(),
        ];

        let rows = client.travel_times(&list, &list).await.unwrap();

        match &rows[0][1] {
            TravelTime::Seconds(s) => assert!(*s > 1200 && *s < 5400, "got {} s", s),
            other => panic!("unexpected cell {:?}", other),
        }
    }
}
