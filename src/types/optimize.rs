//! Optimization request and response payloads

use serde::{Deserialize, Serialize};

/// Multi-technician optimization request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptimizeRequest {
    #[serde(default)]
    pub technicians: Vec<TechnicianInput>,
    #[serde(default)]
    pub jobs: Vec<JobInput>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TechnicianInput {
    #[serde(default)]
    pub name: Option<String>,
    /// Free-form address of the technician's home depot
    #[serde(default)]
    pub start_location: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizeResponse {
    /// One entry per technician, in request order
    pub assignments: Vec<TechnicianAssignment>,
    pub total_drive_time_minutes: u64,
    pub total_jobs: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnicianAssignment {
    pub technician: String,
    pub start_location: String,
    /// Visit order; empty for an idle technician
    pub stops: Vec<AssignedStop>,
    /// Round trip from and back to `start_location`
    pub drive_time_minutes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignedStop {
    pub job_name: String,
    pub location: String,
}

/// Single-technician route request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteRequest {
    #[serde(default)]
    pub start_location: Option<String>,
    #[serde(default)]
    pub job_locations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteResponse {
    /// Start location followed by job addresses in visit order
    pub optimized_route: Vec<String>,
    pub total_drive_time_minutes: u64,
    pub stop_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_accepts_missing_names() {
        let json = r#"{
            "technicians": [{"start_location": "1 Main St"}],
            "jobs": [{"name": "Furnace", "location": "2 Oak Ave"}, {"location": "3 Elm Rd"}]
        }"#;

        let request: OptimizeRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.technicians.len(), 1);
        assert!(request.technicians[0].name.is_none());
        assert_eq!(request.jobs[0].name.as_deref(), Some("Furnace"));
        assert!(request.jobs[1].name.is_none());
    }

    #[test]
    fn test_response_uses_snake_case() {
        let response = RouteResponse {
            optimized_route: vec!["A".to_string(), "B".to_string()],
            total_drive_time_minutes: 12,
            stop_count: 1,
        };

        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["optimized_route"][1], "B");
        assert_eq!(value["total_drive_time_minutes"], 12);
        assert_eq!(value["stop_count"], 1);
    }
}
