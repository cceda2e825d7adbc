//! Customer types for service reminders

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Customer record as supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    /// ISO date (`YYYY-MM-DD`); `None` if never serviced
    #[serde(default)]
    pub last_service_date: Option<NaiveDate>,
}

/// Request to filter customers due for service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DueRemindersRequest {
    #[serde(default)]
    pub customers: Vec<Customer>,
    /// Reference date; today (UTC) when omitted
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}

/// Customer due for service with the date it became due
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueCustomer {
    #[serde(flatten)]
    pub customer: Customer,
    /// `None` for customers never serviced
    pub due_since: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueRemindersResponse {
    pub as_of: NaiveDate,
    pub due: Vec<DueCustomer>,
    pub total_due: usize,
}
