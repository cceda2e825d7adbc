//! Service reminder scheduling
//!
//! A customer is due for maintenance when never serviced, or once
//! `SERVICE_INTERVAL_DAYS` have passed since the last service date.

use chrono::{Duration, NaiveDate};
use tracing::debug;

use crate::defaults::SERVICE_INTERVAL_DAYS;
use crate::types::{Customer, DueCustomer};

/// Date the next service falls due, or `None` if never serviced
pub fn next_service_date(last_service: Option<NaiveDate>) -> Option<NaiveDate> {
    last_service.map(|date| date + Duration::days(SERVICE_INTERVAL_DAYS))
}

pub fn is_due(last_service: Option<NaiveDate>, as_of: NaiveDate) -> bool {
    match next_service_date(last_service) {
        Some(due) => as_of >= due,
        None => true,
    }
}

/// Customers due as of `as_of`, in input order
pub fn due_customers(customers: Vec<Customer>, as_of: NaiveDate) -> Vec<DueCustomer> {
    let total = customers.len();
    let due: Vec<DueCustomer> = customers
        .into_iter()
        .filter(|c| is_due(c.last_service_date, as_of))
        .map(|customer| DueCustomer {
            due_since: next_service_date(customer.last_service_date),
            customer,
        })
        .collect();

    debug!("{} of {} customers due for service as of {}", due.len(), total, as_of);
    due
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn customer(name: &str, last: Option<NaiveDate>) -> Customer {
        Customer {
            name: name.to_string(),
            email: None,
            phone: None,
            address: None,
            last_service_date: last,
        }
    }

    #[test]
    fn test_never_serviced_is_due() {
        assert!(is_due(None, date(2024, 1, 1)));
        assert_eq!(next_service_date(None), None);
    }

    #[test]
    fn test_due_exactly_on_interval() {
        let last = date(2024, 1, 1);
        let due = next_service_date(Some(last)).unwrap();

        assert_eq!(due, date(2024, 12, 1)); // 2024 is a leap year
        assert!(is_due(Some(last), due));
        assert!(!is_due(Some(last), due.pred_opt().unwrap()));
    }

    #[test]
    fn test_due_customers_keeps_order() {
        let as_of = date(2025, 6, 1);
        let customers = vec![
            customer("Recent", Some(date(2025, 3, 1))),
            customer("New", None),
            customer("Overdue", Some(date(2024, 1, 15))),
        ];

        let due = due_customers(customers, as_of);

        let names: Vec<&str> = due.iter().map(|d| d.customer.name.as_str()).collect();
        assert_eq!(names, vec!["New", "Overdue"]);
        assert_eq!(due[0].due_since, None);
        assert_eq!(due[1].due_since, Some(date(2024, 12, 15)));
    }
}
