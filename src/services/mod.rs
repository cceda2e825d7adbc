//! Business logic services

pub mod geo;
pub mod matrix;
pub mod optimizer;
pub mod reminders;
pub mod solver;
pub mod travel_time;
