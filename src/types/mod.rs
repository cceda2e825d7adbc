//! Type definitions

pub mod customer;
pub mod messages;
pub mod optimize;

pub use customer::*;
pub use messages::*;
pub use optimize::*;
