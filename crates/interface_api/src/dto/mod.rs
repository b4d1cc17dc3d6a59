//! Request and response bodies

pub mod accounts;
pub mod lifecycle;
pub mod payments;
pub mod schedule;
