//! Request handlers

pub mod accounts;
pub mod health;
pub mod lifecycle;
pub mod schedule;
