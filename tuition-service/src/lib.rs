//! Tuition billing ledger service.
//!
//! Guarantees exactly one billing record per student per calendar month,
//! computes prorated first-month charges from weekly group schedules, and
//! exposes month-scoped queries and aggregate statistics.

pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;
