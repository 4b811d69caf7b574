//! Management transition dashboard.
//!
//! A six-week transition checklist kept in a document store, plus job,
//! action-item, team and training record views, served as a single-page
//! dashboard over axum.

pub mod config;
pub mod dashboard;
pub mod errors;
pub mod plan;
pub mod store;
pub mod ui;
pub mod util;
pub mod views;
