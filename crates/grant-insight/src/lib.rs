//! Diagnosis-driven grant matching for the Grant Insight subsidy discovery site.

pub mod config;
pub mod diagnosis;
pub mod error;
pub mod grants;
pub mod telemetry;
