//! BDD step definitions for sitewatch

pub mod aggregation_steps;
pub mod map_steps;
