//! CLI command implementations

pub mod batch;
pub mod combine;
pub mod run;
