//! CLI infrastructure for the power-analysis toolkit
//!
//! This module provides the command-line interface for running single power
//! analyses, batches driven by an input file, and grid aggregation of
//! persisted run artifacts.

pub mod commands;
pub mod config;
