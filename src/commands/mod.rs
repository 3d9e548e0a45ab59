//! CLI command implementations for smartprom-exporter.
//!
//! This module provides implementations for all CLI subcommands:
//! - `check`: smartctl, privilege and discovery validation
//! - `config`: Configuration file generation
//! - `test`: One-shot sweeps with printed results

pub mod check;
pub mod config;

// Re-export command functions
pub use check::command_check;
pub use config::command_config;
pub use test::command_test;
