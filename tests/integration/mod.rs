//! Integration test suite for ADFX
//!
//! End-to-end tests that analyze complete exported templates through the
//! library API and through the `adfx` binary.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **end_to_end**: full analyses of realistic factory templates
//! - **cli**: `inspect` and `dump` commands, exit codes and error output
//! - **config**: configuration lookup through `--config` and `ADFX_CONFIG`

mod cli;
mod config;
mod end_to_end;
