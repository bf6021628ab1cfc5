//! Verification harness and extension inventory for an external
//! media-classification engine.
//!
//! - [`harness`] materializes fixtures, runs the engine, and diffs its output.
//! - [`inventory`] tallies extensions under a directory tree.

pub mod cli;
pub mod compare;
pub mod config;
pub mod engine;
pub mod fixture;
pub mod harness;
pub mod inventory;
pub mod logging;
pub mod target;
