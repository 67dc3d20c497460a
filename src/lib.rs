//! `ipc-forecast` library crate.
//!
//! The binary (`ipc`) is a thin wrapper around this library so that:
//!
//! - both flows are testable without spawning processes or touching the network
//! - the scheduler-facing CLI stays a small layer over plain functions

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
