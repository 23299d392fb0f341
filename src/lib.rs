//! `claim-risk` library crate.
//!
//! The binary (`claim-risk`) is a thin wrapper around this library so that:
//!
//! - the assessment pipeline is testable without spawning processes
//! - the model handle can be embedded in other front ends
//! - presentation (CLI, TUI) stays separate from alignment and inference

pub mod app;
pub mod classify;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod features;
pub mod models;
pub mod policy;
pub mod report;
pub mod tui;
