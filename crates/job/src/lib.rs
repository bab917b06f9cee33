//! `branchcast` batch job: argument parsing and command execution.

pub mod cli;
pub mod commands;
