//! Command drivers for the `arith-prover` binary.

pub mod commands;
pub mod config;
