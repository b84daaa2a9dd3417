#![allow(clippy::len_without_is_empty)]
#![allow(clippy::new_without_default)]

//! Loads xjsnark arith circuits into arkworks constraint systems.
//!
//! The pipeline is: [`header`] sizes the wire table, [`interpreter`] applies
//! every gate against a [`backend::CircuitApi`], [`assignment`] produces the
//! input values, and [`snark`] runs key generation, proving and verification
//! over the resulting [`circuit::ArithCircuit`].

pub mod assignment;
pub mod backend;
pub mod circuit;
pub mod error;
pub mod gate;
pub mod header;
pub mod interpreter;
pub mod reader;
pub mod snark;

pub use assignment::{load_public_inputs, Assignment};
pub use circuit::{ArithCircuit, ArithSource, CircuitStats, CompiledCircuit, GateStream};
pub use error::{ArithError, ArithResult};
pub use gate::{Gate, Opcode};
pub use header::CircuitHeader;
pub use interpreter::{evaluate, synthesize, Interpreter, WireTable};
pub use snark::{Groth16, Groth16Bn254, ProofSystem, ProverError};
