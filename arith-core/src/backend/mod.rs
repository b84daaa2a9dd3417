//! The primitive operations the gate interpreter needs from a constraint backend.
//!
//! Two backends are provided:
//! - [`R1csApi`] emits R1CS constraints through `ark-r1cs-std` gadgets and is
//!   what key generation and proving run against.
//! - [`Evaluator`] computes wire values directly in the field, which makes it
//!   a witness checker and lets the interpreter be tested without a
//!   constraint system.
//!
//! Bit order is least-significant first for both [`CircuitApi::to_binary`]
//! and [`CircuitApi::from_binary`].

use ark_ff::PrimeField;

use crate::error::ArithResult;

pub mod eval;
pub mod r1cs;

pub use eval::Evaluator;
pub use r1cs::R1csApi;

pub trait CircuitApi {
    type Field: PrimeField;
    type Wire: Clone;

    /// Allocates the next public input. `None` when no assignment is known
    /// (e.g. during key generation).
    fn public_input(&mut self, value: Option<Self::Field>) -> ArithResult<Self::Wire>;

    fn secret_input(&mut self, value: Option<Self::Field>) -> ArithResult<Self::Wire>;

    fn add(
        &mut self,
        a: &Self::Wire,
        b: &Self::Wire,
        rest: &[&Self::Wire],
    ) -> ArithResult<Self::Wire>;

    fn mul(&mut self, a: &Self::Wire, b: &Self::Wire) -> ArithResult<Self::Wire>;

    fn mul_constant(&mut self, c: Self::Field, a: &Self::Wire) -> ArithResult<Self::Wire>;

    fn assert_equal(&mut self, a: &Self::Wire, b: &Self::Wire) -> ArithResult<()>;

    /// Enforces `a * b == c`.
    fn assert_mul(&mut self, a: &Self::Wire, b: &Self::Wire, c: &Self::Wire) -> ArithResult<()> {
        let product = self.mul(a, b)?;
        self.assert_equal(&product, c)
    }

    /// Boolean wire that is 1 iff `a` is 0.
    fn is_zero(&mut self, a: &Self::Wire) -> ArithResult<Self::Wire>;

    fn and(&mut self, a: &Self::Wire, b: &Self::Wire) -> ArithResult<Self::Wire>;

    fn xor(&mut self, a: &Self::Wire, b: &Self::Wire) -> ArithResult<Self::Wire>;

    fn not(&mut self, a: &Self::Wire) -> ArithResult<Self::Wire>;

    /// Decomposes `a` into exactly `n` boolean wires, least-significant first,
    /// constraining `a` to fit in `n` bits.
    fn to_binary(&mut self, a: &Self::Wire, n: usize) -> ArithResult<Vec<Self::Wire>>;

    /// Inverse of [`CircuitApi::to_binary`]: `sum bits[i] * 2^i`.
    fn from_binary(&mut self, bits: &[&Self::Wire]) -> ArithResult<Self::Wire>;

    /// Concrete value of a wire, if the backend has one.
    fn value(&self, wire: &Self::Wire) -> Option<Self::Field>;
}

/// Side channel for the circuit outputs reported after the last gate.
pub trait OutputSink<F> {
    fn record(&mut self, index: usize, value: Option<F>);
}

/// Reports outputs through `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogOutputs;

impl<F: PrimeField> OutputSink<F> for LogOutputs {
    fn record(&mut self, index: usize, value: Option<F>) {
        match value {
            Some(value) => tracing::info!("Output {index} = {value}"),
            None => tracing::debug!("Output {index} has no assignment"),
        }
    }
}

/// Keeps outputs in the order they were reported.
#[derive(Clone, Debug, Default)]
pub struct CollectOutputs<F>(pub Vec<(usize, Option<F>)>);

impl<F> OutputSink<F> for CollectOutputs<F> {
    fn record(&mut self, index: usize, value: Option<F>) {
        self.0.push((index, value));
    }
}
