//! Loaders for `<index> <hex>` assignment files.
//!
//! The proving loader places each value by its index and tolerates gaps;
//! the verification loader ignores the index and appends values in file
//! order. Both stop quietly at the first record that is not `<uint> <token>`.

use std::io::BufRead;

use ark_ff::PrimeField;
use num::BigUint;

use crate::error::{ArithError, ArithResult};
use crate::reader::{ArithReader, Record};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assignment<F> {
    pub public: Vec<F>,
    pub secret: Vec<F>,
}

fn split_record(record: &Record) -> Option<(usize, &str)> {
    let mut fields = record.fields();
    let index = fields.next()?.parse::<usize>().ok()?;
    let hex = fields.next()?;
    fields.next().is_none().then_some((index, hex))
}

fn parse_value<F: PrimeField>(hex: &str) -> ArithResult<F> {
    BigUint::parse_bytes(hex.as_bytes(), 16)
        .map(F::from)
        .ok_or_else(|| ArithError::InvalidConstant(hex.to_owned()))
}

/// Yields `(index, value)` until the first record that does not parse.
fn entries<R: BufRead, F: PrimeField>(
    reader: R,
) -> impl Iterator<Item = ArithResult<(usize, F)>> {
    ArithReader::new(reader)
        .map_while(|record| match record {
            Ok(record) => split_record(&record)
                .map(|(index, hex)| parse_value(hex).map(|value| (index, value))),
            Err(e) => Some(Err(e)),
        })
}

impl<F: PrimeField> Assignment<F> {
    pub fn zeroed(n_public: usize, n_secret: usize) -> Self {
        Self {
            public: vec![F::zero(); n_public],
            secret: vec![F::zero(); n_secret],
        }
    }

    /// Index-addressed load: `[0, n_public)` go to the public slots,
    /// `[n_public, n_public + n_secret)` to the secret slots, anything else is
    /// dropped. Missing indices stay zero.
    #[tracing::instrument(skip_all, name = "Assignment::load")]
    pub fn load<R: BufRead>(reader: R, n_public: usize, n_secret: usize) -> ArithResult<Self> {
        let mut assignment = Self::zeroed(n_public, n_secret);
        let mut ignored = 0usize;
        for entry in entries::<R, F>(reader) {
            let (index, value) = entry?;
            if index < n_public {
                assignment.public[index] = value;
            } else if index < n_public + n_secret {
                assignment.secret[index - n_public] = value;
            } else {
                ignored += 1;
            }
        }
        if ignored > 0 {
            tracing::warn!(ignored, "assignment entries outside the input range");
        }
        Ok(assignment)
    }

    pub fn public_value(&self, index: usize) -> F {
        self.public.get(index).copied().unwrap_or_else(F::zero)
    }

    pub fn secret_value(&self, index: usize) -> F {
        self.secret.get(index).copied().unwrap_or_else(F::zero)
    }
}

/// Positional load for verification: values in file order, indices ignored.
#[tracing::instrument(skip_all)]
pub fn load_public_inputs<R: BufRead, F: PrimeField>(reader: R) -> ArithResult<Vec<F>> {
    entries::<R, F>(reader)
        .map(|entry| entry.map(|(_, value)| value))
        .collect()
}
