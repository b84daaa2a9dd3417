use std::marker::PhantomData;

use ark_ff::{BigInteger, PrimeField};

use super::CircuitApi;
use crate::error::{ArithError, ArithResult};

/// Evaluates gates directly over `F`. Assertions that do not hold and values
/// that overflow a requested bit width fail immediately.
#[derive(Clone, Debug, Default)]
pub struct Evaluator<F> {
    num_assertions: usize,
    _field: PhantomData<F>,
}

impl<F: PrimeField> Evaluator<F> {
    pub fn new() -> Self {
        Self {
            num_assertions: 0,
            _field: PhantomData,
        }
    }

    pub fn num_assertions(&self) -> usize {
        self.num_assertions
    }
}

fn boolean<F: PrimeField>(b: bool) -> F {
    if b {
        F::one()
    } else {
        F::zero()
    }
}

impl<F: PrimeField> CircuitApi for Evaluator<F> {
    type Field = F;
    type Wire = F;

    fn public_input(&mut self, value: Option<F>) -> ArithResult<F> {
        Ok(value.unwrap_or_else(F::zero))
    }

    fn secret_input(&mut self, value: Option<F>) -> ArithResult<F> {
        Ok(value.unwrap_or_else(F::zero))
    }

    fn add(&mut self, a: &F, b: &F, rest: &[&F]) -> ArithResult<F> {
        Ok(rest.iter().fold(*a + b, |acc, x| acc + *x))
    }

    fn mul(&mut self, a: &F, b: &F) -> ArithResult<F> {
        Ok(*a * b)
    }

    fn mul_constant(&mut self, c: F, a: &F) -> ArithResult<F> {
        Ok(c * a)
    }

    fn assert_equal(&mut self, a: &F, b: &F) -> ArithResult<()> {
        self.num_assertions += 1;
        if a != b {
            return Err(ArithError::Unsatisfied(format!("{a} != {b}")));
        }
        Ok(())
    }

    fn assert_mul(&mut self, a: &F, b: &F, c: &F) -> ArithResult<()> {
        self.num_assertions += 1;
        if *a * b != *c {
            return Err(ArithError::Unsatisfied(format!("{a} * {b} != {c}")));
        }
        Ok(())
    }

    fn is_zero(&mut self, a: &F) -> ArithResult<F> {
        Ok(boolean(a.is_zero()))
    }

    fn and(&mut self, a: &F, b: &F) -> ArithResult<F> {
        Ok(*a * b)
    }

    fn xor(&mut self, a: &F, b: &F) -> ArithResult<F> {
        let ab = *a * b;
        Ok(*a + b - ab.double())
    }

    fn not(&mut self, a: &F) -> ArithResult<F> {
        Ok(F::one() - a)
    }

    fn to_binary(&mut self, a: &F, n: usize) -> ArithResult<Vec<F>> {
        let bits = a.into_bigint();
        if bits.num_bits() as usize > n {
            return Err(ArithError::Unsatisfied(format!(
                "{a} does not fit in {n} bits"
            )));
        }
        Ok((0..n)
            .map(|i| boolean(i < F::MODULUS_BIT_SIZE as usize && bits.get_bit(i)))
            .collect())
    }

    fn from_binary(&mut self, bits: &[&F]) -> ArithResult<F> {
        let mut coeff = F::one();
        let mut acc = F::zero();
        for bit in bits {
            acc += coeff * *bit;
            coeff.double_in_place();
        }
        Ok(acc)
    }

    fn value(&self, wire: &F) -> Option<F> {
        Some(*wire)
    }
}
