use ark_ff::{BigInteger, PrimeField};
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

use super::CircuitApi;
use crate::error::ArithResult;

/// Emits R1CS constraints for each primitive through `ark-r1cs-std`.
///
/// Boolean results are kept as `FpVar`s holding 0/1 so that they can flow
/// into arithmetic gates (the arith format does not distinguish them).
pub struct R1csApi<F: PrimeField> {
    cs: ConstraintSystemRef<F>,
}

impl<F: PrimeField> R1csApi<F> {
    pub fn new(cs: ConstraintSystemRef<F>) -> Self {
        Self { cs }
    }

    fn assigned(value: Option<F>) -> impl FnOnce() -> Result<F, SynthesisError> {
        move || value.ok_or(SynthesisError::AssignmentMissing)
    }

    /// Allocates `n` bit witnesses of `a` and ties their weighted sum to `a`.
    fn bounded_bits(&self, a: &FpVar<F>, n: usize) -> Result<Vec<FpVar<F>>, SynthesisError> {
        let bits = (0..n)
            .map(|i| {
                Boolean::new_witness(self.cs.clone(), || {
                    a.value().map(|v| v.into_bigint().get_bit(i))
                })
                .map(FpVar::from)
            })
            .collect::<Result<Vec<_>, _>>()?;
        pack(&bits.iter().collect::<Vec<_>>()).enforce_equal(a)?;
        Ok(bits)
    }
}

fn pack<F: PrimeField>(bits: &[&FpVar<F>]) -> FpVar<F> {
    let mut coeff = F::one();
    let mut acc = FpVar::zero();
    for bit in bits {
        acc += *bit * coeff;
        coeff.double_in_place();
    }
    acc
}

impl<F: PrimeField> CircuitApi for R1csApi<F> {
    type Field = F;
    type Wire = FpVar<F>;

    fn public_input(&mut self, value: Option<F>) -> ArithResult<FpVar<F>> {
        Ok(FpVar::new_input(self.cs.clone(), Self::assigned(value))?)
    }

    fn secret_input(&mut self, value: Option<F>) -> ArithResult<FpVar<F>> {
        Ok(FpVar::new_witness(self.cs.clone(), Self::assigned(value))?)
    }

    fn add(
        &mut self,
        a: &FpVar<F>,
        b: &FpVar<F>,
        rest: &[&FpVar<F>],
    ) -> ArithResult<FpVar<F>> {
        Ok(rest.iter().fold(a + b, |acc, x| acc + *x))
    }

    fn mul(&mut self, a: &FpVar<F>, b: &FpVar<F>) -> ArithResult<FpVar<F>> {
        Ok(a * b)
    }

    fn mul_constant(&mut self, c: F, a: &FpVar<F>) -> ArithResult<FpVar<F>> {
        Ok(a * c)
    }

    fn assert_equal(&mut self, a: &FpVar<F>, b: &FpVar<F>) -> ArithResult<()> {
        Ok(a.enforce_equal(b)?)
    }

    fn assert_mul(&mut self, a: &FpVar<F>, b: &FpVar<F>, c: &FpVar<F>) -> ArithResult<()> {
        Ok(a.mul_equals(b, c)?)
    }

    fn is_zero(&mut self, a: &FpVar<F>) -> ArithResult<FpVar<F>> {
        Ok(FpVar::from(a.is_eq(&FpVar::zero())?))
    }

    fn and(&mut self, a: &FpVar<F>, b: &FpVar<F>) -> ArithResult<FpVar<F>> {
        Ok(a * b)
    }

    fn xor(&mut self, a: &FpVar<F>, b: &FpVar<F>) -> ArithResult<FpVar<F>> {
        let ab = a * b;
        Ok(a + b - &ab - &ab)
    }

    fn not(&mut self, a: &FpVar<F>) -> ArithResult<FpVar<F>> {
        Ok(FpVar::one() - a)
    }

    fn to_binary(&mut self, a: &FpVar<F>, n: usize) -> ArithResult<Vec<FpVar<F>>> {
        if n < F::MODULUS_BIT_SIZE as usize {
            return Ok(self.bounded_bits(a, n)?);
        }
        // A weighted sum of this many bits can wrap the modulus, so use the
        // canonical decomposition and pad.
        let mut bits = a.to_bits_le()?;
        bits.resize(n, Boolean::FALSE);
        Ok(bits.into_iter().map(FpVar::from).collect())
    }

    fn from_binary(&mut self, bits: &[&FpVar<F>]) -> ArithResult<FpVar<F>> {
        Ok(pack(bits))
    }

    fn value(&self, wire: &FpVar<F>) -> Option<F> {
        wire.value().ok()
    }
}
