//! Key generation, proving and verification behind one capability trait.
//!
//! The interpreter never sees this module; it only produces a
//! [`ConstraintSynthesizer`](ark_relations::r1cs::ConstraintSynthesizer). A
//! [`ProofSystem`] turns that synthesizer into keys and proofs and owns the
//! on-disk encoding of those artifacts.

use std::io::{Read, Write};
use std::marker::PhantomData;

use ark_ec::pairing::Pairing;
use ark_ff::PrimeField;
use ark_groth16::{Proof, ProvingKey, VerifyingKey};
use ark_relations::r1cs::{ConstraintSynthesizer, SynthesisError};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize, SerializationError};
use ark_snark::SNARK;
use ark_std::rand::{CryptoRng, RngCore};
use thiserror::Error;

use crate::error::ArithError;

#[derive(Error, Debug)]
pub enum ProverError {
    #[error(transparent)]
    Arith(#[from] ArithError),
    #[error("Constraint synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),
    #[error("Key or proof encoding: {0}")]
    Serialization(#[from] SerializationError),
    #[error("Verifying key expects {expected} public inputs but {got} were given")]
    PublicInputCount { expected: usize, got: usize },
    #[error("Proof rejected: {0}")]
    Rejected(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ProverError {
    /// True for the expected negative outcome of verification, as opposed
    /// to malformed input or an I/O failure.
    pub fn is_rejection(&self) -> bool {
        matches!(self, ProverError::Rejected(_))
    }
}

pub trait ProofSystem<F: PrimeField> {
    type ProvingKey;
    type VerifyingKey;
    type Proof;

    fn setup<C, R>(
        circuit: C,
        rng: &mut R,
    ) -> Result<(Self::ProvingKey, Self::VerifyingKey), ProverError>
    where
        C: ConstraintSynthesizer<F>,
        R: RngCore + CryptoRng;

    fn prove<C, R>(
        pk: &Self::ProvingKey,
        circuit: C,
        rng: &mut R,
    ) -> Result<Self::Proof, ProverError>
    where
        C: ConstraintSynthesizer<F>,
        R: RngCore + CryptoRng;

    /// `Ok(())` iff the proof is valid for `public_inputs`; an invalid proof
    /// is [`ProverError::Rejected`].
    fn verify(
        vk: &Self::VerifyingKey,
        public_inputs: &[F],
        proof: &Self::Proof,
    ) -> Result<(), ProverError>;

    fn write_proving_key<W: Write>(pk: &Self::ProvingKey, writer: W) -> Result<(), ProverError>;
    fn read_proving_key<R: Read>(reader: R) -> Result<Self::ProvingKey, ProverError>;
    fn write_verifying_key<W: Write>(vk: &Self::VerifyingKey, writer: W) -> Result<(), ProverError>;
    fn read_verifying_key<R: Read>(reader: R) -> Result<Self::VerifyingKey, ProverError>;
    fn write_proof<W: Write>(proof: &Self::Proof, writer: W) -> Result<(), ProverError>;
    fn read_proof<R: Read>(reader: R) -> Result<Self::Proof, ProverError>;
}

/// Groth16 over the pairing `E` via `ark-groth16`.
///
/// Proving keys are stored uncompressed and loaded without subgroup checks:
/// they are large, produced locally by `keygen`, and checking them would
/// dominate proving time. Verifying keys and proofs are compressed and fully
/// validated on load.
pub struct Groth16<E: Pairing>(PhantomData<E>);

type Backend<E> = ark_groth16::Groth16<E>;

impl<E: Pairing> ProofSystem<E::ScalarField> for Groth16<E> {
    type ProvingKey = ProvingKey<E>;
    type VerifyingKey = VerifyingKey<E>;
    type Proof = Proof<E>;

    #[tracing::instrument(skip_all, name = "Groth16::setup")]
    fn setup<C, R>(
        circuit: C,
        rng: &mut R,
    ) -> Result<(ProvingKey<E>, VerifyingKey<E>), ProverError>
    where
        C: ConstraintSynthesizer<E::ScalarField>,
        R: RngCore + CryptoRng,
    {
        Ok(Backend::<E>::circuit_specific_setup(circuit, rng)?)
    }

    #[tracing::instrument(skip_all, name = "Groth16::prove")]
    fn prove<C, R>(pk: &ProvingKey<E>, circuit: C, rng: &mut R) -> Result<Proof<E>, ProverError>
    where
        C: ConstraintSynthesizer<E::ScalarField>,
        R: RngCore + CryptoRng,
    {
        Ok(Backend::<E>::prove(pk, circuit, rng)?)
    }

    #[tracing::instrument(skip_all, name = "Groth16::verify")]
    fn verify(
        vk: &VerifyingKey<E>,
        public_inputs: &[E::ScalarField],
        proof: &Proof<E>,
    ) -> Result<(), ProverError> {
        let expected = vk.gamma_abc_g1.len().saturating_sub(1);
        if expected != public_inputs.len() {
            return Err(ProverError::PublicInputCount {
                expected,
                got: public_inputs.len(),
            });
        }
        if Backend::<E>::verify(vk, public_inputs, proof)? {
            Ok(())
        } else {
            Err(ProverError::Rejected("pairing check failed".to_owned()))
        }
    }

    fn write_proving_key<W: Write>(pk: &ProvingKey<E>, writer: W) -> Result<(), ProverError> {
        Ok(pk.serialize_uncompressed(writer)?)
    }

    fn read_proving_key<R: Read>(reader: R) -> Result<ProvingKey<E>, ProverError> {
        Ok(ProvingKey::deserialize_uncompressed_unchecked(reader)?)
    }

    fn write_verifying_key<W: Write>(vk: &VerifyingKey<E>, writer: W) -> Result<(), ProverError> {
        Ok(vk.serialize_compressed(writer)?)
    }

    fn read_verifying_key<R: Read>(reader: R) -> Result<VerifyingKey<E>, ProverError> {
        Ok(VerifyingKey::deserialize_compressed(reader)?)
    }

    fn write_proof<W: Write>(proof: &Proof<E>, writer: W) -> Result<(), ProverError> {
        Ok(proof.serialize_compressed(writer)?)
    }

    /// A proof that does not decode can never verify, so it is a rejection.
    fn read_proof<R: Read>(reader: R) -> Result<Proof<E>, ProverError> {
        Proof::deserialize_compressed(reader)
            .map_err(|e| ProverError::Rejected(format!("malformed proof: {e}")))
    }
}

pub type Groth16Bn254 = Groth16<ark_bn254::Bn254>;
