use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use arith_core::backend::{CollectOutputs, Evaluator};
use arith_core::{
    load_public_inputs, synthesize, ArithCircuit, Assignment, CompiledCircuit, GateStream,
    Groth16Bn254, ProofSystem,
};
use ark_bn254::Fr;
use eyre::{Result, WrapErr};
use tracing::info;

use crate::config::ProverConfig;

fn open(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).wrap_err_with(|| format!("opening {}", path.display()))?;
    Ok(BufReader::new(file))
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).wrap_err_with(|| format!("creating {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn gate_stream(path: &Path) -> Result<GateStream<BufReader<File>>> {
    GateStream::read_from(open(path)?)
        .wrap_err_with(|| format!("reading circuit {}", path.display()))
}

/// Parses an arith file, checks that it synthesizes and writes the compiled circuit.
#[tracing::instrument(skip_all, name = "compile")]
pub fn compile(arith: &Path, circuit_out: &Path) -> Result<()> {
    info!("Loading circuit {}", arith.display());
    let circuit = CompiledCircuit::from_arith(open(arith)?)
        .wrap_err_with(|| format!("parsing {}", arith.display()))?;

    info!("Compiling circuit");
    let stats = circuit.check::<Fr>().wrap_err("synthesizing circuit")?;
    info!(
        gates = stats.gates,
        constraints = stats.constraints,
        instance = stats.instance_variables,
        witness = stats.witness_variables,
        "Compiled circuit"
    );

    let mut writer = create(circuit_out)?;
    circuit.write_to(&mut writer)?;
    writer.flush()?;
    Ok(())
}

#[tracing::instrument(skip_all, name = "keygen")]
pub fn keygen(
    config: &ProverConfig,
    circuit_in: &Path,
    pk_out: &Path,
    vk_out: &Path,
) -> Result<()> {
    info!("Loading circuit {}", circuit_in.display());
    let compiled = CompiledCircuit::read_from(open(circuit_in)?)
        .wrap_err_with(|| format!("reading circuit {}", circuit_in.display()))?;
    compiled.check::<Fr>().wrap_err("synthesizing circuit")?;

    info!("Running setup");
    let circuit =
        ArithCircuit::<Fr, _>::new(compiled.header, compiled.gates.into_iter().map(Ok));
    let (pk, vk) = Groth16Bn254::setup(circuit, &mut config.rng())?;

    info!("Writing proving key {}", pk_out.display());
    let mut writer = create(pk_out)?;
    Groth16Bn254::write_proving_key(&pk, &mut writer)?;
    writer.flush()?;

    info!("Writing verifying key {}", vk_out.display());
    let mut writer = create(vk_out)?;
    Groth16Bn254::write_verifying_key(&vk, &mut writer)?;
    writer.flush()?;
    Ok(())
}

#[tracing::instrument(skip_all, name = "prove")]
pub fn prove(
    config: &ProverConfig,
    circuit_in: &Path,
    pk_in: &Path,
    assignment_in: &Path,
    proof_out: &Path,
) -> Result<()> {
    let header = *gate_stream(circuit_in)?.header();

    info!("Loading assignment {}", assignment_in.display());
    let reader = open(assignment_in)?;
    let assignment = Assignment::<Fr>::load(reader, header.n_public, header.n_secret)
        .wrap_err_with(|| format!("reading assignment {}", assignment_in.display()))?;

    // Groth16 proving does not build constraint matrices, so an unsatisfying
    // assignment is caught natively first.
    info!("Checking assignment");
    let mut evaluator = Evaluator::<Fr>::new();
    synthesize(
        &mut evaluator,
        &header,
        Some(&assignment),
        gate_stream(circuit_in)?,
        &mut CollectOutputs::default(),
    )
    .wrap_err("assignment does not satisfy the circuit")?;

    info!("Loading proving key {}", pk_in.display());
    let pk_file = File::open(pk_in).wrap_err_with(|| format!("opening {}", pk_in.display()))?;
    let pk_reader = BufReader::with_capacity(config.key_buffer_capacity, pk_file);
    let pk = Groth16Bn254::read_proving_key(pk_reader)
        .wrap_err_with(|| format!("reading proving key {}", pk_in.display()))?;

    info!("Proving");
    let circuit = ArithCircuit::from_stream(gate_stream(circuit_in)?).with_assignment(assignment);
    let proof = Groth16Bn254::prove(&pk, circuit, &mut config.rng())?;

    info!("Writing proof {}", proof_out.display());
    let mut writer = create(proof_out)?;
    Groth16Bn254::write_proof(&proof, &mut writer)?;
    writer.flush()?;
    Ok(())
}

#[tracing::instrument(skip_all, name = "verify")]
pub fn verify(proof_in: &Path, vk_in: &Path, public_in: &Path) -> Result<()> {
    info!("Loading verifying key {}", vk_in.display());
    let vk = Groth16Bn254::read_verifying_key(open(vk_in)?)
        .wrap_err_with(|| format!("reading verifying key {}", vk_in.display()))?;

    let proof = Groth16Bn254::read_proof(open(proof_in)?)?;

    info!("Loading public assignment {}", public_in.display());
    let public = load_public_inputs::<_, Fr>(open(public_in)?)
        .wrap_err_with(|| format!("reading public assignment {}", public_in.display()))?;

    Groth16Bn254::verify(&vk, &public, &proof)?;
    info!("Proof verified");
    Ok(())
}
