//! Arith circuits as arkworks constraint synthesizers, and the compiled
//! circuit file that later commands load instead of re-parsing text.
//!
//! ## Compiled circuit layout
//!
//! ```text
//! <output_end>\n                 decimal, kept readable for tooling
//! bincode(CircuitHeader)
//! bincode(u64)                   gate count
//! bincode(Gate) * gate count
//! ```

use std::io::{BufRead, Write};

use ark_ff::PrimeField;
use ark_relations::r1cs::{
    ConstraintSynthesizer, ConstraintSystem, ConstraintSystemRef, SynthesisError, SynthesisMode,
};

use crate::assignment::Assignment;
use crate::backend::{LogOutputs, R1csApi};
use crate::error::{ArithError, ArithResult};
use crate::gate::Gate;
use crate::header::{parse_header, CircuitHeader};
use crate::interpreter::synthesize;
use crate::reader::{ArithReader, Record};

/// An arith file whose header has been read; the gates are still unread.
pub struct ArithSource<R> {
    header: CircuitHeader,
    reader: ArithReader<R>,
    pending: Option<Record>,
}

impl<R: BufRead> ArithSource<R> {
    pub fn open(reader: R) -> ArithResult<Self> {
        let mut reader = ArithReader::new(reader);
        let (header, pending) = parse_header(&mut reader)?;
        Ok(Self {
            header,
            reader,
            pending,
        })
    }

    pub fn header(&self) -> &CircuitHeader {
        &self.header
    }

    /// Lazily parses the remaining records as gates.
    pub fn gates(self) -> impl Iterator<Item = ArithResult<Gate>> {
        self.pending
            .map(Ok)
            .into_iter()
            .chain(self.reader)
            .map(|record| record.and_then(|r| Gate::parse(&r)))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CircuitStats {
    pub gates: usize,
    pub constraints: usize,
    pub instance_variables: usize,
    pub witness_variables: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompiledCircuit {
    pub header: CircuitHeader,
    pub gates: Vec<Gate>,
}

impl CompiledCircuit {
    /// Parses a whole arith file. Every format error surfaces here, before
    /// any constraint is built.
    #[tracing::instrument(skip_all, name = "CompiledCircuit::from_arith")]
    pub fn from_arith<R: BufRead>(reader: R) -> ArithResult<Self> {
        let source = ArithSource::open(reader)?;
        let header = *source.header();
        let gates = source.gates().collect::<ArithResult<Vec<_>>>()?;
        tracing::info!(
            gates = gates.len(),
            wires = header.total_vars,
            public = header.n_public,
            secret = header.n_secret,
            "parsed arith file"
        );
        Ok(Self { header, gates })
    }

    /// Synthesizes the circuit once in setup mode to validate wiring and
    /// count constraints.
    #[tracing::instrument(skip_all, name = "CompiledCircuit::check")]
    pub fn check<F: PrimeField>(&self) -> ArithResult<CircuitStats> {
        let cs = ConstraintSystem::<F>::new_ref();
        cs.set_mode(SynthesisMode::Setup);
        let mut api = R1csApi::new(cs.clone());
        let interpreter = synthesize(
            &mut api,
            &self.header,
            None,
            self.gates.iter().cloned().map(Ok),
            &mut LogOutputs,
        )?;
        Ok(CircuitStats {
            gates: interpreter.gates_applied(),
            constraints: cs.num_constraints(),
            instance_variables: cs.num_instance_variables(),
            witness_variables: cs.num_witness_variables(),
        })
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> ArithResult<()> {
        writeln!(writer, "{}", self.header.output_end)?;
        bincode::serialize_into(&mut writer, &self.header)?;
        bincode::serialize_into(&mut writer, &(self.gates.len() as u64))?;
        for gate in &self.gates {
            bincode::serialize_into(&mut writer, gate)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn read_from<R: BufRead>(reader: R) -> ArithResult<Self> {
        let stream = GateStream::read_from(reader)?;
        let header = *stream.header();
        let gates = stream.collect::<ArithResult<Vec<_>>>()?;
        Ok(Self { header, gates })
    }
}

/// Streams the gates of a compiled circuit file one at a time.
pub struct GateStream<R> {
    header: CircuitHeader,
    remaining: u64,
    reader: R,
}

impl<R: BufRead> GateStream<R> {
    pub fn read_from(mut reader: R) -> ArithResult<Self> {
        let mut line = String::new();
        reader.read_line(&mut line)?;
        let marker = line.trim();
        let output_end = marker.parse::<usize>().map_err(|_| {
            ArithError::CorruptCircuit(format!("bad output marker line `{marker}`"))
        })?;

        let header: CircuitHeader = bincode::deserialize_from(&mut reader)?;
        if header.output_end != output_end {
            return Err(ArithError::CorruptCircuit(format!(
                "output marker {output_end} disagrees with header {}",
                header.output_end
            )));
        }
        header.validate()?;
        let remaining: u64 = bincode::deserialize_from(&mut reader)?;
        Ok(Self {
            header,
            remaining,
            reader,
        })
    }

    pub fn header(&self) -> &CircuitHeader {
        &self.header
    }
}

impl<R: BufRead> Iterator for GateStream<R> {
    type Item = ArithResult<Gate>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(bincode::deserialize_from(&mut self.reader).map_err(ArithError::from))
    }
}

/// An arith circuit ready for `ark-snark`: key generation runs it without an
/// assignment, proving runs it with one.
pub struct ArithCircuit<F: PrimeField, G> {
    header: CircuitHeader,
    gates: G,
    assignment: Option<Assignment<F>>,
}

impl<F, G> ArithCircuit<F, G>
where
    F: PrimeField,
    G: IntoIterator<Item = ArithResult<Gate>>,
{
    pub fn new(header: CircuitHeader, gates: G) -> Self {
        Self {
            header,
            gates,
            assignment: None,
        }
    }

    pub fn with_assignment(mut self, assignment: Assignment<F>) -> Self {
        self.assignment = Some(assignment);
        self
    }
}

impl<R: BufRead, F: PrimeField> ArithCircuit<F, GateStream<R>> {
    pub fn from_stream(stream: GateStream<R>) -> Self {
        Self::new(*stream.header(), stream)
    }
}

fn into_synthesis_error(err: ArithError) -> SynthesisError {
    match err.root() {
        ArithError::Synthesis(e) => e.clone(),
        _ => {
            tracing::error!("{err}");
            SynthesisError::Unsatisfiable
        }
    }
}

impl<F, G> ConstraintSynthesizer<F> for ArithCircuit<F, G>
where
    F: PrimeField,
    G: IntoIterator<Item = ArithResult<Gate>>,
{
    fn generate_constraints(self, cs: ConstraintSystemRef<F>) -> Result<(), SynthesisError> {
        let mut api = R1csApi::new(cs);
        synthesize(
            &mut api,
            &self.header,
            self.assignment.as_ref(),
            self.gates,
            &mut LogOutputs,
        )
        .map_err(into_synthesis_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::evaluate;
    use ark_bn254::Fr;

    const SCENARIO: &str = "total 4\ninput 2\nnizkinput 0\nadd in 0_1 out 2\nmul in 2_2 out 3\n";

    #[test]
    fn source_hands_pending_record_to_gates() {
        let source = ArithSource::open(SCENARIO.as_bytes()).unwrap();
        assert_eq!(source.header().n_public, 1);
        assert_eq!(source.header().n_secret, 1);
        let gates: Vec<Gate> = source.gates().collect::<ArithResult<_>>().unwrap();
        assert_eq!(gates.len(), 2);
        assert_eq!(gates[0].to_string(), "add in 0_1 out 2");
    }

    #[test]
    fn compiled_file_starts_with_output_marker() {
        let arith = "total 5\ninput 0\nnizkinput 1\noutput 4\n\
                     add in 0_1 out 2\nmul in 2_2 out 3\nmul in 3_0 out 4\n";
        let circuit = CompiledCircuit::from_arith(arith.as_bytes()).unwrap();
        let mut bytes = Vec::new();
        circuit.write_to(&mut bytes).unwrap();
        assert!(bytes.starts_with(b"4\n"));

        let stream = GateStream::read_from(bytes.as_slice()).unwrap();
        assert_eq!(stream.header(), &circuit.header);
        assert_eq!(CompiledCircuit::read_from(bytes.as_slice()).unwrap(), circuit);
    }

    #[test]
    fn corrupt_marker_is_rejected() {
        let circuit = CompiledCircuit::from_arith(SCENARIO.as_bytes()).unwrap();
        let mut bytes = b"7\n".to_vec();
        let mut body = Vec::new();
        circuit.write_to(&mut body).unwrap();
        bytes.extend_from_slice(&body[2..]);
        assert!(matches!(
            GateStream::read_from(bytes.as_slice()),
            Err(ArithError::CorruptCircuit(_))
        ));
    }

    #[test]
    fn unknown_opcode_fails_at_parse_time() {
        let arith = "total 2\ninput 0\nfoo in 0 out 1\n";
        let err = CompiledCircuit::from_arith(arith.as_bytes()).unwrap_err();
        assert!(matches!(err, ArithError::UnknownOpcode(_)));
    }

    #[test]
    fn check_counts_constraints_without_values() {
        let circuit = CompiledCircuit::from_arith(SCENARIO.as_bytes()).unwrap();
        let stats = circuit.check::<Fr>().unwrap();
        assert_eq!(stats.gates, 2);
        // `one` plus the single public input.
        assert_eq!(stats.instance_variables, 2);
        assert_eq!(stats.witness_variables, 2);
        assert_eq!(stats.constraints, 1);
    }

    #[test]
    fn check_reports_wiring_errors() {
        let arith = "total 3\ninput 0\nmul in 0_2 out 1\n";
        let circuit = CompiledCircuit::from_arith(arith.as_bytes()).unwrap();
        let err = circuit.check::<Fr>().unwrap_err();
        assert!(matches!(err.root(), ArithError::UndefinedWire(2)));
    }

    #[test]
    fn huge_total_is_not_allocated_up_front() {
        let arith = "total 1000000000000000\ninput 0\nadd in 0_0 out 1\n";
        let circuit = CompiledCircuit::from_arith(arith.as_bytes()).unwrap();
        let stats = circuit.check::<Fr>().unwrap();
        assert_eq!(stats.gates, 1);

        let arith = "total 1000000000000000\ninput 0\nadd in 0_0 out 999999999999999\n";
        let circuit = CompiledCircuit::from_arith(arith.as_bytes()).unwrap();
        let err = circuit.check::<Fr>().unwrap_err();
        assert!(matches!(err.root(), ArithError::TableTooLarge { index: 999999999999999 }));

        let arith = "total 1000000000000000\ninput 0\nadd in 0_0 out 1000000000000000\n";
        let circuit = CompiledCircuit::from_arith(arith.as_bytes()).unwrap();
        let err = circuit.check::<Fr>().unwrap_err();
        assert!(matches!(err.root(), ArithError::WireOutOfRange { .. }));
    }

    #[test]
    fn square_of_sum_from_text() {
        let circuit = CompiledCircuit::from_arith(SCENARIO.as_bytes()).unwrap();
        let h = circuit.header;
        let assignment = Assignment::<Fr>::load("0 1\n1 2\n".as_bytes(), h.n_public, h.n_secret)
            .unwrap();

        let wires = evaluate(
            &circuit.header,
            &assignment,
            circuit.gates.iter().cloned().map(Ok),
        )
        .unwrap();
        assert_eq!(wires[3], Some(Fr::from(9u64)));

        let synthesizer = ArithCircuit::new(circuit.header, circuit.gates.into_iter().map(Ok))
            .with_assignment(assignment);

        let cs = ConstraintSystem::<Fr>::new_ref();
        synthesizer.generate_constraints(cs.clone()).unwrap();
        assert!(cs.is_satisfied().unwrap());
    }
}
