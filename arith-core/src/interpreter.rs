//! Materializes an arith gate stream against a [`CircuitApi`] backend.
//!
//! Wires live in a flat table indexed exactly like the arith file:
//! `[0, n_public)` public inputs, `[n_public, n_public + n_secret)` secret
//! inputs, then every internal and output wire. Gates are applied strictly in
//! file order and may only read wires that an earlier gate (or the input
//! seeding) has written.

use ark_ff::PrimeField;

use crate::assignment::Assignment;
use crate::backend::{CircuitApi, OutputSink};
use crate::error::{ArithError, ArithResult};
use crate::gate::{Gate, Opcode};
use crate::header::CircuitHeader;

/// Wire slots addressed by `[0, total)`. Slots are materialized up to the
/// highest index written, so `total` only bounds indices and is never
/// allocated up front.
#[derive(Clone, Debug)]
pub struct WireTable<W> {
    total: usize,
    slots: Vec<Option<W>>,
}

impl<W> WireTable<W> {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            slots: Vec::new(),
        }
    }

    /// One past the highest index written so far.
    pub fn extent(&self) -> usize {
        self.slots.len()
    }

    fn check(&self, index: usize) -> ArithResult<()> {
        if index >= self.total {
            return Err(ArithError::WireOutOfRange {
                index,
                total: self.total,
            });
        }
        Ok(())
    }

    pub fn get(&self, index: usize) -> ArithResult<&W> {
        self.check(index)?;
        self.slots
            .get(index)
            .and_then(Option::as_ref)
            .ok_or(ArithError::UndefinedWire(index))
    }

    pub fn set(&mut self, index: usize, wire: W) -> ArithResult<()> {
        self.check(index)?;
        if index >= self.slots.len() {
            self.slots
                .try_reserve(index + 1 - self.slots.len())
                .map_err(|_| ArithError::TableTooLarge { index })?;
            self.slots.resize_with(index + 1, || None);
        }
        self.slots[index] = Some(wire);
        Ok(())
    }
}

pub struct Interpreter<W> {
    header: CircuitHeader,
    wires: WireTable<W>,
    gates_applied: usize,
}

impl<W: Clone> Interpreter<W> {
    /// Sizes the table and allocates every public then secret input in order.
    pub fn seed<A>(
        api: &mut A,
        header: &CircuitHeader,
        assignment: Option<&Assignment<A::Field>>,
    ) -> ArithResult<Self>
    where
        A: CircuitApi<Wire = W>,
    {
        header.validate()?;
        let mut wires = WireTable::new(header.total_vars);
        for i in 0..header.n_public {
            let value = assignment.map(|a| a.public_value(i));
            wires.set(i, api.public_input(value)?)?;
        }
        for i in 0..header.n_secret {
            let value = assignment.map(|a| a.secret_value(i));
            wires.set(header.n_public + i, api.secret_input(value)?)?;
        }
        Ok(Self {
            header: *header,
            wires,
            gates_applied: 0,
        })
    }

    pub fn wires(&self) -> &WireTable<W> {
        &self.wires
    }

    pub fn gates_applied(&self) -> usize {
        self.gates_applied
    }

    fn operands(&self, indices: &[usize]) -> ArithResult<Vec<&W>> {
        indices.iter().map(|&i| self.wires.get(i)).collect()
    }

    /// Applies one gate. Arity has already been checked by [`Gate::parse`].
    pub fn apply<A>(&mut self, api: &mut A, gate: &Gate) -> ArithResult<()>
    where
        A: CircuitApi<Wire = W>,
    {
        let ins = self.operands(&gate.inputs)?;
        let out = &gate.outputs;

        match &gate.opcode {
            Opcode::Add => {
                let sum = api.add(ins[0], ins[1], &ins[2..])?;
                self.wires.set(out[0], sum)
            }
            Opcode::Mul => {
                let product = api.mul(ins[0], ins[1])?;
                self.wires.set(out[0], product)
            }
            Opcode::ConstMul(c) => {
                let scaled = api.mul_constant(A::Field::from(c.clone()), ins[0])?;
                self.wires.set(out[0], scaled)
            }
            Opcode::ConstMulNeg(c) => {
                let scaled = api.mul_constant(-A::Field::from(c.clone()), ins[0])?;
                self.wires.set(out[0], scaled)
            }
            Opcode::Assert => {
                let expected = self.wires.get(out[0])?;
                api.assert_mul(ins[0], ins[1], expected)
            }
            Opcode::Xor => {
                let a = api.is_zero(ins[0])?;
                let b = api.is_zero(ins[1])?;
                let x = api.xor(&a, &b)?;
                self.wires.set(out[0], x)
            }
            Opcode::Or => {
                let a = api.is_zero(ins[0])?;
                let b = api.is_zero(ins[1])?;
                let neither = api.and(&a, &b)?;
                let either = api.not(&neither)?;
                self.wires.set(out[0], either)
            }
            Opcode::ZeroP => {
                // out[0] is an auxiliary slot of the source format and stays unwritten.
                let z = api.is_zero(ins[0])?;
                let nonzero = api.not(&z)?;
                self.wires.set(out[1], nonzero)
            }
            Opcode::Split if out.len() == 1 => {
                let alias = ins[0].clone();
                self.wires.set(out[0], alias)
            }
            Opcode::Split => {
                let bits = api.to_binary(ins[0], out.len())?;
                for (&index, bit) in out.iter().zip(bits) {
                    self.wires.set(index, bit)?;
                }
                Ok(())
            }
            Opcode::Pack => {
                let packed = api.from_binary(&ins)?;
                self.wires.set(out[0], packed)
            }
        }
    }

    /// Applies every gate of the stream, tagging failures with the gate's
    /// position and opcode.
    #[tracing::instrument(skip_all, name = "Interpreter::run")]
    pub fn run<A, I>(&mut self, api: &mut A, gates: I) -> ArithResult<usize>
    where
        A: CircuitApi<Wire = W>,
        I: IntoIterator<Item = ArithResult<Gate>>,
    {
        for gate in gates {
            let gate = gate?;
            self.apply(api, &gate).map_err(|e| ArithError::AtGate {
                position: self.gates_applied,
                opcode: gate.opcode.to_string(),
                source: Box::new(e),
            })?;
            self.gates_applied += 1;
        }
        tracing::debug!(gates = self.gates_applied, "applied arith gates");
        Ok(self.gates_applied)
    }

    /// Reports `[n_public + n_secret, output_end]` to `sink`. Never adds
    /// constraints; wires no gate wrote are reported without a value.
    pub fn emit_outputs<A, S>(&self, api: &A, sink: &mut S)
    where
        A: CircuitApi<Wire = W>,
        S: OutputSink<A::Field>,
    {
        if let Some(range) = self.header.outputs() {
            for index in range {
                let value = self.wires.get(index).ok().and_then(|w| api.value(w));
                sink.record(index, value);
            }
        }
    }
}

/// Seeds, runs and reports outputs in one call.
pub fn synthesize<A, I, S>(
    api: &mut A,
    header: &CircuitHeader,
    assignment: Option<&Assignment<A::Field>>,
    gates: I,
    sink: &mut S,
) -> ArithResult<Interpreter<A::Wire>>
where
    A: CircuitApi,
    I: IntoIterator<Item = ArithResult<Gate>>,
    S: OutputSink<A::Field>,
{
    let mut interpreter = Interpreter::seed(api, header, assignment)?;
    interpreter.run(api, gates)?;
    interpreter.emit_outputs(api, sink);
    Ok(interpreter)
}

/// Evaluates a circuit natively and returns the wire values up to the highest
/// index written; unwritten wires are `None`.
pub fn evaluate<F, I>(
    header: &CircuitHeader,
    assignment: &Assignment<F>,
    gates: I,
) -> ArithResult<Vec<Option<F>>>
where
    F: PrimeField,
    I: IntoIterator<Item = ArithResult<Gate>>,
{
    let mut api = crate::backend::Evaluator::new();
    let mut sink = crate::backend::LogOutputs;
    let interpreter = synthesize(&mut api, header, Some(assignment), gates, &mut sink)?;
    Ok((0..interpreter.wires().extent())
        .map(|i| interpreter.wires().get(i).ok().copied())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{CollectOutputs, Evaluator, R1csApi};
    use crate::reader::Record;
    use ark_bn254::Fr;
    use ark_relations::r1cs::ConstraintSystem;
    use ark_std::rand::Rng;
    use ark_std::{One, UniformRand, Zero};
    use num::BigUint;

    fn gate(text: &str) -> ArithResult<Gate> {
        Gate::parse(&Record {
            line: 0,
            text: text.to_owned(),
        })
    }

    fn header(total_vars: usize, n_public: usize, n_secret: usize) -> CircuitHeader {
        CircuitHeader {
            total_vars,
            n_public,
            n_secret,
            output_end: 0,
        }
    }

    fn eval(header: &CircuitHeader, inputs: &[Fr], lines: &[&str]) -> ArithResult<Vec<Option<Fr>>> {
        let assignment = Assignment {
            public: inputs[..header.n_public].to_vec(),
            secret: inputs[header.n_public..].to_vec(),
        };
        evaluate(header, &assignment, lines.iter().map(|l| gate(l)))
    }

    #[test]
    fn wire_table_bounds_without_allocating() {
        let mut table = WireTable::<Fr>::new(usize::MAX);
        assert_eq!(table.extent(), 0);
        assert!(matches!(table.get(1 << 40), Err(ArithError::UndefinedWire(_))));

        table.set(3, Fr::one()).unwrap();
        assert_eq!(table.extent(), 4);
        assert!(matches!(table.get(2), Err(ArithError::UndefinedWire(2))));
        assert_eq!(table.get(3).unwrap(), &Fr::one());

        let err = table.set(usize::MAX - 1, Fr::one()).unwrap_err();
        assert!(matches!(err, ArithError::TableTooLarge { .. }));

        let err = WireTable::<Fr>::new(4).set(4, Fr::one()).unwrap_err();
        assert!(matches!(err, ArithError::WireOutOfRange { index: 4, total: 4 }));
    }

    #[test]
    fn scenario_square_of_sum() {
        let h = header(4, 1, 1);
        let wires = eval(
            &h,
            &[Fr::from(1u64), Fr::from(2u64)],
            &["add in 0_1 out 2", "mul in 2_2 out 3"],
        )
        .unwrap();
        assert_eq!(wires[3], Some(Fr::from(9u64)));
    }

    #[test]
    fn add_is_order_independent() {
        let mut rng = ark_std::test_rng();
        for k in 2..=6 {
            let values: Vec<Fr> = (0..k).map(|_| Fr::rand(&mut rng)).collect();
            let expected: Fr = values.iter().sum();

            let mut order: Vec<usize> = (0..k).collect();
            for _ in 0..4 {
                for i in (1..k).rev() {
                    order.swap(i, rng.gen_range(0..=i));
                }
                let line = format!(
                    "add in {} out {k}",
                    order
                        .iter()
                        .map(|i| i.to_string())
                        .collect::<Vec<_>>()
                        .join("_")
                );
                let wires = eval(&header(k + 1, k, 0), &values, &[&line]).unwrap();
                assert_eq!(wires[k], Some(expected), "{line}");
            }
        }
    }

    #[test]
    fn split_then_pack_round_trips() {
        for (width, value) in [
            (1usize, 0u64),
            (8, 0),
            (8, 255),
            (8, 0xa5),
            (16, 65535),
            (33, (1 << 33) - 1),
        ] {
            let outs: Vec<String> = (0..width).map(|i| (i + 1).to_string()).collect();
            let lines = [
                format!("split in 0 out {}", outs.join("_")),
                format!("pack in {} out {}", outs.join("_"), width + 1),
            ];
            let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
            let wires = eval(&header(width + 2, 0, 1), &[Fr::from(value)], &refs).unwrap();
            assert_eq!(wires[width + 1], Some(Fr::from(value)), "{width}-bit {value}");
        }
    }

    #[test]
    fn split_writes_lsb_first() {
        let wires = eval(
            &header(5, 1, 0),
            &[Fr::from(0b110u64)],
            &["split in 0 out 1_2_3_4"],
        )
        .unwrap();
        let bits: Vec<Fr> = wires[1..].iter().map(|w| w.unwrap()).collect();
        assert_eq!(bits, vec![Fr::zero(), Fr::one(), Fr::one(), Fr::zero()]);
    }

    #[test]
    fn single_output_split_is_a_copy() {
        let value = Fr::from(1234567u64);
        let wires = eval(&header(2, 1, 0), &[value], &["split in 0 out 1"]).unwrap();
        assert_eq!(wires[1], Some(value));
    }

    #[test]
    fn split_rejects_values_wider_than_outputs() {
        let err = eval(&header(4, 1, 0), &[Fr::from(4u64)], &["split in 0 out 1_2"]).unwrap_err();
        assert!(matches!(err.root(), ArithError::Unsatisfied(_)));
        assert!(matches!(err, ArithError::AtGate { position: 0, .. }));
    }

    #[test]
    fn zerop_writes_second_output_only() {
        for (input, expected) in [(0u64, Fr::zero()), (1, Fr::one()), (42, Fr::one())] {
            let wires =
                eval(&header(3, 1, 0), &[Fr::from(input)], &["zerop in 0 out 1_2"]).unwrap();
            assert_eq!(wires[2], Some(expected), "zerop {input}");
            assert_eq!(wires[1], None);
        }
    }

    #[test]
    fn xor_and_or_treat_nonzero_as_true() {
        let cases = [(0u64, 0u64, 0u64, 0u64), (0, 5, 1, 1), (9, 0, 1, 1), (3, 7, 0, 1)];
        for (a, b, xor, or) in cases {
            let wires = eval(
                &header(4, 2, 0),
                &[Fr::from(a), Fr::from(b)],
                &["xor in 0_1 out 2", "or in 0_1 out 3"],
            )
            .unwrap();
            assert_eq!(wires[2], Some(Fr::from(xor)), "{a} xor {b}");
            assert_eq!(wires[3], Some(Fr::from(or)), "{a} or {b}");
        }
    }

    #[test]
    fn const_mul_and_neg_cancel() {
        let mut rng = ark_std::test_rng();
        let x = Fr::rand(&mut rng);
        for hex in [
            "0",
            "1",
            "30644e72e131a029b85045b68181585d2833e84879b9709143e1f593f0000000",
            "deadbeefcafebabe0123456789",
        ] {
            let lines = [
                format!("const-mul-{hex} in 0 out 1"),
                format!("const-mul-neg-{hex} in 0 out 2"),
                "add in 1_2 out 3".to_owned(),
            ];
            let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
            let wires = eval(&header(4, 1, 0), &[x], &refs).unwrap();

            let c = Fr::from(BigUint::parse_bytes(hex.as_bytes(), 16).unwrap());
            assert_eq!(wires[1], Some(c * x));
            assert_eq!(wires[3], Some(Fr::zero()), "{hex}");
        }
    }

    #[test]
    fn assert_checks_product_without_writing() {
        let ok = eval(
            &header(3, 3, 0),
            &[Fr::from(3u64), Fr::from(4u64), Fr::from(12u64)],
            &["assert in 0_1 out 2"],
        );
        assert!(ok.is_ok());

        let err = eval(
            &header(3, 3, 0),
            &[Fr::from(3u64), Fr::from(4u64), Fr::from(13u64)],
            &["assert in 0_1 out 2"],
        )
        .unwrap_err();
        assert!(matches!(err.root(), ArithError::Unsatisfied(_)));
    }

    #[test]
    fn rejects_forward_and_out_of_range_references() {
        let err = eval(&header(4, 1, 0), &[Fr::one()], &["mul in 0_2 out 3"]).unwrap_err();
        assert!(matches!(err.root(), ArithError::UndefinedWire(2)));

        let err = eval(&header(4, 1, 0), &[Fr::one()], &["mul in 0_0 out 4"]).unwrap_err();
        assert!(matches!(
            err.root(),
            ArithError::WireOutOfRange { index: 4, total: 4 }
        ));

        let err = eval(&header(4, 1, 0), &[Fr::one()], &["mul in 0_9 out 1"]).unwrap_err();
        assert!(matches!(err.root(), ArithError::WireOutOfRange { index: 9, .. }));
    }

    #[test]
    fn unknown_opcode_stops_before_backend() {
        let h = header(2, 1, 0);
        let mut api = Evaluator::<Fr>::new();
        let mut interpreter = Interpreter::seed(&mut api, &h, None).unwrap();
        let gates = vec![gate("foo in 0 out 1"), gate("mul in 0_0 out 1")];
        let err = interpreter.run(&mut api, gates).unwrap_err();
        assert!(matches!(err, ArithError::UnknownOpcode(_)));
        assert_eq!(interpreter.gates_applied(), 0);
        assert!(interpreter.wires().get(1).is_err());
    }

    #[test]
    fn outputs_are_reported_not_constrained() {
        let h = CircuitHeader {
            total_vars: 4,
            n_public: 1,
            n_secret: 1,
            output_end: 3,
        };
        let assignment = Assignment {
            public: vec![Fr::from(2u64)],
            secret: vec![Fr::from(5u64)],
        };
        let gates: Vec<Gate> = ["add in 0_1 out 2", "mul in 2_0 out 3"]
            .into_iter()
            .map(|l| gate(l).unwrap())
            .collect();

        let cs = ConstraintSystem::<Fr>::new_ref();
        let mut api = R1csApi::new(cs.clone());
        let mut sink = CollectOutputs::default();
        synthesize(&mut api, &h, Some(&assignment), gates.iter().cloned().map(Ok), &mut sink)
            .unwrap();
        let constraints = cs.num_constraints();
        assert_eq!(
            sink.0,
            vec![(2, Some(Fr::from(7u64))), (3, Some(Fr::from(14u64)))]
        );

        let cs_quiet = ConstraintSystem::<Fr>::new_ref();
        let mut api = R1csApi::new(cs_quiet.clone());
        let quiet = CircuitHeader { output_end: 0, ..h };
        let mut sink = CollectOutputs::default();
        synthesize(&mut api, &quiet, Some(&assignment), gates.into_iter().map(Ok), &mut sink)
            .unwrap();
        assert!(sink.0.is_empty());
        assert_eq!(cs_quiet.num_constraints(), constraints);
        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn r1cs_agrees_with_evaluator() {
        let h = CircuitHeader {
            total_vars: 16,
            n_public: 2,
            n_secret: 1,
            output_end: 15,
        };
        let assignment = Assignment {
            public: vec![Fr::from(11u64), Fr::from(0u64)],
            secret: vec![Fr::from(6u64)],
        };
        let lines = [
            "add in 0_1_2 out 3",
            "const-mul-3 in 3 out 4",
            "const-mul-neg-2 in 2 out 5",
            "add in 4_5 out 6",
            "split in 6 out 7_8_9_10_11_12",
            "pack in 7_8_9 out 13",
            "xor in 1_13 out 14",
            "zerop in 1 out 3_15",
            "mul in 14_13 out 15",
            "assert in 14_13 out 15",
        ];

        let expected = evaluate(&h, &assignment, lines.map(gate)).unwrap();

        let cs = ConstraintSystem::<Fr>::new_ref();
        let mut api = R1csApi::new(cs.clone());
        let mut sink = CollectOutputs::default();
        let interpreter =
            synthesize(&mut api, &h, Some(&assignment), lines.map(gate), &mut sink).unwrap();
        assert!(cs.is_satisfied().unwrap());
        for (i, value) in expected.iter().enumerate() {
            let got = interpreter.wires().get(i).ok().and_then(|w| api.value(w));
            assert_eq!(got, *value, "wire {i}");
        }
        assert_eq!(sink.0.len(), 13);
    }
}
