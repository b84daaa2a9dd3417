//! Opcode records: `<kind> in <a>_<b>... out <c>_<d>...`.

use std::fmt;

use num::BigUint;
use serde::{Deserialize, Serialize};

use crate::error::{ArithError, ArithResult};
use crate::reader::Record;

const CONST_MUL: &str = "const-mul-";
const CONST_MUL_NEG: &str = "const-mul-neg-";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Opcode {
    Add,
    Mul,
    ConstMul(BigUint),
    ConstMulNeg(BigUint),
    Assert,
    Xor,
    Or,
    ZeroP,
    Split,
    Pack,
}

/// Expected wire count on one side of a gate.
#[derive(Clone, Copy, Debug)]
enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    fn admits(self, n: usize) -> bool {
        match self {
            Arity::Exactly(k) => n == k,
            Arity::AtLeast(k) => n >= k,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Arity::Exactly(1) => "exactly 1",
            Arity::Exactly(2) => "exactly 2",
            Arity::AtLeast(1) => "at least 1",
            Arity::AtLeast(2) => "at least 2",
            _ => "a different number of",
        }
    }
}

fn parse_hex(digits: &str) -> ArithResult<BigUint> {
    BigUint::parse_bytes(digits.as_bytes(), 16)
        .filter(|_| !digits.is_empty())
        .ok_or_else(|| ArithError::InvalidConstant(digits.to_owned()))
}

impl Opcode {
    pub fn parse(kind: &str) -> ArithResult<Self> {
        let opcode = match kind {
            "add" => Opcode::Add,
            "mul" => Opcode::Mul,
            "assert" => Opcode::Assert,
            "xor" => Opcode::Xor,
            "or" => Opcode::Or,
            "zerop" => Opcode::ZeroP,
            "split" => Opcode::Split,
            "pack" => Opcode::Pack,
            _ => {
                if let Some(hex) = kind.strip_prefix(CONST_MUL_NEG) {
                    Opcode::ConstMulNeg(parse_hex(hex)?)
                } else if let Some(hex) = kind.strip_prefix(CONST_MUL) {
                    Opcode::ConstMul(parse_hex(hex)?)
                } else {
                    return Err(ArithError::UnknownOpcode(kind.to_owned()));
                }
            }
        };
        Ok(opcode)
    }

    fn arity(&self) -> (Arity, Arity) {
        use Arity::*;
        match self {
            Opcode::Add => (AtLeast(2), Exactly(1)),
            Opcode::Mul | Opcode::Assert | Opcode::Xor | Opcode::Or => (Exactly(2), Exactly(1)),
            Opcode::ConstMul(_) | Opcode::ConstMulNeg(_) => (Exactly(1), Exactly(1)),
            Opcode::ZeroP => (Exactly(1), Exactly(2)),
            Opcode::Split => (Exactly(1), AtLeast(1)),
            Opcode::Pack => (AtLeast(1), Exactly(1)),
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::Add => f.write_str("add"),
            Opcode::Mul => f.write_str("mul"),
            Opcode::ConstMul(c) => write!(f, "{CONST_MUL}{c:x}"),
            Opcode::ConstMulNeg(c) => write!(f, "{CONST_MUL_NEG}{c:x}"),
            Opcode::Assert => f.write_str("assert"),
            Opcode::Xor => f.write_str("xor"),
            Opcode::Or => f.write_str("or"),
            Opcode::ZeroP => f.write_str("zerop"),
            Opcode::Split => f.write_str("split"),
            Opcode::Pack => f.write_str("pack"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gate {
    pub opcode: Opcode,
    pub inputs: Vec<usize>,
    pub outputs: Vec<usize>,
}

fn parse_indices(list: &str) -> Option<Vec<usize>> {
    list.split('_').map(|s| s.parse::<usize>().ok()).collect()
}

impl Gate {
    pub fn parse(record: &Record) -> ArithResult<Self> {
        let malformed = || ArithError::MalformedGate {
            line: record.line,
            text: record.text.clone(),
        };

        let fields: Vec<&str> = record.fields().collect();
        let [kind, "in", inputs, "out", outputs] = fields[..] else {
            return Err(malformed());
        };
        let inputs = parse_indices(inputs).ok_or_else(malformed)?;
        let outputs = parse_indices(outputs).ok_or_else(malformed)?;

        let gate = Gate {
            opcode: Opcode::parse(kind)?,
            inputs,
            outputs,
        };
        gate.check_arity()?;
        Ok(gate)
    }

    fn check_arity(&self) -> ArithResult<()> {
        let (ins, outs) = self.opcode.arity();
        for (side, arity, got) in [
            ("input", ins, self.inputs.len()),
            ("output", outs, self.outputs.len()),
        ] {
            if !arity.admits(got) {
                return Err(ArithError::Arity {
                    opcode: self.opcode.to_string(),
                    side,
                    expected: arity.describe(),
                    got,
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |wires: &[usize]| {
            wires
                .iter()
                .map(|w| w.to_string())
                .collect::<Vec<_>>()
                .join("_")
        };
        write!(
            f,
            "{} in {} out {}",
            self.opcode,
            join(&self.inputs),
            join(&self.outputs)
        )
    }
}
