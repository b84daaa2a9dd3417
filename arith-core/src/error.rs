use ark_relations::r1cs::SynthesisError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArithError {
    #[error("File format does not match, expected `total <n>` on the first line")]
    MissingTotal,
    #[error("Declared {declared} input wires but only {total} wires in total")]
    InputsExceedTotal { declared: usize, total: usize },
    #[error("Output marker {output_end} is outside the {total} declared wires")]
    OutputOutOfRange { output_end: usize, total: usize },
    #[error("Invalid line {line}: `{text}`, expected <opcode> in <input vars> out <output vars>")]
    MalformedGate { line: usize, text: String },
    #[error("Unknown opcode `{0}`")]
    UnknownOpcode(String),
    #[error("Not a valid hex number: `{0}`")]
    InvalidConstant(String),
    #[error("Opcode `{opcode}` expects {expected} {side} wires but got {got}")]
    Arity {
        opcode: String,
        side: &'static str,
        expected: &'static str,
        got: usize,
    },
    #[error("Wire {index} is outside the variable table of {total} wires")]
    WireOutOfRange { index: usize, total: usize },
    #[error("Cannot allocate the variable table up to wire {index}")]
    TableTooLarge { index: usize },
    #[error("Wire {0} is read before any gate assigns it")]
    UndefinedWire(usize),
    #[error("Constraint not satisfied: {0}")]
    Unsatisfied(String),
    #[error("Gate {position} (`{opcode}`): {source}")]
    AtGate {
        position: usize,
        opcode: String,
        #[source]
        source: Box<ArithError>,
    },
    #[error("Constraint synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),
    #[error("Compiled circuit is corrupt: {0}")]
    CorruptCircuit(String),
    #[error("Compiled circuit encoding: {0}")]
    Encoding(#[from] bincode::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ArithError {
    /// Strips any gate-position wrappers.
    pub fn root(&self) -> &ArithError {
        match self {
            ArithError::AtGate { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type ArithResult<T> = Result<T, ArithError>;
