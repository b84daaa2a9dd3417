//! The `total` / `input` / `nizkinput` / `output` block that opens an arith file.

use std::io::BufRead;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::{ArithError, ArithResult};
use crate::reader::{ArithReader, Record};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitHeader {
    pub total_vars: usize,
    pub n_public: usize,
    pub n_secret: usize,
    /// Highest wire index reported as a circuit output, 0 when there are none.
    pub output_end: usize,
}

impl CircuitHeader {
    pub fn num_inputs(&self) -> usize {
        self.n_public + self.n_secret
    }

    /// Wire indices reported after the last gate, if any.
    pub fn outputs(&self) -> Option<RangeInclusive<usize>> {
        (self.output_end != 0).then(|| self.num_inputs()..=self.output_end)
    }

    pub fn validate(&self) -> ArithResult<()> {
        if self.num_inputs() > self.total_vars {
            return Err(ArithError::InputsExceedTotal {
                declared: self.num_inputs(),
                total: self.total_vars,
            });
        }
        if self.output_end != 0 && self.output_end >= self.total_vars {
            return Err(ArithError::OutputOutOfRange {
                output_end: self.output_end,
                total: self.total_vars,
            });
        }
        Ok(())
    }
}

enum Declaration {
    Input,
    SecretInput,
    Output(usize),
}

fn keyword_value<'a>(record: &'a Record, keyword: &str) -> Option<&'a str> {
    let mut fields = record.fields();
    match (fields.next(), fields.next(), fields.next()) {
        (Some(k), Some(v), None) if k == keyword => Some(v),
        _ => None,
    }
}

fn declaration(record: &Record) -> Option<Declaration> {
    let parse = |keyword| keyword_value(record, keyword).and_then(|v| v.parse::<usize>().ok());
    if parse("input").is_some() {
        Some(Declaration::Input)
    } else if parse("nizkinput").is_some() {
        Some(Declaration::SecretInput)
    } else {
        parse("output").map(Declaration::Output)
    }
}

/// Consumes the header block. The first record that is not a declaration is
/// handed back so the gate stream can start from it.
#[tracing::instrument(skip_all)]
pub fn parse_header<R: BufRead>(
    reader: &mut ArithReader<R>,
) -> ArithResult<(CircuitHeader, Option<Record>)> {
    let first = reader.next_record()?.ok_or(ArithError::MissingTotal)?;
    let total_vars = keyword_value(&first, "total")
        .and_then(|v| v.parse::<usize>().ok())
        .ok_or(ArithError::MissingTotal)?;

    let mut header = CircuitHeader {
        total_vars,
        ..Default::default()
    };

    let pending = loop {
        let Some(record) = reader.next_record()? else {
            break None;
        };
        match declaration(&record) {
            Some(Declaration::Input) => header.n_public += 1,
            Some(Declaration::SecretInput) => header.n_secret += 1,
            Some(Declaration::Output(id)) => header.output_end = id,
            None => break Some(record),
        }
    };

    header.validate()?;
    tracing::debug!(
        total = header.total_vars,
        public = header.n_public,
        secret = header.n_secret,
        output_end = header.output_end,
        "parsed arith header"
    );
    Ok((header, pending))
}
