//! Line-oriented record stream over an arith (or assignment) file.

use std::io::BufRead;

use crate::error::ArithResult;

/// One non-blank line of input, with its 1-based line number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub line: usize,
    pub text: String,
}

impl Record {
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.text.split_whitespace()
    }
}

pub struct ArithReader<R> {
    inner: R,
    line: usize,
    buf: String,
}

impl<R: BufRead> ArithReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            line: 0,
            buf: String::new(),
        }
    }

    /// Returns the next non-blank record, or `None` at end of input.
    pub fn next_record(&mut self) -> ArithResult<Option<Record>> {
        loop {
            self.buf.clear();
            if self.inner.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line += 1;
            let text = self.buf.trim();
            if !text.is_empty() {
                return Ok(Some(Record {
                    line: self.line,
                    text: text.to_owned(),
                }));
            }
        }
    }
}

impl<R: BufRead> Iterator for ArithReader<R> {
    type Item = ArithResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}
