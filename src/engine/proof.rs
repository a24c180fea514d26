/*!
DRAT proof output, in ASCII or binary form.
*/

use std::io::{self, Write};

use crate::formula::Literal;

pub struct ProofTracer {
    writer: Box<dyn Write>,
    name: String,
    binary: bool,
    added: u64,
    deleted: u64,
    /// First write error, reported on the next flush.
    error: Option<io::Error>,
}

impl std::fmt::Debug for ProofTracer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProofTracer")
            .field("name", &self.name)
            .field("binary", &self.binary)
            .field("added", &self.added)
            .field("deleted", &self.deleted)
            .finish()
    }
}

impl ProofTracer {
    pub fn new(writer: Box<dyn Write>, name: impl Into<String>, binary: bool) -> Self {
        ProofTracer {
            writer,
            name: name.into(),
            binary,
            added: 0,
            deleted: 0,
            error: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add(&mut self, clause: &[Literal]) {
        self.added += 1;
        self.record(None, clause);
    }

    pub fn delete(&mut self, clause: &[Literal]) {
        self.deleted += 1;
        self.record(Some('d'), clause);
    }

    fn record(&mut self, tag: Option<char>, clause: &[Literal]) {
        if self.error.is_some() {
            return;
        }
        let result = if self.binary {
            write_binary(&mut self.writer, tag.unwrap_or('a'), clause)
        } else {
            write_ascii(&mut self.writer, tag, clause)
        };
        if let Err(error) = result {
            warn!("proof trace '{}' failed: {}", self.name, error);
            self.error = Some(error);
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        if let Some(error) = self.error.take() {
            return Err(error);
        }
        self.writer.flush()
    }

    pub fn counts(&self) -> (u64, u64) {
        (self.added, self.deleted)
    }
}

fn write_ascii<W: Write + ?Sized>(out: &mut W, tag: Option<char>, clause: &[Literal]) -> io::Result<()> {
    if let Some(tag) = tag {
        write!(out, "{} ", tag)?;
    }
    for literal in clause {
        write!(out, "{} ", literal.to_dimacs())?;
    }
    writeln!(out, "0")
}

fn write_binary<W: Write + ?Sized>(out: &mut W, tag: char, clause: &[Literal]) -> io::Result<()> {
    out.write_all(&[tag as u8])?;
    for literal in clause {
        let magnitude = literal.to_dimacs().unsigned_abs();
        let mut encoded = 2 * magnitude + if literal.positive() { 0 } else { 1 };
        while encoded > 127 {
            out.write_all(&[(encoded & 127) as u8 | 128])?;
            encoded >>= 7;
        }
        out.write_all(&[encoded as u8])?;
    }
    out.write_all(&[0])
}
