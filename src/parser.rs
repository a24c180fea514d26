/*!
DIMACS reader and writer.

Both plain CNF (`p cnf <vars> <clauses>`) and incremental CNF (`p inccnf`,
with `a <lits> 0` cube lines) are understood. Clauses may span lines.
*/

use std::{
    fs::File,
    io::{self, BufRead, BufReader, Write},
    path::{Path, PathBuf},
};

use crate::formula::{Clause, Cnf, Literal, Variable, VariableParseError};
use crate::prelude::*;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("I/O error occurred while parsing CNF file '{}'", path.display()))]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("I/O error occurred while reading CNF input"))]
    ReadError { source: std::io::Error },
    #[snafu(display("line {}: failed to parse '{}' as clause", line, clause))]
    MalformedClause { line: usize, clause: String },
    #[snafu(display("line {}: invalid variable found in clause '{}'", line, clause))]
    MalformedVariable {
        line: usize,
        clause: String,
        source: VariableParseError,
    },
    #[snafu(display("line {}: malformed problem line '{}'", line, header))]
    MalformedProblemDefinition { line: usize, header: String },
    #[snafu(display("Problem line 'p cnf <num_variables> <num_clauses>' is not found"))]
    MissingProblemDefinition,
    #[snafu(display(
        "line {}: literal {} exceeds the maximum variable {} of the header",
        line,
        literal,
        max
    ))]
    VariableOutOfRange {
        line: usize,
        literal: i32,
        max: usize,
    },
    #[snafu(display("line {}: unexpected {}", line, what))]
    Unexpected { line: usize, what: String },
    #[snafu(display(
        "The number of clauses ({}) does not match the clauses number in the problem definition ({})",
        found,
        expected,
    ))]
    ClauseCountMismatch { expected: usize, found: usize },
    #[snafu(display("the last clause is not terminated by '0'"))]
    UnterminatedClause,
}

/// How forgiving the reader is about the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Strictness {
    /// Header optional, counts are not checked, a trailing clause may omit its `0`.
    Relaxed = 0,
    /// Header required, variables and clause count must match it.
    Strict = 1,
    /// Like `Strict`, and comments are only allowed before the header.
    Pedantic = 2,
}

impl Default for Strictness {
    fn default() -> Self {
        Strictness::Strict
    }
}

/// The content of a DIMACS file.
#[derive(Debug, Clone, Default)]
pub struct Dimacs {
    pub cnf: Cnf,
    /// Whether the header was `p inccnf`.
    pub incremental: bool,
    /// Cubes from `a` lines of an incremental file.
    pub cubes: Vec<Vec<Literal>>,
}

enum Header {
    Cnf { variables: usize, clauses: usize },
    Incremental,
}

fn parse_header(line_number: usize, line: &str) -> Result<Header, Error> {
    let splitted = line.split_whitespace().collect::<Vec<_>>();
    let malformed = || MalformedProblemDefinition {
        line: line_number,
        header: line.to_owned(),
    };

    match splitted.as_slice() {
        ["p", "inccnf"] => Ok(Header::Incremental),
        ["p", "cnf", variables, clauses] => {
            match (variables.parse::<usize>(), clauses.parse::<usize>()) {
                (Ok(variables), Ok(clauses)) if variables <= Variable::MAX_VARIABLE_ID => {
                    Ok(Header::Cnf { variables, clauses })
                }
                _ => malformed().fail(),
            }
        }
        _ => malformed().fail(),
    }
}

fn parse_literal(line_number: usize, line: &str, token: &str) -> Result<Option<Literal>, Error> {
    if token == "0" {
        return Ok(None);
    }
    let literal = token.parse::<Literal>().with_context(|| MalformedVariable {
        line: line_number,
        clause: line.to_owned(),
    })?;
    Ok(Some(literal))
}

/// Parses a DIMACS formula from a file.
pub fn parse_file(path: impl AsRef<Path>, strictness: Strictness) -> Result<Dimacs, Error> {
    let path = path.as_ref();
    let file = BufReader::new(File::open(path).context(IoError {
        path: path.to_owned(),
    })?);

    parse_reader(file, strictness).map_err(|error| match error {
        Error::ReadError { source } => Error::IoError {
            path: path.to_owned(),
            source,
        },
        other => other,
    })
}

/// Parses a DIMACS formula from a string.
pub fn parse_str(input: &str, strictness: Strictness) -> Result<Dimacs, Error> {
    parse_reader(input.as_bytes(), strictness)
}

/// Parses a DIMACS formula from any buffered reader.
pub fn parse_reader(reader: impl BufRead, strictness: Strictness) -> Result<Dimacs, Error> {
    let mut header = None;
    let mut dimacs = Dimacs::default();
    let mut cnf = Cnf::new(0);
    let mut pending: Vec<Literal> = Vec::new();
    let mut last_line = 0;

    for (index, line) in reader.lines().enumerate() {
        let line = line.context(ReadError)?;
        let line_number = index + 1;
        last_line = line_number;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }
        if trimmed.starts_with('c') {
            ensure!(
                strictness < Strictness::Pedantic || header.is_none(),
                Unexpected {
                    line: line_number,
                    what: "comment after the problem line",
                }
            );
            continue;
        }
        if trimmed.starts_with('p') {
            ensure!(
                header.is_none() && cnf.clauses().is_empty() && pending.is_empty(),
                Unexpected {
                    line: line_number,
                    what: "second problem line",
                }
            );
            header = Some(parse_header(line_number, trimmed)?);
            dimacs.incremental = matches!(header, Some(Header::Incremental));
            continue;
        }

        if header.is_none() && strictness >= Strictness::Strict {
            return MissingProblemDefinition.fail();
        }

        let max_variable = match header {
            Some(Header::Cnf { variables, .. }) if strictness >= Strictness::Strict => {
                Some(variables)
            }
            _ => None,
        };

        if let Some(cube_body) = trimmed.strip_prefix('a') {
            ensure!(
                dimacs.incremental,
                Unexpected {
                    line: line_number,
                    what: "cube outside of an 'inccnf' file",
                }
            );
            ensure!(
                pending.is_empty(),
                MalformedClause {
                    line: line_number,
                    clause: trimmed.to_owned(),
                }
            );
            let mut cube = Vec::new();
            let mut terminated = false;
            for token in cube_body.split_whitespace() {
                ensure!(
                    !terminated,
                    MalformedClause {
                        line: line_number,
                        clause: trimmed.to_owned(),
                    }
                );
                match parse_literal(line_number, trimmed, token)? {
                    Some(literal) => cube.push(literal),
                    None => terminated = true,
                }
            }
            ensure!(
                terminated,
                MalformedClause {
                    line: line_number,
                    clause: trimmed.to_owned(),
                }
            );
            dimacs.cubes.push(cube);
            continue;
        }

        for token in trimmed.split_whitespace() {
            match parse_literal(line_number, trimmed, token)? {
                Some(literal) => {
                    if let Some(max) = max_variable {
                        ensure!(
                            literal.variable().as_index() < max,
                            VariableOutOfRange {
                                line: line_number,
                                literal: literal.to_dimacs(),
                                max,
                            }
                        );
                    }
                    pending.push(literal);
                }
                None => cnf.add_clause(Clause::new(std::mem::take(&mut pending))),
            }
        }
    }

    if !pending.is_empty() {
        ensure!(strictness == Strictness::Relaxed, UnterminatedClause);
        trace!("accepting unterminated clause at line {}", last_line);
        cnf.add_clause(Clause::new(pending));
    }

    match header {
        Some(Header::Cnf { variables, clauses }) => {
            if strictness >= Strictness::Strict {
                ensure!(
                    cnf.clauses().len() == clauses,
                    ClauseCountMismatch {
                        found: cnf.clauses().len(),
                        expected: clauses,
                    }
                );
            }
            let mut sized = Cnf::new(variables.max(cnf.num_variables()));
            for clause in cnf.into_clauses() {
                sized.add_clause(clause);
            }
            cnf = sized;
        }
        Some(Header::Incremental) => {}
        None => ensure!(strictness == Strictness::Relaxed, MissingProblemDefinition),
    }

    dimacs.cnf = cnf;
    Ok(dimacs)
}

/// Writes clauses in DIMACS format, preceded by optional comment lines.
pub fn write_cnf<W: Write>(
    out: &mut W,
    comment: Option<&str>,
    num_variables: usize,
    clauses: &[Vec<i32>],
) -> io::Result<()> {
    if let Some(comment) = comment {
        for line in comment.lines() {
            writeln!(out, "c {}", line)?;
        }
    }
    writeln!(out, "p cnf {} {}", num_variables, clauses.len())?;
    for clause in clauses {
        for literal in clause {
            write!(out, "{} ", literal)?;
        }
        writeln!(out, "0")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clauses_may_span_lines() {
        let dimacs = parse_str("p cnf 3 2\n1 -2\n0 2 3 0\n", Strictness::Strict).unwrap();
        let clauses = dimacs
            .cnf
            .clauses()
            .iter()
            .map(|clause| clause.to_dimacs())
            .collect::<Vec<_>>();
        assert_eq!(clauses, vec![vec![1, -2], vec![2, 3]]);
        assert_eq!(dimacs.cnf.num_variables(), 3);
        assert!(!dimacs.incremental);
    }

    #[test]
    fn strict_reader_checks_header() {
        assert!(matches!(
            parse_str("1 2 0\n", Strictness::Strict),
            Err(Error::MissingProblemDefinition)
        ));
        assert!(matches!(
            parse_str("p cnf 1 1\n1 2 0\n", Strictness::Strict),
            Err(Error::VariableOutOfRange { literal: 2, .. })
        ));
        assert!(matches!(
            parse_str("p cnf 2 2\n1 2 0\n", Strictness::Strict),
            Err(Error::ClauseCountMismatch {
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn relaxed_reader_infers_variables() {
        let dimacs = parse_str("c no header\n1 -5 0\n3", Strictness::Relaxed).unwrap();
        assert_eq!(dimacs.cnf.num_variables(), 5);
        assert_eq!(dimacs.cnf.clauses().len(), 2);
    }

    #[test]
    fn pedantic_reader_rejects_late_comments() {
        assert!(parse_str("p cnf 1 1\nc late\n1 0\n", Strictness::Strict).is_ok());
        assert!(matches!(
            parse_str("p cnf 1 1\nc late\n1 0\n", Strictness::Pedantic),
            Err(Error::Unexpected { line: 2, .. })
        ));
    }

    #[test]
    fn incremental_cubes() {
        let dimacs = parse_str("p inccnf\n1 2 0\na -1 0\na 1 2 0\n", Strictness::Strict).unwrap();
        assert!(dimacs.incremental);
        let cubes = dimacs
            .cubes
            .iter()
            .map(|cube| cube.iter().map(|l| l.to_dimacs()).collect::<Vec<_>>())
            .collect::<Vec<_>>();
        assert_eq!(cubes, vec![vec![-1], vec![1, 2]]);
    }

    #[test]
    fn writer_emits_header_and_comment() {
        let mut out = Vec::new();
        write_cnf(&mut out, Some("generated"), 2, &[vec![1, -2], vec![]]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "c generated\np cnf 2 2\n1 -2 0\n0\n"
        );
    }
}
