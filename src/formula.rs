/*!
A module to represent conjunctive normal form formula.

Literals cross the public API as DIMACS integers (`i32`, sign is polarity,
zero terminates a clause). Inside the engine they are [`Literal`] values.
*/

use std::{
    convert::{TryFrom, TryInto},
    fmt::Display,
    num::NonZeroU32,
    str::FromStr,
};

use crate::prelude::*;

#[derive(Debug, Snafu)]
pub enum VariableParseError {
    #[snafu(display("Failed to parse Variable ID"))]
    ParseIntError { source: std::num::ParseIntError },
    #[snafu(display(
        "Variable ID {} is out of range (must be within 1 to {})",
        num,
        Variable::MAX_VARIABLE_ID
    ))]
    RangeError { num: usize },
}

/// Newtype wrapper for variable ID.
/// Invariant: 0 < ID <= MAX_VARIABLE_ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Variable(NonZeroU32);

impl Variable {
    /// DIMACS literals are `i32`, so the largest variable is `i32::MAX`.
    pub const MAX_VARIABLE_ID: usize = std::i32::MAX as usize;
}

impl Variable {
    pub fn as_index(&self) -> usize {
        (self.0.get() - 1) as usize
    }

    /// Creates a variable from a raw index.
    /// Returns `None` if the index is invalid.
    pub fn from_index(index: usize) -> Option<Self> {
        let id = index.checked_add(1)?;
        if id > Variable::MAX_VARIABLE_ID {
            return None;
        }
        Some(Variable(NonZeroU32::new(id.try_into().ok()?)?))
    }

    /// The DIMACS identifier of the variable.
    pub fn id(&self) -> i32 {
        self.0.get() as i32
    }
}

impl FromStr for Variable {
    type Err = VariableParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let num = s.parse::<usize>().context(ParseIntError)?;
        num.checked_sub(1)
            .and_then(Variable::from_index)
            .context(RangeError { num })
    }
}

impl Display for Variable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "x{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Literal {
    id: Variable,
    positive: bool,
}

impl Literal {
    pub fn new(id: Variable, positive: bool) -> Self {
        Literal { id, positive }
    }

    /// Converts a DIMACS literal. Returns `None` for `0` and `i32::MIN`.
    pub fn from_dimacs(literal: i32) -> Option<Self> {
        let magnitude = literal.checked_abs()?;
        let id = Variable::from_index(usize::try_from(magnitude).ok()?.checked_sub(1)?)?;
        Some(Literal::new(id, literal > 0))
    }

    pub fn to_dimacs(&self) -> i32 {
        if self.positive {
            self.id.id()
        } else {
            -self.id.id()
        }
    }

    pub fn variable(&self) -> Variable {
        self.id
    }

    pub fn positive(&self) -> bool {
        self.positive
    }

    /// Dense index of the literal, `2 * variable + sign`.
    pub fn index(&self) -> usize {
        self.id.as_index() * 2 + if self.positive { 0 } else { 1 }
    }

    /// Evaluates the literal under a partial assignment indexed by variable.
    pub fn partial_value(&self, assignments: &[Option<bool>]) -> Option<bool> {
        assignments
            .get(self.id.as_index())
            .copied()
            .flatten()
            .map(|value| value == self.positive)
    }
}

impl FromStr for Literal {
    type Err = VariableParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (positive, id) = if let Some(rest) = s.strip_prefix('-') {
            (false, rest.parse()?)
        } else {
            (true, s.parse()?)
        };

        Ok(Literal { id, positive })
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", if self.positive { "" } else { "¬" }, self.id)
    }
}

impl std::ops::Not for Literal {
    type Output = Literal;

    fn not(self) -> Self::Output {
        Literal {
            id: self.id,
            positive: !self.positive,
        }
    }
}

/// Disjunction variables
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Clause {
    literals: Vec<Literal>,
}

impl Clause {
    pub fn new(literals: Vec<Literal>) -> Self {
        Self { literals }
    }

    pub fn iter(&self) -> impl Iterator<Item = Literal> + '_ {
        self.literals.iter().copied()
    }

    pub fn to_dimacs(&self) -> Vec<i32> {
        self.iter().map(|literal| literal.to_dimacs()).collect()
    }
}

/// Formula representation in Conjunctive Normal Form
#[derive(Debug, Clone, Default)]
pub struct Cnf {
    num_variables: usize,
    clauses: Vec<Clause>,
}

impl Cnf {
    pub fn new(num_variables: usize) -> Self {
        assert!(num_variables <= Variable::MAX_VARIABLE_ID);

        Cnf {
            num_variables,
            clauses: Vec::new(),
        }
    }

    pub fn num_variables(&self) -> usize {
        self.num_variables
    }

    pub fn clauses(&self) -> &Vec<Clause> {
        &self.clauses
    }

    /// Adds a clause, growing the variable count if the clause mentions a larger variable.
    pub fn add_clause(&mut self, clause: Clause) {
        if let Some(max) = clause.iter().map(|l| l.variable().as_index() + 1).max() {
            self.num_variables = self.num_variables.max(max);
        }
        self.clauses.push(clause);
    }

    pub fn into_clauses(self) -> Vec<Clause> {
        self.clauses
    }
}
