use std::{convert::TryFrom, fmt::Display};

/// Externally visible state of an engine.
///
/// The engine is the only owner of this value; callers only observe it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Initializing,
    Configuring,
    Unknown,
    Adding,
    Solving,
    Satisfied,
    Unsatisfied,
    Deleting,
}

impl State {
    pub fn name(self) -> &'static str {
        match self {
            State::Initializing => "INITIALIZING",
            State::Configuring => "CONFIGURING",
            State::Unknown => "UNKNOWN",
            State::Adding => "ADDING",
            State::Solving => "SOLVING",
            State::Satisfied => "SATISFIED",
            State::Unsatisfied => "UNSATISFIED",
            State::Deleting => "DELETING",
        }
    }

    /// States in which API calls are accepted at all.
    pub fn is_valid(self) -> bool {
        !matches!(self, State::Solving | State::Deleting)
    }

    /// Valid, and no clause is half-way added.
    pub fn is_ready(self) -> bool {
        self.is_valid() && self != State::Adding
    }

    /// Options and proof tracing may only be set up before any input.
    pub fn accepts_options(self) -> bool {
        matches!(self, State::Initializing | State::Configuring)
    }
}

impl Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Result of a solving call. The numeric codes are part of the public contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Status {
    Unsolved = 0,
    Satisfiable = 10,
    Unsatisfiable = 20,
}

pub const UNSOLVED: i32 = Status::Unsolved as i32;
pub const SATISFIABLE: i32 = Status::Satisfiable as i32;
pub const UNSATISFIABLE: i32 = Status::Unsatisfiable as i32;

impl Status {
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl From<Status> for i32 {
    fn from(status: Status) -> i32 {
        status.code()
    }
}

impl TryFrom<i32> for Status {
    type Error = i32;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            UNSOLVED => Ok(Status::Unsolved),
            SATISFIABLE => Ok(Status::Satisfiable),
            UNSATISFIABLE => Ok(Status::Unsatisfiable),
            other => Err(other),
        }
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Unsolved => write!(f, "UNKNOWN"),
            Status::Satisfiable => write!(f, "SATISFIABLE"),
            Status::Unsatisfiable => write!(f, "UNSATISFIABLE"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_are_fixed() {
        assert_eq!(i32::from(Status::Unsolved), 0);
        assert_eq!(i32::from(Status::Satisfiable), 10);
        assert_eq!(i32::from(Status::Unsatisfiable), 20);
        assert_eq!(Status::try_from(20), Ok(Status::Unsatisfiable));
        assert_eq!(Status::try_from(7), Err(7));
    }

    #[test]
    fn gating() {
        assert!(State::Configuring.accepts_options());
        assert!(!State::Unknown.accepts_options());
        assert!(State::Adding.is_valid());
        assert!(!State::Adding.is_ready());
        assert!(!State::Solving.is_valid());
        assert!(!State::Deleting.is_ready());
    }
}
