/*!
Extension points the engine calls back into during a call.

Every method here runs on the engine's own stack, possibly many times per
call. Implementations must not unwind: the engine does not expect it and
leaves its state undefined if they do.
*/

use std::{cell::Cell, rc::Rc};

use crate::formula::Literal;

/// Asked periodically whether the running call should stop.
pub trait Terminator {
    fn terminate(&mut self) -> bool;
}

/// Receives learned clauses, one literal at a time, terminated by `0`.
pub trait Learner {
    /// Whether a clause of `size` literals should be streamed.
    fn learning(&mut self, size: usize) -> bool;

    fn learn(&mut self, literal: i32);
}

/// Visits the irredundant clauses of the formula.
pub trait ClauseIterator {
    /// Returns `false` to stop the traversal.
    fn clause(&mut self, clause: &[i32]) -> bool;
}

/// Visits the `(clause, witness)` pairs of the extension stack.
pub trait WitnessIterator {
    /// Returns `false` to stop the traversal.
    fn witness(&mut self, clause: &[i32], witness: &[i32]) -> bool;
}

impl<F: FnMut() -> bool> Terminator for F {
    fn terminate(&mut self) -> bool {
        self()
    }
}

impl<F: FnMut(&[i32]) -> bool> ClauseIterator for F {
    fn clause(&mut self, clause: &[i32]) -> bool {
        self(clause)
    }
}

impl<F: FnMut(&[i32], &[i32]) -> bool> WitnessIterator for F {
    fn witness(&mut self, clause: &[i32], witness: &[i32]) -> bool {
        self(clause, witness)
    }
}

/// The terminator and learner lent to the engine for the duration of one call.
#[derive(Default)]
pub struct Hooks<'a> {
    pub terminator: Option<&'a mut dyn Terminator>,
    pub learner: Option<&'a mut dyn Learner>,
}

impl<'a> Hooks<'a> {
    pub fn new(
        terminator: Option<&'a mut dyn Terminator>,
        learner: Option<&'a mut dyn Learner>,
    ) -> Self {
        Hooks {
            terminator,
            learner,
        }
    }

    pub(crate) fn terminate(&mut self) -> bool {
        match self.terminator.as_mut() {
            Some(terminator) => terminator.terminate(),
            None => false,
        }
    }

    /// Streams a derived clause to the learner, if one is connected and wants it.
    pub(crate) fn export(&mut self, clause: &[Literal]) {
        if let Some(learner) = self.learner.as_mut() {
            if learner.learning(clause.len()) {
                for literal in clause {
                    learner.learn(literal.to_dimacs());
                }
                learner.learn(0);
            }
        }
    }
}

/// Forces the engine to stop at its next poll.
///
/// Cloneable so a callback can request termination while the engine itself
/// is mutably borrowed by the running call. Cleared when that call returns.
#[derive(Debug, Clone, Default)]
pub struct TerminationHandle(Rc<Cell<bool>>);

impl TerminationHandle {
    pub fn request(&self) {
        self.0.set(true);
    }

    pub fn is_requested(&self) -> bool {
        self.0.get()
    }

    pub(crate) fn clear(&self) {
        self.0.set(false);
    }
}
