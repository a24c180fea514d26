/*!
Engine-facing wrappers around host callbacks.

Each adapter runs its callback through the shared [`ErrorChannel`] and
answers the engine with a safe default when the callback fails, or when an
earlier failure is already pending.
*/

use std::rc::Rc;

use crate::engine::{ClauseIterator, Learner, TerminationHandle, Terminator, WitnessIterator};

use super::{
    channel::{CallbackResult, ErrorChannel},
    interrupt::InterruptSource,
};

/// Asks the host whether to stop. Any failure means "stop".
pub struct TerminatorAdapter<F> {
    errors: Rc<ErrorChannel>,
    callback: F,
}

impl<F> TerminatorAdapter<F>
where
    F: FnMut() -> CallbackResult<bool>,
{
    pub fn new(errors: Rc<ErrorChannel>, callback: F) -> Self {
        TerminatorAdapter { errors, callback }
    }
}

impl<F> Terminator for TerminatorAdapter<F>
where
    F: FnMut() -> CallbackResult<bool>,
{
    fn terminate(&mut self) -> bool {
        if self.errors.is_pending() {
            return true;
        }
        let callback = &mut self.callback;
        self.errors.guard(|| callback()).unwrap_or(true)
    }
}

/// Polls an [`InterruptSource`] from the terminator slot.
pub struct InterruptAdapter<S> {
    errors: Rc<ErrorChannel>,
    source: S,
}

impl<S: InterruptSource> InterruptAdapter<S> {
    pub fn new(errors: Rc<ErrorChannel>, source: S) -> Self {
        InterruptAdapter { errors, source }
    }
}

impl<S: InterruptSource> Terminator for InterruptAdapter<S> {
    fn terminate(&mut self) -> bool {
        if self.errors.is_pending() {
            return true;
        }
        let source = &mut self.source;
        self.errors.guard(|| source.check()).is_none()
    }
}

/// Streams learned clauses to the host.
///
/// The engine does not poll a learner, so a failure also requests
/// termination through the engine's handle.
pub struct LearnerAdapter<L, F> {
    errors: Rc<ErrorChannel>,
    termination: TerminationHandle,
    learning: L,
    learn: F,
}

impl<L, F> LearnerAdapter<L, F>
where
    L: FnMut(usize) -> CallbackResult<bool>,
    F: FnMut(i32) -> CallbackResult<()>,
{
    pub fn new(
        errors: Rc<ErrorChannel>,
        termination: TerminationHandle,
        learning: L,
        learn: F,
    ) -> Self {
        LearnerAdapter {
            errors,
            termination,
            learning,
            learn,
        }
    }
}

impl<L, F> Learner for LearnerAdapter<L, F>
where
    L: FnMut(usize) -> CallbackResult<bool>,
    F: FnMut(i32) -> CallbackResult<()>,
{
    fn learning(&mut self, size: usize) -> bool {
        if self.errors.is_pending() {
            return false;
        }
        let learning = &mut self.learning;
        match self.errors.guard(|| learning(size)) {
            Some(wanted) => wanted,
            None => {
                self.termination.request();
                false
            }
        }
    }

    fn learn(&mut self, literal: i32) {
        if self.errors.is_pending() {
            return;
        }
        let learn = &mut self.learn;
        if self.errors.guard(|| learn(literal)).is_none() {
            self.termination.request();
        }
    }
}

/// Visits clauses for the host. A failure stops the traversal.
pub struct ClauseVisitor<'a, F> {
    errors: &'a ErrorChannel,
    callback: F,
}

impl<'a, F> ClauseVisitor<'a, F>
where
    F: FnMut(&[i32]) -> CallbackResult<bool>,
{
    pub fn new(errors: &'a ErrorChannel, callback: F) -> Self {
        ClauseVisitor { errors, callback }
    }
}

impl<F> ClauseIterator for ClauseVisitor<'_, F>
where
    F: FnMut(&[i32]) -> CallbackResult<bool>,
{
    fn clause(&mut self, clause: &[i32]) -> bool {
        if self.errors.is_pending() {
            return false;
        }
        let callback = &mut self.callback;
        self.errors.guard(|| callback(clause)).unwrap_or(false)
    }
}

/// Visits extension-stack entries for the host. A failure stops the traversal.
pub struct WitnessVisitor<'a, F> {
    errors: &'a ErrorChannel,
    callback: F,
}

impl<'a, F> WitnessVisitor<'a, F>
where
    F: FnMut(&[i32], &[i32]) -> CallbackResult<bool>,
{
    pub fn new(errors: &'a ErrorChannel, callback: F) -> Self {
        WitnessVisitor { errors, callback }
    }
}

impl<F> WitnessIterator for WitnessVisitor<'_, F>
where
    F: FnMut(&[i32], &[i32]) -> CallbackResult<bool>,
{
    fn witness(&mut self, clause: &[i32], witness: &[i32]) -> bool {
        if self.errors.is_pending() {
            return false;
        }
        let callback = &mut self.callback;
        self.errors
            .guard(|| callback(clause, witness))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::interrupt::InterruptFlag;

    #[test]
    fn terminator_stops_on_failure() {
        let errors = Rc::new(ErrorChannel::default());
        let mut calls = 0;
        let mut adapter = TerminatorAdapter::new(Rc::clone(&errors), move || {
            calls += 1;
            if calls == 2 {
                Err("second call".into())
            } else {
                Ok(false)
            }
        });
        assert!(!adapter.terminate());
        assert!(adapter.terminate());
        assert!(adapter.terminate());
        assert_eq!(errors.rethrow().unwrap_err().to_string(), "second call");
    }

    #[test]
    fn learner_requests_termination() {
        let errors = Rc::new(ErrorChannel::default());
        let termination = TerminationHandle::default();
        let mut seen = Vec::new();
        {
            let mut adapter = LearnerAdapter::new(
                Rc::clone(&errors),
                termination.clone(),
                |size| Ok(size < 3),
                |literal| {
                    seen.push(literal);
                    if literal == 0 {
                        Err("rejected".into())
                    } else {
                        Ok(())
                    }
                },
            );
            assert!(adapter.learning(2));
            adapter.learn(4);
            adapter.learn(0);
            assert!(!adapter.learning(1));
            adapter.learn(5);
        }
        assert_eq!(seen, vec![4, 0]);
        assert!(termination.is_requested());
        assert!(errors.is_pending());
    }

    #[test]
    fn interrupt_adapter_reports_flag() {
        let errors = Rc::new(ErrorChannel::default());
        let flag = InterruptFlag::new();
        let mut adapter = InterruptAdapter::new(Rc::clone(&errors), flag.clone());
        assert!(!adapter.terminate());
        flag.raise();
        assert!(adapter.terminate());
        assert!(errors.rethrow().unwrap_err().is_interrupt());
    }

    #[test]
    fn visitor_stops_after_failure() {
        let errors = ErrorChannel::default();
        let mut visited = 0;
        let mut visitor = ClauseVisitor::new(&errors, |clause: &[i32]| {
            visited += 1;
            if clause.is_empty() {
                Err("empty clause".into())
            } else {
                Ok(true)
            }
        });
        assert!(visitor.clause(&[1, 2]));
        assert!(!visitor.clause(&[]));
        assert!(!visitor.clause(&[3]));
        drop(visitor);
        assert_eq!(visited, 2);
        assert!(errors.is_pending());
    }
}
