use std::{
    error::Error as StdError,
    fmt::Display,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use super::channel::CallbackResult;

/// Reported by an interrupt source when the host asked to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interrupted;

impl Display for Interrupted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "interrupted by the host")
    }
}

impl StdError for Interrupted {}

/// The host's pending-interrupt check, polled through the terminator slot.
pub trait InterruptSource {
    /// Fails with the error to re-raise once the engine has stopped.
    fn check(&mut self) -> CallbackResult<()>;
}

impl<F: FnMut() -> CallbackResult<()>> InterruptSource for F {
    fn check(&mut self) -> CallbackResult<()> {
        self()
    }
}

/// Interrupt request shared with other threads, e.g. a signal handler or a timer.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    pub fn new() -> Self {
        InterruptFlag::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl InterruptSource for InterruptFlag {
    /// Consumes a raised flag, reporting it as [`Interrupted`].
    fn check(&mut self) -> CallbackResult<()> {
        if self.0.swap(false, Ordering::SeqCst) {
            Err(Box::new(Interrupted))
        } else {
            Ok(())
        }
    }
}
