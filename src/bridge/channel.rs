/*!
Deferred error channel between host callbacks and the facade.

A callback that fails while the engine is running cannot unwind through it.
Its error (or panic payload) is parked here and re-raised by the facade once
the engine call has returned.
*/

use std::{
    any::Any,
    cell::RefCell,
    error::Error as StdError,
    fmt::Display,
    panic::{self, AssertUnwindSafe},
};

use super::interrupt::Interrupted;

/// Error type host callbacks report.
pub type HostError = Box<dyn StdError + Send + Sync + 'static>;

/// What a host callback returns.
pub type CallbackResult<T> = Result<T, HostError>;

/// A failure captured inside a callback.
pub enum Deferred {
    Raised(HostError),
    Panicked(Box<dyn Any + Send + 'static>),
}

impl std::fmt::Debug for Deferred {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Deferred::Raised(error) => f.debug_tuple("Raised").field(error).finish(),
            Deferred::Panicked(_) => f.write_str("Panicked(..)"),
        }
    }
}

/// A host error re-raised after the engine call it interrupted.
#[derive(Debug)]
pub struct CallbackError(HostError);

impl CallbackError {
    pub fn get_ref(&self) -> &(dyn StdError + Send + Sync + 'static) {
        &*self.0
    }

    pub fn into_inner(self) -> HostError {
        self.0
    }

    pub fn downcast_ref<T: StdError + 'static>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Whether the callback reported a host interrupt.
    pub fn is_interrupt(&self) -> bool {
        self.0.is::<Interrupted>()
    }
}

impl Display for CallbackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StdError for CallbackError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

/// Holds at most one pending failure.
///
/// The first failure wins. Later ones are dropped, since the engine is
/// already being driven to stop when the first one arrives.
#[derive(Debug, Default)]
pub struct ErrorChannel {
    slot: RefCell<Option<Deferred>>,
}

impl ErrorChannel {
    pub fn set(&self, failure: Deferred) {
        let mut slot = self.slot.borrow_mut();
        match slot.as_ref() {
            Some(pending) => debug!("dropping {:?}, {:?} is already pending", failure, pending),
            None => *slot = Some(failure),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.slot.borrow().is_some()
    }

    pub fn take(&self) -> Option<Deferred> {
        self.slot.borrow_mut().take()
    }

    /// Empties the channel, resuming a captured panic or returning a captured error.
    pub fn rethrow(&self) -> Result<(), CallbackError> {
        match self.take() {
            None => Ok(()),
            Some(Deferred::Raised(error)) => Err(CallbackError(error)),
            Some(Deferred::Panicked(payload)) => panic::resume_unwind(payload),
        }
    }

    /// Runs a host callback, parking its error or panic in the channel.
    /// Returns `None` if the callback failed.
    pub fn guard<T>(&self, callback: impl FnOnce() -> CallbackResult<T>) -> Option<T> {
        match panic::catch_unwind(AssertUnwindSafe(callback)) {
            Ok(Ok(value)) => Some(value),
            Ok(Err(error)) => {
                debug!("host callback failed: {}", error);
                self.set(Deferred::Raised(error));
                None
            }
            Err(payload) => {
                debug!("host callback panicked");
                self.set(Deferred::Panicked(payload));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(message: &str) -> CallbackResult<()> {
        Err(message.into())
    }

    #[test]
    fn first_failure_wins() {
        let channel = ErrorChannel::default();
        assert_eq!(channel.guard(|| failure("first")), None);
        assert_eq!(channel.guard(|| failure("second")), None);
        assert!(channel.is_pending());

        let error = channel.rethrow().unwrap_err();
        assert_eq!(error.to_string(), "first");
        assert!(!channel.is_pending());
        assert!(channel.rethrow().is_ok());
    }

    #[test]
    fn successful_callbacks_pass_through() {
        let channel = ErrorChannel::default();
        assert_eq!(channel.guard(|| Ok(42)), Some(42));
        assert!(!channel.is_pending());
    }

    #[test]
    fn panics_are_resumed() {
        let channel = ErrorChannel::default();
        let guarded: Option<()> = channel.guard(|| panic!("boom"));
        assert_eq!(guarded, None);
        assert!(channel.is_pending());

        let resumed = panic::catch_unwind(AssertUnwindSafe(|| channel.rethrow()));
        let payload = resumed.unwrap_err();
        assert_eq!(payload.downcast_ref::<&str>(), Some(&"boom"));
    }

    #[test]
    fn interrupts_are_recognized() {
        let channel = ErrorChannel::default();
        channel.guard::<()>(|| Err(Box::new(Interrupted)));
        assert!(channel.rethrow().unwrap_err().is_interrupt());
    }
}
