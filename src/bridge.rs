/*!
Glue between host callbacks and the engine's extension points.
*/

pub mod adapters;
pub mod channel;
pub mod interrupt;

pub use self::channel::{CallbackError, CallbackResult, Deferred, ErrorChannel, HostError};
pub use self::interrupt::{InterruptFlag, InterruptSource, Interrupted};
