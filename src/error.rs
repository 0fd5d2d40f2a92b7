//! Errors which an asynchronous result can carry instead of a value
//!
//! Every failure in this crate ends up in exactly one place: the producer of
//! the result it concerns. Errors are never thrown across watched operations,
//! so a reader blocking on a result observes either its value or one of the
//! error kinds below, and nothing else.

use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;


/// Failure outcome of an asynchronous result
///
/// Errors are cheaply clonable so that they can be forwarded unchanged from
/// an upstream result to any number of downstream continuations.
///
#[derive(Clone, Debug, Error)]
pub enum Error {
    /// The watched result did not become ready before its deadline
    #[error("wait timed out after {limit:?}")]
    WaitTimedOut { limit: Duration },

    /// The executor was stopped while the operation was still outstanding
    #[error("executor stopped before the operation completed")]
    ExecutorStopped,

    /// The producer was dropped without ever setting a value or an error
    #[error("producer dropped without setting a result")]
    BrokenPromise,

    /// User code (a continuation or a spawned task) panicked
    #[error("panicked: {0}")]
    Panicked(String),

    /// The executor's worker thread could not be spawned
    #[error("failed to spawn executor worker: {0}")]
    Spawn(Arc<io::Error>),

    /// An application-specific error, forwarded as-is
    #[error(transparent)]
    Custom(Arc<dyn StdError + Send + Sync>),
}
//
impl Error {
    /// Wrap an application-specific error
    pub fn custom<E>(error: E) -> Self
        where E: StdError + Send + Sync + 'static
    {
        Error::Custom(Arc::new(error))
    }

    /// Build an application-specific error out of a plain message
    pub fn msg(message: impl Into<String>) -> Self {
        Error::custom(Message(message.into()))
    }

    /// Truth that this is a deadline expiry
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::WaitTimedOut { .. })
    }

    /// Turn a caught panic payload into an error
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "<non-string panic payload>".to_owned()
        };
        Error::Panicked(message)
    }
}


/// Plain-text application error, used by `Error::msg()`
#[derive(Debug)]
struct Message(String);
//
impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}
//
impl StdError for Message {}


/// Result type used throughout the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;
