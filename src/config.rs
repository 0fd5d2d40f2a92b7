//! Executor configuration

use std::time::Duration;


/// Default time the worker spends waiting on one operation per pass
pub const DEFAULT_POLL_SLICE: Duration = Duration::from_millis(10);

/// Default time the worker sleeps when it has nothing to poll
pub const DEFAULT_IDLE_WAIT: Duration = Duration::from_millis(10);

/// Default name of the executor's worker thread
pub const DEFAULT_THREAD_NAME: &str = "polled-executor";


/// Builder-style configuration of a `PollingExecutor`
///
/// ```rust,ignore
/// let executor = PollingExecutor::with_config(
///     ExecutorConfig::new()
///         .poll_slice(Duration::from_millis(1))
///         .thread_name("continuations")
/// );
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExecutorConfig {
    /// Bounded wait granted to each operation on every polling pass
    pub(crate) poll_slice: Duration,

    /// How long the worker parks when no operation is active
    pub(crate) idle_wait: Duration,

    /// Name given to the worker thread
    pub(crate) thread_name: String,
}
//
impl ExecutorConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        ExecutorConfig {
            poll_slice: DEFAULT_POLL_SLICE,
            idle_wait: DEFAULT_IDLE_WAIT,
            thread_name: DEFAULT_THREAD_NAME.to_owned(),
        }
    }

    /// Set the polling slice
    ///
    /// # Panics
    ///
    /// Panics if `slice` is zero, as the worker would then spin.
    ///
    pub fn poll_slice(mut self, slice: Duration) -> Self {
        assert!(!slice.is_zero(), "poll_slice must be > 0");
        self.poll_slice = slice;
        self
    }

    /// Set how long the worker parks when it has nothing to poll
    ///
    /// New registrations wake the worker up early, so this mostly bounds how
    /// often an idle worker wakes up on its own.
    ///
    pub fn idle_wait(mut self, wait: Duration) -> Self {
        self.idle_wait = wait;
        self
    }

    /// Set the name of the worker thread
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Polling slice currently configured
    pub fn get_poll_slice(&self) -> Duration {
        self.poll_slice
    }
}
//
impl Default for ExecutorConfig {
    fn default() -> Self {
        Self::new()
    }
}


/// Unit tests
#[cfg(test)]
mod tests {
    use crate::config::*;

    /// Check the default settings
    #[test]
    fn defaults() {
        let config = ExecutorConfig::default();
        assert_eq!(config.poll_slice, DEFAULT_POLL_SLICE);
        assert_eq!(config.idle_wait, DEFAULT_IDLE_WAIT);
        assert_eq!(config.thread_name, DEFAULT_THREAD_NAME);
    }

    /// Check that the builder methods override the defaults
    #[test]
    fn overrides() {
        let config = ExecutorConfig::new()
            .poll_slice(Duration::from_millis(1))
            .idle_wait(Duration::from_millis(50))
            .thread_name("worker");
        assert_eq!(config.get_poll_slice(), Duration::from_millis(1));
        assert_eq!(config.idle_wait, Duration::from_millis(50));
        assert_eq!(config.thread_name, "worker");
    }

    /// Check that a zero polling slice is refused
    #[test]
    #[should_panic(expected = "poll_slice must be > 0")]
    fn zero_slice() {
        let _ = ExecutorConfig::new().poll_slice(Duration::from_millis(0));
    }
}
