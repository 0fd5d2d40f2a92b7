//! Polling-based executor status monitoring
//!
//! The executor's worker thread periodically publishes a snapshot of its
//! activity. Clients only ever want the latest snapshot and should never
//! slow the worker down, so the snapshots go through a triple buffer: the
//! worker writes without waiting, and clients read whatever was last written.

use crate::status::ExecutorStatus;
use triple_buffer::{Input, Output, TripleBuffer};


/// Status board object
pub struct StatusBoard {
    /// Worker interface used to publish status updates
    publisher: StatusPublisher,

    /// Client interface used to poll the current status
    monitor: StatusMonitor,
}
//
impl StatusBoard {
    /// Create a new status board with some initial status
    pub fn new(initial_status: &ExecutorStatus) -> Self {
        let (buf_input, buf_output) = TripleBuffer::new(initial_status).split();
        StatusBoard {
            publisher: StatusPublisher { buf_input },
            monitor: StatusMonitor { buf_output },
        }
    }

    /// Split the status board into publisher and monitor objects which can be
    /// respectively sent to the worker and client threads
    pub fn split(self) -> (StatusPublisher, StatusMonitor) {
        (self.publisher, self.monitor)
    }
}


/// Worker interface, used to publish status updates
pub struct StatusPublisher {
    /// New statuses will be sent through this triple buffer
    buf_input: Input<ExecutorStatus>,
}
//
impl StatusPublisher {
    /// Publish a new status
    pub fn publish(&mut self, status: ExecutorStatus) {
        self.buf_input.write(status);
    }
}


/// Client interface, used to poll the latest published status
pub struct StatusMonitor {
    /// Current status will be read through this triple buffer
    buf_output: Output<ExecutorStatus>,
}
//
impl StatusMonitor {
    /// Access the latest published status
    pub fn status(&mut self) -> &ExecutorStatus {
        self.buf_output.read()
    }
}


/// Unit tests
#[cfg(test)]
mod tests {
    use crate::multithread::polling::*;
    use crate::status::{self, Lifecycle};

    /// Check the initial state of the status board
    #[test]
    fn initial_state() {
        let (_publisher, mut monitor) = StatusBoard::new(&status::CREATED).split();
        assert_eq!(*monitor.status(), status::CREATED);
    }

    /// Check that status changes propagate from publisher to monitor
    #[test]
    fn status_propagation() {
        let (mut publisher, mut monitor) =
            StatusBoard::new(&status::CREATED).split();
        let running = ExecutorStatus {
            lifecycle: Lifecycle::Running,
            active: 2,
            ..status::CREATED
        };
        publisher.publish(running.clone());
        assert_eq!(*monitor.status(), running);

        // Only the latest status is visible
        let stopped = ExecutorStatus {
            lifecycle: Lifecycle::Stopped,
            stopped: 2,
            ..status::CREATED
        };
        publisher.publish(running);
        publisher.publish(stopped.clone());
        assert_eq!(*monitor.status(), stopped);
    }
}
