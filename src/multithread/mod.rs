//! Multithreaded synchronization building blocks
//!
//! Two mechanisms are provided, both designed for a producer thread and a
//! consumer thread living in the same OS process:
//!
//! - Blocking result slots carry the outcome of one asynchronous operation.
//!   Readers can check for readiness with a bounded wait, which is all the
//!   executor needs in order to poll many of them from a single thread.
//! - Polling status boards let a worker publish snapshots of its activity
//!   which clients can read at any time without synchronizing with it.

pub mod blocking;
pub mod polling;
