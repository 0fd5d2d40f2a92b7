//! Continuations for passive asynchronous results
//!
//! Picture yourself in a situation where: you have delegated work to a
//! thread, a device, or a remote server, and all you got back is a handle
//! which you can either wait on or poll. You would like to say "once this is
//! done, do that", and to build pipelines of such steps, without dedicating a
//! thread to each wait and without risking a hang if some step never
//! completes.
//!
//! This crate provides exactly that. An `Executor` watches any number of
//! pending results on your behalf, and the composition entry points of the
//! `then` module register continuations on them:
//!
//! ```rust,ignore
//! let executor: Arc<dyn Executor> = Arc::new(PollingExecutor::new(Duration::from_millis(10)));
//! let chain = Chain::on(executor);
//! let text = chain.then(AsyncResult::spawn(|| 1821), |r| r.get().unwrap().to_string())?;
//! assert_eq!(text.get()?, "1821");
//! ```
//!
//! Every watched operation carries a deadline (one hour unless specified
//! otherwise), so a result built this way always ends up holding either a
//! value or an error: indefinite hangs become explicit timeout errors.

pub mod all;
pub mod client;
pub mod config;
pub mod defaults;
pub mod error;
pub mod executor;
pub mod multithread;
pub mod server;
pub mod status;
pub mod then;
pub mod watched;

pub use crate::all::all;
pub use crate::client::{AsyncResult, Pollable, SharedAsyncResult};
pub use crate::config::ExecutorConfig;
pub use crate::error::{Error, Result};
pub use crate::executor::inline::InlineExecutor;
pub use crate::executor::polling::PollingExecutor;
pub use crate::executor::{Executor, Rejected};
pub use crate::multithread::blocking::Promise;
pub use crate::server::AsyncProducer;
pub use crate::status::{ExecutorStatus, Lifecycle};
pub use crate::then::{then, then_flatten, try_then, Chain, DEFAULT_TIME_LIMIT};
pub use crate::watched::{Deadline, Forward, WatchedOperation};
