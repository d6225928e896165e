//! `delayq-scheduler` — polling dispatch loop over a [`Storage`](delayq_storage::Storage).
//!
//! # Overview
//!
//! [`Scheduler::schedule_in`] pushes a job with `due = now + delay`.
//! [`Scheduler::listen`] polls storage every `sleep_duration` (default 1 s),
//! runs each due job in order, then deletes it.
//!
//! | Failure                         | Effect                                           |
//! |---------------------------------|--------------------------------------------------|
//! | poll fails (I/O, bad record)    | logged, cycle abandoned, retried next cycle      |
//! | delete fails after execution    | logged, entry runs again next cycle              |
//! | due record cannot be rebuilt    | loop stops with [`SchedulerError::Reconstruction`] |

pub mod engine;
pub mod error;

pub use engine::Scheduler;
pub use error::{Result, SchedulerError};
