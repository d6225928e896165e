//! `delayq-core` — job contract, job registry and configuration shared by the
//! storage backends and the scheduler.
//!
//! A job variant is a serde-serializable struct implementing [`JobSpec`]. It is
//! registered once in a [`JobRegistry`], which is the [`JobFactory`] storage
//! backends use to rebuild jobs from persisted `(kind, id, payload)` triples.

pub mod config;
pub mod error;
pub mod job;
pub mod registry;

pub use config::{DelayqConfig, SchedulerConfig, StorageBackend, StorageConfig};
pub use error::{CoreError, FactoryError, Result};
pub use job::{Context, Job, JobId, JobSpec, Payload};
pub use registry::{JobFactory, JobRegistry};
