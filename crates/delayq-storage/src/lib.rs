//! `delayq-storage` — persistence for scheduled jobs.
//!
//! # Backends
//!
//! | Backend         | Layout                                        | Concurrent pushes        |
//! |-----------------|-----------------------------------------------|--------------------------|
//! | [`SqliteStorage`] | one row per entry: `id`, `time`, `state`, `type` | safe                     |
//! | [`FileStorage`]   | one JSON array `[{ID, Time, State, Type}]`    | safe within one instance |
//!
//! Both implement [`Storage`]: `push` assigns a fresh UUID and persists the
//! serialized job, `get_due` rebuilds every entry due at or before `now`
//! through the [`JobFactory`](delayq_core::JobFactory), `delete` removes an
//! entry and treats a missing one as success.

pub mod db;
pub mod error;
pub mod file;
pub mod sqlite;
pub mod storage;

pub use error::{Result, StorageError};
pub use file::FileStorage;
pub use sqlite::SqliteStorage;
pub use storage::Storage;
