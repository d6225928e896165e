use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use delayq_core::{Job, JobFactory, JobId, Payload};
use uuid::Uuid;

use crate::error::{Result, StorageError};

/// Persistence contract shared by every backend.
///
/// Entries are either present (scheduled) or absent (gone); there is no
/// claimed or failed state in between.
pub trait Storage<C>: Send + Sync {
    /// Assign `job` a fresh id, serialize it and record it as due at `due_at`.
    ///
    /// The entry is either fully persisted or not persisted at all. The id is
    /// set on `job` only after the write succeeds. Due times outside years
    /// 0000-9999 are rejected with [`StorageError::DueTimeOutOfRange`].
    fn push(&self, job: &mut dyn Job<C>, due_at: DateTime<Utc>) -> Result<JobId>;

    /// Remove the entry with `id`. Removing an absent entry succeeds.
    fn delete(&self, id: &JobId) -> Result<()>;

    /// Rebuild every entry due at or before `now` (inclusive).
    ///
    /// Order is by due time, then insertion order. Entries are left in place.
    fn get_due(&self, now: DateTime<Utc>) -> Result<Vec<Box<dyn Job<C>>>>;

    /// Number of entries currently present.
    fn len(&self) -> Result<usize>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl<C, S> Storage<C> for Arc<S>
where
    S: Storage<C> + ?Sized,
{
    fn push(&self, job: &mut dyn Job<C>, due_at: DateTime<Utc>) -> Result<JobId> {
        (**self).push(job, due_at)
    }

    fn delete(&self, id: &JobId) -> Result<()> {
        (**self).delete(id)
    }

    fn get_due(&self, now: DateTime<Utc>) -> Result<Vec<Box<dyn Job<C>>>> {
        (**self).get_due(now)
    }

    fn len(&self) -> Result<usize> {
        (**self).len()
    }
}

impl<C, S> Storage<C> for Box<S>
where
    S: Storage<C> + ?Sized,
{
    fn push(&self, job: &mut dyn Job<C>, due_at: DateTime<Utc>) -> Result<JobId> {
        (**self).push(job, due_at)
    }

    fn delete(&self, id: &JobId) -> Result<()> {
        (**self).delete(id)
    }

    fn get_due(&self, now: DateTime<Utc>) -> Result<Vec<Box<dyn Job<C>>>> {
        (**self).get_due(now)
    }

    fn len(&self) -> Result<usize> {
        (**self).len()
    }
}

pub(crate) fn check_due_time(due_at: DateTime<Utc>) -> Result<()> {
    if (0..=9999).contains(&due_at.year()) {
        Ok(())
    } else {
        Err(StorageError::DueTimeOutOfRange(due_at))
    }
}

pub(crate) fn new_job_id() -> JobId {
    JobId::new(Uuid::new_v4().to_string())
}

/// Hand a decoded record to the factory.
///
/// The state must be a JSON object; its fields become the payload.
pub(crate) fn rebuild<C>(
    factory: &dyn JobFactory<C>,
    kind: &str,
    id: JobId,
    state: serde_json::Value,
) -> Result<Box<dyn Job<C>>> {
    let payload: Payload = match state {
        serde_json::Value::Object(map) => map,
        other => {
            return Err(StorageError::MalformedRecord {
                id,
                reason: format!("state is not an object: {other}"),
            })
        }
    };
    factory
        .instantiate(kind, id.clone(), payload)
        .map_err(|source| StorageError::Reconstruction { id, source })
}
