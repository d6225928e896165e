use std::{
    ffi::OsString,
    fs, io,
    marker::PhantomData,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use chrono::{DateTime, Utc};
use delayq_core::{Job, JobFactory, JobId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    error::{Result, StorageError},
    storage::{check_due_time, new_job_id, rebuild, Storage},
};

/// One element of the JSON array kept in the state file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FileEntry {
    #[serde(rename = "ID")]
    id: JobId,
    #[serde(rename = "Time")]
    time: DateTime<Utc>,
    #[serde(rename = "State")]
    state: serde_json::Value,
    #[serde(rename = "Type")]
    kind: String,
}

/// Flat-file storage: the whole schedule is one JSON array in one file.
///
/// Every operation reads and decodes the full file, mutates it in memory and
/// rewrites it. Operations through one `FileStorage` are serialized by an
/// internal lock. Two instances (or processes) pointed at the same file are
/// not coordinated and can lose each other's writes.
pub struct FileStorage<C> {
    path: PathBuf,
    factory: Arc<dyn JobFactory<C>>,
    lock: Mutex<()>,
    _ctx: PhantomData<fn(C)>,
}

impl<C> FileStorage<C> {
    /// The file need not exist yet; it is created on the first write.
    pub fn new(path: impl Into<PathBuf>, factory: Arc<dyn JobFactory<C>>) -> Self {
        Self {
            path: path.into(),
            factory,
            lock: Mutex::new(()),
            _ctx: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// An absent or blank file reads as an empty schedule.
    fn read_entries(&self) -> Result<Vec<FileEntry>> {
        let content = match fs::read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if content.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_slice(&content)?)
    }

    /// Write to a sibling temp file, then rename it over the target.
    fn write_entries(&self, entries: &[FileEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_vec(entries)?;
        let tmp = self.tmp_path();
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("delayq"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.lock.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

impl<C: 'static> Storage<C> for FileStorage<C> {
    fn push(&self, job: &mut dyn Job<C>, due_at: DateTime<Utc>) -> Result<JobId> {
        check_due_time(due_at)?;
        let _guard = self.guard()?;
        let mut entries = self.read_entries()?;

        let id = new_job_id();
        entries.push(FileEntry {
            id: id.clone(),
            time: due_at,
            state: job.state_with_id(&id)?,
            kind: job.kind().to_string(),
        });
        self.write_entries(&entries)?;
        job.set_id(id.clone());

        info!(job_id = %id, kind = %job.kind(), %due_at, "job pushed");
        Ok(id)
    }

    fn delete(&self, id: &JobId) -> Result<()> {
        let _guard = self.guard()?;
        let mut entries = self.read_entries()?;

        match entries.iter().position(|e| &e.id == id) {
            Some(index) => {
                entries.remove(index);
                self.write_entries(&entries)?;
                info!(job_id = %id, "job deleted");
            }
            None => debug!(job_id = %id, "delete: no such entry"),
        }
        Ok(())
    }

    fn get_due(&self, now: DateTime<Utc>) -> Result<Vec<Box<dyn Job<C>>>> {
        let mut due: Vec<FileEntry> = {
            let _guard = self.guard()?;
            self.read_entries()?
                .into_iter()
                .filter(|e| e.time <= now)
                .collect()
        };

        debug!(count = due.len(), "due entries fetched");

        // Stable sort keeps file order among equal due times.
        due.sort_by_key(|e| e.time);
        due.into_iter()
            .map(|e| rebuild(self.factory.as_ref(), &e.kind, e.id, e.state))
            .collect()
    }

    fn len(&self) -> Result<usize> {
        let _guard = self.guard()?;
        Ok(self.read_entries()?.len())
    }
}
