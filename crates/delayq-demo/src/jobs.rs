//! Sample job variants and the registry that knows how to rebuild them.

use std::sync::Arc;

use async_trait::async_trait;
use delayq_core::{JobId, JobRegistry, JobSpec};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::services::Mailer;

/// Execution context shared by every job.
#[derive(Clone)]
pub struct Deps {
    pub mailer: Arc<dyn Mailer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Greet {
    #[serde(default)]
    pub id: JobId,
    pub message: String,
}

#[async_trait]
impl JobSpec<Deps> for Greet {
    const KIND: &'static str = "greet";

    fn id(&self) -> &JobId {
        &self.id
    }

    fn set_id(&mut self, id: JobId) {
        self.id = id;
    }

    async fn execute(&self, _deps: Deps) {
        info!(job_id = %self.id, message = %self.message, "greet job running");
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    #[serde(default)]
    pub id: JobId,
    pub answer: i64,
}

#[async_trait]
impl JobSpec<Deps> for Answer {
    const KIND: &'static str = "answer";

    fn id(&self) -> &JobId {
        &self.id
    }

    fn set_id(&mut self, id: JobId) {
        self.id = id;
    }

    async fn execute(&self, _deps: Deps) {
        info!(job_id = %self.id, answer = self.answer, "answer job running");
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailJob {
    #[serde(default)]
    pub id: JobId,
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
impl JobSpec<Deps> for EmailJob {
    const KIND: &'static str = "email";

    fn id(&self) -> &JobId {
        &self.id
    }

    fn set_id(&mut self, id: JobId) {
        self.id = id;
    }

    async fn execute(&self, deps: Deps) {
        match deps.mailer.send_email(&self.to, &self.subject, &self.body) {
            Ok(()) => info!(job_id = %self.id, to = %self.to, "email sent"),
            // No retry: the scheduler deletes the entry either way.
            Err(e) => warn!(job_id = %self.id, to = %self.to, error = %e, "email not sent"),
        }
    }
}

pub fn registry() -> JobRegistry<Deps> {
    JobRegistry::new()
        .with::<Greet>()
        .with::<Answer>()
        .with::<EmailJob>()
}
