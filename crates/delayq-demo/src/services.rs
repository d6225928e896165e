//! Services handed to jobs through [`Deps`](crate::jobs::Deps).

use std::sync::Mutex;

use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("SMTP service unavailable: {0}")]
    Unavailable(String),
}

pub trait Mailer: Send + Sync {
    fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

/// Logs instead of sending, and remembers every recipient.
#[derive(Default)]
pub struct MockMailer {
    sent: Mutex<Vec<String>>,
}

impl MockMailer {
    pub fn sent(&self) -> Vec<String> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

impl Mailer for MockMailer {
    fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        info!(%to, %subject, body_len = body.len(), "mock SMTP: email sent");
        self.sent
            .lock()
            .map_err(|_| MailError::Unavailable("mailbox lock poisoned".to_string()))?
            .push(to.to_string());
        Ok(())
    }
}
