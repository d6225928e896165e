// Shared jobs and storage contract checks, run against every backend.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use delayq_core::{FactoryError, Job, JobId, JobRegistry, JobSpec};
use delayq_storage::{Storage, StorageError};
use serde::{Deserialize, Serialize};

#[derive(Clone, Default)]
pub struct Ctx {
    pub ran: Arc<Mutex<Vec<String>>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Greet {
    #[serde(default)]
    pub id: JobId,
    pub name: String,
}

#[async_trait]
impl JobSpec<Ctx> for Greet {
    const KIND: &'static str = "greet";

    fn id(&self) -> &JobId {
        &self.id
    }

    fn set_id(&mut self, id: JobId) {
        self.id = id;
    }

    async fn execute(&self, ctx: Ctx) {
        ctx.ran.lock().unwrap().push(format!("greet:{}", self.name));
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    #[serde(default)]
    pub id: JobId,
    pub answer: i64,
    pub tags: Vec<String>,
    pub note: Option<String>,
}

#[async_trait]
impl JobSpec<Ctx> for Answer {
    const KIND: &'static str = "answer";

    fn id(&self) -> &JobId {
        &self.id
    }

    fn set_id(&mut self, id: JobId) {
        self.id = id;
    }

    async fn execute(&self, ctx: Ctx) {
        ctx.ran.lock().unwrap().push(format!("answer:{}", self.answer));
    }
}

/// Never registered, so it can be pushed but not rebuilt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Orphan {
    #[serde(default)]
    pub id: JobId,
}

#[async_trait]
impl JobSpec<Ctx> for Orphan {
    const KIND: &'static str = "orphan";

    fn id(&self) -> &JobId {
        &self.id
    }

    fn set_id(&mut self, id: JobId) {
        self.id = id;
    }

    async fn execute(&self, _ctx: Ctx) {}
}

pub fn registry() -> Arc<JobRegistry<Ctx>> {
    Arc::new(JobRegistry::new().with::<Greet>().with::<Answer>())
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap()
}

pub fn greet(name: &str) -> Greet {
    Greet {
        id: JobId::default(),
        name: name.to_string(),
    }
}

fn names(jobs: &[Box<dyn Job<Ctx>>]) -> Vec<String> {
    jobs.iter()
        .map(|j| j.state().unwrap()["name"].as_str().unwrap().to_string())
        .collect()
}

pub fn push_assigns_fresh_ids(s: &dyn Storage<Ctx>) {
    let mut a = greet("a");
    let mut b = greet("b");
    let id_a = s.push(&mut a, t0()).unwrap();
    let id_b = s.push(&mut b, t0()).unwrap();

    assert!(!id_a.is_empty());
    assert_ne!(id_a, id_b);
    assert_eq!(a.id, id_a);
    assert_eq!(b.id, id_b);
    assert_eq!(s.len().unwrap(), 2);
}

pub fn due_boundary_is_inclusive(s: &dyn Storage<Ctx>) {
    let mut now = greet("now");
    let mut later = greet("later");
    s.push(&mut now, t0()).unwrap();
    s.push(&mut later, t0() + Duration::nanoseconds(1)).unwrap();

    assert_eq!(names(&s.get_due(t0()).unwrap()), vec!["now"]);
    assert!(s.get_due(t0() - Duration::seconds(1)).unwrap().is_empty());
    // Polling leaves entries in place.
    assert_eq!(s.len().unwrap(), 2);
    assert_eq!(
        names(&s.get_due(t0() + Duration::seconds(1)).unwrap()),
        vec!["now", "later"]
    );
}

pub fn round_trip_preserves_fields(s: &dyn Storage<Ctx>) {
    let mut job = Answer {
        id: JobId::default(),
        answer: 42,
        tags: vec!["x".to_string(), "y".to_string()],
        note: None,
    };
    let id = s.push(&mut job, t0()).unwrap();

    let due = s.get_due(t0()).unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].kind(), "answer");
    assert_eq!(due[0].id(), &id);

    let back: Answer = serde_json::from_value(due[0].state().unwrap()).unwrap();
    assert_eq!(back, job);
}

pub fn delete_is_idempotent(s: &dyn Storage<Ctx>) {
    let mut keep = greet("keep");
    let mut gone = greet("gone");
    s.push(&mut keep, t0()).unwrap();
    let id = s.push(&mut gone, t0()).unwrap();

    s.delete(&id).unwrap();
    s.delete(&id).unwrap();
    s.delete(&JobId::new("never-existed")).unwrap();

    assert_eq!(s.len().unwrap(), 1);
    assert_eq!(names(&s.get_due(t0()).unwrap()), vec!["keep"]);
}

pub fn equal_due_times_come_together(s: &dyn Storage<Ctx>) {
    for name in ["one", "two", "three"] {
        s.push(&mut greet(name), t0()).unwrap();
    }
    s.push(&mut greet("early"), t0() - Duration::minutes(5)).unwrap();

    let first = names(&s.get_due(t0()).unwrap());
    assert_eq!(first, vec!["early", "one", "two", "three"]);
    // Same call, same order.
    assert_eq!(names(&s.get_due(t0()).unwrap()), first);
}

pub fn unknown_kind_is_fatal(s: &dyn Storage<Ctx>) {
    s.push(&mut Orphan::default(), t0()).unwrap();

    let err = s.get_due(t0()).unwrap_err();
    assert!(err.is_fatal());
    match err {
        StorageError::Reconstruction {
            source: FactoryError::UnknownKind { kind },
            ..
        } => assert_eq!(kind, "orphan"),
        other => panic!("expected reconstruction error, got {other}"),
    }
    // The record is not dropped.
    assert_eq!(s.len().unwrap(), 1);
}

pub fn far_future_is_rejected(s: &dyn Storage<Ctx>) {
    let mut far = greet("far");
    let due = Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap();

    let err = s.push(&mut far, due).unwrap_err();
    assert!(matches!(err, StorageError::DueTimeOutOfRange(t) if t == due));
    assert!(far.id.is_empty());
    assert_eq!(s.len().unwrap(), 0);

    // The last accepted year still sorts after now.
    let last = Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59).unwrap();
    s.push(&mut greet("last"), last).unwrap();
    assert!(s.get_due(Utc::now()).unwrap().is_empty());
    assert_eq!(names(&s.get_due(last).unwrap()), vec!["last"]);
}

pub fn negative_year_is_rejected(s: &dyn Storage<Ctx>) {
    let due = Utc.with_ymd_and_hms(-1, 6, 1, 0, 0, 0).unwrap();
    let err = s.push(&mut greet("ancient"), due).unwrap_err();
    assert!(matches!(err, StorageError::DueTimeOutOfRange(_)));
    assert_eq!(s.len().unwrap(), 0);
}
