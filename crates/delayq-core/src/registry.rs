use std::collections::HashMap;

use tracing::warn;

use crate::{
    error::FactoryError,
    job::{Context, Job, JobId, JobSpec, Payload},
};

/// Rebuilds a concrete job from a persisted `(kind, id, payload)` triple.
///
/// Storage backends hold one of these and call it on every due record.
pub trait JobFactory<C>: Send + Sync {
    fn instantiate(
        &self,
        kind: &str,
        id: JobId,
        payload: Payload,
    ) -> Result<Box<dyn Job<C>>, FactoryError>;
}

type Constructor<C> = fn(JobId, Payload) -> Result<Box<dyn Job<C>>, FactoryError>;

/// Table of `kind -> constructor` entries, built once at startup.
pub struct JobRegistry<C> {
    constructors: HashMap<&'static str, Constructor<C>>,
}

impl<C: Context> JobRegistry<C> {
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Register variant `T` under its [`JobSpec::KIND`].
    ///
    /// A second registration of the same kind replaces the first.
    pub fn register<T: JobSpec<C>>(&mut self) -> &mut Self {
        if self
            .constructors
            .insert(T::KIND, construct::<C, T>)
            .is_some()
        {
            warn!(kind = T::KIND, "job kind registered twice; keeping the latest");
        }
        self
    }

    /// Builder-style variant of [`register`](Self::register).
    pub fn with<T: JobSpec<C>>(mut self) -> Self {
        self.register::<T>();
        self
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }

    /// Registered kinds, sorted.
    pub fn kinds(&self) -> Vec<&'static str> {
        let mut kinds: Vec<_> = self.constructors.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }
}

impl<C: Context> Default for JobRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Context> JobFactory<C> for JobRegistry<C> {
    fn instantiate(
        &self,
        kind: &str,
        id: JobId,
        payload: Payload,
    ) -> Result<Box<dyn Job<C>>, FactoryError> {
        let construct = self
            .constructors
            .get(kind)
            .ok_or_else(|| FactoryError::UnknownKind {
                kind: kind.to_string(),
            })?;
        construct(id, payload)
    }
}

fn construct<C: Context, T: JobSpec<C>>(
    id: JobId,
    payload: Payload,
) -> Result<Box<dyn Job<C>>, FactoryError> {
    let mut job: T = serde_json::from_value(serde_json::Value::Object(payload)).map_err(
        |source| FactoryError::InvalidPayload {
            kind: T::KIND.to_string(),
            source,
        },
    )?;
    // The storage-assigned id wins over whatever the payload carried.
    <T as JobSpec<C>>::set_id(&mut job, id);
    Ok(Box::new(job))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Serialize, Deserialize)]
    struct Answer {
        #[serde(default)]
        id: JobId,
        answer: i64,
    }

    #[async_trait]
    impl JobSpec<()> for Answer {
        const KIND: &'static str = "answer";

        fn id(&self) -> &JobId {
            &self.id
        }

        fn set_id(&mut self, id: JobId) {
            self.id = id;
        }

        async fn execute(&self, _ctx: ()) {}
    }

    #[derive(Serialize, Deserialize)]
    struct Ping {
        #[serde(default)]
        id: JobId,
    }

    #[async_trait]
    impl JobSpec<()> for Ping {
        const KIND: &'static str = "ping";

        fn id(&self) -> &JobId {
            &self.id
        }

        fn set_id(&mut self, id: JobId) {
            self.id = id;
        }

        async fn execute(&self, _ctx: ()) {}
    }

    fn payload(value: serde_json::Value) -> Payload {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn instantiates_registered_kind_with_given_id() {
        let registry = JobRegistry::<()>::new().with::<Answer>();
        let job = registry
            .instantiate(
                "answer",
                JobId::new("row-id"),
                payload(json!({"id": "stale-id", "answer": 42})),
            )
            .unwrap();

        assert_eq!(job.kind(), "answer");
        assert_eq!(job.id().as_str(), "row-id");
        assert_eq!(job.state().unwrap()["answer"], 42);
    }

    #[test]
    fn unknown_kind_is_reported() {
        let registry = JobRegistry::<()>::new().with::<Answer>();
        let err = registry
            .instantiate("mystery", JobId::new("x"), Payload::new())
            .unwrap_err();
        assert!(matches!(err, FactoryError::UnknownKind { ref kind } if kind == "mystery"));
    }

    #[test]
    fn mismatched_field_type_is_reported() {
        let registry = JobRegistry::<()>::new().with::<Answer>();
        let err = registry
            .instantiate(
                "answer",
                JobId::new("x"),
                payload(json!({"answer": "forty-two"})),
            )
            .unwrap_err();
        assert!(matches!(err, FactoryError::InvalidPayload { ref kind, .. } if kind == "answer"));
    }

    #[test]
    fn kinds_are_sorted() {
        let mut registry = JobRegistry::<()>::new();
        registry.register::<Ping>().register::<Answer>();
        assert_eq!(registry.kinds(), vec!["answer", "ping"]);
        assert!(registry.contains("ping"));
        assert!(!registry.contains("pong"));
    }

    #[test]
    fn duplicate_registration_keeps_one_entry() {
        let mut registry = JobRegistry::<()>::new();
        registry.register::<Ping>().register::<Ping>();
        assert_eq!(registry.kinds(), vec!["ping"]);
    }
}
