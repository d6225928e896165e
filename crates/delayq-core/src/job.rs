use std::fmt;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Generic field-keyed payload decoded from a persisted job state.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Bounds every execution context must satisfy.
///
/// The context is cloned into each job execution, so it is typically a small
/// struct of `Arc`-wrapped services (mailer, database pool, ...).
pub trait Context: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Context for T {}

/// Opaque job identifier. Empty until storage assigns one on push.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Object-safe view of a schedulable job, as seen by storage and the scheduler.
///
/// Concrete variants normally implement [`JobSpec`] instead and get this trait
/// through the blanket impl below.
#[async_trait]
pub trait Job<C>: Send + Sync {
    /// Identifier assigned by storage; empty before the first push.
    fn id(&self) -> &JobId;

    /// Called exactly once by storage when the job is persisted.
    fn set_id(&mut self, id: JobId);

    /// Type tag used to pick the constructor on the read path.
    fn kind(&self) -> &str;

    /// Full serialized state of the job instance, id included.
    fn state(&self) -> serde_json::Result<serde_json::Value>;

    /// Serialized state as it would read after `set_id(id)`, leaving `self`
    /// untouched. Storage persists this and only assigns the id once the
    /// write has gone through.
    fn state_with_id(&self, id: &JobId) -> serde_json::Result<serde_json::Value>;

    /// Run the job. There is no failure channel: a variant that can fail
    /// handles or logs the failure itself.
    async fn execute(&self, ctx: C);
}

impl<C> fmt::Debug for dyn Job<C> + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("kind", &self.kind())
            .field("id", self.id())
            .finish()
    }
}

/// Typed definition of a job variant.
///
/// The serde representation of the implementing type is what gets persisted,
/// and [`KIND`](JobSpec::KIND) is the tag it is registered under.
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct Greet {
///     #[serde(default)]
///     id: JobId,
///     name: String,
/// }
///
/// #[async_trait]
/// impl JobSpec<Deps> for Greet {
///     const KIND: &'static str = "greet";
///     fn id(&self) -> &JobId { &self.id }
///     fn set_id(&mut self, id: JobId) { self.id = id }
///     async fn execute(&self, _deps: Deps) { tracing::info!("hello {}", self.name) }
/// }
/// ```
#[async_trait]
pub trait JobSpec<C>: Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: &'static str;

    fn id(&self) -> &JobId;

    fn set_id(&mut self, id: JobId);

    async fn execute(&self, ctx: C);
}

#[async_trait]
impl<C, T> Job<C> for T
where
    C: Context,
    T: JobSpec<C>,
{
    fn id(&self) -> &JobId {
        <T as JobSpec<C>>::id(self)
    }

    fn set_id(&mut self, id: JobId) {
        <T as JobSpec<C>>::set_id(self, id)
    }

    fn kind(&self) -> &str {
        T::KIND
    }

    fn state(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    fn state_with_id(&self, id: &JobId) -> serde_json::Result<serde_json::Value> {
        let mut copy: T = serde_json::from_value(serde_json::to_value(self)?)?;
        <T as JobSpec<C>>::set_id(&mut copy, id.clone());
        serde_json::to_value(&copy)
    }

    async fn execute(&self, ctx: C) {
        <T as JobSpec<C>>::execute(self, ctx).await
    }
}
