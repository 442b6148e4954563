//! Reactive wrappers around asynchronous API calls.
//!
//! [`ApiResource`] turns a zero-argument operation into observable
//! `{data, loading, error}` state with imperative `execute` / `reset`.
//! [`ApiMutation`] does the same for operations that take an input and
//! are only ever triggered explicitly.
//!
//! Both publish their state through a [`tokio::sync::watch`] channel: the
//! UI subscribes and re-renders on change. Neither ever returns an error
//! to its caller; failures land in the `error` field.
//!
//! Nothing is cancelled. Two overlapping executions both write their
//! result and, under the default [`StalePolicy::LastWriteWins`], whichever
//! settles last is what the state shows. Callers that need ordering
//! (create, then refetch) await the first call before starting the second.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use amakuru_core::error::ApiError;
use amakuru_core::request::{MutationState, RequestState};
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use tokio::sync::watch;

/// Future returned by an operation.
pub type OperationFuture<T> = BoxFuture<'static, Result<T, ApiError>>;

/// A zero-argument data-producing operation.
pub type Operation<T> = Arc<dyn Fn() -> OperationFuture<T> + Send + Sync>;

/// An operation taking an input, for mutations.
pub type MutationFn<I, R> = Arc<dyn Fn(I) -> OperationFuture<R> + Send + Sync>;

/// Box an async closure into an [`Operation`].
///
/// ```ignore
/// let api = Arc::clone(&api);
/// let op = operation(move || {
///     let api = Arc::clone(&api);
///     async move { api.get_dashboard_stats().await }
/// });
/// ```
pub fn operation<T, F, Fut>(f: F) -> Operation<T>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

/// Box an async closure into a [`MutationFn`].
pub fn mutation<I, R, F, Fut>(f: F) -> MutationFn<I, R>
where
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, ApiError>> + Send + 'static,
{
    Arc::new(move |input| f(input).boxed())
}

/// What to do with a completion that has been overtaken by a newer execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StalePolicy {
    /// Every completion writes; the last one to settle wins.
    #[default]
    LastWriteWins,
    /// Only the most recently started execution may write. `reset()` also
    /// invalidates in-flight executions.
    LatestOnly,
}

/// Options for [`ApiResource::mount`].
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Execute on mount and whenever the dependencies change. Default `true`.
    pub immediate: bool,
    /// Compared element by element, in order.
    pub dependencies: Vec<Value>,
    /// How overlapping executions settle. Default [`StalePolicy::LastWriteWins`].
    pub stale: StalePolicy,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            immediate: true,
            dependencies: Vec::new(),
            stale: StalePolicy::default(),
        }
    }
}

impl FetchOptions {
    /// Options for a resource that only runs when `execute()` is called.
    pub fn manual() -> Self {
        Self {
            immediate: false,
            ..Self::default()
        }
    }

    pub fn with_dependencies(mut self, dependencies: Vec<Value>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn with_stale_policy(mut self, stale: StalePolicy) -> Self {
        self.stale = stale;
        self
    }
}

// ---------------------------------------------------------------------------
// ApiResource
// ---------------------------------------------------------------------------

/// Observable wrapper around a data-fetching [`Operation`].
///
/// Cheap to clone; clones share state.
pub struct ApiResource<T> {
    inner: Arc<ResourceInner<T>>,
}

struct ResourceInner<T> {
    operation: Operation<T>,
    state: watch::Sender<RequestState<T>>,
    /// Sequence number of the most recently started execution.
    latest: AtomicU64,
    immediate: bool,
    stale: StalePolicy,
    dependencies: Mutex<Vec<Value>>,
}

impl<T> Clone for ApiResource<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> ApiResource<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create an idle resource. Nothing is executed.
    pub fn new(operation: Operation<T>, options: FetchOptions) -> Self {
        let (state, _) = watch::channel(RequestState::idle());
        Self {
            inner: Arc::new(ResourceInner {
                operation,
                state,
                latest: AtomicU64::new(0),
                immediate: options.immediate,
                stale: options.stale,
                dependencies: Mutex::new(options.dependencies),
            }),
        }
    }

    /// Create the resource and, if `options.immediate`, start exactly one
    /// execution on the tokio runtime.
    ///
    /// When immediate, the returned resource is already `loading`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime while `immediate` is set.
    pub fn mount(operation: Operation<T>, options: FetchOptions) -> Self {
        let resource = Self::new(operation, options);
        if resource.inner.immediate {
            tokio::spawn(resource.execute());
        }
        resource
    }

    /// Run the operation and record its outcome.
    ///
    /// The state turns `loading` before this returns; the returned future
    /// settles it. The future never fails.
    pub fn execute(&self) -> impl Future<Output = ()> + Send + 'static {
        let seq = self.inner.latest.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.state.send_modify(RequestState::begin);
        let pending = (self.inner.operation)();
        let inner = Arc::clone(&self.inner);

        async move {
            let result = pending.await;
            inner.settle(seq, result);
        }
    }

    /// Return to the idle state without calling the operation.
    pub fn reset(&self) {
        if self.inner.stale == StalePolicy::LatestOnly {
            self.inner.latest.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.state.send_replace(RequestState::idle());
    }

    /// Replace the dependency list. If it differs from the previous one and
    /// the resource is immediate, one execution is spawned.
    ///
    /// Returns whether an execution was started.
    pub fn set_dependencies(&self, dependencies: Vec<Value>) -> bool {
        let changed = {
            let mut current = self
                .inner
                .dependencies
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if *current == dependencies {
                false
            } else {
                *current = dependencies;
                true
            }
        };

        if changed && self.inner.immediate {
            tokio::spawn(self.execute());
            true
        } else {
            false
        }
    }

    /// Current state.
    pub fn state(&self) -> RequestState<T> {
        self.inner.state.borrow().clone()
    }

    /// Receive every state change from now on.
    pub fn subscribe(&self) -> watch::Receiver<RequestState<T>> {
        self.inner.state.subscribe()
    }
}

impl<T> ResourceInner<T> {
    fn settle(&self, seq: u64, result: Result<T, ApiError>) {
        if self.stale == StalePolicy::LatestOnly && self.latest.load(Ordering::SeqCst) != seq {
            tracing::debug!(seq, "Discarding stale fetch completion");
            return;
        }

        self.state.send_modify(|state| match result {
            Ok(data) => state.succeed(data),
            Err(e) => {
                tracing::debug!(error = %e, "Fetch failed");
                state.fail(e.to_string());
            }
        });
    }
}

// ---------------------------------------------------------------------------
// ApiMutation
// ---------------------------------------------------------------------------

/// Observable wrapper around a [`MutationFn`].
pub struct ApiMutation<I, R> {
    mutation: MutationFn<I, R>,
    state: Arc<watch::Sender<MutationState>>,
}

impl<I, R> Clone for ApiMutation<I, R> {
    fn clone(&self) -> Self {
        Self {
            mutation: Arc::clone(&self.mutation),
            state: Arc::clone(&self.state),
        }
    }
}

impl<I, R> ApiMutation<I, R>
where
    I: Send + 'static,
    R: Send + 'static,
{
    pub fn new(mutation: MutationFn<I, R>) -> Self {
        let (state, _) = watch::channel(MutationState::idle());
        Self {
            mutation,
            state: Arc::new(state),
        }
    }

    /// Run the mutation. Resolves to `Some(result)` on success and `None`
    /// on failure, with the message recorded in the state.
    ///
    /// The state turns `loading` before this returns.
    pub fn mutate(&self, input: I) -> impl Future<Output = Option<R>> + Send + 'static {
        self.state.send_modify(MutationState::begin);
        let pending = (self.mutation)(input);
        let state = Arc::clone(&self.state);

        async move {
            match pending.await {
                Ok(result) => {
                    state.send_modify(MutationState::succeed);
                    Some(result)
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Mutation failed");
                    state.send_modify(|s| s.fail(e.to_string()));
                    None
                }
            }
        }
    }

    /// Clear `loading` and `error`.
    pub fn reset(&self) {
        self.state.send_replace(MutationState::idle());
    }

    pub fn state(&self) -> MutationState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<MutationState> {
        self.state.subscribe()
    }
}
