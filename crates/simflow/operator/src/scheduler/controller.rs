//! Watch-driven scheduling of reconciliation passes
//!
//! `kube::runtime::Controller` supplies the scheduling guarantees the
//! reconciler relies on: passes for the same Simulation are serialized,
//! different Simulations run in parallel, and requeues are deduplicated.

use super::reconciler::{Action, Reconciler};
use crate::config::ReconcilerConfig;
use crate::error::ReconcileError;
use dashmap::DashMap;
use futures::StreamExt;
use kube::api::Api;
use kube::runtime::controller::{self, Controller};
use kube::runtime::watcher;
use kube::Client;
use simflow_types::{Simulation, SimulationKey};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Per-key retry delays after failed passes
///
/// Conflicts retry quickly from a fresh fetch. Other errors back off
/// exponentially per key until a pass succeeds.
#[derive(Debug)]
pub struct ErrorBackoff {
    base: Duration,
    max: Duration,
    conflict_delay: Duration,
    failures: DashMap<SimulationKey, u32>,
}

impl ErrorBackoff {
    pub fn new(base: Duration, max: Duration, conflict_delay: Duration) -> Self {
        Self {
            base,
            max,
            conflict_delay,
            failures: DashMap::new(),
        }
    }

    pub fn from_config(config: &ReconcilerConfig) -> Self {
        Self::new(
            config.error_backoff_base(),
            config.error_backoff_max(),
            config.conflict_requeue(),
        )
    }

    /// Delay before retrying `key` after `error`
    pub fn next_delay(&self, key: &SimulationKey, error: &ReconcileError) -> Duration {
        if error.is_conflict() {
            return self.conflict_delay;
        }

        let mut failures = self.failures.entry(key.clone()).or_insert(0);
        let exponent = (*failures).min(16);
        *failures = failures.saturating_add(1);

        self.base
            .checked_mul(1u32 << exponent)
            .map_or(self.max, |delay| delay.min(self.max))
    }

    /// Forget the failure history of `key`
    pub fn reset(&self, key: &SimulationKey) {
        self.failures.remove(key);
    }

    /// Number of keys with a failure history
    pub fn tracked(&self) -> usize {
        self.failures.len()
    }
}

/// Shared state handed to every reconcile invocation
pub struct ControllerContext {
    pub reconciler: Reconciler,
    pub backoff: ErrorBackoff,
    ready: Arc<AtomicBool>,
}

impl ControllerContext {
    pub fn new(reconciler: Reconciler, ready: Arc<AtomicBool>) -> Self {
        let backoff = ErrorBackoff::from_config(reconciler.config());
        Self {
            reconciler,
            backoff,
            ready,
        }
    }
}

impl From<Action> for controller::Action {
    fn from(action: Action) -> Self {
        match action {
            Action::Done => controller::Action::await_change(),
            Action::RequeueAfter(delay) => controller::Action::requeue(delay),
        }
    }
}

async fn reconcile(
    simulation: Arc<Simulation>,
    ctx: Arc<ControllerContext>,
) -> Result<controller::Action, ReconcileError> {
    let key = simulation.key();
    let action = ctx.reconciler.reconcile(&key).await?;
    ctx.backoff.reset(&key);
    Ok(action.into())
}

type ControllerError = controller::Error<ReconcileError, watcher::Error>;

/// A requeued key whose object has left the watch cache was deleted.
/// Its next pass never runs, so drop its backoff here.
fn forget_if_deleted(backoff: &ErrorBackoff, error: &ControllerError) {
    if let controller::Error::ObjectNotFound(object) = error {
        let key = SimulationKey::new(
            object.namespace.as_deref().unwrap_or("default"),
            object.name.as_str(),
        );
        backoff.reset(&key);
    }
}

fn error_policy(
    simulation: Arc<Simulation>,
    error: &ReconcileError,
    ctx: Arc<ControllerContext>,
) -> controller::Action {
    let key = simulation.key();
    let delay = ctx.backoff.next_delay(&key, error);
    tracing::warn!(
        simulation = %key,
        error = %error,
        retry_in = ?delay,
        "Requeueing simulation after failed pass"
    );
    controller::Action::requeue(delay)
}

/// Run the controller until `shutdown` resolves
pub async fn run<F>(
    client: Client,
    watch_namespace: Option<String>,
    ctx: Arc<ControllerContext>,
    shutdown: F,
) where
    F: Future<Output = ()> + Send + Sync + 'static,
{
    let simulations: Api<Simulation> = match &watch_namespace {
        Some(namespace) => Api::namespaced(client, namespace),
        None => Api::all(client),
    };

    let concurrency = ctx.reconciler.config().max_concurrent_reconciles;
    ctx.ready.store(true, Ordering::SeqCst);

    tracing::info!(
        namespace = watch_namespace.as_deref().unwrap_or("<all>"),
        concurrency = concurrency,
        "Simulation controller started"
    );

    Controller::new(simulations, watcher::Config::default())
        .with_config(controller::Config::default().concurrency(concurrency))
        .graceful_shutdown_on(shutdown)
        .run(reconcile, error_policy, ctx.clone())
        .for_each(|result| {
            let ctx = ctx.clone();
            async move {
                match result {
                    Ok((object, action)) => {
                        tracing::trace!(object = %object, action = ?action, "Reconciled");
                    }
                    Err(e) => {
                        forget_if_deleted(&ctx.backoff, &e);
                        tracing::debug!(error = %e, "Controller event");
                    }
                }
            }
        })
        .await;

    ctx.ready.store(false, Ordering::SeqCst);
    tracing::info!("Simulation controller stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use kube::core::{ApiResource, DynamicObject};
    use kube::runtime::reflector::ObjectRef;

    fn backoff() -> ErrorBackoff {
        ErrorBackoff::new(
            Duration::from_secs(1),
            Duration::from_secs(10),
            Duration::from_millis(500),
        )
    }

    fn transport_error() -> ReconcileError {
        StoreError::Transport("connection refused".into()).into()
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let backoff = backoff();
        let key = SimulationKey::new("default", "sim-a");

        let delays: Vec<_> = (0..6)
            .map(|_| backoff.next_delay(&key, &transport_error()))
            .collect();

        assert_eq!(
            delays,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(8),
                Duration::from_secs(10),
                Duration::from_secs(10),
            ]
        );
    }

    #[test]
    fn test_backoff_is_per_key_and_resets() {
        let backoff = backoff();
        let a = SimulationKey::new("default", "a");
        let b = SimulationKey::new("default", "b");

        backoff.next_delay(&a, &transport_error());
        backoff.next_delay(&a, &transport_error());
        assert_eq!(backoff.next_delay(&b, &transport_error()), Duration::from_secs(1));

        backoff.reset(&a);
        assert_eq!(backoff.next_delay(&a, &transport_error()), Duration::from_secs(1));
    }

    #[test]
    fn test_deleted_object_drops_backoff() {
        let backoff = backoff();
        let deleted = SimulationKey::new("lab", "sim-a");
        let live = SimulationKey::new("lab", "sim-b");
        backoff.next_delay(&deleted, &transport_error());
        backoff.next_delay(&live, &transport_error());
        assert_eq!(backoff.tracked(), 2);

        let missing = ObjectRef::<DynamicObject>::new_with(
            "sim-a",
            ApiResource::erase::<Simulation>(&()),
        )
        .within("lab");
        forget_if_deleted(&backoff, &controller::Error::ObjectNotFound(missing));

        assert_eq!(backoff.tracked(), 1);
        assert_eq!(backoff.next_delay(&live, &transport_error()), Duration::from_secs(2));
        assert_eq!(backoff.next_delay(&deleted, &transport_error()), Duration::from_secs(1));
    }

    #[test]
    fn test_reconciler_error_keeps_backoff() {
        let backoff = backoff();
        let key = SimulationKey::new("lab", "sim-a");
        backoff.next_delay(&key, &transport_error());

        let object = ObjectRef::<DynamicObject>::new_with(
            "sim-a",
            ApiResource::erase::<Simulation>(&()),
        )
        .within("lab");
        forget_if_deleted(
            &backoff,
            &controller::Error::ReconcilerFailed(transport_error(), object),
        );

        assert_eq!(backoff.tracked(), 1);
    }

    #[test]
    fn test_conflict_retries_quickly() {
        let backoff = backoff();
        let key = SimulationKey::new("default", "sim-a");
        let conflict: ReconcileError = StoreError::Conflict("stale".into()).into();

        backoff.next_delay(&key, &transport_error());
        backoff.next_delay(&key, &transport_error());
        assert_eq!(backoff.next_delay(&key, &conflict), Duration::from_millis(500));
    }

    #[test]
    fn test_action_conversion() {
        assert_eq!(
            controller::Action::from(Action::RequeueAfter(Duration::from_secs(10))),
            controller::Action::requeue(Duration::from_secs(10))
        );
        assert_eq!(
            controller::Action::from(Action::Done),
            controller::Action::await_change()
        );
    }
}
