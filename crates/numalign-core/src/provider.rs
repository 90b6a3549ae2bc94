//! # Hint Providers
//!
//! The contract between the coordinator and the resource managers that know
//! where their units live. A provider reports, per container and per resource
//! it manages, one of three things:
//!
//! - key absent — the provider does not manage any requested resource;
//! - `None` under the key — the resource has no topology information
//!   ("no opinion"; the merger skips it);
//! - `Some(hints)` — feasible affinities, possibly empty ("impossible").
//!
//! The absent-key / `None` / empty-list distinction is load-bearing: collapsing
//! "no opinion" into "impossible" silently rejects satisfiable pods, and the
//! reverse silently admits infeasible ones.
//!
//! Providers may consult live inventories and are treated as synchronous,
//! bounded-time calls; [`call_with_timeout`] enforces the bound.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use fxhash::FxHashMap;

use crate::hint::HintSet;
use crate::pod::{Container, Pod};

/// Per-resource hint lists returned by one provider for one container.
pub type ResourceHints = FxHashMap<String, Option<HintSet>>;

/// Errors surfaced by hint providers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The provider did not answer within the coordinator's bound.
    #[error("hint provider `{provider}` timed out after {timeout:?}")]
    Timeout {
        /// The provider that timed out.
        provider: String,
        /// The bound that was exceeded.
        timeout: Duration,
    },

    /// The provider failed; the code is passed through to admission verbatim.
    #[error("{0}")]
    Failed(String),
}

/// A resource manager that can report topology options for its resources.
///
/// Implementations are registered with the coordinator and consulted on every
/// guaranteed-pod admission.
pub trait HintProvider: Send + Sync {
    /// Short provider name for logs and timeout attribution.
    fn name(&self) -> &str;

    /// Topology options for `container`, keyed by resource name.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Failed`] when the provider cannot answer at
    /// all; how that surfaces depends on the admission policy.
    fn topology_hints(
        &self,
        pod: &Pod,
        container: &Container,
    ) -> Result<ResourceHints, ProviderError>;
}

/// Runs a provider call on a helper thread, bounded by `timeout`.
///
/// A provider that never answers leaves its thread parked on a dead channel;
/// admission moves on with [`ProviderError::Timeout`].
///
/// # Errors
///
/// Returns the provider's own error, or [`ProviderError::Timeout`] when the
/// bound elapses first.
pub fn call_with_timeout(
    provider: &Arc<dyn HintProvider>,
    pod: &Pod,
    container: &Container,
    timeout: Duration,
) -> Result<ResourceHints, ProviderError> {
    let (tx, rx) = mpsc::channel();
    let worker = Arc::clone(provider);
    let pod = pod.clone();
    let container = container.clone();

    let spawned = thread::Builder::new()
        .name(format!("hints-{}", provider.name()))
        .spawn(move || {
            let _ = tx.send(worker.topology_hints(&pod, &container));
        });
    if let Err(err) = spawned {
        return Err(ProviderError::Failed(format!(
            "failed to spawn hint thread for `{}`: {err}",
            provider.name()
        )));
    }

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(ProviderError::Timeout {
            provider: provider.name().to_string(),
            timeout,
        }),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(ProviderError::Failed(format!(
            "hint provider `{}` panicked",
            provider.name()
        ))),
    }
}
