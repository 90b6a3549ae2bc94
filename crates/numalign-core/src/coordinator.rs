//! # Topology Coordinator
//!
//! Combines the topology knowledge of every registered hint provider into a
//! single NUMA-affinity decision per container, then admits or rejects the pod
//! under the configured policy.
//!
//! ## Admission flow
//!
//! ```text
//!  pod ──► QoS gate ──► per container ──► gather hints ──► merge ──► policy
//!            │ not guaranteed                 (bounded        │         │
//!            ▼                                 per call)      │         ▼
//!          admit, record nothing                              │   admit + store
//!                                                             │   or reject
//! ```
//!
//! The stored hint is a binding directive: allocators consult
//! [`Coordinator::affinity`] and narrow their candidate sets to the mask it
//! carries. All mutable state sits behind one coordinator-level mutex, held
//! for the duration of each public call; admission rate is far below compute
//! rate, so contention is not a concern.

use std::sync::Arc;
use std::time::Duration;

use fxhash::FxHashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::CoordinatorConfig;
use crate::hint::Hint;
use crate::merge::merge_hints;
use crate::metrics::{AdmissionMetrics, MetricsSnapshot};
use crate::pod::{Container, Pod, PodUid, QosClass};
use crate::policy::Policy;
use crate::provider::{call_with_timeout, HintProvider, ProviderError, ResourceHints};
use crate::topology::HostTopology;

/// Rejection reason for a strict-policy refusal.
pub const TOPOLOGY_AFFINITY_ERROR: &str = "TopologyAffinityError";

/// Outcome of [`Coordinator::admit`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmitResult {
    /// Whether the pod may run on this node.
    pub admit: bool,
    /// Machine-readable rejection reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Human-readable rejection detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AdmitResult {
    /// A plain admission.
    #[must_use]
    pub const fn admitted() -> Self {
        Self {
            admit: true,
            reason: None,
            message: None,
        }
    }

    /// A rejection with reason code and detail.
    #[must_use]
    pub fn rejected(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            admit: false,
            reason: Some(reason.into()),
            message: Some(message.into()),
        }
    }
}

/// Mutable coordinator state, all behind one lock.
#[derive(Default)]
struct Inner {
    providers: Vec<Arc<dyn HintProvider>>,
    hints: FxHashMap<PodUid, FxHashMap<String, Hint>>,
    pod_by_container: FxHashMap<String, PodUid>,
}

/// The topology affinity coordination core of the node agent.
pub struct Coordinator {
    policy: Policy,
    provider_timeout: Duration,
    topology: HostTopology,
    metrics: AdmissionMetrics,
    inner: Mutex<Inner>,
}

impl Coordinator {
    /// Creates a coordinator from configuration, probing the host topology.
    #[must_use]
    pub fn new(config: &CoordinatorConfig) -> Self {
        let policy = Policy::from_name(&config.topology_policy);
        let topology = HostTopology::probe();
        info!(
            policy = %policy,
            topology = %topology.summary(),
            "creating topology coordinator"
        );
        if topology.exceeds_mask_width() {
            warn!(
                max_node = topology.max_node_id(),
                "host has NUMA nodes a socket mask cannot address"
            );
        }

        Self {
            policy,
            provider_timeout: config.provider_timeout,
            topology,
            metrics: AdmissionMetrics::new(),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Registers a hint provider to be consulted on every admission.
    ///
    /// Providers are not deduplicated; merge order does not affect results.
    pub fn register(&self, provider: Arc<dyn HintProvider>) {
        info!(provider = provider.name(), "registering hint provider");
        self.inner.lock().providers.push(provider);
    }

    /// Admits or rejects a pod under the configured policy.
    ///
    /// Non-guaranteed pods are admitted without affinity computation and
    /// nothing is recorded for them. For guaranteed pods, every init and app
    /// container must pass the policy; the first rejection returns
    /// immediately and no partial state is stored. On full acceptance the
    /// pod's container hints are inserted atomically.
    pub fn admit(&self, pod: &Pod) -> AdmitResult {
        let mut inner = self.inner.lock();

        let qos = pod.qos_class();
        if qos != QosClass::Guaranteed {
            info!(pod = %pod.name, ?qos, "pod is not guaranteed QoS, admitting without affinity");
            self.metrics.record_admitted();
            return AdmitResult::admitted();
        }

        let mut admitted: FxHashMap<String, Hint> = FxHashMap::default();
        for container in pod.all_containers() {
            let merged = match self.container_hint(&inner.providers, pod, container) {
                Ok(hint) => hint,
                Err(err) => {
                    self.metrics.record_rejected();
                    return AdmitResult::rejected(
                        err.to_string(),
                        format!("hint provider failed for container {}", container.name),
                    );
                }
            };

            if !self.policy.accepts(&merged) {
                info!(
                    pod = %pod.name,
                    container = %container.name,
                    hint = ?merged,
                    "rejecting pod under strict topology policy"
                );
                self.metrics.record_rejected();
                return AdmitResult::rejected(
                    TOPOLOGY_AFFINITY_ERROR,
                    format!(
                        "cannot align container {} to a preferred NUMA affinity",
                        container.name
                    ),
                );
            }

            debug!(
                pod = %pod.name,
                container = %container.name,
                affinity = %merged.affinity,
                preferred = merged.preferred,
                "selected container affinity"
            );
            admitted.insert(container.name.clone(), merged);
        }

        info!(pod = %pod.name, uid = %pod.uid, "admitting pod with topology affinity");
        inner.hints.insert(pod.uid.clone(), admitted);
        self.metrics.record_admitted();
        AdmitResult::admitted()
    }

    /// The stored hint for a container, or the zero value when absent.
    ///
    /// Allocators interpret the zero value (empty mask, not preferred) as "no
    /// affinity directive".
    #[must_use]
    pub fn affinity(&self, pod_uid: &str, container_name: &str) -> Hint {
        self.inner
            .lock()
            .hints
            .get(pod_uid)
            .and_then(|containers| containers.get(container_name))
            .copied()
            .unwrap_or(Hint::none())
    }

    /// Records that `container_id` belongs to `pod` for later release.
    pub fn bind_container(&self, pod: &Pod, container_id: &str) {
        let mut inner = self.inner.lock();
        inner
            .pod_by_container
            .insert(container_id.to_string(), pod.uid.clone());
    }

    /// Releases a container; dropping a pod's hints with its last container.
    ///
    /// Releasing an unknown container is a no-op.
    pub fn release_container(&self, container_id: &str) {
        let mut inner = self.inner.lock();
        let Some(uid) = inner.pod_by_container.remove(container_id) else {
            debug!(container_id, "release of unknown container ignored");
            return;
        };
        if !inner.pod_by_container.values().any(|bound| *bound == uid) {
            inner.hints.remove(&uid);
            debug!(pod_uid = %uid, "released last container, dropping pod hints");
        }
    }

    /// The active admission policy.
    #[must_use]
    pub fn policy(&self) -> Policy {
        self.policy
    }

    /// The host topology probed at construction.
    #[must_use]
    pub fn host_topology(&self) -> &HostTopology {
        &self.topology
    }

    /// A snapshot of the admission counters.
    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Gathers hints from every provider and merges them for one container.
    ///
    /// A timed-out provider counts as unsatisfiable under strict (the merge
    /// fallback, which strict then rejects) and as no-opinion under
    /// preferred. A failing provider rejects the container under strict with
    /// its error passed through verbatim, and is ignored under preferred.
    fn container_hint(
        &self,
        providers: &[Arc<dyn HintProvider>],
        pod: &Pod,
        container: &Container,
    ) -> Result<Hint, ProviderError> {
        let mut gathered: Vec<ResourceHints> = Vec::with_capacity(providers.len());
        for provider in providers {
            match call_with_timeout(provider, pod, container, self.provider_timeout) {
                Ok(hints) => {
                    debug!(
                        provider = provider.name(),
                        container = %container.name,
                        resources = hints.len(),
                        "gathered topology hints"
                    );
                    gathered.push(hints);
                }
                Err(err @ ProviderError::Timeout { .. }) => {
                    self.metrics.record_provider_timeout();
                    warn!(provider = provider.name(), %err, "hint provider timed out");
                    if self.policy == Policy::Strict {
                        self.metrics.record_merge_fallback();
                        return Ok(Hint::infeasible());
                    }
                }
                Err(err) => {
                    if self.policy == Policy::Strict {
                        return Err(err);
                    }
                    warn!(provider = provider.name(), %err, "hint provider failed, ignoring");
                }
            }
        }

        let merged = merge_hints(&gathered);
        if merged == Hint::infeasible() {
            self.metrics.record_merge_fallback();
        }
        Ok(merged)
    }
}
