//! # Pod Model
//!
//! The minimal slice of the pod object the coordinator needs: identity,
//! containers, and the per-container resource requests and limits from which
//! the QoS class is derived. The host agent owns the real pod lifecycle; this
//! model is what crosses into the admission path.

use std::collections::BTreeMap;

/// Requested or granted amounts keyed by resource name.
///
/// Device-plugin resources use vendor-qualified names (`vendor.com/gpu`).
pub type ResourceList = BTreeMap<String, u64>;

/// Pod identity as handed out by the host agent.
pub type PodUid = String;

/// A single container spec within a pod.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Container {
    /// Container name, unique within its pod.
    pub name: String,
    /// Requested resource amounts.
    pub requests: ResourceList,
    /// Resource limits.
    pub limits: ResourceList,
}

impl Container {
    /// A container with the given name and no resources.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds a resource request.
    #[must_use]
    pub fn with_request(mut self, resource: impl Into<String>, amount: u64) -> Self {
        self.requests.insert(resource.into(), amount);
        self
    }

    /// Adds a resource limit.
    #[must_use]
    pub fn with_limit(mut self, resource: impl Into<String>, amount: u64) -> Self {
        self.limits.insert(resource.into(), amount);
        self
    }

    /// Adds an equal request and limit, the guaranteed-QoS shape.
    #[must_use]
    pub fn with_resource(self, resource: impl Into<String> + Clone, amount: u64) -> Self {
        self.with_request(resource.clone(), amount)
            .with_limit(resource, amount)
    }
}

/// QoS class of a pod, derived from its containers' resources.
///
/// Only [`QosClass::Guaranteed`] pods are subject to topology alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QosClass {
    /// Every container has non-empty limits equal to its requests.
    Guaranteed,
    /// Some resources are specified but the guaranteed shape is not met.
    Burstable,
    /// No container specifies requests or limits.
    BestEffort,
}

/// A pod as seen by the admission path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pod {
    /// Unique pod identifier.
    pub uid: PodUid,
    /// Human-readable pod name, used in logs only.
    pub name: String,
    /// Init containers, run before the app containers.
    pub init_containers: Vec<Container>,
    /// App containers.
    pub containers: Vec<Container>,
}

impl Pod {
    /// A pod with the given identity and no containers.
    #[must_use]
    pub fn new(uid: impl Into<PodUid>, name: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Appends an init container.
    #[must_use]
    pub fn with_init_container(mut self, container: Container) -> Self {
        self.init_containers.push(container);
        self
    }

    /// Appends an app container.
    #[must_use]
    pub fn with_container(mut self, container: Container) -> Self {
        self.containers.push(container);
        self
    }

    /// Init containers followed by app containers, admission order.
    pub fn all_containers(&self) -> impl Iterator<Item = &Container> {
        self.init_containers.iter().chain(self.containers.iter())
    }

    /// Derives the pod's QoS class from its containers.
    #[must_use]
    pub fn qos_class(&self) -> QosClass {
        let mut any_resources = false;
        let mut guaranteed = true;
        for container in self.all_containers() {
            if !container.requests.is_empty() || !container.limits.is_empty() {
                any_resources = true;
            }
            if container.limits.is_empty() || container.requests != container.limits {
                guaranteed = false;
            }
        }
        if !any_resources {
            return QosClass::BestEffort;
        }
        if guaranteed && self.all_containers().next().is_some() {
            QosClass::Guaranteed
        } else {
            QosClass::Burstable
        }
    }
}
