//! End-to-end admission scenarios through the public coordinator API.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use smallvec::smallvec;

use numalign_core::{
    Container, Coordinator, CoordinatorConfig, Hint, HintProvider, HintSet, Pod, ProviderError,
    ResourceHints, SocketMask, TOPOLOGY_AFFINITY_ERROR,
};

const GPU: &str = "vendor.com/gpu";
const NIC: &str = "vendor.com/nic";

fn mask(nodes: &[usize]) -> SocketMask {
    SocketMask::new(nodes).unwrap()
}

fn coordinator(policy: &str) -> Coordinator {
    Coordinator::new(&CoordinatorConfig {
        topology_policy: policy.to_string(),
        ..CoordinatorConfig::default()
    })
}

fn coordinator_with_timeout(policy: &str, timeout: Duration) -> Coordinator {
    Coordinator::new(&CoordinatorConfig {
        topology_policy: policy.to_string(),
        provider_timeout: timeout,
    })
}

fn gpu_pod(uid: &str) -> Pod {
    Pod::new(uid, uid).with_container(Container::new("main").with_resource(GPU, 1))
}

struct StaticProvider {
    name: &'static str,
    resource: &'static str,
    hints: HintSet,
}

impl HintProvider for StaticProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn topology_hints(
        &self,
        _pod: &Pod,
        _container: &Container,
    ) -> Result<ResourceHints, ProviderError> {
        let mut out = ResourceHints::default();
        out.insert(self.resource.to_string(), Some(self.hints.clone()));
        Ok(out)
    }
}

struct SleepyProvider {
    delay: Duration,
}

impl HintProvider for SleepyProvider {
    fn name(&self) -> &str {
        "sleepy"
    }

    fn topology_hints(
        &self,
        _pod: &Pod,
        _container: &Container,
    ) -> Result<ResourceHints, ProviderError> {
        thread::sleep(self.delay);
        let mut out = ResourceHints::default();
        out.insert(
            NIC.to_string(),
            Some(smallvec![Hint::new(mask(&[1]), true)]),
        );
        Ok(out)
    }
}

fn disjoint_providers(coordinator: &Coordinator) {
    coordinator.register(Arc::new(StaticProvider {
        name: "gpu-manager",
        resource: GPU,
        hints: smallvec![Hint::new(mask(&[0]), true)],
    }));
    coordinator.register(Arc::new(StaticProvider {
        name: "nic-manager",
        resource: NIC,
        hints: smallvec![Hint::new(mask(&[1]), true)],
    }));
}

#[test]
fn test_disjoint_preferred_masks_rejected_under_strict() {
    let coordinator = coordinator("strict");
    disjoint_providers(&coordinator);

    let result = coordinator.admit(&gpu_pod("uid-disjoint"));
    assert!(!result.admit);
    assert_eq!(result.reason.as_deref(), Some(TOPOLOGY_AFFINITY_ERROR));
    assert!(result.message.is_some());
    assert_eq!(coordinator.affinity("uid-disjoint", "main"), Hint::none());
}

#[test]
fn test_disjoint_preferred_masks_admitted_under_preferred() {
    let coordinator = coordinator("preferred");
    disjoint_providers(&coordinator);

    let result = coordinator.admit(&gpu_pod("uid-disjoint"));
    assert!(result.admit);
    // The unconstrained fallback is recorded: full mask, not preferred.
    assert_eq!(
        coordinator.affinity("uid-disjoint", "main"),
        Hint::new(SocketMask::filled(), false)
    );
}

#[test]
fn test_overlapping_non_preferred_merge() {
    let coordinator = coordinator("preferred");
    coordinator.register(Arc::new(StaticProvider {
        name: "gpu-manager",
        resource: GPU,
        hints: smallvec![Hint::new(mask(&[0]), true), Hint::new(mask(&[1]), true)],
    }));
    coordinator.register(Arc::new(StaticProvider {
        name: "nic-manager",
        resource: NIC,
        hints: smallvec![Hint::new(mask(&[0, 1]), false)],
    }));

    assert!(coordinator.admit(&gpu_pod("uid-overlap")).admit);
    assert_eq!(
        coordinator.affinity("uid-overlap", "main"),
        Hint::new(mask(&[0]), false)
    );
}

#[test]
fn test_aligned_narrow_hints_stay_preferred() {
    let coordinator = coordinator("strict");
    coordinator.register(Arc::new(StaticProvider {
        name: "gpu-manager",
        resource: GPU,
        hints: smallvec![Hint::new(mask(&[0]), true), Hint::new(mask(&[1]), true)],
    }));
    coordinator.register(Arc::new(StaticProvider {
        name: "nic-manager",
        resource: NIC,
        hints: smallvec![Hint::new(mask(&[0]), true), Hint::new(mask(&[0, 1]), false)],
    }));

    assert!(coordinator.admit(&gpu_pod("uid-aligned")).admit);
    assert_eq!(
        coordinator.affinity("uid-aligned", "main"),
        Hint::new(mask(&[0]), true)
    );
}

#[test]
fn test_provider_order_does_not_change_outcome() {
    let first = coordinator("preferred");
    first.register(Arc::new(StaticProvider {
        name: "gpu-manager",
        resource: GPU,
        hints: smallvec![Hint::new(mask(&[0]), true), Hint::new(mask(&[1]), true)],
    }));
    first.register(Arc::new(StaticProvider {
        name: "nic-manager",
        resource: NIC,
        hints: smallvec![Hint::new(mask(&[0, 1]), false)],
    }));

    let second = coordinator("preferred");
    second.register(Arc::new(StaticProvider {
        name: "nic-manager",
        resource: NIC,
        hints: smallvec![Hint::new(mask(&[0, 1]), false)],
    }));
    second.register(Arc::new(StaticProvider {
        name: "gpu-manager",
        resource: GPU,
        hints: smallvec![Hint::new(mask(&[0]), true), Hint::new(mask(&[1]), true)],
    }));

    let pod = gpu_pod("uid-order");
    assert!(first.admit(&pod).admit);
    assert!(second.admit(&pod).admit);
    assert_eq!(
        first.affinity("uid-order", "main"),
        second.affinity("uid-order", "main")
    );
}

#[test]
fn test_init_containers_are_aligned_too() {
    let coordinator = coordinator("preferred");
    coordinator.register(Arc::new(StaticProvider {
        name: "gpu-manager",
        resource: GPU,
        hints: smallvec![Hint::new(mask(&[1]), true)],
    }));

    let pod = Pod::new("uid-init", "with-init")
        .with_init_container(Container::new("setup").with_resource(GPU, 1))
        .with_container(Container::new("main").with_resource(GPU, 1));

    assert!(coordinator.admit(&pod).admit);
    assert_eq!(
        coordinator.affinity("uid-init", "setup"),
        Hint::new(mask(&[1]), true)
    );
    assert_eq!(
        coordinator.affinity("uid-init", "main"),
        Hint::new(mask(&[1]), true)
    );
}

#[test]
fn test_timeout_is_no_opinion_under_preferred() {
    let coordinator = coordinator_with_timeout("preferred", Duration::from_millis(20));
    coordinator.register(Arc::new(SleepyProvider {
        delay: Duration::from_millis(500),
    }));
    coordinator.register(Arc::new(StaticProvider {
        name: "gpu-manager",
        resource: GPU,
        hints: smallvec![Hint::new(mask(&[0]), true)],
    }));

    let pod = gpu_pod("uid-sleepy");
    assert!(coordinator.admit(&pod).admit);
    // The sleepy provider's narrow hint never constrains the merge.
    assert_eq!(
        coordinator.affinity("uid-sleepy", "main"),
        Hint::new(mask(&[0]), true)
    );
    assert_eq!(coordinator.metrics().provider_timeouts, 1);
}

#[test]
fn test_timeout_rejects_under_strict() {
    let coordinator = coordinator_with_timeout("strict", Duration::from_millis(20));
    coordinator.register(Arc::new(SleepyProvider {
        delay: Duration::from_millis(500),
    }));

    let result = coordinator.admit(&gpu_pod("uid-stuck"));
    assert!(!result.admit);
    assert_eq!(result.reason.as_deref(), Some(TOPOLOGY_AFFINITY_ERROR));
    assert_eq!(coordinator.metrics().provider_timeouts, 1);
}

#[test]
fn test_admission_is_idempotent() {
    let coordinator = coordinator("strict");
    coordinator.register(Arc::new(StaticProvider {
        name: "gpu-manager",
        resource: GPU,
        hints: smallvec![Hint::new(mask(&[0]), true)],
    }));

    let pod = gpu_pod("uid-twice");
    assert!(coordinator.admit(&pod).admit);
    assert!(coordinator.admit(&pod).admit);
    assert_eq!(
        coordinator.affinity("uid-twice", "main"),
        Hint::new(mask(&[0]), true)
    );
    assert_eq!(coordinator.metrics().pods_admitted, 2);
}
