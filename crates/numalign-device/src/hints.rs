//! # Device Hint Generation
//!
//! The reference [`HintProvider`]: for every device-plugin resource a
//! container requests, enumerate the ways the request could be satisfied from
//! the available pool and report each distinct NUMA affinity as a hint,
//! marking minimum-width affinities preferred.
//!
//! The enumeration walks every `amount`-subset of the available devices in
//! lexicographic id order. It is exponential in the request size; callers
//! gate on availability first, which keeps real pools (a node's worth of
//! GPUs or NICs) far below anything pathological.

use parking_lot::Mutex;
use tracing::debug;

use numalign_core::hint::{Hint, HintSet};
use numalign_core::pod::{Container, Pod};
use numalign_core::provider::{HintProvider, ProviderError, ResourceHints};
use numalign_core::socketmask::SocketMask;

use crate::inventory::{is_device_plugin_resource, Device, DeviceError, DeviceInventory};

/// Device manager: plugin-fed inventory plus the hint provider surface.
///
/// The inventory sits behind its own lock so plugin refreshes and allocation
/// bookkeeping can proceed between admissions.
#[derive(Debug, Default)]
pub struct DeviceManager {
    inventory: Mutex<DeviceInventory>,
}

impl DeviceManager {
    /// A manager with an empty inventory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces a resource's device list, as on a plugin refresh.
    pub fn update_devices(&self, resource: &str, devices: Vec<Device>) {
        self.inventory.lock().update_devices(resource, devices);
    }

    /// Updates one device's health bit.
    ///
    /// # Errors
    ///
    /// Propagates [`DeviceError`] for unknown resources or devices.
    pub fn set_health(&self, resource: &str, id: &str, healthy: bool) -> Result<(), DeviceError> {
        self.inventory.lock().set_health(resource, id, healthy)
    }

    /// Marks devices as handed to a container.
    ///
    /// # Errors
    ///
    /// Propagates [`DeviceError`] when any device is not available.
    pub fn allocate(
        &self,
        resource: &str,
        container_id: &str,
        ids: &[String],
    ) -> Result<(), DeviceError> {
        self.inventory.lock().allocate(resource, container_id, ids)
    }

    /// Returns a container's devices to the pool.
    pub fn free(&self, container_id: &str) {
        self.inventory.lock().free(container_id);
    }

    /// Healthy, unallocated device ids for a resource, in canonical order.
    #[must_use]
    pub fn available(&self, resource: &str) -> Vec<String> {
        self.inventory.lock().available(resource).into_iter().collect()
    }
}

impl HintProvider for DeviceManager {
    fn name(&self) -> &str {
        "device-manager"
    }

    fn topology_hints(
        &self,
        _pod: &Pod,
        container: &Container,
    ) -> Result<ResourceHints, ProviderError> {
        let inventory = self.inventory.lock();
        let mut out = ResourceHints::default();

        for (resource, &amount) in &container.limits {
            if !is_device_plugin_resource(resource) || !inventory.is_managed(resource) {
                continue;
            }

            if !inventory.has_topology_alignment(resource) {
                debug!(%resource, "devices carry no topology, abstaining");
                out.insert(resource.clone(), None);
                continue;
            }

            let available: Vec<String> = inventory.available(resource).into_iter().collect();
            let amount = usize::try_from(amount).unwrap_or(usize::MAX);
            if available.len() < amount {
                debug!(
                    %resource,
                    requested = amount,
                    available = available.len(),
                    "request unsatisfiable from available devices"
                );
                out.insert(resource.clone(), Some(HintSet::new()));
                continue;
            }

            let hints = generate_hints(&inventory, resource, &available, amount)?;
            out.insert(resource.clone(), Some(hints));
        }

        Ok(out)
    }
}

/// Enumerates `amount`-subsets of `available` and folds them into hints.
///
/// Every subset's affinity is the union of its devices' nodes; equal
/// affinities are deduplicated, and the finalisation pass marks those with
/// the minimum population count preferred.
fn generate_hints(
    inventory: &DeviceInventory,
    resource: &str,
    available: &[String],
    amount: usize,
) -> Result<HintSet, ProviderError> {
    // Resolve every device to its single-node mask up front so the
    // enumeration itself cannot fail.
    let mut node_masks = Vec::with_capacity(available.len());
    for id in available {
        let device = inventory
            .device(resource, id)
            .ok_or_else(|| ProviderError::Failed(format!("device {id} vanished from {resource}")))?;
        let Some(topology) = device.topology else {
            return Err(ProviderError::Failed(format!(
                "device {id} of {resource} lost its topology"
            )));
        };
        let mask = SocketMask::new(&[topology.node as usize]).map_err(|err| {
            ProviderError::Failed(format!("device {id} reports an unaddressable node: {err}"))
        })?;
        node_masks.push(mask);
    }

    let mut hints = HintSet::new();
    let mut min_width = SocketMask::filled().count();
    let mut chosen = Vec::with_capacity(amount);
    each_combination(node_masks.len(), amount, &mut chosen, &mut |subset| {
        let mut affinity = SocketMask::empty();
        affinity.or(subset.iter().map(|&index| node_masks[index]));

        if hints.iter().any(|hint| hint.affinity == affinity) {
            return;
        }
        min_width = min_width.min(affinity.count());
        hints.push(Hint::new(affinity, false));
    });

    for hint in &mut hints {
        hint.preferred = hint.affinity.count() == min_width;
    }
    Ok(hints)
}

/// Visits every `amount`-subset of `0..count` in lexicographic order.
fn each_combination(
    count: usize,
    amount: usize,
    chosen: &mut Vec<usize>,
    visit: &mut dyn FnMut(&[usize]),
) {
    if chosen.len() == amount {
        visit(chosen);
        return;
    }
    let start = chosen.last().map_or(0, |&last| last + 1);
    for index in start..count {
        chosen.push(index);
        each_combination(count, amount, chosen, visit);
        chosen.pop();
    }
}
