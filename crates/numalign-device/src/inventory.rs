//! # Device Inventory
//!
//! Bookkeeping for device-plugin resources: which devices exist per resource,
//! which are healthy, and which are already handed to containers. The hint
//! generator reads `available = healthy \ allocated`.
//!
//! Device ids are kept in ordered sets so every enumeration over them is
//! canonical.

use std::collections::BTreeSet;

use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};

/// NUMA placement reported by a device plugin for one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceTopology {
    /// The NUMA node the device is attached to.
    pub node: u32,
}

/// One device unit as reported by its plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Plugin-scoped device identifier.
    pub id: String,
    /// Whether the plugin currently reports the device usable.
    pub healthy: bool,
    /// NUMA placement; absent when the plugin reports no topology.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topology: Option<DeviceTopology>,
}

impl Device {
    /// A healthy device on the given NUMA node.
    #[must_use]
    pub fn on_node(id: impl Into<String>, node: u32) -> Self {
        Self {
            id: id.into(),
            healthy: true,
            topology: Some(DeviceTopology { node }),
        }
    }

    /// A healthy device without topology information.
    #[must_use]
    pub fn without_topology(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            healthy: true,
            topology: None,
        }
    }
}

/// Errors from inventory mutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    /// The resource has never been registered.
    #[error("resource {resource} is not managed by the device inventory")]
    UnknownResource {
        /// The resource name.
        resource: String,
    },

    /// The device id is not in the resource's registry.
    #[error("device {id} is not registered for resource {resource}")]
    UnknownDevice {
        /// The resource name.
        resource: String,
        /// The device id.
        id: String,
    },

    /// The device is unhealthy or already allocated.
    #[error("device {id} of resource {resource} is not available")]
    DeviceUnavailable {
        /// The resource name.
        resource: String,
        /// The device id.
        id: String,
    },
}

/// Whether a resource name belongs to a device plugin.
///
/// Device-plugin resources are vendor-domain qualified (`vendor.com/gpu`);
/// native resources (`cpu`, `memory`) are not.
#[must_use]
pub fn is_device_plugin_resource(resource: &str) -> bool {
    resource.contains('/')
}

/// Per-resource device registry with healthy and allocated sets.
#[derive(Debug, Default)]
pub struct DeviceInventory {
    devices: FxHashMap<String, FxHashMap<String, Device>>,
    healthy: FxHashMap<String, BTreeSet<String>>,
    allocated: FxHashMap<String, BTreeSet<String>>,
    by_container: FxHashMap<String, Vec<(String, BTreeSet<String>)>>,
}

impl DeviceInventory {
    /// An empty inventory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the device list for a resource, as on a plugin refresh.
    ///
    /// The healthy set is rebuilt from the reported health bits; allocations
    /// are kept (a restarted plugin does not return devices already in use).
    pub fn update_devices(&mut self, resource: &str, devices: Vec<Device>) {
        let registry: FxHashMap<String, Device> = devices
            .into_iter()
            .map(|device| (device.id.clone(), device))
            .collect();
        let healthy: BTreeSet<String> = registry
            .values()
            .filter(|device| device.healthy)
            .map(|device| device.id.clone())
            .collect();

        self.devices.insert(resource.to_string(), registry);
        self.healthy.insert(resource.to_string(), healthy);
        self.allocated.entry(resource.to_string()).or_default();
    }

    /// Updates one device's health bit.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::UnknownResource`] or
    /// [`DeviceError::UnknownDevice`] when the target does not exist.
    pub fn set_health(&mut self, resource: &str, id: &str, healthy: bool) -> Result<(), DeviceError> {
        let registry = self
            .devices
            .get_mut(resource)
            .ok_or_else(|| DeviceError::UnknownResource {
                resource: resource.to_string(),
            })?;
        let device = registry.get_mut(id).ok_or_else(|| DeviceError::UnknownDevice {
            resource: resource.to_string(),
            id: id.to_string(),
        })?;

        device.healthy = healthy;
        let set = self.healthy.entry(resource.to_string()).or_default();
        if healthy {
            set.insert(id.to_string());
        } else {
            set.remove(id);
        }
        Ok(())
    }

    /// Marks devices as handed to a container.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::DeviceUnavailable`] if any id is unhealthy or
    /// already allocated; nothing is recorded in that case.
    pub fn allocate(
        &mut self,
        resource: &str,
        container_id: &str,
        ids: &[String],
    ) -> Result<(), DeviceError> {
        if !self.devices.contains_key(resource) {
            return Err(DeviceError::UnknownResource {
                resource: resource.to_string(),
            });
        }

        let available = self.available(resource);
        for id in ids {
            if !available.contains(id) {
                return Err(DeviceError::DeviceUnavailable {
                    resource: resource.to_string(),
                    id: id.clone(),
                });
            }
        }

        let allocated = self.allocated.entry(resource.to_string()).or_default();
        allocated.extend(ids.iter().cloned());
        self.by_container
            .entry(container_id.to_string())
            .or_default()
            .push((resource.to_string(), ids.iter().cloned().collect()));
        Ok(())
    }

    /// Returns every device held by a container to the available pool.
    ///
    /// Freeing an unknown container is a no-op.
    pub fn free(&mut self, container_id: &str) {
        let Some(held) = self.by_container.remove(container_id) else {
            return;
        };
        for (resource, ids) in held {
            if let Some(allocated) = self.allocated.get_mut(&resource) {
                for id in &ids {
                    allocated.remove(id);
                }
            }
        }
    }

    /// Whether the inventory has ever seen this resource.
    #[must_use]
    pub fn is_managed(&self, resource: &str) -> bool {
        self.devices.contains_key(resource)
    }

    /// Whether every registered device of the resource reports topology.
    ///
    /// A single topology-less device means the resource cannot be aligned.
    #[must_use]
    pub fn has_topology_alignment(&self, resource: &str) -> bool {
        self.devices.get(resource).is_some_and(|registry| {
            registry.values().all(|device| device.topology.is_some())
        })
    }

    /// Healthy devices not currently allocated, in canonical id order.
    #[must_use]
    pub fn available(&self, resource: &str) -> BTreeSet<String> {
        let Some(healthy) = self.healthy.get(resource) else {
            return BTreeSet::new();
        };
        match self.allocated.get(resource) {
            Some(allocated) => healthy.difference(allocated).cloned().collect(),
            None => healthy.clone(),
        }
    }

    /// Looks up a registered device.
    #[must_use]
    pub fn device(&self, resource: &str, id: &str) -> Option<&Device> {
        self.devices.get(resource)?.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GPU: &str = "vendor.com/gpu";

    fn inventory() -> DeviceInventory {
        let mut inventory = DeviceInventory::new();
        inventory.update_devices(
            GPU,
            vec![
                Device::on_node("dev1", 0),
                Device::on_node("dev2", 1),
                Device {
                    id: "dev3".to_string(),
                    healthy: false,
                    topology: Some(DeviceTopology { node: 0 }),
                },
            ],
        );
        inventory
    }

    #[test]
    fn test_is_device_plugin_resource() {
        assert!(is_device_plugin_resource("vendor.com/gpu"));
        assert!(!is_device_plugin_resource("cpu"));
        assert!(!is_device_plugin_resource("memory"));
    }

    #[test]
    fn test_available_excludes_unhealthy() {
        let inventory = inventory();
        let available = inventory.available(GPU);
        assert_eq!(
            available.into_iter().collect::<Vec<_>>(),
            vec!["dev1".to_string(), "dev2".to_string()]
        );
    }

    #[test]
    fn test_allocate_and_free() {
        let mut inventory = inventory();
        inventory
            .allocate(GPU, "container-a", &["dev1".to_string()])
            .unwrap();
        assert!(!inventory.available(GPU).contains("dev1"));

        // Double allocation of the same device fails and records nothing.
        let err = inventory
            .allocate(GPU, "container-b", &["dev1".to_string()])
            .unwrap_err();
        assert_eq!(
            err,
            DeviceError::DeviceUnavailable {
                resource: GPU.to_string(),
                id: "dev1".to_string(),
            }
        );

        inventory.free("container-a");
        assert!(inventory.available(GPU).contains("dev1"));

        // Unknown containers are ignored.
        inventory.free("container-never-seen");
    }

    #[test]
    fn test_allocate_unhealthy_fails() {
        let mut inventory = inventory();
        assert!(inventory
            .allocate(GPU, "container-a", &["dev3".to_string()])
            .is_err());
    }

    #[test]
    fn test_set_health_moves_device() {
        let mut inventory = inventory();
        inventory.set_health(GPU, "dev3", true).unwrap();
        assert!(inventory.available(GPU).contains("dev3"));

        inventory.set_health(GPU, "dev1", false).unwrap();
        assert!(!inventory.available(GPU).contains("dev1"));

        assert!(inventory.set_health("vendor.com/nic", "dev1", true).is_err());
        assert!(inventory.set_health(GPU, "dev99", true).is_err());
    }

    #[test]
    fn test_topology_alignment() {
        let mut inventory = inventory();
        assert!(inventory.has_topology_alignment(GPU));

        inventory.update_devices(
            "vendor.com/nic",
            vec![Device::on_node("nic1", 0), Device::without_topology("nic2")],
        );
        assert!(!inventory.has_topology_alignment("vendor.com/nic"));
        assert!(!inventory.has_topology_alignment("vendor.com/unknown"));
    }

    #[test]
    fn test_update_preserves_allocations() {
        let mut inventory = inventory();
        inventory
            .allocate(GPU, "container-a", &["dev1".to_string()])
            .unwrap();

        inventory.update_devices(GPU, vec![Device::on_node("dev1", 0), Device::on_node("dev2", 1)]);
        assert!(!inventory.available(GPU).contains("dev1"));
        assert!(inventory.available(GPU).contains("dev2"));
    }

    #[test]
    fn test_device_deserializes_without_topology() {
        let device: Device =
            serde_json::from_str(r#"{"id": "dev1", "healthy": true}"#).unwrap();
        assert_eq!(device, Device::without_topology("dev1"));
    }
}
