//! # NumaAlign Device Manager
//!
//! Device-plugin inventory and the reference topology hint provider.
//!
//! The [`DeviceManager`] tracks, per device-plugin resource, which devices
//! exist, which are healthy, and which are already allocated. As a
//! [`HintProvider`](numalign_core::HintProvider) it answers admissions by
//! enumerating the ways a container's request could be packed onto the
//! available devices and reporting each distinct NUMA affinity, minimum-width
//! options marked preferred.
//!
//! ## Example
//!
//! ```rust,ignore
//! use numalign_device::{Device, DeviceManager};
//!
//! let manager = Arc::new(DeviceManager::new());
//! manager.update_devices("vendor.com/gpu", vec![
//!     Device::on_node("gpu-0", 0),
//!     Device::on_node("gpu-1", 1),
//! ]);
//! coordinator.register(manager.clone());
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod hints;
pub mod inventory;

pub use hints::DeviceManager;
pub use inventory::{is_device_plugin_resource, Device, DeviceError, DeviceInventory, DeviceTopology};

/// Result type for device inventory operations.
pub type Result<T> = std::result::Result<T, DeviceError>;
