//! # NumaAlign Core
//!
//! The topology affinity coordination core of the NumaAlign node agent.
//!
//! On multi-socket hardware, independent resource managers each know which of
//! their units sit on which NUMA node. This crate combines their knowledge
//! into a single affinity decision per container:
//!
//! - **`SocketMask`**: fixed-width bitset over NUMA node ids with set algebra
//! - **Hints**: per-resource topology options `(affinity, preferred)`
//! - **Merger**: cross-provider conjunction picking the narrowest agreement
//! - **Policies**: `preferred` (advisory) and `strict` (reject misalignment)
//! - **Coordinator**: provider registry, admission gate, per-pod hint store
//!
//! ## Example
//!
//! ```rust,ignore
//! use numalign_core::{Coordinator, CoordinatorConfig};
//!
//! let coordinator = Coordinator::new(&CoordinatorConfig::default());
//! coordinator.register(device_manager.clone());
//!
//! let result = coordinator.admit(&pod);
//! if result.admit {
//!     let hint = coordinator.affinity(&pod.uid, "main");
//!     // allocators narrow their candidate sets to hint.affinity
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod coordinator;
pub mod hint;
pub mod merge;
pub mod metrics;
pub mod pod;
pub mod policy;
pub mod provider;
pub mod socketmask;
pub mod topology;

pub use config::CoordinatorConfig;
pub use coordinator::{AdmitResult, Coordinator, TOPOLOGY_AFFINITY_ERROR};
pub use hint::{Hint, HintSet};
pub use pod::{Container, Pod, PodUid, QosClass, ResourceList};
pub use policy::Policy;
pub use provider::{HintProvider, ProviderError, ResourceHints};
pub use socketmask::{MaskError, SocketMask, MASK_WIDTH};

/// Result type for numalign-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for numalign-core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Socket mask construction or mutation errors.
    #[error("mask error: {0}")]
    Mask(#[from] socketmask::MaskError),

    /// Hint provider errors.
    #[error("provider error: {0}")]
    Provider(#[from] provider::ProviderError),
}
