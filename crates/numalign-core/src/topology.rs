//! # Host Topology Probe
//!
//! Discovers the NUMA nodes present on this host:
//!
//! 1. sysfs parsing on Linux (`/sys/devices/system/node/`)
//! 2. Single-node fallback everywhere else
//!
//! The coordinator probes once at construction to log the machine shape and to
//! warn when the host has more nodes than a [`SocketMask`] can address.
//! Probing never fails; a host we cannot read is treated as single-node.
//!
//! [`SocketMask`]: crate::socketmask::SocketMask

use crate::socketmask::MASK_WIDTH;

/// The set of NUMA nodes present on this host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostTopology {
    /// Present node ids, ascending.
    nodes: Vec<usize>,
    /// Total logical CPUs.
    num_cpus: usize,
}

impl HostTopology {
    /// Probes the host, falling back to a single node when detection fails.
    #[must_use]
    pub fn probe() -> Self {
        #[cfg(target_os = "linux")]
        {
            if let Ok(topology) = Self::probe_sysfs() {
                return topology;
            }
        }

        Self::single_node_fallback()
    }

    /// Reads the present-node list from sysfs.
    #[cfg(target_os = "linux")]
    fn probe_sysfs() -> std::io::Result<Self> {
        use std::fs;

        let mut nodes = Vec::new();
        for entry in fs::read_dir("/sys/devices/system/node")? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(id) = name.strip_prefix("node") {
                if let Ok(id) = id.parse::<usize>() {
                    nodes.push(id);
                }
            }
        }

        if nodes.is_empty() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no NUMA nodes under /sys/devices/system/node",
            ));
        }

        nodes.sort_unstable();
        Ok(Self {
            nodes,
            num_cpus: num_cpus::get(),
        })
    }

    /// One node holding every CPU.
    fn single_node_fallback() -> Self {
        Self {
            nodes: vec![0],
            num_cpus: num_cpus::get(),
        }
    }

    /// Present node ids, ascending.
    #[must_use]
    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    /// Number of NUMA nodes.
    #[must_use]
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Total logical CPUs.
    #[must_use]
    pub fn num_cpus(&self) -> usize {
        self.num_cpus
    }

    /// Highest present node id.
    #[must_use]
    pub fn max_node_id(&self) -> usize {
        self.nodes.last().copied().unwrap_or(0)
    }

    /// Whether some present node id cannot be addressed by a socket mask.
    #[must_use]
    pub fn exceeds_mask_width(&self) -> bool {
        self.max_node_id() >= MASK_WIDTH
    }

    /// One-line shape summary for logs.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} NUMA node(s) {:?}, {} CPUs",
            self.num_nodes(),
            self.nodes,
            self.num_cpus
        )
    }
}
