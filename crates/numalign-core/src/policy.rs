//! # Admission Policies
//!
//! What to do with a merged hint. `Preferred` treats the hint as advisory and
//! always admits; `Strict` admits only when every provider considered the
//! chosen affinity optimal.

use std::fmt;

use tracing::warn;

use crate::hint::Hint;

/// Policy applied to each container's merged hint at admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Always admit; the merged hint is advisory.
    Preferred,
    /// Admit only when the merged hint is preferred.
    Strict,
}

impl Policy {
    /// Parses a policy name from configuration.
    ///
    /// Unknown names fall back to [`Policy::Preferred`] with a warning.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "preferred" => Self::Preferred,
            "strict" => Self::Strict,
            unknown => {
                warn!(policy = unknown, "unknown topology policy, using preferred");
                Self::Preferred
            }
        }
    }

    /// The configuration name of this policy.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Preferred => "preferred",
            Self::Strict => "strict",
        }
    }

    /// Whether a container with this merged hint may be admitted.
    #[must_use]
    pub const fn accepts(&self, hint: &Hint) -> bool {
        match self {
            Self::Preferred => true,
            Self::Strict => hint.preferred,
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
