//! # Hint Merging
//!
//! Reduces the per-provider, per-resource hint lists for one container to a
//! single [`Hint`] by cross-provider conjunction:
//!
//! 1. Start from the identity `(full, preferred)` — no constraint.
//! 2. For every constraining hint list, intersect each working-set entry with
//!    each candidate hint (affinity AND, preferred AND), discarding empty
//!    intersections and deduping equal affinities in favour of `preferred`.
//! 3. Pick the narrowest survivor; ties prefer `preferred = true`, remaining
//!    ties break on the masks' lexicographic node order.
//!
//! An empty hint list means "impossible", and an empty final working set means
//! no mutually agreeable affinity exists; both yield the unconstrained
//! fallback `(full, not preferred)` and leave the verdict to the policy.
//!
//! The reduction is commutative and associative, so the merged hint does not
//! depend on provider registration or invocation order.

use tracing::{debug, warn};

use crate::hint::Hint;
use crate::provider::ResourceHints;
use crate::socketmask::SocketMask;

/// Merges all providers' hint lists for one container into a single hint.
#[must_use]
pub fn merge_hints(provider_hints: &[ResourceHints]) -> Hint {
    // Identity of the conjunction: an unconstrained merge stays admissible.
    let mut working = vec![Hint {
        affinity: SocketMask::filled(),
        preferred: true,
    }];

    for per_provider in provider_hints {
        for (resource, entry) in per_provider {
            let Some(hints) = entry else {
                debug!(%resource, "provider has no topology opinion, skipping");
                continue;
            };
            if hints.is_empty() {
                debug!(%resource, "provider reports request unsatisfiable");
                return Hint::infeasible();
            }
            working = intersect(&working, hints, resource);
            if working.is_empty() {
                return Hint::infeasible();
            }
        }
    }

    narrowest(&working)
}

/// Pairwise intersection of the working set with one provider's hint list.
fn intersect(working: &[Hint], hints: &[Hint], resource: &str) -> Vec<Hint> {
    let mut next: Vec<Hint> = Vec::with_capacity(working.len());
    for current in working {
        for hint in hints {
            if hint.affinity.is_empty() {
                warn!(resource, "dropping hint with empty affinity mask");
                continue;
            }
            let affinity = current.affinity & hint.affinity;
            if affinity.is_empty() {
                continue;
            }
            let preferred = current.preferred && hint.preferred;
            match next.iter_mut().find(|h| h.affinity == affinity) {
                Some(existing) => existing.preferred |= preferred,
                None => next.push(Hint { affinity, preferred }),
            }
        }
    }
    next
}

/// Selects the narrowest hint; preferred wins ties, then mask order.
fn narrowest(working: &[Hint]) -> Hint {
    working
        .iter()
        .copied()
        .min_by(|a, b| {
            a.affinity
                .count()
                .cmp(&b.affinity.count())
                .then_with(|| b.preferred.cmp(&a.preferred))
                .then_with(|| a.affinity.cmp(&b.affinity))
        })
        .unwrap_or_else(Hint::infeasible)
}
