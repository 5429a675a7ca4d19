//! Termination policies (§4.9, §4.10, §6): the conditions under which a
//! driver loop stops issuing updates, shared by refinement and decimation.

use crate::error_metrics::global_norm;
use crate::history::sink::Norm;

/// Which direction a running error norm must cross to satisfy
/// [`TerminationPolicy::ErrorLevel`]: refinement stops once error falls to
/// or below the level, decimation stops once it climbs back up to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorDirection {
    /// Stop once the norm is `<= level` (refinement).
    Falling,
    /// Stop once the norm is `>= level` (decimation).
    Rising,
}

/// A driver's stop condition (`TERM_NUPD` / `TERM_ERR` / `NO_TERM`).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TerminationPolicy {
    /// Run until the candidate source is exhausted.
    NoTerm,
    /// Stop once the update count reaches `limit`.
    UpdateCount {
        /// Maximum number of successful updates to apply.
        limit: u64,
    },
    /// Stop once `norm` crosses `level` in `direction`.
    ErrorLevel {
        /// Which global norm to evaluate.
        norm: Norm,
        /// Threshold the norm must cross.
        level: f64,
        /// Which way the crossing must go to trigger termination.
        direction: ErrorDirection,
    },
}

impl TerminationPolicy {
    /// True if the policy says to stop, given the update count so far and
    /// the live triangles' head errors.
    #[must_use]
    pub fn should_stop(&self, updates_applied: u64, head_errors: &[f64]) -> bool {
        match *self {
            Self::NoTerm => false,
            Self::UpdateCount { limit } => updates_applied >= limit,
            Self::ErrorLevel { norm, level, direction } => {
                let value = global_norm(norm, head_errors);
                match direction {
                    ErrorDirection::Falling => value <= level,
                    ErrorDirection::Rising => value >= level,
                }
            }
        }
    }
}
