//! Errors returned by the balancing engine.
//!
//! Every error is terminal for the current invocation. The engine never relaxes a constraint
//! on its own: the caller decides whether to retry with a looser threshold, fall back to
//! [`Balancer::size_only_plan`](crate::balancer::Balancer::size_only_plan), or skip balancing.

use std::time::Duration;

/// Why a balancing run could not produce a plan.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BalanceError {
    /// The probability threshold is outside `(0.5, 1]`, or min-moves was requested for more
    /// groups than the exact search can handle.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The search completed but its result is outside the allowed gap.
    ///
    /// The exact search reports its per-player gap; the heuristic reports the distance between
    /// the two sides' mean ratings.
    #[error("Balance is impossible under requested tolerance: best gap {gap:.6} > allowed {allowed:.6} (a large clan or squad is likely dominating one side)")]
    InfeasibleTolerance {
        /// Best gap found.
        gap: f64,
        /// Allowed gap.
        allowed: f64,
    },

    /// No assignment of whole groups yields sides of the required size.
    #[error("Balance is impossible with current group sizes: {0}")]
    ImpossibleSizeConstraint(String),

    /// The heuristic retry loop did not converge.
    #[error("Heuristic balance exceeded its iteration limit ({limit})")]
    IterationLimitExceeded {
        /// Maximum number of placements that were allowed.
        limit: usize,
    },

    /// A deadline-bounded calculation did not finish in time and no fallback applied.
    #[error("Balance calculation did not finish within {0:?}")]
    DeadlineExceeded(Duration),
}

impl BalanceError {
    /// True for the errors caused by group sizes rather than skill.
    ///
    /// The heuristic's iteration limit is treated as a size problem: it only triggers when
    /// large groups keep forcing rollbacks.
    pub fn is_size_constraint(&self) -> bool {
        matches!(
            self,
            BalanceError::ImpossibleSizeConstraint(_) | BalanceError::IterationLimitExceeded { .. }
        )
    }
}

/// Result alias used across the engine.
pub type BalanceResult<T> = Result<T, BalanceError>;
