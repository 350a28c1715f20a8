//! Structured error kinds for admission and planning.
//!
//! Every rejection the scheduler can produce is a variant here rather
//! than a string or a panic; see spec §7. Admission failures are
//! reported per positioner and never unwind across the planning
//! boundary.

use thiserror::Error;

use crate::calibration::PositionerId;

/// Failure of a coordinate transform (forward or inverse kinematic).
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum TransformError {
    /// Target lies outside the reachable annulus `[|r1-r2|, r1+r2]`.
    #[error("target is unreachable: outside the positioner's arm annulus")]
    Unreachable,

    /// Target could not be wrapped into the requested travel range.
    #[error("target is out of range after wrap")]
    OutOfRange,
}

/// Failure of an admission request, see spec §4.5 and §7.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdmissionError {
    /// The positioner is not enabled for motion.
    #[error("positioner {0} is disabled")]
    Disabled(PositionerId),

    /// The positioner already has an admitted request in this schedule.
    #[error("positioner {0} already requested in this schedule")]
    AlreadyRequested(PositionerId),

    /// The requested target cannot be reached by this positioner's arms.
    #[error("positioner {0} target is unreachable")]
    Unreachable(PositionerId),

    /// The final (T,P) spatially collides with an already-admitted neighbor target.
    #[error("positioner {0} target interferes with neighbor {1}")]
    NeighborTargetInterference(PositionerId, PositionerId),

    /// The final ferrule position overlaps a fixed boundary.
    #[error("positioner {0} target is out of bounds (fixed boundary {1})")]
    OutOfBounds(PositionerId, &'static str),
}

/// Per-positioner planning diagnostics, not necessarily fatal to the schedule as a whole.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanningError {
    /// The tactic ladder was exhausted without resolving a collision, and freezing
    /// was not enabled for this call.
    #[error("positioner {0} has an unsolvable collision with {1}")]
    UnsolvableCollision(PositionerId, String),

    /// A generated sweep contained a per-step angular jump larger than the configured
    /// sanity threshold; the positioner is frozen and the caller is warned.
    #[error("positioner {0} sweep failed continuity check, frozen")]
    ContinuityFailure(PositionerId),
}
