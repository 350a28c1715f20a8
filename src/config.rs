//! Scheduler-wide tunables (spec §9 Open Question 2: the neighbor
//! clearance margin, and every other constant the tactic ladder and
//! collider need, are configuration rather than hard-coded).

use crate::move_table::MotionConstants;

/// How a request that ends up without anti-collision passes (a hard `add_table`
/// or a frozen positioner) should back off when jogging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JogBounds {
    /// Small jog magnitude, degrees, tried first (ladder steps 2/3).
    pub small_deg: f64,
    /// Large jog magnitude, degrees, tried if the small jog fails (ladder step 5).
    pub large_deg: f64,
}

/// All tunable parameters for one scheduler instance.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// Collider sampling period, seconds (spec default: 20ms).
    pub collider_timestep: f64,
    /// Margin added to a neighbor's computed clearance time, in timestep multiples.
    pub num_timesteps_clearance_margin: u32,
    /// Jog bounds for the retract/extend tactic (phi excursion).
    pub phi_jog: JogBounds,
    /// Jog bounds for the rotate tactic (theta excursion).
    pub theta_jog: JogBounds,
    /// Safe phi angle beyond which theta rotation cannot cause inter-positioner collisions.
    pub safe_phi_deg: f64,
    /// Power-anneal window, seconds, over which start times are spread per supply group.
    pub anneal_time: f64,
    /// Per-step angular jump above which a sweep is judged corrupt (spec §7 `ContinuityFailure`).
    pub continuity_sanity_threshold_deg: f64,
    /// Shared motor speed/step constants.
    pub motion: MotionConstants,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            collider_timestep: 0.02,
            num_timesteps_clearance_margin: 5,
            phi_jog: JogBounds {
                small_deg: 5.0,
                large_deg: 15.0,
            },
            theta_jog: JogBounds {
                small_deg: 5.0,
                large_deg: 15.0,
            },
            safe_phi_deg: 150.0,
            anneal_time: 3.0,
            continuity_sanity_threshold_deg: 30.0,
            motion: MotionConstants::default(),
        }
    }
}
