//! Spacetime collision checking: sample two move tables onto the
//! collider's fixed timestep grid and find the earliest colliding
//! sample (spec §4.3).

use crate::calibration::{Calibration, PositionerId};
use crate::collide::keepout::{FixedBoundary, KeepoutGeometry};
use crate::collide::{spatial_check, spatial_check_fixed, CollisionCase};
use crate::move_table::{MotionConstants, MoveTable};

/// Time-series result of executing one table from a given start, as seen by one
/// party to a (possible) collision (spec §3.5).
#[derive(Debug, Clone, PartialEq)]
pub struct Sweep {
    /// Sample index of the earliest collision, if any.
    pub collision_index: Option<usize>,
    /// Elapsed time of the earliest collision, seconds.
    pub collision_time: Option<f64>,
    /// Classification of the earliest collision.
    pub case: CollisionCase,
    /// The other party: a neighbor positioner id, or a fixed boundary tag.
    pub neighbor: Option<String>,
}

impl Sweep {
    /// A sweep recording no collision.
    pub fn clean() -> Self {
        Sweep {
            collision_index: None,
            collision_time: None,
            case: CollisionCase::NoCollision,
            neighbor: None,
        }
    }

    /// Whether this sweep found a collision.
    pub fn has_collision(&self) -> bool {
        self.case.is_collision()
    }
}

/// Sample both tables on a shared timestep grid from a common start time and
/// return the first index at which the spatial check is not `NoCollision`,
/// along with a [`Sweep`] from each party's perspective.
///
/// Ties (same sample index as another neighbor pair) are broken by the
/// caller iterating positioner ids in lexicographic order and keeping the
/// first collision recorded per positioner, per spec §4.3 ordering rules.
#[allow(clippy::too_many_arguments)]
pub fn spacetime_check(
    id_a: &str,
    geom_a: &KeepoutGeometry,
    calib_a: &Calibration,
    start_a: (f64, f64),
    table_a: &MoveTable,
    id_b: &str,
    geom_b: &KeepoutGeometry,
    calib_b: &Calibration,
    start_b: (f64, f64),
    table_b: &MoveTable,
    timestep: f64,
    mc: &MotionConstants,
) -> (Sweep, Sweep) {
    let duration_a = table_a.total_duration(mc, calib_a.creep_period);
    let duration_b = table_b.total_duration(mc, calib_b.creep_period);
    let duration = duration_a.max(duration_b);

    let steps = (duration / timestep).ceil() as usize + 1;
    for i in 0..=steps {
        let time = (i as f64 * timestep).min(duration);
        let (dt_a, dp_a) = table_a.position_at(time, mc, calib_a.creep_period);
        let (dt_b, dp_b) = table_b.position_at(time, mc, calib_b.creep_period);

        let placed_a = geom_a.place(start_a.0 + dt_a, start_a.1 + dp_a, calib_a);
        let placed_b = geom_b.place(start_b.0 + dt_b, start_b.1 + dp_b, calib_b);

        let case = spatial_check(&placed_a, &placed_b);
        if case.is_collision() {
            let (case_a, case_b) = mirrored_cases(case);
            return (
                Sweep {
                    collision_index: Some(i),
                    collision_time: Some(time),
                    case: case_a,
                    neighbor: Some(id_b.to_string()),
                },
                Sweep {
                    collision_index: Some(i),
                    collision_time: Some(time),
                    case: case_b,
                    neighbor: Some(id_a.to_string()),
                },
            );
        }

        if time >= duration {
            break;
        }
    }

    (Sweep::clean(), Sweep::clean())
}

/// As [`spacetime_check`], but against a single fixed boundary; only one
/// [`Sweep`] is produced (spec §4.3: "For fixed boundaries, only one Sweep").
pub fn spacetime_check_fixed(
    geom: &KeepoutGeometry,
    calib: &Calibration,
    start: (f64, f64),
    table: &MoveTable,
    boundary: &FixedBoundary,
    timestep: f64,
    mc: &MotionConstants,
) -> Sweep {
    let duration = table.total_duration(mc, calib.creep_period);
    let steps = (duration / timestep).ceil() as usize + 1;
    for i in 0..=steps {
        let time = (i as f64 * timestep).min(duration);
        let (dt, dp) = table.position_at(time, mc, calib.creep_period);
        let placed = geom.place(start.0 + dt, start.1 + dp, calib);
        let case = spatial_check_fixed(&placed, boundary);
        if case.is_collision() {
            return Sweep {
                collision_index: Some(i),
                collision_time: Some(time),
                case,
                neighbor: Some(boundary.tag.to_string()),
            };
        }
        if time >= duration {
            break;
        }
    }
    Sweep::clean()
}

/// A phi-hits-theta collision from `A`'s perspective is a theta-hit-by-phi collision
/// from `B`'s; phi-phi is symmetric.
fn mirrored_cases(case: CollisionCase) -> (CollisionCase, CollisionCase) {
    match case {
        CollisionCase::PhiHitsTheta => (CollisionCase::PhiHitsTheta, CollisionCase::ThetaHitByPhi),
        CollisionCase::ThetaHitByPhi => (CollisionCase::ThetaHitByPhi, CollisionCase::PhiHitsTheta),
        other => (other, other),
    }
}
