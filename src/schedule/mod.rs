//! The schedule: admits target requests, builds the 3-stage
//! retract/rotate/extend move plan, and runs it through anti-collision
//! adjustment (spec §3.5, §4.5).

pub mod anneal;
pub mod request;
pub mod stage;

pub use request::{Command, Request};
pub use stage::{Stage, Tactic};

use std::collections::HashMap;

use log::info;

use crate::calibration::{CalibrationStore, PositionerId};
use crate::collide::keepout::{FixedBoundary, KeepoutGeometry};
use crate::config::SchedulerConfig;
use crate::error::{AdmissionError, PlanningError};
use crate::move_table::MoveTable;
use crate::transform::{self, PetalTransform, PosIntTP, RangeWrapLimits};

/// How a stage should behave once the tactic ladder is exhausted for a
/// positioner (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionMode {
    /// Do not attempt path adjustment; any collision is left for the caller to see.
    None,
    /// Run the tactic ladder; an unresolved collision is reported as an error
    /// and that positioner is frozen for the stage.
    Adjust,
    /// Run the tactic ladder; an unresolved collision freezes the positioner
    /// without surfacing an error (spec §4.4 "forced recursive freeze").
    ForcedRecursive,
}

/// One admitted request: its resolved target and the move table that will
/// carry the positioner from `start` to that target, split by the
/// retract/rotate/extend construction (spec §4.5).
#[derive(Debug, Clone, PartialEq)]
pub struct Admission {
    /// Position before this schedule's moves.
    pub start: PosIntTP,
    /// Resolved absolute target, after wrapping.
    pub target: PosIntTP,
    /// Opaque log note carried from the originating request.
    pub log_note: String,
}

/// Builds a single schedule cycle: a set of admitted requests, turned into
/// three stages (retract phi, rotate theta, extend phi) and checked/adjusted
/// for collisions.
pub struct Schedule<'a> {
    calibrations: &'a CalibrationStore,
    geometries: HashMap<PositionerId, KeepoutGeometry>,
    boundaries: Vec<FixedBoundary>,
    petal_transform: PetalTransform,
    config: SchedulerConfig,
    admissions: HashMap<PositionerId, Admission>,
}

impl<'a> Schedule<'a> {
    /// Start an empty schedule cycle.
    pub fn new(
        calibrations: &'a CalibrationStore,
        geometries: HashMap<PositionerId, KeepoutGeometry>,
        boundaries: Vec<FixedBoundary>,
        petal_transform: PetalTransform,
        config: SchedulerConfig,
    ) -> Self {
        Schedule {
            calibrations,
            geometries,
            boundaries,
            petal_transform,
            config,
            admissions: HashMap::new(),
        }
    }

    /// Resolve and admit one positioner's request against the current state
    /// of the schedule, enforcing spec §4.5/§7 admission rules.
    ///
    /// Does not check inter-positioner collisions yet (that happens when the
    /// stages run); it only rejects requests that cannot be resolved at all.
    pub fn request_target(
        &mut self,
        id: impl Into<PositionerId>,
        start: PosIntTP,
        request: &Request,
    ) -> Result<(), AdmissionError> {
        let id = id.into();
        let calib = self
            .calibrations
            .get(&id)
            .ok_or_else(|| AdmissionError::Unreachable(id.clone()))?;

        if !calib.ctrl_enabled {
            return Err(AdmissionError::Disabled(id));
        }
        if self.admissions.contains_key(&id) {
            return Err(AdmissionError::AlreadyRequested(id));
        }

        let target = request::resolve_target(request, calib, start, &self.petal_transform)
            .map_err(|_| AdmissionError::Unreachable(id.clone()))?;

        let geom = self
            .geometries
            .get(&id)
            .expect("admitted positioner must have keepout geometry");
        let placed = geom.place(target.t, target.p, calib);
        for boundary in &self.boundaries {
            if boundary.polygon.intersects_disk(placed.ferrule, placed.ferrule_radius) {
                return Err(AdmissionError::OutOfBounds(id, boundary.tag));
            }
        }

        for (other_id, admission) in &self.admissions {
            let other_calib = self
                .calibrations
                .get(other_id)
                .expect("admitted positioner must have a calibration record");
            let other_geom = self
                .geometries
                .get(other_id)
                .expect("admitted positioner must have keepout geometry");
            let other_placed = other_geom.place(admission.target.t, admission.target.p, other_calib);
            if crate::collide::spatial_check(&placed, &other_placed).is_collision() {
                return Err(AdmissionError::NeighborTargetInterference(
                    id,
                    other_id.clone(),
                ));
            }
        }

        info!("admitted positioner {} target ({:.3}, {:.3})", id, target.t, target.p);
        self.admissions.insert(
            id,
            Admission {
                start,
                target,
                log_note: request.log_note.clone(),
            },
        );
        Ok(())
    }

    /// Build the 3-stage retract/rotate/extend move plan for every admitted
    /// request and run each stage's anti-collision check (spec §4.5).
    ///
    /// Returns one merged [`MoveTable`] per admitted positioner. Errors are
    /// reported per positioner; a positioner named in the error map was
    /// frozen in place for the whole cycle rather than left half-adjusted.
    pub fn schedule_moves(
        &self,
        mode: CollisionMode,
        supply_groups: &HashMap<PositionerId, String>,
    ) -> (HashMap<PositionerId, MoveTable>, Vec<(PositionerId, PlanningError)>) {
        let mut retract = stage::Stage::new(
            self.calibrations,
            self.geometries.clone(),
            self.boundaries.clone(),
            self.config.clone(),
        );
        let mut rotate = stage::Stage::new(
            self.calibrations,
            self.geometries.clone(),
            self.boundaries.clone(),
            self.config.clone(),
        );
        let mut extend = stage::Stage::new(
            self.calibrations,
            self.geometries.clone(),
            self.boundaries.clone(),
            self.config.clone(),
        );

        for (id, admission) in &self.admissions {
            let calib = self.calibrations.get(id).expect("admitted id must resolve");
            let safe_phi = self.config.safe_phi_deg.max(admission.start.p).max(admission.target.p);
            let safe_phi = transform::wrap_into_targetable(
                PosIntTP {
                    t: admission.start.t,
                    p: safe_phi,
                },
                calib,
                RangeWrapLimits::Targetable,
            )
            .map(|tp| tp.p)
            .unwrap_or(safe_phi);

            retract.add_table(
                id.clone(),
                admission.start,
                MoveTable::direct(0.0, safe_phi - admission.start.p),
            );
            let after_retract = PosIntTP {
                t: admission.start.t,
                p: safe_phi,
            };
            rotate.add_table(
                id.clone(),
                after_retract,
                MoveTable::direct(admission.target.t - admission.start.t, 0.0),
            );
            let after_rotate = PosIntTP {
                t: admission.target.t,
                p: safe_phi,
            };
            extend.add_table(
                id.clone(),
                after_rotate,
                MoveTable::direct(0.0, admission.target.p - safe_phi),
            );
        }

        let mut failures = Vec::new();
        for stage in [&mut retract, &mut rotate, &mut extend] {
            stage.equalize_table_times();
            stage.anneal_tables(supply_groups);
            match mode {
                CollisionMode::None => {}
                CollisionMode::Adjust => {
                    if let Err(mut stage_failures) = stage.adjust_path(false) {
                        failures.append(&mut stage_failures);
                    }
                }
                CollisionMode::ForcedRecursive => {
                    let _ = stage.adjust_path(true);
                }
            }
        }

        let mut merged: HashMap<PositionerId, MoveTable> = HashMap::new();
        for id in self.admissions.keys() {
            let mut table = retract.tables.get(id).cloned().unwrap_or_default();
            if let Some(t) = rotate.tables.get(id) {
                table.extend(t);
            }
            if let Some(t) = extend.tables.get(id) {
                table.extend(t);
            }
            merged.insert(id.clone(), table);
        }

        (merged, failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::{AxisCurrents, Calibration, Range};
    use cgmath::Point2;

    fn calib() -> Calibration {
        Calibration::new(
            3.0, 3.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0,
            Range::new(-200.0, 200.0),
            Range::new(-20.0, 200.0),
            Range::new(-180.0, 180.0),
            Range::new(-10.0, 180.0),
            true, 1, true, 3.0, 1, 1, false, 0.01, 0.02,
            AxisCurrents { spinupdown: 70.0, cruise: 70.0, creep: 100.0, hold: 0.0 },
            AxisCurrents { spinupdown: 70.0, cruise: 70.0, creep: 100.0, hold: 0.0 },
        )
        .unwrap()
    }

    fn geom(center: Point2<f64>) -> KeepoutGeometry {
        let square = |side: f64| {
            let h = side / 2.0;
            crate::geom::Polygon::new(vec![
                Point2::new(-h, -h),
                Point2::new(h, -h),
                Point2::new(h, h),
                Point2::new(-h, h),
            ])
        };
        KeepoutGeometry {
            keepout_t: square(1.0),
            keepout_p: square(1.0),
            ferrule_radius: 0.1,
            center,
        }
    }

    #[test]
    fn disabled_positioner_is_rejected() {
        let mut store = CalibrationStore::new();
        let mut c = calib();
        c.ctrl_enabled = false;
        store.insert("A", c);
        let mut geoms = HashMap::new();
        geoms.insert("A".to_string(), geom(Point2::new(0.0, 0.0)));

        let mut schedule = Schedule::new(
            &store,
            geoms,
            vec![],
            PetalTransform::identity(),
            SchedulerConfig::default(),
        );
        let req = Request::new(Command::PosIntTP, (10.0, 20.0), "test");
        let result = schedule.request_target("A", PosIntTP { t: 0.0, p: 0.0 }, &req);
        assert_eq!(result, Err(AdmissionError::Disabled("A".to_string())));
    }

    #[test]
    fn duplicate_request_is_rejected() {
        let mut store = CalibrationStore::new();
        store.insert("A", calib());
        let mut geoms = HashMap::new();
        geoms.insert("A".to_string(), geom(Point2::new(0.0, 0.0)));

        let mut schedule = Schedule::new(
            &store,
            geoms,
            vec![],
            PetalTransform::identity(),
            SchedulerConfig::default(),
        );
        let req = Request::new(Command::PosIntTP, (10.0, 20.0), "test");
        schedule
            .request_target("A", PosIntTP { t: 0.0, p: 0.0 }, &req)
            .unwrap();
        let result = schedule.request_target("A", PosIntTP { t: 0.0, p: 0.0 }, &req);
        assert_eq!(result, Err(AdmissionError::AlreadyRequested("A".to_string())));
    }

    #[test]
    fn admitted_request_produces_a_merged_table() {
        let mut store = CalibrationStore::new();
        store.insert("A", calib());
        let mut geoms = HashMap::new();
        geoms.insert("A".to_string(), geom(Point2::new(0.0, 0.0)));

        let mut schedule = Schedule::new(
            &store,
            geoms,
            vec![],
            PetalTransform::identity(),
            SchedulerConfig::default(),
        );
        let req = Request::new(Command::PosIntTP, (45.0, 120.0), "test");
        schedule
            .request_target("A", PosIntTP { t: 0.0, p: 90.0 }, &req)
            .unwrap();

        let (tables, failures) = schedule.schedule_moves(CollisionMode::Adjust, &HashMap::new());
        assert!(failures.is_empty());
        let table = &tables["A"];
        assert!((table.for_cleanup().0 - 45.0).abs() < 1e-9);
        assert!((table.for_cleanup().1 - 30.0).abs() < 1e-9);
    }
}
