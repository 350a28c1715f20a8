//! One scheduling stage: a batch of move tables checked together and,
//! when colliding, walked through the tactic ladder (spec §3.5, §4.4).

use std::collections::{HashMap, HashSet};

use log::{debug, warn};

use crate::calibration::{Calibration, CalibrationStore, PositionerId};
use crate::collide::keepout::{FixedBoundary, KeepoutGeometry, NeighborGraph};
use crate::collide::sweep::{spacetime_check, spacetime_check_fixed, Sweep};
use crate::config::SchedulerConfig;
use crate::error::PlanningError;
use crate::move_table::MoveTable;
use crate::transform::PosIntTP;

/// One tactic tried against a colliding positioner, in ladder order (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tactic {
    /// Insert a prepause so the move starts later.
    Pause,
    /// Retract (increase) phi by the small jog before proceeding.
    RetractSmall,
    /// Extend (decrease) phi by the small jog before proceeding.
    ExtendSmall,
    /// Rotate theta counter-clockwise by the small jog before proceeding.
    RotateCcwSmall,
    /// Rotate theta clockwise by the small jog before proceeding.
    RotateCwSmall,
    /// Retract phi by the large jog before proceeding.
    RetractLarge,
    /// Extend phi by the large jog before proceeding.
    ExtendLarge,
    /// Rotate theta counter-clockwise by the large jog before proceeding.
    RotateCcwLarge,
    /// Rotate theta clockwise by the large jog before proceeding.
    RotateCwLarge,
    /// Give up and hold the positioner at its start position for this stage.
    Freeze,
}

const LADDER: [Tactic; 9] = [
    Tactic::Pause,
    Tactic::RetractSmall,
    Tactic::ExtendSmall,
    Tactic::RotateCcwSmall,
    Tactic::RotateCwSmall,
    Tactic::RetractLarge,
    Tactic::ExtendLarge,
    Tactic::RotateCcwLarge,
    Tactic::RotateCwLarge,
];

/// A batch of positioner moves checked together for collisions and,
/// when necessary, adjusted via the tactic ladder.
pub struct Stage<'a> {
    calibrations: &'a CalibrationStore,
    geometries: HashMap<PositionerId, KeepoutGeometry>,
    boundaries: Vec<FixedBoundary>,
    /// Pre-move position for every positioner entered into this stage.
    pub starts: HashMap<PositionerId, PosIntTP>,
    /// Move table (relative to `starts`) for every positioner entered into this stage.
    pub tables: HashMap<PositionerId, MoveTable>,
    /// Positioners frozen by this stage (no table, or table forced to a no-op).
    pub frozen: HashSet<PositionerId>,
    config: SchedulerConfig,
}

impl<'a> Stage<'a> {
    /// Start an empty stage bound to a calibration store and fixed-boundary set.
    pub fn new(
        calibrations: &'a CalibrationStore,
        geometries: HashMap<PositionerId, KeepoutGeometry>,
        boundaries: Vec<FixedBoundary>,
        config: SchedulerConfig,
    ) -> Self {
        Stage {
            calibrations,
            geometries,
            boundaries,
            starts: HashMap::new(),
            tables: HashMap::new(),
            frozen: HashSet::new(),
            config,
        }
    }

    /// Enter a positioner's move into this stage.
    pub fn add_table(&mut self, id: impl Into<PositionerId>, start: PosIntTP, table: MoveTable) {
        let id = id.into();
        self.starts.insert(id.clone(), start);
        self.tables.insert(id, table);
    }

    fn calib(&self, id: &str) -> &Calibration {
        self.calibrations
            .get(id)
            .expect("stage entry without a calibration record")
    }

    fn geom(&self, id: &str) -> &KeepoutGeometry {
        self.geometries
            .get(id)
            .expect("stage entry without a keepout geometry")
    }

    /// Pad every table's final postpause so all tables in the stage finish
    /// at the same wall-clock time (spec §4.2 "equalizing postpause").
    pub fn equalize_table_times(&mut self) {
        let mc = &self.config.motion;
        let longest = self
            .tables
            .iter()
            .map(|(id, t)| t.total_duration(mc, self.calib(id).creep_period))
            .fold(0.0_f64, f64::max);
        let creep_periods: HashMap<PositionerId, f64> = self
            .tables
            .keys()
            .map(|id| (id.clone(), self.calib(id).creep_period))
            .collect();
        for (id, table) in self.tables.iter_mut() {
            table.pad_to_time(longest, mc, creep_periods[id]);
        }
    }

    /// Run every pairwise and fixed-boundary spacetime check for this stage's
    /// current tables (spec §4.3). Returns one [`Sweep`] per positioner,
    /// keyed by id; a clean sweep means that positioner is currently safe.
    pub fn find_collisions(&self) -> HashMap<PositionerId, Sweep> {
        let mut results: HashMap<PositionerId, Sweep> = self
            .tables
            .keys()
            .map(|id| (id.clone(), Sweep::clean()))
            .collect();

        let graph = NeighborGraph::build(self.calibrations, &self.geometries, &self.boundaries, 0.0);

        let mut ids: Vec<PositionerId> = self.tables.keys().cloned().collect();
        ids.sort();

        for id in &ids {
            let id: &str = id.as_str();
            if results[id].has_collision() {
                continue;
            }
            let start = self.starts[id];
            let table = &self.tables[id];
            let calib = self.calib(id);
            let geom = self.geom(id);

            for neighbor in graph.pos_neighbors(id) {
                let neighbor: &str = neighbor.as_str();
                if !self.tables.contains_key(neighbor) {
                    continue;
                }
                if results[neighbor].has_collision() {
                    continue;
                }
                let (sweep_self, sweep_other) = spacetime_check(
                    id,
                    geom,
                    calib,
                    (start.t, start.p),
                    table,
                    neighbor,
                    self.geom(neighbor),
                    self.calib(neighbor),
                    (self.starts[neighbor].t, self.starts[neighbor].p),
                    &self.tables[neighbor],
                    self.config.collider_timestep,
                    &self.config.motion,
                );
                if sweep_self.has_collision() {
                    results.insert(id.to_string(), sweep_self);
                    results.insert(neighbor.to_string(), sweep_other);
                    break;
                }
            }
            if results[id].has_collision() {
                continue;
            }
            for tag in graph.fixed_neighbors(id) {
                let boundary = match self.boundaries.iter().find(|b| &b.tag == tag) {
                    Some(b) => b,
                    None => continue,
                };
                let sweep = spacetime_check_fixed(
                    geom,
                    calib,
                    (start.t, start.p),
                    table,
                    boundary,
                    self.config.collider_timestep,
                    &self.config.motion,
                );
                if sweep.has_collision() {
                    results.insert(id.to_string(), sweep);
                    break;
                }
            }
        }

        results
    }

    /// Anneal every table's move-start time against the others sharing a
    /// power-supply group, flattening peak draw (spec §5).
    ///
    /// `supply_groups` maps each positioner id to its supply group tag.
    pub fn anneal_tables(&mut self, supply_groups: &HashMap<PositionerId, String>) {
        crate::schedule::anneal::anneal(&mut self.tables, supply_groups, self.config.anneal_time);
    }

    /// Run the full tactic ladder for every positioner that collides,
    /// re-checking after each tactic until the stage is clean or every
    /// positioner's ladder is exhausted.
    ///
    /// When `forced_recursive` is set, exhausting the ladder freezes the
    /// positioner in place (spec §4.4 "forced recursive freeze") instead of
    /// surfacing [`PlanningError::UnsolvableCollision`].
    pub fn adjust_path(
        &mut self,
        forced_recursive: bool,
    ) -> Result<(), Vec<(PositionerId, PlanningError)>> {
        let mut failures = Vec::new();
        let mut attempted: HashMap<PositionerId, usize> = HashMap::new();

        loop {
            let collisions = self.find_collisions();
            let mut colliding: Vec<&PositionerId> = collisions
                .iter()
                .filter(|(_, s)| s.has_collision())
                .map(|(id, _)| id)
                .collect();
            colliding.sort();

            if colliding.is_empty() {
                break;
            }

            let mut progressed = false;
            for id in colliding {
                if self.frozen.contains(id) {
                    continue;
                }
                let step = attempted.entry(id.clone()).or_insert(0);
                if *step >= LADDER.len() {
                    if forced_recursive {
                        self.freeze(id);
                        progressed = true;
                        continue;
                    } else {
                        let neighbor = collisions[id].neighbor.clone().unwrap_or_default();
                        failures.push((
                            id.clone(),
                            PlanningError::UnsolvableCollision(id.clone(), neighbor),
                        ));
                        self.freeze(id);
                        continue;
                    }
                }
                let tactic = LADDER[*step];
                *step += 1;
                debug!("positioner {} trying tactic {:?}", id, tactic);
                self.apply_tactic(id, tactic);
                progressed = true;
            }

            if !progressed {
                break;
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures)
        }
    }

    fn apply_tactic(&mut self, id: &str, tactic: Tactic) {
        let table = match self.tables.get_mut(id) {
            Some(t) => t,
            None => return,
        };
        match tactic {
            Tactic::Pause => {
                if table.is_empty() {
                    table.insert_new_row(0);
                }
                table.set_prepause(0, 0.25);
            }
            Tactic::RetractSmall => jog_phi(table, self.config.phi_jog.small_deg),
            Tactic::ExtendSmall => jog_phi(table, -self.config.phi_jog.small_deg),
            Tactic::RotateCcwSmall => jog_theta(table, self.config.theta_jog.small_deg),
            Tactic::RotateCwSmall => jog_theta(table, -self.config.theta_jog.small_deg),
            Tactic::RetractLarge => jog_phi(table, self.config.phi_jog.large_deg),
            Tactic::ExtendLarge => jog_phi(table, -self.config.phi_jog.large_deg),
            Tactic::RotateCcwLarge => jog_theta(table, self.config.theta_jog.large_deg),
            Tactic::RotateCwLarge => jog_theta(table, -self.config.theta_jog.large_deg),
            Tactic::Freeze => self.freeze(id),
        }
    }

    fn freeze(&mut self, id: &str) {
        warn!("freezing positioner {} in place for this stage", id);
        if let Some(table) = self.tables.get_mut(id) {
            *table = MoveTable::direct(0.0, 0.0);
        }
        self.frozen.insert(id.to_string());
    }
}

fn jog_phi(table: &mut MoveTable, degrees: f64) {
    table.insert_new_row(0);
    table.set_move(0, crate::calibration::Axis::Phi, degrees, crate::move_table::SpeedMode::Cruise);
}

fn jog_theta(table: &mut MoveTable, degrees: f64) {
    table.insert_new_row(0);
    table.set_move(0, crate::calibration::Axis::Theta, degrees, crate::move_table::SpeedMode::Cruise);
}
