//! Positioner identity and calibration records.
//!
//! See spec §3.1. Calibration is read-only to every other component in
//! this crate; the only way to produce a `Calibration` is through
//! [`Calibration::new`], which enforces the arm-length and range
//! invariants up front so the rest of the crate can assume they hold.

use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Stable string identifier for a positioner, unique within a petal.
pub type PositionerId = String;

/// Which of the two shaft axes a value pertains to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Axis {
    /// Central body (theta) axis.
    Theta,
    /// Arm (phi) axis.
    Phi,
}

/// Inclusive travel range, in degrees, on one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Range {
    /// Lower bound, degrees.
    pub min: f64,
    /// Upper bound, degrees.
    pub max: f64,
}

impl Range {
    /// Create a range, ordering the bounds so `min <= max`.
    pub fn new(a: f64, b: f64) -> Self {
        if a <= b {
            Range { min: a, max: b }
        } else {
            Range { min: b, max: a }
        }
    }

    /// Width of the range in degrees.
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Whether `value` falls within the closed range.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Whether `self` is fully contained within `other`.
    pub fn is_subset_of(&self, other: &Range) -> bool {
        self.min >= other.min && self.max <= other.max
    }
}

/// Per-axis current duty cycles (percent), used by the hardware serializer.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AxisCurrents {
    /// Spin-up/spin-down current, percent duty.
    pub spinupdown: f64,
    /// Cruise current, percent duty.
    pub cruise: f64,
    /// Creep current, percent duty.
    pub creep: f64,
    /// Holding current, percent duty.
    pub hold: f64,
}

/// Full calibration record for one positioner, see spec §3.1.
///
/// Constructed once through [`Calibration::new`], which is the only
/// mutation path outside a dedicated update; there is no `set_*` API,
/// callers build a fresh record and replace the one in the
/// [`CalibrationStore`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Calibration {
    /// Inner arm length, mm.
    pub length_r1: f64,
    /// Outer arm length, mm.
    pub length_r2: f64,
    /// Shaft-zero offset, theta, degrees.
    pub offset_t: f64,
    /// Shaft-zero offset, phi, degrees.
    pub offset_p: f64,
    /// Theta axis center, petal-local X, mm.
    pub offset_x: f64,
    /// Theta axis center, petal-local Y, mm.
    pub offset_y: f64,
    /// Fine gear-ratio correction, theta.
    pub gear_calib_t: f64,
    /// Fine gear-ratio correction, phi.
    pub gear_calib_p: f64,
    /// Total mechanical travel, theta, degrees.
    pub physical_range_t: Range,
    /// Total mechanical travel, phi, degrees.
    pub physical_range_p: Range,
    /// Travel admissible for scheduled moves, theta, degrees.
    pub targetable_range_t: Range,
    /// Travel admissible for scheduled moves, phi, degrees.
    pub targetable_range_p: Range,
    /// Whether this positioner participates in motion at all.
    pub ctrl_enabled: bool,
    /// Direction homing drives the theta axis, +1 or -1.
    pub principle_hardstop_direction_t: i8,
    /// Whether anti-backlash finishing moves are enabled.
    pub antibacklash_on: bool,
    /// Anti-backlash overshoot, degrees.
    pub backlash: f64,
    /// Preferred final-approach direction, theta, +1 or -1.
    pub backlash_direction_t: i8,
    /// Preferred final-approach direction, phi, +1 or -1.
    pub backlash_direction_p: i8,
    /// Whether creep-to-limits homing is enabled.
    pub creep_to_limits: bool,
    /// Creep step period, seconds.
    pub creep_period: f64,
    /// Spin-up/spin-down ramp period, seconds.
    pub spinupdown_period: f64,
    /// Theta axis currents.
    pub currents_t: AxisCurrents,
    /// Phi axis currents.
    pub currents_p: AxisCurrents,
}

impl Calibration {
    /// Build a calibration record, enforcing spec §3.1's invariants:
    /// positive arm lengths and targetable ranges nested inside physical ranges.
    ///
    /// Returns `Err` describing the first invariant violated instead of
    /// constructing an inconsistent record.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        length_r1: f64,
        length_r2: f64,
        offset_t: f64,
        offset_p: f64,
        offset_x: f64,
        offset_y: f64,
        gear_calib_t: f64,
        gear_calib_p: f64,
        physical_range_t: Range,
        physical_range_p: Range,
        targetable_range_t: Range,
        targetable_range_p: Range,
        ctrl_enabled: bool,
        principle_hardstop_direction_t: i8,
        antibacklash_on: bool,
        backlash: f64,
        backlash_direction_t: i8,
        backlash_direction_p: i8,
        creep_to_limits: bool,
        creep_period: f64,
        spinupdown_period: f64,
        currents_t: AxisCurrents,
        currents_p: AxisCurrents,
    ) -> Result<Self, &'static str> {
        if length_r1 <= 0.0 {
            return Err("length_r1 must be > 0");
        }
        if length_r2 <= 0.0 {
            return Err("length_r2 must be > 0");
        }
        if !targetable_range_t.is_subset_of(&physical_range_t) {
            return Err("targetable_range_t must be a subset of physical_range_t");
        }
        if !targetable_range_p.is_subset_of(&physical_range_p) {
            return Err("targetable_range_p must be a subset of physical_range_p");
        }
        Ok(Calibration {
            length_r1,
            length_r2,
            offset_t,
            offset_p,
            offset_x,
            offset_y,
            gear_calib_t,
            gear_calib_p,
            physical_range_t,
            physical_range_p,
            targetable_range_t,
            targetable_range_p,
            ctrl_enabled,
            principle_hardstop_direction_t,
            antibacklash_on,
            backlash,
            backlash_direction_t,
            backlash_direction_p,
            creep_to_limits,
            creep_period,
            spinupdown_period,
            currents_t,
            currents_p,
        })
    }

    /// Range for the given axis, see spec §3.2 range wrapping.
    pub fn targetable_range(&self, axis: Axis) -> Range {
        match axis {
            Axis::Theta => self.targetable_range_t,
            Axis::Phi => self.targetable_range_p,
        }
    }

    /// Physical range for the given axis.
    pub fn physical_range(&self, axis: Axis) -> Range {
        match axis {
            Axis::Theta => self.physical_range_t,
            Axis::Phi => self.physical_range_p,
        }
    }
}

/// Read-only, id-keyed snapshot of every positioner's calibration on a petal.
///
/// Replaces the cyclic positioner/schedule/collider/transform references
/// of the original design (spec §9) with a single arena that other
/// components borrow from for the duration of one planning call.
/// Writes go through an external state manager; this store never
/// mutates a record once inserted, only replaces it wholesale.
#[derive(Debug, Clone, Default)]
pub struct CalibrationStore {
    records: HashMap<PositionerId, Calibration>,
}

impl CalibrationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        CalibrationStore {
            records: HashMap::new(),
        }
    }

    /// Insert or replace the calibration record for `id`.
    pub fn insert(&mut self, id: impl Into<PositionerId>, calib: Calibration) {
        self.records.insert(id.into(), calib);
    }

    /// Look up a positioner's calibration.
    pub fn get(&self, id: &str) -> Option<&Calibration> {
        self.records.get(id)
    }

    /// Iterate over all known positioner ids, in sorted order.
    ///
    /// Sorted iteration is required wherever planning outcomes depend on
    /// iteration order (spec §5 ordering guarantees).
    pub fn sorted_ids(&self) -> Vec<PositionerId> {
        let mut ids: Vec<PositionerId> = self.records.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of positioners known to this store.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store has no positioners.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn currents() -> AxisCurrents {
        AxisCurrents {
            spinupdown: 70.0,
            cruise: 70.0,
            creep: 100.0,
            hold: 0.0,
        }
    }

    #[test]
    fn rejects_nonpositive_arm_length() {
        let result = Calibration::new(
            0.0,
            3.0,
            0.0,
            0.0,
            0.0,
            0.0,
            1.0,
            1.0,
            Range::new(-200.0, 200.0),
            Range::new(-20.0, 200.0),
            Range::new(-180.0, 180.0),
            Range::new(-10.0, 180.0),
            true,
            1,
            true,
            3.0,
            1,
            1,
            false,
            0.01,
            0.02,
            currents(),
            currents(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_targetable_range_exceeding_physical() {
        let result = Calibration::new(
            3.0,
            3.0,
            0.0,
            0.0,
            0.0,
            0.0,
            1.0,
            1.0,
            Range::new(-180.0, 180.0),
            Range::new(-20.0, 150.0),
            Range::new(-190.0, 190.0),
            Range::new(-10.0, 180.0),
            true,
            1,
            true,
            3.0,
            1,
            1,
            false,
            0.01,
            0.02,
            currents(),
            currents(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn sorted_ids_are_deterministic() {
        let mut store = CalibrationStore::new();
        let calib = Calibration::new(
            3.0,
            3.0,
            0.0,
            0.0,
            0.0,
            0.0,
            1.0,
            1.0,
            Range::new(-200.0, 200.0),
            Range::new(-20.0, 200.0),
            Range::new(-180.0, 180.0),
            Range::new(-10.0, 180.0),
            true,
            1,
            true,
            3.0,
            1,
            1,
            false,
            0.01,
            0.02,
            currents(),
            currents(),
        )
        .unwrap();
        store.insert("M05", calib.clone());
        store.insert("M01", calib.clone());
        store.insert("M12", calib);
        assert_eq!(store.sorted_ids(), vec!["M01", "M05", "M12"]);
    }
}
