//! Time-quantized per-axis motion rows (spec §3.3, §4.2).
//!
//! A [`MoveTable`] belongs to one positioner and holds an ordered
//! sequence of [`Row`]s. Each row requests an ideal angular delta on
//! each axis; [`MotionConstants`] turns that into motor step counts and
//! elapsed time the way the firmware's own speed curves would.

use crate::calibration::{Axis, Calibration};

/// Motor speed/step constants not carried in spec.md's calibration record
/// (spec §9 Open Question 2 makes the same point about the clearance
/// margin: "preserve it as a configuration parameter rather than a
/// hard-coded value"). These are shared across all positioners on a
/// petal, unlike per-axis currents which are per-positioner calibration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionConstants {
    /// Steady cruise angular speed, degrees/second.
    pub cruise_speed_deg_per_sec: f64,
    /// Angular step size at creep speed, degrees/step.
    pub creep_step_deg: f64,
    /// Motor steps per degree, used to convert an angular delta to a step count.
    pub motor_steps_per_deg: f64,
}

impl Default for MotionConstants {
    fn default() -> Self {
        MotionConstants {
            cruise_speed_deg_per_sec: 9.89,
            creep_step_deg: 0.1,
            motor_steps_per_deg: 100.0,
        }
    }
}

/// Cruise or creep motor speed mode, see spec §3.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpeedMode {
    /// Fast, ramped motion.
    Cruise,
    /// Slow, step-for-step motion used near hardstops and for final approach.
    Creep,
}

/// One row of a move table: a per-axis ideal displacement plus pauses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Row {
    /// Ideal angular delta, theta axis, degrees.
    pub delta_t_deg: f64,
    /// Ideal angular delta, phi axis, degrees.
    pub delta_p_deg: f64,
    /// Speed mode, theta axis.
    pub speed_mode_t: SpeedMode,
    /// Speed mode, phi axis.
    pub speed_mode_p: SpeedMode,
    /// Pause before motion starts, seconds.
    pub prepause: f64,
    /// Pause after motion ends, seconds.
    pub postpause: f64,
}

impl Row {
    /// A row with zero displacement and zero pauses.
    pub fn zero() -> Self {
        Row {
            delta_t_deg: 0.0,
            delta_p_deg: 0.0,
            speed_mode_t: SpeedMode::Cruise,
            speed_mode_p: SpeedMode::Cruise,
            prepause: 0.0,
            postpause: 0.0,
        }
    }

    fn axis_delta(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Theta => self.delta_t_deg,
            Axis::Phi => self.delta_p_deg,
        }
    }

    fn axis_mode(&self, axis: Axis) -> SpeedMode {
        match axis {
            Axis::Theta => self.speed_mode_t,
            Axis::Phi => self.speed_mode_p,
        }
    }

    /// Net elapsed time for this row: the slower axis, plus pauses (spec §4.2).
    pub fn net_time(&self, mc: &MotionConstants, creep_period: f64) -> f64 {
        let t_time = self.axis_move_time_with_creep(Axis::Theta, mc, creep_period);
        let p_time = self.axis_move_time_with_creep(Axis::Phi, mc, creep_period);
        t_time.max(p_time) + self.prepause + self.postpause
    }

    fn axis_move_time_with_creep(&self, axis: Axis, mc: &MotionConstants, creep_period: f64) -> f64 {
        let delta = self.axis_delta(axis).abs();
        match self.axis_mode(axis) {
            SpeedMode::Cruise => delta / mc.cruise_speed_deg_per_sec,
            SpeedMode::Creep => (delta / mc.creep_step_deg) * creep_period,
        }
    }

    /// Motor step count for the given axis, signed: positive means counter-clockwise.
    pub fn motor_steps(&self, axis: Axis, mc: &MotionConstants) -> i32 {
        (self.axis_delta(axis) * mc.motor_steps_per_deg).round() as i32
    }
}

/// A single post-move deferred cleanup command, discarded if the owning
/// request is rejected (spec §5).
#[derive(Debug, Clone, PartialEq)]
pub enum PostMoveCleanup {
    /// After this move completes, set the axis's internal position to the hardstop value.
    SetPosToHardstop {
        /// Which axis.
        axis: Axis,
        /// Value to assign, degrees.
        value_deg: f64,
    },
}

/// Outbound row for the hardware serializer (spec §4.2, §6).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HardwareRow {
    /// Signed motor step count, theta.
    pub motor_steps_t: i32,
    /// Signed motor step count, phi.
    pub motor_steps_p: i32,
    /// Speed mode, theta.
    pub speed_mode_t: SpeedMode,
    /// Speed mode, phi.
    pub speed_mode_p: SpeedMode,
    /// Move time, seconds.
    pub move_time: f64,
    /// Postpause, milliseconds.
    pub postpause_ms: u32,
}

/// Ordered sequence of motion rows for one positioner (spec §3.3).
#[derive(Debug, Clone, PartialEq)]
pub struct MoveTable {
    rows: Vec<Row>,
    /// Permits angles outside `targetable_range_*` (reserved for homing/debounce).
    pub allow_exceed_limits: bool,
    /// Deferred cleanup queued by planning, executed by the caller after hardware completion.
    pub post_move_cleanup: Vec<PostMoveCleanup>,
}

impl MoveTable {
    /// An empty table.
    pub fn new() -> Self {
        MoveTable {
            rows: Vec::new(),
            allow_exceed_limits: false,
            post_move_cleanup: Vec::new(),
        }
    }

    /// Build a direct single-row table moving by `(dt, dp)` degrees, at cruise speed,
    /// with zero pauses (the starting point before any path adjustment, spec §4.4
    /// `initialize_move_tables`).
    pub fn direct(dt: f64, dp: f64) -> Self {
        let mut table = MoveTable::new();
        table.rows.push(Row {
            delta_t_deg: dt,
            delta_p_deg: dp,
            speed_mode_t: SpeedMode::Cruise,
            speed_mode_p: SpeedMode::Cruise,
            prepause: 0.0,
            postpause: 0.0,
        });
        table
    }

    /// Borrow the rows.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Set the ideal displacement (and speed mode) for one axis of `row`.
    pub fn set_move(&mut self, row: usize, axis: Axis, delta_degrees: f64, mode: SpeedMode) {
        let r = &mut self.rows[row];
        match axis {
            Axis::Theta => {
                r.delta_t_deg = delta_degrees;
                r.speed_mode_t = mode;
            }
            Axis::Phi => {
                r.delta_p_deg = delta_degrees;
                r.speed_mode_p = mode;
            }
        }
    }

    /// Set the prepause on `row`, seconds.
    pub fn set_prepause(&mut self, row: usize, seconds: f64) {
        self.rows[row].prepause = seconds.max(0.0);
    }

    /// Set the postpause on `row`, seconds.
    pub fn set_postpause(&mut self, row: usize, seconds: f64) {
        self.rows[row].postpause = seconds.max(0.0);
    }

    /// Insert a zero row at `idx`, shifting subsequent rows back.
    pub fn insert_new_row(&mut self, idx: usize) {
        self.rows.insert(idx, Row::zero());
    }

    /// Remove the row at `idx`.
    pub fn delete_row(&mut self, idx: usize) {
        self.rows.remove(idx);
    }

    /// Append another table's rows to the end of this one (stage concatenation, spec §4.5).
    pub fn extend(&mut self, other: &MoveTable) {
        self.rows.extend_from_slice(&other.rows);
        self.post_move_cleanup
            .extend_from_slice(&other.post_move_cleanup);
    }

    /// Append a trailing row that only holds a postpause, long enough that this
    /// table's total net time reaches `target_time` (spec §4.4 `equalize_table_times`).
    pub fn pad_to_time(&mut self, target_time: f64, mc: &MotionConstants, creep_period: f64) {
        let current = self.cumulative_net_time(mc, creep_period);
        if target_time > current {
            let mut row = Row::zero();
            row.postpause = target_time - current;
            self.rows.push(row);
        }
    }

    /// Total net elapsed time across all rows.
    pub fn cumulative_net_time(&self, mc: &MotionConstants, creep_period: f64) -> f64 {
        self.rows.iter().map(|r| r.net_time(mc, creep_period)).sum()
    }

    /// Cumulative angular delta committed on `axis` across all rows.
    pub fn cumulative_delta(&self, axis: Axis) -> f64 {
        self.rows.iter().map(|r| r.axis_delta(axis)).sum()
    }

    /// Truncate this table to its first `keep_rows` rows (used by `freeze`, spec §4.4).
    pub fn truncate(&mut self, keep_rows: usize) {
        self.rows.truncate(keep_rows);
    }

    /// Total net elapsed time across all rows (alias of `cumulative_net_time`,
    /// named for readability at spacetime-check call sites).
    pub fn total_duration(&self, mc: &MotionConstants, creep_period: f64) -> f64 {
        self.cumulative_net_time(mc, creep_period)
    }

    /// Query the cumulative `(T, P)` delta reached at elapsed time `time` (clamped to
    /// the table's own duration). Used by the collider to sample two tables on a
    /// shared absolute timestep grid regardless of how their row boundaries line up.
    pub fn position_at(&self, time: f64, mc: &MotionConstants, creep_period: f64) -> (f64, f64) {
        let mut t_acc = 0.0;
        let mut p_acc = 0.0;
        let mut elapsed = 0.0;

        for row in &self.rows {
            let row_time = row.net_time(mc, creep_period);
            if row_time <= 0.0 {
                continue;
            }
            if time <= elapsed + row_time {
                let within = time - elapsed;
                let motion_start = row.prepause;
                let motion_end = row_time - row.postpause;
                let progress = if within <= motion_start {
                    0.0
                } else if within >= motion_end {
                    1.0
                } else if motion_end > motion_start {
                    (within - motion_start) / (motion_end - motion_start)
                } else {
                    1.0
                };
                return (
                    t_acc + row.delta_t_deg * progress,
                    p_acc + row.delta_p_deg * progress,
                );
            }
            elapsed += row_time;
            t_acc += row.delta_t_deg;
            p_acc += row.delta_p_deg;
        }
        (t_acc, p_acc)
    }

    /// Lazily sample this table onto a fixed timestep grid for collision analysis
    /// (spec §4.2 `for_collider`). Returns, for each sample, the elapsed time, the
    /// cumulative `(T, P)` delta reached by that time relative to the table's start,
    /// and whether motion is in progress (as opposed to sitting in a pause).
    pub fn for_collider(
        &self,
        timestep: f64,
        mc: &MotionConstants,
        creep_period: f64,
    ) -> Vec<ColliderSample> {
        let mut samples = Vec::new();
        let mut t_acc = 0.0;
        let mut p_acc = 0.0;
        let mut time = 0.0;
        samples.push(ColliderSample {
            time,
            delta_t: 0.0,
            delta_p: 0.0,
            moving: false,
        });

        for row in &self.rows {
            let row_time = row.net_time(mc, creep_period);
            if row_time <= 0.0 {
                continue;
            }
            let motion_start = row.prepause;
            let motion_end = row_time - row.postpause;
            let mut t = timestep;
            while t < row_time {
                let progress = if t <= motion_start {
                    0.0
                } else if t >= motion_end {
                    1.0
                } else if motion_end > motion_start {
                    (t - motion_start) / (motion_end - motion_start)
                } else {
                    1.0
                };
                let moving = t > motion_start && t < motion_end;
                samples.push(ColliderSample {
                    time: time + t,
                    delta_t: t_acc + row.delta_t_deg * progress,
                    delta_p: p_acc + row.delta_p_deg * progress,
                    moving,
                });
                t += timestep;
            }
            time += row_time;
            t_acc += row.delta_t_deg;
            p_acc += row.delta_p_deg;
            samples.push(ColliderSample {
                time,
                delta_t: t_acc,
                delta_p: p_acc,
                moving: false,
            });
        }

        samples
    }

    /// Serialize this table for hardware delivery (spec §4.2 `for_hardware`, §6).
    ///
    /// Appends anti-backlash overshoot and final creep as trailing rows when
    /// `calib.antibacklash_on` and the last row's net delta on an axis runs in
    /// the non-preferred direction, and merges adjacent rows with identical
    /// step counts and speed modes.
    pub fn for_hardware(&self, calib: &Calibration, mc: &MotionConstants) -> Vec<HardwareRow> {
        let mut rows: Vec<HardwareRow> = self
            .rows
            .iter()
            .map(|r| HardwareRow {
                motor_steps_t: r.motor_steps(Axis::Theta, mc),
                motor_steps_p: r.motor_steps(Axis::Phi, mc),
                speed_mode_t: r.speed_mode_t,
                speed_mode_p: r.speed_mode_p,
                move_time: r.net_time(mc, calib.creep_period),
                postpause_ms: (r.postpause * 1000.0).round() as u32,
            })
            .collect();

        if calib.antibacklash_on {
            if let Some(last) = self.rows.last() {
                append_backlash_row(
                    &mut rows,
                    Axis::Theta,
                    last.delta_t_deg,
                    calib.backlash_direction_t,
                    calib.backlash,
                    mc,
                    calib.creep_period,
                );
                append_backlash_row(
                    &mut rows,
                    Axis::Phi,
                    last.delta_p_deg,
                    calib.backlash_direction_p,
                    calib.backlash,
                    mc,
                    calib.creep_period,
                );
            }
        }

        merge_adjacent(rows)
    }

    /// Axis deltas to commit to `posintTP` after a successful move (spec §4.2 `for_cleanup`).
    pub fn for_cleanup(&self) -> (f64, f64) {
        (
            self.cumulative_delta(Axis::Theta),
            self.cumulative_delta(Axis::Phi),
        )
    }
}

impl Default for MoveTable {
    fn default() -> Self {
        MoveTable::new()
    }
}

fn append_backlash_row(
    rows: &mut Vec<HardwareRow>,
    axis: Axis,
    last_delta: f64,
    preferred_direction: i8,
    backlash_deg: f64,
    mc: &MotionConstants,
    creep_period: f64,
) {
    if backlash_deg <= 0.0 || last_delta == 0.0 {
        return;
    }
    let moved_direction: i8 = if last_delta > 0.0 { 1 } else { -1 };
    if moved_direction == preferred_direction {
        return;
    }
    let overshoot = preferred_direction as f64 * backlash_deg;
    let steps = (overshoot * mc.motor_steps_per_deg).round() as i32;
    let (t_steps, p_steps) = match axis {
        Axis::Theta => (steps, 0),
        Axis::Phi => (0, steps),
    };
    rows.push(HardwareRow {
        motor_steps_t: t_steps,
        motor_steps_p: p_steps,
        speed_mode_t: SpeedMode::Cruise,
        speed_mode_p: SpeedMode::Cruise,
        move_time: backlash_deg / mc.cruise_speed_deg_per_sec,
        postpause_ms: 0,
    });
    let return_steps = -steps;
    let (t_steps, p_steps) = match axis {
        Axis::Theta => (return_steps, 0),
        Axis::Phi => (0, return_steps),
    };
    rows.push(HardwareRow {
        motor_steps_t: t_steps,
        motor_steps_p: p_steps,
        speed_mode_t: SpeedMode::Creep,
        speed_mode_p: SpeedMode::Creep,
        move_time: (backlash_deg / mc.creep_step_deg) * creep_period,
        postpause_ms: 0,
    });
}

fn merge_adjacent(rows: Vec<HardwareRow>) -> Vec<HardwareRow> {
    let mut merged: Vec<HardwareRow> = Vec::with_capacity(rows.len());
    for row in rows {
        if let Some(last) = merged.last_mut() {
            if last.motor_steps_t == row.motor_steps_t
                && last.motor_steps_p == row.motor_steps_p
                && last.speed_mode_t == row.speed_mode_t
                && last.speed_mode_p == row.speed_mode_p
            {
                last.move_time += row.move_time;
                last.postpause_ms += row.postpause_ms;
                continue;
            }
        }
        merged.push(row);
    }
    merged
}

/// One sample of a table's trajectory, on the collider's fixed timestep grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColliderSample {
    /// Elapsed time since the table's start, seconds.
    pub time: f64,
    /// Cumulative theta delta at this sample, degrees.
    pub delta_t: f64,
    /// Cumulative phi delta at this sample, degrees.
    pub delta_p: f64,
    /// Whether an axis is actively moving at this sample (as opposed to paused).
    pub moving: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::{AxisCurrents, Range};

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

    #[test]
    fn direct_table_cleanup_matches_requested_delta() {
        let table = MoveTable::direct(45.0, -30.0);
        assert_eq!(table.for_cleanup(), (45.0, -30.0));
    }

    #[test]
    fn equalize_pads_shorter_table() {
        let mc = MotionConstants::default();
        let mut short = MoveTable::direct(10.0, 0.0);
        let long = MoveTable::direct(100.0, 0.0);
        let target = long.cumulative_net_time(&mc, 0.01);
        short.pad_to_time(target, &mc, 0.01);
        assert!((short.cumulative_net_time(&mc, 0.01) - target).abs() < 1e-9);
    }

    #[test]
    fn for_collider_last_sample_reaches_full_delta() {
        let mc = MotionConstants::default();
        let table = MoveTable::direct(45.0, 60.0);
        let samples = table.for_collider(0.02, &mc, 0.01);
        let last = samples.last().unwrap();
        assert!((last.delta_t - 45.0).abs() < 1e-9);
        assert!((last.delta_p - 60.0).abs() < 1e-9);
    }

    #[test]
    fn for_hardware_merges_adjacent_identical_rows() {
        let c = calib();
        let mc = MotionConstants::default();
        let mut table = MoveTable::new();
        table.insert_new_row(0);
        table.insert_new_row(1);
        let rows = table.for_hardware(&c, &mc);
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn extend_concatenates_rows() {
        let mut a = MoveTable::direct(10.0, 0.0);
        let b = MoveTable::direct(0.0, 20.0);
        a.extend(&b);
        assert_eq!(a.len(), 2);
        assert_eq!(a.for_cleanup(), (10.0, 20.0));
    }
}
