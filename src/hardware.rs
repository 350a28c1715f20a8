//! Outbound hardware record and move-completion polling (spec §6).

use std::time::Duration;

use crate::calibration::{Calibration, PositionerId};
use crate::move_table::{HardwareRow, MotionConstants, MoveTable};

/// One outbound move command for a single CAN-addressed positioner (spec §6).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MoveCommand {
    /// Target positioner's identifier.
    pub positioner_id: PositionerId,
    /// CAN bus identifier the command is addressed to.
    pub canid: u32,
    /// Number of rows in `rows`.
    pub nrows: u32,
    /// Serialized motion rows, in execution order.
    pub rows: Vec<HardwareRow>,
}

/// Build the outbound [`MoveCommand`] for a positioner's final move table.
pub fn build_move_command(
    id: impl Into<PositionerId>,
    canid: u32,
    table: &MoveTable,
    calib: &Calibration,
    mc: &MotionConstants,
) -> MoveCommand {
    let rows = table.for_hardware(calib, mc);
    MoveCommand {
        positioner_id: id.into(),
        canid,
        nrows: rows.len() as u32,
        rows,
    }
}

/// Polls a caller-supplied readiness predicate until it returns true or a
/// timeout elapses (spec §6 "move completion handshake").
///
/// Does not sleep itself; `poll_period` and `timeout` describe the schedule
/// the caller should drive (e.g. from an async executor or a hardware
/// polling loop), and [`ReadyPoll::elapsed_exceeds_timeout`] tells the
/// caller when to give up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReadyPoll {
    /// How often to re-check, e.g. 500ms.
    pub poll_period: Duration,
    /// How long to wait before giving up, e.g. 15s.
    pub timeout: Duration,
}

impl Default for ReadyPoll {
    fn default() -> Self {
        ReadyPoll {
            poll_period: Duration::from_millis(500),
            timeout: Duration::from_secs(15),
        }
    }
}

impl ReadyPoll {
    /// Whether `elapsed` has exceeded this poll's configured timeout.
    pub fn elapsed_exceeds_timeout(&self, elapsed: Duration) -> bool {
        elapsed >= self.timeout
    }
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
    fn build_move_command_carries_row_count() {
        let c = calib();
        let mc = MotionConstants::default();
        let table = MoveTable::direct(10.0, 20.0);
        let cmd = build_move_command("M01", 42, &table, &c, &mc);
        assert_eq!(cmd.positioner_id, "M01");
        assert_eq!(cmd.canid, 42);
        assert_eq!(cmd.nrows as usize, cmd.rows.len());
    }

    #[test]
    fn default_ready_poll_times_out_after_fifteen_seconds() {
        let poll = ReadyPoll::default();
        assert!(!poll.elapsed_exceeds_timeout(Duration::from_secs(10)));
        assert!(poll.elapsed_exceeds_timeout(Duration::from_secs(16)));
    }
}
