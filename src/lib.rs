//! Anti-collision motion planning and scheduling for robotic fiber
//! positioners on a multi-object spectrograph focal plane.
//!
//! A petal carries many independently-actuated two-arm positioners, each
//! with its own [`calibration::Calibration`]. Given a target for some
//! subset of them, [`schedule::Schedule`] resolves each target through the
//! [`transform`] layer, builds a retract/rotate/extend [`move_table::MoveTable`]
//! per positioner, and runs the [`collide`] module's spacetime sweep to find
//! and, where possible, resolve collisions via the tactic ladder in
//! [`schedule::stage`].

pub mod calibration;
pub mod collide;
pub mod config;
pub mod error;
pub mod geom;
pub mod hardware;
pub mod move_table;
pub mod schedule;
pub mod stats;
pub mod transform;

pub use calibration::{Axis, Calibration, CalibrationStore, PositionerId};
pub use config::SchedulerConfig;
pub use error::{AdmissionError, PlanningError, TransformError};
pub use move_table::MoveTable;
pub use schedule::{Command, CollisionMode, Request, Schedule};
pub use transform::{ObsXY, PetalTransform, PosIntTP, PosLocTP, PosLocXY, PtlXY, QS};
