//! Inbound request dictionary (spec §6) and admission.

use crate::calibration::Calibration;
use crate::error::TransformError;
use crate::transform::{self, PetalTransform, PosIntTP, PosLocTP, PtlXY, RangeWrapLimits};

/// Coordinate system a request's `(u, v)` target is expressed in (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Command {
    /// Absolute sky-plane polar-like coordinates.
    Qs,
    /// Delta in sky-plane polar-like coordinates, relative to the current position.
    DqDs,
    /// Absolute observer-frame Cartesian, mm.
    ObsXY,
    /// Absolute petal-frame Cartesian, mm (alias of `PtlXY` at the request layer).
    PosXY,
    /// Absolute petal-local Cartesian, mm.
    PtlXY,
    /// Delta in petal-local Cartesian, mm, relative to the current position.
    DxDy,
    /// Absolute observed shaft angles, degrees.
    ObsTP,
    /// Absolute internal shaft angles, degrees.
    PosIntTP,
    /// Absolute observed local shaft angles, degrees.
    PosLocTP,
    /// Delta in internal shaft angles, degrees, relative to the current position.
    DtDp,
}

/// One inbound target request (spec §6).
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Coordinate system of `target`.
    pub command: Command,
    /// Target `(u, v)` pair, units implied by `command`.
    pub target: (f64, f64),
    /// Opaque note propagated unchanged to the output.
    pub log_note: String,
}

impl Request {
    /// Build a request.
    pub fn new(command: Command, target: (f64, f64), log_note: impl Into<String>) -> Self {
        Request {
            command,
            target,
            log_note: log_note.into(),
        }
    }
}

/// Resolve a [`Request`] into an absolute `posintTP` target, given the positioner's
/// calibration, its current position, and the petal's rigid transform (spec §4.1, §6).
///
/// `posXY` is treated as an alias of `ptlXY` (the spec's command list does not
/// distinguish them further; see `DESIGN.md`).
pub fn resolve_target(
    request: &Request,
    calib: &Calibration,
    start: PosIntTP,
    petal_transform: &PetalTransform,
) -> Result<PosIntTP, TransformError> {
    match request.command {
        Command::PosIntTP => Ok(PosIntTP {
            t: request.target.0,
            p: request.target.1,
        }),
        Command::PosLocTP => Ok(transform::posloc_to_posint_tp(
            PosLocTP {
                t: request.target.0,
                p: request.target.1,
            },
            calib,
        )),
        Command::PtlXY | Command::PosXY => transform::ptl_to_posint(
            PtlXY {
                x: request.target.0,
                y: request.target.1,
            },
            calib,
        ),
        Command::ObsXY => {
            let ptl = petal_transform.to_ptl(transform::ObsXY {
                x: request.target.0,
                y: request.target.1,
            });
            transform::ptl_to_posint(ptl, calib)
        }
        Command::ObsTP => {
            // Observed shaft angles share the petal's rigid rotation but not its
            // translation: subtract the petal rotation before applying calibration offsets.
            let t = request.target.0 - petal_transform.rotation_deg;
            Ok(transform::posloc_to_posint_tp(
                PosLocTP {
                    t,
                    p: request.target.1,
                },
                calib,
            ))
        }
        Command::DtDp => Ok(PosIntTP {
            t: start.t + request.target.0,
            p: start.p + request.target.1,
        }),
        Command::DxDy => {
            let start_ptl = transform::posint_to_ptl(start, calib);
            transform::ptl_to_posint(
                PtlXY {
                    x: start_ptl.x + request.target.0,
                    y: start_ptl.y + request.target.1,
                },
                calib,
            )
        }
        Command::Qs => {
            let obs = petal_transform.qs_to_obs(transform::QS {
                q_angle: request.target.0,
                s: request.target.1,
            });
            let ptl = petal_transform.to_ptl(obs);
            transform::ptl_to_posint(ptl, calib)
        }
        Command::DqDs => {
            let start_ptl = transform::posint_to_ptl(start, calib);
            let start_obs = petal_transform.to_obs(start_ptl);
            let start_qs = petal_transform
                .obs_to_qs(start_obs)
                .ok_or(TransformError::OutOfRange)?;
            let target_qs = transform::QS {
                q_angle: start_qs.q_angle + request.target.0,
                s: start_qs.s + request.target.1,
            };
            let obs = petal_transform.qs_to_obs(target_qs);
            let ptl = petal_transform.to_ptl(obs);
            transform::ptl_to_posint(ptl, calib)
        }
    }
    .and_then(|tp| transform::wrap_into_targetable(tp, calib, RangeWrapLimits::Targetable))
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
    fn posint_command_is_passthrough() {
        let c = calib();
        let req = Request::new(Command::PosIntTP, (45.0, 120.0), "test");
        let resolved =
            resolve_target(&req, &c, PosIntTP { t: 0.0, p: 0.0 }, &PetalTransform::identity())
                .unwrap();
        assert_eq!(resolved, PosIntTP { t: 45.0, p: 120.0 });
    }

    #[test]
    fn dtdp_command_is_relative_to_start() {
        let c = calib();
        let req = Request::new(Command::DtDp, (10.0, -10.0), "test");
        let resolved = resolve_target(
            &req,
            &c,
            PosIntTP { t: 20.0, p: 30.0 },
            &PetalTransform::identity(),
        )
        .unwrap();
        assert_eq!(resolved, PosIntTP { t: 30.0, p: 20.0 });
    }

    #[test]
    fn unreachable_ptlxy_is_rejected() {
        let c = calib();
        let req = Request::new(Command::PtlXY, (100.0, 100.0), "test");
        let resolved = resolve_target(
            &req,
            &c,
            PosIntTP { t: 0.0, p: 0.0 },
            &PetalTransform::identity(),
        );
        assert!(resolved.is_err());
    }
}
