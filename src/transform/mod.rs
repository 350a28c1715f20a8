//! Coordinate transform layer (spec §3.2, §4.1): bidirectional mapping
//! between internal shaft angles, local flat coordinates, petal
//! coordinates, observer coordinates, and sky-plane (Q,S) coordinates.

pub mod focal_surface;
pub mod kinematics;
pub mod wrap;

use cgmath::{Angle, Basis2, Point2, Rad, Rotation, Rotation2, Vector2};

use crate::calibration::Calibration;
use crate::error::TransformError;
pub use wrap::RangeWrapLimits;

/// Internal shaft angles, degrees; may be unwrapped outside `(-180, 180]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PosIntTP {
    /// Theta, degrees.
    pub t: f64,
    /// Phi, degrees.
    pub p: f64,
}

/// Observed shaft angles, degrees (after calibration offsets/gear correction).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PosLocTP {
    /// Theta, degrees.
    pub t: f64,
    /// Phi, degrees.
    pub p: f64,
}

/// Cartesian position local to the positioner's own center, mm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PosLocXY {
    /// X, mm.
    pub x: f64,
    /// Y, mm.
    pub y: f64,
}

/// Cartesian position in petal-local coordinates, mm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PtlXY {
    /// X, mm.
    pub x: f64,
    /// Y, mm.
    pub y: f64,
}

/// Cartesian position in the global observer frame, mm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObsXY {
    /// X, mm.
    pub x: f64,
    /// Y, mm.
    pub y: f64,
}

/// Sky-plane polar-like coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QS {
    /// Polar angle, degrees.
    pub q_angle: f64,
    /// Sky-plane radius.
    pub s: f64,
}

/// Rigid 2D transform from petal-local to observer coordinates, per petal (spec §4.1),
/// plus the shared sky-plane radial distortion model used to resolve `(Q,S)` requests.
#[derive(Debug, Clone, PartialEq)]
pub struct PetalTransform {
    /// Rotation, degrees.
    pub rotation_deg: f64,
    /// Translation.
    pub translation: Vector2<f64>,
    /// Sky-plane radius to observer-frame radius mapping, shared by every
    /// petal on the focal plane (spec §3.2).
    pub radial_distortion: focal_surface::RadialPolynomial,
}

impl PetalTransform {
    /// Identity transform (petal frame coincides with observer frame) with
    /// an identity (undistorted) radial mapping.
    pub fn identity() -> Self {
        PetalTransform {
            rotation_deg: 0.0,
            translation: Vector2::new(0.0, 0.0),
            radial_distortion: focal_surface::RadialPolynomial::new([1.0, 0.0, 0.0, 0.0, 0.0]),
        }
    }

    /// Sky-plane `(Q,S)` to `obsXY`: evaluate the radial polynomial for the
    /// focal-plane radius, then apply `q_angle` (spec §3.2).
    pub fn qs_to_obs(&self, qs: QS) -> ObsXY {
        let radius = self.radial_distortion.eval(qs.s);
        ObsXY {
            x: radius * qs.q_angle.to_radians().cos(),
            y: radius * qs.q_angle.to_radians().sin(),
        }
    }

    /// `obsXY` to sky-plane `(Q,S)`: invert the radial polynomial, seeded at
    /// the observed radius itself (spec §3.2 "seeded at the current radius").
    pub fn obs_to_qs(&self, obs: ObsXY) -> Option<QS> {
        let radius = (obs.x * obs.x + obs.y * obs.y).sqrt();
        let angle = obs.y.atan2(obs.x).to_degrees();
        let s = self.radial_distortion.invert(radius, radius)?;
        Some(QS { q_angle: angle, s })
    }

    /// `ptlXY` to `obsXY`.
    pub fn to_obs(&self, p: PtlXY) -> ObsXY {
        let rot: Basis2<f64> = Rotation2::from_angle(Rad::from(cgmath::Deg(self.rotation_deg)));
        let rotated = rot.rotate_point(Point2::new(p.x, p.y));
        ObsXY {
            x: rotated.x + self.translation.x,
            y: rotated.y + self.translation.y,
        }
    }

    /// `obsXY` to `ptlXY`.
    pub fn to_ptl(&self, p: ObsXY) -> PtlXY {
        let rot: Basis2<f64> = Rotation2::from_angle(Rad::from(cgmath::Deg(-self.rotation_deg)));
        let local = Point2::new(p.x - self.translation.x, p.y - self.translation.y);
        let rotated = rot.rotate_point(local);
        PtlXY {
            x: rotated.x,
            y: rotated.y,
        }
    }
}

/// `posintTP` to `poslocTP`: apply signed offsets and gear calibration (spec §4.1).
pub fn posint_to_posloc_tp(tp: PosIntTP, calib: &Calibration) -> PosLocTP {
    PosLocTP {
        t: tp.t * calib.gear_calib_t + calib.offset_t,
        p: tp.p * calib.gear_calib_p + calib.offset_p,
    }
}

/// `poslocTP` to `posintTP`: inverse of [`posint_to_posloc_tp`].
pub fn posloc_to_posint_tp(tp: PosLocTP, calib: &Calibration) -> PosIntTP {
    PosIntTP {
        t: (tp.t - calib.offset_t) / calib.gear_calib_t,
        p: (tp.p - calib.offset_p) / calib.gear_calib_p,
    }
}

/// `poslocTP` to `poslocXY`: the arm kinematic (spec §3.2).
pub fn posloc_to_xy(tp: PosLocTP, calib: &Calibration) -> PosLocXY {
    let (x, y) = kinematics::forward(calib.length_r1, calib.length_r2, tp.t, tp.p);
    PosLocXY { x, y }
}

/// `poslocXY` to `poslocTP`: inverse arm kinematic (spec §3.2).
pub fn xy_to_posloc(xy: PosLocXY, calib: &Calibration) -> Result<PosLocTP, TransformError> {
    let (t, p) = kinematics::inverse(calib.length_r1, calib.length_r2, xy.x, xy.y)?;
    Ok(PosLocTP { t, p })
}

/// `poslocXY` to `ptlXY`: rigid translation by the positioner's center (spec §4.1).
pub fn posloc_to_ptl(xy: PosLocXY, calib: &Calibration) -> PtlXY {
    PtlXY {
        x: xy.x + calib.offset_x,
        y: xy.y + calib.offset_y,
    }
}

/// `ptlXY` to `poslocXY`: inverse of [`posloc_to_ptl`].
pub fn ptl_to_posloc(xy: PtlXY, calib: &Calibration) -> PosLocXY {
    PosLocXY {
        x: xy.x - calib.offset_x,
        y: xy.y - calib.offset_y,
    }
}

/// End-to-end: `posintTP` to `ptlXY`, honoring calibration throughout.
pub fn posint_to_ptl(tp: PosIntTP, calib: &Calibration) -> PtlXY {
    let loc_tp = posint_to_posloc_tp(tp, calib);
    let loc_xy = posloc_to_xy(loc_tp, calib);
    posloc_to_ptl(loc_xy, calib)
}

/// End-to-end: `ptlXY` to `posintTP`, reporting [`TransformError::Unreachable`]
/// when the point lies outside the positioner's arm annulus.
pub fn ptl_to_posint(xy: PtlXY, calib: &Calibration) -> Result<PosIntTP, TransformError> {
    let loc_xy = ptl_to_posloc(xy, calib);
    let loc_tp = xy_to_posloc(loc_xy, calib)?;
    Ok(posloc_to_posint_tp(loc_tp, calib))
}

/// Wrap a `posintTP` pair into the positioner's targetable (or physical) range,
/// see spec §4.1 "Range wrapping".
pub fn wrap_into_targetable(
    tp: PosIntTP,
    calib: &Calibration,
    limits: RangeWrapLimits,
) -> Result<PosIntTP, TransformError> {
    let (t, p) = wrap::wrap_posint_tp(
        tp.t,
        tp.p,
        calib.targetable_range_t,
        calib.targetable_range_p,
        calib.physical_range_t,
        calib.physical_range_p,
        limits,
    )?;
    Ok(PosIntTP { t, p })
}

/// Shortest signed rotation from `start` to `final_`, consistent with `limits`
/// (spec §4.1 "Delta computation").
pub fn delta_posint_tp(
    final_: PosIntTP,
    start: PosIntTP,
    calib: &Calibration,
    limits: RangeWrapLimits,
    allow_exceed_limits: bool,
) -> Result<(f64, f64), TransformError> {
    wrap::delta_posint_tp(
        (final_.t, final_.p),
        (start.t, start.p),
        calib.targetable_range_t,
        calib.targetable_range_p,
        calib.physical_range_t,
        calib.physical_range_p,
        limits,
        allow_exceed_limits,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::{AxisCurrents, Range};
    use approx::assert_relative_eq;

    fn calib() -> Calibration {
        Calibration::new(
            3.0,
            3.0,
            0.0,
            0.0,
            10.0,
            -5.0,
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
            AxisCurrents {
                spinupdown: 70.0,
                cruise: 70.0,
                creep: 100.0,
                hold: 0.0,
            },
            AxisCurrents {
                spinupdown: 70.0,
                cruise: 70.0,
                creep: 100.0,
                hold: 0.0,
            },
        )
        .unwrap()
    }

    #[test]
    fn round_trip_posint_to_ptl_and_back() {
        let c = calib();
        let tp = PosIntTP { t: 45.0, p: 120.0 };
        let ptl = posint_to_ptl(tp, &c);
        let back = ptl_to_posint(ptl, &c).unwrap();
        assert_relative_eq!(back.t, tp.t, epsilon = 1e-6);
        assert_relative_eq!(back.p, tp.p, epsilon = 1e-6);
    }

    #[test]
    fn petal_transform_round_trips() {
        let transform = PetalTransform {
            rotation_deg: 37.0,
            translation: Vector2::new(120.0, -80.0),
            radial_distortion: focal_surface::RadialPolynomial::new([1.0, 0.0, 0.0, 0.0, 0.0]),
        };
        let ptl = PtlXY { x: 5.0, y: 9.0 };
        let obs = transform.to_obs(ptl);
        let back = transform.to_ptl(obs);
        assert_relative_eq!(back.x, ptl.x, epsilon = 1e-9);
        assert_relative_eq!(back.y, ptl.y, epsilon = 1e-9);
    }
}
