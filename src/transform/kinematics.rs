//! Two-link planar arm kinematics (spec §3.2).
//!
//! ```text
//! poslocX = r1*cos(T) + r2*cos(T+P)
//! poslocY = r1*sin(T) + r2*sin(T+P)
//! ```
//!
//! The inverse clamps `acos`/`asin` inputs to `[-1, 1]` after a small
//! tolerance rather than trusting floating point to land exactly in
//! range at the boundary of the reachable annulus (spec §9 design notes).

use crate::error::TransformError;

const CLAMP_TOLERANCE: f64 = 1e-9;

fn clamp_unit(x: f64) -> f64 {
    if x > 1.0 && x - 1.0 < CLAMP_TOLERANCE {
        1.0
    } else if x < -1.0 && -1.0 - x < CLAMP_TOLERANCE {
        -1.0
    } else {
        x
    }
}

/// Forward kinematic: shaft angles (degrees) to local Cartesian (mm).
pub fn forward(r1: f64, r2: f64, t_deg: f64, p_deg: f64) -> (f64, f64) {
    let t = t_deg.to_radians();
    let p = p_deg.to_radians();
    let x = r1 * t.cos() + r2 * (t + p).cos();
    let y = r1 * t.sin() + r2 * (t + p).sin();
    (x, y)
}

/// Inverse kinematic: local Cartesian (mm) to shaft angles (degrees).
///
/// Returns [`TransformError::Unreachable`] when `(x, y)` lies outside the
/// annulus `[|r1-r2|, r1+r2]` around the origin (spec §3.2).
pub fn inverse(r1: f64, r2: f64, x: f64, y: f64) -> Result<(f64, f64), TransformError> {
    let rho2 = x * x + y * y;
    let rho = rho2.sqrt();
    let r_min = (r1 - r2).abs();
    let r_max = r1 + r2;

    if rho < r_min - CLAMP_TOLERANCE || rho > r_max + CLAMP_TOLERANCE {
        return Err(TransformError::Unreachable);
    }
    if rho == 0.0 {
        // Degenerate: arms fully folded back on the theta axis, any T works.
        let p = clamp_unit((0.0 - r1 * r1 - r2 * r2) / (2.0 * r1 * r2)).acos();
        return Ok((0.0, p.to_degrees()));
    }

    let cos_p = clamp_unit((rho2 - r1 * r1 - r2 * r2) / (2.0 * r1 * r2));
    let p = cos_p.acos();

    let asin_arg = clamp_unit(r2 * p.sin() / rho);
    let t = y.atan2(x) - asin_arg.asin();

    Ok((t.to_degrees(), p.to_degrees()))
}
