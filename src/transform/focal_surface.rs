//! Sky-plane (Q,S) to petal-local (ptlXY) conversion via a fixed radial
//! distortion polynomial (spec §3.2, §4.1).
//!
//! The forward direction (`S` -> radius `Q`) is a plain polynomial
//! evaluation; the inverse (`Q` -> `S`) has no closed form and is solved
//! by Newton iteration seeded at the current radius, as spec.md
//! describes.

/// A 10th-order odd radial polynomial `Q = sum(coeffs[i] * S^(2i+1))`,
/// mapping sky-plane radius `S` to focal-plane radius `Q`.
#[derive(Debug, Clone, PartialEq)]
pub struct RadialPolynomial {
    /// Coefficients, lowest order first; index `i` multiplies `S^(2i+1)`.
    pub coeffs: [f64; 5],
}

impl RadialPolynomial {
    /// Build a polynomial from its odd-power coefficients.
    pub fn new(coeffs: [f64; 5]) -> Self {
        RadialPolynomial { coeffs }
    }

    /// Evaluate `Q(S)`.
    pub fn eval(&self, s: f64) -> f64 {
        let mut q = 0.0;
        let mut power = s;
        let s2 = s * s;
        for c in &self.coeffs {
            q += c * power;
            power *= s2;
        }
        q
    }

    /// Derivative `dQ/dS`, used by the Newton solver.
    pub fn eval_derivative(&self, s: f64) -> f64 {
        let mut d = 0.0;
        let mut power = 1.0;
        let s2 = s * s;
        for (i, c) in self.coeffs.iter().enumerate() {
            let order = (2 * i + 1) as f64;
            d += order * c * power;
            power *= s2;
        }
        d
    }

    /// Invert `Q(S) = q` for `S`, by Newton iteration seeded at `seed_s`
    /// (spec.md: "seeded at the current radius").
    ///
    /// Returns `None` if the iteration fails to converge within the
    /// iteration budget or the derivative vanishes.
    pub fn invert(&self, q: f64, seed_s: f64) -> Option<f64> {
        let mut s = seed_s;
        const MAX_ITER: usize = 50;
        const TOLERANCE: f64 = 1e-10;
        for _ in 0..MAX_ITER {
            let f = self.eval(s) - q;
            if f.abs() < TOLERANCE {
                return Some(s);
            }
            let df = self.eval_derivative(s);
            if df.abs() < 1e-15 {
                return None;
            }
            s -= f / df;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn invert_recovers_forward_evaluation() {
        // Near-identity polynomial with a small cubic correction term.
        let poly = RadialPolynomial::new([1.0, -1e-5, 0.0, 0.0, 0.0]);
        let s = 120.0;
        let q = poly.eval(s);
        let recovered = poly.invert(q, s * 0.9).unwrap();
        assert_relative_eq!(recovered, s, epsilon = 1e-6);
    }

    #[test]
    fn identity_polynomial_is_its_own_inverse() {
        let poly = RadialPolynomial::new([1.0, 0.0, 0.0, 0.0, 0.0]);
        assert_relative_eq!(poly.invert(42.0, 40.0).unwrap(), 42.0, epsilon = 1e-9);
    }
}
