//! Two-port (ABCD) network algebra.
//!
//! A two-port relates sending-end voltage and current to receiving-end ones:
//! ```text
//! | V1 |   | A  B | | V2 |
//! |    | = |      | |    |
//! | I1 |   | C  D | | I2 |
//! ```
//!
//! Elementary series and shunt elements are composed with [`Quadripole::cascade`]
//! (matrix product, associative but not commutative). A [`PiModel`] converts
//! to and from this form, which is how equivalent branches are merged and how
//! ideal ratios are relocated from one end of a branch to the other.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);

/// Series impedance plus a shunt admittance at each end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PiModel {
    pub r: f64,
    pub x: f64,
    pub g1: f64,
    pub b1: f64,
    pub g2: f64,
    pub b2: f64,
}

impl PiModel {
    /// Series element with total shunt admittance split evenly between both ends.
    pub fn symmetric(r: f64, x: f64, g: f64, b: f64) -> Self {
        Self {
            r,
            x,
            g1: g / 2.0,
            b1: b / 2.0,
            g2: g / 2.0,
            b2: b / 2.0,
        }
    }

    /// Same element seen from the other end.
    pub fn reversed(&self) -> Self {
        Self {
            r: self.r,
            x: self.x,
            g1: self.g2,
            b1: self.b2,
            g2: self.g1,
            b2: self.b1,
        }
    }

    /// Move an ideal ratio `a0` sitting behind end 2 to the front of end 1.
    ///
    /// Series impedance scales by `a0²`, shunt admittances by `1/a0²`. Returns
    /// `None` when the series impedance is zero and the result is undefined.
    pub fn relocate_ratio(&self, a0: f64) -> Option<PiModel> {
        Quadripole::ideal_transformer(a0)
            .cascade(&Quadripole::from_pi(self))
            .cascade(&Quadripole::ideal_transformer(1.0 / a0))
            .to_pi_model()
    }

    pub fn is_zero(&self) -> bool {
        self.r == 0.0
            && self.x == 0.0
            && self.g1 == 0.0
            && self.b1 == 0.0
            && self.g2 == 0.0
            && self.b2 == 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadripole {
    pub a: Complex64,
    pub b: Complex64,
    pub c: Complex64,
    pub d: Complex64,
}

impl Quadripole {
    pub fn new(a: Complex64, b: Complex64, c: Complex64, d: Complex64) -> Self {
        Self { a, b, c, d }
    }

    pub fn identity() -> Self {
        Self::new(ONE, ZERO, ZERO, ONE)
    }

    pub fn from_series_impedance(r: f64, x: f64) -> Self {
        Self::new(ONE, Complex64::new(r, x), ZERO, ONE)
    }

    pub fn from_shunt_admittance(g: f64, b: f64) -> Self {
        Self::new(ONE, ZERO, Complex64::new(g, b), ONE)
    }

    /// Ideal transformer with `V1 = k·V2` and `I1 = I2/k`.
    pub fn ideal_transformer(k: f64) -> Self {
        Self::new(
            Complex64::new(k, 0.0),
            ZERO,
            ZERO,
            Complex64::new(1.0 / k, 0.0),
        )
    }

    /// shunt(g1, b1) · series(r, x) · shunt(g2, b2)
    pub fn from_pi(pi: &PiModel) -> Self {
        Self::from_shunt_admittance(pi.g1, pi.b1)
            .cascade(&Self::from_series_impedance(pi.r, pi.x))
            .cascade(&Self::from_shunt_admittance(pi.g2, pi.b2))
    }

    /// `self` followed by `other`.
    pub fn cascade(&self, other: &Quadripole) -> Self {
        Self::new(
            self.a * other.a + self.b * other.c,
            self.a * other.b + self.b * other.d,
            self.c * other.a + self.d * other.c,
            self.c * other.b + self.d * other.d,
        )
    }

    /// Equivalent π-model, or `None` when the series impedance B is zero.
    pub fn to_pi_model(&self) -> Option<PiModel> {
        if self.b == ZERO {
            return None;
        }
        let y1 = (self.d - ONE) / self.b;
        let y2 = (self.a - ONE) / self.b;
        Some(PiModel {
            r: self.b.re,
            x: self.b.im,
            g1: y1.re,
            b1: y1.im,
            g2: y2.re,
            b2: y2.im,
        })
    }

    pub fn determinant(&self) -> Complex64 {
        self.a * self.d - self.b * self.c
    }
}
