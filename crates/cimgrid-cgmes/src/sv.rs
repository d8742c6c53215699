//! State variables at the end of a branch.
//!
//! [`StateVariables::other_side`] solves the branch two-port for the opposite
//! end given voltage and power at one end. It is how the network side flow of
//! a dangling line is derived from the flow seen at the boundary.

use std::ops::{Add, Mul, Neg, Sub};

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Active and reactive power, load sign convention (flowing into the element).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerFlow {
    pub p: f64,
    pub q: f64,
}

impl PowerFlow {
    pub const ZERO: PowerFlow = PowerFlow { p: 0.0, q: 0.0 };

    pub fn new(p: f64, q: f64) -> Self {
        Self { p, q }
    }

    /// Both components finite
    pub fn defined(&self) -> bool {
        self.p.is_finite() && self.q.is_finite()
    }
}

impl Add for PowerFlow {
    type Output = PowerFlow;

    fn add(self, other: PowerFlow) -> PowerFlow {
        PowerFlow::new(self.p + other.p, self.q + other.q)
    }
}

impl Sub for PowerFlow {
    type Output = PowerFlow;

    fn sub(self, other: PowerFlow) -> PowerFlow {
        PowerFlow::new(self.p - other.p, self.q - other.q)
    }
}

impl Neg for PowerFlow {
    type Output = PowerFlow;

    fn neg(self) -> PowerFlow {
        PowerFlow::new(-self.p, -self.q)
    }
}

impl Mul<f64> for PowerFlow {
    type Output = PowerFlow;

    fn mul(self, k: f64) -> PowerFlow {
        PowerFlow::new(self.p * k, self.q * k)
    }
}

/// Power entering a branch end with the voltage (kV, degrees) at that end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateVariables {
    pub p: f64,
    pub q: f64,
    pub u: f64,
    pub angle: f64,
}

impl StateVariables {
    pub fn new(p: f64, q: f64, u: f64, angle: f64) -> Self {
        Self { p, q, u, angle }
    }

    pub fn flow(&self) -> PowerFlow {
        PowerFlow::new(self.p, self.q)
    }

    /// State at the other end of a π branch with an ideal ratio
    /// `rho·e^{j·alpha}` at this end.
    ///
    /// Needs a non-zero series impedance.
    #[allow(clippy::too_many_arguments)]
    pub fn other_side(
        &self,
        r: f64,
        x: f64,
        g1: f64,
        b1: f64,
        g2: f64,
        b2: f64,
        rho: f64,
        alpha: f64,
    ) -> StateVariables {
        let v1 = Complex64::from_polar(self.u, self.angle.to_radians());
        let s1 = Complex64::new(self.p, self.q);
        let i1 = (s1 / v1).conj();

        let a = Complex64::from_polar(rho, alpha.to_radians());
        let y = Complex64::new(r, x).inv();
        let ysh1 = Complex64::new(g1, b1);
        let ysh2 = Complex64::new(g2, b2);

        let y11 = (y + ysh1) * (rho * rho);
        let y12 = -a.conj() * y;
        let y21 = -a * y;
        let y22 = y + ysh2;

        let v2 = (i1 - y11 * v1) / y12;
        let i2 = y21 * v1 + y22 * v2;
        let s2 = v2 * i2.conj();

        StateVariables::new(s2.re, s2.im, v2.norm(), v2.arg().to_degrees())
    }
}
