//! Intermediate tap changer model.
//!
//! A [`TapChanger`] is a complete, immutable step table: every operation
//! returns a new value. Ratios and angles follow the CGMES convention
//! (`ratio`, `angle` in degrees); the sink uses `rho = 1/ratio` and
//! `alpha = -angle`, applied by [`TapChanger::to_ratio_tap_changer`] and
//! [`TapChanger::to_phase_tap_changer`]. Impedance and admittance values of a
//! step are deviations in percent of the transformer's own values.

use cimgrid_core::{PhaseTapChanger, PhaseTapStep, RatioTapChanger, RatioTapStep};
use num_complex::Complex64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub ratio: f64,
    /// Phase shift in degrees
    pub angle: f64,
    pub r: f64,
    pub x: f64,
    pub g1: f64,
    pub b1: f64,
    pub g2: f64,
    pub b2: f64,
}

impl Default for Step {
    fn default() -> Self {
        Self {
            ratio: 1.0,
            angle: 0.0,
            r: 0.0,
            x: 0.0,
            g1: 0.0,
            b1: 0.0,
            g2: 0.0,
            b2: 0.0,
        }
    }
}

impl Step {
    pub fn complex_ratio(&self) -> Complex64 {
        Complex64::from_polar(self.ratio, self.angle.to_radians())
    }

    fn with_complex_ratio(self, a: Complex64) -> Self {
        Self {
            ratio: a.norm(),
            angle: a.arg().to_degrees(),
            ..self
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TapChanger {
    pub id: String,
    /// Transformer end the tap changer is declared on
    pub side: usize,
    pub low_tap_position: i32,
    pub tap_position: i32,
    pub steps: Vec<Step>,
    pub ltc_flag: bool,
    pub regulating: bool,
    pub regulating_control_id: Option<String>,
    pub tcul_control_mode: Option<String>,
    pub tap_changer_control_enabled: bool,
    /// Fixed tap changer folded into this one by a combination
    pub hidden_combined: Option<Box<TapChanger>>,
}

/// Classification driving how two tap changers at the same end are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapChangerType {
    Null,
    Fixed,
    NonRegulating,
    Regulating,
}

pub fn classify(tc: Option<&TapChanger>) -> TapChangerType {
    match tc {
        None => TapChangerType::Null,
        Some(tc) if tc.steps.len() == 1 => TapChangerType::Fixed,
        Some(tc) if tc.regulating => TapChangerType::Regulating,
        Some(_) => TapChangerType::NonRegulating,
    }
}

impl TapChanger {
    pub fn high_tap_position(&self) -> i32 {
        self.low_tap_position + self.steps.len() as i32 - 1
    }

    pub fn position_in_range(&self) -> bool {
        (self.low_tap_position..=self.high_tap_position()).contains(&self.tap_position)
    }

    /// Step at the current tap position
    pub fn current_step(&self) -> Option<&Step> {
        let index = self.tap_position - self.low_tap_position;
        usize::try_from(index).ok().and_then(|i| self.steps.get(i))
    }

    /// Same identity and regulation data with another step table.
    fn with_steps(&self, low_tap_position: i32, steps: Vec<Step>) -> TapChanger {
        TapChanger {
            id: self.id.clone(),
            side: self.side,
            low_tap_position,
            tap_position: self.tap_position,
            steps,
            ltc_flag: self.ltc_flag,
            regulating: self.regulating,
            regulating_control_id: self.regulating_control_id.clone(),
            tcul_control_mode: self.tcul_control_mode.clone(),
            tap_changer_control_enabled: self.tap_changer_control_enabled,
            hidden_combined: self.hidden_combined.clone(),
        }
    }

    fn map_steps(&self, f: impl Fn(&Step) -> Step) -> TapChanger {
        self.with_steps(self.low_tap_position, self.steps.iter().map(f).collect())
    }

    /// Keep only the step at the current position.
    pub fn fix(&self) -> TapChanger {
        let step = if self.steps.len() == 1 {
            self.steps[0]
        } else {
            self.current_step().copied().unwrap_or_default()
        };
        self.with_steps(self.tap_position, vec![step])
    }

    pub fn without_regulation(&self) -> TapChanger {
        TapChanger {
            regulating: false,
            regulating_control_id: None,
            tcul_control_mode: None,
            tap_changer_control_enabled: false,
            ..self.clone()
        }
    }

    /// Opposite phase shift on every step
    pub fn negated(&self) -> TapChanger {
        self.map_steps(|s| Step {
            angle: -s.angle,
            ..*s
        })
    }

    /// Equivalent tap changer at end 1 for one declared at end 2.
    ///
    /// The complex ratio is inverted; impedance deviations scale with `|a|²`
    /// and admittance deviations with `1/|a|²`.
    pub fn moved_from_end2_to_end1(&self) -> TapChanger {
        self.map_steps(|s| {
            let a = s.complex_ratio();
            let a2 = a.norm_sqr();
            let impedance = |v: f64| 100.0 * ((1.0 + v / 100.0) * a2 - 1.0);
            let admittance = |v: f64| 100.0 * ((1.0 + v / 100.0) / a2 - 1.0);
            Step {
                r: impedance(s.r),
                x: impedance(s.x),
                g1: admittance(s.g1),
                b1: admittance(s.b1),
                g2: admittance(s.g2),
                b2: admittance(s.b2),
                ..*s
            }
            .with_complex_ratio(a.inv())
        })
    }

    pub fn to_ratio_tap_changer(&self) -> RatioTapChanger {
        RatioTapChanger {
            low_tap_position: self.low_tap_position,
            tap_position: self.tap_position,
            steps: self
                .steps
                .iter()
                .map(|s| RatioTapStep {
                    rho: 1.0 / s.ratio,
                    r: s.r,
                    x: s.x,
                    g: s.g1,
                    b: s.b1,
                })
                .collect(),
            load_tap_changing: self.ltc_flag,
            ..RatioTapChanger::default()
        }
    }

    pub fn to_phase_tap_changer(&self) -> PhaseTapChanger {
        PhaseTapChanger {
            low_tap_position: self.low_tap_position,
            tap_position: self.tap_position,
            steps: self
                .steps
                .iter()
                .map(|s| PhaseTapStep {
                    alpha: -s.angle,
                    rho: 1.0 / s.ratio,
                    r: s.r,
                    x: s.x,
                    g: s.g1,
                    b: s.b1,
                })
                .collect(),
            ..PhaseTapChanger::default()
        }
    }
}

fn combine_deviation(fixed: f64, value: f64) -> f64 {
    match (fixed != 0.0, value != 0.0) {
        (true, true) => fixed * value,
        (true, false) => fixed,
        (false, true) => value,
        (false, false) => 0.0,
    }
}

/// Fold a single-step tap changer into every step of `tc`.
fn fold(tc: &TapChanger, fixed: &TapChanger) -> TapChanger {
    let f = fixed.steps.first().copied().unwrap_or_default();
    let af = f.complex_ratio();
    let mut folded = tc.map_steps(|s| {
        Step {
            r: combine_deviation(f.r, s.r),
            x: combine_deviation(f.x, s.x),
            g1: combine_deviation(f.g1, s.g1),
            b1: combine_deviation(f.b1, s.b1),
            g2: combine_deviation(f.g2, s.g2),
            b2: combine_deviation(f.b2, s.b2),
            ..*s
        }
        .with_complex_ratio(s.complex_ratio() * af)
    });
    folded.hidden_combined = Some(Box::new(fixed.clone()));
    folded
}

/// Merge two tap changers that end up at the same transformer end.
///
/// At most one of them keeps its full step table; the other contributes
/// only its current step. Order matters: the first operand wins ties.
pub fn combine_tap_changers(
    tc1: Option<&TapChanger>,
    tc2: Option<&TapChanger>,
) -> Option<TapChanger> {
    use TapChangerType::*;
    let (a, b) = match (tc1, tc2) {
        (None, tc) | (tc, None) => return tc.cloned(),
        (Some(a), Some(b)) => (a, b),
    };
    let combined = match (classify(tc1), classify(tc2)) {
        (Fixed, _) => fold(b, a),
        (_, Fixed) => fold(a, b),
        (NonRegulating, Regulating) => fold(b, &a.fix()),
        _ => fold(a, &b.fix()),
    };
    Some(combined)
}

/// Operand whose step table [`combine_tap_changers`] collapses to its
/// current step, when it had more than one.
pub fn frozen_by_combination<'a>(
    tc1: Option<&'a TapChanger>,
    tc2: Option<&'a TapChanger>,
) -> Option<&'a TapChanger> {
    use TapChangerType::*;
    match (classify(tc1), classify(tc2)) {
        (Null, _) | (_, Null) | (Fixed, _) | (_, Fixed) => None,
        (NonRegulating, Regulating) => tc1,
        _ => tc2,
    }
}
