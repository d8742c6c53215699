//! Step tables of CGMES tap changers.
//!
//! Ratio tap changers are tabular or linear in the step voltage increment.
//! Phase tap changers are tabular, symmetrical or asymmetrical; the latter
//! two also interpolate the step reactance between `xMin` and `xMax`.

use crate::context::Context;
use crate::property_bag::PropertyBag;

use super::tap_changer::{Step, TapChanger};

const RATIO_TAP_CHANGER: &str = "RatioTapChanger";
const PHASE_TAP_CHANGER: &str = "PhaseTapChanger";

/// Widest step range and farthest neutral step accepted for one tap changer.
const MAX_TAP_STEPS: i64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TapRange {
    low: i32,
    high: i32,
    neutral: i32,
    position: i32,
}

impl TapRange {
    fn steps(&self) -> impl Iterator<Item = i32> {
        self.low..=self.high
    }

    fn offset(&self, step: i32) -> f64 {
        f64::from(step) - f64::from(self.neutral)
    }
}

fn tap_range(ctx: &mut Context, class: &str, id: &str, bag: &PropertyBag) -> Option<TapRange> {
    let (low, high) = match (bag.as_i32("lowStep"), bag.as_i32("highStep")) {
        (Some(low), Some(high)) if low <= high => (low, high),
        _ => {
            ctx.invalid(class, id, "undefined or empty step range");
            return None;
        }
    };
    let neutral = match bag.as_i32("neutralStep") {
        Some(neutral) => neutral,
        None => {
            ctx.missing(class, id, "neutralStep", &low.to_string());
            low
        }
    };
    let (low64, high64, neutral64) = (i64::from(low), i64::from(high), i64::from(neutral));
    if high64 - low64 >= MAX_TAP_STEPS {
        ctx.invalid(class, id, &format!("step range {}..={} too wide", low, high));
        return None;
    }
    if neutral64 < low64 - MAX_TAP_STEPS || neutral64 > high64 + MAX_TAP_STEPS {
        ctx.invalid(
            class,
            id,
            &format!("neutral step {} far outside range {}..={}", neutral, low, high),
        );
        return None;
    }
    // State variables first, then the steady state hypothesis
    let position = bag
        .as_i32("SVtapStep")
        .or_else(|| bag.as_i32("normalStep"))
        .unwrap_or(neutral);
    let position = if (low..=high).contains(&position) {
        position
    } else {
        let clamped = if (low..=high).contains(&neutral) {
            neutral
        } else {
            low
        };
        ctx.fixed(
            class,
            id,
            "tap position out of range",
            &position.to_string(),
            &clamped.to_string(),
        );
        clamped
    };
    Some(TapRange {
        low,
        high,
        neutral,
        position,
    })
}

fn base(ctx: &Context, id: &str, side: usize, bag: &PropertyBag, range: &TapRange) -> TapChanger {
    let control = bag.id("TapChangerControl");
    let control_enabled = control
        .as_deref()
        .and_then(|c| ctx.model.regulating_control(c))
        .map(|rc| rc.as_bool_or("enabled", true))
        .unwrap_or(false);
    let tap_changer_control_enabled = bag.as_bool_or("tapChangerControlEnabled", false);
    TapChanger {
        id: id.to_string(),
        side,
        low_tap_position: range.low,
        tap_position: range.position,
        steps: Vec::new(),
        ltc_flag: bag.as_bool_or("ltcFlag", false),
        regulating: tap_changer_control_enabled && control_enabled,
        regulating_control_id: control,
        tcul_control_mode: bag.local("tculControlMode"),
        tap_changer_control_enabled,
        hidden_combined: None,
    }
}

/// Value of a table column, its default when undefined.
struct Column<'a> {
    name: &'a str,
    default: f64,
    undefined: usize,
}

impl<'a> Column<'a> {
    fn new(name: &'a str, default: f64) -> Self {
        Self {
            name,
            default,
            undefined: 0,
        }
    }

    fn read(&mut self, row: &PropertyBag) -> f64 {
        let value = row.as_f64(self.name);
        if value.is_nan() {
            self.undefined += 1;
            self.default
        } else {
            value
        }
    }

    fn report(&self, ctx: &mut Context, class: &str, id: &str) {
        if self.undefined > 0 {
            ctx.fixed(
                class,
                id,
                &format!("{} undefined in {} table points", self.name, self.undefined),
                "NaN",
                &self.default.to_string(),
            );
        }
    }
}

fn tabular_steps(
    ctx: &mut Context,
    class: &str,
    id: &str,
    range: &TapRange,
    rows: &[&PropertyBag],
    with_angle: bool,
) -> Vec<Step> {
    let mut ratio = Column::new("ratio", 1.0);
    let mut angle = Column::new("angle", 0.0);
    let mut r = Column::new("r", 0.0);
    let mut x = Column::new("x", 0.0);
    let mut g = Column::new("g", 0.0);
    let mut b = Column::new("b", 0.0);
    let mut absent = 0;

    let steps = range
        .steps()
        .map(|step| match rows.iter().find(|row| row.as_i32("step") == Some(step)) {
            Some(row) => Step {
                ratio: ratio.read(row),
                angle: if with_angle { angle.read(row) } else { 0.0 },
                r: r.read(row),
                x: x.read(row),
                g1: g.read(row),
                b1: b.read(row),
                g2: 0.0,
                b2: 0.0,
            },
            None => {
                absent += 1;
                Step::default()
            }
        })
        .collect();

    for column in [&ratio, &angle, &r, &x, &g, &b] {
        column.report(ctx, class, id);
    }
    if absent > 0 {
        ctx.missing(
            class,
            id,
            &format!("table points for {} steps", absent),
            "neutral step",
        );
    }
    steps
}

/// Step table of a ratio tap changer declared on transformer end `side`.
pub fn ratio_tap_changer(ctx: &mut Context, bag: &PropertyBag, side: usize) -> Option<TapChanger> {
    let id = bag.id(RATIO_TAP_CHANGER)?;
    let range = tap_range(ctx, RATIO_TAP_CHANGER, &id, bag)?;

    let model = ctx.model;
    let rows = bag
        .id("RatioTapChangerTable")
        .map(|table| model.ratio_table(&table))
        .unwrap_or_default();

    let steps = if rows.is_empty() {
        let mut svi = bag.as_f64("stepVoltageIncrement");
        if svi.is_nan() {
            ctx.missing(RATIO_TAP_CHANGER, &id, "stepVoltageIncrement", "0");
            svi = 0.0;
        }
        range
            .steps()
            .map(|step| Step {
                ratio: 1.0 + range.offset(step) * svi / 100.0,
                ..Step::default()
            })
            .collect()
    } else {
        tabular_steps(ctx, RATIO_TAP_CHANGER, &id, &range, &rows, false)
    };

    Some(TapChanger {
        steps,
        ..base(ctx, &id, side, bag, &range)
    })
}

/// Whether a ratio tap changer actually changes the ratio.
pub fn ratio_tap_changer_defined(bag: &PropertyBag) -> bool {
    bag.contains_key("RatioTapChangerTable") || bag.as_f64_or("stepVoltageIncrement", 0.0) != 0.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PhaseShape {
    Symmetrical,
    /// Winding connection angle in radians
    Asymmetrical(f64),
}

/// Step table of a phase tap changer declared on transformer end `side`.
///
/// `xtx` is the series reactance the step reactance deviations refer to.
pub fn phase_tap_changer(
    ctx: &mut Context,
    bag: &PropertyBag,
    side: usize,
    xtx: f64,
) -> Option<TapChanger> {
    let id = bag.id(PHASE_TAP_CHANGER)?;
    let range = tap_range(ctx, PHASE_TAP_CHANGER, &id, bag)?;
    let base = base(ctx, &id, side, bag, &range);

    let model = ctx.model;
    let kind = bag
        .local("phaseTapChangerType")
        .unwrap_or_default()
        .to_ascii_lowercase();
    let rows = bag
        .id("PhaseTapChangerTable")
        .map(|table| model.phase_table(&table))
        .unwrap_or_default();

    let shape = if kind.ends_with("tabular") && !rows.is_empty() {
        let steps = tabular_steps(ctx, PHASE_TAP_CHANGER, &id, &range, &rows, true);
        return Some(TapChanger { steps, ..base });
    } else if kind.ends_with("asymmetrical") {
        let angle = bag.as_f64("windingConnectionAngle");
        if angle.is_nan() {
            ctx.missing(PHASE_TAP_CHANGER, &id, "windingConnectionAngle", "90");
        }
        let angle = if angle.is_nan() { 90.0 } else { angle };
        PhaseShape::Asymmetrical(angle.to_radians())
    } else if kind.ends_with("symmetrical") || kind.ends_with("linear") {
        PhaseShape::Symmetrical
    } else {
        ctx.ignored(
            PHASE_TAP_CHANGER,
            &id,
            &format!("unsupported phase tap changer type '{}', single neutral step", kind),
        );
        return Some(TapChanger {
            low_tap_position: range.position,
            steps: vec![Step::default()],
            ..base
        });
    };

    let mut svi = bag.as_f64("voltageStepIncrement");
    if svi.is_nan() {
        ctx.missing(PHASE_TAP_CHANGER, &id, "voltageStepIncrement", "0");
        svi = 0.0;
    }
    let increment = bag.as_f64("stepPhaseShiftIncrement");

    let steps: Vec<Step> = range
        .steps()
        .map(|step| {
            let n = range.offset(step);
            match shape {
                PhaseShape::Asymmetrical(theta) => {
                    let dx = 1.0 + n * (svi / 100.0) * theta.cos();
                    let dy = n * (svi / 100.0) * theta.sin();
                    Step {
                        ratio: dx.hypot(dy),
                        angle: dy.atan2(dx).to_degrees(),
                        ..Step::default()
                    }
                }
                PhaseShape::Symmetrical => {
                    let angle = if increment.is_finite() && increment != 0.0 {
                        n * increment
                    } else {
                        let dy = n * svi / 100.0;
                        (2.0 * (dy / 2.0).asin()).to_degrees()
                    };
                    Step {
                        angle,
                        ..Step::default()
                    }
                }
            }
        })
        .collect();

    let steps = step_reactance(ctx, &id, bag, steps, xtx, shape);
    Some(TapChanger { steps, ..base })
}

/// Interpolate the series reactance of each step from its phase shift.
fn step_reactance(
    ctx: &mut Context,
    id: &str,
    bag: &PropertyBag,
    steps: Vec<Step>,
    xtx: f64,
    shape: PhaseShape,
) -> Vec<Step> {
    let bound = |step_key: &str, key: &str| {
        let value = bag.as_f64(step_key);
        if value.is_nan() {
            bag.as_f64(key)
        } else {
            value
        }
    };
    let x_min = bound("xStepMin", "xMin");
    let x_max = bound("xStepMax", "xMax");

    if x_min.is_nan() || x_max.is_nan() || x_min < 0.0 || x_max <= 0.0 || x_min > x_max {
        ctx.ignored(
            PHASE_TAP_CHANGER,
            id,
            &format!("step reactance not interpolated, xMin {} xMax {}", x_min, x_max),
        );
        return steps;
    }
    if !xtx.is_finite() || xtx == 0.0 {
        ctx.ignored(
            PHASE_TAP_CHANGER,
            id,
            "step reactance not interpolated, zero transformer reactance",
        );
        return steps;
    }
    let alpha_max = steps
        .iter()
        .map(|s| s.angle)
        .fold(f64::NEG_INFINITY, f64::max);
    if alpha_max == 0.0 || !alpha_max.is_finite() {
        return steps;
    }
    let alpha_max = alpha_max.to_radians();

    steps
        .into_iter()
        .map(|s| {
            let alpha = s.angle.to_radians();
            let x = match shape {
                PhaseShape::Symmetrical => {
                    let k = (alpha / 2.0).sin() / (alpha_max / 2.0).sin();
                    x_min + (x_max - x_min) * k * k
                }
                PhaseShape::Asymmetrical(theta) => {
                    let numer = theta.sin() - alpha_max.tan() * theta.cos();
                    let denom = theta.sin() - alpha.tan() * theta.cos();
                    let k = alpha.tan() / alpha_max.tan() * numer / denom;
                    x_min + (x_max - x_min) * k * k
                }
            };
            Step {
                x: (x - xtx) / xtx * 100.0,
                ..s
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::model::CgmesModel;
    use cimgrid_core::Severity;
    use serde_json::json;

    const TOL: f64 = 1e-9;

    fn model(value: serde_json::Value) -> CgmesModel {
        CgmesModel::from_json_str(&value.to_string()).unwrap()
    }

    fn ratio_bag() -> PropertyBag {
        PropertyBag::new()
            .with("RatioTapChanger", "RTC")
            .with("lowStep", 1)
            .with("highStep", 5)
            .with("neutralStep", 3)
            .with("normalStep", 4)
            .with("stepVoltageIncrement", 1.25)
    }

    #[test]
    fn test_linear_ratio_steps() {
        let m = model(json!({}));
        let config = Config::default();
        let mut ctx = Context::new(&m, &config);
        let tc = ratio_tap_changer(&mut ctx, &ratio_bag(), 1).unwrap();

        assert_eq!(tc.steps.len() as i32, tc.high_tap_position() - tc.low_tap_position + 1);
        assert_eq!(tc.low_tap_position, 1);
        assert_eq!(tc.tap_position, 4);
        assert!((tc.steps[0].ratio - 0.975).abs() < TOL);
        assert!((tc.steps[2].ratio - 1.0).abs() < TOL);
        assert!((tc.steps[4].ratio - 1.025).abs() < TOL);
        assert!(!tc.ltc_flag);
        assert!(!tc.regulating);
        assert!(!ctx.diagnostics.has_issues());
    }

    #[test]
    fn test_sv_tap_step_wins_and_out_of_range_clamps_to_neutral() {
        let m = model(json!({}));
        let config = Config::default();
        let mut ctx = Context::new(&m, &config);

        let tc = ratio_tap_changer(&mut ctx, &ratio_bag().with("SVtapStep", 2.0), 1).unwrap();
        assert_eq!(tc.tap_position, 2);

        let tc = ratio_tap_changer(&mut ctx, &ratio_bag().with("SVtapStep", 9), 1).unwrap();
        assert_eq!(tc.tap_position, 3);
        assert!(tc.position_in_range());
        assert_eq!(ctx.diagnostics.count(Severity::Fixed), 1);
    }

    #[test]
    fn test_extreme_step_numbers_rejected() {
        let m = model(json!({}));
        let config = Config::default();
        let mut ctx = Context::new(&m, &config);

        let far_neutral = ratio_bag()
            .with("lowStep", -2_000_000_000)
            .with("highStep", -2_000_000_000)
            .with("neutralStep", 2_000_000_000)
            .with("normalStep", -2_000_000_000);
        assert!(ratio_tap_changer(&mut ctx, &far_neutral, 1).is_none());

        let wide = ratio_bag()
            .with("lowStep", i32::MIN)
            .with("highStep", i32::MAX)
            .with("neutralStep", 0);
        assert!(ratio_tap_changer(&mut ctx, &wide, 1).is_none());
        assert_eq!(ctx.diagnostics.count(Severity::Invalid), 2);
    }

    #[test]
    fn test_neutral_outside_range_uses_wide_offset() {
        let m = model(json!({}));
        let config = Config::default();
        let mut ctx = Context::new(&m, &config);
        let bag = ratio_bag()
            .with("lowStep", 10)
            .with("highStep", 12)
            .with("neutralStep", 0)
            .with("normalStep", 11);
        let tc = ratio_tap_changer(&mut ctx, &bag, 1).unwrap();
        assert_eq!(tc.steps.len(), 3);
        assert!((tc.steps[0].ratio - 1.125).abs() < TOL);
        assert!(!ctx.diagnostics.has_invalid());
    }

    #[test]
    fn test_invalid_step_range() {
        let m = model(json!({}));
        let config = Config::default();
        let mut ctx = Context::new(&m, &config);
        let bag = ratio_bag().with("lowStep", 6);
        assert!(ratio_tap_changer(&mut ctx, &bag, 1).is_none());
        assert!(ctx.diagnostics.has_invalid());
    }

    #[test]
    fn test_tabular_ratio_with_undefined_values() {
        let m = model(json!({
            "ratio_tap_changer_table_points": [
                {"RatioTapChangerTable": "RT", "step": 1, "ratio": 0.9, "x": 2.0},
                {"RatioTapChangerTable": "RT", "step": 2},
                {"RatioTapChangerTable": "RT", "step": 3, "ratio": 1.1, "g": 1.5},
            ]
        }));
        let config = Config::default();
        let mut ctx = Context::new(&m, &config);
        let bag = PropertyBag::new()
            .with("RatioTapChanger", "RTC")
            .with("RatioTapChangerTable", "RT")
            .with("lowStep", 1)
            .with("highStep", 3)
            .with("neutralStep", 2);
        let tc = ratio_tap_changer(&mut ctx, &bag, 2).unwrap();

        assert_eq!(tc.side, 2);
        assert_eq!(tc.steps.len(), 3);
        assert_eq!(tc.steps[0].ratio, 0.9);
        assert_eq!(tc.steps[0].x, 2.0);
        assert_eq!(tc.steps[1].ratio, 1.0);
        assert_eq!(tc.steps[2].g1, 1.5);
        assert_eq!(tc.steps[2].g2, 0.0);
        // One report per column with undefined values: ratio, r, x, g, b
        assert_eq!(ctx.diagnostics.count(Severity::Fixed), 5);
        assert!(ratio_tap_changer_defined(&bag));
        assert!(!ratio_tap_changer_defined(&PropertyBag::new()));
    }

    #[test]
    fn test_regulation_flags() {
        let m = model(json!({
            "regulating_controls": [{"RegulatingControl": "RC", "mode": "voltage", "enabled": true}]
        }));
        let config = Config::default();
        let mut ctx = Context::new(&m, &config);
        let bag = ratio_bag()
            .with("TapChangerControl", "RC")
            .with("tapChangerControlEnabled", true)
            .with("ltcFlag", true);
        let tc = ratio_tap_changer(&mut ctx, &bag, 1).unwrap();
        assert!(tc.regulating);
        assert!(tc.ltc_flag);
        assert_eq!(tc.regulating_control_id.as_deref(), Some("RC"));

        let bag = bag.with("TapChangerControl", "UNKNOWN");
        assert!(!ratio_tap_changer(&mut ctx, &bag, 1).unwrap().regulating);
    }

    fn phase_bag(kind: &str) -> PropertyBag {
        PropertyBag::new()
            .with("PhaseTapChanger", "PTC")
            .with("phaseTapChangerType", kind)
            .with("lowStep", -2)
            .with("highStep", 2)
            .with("neutralStep", 0)
            .with("normalStep", 0)
    }

    #[test]
    fn test_symmetrical_with_phase_shift_increment() {
        let m = model(json!({}));
        let config = Config::default();
        let mut ctx = Context::new(&m, &config);
        let bag = phase_bag("PhaseTapChangerSymmetrical")
            .with("voltageStepIncrement", 2.0)
            .with("stepPhaseShiftIncrement", 5.0)
            .with("xMin", 10.0)
            .with("xMax", 20.0);
        let tc = phase_tap_changer(&mut ctx, &bag, 1, 10.0).unwrap();

        let angles: Vec<f64> = tc.steps.iter().map(|s| s.angle).collect();
        assert_eq!(angles, vec![-10.0, -5.0, 0.0, 5.0, 10.0]);
        assert!(tc.steps.iter().all(|s| s.ratio == 1.0));
        // x runs from xMin at neutral to xMax at the largest shift
        assert!(tc.steps[2].x.abs() < TOL);
        assert!((tc.steps[4].x - 100.0).abs() < TOL);
        assert!((tc.steps[0].x - 100.0).abs() < TOL);
        let k = (2.5f64.to_radians().sin() / 5.0f64.to_radians().sin()).powi(2);
        assert!((tc.steps[3].x - 100.0 * k).abs() < TOL);
    }

    #[test]
    fn test_symmetrical_from_voltage_increment() {
        let m = model(json!({}));
        let config = Config::default();
        let mut ctx = Context::new(&m, &config);
        let bag = phase_bag("symmetrical").with("voltageStepIncrement", 2.0);
        let tc = phase_tap_changer(&mut ctx, &bag, 1, 10.0).unwrap();
        let expected = (2.0 * (0.02f64 / 2.0).asin()).to_degrees();
        assert!((tc.steps[3].angle - expected).abs() < TOL);
        assert!((tc.steps[1].angle + expected).abs() < TOL);
        // No reactance bounds: reported, deviations stay zero
        assert!(tc.steps.iter().all(|s| s.x == 0.0));
        assert_eq!(ctx.diagnostics.count(Severity::Ignored), 1);
    }

    #[test]
    fn test_asymmetrical_steps() {
        let m = model(json!({}));
        let config = Config::default();
        let mut ctx = Context::new(&m, &config);
        let bag = phase_bag("PhaseTapChangerKind.asymmetrical")
            .with("voltageStepIncrement", 1.0)
            .with("windingConnectionAngle", 60.0);
        let tc = phase_tap_changer(&mut ctx, &bag, 1, 10.0).unwrap();

        let theta = 60.0f64.to_radians();
        let dx = 1.0 + 2.0 * 0.01 * theta.cos();
        let dy = 2.0 * 0.01 * theta.sin();
        let top = tc.steps[4];
        assert!((top.ratio - dx.hypot(dy)).abs() < TOL);
        assert!((top.angle - dy.atan2(dx).to_degrees()).abs() < TOL);
        assert!((tc.steps[2].ratio - 1.0).abs() < TOL);
        assert!(tc.steps[2].angle.abs() < TOL);
    }

    #[test]
    fn test_asymmetrical_step_reactance_at_extremes() {
        let m = model(json!({}));
        let config = Config::default();
        let mut ctx = Context::new(&m, &config);
        let bag = phase_bag("asymmetrical")
            .with("voltageStepIncrement", 1.0)
            .with("windingConnectionAngle", 90.0)
            .with("xStepMin", 5.0)
            .with("xStepMax", 15.0)
            .with("xMin", 1.0);
        let tc = phase_tap_changer(&mut ctx, &bag, 1, 5.0).unwrap();
        // Largest shift gets xMax, neutral gets xMin (the step bounds win)
        assert!((tc.steps[4].x - 200.0).abs() < 1e-6);
        assert!(tc.steps[2].x.abs() < 1e-6);
    }

    #[test]
    fn test_tabular_phase() {
        let m = model(json!({
            "phase_tap_changer_table_points": [
                {"PhaseTapChangerTable": "PT", "step": 1, "angle": -5.0, "ratio": 1.0, "r": 0.0, "x": 0.0, "g": 0.0, "b": 0.0},
                {"PhaseTapChangerTable": "PT", "step": 2, "angle": 5.0, "ratio": 1.0, "r": 0.0, "x": 3.0, "g": 0.0, "b": 0.0},
            ]
        }));
        let config = Config::default();
        let mut ctx = Context::new(&m, &config);
        let bag = PropertyBag::new()
            .with("PhaseTapChanger", "PTC")
            .with("phaseTapChangerType", "PhaseTapChangerTabular")
            .with("PhaseTapChangerTable", "PT")
            .with("lowStep", 1)
            .with("highStep", 2)
            .with("neutralStep", 1)
            .with("SVtapStep", 2);
        let tc = phase_tap_changer(&mut ctx, &bag, 1, 10.0).unwrap();
        assert_eq!(tc.steps[1].angle, 5.0);
        assert_eq!(tc.steps[1].x, 3.0);
        assert_eq!(tc.tap_position, 2);
        assert!(!ctx.diagnostics.has_issues());
    }

    #[test]
    fn test_unknown_phase_type_single_step() {
        let m = model(json!({}));
        let config = Config::default();
        let mut ctx = Context::new(&m, &config);
        // Tabular type without a table is not usable either
        let tc = phase_tap_changer(&mut ctx, &phase_bag("PhaseTapChangerTabular"), 1, 10.0).unwrap();
        assert_eq!(tc.steps, vec![Step::default()]);
        assert_eq!(tc.low_tap_position, 0);
        assert_eq!(tc.tap_position, 0);
        assert_eq!(ctx.diagnostics.count(Severity::Ignored), 1);
    }
}
