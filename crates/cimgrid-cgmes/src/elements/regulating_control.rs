//! Regulating controls of tap changers.
//!
//! Transformers register the controls of their tap changers while being
//! converted; the controls are resolved once all equipment exists so that the
//! regulated terminal can be any converted terminal.

use cimgrid_core::{Network, PhaseRegulationMode, PhaseTapChanger, RatioTapChanger};

use crate::context::Context;
use crate::elements::transformer::tap_changer::TapChanger;
use crate::property_bag::PropertyBag;

const REGULATING_CONTROL: &str = "RegulatingControl";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapChangerKind {
    Ratio,
    Phase,
}

/// Tap changer control waiting for the second pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRegulation {
    pub transformer: String,
    /// Leg of a three-winding transformer; `None` for two windings
    pub leg: Option<usize>,
    pub kind: TapChangerKind,
    pub tap_changer: String,
    pub control: String,
    pub regulating: bool,
}

/// Remember the control of a converted tap changer, if it has one.
pub fn register(
    ctx: &mut Context,
    transformer: &str,
    leg: Option<usize>,
    kind: TapChangerKind,
    tc: &TapChanger,
) {
    if let Some(control) = &tc.regulating_control_id {
        ctx.regulations.push(PendingRegulation {
            transformer: transformer.to_string(),
            leg,
            kind,
            tap_changer: tc.id.clone(),
            control: control.clone(),
            regulating: tc.regulating,
        });
    }
}

pub fn convert_regulating_controls(ctx: &mut Context) {
    let pending = std::mem::take(&mut ctx.regulations);
    for regulation in &pending {
        convert(ctx, regulation);
    }
}

/// Finite value or `None`
fn defined(value: f64) -> Option<f64> {
    Some(value).filter(|v| v.is_finite())
}

fn ratio_tap_changer<'n>(
    network: &'n mut Network,
    regulation: &PendingRegulation,
) -> Option<&'n mut RatioTapChanger> {
    match regulation.leg {
        None => network
            .two_windings_transformer_mut(&regulation.transformer)?
            .ratio_tap_changer
            .as_mut(),
        Some(leg) => network
            .three_windings_transformer_mut(&regulation.transformer)?
            .legs
            .get_mut(leg)?
            .ratio_tap_changer
            .as_mut(),
    }
}

fn phase_tap_changer<'n>(
    network: &'n mut Network,
    regulation: &PendingRegulation,
) -> Option<&'n mut PhaseTapChanger> {
    match regulation.leg {
        None => network
            .two_windings_transformer_mut(&regulation.transformer)?
            .phase_tap_changer
            .as_mut(),
        Some(leg) => network
            .three_windings_transformer_mut(&regulation.transformer)?
            .legs
            .get_mut(leg)?
            .phase_tap_changer
            .as_mut(),
    }
}

fn regulation_terminal(ctx: &mut Context, control: &str, bag: &PropertyBag) -> Option<String> {
    let terminal = bag.id("Terminal")?;
    if ctx.terminal_mapping.find(&terminal).is_some() {
        Some(terminal)
    } else {
        ctx.missing(
            REGULATING_CONTROL,
            control,
            &format!("converted regulated terminal {}", terminal),
            "local regulation",
        );
        None
    }
}

fn convert(ctx: &mut Context, regulation: &PendingRegulation) {
    let model = ctx.model;
    let control = regulation.control.as_str();
    let Some(bag) = model.regulating_control(control) else {
        ctx.missing(
            REGULATING_CONTROL,
            control,
            &format!("control of tap changer {}", regulation.tap_changer),
            "no regulation",
        );
        return;
    };
    let mode = bag.local("mode").unwrap_or_default().to_ascii_lowercase();
    let target = defined(bag.as_f64("targetValue"));
    let deadband = defined(bag.as_f64("targetDeadband"));

    match (regulation.kind, mode.as_str()) {
        (TapChangerKind::Ratio, "voltage") => {
            let target_v = target.filter(|v| *v > 0.0);
            if target_v.is_none() && regulation.regulating {
                ctx.invalid(REGULATING_CONTROL, control, "voltage target undefined or not positive");
                return;
            }
            let terminal = regulation_terminal(ctx, control, bag);
            if let Some(rtc) = ratio_tap_changer(&mut ctx.network, regulation) {
                rtc.regulating = regulation.regulating;
                rtc.target_v = target_v;
                rtc.target_deadband = deadband;
                rtc.regulation_terminal = terminal;
            }
        }
        (TapChangerKind::Phase, "activepower" | "currentflow") => {
            let regulation_mode = if mode == "activepower" {
                PhaseRegulationMode::ActivePowerControl
            } else {
                PhaseRegulationMode::CurrentLimiter
            };
            let terminal = regulation_terminal(ctx, control, bag);
            if let Some(ptc) = phase_tap_changer(&mut ctx.network, regulation) {
                ptc.regulation_mode = regulation_mode;
                ptc.regulating = regulation.regulating;
                ptc.regulation_value = target;
                ptc.target_deadband = deadband;
                ptc.regulation_terminal = terminal;
            }
        }
        (kind, _) => {
            ctx.ignored(
                REGULATING_CONTROL,
                control,
                &format!(
                    "mode '{}' not supported for {} tap changer {}",
                    mode,
                    match kind {
                        TapChangerKind::Ratio => "ratio",
                        TapChangerKind::Phase => "phase",
                    },
                    regulation.tap_changer
                ),
            );
        }
    }
}
