//! Power transformers with two or three ends.
//!
//! Both conversions run in three stages, each a pure function of the
//! previous one plus configuration:
//!
//! 1. **load**: raw end parameters and tap changers as declared
//! 2. **interpret**: tap changers, shunts and clocks placed per the
//!    configured alternatives
//! 3. **convert**: everything referred to the network side, ideal ratio at
//!    end 1, ready for the network

pub mod steps;
pub mod tap_changer;
pub mod three_winding;
pub mod two_winding;

use crate::context::Context;
use crate::elements::equipment::Equipment;
use crate::model::PowerTransformer;
use crate::property_bag::PropertyBag;

use tap_changer::{combine_tap_changers, frozen_by_combination, TapChanger};

pub const POWER_TRANSFORMER: &str = "PowerTransformer";

/// Electrical parameters of one transformer end.
#[derive(Debug, Clone, PartialEq)]
pub struct EndParameters {
    pub id: String,
    pub r: f64,
    pub x: f64,
    pub g: f64,
    pub b: f64,
    pub rated_u: f64,
    pub phase_angle_clock: i32,
}

impl EndParameters {
    pub fn load(ctx: &mut Context, transformer: &str, bag: &PropertyBag) -> Self {
        let id = bag.id("TransformerEnd").unwrap_or_default();
        let mut b = bag.as_f64("b");
        if b.is_nan() {
            ctx.missing(POWER_TRANSFORMER, transformer, &format!("b of end {}", id), "0");
            b = 0.0;
        }
        Self {
            r: bag.as_f64("r"),
            x: bag.as_f64("x"),
            g: bag.as_f64_or("g", 0.0),
            b,
            rated_u: bag.as_f64("ratedU"),
            phase_angle_clock: bag.as_i32_or("phaseAngleClock", 0),
            id,
        }
    }
}

/// Tap changers declared on one transformer end.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EndTapChangers {
    pub ratio: Option<TapChanger>,
    pub phase: Option<TapChanger>,
    /// The ratio tap changer has a table or a non-zero step voltage increment
    pub ratio_defined: bool,
}

impl EndTapChangers {
    /// `xtx` is the reactance phase tap changer steps refer to.
    pub fn load(ctx: &mut Context, end: &str, side: usize, xtx: f64) -> Self {
        let model = ctx.model;
        let ratio_bag = model.ratio_tap_changers_of(end).into_iter().next();
        let phase_bag = model.phase_tap_changers_of(end).into_iter().next();
        Self {
            ratio_defined: ratio_bag.is_some_and(steps::ratio_tap_changer_defined),
            ratio: ratio_bag.and_then(|bag| steps::ratio_tap_changer(ctx, bag, side)),
            phase: phase_bag.and_then(|bag| steps::phase_tap_changer(ctx, bag, side, xtx)),
        }
    }
}

/// Equipment view of a power transformer: one terminal per end.
pub fn transformer_equipment(ctx: &Context, transformer: &PowerTransformer) -> Equipment {
    let terminals = transformer
        .ends
        .iter()
        .filter_map(|end| end.id("Terminal"))
        .filter_map(|t| ctx.terminal(&t))
        .collect();
    Equipment {
        class: POWER_TRANSFORMER,
        id: transformer.id.clone(),
        name: transformer.name.clone(),
        graph: transformer.ends.iter().find_map(|end| end.string("graph")),
        terminals,
    }
}

/// Checks shared by two- and three-winding transformers.
pub fn valid_ends(ctx: &mut Context, equipment: &Equipment, ends: &[PropertyBag]) -> bool {
    if !equipment.valid_terminals(ctx, ends.len()) {
        return false;
    }
    let model = ctx.model;
    for end in ends {
        let id = end.id("TransformerEnd").unwrap_or_default();
        let rated_u = end.as_f64("ratedU");
        if !(rated_u.is_finite() && rated_u > 0.0) {
            ctx.invalid(
                POWER_TRANSFORMER,
                &equipment.id,
                &format!("end {} without a positive ratedU", id),
            );
            return false;
        }
        if end.as_f64("r").is_nan() || end.as_f64("x").is_nan() {
            ctx.invalid(
                POWER_TRANSFORMER,
                &equipment.id,
                &format!("end {} without series impedance", id),
            );
            return false;
        }
        let ratio = model.ratio_tap_changers_of(&id).len();
        let phase = model.phase_tap_changers_of(&id).len();
        if ratio > 1 || phase > 1 {
            ctx.invalid(
                POWER_TRANSFORMER,
                &equipment.id,
                &format!(
                    "end {} has {} ratio and {} phase tap changers, at most one of each expected",
                    id, ratio, phase
                ),
            );
            return false;
        }
    }
    true
}

/// Combine two tap changers that end up at the same end, reporting the one
/// that loses its step table.
pub fn combine_at_end(
    ctx: &mut Context,
    transformer: &str,
    own: Option<&TapChanger>,
    other: Option<&TapChanger>,
) -> Option<TapChanger> {
    if let Some(frozen) = frozen_by_combination(own, other) {
        ctx.fixed(
            POWER_TRANSFORMER,
            transformer,
            &format!("tap changer {} frozen at its current step", frozen.id),
            &format!("{} steps", frozen.steps.len()),
            "1 step",
        );
    }
    combine_tap_changers(own, other)
}

/// Tap changers of both ends combined at a single end, or left as declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    End1,
    End2,
    Declared,
}

impl Placement {
    pub fn apply(
        self,
        ctx: &mut Context,
        transformer: &str,
        tc1: Option<TapChanger>,
        tc2: Option<TapChanger>,
    ) -> (Option<TapChanger>, Option<TapChanger>) {
        match self {
            Placement::Declared => (tc1, tc2),
            Placement::End1 => (combine_at_end(ctx, transformer, tc1.as_ref(), tc2.as_ref()), None),
            Placement::End2 => (None, combine_at_end(ctx, transformer, tc2.as_ref(), tc1.as_ref())),
        }
    }
}

/// Tap changer at end 1 after moving the one at end 2 there.
pub fn move_to_end1(
    ctx: &mut Context,
    transformer: &str,
    tc1: Option<&TapChanger>,
    tc2: Option<&TapChanger>,
) -> Option<TapChanger> {
    let moved = tc2.map(TapChanger::moved_from_end2_to_end1);
    combine_at_end(ctx, transformer, tc1, moved.as_ref())
}
