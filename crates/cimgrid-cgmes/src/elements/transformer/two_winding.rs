//! Two-winding power transformers.

use cimgrid_core::{GridResult, PiModel, TwoWindingsTransformer};

use crate::config::{
    TwoWindingsPhaseAngleClock, TwoWindingsRatioPhase, TwoWindingsShunt,
    TwoWindingsStructuralRatio,
};
use crate::context::Context;
use crate::elements::equipment::{BoundaryPosition, Equipment};
use crate::elements::regulating_control::{self, TapChangerKind};
use crate::elements::EquipmentConversion;
use crate::model::PowerTransformer;
use crate::property_bag::PropertyBag;

use super::tap_changer::TapChanger;
use super::{
    move_to_end1, transformer_equipment, valid_ends, EndParameters, EndTapChangers, Placement,
    POWER_TRANSFORMER,
};

#[derive(Debug, Clone)]
pub struct TwoWindingsTransformerConversion {
    equipment: Equipment,
    ends: [PropertyBag; 2],
}

#[derive(Debug, Clone)]
struct LoadedEnd {
    params: EndParameters,
    tap_changers: EndTapChangers,
}

/// Ends as declared, series impedance referred to end 1.
#[derive(Debug, Clone)]
struct Loaded {
    end1: LoadedEnd,
    end2: LoadedEnd,
    r: f64,
    x: f64,
}

#[derive(Debug, Clone, Default)]
struct InterpretedEnd {
    ratio: Option<TapChanger>,
    phase: Option<TapChanger>,
    g: f64,
    b: f64,
    phase_angle_clock: i32,
}

#[derive(Debug, Clone)]
struct Interpreted {
    end1: InterpretedEnd,
    end2: InterpretedEnd,
    /// Structural ratio sits at end 2 and has to be moved to end 1
    ratio_at_end2: bool,
}

/// Ready for the network: ideal ratio and tap changers at end 1.
#[derive(Debug, Clone)]
struct Converted {
    pi: PiModel,
    ratio: Option<TapChanger>,
    phase: Option<TapChanger>,
    phase_angle_clock1: i32,
    phase_angle_clock2: i32,
}

impl TwoWindingsTransformerConversion {
    /// `transformer` must have exactly two ends.
    pub fn new(ctx: &Context, transformer: &PowerTransformer) -> Self {
        Self {
            equipment: transformer_equipment(ctx, transformer),
            ends: [transformer.ends[0].clone(), transformer.ends[1].clone()],
        }
    }

    fn id(&self) -> &str {
        &self.equipment.id
    }

    fn load(&self, ctx: &mut Context) -> Loaded {
        let p1 = EndParameters::load(ctx, self.id(), &self.ends[0]);
        let p2 = EndParameters::load(ctx, self.id(), &self.ends[1]);
        let k = p2.rated_u / p1.rated_u;
        let r = p1.r + p2.r * k * k;
        let x = p1.x + p2.x * k * k;
        let t1 = EndTapChangers::load(ctx, &p1.id, 1, x);
        let t2 = EndTapChangers::load(ctx, &p2.id, 2, x);
        Loaded {
            end1: LoadedEnd {
                params: p1,
                tap_changers: t1,
            },
            end2: LoadedEnd {
                params: p2,
                tap_changers: t2,
            },
            r,
            x,
        }
    }

    fn interpret(&self, ctx: &mut Context, loaded: &Loaded) -> Interpreted {
        let config = &ctx.config().two_windings;
        let (p1, p2) = (&loaded.end1.params, &loaded.end2.params);
        let x1_zero = p1.x == 0.0;

        let placement = match config.ratio_phase {
            TwoWindingsRatioPhase::End1 => Placement::End1,
            TwoWindingsRatioPhase::End2 => Placement::End2,
            TwoWindingsRatioPhase::End1End2 => Placement::Declared,
            TwoWindingsRatioPhase::X if x1_zero => Placement::End1,
            TwoWindingsRatioPhase::X => Placement::End2,
        };

        let (g, b) = (p1.g + p2.g, p1.b + p2.b);
        let shunts = match config.shunt {
            TwoWindingsShunt::End1 => [(g, b), (0.0, 0.0)],
            TwoWindingsShunt::End2 => [(0.0, 0.0), (g, b)],
            TwoWindingsShunt::End1End2 => [(p1.g, p1.b), (p2.g, p2.b)],
            TwoWindingsShunt::Split => [(g / 2.0, b / 2.0); 2],
            TwoWindingsShunt::X if x1_zero => [(g, b), (0.0, 0.0)],
            TwoWindingsShunt::X => [(0.0, 0.0), (g, b)],
        };

        // A negated clock moves to the other end
        let mut clocks = [0, 0];
        if config.phase_angle_clock == TwoWindingsPhaseAngleClock::End1End2 {
            clocks[usize::from(config.negate_phase_angle_end1)] += p1.phase_angle_clock;
            clocks[usize::from(!config.negate_phase_angle_end2)] += p2.phase_angle_clock;
        }

        let ratio_at_end2 = p1.rated_u != p2.rated_u
            && match config.structural_ratio {
                TwoWindingsStructuralRatio::End1 => false,
                TwoWindingsStructuralRatio::End2 => true,
                TwoWindingsStructuralRatio::Rtc => !loaded.end1.tap_changers.ratio_defined,
                TwoWindingsStructuralRatio::X => !x1_zero,
            };
        let negate = [config.negate_phase_angle_end1, config.negate_phase_angle_end2];

        let (t1, t2) = (&loaded.end1.tap_changers, &loaded.end2.tap_changers);
        let (ratio1, ratio2) = placement.apply(ctx, self.id(), t1.ratio.clone(), t2.ratio.clone());
        let (phase1, phase2) = placement.apply(ctx, self.id(), t1.phase.clone(), t2.phase.clone());
        let negated = |tc: Option<TapChanger>, negate: bool| {
            if negate {
                tc.map(|tc| tc.negated())
            } else {
                tc
            }
        };

        Interpreted {
            end1: InterpretedEnd {
                ratio: ratio1,
                phase: negated(phase1, negate[0]),
                g: shunts[0].0,
                b: shunts[0].1,
                phase_angle_clock: clocks[0].rem_euclid(12),
            },
            end2: InterpretedEnd {
                ratio: ratio2,
                phase: negated(phase2, negate[1]),
                g: shunts[1].0,
                b: shunts[1].1,
                phase_angle_clock: clocks[1].rem_euclid(12),
            },
            ratio_at_end2,
        }
    }

    fn convert_interpreted(
        &self,
        ctx: &mut Context,
        loaded: &Loaded,
        interpreted: &Interpreted,
    ) -> Converted {
        let (end1, end2) = (&interpreted.end1, &interpreted.end2);
        let ratio = move_to_end1(ctx, self.id(), end1.ratio.as_ref(), end2.ratio.as_ref());
        let phase = move_to_end1(ctx, self.id(), end1.phase.as_ref(), end2.phase.as_ref());

        let mut pi = PiModel {
            r: loaded.r,
            x: loaded.x,
            g1: end1.g,
            b1: end1.b,
            g2: end2.g,
            b2: end2.b,
        };
        if interpreted.ratio_at_end2 {
            let a0 = loaded.end2.params.rated_u / loaded.end1.params.rated_u;
            match pi.relocate_ratio(a0) {
                Some(relocated) => pi = relocated,
                None => ctx.fixed(
                    POWER_TRANSFORMER,
                    self.id(),
                    "structural ratio not moved, zero series impedance",
                    "ratio at end 2",
                    "ratio kept at end 2",
                ),
            }
        }
        Converted {
            pi,
            ratio,
            phase,
            phase_angle_clock1: end1.phase_angle_clock,
            phase_angle_clock2: end2.phase_angle_clock,
        }
    }

    /// One end on a boundary node: park an equivalent branch there.
    fn convert_at_boundary(&self, ctx: &mut Context, loaded: &Loaded) {
        let (p1, p2) = (&loaded.end1.params, &loaded.end2.params);
        for tc in [
            &loaded.end1.tap_changers.ratio,
            &loaded.end1.tap_changers.phase,
            &loaded.end2.tap_changers.ratio,
            &loaded.end2.tap_changers.phase,
        ]
        .into_iter()
        .flatten()
        {
            ctx.ignored(
                POWER_TRANSFORMER,
                self.id(),
                &format!("tap changer {} of transformer at boundary", tc.id),
            );
        }
        let pi = PiModel::symmetric(loaded.r, loaded.x, p1.g + p2.g, p1.b + p2.b);
        self.equipment.convert_at_boundary(ctx, pi);
    }
}

impl EquipmentConversion for TwoWindingsTransformerConversion {
    fn equipment(&self) -> &Equipment {
        &self.equipment
    }

    fn valid(&self, ctx: &mut Context) -> bool {
        valid_ends(ctx, &self.equipment, &self.ends)
    }

    fn convert(&self, ctx: &mut Context) -> GridResult<()> {
        let loaded = self.load(ctx);
        match self.equipment.boundary_position() {
            BoundaryPosition::Outside => {}
            _ => {
                self.convert_at_boundary(ctx, &loaded);
                return Ok(());
            }
        }
        let interpreted = self.interpret(ctx, &loaded);
        let converted = self.convert_interpreted(ctx, &loaded, &interpreted);

        let eq = &self.equipment;
        let pi = converted.pi;
        ctx.network.add_two_windings_transformer(TwoWindingsTransformer {
            id: eq.id.clone(),
            name: eq.name.clone(),
            terminal1: eq.terminal_ref(0),
            terminal2: eq.terminal_ref(1),
            r: pi.r,
            x: pi.x,
            g: pi.g1 + pi.g2,
            b: pi.b1 + pi.b2,
            rated_u1: loaded.end1.params.rated_u,
            rated_u2: loaded.end2.params.rated_u,
            phase_angle_clock1: converted.phase_angle_clock1,
            phase_angle_clock2: converted.phase_angle_clock2,
            ratio_tap_changer: converted.ratio.as_ref().map(TapChanger::to_ratio_tap_changer),
            phase_tap_changer: converted.phase.as_ref().map(TapChanger::to_phase_tap_changer),
        })?;
        eq.map_terminals(ctx, &eq.id);
        if let Some(tc) = &converted.ratio {
            regulating_control::register(ctx, &eq.id, None, TapChangerKind::Ratio, tc);
        }
        if let Some(tc) = &converted.phase {
            regulating_control::register(ctx, &eq.id, None, TapChangerKind::Phase, tc);
        }
        Ok(())
    }
}
