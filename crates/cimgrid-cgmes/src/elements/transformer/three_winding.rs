//! Three-winding power transformers, converted as three legs meeting at a
//! star bus. End 1 of each leg is its network side, end 2 the star bus side.

use cimgrid_core::{GridResult, Leg, PiModel, ThreeWindingsTransformer};

use crate::config::{
    ThreeWindingsConfig, ThreeWindingsPhaseAngleClock, ThreeWindingsRatioPhase,
    ThreeWindingsShunt, ThreeWindingsStructuralRatio,
};
use crate::context::Context;
use crate::elements::equipment::{BoundaryPosition, Equipment};
use crate::elements::regulating_control::{self, TapChangerKind};
use crate::elements::EquipmentConversion;
use crate::model::PowerTransformer;
use crate::property_bag::PropertyBag;

use super::tap_changer::TapChanger;
use super::{
    move_to_end1, transformer_equipment, valid_ends, EndParameters, EndTapChangers,
    POWER_TRANSFORMER,
};

#[derive(Debug, Clone)]
pub struct ThreeWindingsTransformerConversion {
    equipment: Equipment,
    ends: [PropertyBag; 3],
}

#[derive(Debug, Clone)]
struct LoadedWinding {
    params: EndParameters,
    tap_changers: EndTapChangers,
}

#[derive(Debug, Clone, Default)]
struct InterpretedSide {
    ratio: Option<TapChanger>,
    phase: Option<TapChanger>,
    g: f64,
    b: f64,
    phase_angle_clock: i32,
}

#[derive(Debug, Clone)]
struct InterpretedWinding {
    network_side: InterpretedSide,
    star_bus_side: InterpretedSide,
    /// Ratio `ratedU0 / ratedU` moved from the star bus side, if any
    structural_ratio: Option<f64>,
}

fn negated(tc: Option<TapChanger>, negate: bool) -> Option<TapChanger> {
    if negate {
        tc.map(|tc| tc.negated())
    } else {
        tc
    }
}

/// Rated voltage of the star bus for the configured structural ratio.
fn rated_u0(config: &ThreeWindingsConfig, windings: &[LoadedWinding]) -> f64 {
    match config.structural_ratio {
        ThreeWindingsStructuralRatio::NetworkSide => 1.0,
        ThreeWindingsStructuralRatio::StarBusSide | ThreeWindingsStructuralRatio::End1 => {
            windings[0].params.rated_u
        }
        ThreeWindingsStructuralRatio::End2 => windings[1].params.rated_u,
        ThreeWindingsStructuralRatio::End3 => windings[2].params.rated_u,
    }
}

impl ThreeWindingsTransformerConversion {
    /// `transformer` must have exactly three ends.
    pub fn new(ctx: &Context, transformer: &PowerTransformer) -> Self {
        Self {
            equipment: transformer_equipment(ctx, transformer),
            ends: [
                transformer.ends[0].clone(),
                transformer.ends[1].clone(),
                transformer.ends[2].clone(),
            ],
        }
    }

    fn id(&self) -> &str {
        &self.equipment.id
    }

    fn load(&self, ctx: &mut Context) -> Vec<LoadedWinding> {
        self.ends
            .iter()
            .map(|end| {
                let params = EndParameters::load(ctx, self.id(), end);
                // Declared tap changers sit at the network side of their leg
                let tap_changers = EndTapChangers::load(ctx, &params.id, 1, params.x);
                LoadedWinding {
                    params,
                    tap_changers,
                }
            })
            .collect()
    }

    fn interpret(&self, ctx: &Context, winding: &LoadedWinding, rated_u0: f64) -> InterpretedWinding {
        let config = &ctx.config().three_windings;
        let params = &winding.params;
        let tcs = &winding.tap_changers;

        let mut network_side = InterpretedSide::default();
        let mut star_bus_side = InterpretedSide::default();
        let side = match config.ratio_phase {
            ThreeWindingsRatioPhase::NetworkSide => &mut network_side,
            ThreeWindingsRatioPhase::StarBusSide => &mut star_bus_side,
        };
        side.ratio = tcs.ratio.clone();
        side.phase = tcs.phase.clone();

        match config.shunt {
            ThreeWindingsShunt::NetworkSide => (network_side.g, network_side.b) = (params.g, params.b),
            ThreeWindingsShunt::StarBusSide => (star_bus_side.g, star_bus_side.b) = (params.g, params.b),
            ThreeWindingsShunt::Split => {
                (network_side.g, network_side.b) = (params.g / 2.0, params.b / 2.0);
                (star_bus_side.g, star_bus_side.b) = (params.g / 2.0, params.b / 2.0);
            }
        }

        match config.phase_angle_clock {
            ThreeWindingsPhaseAngleClock::Off => {}
            ThreeWindingsPhaseAngleClock::NetworkSide => {
                let clock = params.phase_angle_clock;
                network_side.phase_angle_clock = if config.negate_phase_angle_network_side {
                    (-clock).rem_euclid(12)
                } else {
                    clock.rem_euclid(12)
                };
            }
            ThreeWindingsPhaseAngleClock::StarBusSide => {
                let clock = params.phase_angle_clock;
                star_bus_side.phase_angle_clock = if config.negate_phase_angle_star_bus_side {
                    (-clock).rem_euclid(12)
                } else {
                    clock.rem_euclid(12)
                };
            }
        }

        network_side.phase = negated(network_side.phase, config.negate_phase_angle_network_side);
        star_bus_side.phase = negated(star_bus_side.phase, config.negate_phase_angle_star_bus_side);

        let structural_ratio = match config.structural_ratio {
            ThreeWindingsStructuralRatio::StarBusSide if rated_u0 != params.rated_u => {
                Some(rated_u0 / params.rated_u)
            }
            _ => None,
        };

        InterpretedWinding {
            network_side,
            star_bus_side,
            structural_ratio,
        }
    }

    fn convert_leg(
        &self,
        ctx: &mut Context,
        index: usize,
        winding: &LoadedWinding,
        interpreted: &InterpretedWinding,
    ) -> (Leg, Option<TapChanger>, Option<TapChanger>) {
        let (network, star) = (&interpreted.network_side, &interpreted.star_bus_side);
        let ratio = move_to_end1(ctx, self.id(), network.ratio.as_ref(), star.ratio.as_ref());
        let phase = move_to_end1(ctx, self.id(), network.phase.as_ref(), star.phase.as_ref());

        let mut pi = PiModel {
            r: winding.params.r,
            x: winding.params.x,
            g1: network.g,
            b1: network.b,
            g2: star.g,
            b2: star.b,
        };
        if let Some(a0) = interpreted.structural_ratio {
            match pi.relocate_ratio(a0) {
                Some(relocated) => pi = relocated,
                None => ctx.fixed(
                    POWER_TRANSFORMER,
                    self.id(),
                    &format!("structural ratio of winding {} not moved, zero series impedance", index + 1),
                    "ratio at star bus side",
                    "ratio kept at star bus side",
                ),
            }
        }
        let leg = Leg {
            terminal: self.equipment.terminal_ref(index),
            r: pi.r,
            x: pi.x,
            g: pi.g1 + pi.g2,
            b: pi.b1 + pi.b2,
            rated_u: winding.params.rated_u,
            phase_angle_clock: network.phase_angle_clock,
            star_bus_phase_angle_clock: star.phase_angle_clock,
            ratio_tap_changer: ratio.as_ref().map(TapChanger::to_ratio_tap_changer),
            phase_tap_changer: phase.as_ref().map(TapChanger::to_phase_tap_changer),
        };
        (leg, ratio, phase)
    }
}

impl EquipmentConversion for ThreeWindingsTransformerConversion {
    fn equipment(&self) -> &Equipment {
        &self.equipment
    }

    fn valid(&self, ctx: &mut Context) -> bool {
        if !valid_ends(ctx, &self.equipment, &self.ends) {
            return false;
        }
        if self.equipment.boundary_position() != BoundaryPosition::Outside {
            ctx.invalid(POWER_TRANSFORMER, self.id(), "three-winding transformer at boundary");
            return false;
        }
        true
    }

    fn convert(&self, ctx: &mut Context) -> GridResult<()> {
        let windings = self.load(ctx);
        let rated_u0 = rated_u0(&ctx.config().three_windings, &windings);

        let mut legs: [Leg; 3] = Default::default();
        let mut regulations = Vec::new();
        for (i, winding) in windings.iter().enumerate() {
            let interpreted = self.interpret(ctx, winding, rated_u0);
            let (leg, ratio, phase) = self.convert_leg(ctx, i, winding, &interpreted);
            legs[i] = leg;
            regulations.push((i, ratio, phase));
        }

        let eq = &self.equipment;
        ctx.network
            .add_three_windings_transformer(ThreeWindingsTransformer {
                id: eq.id.clone(),
                name: eq.name.clone(),
                rated_u0,
                legs,
            })?;
        eq.map_terminals(ctx, &eq.id);
        for (i, ratio, phase) in &regulations {
            if let Some(tc) = ratio {
                regulating_control::register(ctx, &eq.id, Some(*i), TapChangerKind::Ratio, tc);
            }
            if let Some(tc) = phase {
                regulating_control::register(ctx, &eq.id, Some(*i), TapChangerKind::Phase, tc);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::model::CgmesModel;
    use cimgrid_core::Severity;
    use serde_json::{json, Value};

    const TOL: f64 = 1e-9;

    fn model(terminal3_node: &str, phase_tap_changers: Value) -> CgmesModel {
        CgmesModel::from_json_str(
            &json!({
                "nodes": [
                    {"TopologicalNode": "N1", "VoltageLevel": "VL1"},
                    {"TopologicalNode": "N2", "VoltageLevel": "VL2"},
                    {"TopologicalNode": "N3", "VoltageLevel": "VL3"},
                    {"TopologicalNode": "BN", "boundary": true},
                ],
                "terminals": [
                    {"Terminal": "T1", "ConductingEquipment": "TR3", "TopologicalNode": "N1"},
                    {"Terminal": "T2", "ConductingEquipment": "TR3", "TopologicalNode": "N2"},
                    {"Terminal": "T3", "ConductingEquipment": "TR3", "TopologicalNode": terminal3_node},
                ],
                "transformer_ends": [
                    {"TransformerEnd": "E1", "PowerTransformer": "TR3", "endNumber": 1, "Terminal": "T1",
                     "r": 0.4, "x": 40.0, "g": 2e-6, "b": -8e-6, "ratedU": 400.0},
                    {"TransformerEnd": "E2", "PowerTransformer": "TR3", "endNumber": 2, "Terminal": "T2",
                     "r": 0.1, "x": 4.0, "g": 0.0, "b": 0.0, "ratedU": 220.0, "phaseAngleClock": 11},
                    {"TransformerEnd": "E3", "PowerTransformer": "TR3", "endNumber": 3, "Terminal": "T3",
                     "r": 0.02, "x": 0.5, "g": 0.0, "b": 0.0, "ratedU": 20.0},
                ],
                "phase_tap_changers": phase_tap_changers,
            })
            .to_string(),
        )
        .unwrap()
    }

    fn convert<'a>(m: &'a CgmesModel, config: &'a Config) -> Context<'a> {
        let mut ctx = Context::new(m, config);
        let conversion = ThreeWindingsTransformerConversion::new(&ctx, &m.transformers()[0]);
        if conversion.valid(&mut ctx) {
            conversion.convert(&mut ctx).unwrap();
        }
        ctx
    }

    #[test]
    fn test_star_bus_side_structural_ratio() {
        let m = model("N3", json!([]));
        let config = Config::default();
        let ctx = convert(&m, &config);
        let t = ctx.network.three_windings_transformer("TR3").unwrap();
        assert_eq!(t.rated_u0, 400.0);

        // Winding 1 at ratedU0, nothing moved
        assert_eq!((t.legs[0].r, t.legs[0].x), (0.4, 40.0));
        assert!((t.legs[0].b + 8e-6).abs() < 1e-15);

        // Winding 2 referred to the star bus voltage
        let a0 = 400.0_f64 / 220.0;
        assert!((t.legs[1].x - 4.0 * a0 * a0).abs() < TOL);
        assert!((t.legs[1].r - 0.1 * a0 * a0).abs() < TOL);
        assert_eq!(t.legs[1].rated_u, 220.0);
        assert_eq!(t.legs[1].terminal.bus.as_deref(), Some("N2"));
        assert_eq!(t.legs[1].phase_angle_clock, 0);
        assert_eq!(ctx.terminal_mapping.len(), 3);
    }

    #[test]
    fn test_network_side_alternatives() {
        let m = model("N3", json!([]));
        let mut config = Config::default();
        config.three_windings.structural_ratio = ThreeWindingsStructuralRatio::NetworkSide;
        config.three_windings.phase_angle_clock = ThreeWindingsPhaseAngleClock::NetworkSide;
        let ctx = convert(&m, &config);
        let t = &ctx.network.three_windings_transformers[0];
        assert_eq!(t.rated_u0, 1.0);
        assert_eq!((t.legs[2].r, t.legs[2].x), (0.02, 0.5));
        assert_eq!(t.legs[1].phase_angle_clock, 11);
    }

    #[test]
    fn test_end3_structural_ratio() {
        let m = model("N3", json!([]));
        let mut config = Config::default();
        config.three_windings.structural_ratio = ThreeWindingsStructuralRatio::End3;
        let ctx = convert(&m, &config);
        let t = &ctx.network.three_windings_transformers[0];
        assert_eq!(t.rated_u0, 20.0);
        assert_eq!((t.legs[0].r, t.legs[0].x), (0.4, 40.0));
    }

    #[test]
    fn test_phase_tap_changer_per_leg() {
        let m = model(
            "N3",
            json!([{
                "PhaseTapChanger": "PTC", "TransformerEnd": "E2",
                "phaseTapChangerType": "PhaseTapChangerSymmetrical",
                "lowStep": -2, "highStep": 2, "neutralStep": 0, "normalStep": 1,
                "voltageStepIncrement": 2.0, "stepPhaseShiftIncrement": 3.0,
                "xMin": 4.0, "xMax": 8.0,
            }]),
        );
        let config = Config::default();
        let ctx = convert(&m, &config);
        let t = &ctx.network.three_windings_transformers[0];
        assert!(t.legs[0].phase_tap_changer.is_none());
        let ptc = t.legs[1].phase_tap_changer.as_ref().unwrap();
        assert_eq!(ptc.steps.len(), 5);
        assert_eq!(ptc.tap_position, 1);
        // Sink convention alpha = -angle
        assert!((ptc.steps[4].alpha + 6.0).abs() < TOL);
        // Step reactance refers to the winding's own x
        assert!((ptc.steps[4].x - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_boundary_winding_invalid() {
        let m = model("BN", json!([]));
        let config = Config::default();
        let ctx = convert(&m, &config);
        assert!(ctx.network.three_windings_transformers.is_empty());
        assert_eq!(ctx.diagnostics.count(Severity::Invalid), 1);
    }
}
