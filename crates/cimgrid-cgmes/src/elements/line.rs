//! AC line segments.

use cimgrid_core::{GridResult, PiModel};

use crate::context::Context;
use crate::elements::equipment::Equipment;
use crate::elements::EquipmentConversion;
use crate::property_bag::PropertyBag;

pub const AC_LINE_SEGMENT: &str = "ACLineSegment";

#[derive(Debug, Clone)]
pub struct AcLineSegmentConversion {
    equipment: Equipment,
    bag: PropertyBag,
}

impl AcLineSegmentConversion {
    pub fn new(ctx: &Context, bag: &PropertyBag) -> Self {
        Self {
            equipment: Equipment::new(ctx, AC_LINE_SEGMENT, bag),
            bag: bag.clone(),
        }
    }

    /// Shunt read from `key`, split evenly between both ends
    fn half_shunt(&self, ctx: &mut Context, key: &str) -> f64 {
        let value = self.bag.as_f64(key);
        if value.is_nan() {
            ctx.missing(AC_LINE_SEGMENT, &self.equipment.id, key, "0");
            return 0.0;
        }
        value / 2.0
    }
}

impl EquipmentConversion for AcLineSegmentConversion {
    fn equipment(&self) -> &Equipment {
        &self.equipment
    }

    fn valid(&self, ctx: &mut Context) -> bool {
        if !self.equipment.valid_terminals(ctx, 2) {
            return false;
        }
        if self.bag.as_f64("r").is_nan() || self.bag.as_f64("x").is_nan() {
            ctx.invalid(AC_LINE_SEGMENT, &self.equipment.id, "r or x undefined");
            return false;
        }
        true
    }

    fn convert(&self, ctx: &mut Context) -> GridResult<()> {
        let g = self.half_shunt(ctx, "gch");
        let b = self.half_shunt(ctx, "bch");
        let pi = PiModel {
            r: self.bag.as_f64("r"),
            x: self.bag.as_f64("x"),
            g1: g,
            b1: b,
            g2: g,
            b2: b,
        };
        self.equipment.convert_branch(ctx, pi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::model::CgmesModel;
    use cimgrid_core::Severity;
    use serde_json::json;

    fn model(line: serde_json::Value) -> CgmesModel {
        CgmesModel::from_json_str(
            &json!({
                "nodes": [
                    {"TopologicalNode": "N1", "VoltageLevel": "VL1"},
                    {"TopologicalNode": "N2", "VoltageLevel": "VL1"},
                ],
                "terminals": [
                    {"Terminal": "T1", "ConductingEquipment": "L1", "sequenceNumber": 1, "TopologicalNode": "N1"},
                    {"Terminal": "T2", "ConductingEquipment": "L1", "sequenceNumber": 2, "TopologicalNode": "N2", "connected": false},
                ],
                "ac_line_segments": [line],
            })
            .to_string(),
        )
        .unwrap()
    }

    fn run<'a>(m: &'a CgmesModel, config: &'a Config) -> Context<'a> {
        let mut ctx = Context::new(m, config);
        let conversion = AcLineSegmentConversion::new(&ctx, &m.ac_line_segments()[0]);
        if conversion.valid(&mut ctx) {
            conversion.convert(&mut ctx).unwrap();
        }
        ctx
    }

    #[test]
    fn test_shunt_split() {
        let m = model(json!({"ACLineSegment": "L1", "r": 0.5, "x": 5.0, "bch": 1e-4}));
        let config = Config::default();
        let ctx = run(&m, &config);
        let line = ctx.network.line("L1").unwrap();
        assert_eq!((line.r, line.x), (0.5, 5.0));
        assert_eq!((line.g1, line.g2), (0.0, 0.0));
        assert_eq!((line.b1, line.b2), (5e-5, 5e-5));
        assert_eq!(line.terminal1.bus.as_deref(), Some("N1"));
        // Open end keeps the bus it could connect to
        assert!(line.terminal2.bus.is_none());
        assert_eq!(line.terminal2.connectable_bus.as_deref(), Some("N2"));
        // gch absent
        assert_eq!(ctx.diagnostics.count(Severity::Missing), 1);
    }

    #[test]
    fn test_undefined_impedance_is_invalid() {
        let m = model(json!({"ACLineSegment": "L1", "x": 5.0}));
        let config = Config::default();
        let ctx = run(&m, &config);
        assert!(ctx.network.lines.is_empty());
        assert_eq!(ctx.diagnostics.count(Severity::Invalid), 1);
    }
}
