//! Breakers, disconnectors and load break switches.

use cimgrid_core::{GridResult, Line, PiModel, Switch, SwitchKind};

use crate::context::Context;
use crate::elements::equipment::Equipment;
use crate::elements::EquipmentConversion;
use crate::property_bag::PropertyBag;

pub const SWITCH: &str = "Switch";

/// Impedance of a switch joining two voltage levels, converted as a line
const SWITCH_LINE_IMPEDANCE: f64 = 7e-5;

#[derive(Debug, Clone)]
pub struct SwitchConversion {
    equipment: Equipment,
    bag: PropertyBag,
}

fn switch_kind(bag: &PropertyBag) -> SwitchKind {
    match bag.local("type").unwrap_or_default().as_str() {
        "Disconnector" => SwitchKind::Disconnector,
        "LoadBreakSwitch" => SwitchKind::LoadBreakSwitch,
        _ => SwitchKind::Breaker,
    }
}

impl SwitchConversion {
    pub fn new(ctx: &Context, bag: &PropertyBag) -> Self {
        Self {
            equipment: Equipment::new(ctx, SWITCH, bag),
            bag: bag.clone(),
        }
    }
}

impl EquipmentConversion for SwitchConversion {
    fn equipment(&self) -> &Equipment {
        &self.equipment
    }

    fn valid(&self, ctx: &mut Context) -> bool {
        self.equipment.valid_terminals(ctx, 2)
    }

    fn convert(&self, ctx: &mut Context) -> GridResult<()> {
        let eq = &self.equipment;
        if eq.convert_at_boundary(ctx, PiModel::default()) {
            return Ok(());
        }
        let open = self.bag.as_bool_or("open", self.bag.as_bool_or("normalOpen", false));
        let (t1, t2) = (&eq.terminals[0], &eq.terminals[1]);
        if t1.voltage_level == t2.voltage_level {
            ctx.network.add_switch(Switch {
                id: eq.id.clone(),
                name: eq.name.clone(),
                kind: switch_kind(&self.bag),
                voltage_level: t1.voltage_level.clone().unwrap_or_default(),
                bus1: t1.node.clone(),
                bus2: t2.node.clone(),
                open,
                retained: self.bag.as_bool_or("retained", false),
            })?;
        } else {
            ctx.fixed(
                SWITCH,
                &eq.id,
                "switch between voltage levels",
                "switch",
                "low impedance line",
            );
            let mut terminal1 = eq.terminal_ref(0);
            let mut terminal2 = eq.terminal_ref(1);
            if open {
                terminal1.disconnect();
                terminal2.disconnect();
            }
            ctx.network.add_line(Line {
                id: eq.id.clone(),
                name: eq.name.clone(),
                terminal1,
                terminal2,
                r: SWITCH_LINE_IMPEDANCE,
                x: SWITCH_LINE_IMPEDANCE,
                ..Line::default()
            })?;
        }
        eq.map_terminals(ctx, &eq.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::model::CgmesModel;
    use cimgrid_core::Severity;
    use serde_json::json;

    fn model() -> CgmesModel {
        CgmesModel::from_json_str(
            &json!({
                "nodes": [
                    {"TopologicalNode": "N1", "VoltageLevel": "VL1"},
                    {"TopologicalNode": "N2", "VoltageLevel": "VL1"},
                    {"TopologicalNode": "N3", "VoltageLevel": "VL2"},
                    {"TopologicalNode": "BN", "boundary": true},
                ],
                "terminals": [
                    {"Terminal": "A1", "ConductingEquipment": "BRK", "sequenceNumber": 1, "TopologicalNode": "N1"},
                    {"Terminal": "A2", "ConductingEquipment": "BRK", "sequenceNumber": 2, "TopologicalNode": "N2"},
                    {"Terminal": "B1", "ConductingEquipment": "CPL", "sequenceNumber": 1, "TopologicalNode": "N2"},
                    {"Terminal": "B2", "ConductingEquipment": "CPL", "sequenceNumber": 2, "TopologicalNode": "N3"},
                    {"Terminal": "C1", "ConductingEquipment": "XSW", "sequenceNumber": 1, "TopologicalNode": "N3"},
                    {"Terminal": "C2", "ConductingEquipment": "XSW", "sequenceNumber": 2, "TopologicalNode": "BN"},
                ],
                "switches": [
                    {"Switch": "BRK", "type": "Disconnector", "open": true, "retained": true},
                    {"Switch": "CPL", "type": "Breaker"},
                    {"Switch": "XSW"},
                ],
            })
            .to_string(),
        )
        .unwrap()
    }

    #[test]
    fn test_switch_conversions() {
        let m = model();
        let config = Config::default();
        let mut ctx = Context::new(&m, &config);
        for bag in m.switches() {
            let conversion = SwitchConversion::new(&ctx, bag);
            assert!(conversion.valid(&mut ctx));
            conversion.convert(&mut ctx).unwrap();
        }

        let switch = &ctx.network.switches[0];
        assert_eq!(switch.id, "BRK");
        assert_eq!(switch.kind, SwitchKind::Disconnector);
        assert!(switch.open && switch.retained);
        assert_eq!(switch.bus2.as_deref(), Some("N2"));

        let line = ctx.network.line("CPL").unwrap();
        assert_eq!((line.r, line.x), (7e-5, 7e-5));
        assert_eq!(line.b1, 0.0);
        assert_eq!(ctx.diagnostics.count(Severity::Fixed), 1);

        assert_eq!(ctx.network.switches.len(), 1);
        let parked = ctx.boundary.take_lines();
        assert!(parked["BN"][0].pi.is_zero());
    }
}
