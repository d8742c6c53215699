use cimgrid_core::{GridResult, PiModel};

use crate::context::Context;
use crate::elements::equipment::Equipment;
use crate::elements::EquipmentConversion;
use crate::property_bag::PropertyBag;

pub const EQUIVALENT_BRANCH: &str = "EquivalentBranch";

/// Equivalent branch converted as a line without shunt admittance.
#[derive(Debug, Clone)]
pub struct EquivalentBranchConversion {
    equipment: Equipment,
    bag: PropertyBag,
}

impl EquivalentBranchConversion {
    pub fn new(ctx: &Context, bag: &PropertyBag) -> Self {
        Self {
            equipment: Equipment::new(ctx, EQUIVALENT_BRANCH, bag),
            bag: bag.clone(),
        }
    }
}

impl EquipmentConversion for EquivalentBranchConversion {
    fn equipment(&self) -> &Equipment {
        &self.equipment
    }

    fn valid(&self, ctx: &mut Context) -> bool {
        if !self.equipment.valid_terminals(ctx, 2) {
            return false;
        }
        if self.bag.as_f64("r").is_nan() || self.bag.as_f64("x").is_nan() {
            ctx.invalid(EQUIVALENT_BRANCH, &self.equipment.id, "r or x undefined");
            return false;
        }
        true
    }

    fn convert(&self, ctx: &mut Context) -> GridResult<()> {
        let r = self.bag.as_f64("r");
        let x = self.bag.as_f64("x");
        let r21 = self.bag.as_f64_or("r21", r);
        let x21 = self.bag.as_f64_or("x21", x);
        if r21 != r || x21 != x {
            ctx.ignored(
                EQUIVALENT_BRANCH,
                &self.equipment.id,
                &format!(
                    "asymmetric impedance r21 = {}, x21 = {}; using r = {}, x = {}",
                    r21, x21, r, x
                ),
            );
        }
        self.equipment
            .convert_branch(ctx, PiModel::symmetric(r, x, 0.0, 0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::model::CgmesModel;
    use cimgrid_core::Severity;
    use serde_json::json;

    #[test]
    fn test_equivalent_branch() {
        let m = CgmesModel::from_json_str(
            &json!({
                "nodes": [
                    {"TopologicalNode": "N1", "VoltageLevel": "VL1"},
                    {"TopologicalNode": "N2", "VoltageLevel": "VL2"},
                ],
                "terminals": [
                    {"Terminal": "T1", "ConductingEquipment": "EB", "sequenceNumber": 1, "TopologicalNode": "N1"},
                    {"Terminal": "T2", "ConductingEquipment": "EB", "sequenceNumber": 2, "TopologicalNode": "N2"},
                ],
                "equivalent_branches": [
                    {"EquivalentBranch": "EB", "r": 1.5, "x": 12.0, "r21": 1.6, "x21": 12.0},
                ],
            })
            .to_string(),
        )
        .unwrap();
        let config = Config::default();
        let mut ctx = Context::new(&m, &config);
        let conversion = EquivalentBranchConversion::new(&ctx, &m.equivalent_branches()[0]);
        assert!(conversion.valid(&mut ctx));
        conversion.convert(&mut ctx).unwrap();

        let line = ctx.network.line("EB").unwrap();
        assert_eq!((line.r, line.x), (1.5, 12.0));
        assert_eq!((line.b1, line.b2), (0.0, 0.0));
        assert_eq!(ctx.diagnostics.count(Severity::Ignored), 1);
    }
}
