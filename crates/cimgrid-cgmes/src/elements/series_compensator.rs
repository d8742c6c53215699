use cimgrid_core::{GridResult, PiModel};

use crate::context::Context;
use crate::elements::equipment::Equipment;
use crate::elements::EquipmentConversion;
use crate::property_bag::PropertyBag;

pub const SERIES_COMPENSATOR: &str = "SeriesCompensator";

/// Series capacitor or reactor, a line with zero shunt.
#[derive(Debug, Clone)]
pub struct SeriesCompensatorConversion {
    equipment: Equipment,
    bag: PropertyBag,
}

impl SeriesCompensatorConversion {
    pub fn new(ctx: &Context, bag: &PropertyBag) -> Self {
        Self {
            equipment: Equipment::new(ctx, SERIES_COMPENSATOR, bag),
            bag: bag.clone(),
        }
    }
}

impl EquipmentConversion for SeriesCompensatorConversion {
    fn equipment(&self) -> &Equipment {
        &self.equipment
    }

    fn valid(&self, ctx: &mut Context) -> bool {
        if !self.equipment.valid_terminals(ctx, 2) {
            return false;
        }
        if self.bag.as_f64("x").is_nan() {
            ctx.invalid(SERIES_COMPENSATOR, &self.equipment.id, "x undefined");
            return false;
        }
        true
    }

    fn convert(&self, ctx: &mut Context) -> GridResult<()> {
        let mut r = self.bag.as_f64("r");
        if r.is_nan() {
            ctx.missing(SERIES_COMPENSATOR, &self.equipment.id, "r", "0");
            r = 0.0;
        }
        let x = self.bag.as_f64("x");
        self.equipment
            .convert_branch(ctx, PiModel::symmetric(r, x, 0.0, 0.0))
    }
}
