//! Equivalent injections.
//!
//! Inside the network an injection becomes a generator. At a boundary node
//! it describes the external grid behind the node and becomes the generation
//! part of the dangling line attached there.

use cimgrid_core::{DanglingLineGeneration, Generator, GridResult};

use crate::context::Context;
use crate::elements::equipment::Equipment;
use crate::elements::EquipmentConversion;
use crate::property_bag::PropertyBag;

pub const EQUIVALENT_INJECTION: &str = "EquivalentInjection";

/// Voltage regulation declared by an injection.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Regulation {
    on: bool,
    target_v: Option<f64>,
}

fn regulation(ctx: &mut Context, id: &str, bag: &PropertyBag) -> Regulation {
    let capable = bag.as_bool_or("regulationCapability", false);
    let status = bag.as_bool_or("regulationStatus", false);
    let target_v = Some(bag.as_f64("regulationTarget")).filter(|v| v.is_finite() && *v > 0.0);
    if capable && status && target_v.is_none() {
        ctx.fixed(
            EQUIVALENT_INJECTION,
            id,
            "voltage regulation without a valid target",
            "regulating",
            "not regulating",
        );
    }
    Regulation {
        on: capable && status && target_v.is_some(),
        target_v,
    }
}

fn limit(bag: &PropertyBag, key: &str) -> Option<f64> {
    Some(bag.as_f64(key)).filter(|v| v.is_finite())
}

/// Active and reactive injection in load sign convention, missing values as 0
fn injection(ctx: &mut Context, id: &str, bag: &PropertyBag) -> (f64, f64) {
    let mut read = |key: &str| {
        let value = bag.as_f64(key);
        if value.is_nan() {
            ctx.missing(EQUIVALENT_INJECTION, id, key, "0");
            0.0
        } else {
            value
        }
    };
    (read("p"), read("q"))
}

/// Generation part of a dangling line from the injection at its boundary node.
pub fn generation(ctx: &mut Context, bag: &PropertyBag) -> DanglingLineGeneration {
    let id = bag.id(EQUIVALENT_INJECTION).unwrap_or_default();
    let (p, q) = injection(ctx, &id, bag);
    let regulation = regulation(ctx, &id, bag);
    DanglingLineGeneration {
        target_p: -p,
        target_q: -q,
        target_v: regulation.target_v,
        voltage_regulation_on: regulation.on,
        min_q: limit(bag, "minQ"),
        max_q: limit(bag, "maxQ"),
    }
}

#[derive(Debug, Clone)]
pub struct EquivalentInjectionConversion {
    equipment: Equipment,
    bag: PropertyBag,
}

impl EquivalentInjectionConversion {
    pub fn new(ctx: &Context, bag: &PropertyBag) -> Self {
        Self {
            equipment: Equipment::new(ctx, EQUIVALENT_INJECTION, bag),
            bag: bag.clone(),
        }
    }
}

impl EquipmentConversion for EquivalentInjectionConversion {
    fn equipment(&self) -> &Equipment {
        &self.equipment
    }

    fn valid(&self, ctx: &mut Context) -> bool {
        self.equipment.valid_terminals(ctx, 1)
    }

    fn convert(&self, ctx: &mut Context) -> GridResult<()> {
        let eq = &self.equipment;
        // Picked up by the dangling line at the boundary node
        if eq.terminals[0].at_boundary {
            return Ok(());
        }
        let (p, q) = injection(ctx, &eq.id, &self.bag);
        let regulation = regulation(ctx, &eq.id, &self.bag);
        ctx.network.add_generator(Generator {
            id: eq.id.clone(),
            name: eq.name.clone(),
            terminal: eq.terminal_ref(0),
            target_p: -p,
            target_q: -q,
            min_p: limit(&self.bag, "minP").unwrap_or(-f64::MAX),
            max_p: limit(&self.bag, "maxP").unwrap_or(f64::MAX),
            min_q: limit(&self.bag, "minQ"),
            max_q: limit(&self.bag, "maxQ"),
            target_v: regulation.target_v,
            voltage_regulator_on: regulation.on,
        })?;
        eq.map_terminals(ctx, &eq.id);
        Ok(())
    }
}
