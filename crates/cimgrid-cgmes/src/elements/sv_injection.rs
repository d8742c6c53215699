use cimgrid_core::{Load, TerminalRef};
use tracing::info;

use crate::context::Context;
use crate::property_bag::PropertyBag;

pub const SV_INJECTION: &str = "SvInjection";

/// Mismatch injections of the state variables, kept as fictitious loads so
/// the converted network reproduces the solved state.
pub fn convert_sv_injections(ctx: &mut Context) {
    if !ctx.config().convert_sv_injections {
        return;
    }
    let model = ctx.model;
    let before = ctx.network.loads.len();
    for bag in model.sv_injections() {
        convert(ctx, bag);
    }
    info!(loads = ctx.network.loads.len() - before, "SV injections converted");
}

fn convert(ctx: &mut Context, bag: &PropertyBag) {
    let id = bag.id(SV_INJECTION).unwrap_or_default();
    let Some(node) = bag.id("TopologicalNode") else {
        ctx.invalid(SV_INJECTION, &id, "no topological node");
        return;
    };
    let Some(voltage_level) = ctx.network.bus(&node).map(|b| b.voltage_level.clone()) else {
        ctx.invalid(SV_INJECTION, &id, &format!("node {} is not a converted bus", node));
        return;
    };
    let p0 = bag.as_f64("pInjection");
    if p0.is_nan() {
        ctx.invalid(SV_INJECTION, &id, "pInjection undefined");
        return;
    }
    let mut q0 = bag.as_f64("qInjection");
    if q0.is_nan() {
        ctx.missing(SV_INJECTION, &id, "qInjection", "0");
        q0 = 0.0;
    }
    let load = Load {
        id: id.clone(),
        name: bag.string("name").unwrap_or_else(|| id.clone()),
        terminal: TerminalRef {
            voltage_level,
            bus: Some(node.clone()),
            connectable_bus: Some(node),
            ..TerminalRef::default()
        },
        p0,
        q0,
        fictitious: true,
    };
    if !ctx.claim(SV_INJECTION, &id) {
        return;
    }
    if let Err(e) = ctx.network.add_load(load) {
        ctx.invalid(SV_INJECTION, &id, &e.to_string());
    }
}
