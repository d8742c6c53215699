//! Conversion run: every phase over one model, in order.

use cimgrid_core::{Bus, ConversionReport, GridResult, Network, VoltageLevel};
use tracing::info;

use crate::config::Config;
use crate::context::Context;
use crate::elements::boundary_node::convert_boundary_nodes;
use crate::elements::control_area::convert_control_areas;
use crate::elements::regulating_control::convert_regulating_controls;
use crate::elements::sv_injection::convert_sv_injections;
use crate::elements::Conversion;
use crate::model::CgmesModel;
use crate::property_bag::PropertyBag;

const VOLTAGE_LEVEL: &str = "VoltageLevel";
const TOPOLOGICAL_NODE: &str = "TopologicalNode";

/// Convert a model into a network.
///
/// Data problems, identifiers shared between classes included, are reported
/// in the returned [`ConversionReport`]. An error means an element reached the
/// network without passing through [`Context::claim`].
pub fn convert(model: &CgmesModel, config: &Config) -> GridResult<(Network, ConversionReport)> {
    let mut ctx = Context::new(model, config);

    convert_voltage_levels(&mut ctx)?;
    convert_nodes(&mut ctx)?;
    info!(
        voltage_levels = ctx.network.voltage_levels.len(),
        buses = ctx.network.buses.len(),
        "topology converted"
    );

    let conversions = Conversion::from_model(&mut ctx);
    info!(equipment = conversions.len(), "converting equipment");
    for conversion in &conversions {
        conversion.run(&mut ctx)?;
    }
    report_orphan_tap_changers(&mut ctx);

    convert_regulating_controls(&mut ctx);
    convert_boundary_nodes(&mut ctx)?;
    convert_sv_injections(&mut ctx);
    convert_control_areas(&mut ctx);

    let (network, report) = ctx.finish();
    info!("{}", report.summary());
    Ok((network, report))
}

fn convert_voltage_levels(ctx: &mut Context) -> GridResult<()> {
    let model = ctx.model;
    for bag in model.voltage_levels() {
        let id = bag.id(VOLTAGE_LEVEL).unwrap_or_default();
        let nominal_v = bag.as_f64("nominalV");
        if nominal_v.is_nan() || nominal_v <= 0.0 {
            ctx.invalid(VOLTAGE_LEVEL, &id, "nominalV undefined or not positive");
            continue;
        }
        if !ctx.claim(VOLTAGE_LEVEL, &id) {
            continue;
        }
        ctx.network.add_voltage_level(VoltageLevel {
            name: bag.string("name").unwrap_or_else(|| id.clone()),
            nominal_v,
            substation: bag.id("Substation"),
            region: bag.id("Region"),
            id,
        })?;
    }
    Ok(())
}

/// Buses from the nodes inside the network, with their solved voltage.
fn convert_nodes(ctx: &mut Context) -> GridResult<()> {
    let model = ctx.model;
    for bag in model.nodes() {
        if bag.as_bool_or("boundary", false) {
            continue;
        }
        let id = bag.id(TOPOLOGICAL_NODE).unwrap_or_default();
        let Some(voltage_level) = bag.id(VOLTAGE_LEVEL) else {
            ctx.invalid(TOPOLOGICAL_NODE, &id, "no voltage level");
            continue;
        };
        if ctx.network.voltage_level(&voltage_level).is_none() {
            ctx.invalid(
                TOPOLOGICAL_NODE,
                &id,
                &format!("voltage level {} not converted", voltage_level),
            );
            continue;
        }
        if !ctx.claim(TOPOLOGICAL_NODE, &id) {
            continue;
        }
        ctx.network.add_bus(Bus {
            name: bag.string("name").unwrap_or_else(|| id.clone()),
            voltage_level,
            v: defined(bag, "v").filter(|v| *v > 0.0),
            angle: defined(bag, "angle"),
            id,
        })?;
    }
    Ok(())
}

fn defined(bag: &PropertyBag, key: &str) -> Option<f64> {
    Some(bag.as_f64(key)).filter(|v| v.is_finite())
}

/// Tap changers whose end belongs to no transformer are never reached by the
/// transformer conversions.
fn report_orphan_tap_changers(ctx: &mut Context) {
    let model = ctx.model;
    for (class, tap_changers) in [
        ("RatioTapChanger", model.ratio_tap_changers()),
        ("PhaseTapChanger", model.phase_tap_changers()),
    ] {
        for bag in tap_changers {
            let end = bag.id("TransformerEnd").unwrap_or_default();
            if model.transformer_of_end(&end).is_none() {
                let id = bag.id(class).unwrap_or_default();
                ctx.ignored(class, &id, &format!("transformer end {} not found", end));
            }
        }
    }
}
