use cimgrid_core::{AreaBoundary, ControlArea};
use tracing::info;

use crate::context::Context;
use crate::property_bag::PropertyBag;
use crate::terminal::MappedTerminal;

pub const CONTROL_AREA: &str = "ControlArea";

/// Control areas with the converted terminals their tie flows go through.
///
/// Runs last: tie flows may reference any converted terminal, including the
/// boundary side of dangling lines.
pub fn convert_control_areas(ctx: &mut Context) {
    if !ctx.config().convert_control_areas {
        return;
    }
    let model = ctx.model;
    for bag in model.control_areas() {
        convert(ctx, bag);
    }
    info!(areas = ctx.network.control_areas.len(), "control areas converted");
}

fn convert(ctx: &mut Context, bag: &PropertyBag) {
    let id = bag.id(CONTROL_AREA).unwrap_or_default();
    let mut net_interchange = bag.as_f64("netInterchange");
    if net_interchange.is_nan() {
        ctx.missing(CONTROL_AREA, &id, "netInterchange", "0");
        net_interchange = 0.0;
    }

    let model = ctx.model;
    let mut boundaries = Vec::new();
    for tie_flow in model.tie_flows_of(&id) {
        let Some(terminal) = tie_flow.id("Terminal") else {
            ctx.missing(CONTROL_AREA, &id, "terminal of tie flow", "tie flow skipped");
            continue;
        };
        match ctx.terminal_mapping.find(&terminal).cloned() {
            Some(MappedTerminal::Element { .. }) => {
                boundaries.push(AreaBoundary::Terminal { terminal });
            }
            Some(MappedTerminal::DanglingLineBoundary { dangling_line }) => {
                boundaries.push(AreaBoundary::DanglingLine { dangling_line });
            }
            None => ctx.missing(
                CONTROL_AREA,
                &id,
                &format!("converted tie flow terminal {}", terminal),
                "tie flow skipped",
            ),
        }
    }

    let area = ControlArea {
        name: bag.string("name").unwrap_or_else(|| id.clone()),
        energy_ident_code: bag.string("energyIdentCode"),
        net_interchange,
        p_tolerance: Some(bag.as_f64("pTolerance")).filter(|v| !v.is_nan()),
        boundaries,
        id: id.clone(),
    };
    if !ctx.claim(CONTROL_AREA, &id) {
        return;
    }
    if let Err(e) = ctx.network.add_control_area(area) {
        ctx.invalid(CONTROL_AREA, &id, &e.to_string());
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
    fn test_control_area_tie_flows() {
        let m = CgmesModel::from_json_str(
            &json!({
                "control_areas": [
                    {"ControlArea": "CA", "name": "Area A", "netInterchange": -120.0, "energyIdentCode": "10YA"},
                ],
                "tie_flows": [
                    {"TieFlow": "TF1", "ControlArea": "CA", "Terminal": "T1"},
                    {"TieFlow": "TF2", "ControlArea": "CA", "Terminal": "TB"},
                    {"TieFlow": "TF3", "ControlArea": "CA", "Terminal": "T9"},
                ],
            })
            .to_string(),
        )
        .unwrap();
        let config = Config::default();
        let mut ctx = Context::new(&m, &config);
        ctx.terminal_mapping.add("T1", "L1", 1);
        ctx.terminal_mapping.add_boundary("TB", "DL1");
        convert_control_areas(&mut ctx);

        let area = ctx.network.control_area("CA").unwrap();
        assert_eq!(area.name, "Area A");
        assert_eq!(area.net_interchange, -120.0);
        assert_eq!(area.energy_ident_code.as_deref(), Some("10YA"));
        assert!(area.p_tolerance.is_none());
        assert_eq!(
            area.boundaries,
            vec![
                AreaBoundary::Terminal {
                    terminal: "T1".to_string()
                },
                AreaBoundary::DanglingLine {
                    dangling_line: "DL1".to_string()
                },
            ]
        );
        assert_eq!(ctx.diagnostics.count(Severity::Missing), 1);
    }
}
