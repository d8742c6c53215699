//! Equipment parked at boundary nodes.
//!
//! Once every equipment has been seen, each boundary node is resolved on its
//! own:
//!
//! - one equipment becomes a dangling line whose boundary side consumes the
//!   flow measured at the node;
//! - two equipment are joined, either as a tie line or as one line
//!   equivalent to both in series;
//! - with more, disconnected line segments are set aside so that two can be
//!   joined, or every equipment becomes a dangling line sharing the node flow.

use cimgrid_core::{
    DanglingLine, DanglingLineGeneration, GridResult, Line, PiModel, Quadripole, TieLine,
    TieLineHalf,
};
use tracing::{debug, info};

use crate::boundary::BoundaryLine;
use crate::config::BoundaryMerge;
use crate::context::Context;
use crate::elements::equivalent_injection;
use crate::sv::{PowerFlow, StateVariables};

const TOPOLOGICAL_NODE: &str = "TopologicalNode";

pub fn convert_boundary_nodes(ctx: &mut Context) -> GridResult<()> {
    let nodes = ctx.boundary.take_lines();
    info!(nodes = nodes.len(), "converting boundary nodes");
    for (node, lines) in nodes {
        debug!(node = %node, equipment = lines.len(), "boundary node");
        match lines.as_slice() {
            [] => {}
            [line] => dangling_line(ctx, line, None)?,
            [a, b] => join(ctx, a, b)?,
            _ => several(ctx, &node, lines)?,
        }
    }
    Ok(())
}

fn join(ctx: &mut Context, a: &BoundaryLine, b: &BoundaryLine) -> GridResult<()> {
    match ctx.config().boundary.merge {
        BoundaryMerge::Cascade => merged_line(ctx, a, b),
        BoundaryMerge::TieLine => tie_line(ctx, a, b),
    }
}

/// Flow consumed at the boundary side: what equipment inside the boundary
/// draws from the node.
fn boundary_flow(ctx: &mut Context, line: &BoundaryLine, has_injection: bool) -> PowerFlow {
    if !line.boundary_terminal.connected {
        return PowerFlow::ZERO;
    }
    match ctx.boundary.power_flow_at_node(&line.boundary_node) {
        Some(flow) => flow,
        None => {
            if !has_injection {
                ctx.missing(line.class, &line.id, "power flow at boundary node", "0");
            }
            PowerFlow::ZERO
        }
    }
}

/// Generation behind the boundary node, from its equivalent injection.
fn generation(ctx: &mut Context, line: &BoundaryLine) -> Option<DanglingLineGeneration> {
    let model = ctx.model;
    let candidates = model.equivalent_injections_at_node(&line.boundary_node);
    let selected = match candidates.as_slice() {
        [] => None,
        [single] => Some(*single),
        several => {
            let same_graph: Vec<_> = several
                .iter()
                .filter(|ei| line.graph.is_some() && ei.string("graph") == line.graph)
                .collect();
            if let [single] = same_graph.as_slice() {
                Some(**single)
            } else {
                ctx.invalid(
                    line.class,
                    &line.id,
                    &format!(
                        "{} equivalent injections at boundary node {}, none selected",
                        several.len(),
                        line.boundary_node
                    ),
                );
                None
            }
        }
    };
    selected.map(|bag| equivalent_injection::generation(ctx, bag))
}

/// Flow entering the dangling line at its network side, solved from the
/// boundary flow when the terminal has no measurement.
fn network_side_flow(
    ctx: &Context,
    line: &BoundaryLine,
    consumption: PowerFlow,
    generation: Option<&DanglingLineGeneration>,
) -> Option<PowerFlow> {
    if !line.terminal.connected || line.terminal.flow.is_some() || !ctx.config().boundary.compute_flows {
        return None;
    }
    let v = ctx.boundary.v_at_boundary(&line.boundary_node)?;
    let angle = ctx.boundary.angle_at_boundary(&line.boundary_node)?;
    let generated = generation
        .map(|g| PowerFlow::new(g.target_p, g.target_q))
        .unwrap_or_default();
    let net = consumption - generated;
    let pi = line.pi;
    let (g, b) = (pi.g1 + pi.g2, pi.b1 + pi.b2);
    if pi.r == 0.0 && pi.x == 0.0 {
        // Both ends share the boundary voltage; the shunt draws v²·(g - jb)
        let v2 = v * v;
        return Some(net + PowerFlow::new(v2 * g, -v2 * b));
    }
    let network = StateVariables::new(-net.p, -net.q, v, angle)
        .other_side(pi.r, pi.x, g / 2.0, b / 2.0, g / 2.0, b / 2.0, 1.0, 0.0);
    Some(network.flow())
}

/// Convert one equipment to a dangling line; `consumption` overrides the
/// flow read at the boundary node.
fn dangling_line(
    ctx: &mut Context,
    line: &BoundaryLine,
    consumption: Option<PowerFlow>,
) -> GridResult<()> {
    let generation = generation(ctx, line);
    let consumption = match consumption {
        Some(flow) => flow,
        None => boundary_flow(ctx, line, generation.is_some()),
    };

    let mut terminal = line.terminal.terminal_ref();
    if let Some(flow) = network_side_flow(ctx, line, consumption, generation.as_ref()) {
        terminal = terminal.with_flow(flow.p, flow.q);
    }
    if !line.boundary_terminal.connected
        && terminal.connected()
        && ctx.config().boundary.disconnect_if_boundary_open
    {
        terminal.disconnect();
        ctx.fixed(
            line.class,
            &line.id,
            "boundary side open",
            "network side connected",
            "network side disconnected",
        );
    }

    let pi = line.pi;
    ctx.network.add_dangling_line(DanglingLine {
        id: line.id.clone(),
        name: line.name.clone(),
        terminal,
        r: pi.r,
        x: pi.x,
        g: pi.g1 + pi.g2,
        b: pi.b1 + pi.b2,
        p0: consumption.p,
        q0: consumption.q,
        pairing_key: ctx.boundary.name_at_boundary(&line.boundary_node),
        boundary_node: line.boundary_node.clone(),
        generation,
    })?;
    ctx.terminal_mapping.add(&line.terminal.id, &line.id, 1);
    ctx.terminal_mapping
        .add_boundary(&line.boundary_terminal.id, &line.id);
    Ok(())
}

fn half(line: &BoundaryLine) -> TieLineHalf {
    TieLineHalf {
        id: line.id.clone(),
        name: line.name.clone(),
        terminal: line.terminal.terminal_ref(),
        r: line.pi.r,
        x: line.pi.x,
        g1: line.pi.g1,
        b1: line.pi.b1,
        g2: line.pi.g2,
        b2: line.pi.b2,
    }
}

fn tie_line(ctx: &mut Context, a: &BoundaryLine, b: &BoundaryLine) -> GridResult<()> {
    let (h1, h2) = if a.id <= b.id { (a, b) } else { (b, a) };
    if h1.voltage_level() == h2.voltage_level() {
        ctx.ignored(
            TOPOLOGICAL_NODE,
            &h1.boundary_node,
            &format!(
                "{} and {} in the same voltage level, kept as dangling lines",
                h1.id, h2.id
            ),
        );
        dangling_line(ctx, h1, None)?;
        return dangling_line(ctx, h2, None);
    }
    let id = format!("{} + {}", h1.id, h2.id);
    if !ctx.claim(h1.class, &id) {
        dangling_line(ctx, h1, None)?;
        return dangling_line(ctx, h2, None);
    }
    ctx.network.add_tie_line(TieLine {
        id: id.clone(),
        name: format!("{} + {}", h1.name, h2.name),
        pairing_key: ctx.boundary.name_at_boundary(&h1.boundary_node),
        half1: half(h1),
        half2: half(h2),
        xnode_p: 0.0,
        xnode_q: 0.0,
    })?;
    for (side, h) in [(1, h1), (2, h2)] {
        ctx.terminal_mapping.add(&h.terminal.id, &id, side);
        ctx.terminal_mapping
            .add_boundary(&h.boundary_terminal.id, &h.id);
    }
    Ok(())
}

fn merged_line(ctx: &mut Context, a: &BoundaryLine, b: &BoundaryLine) -> GridResult<()> {
    let id = format!("{} + {}", a.id, b.id);
    if !ctx.claim(a.class, &id) {
        dangling_line(ctx, a, None)?;
        return dangling_line(ctx, b, None);
    }
    // Both are oriented towards the boundary node; the second runs back out
    let pi = Quadripole::from_pi(&a.pi)
        .cascade(&Quadripole::from_pi(&b.pi.reversed()))
        .to_pi_model()
        .unwrap_or_else(|| {
            ctx.fixed(
                TOPOLOGICAL_NODE,
                &a.boundary_node,
                &format!("{} has zero series impedance", id),
                "cascaded model",
                "shunts only",
            );
            PiModel {
                g1: a.pi.g1 + a.pi.g2,
                b1: a.pi.b1 + a.pi.b2,
                g2: b.pi.g1 + b.pi.g2,
                b2: b.pi.b1 + b.pi.b2,
                ..PiModel::default()
            }
        });
    ctx.network.add_line(Line {
        id: id.clone(),
        name: format!("{} + {}", a.name, b.name),
        terminal1: a.terminal.terminal_ref(),
        terminal2: b.terminal.terminal_ref(),
        r: pi.r,
        x: pi.x,
        g1: pi.g1,
        b1: pi.b1,
        g2: pi.g2,
        b2: pi.b2,
    })?;
    ctx.terminal_mapping.add(&a.terminal.id, &id, 1);
    ctx.terminal_mapping.add(&b.terminal.id, &id, 2);
    Ok(())
}

/// More than two equipment at one boundary node.
fn several(ctx: &mut Context, node: &str, lines: Vec<BoundaryLine>) -> GridResult<()> {
    let (set_aside, remaining): (Vec<_>, Vec<_>) = lines
        .iter()
        .partition(|l| l.is_ac_line_segment() && !l.connected());
    if let [a, b] = remaining.as_slice() {
        for line in set_aside {
            ctx.fixed(
                line.class,
                &line.id,
                "disconnected line at shared boundary node",
                "boundary flow",
                "no flow",
            );
            dangling_line(ctx, line, Some(PowerFlow::ZERO))?;
        }
        return join(ctx, a, b);
    }

    let connected = lines.iter().filter(|l| l.connected()).count();
    let total = ctx.boundary.power_flow_at_node(node).unwrap_or_default();
    let share = if connected > 0 {
        total * (1.0 / connected as f64)
    } else {
        PowerFlow::ZERO
    };
    for line in &lines {
        let flow = if line.connected() { share } else { PowerFlow::ZERO };
        ctx.fixed(
            line.class,
            &line.id,
            &format!("{} equipment at boundary node {}", lines.len(), node),
            "boundary flow",
            &format!("p0 = {}, q0 = {}", flow.p, flow.q),
        );
        dangling_line(ctx, line, Some(flow))?;
    }
    Ok(())
}
