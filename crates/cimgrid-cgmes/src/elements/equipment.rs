//! Conducting equipment: terminals and the boundary checks every branch-like
//! conversion shares.

use cimgrid_core::{GridResult, Line, PiModel, TerminalRef};

use crate::boundary::BoundaryLine;
use crate::context::Context;
use crate::property_bag::PropertyBag;
use crate::terminal::TerminalData;

/// Position of an equipment relative to the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryPosition {
    /// No terminal on a boundary node
    Outside,
    /// Exactly one terminal (index) on a boundary node
    Side(usize),
    /// Every terminal on boundary nodes
    Inside,
    /// Several, but not all, terminals on boundary nodes
    Multiple,
}

#[derive(Debug, Clone)]
pub struct Equipment {
    pub class: &'static str,
    pub id: String,
    pub name: String,
    pub graph: Option<String>,
    pub terminals: Vec<TerminalData>,
}

impl Equipment {
    /// Equipment whose terminals reference it as conducting equipment
    pub fn new(ctx: &Context, class: &'static str, bag: &PropertyBag) -> Self {
        let id = bag.id(class).unwrap_or_default();
        let terminals = ctx
            .model
            .terminals_of(&id)
            .iter()
            .filter_map(|t| t.id("Terminal"))
            .filter_map(|t| ctx.terminal(&t))
            .collect();
        Self::with_terminals(class, bag, id, terminals)
    }

    pub fn with_terminals(
        class: &'static str,
        bag: &PropertyBag,
        id: String,
        terminals: Vec<TerminalData>,
    ) -> Self {
        Self {
            class,
            name: bag.string("name").unwrap_or_else(|| id.clone()),
            graph: bag.string("graph"),
            id,
            terminals,
        }
    }

    /// Check terminal count and that every terminal off the boundary has a
    /// voltage level; reports the first problem found.
    pub fn valid_terminals(&self, ctx: &mut Context, expected: usize) -> bool {
        if self.terminals.len() != expected {
            ctx.invalid(
                self.class,
                &self.id,
                &format!("expected {} terminals, found {}", expected, self.terminals.len()),
            );
            return false;
        }
        if let Some(t) = self
            .terminals
            .iter()
            .find(|t| !t.at_boundary && t.voltage_level.is_none())
        {
            ctx.invalid(
                self.class,
                &self.id,
                &format!("terminal {} not on a node of a voltage level", t.id),
            );
            return false;
        }
        true
    }

    pub fn boundary_position(&self) -> BoundaryPosition {
        let at_boundary: Vec<usize> = self
            .terminals
            .iter()
            .enumerate()
            .filter(|(_, t)| t.at_boundary)
            .map(|(i, _)| i)
            .collect();
        match at_boundary.len() {
            0 => BoundaryPosition::Outside,
            n if n == self.terminals.len() => BoundaryPosition::Inside,
            1 => BoundaryPosition::Side(at_boundary[0]),
            _ => BoundaryPosition::Multiple,
        }
    }

    pub fn terminal_ref(&self, index: usize) -> TerminalRef {
        self.terminals
            .get(index)
            .map(TerminalData::terminal_ref)
            .unwrap_or_default()
    }

    /// Record that terminal `i` became side `i + 1` of `element`
    pub fn map_terminals(&self, ctx: &mut Context, element: &str) {
        for (i, t) in self.terminals.iter().enumerate() {
            ctx.terminal_mapping.add(&t.id, element, i + 1);
        }
    }

    /// Equipment with terminal `boundary` on a boundary node, oriented from
    /// the other terminal. `pi` runs from terminal 0 to terminal 1.
    pub fn boundary_line(&self, boundary: usize, pi: PiModel) -> BoundaryLine {
        let network = 1 - boundary;
        let boundary_terminal = self.terminals[boundary].clone();
        BoundaryLine {
            id: self.id.clone(),
            name: self.name.clone(),
            class: self.class,
            terminal: self.terminals[network].clone(),
            boundary_node: boundary_terminal.node.clone().unwrap_or_default(),
            boundary_terminal,
            pi: if boundary == 0 { pi.reversed() } else { pi },
            graph: self.graph.clone(),
        }
    }

    /// Handle a two-terminal equipment touching the boundary.
    ///
    /// Returns `true` when nothing is left to convert: the equipment was
    /// parked at its boundary node, or lies inside the boundary and only
    /// contributes its measured flows there.
    pub fn convert_at_boundary(&self, ctx: &mut Context, pi: PiModel) -> bool {
        match self.boundary_position() {
            BoundaryPosition::Outside => false,
            BoundaryPosition::Side(side) => {
                ctx.boundary.add_line_at_node(self.boundary_line(side, pi));
                true
            }
            BoundaryPosition::Inside | BoundaryPosition::Multiple => {
                // Not converted. Its measured flows are what the boundary node
                // exchanges, and the only source of the consumption the
                // dangling lines at that node see later.
                for t in &self.terminals {
                    if let (Some(node), Some(flow), true) = (&t.node, t.flow, t.connected) {
                        ctx.boundary.add_power_flow_at_node(node, flow);
                    }
                }
                ctx.ignored(self.class, &self.id, "inside boundary");
                true
            }
        }
    }

    /// Emit a two-terminal branch as a line, or park it at the boundary.
    pub fn convert_branch(&self, ctx: &mut Context, pi: PiModel) -> GridResult<()> {
        if self.convert_at_boundary(ctx, pi) {
            return Ok(());
        }
        ctx.network.add_line(Line {
            id: self.id.clone(),
            name: self.name.clone(),
            terminal1: self.terminal_ref(0),
            terminal2: self.terminal_ref(1),
            r: pi.r,
            x: pi.x,
            g1: pi.g1,
            b1: pi.b1,
            g2: pi.g2,
            b2: pi.b2,
        })?;
        self.map_terminals(ctx, &self.id);
        Ok(())
    }
}
