//! Boundary nodes and the equipment waiting at them.
//!
//! Equipment with one terminal on a boundary node is not converted right
//! away: it is parked here as a [`BoundaryLine`] until all equipment has been
//! seen, then turned into a dangling line, a tie line or a merged line
//! depending on how many equipment share the node.

use std::collections::{BTreeMap, HashMap};

use cimgrid_core::PiModel;

use crate::model::CgmesModel;
use crate::sv::PowerFlow;
use crate::terminal::TerminalData;

/// Equipment crossing the boundary, oriented from its network side.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryLine {
    pub id: String,
    pub name: String,
    pub class: &'static str,
    /// Terminal on the network side
    pub terminal: TerminalData,
    /// Terminal on the boundary node
    pub boundary_terminal: TerminalData,
    /// Electrical model, end 1 at the network side
    pub pi: PiModel,
    pub boundary_node: String,
    pub graph: Option<String>,
}

impl BoundaryLine {
    pub fn connected(&self) -> bool {
        self.terminal.connected && self.boundary_terminal.connected
    }

    pub fn voltage_level(&self) -> &str {
        self.terminal.voltage_level.as_deref().unwrap_or_default()
    }

    pub fn is_ac_line_segment(&self) -> bool {
        self.class == "ACLineSegment"
    }
}

#[derive(Debug, Clone, PartialEq)]
struct BoundaryNode {
    name: String,
    v: f64,
    angle: f64,
}

#[derive(Debug, Default)]
pub struct Boundary {
    nodes: HashMap<String, BoundaryNode>,
    flows: HashMap<String, PowerFlow>,
    lines: BTreeMap<String, Vec<BoundaryLine>>,
}

impl Boundary {
    pub fn from_model(model: &CgmesModel) -> Self {
        let nodes = model
            .nodes()
            .iter()
            .filter(|n| n.as_bool_or("boundary", false))
            .filter_map(|n| {
                let id = n.id("TopologicalNode")?;
                let node = BoundaryNode {
                    name: n.string("name").unwrap_or_else(|| id.clone()),
                    v: n.as_f64("v"),
                    angle: n.as_f64("angle"),
                };
                Some((id, node))
            })
            .collect();
        Self {
            nodes,
            ..Self::default()
        }
    }

    pub fn contains_node(&self, node: &str) -> bool {
        self.nodes.contains_key(node)
    }

    /// Name of the boundary node, used as pairing key
    pub fn name_at_boundary(&self, node: &str) -> String {
        self.nodes
            .get(node)
            .map(|n| n.name.clone())
            .unwrap_or_else(|| node.to_string())
    }

    /// Voltage magnitude at the node, when a valid one is known
    pub fn v_at_boundary(&self, node: &str) -> Option<f64> {
        self.nodes
            .get(node)
            .map(|n| n.v)
            .filter(|v| v.is_finite() && *v > 0.0)
    }

    pub fn angle_at_boundary(&self, node: &str) -> Option<f64> {
        self.nodes
            .get(node)
            .map(|n| n.angle)
            .filter(|a| a.is_finite())
    }

    /// Accumulate flow measured at the node by equipment inside the boundary
    pub fn add_power_flow_at_node(&mut self, node: &str, flow: PowerFlow) {
        let total = self.flows.entry(node.to_string()).or_default();
        *total = *total + flow;
    }

    pub fn has_power_flow(&self, node: &str) -> bool {
        self.flows.contains_key(node)
    }

    pub fn power_flow_at_node(&self, node: &str) -> Option<PowerFlow> {
        self.flows.get(node).copied()
    }

    pub fn add_line_at_node(&mut self, line: BoundaryLine) {
        self.lines
            .entry(line.boundary_node.clone())
            .or_default()
            .push(line);
    }

    /// Hand over all parked equipment, grouped by boundary node in id order
    pub fn take_lines(&mut self) -> BTreeMap<String, Vec<BoundaryLine>> {
        std::mem::take(&mut self.lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn boundary() -> Boundary {
        let model = CgmesModel::from_json_str(
            &json!({
                "nodes": [
                    {"TopologicalNode": "BN1", "name": "XNODE1", "boundary": true, "v": 400.0, "angle": -2.0},
                    {"TopologicalNode": "BN2", "boundary": true, "v": 0.0},
                    {"TopologicalNode": "N1", "VoltageLevel": "VL1"},
                ]
            })
            .to_string(),
        )
        .unwrap();
        Boundary::from_model(&model)
    }

    #[test]
    fn test_boundary_nodes() {
        let b = boundary();
        assert!(b.contains_node("BN1"));
        assert!(!b.contains_node("N1"));
        assert_eq!(b.name_at_boundary("BN1"), "XNODE1");
        assert_eq!(b.name_at_boundary("BN2"), "BN2");
        assert_eq!(b.v_at_boundary("BN1"), Some(400.0));
        assert_eq!(b.angle_at_boundary("BN1"), Some(-2.0));
        assert_eq!(b.v_at_boundary("BN2"), None);
        assert_eq!(b.angle_at_boundary("BN2"), None);
    }

    #[test]
    fn test_power_flow_accumulates() {
        let mut b = boundary();
        assert!(!b.has_power_flow("BN1"));
        b.add_power_flow_at_node("BN1", PowerFlow::new(10.0, 1.0));
        b.add_power_flow_at_node("BN1", PowerFlow::new(5.0, -3.0));
        assert!(b.has_power_flow("BN1"));
        assert_eq!(b.power_flow_at_node("BN1"), Some(PowerFlow::new(15.0, -2.0)));
    }

    #[test]
    fn test_lines_grouped_by_node() {
        let mut b = boundary();
        for (id, node) in [("L2", "BN2"), ("L1", "BN1"), ("L3", "BN1")] {
            b.add_line_at_node(BoundaryLine {
                id: id.to_string(),
                name: id.to_string(),
                class: "ACLineSegment",
                terminal: TerminalData::default(),
                boundary_terminal: TerminalData::default(),
                pi: PiModel::default(),
                boundary_node: node.to_string(),
                graph: None,
            });
        }
        let lines = b.take_lines();
        let nodes: Vec<_> = lines.keys().cloned().collect();
        assert_eq!(nodes, vec!["BN1", "BN2"]);
        assert_eq!(lines["BN1"].len(), 2);
        assert!(lines["BN1"][0].is_ac_line_segment());
        assert!(b.take_lines().is_empty());
    }
}
