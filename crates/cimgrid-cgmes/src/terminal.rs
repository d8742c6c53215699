//! Per-terminal data resolved from the model, and the mapping from CGMES
//! terminals to the converted elements.

use std::collections::HashMap;

use cimgrid_core::TerminalRef;

use crate::model::CgmesModel;
use crate::sv::PowerFlow;

/// Everything the conversions need to know about one terminal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TerminalData {
    pub id: String,
    pub node: Option<String>,
    /// Voltage level of the node; `None` for boundary nodes
    pub voltage_level: Option<String>,
    pub connected: bool,
    /// Measured flow into the equipment
    pub flow: Option<PowerFlow>,
    pub at_boundary: bool,
}

impl TerminalData {
    pub fn from_model(model: &CgmesModel, id: &str) -> Option<Self> {
        let bag = model.terminal(id)?;
        let node = bag.id("TopologicalNode");
        let node_bag = node.as_deref().and_then(|n| model.node(n));
        let at_boundary = node
            .as_deref()
            .map(|n| model.is_boundary_node(n))
            .unwrap_or(false);
        let voltage_level = if at_boundary {
            None
        } else {
            node_bag.and_then(|n| n.id("VoltageLevel"))
        };
        let flow = Some(PowerFlow::new(bag.as_f64("p"), bag.as_f64("q")))
            .filter(PowerFlow::defined);
        Some(Self {
            id: id.to_string(),
            node,
            voltage_level,
            connected: bag.as_bool_or("connected", true),
            flow,
            at_boundary,
        })
    }

    /// Attachment in the converted network: the node's bus, open when disconnected.
    pub fn terminal_ref(&self) -> TerminalRef {
        TerminalRef {
            voltage_level: self.voltage_level.clone().unwrap_or_default(),
            bus: if self.connected { self.node.clone() } else { None },
            connectable_bus: self.node.clone(),
            p: self.flow.map(|f| f.p),
            q: self.flow.map(|f| f.q),
        }
    }
}

/// What a CGMES terminal became after conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappedTerminal {
    /// A side of a converted element
    Element { element: String, side: usize },
    /// The boundary side of a dangling line (or tie line half)
    DanglingLineBoundary { dangling_line: String },
}

#[derive(Debug, Default)]
pub struct TerminalMapping {
    terminals: HashMap<String, MappedTerminal>,
}

impl TerminalMapping {
    pub fn add(&mut self, terminal: &str, element: &str, side: usize) {
        self.terminals.insert(
            terminal.to_string(),
            MappedTerminal::Element {
                element: element.to_string(),
                side,
            },
        );
    }

    pub fn add_boundary(&mut self, terminal: &str, dangling_line: &str) {
        self.terminals.insert(
            terminal.to_string(),
            MappedTerminal::DanglingLineBoundary {
                dangling_line: dangling_line.to_string(),
            },
        );
    }

    pub fn find(&self, terminal: &str) -> Option<&MappedTerminal> {
        self.terminals.get(terminal)
    }

    pub fn len(&self) -> usize {
        self.terminals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terminals.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn model() -> CgmesModel {
        CgmesModel::from_json_str(
            &json!({
                "nodes": [
                    {"TopologicalNode": "N1", "VoltageLevel": "VL1"},
                    {"TopologicalNode": "BN", "boundary": true},
                ],
                "terminals": [
                    {"Terminal": "T1", "ConductingEquipment": "L1", "TopologicalNode": "N1", "p": 10.0, "q": 2.0},
                    {"Terminal": "T2", "ConductingEquipment": "L1", "TopologicalNode": "BN", "connected": false},
                    {"Terminal": "T3", "ConductingEquipment": "L2"},
                ],
            })
            .to_string(),
        )
        .unwrap()
    }

    #[test]
    fn test_terminal_data() {
        let m = model();
        let t1 = TerminalData::from_model(&m, "T1").unwrap();
        assert_eq!(t1.voltage_level.as_deref(), Some("VL1"));
        assert!(t1.connected);
        assert!(!t1.at_boundary);
        assert_eq!(t1.flow, Some(PowerFlow::new(10.0, 2.0)));

        let t2 = TerminalData::from_model(&m, "T2").unwrap();
        assert!(t2.at_boundary);
        assert!(!t2.connected);
        assert!(t2.voltage_level.is_none());
        assert!(t2.flow.is_none());

        let t3 = TerminalData::from_model(&m, "T3").unwrap();
        assert!(!t3.at_boundary);
        assert!(t3.node.is_none() && t3.voltage_level.is_none());
        assert!(TerminalData::from_model(&m, "T9").is_none());
    }

    #[test]
    fn test_terminal_ref() {
        let m = model();
        let r = TerminalData::from_model(&m, "T1").unwrap().terminal_ref();
        assert_eq!(r.bus.as_deref(), Some("N1"));
        assert_eq!(r.p, Some(10.0));

        let mut t = TerminalData::from_model(&m, "T1").unwrap();
        t.connected = false;
        let r = t.terminal_ref();
        assert!(r.bus.is_none());
        assert_eq!(r.connectable_bus.as_deref(), Some("N1"));
    }

    #[test]
    fn test_mapping() {
        let mut mapping = TerminalMapping::default();
        mapping.add("T1", "L1", 1);
        mapping.add_boundary("T2", "L1");
        assert_eq!(mapping.len(), 2);
        assert_eq!(
            mapping.find("T1"),
            Some(&MappedTerminal::Element {
                element: "L1".to_string(),
                side: 1
            })
        );
        assert!(matches!(
            mapping.find("T2"),
            Some(MappedTerminal::DanglingLineBoundary { .. })
        ));
        assert!(mapping.find("T3").is_none());
    }
}
