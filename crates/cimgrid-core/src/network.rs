//! Target grid model.
//!
//! The conversion engine only ever writes into a [`Network`]; the one thing
//! it reads back is where previously converted terminals ended up, which is
//! resolved through identifiers rather than by inspecting these structs.
//! Electrical values follow the conventions of bus-branch models: the ideal
//! ratio `rho` of a transformer sits at side 1 and its shunt admittance is
//! lumped there too.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{GridError, GridResult};

fn is_zero(value: &i32) -> bool {
    *value == 0
}

/// Where one end of an element is attached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TerminalRef {
    pub voltage_level: String,
    /// Bus the end is connected to; `None` when the end is open
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bus: Option<String>,
    /// Bus the end would connect to when closed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connectable_bus: Option<String>,
    /// Active power flowing into the element at this end (MW)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p: Option<f64>,
    /// Reactive power flowing into the element at this end (MVar)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<f64>,
}

impl TerminalRef {
    pub fn connected(&self) -> bool {
        self.bus.is_some()
    }

    pub fn with_flow(mut self, p: f64, q: f64) -> Self {
        self.p = Some(p);
        self.q = Some(q);
        self
    }

    /// Open the end while keeping the bus it could be connected to.
    pub fn disconnect(&mut self) {
        if let Some(bus) = self.bus.take() {
            self.connectable_bus = Some(bus);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoltageLevel {
    pub id: String,
    pub name: String,
    /// Nominal voltage (kV)
    pub nominal_v: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub substation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bus {
    pub id: String,
    pub name: String,
    pub voltage_level: String,
    /// Voltage magnitude (kV) from the state variables, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub v: Option<f64>,
    /// Voltage angle (degrees)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub id: String,
    pub name: String,
    pub terminal1: TerminalRef,
    pub terminal2: TerminalRef,
    pub r: f64,
    pub x: f64,
    pub g1: f64,
    pub b1: f64,
    pub g2: f64,
    pub b2: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchKind {
    #[default]
    Breaker,
    Disconnector,
    LoadBreakSwitch,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Switch {
    pub id: String,
    pub name: String,
    pub kind: SwitchKind,
    pub voltage_level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bus1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bus2: Option<String>,
    pub open: bool,
    pub retained: bool,
}

/// One position of a ratio tap changer; deviations in percent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RatioTapStep {
    pub rho: f64,
    pub r: f64,
    pub x: f64,
    pub g: f64,
    pub b: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RatioTapChanger {
    pub low_tap_position: i32,
    pub tap_position: i32,
    pub steps: Vec<RatioTapStep>,
    pub load_tap_changing: bool,
    pub regulating: bool,
    /// Target voltage (kV)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_v: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_deadband: Option<f64>,
    /// Terminal (CGMES id) whose voltage is regulated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regulation_terminal: Option<String>,
}

/// One position of a phase tap changer; `alpha` in degrees, deviations in percent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseTapStep {
    pub alpha: f64,
    pub rho: f64,
    pub r: f64,
    pub x: f64,
    pub g: f64,
    pub b: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseRegulationMode {
    #[default]
    FixedTap,
    CurrentLimiter,
    ActivePowerControl,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseTapChanger {
    pub low_tap_position: i32,
    pub tap_position: i32,
    pub steps: Vec<PhaseTapStep>,
    pub regulation_mode: PhaseRegulationMode,
    pub regulating: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regulation_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_deadband: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regulation_terminal: Option<String>,
}

impl RatioTapChanger {
    pub fn high_tap_position(&self) -> i32 {
        self.low_tap_position + self.steps.len() as i32 - 1
    }
}

impl PhaseTapChanger {
    pub fn high_tap_position(&self) -> i32 {
        self.low_tap_position + self.steps.len() as i32 - 1
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TwoWindingsTransformer {
    pub id: String,
    pub name: String,
    pub terminal1: TerminalRef,
    pub terminal2: TerminalRef,
    pub r: f64,
    pub x: f64,
    pub g: f64,
    pub b: f64,
    /// Rated voltages (kV)
    pub rated_u1: f64,
    pub rated_u2: f64,
    /// Winding connection clock numbers (multiples of 30 degrees)
    #[serde(default, skip_serializing_if = "is_zero")]
    pub phase_angle_clock1: i32,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub phase_angle_clock2: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratio_tap_changer: Option<RatioTapChanger>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase_tap_changer: Option<PhaseTapChanger>,
}

/// One leg of a three-winding transformer, from its network terminal to the star bus.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    pub terminal: TerminalRef,
    pub r: f64,
    pub x: f64,
    pub g: f64,
    pub b: f64,
    pub rated_u: f64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub phase_angle_clock: i32,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub star_bus_phase_angle_clock: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratio_tap_changer: Option<RatioTapChanger>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase_tap_changer: Option<PhaseTapChanger>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreeWindingsTransformer {
    pub id: String,
    pub name: String,
    /// Rated voltage of the star bus (kV)
    pub rated_u0: f64,
    pub legs: [Leg; 3],
}

/// Generation part of a dangling line, from the equivalent injection at its boundary node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DanglingLineGeneration {
    pub target_p: f64,
    pub target_q: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_v: Option<f64>,
    pub voltage_regulation_on: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_q: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_q: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DanglingLine {
    pub id: String,
    pub name: String,
    pub terminal: TerminalRef,
    pub r: f64,
    pub x: f64,
    pub g: f64,
    pub b: f64,
    /// Constant consumption at the boundary side
    pub p0: f64,
    pub q0: f64,
    pub pairing_key: String,
    /// Boundary node the line is attached to
    pub boundary_node: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation: Option<DanglingLineGeneration>,
}

/// One half of a tie line: the part of a line on one side of the boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TieLineHalf {
    pub id: String,
    pub name: String,
    pub terminal: TerminalRef,
    pub r: f64,
    pub x: f64,
    pub g1: f64,
    pub b1: f64,
    pub g2: f64,
    pub b2: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TieLine {
    pub id: String,
    pub name: String,
    pub pairing_key: String,
    pub half1: TieLineHalf,
    pub half2: TieLineHalf,
    /// Initial flow hint at the boundary node
    pub xnode_p: f64,
    pub xnode_q: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Generator {
    pub id: String,
    pub name: String,
    pub terminal: TerminalRef,
    pub target_p: f64,
    pub target_q: f64,
    pub min_p: f64,
    pub max_p: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_q: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_q: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_v: Option<f64>,
    pub voltage_regulator_on: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Load {
    pub id: String,
    pub name: String,
    pub terminal: TerminalRef,
    pub p0: f64,
    pub q0: f64,
    /// Created by the conversion rather than present as equipment in the input
    pub fictitious: bool,
}

/// Terminal counted in a control area's interchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AreaBoundary {
    /// A converted terminal, by CGMES terminal id
    Terminal { terminal: String },
    /// The boundary side of a dangling line
    DanglingLine { dangling_line: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlArea {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy_ident_code: Option<String>,
    /// Scheduled net interchange (MW)
    pub net_interchange: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p_tolerance: Option<f64>,
    pub boundaries: Vec<AreaBoundary>,
}

/// Converted grid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub id: String,
    pub voltage_levels: Vec<VoltageLevel>,
    pub buses: Vec<Bus>,
    pub lines: Vec<Line>,
    pub switches: Vec<Switch>,
    pub two_windings_transformers: Vec<TwoWindingsTransformer>,
    pub three_windings_transformers: Vec<ThreeWindingsTransformer>,
    pub dangling_lines: Vec<DanglingLine>,
    pub tie_lines: Vec<TieLine>,
    pub generators: Vec<Generator>,
    pub loads: Vec<Load>,
    pub control_areas: Vec<ControlArea>,
    #[serde(skip)]
    ids: HashSet<String>,
}

macro_rules! adder {
    ($(#[$doc:meta])* $fn_name:ident, $field:ident, $ty:ty) => {
        $(#[$doc])*
        pub fn $fn_name(&mut self, element: $ty) -> GridResult<()> {
            self.register(&element.id)?;
            self.$field.push(element);
            Ok(())
        }
    };
}

impl Network {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    fn register(&mut self, id: &str) -> GridResult<()> {
        if !self.ids.insert(id.to_string()) {
            return Err(GridError::Network(format!("duplicate identifier {}", id)));
        }
        Ok(())
    }

    /// Whether an element with this identifier has been added
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    adder!(add_voltage_level, voltage_levels, VoltageLevel);
    adder!(add_bus, buses, Bus);
    adder!(add_line, lines, Line);
    adder!(add_switch, switches, Switch);
    adder!(
        add_two_windings_transformer,
        two_windings_transformers,
        TwoWindingsTransformer
    );
    adder!(
        add_three_windings_transformer,
        three_windings_transformers,
        ThreeWindingsTransformer
    );
    adder!(add_dangling_line, dangling_lines, DanglingLine);
    adder!(add_generator, generators, Generator);
    adder!(add_load, loads, Load);
    adder!(add_control_area, control_areas, ControlArea);

    /// Add a tie line; its halves are registered as identifiers too
    pub fn add_tie_line(&mut self, tie_line: TieLine) -> GridResult<()> {
        self.register(&tie_line.id)?;
        self.register(&tie_line.half1.id)?;
        self.register(&tie_line.half2.id)?;
        self.tie_lines.push(tie_line);
        Ok(())
    }

    pub fn voltage_level(&self, id: &str) -> Option<&VoltageLevel> {
        self.voltage_levels.iter().find(|vl| vl.id == id)
    }

    pub fn bus(&self, id: &str) -> Option<&Bus> {
        self.buses.iter().find(|b| b.id == id)
    }

    pub fn line(&self, id: &str) -> Option<&Line> {
        self.lines.iter().find(|l| l.id == id)
    }

    pub fn two_windings_transformer(&self, id: &str) -> Option<&TwoWindingsTransformer> {
        self.two_windings_transformers.iter().find(|t| t.id == id)
    }

    pub fn two_windings_transformer_mut(&mut self, id: &str) -> Option<&mut TwoWindingsTransformer> {
        self.two_windings_transformers
            .iter_mut()
            .find(|t| t.id == id)
    }

    pub fn three_windings_transformer(&self, id: &str) -> Option<&ThreeWindingsTransformer> {
        self.three_windings_transformers.iter().find(|t| t.id == id)
    }

    pub fn three_windings_transformer_mut(
        &mut self,
        id: &str,
    ) -> Option<&mut ThreeWindingsTransformer> {
        self.three_windings_transformers
            .iter_mut()
            .find(|t| t.id == id)
    }

    pub fn dangling_line(&self, id: &str) -> Option<&DanglingLine> {
        self.dangling_lines.iter().find(|dl| dl.id == id)
    }

    pub fn dangling_line_mut(&mut self, id: &str) -> Option<&mut DanglingLine> {
        self.dangling_lines.iter_mut().find(|dl| dl.id == id)
    }

    pub fn tie_line(&self, id: &str) -> Option<&TieLine> {
        self.tie_lines.iter().find(|t| t.id == id)
    }

    pub fn generator(&self, id: &str) -> Option<&Generator> {
        self.generators.iter().find(|g| g.id == id)
    }

    pub fn load(&self, id: &str) -> Option<&Load> {
        self.loads.iter().find(|l| l.id == id)
    }

    pub fn control_area(&self, id: &str) -> Option<&ControlArea> {
        self.control_areas.iter().find(|a| a.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terminal(vl: &str, bus: &str) -> TerminalRef {
        TerminalRef {
            voltage_level: vl.to_string(),
            bus: Some(bus.to_string()),
            connectable_bus: Some(bus.to_string()),
            ..TerminalRef::default()
        }
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut network = Network::new("test");
        let line = Line {
            id: "L1".to_string(),
            terminal1: terminal("VL1", "B1"),
            terminal2: terminal("VL1", "B2"),
            ..Line::default()
        };
        network.add_line(line.clone()).unwrap();
        let err = network
            .add_load(Load {
                id: "L1".to_string(),
                ..Load::default()
            })
            .unwrap_err();
        assert!(matches!(err, GridError::Network(_)));
        assert_eq!(network.lines.len(), 1);
        assert!(network.loads.is_empty());
        assert!(network.contains("L1"));
    }

    #[test]
    fn test_tie_line_registers_halves() {
        let mut network = Network::new("test");
        let tie = TieLine {
            id: "DL1 + DL2".to_string(),
            half1: TieLineHalf {
                id: "DL1".to_string(),
                ..TieLineHalf::default()
            },
            half2: TieLineHalf {
                id: "DL2".to_string(),
                ..TieLineHalf::default()
            },
            ..TieLine::default()
        };
        network.add_tie_line(tie).unwrap();
        assert!(network.contains("DL1"));
        assert!(network.contains("DL2"));
        assert!(network.tie_line("DL1 + DL2").is_some());
    }

    #[test]
    fn test_disconnect_keeps_connectable_bus() {
        let mut t = terminal("VL1", "B1");
        assert!(t.connected());
        t.disconnect();
        assert!(!t.connected());
        assert_eq!(t.connectable_bus.as_deref(), Some("B1"));
    }

    #[test]
    fn test_high_tap_position() {
        let rtc = RatioTapChanger {
            low_tap_position: -2,
            steps: vec![RatioTapStep::default(); 5],
            ..RatioTapChanger::default()
        };
        assert_eq!(rtc.high_tap_position(), 2);
    }

    #[test]
    fn test_network_serialization_skips_ids() {
        let mut network = Network::new("grid");
        network
            .add_bus(Bus {
                id: "B1".to_string(),
                voltage_level: "VL1".to_string(),
                ..Bus::default()
            })
            .unwrap();
        let json = serde_json::to_string(&network).unwrap();
        assert!(json.contains("\"buses\""));
        assert!(!json.contains("\"ids\""));

        let back: Network = serde_json::from_str(&json).unwrap();
        assert_eq!(back.buses.len(), 1);
    }
}
