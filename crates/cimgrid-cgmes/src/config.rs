//! Conversion configuration.
//!
//! Every modelling alternative the conversion offers is a field here. All
//! fields have defaults, so an empty TOML table (or none at all) gives the
//! standard behaviour:
//!
//! ```toml
//! [two_windings]
//! ratio_phase = "x"
//! shunt = "split"
//!
//! [boundary]
//! merge = "cascade"
//! ```

use serde::{Deserialize, Serialize};

/// Where ratio and phase tap changers of a two-winding transformer are placed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TwoWindingsRatioPhase {
    End1,
    End2,
    /// Keep each tap changer at the end it is declared on
    End1End2,
    /// Both at the end with zero reactance: end 1 when x1 is zero, end 2 otherwise
    #[default]
    X,
}

/// Where the magnetizing shunt of a two-winding transformer is placed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TwoWindingsShunt {
    End1,
    End2,
    End1End2,
    /// Half of the total shunt at each end
    Split,
    /// Total shunt at the end with zero reactance
    #[default]
    X,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TwoWindingsPhaseAngleClock {
    #[default]
    Off,
    End1End2,
}

/// Where the structural ratio `ratedU2 / ratedU1` of a two-winding transformer sits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TwoWindingsStructuralRatio {
    End1,
    End2,
    /// End 1 when it carries a defined ratio tap changer, end 2 otherwise
    Rtc,
    #[default]
    X,
}

/// Placement relative to one winding of a three-winding transformer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreeWindingsRatioPhase {
    #[default]
    NetworkSide,
    StarBusSide,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreeWindingsShunt {
    #[default]
    NetworkSide,
    StarBusSide,
    Split,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreeWindingsPhaseAngleClock {
    #[default]
    Off,
    NetworkSide,
    StarBusSide,
}

/// Choice of the star bus rated voltage and of the ratio moved on each leg.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreeWindingsStructuralRatio {
    /// Star bus at 1.0 kV, nothing moved
    NetworkSide,
    /// Star bus at the rated voltage of winding 1, each leg's ratio moved
    #[default]
    StarBusSide,
    End1,
    End2,
    End3,
}

/// How two equipment meeting at the same boundary node are joined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryMerge {
    /// One line equivalent to both halves in series
    Cascade,
    /// A tie line keeping both halves
    #[default]
    TieLine,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TwoWindingsConfig {
    pub ratio_phase: TwoWindingsRatioPhase,
    pub shunt: TwoWindingsShunt,
    pub phase_angle_clock: TwoWindingsPhaseAngleClock,
    pub negate_phase_angle_end1: bool,
    pub negate_phase_angle_end2: bool,
    pub structural_ratio: TwoWindingsStructuralRatio,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreeWindingsConfig {
    pub ratio_phase: ThreeWindingsRatioPhase,
    pub shunt: ThreeWindingsShunt,
    pub phase_angle_clock: ThreeWindingsPhaseAngleClock,
    pub negate_phase_angle_network_side: bool,
    pub negate_phase_angle_star_bus_side: bool,
    pub structural_ratio: ThreeWindingsStructuralRatio,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryConfig {
    pub merge: BoundaryMerge,
    /// Compute the network side flow of dangling lines from the boundary flow
    pub compute_flows: bool,
    /// Open the network side of a dangling line whose boundary side is open
    pub disconnect_if_boundary_open: bool,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            merge: BoundaryMerge::default(),
            compute_flows: true,
            disconnect_if_boundary_open: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Convert SV injections into fictitious loads
    pub convert_sv_injections: bool,
    pub convert_control_areas: bool,
    pub two_windings: TwoWindingsConfig,
    pub three_windings: ThreeWindingsConfig,
    pub boundary: BoundaryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            convert_sv_injections: true,
            convert_control_areas: true,
            two_windings: TwoWindingsConfig::default(),
            three_windings: ThreeWindingsConfig::default(),
            boundary: BoundaryConfig::default(),
        }
    }
}
