//! # cimgrid-core: target grid model and two-port algebra
//!
//! Shared building blocks of the CGMES conversion engine:
//!
//! - [`network`] - the bus-branch grid model conversions write into
//! - [`two_port`] - ABCD quadripole and π-model algebra
//! - [`diagnostics`] - issues reported while converting equipment
//! - [`error`] - errors that stop a conversion run
//!
//! ## Quick Start
//!
//! ```rust
//! use cimgrid_core::{Line, Network, PiModel, Quadripole, TerminalRef};
//!
//! let mut network = Network::new("grid");
//!
//! // Two line sections meeting at a node that is removed
//! let merged = Quadripole::from_pi(&PiModel::symmetric(1.0, 10.0, 0.0, 0.0))
//!     .cascade(&Quadripole::from_pi(&PiModel::symmetric(2.0, 20.0, 0.0, 0.0)))
//!     .to_pi_model()
//!     .unwrap();
//!
//! network
//!     .add_line(Line {
//!         id: "L1".to_string(),
//!         name: "L1".to_string(),
//!         terminal1: TerminalRef::default(),
//!         terminal2: TerminalRef::default(),
//!         r: merged.r,
//!         x: merged.x,
//!         g1: merged.g1,
//!         b1: merged.b1,
//!         g2: merged.g2,
//!         b2: merged.b2,
//!     })
//!     .unwrap();
//! assert!((network.lines[0].x - 30.0).abs() < 1e-9);
//! ```

pub mod diagnostics;
pub mod error;
pub mod network;
pub mod two_port;

pub use diagnostics::{ConversionReport, DiagnosticIssue, Diagnostics, NetworkStats, Severity};
pub use error::{GridError, GridResult};
pub use network::{
    AreaBoundary, Bus, ControlArea, DanglingLine, DanglingLineGeneration, Generator, Leg, Line,
    Load, Network, PhaseRegulationMode, PhaseTapChanger, PhaseTapStep, RatioTapChanger,
    RatioTapStep, Switch, SwitchKind, TerminalRef, ThreeWindingsTransformer, TieLine, TieLineHalf,
    TwoWindingsTransformer, VoltageLevel,
};
pub use two_port::{PiModel, Quadripole};
