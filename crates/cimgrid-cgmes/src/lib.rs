//! # cimgrid-cgmes: CGMES equipment conversion
//!
//! Turns CGMES equipment records (lines, switches, transformers with their
//! tap changers, equipment at boundary nodes) into the bus-branch
//! [`Network`](cimgrid_core::Network) of `cimgrid-core`.
//!
//! Records are read as flat [`PropertyBag`]s from a JSON [`CgmesDocument`],
//! indexed into a [`CgmesModel`] and converted by [`convert`] under a
//! [`Config`] choosing between modelling alternatives. Data problems never
//! stop a run; they are collected in the
//! [`ConversionReport`](cimgrid_core::ConversionReport).
//!
//! ```rust
//! use cimgrid_cgmes::{convert, CgmesModel, Config};
//!
//! let model = CgmesModel::from_json_str(r#"{
//!     "voltage_levels": [{"VoltageLevel": "VL1", "nominalV": 400.0}],
//!     "nodes": [
//!         {"TopologicalNode": "N1", "VoltageLevel": "VL1"},
//!         {"TopologicalNode": "N2", "VoltageLevel": "VL1"}
//!     ],
//!     "terminals": [
//!         {"Terminal": "T1", "ConductingEquipment": "L1", "TopologicalNode": "N1", "sequenceNumber": 1},
//!         {"Terminal": "T2", "ConductingEquipment": "L1", "TopologicalNode": "N2", "sequenceNumber": 2}
//!     ],
//!     "ac_line_segments": [{"ACLineSegment": "L1", "r": 0.5, "x": 5.0, "gch": 0.0, "bch": 1e-4}]
//! }"#).unwrap();
//!
//! let (network, report) = convert(&model, &Config::default()).unwrap();
//! assert_eq!(network.lines[0].b1, 5e-5);
//! assert!(!report.diagnostics.has_issues());
//! ```

pub mod boundary;
pub mod config;
pub mod context;
pub mod conversion;
pub mod elements;
pub mod model;
pub mod property_bag;
pub mod sv;
pub mod terminal;

pub use config::Config;
pub use conversion::convert;
pub use model::{CgmesDocument, CgmesModel};
pub use property_bag::PropertyBag;
