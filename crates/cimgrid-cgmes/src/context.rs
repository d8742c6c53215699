//! State shared by all conversions of one run.
//!
//! The context owns the network being built and every accumulator the
//! conversions append to: diagnostics, equipment waiting at boundary nodes,
//! the terminal mapping and tap changer regulations resolved at the end.

use std::collections::HashSet;

use cimgrid_core::{ConversionReport, Diagnostics, Network};
use tracing::{debug, warn};

use crate::boundary::Boundary;
use crate::config::Config;
use crate::elements::regulating_control::PendingRegulation;
use crate::model::CgmesModel;
use crate::terminal::{TerminalData, TerminalMapping};

pub struct Context<'a> {
    pub model: &'a CgmesModel,
    pub config: &'a Config,
    pub network: Network,
    pub diagnostics: Diagnostics,
    pub boundary: Boundary,
    pub terminal_mapping: TerminalMapping,
    pub regulations: Vec<PendingRegulation>,
    /// Identifiers taken by converted equipment, including equipment still
    /// waiting at a boundary node.
    claimed: HashSet<String>,
}

impl<'a> Context<'a> {
    pub fn new(model: &'a CgmesModel, config: &'a Config) -> Self {
        Self {
            model,
            config,
            network: Network::new(model.network_id()),
            diagnostics: Diagnostics::new(),
            boundary: Boundary::from_model(model),
            terminal_mapping: TerminalMapping::default(),
            regulations: Vec::new(),
            claimed: HashSet::new(),
        }
    }

    /// Configuration of the run; the borrow is independent of the context.
    pub fn config(&self) -> &'a Config {
        self.config
    }

    pub fn terminal(&self, id: &str) -> Option<TerminalData> {
        TerminalData::from_model(self.model, id)
    }

    /// Reserve `id` for one element. An identifier already taken, by any
    /// class, makes the element invalid.
    pub fn claim(&mut self, class: &str, id: &str) -> bool {
        if self.network.contains(id) || !self.claimed.insert(id.to_string()) {
            self.invalid(class, id, "identifier already used");
            return false;
        }
        true
    }

    pub fn finish(self) -> (Network, ConversionReport) {
        let report = ConversionReport::new(&self.network, self.diagnostics);
        (self.network, report)
    }

    // ========================================================================
    // Reporting
    // ========================================================================

    pub fn invalid(&mut self, class: &str, id: &str, reason: &str) {
        warn!(class, id, "invalid: {}", reason);
        self.diagnostics.invalid(class, id, reason);
    }

    pub fn missing(&mut self, class: &str, id: &str, what: &str, default: &str) {
        debug!(class, id, "missing {}, using {}", what, default);
        self.diagnostics.missing(class, id, what, default);
    }

    pub fn fixed(
        &mut self,
        class: &str,
        id: &str,
        reason: &str,
        original: &str,
        replacement: &str,
    ) {
        debug!(class, id, "fixed {}: {} -> {}", reason, original, replacement);
        self.diagnostics
            .fixed(class, id, reason, original, replacement);
    }

    pub fn ignored(&mut self, class: &str, id: &str, reason: &str) {
        debug!(class, id, "ignored: {}", reason);
        self.diagnostics.ignored(class, id, reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cimgrid_core::{Severity, VoltageLevel};

    #[test]
    fn test_claim_identifier_once() {
        let m = CgmesModel::from_json_str("{}").unwrap();
        let config = Config::default();
        let mut ctx = Context::new(&m, &config);
        ctx.network
            .add_voltage_level(VoltageLevel {
                id: "VL1".to_string(),
                name: "VL1".to_string(),
                nominal_v: 400.0,
                substation: None,
                region: None,
            })
            .unwrap();

        assert!(ctx.claim("ACLineSegment", "L1"));
        assert!(!ctx.claim("EquivalentBranch", "L1"));
        assert!(!ctx.claim("ACLineSegment", "VL1"));
        assert_eq!(ctx.diagnostics.count(Severity::Invalid), 2);
        assert_eq!(ctx.diagnostics.for_entity("L1").count(), 1);
    }
}
