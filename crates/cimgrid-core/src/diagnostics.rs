//! Diagnostics collected while converting equipment.
//!
//! Data-quality problems never abort a conversion. Each one is recorded as a
//! [`DiagnosticIssue`] with one of five severities:
//!
//! - `invalid`: the equipment was rejected and nothing was written for it
//! - `missing`: an expected value was absent and a default was used
//! - `fixed`: a value was present but unusable and has been corrected
//! - `ignored`: a feature with no counterpart in the target model was skipped
//! - `pending`: a feature that is recognised but not converted yet
//!
//! # Example
//!
//! ```
//! use cimgrid_core::diagnostics::{Diagnostics, Severity};
//!
//! let mut diag = Diagnostics::new();
//!
//! diag.missing("ACLineSegment", "L1", "gch", "0.0");
//! diag.invalid("PowerTransformer", "T1", "both ends at boundary");
//!
//! assert_eq!(diag.count(Severity::Missing), 1);
//! assert!(diag.has_invalid());
//! ```

use serde::Serialize;

use crate::network::Network;

/// Severity of a conversion issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Equipment rejected, not converted
    Invalid,
    /// Expected value absent, default substituted
    Missing,
    /// Value corrected to a safe one
    Fixed,
    /// Unsupported feature skipped
    Ignored,
    /// Recognised feature not converted yet
    Pending,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Invalid => "invalid",
            Severity::Missing => "missing",
            Severity::Fixed => "fixed",
            Severity::Ignored => "ignored",
            Severity::Pending => "pending",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single issue reported during conversion
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticIssue {
    /// Severity of the issue
    pub severity: Severity,
    /// CGMES class (or conversion step) the issue belongs to
    pub category: String,
    /// Human-readable description
    pub message: String,
    /// Identifier of the equipment concerned
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    /// Value found in the input, for `fixed` issues
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,
    /// Value used instead (default or corrected)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replacement: Option<String>,
}

impl DiagnosticIssue {
    pub fn new(
        severity: Severity,
        category: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category: category.into(),
            message: message.into(),
            entity: None,
            original: None,
            replacement: None,
        }
    }

    /// Add entity reference to the issue
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// Record the value found in the input
    pub fn with_original(mut self, original: impl Into<String>) -> Self {
        self.original = Some(original.into());
        self
    }

    /// Record the value used in its place
    pub fn with_replacement(mut self, replacement: impl Into<String>) -> Self {
        self.replacement = Some(replacement.into());
        self
    }
}

impl std::fmt::Display for DiagnosticIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}:{}] {}", self.severity, self.category, self.message)?;

        if let Some(entity) = &self.entity {
            write!(f, " ({})", entity)?;
        }
        match (&self.original, &self.replacement) {
            (Some(original), Some(replacement)) => {
                write!(f, " {} -> {}", original, replacement)?;
            }
            (None, Some(replacement)) => write!(f, " using {}", replacement)?,
            _ => {}
        }

        Ok(())
    }
}

/// Collection of issues for one conversion run
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<DiagnosticIssue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a raw issue directly
    pub fn add(&mut self, issue: DiagnosticIssue) {
        self.issues.push(issue);
    }

    // =========================================================================
    // Reporting Methods
    // =========================================================================

    /// Equipment rejected
    pub fn invalid(&mut self, category: &str, entity: &str, reason: &str) {
        self.add(DiagnosticIssue::new(Severity::Invalid, category, reason).with_entity(entity));
    }

    /// Expected value `what` absent, `default` used instead
    pub fn missing(&mut self, category: &str, entity: &str, what: &str, default: &str) {
        self.add(
            DiagnosticIssue::new(Severity::Missing, category, format!("missing {}", what))
                .with_entity(entity)
                .with_replacement(default),
        );
    }

    /// Value corrected from `original` to `replacement`
    pub fn fixed(
        &mut self,
        category: &str,
        entity: &str,
        reason: &str,
        original: &str,
        replacement: &str,
    ) {
        self.add(
            DiagnosticIssue::new(Severity::Fixed, category, reason)
                .with_entity(entity)
                .with_original(original)
                .with_replacement(replacement),
        );
    }

    /// Correction without a single before/after value
    pub fn fixed_reason(&mut self, category: &str, entity: &str, reason: &str) {
        self.add(DiagnosticIssue::new(Severity::Fixed, category, reason).with_entity(entity));
    }

    pub fn ignored(&mut self, category: &str, entity: &str, reason: &str) {
        self.add(DiagnosticIssue::new(Severity::Ignored, category, reason).with_entity(entity));
    }

    pub fn pending(&mut self, category: &str, entity: &str, reason: &str) {
        self.add(DiagnosticIssue::new(Severity::Pending, category, reason).with_entity(entity));
    }

    // =========================================================================
    // Query Methods
    // =========================================================================

    /// Count issues of one severity
    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    /// Check if any equipment was rejected
    pub fn has_invalid(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Invalid)
    }

    /// Issues of one severity
    pub fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues.iter().filter(move |i| i.severity == severity)
    }

    /// Issues reported for one equipment
    pub fn for_entity<'a>(
        &'a self,
        entity: &'a str,
    ) -> impl Iterator<Item = &'a DiagnosticIssue> {
        self.issues
            .iter()
            .filter(move |i| i.entity.as_deref() == Some(entity))
    }

    // =========================================================================
    // Utility Methods
    // =========================================================================

    pub fn merge(&mut self, other: Diagnostics) {
        self.issues.extend(other.issues);
    }

    /// Get summary string
    pub fn summary(&self) -> String {
        if self.issues.is_empty() {
            return "No issues".to_string();
        }
        let parts: Vec<String> = [
            Severity::Invalid,
            Severity::Missing,
            Severity::Fixed,
            Severity::Ignored,
            Severity::Pending,
        ]
        .iter()
        .filter_map(|severity| match self.count(*severity) {
            0 => None,
            n => Some(format!("{} {}", n, severity)),
        })
        .collect();
        parts.join(", ")
    }
}

impl std::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Diagnostics: {}", self.summary())?;
        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }
        Ok(())
    }
}

// ============================================================================
// Conversion Report
// ============================================================================

/// Element counts of a converted network
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct NetworkStats {
    pub buses: usize,
    pub lines: usize,
    pub switches: usize,
    pub two_windings_transformers: usize,
    pub three_windings_transformers: usize,
    pub dangling_lines: usize,
    pub tie_lines: usize,
    pub generators: usize,
    pub loads: usize,
    pub control_areas: usize,
}

impl NetworkStats {
    pub fn of(network: &Network) -> Self {
        Self {
            buses: network.buses.len(),
            lines: network.lines.len(),
            switches: network.switches.len(),
            two_windings_transformers: network.two_windings_transformers.len(),
            three_windings_transformers: network.three_windings_transformers.len(),
            dangling_lines: network.dangling_lines.len(),
            tie_lines: network.tie_lines.len(),
            generators: network.generators.len(),
            loads: network.loads.len(),
            control_areas: network.control_areas.len(),
        }
    }
}

/// Outcome of a conversion run: element counts plus every issue reported
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversionReport {
    pub stats: NetworkStats,
    #[serde(flatten)]
    pub diagnostics: Diagnostics,
}

impl ConversionReport {
    pub fn new(network: &Network, diagnostics: Diagnostics) -> Self {
        Self {
            stats: NetworkStats::of(network),
            diagnostics,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} buses, {} lines, {} transformers, {} dangling lines, {} tie lines | {}",
            self.stats.buses,
            self.stats.lines,
            self.stats.two_windings_transformers + self.stats.three_windings_transformers,
            self.stats.dangling_lines,
            self.stats.tie_lines,
            self.diagnostics.summary()
        )
    }
}

impl std::fmt::Display for ConversionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Conversion: {}", self.summary())?;
        for issue in &self.diagnostics.issues {
            writeln!(f, "  {}", issue)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics_counts() {
        let mut diag = Diagnostics::new();
        diag.missing("ACLineSegment", "L1", "gch", "0");
        diag.invalid("PowerTransformer", "T1", "missing end 2");
        diag.fixed("Switch", "S1", "low impedance line", "0", "7e-5");

        assert_eq!(diag.count(Severity::Missing), 1);
        assert_eq!(diag.count(Severity::Invalid), 1);
        assert_eq!(diag.count(Severity::Fixed), 1);
        assert_eq!(diag.count(Severity::Ignored), 0);
        assert!(diag.has_issues());
        assert!(diag.has_invalid());
    }

    #[test]
    fn test_diagnostics_serialization() {
        let mut diag = Diagnostics::new();
        diag.fixed("TapChanger", "TC1", "ratio", "NaN", "1.0");

        let json = serde_json::to_string_pretty(&diag).unwrap();
        assert!(json.contains("\"fixed\""));
        assert!(json.contains("\"original\": \"NaN\""));
        assert!(json.contains("\"replacement\": \"1.0\""));
        assert!(json.contains("\"entity\": \"TC1\""));
    }

    #[test]
    fn test_issue_display() {
        let issue = DiagnosticIssue::new(Severity::Fixed, "Switch", "converted to line")
            .with_entity("S1")
            .with_original("0")
            .with_replacement("7e-5");

        let display = format!("{}", issue);
        assert!(display.starts_with("[fixed:Switch]"));
        assert!(display.contains("(S1)"));
        assert!(display.contains("0 -> 7e-5"));
    }

    #[test]
    fn test_diagnostics_summary() {
        let mut diag = Diagnostics::new();
        assert_eq!(diag.summary(), "No issues");

        diag.missing("ACLineSegment", "L1", "gch", "0");
        assert_eq!(diag.summary(), "1 missing");

        diag.invalid("ACLineSegment", "L2", "no terminals");
        diag.ignored("EquivalentInjection", "EI1", "at boundary");
        assert_eq!(diag.summary(), "1 invalid, 1 missing, 1 ignored");
    }

    #[test]
    fn test_for_entity() {
        let mut diag = Diagnostics::new();
        diag.missing("ACLineSegment", "L1", "gch", "0");
        diag.missing("ACLineSegment", "L2", "gch", "0");
        diag.fixed_reason("ACLineSegment", "L1", "disconnected end");

        assert_eq!(diag.for_entity("L1").count(), 2);
        assert_eq!(diag.for_entity("L3").count(), 0);
    }

    #[test]
    fn test_diagnostics_merge() {
        let mut diag1 = Diagnostics::new();
        diag1.pending("RegulatingControl", "RC1", "shunt regulation");

        let mut diag2 = Diagnostics::new();
        diag2.invalid("Switch", "S1", "no terminals");

        diag1.merge(diag2);
        assert_eq!(diag1.count(Severity::Pending), 1);
        assert_eq!(diag1.count(Severity::Invalid), 1);
    }

    #[test]
    fn test_conversion_report() {
        let network = Network::new("grid");
        let mut diag = Diagnostics::new();
        diag.missing("ACLineSegment", "L1", "gch", "0");

        let report = ConversionReport::new(&network, diag);
        assert_eq!(report.stats, NetworkStats::default());
        assert!(report.summary().contains("0 buses"));
        assert!(report.summary().contains("1 missing"));

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"stats\""));
        assert!(json.contains("\"issues\""));
    }
}
