//! Input document and the indexed model the conversions query.
//!
//! The document is a JSON object holding one array of property bags per CGMES
//! class group (see [`CgmesDocument`]). [`CgmesModel`] indexes it once so that
//! terminals, transformer ends, tap changer tables and boundary injections can
//! be looked up by identifier while converting.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use cimgrid_core::{GridError, GridResult};
use serde::{Deserialize, Serialize};

use crate::property_bag::PropertyBag;

/// Raw input document as read from JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CgmesDocument {
    /// Identifier given to the converted network
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub nodes: Vec<PropertyBag>,
    pub terminals: Vec<PropertyBag>,
    pub voltage_levels: Vec<PropertyBag>,
    pub ac_line_segments: Vec<PropertyBag>,
    pub equivalent_branches: Vec<PropertyBag>,
    pub series_compensators: Vec<PropertyBag>,
    pub switches: Vec<PropertyBag>,
    pub transformer_ends: Vec<PropertyBag>,
    pub ratio_tap_changers: Vec<PropertyBag>,
    pub phase_tap_changers: Vec<PropertyBag>,
    pub ratio_tap_changer_table_points: Vec<PropertyBag>,
    pub phase_tap_changer_table_points: Vec<PropertyBag>,
    pub equivalent_injections: Vec<PropertyBag>,
    pub regulating_controls: Vec<PropertyBag>,
    pub sv_injections: Vec<PropertyBag>,
    pub control_areas: Vec<PropertyBag>,
    pub tie_flows: Vec<PropertyBag>,
}

/// A power transformer with its ends ordered by `endNumber`.
#[derive(Debug, Clone)]
pub struct PowerTransformer {
    pub id: String,
    pub name: String,
    pub ends: Vec<PropertyBag>,
}

#[derive(Debug, Default)]
pub struct CgmesModel {
    doc: CgmesDocument,
    nodes: HashMap<String, usize>,
    terminals: HashMap<String, usize>,
    terminals_by_equipment: HashMap<String, Vec<usize>>,
    voltage_levels: HashMap<String, usize>,
    transformers: Vec<PowerTransformer>,
    transformer_end_ids: HashMap<String, String>,
    ratio_tap_changers_by_end: HashMap<String, Vec<usize>>,
    phase_tap_changers_by_end: HashMap<String, Vec<usize>>,
    ratio_tables: HashMap<String, Vec<usize>>,
    phase_tables: HashMap<String, Vec<usize>>,
    regulating_controls: HashMap<String, usize>,
    equivalent_injections_by_node: HashMap<String, Vec<usize>>,
    tie_flows_by_area: HashMap<String, Vec<usize>>,
}

fn index(records: &[PropertyBag], key: &str) -> GridResult<HashMap<String, usize>> {
    let mut map = HashMap::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        let id = record
            .id(key)
            .ok_or_else(|| GridError::Validation(format!("{} record without identifier", key)))?;
        if map.insert(id.clone(), i).is_some() {
            return Err(GridError::Validation(format!("duplicate {} {}", key, id)));
        }
    }
    Ok(map)
}

fn group(records: &[PropertyBag], key: &str) -> GridResult<HashMap<String, Vec<usize>>> {
    let mut map: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, record) in records.iter().enumerate() {
        let id = record
            .id(key)
            .ok_or_else(|| GridError::Validation(format!("record without {} reference", key)))?;
        map.entry(id).or_default().push(i);
    }
    Ok(map)
}

fn sort_by_number(indices: &mut [usize], records: &[PropertyBag], key: &str) {
    indices.sort_by_key(|&i| records[i].as_i32_or(key, i32::MAX));
}

impl CgmesModel {
    pub fn from_document(doc: CgmesDocument) -> GridResult<Self> {
        let nodes = index(&doc.nodes, "TopologicalNode")?;
        let terminals = index(&doc.terminals, "Terminal")?;
        let voltage_levels = index(&doc.voltage_levels, "VoltageLevel")?;
        let regulating_controls = index(&doc.regulating_controls, "RegulatingControl")?;
        for (records, key) in [
            (&doc.ac_line_segments, "ACLineSegment"),
            (&doc.equivalent_branches, "EquivalentBranch"),
            (&doc.series_compensators, "SeriesCompensator"),
            (&doc.switches, "Switch"),
            (&doc.transformer_ends, "TransformerEnd"),
            (&doc.ratio_tap_changers, "RatioTapChanger"),
            (&doc.phase_tap_changers, "PhaseTapChanger"),
            (&doc.equivalent_injections, "EquivalentInjection"),
            (&doc.sv_injections, "SvInjection"),
            (&doc.control_areas, "ControlArea"),
        ] {
            index(records, key)?;
        }

        let mut terminals_by_equipment = group(&doc.terminals, "ConductingEquipment")?;
        for indices in terminals_by_equipment.values_mut() {
            sort_by_number(indices, &doc.terminals, "sequenceNumber");
        }

        let mut ends_by_transformer = group(&doc.transformer_ends, "PowerTransformer")?;
        let mut transformer_order: Vec<(usize, String)> = ends_by_transformer
            .iter()
            .map(|(id, indices)| (indices[0], id.clone()))
            .collect();
        transformer_order.sort();
        let mut transformers = Vec::with_capacity(transformer_order.len());
        let mut transformer_end_ids = HashMap::new();
        for (_, id) in transformer_order {
            let mut indices = ends_by_transformer.remove(&id).unwrap_or_default();
            sort_by_number(&mut indices, &doc.transformer_ends, "endNumber");
            let ends: Vec<PropertyBag> = indices
                .iter()
                .map(|&i| doc.transformer_ends[i].clone())
                .collect();
            for end in &ends {
                if let Some(end_id) = end.id("TransformerEnd") {
                    transformer_end_ids.insert(end_id, id.clone());
                }
            }
            let name = ends
                .iter()
                .find_map(|e| e.string("name"))
                .unwrap_or_else(|| id.clone());
            transformers.push(PowerTransformer { id, name, ends });
        }

        let ratio_tap_changers_by_end = group(&doc.ratio_tap_changers, "TransformerEnd")?;
        let phase_tap_changers_by_end = group(&doc.phase_tap_changers, "TransformerEnd")?;

        let mut ratio_tables = group(&doc.ratio_tap_changer_table_points, "RatioTapChangerTable")?;
        for indices in ratio_tables.values_mut() {
            sort_by_number(indices, &doc.ratio_tap_changer_table_points, "step");
        }
        let mut phase_tables = group(&doc.phase_tap_changer_table_points, "PhaseTapChangerTable")?;
        for indices in phase_tables.values_mut() {
            sort_by_number(indices, &doc.phase_tap_changer_table_points, "step");
        }

        let mut equivalent_injections_by_node: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, ei) in doc.equivalent_injections.iter().enumerate() {
            let node = ei
                .id("EquivalentInjection")
                .and_then(|id| terminals_by_equipment.get(&id))
                .and_then(|t| t.first())
                .and_then(|&t| doc.terminals[t].id("TopologicalNode"));
            if let Some(node) = node {
                equivalent_injections_by_node.entry(node).or_default().push(i);
            }
        }

        let tie_flows_by_area = group(&doc.tie_flows, "ControlArea")?;

        Ok(Self {
            doc,
            nodes,
            terminals,
            terminals_by_equipment,
            voltage_levels,
            transformers,
            transformer_end_ids,
            ratio_tap_changers_by_end,
            phase_tap_changers_by_end,
            ratio_tables,
            phase_tables,
            regulating_controls,
            equivalent_injections_by_node,
            tie_flows_by_area,
        })
    }

    pub fn from_json_str(json: &str) -> GridResult<Self> {
        Self::from_document(serde_json::from_str(json)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> GridResult<Self> {
        Self::from_document(serde_json::from_reader(reader)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> GridResult<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn document(&self) -> &CgmesDocument {
        &self.doc
    }

    pub fn network_id(&self) -> String {
        self.doc.id.clone().unwrap_or_else(|| "cgmes".to_string())
    }

    // ========================================================================
    // Topology
    // ========================================================================

    pub fn nodes(&self) -> &[PropertyBag] {
        &self.doc.nodes
    }

    pub fn node(&self, id: &str) -> Option<&PropertyBag> {
        self.nodes.get(id).map(|&i| &self.doc.nodes[i])
    }

    /// Whether the node belongs to the boundary set
    pub fn is_boundary_node(&self, id: &str) -> bool {
        self.node(id)
            .map(|n| n.as_bool_or("boundary", false))
            .unwrap_or(false)
    }

    pub fn terminal(&self, id: &str) -> Option<&PropertyBag> {
        self.terminals.get(id).map(|&i| &self.doc.terminals[i])
    }

    /// Terminals of a conducting equipment ordered by sequence number
    pub fn terminals_of(&self, equipment: &str) -> Vec<&PropertyBag> {
        self.terminals_by_equipment
            .get(equipment)
            .map(|indices| indices.iter().map(|&i| &self.doc.terminals[i]).collect())
            .unwrap_or_default()
    }

    pub fn voltage_levels(&self) -> &[PropertyBag] {
        &self.doc.voltage_levels
    }

    pub fn voltage_level(&self, id: &str) -> Option<&PropertyBag> {
        self.voltage_levels.get(id).map(|&i| &self.doc.voltage_levels[i])
    }

    // ========================================================================
    // Equipment
    // ========================================================================

    pub fn ac_line_segments(&self) -> &[PropertyBag] {
        &self.doc.ac_line_segments
    }

    pub fn equivalent_branches(&self) -> &[PropertyBag] {
        &self.doc.equivalent_branches
    }

    pub fn series_compensators(&self) -> &[PropertyBag] {
        &self.doc.series_compensators
    }

    pub fn switches(&self) -> &[PropertyBag] {
        &self.doc.switches
    }

    /// Power transformers in order of first appearance of their ends
    pub fn transformers(&self) -> &[PowerTransformer] {
        &self.transformers
    }

    /// Power transformer a transformer end belongs to
    pub fn transformer_of_end(&self, end: &str) -> Option<&str> {
        self.transformer_end_ids.get(end).map(String::as_str)
    }

    pub fn ratio_tap_changers(&self) -> &[PropertyBag] {
        &self.doc.ratio_tap_changers
    }

    pub fn phase_tap_changers(&self) -> &[PropertyBag] {
        &self.doc.phase_tap_changers
    }

    pub fn ratio_tap_changers_of(&self, end: &str) -> Vec<&PropertyBag> {
        self.lookup(&self.ratio_tap_changers_by_end, end, &self.doc.ratio_tap_changers)
    }

    pub fn phase_tap_changers_of(&self, end: &str) -> Vec<&PropertyBag> {
        self.lookup(&self.phase_tap_changers_by_end, end, &self.doc.phase_tap_changers)
    }

    /// Ratio tap changer table points ordered by step
    pub fn ratio_table(&self, table: &str) -> Vec<&PropertyBag> {
        self.lookup(&self.ratio_tables, table, &self.doc.ratio_tap_changer_table_points)
    }

    /// Phase tap changer table points ordered by step
    pub fn phase_table(&self, table: &str) -> Vec<&PropertyBag> {
        self.lookup(&self.phase_tables, table, &self.doc.phase_tap_changer_table_points)
    }

    pub fn regulating_control(&self, id: &str) -> Option<&PropertyBag> {
        self.regulating_controls
            .get(id)
            .map(|&i| &self.doc.regulating_controls[i])
    }

    pub fn equivalent_injections(&self) -> &[PropertyBag] {
        &self.doc.equivalent_injections
    }

    pub fn equivalent_injections_at_node(&self, node: &str) -> Vec<&PropertyBag> {
        self.lookup(
            &self.equivalent_injections_by_node,
            node,
            &self.doc.equivalent_injections,
        )
    }

    pub fn sv_injections(&self) -> &[PropertyBag] {
        &self.doc.sv_injections
    }

    pub fn control_areas(&self) -> &[PropertyBag] {
        &self.doc.control_areas
    }

    pub fn tie_flows_of(&self, area: &str) -> Vec<&PropertyBag> {
        self.lookup(&self.tie_flows_by_area, area, &self.doc.tie_flows)
    }

    fn lookup<'a>(
        &'a self,
        groups: &HashMap<String, Vec<usize>>,
        key: &str,
        records: &'a [PropertyBag],
    ) -> Vec<&'a PropertyBag> {
        groups
            .get(key)
            .map(|indices| indices.iter().map(|&i| &records[i]).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn model(value: serde_json::Value) -> GridResult<CgmesModel> {
        CgmesModel::from_json_str(&value.to_string())
    }

    #[test]
    fn test_terminals_ordered_by_sequence_number() {
        let m = model(json!({
            "terminals": [
                {"Terminal": "T2", "ConductingEquipment": "L1", "sequenceNumber": 2},
                {"Terminal": "T1", "ConductingEquipment": "L1", "sequenceNumber": 1},
            ]
        }))
        .unwrap();
        let ids: Vec<_> = m
            .terminals_of("L1")
            .iter()
            .filter_map(|t| t.id("Terminal"))
            .collect();
        assert_eq!(ids, vec!["T1", "T2"]);
        assert!(m.terminals_of("L2").is_empty());
    }

    #[test]
    fn test_transformer_ends_grouped_and_sorted() {
        let m = model(json!({
            "transformer_ends": [
                {"TransformerEnd": "E2", "PowerTransformer": "PT1", "endNumber": 2},
                {"TransformerEnd": "E1", "PowerTransformer": "PT1", "endNumber": 1, "name": "T1"},
                {"TransformerEnd": "E3", "PowerTransformer": "PT2", "endNumber": 1},
            ]
        }))
        .unwrap();
        let transformers = m.transformers();
        assert_eq!(transformers.len(), 2);
        assert_eq!(transformers[0].id, "PT1");
        assert_eq!(transformers[0].name, "T1");
        assert_eq!(transformers[0].ends[0].id("TransformerEnd").as_deref(), Some("E1"));
        assert_eq!(transformers[1].name, "PT2");
        assert_eq!(m.transformer_of_end("E3"), Some("PT2"));
    }

    #[test]
    fn test_tables_sorted_by_step() {
        let m = model(json!({
            "ratio_tap_changer_table_points": [
                {"RatioTapChangerTable": "RT", "step": 3, "ratio": 1.1},
                {"RatioTapChangerTable": "RT", "step": 1, "ratio": 0.9},
                {"RatioTapChangerTable": "RT", "step": 2, "ratio": 1.0},
            ]
        }))
        .unwrap();
        let steps: Vec<_> = m.ratio_table("RT").iter().map(|p| p.as_i32_or("step", 0)).collect();
        assert_eq!(steps, vec![1, 2, 3]);
        assert!(m.phase_table("RT").is_empty());
    }

    #[test]
    fn test_equivalent_injections_indexed_by_node() {
        let m = model(json!({
            "nodes": [{"TopologicalNode": "BN", "boundary": true}],
            "terminals": [{"Terminal": "T1", "ConductingEquipment": "EI1", "TopologicalNode": "BN"}],
            "equivalent_injections": [{"EquivalentInjection": "EI1", "p": 5.0}],
        }))
        .unwrap();
        assert_eq!(m.equivalent_injections_at_node("BN").len(), 1);
        assert!(m.is_boundary_node("BN"));
        assert!(!m.is_boundary_node("N1"));
    }

    #[test]
    fn test_duplicate_identifier_rejected() {
        let err = model(json!({
            "nodes": [{"TopologicalNode": "N1"}, {"TopologicalNode": "N1"}]
        }))
        .unwrap_err();
        assert!(matches!(err, GridError::Validation(_)));
    }

    #[test]
    fn test_record_without_identifier_rejected() {
        let err = model(json!({"ac_line_segments": [{"name": "no id"}]})).unwrap_err();
        assert!(err.to_string().contains("ACLineSegment"));
    }

    #[test]
    fn test_malformed_document_is_parse_error() {
        let err = CgmesModel::from_json_str("{ \"nodes\": 3 }").unwrap_err();
        assert!(matches!(err, GridError::Parse(_)));
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, r#"{"id": "grid", "nodes": [{"TopologicalNode": "N1"}]}"#).unwrap();
        let m = CgmesModel::from_path(&path).unwrap();
        assert_eq!(m.network_id(), "grid");
        assert!(m.node("N1").is_some());
    }
}
