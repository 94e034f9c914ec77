use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::{Diagram, Edge, Level, Node, NodeKind};

/// Level-1 process numbering: a whole number followed by ".0".
static LEVEL1_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[1-9][0-9]*\.0$").expect("level-1 number pattern"));

/// Process number reserved for the single Context-level process.
const CONTEXT_PROCESS_NUMBER: &str = "0.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleCode {
    #[serde(rename = "N-002")]
    N002,
    #[serde(rename = "N-003")]
    N003,
    #[serde(rename = "N-004")]
    N004,
    #[serde(rename = "E-001")]
    E001,
    #[serde(rename = "E-002")]
    E002,
    #[serde(rename = "E-003")]
    E003,
    #[serde(rename = "E-004")]
    E004,
    #[serde(rename = "E-005")]
    E005,
    #[serde(rename = "P-001")]
    P001,
    #[serde(rename = "P-002")]
    P002,
    #[serde(rename = "P-003")]
    P003,
    #[serde(rename = "D-001")]
    D001,
    #[serde(rename = "D-002")]
    D002,
    #[serde(rename = "L0-001")]
    L0001,
    #[serde(rename = "L1-001")]
    L1001,
}

impl std::fmt::Display for RuleCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            RuleCode::N002 => "N-002",
            RuleCode::N003 => "N-003",
            RuleCode::N004 => "N-004",
            RuleCode::E001 => "E-001",
            RuleCode::E002 => "E-002",
            RuleCode::E003 => "E-003",
            RuleCode::E004 => "E-004",
            RuleCode::E005 => "E-005",
            RuleCode::P001 => "P-001",
            RuleCode::P002 => "P-002",
            RuleCode::P003 => "P-003",
            RuleCode::D001 => "D-001",
            RuleCode::D002 => "D-002",
            RuleCode::L0001 => "L0-001",
            RuleCode::L1001 => "L1-001",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub rule: RuleCode,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge: Option<String>,
}

impl Finding {
    fn for_node(rule: RuleCode, severity: Severity, node: &Node, message: String) -> Self {
        Self {
            rule,
            severity,
            message,
            node: Some(node.id.clone()),
            edge: None,
        }
    }

    fn for_edge(rule: RuleCode, severity: Severity, edge: &Edge, message: String) -> Self {
        Self {
            rule,
            severity,
            message,
            node: None,
            edge: Some(edge.id.clone()),
        }
    }
}

fn display_name(node: &Node) -> &str {
    if node.label.trim().is_empty() {
        &node.id
    } else {
        &node.label
    }
}

/// Check the whole diagram against the DFD well-formedness rules.
/// Deterministic over the snapshot: nodes in diagram order, then edges,
/// then the per-level diagram rules, so repeated runs are identical.
pub fn validate(diagram: &Diagram) -> Vec<Finding> {
    let mut findings = Vec::new();

    for node in &diagram.nodes {
        check_node(diagram, node, &mut findings);
    }
    for edge in &diagram.edges {
        check_edge(diagram, edge, &mut findings);
    }
    check_context_level(diagram, &mut findings);
    check_level_one(diagram, &mut findings);

    findings
}

fn check_node(diagram: &Diagram, node: &Node, findings: &mut Vec<Finding>) {
    match &node.kind {
        NodeKind::Process { process_number, .. } => {
            if process_number.trim().is_empty() || node.label.trim().is_empty() {
                findings.push(Finding::for_node(
                    RuleCode::N002,
                    Severity::Error,
                    node,
                    format!("Process {:?} needs a process number and a name", display_name(node)),
                ));
            }
        }
        NodeKind::DataStore { store_code, .. } => {
            if store_code.trim().is_empty() {
                findings.push(Finding::for_node(
                    RuleCode::N003,
                    Severity::Error,
                    node,
                    format!("Data store {:?} needs a store code", display_name(node)),
                ));
            }
        }
        NodeKind::Entity { .. } | NodeKind::ExternalProcessRef { .. } => {}
    }

    let mut incoming = 0usize;
    let mut outgoing = 0usize;
    let mut self_loop = false;
    for edge in diagram.incident_edges(&node.id, node.level) {
        if edge.source == node.id {
            outgoing += 1;
        }
        if edge.target == node.id {
            incoming += 1;
        }
        if edge.source == node.id && edge.target == node.id {
            self_loop = true;
        }
    }

    if incoming + outgoing == 0 {
        findings.push(Finding::for_node(
            RuleCode::N004,
            Severity::Warning,
            node,
            format!("{:?} has no data flows", display_name(node)),
        ));
    }

    if matches!(node.kind, NodeKind::Process { .. }) {
        if incoming == 0 {
            findings.push(Finding::for_node(
                RuleCode::P001,
                Severity::Error,
                node,
                format!("Process {:?} has no incoming data flow", display_name(node)),
            ));
        }
        if outgoing == 0 {
            findings.push(Finding::for_node(
                RuleCode::P002,
                Severity::Error,
                node,
                format!("Process {:?} has no outgoing data flow", display_name(node)),
            ));
        }
        if self_loop {
            findings.push(Finding::for_node(
                RuleCode::P003,
                Severity::Warning,
                node,
                format!("Process {:?} flows into itself", display_name(node)),
            ));
        }
    }
}

fn check_edge(diagram: &Diagram, edge: &Edge, findings: &mut Vec<Finding>) {
    if edge.label.trim().is_empty() {
        findings.push(Finding::for_edge(
            RuleCode::E001,
            Severity::Error,
            edge,
            "Data flow needs a label".to_string(),
        ));
    }

    let source = diagram.node_at(&edge.source, edge.level);
    let target = diagram.node_at(&edge.target, edge.level);
    let (Some(source), Some(target)) = (source, target) else {
        // A dangling endpoint invalidates the remaining per-edge checks.
        findings.push(Finding::for_edge(
            RuleCode::E002,
            Severity::Error,
            edge,
            "Data flow references a node that no longer exists".to_string(),
        ));
        return;
    };

    let source_entity = matches!(source.kind, NodeKind::Entity { .. });
    let target_entity = matches!(target.kind, NodeKind::Entity { .. });
    let source_store = matches!(source.kind, NodeKind::DataStore { .. });
    let target_store = matches!(target.kind, NodeKind::DataStore { .. });

    if source_entity && target_entity {
        findings.push(Finding::for_edge(
            RuleCode::E003,
            Severity::Error,
            edge,
            format!(
                "Entities {:?} and {:?} cannot exchange data directly",
                display_name(source),
                display_name(target)
            ),
        ));
    } else if source_store && target_store {
        findings.push(Finding::for_edge(
            RuleCode::E004,
            Severity::Error,
            edge,
            format!(
                "Data stores {:?} and {:?} cannot exchange data directly",
                display_name(source),
                display_name(target)
            ),
        ));
    } else if (source_entity && target_store) || (source_store && target_entity) {
        findings.push(Finding::for_edge(
            RuleCode::E005,
            Severity::Error,
            edge,
            "An entity and a data store must exchange data through a process".to_string(),
        ));
    }
}

fn context_processes(diagram: &Diagram) -> Vec<&Node> {
    diagram
        .nodes_at(Level::Context)
        .filter(|node| matches!(node.kind, NodeKind::Process { .. }))
        .collect()
}

fn check_context_level(diagram: &Diagram, findings: &mut Vec<Finding>) {
    let processes = context_processes(diagram);
    if processes.len() != 1 {
        findings.push(Finding {
            rule: RuleCode::D001,
            severity: Severity::Error,
            message: format!(
                "The context diagram must contain exactly one process, found {}",
                processes.len()
            ),
            node: None,
            edge: None,
        });
    }
    if let [process] = processes.as_slice()
        && process.process_number() != Some(CONTEXT_PROCESS_NUMBER)
    {
        findings.push(Finding::for_node(
            RuleCode::L0001,
            Severity::Error,
            process,
            format!(
                "The context process must be numbered {CONTEXT_PROCESS_NUMBER}, found {:?}",
                process.process_number().unwrap_or("")
            ),
        ));
    }
    for node in diagram.nodes_at(Level::Context) {
        if matches!(node.kind, NodeKind::DataStore { .. }) {
            findings.push(Finding::for_node(
                RuleCode::D002,
                Severity::Error,
                node,
                format!(
                    "Data store {:?} does not belong on the context diagram",
                    display_name(node)
                ),
            ));
        }
    }
}

fn check_level_one(diagram: &Diagram, findings: &mut Vec<Finding>) {
    for node in diagram.nodes_at(Level::One) {
        if let NodeKind::Process { process_number, .. } = &node.kind
            && !LEVEL1_NUMBER.is_match(process_number)
        {
            findings.push(Finding::for_node(
                RuleCode::L1001,
                Severity::Error,
                node,
                format!(
                    "Level-1 process number {process_number:?} must be a whole number ending in .0"
                ),
            ));
        }
    }
}

/// Trim the raw findings down to what the panel actually shows.
///
/// D-001 is dropped whenever exactly one context process exists: a known
/// over-trigger suppressed as such, not recomputed. On a diagram with no
/// edges yet, all non-errors disappear and so do the empty-process rules
/// (N-004, P-001, P-002, L0-001): a brand-new diagram should not open with
/// a wall of "nothing is connected" findings.
pub fn filter_for_display(findings: Vec<Finding>, diagram: &Diagram) -> Vec<Finding> {
    let single_context_process = context_processes(diagram).len() == 1;
    let no_edges = diagram.edges.is_empty();

    findings
        .into_iter()
        .filter(|finding| {
            if finding.rule == RuleCode::D001 && single_context_process {
                return false;
            }
            if no_edges {
                if finding.severity != Severity::Error {
                    return false;
                }
                if matches!(
                    finding.rule,
                    RuleCode::N004 | RuleCode::P001 | RuleCode::P002 | RuleCode::L0001
                ) {
                    return false;
                }
            }
            true
        })
        .collect()
}
