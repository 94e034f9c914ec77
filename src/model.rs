use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::geometry::Point;

/// Nesting depth of a DFD view. All three levels coexist in one diagram;
/// each view filters nodes and edges by its level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Level {
    Context,
    One,
    Two,
}

impl Level {
    pub fn all() -> [Level; 3] {
        [Level::Context, Level::One, Level::Two]
    }
}

impl TryFrom<u8> for Level {
    type Error = ModelError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Level::Context),
            1 => Ok(Level::One),
            2 => Ok(Level::Two),
            other => Err(ModelError::UnknownLevel(other)),
        }
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> u8 {
        match level {
            Level::Context => 0,
            Level::One => 1,
            Level::Two => 2,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("invalid diagram JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("level must be 0, 1 or 2, got {0}")]
    UnknownLevel(u8),
    #[error("duplicate node id {id:?} at level {level}")]
    DuplicateNode { id: String, level: u8 },
    #[error("duplicate edge id {id:?}")]
    DuplicateEdge { id: String },
}

fn default_entity_side() -> f32 {
    120.0
}

fn default_box_width() -> f32 {
    160.0
}

fn default_box_height() -> f32 {
    80.0
}

fn default_diameter() -> f32 {
    200.0
}

/// Shape-bearing variant of a node. Matching is exhaustive everywhere a
/// node's geometry or semantics is consulted, so adding a variant forces
/// every switch site to be revisited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NodeKind {
    #[serde(rename_all = "camelCase")]
    Entity {
        #[serde(default = "default_entity_side")]
        width: f32,
        #[serde(default = "default_entity_side")]
        height: f32,
    },
    #[serde(rename_all = "camelCase")]
    Process {
        process_number: String,
        #[serde(default = "default_diameter")]
        diameter: f32,
    },
    #[serde(rename_all = "camelCase")]
    DataStore {
        store_code: String,
        #[serde(default = "default_box_width")]
        width: f32,
        #[serde(default = "default_box_height")]
        height: f32,
    },
    #[serde(rename_all = "camelCase")]
    ExternalProcessRef {
        process_number: String,
        #[serde(default = "default_box_width")]
        width: f32,
        #[serde(default = "default_box_height")]
        height: f32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    pub label: String,
    pub level: Level,
    pub position: Point,
    /// Owning Level-1 process for a Level-2 node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_process: Option<String>,
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl Node {
    /// Bounding-box size. Processes report their diameter on both axes.
    pub fn size(&self) -> (f32, f32) {
        match &self.kind {
            NodeKind::Entity { width, height } => (*width, *height),
            NodeKind::Process { diameter, .. } => (*diameter, *diameter),
            NodeKind::DataStore { width, height, .. } => (*width, *height),
            NodeKind::ExternalProcessRef { width, height, .. } => (*width, *height),
        }
    }

    pub fn center(&self) -> (f32, f32) {
        let (w, h) = self.size();
        (self.position.x + w / 2.0, self.position.y + h / 2.0)
    }

    pub fn is_circular(&self) -> bool {
        matches!(self.kind, NodeKind::Process { .. })
    }

    pub fn radius(&self) -> f32 {
        self.size().0 / 2.0
    }

    pub fn process_number(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Process { process_number, .. } => Some(process_number),
            NodeKind::ExternalProcessRef { process_number, .. } => Some(process_number),
            _ => None,
        }
    }
}

/// Preferred routing shape for an edge. Absent means "engine default":
/// side-derived L-shape at levels 0/1, smart step routing at level 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RouteMode {
    HorizontalFirst,
    VerticalFirst,
    Smart,
}

fn default_label_offset() -> f32 {
    0.5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    pub label: String,
    #[serde(rename = "sourceNodeId")]
    pub source: String,
    #[serde(rename = "targetNodeId")]
    pub target: String,
    pub level: Level,
    /// Manual handle adjustment at the source endpoint. Degrees for circular
    /// nodes, encoded side-selector for rectangular ones; 0.0 means unset.
    #[serde(default)]
    pub source_offset: f32,
    #[serde(default)]
    pub target_offset: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<RouteMode>,
    /// Fractional label position along the rendered path, live range [0.1, 0.9].
    #[serde(default = "default_label_offset")]
    pub label_offset: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagram {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub system_name: String,
    /// Currently active view.
    pub level: Level,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_diagram: Option<String>,
}

impl Diagram {
    /// Parse a diagram snapshot from JSON. Dangling edge references are
    /// allowed (they are a validation finding, not a load failure); duplicate
    /// ids are rejected here because nothing downstream can disambiguate them.
    pub fn from_json(input: &str) -> Result<Diagram, ModelError> {
        let diagram: Diagram = serde_json::from_str(input)?;
        let mut seen_nodes: HashSet<(u8, &str)> = HashSet::new();
        for node in &diagram.nodes {
            if !seen_nodes.insert((node.level.into(), node.id.as_str())) {
                return Err(ModelError::DuplicateNode {
                    id: node.id.clone(),
                    level: node.level.into(),
                });
            }
        }
        let mut seen_edges: HashSet<&str> = HashSet::new();
        for edge in &diagram.edges {
            if !seen_edges.insert(edge.id.as_str()) {
                return Err(ModelError::DuplicateEdge {
                    id: edge.id.clone(),
                });
            }
        }
        Ok(diagram)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Level-aware lookup. Ids are only unique per level, so any consumer
    /// resolving an edge endpoint must use this rather than [`Self::node`].
    pub fn node_at(&self, id: &str, level: Level) -> Option<&Node> {
        self.nodes
            .iter()
            .find(|node| node.level == level && node.id == id)
    }

    pub fn nodes_at(&self, level: Level) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |node| node.level == level)
    }

    pub fn edges_at(&self, level: Level) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |edge| edge.level == level)
    }

    /// Edges at `level` touching `node_id`. The level must be passed in
    /// because node ids are only unique within one level.
    pub fn incident_edges<'a>(
        &'a self,
        node_id: &'a str,
        level: Level,
    ) -> impl Iterator<Item = &'a Edge> {
        self.edges.iter().filter(move |edge| {
            edge.level == level && (edge.source == node_id || edge.target == node_id)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity_json(id: &str) -> String {
        format!(
            r#"{{"id":"{id}","label":"Customer","level":0,
                "position":{{"x":10.0,"y":20.0}},"type":"entity"}}"#
        )
    }

    #[test]
    fn parses_minimal_diagram() {
        let json = format!(
            r#"{{"id":"d1","name":"Orders","level":0,
                "nodes":[{}],
                "edges":[]}}"#,
            entity_json("e1")
        );
        let diagram = Diagram::from_json(&json).expect("parse failed");
        assert_eq!(diagram.nodes.len(), 1);
        assert_eq!(diagram.nodes[0].size(), (120.0, 120.0));
        assert_eq!(diagram.level, Level::Context);
    }

    #[test]
    fn entity_defaults_are_square() {
        let json = format!(
            r#"{{"id":"d1","name":"n","level":1,"nodes":[{}],"edges":[]}}"#,
            entity_json("e1")
        );
        let diagram = Diagram::from_json(&json).expect("parse failed");
        let (w, h) = diagram.nodes[0].size();
        assert_eq!(w, h);
    }

    #[test]
    fn process_kind_roundtrips_through_json() {
        let node = Node {
            id: "p1".to_string(),
            label: "Take order".to_string(),
            level: Level::One,
            position: Point { x: 0.0, y: 0.0 },
            parent_process: None,
            kind: NodeKind::Process {
                process_number: "1.0".to_string(),
                diameter: 200.0,
            },
        };
        let json = serde_json::to_string(&node).expect("serialize failed");
        assert!(json.contains(r#""type":"process""#), "tag missing: {json}");
        let back: Node = serde_json::from_str(&json).expect("deserialize failed");
        assert_eq!(back, node);
    }

    #[test]
    fn rejects_duplicate_node_id_on_same_level() {
        let json = format!(
            r#"{{"id":"d1","name":"n","level":0,
                "nodes":[{},{}],"edges":[]}}"#,
            entity_json("e1"),
            entity_json("e1")
        );
        let err = Diagram::from_json(&json).unwrap_err();
        assert!(matches!(err, ModelError::DuplicateNode { .. }));
    }

    #[test]
    fn same_id_on_different_levels_is_allowed() {
        let mut second = entity_json("e1");
        second = second.replace(r#""level":0"#, r#""level":1"#);
        let json = format!(
            r#"{{"id":"d1","name":"n","level":0,
                "nodes":[{},{}],"edges":[]}}"#,
            entity_json("e1"),
            second
        );
        assert!(Diagram::from_json(&json).is_ok());
    }

    #[test]
    fn dangling_edge_reference_is_not_a_parse_error() {
        let json = format!(
            r#"{{"id":"d1","name":"n","level":0,
                "nodes":[{}],
                "edges":[{{"id":"f1","label":"order","sourceNodeId":"e1",
                           "targetNodeId":"ghost","level":0}}]}}"#,
            entity_json("e1")
        );
        let diagram = Diagram::from_json(&json).expect("parse failed");
        assert_eq!(diagram.edges.len(), 1);
        assert_eq!(diagram.edges[0].label_offset, 0.5);
    }
}
