pub mod handles;
pub mod label;
pub mod routing;

pub use handles::{
    Endpoint, HandleSpot, NodeHandles, Placement, ResizeRequest, allocate_node_handles,
    decode_side_position, drag_circle_offset, drag_rect_position, encode_side_position,
};
pub use label::{anchor_at, anchor_on_points, nudge_offset};
pub use routing::{PathSegment, next_route_mode, path_svg, resolve_route_mode};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::{EngineConfig, ViewFlags};
use crate::geometry::{Side, side_of_angle};
use crate::model::{Diagram, Level, RouteMode};

/// Fully routed edge, ready for the canvas layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeLayout {
    pub id: String,
    pub mode: RouteMode,
    /// Bend polyline without jump decorations.
    pub points: Vec<(f32, f32)>,
    /// Drawable segments, jump arcs included.
    pub segments: Vec<PathSegment>,
    /// SVG path syntax for the segments.
    pub path: String,
    pub label_anchor: (f32, f32),
    pub label_offset: f32,
}

/// Result of one layout pass over a single level's slice of the diagram.
/// A pure function of the snapshot: recomputing on an unchanged diagram
/// yields an identical value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelLayout {
    pub level: Level,
    pub view: ViewFlags,
    pub handles: BTreeMap<String, NodeHandles>,
    pub edges: Vec<EdgeLayout>,
    /// Debounce-worthy growth wishes; the store applies them, not us.
    pub resize_requests: Vec<ResizeRequest>,
}

struct ResolvedEndpoint {
    point: (f32, f32),
    side: Side,
}

/// Lay out one level: allocate handles on every node, resolve each edge's
/// endpoints, route, decorate crossings, and place label anchors.
pub fn compute_level_layout(diagram: &Diagram, level: Level, config: &EngineConfig) -> LevelLayout {
    let mut handles: BTreeMap<String, NodeHandles> = BTreeMap::new();
    let mut resize_requests = Vec::new();
    for node in diagram.nodes_at(level) {
        let allocated = allocate_node_handles(diagram, node, &config.handles);
        if let Some(grow) = &allocated.grow {
            resize_requests.push(grow.clone());
        }
        handles.insert(node.id.clone(), allocated);
    }

    // Endpoint lookup over every allocated spot.
    let mut endpoints: BTreeMap<(String, bool), ResolvedEndpoint> = BTreeMap::new();
    for allocated in handles.values() {
        for spot in &allocated.spots {
            let side = match spot.placement {
                Placement::Rect { side, .. } => side,
                Placement::Circle { angle_deg } => side_of_angle(angle_deg),
            };
            endpoints.insert(
                (spot.edge.clone(), spot.endpoint == Endpoint::Source),
                ResolvedEndpoint {
                    point: spot.point,
                    side,
                },
            );
        }
    }

    // First pass: mode and bend polyline per edge.
    let mut routed: Vec<(String, RouteMode, Vec<(f32, f32)>, f32)> = Vec::new();
    for edge in diagram.edges_at(level) {
        let source = endpoints.get(&(edge.id.clone(), true));
        let target = endpoints.get(&(edge.id.clone(), false));
        let (start, source_side) = match source {
            Some(resolved) => (resolved.point, resolved.side),
            None => (fallback_point(diagram, &edge.target, level), Side::Right),
        };
        let (end, target_side) = match target {
            Some(resolved) => (resolved.point, resolved.side),
            None => (fallback_point(diagram, &edge.source, level), Side::Left),
        };
        let mode = resolve_route_mode(edge.route, level, source_side);
        let points = match mode {
            RouteMode::Smart => routing::smart_step_path(
                start,
                source_side,
                end,
                target_side,
                config.routing.smart_stub,
            ),
            RouteMode::HorizontalFirst | RouteMode::VerticalFirst => {
                routing::l_path(start, end, mode)
            }
        };
        let label_offset = edge
            .label_offset
            .clamp(config.label.min_offset, config.label.max_offset);
        routed.push((edge.id.clone(), mode, points, label_offset));
    }

    // Second pass: jump decoration against the other manual edges, then
    // label anchors over the final segments.
    let edges = routed
        .iter()
        .map(|(id, mode, points, label_offset)| {
            let others: Vec<Vec<(f32, f32)>> = if *mode == RouteMode::Smart {
                Vec::new()
            } else {
                routed
                    .iter()
                    .filter(|(other_id, other_mode, _, _)| {
                        other_id != id && *other_mode != RouteMode::Smart
                    })
                    .map(|(_, _, other_points, _)| other_points.clone())
                    .collect()
            };
            let segments = routing::build_path(points, &others, config.routing.jump_radius);
            let path = path_svg(&segments);
            let label_anchor = if segments.is_empty() {
                points.first().copied().unwrap_or((0.0, 0.0))
            } else {
                anchor_at(&segments, *label_offset)
            };
            EdgeLayout {
                id: id.clone(),
                mode: *mode,
                points: points.clone(),
                segments,
                path,
                label_anchor,
                label_offset: *label_offset,
            }
        })
        .collect();

    LevelLayout {
        level,
        view: config.view,
        handles,
        edges,
        resize_requests,
    }
}

/// Degenerate endpoint for a dangling reference: the opposite node's
/// center when it still exists, the origin otherwise. A rendering
/// degradation only; E-002 reports the real problem.
fn fallback_point(diagram: &Diagram, opposite_id: &str, level: Level) -> (f32, f32) {
    diagram
        .node_at(opposite_id, level)
        .map(|node| node.center())
        .unwrap_or((0.0, 0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::model::{Edge, Node, NodeKind};

    fn node(id: &str, kind: NodeKind, level: Level, x: f32, y: f32) -> Node {
        Node {
            id: id.to_string(),
            label: id.to_string(),
            level,
            position: Point::new(x, y),
            parent_process: None,
            kind,
        }
    }

    fn entity(id: &str, level: Level, x: f32, y: f32) -> Node {
        node(
            id,
            NodeKind::Entity {
                width: 120.0,
                height: 120.0,
            },
            level,
            x,
            y,
        )
    }

    fn process(id: &str, number: &str, level: Level, x: f32, y: f32) -> Node {
        node(
            id,
            NodeKind::Process {
                process_number: number.to_string(),
                diameter: 200.0,
            },
            level,
            x,
            y,
        )
    }

    fn flow(id: &str, source: &str, target: &str, level: Level) -> Edge {
        Edge {
            id: id.to_string(),
            label: id.to_string(),
            source: source.to_string(),
            target: target.to_string(),
            level,
            source_offset: 0.0,
            target_offset: 0.0,
            route: None,
            label_offset: 0.5,
        }
    }

    fn diagram(level: Level, nodes: Vec<Node>, edges: Vec<Edge>) -> Diagram {
        Diagram {
            id: "d".to_string(),
            name: "d".to_string(),
            system_name: String::new(),
            level,
            nodes,
            edges,
            parent_diagram: None,
        }
    }

    #[test]
    fn level_two_edges_default_to_smart_routing() {
        let d = diagram(
            Level::Two,
            vec![
                entity("a", Level::Two, 0.0, 0.0),
                entity("b", Level::Two, 600.0, 400.0),
            ],
            vec![flow("f", "a", "b", Level::Two)],
        );
        let layout = compute_level_layout(&d, Level::Two, &EngineConfig::default());
        assert_eq!(layout.edges[0].mode, RouteMode::Smart);
        assert!(
            layout.edges[0].points.len() >= 3,
            "smart path should bend: {:?}",
            layout.edges[0].points
        );
    }

    #[test]
    fn outer_levels_route_with_l_shapes() {
        let d = diagram(
            Level::Context,
            vec![
                entity("a", Level::Context, 0.0, 0.0),
                process("p", "0.0", Level::Context, 600.0, 0.0),
            ],
            vec![flow("f", "a", "p", Level::Context)],
        );
        let layout = compute_level_layout(&d, Level::Context, &EngineConfig::default());
        assert_ne!(layout.edges[0].mode, RouteMode::Smart);
        assert!(layout.edges[0].points.len() <= 3);
    }

    #[test]
    fn dangling_edge_degrades_without_panicking() {
        let d = diagram(
            Level::Context,
            vec![entity("a", Level::Context, 100.0, 100.0)],
            vec![flow("f", "a", "gone", Level::Context)],
        );
        let layout = compute_level_layout(&d, Level::Context, &EngineConfig::default());
        assert_eq!(layout.edges.len(), 1);
        // The missing target resolves to the source node's center.
        let end = *layout.edges[0].points.last().expect("non-empty path");
        assert_eq!(end, (160.0, 160.0));
    }

    #[test]
    fn fully_dangling_edge_routes_to_the_origin() {
        let d = diagram(
            Level::Context,
            Vec::new(),
            vec![flow("f", "ghost1", "ghost2", Level::Context)],
        );
        let layout = compute_level_layout(&d, Level::Context, &EngineConfig::default());
        assert_eq!(layout.edges[0].points, vec![(0.0, 0.0)]);
        assert_eq!(layout.edges[0].label_anchor, (0.0, 0.0));
    }

    #[test]
    fn layout_is_idempotent() {
        let d = diagram(
            Level::Context,
            vec![
                entity("a", Level::Context, 0.0, 0.0),
                entity("b", Level::Context, 0.0, 500.0),
                process("p", "0.0", Level::Context, 500.0, 200.0),
            ],
            vec![
                flow("f1", "a", "p", Level::Context),
                flow("f2", "p", "b", Level::Context),
            ],
        );
        let config = EngineConfig::default();
        let first = compute_level_layout(&d, Level::Context, &config);
        let second = compute_level_layout(&d, Level::Context, &config);
        assert_eq!(first, second);
    }

    #[test]
    fn crossing_manual_edges_pick_up_jump_arcs() {
        // Two L-shaped edges forced to cross: one horizontal-first from the
        // left, one vertical-first dropping through it.
        let mut e1 = flow("f1", "a", "b", Level::Context);
        e1.route = Some(RouteMode::HorizontalFirst);
        let mut e2 = flow("f2", "c", "d", Level::Context);
        e2.route = Some(RouteMode::VerticalFirst);
        let d = diagram(
            Level::Context,
            vec![
                entity("a", Level::Context, 0.0, 300.0),
                entity("b", Level::Context, 800.0, 300.0),
                entity("c", Level::Context, 400.0, 0.0),
                entity("d", Level::Context, 400.0, 700.0),
            ],
            vec![e1, e2],
        );
        let layout = compute_level_layout(&d, Level::Context, &EngineConfig::default());
        let arc_count: usize = layout
            .edges
            .iter()
            .flat_map(|edge| edge.segments.iter())
            .filter(|segment| matches!(segment, PathSegment::Arc { .. }))
            .count();
        assert!(arc_count >= 1, "expected at least one jump arc");
    }

    #[test]
    fn view_flags_ride_along_as_data() {
        let mut config = EngineConfig::default();
        config.view.show_grid = true;
        let d = diagram(Level::Context, Vec::new(), Vec::new());
        let layout = compute_level_layout(&d, Level::Context, &config);
        assert!(layout.view.show_grid);
    }
}
