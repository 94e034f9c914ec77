use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::HandleConfig;
use crate::geometry::{
    Side, arc_gap_deg, circle_point, normalize_deg, rect_side_point, signed_delta_deg,
};
use crate::model::{Diagram, Edge, Node, NodeKind};

// ── Encoded side-selector ranges ────────────────────────────────────
/// Width of one side's slice of the encoded 0–100 scalar.
const SIDE_SLICE: f32 = 25.0;

// ── Quadrant scheme (circular nodes) ────────────────────────────────
/// Absolute quadrant centers, clockwise screen degrees, cycled in this
/// order as peers are added around a process.
const QUADRANT_ANGLES: [f32; 4] = [270.0, 0.0, 90.0, 180.0];
/// Angular span owned by one quadrant.
const QUADRANT_SPAN: f32 = 90.0;

// ── Rect defaults ───────────────────────────────────────────────────
/// Default offsets keeping a single peer's in/out handles clustered but
/// disjoint on a shared side.
const DEFAULT_IN_OFFSET: f32 = 40.0;
const DEFAULT_OUT_OFFSET: f32 = 60.0;

/// Which end of an edge a handle belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
    Source,
    Target,
}

/// A handle's rendering placement on its node's boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum Placement {
    Rect { side: Side, offset: f32 },
    Circle { angle_deg: f32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleSpot {
    pub edge: String,
    pub endpoint: Endpoint,
    /// Direction relative to the node carrying the handle.
    pub incoming: bool,
    pub placement: Placement,
    pub point: (f32, f32),
}

/// Requested minimum node size when the incident handles cannot fit with
/// the configured spacing. Circular nodes report `width == height ==` the
/// new diameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResizeRequest {
    pub node: String,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeHandles {
    pub node: String,
    pub spots: Vec<HandleSpot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grow: Option<ResizeRequest>,
}

// ── Encoded side-selector ───────────────────────────────────────────

/// Collapse a side + percentage into the single scalar persisted on the
/// edge: `[0,25)` top, `[25,50)` right, `[50,75)` bottom, `[75,100]` left.
/// `encode(Top, 0.0)` lands on 0.0, which readers treat as "unset"; an
/// accepted boundary artifact of the reserved zero.
pub fn encode_side_position(side: Side, offset: f32) -> f32 {
    let base = match side {
        Side::Top => 0.0,
        Side::Right => 25.0,
        Side::Bottom => 50.0,
        Side::Left => 75.0,
    };
    base + offset.clamp(0.0, 100.0) / 100.0 * SIDE_SLICE
}

/// Inverse of [`encode_side_position`]. Zero means "no stored position".
/// Values exactly on a slice boundary (25, 50, 75) decode to the following
/// side because the slices are half-open; this discontinuity is documented
/// behavior, not something to paper over.
pub fn decode_side_position(value: f32) -> Option<(Side, f32)> {
    if value == 0.0 {
        return None;
    }
    let value = value.clamp(0.0, 100.0);
    let (side, base) = if value < 25.0 {
        (Side::Top, 0.0)
    } else if value < 50.0 {
        (Side::Right, 25.0)
    } else if value < 75.0 {
        (Side::Bottom, 50.0)
    } else {
        (Side::Left, 75.0)
    };
    Some((side, (value - base) / SIDE_SLICE * 100.0))
}

/// Default handle position for a rectangular node with no opposite node to
/// aim at and no stored selector.
pub fn default_rect_position(kind: &NodeKind) -> (Side, f32) {
    match kind {
        NodeKind::Entity { .. } => (Side::Right, 50.0),
        NodeKind::DataStore { .. } => (Side::Bottom, 50.0),
        NodeKind::ExternalProcessRef { .. } => (Side::Left, 50.0),
        // Processes never take the rectangular path; pick something visible
        // if one ever does.
        NodeKind::Process { .. } => (Side::Right, 50.0),
    }
}

/// New stored offset while dragging a circular handle: the manual delta
/// follows the cursor continuously, with the step normalized into
/// (-180, 180] so crossing the 0/360 seam never flips the handle around.
pub fn drag_circle_offset(old_offset: f32, visual_angle_deg: f32, mouse_angle_deg: f32) -> f32 {
    normalize_deg(old_offset + signed_delta_deg(visual_angle_deg, mouse_angle_deg))
}

/// New encoded selector for a rectangular handle dragged to `mouse`:
/// project onto the nearest side and encode the percentage there.
pub fn drag_rect_position(node: &Node, mouse: (f32, f32)) -> f32 {
    let (w, h) = node.size();
    let (x, y) = (node.position.x, node.position.y);
    let clamped_x = mouse.0.clamp(x, x + w);
    let clamped_y = mouse.1.clamp(y, y + h);
    let to_top = (mouse.1 - y).abs();
    let to_bottom = (mouse.1 - (y + h)).abs();
    let to_left = (mouse.0 - x).abs();
    let to_right = (mouse.0 - (x + w)).abs();
    let min = to_top.min(to_bottom).min(to_left).min(to_right);
    let (side, offset) = if min == to_top {
        (Side::Top, pct(clamped_x - x, w))
    } else if min == to_bottom {
        (Side::Bottom, pct(clamped_x - x, w))
    } else if min == to_left {
        (Side::Left, pct(clamped_y - y, h))
    } else {
        (Side::Right, pct(clamped_y - y, h))
    };
    encode_side_position(side, offset)
}

fn pct(value: f32, length: f32) -> f32 {
    if length <= 0.0 {
        return 50.0;
    }
    (value / length * 100.0).clamp(0.0, 100.0)
}

/// Compute rendering placements for every edge endpoint touching `node`.
/// Pure over the snapshot: stored offsets are read, never written. The one
/// mutation the allocator ever wants, growing an overcrowded node, comes
/// back as a [`ResizeRequest`] for the caller to debounce.
pub fn allocate_node_handles(diagram: &Diagram, node: &Node, config: &HandleConfig) -> NodeHandles {
    let incidences = collect_incidences(diagram, node);
    if incidences.is_empty() {
        return NodeHandles {
            node: node.id.clone(),
            spots: Vec::new(),
            grow: None,
        };
    }
    if node.is_circular() {
        allocate_circle(diagram, node, incidences, config)
    } else {
        allocate_rect(diagram, node, incidences, config)
    }
}

struct Incidence<'a> {
    edge: &'a Edge,
    endpoint: Endpoint,
    incoming: bool,
    /// Node on the other end, if it still exists.
    opposite: Option<&'a Node>,
}

fn collect_incidences<'a>(diagram: &'a Diagram, node: &'a Node) -> Vec<Incidence<'a>> {
    let mut out = Vec::new();
    for edge in diagram.incident_edges(&node.id, node.level) {
        if edge.source == node.id {
            out.push(Incidence {
                edge,
                endpoint: Endpoint::Source,
                incoming: false,
                opposite: diagram.node_at(&edge.target, node.level),
            });
        }
        if edge.target == node.id {
            out.push(Incidence {
                edge,
                endpoint: Endpoint::Target,
                incoming: true,
                opposite: diagram.node_at(&edge.source, node.level),
            });
        }
    }
    out
}

fn stored_offset(inc: &Incidence<'_>) -> f32 {
    match inc.endpoint {
        Endpoint::Source => inc.edge.source_offset,
        Endpoint::Target => inc.edge.target_offset,
    }
}

// ── Rectangular allocation ──────────────────────────────────────────

fn allocate_rect(
    _diagram: &Diagram,
    node: &Node,
    incidences: Vec<Incidence<'_>>,
    config: &HandleConfig,
) -> NodeHandles {
    let (w, h) = node.size();
    let center = node.center();

    // Resolve each endpoint to a side + percentage: the stored selector
    // wins; otherwise face the opposite node and keep incoming/outgoing
    // handles on disjoint default offsets.
    let mut resolved: Vec<(usize, Side, f32)> = Vec::with_capacity(incidences.len());
    for (idx, inc) in incidences.iter().enumerate() {
        let stored = stored_offset(inc);
        let (side, offset) = match decode_side_position(stored) {
            Some(position) => position,
            None => match inc.opposite {
                Some(other) => {
                    let side =
                        crate::geometry::side_of_angle(crate::geometry::angle_of(center, other.center()));
                    let offset = if inc.incoming {
                        DEFAULT_IN_OFFSET
                    } else {
                        DEFAULT_OUT_OFFSET
                    };
                    (side, offset)
                }
                None => default_rect_position(&node.kind),
            },
        };
        resolved.push((idx, side, offset));
    }

    // Relaxation per side, rendering-only.
    let mut grow: Option<ResizeRequest> = None;
    let mut by_side: BTreeMap<u8, Vec<usize>> = BTreeMap::new();
    for (slot, (_, side, _)) in resolved.iter().enumerate() {
        by_side.entry(side_rank(*side)).or_default().push(slot);
    }
    for (rank, slots) in &by_side {
        let side = rank_side(*rank);
        let side_len = if side.is_horizontal() { w } else { h };
        let needed = config.min_gap_px * slots.len() as f32;
        if needed > side_len && slots.len() > 1 {
            grow = Some(merge_rect_growth(grow, node, side, needed));
        }
        if side_len <= 0.0 {
            continue;
        }
        let min_gap_pct = config.min_gap_px / side_len * 100.0;
        let mut offsets: Vec<(usize, f32)> =
            slots.iter().map(|&slot| (slot, resolved[slot].2)).collect();
        relax_line(&mut offsets, min_gap_pct, config.relax_iterations);
        for (slot, offset) in offsets {
            resolved[slot].2 = offset;
        }
    }

    let spots = resolved
        .into_iter()
        .map(|(idx, side, offset)| {
            let inc = &incidences[idx];
            HandleSpot {
                edge: inc.edge.id.clone(),
                endpoint: inc.endpoint,
                incoming: inc.incoming,
                placement: Placement::Rect { side, offset },
                point: rect_side_point((node.position.x, node.position.y), w, h, side, offset),
            }
        })
        .collect();

    NodeHandles {
        node: node.id.clone(),
        spots,
        grow,
    }
}

fn side_rank(side: Side) -> u8 {
    match side {
        Side::Top => 0,
        Side::Right => 1,
        Side::Bottom => 2,
        Side::Left => 3,
    }
}

fn rank_side(rank: u8) -> Side {
    match rank {
        0 => Side::Top,
        1 => Side::Right,
        2 => Side::Bottom,
        _ => Side::Left,
    }
}

fn merge_rect_growth(
    current: Option<ResizeRequest>,
    node: &Node,
    side: Side,
    needed: f32,
) -> ResizeRequest {
    let (w, h) = node.size();
    let (mut width, mut height) = current
        .map(|req| (req.width, req.height))
        .unwrap_or((w, h));
    if side.is_horizontal() {
        width = width.max(needed);
    } else {
        height = height.max(needed);
    }
    // Entities stay square; stores and external refs grow only the
    // crowded dimension.
    if matches!(node.kind, NodeKind::Entity { .. }) {
        let square = width.max(height);
        width = square;
        height = square;
    }
    ResizeRequest {
        node: node.id.clone(),
        width,
        height,
    }
}

/// Iterative symmetric pairwise relaxation along a line of percentages.
/// Each pass pushes any adjacent pair closer than `min_gap` apart around
/// its midpoint; converged early passes stop the loop.
fn relax_line(offsets: &mut [(usize, f32)], min_gap: f32, iterations: usize) {
    if offsets.len() < 2 {
        return;
    }
    offsets.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    for _ in 0..iterations {
        let mut moved = false;
        for i in 0..offsets.len() - 1 {
            let gap = offsets[i + 1].1 - offsets[i].1;
            if gap < min_gap {
                let mid = (offsets[i].1 + offsets[i + 1].1) / 2.0;
                offsets[i].1 = (mid - min_gap / 2.0).max(0.0);
                offsets[i + 1].1 = (mid + min_gap / 2.0).min(100.0);
                moved = true;
            }
        }
        if !moved {
            break;
        }
    }
}

// ── Circular allocation ─────────────────────────────────────────────

fn allocate_circle(
    diagram: &Diagram,
    node: &Node,
    incidences: Vec<Incidence<'_>>,
    config: &HandleConfig,
) -> NodeHandles {
    let radius = node.radius();
    let center = node.center();

    // Split direct data-store attachments from the quadrant-distributed
    // peers (entities, external refs, sibling processes, and any dangling
    // reference, which files in with the peers).
    let is_store = |inc: &Incidence<'_>| {
        matches!(
            inc.opposite.map(|other| &other.kind),
            Some(NodeKind::DataStore { .. })
        )
    };

    // Peer ordering follows node creation order so quadrant assignment is
    // stable across recomputation; dangling references trail in edge order.
    // A self-loop makes the process its own peer.
    let mut peers: Vec<&str> = Vec::new();
    for other in diagram.nodes_at(node.level) {
        if matches!(other.kind, NodeKind::DataStore { .. }) {
            continue;
        }
        if incidences
            .iter()
            .any(|inc| inc.opposite.map(|op| op.id.as_str()) == Some(other.id.as_str()))
        {
            peers.push(&other.id);
        }
    }
    for inc in &incidences {
        if inc.opposite.is_none() && !is_store(inc) {
            let ghost = opposite_id(inc);
            if !peers.contains(&ghost) {
                peers.push(ghost);
            }
        }
    }

    let mut base_angles: Vec<(usize, f32)> = Vec::with_capacity(incidences.len());
    let mut grow_diameter: f32 = 0.0;
    let min_arc_deg = arc_gap_deg(config.min_gap_px, radius);

    // Quadrant sections for peers.
    let quadrant_members: [Vec<&str>; 4] = {
        let mut members: [Vec<&str>; 4] = Default::default();
        for (index, peer) in peers.iter().enumerate() {
            members[index % 4].push(*peer);
        }
        members
    };
    for (idx, inc) in incidences.iter().enumerate() {
        if is_store(inc) {
            continue;
        }
        let peer = inc
            .opposite
            .map(|op| op.id.as_str())
            .unwrap_or_else(|| opposite_id(inc));
        let Some((quadrant, section_index, section_count)) =
            locate_peer(&quadrant_members, peer)
        else {
            continue;
        };
        let section_span = QUADRANT_SPAN / section_count as f32;
        let section_start =
            QUADRANT_ANGLES[quadrant] - QUADRANT_SPAN / 2.0 + section_index as f32 * section_span;

        // In/out sub-ranges keep one peer's handles clustered while
        // separating its incoming handles from its outgoing ones.
        let split = section_span * config.incoming_fraction.clamp(0.0, 1.0);
        let (range_start, range_span) = if inc.incoming {
            (section_start, split)
        } else {
            (section_start + split, section_span - split)
        };
        let (rank, count) = direction_rank(&incidences, idx, peer, inc.incoming, is_store);
        let angle = range_start + range_span * (rank as f32 + 1.0) / (count as f32 + 1.0);
        base_angles.push((idx, angle));

        let needed = count as f32 * min_arc_deg;
        if needed > range_span && count > 1 {
            grow_diameter = grow_diameter
                .max(required_diameter(config.min_gap_px, count, range_span));
        }
    }

    // Data-store band.
    for (idx, inc) in incidences.iter().enumerate() {
        if !is_store(inc) {
            continue;
        }
        let (start, end) = if inc.incoming {
            (config.store_in_start_deg, config.store_in_end_deg)
        } else {
            (config.store_out_start_deg, config.store_out_end_deg)
        };
        let span = (end - start).max(0.0);
        let (rank, count) = store_rank(&incidences, idx, inc.incoming, is_store);
        let angle = start + span * (rank as f32 + 1.0) / (count as f32 + 1.0);
        base_angles.push((idx, angle));

        let needed = count as f32 * min_arc_deg;
        if needed > span && count > 1 {
            grow_diameter = grow_diameter.max(required_diameter(config.min_gap_px, count, span));
        }
    }

    // Manual per-edge degrees on top of the computed base, then a
    // circular relaxation pass for rendering.
    let mut angles: Vec<(usize, f32)> = base_angles
        .iter()
        .map(|&(idx, base)| {
            let manual = stored_offset(&incidences[idx]);
            (idx, normalize_deg(base + manual))
        })
        .collect();
    relax_ring(&mut angles, min_arc_deg, config.relax_iterations);
    // Relaxation sorts by angle; report spots back in edge order so the
    // output is stable against it.
    angles.sort_by_key(|&(idx, _)| idx);

    let spots = angles
        .iter()
        .map(|&(idx, angle)| {
            let inc = &incidences[idx];
            HandleSpot {
                edge: inc.edge.id.clone(),
                endpoint: inc.endpoint,
                incoming: inc.incoming,
                placement: Placement::Circle { angle_deg: angle },
                point: circle_point(center, radius, angle),
            }
        })
        .collect();

    let grow = if grow_diameter > node.size().0 {
        Some(ResizeRequest {
            node: node.id.clone(),
            width: grow_diameter,
            height: grow_diameter,
        })
    } else {
        None
    };

    NodeHandles {
        node: node.id.clone(),
        spots,
        grow,
    }
}

fn opposite_id<'a>(inc: &Incidence<'a>) -> &'a str {
    match inc.endpoint {
        Endpoint::Source => &inc.edge.target,
        Endpoint::Target => &inc.edge.source,
    }
}

fn locate_peer(quadrants: &[Vec<&str>; 4], peer: &str) -> Option<(usize, usize, usize)> {
    for (quadrant, members) in quadrants.iter().enumerate() {
        if let Some(section) = members.iter().position(|&member| member == peer) {
            return Some((quadrant, section, members.len()));
        }
    }
    None
}

/// Rank of incidence `idx` among same-peer, same-direction handles, and
/// the total count of that group. Order is edge order, so it is stable.
fn direction_rank(
    incidences: &[Incidence<'_>],
    idx: usize,
    peer: &str,
    incoming: bool,
    is_store: impl Fn(&Incidence<'_>) -> bool,
) -> (usize, usize) {
    let mut rank = 0;
    let mut count = 0;
    for (i, inc) in incidences.iter().enumerate() {
        if is_store(inc) || inc.incoming != incoming {
            continue;
        }
        let other = inc
            .opposite
            .map(|op| op.id.as_str())
            .unwrap_or_else(|| opposite_id(inc));
        if other != peer {
            continue;
        }
        if i == idx {
            rank = count;
        }
        count += 1;
    }
    (rank, count)
}

fn store_rank(
    incidences: &[Incidence<'_>],
    idx: usize,
    incoming: bool,
    is_store: impl Fn(&Incidence<'_>) -> bool,
) -> (usize, usize) {
    let mut rank = 0;
    let mut count = 0;
    for (i, inc) in incidences.iter().enumerate() {
        if !is_store(inc) || inc.incoming != incoming {
            continue;
        }
        if i == idx {
            rank = count;
        }
        count += 1;
    }
    (rank, count)
}

fn required_diameter(min_gap_px: f32, count: usize, span_deg: f32) -> f32 {
    if span_deg <= 0.0 {
        return 0.0;
    }
    2.0 * min_gap_px * count as f32 / span_deg.to_radians()
}

/// Circular variant of the pairwise relaxation: adjacency wraps around the
/// 0/360 seam, so the last and first handles also repel each other.
fn relax_ring(angles: &mut Vec<(usize, f32)>, min_gap_deg: f32, iterations: usize) {
    if angles.len() < 2 {
        return;
    }
    angles.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    // A ring with no room at all cannot relax; that case already produced
    // a growth request.
    if min_gap_deg * angles.len() as f32 >= 360.0 {
        return;
    }
    for _ in 0..iterations {
        let mut moved = false;
        let len = angles.len();
        for i in 0..len {
            let j = (i + 1) % len;
            let mut gap = angles[j].1 - angles[i].1;
            if j == 0 {
                gap += 360.0;
            }
            if gap < min_gap_deg {
                let push = (min_gap_deg - gap) / 2.0;
                angles[i].1 = normalize_deg(angles[i].1 - push);
                angles[j].1 = normalize_deg(angles[j].1 + push);
                moved = true;
            }
        }
        if !moved {
            break;
        }
        angles.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    }
}
