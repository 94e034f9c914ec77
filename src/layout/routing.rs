use serde::{Deserialize, Serialize};

use crate::geometry::Side;
use crate::model::{Level, RouteMode};

/// Orthogonal alignment tolerance when classifying a polyline segment as
/// horizontal or vertical.
const AXIS_EPS: f32 = 1e-3;
/// Points closer than this are merged while compressing a path.
const MERGE_EPS: f32 = 1e-3;

/// One drawable piece of a routed edge. Arcs only appear as crossing
/// jumps: semicircles of the configured jump radius with a fixed sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum PathSegment {
    Line {
        from: (f32, f32),
        to: (f32, f32),
    },
    Arc {
        from: (f32, f32),
        to: (f32, f32),
        radius: f32,
        sweep: bool,
    },
}

impl PathSegment {
    pub fn endpoints(&self) -> ((f32, f32), (f32, f32)) {
        match *self {
            PathSegment::Line { from, to } => (from, to),
            PathSegment::Arc { from, to, .. } => (from, to),
        }
    }
}

/// Routing mode actually used for an edge, after defaults are applied.
/// Smart routing exists only at Level 2; a stored smart preference at the
/// outer levels falls back to the side-derived L-shape.
pub fn resolve_route_mode(stored: Option<RouteMode>, level: Level, source_side: Side) -> RouteMode {
    match level {
        Level::Two => match stored {
            Some(RouteMode::HorizontalFirst) => RouteMode::HorizontalFirst,
            Some(RouteMode::VerticalFirst) => RouteMode::VerticalFirst,
            Some(RouteMode::Smart) | None => RouteMode::Smart,
        },
        Level::Context | Level::One => match stored {
            Some(RouteMode::HorizontalFirst) => RouteMode::HorizontalFirst,
            Some(RouteMode::VerticalFirst) => RouteMode::VerticalFirst,
            Some(RouteMode::Smart) | None => default_manual_mode(source_side),
        },
    }
}

/// Default manual mode from the source handle's boundary side: an edge
/// leaving the bottom runs vertical-first, everything else horizontal-first.
pub fn default_manual_mode(source_side: Side) -> RouteMode {
    if source_side == Side::Bottom {
        RouteMode::VerticalFirst
    } else {
        RouteMode::HorizontalFirst
    }
}

/// Direction-toggle cycle. Levels 0/1 flip between the two L-shapes;
/// Level 2 walks smart -> horizontal-first -> vertical-first -> smart.
pub fn next_route_mode(level: Level, current: RouteMode) -> RouteMode {
    match level {
        Level::Context | Level::One => match current {
            RouteMode::HorizontalFirst => RouteMode::VerticalFirst,
            _ => RouteMode::HorizontalFirst,
        },
        Level::Two => match current {
            RouteMode::Smart => RouteMode::HorizontalFirst,
            RouteMode::HorizontalFirst => RouteMode::VerticalFirst,
            RouteMode::VerticalFirst => RouteMode::Smart,
        },
    }
}

/// Two-segment L-shape between resolved endpoints.
pub fn l_path(start: (f32, f32), end: (f32, f32), mode: RouteMode) -> Vec<(f32, f32)> {
    let corner = match mode {
        RouteMode::VerticalFirst => (start.0, end.1),
        // Smart never reaches here; treat it as horizontal-first if it does.
        RouteMode::HorizontalFirst | RouteMode::Smart => (end.0, start.1),
    };
    compress(&[start, corner, end])
}

fn facing(side: Side) -> (f32, f32) {
    match side {
        Side::Top => (0.0, -1.0),
        Side::Right => (1.0, 0.0),
        Side::Bottom => (0.0, 1.0),
        Side::Left => (-1.0, 0.0),
    }
}

/// Multi-bend smooth-step path used by Level-2 smart routing: leave both
/// endpoints along their facing directions by `stub`, then meet on the
/// midline of the start facing's axis.
pub fn smart_step_path(
    start: (f32, f32),
    start_side: Side,
    end: (f32, f32),
    end_side: Side,
    stub: f32,
) -> Vec<(f32, f32)> {
    let sdir = facing(start_side);
    let edir = facing(end_side);
    let s = (start.0 + sdir.0 * stub, start.1 + sdir.1 * stub);
    let e = (end.0 + edir.0 * stub, end.1 + edir.1 * stub);

    let start_vertical = sdir.0 == 0.0;
    let end_vertical = edir.0 == 0.0;
    let mut points = vec![start, s];
    match (start_vertical, end_vertical) {
        (true, true) => {
            let mid_y = (s.1 + e.1) / 2.0;
            points.push((s.0, mid_y));
            points.push((e.0, mid_y));
        }
        (false, false) => {
            let mid_x = (s.0 + e.0) / 2.0;
            points.push((mid_x, s.1));
            points.push((mid_x, e.1));
        }
        // Perpendicular facings meet at a single corner.
        (true, false) => points.push((s.0, e.1)),
        (false, true) => points.push((e.0, s.1)),
    }
    points.push(e);
    points.push(end);
    compress(&points)
}

/// Drop duplicate and collinear intermediate points.
pub fn compress(points: &[(f32, f32)]) -> Vec<(f32, f32)> {
    let mut out: Vec<(f32, f32)> = Vec::with_capacity(points.len());
    for &point in points {
        if let Some(&last) = out.last()
            && (point.0 - last.0).abs() <= MERGE_EPS
            && (point.1 - last.1).abs() <= MERGE_EPS
        {
            continue;
        }
        out.push(point);
        while out.len() >= 3 {
            let c = out[out.len() - 1];
            let b = out[out.len() - 2];
            let a = out[out.len() - 3];
            let ab_h = (b.1 - a.1).abs() <= AXIS_EPS;
            let bc_h = (c.1 - b.1).abs() <= AXIS_EPS;
            let ab_v = (b.0 - a.0).abs() <= AXIS_EPS;
            let bc_v = (c.0 - b.0).abs() <= AXIS_EPS;
            if (ab_h && bc_h) || (ab_v && bc_v) {
                out.remove(out.len() - 2);
            } else {
                break;
            }
        }
    }
    out
}

#[derive(Debug, Clone, Copy)]
enum Axis {
    Horizontal,
    Vertical,
}

fn segment_axis(a: (f32, f32), b: (f32, f32)) -> Option<Axis> {
    if (a.1 - b.1).abs() <= AXIS_EPS && (a.0 - b.0).abs() > AXIS_EPS {
        Some(Axis::Horizontal)
    } else if (a.0 - b.0).abs() <= AXIS_EPS && (a.1 - b.1).abs() > AXIS_EPS {
        Some(Axis::Vertical)
    } else {
        None
    }
}

fn axis_dir(delta: f32) -> f32 {
    if delta.abs() <= AXIS_EPS { 0.0 } else { delta.signum() }
}

/// Perpendicular crossing point of two axis-aligned segments, provided it
/// lies strictly inside both extents with `margin` clearance at every end.
fn perpendicular_crossing(
    a1: (f32, f32),
    a2: (f32, f32),
    b1: (f32, f32),
    b2: (f32, f32),
    margin: f32,
) -> Option<(f32, f32)> {
    let (h1, h2, v1, v2) = match (segment_axis(a1, a2), segment_axis(b1, b2)) {
        (Some(Axis::Horizontal), Some(Axis::Vertical)) => (a1, a2, b1, b2),
        (Some(Axis::Vertical), Some(Axis::Horizontal)) => (b1, b2, a1, a2),
        _ => return None,
    };
    let y = h1.1;
    let x = v1.0;
    let (hx_lo, hx_hi) = (h1.0.min(h2.0), h1.0.max(h2.0));
    let (vy_lo, vy_hi) = (v1.1.min(v2.1), v1.1.max(v2.1));
    if x > hx_lo + margin && x < hx_hi - margin && y > vy_lo + margin && y < vy_hi - margin {
        Some((x, y))
    } else {
        None
    }
}

/// Turn a bend polyline into drawable segments, inserting a semicircular
/// jump wherever the path perpendicular-crosses a segment of `others`.
/// Crossings on one segment are taken in order of distance from the
/// segment's start; a crossing whose approach would overlap the previous
/// arc is skipped rather than drawn on top of it.
pub fn build_path(
    points: &[(f32, f32)],
    others: &[Vec<(f32, f32)>],
    jump_radius: f32,
) -> Vec<PathSegment> {
    let mut segments = Vec::new();
    for window in points.windows(2) {
        let (from, to) = (window[0], window[1]);
        let mut crossings: Vec<(f32, (f32, f32))> = Vec::new();
        if segment_axis(from, to).is_some() {
            for other in others {
                for other_window in other.windows(2) {
                    if let Some(hit) = perpendicular_crossing(
                        from,
                        to,
                        other_window[0],
                        other_window[1],
                        jump_radius,
                    ) {
                        let dist = (hit.0 - from.0).abs() + (hit.1 - from.1).abs();
                        crossings.push((dist, hit));
                    }
                }
            }
        }
        crossings.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let seg_len = (to.0 - from.0).abs() + (to.1 - from.1).abs();
        let dir = (axis_dir(to.0 - from.0), axis_dir(to.1 - from.1));
        let mut cursor = from;
        let mut walked = 0.0;
        for (dist, hit) in crossings {
            if dist - jump_radius < walked + MERGE_EPS || dist + jump_radius > seg_len - MERGE_EPS {
                continue;
            }
            let approach = (hit.0 - dir.0 * jump_radius, hit.1 - dir.1 * jump_radius);
            let depart = (hit.0 + dir.0 * jump_radius, hit.1 + dir.1 * jump_radius);
            if approach != cursor {
                segments.push(PathSegment::Line {
                    from: cursor,
                    to: approach,
                });
            }
            segments.push(PathSegment::Arc {
                from: approach,
                to: depart,
                radius: jump_radius,
                sweep: true,
            });
            cursor = depart;
            walked = dist + jump_radius;
        }
        if cursor != to {
            segments.push(PathSegment::Line { from: cursor, to });
        }
    }
    segments
}

/// SVG path syntax for the canvas collaborator.
pub fn path_svg(segments: &[PathSegment]) -> String {
    let mut out = String::new();
    let mut pen: Option<(f32, f32)> = None;
    for segment in segments {
        let (from, to) = segment.endpoints();
        if pen != Some(from) {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(&format!("M {} {}", from.0, from.1));
        }
        match segment {
            PathSegment::Line { .. } => {
                out.push_str(&format!(" L {} {}", to.0, to.1));
            }
            PathSegment::Arc { radius, sweep, .. } => {
                out.push_str(&format!(
                    " A {} {} 0 0 {} {} {}",
                    radius,
                    radius,
                    if *sweep { 1 } else { 0 },
                    to.0,
                    to.1
                ));
            }
        }
        pen = Some(to);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn polyline(segments: &[PathSegment]) -> Vec<(f32, f32)> {
        let mut points = Vec::new();
        for segment in segments {
            let (from, to) = segment.endpoints();
            if points.last() != Some(&from) {
                points.push(from);
            }
            points.push(to);
        }
        points
    }

    #[test]
    fn horizontal_first_visits_the_expected_corner() {
        let points = l_path((0.0, 0.0), (100.0, 50.0), RouteMode::HorizontalFirst);
        assert_eq!(points, vec![(0.0, 0.0), (100.0, 0.0), (100.0, 50.0)]);
    }

    #[test]
    fn vertical_first_visits_the_expected_corner() {
        let points = l_path((0.0, 0.0), (100.0, 50.0), RouteMode::VerticalFirst);
        assert_eq!(points, vec![(0.0, 0.0), (0.0, 50.0), (100.0, 50.0)]);
    }

    #[test]
    fn collinear_endpoints_collapse_to_one_segment() {
        let points = l_path((0.0, 0.0), (100.0, 0.0), RouteMode::HorizontalFirst);
        assert_eq!(points, vec![(0.0, 0.0), (100.0, 0.0)]);
    }

    #[test]
    fn zero_length_path_is_a_single_point() {
        let points = l_path((5.0, 5.0), (5.0, 5.0), RouteMode::HorizontalFirst);
        assert_eq!(points.len(), 1);
        assert!(build_path(&points, &[], 6.0).is_empty());
    }

    #[test]
    fn toggle_cycles_per_level() {
        assert_eq!(
            next_route_mode(Level::Context, RouteMode::HorizontalFirst),
            RouteMode::VerticalFirst
        );
        assert_eq!(
            next_route_mode(Level::One, RouteMode::VerticalFirst),
            RouteMode::HorizontalFirst
        );
        let mut mode = RouteMode::Smart;
        let mut seen = Vec::new();
        for _ in 0..3 {
            mode = next_route_mode(Level::Two, mode);
            seen.push(mode);
        }
        assert_eq!(
            seen,
            vec![
                RouteMode::HorizontalFirst,
                RouteMode::VerticalFirst,
                RouteMode::Smart
            ]
        );
    }

    #[test]
    fn stored_smart_at_outer_levels_falls_back_to_side_default() {
        assert_eq!(
            resolve_route_mode(Some(RouteMode::Smart), Level::Context, Side::Bottom),
            RouteMode::VerticalFirst
        );
        assert_eq!(
            resolve_route_mode(None, Level::One, Side::Right),
            RouteMode::HorizontalFirst
        );
        assert_eq!(
            resolve_route_mode(None, Level::Two, Side::Right),
            RouteMode::Smart
        );
        assert_eq!(
            resolve_route_mode(Some(RouteMode::VerticalFirst), Level::Two, Side::Right),
            RouteMode::VerticalFirst
        );
    }

    #[test]
    fn smart_path_with_opposed_horizontal_facings_meets_at_the_midline() {
        let points = smart_step_path((0.0, 0.0), Side::Right, (100.0, 60.0), Side::Left, 20.0);
        assert_eq!(
            points,
            vec![(0.0, 0.0), (50.0, 0.0), (50.0, 60.0), (100.0, 60.0)]
        );
    }

    #[test]
    fn smart_path_with_perpendicular_facings_bends_once_between_stubs() {
        let points = smart_step_path((0.0, 0.0), Side::Bottom, (100.0, 60.0), Side::Left, 20.0);
        assert_eq!(points, vec![(0.0, 0.0), (0.0, 60.0), (100.0, 60.0)]);
    }

    #[test]
    fn crossing_inserts_a_jump_arc() {
        let own = vec![(0.0, 0.0), (100.0, 0.0)];
        let other = vec![(50.0, -40.0), (50.0, 40.0)];
        let segments = build_path(&own, &[other], 6.0);
        assert_eq!(segments.len(), 3, "line, arc, line: {segments:?}");
        match segments[1] {
            PathSegment::Arc {
                from,
                to,
                radius,
                sweep,
            } => {
                assert_eq!(from, (44.0, 0.0));
                assert_eq!(to, (56.0, 0.0));
                assert_eq!(radius, 6.0);
                assert!(sweep);
            }
            PathSegment::Line { .. } => panic!("expected an arc at the crossing"),
        }
        let flat = polyline(&segments);
        assert_eq!(flat.first(), Some(&(0.0, 0.0)));
        assert_eq!(flat.last(), Some(&(100.0, 0.0)));
    }

    #[test]
    fn crossing_near_an_endpoint_is_ignored() {
        let own = vec![(0.0, 0.0), (100.0, 0.0)];
        // Vertical segment ends 2px below the horizontal line; inside the
        // 6px margin, so no jump.
        let grazing = vec![(50.0, -2.0), (50.0, 40.0)];
        let segments = build_path(&own, &[grazing], 6.0);
        assert_eq!(segments.len(), 1);
        // Same for a crossing too close to our own endpoint.
        let near_end = vec![(97.0, -40.0), (97.0, 40.0)];
        let segments = build_path(&own, &[near_end], 6.0);
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn parallel_segments_never_jump() {
        let own = vec![(0.0, 0.0), (100.0, 0.0)];
        let parallel = vec![(0.0, 0.0), (100.0, 0.0)];
        assert_eq!(build_path(&own, &[parallel], 6.0).len(), 1);
    }

    #[test]
    fn multiple_crossings_order_by_distance_from_segment_start() {
        let own = vec![(0.0, 0.0), (100.0, 0.0)];
        let far = vec![(80.0, -40.0), (80.0, 40.0)];
        let near = vec![(30.0, -40.0), (30.0, 40.0)];
        let segments = build_path(&own, &[far, near], 6.0);
        let arcs: Vec<(f32, f32)> = segments
            .iter()
            .filter_map(|segment| match segment {
                PathSegment::Arc { from, .. } => Some(*from),
                PathSegment::Line { .. } => None,
            })
            .collect();
        assert_eq!(arcs, vec![(24.0, 0.0), (74.0, 0.0)]);
    }

    #[test]
    fn overlapping_jumps_keep_only_the_first() {
        let own = vec![(0.0, 0.0), (100.0, 0.0)];
        // Two crossings 8px apart with a 6px radius: the second arc would
        // start inside the first, so it is skipped.
        let first = vec![(40.0, -40.0), (40.0, 40.0)];
        let second = vec![(48.0, -40.0), (48.0, 40.0)];
        let segments = build_path(&own, &[first, second], 6.0);
        let arc_count = segments
            .iter()
            .filter(|segment| matches!(segment, PathSegment::Arc { .. }))
            .count();
        assert_eq!(arc_count, 1);
    }

    #[test]
    fn svg_path_renders_lines_and_arcs() {
        let own = vec![(0.0, 0.0), (100.0, 0.0)];
        let other = vec![(50.0, -40.0), (50.0, 40.0)];
        let segments = build_path(&own, &[other], 6.0);
        let svg = path_svg(&segments);
        assert!(svg.starts_with("M 0 0 L 44 0"), "got {svg}");
        assert!(svg.contains("A 6 6 0 0 1 56 0"), "got {svg}");
        assert!(svg.ends_with("L 100 0"), "got {svg}");
    }
}
