use crate::config::LabelConfig;
use crate::geometry::{distance, lerp};

use super::routing::PathSegment;

/// Anchor point at a fractional arc-length along a routed path. Jump arcs
/// count as their endpoint chord, which keeps the walk linear and the
/// anchor indistinguishable from the straight-segment case at label scale.
pub fn anchor_at(segments: &[PathSegment], fraction: f32) -> (f32, f32) {
    let pairs: Vec<((f32, f32), (f32, f32))> =
        segments.iter().map(|segment| segment.endpoints()).collect();
    anchor_on_pairs(&pairs, fraction)
}

/// Same walk over a bare bend polyline.
pub fn anchor_on_points(points: &[(f32, f32)], fraction: f32) -> (f32, f32) {
    let pairs: Vec<((f32, f32), (f32, f32))> =
        points.windows(2).map(|pair| (pair[0], pair[1])).collect();
    if pairs.is_empty() {
        return points.first().copied().unwrap_or((0.0, 0.0));
    }
    anchor_on_pairs(&pairs, fraction)
}

fn anchor_on_pairs(pairs: &[((f32, f32), (f32, f32))], fraction: f32) -> (f32, f32) {
    let Some(&(first, _)) = pairs.first() else {
        return (0.0, 0.0);
    };
    let total: f32 = pairs.iter().map(|&(a, b)| distance(a, b)).sum();
    if total <= 0.0 {
        return first;
    }
    let target = total * fraction.clamp(0.0, 1.0);
    let mut walked = 0.0;
    for &(a, b) in pairs {
        let len = distance(a, b);
        if len <= 0.0 {
            continue;
        }
        if target <= walked + len {
            return lerp(a, b, (target - walked) / len);
        }
        walked += len;
    }
    pairs.last().map(|&(_, b)| b).unwrap_or(first)
}

/// Apply keyboard nudges to a stored label offset, clamped to the live range.
pub fn nudge_offset(current: f32, steps: i32, config: &LabelConfig) -> f32 {
    (current + config.nudge_step * steps as f32).clamp(config.min_offset, config.max_offset)
}
