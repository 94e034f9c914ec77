use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// One side of a rectangular boundary. Offsets run left-to-right on the
/// horizontal sides and top-to-bottom on the vertical ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

impl Side {
    pub fn is_horizontal(self) -> bool {
        matches!(self, Side::Top | Side::Bottom)
    }
}

/// Wrap an angle in degrees into [0, 360).
pub fn normalize_deg(angle: f32) -> f32 {
    let wrapped = angle % 360.0;
    if wrapped < 0.0 { wrapped + 360.0 } else { wrapped }
}

/// Smallest signed rotation from `from` to `to`, normalized into (-180, 180].
/// Used while dragging a circular handle so it tracks the cursor across the
/// 0/360 seam instead of jumping the long way around.
pub fn signed_delta_deg(from: f32, to: f32) -> f32 {
    let mut delta = normalize_deg(to) - normalize_deg(from);
    if delta > 180.0 {
        delta -= 360.0;
    } else if delta <= -180.0 {
        delta += 360.0;
    }
    delta
}

/// Point on a circle at a clockwise screen angle (0 deg = right, 90 = bottom).
pub fn circle_point(center: (f32, f32), radius: f32, angle_deg: f32) -> (f32, f32) {
    let rad = angle_deg.to_radians();
    (center.0 + radius * rad.cos(), center.1 + radius * rad.sin())
}

/// Angle of `point` as seen from `center`, clockwise screen degrees in [0, 360).
pub fn angle_of(center: (f32, f32), point: (f32, f32)) -> f32 {
    let dy = point.1 - center.1;
    let dx = point.0 - center.0;
    if dx == 0.0 && dy == 0.0 {
        return 0.0;
    }
    normalize_deg(dy.atan2(dx).to_degrees())
}

/// Convert a minimum pixel gap into degrees of arc on a circle of `radius`.
/// A degenerate radius yields an unsatisfiable span, which callers treat as
/// "grow the node" rather than dividing by zero.
pub fn arc_gap_deg(min_gap_px: f32, radius: f32) -> f32 {
    if radius <= 0.0 {
        return 360.0;
    }
    (min_gap_px / radius).to_degrees()
}

/// Point on a rectangle boundary: `offset` is a percentage [0, 100] along
/// `side`, measured from the side's start.
pub fn rect_side_point(
    top_left: (f32, f32),
    width: f32,
    height: f32,
    side: Side,
    offset_pct: f32,
) -> (f32, f32) {
    let t = (offset_pct / 100.0).clamp(0.0, 1.0);
    let (x, y) = top_left;
    match side {
        Side::Top => (x + width * t, y),
        Side::Right => (x + width, y + height * t),
        Side::Bottom => (x + width * t, y + height),
        Side::Left => (x, y + height * t),
    }
}

/// Which boundary side a clockwise screen angle points out of. Diagonal
/// angles resolve to the side whose 90-degree span contains them.
pub fn side_of_angle(angle_deg: f32) -> Side {
    let angle = normalize_deg(angle_deg);
    if (45.0..135.0).contains(&angle) {
        Side::Bottom
    } else if (135.0..225.0).contains(&angle) {
        Side::Left
    } else if (225.0..315.0).contains(&angle) {
        Side::Top
    } else {
        Side::Right
    }
}

pub fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    let dx = b.0 - a.0;
    let dy = b.1 - a.1;
    (dx * dx + dy * dy).sqrt()
}

pub fn lerp(a: (f32, f32), b: (f32, f32), t: f32) -> (f32, f32) {
    (a.0 + (b.0 - a.0) * t, a.1 + (b.1 - a.1) * t)
}
