//! Canvas geometry: points, rectangles, sides, rotations, and path helpers.
//!
//! All coordinates are canvas units with the origin at the top-left corner and
//! `y` growing downwards. Positions produced by the engine are snapped to the
//! configured grid, so exact `f64` comparisons between snapped values are safe.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A point on the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Point {
    /// Creates a point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Manhattan distance to `other`.
    pub fn manhattan(self, other: Point) -> f64 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// Euclidean distance to `other`.
    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Returns this point translated by `(dx, dy)`.
    pub fn offset(self, dx: f64, dy: f64) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }

    /// Returns this point with both coordinates snapped to `grid`.
    pub fn snapped(self, grid: f64) -> Point {
        Point::new(snap(self.x, grid), snap(self.y, grid))
    }

    /// Centroid of a set of points, or `None` when empty.
    pub fn centroid(points: impl IntoIterator<Item = Point>) -> Option<Point> {
        let mut count = 0usize;
        let mut sum = Point::default();
        for p in points {
            sum.x += p.x;
            sum.y += p.y;
            count += 1;
        }
        (count > 0).then(|| Point::new(sum.x / count as f64, sum.y / count as f64))
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// An axis-aligned rectangle given by its top-left corner and size.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub w: f64,
    /// Height.
    pub h: f64,
}

impl Rect {
    /// Creates a rectangle.
    pub const fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Right edge.
    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    /// Centre point.
    pub fn center(&self) -> Point {
        Point::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Grows the rectangle by `amount` on every side.
    pub fn inflate(&self, amount: f64) -> Rect {
        Rect::new(
            self.x - amount,
            self.y - amount,
            self.w + 2.0 * amount,
            self.h + 2.0 * amount,
        )
    }

    /// Shrinks the rectangle by `amount` on every side, never below zero size.
    pub fn shrink(&self, amount: f64) -> Rect {
        let w = (self.w - 2.0 * amount).max(0.0);
        let h = (self.h - 2.0 * amount).max(0.0);
        Rect::new(self.x + amount, self.y + amount, w, h)
    }

    /// Returns `true` if the interiors intersect. Touching edges do not count.
    pub fn overlaps(&self, other: &Rect) -> bool {
        !(self.right() <= other.x
            || other.right() <= self.x
            || self.bottom() <= other.y
            || other.bottom() <= self.y)
    }

    /// Returns `true` if `p` lies strictly inside the rectangle.
    pub fn contains_point(&self, p: Point) -> bool {
        p.x > self.x && p.x < self.right() && p.y > self.y && p.y < self.bottom()
    }

    /// Returns `true` if `other` lies entirely inside this rectangle.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Returns `true` if the axis-aligned segment from `a` to `b` passes through the
    /// interior of the rectangle.
    ///
    /// A segment running exactly along an edge does not intersect. Diagonal
    /// segments never intersect; the router only produces orthogonal ones.
    pub fn intersects_segment(&self, a: Point, b: Point) -> bool {
        if a.x == b.x {
            let (y1, y2) = (a.y.min(b.y), a.y.max(b.y));
            if a.x <= self.x || a.x >= self.right() {
                return false;
            }
            return !(y2 <= self.y || y1 >= self.bottom());
        }
        if a.y == b.y {
            let (x1, x2) = (a.x.min(b.x), a.x.max(b.x));
            if a.y <= self.y || a.y >= self.bottom() {
                return false;
            }
            return !(x2 <= self.x || x1 >= self.right());
        }
        false
    }

    /// Smallest gap between this rectangle's boundary and `p` (zero inside).
    pub fn gap_to_point(&self, p: Point) -> f64 {
        let dx = (self.x - p.x).max(p.x - self.right()).max(0.0);
        let dy = (self.y - p.y).max(p.y - self.bottom()).max(0.0);
        dx.hypot(dy)
    }

    /// Smallest gap between two rectangles (zero when they touch or overlap).
    pub fn gap_to_rect(&self, other: &Rect) -> f64 {
        let dx = (other.x - self.right()).max(self.x - other.right()).max(0.0);
        let dy = (other.y - self.bottom()).max(self.y - other.bottom()).max(0.0);
        dx.hypot(dy)
    }

    /// Bounding box of a set of rectangles.
    pub fn union_all(rects: impl IntoIterator<Item = Rect>) -> Option<Rect> {
        rects.into_iter().fold(None, |acc, r| {
            Some(match acc {
                None => r,
                Some(a) => {
                    let x = a.x.min(r.x);
                    let y = a.y.min(r.y);
                    Rect::new(x, y, a.right().max(r.right()) - x, a.bottom().max(r.bottom()) - y)
                }
            })
        })
    }
}

/// Builds the obstacle rectangle covering a wire segment of the given width.
pub fn segment_rect(a: Point, b: Point, width: f64) -> Rect {
    let half = width / 2.0;
    if a.x == b.x {
        Rect::new(a.x - half, a.y.min(b.y) - half, width, (a.y - b.y).abs() + width)
    } else {
        Rect::new(a.x.min(b.x) - half, a.y - half, (a.x - b.x).abs() + width, width)
    }
}

/// Rounds `value` to the nearest multiple of `grid`.
pub fn snap(value: f64, grid: f64) -> f64 {
    if grid <= 0.0 {
        return value;
    }
    (value / grid).round() * grid
}

/// One edge of a rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// The left edge.
    Left,
    /// The right edge.
    Right,
    /// The top edge.
    Top,
    /// The bottom edge.
    Bottom,
}

impl Side {
    /// All sides in tie-break order.
    pub const ALL: [Side; 4] = [Side::Left, Side::Right, Side::Top, Side::Bottom];

    /// Unit vector pointing away from the rectangle through this side.
    pub fn outward(self) -> (f64, f64) {
        match self {
            Side::Left => (-1.0, 0.0),
            Side::Right => (1.0, 0.0),
            Side::Top => (0.0, -1.0),
            Side::Bottom => (0.0, 1.0),
        }
    }

    /// The side across the rectangle.
    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
            Side::Top => Side::Bottom,
            Side::Bottom => Side::Top,
        }
    }

    /// Returns `true` for the left and right edges.
    pub fn is_horizontal_exit(self) -> bool {
        matches!(self, Side::Left | Side::Right)
    }
}

/// Orientation of a wire segment or trunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Orientation {
    /// Constant `y`.
    Horizontal,
    /// Constant `x`.
    Vertical,
}

/// A quarter-turn rotation of a component symbol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum Rotation {
    /// No rotation.
    #[default]
    R0,
    /// 90 degrees clockwise.
    R90,
    /// 180 degrees.
    R180,
    /// 270 degrees clockwise.
    R270,
}

impl Rotation {
    /// Rotation angle in degrees.
    pub fn degrees(self) -> u16 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 90,
            Rotation::R180 => 180,
            Rotation::R270 => 270,
        }
    }

    /// Returns `true` when width and height are swapped.
    pub fn is_quarter(self) -> bool {
        matches!(self, Rotation::R90 | Rotation::R270)
    }

    /// Rotated size of a `w` by `h` symbol.
    pub fn size(self, w: f64, h: f64) -> (f64, f64) {
        if self.is_quarter() {
            (h, w)
        } else {
            (w, h)
        }
    }

    /// Maps a local pin offset of a `w` by `h` symbol into the rotated frame.
    pub fn transform(self, x: f64, y: f64, w: f64, h: f64) -> Point {
        match self {
            Rotation::R0 => Point::new(x, y),
            Rotation::R90 => Point::new(h - y, x),
            Rotation::R180 => Point::new(w - x, h - y),
            Rotation::R270 => Point::new(y, w - x),
        }
    }
}

impl TryFrom<u16> for Rotation {
    type Error = String;

    fn try_from(degrees: u16) -> Result<Self, Self::Error> {
        match degrees % 360 {
            0 => Ok(Rotation::R0),
            90 => Ok(Rotation::R90),
            180 => Ok(Rotation::R180),
            270 => Ok(Rotation::R270),
            other => Err(format!("rotation must be a multiple of 90 degrees, got {other}")),
        }
    }
}

impl From<Rotation> for u16 {
    fn from(rotation: Rotation) -> u16 {
        rotation.degrees()
    }
}

/// Removes repeated points and interior points of collinear runs.
pub fn simplify_path(points: &[Point]) -> Vec<Point> {
    let mut deduped: Vec<Point> = Vec::with_capacity(points.len());
    for &p in points {
        if deduped.last() != Some(&p) {
            deduped.push(p);
        }
    }
    if deduped.len() <= 2 {
        return deduped;
    }
    let mut out = vec![deduped[0]];
    for i in 1..deduped.len() - 1 {
        let prev = out[out.len() - 1];
        let cur = deduped[i];
        let next = deduped[i + 1];
        let collinear = (prev.x == cur.x && cur.x == next.x) || (prev.y == cur.y && cur.y == next.y);
        if !collinear {
            out.push(cur);
        }
    }
    out.push(deduped[deduped.len() - 1]);
    out
}

/// Total Manhattan length of a polyline.
pub fn path_length(points: &[Point]) -> f64 {
    points.windows(2).map(|w| w[0].manhattan(w[1])).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snap_rounds_to_grid() {
        assert_eq!(snap(14.0, 10.0), 10.0);
        assert_eq!(snap(15.0, 10.0), 20.0);
        assert_eq!(snap(-6.0, 10.0), -10.0);
        assert_eq!(snap(7.3, 0.0), 7.3);
    }

    #[test]
    fn touching_rects_do_not_overlap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        let c = Rect::new(9.0, 9.0, 5.0, 5.0);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&a));
    }

    #[test]
    fn segment_along_edge_does_not_intersect() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(!r.intersects_segment(Point::new(0.0, -5.0), Point::new(0.0, 15.0)));
        assert!(r.intersects_segment(Point::new(5.0, -5.0), Point::new(5.0, 15.0)));
        assert!(r.intersects_segment(Point::new(-5.0, 5.0), Point::new(3.0, 5.0)));
        assert!(!r.intersects_segment(Point::new(-5.0, 5.0), Point::new(0.0, 5.0)));
        assert!(!r.intersects_segment(Point::new(-5.0, -5.0), Point::new(15.0, 15.0)));
    }

    #[test]
    fn gaps() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(r.gap_to_point(Point::new(5.0, 5.0)), 0.0);
        assert_eq!(r.gap_to_point(Point::new(13.0, 14.0)), 5.0);
        assert_eq!(r.gap_to_rect(&Rect::new(20.0, 0.0, 5.0, 5.0)), 10.0);
    }

    #[test]
    fn rotation_transform_matches_size() {
        let (w, h) = (40.0, 20.0);
        assert_eq!(Rotation::R90.size(w, h), (20.0, 40.0));
        assert_eq!(Rotation::R90.transform(0.0, 10.0, w, h), Point::new(10.0, 0.0));
        assert_eq!(Rotation::R180.transform(0.0, 10.0, w, h), Point::new(40.0, 10.0));
        assert_eq!(Rotation::R270.transform(0.0, 10.0, w, h), Point::new(10.0, 40.0));
    }

    #[test]
    fn rotation_serde_uses_degrees() {
        assert_eq!(serde_json::to_string(&Rotation::R270).unwrap(), "270");
        let r: Rotation = serde_json::from_str("90").unwrap();
        assert_eq!(r, Rotation::R90);
        assert!(serde_json::from_str::<Rotation>("45").is_err());
    }

    #[test]
    fn simplify_drops_collinear_and_duplicates() {
        let path = [
            Point::new(0.0, 0.0),
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(20.0, 0.0),
            Point::new(20.0, 10.0),
        ];
        assert_eq!(
            simplify_path(&path),
            vec![Point::new(0.0, 0.0), Point::new(20.0, 0.0), Point::new(20.0, 10.0)]
        );
        assert_eq!(path_length(&path), 30.0);
    }

    #[test]
    fn segment_rect_covers_wire() {
        let r = segment_rect(Point::new(0.0, 10.0), Point::new(30.0, 10.0), 4.0);
        assert_eq!(r, Rect::new(-2.0, 8.0, 34.0, 4.0));
        assert!(r.intersects_segment(Point::new(15.0, 0.0), Point::new(15.0, 20.0)));
    }
}
