//! Cheap orthogonal path shapes tried before the grid search.

use super::obstacles::{Exclude, ObstacleField};
use crate::geometry::{simplify_path, Orientation, Point};

/// A straight segment, if the endpoints share an axis and nothing is in the way.
pub fn straight(a: Point, b: Point, field: &ObstacleField, exclude: &Exclude) -> Option<Vec<Point>> {
    if a.x != b.x && a.y != b.y {
        return None;
    }
    let path = vec![a, b];
    (!field.path_blocked(&path, exclude)).then_some(path)
}

/// One-bend path. `prefer` picks which leg goes first: horizontal first puts
/// the bend at `(b.x, a.y)`.
pub fn l_shape(
    a: Point,
    b: Point,
    prefer: Orientation,
    field: &ObstacleField,
    exclude: &Exclude,
) -> Option<Vec<Point>> {
    let h_first = Point::new(b.x, a.y);
    let v_first = Point::new(a.x, b.y);
    let order = match prefer {
        Orientation::Horizontal => [h_first, v_first],
        Orientation::Vertical => [v_first, h_first],
    };
    order
        .into_iter()
        .map(|mid| vec![a, mid, b])
        .find(|path| !field.path_blocked(path, exclude))
}

/// Two-bend path through the midpoint: horizontal-vertical-horizontal first,
/// then vertical-horizontal-vertical.
pub fn z_shape(a: Point, b: Point, grid: f64, field: &ObstacleField, exclude: &Exclude) -> Option<Vec<Point>> {
    let mid_x = crate::geometry::snap(a.x + (b.x - a.x) / 2.0, grid);
    let hvh = vec![a, Point::new(mid_x, a.y), Point::new(mid_x, b.y), b];
    if !field.path_blocked(&hvh, exclude) {
        return Some(hvh);
    }
    let mid_y = crate::geometry::snap(a.y + (b.y - a.y) / 2.0, grid);
    let vhv = vec![a, Point::new(a.x, mid_y), Point::new(b.x, mid_y), b];
    (!field.path_blocked(&vhv, exclude)).then_some(vhv)
}

fn direct(a: Point, b: Point, field: &ObstacleField, exclude: &Exclude) -> Option<Vec<Point>> {
    straight(a, b, field, exclude)
        .or_else(|| l_shape(a, b, Orientation::Horizontal, field, exclude))
}

/// Shortcuts a grid path: from each kept vertex, jumps to the farthest later
/// vertex reachable by a straight or one-bend path.
pub fn shortcut(path: &[Point], field: &ObstacleField, exclude: &Exclude) -> Vec<Point> {
    if path.len() <= 2 {
        return path.to_vec();
    }
    let mut out = vec![path[0]];
    let mut current = 0;
    while current < path.len() - 1 {
        let jump = (current + 1..path.len())
            .rev()
            .find_map(|i| direct(path[current], path[i], field, exclude).map(|seg| (i, seg)));
        match jump {
            Some((i, seg)) => {
                out.extend_from_slice(&seg[1..]);
                current = i;
            }
            None => {
                current += 1;
                out.push(path[current]);
            }
        }
    }
    simplify_path(&out)
}
