//! A* search on the routing grid.
//!
//! Cells are grid-snapped canvas points. A step is blocked when it lands
//! inside an obstacle or its segment passes through one. The cost of a step
//! is one grid unit plus a doubled turn penalty when the axis changes and a
//! backwards penalty when it moves away from the target, which biases the
//! search towards long straight runs. The search gives up after a fixed
//! number of expansions or a wall-clock budget.

use super::obstacles::{Exclude, ObstacleField};
use crate::geometry::{snap, Orientation, Point};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::time::{Duration, Instant};

/// Search limits and costs.
#[derive(Clone, Debug)]
pub struct SearchParams {
    /// Grid pitch; also the cost of one step.
    pub grid: f64,
    /// Canvas width; cells outside `0..=width` are never visited.
    pub width: f64,
    /// Canvas height.
    pub height: f64,
    /// Added twice for every change of axis.
    pub turn_penalty: f64,
    /// Added for every step that increases the distance to the target.
    pub backwards_penalty: f64,
    /// Maximum number of expanded cells.
    pub max_iterations: u32,
    /// Wall-clock budget.
    pub time_limit: Duration,
}

type Cell = (i64, i64);

#[derive(Debug, Clone)]
struct SearchState {
    cell: Cell,
    axis: Option<Orientation>,
    cost: f64,
    estimated_total: f64,
    order: u64,
}

impl PartialEq for SearchState {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SearchState {}

impl Ord for SearchState {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for a min-heap; earlier insertions win ties.
        other
            .estimated_total
            .partial_cmp(&self.estimated_total)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.order.cmp(&self.order))
    }
}

impl PartialOrd for SearchState {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

type Key = (Cell, Option<Orientation>);

/// Searches a path from `start` to `end`.
///
/// `start_axis` is the axis the wire arrives on at `start`, so the first
/// step is charged a turn if it leaves on the other one. The returned path
/// begins at `start` and ends at `end`; when those are off-grid, short
/// orthogonal jogs join them to the snapped cells.
pub fn search(
    start: Point,
    end: Point,
    start_axis: Option<Orientation>,
    field: &ObstacleField,
    exclude: &Exclude,
    params: &SearchParams,
) -> Option<Vec<Point>> {
    let g = params.grid;
    let to_cell = |p: Point| ((snap(p.x, g) / g).round() as i64, (snap(p.y, g) / g).round() as i64);
    let to_point = |c: Cell| Point::new(c.0 as f64 * g, c.1 as f64 * g);
    let (max_x, max_y) = ((params.width / g).floor() as i64, (params.height / g).floor() as i64);

    let source = to_cell(start);
    let target = to_cell(end);
    let h = |c: Cell| ((c.0 - target.0).abs() + (c.1 - target.1).abs()) as f64 * g;

    let started = Instant::now();
    let mut open = BinaryHeap::new();
    let mut g_scores: HashMap<Key, f64> = HashMap::new();
    let mut came_from: HashMap<Key, Key> = HashMap::new();
    let mut order = 0u64;

    let first: Key = (source, start_axis);
    g_scores.insert(first, 0.0);
    open.push(SearchState {
        cell: source,
        axis: start_axis,
        cost: 0.0,
        estimated_total: h(source),
        order,
    });

    let mut iterations = 0u32;
    while let Some(current) = open.pop() {
        iterations += 1;
        if iterations > params.max_iterations || started.elapsed() > params.time_limit {
            log::trace!("search gave up after {iterations} expansions");
            return None;
        }
        let key: Key = (current.cell, current.axis);
        if current.cell == target {
            let cells = reconstruct(&came_from, first, key);
            let mut path = vec![start];
            let head = to_point(source);
            push_jog(&mut path, head);
            path.extend(cells.into_iter().skip(1).map(to_point));
            push_jog(&mut path, end);
            return Some(path);
        }
        let current_g = *g_scores.get(&key).unwrap_or(&f64::INFINITY);
        if current.cost > current_g {
            continue; // stale
        }

        let here = to_point(current.cell);
        let steps = [
            ((1, 0), Orientation::Horizontal),
            ((-1, 0), Orientation::Horizontal),
            ((0, 1), Orientation::Vertical),
            ((0, -1), Orientation::Vertical),
        ];
        for ((dx, dy), axis) in steps {
            let next = (current.cell.0 + dx, current.cell.1 + dy);
            if next.0 < 0 || next.1 < 0 || next.0 > max_x || next.1 > max_y {
                continue;
            }
            let there = to_point(next);
            if field.point_blocked(there, exclude) || field.segment_blocked(here, there, exclude) {
                continue;
            }
            let mut step = g;
            if current.axis.is_some_and(|a| a != axis) {
                step += 2.0 * params.turn_penalty;
            }
            if h(next) > h(current.cell) {
                step += params.backwards_penalty;
            }
            let tentative = current_g + step;
            let next_key = (next, Some(axis));
            if tentative < *g_scores.get(&next_key).unwrap_or(&f64::INFINITY) {
                g_scores.insert(next_key, tentative);
                came_from.insert(next_key, key);
                order += 1;
                open.push(SearchState {
                    cell: next,
                    axis: Some(axis),
                    cost: tentative,
                    estimated_total: tentative + h(next),
                    order,
                });
            }
        }
    }
    None
}

fn reconstruct(came_from: &HashMap<Key, Key>, start: Key, end: Key) -> Vec<Cell> {
    let mut cells = vec![end.0];
    let mut current = end;
    while current != start {
        match came_from.get(&current) {
            Some(&prev) => {
                cells.push(prev.0);
                current = prev;
            }
            None => break,
        }
    }
    cells.reverse();
    cells
}

/// Appends `to`, with an elbow first if it is not axis-aligned with the last point.
fn push_jog(path: &mut Vec<Point>, to: Point) {
    if let Some(&last) = path.last() {
        if last.x != to.x && last.y != to.y {
            path.push(Point::new(to.x, last.y));
        }
    }
    path.push(to);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{simplify_path, Rect};

    fn params() -> SearchParams {
        SearchParams {
            grid: 10.0,
            width: 300.0,
            height: 300.0,
            turn_penalty: 20.0,
            backwards_penalty: 10.0,
            max_iterations: 60_000,
            time_limit: Duration::from_secs(5),
        }
    }

    fn is_orthogonal(path: &[Point]) -> bool {
        path.windows(2).all(|w| w[0].x == w[1].x || w[0].y == w[1].y)
    }

    #[test]
    fn open_field_goes_straight() {
        let field = ObstacleField::default();
        let path = search(
            Point::new(20.0, 50.0),
            Point::new(200.0, 50.0),
            None,
            &field,
            &Exclude::none(),
            &params(),
        )
        .unwrap();
        assert_eq!(simplify_path(&path), vec![Point::new(20.0, 50.0), Point::new(200.0, 50.0)]);
    }

    #[test]
    fn detours_around_a_wall() {
        let mut field = ObstacleField::default();
        field.add_annotation(Rect::new(95.0, -10.0, 10.0, 210.0));
        let path = search(
            Point::new(20.0, 50.0),
            Point::new(200.0, 50.0),
            Some(Orientation::Horizontal),
            &field,
            &Exclude::none(),
            &params(),
        )
        .unwrap();
        assert!(is_orthogonal(&path));
        assert!(!field.path_blocked(&path, &Exclude::none()));
        assert!(path.iter().any(|p| p.y >= 200.0));
    }

    #[test]
    fn sealed_target_fails_within_limits() {
        let mut field = ObstacleField::default();
        field.add_annotation(Rect::new(150.0, -10.0, 10.0, 400.0));
        let mut p = params();
        p.max_iterations = 500;
        let path = search(
            Point::new(20.0, 50.0),
            Point::new(250.0, 50.0),
            None,
            &field,
            &Exclude::none(),
            &p,
        );
        assert!(path.is_none());
    }

    #[test]
    fn off_grid_endpoints_are_joined_orthogonally() {
        let field = ObstacleField::default();
        let path = search(
            Point::new(23.0, 47.0),
            Point::new(101.0, 88.0),
            None,
            &field,
            &Exclude::none(),
            &params(),
        )
        .unwrap();
        assert_eq!(path[0], Point::new(23.0, 47.0));
        assert_eq!(*path.last().unwrap(), Point::new(101.0, 88.0));
        assert!(is_orthogonal(&path));
    }
}
