//! Lane assignment for parallel wires.
//!
//! Segments of different nets that would run on the same line share a lane
//! key `(orientation, rounded coordinate)`. Each net gets its own small index
//! per key, handed out as 0, +1, -1, +2, -2 and so on, and the segment is
//! shifted perpendicular to itself by index times the lane spacing.

use crate::geometry::{simplify_path, Orientation, Point};
use crate::ids::NetId;
use std::collections::HashMap;

/// Lane indices per line, shared by every net of one routing pass.
#[derive(Clone, Debug, Default)]
pub struct LaneTable {
    lanes: HashMap<(Orientation, i64), Vec<(NetId, i32)>>,
    max: i32,
}

impl LaneTable {
    /// Creates an empty table handing out indices up to `max` either way.
    pub fn new(max: i32) -> Self {
        Self {
            lanes: HashMap::new(),
            max: max.max(0),
        }
    }

    /// Lane index of `net` on the line `orientation @ coord`, allocating one
    /// on first use. Falls back to 0 when every index is taken.
    pub fn index(&mut self, net: NetId, orientation: Orientation, coord: f64) -> i32 {
        let taken = self.lanes.entry((orientation, coord.round() as i64)).or_default();
        if let Some(&(_, idx)) = taken.iter().find(|(n, _)| *n == net) {
            return idx;
        }
        let free = (0..=self.max)
            .flat_map(|step| [step, -step])
            .find(|idx| !taken.iter().any(|(_, used)| used == idx))
            .unwrap_or(0);
        taken.push((net, free));
        free
    }

    /// Offset of `net` on the given line, in canvas units.
    pub fn offset(&mut self, net: NetId, orientation: Orientation, coord: f64, spacing: f64) -> f64 {
        f64::from(self.index(net, orientation, coord)) * spacing
    }

    /// Shifts the interior segments of `path` onto their lanes.
    ///
    /// The first and last segment stay anchored to the endpoints. A vertex
    /// between two shifted segments moves by both shifts, so every segment
    /// stays orthogonal.
    pub fn offset_path(&mut self, net: NetId, path: &[Point], spacing: f64) -> Vec<Point> {
        let path = simplify_path(path);
        if path.len() < 4 || spacing == 0.0 {
            return path;
        }
        let segments = path.len() - 1;
        let shifts: Vec<(f64, f64)> = (0..segments)
            .map(|i| {
                if i == 0 || i == segments - 1 {
                    return (0.0, 0.0);
                }
                let (a, b) = (path[i], path[i + 1]);
                if a.y == b.y {
                    (0.0, self.offset(net, Orientation::Horizontal, a.y, spacing))
                } else if a.x == b.x {
                    (self.offset(net, Orientation::Vertical, a.x, spacing), 0.0)
                } else {
                    (0.0, 0.0)
                }
            })
            .collect();
        let shifted: Vec<Point> = path
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let before = if i > 0 { shifts[i - 1] } else { (0.0, 0.0) };
                let after = shifts.get(i).copied().unwrap_or((0.0, 0.0));
                p.offset(before.0 + after.0, before.1 + after.1)
            })
            .collect();
        simplify_path(&shifted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_alternate_around_zero() {
        let mut lanes = LaneTable::new(6);
        let nets: Vec<NetId> = (0..4).map(NetId::from_raw).collect();
        let got: Vec<i32> = nets
            .iter()
            .map(|&n| lanes.index(n, Orientation::Vertical, 100.2))
            .collect();
        assert_eq!(got, vec![0, 1, -1, 2]);
        assert_eq!(lanes.index(nets[1], Orientation::Vertical, 99.8), 1);
        assert_eq!(lanes.index(nets[3], Orientation::Horizontal, 100.0), 0);
    }

    #[test]
    fn full_line_falls_back_to_zero() {
        let mut lanes = LaneTable::new(1);
        for n in 0..3 {
            lanes.index(NetId::from_raw(n), Orientation::Horizontal, 0.0);
        }
        assert_eq!(lanes.index(NetId::from_raw(9), Orientation::Horizontal, 0.0), 0);
    }

    #[test]
    fn interior_segment_moves_and_ends_stay() {
        let mut lanes = LaneTable::new(6);
        // Another net already holds lane 0 on x = 50.
        lanes.index(NetId::from_raw(0), Orientation::Vertical, 50.0);
        let net = NetId::from_raw(1);
        let path = [
            Point::new(0.0, 0.0),
            Point::new(50.0, 0.0),
            Point::new(50.0, 100.0),
            Point::new(100.0, 100.0),
        ];
        let out = lanes.offset_path(net, &path, 10.0);
        assert_eq!(
            out,
            vec![
                Point::new(0.0, 0.0),
                Point::new(60.0, 0.0),
                Point::new(60.0, 100.0),
                Point::new(100.0, 100.0),
            ]
        );
    }
}
