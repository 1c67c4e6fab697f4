//! Obstacle field: component bodies, drawn wires, glyphs and label boxes.
//!
//! Every drawn segment is added as soon as it is emitted, so later nets see
//! it. Obstacles remember who owns them; a query can exclude the instances
//! it connects to and the wires of its own net.

use crate::geometry::{segment_rect, Point, Rect};
use crate::ids::{InstanceId, NetId};
use crate::model::Schematic;

/// Who put an obstacle on the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Owner {
    /// A component body.
    Instance(InstanceId),
    /// A wire segment of a net.
    Wire(NetId),
    /// A power glyph or net label text.
    Annotation,
}

/// One blocked rectangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Obstacle {
    /// Blocked area.
    pub rect: Rect,
    /// Owner of the area.
    pub owner: Owner,
}

/// What a query may pass through.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Exclude {
    /// Wires of this net are transparent.
    pub net: Option<NetId>,
    /// Bodies of these instances are transparent.
    pub instances: Vec<InstanceId>,
}

impl Exclude {
    /// Nothing excluded.
    pub fn none() -> Self {
        Self::default()
    }

    /// The wires of `net` and the given instances.
    pub fn net_and(net: NetId, instances: impl IntoIterator<Item = InstanceId>) -> Self {
        let mut instances: Vec<InstanceId> = instances.into_iter().collect();
        instances.dedup();
        Self {
            net: Some(net),
            instances,
        }
    }

    fn skips(&self, owner: Owner) -> bool {
        match owner {
            Owner::Instance(id) => self.instances.contains(&id),
            Owner::Wire(net) => self.net == Some(net),
            Owner::Annotation => false,
        }
    }
}

/// The growing set of obstacles of one routing pass.
#[derive(Clone, Debug, Default)]
pub struct ObstacleField {
    obstacles: Vec<Obstacle>,
    wire_width: f64,
}

impl ObstacleField {
    /// Seeds the field with every component body inflated by `clearance`.
    pub fn from_schematic(schematic: &Schematic, clearance: f64, wire_width: f64) -> Self {
        let obstacles = schematic
            .instances
            .iter()
            .map(|i| Obstacle {
                rect: i.rect().inflate(clearance),
                owner: Owner::Instance(i.id),
            })
            .collect();
        Self {
            obstacles,
            wire_width,
        }
    }

    /// All obstacles in insertion order.
    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    /// Adds every segment of `path` as a wire obstacle of `net`.
    pub fn add_path(&mut self, net: NetId, path: &[Point]) {
        for w in path.windows(2) {
            if w[0] == w[1] {
                continue;
            }
            self.obstacles.push(Obstacle {
                rect: segment_rect(w[0], w[1], self.wire_width),
                owner: Owner::Wire(net),
            });
        }
    }

    /// Adds a glyph or label box.
    pub fn add_annotation(&mut self, rect: Rect) {
        self.obstacles.push(Obstacle {
            rect,
            owner: Owner::Annotation,
        });
    }

    /// Whether the orthogonal segment from `a` to `b` crosses a non-excluded obstacle.
    pub fn segment_blocked(&self, a: Point, b: Point, exclude: &Exclude) -> bool {
        self.obstacles
            .iter()
            .any(|o| !exclude.skips(o.owner) && o.rect.intersects_segment(a, b))
    }

    /// Whether any segment of `path` is blocked.
    pub fn path_blocked(&self, path: &[Point], exclude: &Exclude) -> bool {
        path.windows(2)
            .any(|w| self.segment_blocked(w[0], w[1], exclude))
    }

    /// Whether `p` lies strictly inside a non-excluded obstacle.
    pub fn point_blocked(&self, p: Point, exclude: &Exclude) -> bool {
        self.obstacles
            .iter()
            .any(|o| !exclude.skips(o.owner) && o.rect.contains_point(p))
    }

    /// Whether `rect` overlaps a non-excluded obstacle.
    pub fn rect_blocked(&self, rect: &Rect, exclude: &Exclude) -> bool {
        self.obstacles
            .iter()
            .any(|o| !exclude.skips(o.owner) && o.rect.overlaps(rect))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_wires_are_transparent() {
        let mut field = ObstacleField::default();
        field.wire_width = 4.0;
        let net = NetId::from_raw(0);
        let other = NetId::from_raw(1);
        field.add_path(net, &[Point::new(0.0, 50.0), Point::new(100.0, 50.0)]);

        let a = Point::new(50.0, 0.0);
        let b = Point::new(50.0, 100.0);
        assert!(field.segment_blocked(a, b, &Exclude::none()));
        assert!(!field.segment_blocked(a, b, &Exclude::net_and(net, [])));
        assert!(field.segment_blocked(a, b, &Exclude::net_and(other, [])));
    }

    #[test]
    fn excluded_instances_are_skipped() {
        let mut field = ObstacleField::default();
        let id = InstanceId::from_raw(3);
        field.obstacles.push(Obstacle {
            rect: Rect::new(0.0, 0.0, 20.0, 20.0),
            owner: Owner::Instance(id),
        });
        let p = Point::new(10.0, 10.0);
        assert!(field.point_blocked(p, &Exclude::none()));
        assert!(!field.point_blocked(p, &Exclude::net_and(NetId::from_raw(0), [id])));
        field.add_annotation(Rect::new(40.0, 0.0, 10.0, 10.0));
        assert!(field.rect_blocked(&Rect::new(45.0, 5.0, 2.0, 2.0), &Exclude::net_and(NetId::from_raw(0), [id])));
    }
}
