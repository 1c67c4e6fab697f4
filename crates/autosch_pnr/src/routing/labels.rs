//! Net labels: a short stub off a pin ending in the net name.

use super::obstacles::{Exclude, ObstacleField};
use crate::geometry::{snap, Point, Rect, Side};
use crate::ids::{InstanceId, NetId};
use serde::{Deserialize, Serialize};

const CHAR_WIDTH: f64 = 6.0;
const LABEL_HEIGHT: f64 = 14.0;

/// A net label drawn at the end of a stub.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetLabel {
    /// Net name shown.
    pub net: String,
    /// Where the stub leaves the pin.
    pub pin: Point,
    /// Where the stub ends and the text starts.
    pub end: Point,
    /// Direction the stub runs in.
    pub side: Side,
    /// Text box.
    pub rect: Rect,
}

/// Where a label is attached.
#[derive(Clone, Copy, Debug)]
pub struct LabelAnchor {
    /// Pin location.
    pub at: Point,
    /// Outward side of the pin.
    pub side: Side,
    /// Instance owning the pin; its body never blocks its own label.
    pub instance: Option<InstanceId>,
}

/// Stub lengths tried, shortest first.
#[derive(Clone, Copy, Debug)]
pub struct StubRange {
    /// First length tried and the fallback length.
    pub min: f64,
    /// Last length tried.
    pub max: f64,
    /// Increment.
    pub step: f64,
}

fn text_rect(name: &str, end: Point, side: Side) -> Rect {
    let tw = name.chars().count() as f64 * CHAR_WIDTH;
    match side {
        Side::Right => Rect::new(end.x + 4.0, end.y - 7.0, tw + 4.0, LABEL_HEIGHT),
        Side::Left => Rect::new(end.x - 8.0 - tw, end.y - 7.0, tw + 4.0, LABEL_HEIGHT),
        Side::Top => Rect::new(end.x - tw / 2.0 - 2.0, end.y - 18.0, tw + 4.0, LABEL_HEIGHT),
        Side::Bottom => Rect::new(end.x - tw / 2.0 - 2.0, end.y + 2.0, tw + 4.0, LABEL_HEIGHT),
    }
}

fn directions(outward: Side) -> [Side; 3] {
    match outward {
        Side::Left | Side::Right => [outward, Side::Top, Side::Bottom],
        Side::Top | Side::Bottom => [outward, Side::Left, Side::Right],
    }
}

fn stub_end(at: Point, side: Side, len: f64, grid: f64) -> Point {
    let (dx, dy) = side.outward();
    let end = at.offset(dx * len, dy * len);
    if side.is_horizontal_exit() {
        Point::new(snap(end.x, grid), end.y)
    } else {
        Point::new(end.x, snap(end.y, grid))
    }
}

/// Finds a spot for a label of `net` at `anchor`, records its stub and text
/// box in the field and returns it.
///
/// Lengths grow from `stubs.min`; at each length the outward direction is
/// tried before the two perpendicular ones. When nothing fits the label
/// goes outward at the minimum length anyway.
pub fn place_label(
    name: &str,
    net: NetId,
    anchor: LabelAnchor,
    stubs: StubRange,
    grid: f64,
    field: &mut ObstacleField,
) -> NetLabel {
    let exclude = Exclude {
        net: None,
        instances: anchor.instance.into_iter().collect(),
    };
    let mut chosen = None;
    let mut len = stubs.min;
    'search: while len <= stubs.max {
        for side in directions(anchor.side) {
            let end = stub_end(anchor.at, side, len, grid);
            let rect = text_rect(name, end, side);
            if !field.rect_blocked(&rect, &exclude) && !field.segment_blocked(anchor.at, end, &exclude) {
                chosen = Some((end, side, rect));
                break 'search;
            }
        }
        len += stubs.step.max(1.0);
    }
    let (end, side, rect) = chosen.unwrap_or_else(|| {
        log::trace!("label {name} forced at minimum stub");
        let end = stub_end(anchor.at, anchor.side, stubs.min, grid);
        (end, anchor.side, text_rect(name, end, anchor.side))
    });
    field.add_path(net, &[anchor.at, end]);
    field.add_annotation(rect);
    NetLabel {
        net: name.to_string(),
        pin: anchor.at,
        end,
        side,
        rect,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STUBS: StubRange = StubRange {
        min: 18.0,
        max: 54.0,
        step: 10.0,
    };

    fn anchor(side: Side) -> LabelAnchor {
        LabelAnchor {
            at: Point::new(100.0, 100.0),
            side,
            instance: None,
        }
    }

    #[test]
    fn label_goes_outward_when_free() {
        let mut field = ObstacleField::default();
        let label = place_label("SDA", NetId::from_raw(0), anchor(Side::Right), STUBS, 10.0, &mut field);
        assert_eq!(label.side, Side::Right);
        assert_eq!(label.end, Point::new(120.0, 100.0));
        assert_eq!(label.rect, Rect::new(124.0, 93.0, 22.0, 14.0));
        assert!(field.rect_blocked(&label.rect.shrink(1.0), &Exclude::none()));
    }

    #[test]
    fn blocked_outward_side_turns_or_lengthens() {
        let mut field = ObstacleField::default();
        field.add_annotation(Rect::new(110.0, 80.0, 30.0, 40.0));
        let label = place_label("SCL", NetId::from_raw(0), anchor(Side::Right), STUBS, 10.0, &mut field);
        assert_ne!(label.side, Side::Right);
    }

    #[test]
    fn hopeless_label_still_lands_outward() {
        let mut field = ObstacleField::default();
        field.add_annotation(Rect::new(0.0, 0.0, 300.0, 300.0));
        let label = place_label("X", NetId::from_raw(0), anchor(Side::Left), STUBS, 10.0, &mut field);
        assert_eq!(label.side, Side::Left);
        assert_eq!(label.end, Point::new(80.0, 100.0));
    }
}
