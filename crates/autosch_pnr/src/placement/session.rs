//! Placement session: the mutable state of one placement pass.
//!
//! The session owns the placed-rectangle list, the group tags and the seeded
//! random generator. Every accepted position goes through [`PlacementSession::commit`],
//! so the rectangle list always matches the instances marked as placed.

use crate::geometry::{snap, Point, Rect, Rotation};
use crate::graph::Connectivity;
use crate::ids::InstanceId;
use crate::model::Schematic;
use autosch_config::EngineConfig;
use autosch_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A component was placed at a random legal position.
pub const RANDOM_FALLBACK: DiagnosticCode = DiagnosticCode::new(Category::Placement, 101);
/// No legal position existed; the component was placed overlapping.
pub const FORCED_PLACEMENT: DiagnosticCode = DiagnosticCode::new(Category::Placement, 102);
/// A critical peripheral ended up away from its preferred arrangement.
pub const DEGRADED_PERIPHERAL: DiagnosticCode = DiagnosticCode::new(Category::Placement, 103);

const RANDOM_TRIES: usize = 50;

/// How a candidate is checked against already placed rectangles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fit<'g> {
    /// Candidate inflated by the clearance must not touch any placed rect.
    Normal,
    /// Like `Normal`, but one unit tighter against members of the group.
    SameGroup(&'g str),
    /// Candidate inflated by the clearance and shrunk by two, tested against
    /// placed rects inflated by the avoid clearance.
    Tight,
}

#[derive(Clone, Debug)]
struct PlacedRect {
    id: InstanceId,
    rect: Rect,
    group: Option<String>,
}

/// Mutable state of one placement pass.
pub struct PlacementSession<'a> {
    schematic: &'a mut Schematic,
    drawn: Schematic,
    graph: &'a Connectivity,
    config: &'a EngineConfig,
    sink: &'a DiagnosticSink,
    rects: Vec<PlacedRect>,
    placed: Vec<bool>,
    rng: StdRng,
}

impl<'a> PlacementSession<'a> {
    /// Starts a pass with nothing placed. Every instance is moved back to
    /// the origin, unrotated and ungrouped; the positions it had are kept
    /// in [`PlacementSession::drawn`].
    pub fn new(
        schematic: &'a mut Schematic,
        graph: &'a Connectivity,
        config: &'a EngineConfig,
        sink: &'a DiagnosticSink,
    ) -> Self {
        let count = schematic.instance_count();
        let drawn = schematic.clone();
        for inst in &mut schematic.instances {
            inst.position = Point::default();
            inst.rotation = Rotation::R0;
            inst.group = None;
        }
        Self {
            schematic,
            drawn,
            graph,
            config,
            sink,
            rects: Vec::new(),
            placed: vec![false; count],
            rng: StdRng::seed_from_u64(config.placement.seed),
        }
    }

    /// The schematic being placed.
    pub fn schematic(&self) -> &Schematic {
        self.schematic
    }

    /// The schematic as it was handed in, before positions were reset.
    pub fn drawn(&self) -> &Schematic {
        &self.drawn
    }

    /// Connectivity of the schematic.
    pub fn graph(&self) -> &'a Connectivity {
        self.graph
    }

    /// Engine configuration.
    pub fn config(&self) -> &'a EngineConfig {
        self.config
    }

    /// Grid pitch.
    pub fn grid(&self) -> f64 {
        self.config.canvas.grid
    }

    /// Avoid clearance used by most searches.
    pub fn clearance(&self) -> f64 {
        self.config.placement.avoid_clearance
    }

    /// Whether `id` already has a final position.
    pub fn is_placed(&self, id: InstanceId) -> bool {
        self.placed.get(id.index()).copied().unwrap_or(false)
    }

    /// Number of placed instances.
    pub fn placed_count(&self) -> usize {
        self.placed.iter().filter(|p| **p).count()
    }

    /// Canvas centre.
    pub fn canvas_center(&self) -> Point {
        Point::new(self.config.canvas.width / 2.0, self.config.canvas.height / 2.0)
    }

    /// Bounding rect of `id` if its top-left corner were at `origin`.
    pub fn rect_at(&self, id: InstanceId, origin: Point, rotation: Rotation) -> Rect {
        let (w, h) = self.schematic.instance(id).size_at(rotation);
        Rect::new(origin.x, origin.y, w, h)
    }

    /// Whether `rect` lies inside the canvas edge margins.
    pub fn within_canvas(&self, rect: &Rect) -> bool {
        let c = &self.config.canvas;
        rect.x >= c.edge_margin
            && rect.y >= c.edge_margin
            && rect.right() <= c.width - c.edge_margin
            && rect.bottom() <= c.height - c.edge_margin
    }

    /// Whether `rect` is inside the canvas and clear of placed rects.
    ///
    /// `ignore` skips one instance's own rect (used when re-checking a part
    /// that is already placed).
    pub fn is_free(&self, rect: &Rect, clearance: f64, fit: Fit<'_>, ignore: Option<InstanceId>) -> bool {
        if !self.within_canvas(rect) {
            return false;
        }
        let test = rect.inflate(clearance);
        let avoid = self.clearance();
        !self.rects.iter().filter(|p| Some(p.id) != ignore).any(|p| match fit {
            Fit::Normal => p.rect.overlaps(&test),
            Fit::SameGroup(g) if p.group.as_deref() == Some(g) => p.rect.overlaps(&test.shrink(1.0)),
            Fit::SameGroup(_) => p.rect.overlaps(&test),
            Fit::Tight => p.rect.inflate(avoid).overlaps(&test.shrink(2.0)),
        })
    }

    /// Records the final position of `id`. The origin is snapped to the grid.
    pub fn commit(&mut self, id: InstanceId, origin: Point, rotation: Rotation, group: Option<&str>) {
        let origin = origin.snapped(self.grid());
        let rect = self.rect_at(id, origin, rotation);
        let inst = self.schematic.instance_mut(id);
        inst.position = origin;
        inst.rotation = rotation;
        inst.group = group.map(str::to_owned);
        match self.rects.iter_mut().find(|p| p.id == id) {
            Some(existing) => {
                existing.rect = rect;
                existing.group = group.map(str::to_owned);
            }
            None => self.rects.push(PlacedRect {
                id,
                rect,
                group: group.map(str::to_owned),
            }),
        }
        if let Some(flag) = self.placed.get_mut(id.index()) {
            *flag = true;
        }
    }

    /// Snaps `origin`, checks it and commits on success.
    pub fn try_at(
        &mut self,
        id: InstanceId,
        origin: Point,
        rotation: Rotation,
        clearance: f64,
        fit: Fit<'_>,
        group: Option<&str>,
    ) -> bool {
        let origin = origin.snapped(self.grid());
        let rect = self.rect_at(id, origin, rotation);
        if self.is_free(&rect, clearance, fit, None) {
            self.commit(id, origin, rotation, group);
            true
        } else {
            false
        }
    }

    /// Last tier for any component: seeded random tries, then a raster
    /// scan, then a forced overlapping position with a warning.
    pub fn fallback(&mut self, id: InstanceId, group: Option<&str>) {
        let c = self.config.canvas.clone();
        let avoid = self.clearance();
        let (w, h) = self.schematic.instance(id).size_at(Rotation::R0);
        let max_x = c.width - c.edge_margin - w;
        let max_y = c.height - c.edge_margin - h;
        let reference = self.schematic.instance(id).reference.clone();

        if max_x >= c.edge_margin && max_y >= c.edge_margin {
            for _ in 0..RANDOM_TRIES {
                let x = self.rng.gen_range(c.edge_margin..=max_x);
                let y = self.rng.gen_range(c.edge_margin..=max_y);
                let origin = Point::new(snap(x, c.grid), snap(y, c.grid));
                if self.try_at(id, origin, Rotation::R0, avoid, Fit::Normal, group) {
                    log::warn!("{reference}: random fallback at {origin}");
                    self.sink.emit(
                        Diagnostic::note(RANDOM_FALLBACK, "no structured position found, placed randomly")
                            .on_component(&reference),
                    );
                    return;
                }
            }
            let first = (c.edge_margin / c.grid).ceil() * c.grid;
            let mut y = first;
            while y <= max_y {
                let mut x = first;
                while x <= max_x {
                    if self.try_at(id, Point::new(x, y), Rotation::R0, avoid, Fit::Normal, group) {
                        log::warn!("{reference}: raster fallback at ({x}, {y})");
                        self.sink.emit(
                            Diagnostic::note(RANDOM_FALLBACK, "no structured position found, placed by scan")
                                .on_component(&reference),
                        );
                        return;
                    }
                    x += c.grid;
                }
                y += c.grid;
            }
        }

        let origin = Point::new(c.edge_margin, c.edge_margin);
        log::warn!("{reference}: canvas full, forcing position");
        self.sink.emit(
            Diagnostic::warning(FORCED_PLACEMENT, "no free space left on the canvas; component overlaps others")
                .on_component(&reference),
        );
        self.commit(id, origin, Rotation::R0, group);
    }

    /// Emits a note that a critical peripheral was placed by a weaker tier.
    pub fn degraded(&self, id: InstanceId, message: &str) {
        let reference = &self.schematic.instance(id).reference;
        log::debug!("{reference}: {message}");
        self.sink
            .emit(Diagnostic::note(DEGRADED_PERIPHERAL, message).on_component(reference.as_str()));
    }
}
