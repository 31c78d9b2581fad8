//! Broad- and narrow-phase collision detection
//!
//! Broad phase: a source entity only looks at members of its own grid cell
//! and the four direct neighbors. Candidates pulled in across a wrap seam are
//! shifted by the seam offset so the narrow phase works in one continuous
//! frame of reference. Entities allowed off the canvas (the saucer on its
//! way in or out) are measured from their wrapped position, the same one the
//! grid files them under.
//!
//! Narrow phase: vertex-in-polygon. Point entities (bullets) test their
//! position against the other polygon; polygon sources test each of their
//! world-space vertices against the target. This is cheaper than a full
//! polygon intersection and misses edge-only crossings.

use std::collections::HashSet;

use glam::Vec2;

use super::entity::{Entity, EntityId};
use super::world::World;
use crate::wrap_coord;

/// A detected hit between a source and a target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub source: EntityId,
    pub target: EntityId,
    /// Offset that was applied to the target to bring it next to the source,
    /// measured between their stored positions
    pub offset: Vec2,
}

/// Even-odd ray cast test of `p` against a closed polygon
pub fn point_in_polygon(p: Vec2, poly: &[Vec2]) -> bool {
    if poly.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = poly.len() - 1;
    for i in 0..poly.len() {
        let (a, b) = (poly[i], poly[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Narrow-phase test of `source` against `target` shifted by `offset`
pub fn overlaps(source: &Entity, target: &Entity, offset: Vec2) -> bool {
    match (source.is_point(), target.is_point()) {
        // Two points never overlap
        (true, true) => false,
        (true, false) => point_in_polygon(source.pos(), &target.world_points(offset)),
        (false, true) => point_in_polygon(target.pos() + offset, &source.world_points(Vec2::ZERO)),
        (false, false) => {
            let poly = target.world_points(offset);
            source
                .world_points(Vec2::ZERO)
                .into_iter()
                .any(|v| point_in_polygon(v, &poly))
        }
    }
}

/// Per-frame collision resolver
///
/// Tracks which unordered pairs already reacted this frame so a pair seen
/// from both sides, or through more than one seam, reacts once.
#[derive(Debug, Default)]
pub struct CollisionEngine {
    seen: HashSet<(EntityId, EntityId)>,
}

impl CollisionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every visible source against its neighborhood, calling `on_hit`
    /// for each new contact
    ///
    /// `on_hit` may hide entities or queue spawns; the source list is fixed at
    /// the start of the pass and a source hidden mid-scan stops scanning.
    pub fn run(&mut self, world: &mut World, mut on_hit: impl FnMut(&mut World, Contact)) {
        self.seen.clear();
        let (width, height) = (world.grid.width(), world.grid.height());

        for source_id in world.pool.ids() {
            let Some(source) = world.pool.get(source_id) else {
                continue;
            };
            if !source.visible || source.kind.behavior().targets.is_empty() {
                continue;
            }
            let Some(cell) = source.cell() else {
                debug_assert!(false, "visible {:?} {:?} is not filed in the grid", source.kind, source_id);
                log::warn!("Skipping unfiled {:?} {:?}", source.kind, source_id);
                continue;
            };

            'scan: for (cell_id, offset) in world.grid.scan(cell) {
                let candidates = world.grid.cell(cell_id).members().to_vec();
                for target_id in candidates {
                    if target_id == source_id {
                        continue;
                    }
                    let (Some(source), Some(target)) = (world.pool.get(source_id), world.pool.get(target_id)) else {
                        continue;
                    };
                    if !source.visible {
                        break 'scan;
                    }
                    if !target.visible || !source.kind.targets(target.kind) {
                        continue;
                    }
                    let key = ordered(source_id, target_id);
                    let offset = offset + seam_shift(target.pos(), width, height)
                        - seam_shift(source.pos(), width, height);
                    if self.seen.contains(&key) || !overlaps(source, target, offset) {
                        continue;
                    }
                    self.seen.insert(key);
                    log::trace!("{:?} {:?} hit {:?} {:?}", source.kind, source_id, target.kind, target_id);
                    on_hit(
                        world,
                        Contact {
                            source: source_id,
                            target: target_id,
                            offset,
                        },
                    );
                }
            }
        }
    }
}

/// Distance from a stored position to its wrapped position on the canvas
fn seam_shift(pos: Vec2, width: f32, height: f32) -> Vec2 {
    Vec2::new(wrap_coord(pos.x, width), wrap_coord(pos.y, height)) - pos
}

fn ordered(a: EntityId, b: EntityId) -> (EntityId, EntityId) {
    if a <= b { (a, b) } else { (b, a) }
}
