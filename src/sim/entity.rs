//! Entities and the indexed pool that owns them
//!
//! Every game object is one `Entity`: shared fields plus a kind tag. Per-kind
//! behavior (collision targets, spawn clearance, wrapping) is looked up from a
//! static capability table instead of living on the entity.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::grid::CellId;
use super::transform::Transform;

/// Index of an entity in the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl EntityId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Closed set of entity kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Ship,
    Bullet,
    AlienBullet,
    Asteroid,
    Enemy,
    Explosion,
}

/// How an entity behaves at the playfield edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgePolicy {
    /// Wraps on both axes
    Wrap,
    /// Wraps vertically, leaves the playfield horizontally
    WrapVertical,
    /// Stays where it is (effects)
    Fixed,
}

/// Capability table entry for a kind
#[derive(Debug)]
pub struct Behavior {
    /// Kinds this entity tests against as a collision source
    pub targets: &'static [EntityKind],
    /// Kinds that must be absent around a spawn point
    pub clearance: &'static [EntityKind],
    pub edge: EdgePolicy,
    /// Point entities collide as their position, not a polygon
    pub point: bool,
}

const HAZARDS: &[EntityKind] = &[EntityKind::Asteroid, EntityKind::Enemy, EntityKind::AlienBullet];

static SHIP: Behavior = Behavior {
    targets: HAZARDS,
    clearance: HAZARDS,
    edge: EdgePolicy::Wrap,
    point: false,
};

static BULLET: Behavior = Behavior {
    targets: &[EntityKind::Asteroid, EntityKind::Enemy],
    clearance: &[],
    edge: EdgePolicy::Wrap,
    point: true,
};

static ALIEN_BULLET: Behavior = Behavior {
    targets: &[EntityKind::Asteroid],
    clearance: &[],
    edge: EdgePolicy::Wrap,
    point: true,
};

static ASTEROID: Behavior = Behavior {
    targets: &[],
    clearance: &[EntityKind::Ship, EntityKind::Enemy],
    edge: EdgePolicy::Wrap,
    point: false,
};

static ENEMY: Behavior = Behavior {
    targets: &[EntityKind::Asteroid],
    clearance: &[],
    edge: EdgePolicy::WrapVertical,
    point: false,
};

static EXPLOSION: Behavior = Behavior {
    targets: &[],
    clearance: &[],
    edge: EdgePolicy::Fixed,
    point: true,
};

impl EntityKind {
    pub fn behavior(self) -> &'static Behavior {
        match self {
            EntityKind::Ship => &SHIP,
            EntityKind::Bullet => &BULLET,
            EntityKind::AlienBullet => &ALIEN_BULLET,
            EntityKind::Asteroid => &ASTEROID,
            EntityKind::Enemy => &ENEMY,
            EntityKind::Explosion => &EXPLOSION,
        }
    }

    #[inline]
    pub fn targets(self, other: EntityKind) -> bool {
        self.behavior().targets.contains(&other)
    }

    /// Things that end a life or a charge when they touch the ship
    #[inline]
    pub fn is_hazard(self) -> bool {
        HAZARDS.contains(&self)
    }

    #[inline]
    pub fn is_projectile(self) -> bool {
        matches!(self, EntityKind::Bullet | EntityKind::AlienBullet)
    }
}

/// Ship outline, an "A" glyph (local units, nose at negative y)
pub const SHIP_OUTLINE: [[f32; 2]; 26] = [
    [0.0, -18.1],
    [3.5, -16.1],
    [7.0, -10.0],
    [11.0, -2.0],
    [14.5, 6.0],
    [17.5, 13.5],
    [16.3, 16.9],
    [14.0, 18.3],
    [12.7, 18.3],
    [10.5, 16.5],
    [9.0, 13.5],
    [6.0, 6.0],
    [3.0, -1.0],
    [0.0, -5.3],
    [-3.0, -1.0],
    [-6.0, 6.0],
    [-9.0, 13.5],
    [-10.5, 16.5],
    [-12.7, 18.3],
    [-14.0, 18.3],
    [-16.3, 16.9],
    [-17.5, 13.5],
    [-14.5, 6.0],
    [-11.0, -2.0],
    [-7.0, -10.0],
    [-3.5, -16.1],
];

/// Saucer hull
pub const ENEMY_OUTLINE: [[f32; 2]; 6] = [
    [-20.0, 0.0],
    [-12.0, -4.0],
    [12.0, -4.0],
    [20.0, 0.0],
    [12.0, 4.0],
    [-12.0, 4.0],
];

pub fn outline(points: &[[f32; 2]]) -> Vec<Vec2> {
    points.iter().map(|&[x, y]| Vec2::new(x, y)).collect()
}

/// A game object
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub transform: Transform,
    /// Thrust acceleration (pixels/second²), ship only
    pub accel: Vec2,
    /// Local polygon; empty for point entities
    pub points: Vec<Vec2>,
    /// Characters making up a word-shaped asteroid, for the renderer
    pub glyphs: Vec<char>,
    pub visible: bool,
    /// Marked for removal at the end-of-frame sweep
    pub reap: bool,
    /// Seconds a projectile has been in flight
    pub age: f32,
    /// Seconds until the next shot is allowed
    pub fire_cooldown: f32,
    /// Seconds during which collision reactions are ignored
    pub hit_cooldown: f32,
    pub(crate) cell: Option<CellId>,
}

impl Entity {
    pub fn new(kind: EntityKind, points: Vec<Vec2>) -> Self {
        Self {
            id: EntityId(u32::MAX),
            kind,
            transform: Transform::default(),
            accel: Vec2::ZERO,
            points,
            glyphs: Vec::new(),
            visible: false,
            reap: false,
            age: 0.0,
            fire_cooldown: 0.0,
            hit_cooldown: 0.0,
            cell: None,
        }
    }

    #[inline]
    pub fn pos(&self) -> Vec2 {
        self.transform.pos
    }

    /// Grid cell this entity is filed under, if any
    #[inline]
    pub fn cell(&self) -> Option<CellId> {
        self.cell
    }

    #[inline]
    pub fn is_point(&self) -> bool {
        self.kind.behavior().point || self.points.is_empty()
    }

    /// Polygon vertices in world space, shifted by `offset`
    pub fn world_points(&self, offset: Vec2) -> Vec<Vec2> {
        if self.is_point() {
            return vec![self.transform.pos + offset];
        }
        self.points
            .iter()
            .map(|&p| self.transform.project(p) + offset)
            .collect()
    }

    /// Largest distance from the origin to a local vertex, after scale
    pub fn radius(&self) -> f32 {
        self.points
            .iter()
            .map(|p| p.length())
            .fold(0.0_f32, f32::max)
            * self.transform.scale
    }
}

/// Indexed entity storage with slot reuse
#[derive(Debug, Default)]
pub struct EntityPool {
    slots: Vec<Option<Entity>>,
    free: Vec<u32>,
}

impl EntityPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an entity and return its id
    pub fn insert(&mut self, mut entity: Entity) -> EntityId {
        let id = match self.free.pop() {
            Some(index) => EntityId(index),
            None => {
                self.slots.push(None);
                EntityId((self.slots.len() - 1) as u32)
            }
        };
        entity.id = id;
        self.slots[id.index()] = Some(entity);
        id
    }

    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let taken = self.slots.get_mut(id.index())?.take();
        if taken.is_some() {
            self.free.push(id.0);
        }
        taken
    }

    #[inline]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.slots.get(id.index())?.as_ref()
    }

    #[inline]
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.slots.get_mut(id.index())?.as_mut()
    }

    /// Snapshot of live ids in slot order
    pub fn ids(&self) -> Vec<EntityId> {
        self.iter().map(|e| e.id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.slots.iter().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.slots.iter_mut().flatten()
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of live entities of a kind, ignoring ones marked for removal
    pub fn count_kind(&self, kind: EntityKind) -> usize {
        self.iter().filter(|e| e.kind == kind && !e.reap).count()
    }
}
