//! The playfield: entity pool, spatial grid and the per-frame movement pass
//!
//! Visibility and grid membership move together: `show` files an entity under
//! the cell at its position and `hide` takes it out again. Entities created or
//! destroyed while a pass is running go through `spawn_deferred` and the
//! `reap` flag and are settled in `sweep`.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::entity::{
    ENEMY_OUTLINE, EdgePolicy, Entity, EntityId, EntityKind, EntityPool, SHIP_OUTLINE, outline,
};
use super::grid::{CellId, Direction, SpatialGrid};
use super::state::GameEvent;
use super::tick::TickInput;
use super::transform::Transform;
use crate::audio::SoundEffect;
use crate::consts::*;
use crate::settings::Settings;
use crate::{heading_to_dir, wrap_coord};

pub struct World {
    pub pool: EntityPool,
    pub grid: SpatialGrid,
    pub rng: Pcg32,
    /// Events raised since the owner last drained them
    pub events: Vec<GameEvent>,
    ship: EntityId,
    enemy: EntityId,
    bullets: Vec<EntityId>,
    alien_bullets: Vec<EntityId>,
    pending: Vec<Entity>,
    glyph_count: usize,
}

impl World {
    pub fn new(settings: &Settings, seed: u64) -> Self {
        let mut world = Self {
            pool: EntityPool::new(),
            grid: SpatialGrid::new(settings.width, settings.height, settings.grid_size),
            rng: Pcg32::seed_from_u64(seed),
            events: Vec::new(),
            ship: EntityId(0),
            enemy: EntityId(0),
            bullets: Vec::new(),
            alien_bullets: Vec::new(),
            pending: Vec::new(),
            glyph_count: settings.glyph_count() as usize,
        };

        let mut ship = Entity::new(EntityKind::Ship, outline(&SHIP_OUTLINE));
        ship.transform = Transform::at(world.center());
        world.ship = world.spawn(ship);

        let bullets = (0..settings.bullet_pool)
            .map(|_| world.spawn(Entity::new(EntityKind::Bullet, Vec::new())))
            .collect();
        world.bullets = bullets;

        world.enemy = world.spawn(Entity::new(EntityKind::Enemy, outline(&ENEMY_OUTLINE)));
        let alien_bullets = (0..ENEMY_BULLET_POOL_SIZE)
            .map(|_| world.spawn(Entity::new(EntityKind::AlienBullet, Vec::new())))
            .collect();
        world.alien_bullets = alien_bullets;

        log::debug!(
            "World ready: {} pooled entities, {} bullets",
            world.pool.len(),
            settings.bullet_pool
        );
        world
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.grid.width()
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.grid.height()
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width() / 2.0, self.height() / 2.0)
    }

    pub fn ship_id(&self) -> EntityId {
        self.ship
    }

    pub fn enemy_id(&self) -> EntityId {
        self.enemy
    }

    pub fn ship(&self) -> Option<&Entity> {
        self.pool.get(self.ship)
    }

    pub fn enemy(&self) -> Option<&Entity> {
        self.pool.get(self.enemy)
    }

    pub fn bullet_ids(&self) -> &[EntityId] {
        &self.bullets
    }

    pub fn alien_bullet_ids(&self) -> &[EntityId] {
        &self.alien_bullets
    }

    pub fn is_visible(&self, id: EntityId) -> bool {
        self.pool.get(id).is_some_and(|e| e.visible)
    }

    pub fn play(&mut self, effect: SoundEffect) {
        self.events.push(GameEvent::Sound(effect));
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Insert an entity now, filing it in the grid if it is visible
    pub fn spawn(&mut self, entity: Entity) -> EntityId {
        let visible = entity.visible;
        let id = self.pool.insert(entity);
        if visible && let Some(e) = self.pool.get_mut(id) {
            e.transform.configure();
            self.grid.refile(e);
        }
        id
    }

    /// Queue an entity for insertion at the next sweep
    pub fn spawn_deferred(&mut self, entity: Entity) {
        self.pending.push(entity);
    }

    /// Make an entity visible and file it under the cell at its position
    pub fn show(&mut self, id: EntityId) {
        if let Some(e) = self.pool.get_mut(id) {
            e.visible = true;
            e.transform.configure();
            self.grid.refile(e);
        }
    }

    /// Hide an entity and take it out of the grid
    pub fn hide(&mut self, id: EntityId) {
        if let Some(e) = self.pool.get_mut(id) {
            e.visible = false;
            self.grid.leave(e);
        }
    }

    /// Hide and mark for removal at the next sweep
    pub fn retire(&mut self, id: EntityId) {
        self.hide(id);
        if let Some(e) = self.pool.get_mut(id) {
            e.reap = true;
        }
    }

    /// Remove reaped entities and insert queued spawns
    pub fn sweep(&mut self) {
        let reaped: Vec<EntityId> = self.pool.iter().filter(|e| e.reap).map(|e| e.id).collect();
        for id in reaped {
            if let Some(mut e) = self.pool.remove(id) {
                self.grid.leave(&mut e);
            }
        }
        for entity in std::mem::take(&mut self.pending) {
            self.spawn(entity);
        }
    }

    /// Every visible entity is a member of exactly the cell at its position,
    /// and nothing else is filed
    pub fn membership_holds(&self) -> bool {
        let mut filed = 0;
        for e in self.pool.iter() {
            match (e.visible, e.cell()) {
                (true, Some(cell)) => {
                    if cell != self.grid.cell_at(e.pos()) || !self.grid.cell(cell).members().contains(&e.id) {
                        return false;
                    }
                    filed += 1;
                }
                (false, None) => {}
                _ => return false,
            }
        }
        filed == self.grid.member_count()
    }

    // ========================================================================
    // Population
    // ========================================================================

    /// Live asteroids, including fragments waiting for the sweep
    pub fn asteroid_count(&self) -> usize {
        self.pool.count_kind(EntityKind::Asteroid)
            + self
                .pending
                .iter()
                .filter(|e| e.kind == EntityKind::Asteroid)
                .count()
    }

    /// Whether the 3x3 block around `pos` is free of what `kind` must avoid
    pub fn spawn_clear(&self, pos: Vec2, kind: EntityKind) -> bool {
        self.grid.is_clear(&self.pool, pos, kind.behavior().clearance)
    }

    /// Lay out a wave of full-size asteroids away from the ship and enemy
    pub fn spawn_asteroids(&mut self, count: u32) {
        for _ in 0..count {
            let pos = self.find_clear_spot(EntityKind::Asteroid);
            self.spawn_asteroid(pos, 1.0);
        }
        log::debug!("Spawned {} asteroids", count);
    }

    /// Insert one visible asteroid at `pos` right away
    pub fn spawn_asteroid(&mut self, pos: Vec2, scale: f32) -> EntityId {
        let glyphs = ((self.glyph_count as f32 * scale * scale) as usize).max(1);
        let rock = self.make_asteroid(pos, scale, glyphs);
        self.spawn(rock)
    }

    fn find_clear_spot(&mut self, kind: EntityKind) -> Vec2 {
        let (w, h) = (self.width(), self.height());
        let mut pos = Vec2::ZERO;
        for _ in 0..ASTEROID_PLACEMENT_ATTEMPTS {
            pos = Vec2::new(self.rng.random::<f32>() * w, self.rng.random::<f32>() * h);
            if self.spawn_clear(pos, kind) {
                return pos;
            }
        }
        log::debug!("No clear spot for {:?}, placing at {:?}", kind, pos);
        pos
    }

    /// Build a visible word-shaped asteroid with an irregular hull
    fn make_asteroid(&mut self, pos: Vec2, scale: f32, glyph_count: usize) -> Entity {
        let rng = &mut self.rng;
        let radius = ASTEROID_MIN_RADIUS + rng.random::<f32>() * ASTEROID_RADIUS_JITTER;
        let points = (0..ASTEROID_VERTICES)
            .map(|i| {
                let angle = i as f32 / ASTEROID_VERTICES as f32 * TAU;
                Vec2::from_angle(angle) * radius * rng.random_range(0.75_f32..=1.0)
            })
            .collect();

        let alphabet: Vec<char> = ASTEROID_GLYPHS.chars().collect();
        let glyphs = (0..glyph_count)
            .map(|_| alphabet[rng.random_range(0..alphabet.len())])
            .collect();

        let mut rock = Entity::new(EntityKind::Asteroid, points);
        rock.glyphs = glyphs;
        rock.transform = Transform::at(pos);
        rock.transform.scale = scale;
        rock.transform.rot = rng.random::<f32>() * 360.0;
        rock.transform.spin = rng.random_range(-ASTEROID_MAX_SPIN..=ASTEROID_MAX_SPIN);
        rock.transform.vel = Vec2::new(
            rng.random_range(-ASTEROID_MAX_DRIFT..=ASTEROID_MAX_DRIFT),
            rng.random_range(-ASTEROID_MAX_DRIFT..=ASTEROID_MAX_DRIFT),
        );
        rock.transform.configure();
        rock.visible = true;
        rock
    }

    /// Queue the fragments of a broken asteroid, if it is big enough to split
    pub fn split_asteroid(&mut self, id: EntityId) {
        let Some(rock) = self.pool.get(id) else {
            return;
        };
        let scale = rock.transform.scale / ASTEROID_SPLIT_FACTOR;
        if scale <= ASTEROID_MIN_SCALE {
            return;
        }
        let (pos, vel) = (rock.pos(), rock.transform.vel);
        let glyphs = (rock.glyphs.len() / ASTEROID_FRAGMENTS).max(1);

        for _ in 0..ASTEROID_FRAGMENTS {
            let mut fragment = self.make_asteroid(pos, scale, glyphs);
            fragment.transform.vel = Vec2::new(
                self.rng.random_range(-FRAGMENT_MAX_DRIFT..=FRAGMENT_MAX_DRIFT),
                self.rng.random_range(-FRAGMENT_MAX_DRIFT..=FRAGMENT_MAX_DRIFT),
            ) + vel * FRAGMENT_PUSH;
            self.spawn_deferred(fragment);
        }
        log::trace!("Asteroid {:?} split at scale {:.3}", id, scale);
    }

    /// Queue an explosion effect
    pub fn explosion_at(&mut self, pos: Vec2) {
        let mut boom = Entity::new(EntityKind::Explosion, Vec::new());
        boom.transform = Transform::at(pos);
        boom.visible = true;
        self.spawn_deferred(boom);
        self.events.push(GameEvent::Explosion { x: pos.x, y: pos.y });
    }

    /// Retire every asteroid
    pub fn clear_asteroids(&mut self) {
        let rocks: Vec<EntityId> = self
            .pool
            .iter()
            .filter(|e| e.kind == EntityKind::Asteroid)
            .map(|e| e.id)
            .collect();
        for id in rocks {
            self.retire(id);
        }
        self.pending.retain(|e| e.kind != EntityKind::Asteroid);
    }

    /// Hide the enemy and its projectiles
    pub fn stow_enemy(&mut self) {
        self.hide(self.enemy);
        for id in self.alien_bullets.clone() {
            self.stow_projectile(id);
        }
    }

    /// Return every pooled projectile and the enemy to the pool
    pub fn stow_transients(&mut self) {
        for id in self.bullets.clone() {
            self.stow_projectile(id);
        }
        self.stow_enemy();
    }

    /// Return a projectile to its pool
    pub fn stow_projectile(&mut self, id: EntityId) {
        if let Some(e) = self.pool.get_mut(id) {
            debug_assert!(e.kind.is_projectile(), "{:?} is not a projectile", e.kind);
            e.age = 0.0;
        }
        self.hide(id);
    }

    // ========================================================================
    // Ship and enemy placement
    // ========================================================================

    /// Hide the ship and move it to `pos`, ready for launch
    pub fn park_ship(&mut self, pos: Vec2) {
        self.hide(self.ship);
        if let Some(ship) = self.pool.get_mut(self.ship) {
            ship.transform.pos = pos;
            ship.transform.configure();
        }
    }

    /// Reset the parked ship's motion and show it
    pub fn launch_ship(&mut self) {
        if let Some(ship) = self.pool.get_mut(self.ship) {
            ship.transform.rot = 0.0;
            ship.transform.spin = 0.0;
            ship.transform.vel = Vec2::ZERO;
            ship.accel = Vec2::ZERO;
            ship.hit_cooldown = 0.0;
            ship.fire_cooldown = 0.0;
        }
        self.show(self.ship);
    }

    /// Pick a new entry side and height for the enemy
    pub fn reposition_enemy(&mut self) {
        let from_left = self.rng.random_bool(0.5);
        let y = self.rng.random::<f32>() * self.height();
        let x = if from_left {
            -ENEMY_MARGIN
        } else {
            self.width() + ENEMY_MARGIN
        };
        if let Some(enemy) = self.pool.get_mut(self.enemy) {
            enemy.transform.pos = Vec2::new(x, y);
            enemy.transform.vel = Vec2::new(if from_left { ENEMY_SPEED } else { -ENEMY_SPEED }, 0.0);
            enemy.transform.configure();
        }
        if self.is_visible(self.enemy)
            && let Some(enemy) = self.pool.get_mut(self.enemy)
        {
            self.grid.refile(enemy);
        }
    }

    /// Bring the enemy in from a fresh entry point
    pub fn spawn_enemy(&mut self) {
        self.reposition_enemy();
        if let Some(enemy) = self.pool.get_mut(self.enemy) {
            enemy.fire_cooldown = ENEMY_FIRE_COOLDOWN;
        }
        self.show(self.enemy);
        log::debug!("Enemy entering");
    }

    // ========================================================================
    // Movement
    // ========================================================================

    /// Movement pass over every visible entity in id order
    pub fn step(&mut self, input: &TickInput, upgrade_level: u32, dt: f32) {
        let (width, height) = (self.width(), self.height());

        for id in self.pool.ids() {
            let Some(kind) = self.pool.get(id).filter(|e| e.visible).map(|e| e.kind) else {
                continue;
            };

            match kind {
                EntityKind::Ship => self.ship_pre_move(id, input, upgrade_level, dt),
                EntityKind::Bullet | EntityKind::AlienBullet => self.projectile_pre_move(id, dt),
                EntityKind::Enemy => self.enemy_pre_move(id, dt),
                EntityKind::Explosion => self.explosion_pre_move(id, dt),
                EntityKind::Asteroid => {}
            }

            let Some(entity) = self.pool.get_mut(id) else {
                continue;
            };
            if !entity.visible {
                continue;
            }
            entity.transform.vel += entity.accel * dt;
            entity.transform.integrate(dt);
            match kind.behavior().edge {
                EdgePolicy::Wrap => entity.transform.wrap(width, height),
                EdgePolicy::WrapVertical => {
                    entity.transform.pos.y = wrap_coord(entity.transform.pos.y, height)
                }
                EdgePolicy::Fixed => {}
            }
            entity.transform.configure();
            self.grid.refile(entity);

            if kind == EntityKind::Enemy {
                self.enemy_post_move(id);
            }
        }
    }

    fn ship_pre_move(&mut self, id: EntityId, input: &TickInput, upgrade_level: u32, dt: f32) {
        let Some(ship) = self.pool.get_mut(id) else {
            return;
        };
        ship.hit_cooldown = (ship.hit_cooldown - dt).max(0.0);
        ship.fire_cooldown = (ship.fire_cooldown - dt).max(0.0);

        ship.transform.spin = match (input.left, input.right) {
            (true, false) => -SHIP_TURN_RATE,
            (false, true) => SHIP_TURN_RATE,
            _ => 0.0,
        };
        let heading = heading_to_dir(ship.transform.rot);
        ship.accel = if input.thrust {
            heading * SHIP_THRUST
        } else {
            Vec2::ZERO
        };
        if ship.transform.vel.length() > SHIP_MAX_SPEED {
            ship.transform.vel *= SHIP_OVERSPEED_DAMPING;
        }

        if !input.fire || ship.fire_cooldown > 0.0 {
            return;
        }
        ship.fire_cooldown = SHIP_FIRE_COOLDOWN;
        let origin = ship.pos() + heading * BULLET_MUZZLE_OFFSET;
        let shots = if upgrade_level >= DOUBLE_SHOT_LEVEL { 2 } else { 1 };
        self.fire_bullets(origin, heading, shots);
    }

    /// Fire `shots` pooled bullets fanned around `heading`; shots beyond the
    /// free pool are dropped
    fn fire_bullets(&mut self, origin: Vec2, heading: Vec2, shots: u32) {
        let center = (shots as f32 - 1.0) / 2.0;
        for i in 0..shots {
            let Some(id) = self.bullets.iter().copied().find(|&b| !self.is_visible(b)) else {
                log::trace!("Bullet pool exhausted");
                return;
            };
            let dir = Vec2::from_angle((i as f32 - center) * DOUBLE_SHOT_SPREAD).rotate(heading);
            if let Some(bullet) = self.pool.get_mut(id) {
                bullet.age = 0.0;
                bullet.transform.pos = origin;
                bullet.transform.vel = dir * BULLET_SPEED;
            }
            self.show(id);
            self.play(SoundEffect::Laser);
        }
    }

    fn projectile_pre_move(&mut self, id: EntityId, dt: f32) {
        let expired = match self.pool.get_mut(id) {
            Some(p) => {
                p.age += dt;
                p.age > BULLET_LIFETIME
            }
            None => false,
        };
        if expired {
            self.stow_projectile(id);
        }
    }

    fn explosion_pre_move(&mut self, id: EntityId, dt: f32) {
        let done = match self.pool.get_mut(id) {
            Some(e) => {
                e.transform.scale += EXPLOSION_GROWTH * dt;
                e.transform.scale > EXPLOSION_MAX_SCALE
            }
            None => false,
        };
        if done {
            self.retire(id);
        }
    }

    /// Dodge toward the emptier side and fire on a cooldown
    fn enemy_pre_move(&mut self, id: EntityId, dt: f32) {
        let Some(cell) = self.pool.get(id).and_then(|e| e.cell()) else {
            return;
        };
        let north = self.grid.neighbor(cell, Direction::North);
        let south = self.grid.neighbor(cell, Direction::South);
        let top = self.crowded_cells(north);
        let bottom = self.crowded_cells(south);
        let flip = top == bottom && self.rng.random_bool(ENEMY_DRIFT_FLIP_CHANCE);

        let Some(enemy) = self.pool.get_mut(id) else {
            return;
        };
        if top > bottom {
            enemy.transform.vel.y = ENEMY_DODGE_SPEED;
        } else if bottom > top {
            enemy.transform.vel.y = -ENEMY_DODGE_SPEED;
        } else if flip {
            enemy.transform.vel.y = -enemy.transform.vel.y;
        }

        enemy.fire_cooldown -= dt;
        if enemy.fire_cooldown > 0.0 {
            return;
        }
        enemy.fire_cooldown = ENEMY_FIRE_COOLDOWN;
        let origin = enemy.pos();
        self.fire_alien_bullet(origin);
    }

    /// Occupied cells among a row cell and its east and west neighbors
    fn crowded_cells(&self, row: CellId) -> usize {
        let kinds = [EntityKind::Asteroid];
        [
            row,
            self.grid.neighbor(row, Direction::East),
            self.grid.neighbor(row, Direction::West),
        ]
        .into_iter()
        .filter(|&c| self.grid.occupied_by(&self.pool, c, &kinds))
        .count()
    }

    fn fire_alien_bullet(&mut self, origin: Vec2) {
        let Some(id) = self
            .alien_bullets
            .iter()
            .copied()
            .find(|&b| !self.is_visible(b))
        else {
            return;
        };
        let dir = Vec2::from_angle(self.rng.random::<f32>() * TAU);
        if let Some(bullet) = self.pool.get_mut(id) {
            bullet.age = 0.0;
            bullet.transform.pos = origin;
            bullet.transform.vel = dir * ENEMY_BULLET_SPEED;
        }
        self.show(id);
        self.play(SoundEffect::Laser);
    }

    /// Leaving the playfield sideways hides the enemy and re-rolls its entry
    fn enemy_post_move(&mut self, id: EntityId) {
        let width = self.width();
        let Some(enemy) = self.pool.get(id) else {
            return;
        };
        let (x, vx) = (enemy.pos().x, enemy.transform.vel.x);
        if (vx > 0.0 && x > width + ENEMY_MARGIN) || (vx < 0.0 && x < -ENEMY_MARGIN) {
            self.hide(id);
            self.reposition_enemy();
            log::debug!("Enemy left the playfield");
        }
    }
}
