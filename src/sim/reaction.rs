//! What each kind does when a contact is reported
//!
//! Both sides of a contact react, target first. Reactions may hide entities,
//! mark them for removal and queue spawns, but never insert into or remove
//! from the pool directly.

use glam::Vec2;

use super::collision::Contact;
use super::entity::{EntityId, EntityKind};
use super::state::{GameEvent, GameState};
use super::world::World;
use crate::audio::SoundEffect;
use crate::consts::*;

/// One side of a contact, captured before either reaction runs
#[derive(Debug, Clone, Copy)]
struct Party {
    id: EntityId,
    kind: EntityKind,
    pos: Vec2,
    scale: f32,
}

fn party(world: &World, id: EntityId) -> Option<Party> {
    world.pool.get(id).map(|e| Party {
        id,
        kind: e.kind,
        pos: e.pos(),
        scale: e.transform.scale,
    })
}

/// Run both reactions for a contact
pub fn resolve(world: &mut World, state: &mut GameState, contact: Contact) {
    let (Some(source), Some(target)) = (party(world, contact.source), party(world, contact.target)) else {
        return;
    };
    react(world, state, target, source);
    react(world, state, source, target);
}

fn react(world: &mut World, state: &mut GameState, me: Party, other: Party) {
    match me.kind {
        EntityKind::Ship => ship_hit(world, state, me, other),
        EntityKind::Bullet | EntityKind::AlienBullet => world.stow_projectile(me.id),
        EntityKind::Asteroid => asteroid_hit(world, state, me, other),
        EntityKind::Enemy => enemy_hit(world, state, me, other),
        EntityKind::Explosion => {}
    }
}

fn ship_hit(world: &mut World, state: &mut GameState, me: Party, other: Party) {
    let Some(ship) = world.pool.get_mut(me.id) else {
        return;
    };
    if ship.hit_cooldown > 0.0 || !other.kind.is_hazard() {
        return;
    }

    if state.upgrade.level > 0 {
        ship.transform.vel *= SHIP_KNOCKBACK;
        ship.hit_cooldown = SHIP_HIT_COOLDOWN;
        state.upgrade.spend_charge(state.score);
        log::debug!("Ship absorbed a {:?}, upgrade level now {}", other.kind, state.upgrade.level);
        world.events.push(GameEvent::ChargeSpent {
            level: state.upgrade.level,
        });
    } else {
        world.hide(me.id);
        state.lives -= 1;
        log::info!("Ship destroyed by {:?}, {} lives left", other.kind, state.lives);
        world.events.push(GameEvent::ShipDestroyed { lives: state.lives });
    }

    world.explosion_at(other.pos);
    world.play(SoundEffect::Explosion);
}

fn asteroid_hit(world: &mut World, state: &mut GameState, me: Party, other: Party) {
    if world.pool.get(me.id).is_none_or(|e| e.reap) {
        return;
    }
    let points = if other.kind == EntityKind::Bullet {
        (ASTEROID_SCORE / me.scale.max(ASTEROID_MIN_SCALE)).round() as u64
    } else {
        0
    };
    state.award(points);

    world.split_asteroid(me.id);
    world.retire(me.id);
    world.explosion_at(other.pos);
    world.play(SoundEffect::Explosion);
    world.events.push(GameEvent::AsteroidDestroyed { points });
    log::trace!("Asteroid {:?} broken by {:?} for {} points", me.id, other.kind, points);
}

fn enemy_hit(world: &mut World, state: &mut GameState, me: Party, other: Party) {
    if !world.is_visible(me.id) {
        return;
    }
    let points = if other.kind == EntityKind::Bullet { ENEMY_SCORE } else { 0 };
    state.award(points);

    world.explosion_at(other.pos);
    world.play(SoundEffect::Explosion);
    world.hide(me.id);
    world.reposition_enemy();
    world.events.push(GameEvent::EnemyDestroyed { points });
    log::debug!("Enemy destroyed by {:?}", other.kind);
}
