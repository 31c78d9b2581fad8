//! Fixed timestep simulation tick
//!
//! One tick: flow controller, upgrade recompute, movement, collisions and
//! reactions, end-of-frame sweep, then sound and render hooks.

use super::collision::CollisionEngine;
use super::flow::GameFlow;
use super::reaction;
use super::state::{GameEvent, GamePhase, GameState};
use super::world::World;
use crate::audio::SoundEffect;
use crate::hooks::Hooks;
use crate::settings::Settings;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Rotate counter-clockwise
    pub left: bool,
    /// Rotate clockwise
    pub right: bool,
    pub thrust: bool,
    pub fire: bool,
    /// Start a game / leave the game over screen (edge, not held)
    pub start: bool,
    /// Pause toggle
    pub pause: bool,
}

/// Everything that makes up one running session
pub struct Game {
    pub state: GameState,
    pub world: World,
    pub flow: GameFlow,
    engine: CollisionEngine,
    paused: bool,
    events: Vec<GameEvent>,
    frame: u64,
}

impl Game {
    pub fn new(settings: &Settings, seed: u64) -> Self {
        log::info!("Game created with seed {}", seed);
        Self {
            state: GameState::new(settings),
            world: World::new(settings, seed),
            flow: GameFlow::new(),
            engine: CollisionEngine::new(),
            paused: false,
            events: Vec::new(),
            frame: 0,
        }
    }

    #[inline]
    pub fn phase(&self) -> GamePhase {
        self.flow.phase()
    }

    pub fn request_start(&mut self) {
        self.flow.request_start();
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Events raised during the last simulated frame
    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    /// Simulated frames so far (paused frames excluded)
    pub fn frame(&self) -> u64 {
        self.frame
    }
}

/// Advance the game by one fixed timestep
pub fn tick(game: &mut Game, input: &TickInput, hooks: &mut Hooks, dt: f32) {
    if input.pause {
        game.paused = !game.paused;
        log::info!("{}", if game.paused { "Paused" } else { "Resumed" });
    }
    if game.paused {
        render(hooks, game.flow.phase(), &game.state, &game.world, true);
        return;
    }

    let Game {
        state,
        world,
        flow,
        engine,
        events,
        frame,
        ..
    } = game;
    events.clear();

    flow.execute(world, state, hooks, input, dt);

    if state.upgrade.recompute(state.score) {
        log::info!("Upgrade level {} reached", state.upgrade.level);
        world.events.push(GameEvent::UpgradeGained {
            level: state.upgrade.level,
        });
        world.play(SoundEffect::Explosion);
    }

    if flow.phase() != GamePhase::Waiting {
        world.step(input, state.upgrade.level, dt);
        engine.run(world, |world, contact| reaction::resolve(world, state, contact));
    }

    if world
        .events
        .iter()
        .any(|e| matches!(e, GameEvent::ShipDestroyed { .. }))
    {
        flow.player_died();
    }

    world.sweep();
    debug_assert!(world.membership_holds(), "grid membership out of sync after sweep");

    events.append(&mut world.events);
    for event in events.iter() {
        if let GameEvent::Sound(effect) = event {
            hooks.play(*effect);
        }
    }

    render(hooks, flow.phase(), state, world, false);
    *frame += 1;
}

fn render(hooks: &mut Hooks, phase: GamePhase, state: &GameState, world: &World, paused: bool) {
    let Some(renderer) = hooks.renderer.as_mut() else {
        return;
    };
    renderer.begin_frame(phase, state);
    for entity in world.pool.iter().filter(|e| e.visible) {
        renderer.draw(entity);
    }
    if paused {
        renderer.draw_paused();
    }
    renderer.end_frame();
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use glam::Vec2;
    use proptest::prelude::*;

    use super::*;
    use crate::audio::AudioSink;
    use crate::consts::*;
    use crate::hooks::Renderer;
    use crate::sim::collision::Contact;
    use crate::sim::{Entity, EntityId, EntityKind};

    fn idle(game: &mut Game, hooks: &mut Hooks, frames: usize) {
        for _ in 0..frames {
            tick(game, &TickInput::default(), hooks, SIM_DT);
        }
    }

    /// A game in `Run` with one parked asteroid far from the center
    fn running_game(seed: u64) -> (Game, Hooks) {
        let mut game = Game::new(&Settings::default(), seed);
        let mut hooks = Hooks::new();
        idle(&mut game, &mut hooks, 1);
        assert_eq!(game.phase(), GamePhase::Waiting);
        game.request_start();
        idle(&mut game, &mut hooks, 2);
        assert_eq!(game.phase(), GamePhase::SpawnShip);

        game.world.clear_asteroids();
        game.world.sweep();
        let anchor = game.world.spawn_asteroid(Vec2::new(60.0, 60.0), 1.0);
        still(&mut game.world, anchor);
        idle(&mut game, &mut hooks, 1);
        assert_eq!(game.phase(), GamePhase::Run);
        (game, hooks)
    }

    fn still(world: &mut World, id: EntityId) {
        if let Some(e) = world.pool.get_mut(id) {
            e.transform.vel = Vec2::ZERO;
            e.transform.spin = 0.0;
        }
    }

    fn move_ship(world: &mut World, pos: Vec2) {
        let ship = world.ship_id();
        world.hide(ship);
        if let Some(s) = world.pool.get_mut(ship) {
            s.transform.pos = pos;
            s.transform.vel = Vec2::ZERO;
        }
        world.show(ship);
    }

    fn contacts(world: &mut World) -> Vec<Contact> {
        let mut found = Vec::new();
        CollisionEngine::new().run(world, |_, c| found.push(c));
        found
    }

    #[test]
    fn test_boot_to_run() {
        let (game, _) = running_game(1);
        assert!(game.world.is_visible(game.world.ship_id()));
        assert_eq!(game.state.lives, START_LIVES);
        assert!(game.frame() > 0);
    }

    #[test]
    fn test_tick_pause() {
        let (mut game, mut hooks) = running_game(2);
        let pause = TickInput {
            pause: true,
            ..Default::default()
        };
        tick(&mut game, &pause, &mut hooks, SIM_DT);
        assert!(game.is_paused());
        let frame = game.frame();
        let ship = game.world.ship().map(|s| s.pos());

        let thrust = TickInput {
            thrust: true,
            ..Default::default()
        };
        for _ in 0..30 {
            tick(&mut game, &thrust, &mut hooks, SIM_DT);
        }
        assert_eq!(game.frame(), frame);
        assert_eq!(game.world.ship().map(|s| s.pos()), ship);

        tick(&mut game, &pause, &mut hooks, SIM_DT);
        assert!(!game.is_paused());
        assert_eq!(game.frame(), frame + 1);
    }

    #[test]
    fn test_wrap_crossing_seen_from_both_sides() {
        let mut world = World::new(&Settings::default(), 4);
        let rock = world.spawn_asteroid(Vec2::new(2.0, 330.0), 1.0);
        if let Some(r) = world.pool.get_mut(rock) {
            r.transform.vel = Vec2::new(-180.0, 0.0);
            r.transform.spin = 0.0;
        }
        world.step(&TickInput::default(), 0, SIM_DT);

        let r = world.pool.get(rock).expect("rock");
        assert!(r.pos().x > world.width() - 5.0);
        let cell = r.cell().expect("filed");
        assert_eq!(world.grid.cell(cell).col, world.grid.cols() - 1);
        assert!(world.membership_holds());

        // Seen across the seam from a bullet in the first column
        let bullet = world.bullet_ids()[0];
        if let Some(b) = world.pool.get_mut(bullet) {
            b.transform.pos = Vec2::new(5.0, 330.0);
        }
        world.show(bullet);
        let hits = contacts(&mut world);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].target, rock);
        assert_eq!(hits[0].offset, Vec2::new(-world.width(), 0.0));

        // And directly from a bullet on its own side
        world.hide(bullet);
        let width = world.width();
        if let Some(b) = world.pool.get_mut(bullet) {
            b.transform.pos = Vec2::new(width - 20.0, 330.0);
        }
        world.show(bullet);
        let hits = contacts(&mut world);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].offset, Vec2::ZERO);
    }

    #[test]
    fn test_enemy_straddling_seam_is_hit() {
        let mut world = World::new(&Settings::default(), 4);
        world.spawn_enemy();
        let enemy = world.enemy_id();
        world.hide(enemy);
        if let Some(e) = world.pool.get_mut(enemy) {
            e.transform.pos = Vec2::new(-5.0, 330.0);
        }
        world.show(enemy);
        let cell = world.enemy().and_then(|e| e.cell()).expect("filed");
        assert_eq!(world.grid.cell(cell).col, world.grid.cols() - 1);

        let bullet = world.bullet_ids()[0];
        if let Some(b) = world.pool.get_mut(bullet) {
            b.transform.pos = Vec2::new(3.0, 330.0);
        }
        world.show(bullet);

        let hits = contacts(&mut world);
        assert_eq!(hits.len(), 1);
        assert_eq!((hits[0].source, hits[0].target), (bullet, enemy));
        assert_eq!(hits[0].offset, Vec2::ZERO);

        // The far side of the same seam
        world.hide(enemy);
        let width = world.width();
        if let Some(e) = world.pool.get_mut(enemy) {
            e.transform.pos = Vec2::new(width + 5.0, 330.0);
        }
        world.show(enemy);
        world.hide(bullet);
        if let Some(b) = world.pool.get_mut(bullet) {
            b.transform.pos = Vec2::new(width - 3.0, 330.0);
        }
        world.show(bullet);
        assert_eq!(contacts(&mut world).len(), 1);
    }

    #[test]
    fn test_cooldown_spends_one_charge_for_two_hits() {
        let (mut game, mut hooks) = running_game(5);
        game.state.score = 1500;

        let y = 330.0;
        move_ship(&mut game.world, Vec2::new(30.0, y));
        let direct = game.world.spawn_asteroid(Vec2::new(30.0, y), 1.0);
        let across = game.world.spawn_asteroid(Vec2::new(game.world.width() - 5.0, y), 1.0);
        still(&mut game.world, direct);
        still(&mut game.world, across);

        idle(&mut game, &mut hooks, 1);

        assert_eq!(game.state.upgrade.hits, 1);
        assert_eq!(game.state.upgrade.level, 0);
        assert_eq!(game.state.lives, START_LIVES);
        assert!(game.world.is_visible(game.world.ship_id()));
        assert_eq!(game.phase(), GamePhase::Run);
        let spent = game
            .events()
            .iter()
            .filter(|e| matches!(e, GameEvent::ChargeSpent { .. }))
            .count();
        assert_eq!(spent, 1);
    }

    #[test]
    fn test_fatal_collision_reaches_end_game_then_boot() {
        let (mut game, mut hooks) = running_game(6);
        game.state.lives = 0;
        let pos = Vec2::new(300.0, 300.0);
        move_ship(&mut game.world, pos);
        let rock = game.world.spawn_asteroid(pos, 1.0);
        still(&mut game.world, rock);

        idle(&mut game, &mut hooks, 1);
        assert_eq!(game.phase(), GamePhase::PlayerDied);
        assert_eq!(game.state.lives, -1);
        assert!(game.events().contains(&GameEvent::ShipDestroyed { lives: -1 }));

        let mut phases = vec![game.phase()];
        for _ in 0..((GAME_OVER_DELAY / SIM_DT) as usize + 30) {
            idle(&mut game, &mut hooks, 1);
            if phases.last() != Some(&game.phase()) {
                phases.push(game.phase());
            }
        }
        assert_eq!(
            phases,
            vec![
                GamePhase::PlayerDied,
                GamePhase::EndGame,
                GamePhase::Boot,
                GamePhase::Waiting
            ]
        );
    }

    #[derive(Default)]
    struct RecordingRenderer {
        frames: u32,
        draws: usize,
        paused_frames: u32,
        last_phase: Option<GamePhase>,
    }

    impl Renderer for RecordingRenderer {
        fn begin_frame(&mut self, phase: GamePhase, _state: &GameState) {
            self.frames += 1;
            self.draws = 0;
            self.last_phase = Some(phase);
        }

        fn draw(&mut self, _entity: &Entity) {
            self.draws += 1;
        }

        fn draw_paused(&mut self) {
            self.paused_frames += 1;
        }
    }

    #[derive(Default)]
    struct RecordingAudio {
        played: Vec<SoundEffect>,
    }

    impl AudioSink for RecordingAudio {
        fn play(&mut self, effect: SoundEffect) {
            self.played.push(effect);
        }
    }

    #[test]
    fn test_hooks_see_frames_and_sounds() {
        let renderer = Rc::new(RefCell::new(RecordingRenderer::default()));
        let audio = Rc::new(RefCell::new(RecordingAudio::default()));
        let (mut game, _) = running_game(7);
        let mut hooks = Hooks::new()
            .with_renderer(renderer.clone())
            .with_audio(audio.clone());

        let fire = TickInput {
            fire: true,
            ..Default::default()
        };
        tick(&mut game, &fire, &mut hooks, SIM_DT);

        let visible = game.world.pool.iter().filter(|e| e.visible).count();
        assert_eq!(renderer.borrow().frames, 1);
        assert_eq!(renderer.borrow().draws, visible);
        assert_eq!(renderer.borrow().last_phase, Some(GamePhase::Run));
        assert_eq!(audio.borrow().played, vec![SoundEffect::Laser]);
    }

    #[test]
    fn test_paused_frames_still_render() {
        let renderer = Rc::new(RefCell::new(RecordingRenderer::default()));
        let (mut game, _) = running_game(9);
        let mut hooks = Hooks::new().with_renderer(renderer.clone());
        let pause = TickInput {
            pause: true,
            ..Default::default()
        };

        tick(&mut game, &pause, &mut hooks, SIM_DT);
        idle(&mut game, &mut hooks, 2);

        let visible = game.world.pool.iter().filter(|e| e.visible).count();
        let r = renderer.borrow();
        assert_eq!(r.frames, 3);
        assert_eq!(r.paused_frames, 3);
        assert_eq!(r.draws, visible);
        assert_eq!(r.last_phase, Some(GamePhase::Run));
    }

    #[test]
    fn test_upgrade_gain_celebrates() {
        let (mut game, mut hooks) = running_game(8);
        game.state.score = UPGRADE_STEP_SCORE;
        idle(&mut game, &mut hooks, 1);
        assert!(game.events().contains(&GameEvent::UpgradeGained { level: 1 }));
        assert!(game.events().contains(&GameEvent::Sound(SoundEffect::Explosion)));
        // Unchanged score: nothing new
        idle(&mut game, &mut hooks, 1);
        assert!(!game.events().iter().any(|e| matches!(e, GameEvent::UpgradeGained { .. })));
    }

    #[test]
    fn test_determinism() {
        let inputs = [
            TickInput {
                thrust: true,
                fire: true,
                ..Default::default()
            },
            TickInput {
                left: true,
                fire: true,
                ..Default::default()
            },
            TickInput::default(),
        ];
        let run = || {
            let mut game = Game::new(&Settings::default(), 99_999);
            let mut hooks = Hooks::new();
            game.request_start();
            for i in 0..600 {
                tick(&mut game, &inputs[i % inputs.len()], &mut hooks, SIM_DT);
            }
            let rocks: Vec<(EntityKind, Vec2)> = game.world.pool.iter().map(|e| (e.kind, e.pos())).collect();
            (game.state.score, game.state.lives, game.phase(), rocks)
        };
        assert_eq!(run(), run());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(12))]

        #[test]
        fn prop_membership_holds_every_tick(
            seed in any::<u64>(),
            script in prop::collection::vec((any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()), 1..40),
        ) {
            let mut game = Game::new(&Settings::default(), seed);
            let mut hooks = Hooks::new();
            game.request_start();
            for i in 0..480 {
                let (left, right, thrust, fire) = script[i % script.len()];
                let input = TickInput { left, right, thrust, fire, start: i % 97 == 0, pause: false };
                tick(&mut game, &input, &mut hooks, SIM_DT);
                prop_assert!(game.world.membership_holds());
            }
        }
    }
}
