//! Game-flow state machine
//!
//! One phase is active at a time. Each phase handler runs once per frame and
//! either does nothing, does its setup, or transitions. Delays are elapsed
//! counters advanced by the frame delta and cleared on every transition.

use rand::Rng;

use super::entity::EntityKind;
use super::state::{GameEvent, GamePhase, GameState};
use super::tick::TickInput;
use super::world::World;
use crate::consts::*;
use crate::hooks::Hooks;

#[derive(Debug, Clone)]
pub struct GameFlow {
    phase: GamePhase,
    /// Seconds spent in the current phase, if it is timing something
    timer: Option<f32>,
    /// Seconds until the enemy may enter
    enemy_timer: f32,
    start_requested: bool,
    start_pending: bool,
    game_over_shown: bool,
}

impl Default for GameFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl GameFlow {
    pub fn new() -> Self {
        Self {
            phase: GamePhase::Boot,
            timer: None,
            enemy_timer: 0.0,
            start_requested: false,
            start_pending: false,
            game_over_shown: false,
        }
    }

    #[inline]
    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    /// Ask for a new game; honored from the waiting screen
    pub fn request_start(&mut self) {
        self.start_requested = true;
    }

    pub fn enemy_timer(&self) -> f32 {
        self.enemy_timer
    }

    /// The ship was destroyed this frame
    pub fn player_died(&mut self) {
        self.transition(GamePhase::PlayerDied);
    }

    fn transition(&mut self, to: GamePhase) {
        log::debug!("{:?} -> {:?}", self.phase, to);
        if self.phase == GamePhase::EndGame {
            self.game_over_shown = false;
        }
        self.phase = to;
        self.timer = None;
    }

    /// Time spent in the current phase, starting the counter on first call
    fn elapsed(&mut self, dt: f32) -> f32 {
        let t = match self.timer {
            None => 0.0,
            Some(t) => t + dt,
        };
        self.timer = Some(t);
        t
    }

    /// Run the current phase's handler
    pub fn execute(
        &mut self,
        world: &mut World,
        state: &mut GameState,
        hooks: &mut Hooks,
        input: &TickInput,
        dt: f32,
    ) {
        if self.phase.in_game() {
            self.enemy_timer -= dt;
        }

        match self.phase {
            GamePhase::Boot => self.boot(world, hooks),
            GamePhase::Waiting => self.waiting(world, hooks, input),
            GamePhase::Start => self.start(world, state),
            GamePhase::SpawnShip => self.spawn_ship(world),
            GamePhase::Run => self.run(world),
            GamePhase::NewLevel => self.new_level(world, state, hooks, dt),
            GamePhase::PlayerDied => self.player_dead(state, dt),
            GamePhase::EndGame => self.end_game(state, hooks, input, dt),
        }
    }

    fn boot(&mut self, world: &mut World, hooks: &mut Hooks) {
        world.park_ship(world.center());
        world.stow_transients();
        world.clear_asteroids();
        world.spawn_asteroids(BOOT_ASTEROIDS);
        if let Some(renderer) = hooks.renderer.as_mut() {
            renderer.reset();
        }
        self.start_pending = false;
        self.transition(GamePhase::Waiting);
    }

    fn waiting(&mut self, world: &mut World, hooks: &mut Hooks, input: &TickInput) {
        if !(self.start_requested || input.start) {
            return;
        }
        self.start_requested = false;
        if self.start_pending {
            return;
        }
        self.start_pending = true;
        world.clear_asteroids();
        if let Some(ui) = hooks.game_over.as_mut() {
            ui.hide();
        }
        self.transition(GamePhase::Start);
    }

    fn start(&mut self, world: &mut World, state: &mut GameState) {
        state.reset();
        world.stow_transients();
        world.clear_asteroids();
        world.spawn_asteroids(state.asteroid_count);
        self.start_requested = false;
        self.enemy_timer = ENEMY_FIRST_SPAWN_MIN + world.rng.random::<f32>() * ENEMY_FIRST_SPAWN_JITTER;
        self.start_pending = false;
        log::info!("New game, enemy due in {:.1}s", self.enemy_timer);
        self.transition(GamePhase::SpawnShip);
    }

    fn spawn_ship(&mut self, world: &mut World) {
        let center = world.center();
        world.park_ship(center);
        if world.spawn_clear(center, EntityKind::Ship) {
            world.launch_ship();
            self.transition(GamePhase::Run);
        }
    }

    fn run(&mut self, world: &mut World) {
        if world.asteroid_count() == 0 {
            self.transition(GamePhase::NewLevel);
            return;
        }
        if self.enemy_timer <= 0.0 && !world.is_visible(world.enemy_id()) {
            world.spawn_enemy();
            self.enemy_timer = world.rng.random::<f32>() * ENEMY_RESPAWN_JITTER;
        }
    }

    fn new_level(&mut self, world: &mut World, state: &mut GameState, hooks: &mut Hooks, dt: f32) {
        if self.timer.is_none() {
            if let (Some(transition), Some(ship)) = (hooks.transition.as_mut(), world.ship()) {
                transition.start(ship);
            }
            world.stow_enemy();
            world.events.push(GameEvent::LevelCleared);
        }
        let held = self.elapsed(dt);
        if held < LEVEL_HOLD || hooks.transition_active() {
            return;
        }
        state.advance_level();
        world.spawn_asteroids(state.asteroid_count);
        log::info!("Level up: {} asteroids", state.asteroid_count);
        self.transition(GamePhase::Run);
    }

    fn player_dead(&mut self, state: &GameState, dt: f32) {
        if state.lives < 0 {
            self.transition(GamePhase::EndGame);
            return;
        }
        if self.elapsed(dt) >= RESPAWN_DELAY {
            self.transition(GamePhase::SpawnShip);
        }
    }

    fn end_game(&mut self, state: &GameState, hooks: &mut Hooks, input: &TickInput, dt: f32) {
        if !self.game_over_shown {
            self.game_over_shown = true;
            log::info!("Game over, final score {}", state.score);
            if let Some(ui) = hooks.game_over.as_mut() {
                ui.start(state.score);
            }
        }
        // Start requests made during play are stale here
        self.start_requested = false;

        match hooks.game_over.as_mut() {
            Some(ui) => {
                if input.start && ui.ready_for_restart() {
                    ui.hide();
                    self.transition(GamePhase::Boot);
                }
            }
            None => {
                if self.elapsed(dt) >= GAME_OVER_DELAY {
                    self.transition(GamePhase::Boot);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::hooks::{GameOverUi, LevelTransition};
    use crate::settings::Settings;
    use crate::sim::Entity;

    #[derive(Default)]
    struct RecordingUi {
        calls: Vec<String>,
        ready: bool,
    }

    impl GameOverUi for RecordingUi {
        fn start(&mut self, score: u64) {
            self.calls.push(format!("start {score}"));
        }

        fn ready_for_restart(&self) -> bool {
            self.ready
        }

        fn hide(&mut self) {
            self.calls.push("hide".to_string());
        }
    }

    #[derive(Default)]
    struct ManualTransition {
        started: u32,
        active: bool,
    }

    impl LevelTransition for ManualTransition {
        fn start(&mut self, _ship: &Entity) {
            self.started += 1;
            self.active = true;
        }

        fn is_active(&self) -> bool {
            self.active
        }
    }

    struct Fixture {
        flow: GameFlow,
        world: World,
        state: GameState,
        hooks: Hooks,
    }

    impl Fixture {
        fn new(hooks: Hooks) -> Self {
            let settings = Settings::default();
            Self {
                flow: GameFlow::new(),
                world: World::new(&settings, 3),
                state: GameState::new(&settings),
                hooks,
            }
        }

        fn step(&mut self, input: &TickInput) {
            self.flow
                .execute(&mut self.world, &mut self.state, &mut self.hooks, input, SIM_DT);
            self.world.sweep();
        }

        fn idle(&mut self, frames: usize) {
            for _ in 0..frames {
                self.step(&TickInput::default());
            }
        }

        /// Idle until the phase changes; returns the frames it took
        fn idle_while(&mut self, phase: GamePhase) -> usize {
            let mut frames = 0;
            while self.flow.phase() == phase && frames < 10_000 {
                self.idle(1);
                frames += 1;
            }
            frames
        }
    }

    fn press_start() -> TickInput {
        TickInput {
            start: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_boot_to_waiting() {
        let mut f = Fixture::new(Hooks::new());
        f.idle(1);
        assert_eq!(f.flow.phase(), GamePhase::Waiting);
        assert_eq!(f.world.asteroid_count(), BOOT_ASTEROIDS as usize);
        // Waiting is idle without a request
        f.idle(10);
        assert_eq!(f.flow.phase(), GamePhase::Waiting);
    }

    #[test]
    fn test_start_resets_state() {
        let mut f = Fixture::new(Hooks::new());
        f.idle(1);
        f.state.score = 999;
        f.flow.request_start();
        f.idle(2);
        assert_eq!(f.flow.phase(), GamePhase::SpawnShip);
        assert_eq!(f.state.score, 0);
        assert_eq!(f.state.lives, START_LIVES);
        assert_eq!(f.world.asteroid_count(), START_ASTEROIDS as usize);
        let due = f.flow.enemy_timer();
        assert!((ENEMY_FIRST_SPAWN_MIN..=ENEMY_FIRST_SPAWN_MIN + ENEMY_FIRST_SPAWN_JITTER).contains(&due));
    }

    #[test]
    fn test_second_start_request_is_ignored_while_pending() {
        let mut f = Fixture::new(Hooks::new());
        f.idle(1);
        f.step(&press_start());
        assert_eq!(f.flow.phase(), GamePhase::Start);
        f.flow.request_start();
        f.step(&press_start());
        assert_eq!(f.flow.phase(), GamePhase::SpawnShip);
        assert!(!f.flow.start_requested);
    }

    #[test]
    fn test_spawn_ship_waits_for_clear_center() {
        let mut f = Fixture::new(Hooks::new());
        f.idle(1);
        f.flow.request_start();
        f.idle(2);
        // Park an enemy right on the spawn point
        f.world.spawn_enemy();
        let center = f.world.center();
        let enemy = f.world.enemy_id();
        f.world.hide(enemy);
        if let Some(e) = f.world.pool.get_mut(enemy) {
            e.transform.pos = center;
        }
        f.world.show(enemy);
        f.idle(5);
        assert_eq!(f.flow.phase(), GamePhase::SpawnShip);
        assert!(!f.world.is_visible(f.world.ship_id()));

        f.world.hide(enemy);
        f.world.clear_asteroids();
        f.world.sweep();
        f.idle(1);
        assert_eq!(f.flow.phase(), GamePhase::Run);
        assert!(f.world.is_visible(f.world.ship_id()));
    }

    #[test]
    fn test_run_spawns_enemy_when_due() {
        let mut f = Fixture::new(Hooks::new());
        f.flow.phase = GamePhase::Run;
        f.world.spawn_asteroids(1);
        f.flow.enemy_timer = 2.0 * SIM_DT;
        f.idle(1);
        assert!(!f.world.is_visible(f.world.enemy_id()));
        f.idle(2);
        assert!(f.world.is_visible(f.world.enemy_id()));
        assert!(f.flow.enemy_timer() <= ENEMY_RESPAWN_JITTER);
    }

    #[test]
    fn test_new_level_holds_for_transition() {
        let transition = Rc::new(RefCell::new(ManualTransition::default()));
        let mut f = Fixture::new(Hooks::new().with_transition(transition.clone()));
        f.flow.phase = GamePhase::Run;
        f.state.reset();
        f.world.spawn_enemy();

        f.idle(1);
        assert_eq!(f.flow.phase(), GamePhase::NewLevel);
        f.idle(1);
        assert_eq!(transition.borrow().started, 1);
        assert!(!f.world.is_visible(f.world.enemy_id()));
        assert!(f.world.events.contains(&GameEvent::LevelCleared));

        // Hold has elapsed but the effect is still running
        f.idle((LEVEL_HOLD / SIM_DT) as usize + 5);
        assert_eq!(f.flow.phase(), GamePhase::NewLevel);
        assert_eq!(transition.borrow().started, 1);

        transition.borrow_mut().active = false;
        f.idle(1);
        assert_eq!(f.flow.phase(), GamePhase::Run);
        assert_eq!(f.state.asteroid_count, START_ASTEROIDS + 1);
        assert_eq!(f.world.asteroid_count(), (START_ASTEROIDS + 1) as usize);
    }

    #[test]
    fn test_new_level_without_collaborator_uses_hold() {
        let mut f = Fixture::new(Hooks::new());
        f.flow.phase = GamePhase::NewLevel;
        f.state.reset();
        f.idle((LEVEL_HOLD / SIM_DT) as usize - 5);
        assert_eq!(f.flow.phase(), GamePhase::NewLevel);
        f.idle(10);
        assert_eq!(f.flow.phase(), GamePhase::Run);
    }

    #[test]
    fn test_player_died_respawns_after_delay() {
        let mut f = Fixture::new(Hooks::new());
        f.state.reset();
        f.state.lives = 0;
        f.flow.player_died();
        f.idle(1);
        assert_eq!(f.flow.phase(), GamePhase::PlayerDied);
        let frames = f.idle_while(GamePhase::PlayerDied);
        assert_eq!(f.flow.phase(), GamePhase::SpawnShip);
        assert!((frames as f32 * SIM_DT - RESPAWN_DELAY).abs() < 3.0 * SIM_DT);
    }

    #[test]
    fn test_terminal_path_gated_by_ui() {
        let ui = Rc::new(RefCell::new(RecordingUi::default()));
        let mut f = Fixture::new(Hooks::new().with_game_over(ui.clone()));
        f.state.reset();
        f.state.score = 1234;
        f.state.lives = -1;
        f.flow.player_died();
        f.idle(1);
        assert_eq!(f.flow.phase(), GamePhase::EndGame);

        f.idle(3);
        assert_eq!(ui.borrow().calls, vec!["start 1234".to_string()]);

        // Not ready yet: start is ignored, and no timeout applies with a UI
        f.step(&press_start());
        f.idle((GAME_OVER_DELAY / SIM_DT) as usize + 10);
        assert_eq!(f.flow.phase(), GamePhase::EndGame);

        ui.borrow_mut().ready = true;
        f.step(&press_start());
        assert_eq!(f.flow.phase(), GamePhase::Boot);
        assert_eq!(ui.borrow().calls.last().map(String::as_str), Some("hide"));

        f.idle(1);
        assert_eq!(f.flow.phase(), GamePhase::Waiting);
    }

    #[test]
    fn test_end_game_times_out_without_ui() {
        let mut f = Fixture::new(Hooks::new());
        f.state.reset();
        f.state.lives = -1;
        f.flow.player_died();
        f.idle(1);
        assert_eq!(f.flow.phase(), GamePhase::EndGame);
        let frames = f.idle_while(GamePhase::EndGame);
        assert_eq!(f.flow.phase(), GamePhase::Boot);
        assert!((frames as f32 * SIM_DT - GAME_OVER_DELAY).abs() < 3.0 * SIM_DT);
    }

    #[test]
    fn test_stale_start_request_dropped_at_game_over() {
        let mut f = Fixture::new(Hooks::new());
        f.state.lives = -1;
        f.flow.player_died();
        f.flow.request_start();
        f.idle(2 + (GAME_OVER_DELAY / SIM_DT) as usize + 2);
        // Boot, then waiting without starting a game
        f.idle(2);
        assert_eq!(f.flow.phase(), GamePhase::Waiting);
    }
}
