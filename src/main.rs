//! Glyph Roids entry point
//!
//! Native builds run a headless demo: the simulation at a fixed timestep, a
//! scripted pilot at the controls, a logging renderer and the stock audio
//! manager.
//!
//! Usage: `glyph-roids [settings.json] [seconds]`

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::time::Instant;

    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    use glyph_roids::audio::{AudioManager, SoundEffect};
    use glyph_roids::consts::*;
    use glyph_roids::heading_to_dir;
    use glyph_roids::hooks::{GameOverUi, Hooks, LevelTransition, Renderer};
    use glyph_roids::sim::{Entity, EntityKind, Game, GamePhase, GameState, TickInput, tick};
    use glyph_roids::{GameOverScreen, Scoreboard, Settings};

    /// Wall-clock frame length the demo pretends to render at
    const DISPLAY_DT: f32 = 1.0 / 30.0;
    const BANNER_FRAMES: u32 = 90;
    const DEFAULT_SECONDS: f32 = 180.0;

    /// Logs screen changes and HUD updates instead of drawing
    #[derive(Default)]
    struct LogRenderer {
        frames: u64,
        drawn: usize,
        phase: Option<GamePhase>,
        hud: Option<(u64, i32, u32)>,
        paused: bool,
        paused_frame: bool,
    }

    impl Renderer for LogRenderer {
        fn reset(&mut self) {
            self.hud = None;
        }

        fn begin_frame(&mut self, phase: GamePhase, state: &GameState) {
            self.frames += 1;
            self.drawn = 0;
            self.paused_frame = false;
            if self.phase != Some(phase) {
                log::info!("Screen: {:?}", phase);
                self.phase = Some(phase);
            }
            let hud = (state.score, state.lives, state.upgrade.level);
            if phase.shows_hud() && self.hud != Some(hud) {
                log::debug!("Score {} | Lives {} | Upgrade {}", hud.0, hud.1, hud.2);
                self.hud = Some(hud);
            }
        }

        fn draw(&mut self, _entity: &Entity) {
            self.drawn += 1;
        }

        fn draw_paused(&mut self) {
            if !self.paused {
                log::info!("PAUSED");
            }
            self.paused = true;
            self.paused_frame = true;
        }

        fn end_frame(&mut self) {
            self.paused &= self.paused_frame;
            if self.frames % 600 == 0 {
                log::debug!("Frame {}: {} entities drawn", self.frames, self.drawn);
            }
        }
    }

    /// Level banner that stays up for a fixed number of polls
    #[derive(Default)]
    struct LevelBanner {
        remaining: Cell<u32>,
    }

    impl LevelTransition for LevelBanner {
        fn start(&mut self, ship: &Entity) {
            log::info!("Level cleared at {:.0?}", ship.pos());
            self.remaining.set(BANNER_FRAMES);
        }

        fn is_active(&self) -> bool {
            let left = self.remaining.get();
            self.remaining.set(left.saturating_sub(1));
            left > 0
        }
    }

    /// Turns toward the nearest target and shoots
    #[derive(Default)]
    struct Pilot {
        start_held: bool,
    }

    impl Pilot {
        fn input(&mut self, game: &Game, ready_for_restart: bool) -> TickInput {
            let mut input = TickInput::default();
            let wants_start = match game.phase() {
                GamePhase::Waiting => true,
                GamePhase::EndGame => ready_for_restart,
                _ => false,
            };
            input.start = wants_start && !self.start_held;
            self.start_held = wants_start;

            if game.phase() != GamePhase::Run {
                return input;
            }
            let Some(ship) = game.world.ship().filter(|s| s.visible) else {
                return input;
            };
            let target = game
                .world
                .pool
                .iter()
                .filter(|e| e.visible && matches!(e.kind, EntityKind::Asteroid | EntityKind::Enemy))
                .min_by(|a, b| {
                    let da = a.pos().distance_squared(ship.pos());
                    let db = b.pos().distance_squared(ship.pos());
                    da.total_cmp(&db)
                });
            let Some(target) = target else {
                return input;
            };

            let to = target.pos() - ship.pos();
            let heading = heading_to_dir(ship.transform.rot);
            let turn = heading.perp_dot(to.normalize_or_zero());
            input.right = turn > 0.1;
            input.left = turn < -0.1;
            input.fire = heading.dot(to.normalize_or_zero()) > 0.95;
            input.thrust = to.length() > 300.0 && ship.transform.vel.length() < 120.0;
            input
        }
    }

    pub fn run() {
        env_logger::init();
        log::info!("Glyph Roids (headless demo) starting...");

        let args: Vec<String> = std::env::args().collect();
        let settings = Settings::load_or_default(args.get(1).map(String::as_str).unwrap_or("glyph-roids.json"));
        let seconds = args
            .get(2)
            .and_then(|s| s.parse::<f32>().ok())
            .unwrap_or(DEFAULT_SECONDS);
        let seed = settings.seed.unwrap_or_else(rand::random);

        let audio = Rc::new(RefCell::new(AudioManager::new()));
        {
            let mut audio = audio.borrow_mut();
            audio.set_master_volume(settings.master_volume);
            audio.set_sfx_volume(settings.sfx_volume);
            if settings.muted {
                audio.set_muted(true);
            }
        }
        let renderer = Rc::new(RefCell::new(LogRenderer::default()));
        let board = Scoreboard::with_placeholders(&mut Pcg32::seed_from_u64(seed));
        let screen = Rc::new(RefCell::new(GameOverScreen::new(board)));
        let mut hooks = Hooks::new()
            .with_audio(audio.clone())
            .with_renderer(renderer.clone())
            .with_game_over(screen.clone())
            .with_transition(LevelBanner::default());

        let mut game = Game::new(&settings, seed);
        let mut pilot = Pilot::default();
        let mut accumulator = 0.0;
        let mut elapsed = 0.0;
        let mut games = 0u32;
        let started = Instant::now();

        while elapsed < seconds {
            elapsed += DISPLAY_DT;
            accumulator += DISPLAY_DT;

            if game.phase() == GamePhase::EndGame {
                let mut screen = screen.borrow_mut();
                if screen.is_visible() && !screen.ready_for_restart() {
                    screen.submit_name("demo");
                    games += 1;
                }
            }
            let ready = screen.borrow().ready_for_restart();
            let mut input = pilot.input(&game, ready);

            let mut substeps = 0;
            while accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
                tick(&mut game, &input, &mut hooks, SIM_DT);
                accumulator -= SIM_DT;
                substeps += 1;

                // One-shot inputs only apply to the first substep
                input.start = false;
                input.pause = false;
            }
        }

        let audio = audio.borrow();
        log::info!(
            "Ran {:.0}s of game time ({} frames) in {:.2?}",
            elapsed,
            game.frame(),
            started.elapsed()
        );
        println!("\nGlyph Roids demo, seed {seed}");
        println!(
            "  games finished: {games}, current score: {}, phase: {:?}",
            game.state.score,
            game.phase()
        );
        println!(
            "  sounds: {} laser, {} explosion",
            audio.played(SoundEffect::Laser),
            audio.played(SoundEffect::Explosion)
        );
        println!("  frames drawn: {}", renderer.borrow().frames);
        println!("\n  SCOREBOARD");
        for (rank, entry) in screen.borrow().scoreboard().entries().iter().enumerate() {
            println!("  {:>2}. {:<8} {:>6}", rank + 1, entry.name, entry.score);
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    demo::run();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The library is driven by the host page on wasm
}
