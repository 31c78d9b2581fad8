//! Collaborator traits the simulation calls into
//!
//! The simulation owns timing and transitions; collaborators only draw, play
//! sounds, and show overlays. Every collaborator is optional: without one the
//! flow controller falls back to fixed delays.

use std::cell::RefCell;
use std::rc::Rc;

use crate::audio::{AudioSink, SoundEffect};
use crate::sim::{Entity, GamePhase, GameState};

/// Draws one frame
pub trait Renderer {
    /// Clear any per-game presentation state (called on boot)
    fn reset(&mut self) {}
    /// Start a frame; the phase decides which HUD elements are shown
    fn begin_frame(&mut self, phase: GamePhase, state: &GameState);
    /// Draw one visible entity
    fn draw(&mut self, entity: &Entity);
    /// Overlay for a frame redrawn while the simulation is paused
    fn draw_paused(&mut self) {}
    fn end_frame(&mut self) {}
}

/// Game-over overlay
pub trait GameOverUi {
    /// Show the overlay for a finished game
    fn start(&mut self, score: u64);
    /// Whether the player has finished with the overlay and may restart
    fn ready_for_restart(&self) -> bool;
    fn hide(&mut self);
}

/// Between-level transition effect
pub trait LevelTransition {
    fn start(&mut self, ship: &Entity);
    fn is_active(&self) -> bool;
}

/// The set of collaborators wired into a game
#[derive(Default)]
pub struct Hooks {
    pub audio: Option<Box<dyn AudioSink>>,
    pub renderer: Option<Box<dyn Renderer>>,
    pub game_over: Option<Box<dyn GameOverUi>>,
    pub transition: Option<Box<dyn LevelTransition>>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_audio(mut self, audio: impl AudioSink + 'static) -> Self {
        self.audio = Some(Box::new(audio));
        self
    }

    pub fn with_renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderer = Some(Box::new(renderer));
        self
    }

    pub fn with_game_over(mut self, ui: impl GameOverUi + 'static) -> Self {
        self.game_over = Some(Box::new(ui));
        self
    }

    pub fn with_transition(mut self, transition: impl LevelTransition + 'static) -> Self {
        self.transition = Some(Box::new(transition));
        self
    }

    pub fn play(&mut self, effect: SoundEffect) {
        if let Some(audio) = self.audio.as_mut() {
            audio.play(effect);
        }
    }

    /// True while a transition collaborator reports it is still running
    pub fn transition_active(&self) -> bool {
        self.transition.as_ref().is_some_and(|t| t.is_active())
    }
}

// Shared handles, so a caller can keep access to a collaborator it handed over

impl<T: Renderer> Renderer for Rc<RefCell<T>> {
    fn reset(&mut self) {
        self.borrow_mut().reset();
    }

    fn begin_frame(&mut self, phase: GamePhase, state: &GameState) {
        self.borrow_mut().begin_frame(phase, state);
    }

    fn draw(&mut self, entity: &Entity) {
        self.borrow_mut().draw(entity);
    }

    fn draw_paused(&mut self) {
        self.borrow_mut().draw_paused();
    }

    fn end_frame(&mut self) {
        self.borrow_mut().end_frame();
    }
}

impl<T: GameOverUi> GameOverUi for Rc<RefCell<T>> {
    fn start(&mut self, score: u64) {
        self.borrow_mut().start(score);
    }

    fn ready_for_restart(&self) -> bool {
        self.borrow().ready_for_restart()
    }

    fn hide(&mut self) {
        self.borrow_mut().hide();
    }
}

impl<T: LevelTransition> LevelTransition for Rc<RefCell<T>> {
    fn start(&mut self, ship: &Entity) {
        self.borrow_mut().start(ship);
    }

    fn is_active(&self) -> bool {
        self.borrow().is_active()
    }
}

impl<T: AudioSink> AudioSink for Rc<RefCell<T>> {
    fn play(&mut self, effect: SoundEffect) {
        self.borrow_mut().play(effect);
    }
}
