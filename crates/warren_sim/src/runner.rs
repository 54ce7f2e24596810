//! Frame driver: samples input, runs zero or more fixed ticks, then the
//! present pass.

use crate::game::{register_systems, Game};
use glam::Vec2;
use std::time::Duration;
use warren_core::systems::{Scheduler, SystemRegistrationError};
use warren_core::time::{FixedStepClock, MAX_FRAME_DT, TICK_RATE_HZ};
use warren_metrics::FrameTimer;
use warren_services::{Buttons, InputLatch, InputState, Settings, SimulationSettings};

/// Frames kept for pacing statistics.
const FRAME_HISTORY: usize = 120;

pub struct Simulation {
    pub game: Game,
    scheduler: Scheduler<Game, InputState>,
    clock: FixedStepClock,
    latch: InputLatch,
    frame_timer: FrameTimer,
}

impl Simulation {
    /// Simulation over a fresh [`Game`] with the standard system table.
    pub fn new(settings: Settings) -> Result<Self, SystemRegistrationError> {
        Self::with_game(Game::new(settings))
    }

    pub fn with_game(game: Game) -> Result<Self, SystemRegistrationError> {
        let mut scheduler = Scheduler::new();
        register_systems(&mut scheduler)?;
        Ok(Self::with_scheduler(game, scheduler))
    }

    /// Drive a custom system table.
    pub fn with_scheduler(game: Game, scheduler: Scheduler<Game, InputState>) -> Self {
        let clock = clock_for(&game.settings.simulation);
        Self {
            game,
            scheduler,
            clock,
            latch: InputLatch::new(),
            frame_timer: FrameTimer::new(FRAME_HISTORY),
        }
    }

    /// Advance by one rendered frame of `frame_dt` seconds with `held` buttons down.
    ///
    /// Returns the number of fixed ticks run.
    pub fn frame(&mut self, frame_dt: f32, held: Buttons) -> u32 {
        self.latch.begin_frame(held);
        let dt = self.clock.begin_frame(frame_dt);
        let fixed_dt = self.clock.fixed_dt();

        let mut ticks = 0;
        while self.clock.next_tick() {
            let input = self.latch.for_tick();
            self.scheduler.run_tick(&mut self.game, fixed_dt, &input);
            ticks += 1;
        }
        // Deferred destroys land once per frame, after every tick has run.
        self.game.world.cleanup_marked();
        self.game.world.destroy_marked();

        self.scheduler.run_present(&mut self.game, dt);
        self.frame_timer.record(dt as f64, ticks);
        ticks
    }

    /// World-space pointer position used from the next frame on.
    pub fn set_aim(&mut self, aim: Option<Vec2>) {
        self.latch.set_aim(aim);
    }

    pub fn scheduler(&self) -> &Scheduler<Game, InputState> {
        &self.scheduler
    }

    pub fn tick_count(&self) -> u64 {
        self.clock.tick_count()
    }

    pub fn sim_time(&self) -> Duration {
        self.clock.sim_time()
    }

    /// Interpolation factor between the last two ticks.
    pub fn alpha(&self) -> f32 {
        self.clock.alpha()
    }

    pub fn frame_timer(&self) -> &FrameTimer {
        &self.frame_timer
    }
}

/// Clock for the configured rate. Non-positive or non-finite values fall back to the defaults.
fn clock_for(sim: &SimulationSettings) -> FixedStepClock {
    let positive = |v: f32| v.is_finite() && v > 0.0;
    let tick_hz = if positive(sim.tick_hz) {
        sim.tick_hz
    } else {
        tracing::warn!(tick_hz = sim.tick_hz, "invalid tick rate, using {TICK_RATE_HZ} Hz");
        TICK_RATE_HZ as f32
    };
    let max_frame_dt = if positive(sim.max_frame_dt) {
        sim.max_frame_dt
    } else {
        tracing::warn!(max_frame_dt = sim.max_frame_dt, "invalid frame clamp, using {MAX_FRAME_DT} s");
        MAX_FRAME_DT
    };
    FixedStepClock::new(1.0 / tick_hz, max_frame_dt)
}
