//! Warren Runtime
//!
//! Headless host: loads settings and a map, spawns a small scene and drives
//! the fixed-step simulation with scripted input.
//!
//! Usage: `warren [settings.json] [map.json]`

use anyhow::{Context, Result};
use warren_services::{Button, Buttons, Settings};
use warren_sim::{Game, Simulation};
use warren_tiles::{SubtileMask, TileLayer, TileMap, Tileset};

/// Simulated wall time per frame.
const FRAME_DT: f32 = 1.0 / 60.0;
const DEMO_SECONDS: f32 = 6.0;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    tracing::info!("Warren v{}", warren_core::VERSION);

    let mut args = std::env::args().skip(1);
    let settings = match args.next() {
        Some(path) => Settings::load(&path).with_context(|| format!("loading settings from {path}"))?,
        None => Settings::default(),
    };
    let map = match args.next() {
        Some(path) => {
            let text = std::fs::read_to_string(&path).with_context(|| format!("reading map {path}"))?;
            TileMap::from_json(&text).with_context(|| format!("parsing map {path}"))?
        }
        None => demo_map(),
    };

    let mut game = Game::new(settings);
    game.load_map(map);
    let player = game.spawn_player(48.0, 48.0);
    for i in 0..3 {
        game.spawn_coin(96.0 + i as f32 * 24.0, 48.0);
    }
    game.spawn_vendor(208.0, 112.0, 3);
    game.spawn_prop(80.0, 144.0);
    game.spawn_plastic(200.0, 144.0);
    game.spawn_storage(256.0, 128.0, 0);

    let mut sim = Simulation::with_game(game).context("registering systems")?;
    let frames = (DEMO_SECONDS / FRAME_DT) as u32;
    for frame in 0..frames {
        let t = frame as f32 * FRAME_DT;
        sim.frame(FRAME_DT, scripted_input(t));
    }

    let stats = warren_sim::player_stats(&sim.game.world);
    let at = sim.game.world.get_position(player).unwrap_or_default();
    let storage = warren_sim::storage_status(&sim.game.world).unwrap_or_default();
    tracing::info!(
        ticks = sim.tick_count(),
        sim_seconds = sim.sim_time().as_secs_f32(),
        entities = sim.game.world.alive_count(),
        coins = stats.coins,
        has_hat = stats.has_hat,
        plastic = storage.plastic,
        x = at.x,
        y = at.y,
        "demo finished"
    );

    #[cfg(feature = "metrics")]
    for (name, timing) in sim.scheduler().profiler().hottest().into_iter().take(5) {
        tracing::info!(
            system = name,
            calls = timing.calls,
            avg = ?timing.average(),
            worst = ?timing.worst,
            "system timing"
        );
    }

    Ok(())
}

/// Walk east over the coins, down to the vendor, buy, then carry the crate.
fn scripted_input(t: f32) -> Buttons {
    let button = match t {
        t if t < 1.4 => Button::Right,
        t if t < 2.0 => Button::Down,
        t if t < 2.1 => Button::Interact,
        t if t < 3.0 => Button::Left,
        t if t < 3.1 => Button::Lift,
        t if t < 4.0 => Button::Down,
        t if t < 4.1 => Button::Lift,
        _ => return Buttons::NONE,
    };
    Buttons::NONE.with(button)
}

/// 10x6 room with a solid border.
fn demo_map() -> TileMap {
    let (w, h) = (10, 6);
    let mut map = TileMap::new(w, h, 32);
    map.tilesets
        .push(Tileset::new("walls", 1, 1).with_collider(0, SubtileMask::FULL));
    map.layers.push(TileLayer::empty("ground", w, h));
    let mut walls = TileLayer::empty("walls", w, h);
    for tx in 0..w as i32 {
        walls.set_gid(tx, 0, 1);
        walls.set_gid(tx, h as i32 - 1, 1);
    }
    for ty in 0..h as i32 {
        walls.set_gid(0, ty, 1);
        walls.set_gid(w as i32 - 1, ty, 1);
    }
    map.layers.push(walls);
    map
}
