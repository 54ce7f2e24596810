//! End-to-end ticks through the standard system table.

use std::cell::RefCell;
use std::rc::Rc;
use glam::Vec2;
use warren_core::ecs::{
    AnimFrame, Animation, AnimationSheet, Billboard, BillboardState, BodyKind, DoorState, Door, Facing,
    Follow, Inventory, LiftState, Liftable, PhysicsBody, Position, Sprite, Storage,
};
use warren_services::{Button, Buttons, HeadlessTextures, Settings};
use warren_sim::gameplay::HAT_TEXTURE_PATH;
use warren_sim::{Game, NullPhysicsBackend, Simulation};
use warren_tiles::{SubtileMask, TileKind, TileLayer, TileMap, Tileset};

const FRAME: f32 = 1.0 / 60.0;

fn open_map(w: u32, h: u32) -> TileMap {
    let mut map = TileMap::new(w, h, 32);
    map.tilesets
        .push(Tileset::new("walls", 1, 1).with_collider(0, SubtileMask::FULL));
    map.layers.push(TileLayer::empty("walls", w, h));
    map
}

/// 6x3 map with an animated door tile at (2, 1): closed, half open, open.
fn door_map() -> TileMap {
    let mut map = TileMap::new(6, 3, 32);
    map.tilesets.push(
        Tileset::new("door", 1, 3)
            .with_collider(0, SubtileMask::FULL)
            .with_collider(1, "[1111],[1111],[0000],[0000]".parse().unwrap())
            .with_dynamic(0)
            .with_animation(0, &[(0, 100), (1, 100), (2, 100)]),
    );
    let mut walls = TileLayer::empty("walls", 6, 3);
    walls.set_gid(2, 1, 1);
    map.layers.push(walls);
    map
}

fn headless_sim() -> (Simulation, Rc<RefCell<HeadlessTextures>>) {
    let textures = Rc::new(RefCell::new(HeadlessTextures::new()));
    let game = Game::with_backends(
        Settings::default(),
        textures.clone(),
        Rc::new(RefCell::new(NullPhysicsBackend)),
    );
    (Simulation::with_game(game).unwrap(), textures)
}

fn run(sim: &mut Simulation, frames: usize, held: Buttons) {
    for _ in 0..frames {
        sim.frame(FRAME, held);
    }
}

fn teleport(sim: &mut Simulation, e: warren_core::ecs::Entity, x: f32, y: f32) {
    let pos = sim.game.world.get_mut::<Position>(e).unwrap();
    pos.x = x;
    pos.y = y;
}

#[test]
fn walking_onto_a_coin_collects_it() {
    let (mut sim, textures) = headless_sim();
    sim.game.load_map(open_map(8, 8));
    let player = sim.game.spawn_player(64.0, 64.0);
    let coin = sim.game.spawn_coin(74.0, 64.0);
    assert_eq!(textures.borrow().live_count(), 2);

    run(&mut sim, 1, Buttons::NONE);
    assert!(!sim.game.world.is_alive(coin));
    assert_eq!(sim.game.world.get::<Inventory>(player).unwrap().coins, 1);
    // Only the player's texture is still referenced.
    assert_eq!(textures.borrow().live_count(), 1);

    run(&mut sim, 5, Buttons::NONE);
    assert_eq!(warren_sim::player_stats(&sim.game.world).coins, 1);
}

#[test]
fn door_opens_near_the_player_and_closes_after() {
    let (mut sim, _) = headless_sim();
    sim.game.load_map(door_map());
    let door = sim.game.spawn_door(80.0, 48.0, 16.0, 16.0, 20.0);
    let player = sim.game.spawn_player(16.0, 48.0);

    run(&mut sim, 1, Buttons::NONE);
    assert_eq!(sim.game.world.get::<Door>(door).unwrap().state, DoorState::Closed);
    assert_eq!(sim.game.tiles.grid().tile_at(2, 1), TileKind::Solid);

    teleport(&mut sim, player, 50.0, 48.0);
    run(&mut sim, 1, Buttons::NONE);
    assert_eq!(sim.game.world.get::<Door>(door).unwrap().state, DoorState::Opening);

    run(&mut sim, 20, Buttons::NONE);
    let d = sim.game.world.get::<Door>(door).unwrap();
    assert_eq!(d.state, DoorState::Open);
    assert_eq!(d.anim_time_ms, 300.0);
    assert_eq!(sim.game.tiles.grid().tile_at(2, 1), TileKind::Walkable);

    teleport(&mut sim, player, 16.0, 48.0);
    run(&mut sim, 8, Buttons::NONE);
    assert_eq!(sim.game.world.get::<Door>(door).unwrap().state, DoorState::Closing);
    // About halfway back: the half-open frame blocks the top rows.
    assert_eq!(sim.game.tiles.grid().tile_at(2, 1), TileKind::Partial);

    run(&mut sim, 20, Buttons::NONE);
    assert_eq!(sim.game.world.get::<Door>(door).unwrap().state, DoorState::Closed);
    assert_eq!(sim.game.tiles.grid().tile_at(2, 1), TileKind::Solid);
}

#[test]
fn bought_vendor_follows_the_player() {
    let (mut sim, textures) = headless_sim();
    sim.game.load_map(open_map(10, 6));
    let player = sim.game.spawn_player(64.0, 64.0);
    let vendor = sim.game.spawn_vendor(84.0, 64.0, 3);
    sim.game.world.get_mut::<Inventory>(player).unwrap().coins = 3;

    run(&mut sim, 1, Buttons::NONE);
    let hint = warren_sim::vendor_hint(&sim.game.world).unwrap();
    assert_eq!(hint.vendor, vendor);
    assert!(sim.game.world.get::<Billboard>(vendor).unwrap().timer > 0.0);

    run(&mut sim, 1, Buttons::NONE.with(Button::Interact));
    let inv = *sim.game.world.get::<Inventory>(player).unwrap();
    assert!(inv.has_hat);
    assert_eq!(inv.coins, 0);
    let hat = sim.game.world.get::<Sprite>(player).unwrap().texture;
    assert_eq!(textures.borrow().path(hat), Some(HAT_TEXTURE_PATH));
    assert_eq!(
        sim.game.world.get::<Billboard>(vendor).unwrap().state,
        BillboardState::Inactive
    );
    assert_eq!(sim.game.world.get::<Follow>(vendor).unwrap().target, player);

    teleport(&mut sim, player, 220.0, 64.0);
    let start = sim.game.world.get::<Position>(vendor).unwrap().x;
    run(&mut sim, 30, Buttons::NONE);
    let end = sim.game.world.get::<Position>(vendor).unwrap().x;
    // 90 px/s for half a second.
    assert!(end - start > 40.0, "vendor moved {}", end - start);
    assert!(end < 220.0 - 30.0);
}

#[test]
fn prop_is_lifted_carried_and_thrown() {
    let (mut sim, _) = headless_sim();
    sim.game.load_map(open_map(8, 10));
    let player = sim.game.spawn_player(100.0, 100.0);
    // Default facing is south; the focus point sits 18 px ahead.
    let prop = sim.game.spawn_prop(100.0, 118.0);
    let lift = Buttons::NONE.with(Button::Lift);

    run(&mut sim, 1, lift);
    let l = *sim.game.world.get::<Liftable>(prop).unwrap();
    assert_eq!(l.state, LiftState::Carried);
    assert_eq!(l.carrier, player);
    let carried = sim.game.world.get::<Position>(prop).unwrap().y;
    assert!((carried - 112.0).abs() < 1e-3);

    // Held, not pressed again: still carried.
    run(&mut sim, 3, lift);
    assert_eq!(sim.game.world.get::<Liftable>(prop).unwrap().state, LiftState::Carried);

    run(&mut sim, 1, Buttons::NONE);
    run(&mut sim, 1, lift);
    assert_eq!(sim.game.world.get::<Liftable>(prop).unwrap().state, LiftState::Thrown);

    run(&mut sim, 90, Buttons::NONE);
    let l = *sim.game.world.get::<Liftable>(prop).unwrap();
    assert_eq!(l.state, LiftState::OnGround);
    assert_eq!(l.height, 0.0);
    let landed = sim.game.world.get::<Position>(prop).unwrap().y;
    assert!(landed > carried + 40.0, "landed at {landed}");
}

#[test]
fn json_map_walls_stop_the_player() {
    // Column 3 is solid top to bottom.
    let gids: Vec<u32> = (0..18).map(|i| u32::from(i % 6 == 3)).collect();
    let text = serde_json::json!({
        "width": 6,
        "height": 3,
        "tile_width": 32,
        "tile_height": 32,
        "tilesets": [{
            "name": "walls",
            "first_gid": 1,
            "tile_count": 1,
            "colliders": { "0": "[1111],[1111],[1111],[1111]" }
        }],
        "layers": [{ "name": "walls", "width": 6, "height": 3, "gids": gids }]
    })
    .to_string();
    let map = TileMap::from_json(&text).unwrap();

    let (mut sim, _) = headless_sim();
    sim.game.load_map(map);
    assert_eq!(sim.game.tiles.grid().tile_at(3, 1), TileKind::Solid);
    let player = sim.game.spawn_player(48.0, 48.0);

    run(&mut sim, 60, Buttons::NONE.with(Button::Right));
    let x = sim.game.world.get::<Position>(player).unwrap().x;
    // Flush against the wall face at x = 96 with a 6 px half width.
    assert!((x - 90.0).abs() < 1e-3, "x = {x}");
}

#[test]
fn thrown_prop_passes_over_a_resting_body() {
    let (mut sim, _) = headless_sim();
    sim.game.load_map(open_map(8, 10));
    sim.game.spawn_player(100.0, 100.0);
    let prop = sim.game.spawn_prop(100.0, 118.0);

    // A plain dynamic body sitting under the throw path.
    let bystander = sim.game.world.create();
    sim.game.world.add_position(bystander, 100.0, 130.0);
    sim.game.world.add_velocity(bystander, 0.0, 0.0);
    sim.game.world.add_collider(bystander, 5.0, 5.0);
    sim.game
        .world
        .add_phys_body(bystander, PhysicsBody::new(BodyKind::Dynamic, 1.0));

    let pos = |sim: &Simulation, e| sim.game.world.get::<Position>(e).unwrap().as_vec2();
    let state = |sim: &Simulation| sim.game.world.get::<Liftable>(prop).unwrap().state;
    let resting = Vec2::new(100.0, 130.0);
    let lift = Buttons::NONE.with(Button::Lift);

    run(&mut sim, 1, lift);
    assert_eq!(state(&sim), LiftState::Carried);
    for frame in 0..8 {
        sim.frame(FRAME, lift);
        assert_eq!(state(&sim), LiftState::Carried, "frame {frame}");
        assert!(pos(&sim, prop).distance(Vec2::new(100.0, 112.0)) < 1e-3, "frame {frame}");
        assert_eq!(pos(&sim, bystander), resting, "frame {frame}");
    }

    run(&mut sim, 1, Buttons::NONE);
    run(&mut sim, 1, lift);
    assert_eq!(state(&sim), LiftState::Thrown);

    let mut last_y = pos(&sim, prop).y;
    let mut crossed = false;
    let mut frames = 0;
    while state(&sim) == LiftState::Thrown {
        let p = pos(&sim, prop);
        assert_eq!(p.x, 100.0, "frame {frames}");
        assert!(p.y >= last_y, "frame {frames}: {} after {last_y}", p.y);
        assert_eq!(pos(&sim, bystander), resting, "frame {frames}");
        crossed |= (p.y - resting.y).abs() < 10.0;
        last_y = p.y;

        sim.frame(FRAME, Buttons::NONE);
        frames += 1;
        assert!(frames < 240, "prop never landed");
    }
    assert!(crossed, "the arc never overlapped the resting body");
    assert!(pos(&sim, prop).y > resting.y + 5.0);
}

#[test]
fn dragged_plastic_drops_into_storage() {
    let (mut sim, _) = headless_sim();
    sim.game.load_map(open_map(10, 8));
    sim.game.spawn_player(100.0, 100.0);
    let plastic = sim.game.spawn_plastic(130.0, 100.0);
    let storage = sim.game.spawn_storage(200.0, 100.0, 0);
    let grab = Buttons::NONE.with(Button::Grab);

    sim.set_aim(Some(Vec2::new(130.0, 100.0)));
    run(&mut sim, 1, grab);
    sim.set_aim(Some(Vec2::new(180.0, 100.0)));
    run(&mut sim, 90, grab);

    let x = sim.game.world.get::<Position>(plastic).unwrap().x;
    assert!((x - 180.0).abs() < 1.0, "plastic at {x}");
    assert_eq!(sim.game.world.get::<Storage>(storage).unwrap().plastic, 0);

    run(&mut sim, 2, Buttons::NONE);
    assert!(!sim.game.world.is_alive(plastic));
    let stored = warren_sim::storage_status(&sim.game.world).unwrap();
    assert_eq!((stored.plastic, stored.capacity), (1, 20));
}

#[test]
fn player_animation_follows_walking_and_idling() {
    let (mut sim, _) = headless_sim();
    sim.game.load_map(open_map(8, 8));
    let player = sim.game.spawn_player(100.0, 100.0);
    let sequences: Vec<Vec<AnimFrame>> = (0..16u16)
        .map(|row| vec![AnimFrame { col: 0, row }, AnimFrame { col: 1, row }])
        .collect();
    let sheet = Rc::new(AnimationSheet::new(16.0, 16.0, sequences));
    sim.game.world.add_animation(player, sheet, 8.0);

    let current = |sim: &Simulation| sim.game.world.get::<Animation>(player).unwrap().current;
    run(&mut sim, 1, Buttons::NONE);
    assert_eq!(current(&sim), 8 + Facing::South.index());
    assert_eq!(sim.game.world.get::<Sprite>(player).unwrap().src.y, 16.0 * 12.0);

    run(&mut sim, 30, Buttons::NONE.with(Button::Right));
    assert_eq!(current(&sim), Facing::East.index());
    let src = sim.game.world.get::<Sprite>(player).unwrap().src;
    assert_eq!((src.y, src.w), (16.0 * 2.0, 16.0));

    run(&mut sim, 1, Buttons::NONE);
    assert_eq!(current(&sim), 8 + Facing::East.index());
}
