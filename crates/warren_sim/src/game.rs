//! Simulation state shared by every scheduled system, plus the standard
//! system table.
//!
//! External resources (textures, door tiles, native bodies) are owned by
//! collaborators behind `Rc<RefCell<_>>` so the world's destroy hooks can
//! reach them.

use crate::animation::{animation_controller_system, sprite_animation_system};
use crate::doors::doors_tick;
use crate::follow::follow_system;
use crate::gameplay::{billboards_system, interact_system, pickups_system};
use crate::gravity_gun::{gravity_gun_input_system, gravity_gun_motion_system, storage_deposit_system};
use crate::liftable::{lift_input_system, lift_motion_system};
use crate::movement::player_input_system;
use crate::native::{NativePhysicsBackend, NullPhysicsBackend};
use crate::physics::{PhysicsConfig, PhysicsSolver};
use crate::proximity::Proximity;
use std::cell::RefCell;
use std::rc::Rc;
use warren_core::assets::{TextureHandle, TextureProvider};
use warren_core::ecs::{
    BillboardState, BodyKind, Collider, ComponentKind, ComponentMask, Door, Entity, GravityGun, ItemKind,
    Liftable, PhysicsBody, Position, Sprite, SpriteRect, World,
};
use warren_core::systems::{Phase, Scheduler, SystemRegistrationError};
use warren_metrics::Counter;
use warren_services::{Button, HeadlessTextures, InputState, Settings};
use warren_tiles::{DoorRegistry, TileMap, TileWorld, TILE_SIZE};

pub type SharedTextures = Rc<RefCell<dyn TextureProvider>>;
pub type SharedPhysicsBackend = Rc<RefCell<dyn NativePhysicsBackend>>;

/// Everything the tick systems read and write.
pub struct Game {
    pub world: World,
    pub tiles: TileWorld,
    pub doors: Rc<RefCell<DoorRegistry>>,
    pub proximity: Proximity,
    pub physics: PhysicsSolver,
    pub textures: SharedTextures,
    pub native: SharedPhysicsBackend,
    pub settings: Settings,
    pub counters: Counter,
}

impl Game {
    /// Game with headless textures and no native physics.
    pub fn new(settings: Settings) -> Self {
        Self::with_backends(
            settings,
            Rc::new(RefCell::new(HeadlessTextures::new())),
            Rc::new(RefCell::new(NullPhysicsBackend)),
        )
    }

    pub fn with_backends(settings: Settings, textures: SharedTextures, native: SharedPhysicsBackend) -> Self {
        let physics = PhysicsSolver::new(PhysicsConfig {
            solver_iterations: settings.physics.solver_iterations,
            intent_weight: settings.physics.intent_weight,
        });
        let mut game = Self {
            world: World::new(),
            tiles: TileWorld::new(),
            doors: Rc::new(RefCell::new(DoorRegistry::new())),
            proximity: Proximity::new(),
            physics,
            textures,
            native,
            settings,
            counters: Counter::new(),
        };
        game.install_hooks();
        game
    }

    fn install_hooks(&mut self) {
        let textures = Rc::clone(&self.textures);
        self.world.register_destroy_hook(
            ComponentKind::Sprite,
            Box::new(move |world: &mut World, i: usize| {
                let Some(handle) = world.at::<Sprite>(i).map(|s| s.texture) else {
                    return;
                };
                match textures.try_borrow_mut() {
                    Ok(mut textures) => {
                        if textures.is_valid(handle) {
                            textures.release(handle);
                        }
                    }
                    Err(_) => tracing::warn!(entity = i, "texture provider busy; sprite texture leaked"),
                }
            }),
        );

        let doors = Rc::clone(&self.doors);
        self.world.register_destroy_hook(
            ComponentKind::Door,
            Box::new(move |world: &mut World, i: usize| {
                let Some(handle) = world.at::<Door>(i).and_then(|d| d.handle) else {
                    return;
                };
                match doors.try_borrow_mut() {
                    Ok(mut doors) => doors.unregister(handle),
                    Err(_) => {
                        tracing::warn!(entity = i, door = handle.raw(), "door registry busy; door not unregistered")
                    }
                }
            }),
        );

        let native = Rc::clone(&self.native);
        self.world.register_destroy_hook(
            ComponentKind::PhysicsBody,
            Box::new(move |world: &mut World, i: usize| {
                let Some(handle) = world.at_mut::<PhysicsBody>(i).and_then(|b| b.native.take()) else {
                    return;
                };
                match native.try_borrow_mut() {
                    Ok(mut native) => native.destroy_body(handle),
                    Err(_) => tracing::warn!(entity = i, "physics backend busy; native body leaked"),
                }
            }),
        );

        let native = Rc::clone(&self.native);
        self.world.register_body_create_hook(Box::new(move |world: &mut World, i: usize| {
            let (Some(body), Some(pos), Some(col)) = (
                world.at::<PhysicsBody>(i).copied(),
                world.at::<Position>(i).copied(),
                world.at::<Collider>(i).copied(),
            ) else {
                return;
            };
            let entity = world.handle_at(i);
            let Ok(mut native) = native.try_borrow_mut() else {
                tracing::warn!(entity = i, "physics backend busy; body has no native mirror");
                return;
            };
            let handle = native.create_body(entity, &body, pos, col);
            if let Some(body) = world.at_mut::<PhysicsBody>(i) {
                body.native = handle;
            }
        }));
    }

    /// Swap in a new map. Proximity history belongs to the old one.
    pub fn load_map(&mut self, map: TileMap) {
        let layer = self.settings.world.collision_layer.clone();
        self.tiles.load(map, Some(&layer));
        self.proximity.clear();
    }

    fn acquire(&self, path: &str) -> TextureHandle {
        self.textures.borrow_mut().acquire(path)
    }

    /// Acquire a texture and attach it as the entity's sprite, releasing any previous one.
    pub fn attach_sprite(&mut self, entity: Entity, path: &str, src: SpriteRect) -> bool {
        if !self.world.is_alive(entity) {
            return false;
        }
        let texture = self.acquire(path);
        self.replace_sprite(
            entity,
            Sprite {
                texture,
                src,
                origin_x: src.w * 0.5,
                origin_y: src.h * 0.5,
            },
        )
    }

    /// Attach a sprite whose texture the caller already holds. The entity takes its own reference.
    pub fn share_sprite(&mut self, entity: Entity, sprite: Sprite) -> bool {
        if !self.world.is_alive(entity) {
            return false;
        }
        self.textures.borrow_mut().add_ref(sprite.texture);
        self.replace_sprite(entity, sprite)
    }

    fn replace_sprite(&mut self, entity: Entity, sprite: Sprite) -> bool {
        if let Some(old) = self.world.get::<Sprite>(entity).map(|s| s.texture) {
            let mut textures = self.textures.borrow_mut();
            if textures.is_valid(old) {
                textures.release(old);
            }
        }
        self.world.add_sprite(entity, sprite)
    }

    pub fn spawn_player(&mut self, x: f32, y: f32) -> Entity {
        let e = self.world.create();
        if e == Entity::DEAD {
            return e;
        }
        self.world.add_position(e, x, y);
        self.world.add_velocity(e, 0.0, 0.0);
        self.world.add_collider(e, 6.0, 6.0);
        self.world.add_phys_body(e, PhysicsBody::new(BodyKind::Dynamic, 1.0));
        self.world.add_player(e);
        self.world.add_inventory(e);
        self.world.add_trigger(e, 2.0, ComponentMask::of(ComponentKind::Item));
        self.attach_sprite(e, "assets/images/player.png", SpriteRect { x: 0.0, y: 0.0, w: 16.0, h: 16.0 });
        e
    }

    pub fn spawn_coin(&mut self, x: f32, y: f32) -> Entity {
        let e = self.world.create();
        if e == Entity::DEAD {
            return e;
        }
        self.world.add_position(e, x, y);
        self.world.add_collider(e, 4.0, 4.0);
        self.world.add_item(e, ItemKind::Coin);
        self.attach_sprite(e, "assets/images/coin.png", SpriteRect { x: 0.0, y: 0.0, w: 8.0, h: 8.0 });
        e
    }

    /// A hat seller with a "for sale" billboard shown while the player is near.
    pub fn spawn_vendor(&mut self, x: f32, y: f32, price: u32) -> Entity {
        let e = self.world.create();
        if e == Entity::DEAD {
            return e;
        }
        self.world.add_position(e, x, y);
        self.world.add_velocity(e, 0.0, 0.0);
        self.world.add_collider(e, 6.0, 6.0);
        self.world.add_phys_body(e, PhysicsBody::new(BodyKind::Dynamic, 2.0));
        self.world.add_vendor(e, ItemKind::Hat, price);
        self.world.add_trigger(e, 16.0, ComponentMask::of(ComponentKind::Player));
        self.world.add_billboard(e, &format!("Hat: {price} coins"), -18.0, 0.75, BillboardState::Active);
        self.attach_sprite(e, "assets/images/vendor.png", SpriteRect { x: 0.0, y: 0.0, w: 16.0, h: 16.0 });
        e
    }

    /// A door covering every tile the rect touches, opened by the player.
    pub fn spawn_door(&mut self, x: f32, y: f32, hx: f32, hy: f32, prox_radius: f32) -> Entity {
        let e = self.world.create();
        if e == Entity::DEAD {
            return e;
        }
        let cells = covered_tiles(x - hx, y - hy, x + hx, y + hy);
        let handle = self.doors.borrow_mut().register(&cells);
        self.world.add_position(e, x, y);
        self.world.add_collider(e, hx, hy);
        self.world
            .add_trigger(e, prox_radius, ComponentKind::Player | ComponentKind::Collider);
        self.world.add_door(e, prox_radius, handle);
        e
    }

    /// A liftable crate.
    pub fn spawn_prop(&mut self, x: f32, y: f32) -> Entity {
        let e = self.world.create();
        if e == Entity::DEAD {
            return e;
        }
        self.world.add_position(e, x, y);
        self.world.add_velocity(e, 0.0, 0.0);
        self.world.add_collider(e, 5.0, 5.0);
        self.world.add_phys_body(e, PhysicsBody::new(BodyKind::Dynamic, 3.0));
        self.world.add_liftable(e, Liftable::default());
        self.attach_sprite(e, "assets/images/crate.png", SpriteRect { x: 0.0, y: 0.0, w: 12.0, h: 12.0 });
        e
    }

    /// A piece of plastic the player can drag with the pointer.
    pub fn spawn_plastic(&mut self, x: f32, y: f32) -> Entity {
        let e = self.world.create();
        if e == Entity::DEAD {
            return e;
        }
        self.world.add_position(e, x, y);
        self.world.add_velocity(e, 0.0, 0.0);
        self.world.add_collider(e, 4.0, 4.0);
        self.world.add_phys_body(e, PhysicsBody::new(BodyKind::Dynamic, 1.0));
        self.world.add_gravity_gun(e, GravityGun::new());
        self.world.add_plastic(e);
        self.attach_sprite(e, "assets/images/plastic.png", SpriteRect { x: 0.0, y: 0.0, w: 8.0, h: 8.0 });
        e
    }

    /// A static storage that takes plastic dropped inside its trigger.
    pub fn spawn_storage(&mut self, x: f32, y: f32, capacity: u32) -> Entity {
        let e = self.world.create();
        if e == Entity::DEAD {
            return e;
        }
        self.world.add_position(e, x, y);
        self.world.add_collider(e, 12.0, 12.0);
        self.world.add_phys_body(e, PhysicsBody::new(BodyKind::Static, 0.0));
        self.world.add_storage(e, capacity);
        self.world.add_trigger(e, 8.0, ComponentMask::of(ComponentKind::Plastic));
        self.attach_sprite(e, "assets/images/storage.png", SpriteRect { x: 0.0, y: 0.0, w: 24.0, h: 24.0 });
        e
    }
}

/// Tile cells overlapped by a pixel rect.
fn covered_tiles(left: f32, top: f32, right: f32, bottom: f32) -> Vec<(i32, i32)> {
    let size = TILE_SIZE as f32;
    let (tx0, tx1) = ((left / size).floor() as i32, (right / size).ceil() as i32);
    let (ty0, ty1) = ((top / size).floor() as i32, (bottom / size).ceil() as i32);
    (ty0..ty1)
        .flat_map(|ty| (tx0..tx1).map(move |tx| (tx, ty)))
        .collect()
}

/// Register the standard system table.
pub fn register_systems(scheduler: &mut Scheduler<Game, InputState>) -> Result<(), SystemRegistrationError> {
    scheduler.register(Phase::Input, 0, "input", |g: &mut Game, dt, input: &InputState| {
        let player = &g.settings.player;
        player_input_system(&mut g.world, input, player.speed, player.facing_change_time, dt);
    })?;
    scheduler.register(Phase::Input, 50, "liftable_input", |g: &mut Game, _dt, input: &InputState| {
        lift_input_system(&mut g.world, input.was_pressed(Button::Lift));
    })?;
    scheduler.register(Phase::Input, 55, "gravity_gun_input", |g: &mut Game, _dt, input: &InputState| {
        gravity_gun_input_system(&mut g.world, input);
    })?;
    scheduler.register(Phase::Input, 60, "interact", |g: &mut Game, _dt, input: &InputState| {
        let mut textures = g.textures.borrow_mut();
        interact_system(&mut g.world, &g.proximity, input, &mut *textures);
    })?;

    scheduler.register(Phase::SimPre, 100, "animation_controller", |g: &mut Game, _dt, _: &InputState| {
        animation_controller_system(&mut g.world);
    })?;

    scheduler.register(Phase::Physics, 50, "follow_ai", |g: &mut Game, _dt, _: &InputState| {
        follow_system(&mut g.world, g.tiles.grid());
    })?;
    scheduler.register(Phase::Physics, 80, "gravity_gun_motion", |g: &mut Game, dt, input: &InputState| {
        gravity_gun_motion_system(&mut g.world, input, dt);
    })?;
    scheduler.register(Phase::Physics, 90, "liftable_motion", |g: &mut Game, dt, _: &InputState| {
        lift_motion_system(&mut g.world, g.tiles.grid(), dt);
    })?;
    scheduler.register(Phase::Physics, 100, "physics", |g: &mut Game, dt, _: &InputState| {
        g.physics.step(&mut g.world, g.tiles.grid(), dt);
    })?;

    scheduler.register(Phase::SimPost, 100, "proximity_view", |g: &mut Game, _dt, _: &InputState| {
        g.proximity.update(&g.world);
    })?;
    scheduler.register(Phase::SimPost, 110, "pickups", |g: &mut Game, _dt, _: &InputState| {
        pickups_system(&mut g.world, &g.proximity);
    })?;
    scheduler.register(Phase::SimPost, 120, "storage_deposit", |g: &mut Game, _dt, _: &InputState| {
        let stored = storage_deposit_system(&mut g.world, &g.proximity);
        g.counters.increment("plastic_stored", u64::from(stored));
    })?;
    scheduler.register(Phase::SimPost, 200, "billboards", |g: &mut Game, dt, _: &InputState| {
        billboards_system(&mut g.world, &g.proximity, dt);
    })?;
    scheduler.register(Phase::SimPost, 400, "doors_tick", |g: &mut Game, dt, _: &InputState| {
        let mut doors = g.doors.borrow_mut();
        doors_tick(&mut g.world, &g.proximity, &mut *doors, &mut g.tiles, dt);
    })?;
    scheduler.register(Phase::SimPost, 900, "world_apply_edits", |g: &mut Game, _dt, _: &InputState| {
        let applied = g.tiles.apply_tile_edits();
        g.counters.increment("tile_edits", applied as u64);
    })?;

    scheduler.register(Phase::Debug, 100, "debug_stats", |g: &mut Game, _dt, _: &InputState| {
        g.counters.set("entities", g.world.alive_count() as u64);
        g.counters.set("proximity_pairs", g.proximity.len() as u64);
        g.counters.increment("ticks", 1);
    })?;

    scheduler.register_present(10, "frame_stats", |g: &mut Game, _dt| {
        g.counters.increment("frames", 1);
    })?;
    scheduler.register_present(100, "sprite_anim", |g: &mut Game, dt| {
        sprite_animation_system(&mut g.world, dt);
    })?;
    Ok(())
}
