//! Pointer-driven dragging of grabbable bodies, and plastic deposits into storage.
//!
//! A held object steers its velocity toward the aim point (plus the offset
//! it was grabbed at) and stops colliding with the player until released.

use crate::proximity::Proximity;
use glam::Vec2;
use warren_core::ecs::{
    BodyKind, Collider, ComponentKind, ComponentMask, Entity, GrabState, GravityGun, PhysicsBody, Position,
    Storage, Velocity, World, PHYS_CAT_PLAYER,
};
use warren_services::{Button, InputState};

const DEFAULT_PICKUP_DISTANCE: f32 = 48.0;
const DEFAULT_PICKUP_PAD: f32 = 8.0;

const GRABBABLE: ComponentMask = ComponentMask::of(ComponentKind::GravityGun)
    .with(ComponentKind::Position)
    .with(ComponentKind::PhysicsBody);

const DEPOSITABLE: ComponentMask = ComponentMask::of(ComponentKind::Plastic).with(ComponentKind::GravityGun);

/// Slot of the object `holder` is dragging.
pub fn held_by(world: &World, holder: Entity) -> Option<usize> {
    world
        .indices_with(ComponentMask::of(ComponentKind::GravityGun))
        .find(|&i| {
            world
                .at::<GravityGun>(i)
                .is_some_and(|g| g.is_held() && g.holder == holder)
        })
}

fn hit_test(world: &World, index: usize, aim: Vec2, pad: f32) -> bool {
    let Some(pos) = world.at::<Position>(index).map(|p| p.as_vec2()) else {
        return false;
    };
    if !world.mask_at(index).has(ComponentKind::Collider) {
        return pos.distance_squared(aim) <= pad * pad;
    }
    world.at::<Collider>(index).is_some_and(|c| {
        (aim.x - pos.x).abs() <= c.hx + pad && (aim.y - pos.y).abs() <= c.hy + pad
    })
}

/// Free, non-static grabbable within reach of the player and under the aim
/// point. The one closest to the aim point wins.
pub fn find_grab_candidate(world: &World, player_index: usize, aim: Vec2) -> Option<usize> {
    let player = world.at::<Position>(player_index)?.as_vec2();
    let mut best: Option<(usize, f32)> = None;

    for i in world.indices_with(GRABBABLE) {
        if i == player_index {
            continue;
        }
        let (Some(gun), Some(body), Some(pos)) = (
            world.at::<GravityGun>(i),
            world.at::<PhysicsBody>(i),
            world.at::<Position>(i),
        ) else {
            continue;
        };
        if gun.state != GrabState::Free || body.kind == BodyKind::Static {
            continue;
        }
        let pos = pos.as_vec2();
        let reach = if gun.pickup_distance > 0.0 { gun.pickup_distance } else { DEFAULT_PICKUP_DISTANCE };
        if pos.distance_squared(player) > reach * reach {
            continue;
        }
        let pad = if gun.pickup_radius > 0.0 { gun.pickup_radius } else { DEFAULT_PICKUP_PAD };
        if !hit_test(world, i, aim, pad) {
            continue;
        }
        let d2 = pos.distance_squared(aim);
        if best.map_or(true, |(_, best_d2)| d2 < best_d2) {
            best = Some((i, d2));
        }
    }
    best.map(|(i, _)| i)
}

/// Drop the player bit from the body's mask, or put the saved mask back.
fn set_player_filter(world: &mut World, index: usize, ignore_player: bool) {
    let Some(mask_bits) = world.at::<PhysicsBody>(index).map(|b| b.mask_bits) else {
        return;
    };
    let Some(gun) = world.at_mut::<GravityGun>(index) else {
        return;
    };
    let restored = if ignore_player {
        if gun.saved_mask_bits.is_none() {
            gun.saved_mask_bits = Some(mask_bits);
        }
        let all = if mask_bits == 0 { u32::MAX } else { mask_bits };
        all & !PHYS_CAT_PLAYER
    } else {
        match gun.saved_mask_bits.take() {
            Some(saved) => saved,
            None => return,
        }
    };
    if let Some(body) = world.at_mut::<PhysicsBody>(index) {
        body.mask_bits = restored;
    }
}

fn begin_hold(world: &mut World, index: usize, holder: Entity, aim: Vec2) {
    let Some(pos) = world.at::<Position>(index).map(|p| p.as_vec2()) else {
        return;
    };
    if let Some(gun) = world.at_mut::<GravityGun>(index) {
        gun.state = GrabState::Held;
        gun.holder = holder;
        gun.grab_offset_x = pos.x - aim.x;
        gun.grab_offset_y = pos.y - aim.y;
        gun.hold_vx = 0.0;
        gun.hold_vy = 0.0;
    }
    match world.at_mut::<Velocity>(index) {
        Some(vel) => {
            vel.x = 0.0;
            vel.y = 0.0;
        }
        None => {
            let entity = world.handle_at(index);
            world.add_velocity(entity, 0.0, 0.0);
        }
    }
    set_player_filter(world, index, true);
    tracing::debug!(entity = index, "grabbed");
}

/// Let go. The object stops, and counts as dropped for this tick's deposits.
fn release_hold(world: &mut World, index: usize) {
    if let Some(gun) = world.at_mut::<GravityGun>(index) {
        gun.state = GrabState::Free;
        gun.holder = Entity::DEAD;
        gun.hold_vx = 0.0;
        gun.hold_vy = 0.0;
        gun.just_dropped = true;
    }
    if let Some(vel) = world.at_mut::<Velocity>(index) {
        vel.x = 0.0;
        vel.y = 0.0;
    }
    set_player_filter(world, index, false);
    tracing::debug!(entity = index, "released");
}

/// Grab on a press over a candidate; release once the button is up.
pub fn gravity_gun_input_system(world: &mut World, input: &InputState) {
    let Some(player) = world.find_player() else {
        return;
    };
    let Some(player_index) = world.index_checked(player) else {
        return;
    };
    if !world.has(player, ComponentKind::Position) {
        return;
    }

    if let Some(held) = held_by(world, player) {
        if !input.is_down(Button::Grab) {
            release_hold(world, held);
        }
        return;
    }

    if !input.was_pressed(Button::Grab) {
        return;
    }
    let Some(aim) = input.aim else {
        return;
    };
    if let Some(candidate) = find_grab_candidate(world, player_index, aim) {
        begin_hold(world, candidate, player, aim);
    }
}

fn update_held(world: &mut World, index: usize, input: &InputState, dt: f32) {
    let Some(gun) = world.at::<GravityGun>(index).copied() else {
        return;
    };
    let holder = world
        .index_checked(gun.holder)
        .and_then(|h| world.at::<Position>(h))
        .map(|p| p.as_vec2());
    let (Some(holder), Some(pos)) = (holder, world.at::<Position>(index).map(|p| p.as_vec2())) else {
        release_hold(world, index);
        return;
    };
    if !input.is_down(Button::Grab) {
        release_hold(world, index);
        return;
    }
    if gun.breakoff_distance > 0.0 && pos.distance_squared(holder) > gun.breakoff_distance * gun.breakoff_distance {
        release_hold(world, index);
        return;
    }
    let Some(aim) = input.aim else {
        return;
    };

    let mut target = aim + Vec2::new(gun.grab_offset_x, gun.grab_offset_y);
    if gun.max_hold_distance > 0.0 {
        let to = target - holder;
        let dist2 = to.length_squared();
        if dist2 > gun.max_hold_distance * gun.max_hold_distance && dist2 > 0.0001 {
            target = holder + to * (gun.max_hold_distance / dist2.sqrt());
        }
    }

    let mut desired = (target - pos) * gun.follow_gain;
    if gun.max_speed > 0.0 {
        let speed2 = desired.length_squared();
        if speed2 > gun.max_speed * gun.max_speed && speed2 > 0.0001 {
            desired *= gun.max_speed / speed2.sqrt();
        }
    }

    let blend = (gun.damping * dt).clamp(0.0, 1.0);
    let hold = Vec2::new(gun.hold_vx, gun.hold_vy);
    let hold = hold + (desired - hold) * blend;
    if let Some(gun) = world.at_mut::<GravityGun>(index) {
        gun.hold_vx = hold.x;
        gun.hold_vy = hold.y;
    }
    match world.at_mut::<Velocity>(index) {
        Some(vel) => {
            vel.x = hold.x;
            vel.y = hold.y;
        }
        None => {
            let entity = world.handle_at(index);
            world.add_velocity(entity, hold.x, hold.y);
        }
    }
}

/// Steer every held object toward its target; physics integrates the result.
pub fn gravity_gun_motion_system(world: &mut World, input: &InputState, dt: f32) {
    let held: Vec<usize> = world
        .indices_with(ComponentMask::of(ComponentKind::GravityGun))
        .filter(|&i| world.at::<GravityGun>(i).is_some_and(GravityGun::is_held))
        .collect();
    for i in held {
        update_held(world, i, input, dt);
    }
}

/// Store plastic dropped inside a storage trigger this tick, then clear
/// every drop flag. Returns the number of deposits.
pub fn storage_deposit_system(world: &mut World, proximity: &Proximity) -> u32 {
    let mut deposited = 0;
    let stay: Vec<_> = proximity.stay(world).collect();
    for pair in stay {
        let (Some(owner), Some(item)) = (
            world.index_checked(pair.trigger_owner),
            world.index_checked(pair.matched),
        ) else {
            continue;
        };
        if !world.has(pair.trigger_owner, ComponentKind::Storage) || !world.has_all(pair.matched, DEPOSITABLE) {
            continue;
        }
        let dropped = world
            .at::<GravityGun>(item)
            .is_some_and(|g| !g.is_held() && g.just_dropped);
        if !dropped {
            continue;
        }
        let Some(storage) = world.at_mut::<Storage>(owner) else {
            continue;
        };
        if storage.plastic >= storage.capacity {
            tracing::info!(plastic = storage.plastic, capacity = storage.capacity, "storage full");
            continue;
        }
        storage.plastic += 1;
        let (plastic, capacity) = (storage.plastic, storage.capacity);
        world.destroy(pair.matched);
        deposited += 1;
        tracing::info!(plastic, capacity, "plastic stored");
    }

    let flagged: Vec<usize> = world
        .indices_with(ComponentMask::of(ComponentKind::GravityGun))
        .collect();
    for i in flagged {
        if let Some(gun) = world.at_mut::<GravityGun>(i) {
            gun.just_dropped = false;
        }
    }
    deposited
}

/// Plastic and capacity of the first storage in the world.
pub fn storage_status(world: &World) -> Option<Storage> {
    world
        .indices_with(ComponentMask::of(ComponentKind::Storage))
        .find_map(|i| world.at::<Storage>(i).copied())
}
