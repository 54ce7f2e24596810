//! Pick-up / carry / throw state machine for liftable props.
//!
//! OnGround props take part in physics normally. Carried props follow their
//! carrier; thrown props fly ballistically with their own tile bounce and
//! land back OnGround when their height reaches zero.

use glam::Vec2;
use warren_core::ecs::{
    Collider, ComponentKind, ComponentMask, Entity, LiftState, Liftable, Position, Velocity, World,
};
use warren_tiles::{CollisionGrid, SUBTILE_SIZE};

const DEFAULT_REACH: f32 = 12.0;
const DEFAULT_PICKUP_RADIUS: f32 = 8.0;
const FACING_TIE: f32 = 1e-4;
/// Bounce speeds below this are zeroed.
const MIN_BOUNCE_SPEED: f32 = 5.0;

const LIFTABLE_AT: ComponentMask =
    ComponentMask::of(ComponentKind::Liftable).with(ComponentKind::Position);

/// Committed facing of an entity as a unit vector; south without a velocity.
pub fn facing_dir(world: &World, index: usize) -> Vec2 {
    world
        .at::<Velocity>(index)
        .map_or(Vec2::new(0.0, 1.0), |v| v.facing.facing.to_dir())
}

/// Slot of the prop currently carried by `carrier`.
pub fn carried_by(world: &World, carrier: Entity) -> Option<usize> {
    world
        .indices_with(ComponentMask::of(ComponentKind::Liftable))
        .find(|&i| {
            world
                .at::<Liftable>(i)
                .is_some_and(|l| l.state == LiftState::Carried && l.carrier == carrier)
        })
}

/// Best grounded prop in front of the player.
///
/// Each prop is tested against a focus point `reach` pixels ahead; among
/// those within `radius` of it, the one most aligned with the facing wins,
/// ties going to the nearest.
pub fn find_pickup_candidate(world: &World, player_index: usize, dir: Vec2) -> Option<usize> {
    let player = world.at::<Position>(player_index)?.as_vec2();
    let mut best: Option<(usize, f32, f32)> = None;

    for i in world.indices_with(LIFTABLE_AT) {
        if i == player_index {
            continue;
        }
        let (Some(lift), Some(pos)) = (world.at::<Liftable>(i), world.at::<Position>(i)) else {
            continue;
        };
        if lift.state != LiftState::OnGround {
            continue;
        }
        let reach = if lift.pickup_distance > 0.0 { lift.pickup_distance } else { DEFAULT_REACH };
        let radius = if lift.pickup_radius > 0.0 { lift.pickup_radius } else { DEFAULT_PICKUP_RADIUS };

        let pos = pos.as_vec2();
        let focus = player + dir * reach;
        if pos.distance_squared(focus) > radius * radius {
            continue;
        }

        let to = pos - player;
        let dist2 = to.length_squared();
        let dist = dist2.sqrt();
        let facing = if dist > 0.0001 { (to / dist).dot(dir) } else { 1.0 };
        if facing < 0.0 {
            continue;
        }

        let better = match best {
            None => true,
            Some((_, best_facing, best_dist2)) => {
                facing > best_facing + FACING_TIE
                    || ((facing - best_facing).abs() <= FACING_TIE && dist2 < best_dist2)
            }
        };
        if better {
            best = Some((i, facing, dist2));
        }
    }
    best.map(|(i, _, _)| i)
}

fn set_state(lift: &mut Liftable, state: LiftState) {
    if state == LiftState::OnGround {
        lift.carrier = Entity::DEAD;
        lift.height = 0.0;
        lift.vertical_velocity = 0.0;
        lift.vx = 0.0;
        lift.vy = 0.0;
    }
    lift.state = state;
}

fn place(world: &mut World, index: usize, at: Vec2) {
    if let Some(pos) = world.at_mut::<Position>(index) {
        pos.x = at.x;
        pos.y = at.y;
    }
}

/// Attach a grounded prop to `carrier` and snap it in front of them.
pub fn begin_carry(world: &mut World, index: usize, carrier: Entity) {
    let Some(carrier_index) = world.index_checked(carrier) else {
        return;
    };
    let Some(base) = world.at::<Position>(carrier_index).map(Position::as_vec2) else {
        return;
    };
    let dir = facing_dir(world, carrier_index);
    let Some(lift) = world.at_mut::<Liftable>(index) else {
        return;
    };
    lift.carrier = carrier;
    lift.height = lift.carry_height;
    lift.vertical_velocity = 0.0;
    lift.vx = 0.0;
    lift.vy = 0.0;
    set_state(lift, LiftState::Carried);
    let offset = dir * lift.carry_distance;
    place(world, index, base + offset);
    tracing::debug!(prop = index, carrier = carrier.index(), "prop picked up");
}

/// Launch a carried prop along `dir` (south when zero) from in front of the carrier.
pub fn throw(world: &mut World, index: usize, carrier_index: Option<usize>, dir: Vec2) {
    let dir = if dir == Vec2::ZERO { Vec2::new(0.0, 1.0) } else { dir };
    let base = carrier_index
        .and_then(|c| world.at::<Position>(c))
        .map(Position::as_vec2);
    let Some(lift) = world.at_mut::<Liftable>(index) else {
        return;
    };
    lift.carrier = Entity::DEAD;
    lift.height = lift.carry_height;
    lift.vertical_velocity = lift.throw_vertical_speed;
    lift.vx = dir.x * lift.throw_speed;
    lift.vy = dir.y * lift.throw_speed;
    set_state(lift, LiftState::Thrown);
    let offset = dir * lift.carry_distance;
    if let Some(base) = base {
        place(world, index, base + offset);
    }
    tracing::debug!(prop = index, "prop thrown");
}

/// Lift button: throw what the player carries, otherwise try to pick something up.
pub fn lift_input_system(world: &mut World, lift_pressed: bool) {
    if !lift_pressed {
        return;
    }
    let Some(player) = world.find_player() else {
        return;
    };
    let Some(player_index) = world.index_checked(player) else {
        return;
    };
    if !world.mask_at(player_index).has(ComponentKind::Position) {
        return;
    }

    let dir = facing_dir(world, player_index);
    if let Some(carried) = carried_by(world, player) {
        throw(world, carried, Some(player_index), dir);
        return;
    }
    if let Some(candidate) = find_pickup_candidate(world, player_index, dir) {
        begin_carry(world, candidate, player);
    }
}

/// Advance carried and thrown props.
pub fn lift_motion_system(world: &mut World, grid: &CollisionGrid, dt: f32) {
    let props: Vec<usize> = world
        .indices_with(ComponentMask::of(ComponentKind::Liftable))
        .collect();
    for i in props {
        let state = world.at::<Liftable>(i).map(|l| l.state);
        match state {
            Some(LiftState::Carried) => update_carried(world, i),
            Some(LiftState::Thrown) => update_thrown(world, grid, i, dt),
            _ => {}
        }
    }
}

fn update_carried(world: &mut World, index: usize) {
    let Some(carrier) = world.at::<Liftable>(index).map(|l| l.carrier) else {
        return;
    };
    let carrier_pos = world
        .index_checked(carrier)
        .and_then(|c| world.at::<Position>(c).map(|p| (c, p.as_vec2())));
    let Some((carrier_index, base)) = carrier_pos else {
        if let Some(lift) = world.at_mut::<Liftable>(index) {
            set_state(lift, LiftState::OnGround);
        }
        tracing::debug!(prop = index, "carrier gone, prop dropped");
        return;
    };

    let dir = facing_dir(world, carrier_index);
    let Some(lift) = world.at_mut::<Liftable>(index) else {
        return;
    };
    lift.height = lift.carry_height;
    lift.vertical_velocity = 0.0;
    let offset = dir * lift.carry_distance;
    place(world, index, base + offset);
}

/// Whether a box would leave the world or touch a blocked subtile.
fn hits_tiles(grid: &CollisionGrid, cx: f32, cy: f32, hx: f32, hy: f32) -> bool {
    let left = cx - hx;
    let right = cx + hx;
    let top = cy - hy;
    let bottom = cy + hy;

    let (world_w, world_h) = grid.size_px();
    if world_w > 0
        && world_h > 0
        && (left < 0.0 || right > world_w as f32 || top < 0.0 || bottom > world_h as f32)
    {
        return true;
    }

    let ss = SUBTILE_SIZE as f32;
    let min_sx = (left / ss).floor() as i32;
    let max_sx = ((right - 0.0001) / ss).floor() as i32;
    let min_sy = (top / ss).floor() as i32;
    let max_sy = ((bottom - 0.0001) / ss).floor() as i32;
    (min_sy..=max_sy).any(|sy| (min_sx..=max_sx).any(|sx| !grid.is_walkable_subtile(sx, sy)))
}

fn update_thrown(world: &mut World, grid: &CollisionGrid, index: usize, dt: f32) {
    let shape = world.at::<Collider>(index).copied().unwrap_or_default();
    let Some(mut pos) = world.at::<Position>(index).copied() else {
        return;
    };
    let Some(lift) = world.at_mut::<Liftable>(index) else {
        return;
    };

    let damping = (1.0 - (lift.air_friction * dt).clamp(0.0, 1.0)).max(0.0);
    lift.vx *= damping;
    lift.vy *= damping;

    let next_x = pos.x + lift.vx * dt;
    if hits_tiles(grid, next_x, pos.y, shape.hx, shape.hy) {
        lift.vx = -lift.vx * lift.bounce_damping;
        if lift.vx.abs() < MIN_BOUNCE_SPEED {
            lift.vx = 0.0;
        }
    } else {
        pos.x = next_x;
    }

    let next_y = pos.y + lift.vy * dt;
    if hits_tiles(grid, pos.x, next_y, shape.hx, shape.hy) {
        lift.vy = -lift.vy * lift.bounce_damping;
        if lift.vy.abs() < MIN_BOUNCE_SPEED {
            lift.vy = 0.0;
        }
    } else {
        pos.y = next_y;
    }

    lift.vertical_velocity += lift.gravity * dt;
    lift.height += lift.vertical_velocity * dt;
    if lift.height <= 0.0 {
        lift.height = 0.0;
        set_state(lift, LiftState::OnGround);
    }

    place(world, index, pos.as_vec2());
}
