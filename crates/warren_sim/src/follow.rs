//! Pursuit AI: chase a target while it is visible, then head for where it
//! was last seen. Steering tries rotated directions for a clear path.

use glam::Vec2;
use warren_core::ecs::{
    Collider, ComponentKind, ComponentMask, Follow, Liftable, Position, Velocity, World,
};
use warren_tiles::{CollisionGrid, SUBTILE_SIZE};

const FOLLOWER: ComponentMask = ComponentMask::of(ComponentKind::Follow)
    .with(ComponentKind::Position)
    .with(ComponentKind::Velocity);

/// Steering order, in degrees relative to the goal direction.
const STEER_ANGLES_DEG: [f32; 10] = [
    0.0, 30.0, -30.0, 60.0, -60.0, 90.0, -90.0, 150.0, -150.0, 180.0,
];

pub fn follow_system(world: &mut World, grid: &CollisionGrid) {
    let subtile = SUBTILE_SIZE as f32;
    let stop_at_last_seen = subtile * 0.35;

    let followers: Vec<usize> = world.indices_with(FOLLOWER).collect();
    for i in followers {
        let velocity = steer(world, grid, i, subtile, stop_at_last_seen);
        if let Some(vel) = world.at_mut::<Velocity>(i) {
            vel.x = velocity.x;
            vel.y = velocity.y;
        }
    }
}

fn steer(
    world: &mut World,
    grid: &CollisionGrid,
    i: usize,
    subtile: f32,
    stop_at_last_seen: f32,
) -> Vec2 {
    if world.at::<Liftable>(i).is_some_and(|l| !l.is_grounded()) {
        return Vec2::ZERO;
    }
    let (Some(follow), Some(me)) = (world.at::<Follow>(i).copied(), world.at::<Position>(i)) else {
        return Vec2::ZERO;
    };
    let me = me.as_vec2();
    let Some(target) = world.get_position(follow.target) else {
        return Vec2::ZERO;
    };
    let target = target.as_vec2();

    let clear = match world.at::<Collider>(i) {
        Some(c) => Vec2::new(c.hx + 1.0, c.hy + 1.0),
        None => Vec2::splat(subtile * 0.5),
    };

    let can_see = grid.line_of_sight(
        me.x,
        me.y,
        target.x,
        target.y,
        follow.vision_range,
        clear.x,
        clear.y,
    );
    if can_see {
        if let Some(f) = world.at_mut::<Follow>(i) {
            f.last_seen_x = target.x;
            f.last_seen_y = target.y;
            f.has_last_seen = true;
        }
    }

    let (goal, stop_radius) = if can_see {
        (target, follow.desired_distance)
    } else if follow.has_last_seen {
        (Vec2::new(follow.last_seen_x, follow.last_seen_y), stop_at_last_seen)
    } else {
        return Vec2::ZERO;
    };

    let to_goal = goal - me;
    let dist2 = to_goal.length_squared();
    if dist2 <= stop_radius * stop_radius {
        return Vec2::ZERO;
    }
    let dist = dist2.sqrt();
    if dist <= 0.0 || follow.max_speed <= 0.0 {
        return Vec2::ZERO;
    }
    let dir = to_goal / dist;

    let reach = (subtile * 1.5).max(clear.x * 2.0).max(clear.y * 2.0);
    let chosen = STEER_ANGLES_DEG.iter().find_map(|&deg| {
        let rotated = Vec2::from_angle(deg.to_radians()).rotate(dir);
        let end = me + rotated * reach;
        grid.line_of_sight(me.x, me.y, end.x, end.y, reach, clear.x, clear.y)
            .then_some(rotated)
    });

    match chosen {
        Some(d) => d * follow.max_speed,
        // Boxed in: keep pushing toward the goal only if we are not already stuck in a wall.
        None if grid.is_walkable_rect(me.x, me.y, clear.x, clear.y) => dir * follow.max_speed,
        None => Vec2::ZERO,
    }
}
