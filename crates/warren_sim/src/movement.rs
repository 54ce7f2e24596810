//! Player-driven velocity and facing.

use warren_core::ecs::{ComponentKind, Facing, Velocity, World};
use warren_services::InputState;

/// Map the move axis onto every player's velocity and debounce its facing.
pub fn player_input_system(world: &mut World, input: &InputState, speed: f32, hold_time: f32, dt: f32) {
    let raw = input
        .has_move()
        .then(|| Facing::from_move(input.move_x, input.move_y, Facing::South));

    let players: Vec<usize> = world
        .indices_with(ComponentKind::Player | ComponentKind::Velocity)
        .collect();
    for i in players {
        let Some(vel) = world.at_mut::<Velocity>(i) else {
            continue;
        };
        vel.x = input.move_x * speed;
        vel.y = input.move_y * speed;
        vel.facing.update(raw, dt, hold_time);
    }
}
