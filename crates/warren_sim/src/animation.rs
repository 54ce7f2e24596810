//! Sprite sheet playback and the player's walk/idle selection.

use warren_core::ecs::{Animation, ComponentKind, Sprite, Velocity, World, MAX_ANIMATIONS};

/// Sequences `0..8` walk in each facing, `8..16` idle in it.
const IDLE_OFFSET: usize = 8;
const IDLE_SPEED2: f32 = 0.01 * 0.01;

/// Pick the player's sequence from its speed and committed facing.
pub fn animation_controller_system(world: &mut World) {
    let Some(i) = world.find_player().and_then(|p| world.index_checked(p)) else {
        return;
    };
    let Some(vel) = world.at::<Velocity>(i) else {
        return;
    };
    let dir = vel.facing.facing.index();
    let anim = if vel.x * vel.x + vel.y * vel.y < IDLE_SPEED2 {
        IDLE_OFFSET + dir
    } else {
        dir
    };
    if anim >= MAX_ANIMATIONS {
        tracing::error!(anim, max = MAX_ANIMATIONS, "animation index out of range");
        return;
    }
    if let Some(animation) = world.at_mut::<Animation>(i) {
        animation.play(anim);
    }
}

/// Advance every animated sprite and point its source rect at the current frame.
pub fn sprite_animation_system(world: &mut World, dt: f32) {
    let animated: Vec<usize> = world
        .indices_with(ComponentKind::Sprite | ComponentKind::Animation)
        .collect();
    for i in animated {
        let Some(animation) = world.at_mut::<Animation>(i) else {
            continue;
        };
        animation.advance(dt);
        let Some(src) = animation.source_rect() else {
            continue;
        };
        if let Some(sprite) = world.at_mut::<Sprite>(i) {
            sprite.src = src;
        }
    }
}
