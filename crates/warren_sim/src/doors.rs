//! Proximity doors.
//!
//! Anything inside a door's trigger asks it to open. The state machine
//! advances an animation clock and the registry turns it into tile edits,
//! which land when the tile world applies its queue.

use crate::proximity::Proximity;
use std::collections::HashSet;
use warren_core::ecs::{ComponentKind, Door, DoorState, World};
use warren_tiles::{DoorRegistry, TileWorld};

pub fn doors_tick(
    world: &mut World,
    proximity: &Proximity,
    registry: &mut DoorRegistry,
    tiles: &mut TileWorld,
    dt: f32,
) {
    if !tiles.has_map() {
        return;
    }

    let wanted: HashSet<usize> = proximity
        .stay(world)
        .chain(proximity.enter(world))
        .filter_map(|pair| world.index_checked(pair.trigger_owner))
        .collect();

    let doors: Vec<usize> = world.indices_with(ComponentKind::Door.into()).collect();
    for i in doors {
        let Some(door) = world.at_mut::<Door>(i) else {
            continue;
        };
        door.intent_open = wanted.contains(&i);
        let before = door.state;
        let total = door
            .handle
            .map_or(0, |h| registry.primary_animation_duration(tiles, h));

        let (t_ms, forward) = step(door, total, dt);
        if let Some(handle) = door.handle {
            registry.apply_state(tiles, handle, t_ms, forward);
        }
        settle(door, total);
        if door.state != before {
            tracing::debug!(door = i, from = ?before, to = ?door.state, "door state");
        }
    }
}

/// Advance the state machine and return the frame time and direction to show.
fn step(door: &mut Door, total: u32, dt: f32) -> (f32, bool) {
    let total_ms = total as f32;
    // Reversing mid-animation resumes from the mirrored point.
    let mirrored = |t: f32| if total > 0 { total_ms - t.min(total_ms) } else { 0.0 };

    match (door.intent_open, door.state) {
        (true, DoorState::Closed) => {
            door.state = DoorState::Opening;
            door.anim_time_ms = 0.0;
        }
        (true, DoorState::Closing) => {
            door.state = DoorState::Opening;
            door.anim_time_ms = mirrored(door.anim_time_ms);
        }
        (false, DoorState::Open) => {
            door.state = DoorState::Closing;
            door.anim_time_ms = 0.0;
        }
        (false, DoorState::Opening) => {
            door.state = DoorState::Closing;
            door.anim_time_ms = mirrored(door.anim_time_ms);
        }
        _ => {}
    }

    if matches!(door.state, DoorState::Opening | DoorState::Closing) {
        door.anim_time_ms += dt * 1000.0;
    }

    let (t, forward) = match door.state {
        DoorState::Opening => (door.anim_time_ms, true),
        DoorState::Open => (if total > 0 { total_ms } else { door.anim_time_ms }, true),
        DoorState::Closing => (door.anim_time_ms, false),
        DoorState::Closed => (0.0, true),
    };
    let t = if total > 0 { t.min(total_ms) } else { t };
    (t, forward)
}

fn settle(door: &mut Door, total: u32) {
    let total_ms = total as f32;
    let finished = total == 0 || door.anim_time_ms >= total_ms;
    match door.state {
        DoorState::Opening if finished => {
            door.state = DoorState::Open;
            door.anim_time_ms = total_ms;
        }
        DoorState::Closing if finished => {
            door.state = DoorState::Closed;
            door.anim_time_ms = 0.0;
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn door(state: DoorState, t: f32, intent: bool) -> Door {
        Door {
            state,
            anim_time_ms: t,
            intent_open: intent,
            ..Default::default()
        }
    }

    #[test]
    fn closed_door_starts_opening() {
        let mut d = door(DoorState::Closed, 0.0, true);
        let (t, forward) = step(&mut d, 300, 0.1);
        assert_eq!(d.state, DoorState::Opening);
        assert!((t - 100.0).abs() < 1e-3);
        assert!(forward);
        settle(&mut d, 300);
        assert_eq!(d.state, DoorState::Opening);
    }

    #[test]
    fn reversal_mirrors_remaining_time() {
        let mut d = door(DoorState::Opening, 120.0, false);
        let (t, forward) = step(&mut d, 300, 0.0);
        assert_eq!(d.state, DoorState::Closing);
        assert_eq!(t, 180.0);
        assert!(!forward);

        d.intent_open = true;
        step(&mut d, 300, 0.0);
        assert_eq!(d.state, DoorState::Opening);
        assert_eq!(d.anim_time_ms, 120.0);
    }

    #[test]
    fn finishing_clamps_time() {
        let mut d = door(DoorState::Opening, 290.0, true);
        let (t, _) = step(&mut d, 300, 0.1);
        assert_eq!(t, 300.0);
        settle(&mut d, 300);
        assert_eq!((d.state, d.anim_time_ms), (DoorState::Open, 300.0));

        d.intent_open = false;
        step(&mut d, 300, 0.5);
        settle(&mut d, 300);
        assert_eq!((d.state, d.anim_time_ms), (DoorState::Closed, 0.0));
    }

    #[test]
    fn doors_without_animation_snap() {
        let mut d = door(DoorState::Closed, 0.0, true);
        step(&mut d, 0, 0.016);
        settle(&mut d, 0);
        assert_eq!((d.state, d.anim_time_ms), (DoorState::Open, 0.0));

        d.intent_open = false;
        step(&mut d, 0, 0.016);
        settle(&mut d, 0);
        assert_eq!(d.state, DoorState::Closed);
    }

    #[test]
    fn closed_and_open_idle_frames() {
        let mut closed = door(DoorState::Closed, 0.0, false);
        assert_eq!(step(&mut closed, 300, 0.1), (0.0, true));
        let mut open = door(DoorState::Open, 300.0, true);
        assert_eq!(step(&mut open, 300, 0.1), (300.0, true));
    }
}
