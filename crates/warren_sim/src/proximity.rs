//! Proximity/trigger service.
//!
//! Rebuilt once per tick; consumers read the STAY / ENTER / EXIT views
//! instead of testing overlaps themselves.

use warren_core::ecs::{Collider, ComponentKind, ComponentMask, Entity, Position, Trigger, World};

const OWNER_REQUIRED: ComponentMask = ComponentMask::of(ComponentKind::Position)
    .with(ComponentKind::Collider)
    .with(ComponentKind::Trigger);

const TARGET_REQUIRED: ComponentMask =
    ComponentMask::of(ComponentKind::Position).with(ComponentKind::Collider);

/// A trigger owner and an entity inside its padded box.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ProximityPair {
    pub trigger_owner: Entity,
    pub matched: Entity,
}

#[derive(Debug, Default)]
pub struct Proximity {
    current: Vec<ProximityPair>,
    previous: Vec<ProximityPair>,
}

impl Proximity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Roll the current pairs into `previous` and rescan.
    pub fn update(&mut self, world: &World) {
        std::mem::swap(&mut self.previous, &mut self.current);
        self.current.clear();

        for a in world.indices_with(OWNER_REQUIRED) {
            let (Some(pa), Some(ca), Some(trigger)) = (
                world.at::<Position>(a),
                world.at::<Collider>(a),
                world.at::<Trigger>(a),
            ) else {
                continue;
            };
            let reach_x = ca.hx + trigger.pad;
            let reach_y = ca.hy + trigger.pad;

            for b in world.indices_with(trigger.target_mask | TARGET_REQUIRED) {
                if b == a {
                    continue;
                }
                let (Some(pb), Some(cb)) = (world.at::<Position>(b), world.at::<Collider>(b)) else {
                    continue;
                };
                if (pa.x - pb.x).abs() <= reach_x + cb.hx && (pa.y - pb.y).abs() <= reach_y + cb.hy {
                    self.current.push(ProximityPair {
                        trigger_owner: world.handle_at(a),
                        matched: world.handle_at(b),
                    });
                }
            }
        }
    }

    /// Drop all pairs, for example after a map reload.
    pub fn clear(&mut self) {
        self.current.clear();
        self.previous.clear();
    }

    /// Pairs overlapping this tick.
    pub fn stay<'a>(&'a self, world: &'a World) -> impl Iterator<Item = ProximityPair> + 'a {
        self.current
            .iter()
            .copied()
            .filter(move |p| both_alive(world, p))
    }

    /// Pairs that started overlapping this tick.
    pub fn enter<'a>(&'a self, world: &'a World) -> impl Iterator<Item = ProximityPair> + 'a {
        self.current
            .iter()
            .copied()
            .filter(move |p| both_alive(world, p) && !self.previous.contains(p))
    }

    /// Pairs that stopped overlapping this tick.
    pub fn exit<'a>(&'a self, world: &'a World) -> impl Iterator<Item = ProximityPair> + 'a {
        self.previous
            .iter()
            .copied()
            .filter(move |p| both_alive(world, p) && !self.current.contains(p))
    }

    /// Raw pair count this tick, dead endpoints included.
    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }
}

fn both_alive(world: &World, pair: &ProximityPair) -> bool {
    world.is_alive(pair.trigger_owner) && world.is_alive(pair.matched)
}
