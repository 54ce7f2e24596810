//! Physics/motion resolver.
//!
//! Kinematic motion against the tile grid plus an iterative, mass-weighted
//! penetration solver between bodies. Velocities are per-tick intents: they
//! are integrated once and then cleared.

use warren_core::ecs::{
    BodyKind, Collider, ComponentKind, ComponentMask, Liftable, PhysicsBody, Position, Velocity,
    World, MAX_ENTITIES,
};
use warren_tiles::CollisionGrid;

const BODY_REQUIRED: ComponentMask = ComponentMask::of(ComponentKind::Position)
    .with(ComponentKind::Collider)
    .with(ComponentKind::PhysicsBody);

const MOVER_REQUIRED: ComponentMask =
    ComponentMask::of(ComponentKind::Velocity).with(ComponentKind::PhysicsBody);

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PhysicsConfig {
    /// Pair passes per step, each followed by tile cleanup.
    pub solver_iterations: u32,
    /// Weight multiplier for bodies that moved on their own this tick.
    pub intent_weight: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            solver_iterations: 4,
            intent_weight: 2.0,
        }
    }
}

/// One body's shape and weighting for the pair pass.
#[derive(Debug, Copy, Clone)]
struct Participant {
    index: usize,
    kind: BodyKind,
    weight: f32,
    category_bits: u32,
    mask_bits: u32,
    has_filter: bool,
}

/// Stepper for the bodies of one world. Scratch buffers persist between steps.
#[derive(Debug)]
pub struct PhysicsSolver {
    config: PhysicsConfig,
    intent: Vec<bool>,
    participants: Vec<Participant>,
}

impl PhysicsSolver {
    pub fn new(config: PhysicsConfig) -> Self {
        Self {
            config,
            intent: vec![false; MAX_ENTITIES],
            participants: Vec::with_capacity(MAX_ENTITIES),
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Advance one tick. Does nothing without a loaded grid.
    pub fn step(&mut self, world: &mut World, grid: &CollisionGrid, dt: f32) {
        if grid.is_empty() {
            return;
        }

        activate_pending(world);
        self.integrate(world, grid, dt);
        self.collect_participants(world);

        for _ in 0..self.config.solver_iterations {
            self.solve_pairs(world);
            for p in &self.participants {
                resolve_tile_penetration(world, grid, p.index);
            }
        }
    }

    fn integrate(&mut self, world: &mut World, grid: &CollisionGrid, dt: f32) {
        self.intent.fill(false);
        let movers: Vec<usize> = world.indices_with(MOVER_REQUIRED).collect();
        for i in movers {
            let Some(body) = world.at::<PhysicsBody>(i).copied() else {
                continue;
            };
            if !body.created {
                continue;
            }
            let airborne = world.at::<Liftable>(i).is_some_and(|l| !l.is_grounded());
            let Some(vel) = world.at_mut::<Velocity>(i) else {
                continue;
            };
            let (vx, vy) = (vel.x, vel.y);
            vel.x = 0.0;
            vel.y = 0.0;
            if airborne || !body.kind.is_moving() {
                continue;
            }

            if vx != 0.0 || vy != 0.0 {
                self.intent[i] = true;
            }
            let can_collide = world.mask_at(i).contains(BODY_REQUIRED);
            let shape = world.at::<Collider>(i).copied().unwrap_or_default();
            let Some(pos) = world.at_mut::<Position>(i) else {
                continue;
            };

            let dx = vx * dt;
            let dy = vy * dt;
            if dx != 0.0 {
                pos.x += dx;
                if can_collide {
                    grid.resolve_rect_axis(&mut pos.x, &mut pos.y, shape.hx, shape.hy, true);
                }
            }
            if dy != 0.0 {
                pos.y += dy;
                if can_collide {
                    grid.resolve_rect_axis(&mut pos.x, &mut pos.y, shape.hx, shape.hy, false);
                }
            }
        }
    }

    fn collect_participants(&mut self, world: &World) {
        self.participants.clear();
        for i in world.indices_with(BODY_REQUIRED) {
            let Some(body) = world.at::<PhysicsBody>(i) else {
                continue;
            };
            if !body.created || world.at::<Liftable>(i).is_some_and(|l| !l.is_grounded()) {
                continue;
            }
            let weight = match body.kind {
                BodyKind::Static => 0.0,
                _ if self.intent[i] => body.inv_mass * self.config.intent_weight,
                _ => body.inv_mass,
            };
            self.participants.push(Participant {
                index: i,
                kind: body.kind,
                weight,
                category_bits: body.category_bits,
                mask_bits: body.mask_bits,
                has_filter: body.has_filter(),
            });
        }
    }

    fn solve_pairs(&self, world: &mut World) {
        for (n, a) in self.participants.iter().enumerate() {
            for b in &self.participants[n + 1..] {
                if !should_collide(a, b) {
                    continue;
                }
                let (Some(pa), Some(ca), Some(pb), Some(cb)) = (
                    world.at::<Position>(a.index).copied(),
                    world.at::<Collider>(a.index).copied(),
                    world.at::<Position>(b.index).copied(),
                    world.at::<Collider>(b.index).copied(),
                ) else {
                    continue;
                };
                let Some(sep) = separation(pa, ca, pb, cb, a, b) else {
                    continue;
                };
                if let Some(pos) = world.at_mut::<Position>(a.index) {
                    if sep.along_x {
                        pos.x -= sep.sign * sep.a_amount;
                    } else {
                        pos.y -= sep.sign * sep.a_amount;
                    }
                }
                if let Some(pos) = world.at_mut::<Position>(b.index) {
                    if sep.along_x {
                        pos.x += sep.sign * sep.b_amount;
                    } else {
                        pos.y += sep.sign * sep.b_amount;
                    }
                }
            }
        }
    }
}

impl Default for PhysicsSolver {
    fn default() -> Self {
        Self::new(PhysicsConfig::default())
    }
}

/// Bodies with Position + Collider + PhysicsBody that have not activated yet.
fn activate_pending(world: &mut World) {
    let pending: Vec<usize> = world
        .indices_with(BODY_REQUIRED)
        .filter(|&i| world.at::<PhysicsBody>(i).is_some_and(|b| !b.created))
        .collect();
    for i in pending {
        world.try_activate_body(i);
    }
}

fn should_collide(a: &Participant, b: &Participant) -> bool {
    if a.kind == BodyKind::Static && b.kind == BodyKind::Static {
        return false;
    }
    if a.has_filter || b.has_filter {
        let all = |bits: u32| if bits == 0 { u32::MAX } else { bits };
        let (cat_a, mask_a) = (all(a.category_bits), all(a.mask_bits));
        let (cat_b, mask_b) = (all(b.category_bits), all(b.mask_bits));
        if cat_a & mask_b == 0 || cat_b & mask_a == 0 {
            return false;
        }
    }
    true
}

#[derive(Debug, Copy, Clone, PartialEq)]
struct Separation {
    along_x: bool,
    /// Direction from a to b on the chosen axis.
    sign: f32,
    a_amount: f32,
    b_amount: f32,
}

fn separation(
    pa: Position,
    ca: Collider,
    pb: Position,
    cb: Collider,
    a: &Participant,
    b: &Participant,
) -> Option<Separation> {
    let dx = pb.x - pa.x;
    let dy = pb.y - pa.y;
    let px = ca.hx + cb.hx - dx.abs();
    let py = ca.hy + cb.hy - dy.abs();
    if px <= 0.0 || py <= 0.0 {
        return None;
    }

    let along_x = px < py;
    let (overlap, d) = if along_x { (px, dx) } else { (py, dy) };
    let sign = if d >= 0.0 { 1.0 } else { -1.0 };

    let sum = a.weight + b.weight;
    let (a_amount, b_amount) = if sum > 0.0 {
        (overlap * a.weight / sum, overlap * b.weight / sum)
    } else if a.kind == BodyKind::Static {
        (0.0, overlap)
    } else if b.kind == BodyKind::Static {
        (overlap, 0.0)
    } else {
        (overlap * 0.5, overlap * 0.5)
    };

    Some(Separation {
        along_x,
        sign,
        a_amount,
        b_amount,
    })
}

/// Push a grounded body out of blocked subtiles, preferring the cheaper axis.
fn resolve_tile_penetration(world: &mut World, grid: &CollisionGrid, index: usize) {
    let Some(shape) = world.at::<Collider>(index).copied() else {
        return;
    };
    if shape.hx <= 0.0 || shape.hy <= 0.0 {
        return;
    }
    if let Some(pos) = world.at_mut::<Position>(index) {
        grid.resolve_rect_mtv(&mut pos.x, &mut pos.y, shape.hx, shape.hy);
    }
}
