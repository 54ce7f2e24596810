//! Component data types.
//!
//! Positions are world-space centers in pixels; colliders are half extents.

use super::component::ComponentMask;
use super::entity::Entity;
use crate::assets::TextureHandle;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::rc::Rc;

/// Collision category bit carried by the player's body.
pub const PHYS_CAT_PLAYER: u32 = 1 << 0;

/// Collision category bit carried by storage bodies.
pub const PHYS_CAT_STORAGE: u32 = 1 << 1;

/// Mass used when a body is added without an explicit one.
pub const DEFAULT_BODY_MASS: f32 = 1.0;

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn as_vec2(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// Eight-way facing. Screen space: north is -y.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    North,
    NorthEast,
    East,
    SouthEast,
    #[default]
    South,
    SouthWest,
    West,
    NorthWest,
}

const DIAG: f32 = std::f32::consts::FRAC_1_SQRT_2;

impl Facing {
    /// Position in clockwise order from north, 0..8.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Unit vector pointing in this direction.
    pub fn to_dir(self) -> Vec2 {
        match self {
            Facing::North => Vec2::new(0.0, -1.0),
            Facing::NorthEast => Vec2::new(DIAG, -DIAG),
            Facing::East => Vec2::new(1.0, 0.0),
            Facing::SouthEast => Vec2::new(DIAG, DIAG),
            Facing::South => Vec2::new(0.0, 1.0),
            Facing::SouthWest => Vec2::new(-DIAG, DIAG),
            Facing::West => Vec2::new(-1.0, 0.0),
            Facing::NorthWest => Vec2::new(-DIAG, -DIAG),
        }
    }

    /// Quantize a move vector; returns `fallback` when there is no movement.
    pub fn from_move(move_x: f32, move_y: f32, fallback: Facing) -> Facing {
        let horizontal = move_x.partial_cmp(&0.0);
        let vertical = move_y.partial_cmp(&0.0);
        use std::cmp::Ordering::*;
        match (vertical, horizontal) {
            (Some(Less), Some(Less)) => Facing::NorthWest,
            (Some(Less), Some(Greater)) => Facing::NorthEast,
            (Some(Less), _) => Facing::North,
            (Some(Greater), Some(Less)) => Facing::SouthWest,
            (Some(Greater), Some(Greater)) => Facing::SouthEast,
            (Some(Greater), _) => Facing::South,
            (_, Some(Less)) => Facing::West,
            (_, Some(Greater)) => Facing::East,
            _ => fallback,
        }
    }
}

/// Facing direction debounced against input noise.
///
/// A new raw direction becomes the committed `facing` only after it has been
/// the candidate for a minimum hold time.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct SmoothedFacing {
    pub raw: Facing,
    pub facing: Facing,
    pub candidate: Facing,
    pub candidate_time: f32,
}

impl SmoothedFacing {
    pub fn new(facing: Facing) -> Self {
        Self {
            raw: facing,
            facing,
            candidate: facing,
            candidate_time: 0.0,
        }
    }

    /// Feed one tick of raw input direction (`None` when idle).
    pub fn update(&mut self, raw: Option<Facing>, dt: f32, hold_time: f32) {
        let Some(raw) = raw else {
            self.raw = self.facing;
            self.candidate = self.facing;
            self.candidate_time = 0.0;
            return;
        };

        self.raw = raw;
        if raw == self.facing {
            self.candidate = self.facing;
            self.candidate_time = 0.0;
            return;
        }

        if raw == self.candidate {
            self.candidate_time += dt;
        } else {
            self.candidate = raw;
            self.candidate_time = dt;
        }

        if self.candidate_time >= hold_time {
            self.facing = self.candidate;
            self.candidate_time = 0.0;
        }
    }
}

/// Intended displacement rate for this tick, in pixels per second.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
    pub facing: SmoothedFacing,
}

impl Velocity {
    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Collider {
    pub hx: f32,
    pub hy: f32,
}

impl Collider {
    pub const fn new(hx: f32, hy: f32) -> Self {
        Self { hx, hy }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyKind {
    #[default]
    None,
    Dynamic,
    Kinematic,
    Static,
}

impl BodyKind {
    /// Bodies integrated from their velocity each tick.
    pub fn is_moving(self) -> bool {
        matches!(self, BodyKind::Dynamic | BodyKind::Kinematic)
    }
}

/// Handle issued by a native physics backend. Opaque to the core.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct NativeBodyHandle(pub u64);

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct PhysicsBody {
    pub kind: BodyKind,
    pub mass: f32,
    pub inv_mass: f32,
    pub restitution: f32,
    pub friction: f32,
    /// Filter bits; 0 means "collide with everything".
    pub category_bits: u32,
    pub mask_bits: u32,
    pub created: bool,
    pub native: Option<NativeBodyHandle>,
}

impl PhysicsBody {
    pub fn new(kind: BodyKind, mass: f32) -> Self {
        let inv_mass = if mass != 0.0 { 1.0 / mass } else { 0.0 };
        Self {
            kind,
            mass,
            inv_mass,
            ..Default::default()
        }
    }

    pub fn with_filter(mut self, category_bits: u32, mask_bits: u32) -> Self {
        self.category_bits = category_bits;
        self.mask_bits = mask_bits;
        self
    }

    pub fn has_filter(&self) -> bool {
        self.category_bits != 0 || self.mask_bits != 0
    }
}

/// Proximity notifications against entities whose mask contains `target_mask`.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Trigger {
    pub pad: f32,
    pub target_mask: ComponentMask,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum LiftState {
    #[default]
    OnGround,
    Carried,
    Thrown,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Liftable {
    pub state: LiftState,
    pub carrier: Entity,
    pub height: f32,
    pub vertical_velocity: f32,
    pub carry_height: f32,
    pub carry_distance: f32,
    pub pickup_distance: f32,
    pub pickup_radius: f32,
    pub throw_speed: f32,
    pub throw_vertical_speed: f32,
    pub gravity: f32,
    pub vx: f32,
    pub vy: f32,
    pub air_friction: f32,
    pub bounce_damping: f32,
}

impl Liftable {
    pub fn is_grounded(&self) -> bool {
        self.state == LiftState::OnGround
    }
}

impl Default for Liftable {
    fn default() -> Self {
        Self {
            state: LiftState::OnGround,
            carrier: Entity::DEAD,
            height: 0.0,
            vertical_velocity: 0.0,
            carry_height: 18.0,
            carry_distance: 12.0,
            pickup_distance: 18.0,
            pickup_radius: 10.0,
            throw_speed: 220.0,
            throw_vertical_speed: 260.0,
            gravity: -720.0,
            vx: 0.0,
            vy: 0.0,
            air_friction: 3.0,
            bounce_damping: 0.45,
        }
    }
}

/// Pursuit AI state.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Follow {
    pub target: Entity,
    pub desired_distance: f32,
    pub max_speed: f32,
    /// Non-positive means unlimited.
    pub vision_range: f32,
    pub last_seen_x: f32,
    pub last_seen_y: f32,
    pub has_last_seen: bool,
}

/// Marker for the controllable entity.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Player;

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct SpriteRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Sprite {
    pub texture: TextureHandle,
    pub src: SpriteRect,
    pub origin_x: f32,
    pub origin_y: f32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum BillboardState {
    #[default]
    Active,
    Inactive,
}

/// Floating text that stays visible while something is in trigger range.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Billboard {
    pub text: String,
    pub y_offset: f32,
    pub linger: f32,
    pub timer: f32,
    pub state: BillboardState,
}

/// Door handle issued by the tile door registry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct DoorHandle(NonZeroU32);

impl DoorHandle {
    pub fn from_raw(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    pub fn raw(self) -> u32 {
        self.0.get()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum DoorState {
    #[default]
    Closed,
    Opening,
    Open,
    Closing,
}

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Door {
    pub prox_radius: f32,
    pub handle: Option<DoorHandle>,
    pub state: DoorState,
    pub anim_time_ms: f32,
    pub intent_open: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    #[default]
    Coin,
    Hat,
}

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Item {
    pub kind: ItemKind,
}

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Inventory {
    pub coins: u32,
    pub has_hat: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Vendor {
    pub sells: ItemKind,
    pub price: u32,
}

/// Upper bound on animations per sheet.
pub const MAX_ANIMATIONS: usize = 16;

/// Cell of a sprite sheet, in frames.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnimFrame {
    pub col: u16,
    pub row: u16,
}

/// Frame sequences for one sprite sheet, shared by every entity using it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnimationSheet {
    pub frame_w: f32,
    pub frame_h: f32,
    pub sequences: Vec<Vec<AnimFrame>>,
}

impl AnimationSheet {
    pub fn new(frame_w: f32, frame_h: f32, mut sequences: Vec<Vec<AnimFrame>>) -> Self {
        sequences.truncate(MAX_ANIMATIONS);
        Self {
            frame_w,
            frame_h,
            sequences,
        }
    }
}

/// Playback of an [`AnimationSheet`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Animation {
    pub sheet: Rc<AnimationSheet>,
    pub current: usize,
    pub frame_index: usize,
    pub time: f32,
    pub frame_duration: f32,
}

impl Animation {
    /// Non-positive `fps` plays at 10 frames per second.
    pub fn new(sheet: Rc<AnimationSheet>, fps: f32) -> Self {
        Self {
            sheet,
            current: 0,
            frame_index: 0,
            time: 0.0,
            frame_duration: if fps > 0.0 { 1.0 / fps } else { 0.1 },
        }
    }

    /// Switch to `anim`, restarting playback when it differs from the current one.
    pub fn play(&mut self, anim: usize) {
        if anim != self.current {
            self.current = anim;
            self.frame_index = 0;
            self.time = 0.0;
        }
        let len = self.sequence_len();
        if len > 0 && self.frame_index >= len {
            self.frame_index = 0;
        }
    }

    pub fn sequence_len(&self) -> usize {
        self.sheet.sequences.get(self.current).map_or(0, Vec::len)
    }

    /// Advance the clock, wrapping at the end of the sequence.
    pub fn advance(&mut self, dt: f32) {
        let len = self.sequence_len();
        if len == 0 || self.frame_duration <= 0.0 {
            return;
        }
        self.time += dt;
        while self.time >= self.frame_duration {
            self.time -= self.frame_duration;
            self.frame_index = (self.frame_index + 1) % len;
        }
    }

    /// Source rectangle of the frame on screen, if the current sequence has one.
    pub fn source_rect(&self) -> Option<SpriteRect> {
        let frame = self.sheet.sequences.get(self.current)?.get(self.frame_index)?;
        Some(SpriteRect {
            x: frame.col as f32 * self.sheet.frame_w,
            y: frame.row as f32 * self.sheet.frame_h,
            w: self.sheet.frame_w,
            h: self.sheet.frame_h,
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum GrabState {
    #[default]
    Free,
    Held,
}

/// Object the player can drag with the pointer.
///
/// Zero distances mean "no limit"; zero pickup values fall back to 48 px
/// reach and an 8 px hit pad.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct GravityGun {
    pub state: GrabState,
    pub holder: Entity,
    pub pickup_distance: f32,
    pub pickup_radius: f32,
    pub max_hold_distance: f32,
    pub breakoff_distance: f32,
    pub follow_gain: f32,
    pub max_speed: f32,
    pub damping: f32,
    pub hold_vx: f32,
    pub hold_vy: f32,
    pub grab_offset_x: f32,
    pub grab_offset_y: f32,
    /// Body mask saved while the player filter is applied.
    pub saved_mask_bits: Option<u32>,
    /// Released during the current tick; cleared after storage deposits run.
    pub just_dropped: bool,
}

impl GravityGun {
    pub fn new() -> Self {
        Self {
            follow_gain: 10.0,
            max_speed: 400.0,
            damping: 20.0,
            ..Default::default()
        }
    }

    pub fn is_held(&self) -> bool {
        self.state == GrabState::Held
    }
}

/// Marker for collectable plastic.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Plastic;

/// Default capacity for a storage with none given.
pub const DEFAULT_STORAGE_CAPACITY: u32 = 20;

/// Deposit point for plastic.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Storage {
    pub plastic: u32,
    pub capacity: u32,
}
