//! Component kinds and presence masks.
//!
//! Every component type owns one bit of a per-entity 32-bit mask. "Has a
//! component" is a bit test; "has a component set" is `mask & set == set`.

use super::storage::Column;
use super::world::World;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Component identifier. The discriminant is the bit position in a [`ComponentMask`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum ComponentKind {
    Position = 0,
    Velocity = 1,
    Collider = 2,
    PhysicsBody = 3,
    Trigger = 4,
    Liftable = 5,
    Follow = 6,
    Player = 7,
    Sprite = 8,
    Billboard = 9,
    Door = 10,
    Item = 11,
    Inventory = 12,
    Vendor = 13,
    Animation = 14,
    GravityGun = 15,
    Plastic = 16,
    Storage = 17,
}

/// Number of component kinds (size of the destroy-hook table).
pub const COMPONENT_KIND_COUNT: usize = 18;

impl ComponentKind {
    pub const ALL: [ComponentKind; COMPONENT_KIND_COUNT] = [
        ComponentKind::Position,
        ComponentKind::Velocity,
        ComponentKind::Collider,
        ComponentKind::PhysicsBody,
        ComponentKind::Trigger,
        ComponentKind::Liftable,
        ComponentKind::Follow,
        ComponentKind::Player,
        ComponentKind::Sprite,
        ComponentKind::Billboard,
        ComponentKind::Door,
        ComponentKind::Item,
        ComponentKind::Inventory,
        ComponentKind::Vendor,
        ComponentKind::Animation,
        ComponentKind::GravityGun,
        ComponentKind::Plastic,
        ComponentKind::Storage,
    ];

    #[inline]
    pub const fn bit(self) -> u32 {
        1u32 << (self as u8)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            ComponentKind::Position => "position",
            ComponentKind::Velocity => "velocity",
            ComponentKind::Collider => "collider",
            ComponentKind::PhysicsBody => "physics_body",
            ComponentKind::Trigger => "trigger",
            ComponentKind::Liftable => "liftable",
            ComponentKind::Follow => "follow",
            ComponentKind::Player => "player",
            ComponentKind::Sprite => "sprite",
            ComponentKind::Billboard => "billboard",
            ComponentKind::Door => "door",
            ComponentKind::Item => "item",
            ComponentKind::Inventory => "inventory",
            ComponentKind::Vendor => "vendor",
            ComponentKind::Animation => "animation",
            ComponentKind::GravityGun => "gravity_gun",
            ComponentKind::Plastic => "plastic",
            ComponentKind::Storage => "storage",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Set of component kinds.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentMask(u32);

impl ComponentMask {
    pub const EMPTY: ComponentMask = ComponentMask(0);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn of(kind: ComponentKind) -> Self {
        Self(kind.bit())
    }

    /// Builder form usable in constants: `ComponentMask::of(A).with(B)`.
    pub const fn with(self, kind: ComponentKind) -> Self {
        Self(self.0 | kind.bit())
    }

    pub const fn has(self, kind: ComponentKind) -> bool {
        self.0 & kind.bit() != 0
    }

    /// True when every bit of `set` is present.
    pub const fn contains(self, set: ComponentMask) -> bool {
        self.0 & set.0 == set.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn insert(&mut self, kind: ComponentKind) {
        self.0 |= kind.bit();
    }

    pub fn remove(&mut self, kind: ComponentKind) {
        self.0 &= !kind.bit();
    }

    /// Kinds present in the mask, in bit order.
    pub fn kinds(self) -> impl Iterator<Item = ComponentKind> {
        ComponentKind::ALL.into_iter().filter(move |k| self.has(*k))
    }
}

impl From<ComponentKind> for ComponentMask {
    fn from(kind: ComponentKind) -> Self {
        Self::of(kind)
    }
}

impl BitOr for ComponentKind {
    type Output = ComponentMask;

    fn bitor(self, rhs: ComponentKind) -> ComponentMask {
        ComponentMask::of(self).with(rhs)
    }
}

impl BitOr<ComponentKind> for ComponentMask {
    type Output = ComponentMask;

    fn bitor(self, rhs: ComponentKind) -> ComponentMask {
        self.with(rhs)
    }
}

impl BitOr for ComponentMask {
    type Output = ComponentMask;

    fn bitor(self, rhs: ComponentMask) -> ComponentMask {
        ComponentMask(self.0 | rhs.0)
    }
}

impl BitOrAssign<ComponentKind> for ComponentMask {
    fn bitor_assign(&mut self, rhs: ComponentKind) {
        self.insert(rhs);
    }
}

/// Typed component stored in a [`World`] column.
///
/// Implemented for every component struct in [`components`](super::components);
/// the column accessors let generic world methods reach the right array.
pub trait Component: Sized + Default + 'static {
    const KIND: ComponentKind;

    #[doc(hidden)]
    fn column(world: &World) -> &Column<Self>;

    #[doc(hidden)]
    fn column_mut(world: &mut World) -> &mut Column<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_are_unique_and_ordered() {
        let mut seen = 0u32;
        for (i, kind) in ComponentKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
            assert_eq!(seen & kind.bit(), 0);
            seen |= kind.bit();
        }
        assert_eq!(seen.count_ones() as usize, COMPONENT_KIND_COUNT);
    }

    #[test]
    fn mask_set_operations() {
        let req = ComponentKind::Position | ComponentKind::Collider;
        let mut mask = ComponentMask::of(ComponentKind::Position);
        assert!(!mask.contains(req));
        mask |= ComponentKind::Collider;
        assert!(mask.contains(req));
        mask.remove(ComponentKind::Position);
        assert!(!mask.has(ComponentKind::Position));
        assert_eq!(mask.kinds().collect::<Vec<_>>(), vec![ComponentKind::Collider]);
        assert!(mask.contains(ComponentMask::EMPTY));
    }
}
