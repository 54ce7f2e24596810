//! Entity/component store.
//!
//! A fixed pool of [`MAX_ENTITIES`] slots addressed by generational
//! [`Entity`] handles. Component data lives in per-type columns owned by the
//! [`World`]; presence is tracked by a per-slot [`ComponentMask`].

mod component;
pub mod components;
mod entity;
mod storage;
mod world;

pub use component::{Component, ComponentKind, ComponentMask, COMPONENT_KIND_COUNT};
pub use components::*;
pub use entity::{Entity, MAX_ENTITIES};
pub use storage::Column;
pub use world::{
    BillboardView, BodyCreateHook, ColliderView, DestroyHook, DestroyState, SpriteView,
    TriggerView, World,
};
