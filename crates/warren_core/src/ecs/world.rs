// world.rs - fixed-capacity entity store with structure-of-arrays components

use super::component::{Component, ComponentKind, ComponentMask, COMPONENT_KIND_COUNT};
use super::components::*;
use super::entity::{Entity, MAX_ENTITIES};
use super::storage::Column;
use std::rc::Rc;

/// Callback run when an entity carrying a given component is torn down.
///
/// Receives the world and the slot index of the entity being destroyed. The
/// entity is still alive (and its components readable) while the hook runs.
pub type DestroyHook = Box<dyn FnMut(&mut World, usize)>;

/// Callback run when a physics body becomes eligible for motion.
pub type BodyCreateHook = Box<dyn FnMut(&mut World, usize)>;

/// Per-slot progress through the deferred destroy protocol.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum DestroyState {
    #[default]
    None,
    Marked,
    /// Hooks are running; further destroy requests are ignored.
    Destroying,
    Cleaned,
}

/// Read-only view of a sprite-bearing entity.
#[derive(Debug, Copy, Clone)]
pub struct SpriteView<'a> {
    pub entity: Entity,
    pub x: f32,
    pub y: f32,
    pub sprite: &'a Sprite,
}

/// Read-only view of a collider-bearing entity.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ColliderView {
    pub entity: Entity,
    pub x: f32,
    pub y: f32,
    pub hx: f32,
    pub hy: f32,
}

/// Read-only view of a trigger-bearing entity. Half extents are zero without a collider.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TriggerView {
    pub entity: Entity,
    pub x: f32,
    pub y: f32,
    pub hx: f32,
    pub hy: f32,
    pub pad: f32,
}

/// Read-only view of a visible billboard.
#[derive(Debug, Clone, Copy)]
pub struct BillboardView<'a> {
    pub entity: Entity,
    pub x: f32,
    pub y: f32,
    pub y_offset: f32,
    pub text: &'a str,
    /// Remaining linger fraction in `[0, 1]`.
    pub alpha: f32,
}

/// The entity store. Owns every component column.
pub struct World {
    generations: Vec<u32>,
    next_generation: Vec<u32>,
    masks: Vec<ComponentMask>,
    destroy_states: Vec<DestroyState>,
    free: Vec<u32>,
    alive: usize,

    destroy_hooks: Vec<Option<DestroyHook>>,
    body_create_hook: Option<BodyCreateHook>,

    positions: Column<Position>,
    velocities: Column<Velocity>,
    colliders: Column<Collider>,
    bodies: Column<PhysicsBody>,
    triggers: Column<Trigger>,
    liftables: Column<Liftable>,
    follows: Column<Follow>,
    players: Column<Player>,
    sprites: Column<Sprite>,
    billboards: Column<Billboard>,
    doors: Column<Door>,
    items: Column<Item>,
    inventories: Column<Inventory>,
    vendors: Column<Vendor>,
    animations: Column<Animation>,
    gravity_guns: Column<GravityGun>,
    plastics: Column<Plastic>,
    storages: Column<Storage>,
}

macro_rules! impl_component {
    ($($ty:ty => $kind:ident, $field:ident;)+) => {
        $(
            impl Component for $ty {
                const KIND: ComponentKind = ComponentKind::$kind;

                fn column(world: &World) -> &Column<Self> {
                    &world.$field
                }

                fn column_mut(world: &mut World) -> &mut Column<Self> {
                    &mut world.$field
                }
            }
        )+

        impl World {
            fn reset_components(&mut self, index: usize) {
                $( self.$field.reset(index); )+
            }
        }
    };
}

impl_component! {
    Position => Position, positions;
    Velocity => Velocity, velocities;
    Collider => Collider, colliders;
    PhysicsBody => PhysicsBody, bodies;
    Trigger => Trigger, triggers;
    Liftable => Liftable, liftables;
    Follow => Follow, follows;
    Player => Player, players;
    Sprite => Sprite, sprites;
    Billboard => Billboard, billboards;
    Door => Door, doors;
    Item => Item, items;
    Inventory => Inventory, inventories;
    Vendor => Vendor, vendors;
    Animation => Animation, animations;
    GravityGun => GravityGun, gravity_guns;
    Plastic => Plastic, plastics;
    Storage => Storage, storages;
}

const BODY_REQUIREMENTS: ComponentMask = ComponentMask::of(ComponentKind::Position)
    .with(ComponentKind::Collider)
    .with(ComponentKind::PhysicsBody);

impl World {
    /// Create an empty world with every slot free.
    pub fn new() -> Self {
        // Reverse order so the first create() hands out slot 0.
        let free = (0..MAX_ENTITIES as u32).rev().collect();
        let mut destroy_hooks = Vec::with_capacity(COMPONENT_KIND_COUNT);
        destroy_hooks.resize_with(COMPONENT_KIND_COUNT, || None);

        Self {
            generations: vec![0; MAX_ENTITIES],
            next_generation: vec![1; MAX_ENTITIES],
            masks: vec![ComponentMask::EMPTY; MAX_ENTITIES],
            destroy_states: vec![DestroyState::None; MAX_ENTITIES],
            free,
            alive: 0,
            destroy_hooks,
            body_create_hook: None,
            positions: Column::new(),
            velocities: Column::new(),
            colliders: Column::new(),
            bodies: Column::new(),
            triggers: Column::new(),
            liftables: Column::new(),
            follows: Column::new(),
            players: Column::new(),
            sprites: Column::new(),
            billboards: Column::new(),
            doors: Column::new(),
            items: Column::new(),
            inventories: Column::new(),
            vendors: Column::new(),
            animations: Column::new(),
            gravity_guns: Column::new(),
            plastics: Column::new(),
            storages: Column::new(),
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Allocate a fresh entity with an empty mask.
    ///
    /// Returns [`Entity::DEAD`] when every slot is in use.
    pub fn create(&mut self) -> Entity {
        let Some(index) = self.free.pop() else {
            tracing::error!(capacity = MAX_ENTITIES, "entity pool exhausted");
            return Entity::DEAD;
        };
        let i = index as usize;
        let generation = self.next_generation[i];
        self.generations[i] = generation;
        self.masks[i] = ComponentMask::EMPTY;
        self.destroy_states[i] = DestroyState::None;
        self.alive += 1;
        Entity::new(index, generation)
    }

    /// Run destroy hooks and free the slot immediately. No-op on a stale handle.
    ///
    /// Hooks are skipped for an entity that already went through
    /// [`cleanup_marked`](Self::cleanup_marked).
    pub fn destroy(&mut self, entity: Entity) {
        let Some(i) = self.index_checked(entity) else {
            return;
        };
        match self.destroy_states[i] {
            DestroyState::Destroying => return,
            DestroyState::Cleaned => {}
            DestroyState::None | DestroyState::Marked => self.run_destroy_hooks(i),
        }
        self.free_slot(i);
    }

    /// Flag an entity for the deferred destroy path.
    pub fn mark_destroy(&mut self, entity: Entity) {
        if let Some(i) = self.index_checked(entity) {
            if self.destroy_states[i] == DestroyState::None {
                self.destroy_states[i] = DestroyState::Marked;
            }
        }
    }

    /// Run destroy hooks for marked entities without freeing their slots.
    pub fn cleanup_marked(&mut self) {
        for i in 0..MAX_ENTITIES {
            if self.is_alive_index(i) && self.destroy_states[i] == DestroyState::Marked {
                self.run_destroy_hooks(i);
                if self.is_alive_index(i) {
                    self.destroy_states[i] = DestroyState::Cleaned;
                }
            }
        }
    }

    /// Free every marked or cleaned slot. Entities that skipped cleanup get
    /// their hooks run first.
    pub fn destroy_marked(&mut self) {
        for i in 0..MAX_ENTITIES {
            if !self.is_alive_index(i) {
                continue;
            }
            match self.destroy_states[i] {
                DestroyState::None | DestroyState::Destroying => {}
                DestroyState::Marked => {
                    self.run_destroy_hooks(i);
                    self.free_slot(i);
                }
                DestroyState::Cleaned => self.free_slot(i),
            }
        }
    }

    pub fn destroy_state(&self, entity: Entity) -> Option<DestroyState> {
        self.index_checked(entity).map(|i| self.destroy_states[i])
    }

    /// Destroy every live entity (immediate path, hooks included).
    pub fn clear(&mut self) {
        for i in 0..MAX_ENTITIES {
            if self.is_alive_index(i) {
                let e = self.handle_at(i);
                self.destroy(e);
            }
        }
    }

    fn run_destroy_hooks(&mut self, index: usize) {
        self.destroy_states[index] = DestroyState::Destroying;
        let mask = self.masks[index];
        for kind in mask.kinds() {
            let slot = kind.index();
            if let Some(mut hook) = self.destroy_hooks[slot].take() {
                hook(self, index);
                if self.destroy_hooks[slot].is_none() {
                    self.destroy_hooks[slot] = Some(hook);
                }
            }
        }
    }

    fn free_slot(&mut self, index: usize) {
        let generation = self.generations[index];
        if generation == 0 {
            return;
        }
        self.generations[index] = 0;
        self.next_generation[index] = match generation.wrapping_add(1) {
            0 => 1,
            g => g,
        };
        self.masks[index] = ComponentMask::EMPTY;
        self.destroy_states[index] = DestroyState::None;
        self.reset_components(index);
        self.free.push(index as u32);
        self.alive -= 1;
    }

    // ------------------------------------------------------------------
    // Handle validation
    // ------------------------------------------------------------------

    /// Validate a handle against its slot. The single choke point for
    /// handle-based access.
    #[inline]
    pub fn index_checked(&self, entity: Entity) -> Option<usize> {
        let i = entity.index() as usize;
        let generation = entity.generation();
        (i < MAX_ENTITIES && generation != 0 && self.generations[i] == generation).then_some(i)
    }

    /// Slot index without validation. Only for callers that already checked
    /// liveness in the same scope.
    #[inline]
    pub fn index_unchecked(&self, entity: Entity) -> usize {
        entity.index() as usize
    }

    #[inline]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.index_checked(entity).is_some()
    }

    #[inline]
    pub fn is_alive_index(&self, index: usize) -> bool {
        index < MAX_ENTITIES && self.generations[index] != 0
    }

    /// Current handle for a slot (generation 0 when the slot is free).
    pub fn handle_at(&self, index: usize) -> Entity {
        match self.generations.get(index) {
            Some(&generation) => Entity::new(index as u32, generation),
            None => Entity::DEAD,
        }
    }

    pub fn alive_count(&self) -> usize {
        self.alive
    }

    pub fn capacity(&self) -> usize {
        MAX_ENTITIES
    }

    /// Handles of every live entity, in slot order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        (0..MAX_ENTITIES)
            .filter(move |&i| self.generations[i] != 0)
            .map(move |i| self.handle_at(i))
    }

    /// Live slot indices whose mask contains `required`.
    pub fn indices_with(&self, required: ComponentMask) -> impl Iterator<Item = usize> + '_ {
        (0..MAX_ENTITIES).filter(move |&i| self.generations[i] != 0 && self.masks[i].contains(required))
    }

    // ------------------------------------------------------------------
    // Masks & component access
    // ------------------------------------------------------------------

    pub fn mask_of(&self, entity: Entity) -> ComponentMask {
        self.index_checked(entity)
            .map(|i| self.masks[i])
            .unwrap_or(ComponentMask::EMPTY)
    }

    #[inline]
    pub fn mask_at(&self, index: usize) -> ComponentMask {
        self.masks.get(index).copied().unwrap_or(ComponentMask::EMPTY)
    }

    pub fn has(&self, entity: Entity, kind: ComponentKind) -> bool {
        self.mask_of(entity).has(kind)
    }

    pub fn has_all(&self, entity: Entity, set: ComponentMask) -> bool {
        self.index_checked(entity)
            .is_some_and(|i| self.masks[i].contains(set))
    }

    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        let i = self.index_checked(entity)?;
        self.at::<T>(i)
    }

    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        let i = self.index_checked(entity)?;
        self.at_mut::<T>(i)
    }

    /// Component at a slot the caller already validated. `None` when the bit is unset.
    #[inline]
    pub fn at<T: Component>(&self, index: usize) -> Option<&T> {
        if !self.mask_at(index).has(T::KIND) {
            return None;
        }
        T::column(self).get(index)
    }

    #[inline]
    pub fn at_mut<T: Component>(&mut self, index: usize) -> Option<&mut T> {
        if !self.mask_at(index).has(T::KIND) {
            return None;
        }
        T::column_mut(self).get_mut(index)
    }

    /// Write a component and set its bit. Idempotent; never creates the entity.
    pub fn insert<T: Component>(&mut self, entity: Entity, value: T) -> bool {
        let Some(i) = self.index_checked(entity) else {
            return false;
        };
        T::column_mut(self).set(i, value);
        self.masks[i].insert(T::KIND);
        true
    }

    /// Clear a component bit and reset its storage. Hooks are not run.
    pub fn remove<T: Component>(&mut self, entity: Entity) -> bool {
        let Some(i) = self.index_checked(entity) else {
            return false;
        };
        if !self.masks[i].has(T::KIND) {
            return false;
        }
        self.masks[i].remove(T::KIND);
        T::column_mut(self).reset(i);
        true
    }

    // ------------------------------------------------------------------
    // Hooks
    // ------------------------------------------------------------------

    /// Install the teardown callback for one component kind, replacing any previous one.
    pub fn register_destroy_hook(&mut self, kind: ComponentKind, hook: DestroyHook) {
        self.destroy_hooks[kind.index()] = Some(hook);
    }

    pub fn register_body_create_hook(&mut self, hook: BodyCreateHook) {
        self.body_create_hook = Some(hook);
    }

    /// Mark a body created once Position + Collider + PhysicsBody are all present.
    ///
    /// Returns true if the body was activated by this call.
    pub fn try_activate_body(&mut self, index: usize) -> bool {
        if !self.is_alive_index(index) || !self.masks[index].contains(BODY_REQUIREMENTS) {
            return false;
        }
        match self.bodies.get_mut(index) {
            Some(body) if !body.created => body.created = true,
            _ => return false,
        }
        if let Some(mut hook) = self.body_create_hook.take() {
            hook(self, index);
            if self.body_create_hook.is_none() {
                self.body_create_hook = Some(hook);
            }
        }
        true
    }

    // ------------------------------------------------------------------
    // Typed adders
    // ------------------------------------------------------------------

    pub fn add_position(&mut self, entity: Entity, x: f32, y: f32) -> bool {
        self.insert_then_activate(entity, Position::new(x, y))
    }

    /// Velocity starts at rest; the facing state is preserved when re-added.
    pub fn add_velocity(&mut self, entity: Entity, x: f32, y: f32) -> bool {
        let facing = self
            .get::<Velocity>(entity)
            .map(|v| v.facing)
            .unwrap_or_default();
        self.insert(entity, Velocity { x, y, facing })
    }

    pub fn add_collider(&mut self, entity: Entity, hx: f32, hy: f32) -> bool {
        self.insert_then_activate(entity, Collider::new(hx, hy))
    }

    /// Attach a body. Players get [`PHYS_CAT_PLAYER`] ORed into the category bits.
    pub fn add_phys_body(&mut self, entity: Entity, mut body: PhysicsBody) -> bool {
        let Some(i) = self.index_checked(entity) else {
            return false;
        };
        body.created = false;
        body.native = None;
        if self.masks[i].has(ComponentKind::Player) {
            body.category_bits |= PHYS_CAT_PLAYER;
        }
        if self.masks[i].has(ComponentKind::Storage) {
            body.category_bits |= PHYS_CAT_STORAGE;
        }
        self.insert_then_activate(entity, body)
    }

    pub fn add_trigger(&mut self, entity: Entity, pad: f32, target_mask: ComponentMask) -> bool {
        self.insert(entity, Trigger { pad, target_mask })
    }

    pub fn add_liftable(&mut self, entity: Entity, liftable: Liftable) -> bool {
        self.insert(
            entity,
            Liftable {
                state: LiftState::OnGround,
                carrier: Entity::DEAD,
                height: 0.0,
                vertical_velocity: 0.0,
                vx: 0.0,
                vy: 0.0,
                ..liftable
            },
        )
    }

    /// Attach pursuit AI. `last_seen` is seeded from the target when it has a position.
    pub fn add_follow(
        &mut self,
        entity: Entity,
        target: Entity,
        desired_distance: f32,
        max_speed: f32,
        vision_range: f32,
    ) -> bool {
        let seen = self.get::<Position>(target).copied();
        self.insert(
            entity,
            Follow {
                target,
                desired_distance,
                max_speed,
                vision_range,
                last_seen_x: seen.map_or(0.0, |p| p.x),
                last_seen_y: seen.map_or(0.0, |p| p.y),
                has_last_seen: seen.is_some(),
            },
        )
    }

    pub fn add_player(&mut self, entity: Entity) -> bool {
        if !self.insert(entity, Player) {
            return false;
        }
        if let Some(body) = self.get_mut::<PhysicsBody>(entity) {
            body.category_bits |= PHYS_CAT_PLAYER;
        }
        true
    }

    pub fn add_sprite(&mut self, entity: Entity, sprite: Sprite) -> bool {
        self.insert(entity, sprite)
    }

    pub fn add_billboard(
        &mut self,
        entity: Entity,
        text: &str,
        y_offset: f32,
        linger: f32,
        state: BillboardState,
    ) -> bool {
        if self.is_alive(entity) && !self.has(entity, ComponentKind::Trigger) {
            tracing::warn!(entity = entity.index(), "billboard added without a trigger; it will never show");
        }
        self.insert(
            entity,
            Billboard {
                text: text.to_string(),
                y_offset,
                linger,
                timer: 0.0,
                state,
            },
        )
    }

    pub fn add_door(&mut self, entity: Entity, prox_radius: f32, handle: Option<DoorHandle>) -> bool {
        self.insert(
            entity,
            Door {
                prox_radius,
                handle,
                ..Default::default()
            },
        )
    }

    pub fn add_item(&mut self, entity: Entity, kind: ItemKind) -> bool {
        self.insert(entity, Item { kind })
    }

    pub fn add_inventory(&mut self, entity: Entity) -> bool {
        self.insert(entity, Inventory::default())
    }

    pub fn add_vendor(&mut self, entity: Entity, sells: ItemKind, price: u32) -> bool {
        self.insert(entity, Vendor { sells, price })
    }

    pub fn add_animation(&mut self, entity: Entity, sheet: Rc<AnimationSheet>, fps: f32) -> bool {
        self.insert(entity, Animation::new(sheet, fps))
    }

    /// Attach a grabbable. Any previous hold state is discarded.
    pub fn add_gravity_gun(&mut self, entity: Entity, gun: GravityGun) -> bool {
        self.insert(
            entity,
            GravityGun {
                state: GrabState::Free,
                holder: Entity::DEAD,
                hold_vx: 0.0,
                hold_vy: 0.0,
                saved_mask_bits: None,
                just_dropped: false,
                ..gun
            },
        )
    }

    pub fn add_plastic(&mut self, entity: Entity) -> bool {
        self.insert(entity, Plastic)
    }

    /// Attach storage; zero capacity uses [`DEFAULT_STORAGE_CAPACITY`].
    /// An existing body gains [`PHYS_CAT_STORAGE`].
    pub fn add_storage(&mut self, entity: Entity, capacity: u32) -> bool {
        let capacity = if capacity == 0 { DEFAULT_STORAGE_CAPACITY } else { capacity };
        if !self.insert(entity, Storage { plastic: 0, capacity }) {
            return false;
        }
        if let Some(body) = self.get_mut::<PhysicsBody>(entity) {
            body.category_bits |= PHYS_CAT_STORAGE;
        }
        true
    }

    fn insert_then_activate<T: Component>(&mut self, entity: Entity, value: T) -> bool {
        if !self.insert(entity, value) {
            return false;
        }
        let i = self.index_unchecked(entity);
        self.try_activate_body(i);
        true
    }

    // ------------------------------------------------------------------
    // Queries for collaborators
    // ------------------------------------------------------------------

    pub fn get_position(&self, entity: Entity) -> Option<Position> {
        self.get::<Position>(entity).copied()
    }

    /// First live entity carrying the Player marker.
    pub fn find_player(&self) -> Option<Entity> {
        self.indices_with(ComponentMask::of(ComponentKind::Player))
            .next()
            .map(|i| self.handle_at(i))
    }

    /// Count live entities matching each mask.
    pub fn count_matching(&self, masks: &[ComponentMask]) -> Vec<usize> {
        let mut counts = vec![0; masks.len()];
        for i in self.indices_with(ComponentMask::EMPTY) {
            for (count, mask) in counts.iter_mut().zip(masks) {
                if self.masks[i].contains(*mask) {
                    *count += 1;
                }
            }
        }
        counts
    }

    pub fn sprites(&self) -> impl Iterator<Item = SpriteView<'_>> + '_ {
        self.indices_with(ComponentKind::Position | ComponentKind::Sprite)
            .filter_map(move |i| {
                let pos = self.at::<Position>(i)?;
                Some(SpriteView {
                    entity: self.handle_at(i),
                    x: pos.x,
                    y: pos.y,
                    sprite: self.at::<Sprite>(i)?,
                })
            })
    }

    pub fn colliders(&self) -> impl Iterator<Item = ColliderView> + '_ {
        self.indices_with(ComponentKind::Position | ComponentKind::Collider)
            .filter_map(move |i| {
                let pos = self.at::<Position>(i)?;
                let col = self.at::<Collider>(i)?;
                Some(ColliderView {
                    entity: self.handle_at(i),
                    x: pos.x,
                    y: pos.y,
                    hx: col.hx,
                    hy: col.hy,
                })
            })
    }

    pub fn triggers(&self) -> impl Iterator<Item = TriggerView> + '_ {
        self.indices_with(ComponentKind::Position | ComponentKind::Trigger)
            .filter_map(move |i| {
                let pos = self.at::<Position>(i)?;
                let trigger = self.at::<Trigger>(i)?;
                let col = self.at::<Collider>(i).copied().unwrap_or_default();
                Some(TriggerView {
                    entity: self.handle_at(i),
                    x: pos.x,
                    y: pos.y,
                    hx: col.hx,
                    hy: col.hy,
                    pad: trigger.pad,
                })
            })
    }

    /// Active billboards whose linger timer is still running.
    pub fn billboards(&self) -> impl Iterator<Item = BillboardView<'_>> + '_ {
        self.indices_with(ComponentKind::Position | ComponentKind::Billboard)
            .filter_map(move |i| {
                let pos = self.at::<Position>(i)?;
                let bb = self.at::<Billboard>(i)?;
                if bb.state != BillboardState::Active || bb.timer <= 0.0 {
                    return None;
                }
                let alpha = if bb.linger > 0.0 {
                    (bb.timer / bb.linger).clamp(0.0, 1.0)
                } else {
                    1.0
                };
                Some(BillboardView {
                    entity: self.handle_at(i),
                    x: pos.x,
                    y: pos.y,
                    y_offset: bb.y_offset,
                    text: &bb.text,
                    alpha,
                })
            })
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn counting_hook(counter: Rc<RefCell<Vec<usize>>>) -> DestroyHook {
        Box::new(move |_world, index| counter.borrow_mut().push(index))
    }

    #[test]
    fn first_create_returns_slot_zero() {
        let mut world = World::new();
        let a = world.create();
        let b = world.create();
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(a.generation(), 1);
        assert_eq!(world.alive_count(), 2);
    }

    #[test]
    fn stale_handle_stays_dead_after_reuse() {
        let mut world = World::new();
        let old = world.create();
        world.destroy(old);
        assert!(!world.is_alive(old));

        let reused = world.create();
        assert_eq!(reused.index(), old.index());
        assert_ne!(reused.generation(), old.generation());
        assert!(world.is_alive(reused));
        assert!(!world.is_alive(old));

        // Stale operations are silent no-ops.
        assert!(!world.add_position(old, 1.0, 1.0));
        world.destroy(old);
        assert!(world.is_alive(reused));
    }

    #[test]
    fn pool_exhaustion_returns_dead() {
        let mut world = World::new();
        for _ in 0..MAX_ENTITIES {
            let e = world.create();
            assert!(world.is_alive(e));
        }
        let overflow = world.create();
        assert_eq!(overflow, Entity::DEAD);
        assert!(!world.is_alive(overflow));
    }

    #[test]
    fn adding_sets_exactly_one_bit() {
        let mut world = World::new();
        let e = world.create();
        world.add_position(e, 1.0, 2.0);
        world.add_trigger(e, 4.0, ComponentMask::of(ComponentKind::Player));

        for kind in ComponentKind::ALL {
            let before = world.mask_of(e);
            let applied = match kind {
                ComponentKind::Velocity => world.add_velocity(e, 0.0, 0.0),
                ComponentKind::Collider => world.add_collider(e, 4.0, 4.0),
                ComponentKind::Follow => world.add_follow(e, Entity::DEAD, 10.0, 50.0, -1.0),
                ComponentKind::Item => world.add_item(e, ItemKind::Coin),
                ComponentKind::Inventory => world.add_inventory(e),
                _ => continue,
            };
            assert!(applied);
            assert_eq!(world.mask_of(e).bits(), before.bits() | kind.bit(), "{kind}");
        }

        // Re-adding is idempotent on the mask.
        let before = world.mask_of(e);
        world.add_collider(e, 2.0, 2.0);
        assert_eq!(world.mask_of(e), before);
        assert_eq!(world.get::<Collider>(e), Some(&Collider::new(2.0, 2.0)));
    }

    #[test]
    fn body_activates_once_position_and_collider_exist() {
        let mut world = World::new();
        let created = Rc::new(RefCell::new(Vec::new()));
        let sink = created.clone();
        world.register_body_create_hook(Box::new(move |w, i| {
            sink.borrow_mut().push(i);
            if let Some(body) = w.at_mut::<PhysicsBody>(i) {
                body.native = Some(NativeBodyHandle(i as u64 + 100));
            }
        }));

        let e = world.create();
        world.add_phys_body(e, PhysicsBody::new(BodyKind::Dynamic, 1.0));
        world.add_position(e, 0.0, 0.0);
        assert!(!world.get::<PhysicsBody>(e).unwrap().created);

        world.add_collider(e, 4.0, 4.0);
        let body = world.get::<PhysicsBody>(e).unwrap();
        assert!(body.created);
        assert_eq!(body.native, Some(NativeBodyHandle(100)));

        world.add_collider(e, 5.0, 5.0);
        assert_eq!(created.borrow().len(), 1);
    }

    #[test]
    fn player_category_bit_applies_in_either_order() {
        let mut world = World::new();
        let a = world.create();
        world.add_player(a);
        world.add_phys_body(a, PhysicsBody::new(BodyKind::Dynamic, 1.0).with_filter(4, 0));
        assert_eq!(world.get::<PhysicsBody>(a).unwrap().category_bits, 4 | PHYS_CAT_PLAYER);

        let b = world.create();
        world.add_phys_body(b, PhysicsBody::new(BodyKind::Dynamic, 1.0));
        world.add_player(b);
        assert_eq!(world.get::<PhysicsBody>(b).unwrap().category_bits, PHYS_CAT_PLAYER);
        assert_eq!(world.find_player(), Some(a));
    }

    #[test]
    fn storage_defaults_capacity_and_tags_its_body() {
        let mut world = World::new();
        let e = world.create();
        world.add_phys_body(e, PhysicsBody::new(BodyKind::Static, 1.0));
        assert!(world.add_storage(e, 0));
        assert_eq!(world.get::<Storage>(e).unwrap().capacity, DEFAULT_STORAGE_CAPACITY);
        assert_eq!(world.get::<PhysicsBody>(e).unwrap().category_bits, PHYS_CAT_STORAGE);
        assert_eq!(world.mask_of(e), ComponentKind::PhysicsBody | ComponentKind::Storage);

        let gun = GravityGun { state: GrabState::Held, holder: e, ..GravityGun::new() };
        world.add_gravity_gun(e, gun);
        let stored = world.get::<GravityGun>(e).unwrap();
        assert!(!stored.is_held());
        assert_eq!(stored.holder, Entity::DEAD);
        assert_eq!(stored.follow_gain, 10.0);
    }

    #[test]
    fn immediate_destroy_runs_hooks_once() {
        let mut world = World::new();
        let calls = Rc::new(RefCell::new(Vec::new()));
        world.register_destroy_hook(ComponentKind::Sprite, counting_hook(calls.clone()));

        let e = world.create();
        world.add_sprite(e, Sprite::default());
        let plain = world.create();
        world.destroy(plain);
        world.destroy(e);
        world.destroy(e);
        assert_eq!(*calls.borrow(), vec![e.index() as usize]);
    }

    #[test]
    fn deferred_destroy_runs_hooks_exactly_once() {
        let mut world = World::new();
        let calls = Rc::new(RefCell::new(Vec::new()));
        world.register_destroy_hook(ComponentKind::Door, counting_hook(calls.clone()));

        let cleaned = world.create();
        world.add_door(cleaned, 32.0, None);
        let marked_only = world.create();
        world.add_door(marked_only, 32.0, None);
        let untouched = world.create();
        world.add_door(untouched, 32.0, None);

        world.mark_destroy(cleaned);
        world.cleanup_marked();
        assert_eq!(world.destroy_state(cleaned), Some(DestroyState::Cleaned));
        assert!(world.is_alive(cleaned));
        assert!(world.get::<Door>(cleaned).is_some());

        world.mark_destroy(marked_only);
        world.destroy_marked();

        assert!(!world.is_alive(cleaned));
        assert!(!world.is_alive(marked_only));
        assert!(world.is_alive(untouched));
        assert_eq!(calls.borrow().len(), 2);
    }

    #[test]
    fn immediate_destroy_after_cleanup_skips_hooks() {
        let mut world = World::new();
        let calls = Rc::new(RefCell::new(Vec::new()));
        world.register_destroy_hook(ComponentKind::Sprite, counting_hook(calls.clone()));

        let e = world.create();
        world.add_sprite(e, Sprite::default());
        world.mark_destroy(e);
        world.cleanup_marked();
        world.destroy(e);
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn hook_destroying_its_own_entity_frees_the_slot_once() {
        let mut world = World::new();
        let calls = Rc::new(RefCell::new(0));
        let sink = calls.clone();
        world.register_destroy_hook(
            ComponentKind::Sprite,
            Box::new(move |w, i| {
                *sink.borrow_mut() += 1;
                let me = w.handle_at(i);
                w.destroy(me);
            }),
        );

        let a = world.create();
        world.add_sprite(a, Sprite::default());
        world.destroy(a);
        assert!(!world.is_alive(a));
        assert_eq!(world.alive_count(), 0);

        let b = world.create();
        world.add_sprite(b, Sprite::default());
        world.mark_destroy(b);
        world.cleanup_marked();
        assert!(world.is_alive(b));
        world.destroy_marked();
        assert!(!world.is_alive(b));
        assert_eq!(*calls.borrow(), 2);

        let c = world.create();
        let d = world.create();
        assert_ne!(c.index(), d.index());
        assert_eq!(world.alive_count(), 2);
    }

    #[test]
    fn hooks_can_read_components_of_dying_entity() {
        let mut world = World::new();
        let seen = Rc::new(RefCell::new(None));
        let sink = seen.clone();
        world.register_destroy_hook(
            ComponentKind::Position,
            Box::new(move |w, i| *sink.borrow_mut() = w.at::<Position>(i).copied()),
        );
        let e = world.create();
        world.add_position(e, 3.0, 4.0);
        world.destroy(e);
        assert_eq!(*seen.borrow(), Some(Position::new(3.0, 4.0)));
    }

    #[test]
    fn destroyed_slot_components_are_reset() {
        let mut world = World::new();
        let e = world.create();
        world.add_inventory(e);
        world.get_mut::<Inventory>(e).unwrap().coins = 5;
        world.destroy(e);

        let again = world.create();
        assert_eq!(again.index(), e.index());
        assert!(world.get::<Inventory>(again).is_none());
        world.add_inventory(again);
        assert_eq!(world.get::<Inventory>(again).unwrap().coins, 0);
    }

    #[test]
    fn follow_seeds_last_seen_from_target() {
        let mut world = World::new();
        let target = world.create();
        world.add_position(target, 40.0, 50.0);
        let chaser = world.create();
        world.add_follow(chaser, target, 16.0, 60.0, 200.0);
        let follow = world.get::<Follow>(chaser).unwrap();
        assert!(follow.has_last_seen);
        assert_eq!((follow.last_seen_x, follow.last_seen_y), (40.0, 50.0));
    }

    #[test]
    fn views_expose_positions_and_extents() {
        let mut world = World::new();
        let a = world.create();
        world.add_position(a, 10.0, 20.0);
        world.add_collider(a, 3.0, 4.0);
        world.add_trigger(a, 2.0, ComponentMask::EMPTY);

        let b = world.create();
        world.add_position(b, 0.0, 0.0);
        world.add_trigger(b, 6.0, ComponentMask::EMPTY);

        let colliders: Vec<_> = world.colliders().collect();
        assert_eq!(colliders.len(), 1);
        assert_eq!(colliders[0].hx, 3.0);

        let triggers: Vec<_> = world.triggers().collect();
        assert_eq!(triggers.len(), 2);
        assert_eq!((triggers[1].hx, triggers[1].pad), (0.0, 6.0));

        let counts = world.count_matching(&[
            ComponentMask::of(ComponentKind::Trigger),
            ComponentKind::Trigger | ComponentKind::Collider,
        ]);
        assert_eq!(counts, vec![2, 1]);
    }
}
