//! Optional native rigid-body bookkeeping.
//!
//! A backend may mirror physics bodies into an external library. The
//! simulation core stays authoritative for motion; handles are only created
//! when a body activates and released when its entity is destroyed.

use std::collections::HashSet;
use warren_core::ecs::{Collider, Entity, NativeBodyHandle, PhysicsBody, Position};

pub trait NativePhysicsBackend {
    fn create_body(
        &mut self,
        entity: Entity,
        body: &PhysicsBody,
        position: Position,
        collider: Collider,
    ) -> Option<NativeBodyHandle>;

    fn destroy_body(&mut self, handle: NativeBodyHandle);
}

/// Backend that never attaches anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPhysicsBackend;

impl NativePhysicsBackend for NullPhysicsBackend {
    fn create_body(&mut self, _: Entity, _: &PhysicsBody, _: Position, _: Collider) -> Option<NativeBodyHandle> {
        None
    }

    fn destroy_body(&mut self, _handle: NativeBodyHandle) {}
}

/// Backend that hands out sequential handles and tracks which are live.
#[derive(Debug, Default)]
pub struct TrackingPhysicsBackend {
    next: u64,
    live: HashSet<NativeBodyHandle>,
}

impl TrackingPhysicsBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn is_live(&self, handle: NativeBodyHandle) -> bool {
        self.live.contains(&handle)
    }
}

impl NativePhysicsBackend for TrackingPhysicsBackend {
    fn create_body(
        &mut self,
        entity: Entity,
        body: &PhysicsBody,
        _position: Position,
        _collider: Collider,
    ) -> Option<NativeBodyHandle> {
        self.next += 1;
        let handle = NativeBodyHandle(self.next);
        self.live.insert(handle);
        tracing::trace!(entity = entity.index(), kind = ?body.kind, handle = handle.0, "native body created");
        Some(handle)
    }

    fn destroy_body(&mut self, handle: NativeBodyHandle) {
        if !self.live.remove(&handle) {
            tracing::warn!(handle = handle.0, "destroying unknown native body");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warren_core::ecs::BodyKind;

    #[test]
    fn tracking_backend_counts_live_bodies() {
        let mut backend = TrackingPhysicsBackend::new();
        let body = PhysicsBody::new(BodyKind::Dynamic, 1.0);
        let a = backend
            .create_body(Entity::DEAD, &body, Position::new(0.0, 0.0), Collider::new(1.0, 1.0))
            .unwrap();
        let b = backend
            .create_body(Entity::DEAD, &body, Position::new(0.0, 0.0), Collider::new(1.0, 1.0))
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(backend.live_count(), 2);
        backend.destroy_body(a);
        assert!(!backend.is_live(a));
        assert_eq!(backend.live_count(), 1);
    }

    #[test]
    fn null_backend_attaches_nothing() {
        let mut backend = NullPhysicsBackend;
        let body = PhysicsBody::new(BodyKind::Static, 0.0);
        assert!(backend
            .create_body(Entity::DEAD, &body, Position::default(), Collider::default())
            .is_none());
    }
}
