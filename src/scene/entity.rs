//! Entity: a named container owning a transform and a set of components

use std::sync::atomic::{AtomicU64, Ordering};

use glam::Vec3;

use crate::scene::{Component, ComponentKind, Transform};

static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(1);

/// Unique entity identifier. Copyable and cheap; used as the non-owning
/// back-reference from components to their owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId(u64);

impl EntityId {
    fn next() -> Self {
        Self(NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A named scene object owning one [`Transform`] and at most one component
/// per [`ComponentKind`], kept in insertion order.
#[derive(Debug)]
pub struct Entity {
    id: EntityId,
    name: String,
    pub transform: Transform,
    pub enabled: bool,
    components: Vec<Component>,
}

impl Entity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: EntityId::next(),
            name: name.into(),
            transform: Transform::default(),
            enabled: true,
            components: Vec::new(),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attach a component, setting its owner back-reference.
    ///
    /// Duplicate policy: silent replace. If a component of the same kind is
    /// already attached it is returned, and the replacement takes over its
    /// position in the iteration order (map-insert semantics).
    pub fn add_component(&mut self, mut component: Component) -> Option<Component> {
        component.set_owner(self.id);
        match self
            .components
            .iter_mut()
            .find(|existing| existing.kind() == component.kind())
        {
            Some(slot) => Some(std::mem::replace(slot, component)),
            None => {
                self.components.push(component);
                None
            }
        }
    }

    /// Look up a component by kind. Absence is an ordinary miss, not an error.
    pub fn component(&self, kind: ComponentKind) -> Option<&Component> {
        self.components.iter().find(|c| c.kind() == kind)
    }

    /// Look up a component by kind, mutably
    pub fn component_mut(&mut self, kind: ComponentKind) -> Option<&mut Component> {
        self.components.iter_mut().find(|c| c.kind() == kind)
    }

    /// All attached components, in insertion order
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Update every enabled component, in insertion order. The caller
    /// (the scene) checks `self.enabled` before invoking this.
    pub fn update(&mut self) {
        for component in &mut self.components {
            if component.enabled {
                component.update();
            }
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.transform.position = position;
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_component(mut self, component: Component) -> Self {
        self.add_component(component);
        self
    }
}
