//! Component model
//!
//! Components form a closed set of tagged variants (camera, light, material,
//! mesh) behind one common capability surface: an `enabled` flag, a one-shot
//! `start` hook, and a per-frame `update`. Dispatch is by matching on the
//! payload, not by inheritance.

use crate::resources::{Material, Mesh};
use crate::scene::{Camera, EntityId, Light};

/// Discriminant for the closed component set. An entity holds at most one
/// component per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Camera,
    Light,
    Material,
    Mesh,
}

/// Variant payloads
#[derive(Debug, Clone)]
pub enum ComponentData {
    Camera(Camera),
    Light(Light),
    Material(Material),
    Mesh(Mesh),
}

impl ComponentData {
    pub fn kind(&self) -> ComponentKind {
        match self {
            ComponentData::Camera(_) => ComponentKind::Camera,
            ComponentData::Light(_) => ComponentKind::Light,
            ComponentData::Material(_) => ComponentKind::Material,
            ComponentData::Mesh(_) => ComponentKind::Mesh,
        }
    }
}

/// A unit of data/behavior attached to exactly one entity for its lifetime.
///
/// The owner back-reference is a plain [`EntityId`]: a non-owning handle
/// resolved through the scene, never a counted reference.
#[derive(Debug, Clone)]
pub struct Component {
    pub enabled: bool,
    owner: Option<EntityId>,
    started: bool,
    ticks: u64,
    data: ComponentData,
}

impl Component {
    pub fn new(data: ComponentData) -> Self {
        Self {
            enabled: true,
            owner: None,
            started: false,
            ticks: 0,
            data,
        }
    }

    pub fn kind(&self) -> ComponentKind {
        self.data.kind()
    }

    /// The entity this component is attached to, if any
    pub fn owner(&self) -> Option<EntityId> {
        self.owner
    }

    pub(crate) fn set_owner(&mut self, owner: EntityId) {
        self.owner = Some(owner);
    }

    pub fn data(&self) -> &ComponentData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut ComponentData {
        &mut self.data
    }

    pub fn as_camera(&self) -> Option<&Camera> {
        match &self.data {
            ComponentData::Camera(camera) => Some(camera),
            _ => None,
        }
    }

    pub fn as_light(&self) -> Option<&Light> {
        match &self.data {
            ComponentData::Light(light) => Some(light),
            _ => None,
        }
    }

    pub fn as_material(&self) -> Option<&Material> {
        match &self.data {
            ComponentData::Material(material) => Some(material),
            _ => None,
        }
    }

    pub fn as_mesh(&self) -> Option<&Mesh> {
        match &self.data {
            ComponentData::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    /// True once the start hook has run
    pub fn has_started(&self) -> bool {
        self.started
    }

    /// Number of update passes this component has seen
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Per-frame update. The first invocation runs the start hook. Only
    /// component state is touched here; GPU work happens in the renderer.
    pub fn update(&mut self) {
        if !self.started {
            self.started = true;
        }
        self.ticks += 1;
    }
}

impl From<Camera> for Component {
    fn from(camera: Camera) -> Self {
        Component::new(ComponentData::Camera(camera))
    }
}

impl From<Light> for Component {
    fn from(light: Light) -> Self {
        Component::new(ComponentData::Light(light))
    }
}

impl From<Material> for Component {
    fn from(material: Material) -> Self {
        Component::new(ComponentData::Material(material))
    }
}

impl From<Mesh> for Component {
    fn from(mesh: Mesh) -> Self {
        Component::new(ComponentData::Mesh(mesh))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn kind_follows_payload() {
        assert_eq!(Component::from(Camera::default()).kind(), ComponentKind::Camera);
        assert_eq!(Component::from(Light::default()).kind(), ComponentKind::Light);
        assert_eq!(
            Component::from(Material::default()).kind(),
            ComponentKind::Material
        );
        assert_eq!(
            Component::from(Mesh::tetrahedron()).kind(),
            ComponentKind::Mesh
        );
    }

    #[test]
    fn update_starts_once_and_ticks() {
        let mut component = Component::from(Light::point(Vec3::ONE, 2.0));
        assert!(!component.has_started());
        component.update();
        component.update();
        assert!(component.has_started());
        assert_eq!(component.ticks(), 2);
    }

    #[test]
    fn new_component_has_no_owner() {
        assert!(Component::from(Light::default()).owner().is_none());
    }
}
