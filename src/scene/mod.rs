//! Scene management
//!
//! A [`Scene`] is an insertion-ordered collection of [`Entity`] values; the
//! order is draw order. The scene drives the per-frame update pass and is
//! consulted by the renderer to decide what gets drawn.

mod camera;
mod camera_controller;
mod component;
mod entity;
mod light;
mod transform;

pub use camera::*;
pub use camera_controller::*;
pub use component::*;
pub use entity::*;
pub use light::*;
pub use transform::*;

/// The scene containing all entities
#[derive(Debug, Default)]
pub struct Scene {
    entities: Vec<Entity>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
        }
    }

    /// Append an entity, returning its index. O(1) amortized; insertion
    /// order is significant and only changes through this call.
    pub fn add_object(&mut self, entity: Entity) -> usize {
        let index = self.entities.len();
        self.entities.push(entity);
        index
    }

    /// Update every enabled entity exactly once, in insertion order.
    ///
    /// The traversal bound is captured up front, so membership observed by
    /// this call is a snapshot: anything appended afterwards is first
    /// visited by the next call.
    pub fn update(&mut self) {
        let count = self.entities.len();
        for entity in &mut self.entities[..count] {
            if entity.enabled {
                entity.update();
            }
        }
    }

    /// Read-only view of current membership, in insertion order
    pub fn objects(&self) -> &[Entity] {
        &self.entities
    }

    /// Mutable access by index
    pub fn object_mut(&mut self, index: usize) -> Option<&mut Entity> {
        self.entities.get_mut(index)
    }

    /// Look up an entity by id
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id() == id)
    }

    /// Look up an entity by name
    pub fn find(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name() == name)
    }

    /// Look up an entity by name, mutably
    pub fn find_mut(&mut self, name: &str) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.name() == name)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity_with_light(name: &str) -> Entity {
        let mut entity = Entity::new(name);
        entity.add_component(Component::from(Light::default()));
        entity
    }

    #[test]
    fn update_visits_every_enabled_entity_exactly_once() {
        let mut scene = Scene::new();
        scene.add_object(entity_with_light("a"));
        scene.add_object(entity_with_light("b"));
        scene.update();

        for entity in scene.objects() {
            let light = entity.component(ComponentKind::Light).unwrap();
            assert_eq!(light.ticks(), 1, "{} updated once", entity.name());
        }
    }

    #[test]
    fn disabled_entity_receives_no_updates() {
        let mut scene = Scene::new();
        let mut sleeper = entity_with_light("sleeper");
        sleeper.enabled = false;
        scene.add_object(sleeper);
        scene.add_object(entity_with_light("awake"));

        scene.update();
        scene.update();

        let sleeper = scene.find("sleeper").unwrap();
        assert_eq!(sleeper.component(ComponentKind::Light).unwrap().ticks(), 0);
        let awake = scene.find("awake").unwrap();
        assert_eq!(awake.component(ComponentKind::Light).unwrap().ticks(), 2);
    }

    #[test]
    fn objects_preserve_insertion_order() {
        let mut scene = Scene::new();
        scene.add_object(Entity::new("first"));
        scene.add_object(Entity::new("second"));
        scene.add_object(Entity::new("third"));

        let names: Vec<&str> = scene.objects().iter().map(|e| e.name()).collect();
        assert_eq!(names, ["first", "second", "third"]);
    }

    #[test]
    fn find_locates_entities_by_name() {
        let mut scene = Scene::new();
        scene.add_object(Entity::new("camera"));
        assert!(scene.find("camera").is_some());
        assert!(scene.find("missing").is_none());
    }
}
