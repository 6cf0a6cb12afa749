//! Demo: a lit tetrahedron under an orbit camera
//!
//! Run with:
//!   cargo run --bin orbit_demo
//!
//! Controls:
//!   LMB drag - orbit around the origin
//!   Scroll   - dolly in/out
//!   Escape   - exit

use ember_engine::{
    run_app, Camera, Component, Engine, EngineConfig, Entity, Light, Material, Mesh,
};
use glam::{Vec3, Vec4};

fn setup_scene(engine: &mut Engine) {
    let scene = engine.scene_mut();

    scene.add_object(
        Entity::new("tetrahedron")
            .with_component(Component::from(Mesh::tetrahedron()))
            .with_component(Component::from(
                Material::new("flat-white").with_color(Vec4::ONE),
            )),
    );

    scene.add_object(
        Entity::new("key-light")
            .with_position(Vec3::new(0.0, 1.0, 0.0))
            .with_component(Component::from(Light::point(Vec3::ONE, 1.0))),
    );

    scene.add_object(
        Entity::new("camera").with_component(Component::from(Camera::new(70.0, 0.1, 100.0))),
    );
}

fn main() {
    env_logger::init();

    let config = EngineConfig {
        title: "Orbit Demo".to_string(),
        width: 800,
        height: 800,
        ..Default::default()
    };

    run_app(config, setup_scene);
}
