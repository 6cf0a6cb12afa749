//! End-to-end frame encoding against the headless backend
//!
//! Builds a small scene, drives the orbit controller through the input
//! protocol, and verifies what actually reaches the GPU: draw calls, the
//! uniform payload bytes, and the lifecycle transitions.

use ember_engine::backend::dummy::DummyBackend;
use ember_engine::renderer::frame::UNIFORM_BINDING_SIZE;
use ember_engine::{
    Camera, Component, Entity, FrameComposer, Light, Material, Mesh, OrbitController, Renderer,
    RendererState, Scene,
};
use ember_engine::renderer::LightParams;
use glam::{Vec3, Vec4};

fn demo_scene() -> Scene {
    let mut scene = Scene::new();

    scene.add_object(
        Entity::new("tetrahedron")
            .with_component(Component::from(Mesh::tetrahedron()))
            .with_component(Component::from(
                Material::new("flat").with_color(Vec4::ONE),
            )),
    );

    scene.add_object(
        Entity::new("floor")
            .with_position(Vec3::new(0.0, -1.0, 0.0))
            .with_component(Component::from(Mesh::plane(4.0, 4.0))),
    );

    scene.add_object(
        Entity::new("key-light")
            .with_position(Vec3::new(0.0, 1.0, 0.0))
            .with_component(Component::from(Light::point(Vec3::new(1.0, 0.9, 0.8), 2.0))),
    );

    scene.add_object(
        Entity::new("camera").with_component(Component::from(Camera::new(70.0, 0.1, 100.0))),
    );

    scene
}

fn ready_renderer() -> Renderer<DummyBackend> {
    let mut renderer = Renderer::new();
    renderer
        .init_with(|| Ok(DummyBackend::new(800, 800)))
        .expect("headless init");
    renderer.create_pipeline().expect("pipeline");
    renderer
}

#[test]
fn frame_reaches_the_gpu_with_exact_uniform_bytes() {
    let mut scene = demo_scene();
    let mut renderer = ready_renderer();

    let camera = Camera::new(70.0, 0.1, 100.0);
    let composer = FrameComposer::new(&camera, 1.0);
    let controller = OrbitController::default();

    scene.update();
    renderer
        .render(
            &scene,
            &composer,
            controller.view_matrix(),
            controller.position(),
        )
        .expect("frame");

    let backend = renderer.backend().expect("backend");

    // Two mesh entities, one indexed draw each, single instance
    assert_eq!(backend.draw_calls().len(), 2);
    assert_eq!(backend.draw_calls()[0].indices, 0..12);
    assert_eq!(backend.draw_calls()[1].indices, 0..6);
    assert_eq!(backend.frames_presented(), 1);

    // The light payload is byte-exact: light at the key-light's transform,
    // viewer at the orbit position (0, 0, 3)
    let params = LightParams {
        position: Vec3::new(0.0, 1.0, 0.0),
        color: Vec3::new(1.0, 0.9, 0.8),
        intensity: 2.0,
    };
    let expected_light = composer.light(&params, Vec3::new(0.0, 0.0, 3.0));
    let expected_bytes = bytemuck::bytes_of(&expected_light);
    assert!(
        backend.buffers().any(|(_, contents)| contents == expected_bytes),
        "light uniform bytes not found in any GPU buffer"
    );

    // Each entity's matrix buffer holds projection * view * model
    for name in ["tetrahedron", "floor"] {
        let entity = scene.find(name).expect(name);
        let expected_mvp = composer
            .model_view_projection(controller.view_matrix(), entity.transform.matrix());
        let expected_bytes = bytemuck::bytes_of(&expected_mvp);
        assert_eq!(expected_bytes.len() as u64, UNIFORM_BINDING_SIZE);
        assert!(
            backend.buffers().any(|(_, contents)| contents == expected_bytes),
            "matrix uniform for {name} not found"
        );
    }
}

#[test]
fn input_protocol_flows_into_the_next_frame() {
    let scene = demo_scene();
    let mut renderer = ready_renderer();
    let composer = FrameComposer::new(&Camera::default(), 1.0);
    let mut controller = OrbitController::default();

    renderer
        .render(&scene, &composer, controller.view_matrix(), controller.position())
        .expect("first frame");

    // Wheel out: distance 3 -> 4; the very next frame must see the new view
    controller.wheel(200.0);
    renderer
        .render(&scene, &composer, controller.view_matrix(), controller.position())
        .expect("second frame");

    let backend = renderer.backend().expect("backend");
    assert_eq!(backend.frames_presented(), 2);

    let light = LightParams {
        position: Vec3::new(0.0, 1.0, 0.0),
        color: Vec3::new(1.0, 0.9, 0.8),
        intensity: 2.0,
    };
    let expected_light = composer.light(&light, controller.position());
    assert!(
        backend
            .buffers()
            .any(|(_, contents)| contents == bytemuck::bytes_of(&expected_light)),
        "light uniform must carry the post-wheel viewer position"
    );
}

#[test]
fn disabling_a_mesh_component_suppresses_its_draw() {
    let mut scene = demo_scene();
    let mut renderer = ready_renderer();
    let composer = FrameComposer::new(&Camera::default(), 1.0);
    let controller = OrbitController::default();

    if let Some(floor) = scene.find_mut("floor") {
        floor
            .component_mut(ember_engine::ComponentKind::Mesh)
            .expect("mesh component")
            .enabled = false;
    }

    renderer
        .render(&scene, &composer, controller.view_matrix(), controller.position())
        .expect("frame");

    let backend = renderer.backend().expect("backend");
    assert_eq!(backend.draw_calls().len(), 1);
    assert_eq!(backend.draw_calls()[0].indices, 0..12, "only the tetrahedron");
}

#[test]
fn gpu_less_host_fails_and_never_reaches_ready() {
    use ember_engine::backend::BackendError;

    let mut renderer: Renderer<DummyBackend> = Renderer::new();
    let result = renderer.init_with(|| {
        Err(BackendError::CapabilityUnsupported(
            "WebGPU is not supported".into(),
        ))
    });

    assert!(result.is_err());
    assert_eq!(renderer.state(), RendererState::Failed);
    assert_ne!(renderer.state(), RendererState::Ready);

    let composer = FrameComposer::new(&Camera::default(), 1.0);
    let controller = OrbitController::default();
    assert!(renderer
        .render(
            &Scene::new(),
            &composer,
            controller.view_matrix(),
            controller.position()
        )
        .is_err());
}

#[test]
fn resize_recreates_the_depth_target_not_the_pipeline() {
    let scene = demo_scene();
    let mut renderer = ready_renderer();
    let composer = FrameComposer::new(&Camera::default(), 1.0);
    let controller = OrbitController::default();

    renderer
        .render(&scene, &composer, controller.view_matrix(), controller.position())
        .expect("frame before resize");

    renderer.resize(1024, 768);
    renderer
        .render(&scene, &composer, controller.view_matrix(), controller.position())
        .expect("frame after resize");

    let backend = renderer.backend().expect("backend");
    assert_eq!(backend.pipeline_count(), 1, "resize must not touch the pipeline");
    assert_eq!(backend.frames_presented(), 2);
}
