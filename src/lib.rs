//! Ember Engine: a minimal real-time 3D rendering engine core
//!
//! An entity/component scene graph is traversed once per frame and turned
//! into GPU draw commands through `wgpu`, with an orbit-style camera
//! controller translating pointer input into the view transform.
//!
//! # Pieces
//! - [`scene`]: entities, the closed component set (camera, light,
//!   material, mesh), and the orbit controller
//! - [`renderer`]: GPU lifecycle state machine, pipeline management, and
//!   the frame composer that marshals uniforms byte-exactly
//! - [`backend`]: the GPU contract, its wgpu implementation, and a
//!   headless recording backend for tests
//! - [`engine`] / [`window`]: the explicit context object and winit glue

pub mod backend;
pub mod engine;
pub mod renderer;
pub mod resources;
pub mod scene;
pub mod window;

pub use backend::wgpu_backend::WgpuBackend;
pub use engine::Engine;
pub use renderer::{FrameComposer, Renderer, RendererError, RendererState};
pub use resources::{Material, Mesh};
pub use scene::{
    Camera, Component, ComponentData, ComponentKind, Entity, EntityId, Light, LightKind,
    OrbitController, Scene, Transform,
};
pub use window::run_app;

/// Configuration for constructing an [`Engine`]
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Window title
    pub title: String,
    /// Initial window width
    pub width: u32,
    /// Initial window height
    pub height: u32,
    /// Enable vsync
    pub vsync: bool,
    /// Render pass clear color
    pub clear_color: [f32; 4],
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: "Ember Engine".to_string(),
            width: 1280,
            height: 720,
            vsync: true,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}
