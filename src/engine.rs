//! Engine context
//!
//! The explicit context object tying the pieces together: a scene, the
//! orbit controller, the frame composer, and the renderer. The host feeds
//! it window events and drives one [`Engine::frame`] per display refresh;
//! there is no global state.

use std::sync::Arc;

use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::window::Window as WinitWindow;

use crate::backend::GraphicsBackend;
use crate::renderer::{FrameComposer, Renderer, RendererError};
use crate::scene::{Camera, ComponentKind, OrbitController, Scene};
use crate::EngineConfig;

/// Pixels represented by one wheel "line"; browsers and most desktops
/// report roughly this much per notch.
const WHEEL_LINE_TO_PIXELS: f32 = 100.0;

/// The engine: update -> compose -> render, once per host refresh callback
pub struct Engine {
    renderer: Renderer<crate::WgpuBackend>,
    scene: Scene,
    controller: OrbitController,
    composer: FrameComposer,
    cursor: (f32, f32),
    running: bool,
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let aspect = config.width.max(1) as f32 / config.height.max(1) as f32;
        Self {
            renderer: Renderer::new().with_clear_color(config.clear_color),
            scene: Scene::new(),
            controller: OrbitController::default(),
            composer: FrameComposer::new(&Camera::default(), aspect),
            cursor: (0.0, 0.0),
            running: false,
            config,
        }
    }

    /// Acquire the GPU and build the pipeline. Must run after the scene's
    /// camera entity exists, so the projection picks up its parameters.
    pub fn init(&mut self, window: Arc<WinitWindow>) -> Result<(), RendererError> {
        self.renderer.init(window, self.config.vsync)?;
        self.renderer.create_pipeline()?;

        let (width, height) = self
            .renderer
            .backend()
            .map(|b| b.surface_size())
            .unwrap_or((self.config.width, self.config.height));
        let camera = self.scene_camera();
        self.composer
            .set_projection(&camera, width as f32 / height.max(1) as f32);

        self.running = true;
        log::info!("engine initialized ({width}x{height})");
        Ok(())
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn controller(&self) -> &OrbitController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut OrbitController {
        &mut self.controller
    }

    pub fn renderer(&self) -> &Renderer<crate::WgpuBackend> {
        &self.renderer
    }

    /// Route a window event into the input port. Pointer and wheel events
    /// feed the orbit controller; resize reconfigures the surface.
    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = (position.x as f32, position.y as f32);
                self.controller.pointer_move(self.cursor.0, self.cursor.1);
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => match state {
                ElementState::Pressed => {
                    self.controller.pointer_down(self.cursor.0, self.cursor.1)
                }
                ElementState::Released => self.controller.pointer_up(),
            },
            WindowEvent::MouseWheel { delta, .. } => {
                // Positive delta dollies out, matching wheel-down convention
                let delta_y = match delta {
                    MouseScrollDelta::LineDelta(_, y) => -y * WHEEL_LINE_TO_PIXELS,
                    MouseScrollDelta::PixelDelta(position) => -position.y as f32,
                };
                self.controller.wheel(delta_y);
            }
            WindowEvent::Resized(size) => self.resize(size.width, size.height),
            WindowEvent::CloseRequested => self.stop(),
            _ => {}
        }
    }

    /// Handle a surface resize: the pipeline survives, the projection refits
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.renderer.resize(width, height);
        let (width, height) = self
            .renderer
            .backend()
            .map(|b| b.surface_size())
            .unwrap_or((width, height));
        let camera = self.scene_camera();
        self.composer
            .set_projection(&camera, width as f32 / height.max(1) as f32);
    }

    /// Run one frame: update the scene, then encode and submit it
    pub fn frame(&mut self) -> Result<(), RendererError> {
        if !self.running {
            return Ok(());
        }
        self.scene.update();
        self.renderer.render(
            &self.scene,
            &self.composer,
            self.controller.view_matrix(),
            self.controller.position(),
        )
    }

    /// Stop the loop; no further frames are submitted
    pub fn stop(&mut self) {
        self.running = false;
        self.renderer.stop();
    }

    /// Camera parameters from the first enabled camera component, or the
    /// default perspective when the scene has none
    fn scene_camera(&self) -> Camera {
        self.scene
            .objects()
            .iter()
            .filter(|entity| entity.enabled)
            .filter_map(|entity| entity.component(ComponentKind::Camera))
            .filter(|component| component.enabled)
            .find_map(|component| component.as_camera().copied())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_is_a_noop_until_initialized() {
        let mut engine = Engine::new(EngineConfig::default());
        assert!(!engine.running());
        assert!(engine.frame().is_ok());
    }

    #[test]
    fn stop_marks_the_engine_not_running() {
        let mut engine = Engine::new(EngineConfig::default());
        engine.stop();
        assert!(!engine.running());
        assert!(engine.frame().is_ok());
    }
}
