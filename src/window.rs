//! Windowing glue
//!
//! Thin winit wrapper that owns the event loop: window events are routed
//! into the engine's input port, and the next frame is scheduled by asking
//! for a redraw once the current one completes. Frame pacing follows the
//! host's refresh callback; nothing here blocks on GPU completion.

use std::sync::Arc;

use winit::{
    dpi::PhysicalSize,
    event::{ElementState, Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::WindowBuilder,
};

use crate::{Engine, EngineConfig};

/// Create the window, hand the engine to `setup` for scene building, then
/// initialize and run the frame loop until close or Escape.
pub fn run_app(config: EngineConfig, setup: impl FnOnce(&mut Engine)) {
    let event_loop = EventLoop::new().expect("Failed to create event loop");
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.title.as_str())
            .with_inner_size(PhysicalSize::new(config.width, config.height))
            .build(&event_loop)
            .expect("Failed to create window"),
    );

    let mut engine = Engine::new(config);
    setup(&mut engine);

    if let Err(error) = engine.init(Arc::clone(&window)) {
        log::error!("engine initialization failed: {error}");
        return;
    }

    event_loop
        .run(move |event, elwt| {
            elwt.set_control_flow(ControlFlow::Poll);

            match event {
                Event::WindowEvent { event, .. } => {
                    match &event {
                        WindowEvent::CloseRequested => {
                            elwt.exit();
                        }
                        WindowEvent::KeyboardInput { event: key, .. } => {
                            if key.state == ElementState::Pressed
                                && key.physical_key == PhysicalKey::Code(KeyCode::Escape)
                            {
                                engine.stop();
                                elwt.exit();
                            }
                        }
                        WindowEvent::RedrawRequested => {
                            if let Err(error) = engine.frame() {
                                log::error!("render error: {error}");
                            }
                        }
                        _ => {}
                    }
                    engine.handle_event(&event);
                }
                Event::AboutToWait => {
                    // Schedule the next iteration only after this one
                    window.request_redraw();
                }
                _ => {}
            }
        })
        .expect("Event loop failed");
}
