//! Renderer
//!
//! Owns the GPU backend and every GPU resource, and turns a [`Scene`] into
//! one submitted render pass per frame. The lifecycle is an explicit state
//! machine:
//!
//! ```text
//! Uninitialized -> Initializing -> Ready <-> Rendering
//!                        |                     |
//!                        v                     v
//!                      Failed               Stopped
//! ```
//!
//! Adapter/device acquisition failure is fatal to the instance; the caller
//! must re-invoke `init`. Frame-level errors (lost surface, out of memory)
//! bounce back to `Ready` and surface to the caller.

pub mod frame;

pub use self::frame::{
    FrameComposer, LightParams, PointLightUniform, TransformUniform, UniformFrame,
};

use std::collections::HashMap;
use std::sync::Arc;

use glam::{Mat4, Vec3};
use thiserror::Error;

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::backend::wgpu_backend::WgpuBackend;
use crate::scene::{ComponentKind, EntityId, Scene};
use self::frame::UNIFORM_BINDING_SIZE;

// Forward shader: one MVP matrix, one point light, Phong shading.
const SHADER: &str = r#"
struct PointLight {
    position: vec3<f32>,
    color: vec3<f32>,
    intensity: f32,
    view_pos: vec3<f32>,
}

@group(0) @binding(0) var<uniform> mvp: mat4x4<f32>;
@group(0) @binding(1) var<uniform> light: PointLight;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) frag_pos: vec3<f32>,
    @location(1) normal: vec3<f32>,
}

@vertex
fn vs_main(@location(0) position: vec3<f32>, @location(1) normal: vec3<f32>) -> VertexOutput {
    var out: VertexOutput;
    let clip = mvp * vec4<f32>(position, 1.0);
    out.position = clip;
    out.frag_pos = clip.xyz;
    out.normal = normal;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let n = normalize(in.normal);
    let light_dir = normalize(light.position - in.frag_pos);
    let diff = max(dot(n, light_dir), 0.0);

    let view_dir = normalize(light.view_pos - in.frag_pos);
    let reflect_dir = reflect(-light_dir, n);
    let spec = pow(max(dot(view_dir, reflect_dir), 0.0), 32.0);

    let ambient = light.color * 0.1;
    let color = (ambient + light.color * diff + light.color * spec) * light.intensity;
    return vec4<f32>(color, 1.0);
}
"#;

/// Renderer lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererState {
    Uninitialized,
    Initializing,
    Ready,
    Rendering,
    Failed,
    Stopped,
}

/// Renderer error type
#[derive(Error, Debug)]
pub enum RendererError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("renderer is not ready to draw (state: {0:?})")]
    NotReady(RendererState),
    #[error("init is only valid from Uninitialized or Failed (state: {0:?})")]
    InvalidState(RendererState),
    #[error("no pipeline has been created")]
    MissingPipeline,
}

/// GPU-resident mesh buffers for one entity
struct GpuMesh {
    vertex_buffer: BufferHandle,
    index_buffer: BufferHandle,
    index_count: u32,
}

/// Per-entity uniform buffer and bind group (matrix slot is per entity,
/// the light slot aliases the shared light buffer)
struct EntityBinding {
    matrix_buffer: BufferHandle,
    bind_group: BindGroupHandle,
}

/// Everything created by `create_pipeline`, reused every frame
struct PipelineResources {
    pipeline: RenderPipelineHandle,
    uniform_layout: BindGroupLayoutHandle,
    light_buffer: BufferHandle,
    depth_texture: TextureHandle,
    depth_view: TextureViewHandle,
    depth_size: (u32, u32),
    meshes: HashMap<EntityId, GpuMesh>,
    bindings: HashMap<EntityId, EntityBinding>,
}

/// One queued draw for the current frame
struct DrawItem {
    bind_group: BindGroupHandle,
    vertex_buffer: BufferHandle,
    index_buffer: BufferHandle,
    index_count: u32,
}

/// The renderer. Generic over the backend so frame encoding runs unchanged
/// against real hardware or the headless recording backend.
pub struct Renderer<B: GraphicsBackend> {
    state: RendererState,
    backend: Option<B>,
    resources: Option<PipelineResources>,
    clear_color: [f32; 4],
}

impl<B: GraphicsBackend> Default for Renderer<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: GraphicsBackend> Renderer<B> {
    pub fn new() -> Self {
        Self {
            state: RendererState::Uninitialized,
            backend: None,
            resources: None,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }

    pub fn with_clear_color(mut self, clear_color: [f32; 4]) -> Self {
        self.clear_color = clear_color;
        self
    }

    pub fn state(&self) -> RendererState {
        self.state
    }

    pub fn backend(&self) -> Option<&B> {
        self.backend.as_ref()
    }

    pub fn backend_mut(&mut self) -> Option<&mut B> {
        self.backend.as_mut()
    }

    /// Acquire the backend through `acquire` and transition the state
    /// machine. Failure is terminal for this instance until `init` is
    /// invoked again.
    pub fn init_with(
        &mut self,
        acquire: impl FnOnce() -> BackendResult<B>,
    ) -> Result<(), RendererError> {
        match self.state {
            RendererState::Uninitialized | RendererState::Failed => {}
            state => return Err(RendererError::InvalidState(state)),
        }

        self.state = RendererState::Initializing;
        match acquire() {
            Ok(backend) => {
                self.backend = Some(backend);
                self.state = RendererState::Ready;
                Ok(())
            }
            Err(error) => {
                log::error!("renderer initialization failed: {error}");
                self.state = RendererState::Failed;
                Err(error.into())
            }
        }
    }

    /// Compile the shader pair and build the render pipeline, the uniform
    /// bind-group layout, the shared light buffer, and the depth target.
    ///
    /// Idempotent: calling it again tears down and replaces the stored
    /// pipeline and every resource hanging off it.
    pub fn create_pipeline(&mut self) -> Result<(), RendererError> {
        match self.state {
            RendererState::Ready => {}
            state => return Err(RendererError::NotReady(state)),
        }
        let Some(backend) = self.backend.as_mut() else {
            return Err(RendererError::NotReady(RendererState::Uninitialized));
        };

        if let Some(old) = self.resources.take() {
            Self::destroy_resources(backend, old);
        }

        let uniform_layout = backend.create_bind_group_layout(&[
            BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStageFlags::VERTEX,
                min_binding_size: Some(UNIFORM_BINDING_SIZE),
            },
            BindGroupLayoutEntry {
                binding: 1,
                visibility: ShaderStageFlags::FRAGMENT,
                min_binding_size: Some(UNIFORM_BINDING_SIZE),
            },
        ])?;

        let light_buffer = backend.create_buffer(&BufferDescriptor {
            label: Some("Light Buffer".into()),
            size: UNIFORM_BINDING_SIZE,
            usage: BufferUsage::UNIFORM | BufferUsage::COPY_DST,
        })?;

        let (width, height) = backend.surface_size();
        let (depth_texture, depth_view) = Self::create_depth_target(backend, width, height)?;

        let pipeline = backend.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("Scene Pipeline".into()),
            shader_source: SHADER.into(),
            vertex_layouts: vec![Vertex::layout()],
            bind_group_layouts: vec![uniform_layout],
            primitive_topology: PrimitiveTopology::TriangleList,
            front_face: FrontFace::Ccw,
            cull_mode: CullMode::None,
            depth_stencil: Some(DepthStencilState {
                format: TextureFormat::Depth24PlusStencil8,
                depth_write_enabled: true,
                depth_compare: CompareFunction::Less,
            }),
            color_format: backend.swapchain_format(),
        })?;

        self.resources = Some(PipelineResources {
            pipeline,
            uniform_layout,
            light_buffer,
            depth_texture,
            depth_view,
            depth_size: (width, height),
            meshes: HashMap::new(),
            bindings: HashMap::new(),
        });

        log::debug!("render pipeline created ({width}x{height})");
        Ok(())
    }

    /// Reconfigure the output surface. The pipeline is left untouched; the
    /// depth target follows the surface on the next frame.
    pub fn resize(&mut self, width: u32, height: u32) {
        if let Some(backend) = self.backend.as_mut() {
            backend.resize(width, height);
        }
    }

    /// Encode and submit one frame for `scene`.
    ///
    /// Scene entities decide what is drawn: every enabled entity whose mesh
    /// component is enabled costs exactly one indexed draw call, in scene
    /// order. The light payload comes from the first enabled light
    /// component, its position read from the owning entity's transform.
    pub fn render(
        &mut self,
        scene: &Scene,
        composer: &FrameComposer,
        view: Mat4,
        viewer: Vec3,
    ) -> Result<(), RendererError> {
        match self.state {
            RendererState::Ready => {}
            state => return Err(RendererError::NotReady(state)),
        }

        self.state = RendererState::Rendering;
        let result = self.encode_frame(scene, composer, view, viewer);
        self.state = RendererState::Ready;
        result
    }

    /// Stop the renderer. No further frames are submitted.
    pub fn stop(&mut self) {
        self.state = RendererState::Stopped;
    }

    fn encode_frame(
        &mut self,
        scene: &Scene,
        composer: &FrameComposer,
        view: Mat4,
        viewer: Vec3,
    ) -> Result<(), RendererError> {
        let clear_color = self.clear_color;
        let (backend, res) = match (self.backend.as_mut(), self.resources.as_mut()) {
            (Some(backend), Some(res)) => (backend, res),
            (None, _) => return Err(RendererError::NotReady(RendererState::Uninitialized)),
            (Some(_), None) => return Err(RendererError::MissingPipeline),
        };

        // Keep the depth target in lockstep with the surface
        let surface_size = backend.surface_size();
        if res.depth_size != surface_size {
            backend.destroy_texture(res.depth_texture);
            let (texture, view) =
                Self::create_depth_target(backend, surface_size.0, surface_size.1)?;
            res.depth_texture = texture;
            res.depth_view = view;
            res.depth_size = surface_size;
        }

        let light = Self::frame_light(scene);
        let frame = backend.begin_frame()?;

        backend.write_buffer(
            res.light_buffer,
            0,
            bytemuck::bytes_of(&composer.light(&light, viewer)),
        );

        // Gather draws, creating GPU residency for meshes on first sight
        let mut draws = Vec::new();
        for entity in scene.objects() {
            if !entity.enabled {
                continue;
            }
            let Some(mesh_component) = entity.component(ComponentKind::Mesh) else {
                continue;
            };
            if !mesh_component.enabled {
                continue;
            }
            let Some(mesh) = mesh_component.as_mesh() else {
                continue;
            };

            let id = entity.id();
            if !res.meshes.contains_key(&id) {
                let vertex_buffer = backend.create_buffer_init(
                    &BufferDescriptor {
                        label: Some(format!("Vertex Buffer {id}")),
                        size: mesh.vertex_bytes().len() as u64,
                        usage: BufferUsage::VERTEX,
                    },
                    mesh.vertex_bytes(),
                )?;
                let index_buffer = backend.create_buffer_init(
                    &BufferDescriptor {
                        label: Some(format!("Index Buffer {id}")),
                        size: mesh.index_bytes().len() as u64,
                        usage: BufferUsage::INDEX,
                    },
                    mesh.index_bytes(),
                )?;
                res.meshes.insert(
                    id,
                    GpuMesh {
                        vertex_buffer,
                        index_buffer,
                        index_count: mesh.index_count() as u32,
                    },
                );
            }

            if !res.bindings.contains_key(&id) {
                let matrix_buffer = backend.create_buffer(&BufferDescriptor {
                    label: Some(format!("Matrix Buffer {id}")),
                    size: UNIFORM_BINDING_SIZE,
                    usage: BufferUsage::UNIFORM | BufferUsage::COPY_DST,
                })?;
                let bind_group = backend.create_bind_group(
                    res.uniform_layout,
                    &[
                        (
                            0,
                            BufferBinding {
                                buffer: matrix_buffer,
                                offset: 0,
                                size: None,
                            },
                        ),
                        (
                            1,
                            BufferBinding {
                                buffer: res.light_buffer,
                                offset: 0,
                                size: None,
                            },
                        ),
                    ],
                )?;
                res.bindings.insert(
                    id,
                    EntityBinding {
                        matrix_buffer,
                        bind_group,
                    },
                );
            }

            let (Some(gpu_mesh), Some(binding)) = (res.meshes.get(&id), res.bindings.get(&id))
            else {
                continue;
            };

            let mvp = composer.model_view_projection(view, entity.transform.matrix());
            backend.write_buffer(binding.matrix_buffer, 0, bytemuck::bytes_of(&mvp));

            draws.push(DrawItem {
                bind_group: binding.bind_group,
                vertex_buffer: gpu_mesh.vertex_buffer,
                index_buffer: gpu_mesh.index_buffer,
                index_count: gpu_mesh.index_count,
            });
        }

        backend.begin_render_pass(&RenderPassDescriptor {
            label: Some("Scene Pass".into()),
            color_attachments: vec![ColorAttachment {
                view: frame.swapchain_view,
                load_op: LoadOp::Clear(clear_color),
                store_op: StoreOp::Store,
            }],
            depth_stencil_attachment: Some(DepthStencilAttachment {
                view: res.depth_view,
                depth_load_op: LoadOp::Clear([1.0, 0.0, 0.0, 0.0]),
                depth_store_op: StoreOp::Store,
                depth_clear_value: 1.0,
                stencil_clear_value: 0,
            }),
        });

        backend.set_viewport(0.0, 0.0, frame.width as f32, frame.height as f32);
        backend.set_render_pipeline(res.pipeline);

        for draw in &draws {
            backend.set_bind_group(0, draw.bind_group);
            backend.set_vertex_buffer(0, draw.vertex_buffer, 0);
            backend.set_index_buffer(draw.index_buffer, 0, IndexFormat::Uint16);
            backend.draw_indexed(0..draw.index_count, 0, 0..1);
        }

        backend.end_render_pass();
        backend.end_frame()?;

        Ok(())
    }

    /// Light parameters for this frame: the first enabled light component,
    /// positioned at its owner's transform (resolved through the owner
    /// back-reference). Absent any light, a neutral default.
    fn frame_light(scene: &Scene) -> LightParams {
        scene
            .objects()
            .iter()
            .filter(|entity| entity.enabled)
            .filter_map(|entity| entity.component(ComponentKind::Light))
            .filter(|component| component.enabled)
            .find_map(|component| {
                let owner = scene.entity(component.owner()?)?;
                let light = component.as_light()?;
                Some(LightParams {
                    position: owner.transform.position,
                    color: light.color,
                    intensity: light.intensity,
                })
            })
            .unwrap_or_default()
    }

    fn create_depth_target(
        backend: &mut B,
        width: u32,
        height: u32,
    ) -> Result<(TextureHandle, TextureViewHandle), RendererError> {
        let texture = backend.create_texture(&TextureDescriptor {
            label: Some("Depth Buffer".into()),
            width,
            height,
            format: TextureFormat::Depth24PlusStencil8,
            usage: TextureUsage::RENDER_ATTACHMENT,
        })?;
        let view = backend.create_texture_view(texture)?;
        Ok((texture, view))
    }

    fn destroy_resources(backend: &mut B, res: PipelineResources) {
        backend.destroy_buffer(res.light_buffer);
        backend.destroy_texture(res.depth_texture);
        for mesh in res.meshes.values() {
            backend.destroy_buffer(mesh.vertex_buffer);
            backend.destroy_buffer(mesh.index_buffer);
        }
        for binding in res.bindings.values() {
            backend.destroy_buffer(binding.matrix_buffer);
        }
    }
}

impl Renderer<WgpuBackend> {
    /// Initialize against a window, blocking on device acquisition
    pub fn init(
        &mut self,
        window: Arc<winit::window::Window>,
        vsync: bool,
    ) -> Result<(), RendererError> {
        self.init_with(|| WgpuBackend::new(window, vsync))
    }

    /// Async initialization for hosts that cannot block
    pub async fn init_async(
        &mut self,
        window: Arc<winit::window::Window>,
        vsync: bool,
    ) -> Result<(), RendererError> {
        match self.state {
            RendererState::Uninitialized | RendererState::Failed => {}
            state => return Err(RendererError::InvalidState(state)),
        }

        self.state = RendererState::Initializing;
        match WgpuBackend::new_async(window, vsync).await {
            Ok(backend) => {
                self.backend = Some(backend);
                self.state = RendererState::Ready;
                Ok(())
            }
            Err(error) => {
                log::error!("renderer initialization failed: {error}");
                self.state = RendererState::Failed;
                Err(error.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::dummy::DummyBackend;
    use crate::resources::Mesh;
    use crate::scene::{Component, Entity, Light};

    fn ready_renderer() -> Renderer<DummyBackend> {
        let mut renderer = Renderer::new();
        renderer
            .init_with(|| Ok(DummyBackend::new(320, 240)))
            .unwrap();
        renderer
    }

    #[test]
    fn starts_uninitialized_and_refuses_to_render() {
        let mut renderer: Renderer<DummyBackend> = Renderer::new();
        assert_eq!(renderer.state(), RendererState::Uninitialized);

        let composer = FrameComposer::from_projection(Mat4::IDENTITY);
        let err = renderer
            .render(&Scene::new(), &composer, Mat4::IDENTITY, Vec3::ZERO)
            .unwrap_err();
        assert!(matches!(
            err,
            RendererError::NotReady(RendererState::Uninitialized)
        ));
    }

    #[test]
    fn failed_acquisition_transitions_to_failed() {
        let mut renderer: Renderer<DummyBackend> = Renderer::new();
        let err = renderer
            .init_with(|| {
                Err(BackendError::CapabilityUnsupported(
                    "no suitable GPU adapter found".into(),
                ))
            })
            .unwrap_err();

        assert!(matches!(
            err,
            RendererError::Backend(BackendError::CapabilityUnsupported(_))
        ));
        assert_eq!(renderer.state(), RendererState::Failed);

        // Failed is terminal for rendering but allows another init attempt
        let composer = FrameComposer::from_projection(Mat4::IDENTITY);
        assert!(renderer
            .render(&Scene::new(), &composer, Mat4::IDENTITY, Vec3::ZERO)
            .is_err());
        assert!(renderer.init_with(|| Ok(DummyBackend::new(8, 8))).is_ok());
        assert_eq!(renderer.state(), RendererState::Ready);
    }

    #[test]
    fn double_init_is_rejected() {
        let mut renderer = ready_renderer();
        let err = renderer
            .init_with(|| Ok(DummyBackend::new(8, 8)))
            .unwrap_err();
        assert!(matches!(
            err,
            RendererError::InvalidState(RendererState::Ready)
        ));
    }

    #[test]
    fn render_without_pipeline_is_an_error() {
        let mut renderer = ready_renderer();
        let composer = FrameComposer::from_projection(Mat4::IDENTITY);
        let err = renderer
            .render(&Scene::new(), &composer, Mat4::IDENTITY, Vec3::ZERO)
            .unwrap_err();
        assert!(matches!(err, RendererError::MissingPipeline));
    }

    #[test]
    fn create_pipeline_twice_replaces_the_pipeline() {
        let mut renderer = ready_renderer();
        renderer.create_pipeline().unwrap();
        renderer.create_pipeline().unwrap();
        // The dummy keeps both pipeline objects; the renderer binds the newest
        assert_eq!(renderer.backend().unwrap().pipeline_count(), 2);
    }

    #[test]
    fn one_draw_call_per_visible_mesh() {
        let mut renderer = ready_renderer();
        renderer.create_pipeline().unwrap();

        let mut scene = Scene::new();
        scene.add_object(Entity::new("a").with_component(Component::from(Mesh::tetrahedron())));
        scene.add_object(Entity::new("b").with_component(Component::from(Mesh::cube())));
        let mut hidden = Entity::new("hidden").with_component(Component::from(Mesh::cube()));
        hidden.enabled = false;
        scene.add_object(hidden);
        scene.add_object(Entity::new("no-mesh"));
        scene.add_object(
            Entity::new("light").with_component(Component::from(Light::default())),
        );

        let composer = FrameComposer::from_projection(Mat4::IDENTITY);
        renderer
            .render(&scene, &composer, Mat4::IDENTITY, Vec3::ZERO)
            .unwrap();

        let backend = renderer.backend().unwrap();
        let draws = backend.draw_calls();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].indices, 0..12, "tetrahedron drawn first");
        assert_eq!(draws[1].indices, 0..36, "cube drawn second");
        assert!(draws.iter().all(|d| d.instances == (0..1)));
        assert_eq!(backend.frames_presented(), 1);
        assert_eq!(renderer.state(), RendererState::Ready);
    }

    #[test]
    fn stop_halts_frame_submission() {
        let mut renderer = ready_renderer();
        renderer.create_pipeline().unwrap();
        renderer.stop();
        assert_eq!(renderer.state(), RendererState::Stopped);

        let composer = FrameComposer::from_projection(Mat4::IDENTITY);
        let err = renderer
            .render(&Scene::new(), &composer, Mat4::IDENTITY, Vec3::ZERO)
            .unwrap_err();
        assert!(matches!(
            err,
            RendererError::NotReady(RendererState::Stopped)
        ));
        assert_eq!(renderer.backend().unwrap().frames_presented(), 0);
    }
}
