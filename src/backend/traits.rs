//! Core backend abstraction traits
//!
//! These types define the contract between the renderer and a GPU binding.
//! The renderer never names a concrete API; everything it needs from the
//! device is expressed here.

use crate::backend::types::*;
use thiserror::Error;

/// Backend error type
#[derive(Error, Debug)]
pub enum BackendError {
    /// The host lacks the required GPU capability (no suitable adapter).
    /// Fatal: there is nothing to retry.
    #[error("GPU capability unsupported: {0}")]
    CapabilityUnsupported(String),
    #[error("failed to initialize backend: {0}")]
    InitializationFailed(String),
    #[error("failed to create surface: {0}")]
    SurfaceCreationFailed(String),
    #[error("failed to create device: {0}")]
    DeviceCreationFailed(String),
    #[error("shader compilation failed: {0}")]
    ShaderCompileFailed(String),
    #[error("failed to create pipeline: {0}")]
    PipelineCreationFailed(String),
    /// A uniform binding was given a buffer smaller than the layout's
    /// declared minimum. Rejected at bind-group creation, never at draw time.
    #[error("uniform buffer too small for binding {binding}: need {required} bytes, got {actual}")]
    UniformBufferTooSmall {
        binding: u32,
        required: u64,
        actual: u64,
    },
    #[error("resource not found: {0}")]
    ResourceNotFound(String),
    #[error("failed to acquire next image: {0}")]
    AcquireImageFailed(String),
    #[error("failed to present: {0}")]
    PresentFailed(String),
    #[error("surface lost")]
    SurfaceLost,
    #[error("out of memory")]
    OutOfMemory,
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Handle to a GPU buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub(crate) u64);

/// Handle to a GPU texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub(crate) u64);

/// Handle to a texture view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureViewHandle(pub(crate) u64);

/// Handle to a render pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderPipelineHandle(pub(crate) u64);

/// Handle to a bind group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindGroupHandle(pub(crate) u64);

/// Handle to a bind group layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindGroupLayoutHandle(pub(crate) u64);

/// A buffer bound into a bind group slot
#[derive(Debug, Clone, Copy)]
pub struct BufferBinding {
    pub buffer: BufferHandle,
    pub offset: u64,
    /// Bound size; `None` binds the rest of the buffer
    pub size: Option<u64>,
}

/// Bind group layout entry. This engine only binds uniform buffers, so the
/// binding type is implied; `min_binding_size` carries the layout contract
/// that under-sized buffers must violate loudly.
#[derive(Debug, Clone, Copy)]
pub struct BindGroupLayoutEntry {
    pub binding: u32,
    pub visibility: ShaderStageFlags,
    pub min_binding_size: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderStageFlags(u32);

impl ShaderStageFlags {
    pub const VERTEX: Self = Self(1 << 0);
    pub const FRAGMENT: Self = Self(1 << 1);
    pub const VERTEX_FRAGMENT: Self = Self((1 << 0) | (1 << 1));

    pub fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

impl std::ops::BitOr for ShaderStageFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// Render pipeline descriptor
#[derive(Debug, Clone)]
pub struct RenderPipelineDescriptor {
    pub label: Option<String>,
    /// WGSL source holding both `vs_main` and `fs_main`
    pub shader_source: String,
    pub vertex_layouts: Vec<VertexBufferLayout>,
    pub bind_group_layouts: Vec<BindGroupLayoutHandle>,
    pub primitive_topology: PrimitiveTopology,
    pub front_face: FrontFace,
    pub cull_mode: CullMode,
    pub depth_stencil: Option<DepthStencilState>,
    pub color_format: TextureFormat,
}

#[derive(Debug, Clone)]
pub struct DepthStencilState {
    pub format: TextureFormat,
    pub depth_write_enabled: bool,
    pub depth_compare: CompareFunction,
}

/// Color attachment for render pass
#[derive(Debug, Clone)]
pub struct ColorAttachment {
    pub view: TextureViewHandle,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
}

#[derive(Debug, Clone)]
pub enum LoadOp {
    Clear([f32; 4]),
    Load,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Store,
    Discard,
}

/// Depth/stencil attachment for render pass
#[derive(Debug, Clone)]
pub struct DepthStencilAttachment {
    pub view: TextureViewHandle,
    pub depth_load_op: LoadOp,
    pub depth_store_op: StoreOp,
    pub depth_clear_value: f32,
    /// Stencil clear value, applied when the attachment format carries stencil
    pub stencil_clear_value: u32,
}

/// Render pass descriptor
#[derive(Debug, Clone)]
pub struct RenderPassDescriptor {
    pub label: Option<String>,
    pub color_attachments: Vec<ColorAttachment>,
    pub depth_stencil_attachment: Option<DepthStencilAttachment>,
}

/// Frame context returned when beginning a frame
pub struct FrameContext {
    pub swapchain_view: TextureViewHandle,
    pub width: u32,
    pub height: u32,
}

/// Index format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFormat {
    Uint16,
    Uint32,
}

/// Main graphics backend trait
///
/// Construction is backend-specific (device acquisition may suspend), so it
/// lives on the concrete types rather than on the trait.
pub trait GraphicsBackend {
    /// Resize the swapchain
    fn resize(&mut self, width: u32, height: u32);

    /// Get the current surface size
    fn surface_size(&self) -> (u32, u32);

    /// Get the swapchain format
    fn swapchain_format(&self) -> TextureFormat;

    /// Begin a new frame, acquiring the swapchain image
    fn begin_frame(&mut self) -> BackendResult<FrameContext>;

    /// End and present the frame
    fn end_frame(&mut self) -> BackendResult<()>;

    // Resource creation

    /// Create an empty buffer
    fn create_buffer(&mut self, desc: &BufferDescriptor) -> BackendResult<BufferHandle>;

    /// Create a buffer with initial data
    fn create_buffer_init(
        &mut self,
        desc: &BufferDescriptor,
        data: &[u8],
    ) -> BackendResult<BufferHandle>;

    /// Write data to a buffer via the device queue
    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]);

    /// Create a texture
    fn create_texture(&mut self, desc: &TextureDescriptor) -> BackendResult<TextureHandle>;

    /// Create a view over a texture
    fn create_texture_view(&mut self, texture: TextureHandle) -> BackendResult<TextureViewHandle>;

    /// Create a bind group layout
    fn create_bind_group_layout(
        &mut self,
        entries: &[BindGroupLayoutEntry],
    ) -> BackendResult<BindGroupLayoutHandle>;

    /// Create a bind group. Fails with [`BackendError::UniformBufferTooSmall`]
    /// if a bound buffer does not satisfy the layout's minimum binding size.
    fn create_bind_group(
        &mut self,
        layout: BindGroupLayoutHandle,
        entries: &[(u32, BufferBinding)],
    ) -> BackendResult<BindGroupHandle>;

    /// Create a render pipeline
    fn create_render_pipeline(
        &mut self,
        desc: &RenderPipelineDescriptor,
    ) -> BackendResult<RenderPipelineHandle>;

    // Command recording

    /// Begin a render pass
    fn begin_render_pass(&mut self, desc: &RenderPassDescriptor);

    /// End the current render pass
    fn end_render_pass(&mut self);

    /// Set the render pipeline
    fn set_render_pipeline(&mut self, pipeline: RenderPipelineHandle);

    /// Set a bind group
    fn set_bind_group(&mut self, index: u32, bind_group: BindGroupHandle);

    /// Set a vertex buffer
    fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferHandle, offset: u64);

    /// Set the index buffer
    fn set_index_buffer(&mut self, buffer: BufferHandle, offset: u64, format: IndexFormat);

    /// Set the viewport
    fn set_viewport(&mut self, x: f32, y: f32, width: f32, height: f32);

    /// Draw indexed primitives
    fn draw_indexed(
        &mut self,
        indices: std::ops::Range<u32>,
        base_vertex: i32,
        instances: std::ops::Range<u32>,
    );

    // Resource cleanup

    /// Destroy a buffer
    fn destroy_buffer(&mut self, buffer: BufferHandle);

    /// Destroy a texture
    fn destroy_texture(&mut self, texture: TextureHandle);
}

/// Check every bound buffer against the layout's minimum binding size.
/// Shared by all backends so the configuration error surfaces identically
/// regardless of the binding in use.
pub(crate) fn validate_binding_sizes(
    layout_entries: &[BindGroupLayoutEntry],
    entries: &[(u32, BufferBinding)],
    buffer_size: impl Fn(BufferHandle) -> Option<u64>,
) -> BackendResult<()> {
    for (binding, bound) in entries {
        let Some(layout) = layout_entries.iter().find(|e| e.binding == *binding) else {
            continue;
        };
        let Some(required) = layout.min_binding_size else {
            continue;
        };
        let total = buffer_size(bound.buffer).ok_or_else(|| {
            BackendError::ResourceNotFound(format!("buffer for binding {binding}"))
        })?;
        let actual = bound
            .size
            .unwrap_or_else(|| total.saturating_sub(bound.offset));
        if actual < required {
            return Err(BackendError::UniformBufferTooSmall {
                binding: *binding,
                required,
                actual,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout_64(binding: u32) -> BindGroupLayoutEntry {
        BindGroupLayoutEntry {
            binding,
            visibility: ShaderStageFlags::VERTEX,
            min_binding_size: Some(64),
        }
    }

    #[test]
    fn undersized_binding_is_rejected() {
        let layout = [layout_64(0)];
        let entries = [(
            0u32,
            BufferBinding {
                buffer: BufferHandle(1),
                offset: 0,
                size: None,
            },
        )];
        let err = validate_binding_sizes(&layout, &entries, |_| Some(32)).unwrap_err();
        assert!(matches!(
            err,
            BackendError::UniformBufferTooSmall {
                binding: 0,
                required: 64,
                actual: 32,
            }
        ));
    }

    #[test]
    fn exact_binding_size_passes() {
        let layout = [layout_64(1)];
        let entries = [(
            1u32,
            BufferBinding {
                buffer: BufferHandle(7),
                offset: 0,
                size: Some(64),
            },
        )];
        assert!(validate_binding_sizes(&layout, &entries, |_| Some(64)).is_ok());
    }

    #[test]
    fn offset_shrinks_the_bound_range() {
        let layout = [layout_64(0)];
        let entries = [(
            0u32,
            BufferBinding {
                buffer: BufferHandle(1),
                offset: 16,
                size: None,
            },
        )];
        let err = validate_binding_sizes(&layout, &entries, |_| Some(64)).unwrap_err();
        assert!(matches!(
            err,
            BackendError::UniformBufferTooSmall { actual: 48, .. }
        ));
    }
}
