//! Headless GPU backend for tests and GPU-less hosts
//!
//! Performs no GPU work. Resources are bookkept in plain maps and every
//! recorded draw is kept for inspection, which lets the renderer's frame
//! encoding be verified without hardware.

use crate::backend::traits::{self, *};
use crate::backend::types::*;
use std::collections::HashMap;

/// A recorded `draw_indexed` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawIndexedCall {
    pub indices: std::ops::Range<u32>,
    pub base_vertex: i32,
    pub instances: std::ops::Range<u32>,
}

struct DummyBuffer {
    size: u64,
    contents: Vec<u8>,
}

/// Headless backend that records commands instead of executing them
pub struct DummyBackend {
    width: u32,
    height: u32,
    buffers: HashMap<u64, DummyBuffer>,
    textures: HashMap<u64, TextureDescriptor>,
    texture_views: HashMap<u64, TextureHandle>,
    layout_entries: HashMap<u64, Vec<BindGroupLayoutEntry>>,
    bind_groups: HashMap<u64, Vec<(u32, BufferBinding)>>,
    pipelines: HashMap<u64, Option<String>>,
    next_id: u64,
    in_frame: bool,
    in_pass: bool,
    frames_presented: u32,
    draw_calls: Vec<DrawIndexedCall>,
}

impl DummyBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            buffers: HashMap::new(),
            textures: HashMap::new(),
            texture_views: HashMap::new(),
            layout_entries: HashMap::new(),
            bind_groups: HashMap::new(),
            pipelines: HashMap::new(),
            next_id: 1,
            in_frame: false,
            in_pass: false,
            frames_presented: 0,
            draw_calls: Vec::new(),
        }
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Draws recorded since creation (or the last [`Self::clear_draw_calls`])
    pub fn draw_calls(&self) -> &[DrawIndexedCall] {
        &self.draw_calls
    }

    pub fn clear_draw_calls(&mut self) {
        self.draw_calls.clear();
    }

    /// Number of frames that reached presentation
    pub fn frames_presented(&self) -> u32 {
        self.frames_presented
    }

    /// Number of live render pipelines
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    /// Current contents of a buffer, as written via the queue
    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer.0).map(|b| b.contents.as_slice())
    }

    /// Iterate over all live buffers and their contents
    pub fn buffers(&self) -> impl Iterator<Item = (BufferHandle, &[u8])> {
        self.buffers
            .iter()
            .map(|(id, b)| (BufferHandle(*id), b.contents.as_slice()))
    }
}

impl GraphicsBackend for DummyBackend {
    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.width = width;
            self.height = height;
        }
    }

    fn surface_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn swapchain_format(&self) -> TextureFormat {
        TextureFormat::Bgra8UnormSrgb
    }

    fn begin_frame(&mut self) -> BackendResult<FrameContext> {
        log::trace!("DummyBackend: begin frame {}x{}", self.width, self.height);
        self.in_frame = true;
        let view = TextureViewHandle(self.next_id());
        Ok(FrameContext {
            swapchain_view: view,
            width: self.width,
            height: self.height,
        })
    }

    fn end_frame(&mut self) -> BackendResult<()> {
        if self.in_frame {
            self.in_frame = false;
            self.frames_presented += 1;
        }
        Ok(())
    }

    fn create_buffer(&mut self, desc: &BufferDescriptor) -> BackendResult<BufferHandle> {
        log::trace!(
            "DummyBackend: creating buffer {:?} (size: {})",
            desc.label,
            desc.size
        );
        let id = self.next_id();
        self.buffers.insert(
            id,
            DummyBuffer {
                size: desc.size,
                contents: vec![0; desc.size as usize],
            },
        );
        Ok(BufferHandle(id))
    }

    fn create_buffer_init(
        &mut self,
        desc: &BufferDescriptor,
        data: &[u8],
    ) -> BackendResult<BufferHandle> {
        log::trace!(
            "DummyBackend: creating buffer {:?} with {} bytes",
            desc.label,
            data.len()
        );
        let id = self.next_id();
        self.buffers.insert(
            id,
            DummyBuffer {
                size: data.len() as u64,
                contents: data.to_vec(),
            },
        );
        Ok(BufferHandle(id))
    }

    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) {
        if let Some(buf) = self.buffers.get_mut(&buffer.0) {
            let offset = offset as usize;
            let end = offset + data.len();
            if end <= buf.contents.len() {
                buf.contents[offset..end].copy_from_slice(data);
            }
        }
    }

    fn create_texture(&mut self, desc: &TextureDescriptor) -> BackendResult<TextureHandle> {
        log::trace!(
            "DummyBackend: creating texture {:?} ({}x{})",
            desc.label,
            desc.width,
            desc.height
        );
        let id = self.next_id();
        self.textures.insert(id, desc.clone());
        Ok(TextureHandle(id))
    }

    fn create_texture_view(&mut self, texture: TextureHandle) -> BackendResult<TextureViewHandle> {
        if !self.textures.contains_key(&texture.0) {
            return Err(BackendError::ResourceNotFound("texture".into()));
        }
        let id = self.next_id();
        self.texture_views.insert(id, texture);
        Ok(TextureViewHandle(id))
    }

    fn create_bind_group_layout(
        &mut self,
        entries: &[BindGroupLayoutEntry],
    ) -> BackendResult<BindGroupLayoutHandle> {
        let id = self.next_id();
        self.layout_entries.insert(id, entries.to_vec());
        Ok(BindGroupLayoutHandle(id))
    }

    fn create_bind_group(
        &mut self,
        layout: BindGroupLayoutHandle,
        entries: &[(u32, BufferBinding)],
    ) -> BackendResult<BindGroupHandle> {
        let layout_entries = self
            .layout_entries
            .get(&layout.0)
            .ok_or_else(|| BackendError::ResourceNotFound("bind group layout".into()))?;

        traits::validate_binding_sizes(layout_entries, entries, |h| {
            self.buffers.get(&h.0).map(|b| b.size)
        })?;

        let id = self.next_id();
        self.bind_groups.insert(id, entries.to_vec());
        Ok(BindGroupHandle(id))
    }

    fn create_render_pipeline(
        &mut self,
        desc: &RenderPipelineDescriptor,
    ) -> BackendResult<RenderPipelineHandle> {
        log::trace!("DummyBackend: creating pipeline {:?}", desc.label);
        let id = self.next_id();
        self.pipelines.insert(id, desc.label.clone());
        Ok(RenderPipelineHandle(id))
    }

    fn begin_render_pass(&mut self, _desc: &RenderPassDescriptor) {
        self.in_pass = true;
    }

    fn end_render_pass(&mut self) {
        self.in_pass = false;
    }

    fn set_render_pipeline(&mut self, _pipeline: RenderPipelineHandle) {}

    fn set_bind_group(&mut self, _index: u32, _bind_group: BindGroupHandle) {}

    fn set_vertex_buffer(&mut self, _slot: u32, _buffer: BufferHandle, _offset: u64) {}

    fn set_index_buffer(&mut self, _buffer: BufferHandle, _offset: u64, _format: IndexFormat) {}

    fn set_viewport(&mut self, _x: f32, _y: f32, _width: f32, _height: f32) {}

    fn draw_indexed(
        &mut self,
        indices: std::ops::Range<u32>,
        base_vertex: i32,
        instances: std::ops::Range<u32>,
    ) {
        if self.in_pass {
            self.draw_calls.push(DrawIndexedCall {
                indices,
                base_vertex,
                instances,
            });
        }
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        self.buffers.remove(&buffer.0);
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        self.textures.remove(&texture.0);
        self.texture_views.retain(|_, owner| owner.0 != texture.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draws_are_recorded_inside_a_pass() {
        let mut backend = DummyBackend::new(64, 64);
        backend.draw_indexed(0..3, 0, 0..1);
        assert!(backend.draw_calls().is_empty(), "draw outside a pass is dropped");

        backend.begin_render_pass(&RenderPassDescriptor {
            label: None,
            color_attachments: vec![],
            depth_stencil_attachment: None,
        });
        backend.draw_indexed(0..12, 0, 0..1);
        backend.end_render_pass();

        assert_eq!(backend.draw_calls().len(), 1);
        assert_eq!(backend.draw_calls()[0].indices, 0..12);
    }

    #[test]
    fn queue_writes_land_in_buffer_contents() {
        let mut backend = DummyBackend::new(64, 64);
        let buffer = backend
            .create_buffer(&BufferDescriptor {
                label: None,
                size: 8,
                usage: BufferUsage::UNIFORM | BufferUsage::COPY_DST,
            })
            .unwrap();
        backend.write_buffer(buffer, 2, &[1, 2, 3]);
        assert_eq!(
            backend.buffer_contents(buffer).unwrap(),
            &[0, 0, 1, 2, 3, 0, 0, 0]
        );
    }

    #[test]
    fn undersized_uniform_binding_is_rejected_at_creation() {
        let mut backend = DummyBackend::new(64, 64);
        let layout = backend
            .create_bind_group_layout(&[BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStageFlags::FRAGMENT,
                min_binding_size: Some(64),
            }])
            .unwrap();
        let small = backend
            .create_buffer(&BufferDescriptor {
                label: None,
                size: 32,
                usage: BufferUsage::UNIFORM,
            })
            .unwrap();
        let result = backend.create_bind_group(
            layout,
            &[(
                0,
                BufferBinding {
                    buffer: small,
                    offset: 0,
                    size: None,
                },
            )],
        );
        assert!(matches!(
            result,
            Err(BackendError::UniformBufferTooSmall { .. })
        ));
    }
}
