//! Per-frame uniform composition
//!
//! The composer is the single place where CPU-side scene state is turned
//! into GPU-visible bytes. It has no behavior beyond layout: identical
//! inputs always produce identical payloads.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use static_assertions::const_assert_eq;

use crate::scene::Camera;

/// Size of each uniform binding. Both the matrix and the light record fill
/// exactly one binding; smaller buffers are rejected at bind-group creation.
pub const UNIFORM_BINDING_SIZE: u64 = 64;

/// Combined projection × view × model matrix.
///
/// glam matrices are column-major, so the byte image is 16 contiguous
/// column-major f32, exactly the layout `mat4x4<f32>` expects.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TransformUniform {
    pub mvp: Mat4,
}

const_assert_eq!(std::mem::size_of::<TransformUniform>(), 64);

impl TransformUniform {
    /// GPU-visible byte image of the matrix, mirroring [`UniformFrame::transform_bytes`].
    pub fn transform_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

/// Point-light record as the fragment shader reads it.
///
/// Field order is position, color, intensity, viewer position; the
/// interleaved pads reproduce WGSL uniform alignment (vec3 aligns to 16),
/// and the tail pad brings the record up to the 64-byte binding size.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PointLightUniform {
    pub position: Vec3,
    _pad0: f32,
    pub color: Vec3,
    pub intensity: f32,
    pub view_pos: Vec3,
    _pad1: f32,
    _pad2: [f32; 4],
}

const_assert_eq!(std::mem::size_of::<PointLightUniform>(), 64);

impl PointLightUniform {
    pub fn new(position: Vec3, color: Vec3, intensity: f32, view_pos: Vec3) -> Self {
        Self {
            position,
            _pad0: 0.0,
            color,
            intensity,
            view_pos,
            _pad1: 0.0,
            _pad2: [0.0; 4],
        }
    }
}

/// Light parameters gathered from the scene for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightParams {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
}

impl Default for LightParams {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 1.0, 0.0),
            color: Vec3::ONE,
            intensity: 1.0,
        }
    }
}

/// One draw call's worth of uniform data, rebuilt every frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformFrame {
    pub transform: TransformUniform,
    pub light: PointLightUniform,
}

impl UniformFrame {
    pub fn transform_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(&self.transform)
    }

    pub fn light_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(&self.light)
    }
}

/// Builds uniform payloads from the projection, the current view matrix,
/// and the frame's light parameters.
pub struct FrameComposer {
    projection: Mat4,
}

impl FrameComposer {
    /// Fix the projection from camera parameters and the surface aspect
    pub fn new(camera: &Camera, aspect: f32) -> Self {
        Self {
            projection: camera.projection_matrix(aspect),
        }
    }

    pub fn from_projection(projection: Mat4) -> Self {
        Self { projection }
    }

    /// Refit the projection, e.g. after a surface resize
    pub fn set_projection(&mut self, camera: &Camera, aspect: f32) {
        self.projection = camera.projection_matrix(aspect);
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    /// Combined projection × view × model matrix for one entity
    pub fn model_view_projection(&self, view: Mat4, model: Mat4) -> TransformUniform {
        TransformUniform {
            mvp: self.projection * view * model,
        }
    }

    /// Light payload shared by every draw of the frame
    pub fn light(&self, params: &LightParams, viewer: Vec3) -> PointLightUniform {
        PointLightUniform::new(params.position, params.color, params.intensity, viewer)
    }

    /// Full per-draw payload
    pub fn compose(
        &self,
        view: Mat4,
        model: Mat4,
        params: &LightParams,
        viewer: Vec3,
    ) -> UniformFrame {
        UniformFrame {
            transform: self.model_view_projection(view, model),
            light: self.light(params, viewer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Offsets are part of the wire contract; keep them pinned down without
    // a dedicated crate.
    fn float_index_of<F>(base: &PointLightUniform, field: &F) -> usize {
        let base_addr = base as *const _ as usize;
        let field_addr = field as *const F as usize;
        (field_addr - base_addr) / std::mem::size_of::<f32>()
    }

    #[test]
    fn composition_is_deterministic() {
        let composer = FrameComposer::new(&Camera::new(70.0, 0.1, 100.0), 1.0);
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO, Vec3::Y);
        let model = Mat4::from_rotation_y(0.7);
        let params = LightParams::default();

        let a = composer.compose(view, model, &params, Vec3::new(0.0, 0.0, 3.0));
        let b = composer.compose(view, model, &params, Vec3::new(0.0, 0.0, 3.0));

        assert_eq!(a.transform_bytes(), b.transform_bytes());
        assert_eq!(a.light_bytes(), b.light_bytes());
    }

    #[test]
    fn matrix_serializes_column_major() {
        let composer = FrameComposer::from_projection(Mat4::IDENTITY);
        let uniform =
            composer.model_view_projection(Mat4::IDENTITY, Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)));

        let floats: &[f32] = bytemuck::cast_slice(uniform.transform_bytes());
        assert_eq!(floats.len(), 16);
        // Translation lives in the fourth column
        assert_eq!(&floats[12..16], &[1.0, 2.0, 3.0, 1.0]);
        // Diagonal of the upper-left block
        assert_eq!(floats[0], 1.0);
        assert_eq!(floats[5], 1.0);
        assert_eq!(floats[10], 1.0);
    }

    #[test]
    fn light_record_is_one_binding_with_aligned_fields() {
        let uniform = PointLightUniform::new(
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::new(0.5, 0.6, 0.7),
            2.0,
            Vec3::new(9.0, 8.0, 7.0),
        );
        assert_eq!(
            std::mem::size_of::<PointLightUniform>() as u64,
            UNIFORM_BINDING_SIZE
        );

        // WGSL offsets: position @ 0, color @ 16, intensity @ 28, view_pos @ 32
        assert_eq!(float_index_of(&uniform, &uniform.position), 0);
        assert_eq!(float_index_of(&uniform, &uniform.color), 4);
        assert_eq!(float_index_of(&uniform, &uniform.intensity), 7);
        assert_eq!(float_index_of(&uniform, &uniform.view_pos), 8);

        let floats: &[f32] = bytemuck::cast_slice(bytemuck::bytes_of(&uniform));
        assert_eq!(&floats[0..3], &[1.0, 2.0, 3.0]);
        assert_eq!(&floats[4..7], &[0.5, 0.6, 0.7]);
        assert_eq!(floats[7], 2.0);
        assert_eq!(&floats[8..11], &[9.0, 8.0, 7.0]);
        // Padding is always zeroed, keeping payloads bit-exact across frames
        assert_eq!(floats[3], 0.0);
        assert!(floats[11..16].iter().all(|&f| f == 0.0));
    }

    #[test]
    fn mvp_multiplies_in_projection_view_model_order() {
        let proj = Mat4::from_scale(Vec3::splat(2.0));
        let view = Mat4::from_translation(Vec3::new(0.0, 0.0, -3.0));
        let model = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0));

        let composer = FrameComposer::from_projection(proj);
        let uniform = composer.model_view_projection(view, model);

        assert_eq!(uniform.mvp, proj * view * model);
        let origin = uniform.mvp.project_point3(Vec3::ZERO);
        assert_eq!(origin, Vec3::new(2.0, 0.0, -6.0));
    }
}
