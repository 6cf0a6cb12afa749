//! Camera controller
//!
//! Orbit-style controller: the camera circles a fixed target at a given
//! distance, steered by pointer drags and the scroll wheel. The view matrix
//! is recomputed synchronously on every state change, so a frame composed
//! after an input event never sees a stale matrix.

use glam::{Mat4, Vec2, Vec3};

/// World up vector used for the look-at basis
const UP: Vec3 = Vec3::Y;

/// Orbit camera controller
///
/// - Pointer drag: orbit around the target (yaw/pitch)
/// - Wheel: dolly in/out (distance)
pub struct OrbitController {
    target: Vec3,
    yaw: f32,
    pitch: f32,
    distance: f32,
    /// Radians (yaw/pitch) or world units (distance) per input unit
    sensitivity: f32,
    /// Distance floor; the orbit radius never reaches zero
    min_distance: f32,
    last_pointer: Vec2,
    dragging: bool,
    view: Mat4,
}

impl Default for OrbitController {
    fn default() -> Self {
        Self::new(Vec3::ZERO, 3.0)
    }
}

impl OrbitController {
    pub fn new(target: Vec3, distance: f32) -> Self {
        let mut controller = Self {
            target,
            yaw: 0.0,
            pitch: 0.0,
            distance,
            sensitivity: 0.005,
            min_distance: 0.1,
            last_pointer: Vec2::ZERO,
            dragging: false,
            view: Mat4::IDENTITY,
        };
        controller.distance = controller.distance.max(controller.min_distance);
        controller.rebuild_view();
        controller
    }

    pub fn with_sensitivity(mut self, sensitivity: f32) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    pub fn with_min_distance(mut self, min_distance: f32) -> Self {
        self.min_distance = min_distance;
        self.distance = self.distance.max(self.min_distance);
        self.rebuild_view();
        self
    }

    /// Create with specific starting angles, in radians
    pub fn with_angles(mut self, yaw: f32, pitch: f32) -> Self {
        self.yaw = yaw;
        self.pitch = pitch.clamp(-std::f32::consts::FRAC_PI_2, std::f32::consts::FRAC_PI_2);
        self.rebuild_view();
        self
    }

    /// Pointer pressed: remember where the drag starts
    pub fn pointer_down(&mut self, x: f32, y: f32) {
        self.dragging = true;
        self.last_pointer = Vec2::new(x, y);
    }

    /// Pointer moved: while dragging, convert the delta into yaw/pitch
    pub fn pointer_move(&mut self, x: f32, y: f32) {
        if !self.dragging {
            return;
        }
        let delta = Vec2::new(x, y) - self.last_pointer;
        self.last_pointer = Vec2::new(x, y);

        self.yaw += delta.x * self.sensitivity;
        self.pitch -= delta.y * self.sensitivity;
        self.pitch = self
            .pitch
            .clamp(-std::f32::consts::FRAC_PI_2, std::f32::consts::FRAC_PI_2);

        self.rebuild_view();
    }

    /// Pointer released: leave the dragging state
    pub fn pointer_up(&mut self) {
        self.dragging = false;
    }

    /// Wheel scrolled: dolly along the view direction
    pub fn wheel(&mut self, delta_y: f32) {
        self.distance += delta_y * self.sensitivity;
        self.distance = self.distance.max(self.min_distance);
        self.rebuild_view();
    }

    /// Camera position on the orbit sphere. Always exactly `distance` away
    /// from the target.
    pub fn position(&self) -> Vec3 {
        self.target
            + self.distance
                * Vec3::new(
                    self.pitch.cos() * self.yaw.sin(),
                    self.pitch.sin(),
                    self.pitch.cos() * self.yaw.cos(),
                )
    }

    /// Current view matrix
    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    fn rebuild_view(&mut self) {
        self.view = Mat4::look_at_rh(self.position(), self.target, UP);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn rest_pose_sits_on_positive_z() {
        let controller = OrbitController::default();
        let position = controller.position();
        assert_relative_eq!(position.x, 0.0);
        assert_relative_eq!(position.y, 0.0);
        assert_relative_eq!(position.z, 3.0);
    }

    #[test]
    fn wheel_zooms_out_to_exact_distance() {
        let mut controller = OrbitController::default();
        controller.wheel(200.0);
        assert_relative_eq!(controller.distance(), 4.0);
        let position = controller.position();
        assert_relative_eq!(position.z, 4.0, epsilon = 1e-5);
    }

    #[test]
    fn wheel_never_collapses_below_the_floor() {
        let mut controller = OrbitController::default();
        for _ in 0..100 {
            controller.wheel(-500.0);
        }
        assert!(controller.distance() >= 0.1);
        controller.wheel(-f32::MAX);
        assert!(controller.distance() >= 0.1);
    }

    #[test]
    fn drag_up_pitches_and_clamps() {
        let mut controller = OrbitController::default();
        controller.pointer_down(100.0, 100.0);
        controller.pointer_move(100.0, 50.0);
        assert_relative_eq!(controller.pitch(), 0.25);

        // A huge drag can only reach the pole, never flip past it
        controller.pointer_move(100.0, -100_000.0);
        assert_relative_eq!(controller.pitch(), FRAC_PI_2);
        controller.pointer_move(100.0, 200_000.0);
        assert_relative_eq!(controller.pitch(), -FRAC_PI_2);
    }

    #[test]
    fn pitch_stays_bounded_over_arbitrary_drags() {
        let mut controller = OrbitController::default();
        controller.pointer_down(0.0, 0.0);
        let mut y = 0.0;
        for step in [-300.0_f32, 1200.0, -77.5, 4000.0, -9000.0, 123.0] {
            y += step;
            controller.pointer_move(0.0, y);
            assert!(controller.pitch() >= -FRAC_PI_2);
            assert!(controller.pitch() <= FRAC_PI_2);
        }
    }

    #[test]
    fn moves_are_ignored_when_not_dragging() {
        let mut controller = OrbitController::default();
        controller.pointer_move(500.0, 500.0);
        assert_relative_eq!(controller.yaw(), 0.0);
        assert_relative_eq!(controller.pitch(), 0.0);

        controller.pointer_down(0.0, 0.0);
        controller.pointer_up();
        controller.pointer_move(500.0, 500.0);
        assert_relative_eq!(controller.yaw(), 0.0);
    }

    #[test]
    fn position_magnitude_always_equals_distance() {
        let mut controller = OrbitController::new(Vec3::new(1.0, 2.0, 3.0), 5.0);
        controller.pointer_down(0.0, 0.0);
        controller.pointer_move(37.0, -12.0);
        controller.wheel(140.0);
        controller.pointer_move(-250.0, 90.0);
        controller.wheel(-80.0);

        let radius = (controller.position() - controller.target()).length();
        assert_relative_eq!(radius, controller.distance(), epsilon = 1e-4);
    }

    #[test]
    fn view_matrix_is_never_stale_after_input() {
        let mut controller = OrbitController::default();
        let before = controller.view_matrix();
        controller.pointer_down(0.0, 0.0);
        controller.pointer_move(80.0, 0.0);
        assert_ne!(controller.view_matrix(), before);

        let expected = Mat4::look_at_rh(controller.position(), controller.target(), Vec3::Y);
        assert_eq!(controller.view_matrix(), expected);
    }

    #[test]
    fn view_looks_at_the_target() {
        let controller = OrbitController::default();
        // The target must land on the view-space -Z axis
        let in_view = controller.view_matrix().transform_point3(Vec3::ZERO);
        assert_relative_eq!(in_view.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(in_view.y, 0.0, epsilon = 1e-6);
        assert_relative_eq!(in_view.z, -3.0, epsilon = 1e-5);
    }
}
