//! A 4x4 affine matrix with accessors for position and local axes.
//!
//! The upper left 3x3 holds the right, up and forward axes scaled by the object's scale. Nothing
//! keeps those axes orthogonal; callers that set them individually are responsible for that.

use glam::{Mat4, Vec3, Vec4};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform(Mat4);

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform {
    pub fn new() -> Self {
        Self(Mat4::IDENTITY)
    }

    pub fn from_matrix(matrix: Mat4) -> Self {
        Self(matrix)
    }

    pub fn from_position(position: Vec3) -> Self {
        Self(Mat4::from_translation(position))
    }

    pub fn matrix(&self) -> Mat4 {
        self.0
    }

    pub fn set_matrix(&mut self, matrix: Mat4) {
        self.0 = matrix;
    }

    /// Translation column with `w = 1`.
    pub fn position(&self) -> Vec4 {
        self.0.w_axis
    }

    pub fn right(&self) -> Vec3 {
        self.0.x_axis.truncate()
    }

    pub fn up(&self) -> Vec3 {
        self.0.y_axis.truncate()
    }

    pub fn forward(&self) -> Vec3 {
        self.0.z_axis.truncate()
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.0.w_axis = position.extend(1.0);
    }

    pub fn translate(&mut self, offset: Vec3) {
        self.0.w_axis += offset.extend(0.0);
    }

    pub fn set_axes(&mut self, right: Vec3, up: Vec3, forward: Vec3) {
        self.set_right(right);
        self.set_up(up);
        self.set_forward(forward);
    }

    pub fn set_right(&mut self, right: Vec3) {
        self.0.x_axis = right.extend(0.0);
    }

    pub fn set_up(&mut self, up: Vec3) {
        self.0.y_axis = up.extend(0.0);
    }

    pub fn set_forward(&mut self, forward: Vec3) {
        self.0.z_axis = forward.extend(0.0);
    }

    /// Per-axis scale, the length of each basis vector.
    pub fn scale(&self) -> Vec3 {
        Vec3::new(
            self.right().length(),
            self.up().length(),
            self.forward().length(),
        )
    }

    /// Rescales the axes to exactly `scale`, discarding any previous scale.
    pub fn set_scale(&mut self, scale: Vec3) {
        let right = self.right().normalize_or_zero() * scale.x;
        let up = self.up().normalize_or_zero() * scale.y;
        let forward = self.forward().normalize_or_zero() * scale.z;
        self.set_axes(right, up, forward);
    }
}

impl From<Mat4> for Transform {
    fn from(matrix: Mat4) -> Self {
        Self(matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axes_are_matrix_columns() {
        let matrix = Mat4::from_cols(
            Vec4::new(1.0, 2.0, 3.0, 0.0),
            Vec4::new(4.0, 5.0, 6.0, 0.0),
            Vec4::new(7.0, 8.0, 9.0, 0.0),
            Vec4::new(10.0, 11.0, 12.0, 1.0),
        );
        let transform = Transform::from_matrix(matrix);
        assert_eq!(transform.right(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(transform.up(), Vec3::new(4.0, 5.0, 6.0));
        assert_eq!(transform.forward(), Vec3::new(7.0, 8.0, 9.0));
        assert_eq!(transform.position(), Vec4::new(10.0, 11.0, 12.0, 1.0));
    }

    #[test]
    fn test_translate_accumulates() {
        let mut transform = Transform::from_position(Vec3::new(0.0, 0.0, 6.0));
        transform.translate(Vec3::new(1.0, -1.0, 0.5));
        transform.translate(Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(transform.position(), Vec4::new(2.0, -1.0, 6.5, 1.0));
    }

    #[test]
    fn test_set_scale_replaces_scale() {
        let mut transform = Transform::from_matrix(Mat4::from_scale(Vec3::splat(4.0)));
        transform.set_scale(Vec3::new(1.0, 2.0, 3.0));
        assert!(transform.scale().abs_diff_eq(Vec3::new(1.0, 2.0, 3.0), 1e-6));
        assert!(transform.right().normalize().abs_diff_eq(Vec3::X, 1e-6));
    }
}
