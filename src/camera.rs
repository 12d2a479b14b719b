//! Perspective camera.
//!
//! The camera is a [`Transform`] plus the matrices derived from it. `view` is always the inverse of
//! the transform, and the horizontal and vertical fields of view are always derived from each other
//! through the aspect ratio.

use glam::{Mat4, Vec3, Vec4};

use crate::transform::Transform;

pub const DEFAULT_FOV: f32 = 75.0;
pub const DEFAULT_NEAR: f32 = 0.1;
pub const DEFAULT_FAR: f32 = 500.0;
pub const MIN_FOV: f32 = 1.0;
pub const MAX_FOV: f32 = 120.0;

/// Vertical field of view matching `fov_h` at `aspect` (both in degrees).
pub fn vertical_fov(fov_h: f32, aspect: f32) -> f32 {
    (2.0 * ((fov_h.to_radians() * 0.5).tan() / aspect).atan()).to_degrees()
}

/// Horizontal field of view matching `fov_v` at `aspect` (both in degrees).
pub fn horizontal_fov(fov_v: f32, aspect: f32) -> f32 {
    (2.0 * ((fov_v.to_radians() * 0.5).tan() * aspect).atan()).to_degrees()
}

#[derive(Clone, Debug)]
pub struct Camera {
    transform: Transform,
    view: Mat4,
    projection: Mat4,
    aspect_ratio: f32,
    fov_h: f32,
    fov_v: f32,
    near: f32,
    far: f32,
}

impl Camera {
    /// Camera at the origin looking down its local axes.
    pub fn new(aspect_ratio: f32, fov_h: f32) -> Self {
        Self::with_transform(aspect_ratio, fov_h, Transform::new())
    }

    pub fn with_transform(aspect_ratio: f32, fov_h: f32, transform: Transform) -> Self {
        let mut camera = Self {
            transform,
            view: transform.matrix().inverse(),
            projection: Mat4::IDENTITY,
            aspect_ratio,
            fov_h: DEFAULT_FOV,
            fov_v: DEFAULT_FOV,
            near: DEFAULT_NEAR,
            far: DEFAULT_FAR,
        };
        camera.set_fov_h(fov_h);
        camera
    }

    pub fn looking_at(aspect_ratio: f32, fov_h: f32, from: Vec3, to: Vec3, up: Vec3) -> Self {
        let mut camera = Self::new(aspect_ratio, fov_h);
        camera.look_at(from, to, up);
        camera
    }

    /// Changes the clip planes and rebuilds the projection.
    pub fn set_clip_planes(&mut self, near: f32, far: f32) {
        self.near = near;
        self.far = far;
        self.update_projection();
    }

    fn update_projection(&mut self) {
        self.projection = Mat4::perspective_rh_gl(
            self.fov_v.to_radians(),
            self.aspect_ratio,
            self.near,
            self.far,
        );
    }

    fn sync_view(&mut self) {
        self.view = self.transform.matrix().inverse();
    }

    pub fn set_fov_h(&mut self, fov_h: f32) {
        self.fov_h = fov_h.clamp(MIN_FOV, MAX_FOV);
        self.fov_v = vertical_fov(self.fov_h, self.aspect_ratio);
        self.update_projection();
    }

    pub fn set_fov_v(&mut self, fov_v: f32) {
        self.fov_v = fov_v.clamp(MIN_FOV, MAX_FOV);
        self.fov_h = horizontal_fov(self.fov_v, self.aspect_ratio);
        self.update_projection();
    }

    pub fn modify_fov_h(&mut self, delta: f32) {
        self.set_fov_h(self.fov_h + delta);
    }

    pub fn modify_fov_v(&mut self, delta: f32) {
        self.set_fov_v(self.fov_v + delta);
    }

    /// Keeps the horizontal field of view and re-derives the vertical one.
    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
        self.fov_v = vertical_fov(self.fov_h, self.aspect_ratio);
        self.update_projection();
    }

    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
        self.sync_view();
    }

    pub fn set_view(&mut self, view: Mat4) {
        self.view = view;
        self.transform = Transform::from_matrix(view.inverse());
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.transform.set_position(position);
        self.sync_view();
    }

    pub fn translate(&mut self, offset: Vec3) {
        self.transform.translate(offset);
        self.sync_view();
    }

    pub fn set_axes(&mut self, right: Vec3, up: Vec3, forward: Vec3) {
        self.transform.set_axes(right, up, forward);
        self.sync_view();
    }

    pub fn look_at(&mut self, from: Vec3, to: Vec3, up: Vec3) {
        self.set_view(Mat4::look_at_rh(from, to, up));
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn position(&self) -> Vec4 {
        self.transform.position()
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    /// `projection * view`, the matrix uploaded as `u_camera`.
    pub fn world_to_camera(&self) -> Mat4 {
        self.projection * self.view
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    pub fn fov_h(&self) -> f32 {
        self.fov_h
    }

    pub fn fov_v(&self) -> f32 {
        self.fov_v
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn far(&self) -> f32 {
        self.far
    }
}
