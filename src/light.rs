//! Lights and how they reach the lighting shader.
//!
//! A [`Light`] stores its spot angle and blur in "raw" units (degrees and a 0..1 knob) and hands
//! the shader the derived values: the cosine of the cutoff angle and a sine shaped blur.
//!
//! The shader has one uniform array per light kind (`u_dirLights`, `u_pointLights`,
//! `u_spotLights`). [`bucketize`] maps the registered lights, in registration order, onto
//! contiguous slots of those arrays, and [`broadcast`] writes a bucketing into a shader, skipping
//! every field that did not change since the previous bucketing that shader received.

use glam::{Vec3, Vec4};

use crate::{
    abs::shader::{Shader, Uniform},
    colour::Colour,
    transform::Transform,
};

/// Fraction of a directional light's colour used as its ambient term.
pub const AMBIENCE: f32 = 0.15;
/// Specular exponent written to `u_material.shininess`.
pub const SHININESS: f32 = 32.0;

pub const DEFAULT_LINEAR: f32 = 0.09;
pub const DEFAULT_QUADRATIC: f32 = 0.032;
pub const DEFAULT_ANGLE: f32 = 20.0;
pub const DEFAULT_BLUR: f32 = 0.0;

/// Upper bound of a spot light's raw angle, in degrees.
pub const MAX_ANGLE: f32 = 90.0;
/// Upper bound of a spot light's raw blur.
pub const MAX_BLUR: f32 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LightKind {
    Directional,
    Point,
    Spot,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Light {
    kind: LightKind,
    colour: Colour,
    transform: Transform,
    linear: f32,
    quadratic: f32,
    angle: f32,
    blur: f32,
}

impl Light {
    pub fn new(kind: LightKind) -> Self {
        Self {
            kind,
            colour: Colour::WHITE,
            transform: Transform::new(),
            linear: DEFAULT_LINEAR,
            quadratic: DEFAULT_QUADRATIC,
            angle: DEFAULT_ANGLE,
            blur: DEFAULT_BLUR,
        }
    }

    pub fn with_colour(kind: LightKind, colour: Colour) -> Self {
        let mut light = Self::new(kind);
        light.colour = colour;
        light
    }

    pub fn kind(&self) -> LightKind {
        self.kind
    }

    pub fn colour(&self) -> Colour {
        self.colour
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    pub fn linear(&self) -> f32 {
        self.linear
    }

    pub fn quadratic(&self) -> f32 {
        self.quadratic
    }

    /// Cosine of the spot cutoff angle.
    pub fn angle(&self) -> f32 {
        self.angle.to_radians().cos()
    }

    /// Blur remapped onto a quarter sine wave.
    pub fn blur(&self) -> f32 {
        (90.0 * self.blur).to_radians().sin()
    }

    pub fn angle_raw(&self) -> f32 {
        self.angle
    }

    pub fn blur_raw(&self) -> f32 {
        self.blur
    }

    /// The transform's forward axis, `w = 0`.
    pub fn direction(&self) -> Vec4 {
        self.transform.forward().extend(0.0)
    }

    /// The transform's translation, `w = 1`.
    pub fn position(&self) -> Vec4 {
        self.transform.position()
    }

    pub fn set_kind(&mut self, kind: LightKind) -> &mut Self {
        self.kind = kind;
        self
    }

    pub fn set_colour(&mut self, colour: Colour) -> &mut Self {
        self.colour = colour;
        self
    }

    pub fn set_position(&mut self, position: Vec3) -> &mut Self {
        self.transform.set_position(position);
        self
    }

    /// Sets the stored direction. It points from the lit surface back towards the light, which is
    /// how the lighting shader compares it.
    pub fn set_direction(&mut self, direction: Vec3) -> &mut Self {
        self.transform.set_forward(direction);
        self
    }

    /// Makes the light's rays travel along `rays`, e.g. `(0, -1, 0)` for a sun straight above.
    pub fn set_rays(&mut self, rays: Vec3) -> &mut Self {
        self.set_direction(-rays.normalize_or_zero())
    }

    /// Points a spot light from its current position at `target`.
    pub fn aim_at(&mut self, target: Vec3) -> &mut Self {
        let to_light = self.transform.position().truncate() - target;
        self.set_direction(to_light.normalize_or_zero())
    }

    pub fn set_linear(&mut self, linear: f32) -> &mut Self {
        self.linear = linear;
        self
    }

    pub fn set_quadratic(&mut self, quadratic: f32) -> &mut Self {
        self.quadratic = quadratic;
        self
    }

    /// Sets the raw cutoff angle in degrees.
    pub fn set_angle(&mut self, angle: f32) -> &mut Self {
        self.angle = angle;
        self
    }

    /// Sets the raw blur.
    pub fn set_blur(&mut self, blur: f32) -> &mut Self {
        self.blur = blur;
        self
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DirectionalUniforms {
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub direction: Vec4,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PointUniforms {
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub position: Vec4,
    pub linear: f32,
    pub quadratic: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SpotUniforms {
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub position: Vec4,
    pub direction: Vec4,
    pub linear: f32,
    pub quadratic: f32,
    pub cutoff: f32,
    pub blur: f32,
}

impl From<&Light> for DirectionalUniforms {
    fn from(light: &Light) -> Self {
        let colour = light.colour.as_vec3();
        Self {
            ambient: colour * AMBIENCE,
            diffuse: colour,
            specular: colour,
            direction: light.direction(),
        }
    }
}

impl From<&Light> for PointUniforms {
    fn from(light: &Light) -> Self {
        let colour = light.colour.as_vec3();
        Self {
            diffuse: colour,
            specular: colour,
            position: light.position(),
            linear: light.linear,
            quadratic: light.quadratic,
        }
    }
}

impl From<&Light> for SpotUniforms {
    fn from(light: &Light) -> Self {
        let colour = light.colour.as_vec3();
        Self {
            diffuse: colour,
            specular: colour,
            position: light.position(),
            direction: light.direction(),
            linear: light.linear,
            quadratic: light.quadratic,
            cutoff: light.angle(),
            blur: light.blur(),
        }
    }
}

/// One occupied slot of a shader light array.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bucketed<U> {
    /// Position of the light in registration order.
    pub source: usize,
    pub uniforms: U,
}

/// Every light assigned to its slot, per kind.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LightBuckets {
    pub directional: Vec<Bucketed<DirectionalUniforms>>,
    pub point: Vec<Bucketed<PointUniforms>>,
    pub spot: Vec<Bucketed<SpotUniforms>>,
}

impl LightBuckets {
    /// The kind and slot index the light at registration position `source` landed in.
    pub fn slot_of(&self, source: usize) -> Option<(LightKind, usize)> {
        fn find<U>(bucket: &[Bucketed<U>], source: usize) -> Option<usize> {
            bucket.iter().position(|b| b.source == source)
        }
        find(&self.directional, source)
            .map(|i| (LightKind::Directional, i))
            .or_else(|| find(&self.point, source).map(|i| (LightKind::Point, i)))
            .or_else(|| find(&self.spot, source).map(|i| (LightKind::Spot, i)))
    }

    pub fn len(&self) -> usize {
        self.directional.len() + self.point.len() + self.spot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Assigns every light a slot in its kind's array, following iteration order.
pub fn bucketize<'a>(lights: impl IntoIterator<Item = &'a Light>) -> LightBuckets {
    let mut buckets = LightBuckets::default();
    for (source, light) in lights.into_iter().enumerate() {
        match light.kind {
            LightKind::Directional => buckets.directional.push(Bucketed {
                source,
                uniforms: light.into(),
            }),
            LightKind::Point => buckets.point.push(Bucketed {
                source,
                uniforms: light.into(),
            }),
            LightKind::Spot => buckets.spot.push(Bucketed {
                source,
                uniforms: light.into(),
            }),
        }
    }
    buckets
}

/// Writes `value` unless it equals `previous`. Returns whether a GPU write happened.
fn write_field<T: Uniform + PartialEq>(
    shader: &Shader,
    name: impl FnOnce() -> String,
    value: T,
    previous: Option<T>,
) -> bool {
    if previous.is_some_and(|old| old == value) {
        return false;
    }
    shader.set_if_active(&name(), value)
}

/// The uniforms of one slot of a shader light array.
trait LightSlot: Default + PartialEq {
    const ARRAY: &'static str;

    /// Writes the fields that differ from `previous`, returning the number of GPU writes.
    fn write(&self, shader: &Shader, index: usize, previous: Option<&Self>) -> usize;
}

impl LightSlot for DirectionalUniforms {
    const ARRAY: &'static str = "u_dirLights";

    fn write(&self, shader: &Shader, index: usize, previous: Option<&Self>) -> usize {
        let field = |name: &str| format!("{}[{}].{}", Self::ARRAY, index, name);
        [
            write_field(shader, || field("colour.ambient"), self.ambient, previous.map(|p| p.ambient)),
            write_field(shader, || field("colour.diffuse"), self.diffuse, previous.map(|p| p.diffuse)),
            write_field(shader, || field("colour.specular"), self.specular, previous.map(|p| p.specular)),
            write_field(shader, || field("direction"), self.direction, previous.map(|p| p.direction)),
        ]
        .into_iter()
        .filter(|written| *written)
        .count()
    }
}

impl LightSlot for PointUniforms {
    const ARRAY: &'static str = "u_pointLights";

    fn write(&self, shader: &Shader, index: usize, previous: Option<&Self>) -> usize {
        let field = |name: &str| format!("{}[{}].{}", Self::ARRAY, index, name);
        [
            write_field(shader, || field("colour.diffuse"), self.diffuse, previous.map(|p| p.diffuse)),
            write_field(shader, || field("colour.specular"), self.specular, previous.map(|p| p.specular)),
            write_field(shader, || field("position"), self.position, previous.map(|p| p.position)),
            write_field(shader, || field("linear"), self.linear, previous.map(|p| p.linear)),
            write_field(shader, || field("quadratic"), self.quadratic, previous.map(|p| p.quadratic)),
        ]
        .into_iter()
        .filter(|written| *written)
        .count()
    }
}

impl LightSlot for SpotUniforms {
    const ARRAY: &'static str = "u_spotLights";

    fn write(&self, shader: &Shader, index: usize, previous: Option<&Self>) -> usize {
        let field = |name: &str| format!("{}[{}].{}", Self::ARRAY, index, name);
        [
            write_field(shader, || field("colour.diffuse"), self.diffuse, previous.map(|p| p.diffuse)),
            write_field(shader, || field("colour.specular"), self.specular, previous.map(|p| p.specular)),
            write_field(shader, || field("position"), self.position, previous.map(|p| p.position)),
            write_field(shader, || field("direction"), self.direction, previous.map(|p| p.direction)),
            write_field(shader, || field("linear"), self.linear, previous.map(|p| p.linear)),
            write_field(shader, || field("quadratic"), self.quadratic, previous.map(|p| p.quadratic)),
            write_field(shader, || field("cutoff"), self.cutoff, previous.map(|p| p.cutoff)),
            write_field(shader, || field("blur"), self.blur, previous.map(|p| p.blur)),
        ]
        .into_iter()
        .filter(|written| *written)
        .count()
    }
}

fn broadcast_bucket<U: LightSlot>(
    shader: &Shader,
    current: &[Bucketed<U>],
    previous: Option<&[Bucketed<U>]>,
) -> usize {
    let mut writes = 0;
    for (index, entry) in current.iter().enumerate() {
        let old = previous.and_then(|p| p.get(index)).map(|b| &b.uniforms);
        writes += entry.uniforms.write(shader, index, old);
    }

    // Slots that were occupied last time and are empty now get zeroed. A zero `linear` is what
    // the lighting shader treats as an unused point or spot slot.
    if let Some(previous) = previous {
        let cleared = U::default();
        for (index, old) in previous.iter().enumerate().skip(current.len()) {
            writes += cleared.write(shader, index, Some(&old.uniforms));
        }
    }
    writes
}

/// Writes `buckets` into `shader`.
///
/// With `previous` set to the bucketing the shader last received, only changed fields are written.
/// Without it every field is written, along with the material shininess. Returns the number of
/// uniform writes that reached the GPU.
pub fn broadcast(shader: &Shader, buckets: &LightBuckets, previous: Option<&LightBuckets>) -> usize {
    let mut writes = 0;
    if previous.is_none() && shader.set_if_active("u_material.shininess", SHININESS) {
        writes += 1;
    }
    writes += broadcast_bucket(
        shader,
        &buckets.directional,
        previous.map(|p| p.directional.as_slice()),
    );
    writes += broadcast_bucket(shader, &buckets.point, previous.map(|p| p.point.as_slice()));
    writes += broadcast_bucket(shader, &buckets.spot, previous.map(|p| p.spot.as_slice()));
    log::trace!("Broadcast {} light uniforms ({} lights)", writes, buckets.len());
    writes
}
