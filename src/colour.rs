//! Linear RGB colour.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// An RGB colour with components in `[0, 1]`. Serialises as `[r, g, b]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 3]", into = "[f32; 3]")]
pub struct Colour(pub Vec3);

impl Colour {
    pub const WHITE: Colour = Colour(Vec3::ONE);
    pub const BLACK: Colour = Colour(Vec3::ZERO);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self(Vec3::new(r, g, b))
    }

    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }

    /// Parses `#RRGGBB` (the `#` is optional).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self::from_rgb8(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn as_vec3(self) -> Vec3 {
        self.0
    }
}

impl Default for Colour {
    fn default() -> Self {
        Self::WHITE
    }
}

impl From<[f32; 3]> for Colour {
    fn from([r, g, b]: [f32; 3]) -> Self {
        Self::rgb(r, g, b)
    }
}

impl From<Colour> for [f32; 3] {
    fn from(colour: Colour) -> Self {
        colour.0.to_array()
    }
}

impl From<Vec3> for Colour {
    fn from(value: Vec3) -> Self {
        Self(value)
    }
}

impl std::ops::Mul<f32> for Colour {
    type Output = Colour;

    fn mul(self, rhs: f32) -> Colour {
        Colour(self.0 * rhs)
    }
}
