use glam::Vec3;

use crate::material::color_from_hex;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Ambient,
    /// Shines from the light's position towards the origin.
    Directional,
    /// `range` of zero means unlimited.
    Point { range: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub color: Vec3,
    pub intensity: f32,
}

impl Light {
    pub fn ambient(hex: u32, intensity: f32) -> Self {
        Self {
            kind: LightKind::Ambient,
            color: color_from_hex(hex),
            intensity,
        }
    }

    pub fn directional(hex: u32, intensity: f32) -> Self {
        Self {
            kind: LightKind::Directional,
            color: color_from_hex(hex),
            intensity,
        }
    }

    pub fn point(hex: u32, intensity: f32, range: f32) -> Self {
        Self {
            kind: LightKind::Point { range },
            color: color_from_hex(hex),
            intensity,
        }
    }
}
