use glam::Vec3;
use id_arena::Id;

use crate::texture::TextureId;

pub type MaterialId = Id<Material>;

/// Converts a `0xRRGGBB` sRGB color to linear RGB, the space materials and
/// lights are stored in.
pub fn color_from_hex(hex: u32) -> Vec3 {
    let channel = |shift: u32| srgb_to_linear(((hex >> shift) & 0xff) as f32 / 255.0);
    Vec3::new(channel(16), channel(8), channel(0))
}

fn srgb_to_linear(value: f32) -> f32 {
    if value <= 0.04045 {
        value / 12.92
    } else {
        ((value + 0.055) / 1.055).powf(2.4)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointsMaterial {
    pub size: f32,
    pub map: Option<TextureId>,
    pub vertex_colors: bool,
    pub transparent: bool,
    pub opacity: f32,
    pub size_attenuation: bool,
    pub alpha_test: f32,
}

impl Default for PointsMaterial {
    fn default() -> Self {
        Self {
            size: 1.0,
            map: None,
            vertex_colors: false,
            transparent: false,
            opacity: 1.0,
            size_attenuation: true,
            alpha_test: 0.0,
        }
    }
}

/// Transmissive, iridescent, clear-coated surface.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalMaterial {
    pub color: Vec3,
    pub roughness: f32,
    pub metalness: f32,
    pub transmission: f32,
    pub thickness: f32,
    pub ior: f32,
    pub reflectivity: f32,
    pub iridescence: f32,
    pub iridescence_ior: f32,
    pub clearcoat: f32,
    pub clearcoat_roughness: f32,
    pub double_sided: bool,
}

impl Default for PhysicalMaterial {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            roughness: 1.0,
            metalness: 0.0,
            transmission: 0.0,
            thickness: 0.0,
            ior: 1.5,
            reflectivity: 0.5,
            iridescence: 0.0,
            iridescence_ior: 1.3,
            clearcoat: 0.0,
            clearcoat_roughness: 0.0,
            double_sided: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StandardMaterial {
    pub color: Vec3,
    pub metalness: f32,
    pub roughness: f32,
    pub emissive: Option<Vec3>,
    pub emissive_intensity: f32,
}

impl Default for StandardMaterial {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            metalness: 0.0,
            roughness: 1.0,
            emissive: None,
            emissive_intensity: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MaterialKind {
    Points(PointsMaterial),
    Physical(PhysicalMaterial),
    Standard(StandardMaterial),
}

#[derive(Debug, Clone)]
pub struct Material {
    pub kind: MaterialKind,
    disposed: bool,
}

impl Material {
    pub fn new(kind: MaterialKind) -> Self {
        Self {
            kind,
            disposed: false,
        }
    }

    pub fn points(material: PointsMaterial) -> Self {
        Self::new(MaterialKind::Points(material))
    }

    pub fn physical(material: PhysicalMaterial) -> Self {
        Self::new(MaterialKind::Physical(material))
    }

    pub fn standard(material: StandardMaterial) -> Self {
        Self::new(MaterialKind::Standard(material))
    }

    pub fn emissive_intensity(&self) -> Option<f32> {
        match &self.kind {
            MaterialKind::Standard(standard) if standard.emissive.is_some() => {
                Some(standard.emissive_intensity)
            }
            _ => None,
        }
    }

    /// Raises the emissive intensity of a material that has an emissive
    /// channel to at least `floor`. Returns whether the material had one.
    pub fn raise_emissive_floor(&mut self, floor: f32) -> bool {
        match &mut self.kind {
            MaterialKind::Standard(standard) if standard.emissive.is_some() => {
                standard.emissive_intensity = standard.emissive_intensity.max(floor);
                true
            }
            _ => false,
        }
    }

    pub fn dispose(&mut self) {
        self.disposed = true;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_from_hex() {
        assert!((color_from_hex(0xffffff) - Vec3::ONE).length() < 1e-5);
        assert_eq!(color_from_hex(0x000000), Vec3::ZERO);

        let red = color_from_hex(0xff0000);
        assert!((red - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-5);

        // sRGB 0x80 is roughly 0.216 in linear space
        let gray = color_from_hex(0x808080);
        assert!((gray.x - 0.2158605).abs() < 1e-4);
    }

    #[test]
    fn test_emissive_floor_never_lowers() {
        let mut dim = Material::standard(StandardMaterial {
            emissive: Some(Vec3::new(0.0, 1.0, 1.0)),
            emissive_intensity: 0.5,
            ..Default::default()
        });
        let mut bright = Material::standard(StandardMaterial {
            emissive: Some(Vec3::ONE),
            emissive_intensity: 5.0,
            ..Default::default()
        });
        let mut plain = Material::standard(StandardMaterial::default());

        assert!(dim.raise_emissive_floor(2.0));
        assert!(bright.raise_emissive_floor(2.0));
        assert!(!plain.raise_emissive_floor(2.0));

        assert_eq!(dim.emissive_intensity(), Some(2.0));
        assert_eq!(bright.emissive_intensity(), Some(5.0));
        assert_eq!(plain.emissive_intensity(), None);
    }
}
