use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

use glam::Vec2;
use id_arena::Id;
use image::{Rgba, RgbaImage};

pub type TextureId = Id<Texture>;

/// An RGBA8 image uploaded by renderers on first use.
#[derive(Debug, Clone)]
pub struct Texture {
    pub name: String,
    image: RgbaImage,
    disposed: bool,
}

impl Texture {
    pub fn from_image(name: impl Into<String>, image: RgbaImage) -> Self {
        Self {
            name: name.into(),
            image,
            disposed: false,
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn dispose(&mut self) {
        self.disposed = true;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

pub const STAR_SPRITE_SIZE: u32 = 32;
const STAR_OUTER_RADIUS: f32 = 15.0;
const STAR_INNER_RADIUS: f32 = 4.0;

fn star_outline(center: Vec2) -> Vec<Vec2> {
    let mut outline = Vec::with_capacity(8);

    for i in 0..4 {
        let angle = i as f32 * FRAC_PI_2;
        outline.push(center + Vec2::from_angle(angle) * STAR_OUTER_RADIUS);
        outline.push(center + Vec2::from_angle(angle + FRAC_PI_4) * STAR_INNER_RADIUS);
    }

    outline
}

// Even-odd rule
fn polygon_contains(polygon: &[Vec2], point: Vec2) -> bool {
    let mut inside = false;
    let mut previous = polygon[polygon.len() - 1];

    for &current in polygon {
        if (current.y > point.y) != (previous.y > point.y) {
            let crossing_x =
                current.x + (point.y - current.y) / (previous.y - current.y) * (previous.x - current.x);
            if point.x < crossing_x {
                inside = !inside;
            }
        }
        previous = current;
    }

    inside
}

/// White four-pointed star on transparent black, shared by every point of a
/// particle cloud.
pub fn star_sprite() -> Texture {
    let center = Vec2::splat(STAR_SPRITE_SIZE as f32 / 2.0);
    let outline = star_outline(center);

    let image = RgbaImage::from_fn(STAR_SPRITE_SIZE, STAR_SPRITE_SIZE, |x, y| {
        let sample = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
        if polygon_contains(&outline, sample) {
            Rgba([255, 255, 255, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    });

    Texture::from_image("Star sprite", image)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_star_sprite_shape() {
        let sprite = star_sprite();
        let image = sprite.image();

        assert_eq!(image.dimensions(), (32, 32));
        assert_eq!(image.get_pixel(16, 16).0[3], 255);
        assert_eq!(image.get_pixel(24, 16).0[3], 255);
        assert_eq!(image.get_pixel(16, 24).0[3], 255);

        assert_eq!(image.get_pixel(0, 0).0[3], 0);
        assert_eq!(image.get_pixel(24, 24).0[3], 0);
        assert_eq!(image.get_pixel(31, 31).0[3], 0);
    }

    #[test]
    fn test_star_is_symmetric() {
        let sprite = star_sprite();
        let image = sprite.image();
        let opaque = image.pixels().filter(|pixel| pixel.0[3] == 255).count();

        assert!(opaque > 40);
        assert!(opaque < 32 * 32 / 2);
    }
}
