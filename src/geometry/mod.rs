//! CPU-side vertex data. Renderers upload it and re-upload whenever
//! [`Geometry::version`] changes.

pub mod primitives;

use glam::Vec3;
use id_arena::Id;

use crate::math::Aabb;

pub use primitives::{icosahedron, sphere};

pub type GeometryId = Id<Geometry>;

#[derive(Debug, Clone)]
pub struct Geometry {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    colors: Option<Vec<Vec3>>,
    indices: Option<Vec<u32>>,
    version: u64,
    disposed: bool,
}

impl Geometry {
    pub fn new(positions: Vec<Vec3>) -> Self {
        Self {
            normals: vec![Vec3::ZERO; positions.len()],
            positions,
            colors: None,
            indices: None,
            version: 0,
            disposed: false,
        }
    }

    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = Some(indices);
        self
    }

    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Self {
        debug_assert_eq!(normals.len(), self.positions.len());
        self.normals = normals;
        self
    }

    pub fn with_colors(mut self, colors: Vec<Vec3>) -> Self {
        debug_assert_eq!(colors.len(), self.positions.len());
        self.colors = Some(colors);
        self
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Mutable access counts as a modification.
    pub fn positions_mut(&mut self) -> &mut [Vec3] {
        self.version += 1;
        &mut self.positions
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn colors(&self) -> Option<&[Vec3]> {
        self.colors.as_deref()
    }

    pub fn indices(&self) -> Option<&[u32]> {
        self.indices.as_deref()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        match &self.indices {
            Some(indices) => indices.len() / 3,
            None => self.positions.len() / 3,
        }
    }

    pub fn bounding_box(&self) -> Option<Aabb> {
        Aabb::from_points(self.positions.iter().copied())
    }

    /// Area-weighted smooth normals. Unindexed geometry is treated as a
    /// triangle soup, which yields flat normals.
    pub fn compute_vertex_normals(&mut self) {
        let mut normals = vec![Vec3::ZERO; self.positions.len()];

        let positions = &self.positions;
        let mut accumulate = |a: usize, b: usize, c: usize| {
            let (Some(&pa), Some(&pb), Some(&pc)) =
                (positions.get(a), positions.get(b), positions.get(c))
            else {
                return;
            };
            let face_normal = (pb - pa).cross(pc - pa);
            normals[a] += face_normal;
            normals[b] += face_normal;
            normals[c] += face_normal;
        };

        match &self.indices {
            Some(indices) => {
                for triangle in indices.chunks_exact(3) {
                    accumulate(
                        triangle[0] as usize,
                        triangle[1] as usize,
                        triangle[2] as usize,
                    );
                }
            }
            None => {
                for first in (0..self.positions.len() / 3 * 3).step_by(3) {
                    accumulate(first, first + 1, first + 2);
                }
            }
        }

        for normal in &mut normals {
            *normal = normal.normalize_or_zero();
        }

        self.normals = normals;
        self.version += 1;
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
    fn test_flat_triangle_normal() {
        let mut geometry = Geometry::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y]);
        geometry.compute_vertex_normals();

        for normal in geometry.normals() {
            assert!((*normal - Vec3::Z).length() < 1e-6);
        }
    }

    #[test]
    fn test_out_of_range_triangles_are_skipped() {
        let mut geometry = Geometry::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z])
            .with_indices(vec![0, 1, 2, 0, 2, 9]);
        geometry.compute_vertex_normals();

        assert!((geometry.normals()[1] - Vec3::Z).length() < 1e-6);
        assert_eq!(geometry.normals()[3], Vec3::ZERO);
    }

    #[test]
    fn test_mutation_bumps_version() {
        let mut geometry = Geometry::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y]);
        let before = geometry.version();

        geometry.positions_mut()[0] = Vec3::NEG_X;
        assert!(geometry.version() > before);
        assert_eq!(geometry.positions()[0], Vec3::NEG_X);
    }
}
