use std::collections::HashMap;
use std::f32::consts::PI;

use glam::Vec3;

use crate::geometry::Geometry;

const ICOSAHEDRON_FACES: [[usize; 3]; 20] = [
    [0, 11, 5],
    [0, 5, 1],
    [0, 1, 7],
    [0, 7, 10],
    [0, 10, 11],
    [1, 5, 9],
    [5, 11, 4],
    [11, 10, 2],
    [10, 7, 6],
    [7, 1, 8],
    [3, 9, 4],
    [3, 4, 2],
    [3, 2, 6],
    [3, 6, 8],
    [3, 8, 9],
    [4, 9, 5],
    [2, 4, 11],
    [6, 2, 10],
    [8, 6, 7],
    [9, 8, 1],
];

fn icosahedron_corners() -> [Vec3; 12] {
    let t = (1.0 + 5.0_f32.sqrt()) / 2.0;

    [
        Vec3::new(-1.0, t, 0.0),
        Vec3::new(1.0, t, 0.0),
        Vec3::new(-1.0, -t, 0.0),
        Vec3::new(1.0, -t, 0.0),
        Vec3::new(0.0, -1.0, t),
        Vec3::new(0.0, 1.0, t),
        Vec3::new(0.0, -1.0, -t),
        Vec3::new(0.0, 1.0, -t),
        Vec3::new(t, 0.0, -1.0),
        Vec3::new(t, 0.0, 1.0),
        Vec3::new(-t, 0.0, -1.0),
        Vec3::new(-t, 0.0, 1.0),
    ]
}

/// A point of the subdivided icosahedron, named by the corners it lies
/// between and its integer weight towards each. Points on a shared edge or
/// corner get the same key from every face that touches them.
type LatticeKey = [(usize, u32); 3];

fn lattice_key(mut weights: LatticeKey) -> LatticeKey {
    for weight in &mut weights {
        if weight.1 == 0 {
            *weight = (usize::MAX, 0);
        }
    }
    weights.sort_unstable();
    weights
}

/// Shares vertices between faces by lattice position, so shared edges get
/// shared normals.
struct Lattice {
    corners: [Vec3; 12],
    divisions: u32,
    radius: f32,
    positions: Vec<Vec3>,
    lookup: HashMap<LatticeKey, u32>,
}

impl Lattice {
    fn new(divisions: u32, radius: f32) -> Self {
        Self {
            corners: icosahedron_corners(),
            divisions,
            radius,
            positions: Vec::new(),
            lookup: HashMap::new(),
        }
    }

    fn index_of(&mut self, weights: LatticeKey) -> u32 {
        let key = lattice_key(weights);
        if let Some(&index) = self.lookup.get(&key) {
            return index;
        }

        // computed from the canonical key so every face agrees on the position
        let point = key
            .iter()
            .filter(|(_, weight)| *weight > 0)
            .map(|&(corner, weight)| self.corners[corner] * weight as f32)
            .sum::<Vec3>()
            / self.divisions as f32;

        let index = self.positions.len() as u32;
        self.positions.push(point.normalize() * self.radius);
        self.lookup.insert(key, index);
        index
    }
}

/// Icosahedron with each face split into `(detail + 1)^2` triangles and every
/// vertex pushed onto the sphere of `radius`.
pub fn icosahedron(radius: f32, detail: u32) -> Geometry {
    let columns = detail + 1;
    let mut lattice = Lattice::new(columns, radius);
    let face_triangles = (columns * columns) as usize;
    let mut indices = Vec::with_capacity(20 * face_triangles * 3);

    for [a, b, c] in ICOSAHEDRON_FACES {
        // rows[i][j]: i walks from the a-b edge towards c
        let rows: Vec<Vec<u32>> = (0..=columns)
            .map(|i| {
                (0..=columns - i)
                    .map(|j| lattice.index_of([(a, columns - i - j), (b, j), (c, i)]))
                    .collect()
            })
            .collect();

        let columns = columns as usize;
        for i in 0..columns {
            for j in 0..2 * (columns - i) - 1 {
                let k = j / 2;
                let triangle = if j % 2 == 0 {
                    [rows[i][k + 1], rows[i + 1][k], rows[i][k]]
                } else {
                    [rows[i][k + 1], rows[i + 1][k + 1], rows[i + 1][k]]
                };
                push_outward(&lattice.positions, &mut indices, triangle);
            }
        }
    }

    let mut geometry = Geometry::new(lattice.positions).with_indices(indices);
    geometry.compute_vertex_normals();
    geometry
}

// Keeps winding counter-clockwise when seen from outside a convex shape
// centered on the origin.
fn push_outward(positions: &[Vec3], indices: &mut Vec<u32>, [a, b, c]: [u32; 3]) {
    let (pa, pb, pc) = (
        positions[a as usize],
        positions[b as usize],
        positions[c as usize],
    );
    let normal = (pb - pa).cross(pc - pa);

    if normal.dot(pa + pb + pc) >= 0.0 {
        indices.extend([a, b, c]);
    } else {
        indices.extend([a, c, b]);
    }
}

pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Geometry {
    let width_segments = width_segments.max(3);
    let height_segments = height_segments.max(2);

    let mut positions = Vec::new();
    let mut normals = Vec::new();

    for lat in 0..=height_segments {
        let theta = lat as f32 * PI / height_segments as f32;
        let (sin_theta, cos_theta) = theta.sin_cos();

        for long in 0..=width_segments {
            let phi = long as f32 * 2.0 * PI / width_segments as f32;
            let (sin_phi, cos_phi) = phi.sin_cos();

            let normal = Vec3::new(-cos_phi * sin_theta, cos_theta, sin_phi * sin_theta);
            positions.push(normal * radius);
            normals.push(normal);
        }
    }

    let mut indices = Vec::new();
    for lat in 0..height_segments {
        for long in 0..width_segments {
            let first = lat * (width_segments + 1) + long;
            let second = first + width_segments + 1;

            if lat != 0 {
                push_outward(&positions, &mut indices, [first, second, first + 1]);
            }
            if lat != height_segments - 1 {
                push_outward(&positions, &mut indices, [second, second + 1, first + 1]);
            }
        }
    }

    Geometry::new(positions)
        .with_normals(normals)
        .with_indices(indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icosahedron_base_shape() {
        let geometry = icosahedron(1.0, 0);
        assert_eq!(geometry.vertex_count(), 12);
        assert_eq!(geometry.triangle_count(), 20);
    }

    #[test]
    fn test_icosahedron_subdivision_is_welded() {
        let detail = 30;
        let geometry = icosahedron(2.0, detail);
        let columns = detail as usize + 1;

        assert_eq!(geometry.triangle_count(), 20 * columns * columns);
        assert_eq!(geometry.vertex_count(), 10 * columns * columns + 2);

        for position in geometry.positions() {
            assert!((position.length() - 2.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_shared_edge_points_share_a_key() {
        // the midpoint of edge 0-11 seen from two adjacent faces
        let from_first = lattice_key([(0, 2), (11, 2), (5, 0)]);
        let from_second = lattice_key([(0, 2), (10, 0), (11, 2)]);
        assert_eq!(from_first, from_second);
    }

    #[test]
    fn test_icosahedron_normals_point_outward() {
        let geometry = icosahedron(2.0, 4);
        for (position, normal) in geometry.positions().iter().zip(geometry.normals()) {
            assert!(position.normalize().dot(*normal) > 0.95);
        }
    }

    #[test]
    fn test_sphere_generation() {
        let sphere = sphere(0.5, 32, 32);
        assert_eq!(sphere.vertex_count(), 33 * 33);
        assert_eq!(sphere.normals().len(), sphere.vertex_count());

        let bounds = sphere.bounding_box().unwrap();
        assert!((bounds.size() - glam::Vec3::splat(1.0)).length() < 1e-3);
    }
}
