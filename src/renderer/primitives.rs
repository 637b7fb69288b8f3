use glam::Vec3;
use std::f32::consts::PI;

use super::vertex::{v, Vertex};

/// Appends a square face of half-size `half` centred at `normal * offset`.
/// Triangles wind so that (p1 - p0) x (p2 - p0) points along `normal`,
/// which is clockwise seen from the front under left-handed matrices.
fn push_quad(
    vertices: &mut Vec<Vertex>,
    indices: &mut Vec<u32>,
    normal: Vec3,
    u_axis: Vec3,
    half: f32,
    offset: f32,
) {
    let w_axis = normal.cross(u_axis);
    let base = vertices.len() as u32;
    let center = normal * offset;

    for (a, b) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
        let pos = center + (u_axis * a + w_axis * b) * half;
        let uv = [(a + 1.0) * 0.5, 1.0 - (b + 1.0) * 0.5];
        vertices.push(v(
            pos.to_array(),
            normal.to_array(),
            uv,
            [u_axis.x, u_axis.y, u_axis.z, -1.0],
        ));
    }

    indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
}

/// Unit cube centred on the origin, 24 vertices so every face has its own
/// normal and UVs.
pub fn cube_mesh() -> (Vec<Vertex>, Vec<u32>) {
    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    let faces = [
        (Vec3::X, Vec3::Z),
        (Vec3::NEG_X, Vec3::NEG_Z),
        (Vec3::Y, Vec3::X),
        (Vec3::NEG_Y, Vec3::X),
        (Vec3::Z, Vec3::NEG_X),
        (Vec3::NEG_Z, Vec3::X),
    ];
    for (normal, u_axis) in faces {
        push_quad(&mut vertices, &mut indices, normal, u_axis, 0.5, 0.5);
    }

    (vertices, indices)
}

/// 2x2 plane in XZ facing +Y.
pub fn plane_mesh() -> (Vec<Vertex>, Vec<u32>) {
    let mut vertices = Vec::with_capacity(4);
    let mut indices = Vec::with_capacity(6);
    push_quad(&mut vertices, &mut indices, Vec3::Y, Vec3::X, 1.0, 0.0);
    (vertices, indices)
}

/// Unit-radius UV sphere.
pub fn sphere_mesh(segments: u32, rings: u32) -> (Vec<Vertex>, Vec<u32>) {
    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    for ring in 0..=rings {
        let phi = PI * ring as f32 / rings as f32;
        let y = phi.cos();
        let ring_radius = phi.sin();

        for segment in 0..=segments {
            let theta = 2.0 * PI * segment as f32 / segments as f32;
            let x = ring_radius * theta.cos();
            let z = ring_radius * theta.sin();

            let u = segment as f32 / segments as f32;
            let tex_v = ring as f32 / rings as f32;
            let tangent = [-theta.sin(), 0.0, theta.cos(), 1.0];

            vertices.push(v([x, y, z], [x, y, z], [u, tex_v], tangent));
        }
    }

    for ring in 0..rings {
        for segment in 0..segments {
            let current = ring * (segments + 1) + segment;
            let next = current + segments + 1;

            indices.extend_from_slice(&[current, current + 1, next]);
            indices.extend_from_slice(&[current + 1, next + 1, next]);
        }
    }

    (vertices, indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_outward(vertices: &[Vertex], indices: &[u32]) {
        for tri in indices.chunks(3) {
            let p = |i: u32| Vec3::from_array(vertices[i as usize].pos);
            let n = Vec3::from_array(vertices[tri[0] as usize].normal);
            let face = (p(tri[1]) - p(tri[0])).cross(p(tri[2]) - p(tri[0]));
            if face.length_squared() < 1e-12 {
                continue; // degenerate pole triangle
            }
            assert!(face.dot(n) > 0.0, "triangle {tri:?} winds inward");
        }
    }

    #[test]
    fn cube_counts_look_right() {
        let (v, i) = cube_mesh();
        assert_eq!(v.len(), 24);
        assert_eq!(i.len(), 36);
    }

    #[test]
    fn cube_spans_unit_extent() {
        let (v, _) = cube_mesh();
        for vertex in &v {
            assert!(vertex.pos.iter().all(|c| (c.abs() - 0.5).abs() < 1e-6));
        }
    }

    #[test]
    fn primitives_wind_outward() {
        let (v, i) = cube_mesh();
        assert_outward(&v, &i);
        let (v, i) = plane_mesh();
        assert_outward(&v, &i);
        let (v, i) = sphere_mesh(16, 8);
        assert_outward(&v, &i);
    }
}
