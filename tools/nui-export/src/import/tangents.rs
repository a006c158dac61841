//! Tangent-space generation for normal mapping

use glam::{Vec2, Vec3};

use crate::scene::Face;

/// Below this UV-area determinant a triangle has no usable tangent direction
const DEGENERATE_UV_EPSILON: f32 = 1e-12;

/// Tangent frame from a glTF `TANGENT` (xyz + handedness w)
pub fn frame_from_tangent(normal: [f32; 3], tangent: [f32; 4]) -> ([f32; 3], [f32; 3]) {
    let n = Vec3::from(normal);
    let t = Vec3::new(tangent[0], tangent[1], tangent[2]);
    let bitangent = n.cross(t) * tangent[3];
    (t.to_array(), bitangent.to_array())
}

/// Per-vertex tangents and bitangents accumulated from triangle UV
/// derivatives, orthogonalised against the normal.
///
/// Vertices touched only by degenerate UV triangles get an arbitrary tangent
/// perpendicular to their normal.
pub fn compute_tangents(
    positions: &[[f32; 3]],
    normals: &[[f32; 3]],
    uvs: &[[f32; 2]],
    faces: &[Face],
) -> (Vec<[f32; 3]>, Vec<[f32; 3]>) {
    let count = positions.len();
    let mut tan_accum = vec![Vec3::ZERO; count];
    let mut bitan_accum = vec![Vec3::ZERO; count];

    for face in faces {
        let [a, b, c] = match face.indices.as_slice() {
            &[a, b, c] => [a as usize, b as usize, c as usize],
            _ => continue,
        };
        let limit = count.min(uvs.len());
        if a >= limit || b >= limit || c >= limit {
            continue;
        }

        let p0 = Vec3::from(positions[a]);
        let e1 = Vec3::from(positions[b]) - p0;
        let e2 = Vec3::from(positions[c]) - p0;

        let uv0 = Vec2::from(uvs[a]);
        let d1 = Vec2::from(uvs[b]) - uv0;
        let d2 = Vec2::from(uvs[c]) - uv0;

        let det = d1.x * d2.y - d2.x * d1.y;
        if det.abs() < DEGENERATE_UV_EPSILON {
            continue;
        }
        let r = 1.0 / det;
        let tangent = (e1 * d2.y - e2 * d1.y) * r;
        let bitangent = (e2 * d1.x - e1 * d2.x) * r;

        for i in [a, b, c] {
            tan_accum[i] += tangent;
            bitan_accum[i] += bitangent;
        }
    }

    let mut tangents = Vec::with_capacity(count);
    let mut bitangents = Vec::with_capacity(count);

    for i in 0..count {
        let n = normals
            .get(i)
            .map(|&n| Vec3::from(n).normalize_or_zero())
            .unwrap_or(Vec3::ZERO);

        // Gram-Schmidt
        let mut t = (tan_accum[i] - n * n.dot(tan_accum[i])).normalize_or_zero();
        if t == Vec3::ZERO {
            t = if n == Vec3::ZERO {
                Vec3::X
            } else {
                n.any_orthonormal_vector()
            };
        }

        let handedness = if n.cross(t).dot(bitan_accum[i]) < 0.0 {
            -1.0
        } else {
            1.0
        };

        tangents.push(t.to_array());
        bitangents.push((n.cross(t) * handedness).to_array());
    }

    (tangents, bitangents)
}
