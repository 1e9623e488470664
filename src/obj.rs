use anyhow::{anyhow, Context, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Indexed triangle soup used for ray picking and bounds queries.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub positions: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl TriangleMesh {
    /// Axis-aligned unit cube centred on the origin.
    pub fn unit_cube() -> Self {
        let positions = vec![
            Vec3::new(-0.5, -0.5, 0.5),
            Vec3::new(0.5, -0.5, 0.5),
            Vec3::new(0.5, 0.5, 0.5),
            Vec3::new(-0.5, 0.5, 0.5),
            Vec3::new(-0.5, -0.5, -0.5),
            Vec3::new(0.5, -0.5, -0.5),
            Vec3::new(0.5, 0.5, -0.5),
            Vec3::new(-0.5, 0.5, -0.5),
        ];
        let indices = vec![
            0, 1, 2, 0, 2, 3, // front
            5, 4, 7, 5, 7, 6, // back
            4, 0, 3, 4, 3, 7, // left
            1, 5, 6, 1, 6, 2, // right
            4, 5, 1, 4, 1, 0, // bottom
            3, 2, 6, 3, 6, 7, // top
        ];
        Self { positions, indices }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.indices.chunks_exact(3).map(|tri| {
            [
                self.positions[tri[0] as usize],
                self.positions[tri[1] as usize],
                self.positions[tri[2] as usize],
            ]
        })
    }

    /// Minimum and maximum corners, `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.positions.first()?;
        Some(
            self.positions
                .iter()
                .fold((first, first), |(min, max), p| (min.min(*p), max.max(*p))),
        )
    }

    pub fn center(&self) -> Option<Vec3> {
        self.bounds().map(|(min, max)| (min + max) * 0.5)
    }

    /// Returns a copy scaled about the origin and then moved to `position`.
    pub fn placed(&self, position: Vec3, scale: f32) -> Self {
        Self {
            positions: self
                .positions
                .iter()
                .map(|p| *p * scale + position)
                .collect(),
            indices: self.indices.clone(),
        }
    }
}

/// Parses an OBJ file from memory, keeping positions and triangulated faces.
pub fn load_obj_from_str(data: &str) -> Result<TriangleMesh> {
    let mut positions = Vec::new();
    let mut indices = Vec::new();

    for (line_no, line) in data.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut parts = trimmed.split_whitespace();
        let Some(tag) = parts.next() else {
            continue;
        };
        match tag {
            "v" => positions.push(
                parse_vec3(parts)
                    .with_context(|| format!("invalid vertex on line {}", line_no + 1))?,
            ),
            "f" => {
                let polygon = parse_face(parts, positions.len())
                    .with_context(|| format!("invalid face on line {}", line_no + 1))?;
                for i in 1..(polygon.len() - 1) {
                    indices.extend_from_slice(&[polygon[0], polygon[i], polygon[i + 1]]);
                }
            }
            _ => {}
        }
    }

    if positions.is_empty() {
        return Err(anyhow!("OBJ file does not define any vertices"));
    }
    if indices.is_empty() {
        return Err(anyhow!("OBJ file does not define any faces"));
    }
    Ok(TriangleMesh { positions, indices })
}

fn parse_vec3<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<Vec3> {
    let mut next = || -> Result<f32> {
        Ok(parts
            .next()
            .ok_or_else(|| anyhow!("missing vector component"))?
            .parse::<f32>()?)
    };
    let (x, y, z) = (next()?, next()?, next()?);
    Ok(Vec3::new(x, y, z))
}

/// Resolves the position index of each `v/vt/vn` face corner.
fn parse_face<'a>(parts: impl Iterator<Item = &'a str>, vertex_count: usize) -> Result<Vec<u32>> {
    let mut polygon = Vec::new();
    for part in parts {
        let raw = part
            .split('/')
            .next()
            .ok_or_else(|| anyhow!("missing vertex index"))?
            .parse::<i64>()?;
        let index = fix_index(raw, vertex_count)
            .ok_or_else(|| anyhow!("vertex index {raw} out of range"))?;
        polygon.push(u32::try_from(index)?);
    }
    if polygon.len() < 3 {
        return Err(anyhow!("faces must reference at least 3 vertices"));
    }
    Ok(polygon)
}

/// OBJ indices are one-based; negative values count back from the last vertex.
fn fix_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let resolved = if index > 0 {
        index - 1
    } else if index < 0 {
        len + index
    } else {
        return None;
    };
    (0..len).contains(&resolved).then_some(resolved as usize)
}
