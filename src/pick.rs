//! Ray picking against the goal object.

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::obj::TriangleMesh;

const EPSILON: f32 = 1e-6;

/// Half-line starting at `origin`. The direction is always unit length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Returns `None` when the direction cannot be normalised or the origin is not finite.
    pub fn new(origin: Vec3, direction: Vec3) -> Option<Self> {
        if !origin.is_finite() {
            return None;
        }
        let direction = direction.try_normalize()?;
        Some(Self { origin, direction })
    }
}

/// Intersection geometry supplied for a pickable object.
pub trait HitGeometry: fmt::Debug + Send + Sync {
    /// Distance along the ray to the first hit, if any.
    fn intersect(&self, ray: &Ray) -> Option<f32>;
}

impl HitGeometry for TriangleMesh {
    fn intersect(&self, ray: &Ray) -> Option<f32> {
        self.triangles()
            .filter_map(|tri| intersect_triangle(ray, tri))
            .min_by(f32::total_cmp)
    }
}

/// Axis-aligned box, the hit geometry when no target model is available.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl HitGeometry for BoundingBox {
    fn intersect(&self, ray: &Ray) -> Option<f32> {
        let inv = ray.direction.recip();
        let t0 = (self.min - ray.origin) * inv;
        let t1 = (self.max - ray.origin) * inv;
        let near = t0.min(t1).max_element().max(0.0);
        let far = t0.max(t1).min_element();
        (near <= far && far.is_finite()).then_some(near)
    }
}

/// Möller-Trumbore, two-sided.
fn intersect_triangle(ray: &Ray, [a, b, c]: [Vec3; 3]) -> Option<f32> {
    let edge1 = b - a;
    let edge2 = c - a;
    let p = ray.direction.cross(edge2);
    let det = edge1.dot(p);
    if det.abs() < EPSILON {
        return None;
    }
    let inv_det = det.recip();
    let s = ray.origin - a;
    let u = s.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(edge1);
    let v = ray.direction.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = edge2.dot(q) * inv_det;
    (t > EPSILON).then_some(t)
}

/// The object the player is hunting for.
#[derive(Debug)]
pub struct TargetObject {
    pub position: Vec3,
    pub scale: f32,
    geometry: Box<dyn HitGeometry>,
    located: bool,
}

impl TargetObject {
    pub fn new(position: Vec3, scale: f32, geometry: Box<dyn HitGeometry>) -> Self {
        Self {
            position,
            scale,
            geometry,
            located: false,
        }
    }

    /// Places a model-space mesh in the world and uses it as hit geometry.
    pub fn from_mesh(mesh: &TriangleMesh, position: Vec3, scale: f32) -> Self {
        Self::new(position, scale, Box::new(mesh.placed(position, scale)))
    }

    /// A cube of edge `scale` centred on `position`, for when there is no model.
    pub fn boxed(position: Vec3, scale: f32) -> Self {
        let half = Vec3::splat(scale * 0.5);
        let bounds = BoundingBox {
            min: position - half,
            max: position + half,
        };
        Self::new(position, scale, Box::new(bounds))
    }

    pub fn is_located(&self) -> bool {
        self.located
    }

    pub fn mark_located(&mut self) {
        self.located = true;
    }
}

/// Casts a ray from the viewpoint and reports whether it hits the target.
///
/// A miss is the ordinary "clicked a wall" case. A located target no longer
/// responds.
pub fn try_pick(view_origin: Vec3, view_direction: Vec3, target: &TargetObject) -> bool {
    if target.located {
        return false;
    }
    Ray::new(view_origin, view_direction)
        .and_then(|ray| target.geometry.intersect(&ray))
        .is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube_at(position: Vec3) -> TargetObject {
        TargetObject::from_mesh(&TriangleMesh::unit_cube(), position, 0.3)
    }

    #[test]
    fn ray_toward_target_hits_and_perpendicular_ray_misses() {
        let position = Vec3::new(-1.77, 2.03, 0.46);
        let target = cube_at(position);
        let eye = Vec3::new(0.0, 2.0, 0.0);
        let toward = position - eye;
        assert!(try_pick(eye, toward, &target));

        let away = Vec3::new(-toward.z, 0.0, toward.x);
        assert!(toward.dot(away).abs() < 1e-5);
        assert!(!try_pick(eye, away, &target));
    }

    #[test]
    fn ray_pointing_backwards_misses() {
        let target = cube_at(Vec3::new(0.0, 0.0, -3.0));
        assert!(!try_pick(Vec3::ZERO, Vec3::Z, &target));
        assert!(try_pick(Vec3::ZERO, Vec3::NEG_Z, &target));
    }

    #[test]
    fn nearest_face_is_reported() {
        let cube = TriangleMesh::unit_cube();
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z).unwrap();
        let distance = cube.intersect(&ray).unwrap();
        assert!((distance - 4.5).abs() < 1e-5);
    }

    #[test]
    fn located_target_is_inert() {
        let mut target = cube_at(Vec3::new(0.0, 0.0, -3.0));
        target.mark_located();
        assert!(!try_pick(Vec3::ZERO, Vec3::NEG_Z, &target));
    }

    #[test]
    fn degenerate_direction_misses() {
        let target = cube_at(Vec3::ZERO);
        assert!(!try_pick(Vec3::new(0.0, 0.0, 2.0), Vec3::ZERO, &target));
        assert!(!try_pick(Vec3::NAN, Vec3::NEG_Z, &target));
    }

    #[test]
    fn bounding_box_matches_mesh() {
        let bounds = BoundingBox {
            min: Vec3::splat(-0.5),
            max: Vec3::splat(0.5),
        };
        let ray = Ray::new(Vec3::new(0.2, 0.1, 5.0), Vec3::NEG_Z).unwrap();
        let box_hit = bounds.intersect(&ray).unwrap();
        let mesh_hit = TriangleMesh::unit_cube().intersect(&ray).unwrap();
        assert!((box_hit - mesh_hit).abs() < 1e-5);
        let miss = Ray::new(Vec3::new(2.0, 0.0, 5.0), Vec3::NEG_Z).unwrap();
        assert!(bounds.intersect(&miss).is_none());
    }

    #[test]
    fn boxed_target_picks_like_the_cube_model() {
        let position = Vec3::new(4.0, 1.5, -2.0);
        let boxed = TargetObject::boxed(position, 0.3);
        let eye = Vec3::new(0.0, 2.0, 0.0);
        assert!(try_pick(eye, position - eye, &boxed));
        assert!(try_pick(eye, position + Vec3::new(0.0, 0.14, 0.0) - eye, &boxed));
        assert!(!try_pick(eye, position + Vec3::new(0.0, 0.4, 0.0) - eye, &boxed));
        assert!(!try_pick(eye, eye - position, &boxed));
    }
}
