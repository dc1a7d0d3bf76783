//! Axis-aligned bounding boxes and bounding spheres.

use glam::{DMat4, DVec3};
use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box.
///
/// The empty box has `min = +inf` and `max = -inf` so that expanding it by
/// any point yields that point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    pub const EMPTY: Aabb = Aabb {
        min: DVec3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
        max: DVec3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
    };

    /// Box spanning two corners, in any order.
    pub fn new(a: DVec3, b: DVec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Cube of half-extent `half` around `center`.
    pub fn from_center_half_extent(center: DVec3, half: DVec3) -> Self {
        Self::new(center - half, center + half)
    }

    /// True when no point has been accumulated.
    pub fn is_empty(&self) -> bool {
        self.max.x < self.min.x || self.max.y < self.min.y || self.max.z < self.min.z
    }

    pub fn expand_by_point(&mut self, p: DVec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn union(&mut self, other: &Aabb) {
        if other.is_empty() {
            return;
        }
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    pub fn center(&self) -> DVec3 {
        if self.is_empty() {
            return DVec3::ZERO;
        }
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> DVec3 {
        if self.is_empty() {
            return DVec3::ZERO;
        }
        self.max - self.min
    }

    pub fn contains(&self, p: DVec3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// The eight corner points.
    pub fn corners(&self) -> [DVec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            DVec3::new(a.x, a.y, a.z),
            DVec3::new(a.x, a.y, b.z),
            DVec3::new(a.x, b.y, a.z),
            DVec3::new(a.x, b.y, b.z),
            DVec3::new(b.x, a.y, a.z),
            DVec3::new(b.x, a.y, b.z),
            DVec3::new(b.x, b.y, a.z),
            DVec3::new(b.x, b.y, b.z),
        ]
    }

    /// Axis-aligned box enclosing this box after applying `matrix`.
    pub fn transformed(&self, matrix: &DMat4) -> Aabb {
        if self.is_empty() {
            return Aabb::EMPTY;
        }
        let mut out = Aabb::EMPTY;
        for corner in self.corners() {
            out.expand_by_point(matrix.transform_point3(corner));
        }
        out
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// A sphere enclosing an axis-aligned box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingSphere {
    pub center: DVec3,
    pub radius: f64,
}

impl BoundingSphere {
    /// Sphere centered on the box with radius equal to half its diagonal.
    /// Returns `None` for an empty box.
    pub fn from_aabb(aabb: &Aabb) -> Option<Self> {
        if aabb.is_empty() {
            return None;
        }
        Some(Self {
            center: aabb.center(),
            radius: aabb.size().length() * 0.5,
        })
    }
}

#[cfg(test)]
mod tests {
    use glam::{DQuat, EulerRot};

    use super::*;

    #[test]
    fn test_empty_box() {
        let mut aabb = Aabb::EMPTY;
        assert!(aabb.is_empty());
        assert_eq!(aabb.size(), DVec3::ZERO);
        assert!(BoundingSphere::from_aabb(&aabb).is_none());

        aabb.expand_by_point(DVec3::new(1.0, 2.0, 3.0));
        assert!(!aabb.is_empty());
        assert_eq!(aabb.min, aabb.max);
    }

    #[test]
    fn test_union_ignores_empty() {
        let mut aabb = Aabb::new(DVec3::ZERO, DVec3::ONE);
        aabb.union(&Aabb::EMPTY);
        assert_eq!(aabb, Aabb::new(DVec3::ZERO, DVec3::ONE));

        aabb.union(&Aabb::new(DVec3::splat(-1.0), DVec3::ZERO));
        assert_eq!(aabb.min, DVec3::splat(-1.0));
        assert_eq!(aabb.max, DVec3::ONE);
    }

    #[test]
    fn test_transformed_box_encloses_rotated_corners() {
        let unit = Aabb::new(DVec3::splat(-1.0), DVec3::ONE);
        let m = DMat4::from_scale_rotation_translation(
            DVec3::ONE,
            DQuat::from_axis_angle(DVec3::Y, std::f64::consts::FRAC_PI_4),
            DVec3::new(5.0, 0.0, 0.0),
        );
        let out = unit.transformed(&m);
        let half = std::f64::consts::SQRT_2;
        assert!((out.max.x - (5.0 + half)).abs() < 1e-9);
        assert!((out.min.z + half).abs() < 1e-9);
        assert!((out.max.y - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_sphere_radius_is_half_diagonal() {
        let aabb = Aabb::new(DVec3::ZERO, DVec3::new(2.0, 2.0, 1.0));
        let sphere = BoundingSphere::from_aabb(&aabb).unwrap();
        assert_eq!(sphere.center, DVec3::new(1.0, 1.0, 0.5));
        assert!((sphere.radius - 1.5).abs() < 1e-12);
    }

    mod prop {
        use proptest::prelude::*;

        use super::*;

        fn vec3() -> impl Strategy<Value = DVec3> {
            (-50.0..50.0f64, -50.0..50.0f64, -50.0..50.0f64)
                .prop_map(|(x, y, z)| DVec3::new(x, y, z))
        }

        proptest! {
            #[test]
            fn transformed_box_contains_every_transformed_corner(
                a in vec3(),
                b in vec3(),
                t in vec3(),
                angles in (-3.0..3.0f64, -3.0..3.0f64, -3.0..3.0f64),
                s in 0.1..4.0f64,
            ) {
                let aabb = Aabb::new(a, b);
                let rotation = DQuat::from_euler(EulerRot::XYZ, angles.0, angles.1, angles.2);
                let m = DMat4::from_scale_rotation_translation(DVec3::splat(s), rotation, t);
                let out = aabb.transformed(&m);
                let grown = Aabb::new(out.min - DVec3::splat(1e-9), out.max + DVec3::splat(1e-9));
                for corner in aabb.corners() {
                    prop_assert!(grown.contains(m.transform_point3(corner)));
                }
                let sphere = BoundingSphere::from_aabb(&out).unwrap();
                prop_assert!(sphere.radius >= 0.0);
            }
        }
    }
}
