use crate::error::MathError;
use crate::matrix::Matrix4;
use crate::ray::Ray;
use crate::transform::AffineTransform;
use crate::vector::Vector4;

/// A surface point and normal found by a geometry, in the geometry's own
/// local space. The normal is not necessarily normalized.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SurfaceHit {
    pub point: Vector4,
    pub normal: Vector4,
}

/// A single triangle, stored as the affine map from the unit right triangle
/// `(0,0)`, `(1,0)`, `(0,1)` in the local XY plane to its real vertices.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Triangle {
    transform: AffineTransform,
}

impl Triangle {
    /// Builds the triangle `a`, `b`, `c`.
    ///
    /// Degenerate (zero area) triangles have no such map and are rejected
    /// with `MathError::NonInvertible`.
    pub fn new(a: Vector4, b: Vector4, c: Vector4) -> Result<Triangle, MathError> {
        let ab = as_vector(b - a);
        let ac = as_vector(c - a);
        let n = ab.cross(&ac);
        let origin = Vector4::point(a.x(), a.y(), a.z());

        let transform = AffineTransform::new(Matrix4::new([ab, ac, n, origin]))?;

        Ok(Triangle { transform })
    }

    pub fn transform(&self) -> &AffineTransform {
        &self.transform
    }

    /// Returns the hit in the triangle's parent space, together with the
    /// squared distance from the ray origin.
    fn intersect_with_ray(&self, ray: &Ray) -> Option<(SurfaceHit, f64)> {
        let local = ray.inverse_transform(&self.transform);
        let (hit, offset) = xy_plane_hit(&local)?;

        let (x, y) = (hit.point.x(), hit.point.y());
        if x < 0.0 || y < 0.0 || x + y > 1.0 {
            return None;
        }

        let distance2 = self.transform.apply(offset).length2();
        let hit = SurfaceHit {
            point: self.transform.apply(hit.point),
            normal: self.transform.apply(hit.normal),
        };

        Some((hit, distance2))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    /// The infinite `z = 0` plane. Its normal faces the side the ray comes
    /// from.
    XyPlane,

    /// The unit sphere centered at the local origin. Its normal faces outward
    /// for rays starting outside and inward for rays starting inside.
    UnitSphere,

    /// A batch of triangles. The nearest hit wins, and on equal distance the
    /// earlier triangle is kept.
    Triangles(Vec<Triangle>),
}

impl Geometry {
    /// Builds a triangle batch from vertex triples.
    pub fn triangles(vertices: &[[Vector4; 3]]) -> Result<Geometry, MathError> {
        let triangles = vertices.iter()
            .map(|[a, b, c]| Triangle::new(*a, *b, *c))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Geometry::Triangles(triangles))
    }

    /// Intersects a ray given in the geometry's local space.
    ///
    /// Only hits in front of the ray origin are reported.
    pub fn intersect_with_ray(&self, ray: &Ray) -> Option<SurfaceHit> {
        match self {
            Geometry::XyPlane => xy_plane_hit(ray).map(|(hit, _)| hit),
            Geometry::UnitSphere => unit_sphere_hit(ray),
            Geometry::Triangles(triangles) => {
                let mut nearest: Option<(SurfaceHit, f64)> = None;

                for triangle in triangles.iter() {
                    if let Some((hit, distance2)) = triangle.intersect_with_ray(ray) {
                        if !distance2.is_finite() {
                            continue;
                        }

                        match nearest {
                            Some((_, best)) if best <= distance2 => {},
                            _ => nearest = Some((hit, distance2)),
                        }
                    }
                }

                nearest.map(|(hit, _)| hit)
            },
        }
    }
}

fn as_vector(v: Vector4) -> Vector4 {
    Vector4::vector(v.x(), v.y(), v.z())
}

/// Intersects a ray with the `z = 0` plane. Also returns the offset from the
/// ray origin to the hit.
fn xy_plane_hit(ray: &Ray) -> Option<(SurfaceHit, Vector4)> {
    let oz = ray.origin.z();
    let dz = ray.direction.z();

    // Parallel to the plane, or moving away from it.
    if oz * dz >= 0.0 {
        return None;
    }

    let offset = ray.direction * (-oz / dz);
    let side = if oz > 0.0 { 1.0 } else { -1.0 };

    let hit = SurfaceHit {
        point: ray.origin + offset,
        normal: Vector4::vector(0.0, 0.0, side),
    };

    Some((hit, offset))
}

fn unit_sphere_hit(ray: &Ray) -> Option<SurfaceHit> {
    let r = as_vector(ray.origin);
    let d = ray.direction;

    // Solve a*t^2 + b*t + c = 0 for r + t*d on the sphere.
    let a = d.dot(&d);
    let b = 2.0 * r.dot(&d);
    let c = r.dot(&r) - 1.0;

    // Outside the sphere and moving away from it.
    if b > 0.0 && c > 0.0 {
        return None;
    }

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }

    let t1 = (-b - discriminant.sqrt()) / (2.0 * a);
    let t2 = (-b + discriminant.sqrt()) / (2.0 * a);

    let t = match (t1 >= 0.0, t2 >= 0.0) {
        (true, true) => t1.min(t2),
        (true, false) => t1,
        (false, true) => t2,
        (false, false) => return None,
    };

    let mut normal = r + d * t;
    if r.length2() < 1.0 {
        normal = -normal;
    }

    Some(SurfaceHit { point: ray.position(t), normal })
}

#[test]
fn plane_hit_from_above() {
    let ray = Ray::new(Vector4::point(1.0, 2.0, 3.0),
                       Vector4::vector(3.0, 2.0, -1.0));
    let hit = Geometry::XyPlane.intersect_with_ray(&ray).unwrap();

    assert_eq!(hit.point, Vector4::point(10.0, 8.0, 0.0));
    assert_eq!(hit.normal.normalize(), Vector4::vector(0.0, 0.0, 1.0));
}

#[test]
fn plane_missed_when_moving_away() {
    let ray = Ray::new(Vector4::point(1.0, 2.0, 3.0),
                       Vector4::vector(-3.0, -2.0, 1.0));

    assert_eq!(Geometry::XyPlane.intersect_with_ray(&ray), None);
}

#[test]
fn plane_missed_when_parallel() {
    let ray = Ray::new(Vector4::point(1.0, 2.0, 3.0),
                       Vector4::vector(1.0, 0.0, 0.0));

    assert_eq!(Geometry::XyPlane.intersect_with_ray(&ray), None);
}

#[test]
fn plane_hit_from_below() {
    let ray = Ray::new(Vector4::point(0.0, 0.0, -2.0),
                       Vector4::vector(0.0, 1.0, 1.0));
    let hit = Geometry::XyPlane.intersect_with_ray(&ray).unwrap();

    assert_eq!(hit.point, Vector4::point(0.0, 2.0, 0.0));
    assert_eq!(hit.normal, Vector4::vector(0.0, 0.0, -1.0));
}

#[test]
fn sphere_hit_from_outside() {
    let ray = Ray::new(Vector4::point(0.0, 0.0, -5.0),
                       Vector4::vector(0.0, 0.0, 1.0));
    let hit = Geometry::UnitSphere.intersect_with_ray(&ray).unwrap();

    assert_eq!(hit.point, Vector4::point(0.0, 0.0, -1.0));
    assert_eq!(hit.normal.normalize(), Vector4::vector(0.0, 0.0, -1.0));
}

#[test]
fn sphere_inside_and_outside_agree() {
    let inside = Ray::new(Vector4::point(0.0, 0.0, 0.0),
                          Vector4::vector(0.0, 0.0, 1.0));
    let outside = Ray::new(Vector4::point(0.0, 0.0, 3.0),
                           Vector4::vector(0.0, 0.0, -1.0));

    let from_inside = Geometry::UnitSphere.intersect_with_ray(&inside).unwrap();
    let from_outside = Geometry::UnitSphere.intersect_with_ray(&outside).unwrap();

    assert_eq!(from_inside.point, from_outside.point);
    assert_eq!(from_inside.point, Vector4::point(0.0, 0.0, 1.0));
    assert_eq!(from_inside.normal.normalize(), -from_outside.normal.normalize());
    assert_eq!(from_outside.normal.normalize(), Vector4::vector(0.0, 0.0, 1.0));
}

#[test]
fn sphere_behind_ray_is_missed() {
    let ray = Ray::new(Vector4::point(0.0, 0.0, 5.0),
                       Vector4::vector(0.0, 0.0, 1.0));

    assert_eq!(Geometry::UnitSphere.intersect_with_ray(&ray), None);
}

#[test]
fn sphere_missed_off_axis() {
    let ray = Ray::new(Vector4::point(0.0, 2.0, -5.0),
                       Vector4::vector(0.0, 0.0, 1.0));

    assert_eq!(Geometry::UnitSphere.intersect_with_ray(&ray), None);
}

#[test]
fn triangle_hit_and_miss() {
    let tri = Geometry::triangles(&[[
        Vector4::point(0.0, 1.0, 0.0),
        Vector4::point(-1.0, 0.0, 0.0),
        Vector4::point(1.0, 0.0, 0.0),
    ]]).unwrap();

    let through = Ray::new(Vector4::point(0.0, 0.5, -2.0),
                           Vector4::vector(0.0, 0.0, 1.0));
    let hit = tri.intersect_with_ray(&through).unwrap();
    assert_eq!(hit.point, Vector4::point(0.0, 0.5, 0.0));
    assert!(feq_abs(hit.normal.normalize().z(), 1.0));

    let past_edge = Ray::new(Vector4::point(1.0, 1.0, -2.0),
                             Vector4::vector(0.0, 0.0, 1.0));
    assert_eq!(tri.intersect_with_ray(&past_edge), None);
}

#[test]
fn triangles_keep_nearest() {
    let far = [
        Vector4::point(-1.0, -1.0, 5.0),
        Vector4::point(1.0, -1.0, 5.0),
        Vector4::point(0.0, 1.0, 5.0),
    ];
    let near = [
        Vector4::point(-1.0, -1.0, 2.0),
        Vector4::point(1.0, -1.0, 2.0),
        Vector4::point(0.0, 1.0, 2.0),
    ];
    let tris = Geometry::triangles(&[far, near]).unwrap();

    let ray = Ray::new(Vector4::point(0.0, 0.0, 0.0),
                       Vector4::vector(0.0, 0.0, 1.0));
    let hit = tris.intersect_with_ray(&ray).unwrap();

    assert_eq!(hit.point, Vector4::point(0.0, 0.0, 2.0));
}

#[test]
fn degenerate_triangle_is_rejected() {
    let flat = Geometry::triangles(&[[
        Vector4::point(0.0, 0.0, 0.0),
        Vector4::point(1.0, 1.0, 1.0),
        Vector4::point(2.0, 2.0, 2.0),
    ]]);

    assert_eq!(flat, Err(MathError::NonInvertible));
}

#[cfg(test)]
fn feq_abs(a: f64, b: f64) -> bool {
    crate::feq(a.abs(), b.abs())
}
