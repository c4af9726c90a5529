use crate::transform::AffineTransform;
use crate::vector::Vector4;

/// A ray in some coordinate space (camera, scene or object space).
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Ray {
    pub origin: Vector4,
    pub direction: Vector4,
}

impl Ray {
    /// Creates a ray, forcing `origin` to be a point and `direction` a vector.
    pub fn new(mut origin: Vector4, mut direction: Vector4) -> Ray {
        if !origin.is_point() {
            origin[3] = 1.0;
        }

        if !direction.is_vector() {
            direction[3] = 0.0;
        }

        Ray { origin, direction }
    }

    pub fn position(&self, t: f64) -> Vector4 {
        self.origin + (t * self.direction)
    }

    /// Moves the ray out of the transform's local space.
    pub fn transform(&self, t: &AffineTransform) -> Ray {
        Ray {
            origin: t.apply(self.origin),
            direction: t.apply(self.direction),
        }
    }

    /// Moves the ray into the transform's local space.
    pub fn inverse_transform(&self, t: &AffineTransform) -> Ray {
        Ray {
            origin: t.apply_inverse(self.origin),
            direction: t.apply_inverse(self.direction),
        }
    }
}

#[test]
fn ray_position() {
    let r = Ray::new(
                Vector4::point(2.0, 3.0, 4.0),
                Vector4::vector(1.0, 0.0, 0.0)
            );

    assert_eq!(r.position(0.0), Vector4::point(2.0, 3.0, 4.0));
    assert_eq!(r.position(1.0), Vector4::point(3.0, 3.0, 4.0));
    assert_eq!(r.position(-1.0), Vector4::point(1.0, 3.0, 4.0));
    assert_eq!(r.position(2.5), Vector4::point(4.5, 3.0, 4.0));
}

#[test]
fn ray_new_fixes_w() {
    let r = Ray::new(
                Vector4::tuple(1.0, 2.0, 3.0, 0.0),
                Vector4::tuple(0.0, 1.0, 0.0, 1.0)
            );

    assert!(r.origin.is_point());
    assert!(r.direction.is_vector());
}

#[test]
fn ray_translation() {
    let r = Ray::new(
                Vector4::point(1.0, 2.0, 3.0),
                Vector4::vector(0.0, 1.0, 0.0)
            );
    let t = AffineTransform::translation(3.0, 4.0, 5.0);
    let moved = r.transform(&t);

    assert_eq!(moved.origin, Vector4::point(4.0, 6.0, 8.0));
    assert_eq!(moved.direction, Vector4::vector(0.0, 1.0, 0.0));
    assert_eq!(moved.inverse_transform(&t), r);
}

#[test]
fn ray_scaling() {
    let r = Ray::new(
                Vector4::point(1.0, 2.0, 3.0),
                Vector4::vector(0.0, 1.0, 0.0)
            );
    let t = AffineTransform::scaling(2.0, 3.0, 4.0);
    let scaled = r.transform(&t);

    assert_eq!(scaled.origin, Vector4::point(2.0, 6.0, 12.0));
    assert_eq!(scaled.direction, Vector4::vector(0.0, 3.0, 0.0));
}
