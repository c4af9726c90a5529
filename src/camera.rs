use crate::error::MathError;
use crate::matrix::Matrix4;
use crate::ray::Ray;
use crate::transform::AffineTransform;
use crate::vector::Vector4;

/// A camera record for generating an image.
///
/// The whole camera lives in its transform. Camera space looks down `+z`, with
/// `+x` to the right and `+y` up, and the screen spans `[-1, 1]` on both axes
/// at `z = 1`. The transform maps that frustum into the scene, so its columns
/// read as:
///
/// * column 0: the screen's half-width vector,
/// * column 1: the screen's half-height vector,
/// * column 2: the line of sight, whose length is the focal length,
/// * column 3: the camera position.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Camera {
    pub transform: AffineTransform,
}

impl Camera {
    /// A camera at the origin looking down `+z`.
    ///
    /// Larger `width` and `height` relative to `focal_length` give a wider
    /// field of view. Zero or non-finite dimensions fail with
    /// `MathError::NonInvertible`.
    pub fn new(width: f64, height: f64, focal_length: f64) -> Result<Camera, MathError> {
        Ok(Camera {
            transform: AffineTransform::try_scaling(width, height, focal_length)?,
        })
    }

    pub fn from_transform(transform: AffineTransform) -> Camera {
        Camera { transform }
    }

    /// A camera at `from`, looking at `to`, with `up` pointing roughly up on
    /// screen.
    ///
    /// Fails with `MathError::NonInvertible` when `up` is parallel to the line
    /// of sight or `from == to`.
    pub fn look_at(from: Vector4, to: Vector4, up: Vector4,
        width: f64, height: f64, focal_length: f64) -> Result<Camera, MathError> {
        let sight = to - from;
        let right = up.cross(&sight);
        if sight.length2() == 0.0 || right.length2() == 0.0 {
            return Err(MathError::NonInvertible);
        }

        let forward = sight.normalize();
        let right = right.normalize();
        let true_up = forward.cross(&right);

        let origin = Vector4::point(from.x(), from.y(), from.z());
        let matrix = Matrix4::new([
            right * width,
            true_up * height,
            forward * focal_length,
            origin,
        ]);

        Ok(Camera { transform: AffineTransform::new(matrix)? })
    }

    pub fn position(&self) -> Vector4 {
        self.transform.origin()
    }

    pub fn width(&self) -> f64 {
        self.transform.matrix().column(0).length()
    }

    pub fn height(&self) -> f64 {
        self.transform.matrix().column(1).length()
    }

    pub fn focal_length(&self) -> f64 {
        self.transform.matrix().column(2).length()
    }

    pub fn line_of_sight(&self) -> Vector4 {
        *self.transform.matrix().column(2)
    }

    /// The scene-space ray through screen coordinates `(x, y)` in `[-1, 1]`.
    ///
    /// The direction is not normalized.
    pub fn ray_through_screen(&self, x: f64, y: f64) -> Ray {
        let direction = self.transform.apply(Vector4::vector(x, y, 1.0));

        Ray::new(self.position(), direction)
    }
}

#[test]
fn camera_dimensions() {
    let c = Camera::new(16.0 / 9.0, 1.0, 2.0).unwrap();

    assert!(crate::feq(c.width(), 16.0 / 9.0));
    assert!(crate::feq(c.height(), 1.0));
    assert!(crate::feq(c.focal_length(), 2.0));
    assert_eq!(c.line_of_sight(), Vector4::vector(0.0, 0.0, 2.0));
    assert_eq!(c.position(), Vector4::point(0.0, 0.0, 0.0));
}

#[test]
fn ray_through_center() {
    let mut c = Camera::new(2.0, 1.0, 2.0).unwrap();
    c.transform = c.transform.translate(0.0, 0.0, -10.0);
    let r = c.ray_through_screen(0.0, 0.0);

    assert_eq!(r.origin, Vector4::point(0.0, 0.0, -10.0));
    assert_eq!(r.direction, Vector4::vector(0.0, 0.0, 2.0));
}

#[test]
fn ray_through_corner() {
    let c = Camera::new(2.0, 1.0, 2.0).unwrap();
    let r = c.ray_through_screen(-1.0, 1.0);

    assert_eq!(r.origin, Vector4::point(0.0, 0.0, 0.0));
    assert_eq!(r.direction, Vector4::vector(-2.0, 1.0, 2.0));
}

#[test]
fn look_at_matches_translated_camera() {
    let looking = Camera::look_at(
        Vector4::point(0.0, 0.0, -5.0),
        Vector4::point(0.0, 0.0, 0.0),
        Vector4::vector(0.0, 1.0, 0.0),
        1.5, 1.0, 2.0
    ).unwrap();

    let expected = Camera::from_transform(
        AffineTransform::scaling(1.5, 1.0, 2.0).translate(0.0, 0.0, -5.0)
    );

    assert_eq!(looking, expected);
}

#[test]
fn look_at_rejects_parallel_up() {
    let c = Camera::look_at(
        Vector4::point(0.0, 0.0, 0.0),
        Vector4::point(0.0, 3.0, 0.0),
        Vector4::vector(0.0, 1.0, 0.0),
        1.0, 1.0, 1.0
    );

    assert_eq!(c, Err(MathError::NonInvertible));
}

#[test]
fn look_at_rejects_coincident_points() {
    let c = Camera::look_at(
        Vector4::point(1.0, 2.0, 3.0),
        Vector4::point(1.0, 2.0, 3.0),
        Vector4::vector(0.0, 1.0, 0.0),
        1.0, 1.0, 1.0
    );

    assert_eq!(c, Err(MathError::NonInvertible));
}

#[test]
fn flat_camera_is_rejected() {
    assert_eq!(Camera::new(0.0, 1.0, 1.0), Err(MathError::NonInvertible));
    assert_eq!(Camera::new(1.0, 1.0, 0.0), Err(MathError::NonInvertible));
}
