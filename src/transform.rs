use crate::error::MathError;
use crate::matrix::{ Matrix3, Matrix4 };
use crate::vector::{ Vector3, Vector4 };

/// An affine transform together with its inverse.
///
/// Both matrices are kept consistent by every constructor and composition
/// method, so the inverse never has to be recomputed at render time. Ray
/// tracing needs the forward matrix to move results back into scene space and
/// the inverse to move rays into object space.
///
/// Composition is builder-style. Each call appends a step that happens
/// *after* everything already in the transform:
///
/// ```
/// # use spectral_tracer::transform::AffineTransform;
/// # use spectral_tracer::vector::Vector4;
/// let t = AffineTransform::identity()
///     .scale(2.0, 2.0, 2.0)
///     .translate(1.0, 0.0, 0.0);
///
/// // Scaled first, then moved.
/// assert_eq!(t.apply(Vector4::point(1.0, 1.0, 1.0)),
///     Vector4::point(3.0, 2.0, 2.0));
/// assert_eq!(t.apply_inverse(Vector4::point(3.0, 2.0, 2.0)),
///     Vector4::point(1.0, 1.0, 1.0));
/// ```
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AffineTransform {
    matrix: Matrix4,
    inverse: Matrix4,
}

impl Default for AffineTransform {
    fn default() -> AffineTransform {
        AffineTransform::identity()
    }
}

impl AffineTransform {
    /// The identity transform.
    pub fn identity() -> AffineTransform {
        AffineTransform {
            matrix: Matrix4::identity(),
            inverse: Matrix4::identity(),
        }
    }

    /// Wraps an affine matrix, computing its inverse.
    ///
    /// The bottom row must be `(0, 0, 0, 1)`; general projective matrices
    /// would need a full 4x4 inverse, which is not supported. The inverse is
    /// built from the closed-form inverse of the upper-left 3x3 linear part,
    /// so a singular linear part yields `MathError::NonInvertible`.
    pub fn new(matrix: Matrix4) -> Result<AffineTransform, MathError> {
        let inverse = affine_inverse(&matrix)?;
        Ok(AffineTransform { matrix, inverse })
    }

    /// Builds a transform from the matrix of its inverse.
    pub fn from_inverse_matrix(inverse: Matrix4)
        -> Result<AffineTransform, MathError> {
        let matrix = affine_inverse(&inverse)?;
        Ok(AffineTransform { matrix, inverse })
    }

    /// The forward matrix, mapping object space to scene space.
    pub fn matrix(&self) -> &Matrix4 {
        &self.matrix
    }

    /// The inverse matrix, mapping scene space to object space.
    pub fn inverse_matrix(&self) -> &Matrix4 {
        &self.inverse
    }

    /// The image of the local origin.
    pub fn origin(&self) -> Vector4 {
        *self.matrix.column(3)
    }

    pub fn translation(x: f64, y: f64, z: f64) -> AffineTransform {
        let mut t = AffineTransform::identity();
        *t.matrix.column_mut(3) += Vector4::vector(x, y, z);
        *t.inverse.column_mut(3) -= Vector4::vector(x, y, z);

        t
    }

    /// Scales along the X, Y and Z axes.
    ///
    /// Every factor must be finite and nonzero, otherwise the inverse holds
    /// infinities. Use `try_scaling` for factors that are not known to be
    /// valid.
    pub fn scaling(x: f64, y: f64, z: f64) -> AffineTransform {
        let mut t = AffineTransform::identity();
        t.matrix[(0, 0)] = x;
        t.matrix[(1, 1)] = y;
        t.matrix[(2, 2)] = z;
        t.inverse[(0, 0)] = 1.0 / x;
        t.inverse[(1, 1)] = 1.0 / y;
        t.inverse[(2, 2)] = 1.0 / z;

        t
    }

    /// Scales along the X, Y and Z axes, failing with
    /// `MathError::NonInvertible` on a zero or non-finite factor.
    pub fn try_scaling(x: f64, y: f64, z: f64) -> Result<AffineTransform, MathError> {
        if [x, y, z].iter().any(|f| *f == 0.0 || !f.is_finite()) {
            return Err(MathError::NonInvertible);
        }

        Ok(AffineTransform::scaling(x, y, z))
    }

    /// Rotates counterclockwise about the X axis (looking down the axis
    /// towards the origin). `angle` is in radians.
    pub fn rotation_x(angle: f64) -> AffineTransform {
        let rotation = |a: f64| {
            let mut m = Matrix4::identity();
            m[(1, 1)] =  a.cos();
            m[(1, 2)] = -a.sin();
            m[(2, 1)] =  a.sin();
            m[(2, 2)] =  a.cos();
            m
        };

        AffineTransform { matrix: rotation(angle), inverse: rotation(-angle) }
    }

    /// Rotates counterclockwise about the Y axis. `angle` is in radians.
    pub fn rotation_y(angle: f64) -> AffineTransform {
        let rotation = |a: f64| {
            let mut m = Matrix4::identity();
            m[(0, 0)] =  a.cos();
            m[(0, 2)] =  a.sin();
            m[(2, 0)] = -a.sin();
            m[(2, 2)] =  a.cos();
            m
        };

        AffineTransform { matrix: rotation(angle), inverse: rotation(-angle) }
    }

    /// Rotates counterclockwise about the Z axis. `angle` is in radians.
    pub fn rotation_z(angle: f64) -> AffineTransform {
        let rotation = |a: f64| {
            let mut m = Matrix4::identity();
            m[(0, 0)] =  a.cos();
            m[(0, 1)] = -a.sin();
            m[(1, 0)] =  a.sin();
            m[(1, 1)] =  a.cos();
            m
        };

        AffineTransform { matrix: rotation(angle), inverse: rotation(-angle) }
    }

    /// Appends `other`: the result applies `self` first, then `other`.
    pub fn compose(self, other: &AffineTransform) -> AffineTransform {
        AffineTransform {
            matrix: other.matrix * self.matrix,
            inverse: self.inverse * other.inverse,
        }
    }

    pub fn translate(self, x: f64, y: f64, z: f64) -> AffineTransform {
        self.compose(&AffineTransform::translation(x, y, z))
    }

    pub fn scale(self, x: f64, y: f64, z: f64) -> AffineTransform {
        self.compose(&AffineTransform::scaling(x, y, z))
    }

    pub fn scale_uniform(self, factor: f64) -> AffineTransform {
        self.scale(factor, factor, factor)
    }

    /// Like `scale`, but rejects factors that cannot be undone.
    pub fn try_scale(self, x: f64, y: f64, z: f64) -> Result<AffineTransform, MathError> {
        Ok(self.compose(&AffineTransform::try_scaling(x, y, z)?))
    }

    pub fn rotate_x(self, angle: f64) -> AffineTransform {
        self.compose(&AffineTransform::rotation_x(angle))
    }

    pub fn rotate_y(self, angle: f64) -> AffineTransform {
        self.compose(&AffineTransform::rotation_y(angle))
    }

    pub fn rotate_z(self, angle: f64) -> AffineTransform {
        self.compose(&AffineTransform::rotation_z(angle))
    }

    /// Moves the local origin to `(x, y, z)`, keeping the linear part.
    pub fn set_origin(mut self, x: f64, y: f64, z: f64) -> AffineTransform {
        let origin = Vector4::point(x, y, z);
        *self.matrix.column_mut(3) = origin;

        // Zero the inverse's translation so it only applies the linear part.
        *self.inverse.column_mut(3) = Vector4::point(0.0, 0.0, 0.0);
        let back = self.inverse * Vector4::vector(-x, -y, -z);
        *self.inverse.column_mut(3) = Vector4::point(back.x(), back.y(), back.z());

        self
    }

    /// Maps a point or direction from object space into scene space.
    pub fn apply(&self, v: Vector4) -> Vector4 {
        self.matrix * v
    }

    /// Maps a point or direction from scene space into object space.
    pub fn apply_inverse(&self, v: Vector4) -> Vector4 {
        self.inverse * v
    }

    /// Maps a surface normal from object space into scene space.
    ///
    /// Normals transform by the inverse transpose so they stay perpendicular
    /// to the surface under non-uniform scaling.
    pub fn apply_to_normal(&self, normal: Vector4) -> Vector4 {
        let n = self.inverse.transposition() * normal;
        Vector4::vector(n.x(), n.y(), n.z())
    }
}

/// Inverts an affine 4x4 matrix through its linear part and translation.
fn affine_inverse(m: &Matrix4) -> Result<Matrix4, MathError> {
    let bottom = m.row(3);
    if bottom != Vector4::tuple(0.0, 0.0, 0.0, 1.0) {
        return Err(MathError::UnsupportedSize(4));
    }

    let mut linear = Matrix3::zero();
    for r in 0..3 {
        for c in 0..3 {
            linear[(r, c)] = m[(r, c)];
        }
    }

    let linear_inv = linear.inverse()?;
    let t = m.column(3).xyz();
    let t_inv: Vector3 = -(linear_inv * t);

    let mut inv = Matrix4::identity();
    for r in 0..3 {
        for c in 0..3 {
            inv[(r, c)] = linear_inv[(r, c)];
        }
        inv[(r, 3)] = t_inv[r];
    }

    Ok(inv)
}

#[test]
fn translate_moves_points_not_vectors() {
    let point = Vector4::point(1.0, 2.0, 3.0);
    let vector = Vector4::vector(1.0, 2.0, 3.0);

    let transform = AffineTransform::identity().translate(2.0, 0.0, 1.0);

    assert_eq!(transform.apply(point), Vector4::point(3.0, 2.0, 4.0));
    assert_eq!(transform.apply(vector), vector);
}

#[test]
fn scale_stretches_differences() {
    let point1 = Vector4::point(1.0, 2.0, 3.0);
    let point2 = Vector4::point(2.0, 0.0, 1.0);
    let vector = Vector4::vector(1.0, 2.0, 3.0);

    let transform = AffineTransform::identity().scale_uniform(2.0);

    assert_eq!(transform.apply(vector), vector * 2.0);
    assert_eq!(transform.apply(point2) - transform.apply(point1),
        (point2 - point1) * 2.0);
}

#[test]
fn rotate_x_quarter_turn() {
    let point = Vector4::point(1.0, 2.0, 3.0);
    let vector = Vector4::vector(1.0, 2.0, 3.0);

    let half_pi = std::f64::consts::FRAC_PI_2;
    let transform = AffineTransform::identity().rotate_x(half_pi);

    assert_eq!(transform.apply(point), Vector4::point(1.0, -3.0, 2.0));
    assert_eq!(transform.apply(vector), Vector4::vector(1.0, -3.0, 2.0));
}

#[test]
fn rotate_y_and_z_quarter_turns() {
    let half_pi = std::f64::consts::FRAC_PI_2;

    let y = AffineTransform::rotation_y(half_pi);
    assert_eq!(y.apply(Vector4::point(1.0, 0.0, 0.0)),
        Vector4::point(0.0, 0.0, -1.0));

    let z = AffineTransform::rotation_z(half_pi);
    assert_eq!(z.apply(Vector4::point(0.0, 1.0, 0.0)),
        Vector4::point(-1.0, 0.0, 0.0));
}

#[test]
fn apply_inverse_undoes_apply() {
    let point = Vector4::point(1.0, 2.0, 3.0);
    let vector = Vector4::vector(1.0, 2.0, 3.0);

    let transform = AffineTransform::identity()
        .translate(2.0, 3.0, 1.0)
        .rotate_y(2.0)
        .scale(1.0, 3.0, 2.0)
        .rotate_z(-0.7)
        .rotate_x(0.3);

    assert_eq!(transform.apply_inverse(transform.apply(point)), point);
    assert_eq!(transform.apply_inverse(transform.apply(vector)), vector);
    assert_eq!(*transform.matrix() * *transform.inverse_matrix(),
        Matrix4::identity());
}

#[test]
fn composition_order() {
    let a = AffineTransform::identity().translate(1.0, 0.0, 0.0);
    let b = AffineTransform::scaling(2.0, 2.0, 2.0);
    let t = a.compose(&b);

    // Translated first, then scaled.
    assert_eq!(t.apply(Vector4::point(0.0, 0.0, 0.0)),
        Vector4::point(2.0, 0.0, 0.0));
}

#[test]
fn new_computes_inverse() {
    let expected = AffineTransform::identity()
        .scale(2.0, 4.0, 0.5)
        .rotate_z(1.0)
        .translate(-3.0, 1.0, 7.0);
    let rebuilt = AffineTransform::new(*expected.matrix()).unwrap();

    assert_eq!(rebuilt, expected);

    let from_inverse =
        AffineTransform::from_inverse_matrix(*expected.inverse_matrix()).unwrap();
    assert_eq!(from_inverse, expected);
}

#[test]
fn singular_linear_part_is_rejected() {
    let mut m = Matrix4::identity();
    m[(2, 2)] = 0.0;

    assert_eq!(AffineTransform::new(m), Err(MathError::NonInvertible));
}

#[test]
fn projective_matrix_is_unsupported() {
    let mut m = Matrix4::identity();
    m[(3, 0)] = 1.0;

    assert_eq!(AffineTransform::new(m), Err(MathError::UnsupportedSize(4)));
}

#[test]
fn set_origin_keeps_inverse_consistent() {
    let t = AffineTransform::identity()
        .scale(2.0, 1.0, 1.0)
        .rotate_y(0.5)
        .set_origin(4.0, -1.0, 2.0);

    assert_eq!(t.origin(), Vector4::point(4.0, -1.0, 2.0));
    assert_eq!(*t.matrix() * *t.inverse_matrix(), Matrix4::identity());
}

#[test]
fn normals_stay_perpendicular_under_scaling() {
    let t = AffineTransform::scaling(1.0, 0.5, 1.0);
    let n = t.apply_to_normal(Vector4::vector(0.0, 1.0, 1.0));
    let tangent = t.apply(Vector4::vector(0.0, 1.0, -1.0));

    assert!(n.dot(&tangent).abs() < 1e-9);
}

#[test]
fn degenerate_scaling_is_rejected() {
    assert_eq!(AffineTransform::try_scaling(1.0, 0.0, 2.0),
        Err(MathError::NonInvertible));
    assert_eq!(AffineTransform::try_scaling(f64::INFINITY, 1.0, 1.0),
        Err(MathError::NonInvertible));
    assert_eq!(AffineTransform::identity().try_scale(1.0, 1.0, f64::NAN),
        Err(MathError::NonInvertible));

    let t = AffineTransform::identity().try_scale(2.0, 4.0, 0.5).unwrap();
    assert_eq!(t, AffineTransform::scaling(2.0, 4.0, 0.5));
}
