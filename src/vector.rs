use std::cmp::Ordering;
use std::ops::{ Add, Sub, Neg, Mul, Div, Index, IndexMut,
    AddAssign, SubAssign, MulAssign, DivAssign };

use crate::feq;

/// A fixed-length tuple of `N` floats.
///
/// Arithmetic operators act componentwise, both between two vectors of the
/// same length and between a vector and a scalar. Geometric operations
/// (`dot`, `length`, `project_onto`, `reflect_off`) treat the vector as an
/// arrow in `N`-dimensional space.
///
/// Four-component vectors are homogeneous coordinates: directions carry
/// `w == 0.0` and points carry `w == 1.0`. Subtracting two points yields a
/// direction; adding a direction to a point yields a point.
///
/// Equality is approximate (see `crate::feq`), and ordering is lexicographic
/// over the components.
///
/// # Examples
///
/// ```
/// # use spectral_tracer::vector::Vector4;
/// let p = Vector4::point(1.0, 2.0, 3.0);
/// let v = Vector4::vector(1.0, 0.0, 0.0);
/// assert_eq!(p + v, Vector4::point(2.0, 2.0, 3.0));
/// assert!((p - p).is_vector());
/// ```
#[derive(Copy, Clone, Debug)]
pub struct Vector<const N: usize> {
    data: [f64; N],
}

pub type Vector2 = Vector<2>;
pub type Vector3 = Vector<3>;
pub type Vector4 = Vector<4>;

impl<const N: usize> Default for Vector<N> {
    fn default() -> Vector<N> {
        Vector::zero()
    }
}

impl<const N: usize> From<[f64; N]> for Vector<N> {
    fn from(data: [f64; N]) -> Vector<N> {
        Vector { data }
    }
}

/// Approximate, componentwise equality.
impl<const N: usize> PartialEq for Vector<N> {
    fn eq(&self, other: &Vector<N>) -> bool {
        self.data.iter().zip(other.data.iter()).all(|(a, b)| feq(*a, *b))
    }
}

/// Lexicographic ordering, consistent with the approximate equality above.
impl<const N: usize> PartialOrd for Vector<N> {
    fn partial_cmp(&self, other: &Vector<N>) -> Option<Ordering> {
        for (a, b) in self.data.iter().zip(other.data.iter()) {
            if feq(*a, *b) {
                continue;
            }

            return a.partial_cmp(b);
        }

        Some(Ordering::Equal)
    }
}

impl<const N: usize> Vector<N> {
    pub fn new(data: [f64; N]) -> Vector<N> {
        Vector { data }
    }

    /// A vector with every component set to `0.0`.
    pub fn zero() -> Vector<N> {
        Vector { data: [0.0; N] }
    }

    /// A vector with every component set to `value`.
    pub fn splat(value: f64) -> Vector<N> {
        Vector { data: [value; N] }
    }

    pub fn len(&self) -> usize {
        N
    }

    pub fn as_array(&self) -> &[f64; N] {
        &self.data
    }

    pub fn iter(&self) -> std::slice::Iter<'_, f64> {
        self.data.iter()
    }

    /// Applies `f` to every component.
    pub fn map<F: Fn(f64) -> f64>(&self, f: F) -> Vector<N> {
        let mut data = self.data;
        for x in data.iter_mut() {
            *x = f(*x);
        }

        Vector { data }
    }

    /// Combines two vectors component by component.
    pub fn zip_with<F: Fn(f64, f64) -> f64>(&self, other: &Vector<N>, f: F)
        -> Vector<N> {
        let mut data = self.data;
        for (x, y) in data.iter_mut().zip(other.data.iter()) {
            *x = f(*x, *y);
        }

        Vector { data }
    }

    /// The squared Euclidean norm.
    ///
    /// Prefer this over `length` when only comparing distances.
    pub fn length2(&self) -> f64 {
        self.dot(self)
    }

    /// The Euclidean norm.
    pub fn length(&self) -> f64 {
        self.length2().sqrt()
    }

    /// Scales the vector to unit length.
    pub fn normalize(&self) -> Vector<N> {
        *self / self.length()
    }

    pub fn dot(&self, other: &Vector<N>) -> f64 {
        self.data.iter().zip(other.data.iter()).map(|(a, b)| a * b).sum()
    }

    /// The component of this vector along `onto`.
    ///
    /// `onto` need not be normalized.
    pub fn project_onto(&self, onto: &Vector<N>) -> Vector<N> {
        *onto * (self.dot(onto) / onto.length2())
    }

    /// Mirrors this vector about the line spanned by `normal`.
    ///
    /// Computes `v - 2 (v . n) n` with `n` the normalized `normal`, so a
    /// vector hitting a surface comes back out on the same side.
    pub fn reflect_off(&self, normal: &Vector<N>) -> Vector<N> {
        let n = normal.normalize();
        *self - n * (2.0 * self.dot(&n))
    }

    /// Clamps each component into `[min[i], max[i]]`.
    pub fn clamp(&self, min: &Vector<N>, max: &Vector<N>) -> Vector<N> {
        let mut data = self.data;
        for i in 0..N {
            data[i] = data[i].max(min.data[i]).min(max.data[i]);
        }

        Vector { data }
    }
}

impl Vector<2> {
    pub fn x(&self) -> f64 { self.data[0] }
    pub fn y(&self) -> f64 { self.data[1] }
}

impl Vector<3> {
    pub fn x(&self) -> f64 { self.data[0] }
    pub fn y(&self) -> f64 { self.data[1] }
    pub fn z(&self) -> f64 { self.data[2] }

    // Color aliases, used when a `Vector3` holds red, green and blue samples.
    pub fn r(&self) -> f64 { self.data[0] }
    pub fn g(&self) -> f64 { self.data[1] }
    pub fn b(&self) -> f64 { self.data[2] }

    pub fn cross(&self, other: &Vector3) -> Vector3 {
        Vector::new([
            self.y() * other.z() - self.z() * other.y(),
            self.z() * other.x() - self.x() * other.z(),
            self.x() * other.y() - self.y() * other.x(),
        ])
    }
}

impl Vector<4> {
    pub fn tuple(x: f64, y: f64, z: f64, w: f64) -> Vector4 {
        Vector::new([x, y, z, w])
    }

    pub fn point(x: f64, y: f64, z: f64) -> Vector4 {
        Vector::new([x, y, z, 1.0])
    }

    pub fn vector(x: f64, y: f64, z: f64) -> Vector4 {
        Vector::new([x, y, z, 0.0])
    }

    pub fn x(&self) -> f64 { self.data[0] }
    pub fn y(&self) -> f64 { self.data[1] }
    pub fn z(&self) -> f64 { self.data[2] }
    pub fn w(&self) -> f64 { self.data[3] }

    pub fn is_point(&self) -> bool {
        self.data[3] == 1.0
    }

    pub fn is_vector(&self) -> bool {
        self.data[3] == 0.0
    }

    /// Drops the homogeneous component.
    pub fn xyz(&self) -> Vector3 {
        Vector::new([self.data[0], self.data[1], self.data[2]])
    }

    /// Cross product of the spatial parts; always a direction.
    pub fn cross(&self, other: &Vector4) -> Vector4 {
        let c = self.xyz().cross(&other.xyz());
        Vector4::vector(c.x(), c.y(), c.z())
    }
}

impl<const N: usize> Index<usize> for Vector<N> {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.data[index]
    }
}

impl<const N: usize> IndexMut<usize> for Vector<N> {
    fn index_mut(&mut self, index: usize) -> &mut f64 {
        &mut self.data[index]
    }
}

impl<const N: usize> Add for Vector<N> {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        self.zip_with(&other, |a, b| a + b)
    }
}

impl<const N: usize> Sub for Vector<N> {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        self.zip_with(&other, |a, b| a - b)
    }
}

/// Componentwise (Hadamard) product.
impl<const N: usize> Mul for Vector<N> {
    type Output = Self;

    fn mul(self, other: Self) -> Self {
        self.zip_with(&other, |a, b| a * b)
    }
}

/// Componentwise quotient.
impl<const N: usize> Div for Vector<N> {
    type Output = Self;

    fn div(self, other: Self) -> Self {
        self.zip_with(&other, |a, b| a / b)
    }
}

impl<const N: usize> Neg for Vector<N> {
    type Output = Self;

    fn neg(self) -> Self {
        self.map(|a| -a)
    }
}

/// Implements scalar right-multiplication for a vector.
///
/// ```
/// use spectral_tracer::vector::Vector4;
///
/// let t = Vector4::tuple(1.0, 2.0, 3.0, 4.0);
/// assert_eq!(t * 5.0, Vector4::tuple(5.0, 10.0, 15.0, 20.0));
/// ```
impl<const N: usize> Mul<f64> for Vector<N> {
    type Output = Self;

    fn mul(self, other: f64) -> Self {
        self.map(|a| a * other)
    }
}

/// Implements scalar left-multiplication for a vector.
///
/// ```
/// use spectral_tracer::vector::Vector3;
///
/// let t = Vector3::new([1.0, 2.0, 3.0]);
/// assert_eq!(2.0 * t, Vector3::new([2.0, 4.0, 6.0]));
/// ```
impl<const N: usize> Mul<Vector<N>> for f64 {
    type Output = Vector<N>;

    fn mul(self, other: Vector<N>) -> Vector<N> {
        other.map(|a| self * a)
    }
}

impl<const N: usize> Div<f64> for Vector<N> {
    type Output = Self;

    fn div(self, other: f64) -> Self {
        self.map(|a| a / other)
    }
}

impl<const N: usize> AddAssign for Vector<N> {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl<const N: usize> SubAssign for Vector<N> {
    fn sub_assign(&mut self, other: Self) {
        *self = *self - other;
    }
}

impl<const N: usize> MulAssign<f64> for Vector<N> {
    fn mul_assign(&mut self, other: f64) {
        *self = *self * other;
    }
}

impl<const N: usize> DivAssign<f64> for Vector<N> {
    fn div_assign(&mut self, other: f64) {
        *self = *self / other;
    }
}

/* Tests */

#[test]
fn add_tuples() {
    let a1 = Vector4::tuple(3.0, -2.0, 5.0, 1.0);
    let a2 = Vector4::tuple(-2.0, 3.0, 1.0, 0.0);

    assert_eq!(a1 + a2, Vector4::tuple(1.0, 1.0, 6.0, 1.0));
}

#[test]
fn sub_points() {
    let p1 = Vector4::point(3.0, 2.0, 1.0);
    let p2 = Vector4::point(5.0, 6.0, 7.0);

    assert_eq!(p1 - p2, Vector4::vector(-2.0, -4.0, -6.0));
}

#[test]
fn sub_vector_from_point() {
    let p = Vector4::point(3.0, 2.0, 1.0);
    let v = Vector4::vector(5.0, 6.0, 7.0);

    assert_eq!(p - v, Vector4::point(-2.0, -4.0, -6.0));
}

#[test]
fn componentwise_arithmetic() {
    let v = Vector3::new([1.0, 2.0, 3.0]);
    let w = Vector3::new([0.0, 1.0, -1.0]);

    assert_eq!(v + w, Vector3::new([1.0, 3.0, 2.0]));
    assert_eq!(v - w, Vector3::new([1.0, 1.0, 4.0]));
    assert_eq!(v * w, Vector3::new([0.0, 2.0, -3.0]));
    assert_eq!(v / 2.0, Vector3::new([0.5, 1.0, 1.5]));
    assert_eq!(-v, Vector3::new([-1.0, -2.0, -3.0]));
}

#[test]
fn assign_operators() {
    let mut v = Vector2::new([1.0, 2.0]);
    v += Vector2::new([1.0, 1.0]);
    v *= 3.0;
    v -= Vector2::new([0.0, 3.0]);
    v /= 2.0;

    assert_eq!(v, Vector2::new([3.0, 3.0]));
}

#[test]
fn length_and_dot() {
    let v = Vector3::new([1.0, 2.0, 3.0]);
    let w = Vector3::new([0.0, 1.0, -1.0]);

    assert_eq!(v.length2(), 14.0);
    assert_eq!(v.length(), f64::sqrt(14.0));
    assert_eq!(v.dot(&w), -1.0);
}

#[test]
fn normalize_dirty() {
    let v = Vector4::vector(1.0, 2.0, 3.0);
    let e = Vector4::vector(
        1.0 / f64::sqrt(14.0),
        2.0 / f64::sqrt(14.0),
        3.0 / f64::sqrt(14.0)
    );

    assert_eq!(v.normalize(), e);
}

#[test]
fn cross_vectors() {
    let v = Vector3::new([1.0, 2.0, 3.0]);
    let w = Vector3::new([0.0, 1.0, -1.0]);

    assert_eq!(v.cross(&w), Vector3::new([-5.0, 1.0, 1.0]));
    assert_eq!(w.cross(&v), Vector3::new([5.0, -1.0, -1.0]));

    let a = Vector4::vector(1.0, 2.0, 3.0);
    let b = Vector4::vector(2.0, 3.0, 4.0);
    assert_eq!(a.cross(&b), Vector4::vector(-1.0, 2.0, -1.0));
}

#[test]
fn project_onto_axis() {
    let v = Vector4::vector(3.0, -2.0, 5.0);
    let n = Vector4::vector(0.0, 0.0, 2.0);

    assert_eq!(v.project_onto(&n), Vector4::vector(0.0, 0.0, 5.0));
}

#[test]
fn reflect_45() {
    let v = Vector4::vector(1.0, -1.0, 0.0);
    let n = Vector4::vector(0.0, 1.0, 0.0);

    assert_eq!(v.reflect_off(&n), Vector4::vector(1.0, 1.0, 0.0));
}

#[test]
fn reflect_off_unnormalized_normal() {
    let v = Vector4::vector(0.0, -1.0, 0.0);
    let n = Vector4::vector(2.0f64.sqrt(), 2.0f64.sqrt(), 0.0);

    assert_eq!(v.reflect_off(&n), Vector4::vector(1.0, 0.0, 0.0));
}

#[test]
fn lexicographic_order() {
    let a = Vector3::new([1.0, 2.0, 3.0]);
    let b = Vector3::new([1.0, 2.5, 0.0]);

    assert!(a < b);
    assert!(b > a);
    assert!(a <= a);
}

#[test]
fn clamp_components() {
    let v = Vector3::new([-1.0, 0.5, 2.0]);
    let c = v.clamp(&Vector3::splat(0.0), &Vector3::splat(1.0));

    assert_eq!(c, Vector3::new([0.0, 0.5, 1.0]));
}
