use std::fmt;
use std::ops::{ Index, IndexMut, Add, Sub, Neg, Mul, Div };

use crate::error::MathError;
use crate::vector::Vector;

/// A square `N`x`N` matrix.
///
/// Storage is column-first: the matrix holds `N` column vectors. For 4x4
/// affine transforms this means column `3` is the translation (or, for a
/// camera, its position), and columns `0..3` are the images of the x, y and z
/// axes.
///
/// Elements are addressed as `m[(row, col)]`.
///
/// Determinant and inverse have closed forms for sizes 1 to 3 only. Asking for
/// either on a larger matrix returns `MathError::UnsupportedSize`; 4x4 affine
/// transforms are inverted through their structure instead (see
/// `AffineTransform`).
///
/// # Examples
///
/// ```
/// # use spectral_tracer::matrix::Matrix;
/// let m = Matrix::from_rows([[1.0, 2.0], [3.0, 4.0]]);
/// assert_eq!(m.determinant().unwrap(), -2.0);
/// assert_eq!(m.trace(), 5.0);
/// assert_eq!(m * m.inverse().unwrap(), Matrix::identity());
/// ```
#[derive(Copy, Clone, Debug)]
pub struct Matrix<const N: usize> {
    columns: [Vector<N>; N],
}

pub type Matrix2 = Matrix<2>;
pub type Matrix3 = Matrix<3>;
pub type Matrix4 = Matrix<4>;

impl<const N: usize> Default for Matrix<N> {
    fn default() -> Matrix<N> {
        Matrix::zero()
    }
}

/// Determines whether two matrices are equal.
///
/// Matrices are compared element-wise. Note that equality is approximate, as
/// matrix elements are floating point numbers.
impl<const N: usize> PartialEq for Matrix<N> {
    fn eq(&self, other: &Matrix<N>) -> bool {
        self.columns.iter().zip(other.columns.iter()).all(|(a, b)| a == b)
    }
}

impl<const N: usize> Matrix<N> {
    /// Creates a matrix from its columns.
    pub fn new(columns: [Vector<N>; N]) -> Matrix<N> {
        Matrix { columns }
    }

    /// Creates a matrix from rows, which reads naturally in source code.
    pub fn from_rows(rows: [[f64; N]; N]) -> Matrix<N> {
        let mut m = Matrix::zero();
        for r in 0..N {
            for c in 0..N {
                m[(r, c)] = rows[r][c];
            }
        }

        m
    }

    /// Creates a new matrix. All elements are initialized to `0.0`.
    pub fn zero() -> Matrix<N> {
        Matrix { columns: [Vector::zero(); N] }
    }

    /// Instantiates an identity matrix.
    pub fn identity() -> Matrix<N> {
        let mut m = Matrix::zero();
        for i in 0..N {
            m[(i, i)] = 1.0;
        }

        m
    }

    pub fn column(&self, col: usize) -> &Vector<N> {
        &self.columns[col]
    }

    pub fn column_mut(&mut self, col: usize) -> &mut Vector<N> {
        &mut self.columns[col]
    }

    pub fn row(&self, row: usize) -> Vector<N> {
        let mut v = Vector::zero();
        for c in 0..N {
            v[c] = self[(row, c)];
        }

        v
    }

    /// Produces the transpose of a matrix in-place.
    pub fn transpose(&mut self) {
        *self = self.transposition();
    }

    /// Produces the transpose of a matrix, returning a new matrix as a result.
    pub fn transposition(&self) -> Matrix<N> {
        let mut t = Matrix::zero();
        for r in 0..N {
            for c in 0..N {
                t[(c, r)] = self[(r, c)];
            }
        }

        t
    }

    /// The sum of the diagonal.
    pub fn trace(&self) -> f64 {
        (0..N).map(|i| self[(i, i)]).sum()
    }

    /// Calculates the determinant in closed form.
    ///
    /// Sizes above 3 are not supported.
    pub fn determinant(&self) -> Result<f64, MathError> {
        let m = self;
        match N {
            1 => Ok(m[(0, 0)]),
            2 => Ok(m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)]),
            3 => Ok(m[(0, 0)] * m[(1, 1)] * m[(2, 2)]
                + m[(0, 1)] * m[(1, 2)] * m[(2, 0)]
                + m[(0, 2)] * m[(1, 0)] * m[(2, 1)]
                - m[(0, 0)] * m[(1, 2)] * m[(2, 1)]
                - m[(0, 1)] * m[(1, 0)] * m[(2, 2)]
                - m[(0, 2)] * m[(1, 1)] * m[(2, 0)]),
            _ => Err(MathError::UnsupportedSize(N)),
        }
    }

    /// Calculates the inverse of a matrix, if it exists.
    ///
    /// Sizes 1 and 2 use the adjugate directly. Size 3 uses the
    /// Cayley-Hamilton identity
    /// `A^-1 = ((tr(A)^2 - tr(A^2)) / 2 * I - tr(A) * A + A^2) / det(A)`.
    pub fn inverse(&self) -> Result<Matrix<N>, MathError> {
        let det = self.determinant()?;
        if det == 0.0 || !det.is_finite() {
            return Err(MathError::NonInvertible);
        }

        let m = self;
        let adjugate = match N {
            1 => Matrix::identity(),
            2 => {
                let mut adj = Matrix::zero();
                adj[(0, 0)] =  m[(1, 1)];
                adj[(0, 1)] = -m[(0, 1)];
                adj[(1, 0)] = -m[(1, 0)];
                adj[(1, 1)] =  m[(0, 0)];
                adj
            },
            _ => {
                let trace_m = m.trace();
                let m2 = *m * *m;
                let trace_m2 = m2.trace();
                Matrix::identity() * ((trace_m * trace_m - trace_m2) / 2.0)
                    - *m * trace_m
                    + m2
            },
        };

        Ok(adjugate / det)
    }
}

impl<const N: usize> Index<(usize, usize)> for Matrix<N> {
    type Output = f64;

    fn index(&self, index: (usize, usize)) -> &f64 {
        &self.columns[index.1][index.0]
    }
}

impl<const N: usize> IndexMut<(usize, usize)> for Matrix<N> {
    fn index_mut(&mut self, index: (usize, usize)) -> &mut f64 {
        &mut self.columns[index.1][index.0]
    }
}

impl<const N: usize> Add for Matrix<N> {
    type Output = Matrix<N>;

    fn add(self, other: Matrix<N>) -> Matrix<N> {
        let mut res = self;
        for c in 0..N {
            res.columns[c] += other.columns[c];
        }

        res
    }
}

impl<const N: usize> Sub for Matrix<N> {
    type Output = Matrix<N>;

    fn sub(self, other: Matrix<N>) -> Matrix<N> {
        let mut res = self;
        for c in 0..N {
            res.columns[c] -= other.columns[c];
        }

        res
    }
}

impl<const N: usize> Neg for Matrix<N> {
    type Output = Matrix<N>;

    fn neg(self) -> Matrix<N> {
        self * -1.0
    }
}

impl<const N: usize> Mul<f64> for Matrix<N> {
    type Output = Matrix<N>;

    fn mul(self, other: f64) -> Matrix<N> {
        let mut res = self;
        for c in 0..N {
            res.columns[c] *= other;
        }

        res
    }
}

impl<const N: usize> Mul<Matrix<N>> for f64 {
    type Output = Matrix<N>;

    fn mul(self, other: Matrix<N>) -> Matrix<N> {
        other * self
    }
}

impl<const N: usize> Div<f64> for Matrix<N> {
    type Output = Matrix<N>;

    fn div(self, other: f64) -> Matrix<N> {
        let mut res = self;
        for c in 0..N {
            res.columns[c] /= other;
        }

        res
    }
}

/// Multiplication between two matrices.
///
/// Note that matrix multiplication is not commutative; `A * B` applies `B`
/// first and `A` second when the product is applied to a vector.
///
/// # Examples
///
/// ```
/// # use spectral_tracer::matrix::Matrix;
/// let m1 = Matrix::from_rows([[2.0, 0.0], [0.0, 3.0]]);
/// let m2 = Matrix::from_rows([[4.0, 0.0], [0.0, 3.0]]);
/// assert_eq!(m1 * m2, Matrix::from_rows([[8.0, 0.0], [0.0, 9.0]]));
/// ```
impl<const N: usize> Mul<Matrix<N>> for Matrix<N> {
    type Output = Matrix<N>;

    fn mul(self, other: Matrix<N>) -> Matrix<N> {
        let mut res = Matrix::zero();
        for c in 0..N {
            res.columns[c] = self * other.columns[c];
        }

        res
    }
}

/// Multiplication between a matrix and a column vector.
impl<const N: usize> Mul<Vector<N>> for Matrix<N> {
    type Output = Vector<N>;

    fn mul(self, other: Vector<N>) -> Vector<N> {
        let mut res = Vector::zero();
        for c in 0..N {
            res += self.columns[c] * other[c];
        }

        res
    }
}

impl<const N: usize> fmt::Display for Matrix<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in 0..N {
            write!(f, "|")?;
            for c in 0..N {
                write!(f, " {} |", self[(r, c)])?;
            }

            // Don't put a newline on the final row (allow the user to do that)
            if r != N - 1 {
                writeln!(f)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
use crate::vector::{ Vector2, Vector3 };

#[test]
fn identity() {
    let i = Matrix::identity();
    let a = Matrix::from_rows([
        [0.0, 1.0,  2.0,  4.0],
        [1.0, 2.0,  4.0,  8.0],
        [2.0, 4.0,  8.0, 16.0],
        [4.0, 8.0, 16.0, 32.0],
    ]);

    assert_eq!(i * a, a);
    assert_eq!(a * i, a);
}

#[test]
fn column_storage() {
    let m = Matrix::new([Vector2::new([1.0, 2.0]), Vector2::new([3.0, 4.0])]);

    assert_eq!(m[(0, 1)], 3.0);
    assert_eq!(m[(1, 0)], 2.0);
    assert_eq!(*m.column(1), Vector2::new([3.0, 4.0]));
    assert_eq!(m.row(1), Vector2::new([2.0, 4.0]));
    assert_eq!(m * Vector2::new([1.0, 1.0]), Vector2::new([4.0, 6.0]));
}

#[test]
fn arithmetic() {
    let m1 = Matrix::from_rows([[1.0, 3.0], [2.0, 4.0]]);
    let m2 = Matrix2::identity();

    assert_eq!(m1 + m2, Matrix::from_rows([[2.0, 3.0], [2.0, 5.0]]));
    assert_eq!(m1 - m2, Matrix::from_rows([[0.0, 3.0], [2.0, 3.0]]));
    assert_eq!(m1 * 3.0, Matrix::from_rows([[3.0, 9.0], [6.0, 12.0]]));
    assert_eq!(3.0 * m1, m1 * 3.0);
    assert_eq!(-m1, m1 * -1.0);
    assert_eq!(m1 / 2.0, Matrix::from_rows([[0.5, 1.5], [1.0, 2.0]]));
}

#[test]
fn multiplication_laws() {
    let m1 = Matrix::from_rows([[1.0, 3.0], [2.0, 4.0]]);
    let m2 = Matrix::from_rows([[1.0, 2.0], [3.0, 4.0]]);
    let m3 = Matrix::from_rows([[1.0, 1.0], [1.0, 1.0]]);

    assert_eq!(m1 * Matrix2::zero(), Matrix2::zero());
    assert_eq!((m1 * m2) * m3, m1 * (m2 * m3));
    assert_eq!((m1 * m2).transposition(),
        m2.transposition() * m1.transposition());
}

#[test]
fn transpose() {
    let a = Matrix::from_rows([
        [0.0, 9.0, 3.0, 0.0],
        [9.0, 8.0, 0.0, 8.0],
        [1.0, 8.0, 5.0, 3.0],
        [0.0, 0.0, 5.0, 8.0],
    ]);

    let t = Matrix::from_rows([
        [0.0, 9.0, 1.0, 0.0],
        [9.0, 8.0, 8.0, 0.0],
        [3.0, 0.0, 5.0, 5.0],
        [0.0, 8.0, 3.0, 8.0],
    ]);

    assert_eq!(t, a.transposition());

    let mut b = t;
    b.transpose();
    assert_eq!(b, a);
}

#[test]
fn inverse_2x2() {
    let a = Matrix::from_rows([[1.0, 3.0], [2.0, 4.0]]);
    let b = Matrix::from_rows([[1.0, 2.0], [3.0, 4.0]]);
    let ab = a * b;
    let ba = b * a;

    assert_eq!(ab * b.inverse().unwrap(), a);
    assert_eq!(ab.inverse().unwrap(), b.inverse().unwrap() * a.inverse().unwrap());
    assert_eq!(Matrix2::identity().inverse().unwrap(), Matrix2::identity());

    assert_eq!(ab.determinant().unwrap(), ba.determinant().unwrap());
    assert_eq!(ab.determinant().unwrap(),
        a.determinant().unwrap() * b.determinant().unwrap());
}

#[test]
fn inverse_3x3() {
    let a = Matrix::new([
        Vector3::new([1.0, 1.0, 1.0]),
        Vector3::new([1.0, 2.0, 3.0]),
        Vector3::new([1.0, 0.0, 1.0]),
    ]);
    let b = Matrix::new([
        Vector3::new([1.0, 1.0, 0.0]),
        Vector3::new([1.0, 0.0, 1.0]),
        Vector3::new([0.0, 1.0, 1.0]),
    ]);
    let ab = a * b;
    let ba = b * a;

    assert_eq!(a * a.inverse().unwrap(), Matrix3::identity());
    assert_eq!(ab * b.inverse().unwrap(), a);
    assert_eq!(ab.inverse().unwrap(), b.inverse().unwrap() * a.inverse().unwrap());
    assert_eq!(Matrix3::identity().inverse().unwrap(), Matrix3::identity());

    assert_eq!(ab.determinant().unwrap(), ba.determinant().unwrap());
    assert_eq!(ab.determinant().unwrap(),
        a.determinant().unwrap() * b.determinant().unwrap());
}

#[test]
fn mat3_determinant() {
    let a = Matrix::from_rows([
        [ 1.0, 2.0,  6.0],
        [-5.0, 8.0, -4.0],
        [ 2.0, 6.0,  4.0],
    ]);

    assert_eq!(a.determinant().unwrap(), -196.0);
}

#[test]
fn inverse_1x1() {
    let a = Matrix::from_rows([[4.0]]);

    assert_eq!(a.inverse().unwrap(), Matrix::from_rows([[0.25]]));
}

#[test]
fn singular_matrix_is_not_invertible() {
    let a = Matrix::from_rows([
        [1.0, 2.0, 3.0],
        [2.0, 4.0, 6.0],
        [0.0, 1.0, 1.0],
    ]);

    assert_eq!(a.inverse(), Err(MathError::NonInvertible));
}

#[test]
fn mat4_closed_form_unsupported() {
    let a = Matrix4::identity();

    assert_eq!(a.determinant(), Err(MathError::UnsupportedSize(4)));
    assert_eq!(a.inverse(), Err(MathError::UnsupportedSize(4)));
}
