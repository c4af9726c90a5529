//! Spectra: functions from wavelength to intensity.
//!
//! A `Spectrum` is an immutable expression tree. Combinators hold their
//! operands behind `Arc`s, so building `a + b` never copies `a` or `b`, and
//! the same subtree can be shared by many materials across render threads.
//! Nothing is cached: every call to `intensity` walks the whole tree.

use std::ops::{ Add, Sub, Mul, AddAssign, SubAssign, MulAssign };
use std::sync::Arc;

use crate::vector::Vector3;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum BinaryOp {
    Sum,
    Difference,
    Product,
}

impl BinaryOp {
    fn apply(self, left: f64, right: f64) -> f64 {
        match self {
            BinaryOp::Sum => left + right,
            BinaryOp::Difference => left - right,
            BinaryOp::Product => left * right,
        }
    }
}

#[derive(Clone, Debug)]
pub enum Spectrum {
    /// The same intensity at every wavelength.
    Constant(f64),

    /// A boxcar peak: `height` when `|wavelength - peak| <= width / 2`, zero
    /// elsewhere.
    Monochrome { peak: f64, width: f64, height: f64 },

    /// Two spectra combined pointwise.
    Binary(BinaryOp, Arc<Spectrum>, Arc<Spectrum>),

    /// A spectrum multiplied by a scalar.
    Scaled(Arc<Spectrum>, f64),
}

impl Default for Spectrum {
    fn default() -> Spectrum {
        Spectrum::Constant(0.0)
    }
}

impl Spectrum {
    pub fn constant(value: f64) -> Spectrum {
        Spectrum::Constant(value)
    }

    pub fn monochrome(peak: f64, width: f64, height: f64) -> Spectrum {
        Spectrum::Monochrome { peak, width, height }
    }

    /// Combines two shared spectra without cloning either tree.
    pub fn binary(op: BinaryOp, left: Arc<Spectrum>, right: Arc<Spectrum>)
        -> Spectrum {
        Spectrum::Binary(op, left, right)
    }

    pub fn scaled(spectrum: Arc<Spectrum>, factor: f64) -> Spectrum {
        Spectrum::Scaled(spectrum, factor)
    }

    /// Evaluates the spectrum at one wavelength.
    ///
    /// ```
    /// # use spectral_tracer::spectrum::Spectrum;
    /// let red = Spectrum::monochrome(2.0, 1.0, 0.5);
    /// let sky = Spectrum::constant(0.25) + red;
    ///
    /// assert_eq!(sky.intensity(2.0), 0.75);
    /// assert_eq!(sky.intensity(0.0), 0.25);
    /// ```
    pub fn intensity(&self, wavelength: f64) -> f64 {
        match self {
            Spectrum::Constant(value) => *value,
            Spectrum::Monochrome { peak, width, height } => {
                if (wavelength - peak).abs() <= width / 2.0 {
                    *height
                } else {
                    0.0
                }
            },
            Spectrum::Binary(op, left, right) => {
                op.apply(left.intensity(wavelength), right.intensity(wavelength))
            },
            Spectrum::Scaled(spectrum, factor) => {
                spectrum.intensity(wavelength) * factor
            },
        }
    }

    /// Evaluates the spectrum at three wavelengths at once.
    pub fn sample(&self, wavelengths: &Vector3) -> Vector3 {
        wavelengths.map(|wl| self.intensity(wl))
    }
}

impl Add for Spectrum {
    type Output = Spectrum;

    fn add(self, other: Spectrum) -> Spectrum {
        Spectrum::Binary(BinaryOp::Sum, Arc::new(self), Arc::new(other))
    }
}

impl Sub for Spectrum {
    type Output = Spectrum;

    fn sub(self, other: Spectrum) -> Spectrum {
        Spectrum::Binary(BinaryOp::Difference, Arc::new(self), Arc::new(other))
    }
}

impl Mul for Spectrum {
    type Output = Spectrum;

    fn mul(self, other: Spectrum) -> Spectrum {
        Spectrum::Binary(BinaryOp::Product, Arc::new(self), Arc::new(other))
    }
}

impl<'a> Add for &'a Spectrum {
    type Output = Spectrum;

    fn add(self, other: &'a Spectrum) -> Spectrum {
        self.clone() + other.clone()
    }
}

impl<'a> Sub for &'a Spectrum {
    type Output = Spectrum;

    fn sub(self, other: &'a Spectrum) -> Spectrum {
        self.clone() - other.clone()
    }
}

impl<'a> Mul for &'a Spectrum {
    type Output = Spectrum;

    fn mul(self, other: &'a Spectrum) -> Spectrum {
        self.clone() * other.clone()
    }
}

impl Mul<f64> for Spectrum {
    type Output = Spectrum;

    fn mul(self, factor: f64) -> Spectrum {
        Spectrum::Scaled(Arc::new(self), factor)
    }
}

impl Mul<Spectrum> for f64 {
    type Output = Spectrum;

    fn mul(self, spectrum: Spectrum) -> Spectrum {
        spectrum * self
    }
}

impl AddAssign for Spectrum {
    fn add_assign(&mut self, other: Spectrum) {
        *self = std::mem::take(self) + other;
    }
}

impl SubAssign for Spectrum {
    fn sub_assign(&mut self, other: Spectrum) {
        *self = std::mem::take(self) - other;
    }
}

impl MulAssign for Spectrum {
    fn mul_assign(&mut self, other: Spectrum) {
        *self = std::mem::take(self) * other;
    }
}

impl MulAssign<f64> for Spectrum {
    fn mul_assign(&mut self, factor: f64) {
        *self = std::mem::take(self) * factor;
    }
}

#[test]
fn constant_ignores_wavelength() {
    let c = Spectrum::constant(4.0);

    assert_eq!(c.intensity(-100.0), 4.0);
    assert_eq!(c.intensity(0.0), 4.0);
    assert_eq!(c.intensity(1e9), 4.0);
}

#[test]
fn monochrome_band_edges() {
    let m = Spectrum::monochrome(10.0, 4.0, 3.0);

    assert_eq!(m.intensity(8.0), 3.0);
    assert_eq!(m.intensity(12.0), 3.0);
    assert_eq!(m.intensity(7.9), 0.0);
    assert_eq!(m.intensity(12.1), 0.0);
}

#[test]
fn sum_and_difference() {
    let a = Spectrum::monochrome(10.0, 4.0, 3.0);
    let b = Spectrum::monochrome(11.0, 4.0, 2.0);
    let sum = a + b;

    assert_eq!(sum.intensity(8.0), 3.0);
    assert_eq!(sum.intensity(10.0), 5.0);
    assert_eq!(sum.intensity(15.0), 0.0);

    let rest = Spectrum::constant(10.0) - sum;

    assert_eq!(rest.intensity(8.0), 7.0);
    assert_eq!(rest.intensity(10.0), 5.0);
    assert_eq!(rest.intensity(15.0), 10.0);
}

#[test]
fn product_and_scaling() {
    let a = Spectrum::monochrome(1.0, 1.0, 3.0);
    let b = Spectrum::constant(0.5);

    let product = &a * &b;
    assert_eq!(product.intensity(1.0), 1.5);
    assert_eq!(product.intensity(5.0), 0.0);

    let left = 2.0 * a.clone();
    let right = a * 2.0;
    assert_eq!(left.intensity(1.0), 6.0);
    assert_eq!(right.intensity(1.0), 6.0);
}

#[test]
fn assign_ops() {
    let mut s = Spectrum::default();
    s += Spectrum::constant(2.0);
    s *= 3.0;
    s -= Spectrum::constant(1.0);
    s *= Spectrum::monochrome(0.0, 2.0, 2.0);

    assert_eq!(s.intensity(0.0), 10.0);
    assert_eq!(s.intensity(5.0), 0.0);
}

#[test]
fn shared_operands() {
    let base = Arc::new(Spectrum::constant(1.5));
    let doubled = Spectrum::binary(BinaryOp::Sum, Arc::clone(&base), Arc::clone(&base));
    let halved = Spectrum::scaled(Arc::clone(&base), 0.5);

    assert_eq!(doubled.intensity(0.0), 3.0);
    assert_eq!(halved.intensity(0.0), 0.75);
    assert_eq!(Arc::strong_count(&base), 4);
}

#[test]
fn sample_three_wavelengths() {
    let s = Spectrum::monochrome(1.0, 1.0, 0.5);
    let rgb = s.sample(&Vector3::new([2.0, 1.0, 0.0]));

    assert_eq!(rgb, Vector3::new([0.0, 0.5, 0.0]));
}
