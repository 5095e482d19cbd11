//! Complex number type for complex-valued kernels
//!
//! Both complex dtypes carry their scalar values as [`Complex128`]; a
//! `Complex64` value is a `Complex128` whose components were rounded
//! through `f32` by [`Complex128::round_to_c64`].
//!
//! # Arithmetic Operations
//!
//! Complex arithmetic follows standard mathematical definitions:
//! - Addition: `(a+bi) + (c+di) = (a+c) + (b+d)i`
//! - Subtraction: `(a+bi) - (c+di) = (a-c) + (b-d)i`
//! - Multiplication: `(a+bi)(c+di) = (ac-bd) + (ad+bc)i`
//! - Division: `(a+bi)/(c+di) = (a+bi)*conj(c+di)/|c+di|²`

use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// 128-bit complex number with 64-bit real and imaginary parts
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Complex128 {
    /// Real part
    pub re: f64,
    /// Imaginary part
    pub im: f64,
}

impl Complex128 {
    /// Zero complex number
    pub const ZERO: Self = Self { re: 0.0, im: 0.0 };

    /// One (real unit)
    pub const ONE: Self = Self { re: 1.0, im: 0.0 };

    /// Imaginary unit i
    pub const I: Self = Self { re: 0.0, im: 1.0 };

    /// Create a new complex number
    #[inline]
    pub const fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    /// Magnitude (absolute value): |z| = sqrt(re² + im²)
    #[inline]
    pub fn magnitude(self) -> f64 {
        self.re.hypot(self.im)
    }

    /// Squared magnitude: |z|² = re² + im²
    #[inline]
    pub fn magnitude_squared(self) -> f64 {
        self.re * self.re + self.im * self.im
    }

    /// Complex conjugate: conj(a + bi) = a - bi
    #[inline]
    pub fn conj(self) -> Self {
        Self {
            re: self.re,
            im: -self.im,
        }
    }

    /// Multiplicative inverse: 1/z
    #[inline]
    pub fn recip(self) -> Self {
        Self::ONE / self
    }

    /// Complex power z^w via exp(w * ln z)
    pub fn powc(self, w: Self) -> Self {
        if self == Self::ZERO {
            return if w == Self::ZERO { Self::ONE } else { Self::ZERO };
        }
        let ln_r = self.magnitude().ln();
        let theta = self.im.atan2(self.re);
        let re = w.re * ln_r - w.im * theta;
        let im = w.im * ln_r + w.re * theta;
        let scale = re.exp();
        Self {
            re: scale * im.cos(),
            im: scale * im.sin(),
        }
    }

    /// Round both components through `f32`
    #[inline]
    pub fn round_to_c64(self) -> Self {
        Self {
            re: self.re as f32 as f64,
            im: self.im as f32 as f64,
        }
    }

    /// True if the imaginary part is zero
    #[inline]
    pub fn is_real(self) -> bool {
        self.im == 0.0
    }
}

impl Add for Complex128 {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.re + rhs.re, self.im + rhs.im)
    }
}

impl Sub for Complex128 {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.re - rhs.re, self.im - rhs.im)
    }
}

impl Mul for Complex128 {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.re * rhs.re - self.im * rhs.im,
            self.re * rhs.im + self.im * rhs.re,
        )
    }
}

impl Div for Complex128 {
    type Output = Self;
    #[inline]
    fn div(self, rhs: Self) -> Self {
        let denom = rhs.magnitude_squared();
        let num = self * rhs.conj();
        Self::new(num.re / denom, num.im / denom)
    }
}

impl Neg for Complex128 {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.re, -self.im)
    }
}

impl From<f64> for Complex128 {
    #[inline]
    fn from(re: f64) -> Self {
        Self::new(re, 0.0)
    }
}

impl fmt::Display for Complex128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.im >= 0.0 {
            write!(f, "{}+{}i", self.re, self.im)
        } else {
            write!(f, "{}{}i", self.re, self.im)
        }
    }
}
