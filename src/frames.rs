//! # Frame-tagged vectors and rotations
//!
//! Every Cartesian vector handled by the reduction carries its reference frame in its type:
//!
//! | Marker          | Axes                         | Origin                  |
//! |-----------------|------------------------------|-------------------------|
//! | [`Barycentric`] | ICRF (mean equator J2000)    | Solar System barycenter |
//! | [`Geocentric`]  | ICRF                         | Earth's centre          |
//! | [`Topocentric`] | ICRF                         | the observer            |
//! | [`EarthFixed`]  | rotating with the Earth      | Earth's centre          |
//! | [`Horizontal`]  | north, east, up              | the observer            |
//!
//! Arithmetic is only defined between vectors of the same frame, so mixing frames is a
//! compile error:
//!
//! ```compile_fail
//! use skypos::frames::{Barycentric, FramedVector, Geocentric};
//!
//! let earth = FramedVector::<Barycentric>::new(1.0, 0.0, 0.0);
//! let site = FramedVector::<Geocentric>::new(4.0e-5, 0.0, 0.0);
//! let _ = earth + site;
//! ```
//!
//! Changing frame goes through an explicit translation ([`FramedVector::displaced_by`],
//! [`FramedVector::seen_from`]) or a typed [`FrameRotation`].
//!
//! Rotations follow the usual astrometric (passive) convention: [`rotation_matrix`] rotates
//! the coordinate axes by `angle`, so a fixed vector gets new components
//! `v' = R(angle) · v`.
use std::{
    fmt,
    marker::PhantomData,
    ops::{Add, AddAssign, Div, Mul, Neg, Sub},
};

use nalgebra::{Matrix3, Vector3};

use crate::constants::{Radian, DPI};

/// Reference frame marker.
pub trait Frame: Copy + fmt::Debug + PartialEq + Send + Sync + 'static {
    const NAME: &'static str;
}

/// ICRF axes, Solar System barycenter origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Barycentric;

/// ICRF axes, geocentre origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geocentric;

/// ICRF axes, observer origin (line-of-sight vectors).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Topocentric;

/// Terrestrial axes rotating with the Earth, geocentre origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EarthFixed;

/// Local horizon axes (north, east, up), observer origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Horizontal;

impl Frame for Barycentric {
    const NAME: &'static str = "barycentric";
}
impl Frame for Geocentric {
    const NAME: &'static str = "geocentric";
}
impl Frame for Topocentric {
    const NAME: &'static str = "topocentric";
}
impl Frame for EarthFixed {
    const NAME: &'static str = "earth-fixed";
}
impl Frame for Horizontal {
    const NAME: &'static str = "horizontal";
}

/// A Cartesian 3-vector expressed in the frame `F`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FramedVector<F: Frame> {
    xyz: Vector3<f64>,
    frame: PhantomData<F>,
}

impl<F: Frame> FramedVector<F> {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self::from_vector(Vector3::new(x, y, z))
    }

    pub fn from_vector(xyz: Vector3<f64>) -> Self {
        FramedVector {
            xyz,
            frame: PhantomData,
        }
    }

    pub fn zeros() -> Self {
        Self::from_vector(Vector3::zeros())
    }

    pub fn as_vector(&self) -> &Vector3<f64> {
        &self.xyz
    }

    pub fn into_inner(self) -> Vector3<f64> {
        self.xyz
    }

    pub fn x(&self) -> f64 {
        self.xyz.x
    }

    pub fn y(&self) -> f64 {
        self.xyz.y
    }

    pub fn z(&self) -> f64 {
        self.xyz.z
    }

    pub fn norm(&self) -> f64 {
        self.xyz.norm()
    }

    pub fn dot(&self, other: &Self) -> f64 {
        self.xyz.dot(&other.xyz)
    }

    /// Unit vector along `self`, or `None` for a zero (or non-finite) vector.
    pub fn unit(&self) -> Option<Self> {
        let norm = self.norm();
        if norm > 0.0 && norm.is_finite() {
            Some(Self::from_vector(self.xyz / norm))
        } else {
            None
        }
    }

    /// Spherical coordinates `(longitude, latitude, radius)`, longitude in `[0, 2π)`.
    pub fn to_spherical(&self) -> (Radian, Radian, f64) {
        cartesian_to_spherical(&self.xyz)
    }

    pub fn frame_name(&self) -> &'static str {
        F::NAME
    }
}

impl FramedVector<Barycentric> {
    /// Barycentric point reached by moving from `self` (a geocentre position) by a
    /// geocentric offset.
    pub fn displaced_by(&self, offset: &FramedVector<Geocentric>) -> FramedVector<Barycentric> {
        FramedVector::from_vector(self.xyz + offset.xyz)
    }

    /// Vector from `observer` to `self`, i.e. `self` as seen from the observer.
    pub fn seen_from(&self, observer: &FramedVector<Barycentric>) -> FramedVector<Topocentric> {
        FramedVector::from_vector(self.xyz - observer.xyz)
    }

    /// Unit direction of an infinitely distant source, the same for every observer.
    pub fn direction_from_anywhere(&self) -> Option<FramedVector<Topocentric>> {
        self.unit().map(|u| FramedVector::from_vector(u.xyz))
    }
}

impl<F: Frame> Add for FramedVector<F> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::from_vector(self.xyz + rhs.xyz)
    }
}

impl<F: Frame> AddAssign for FramedVector<F> {
    fn add_assign(&mut self, rhs: Self) {
        self.xyz += rhs.xyz;
    }
}

impl<F: Frame> Sub for FramedVector<F> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::from_vector(self.xyz - rhs.xyz)
    }
}

impl<F: Frame> Neg for FramedVector<F> {
    type Output = Self;

    fn neg(self) -> Self {
        Self::from_vector(-self.xyz)
    }
}

impl<F: Frame> Mul<f64> for FramedVector<F> {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::from_vector(self.xyz * rhs)
    }
}

impl<F: Frame> Div<f64> for FramedVector<F> {
    type Output = Self;

    fn div(self, rhs: f64) -> Self {
        Self::from_vector(self.xyz / rhs)
    }
}

impl<F: Frame> fmt::Display for FramedVector<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.12}, {:.12}, {:.12}] ({})",
            self.xyz.x,
            self.xyz.y,
            self.xyz.z,
            F::NAME
        )
    }
}

/// A rotation taking vectors expressed in frame `A` to frame `B`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRotation<A: Frame, B: Frame> {
    matrix: Matrix3<f64>,
    frames: PhantomData<(A, B)>,
}

impl<A: Frame, B: Frame> FrameRotation<A, B> {
    pub(crate) fn from_matrix(matrix: Matrix3<f64>) -> Self {
        FrameRotation {
            matrix,
            frames: PhantomData,
        }
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    pub fn apply(&self, v: &FramedVector<A>) -> FramedVector<B> {
        FramedVector::from_vector(self.matrix * v.xyz)
    }

    /// The inverse rotation (the transpose, rotations being orthonormal).
    pub fn inverse(&self) -> FrameRotation<B, A> {
        FrameRotation::from_matrix(self.matrix.transpose())
    }

    /// Compose `self` followed by `next`.
    pub fn then<C: Frame>(&self, next: &FrameRotation<B, C>) -> FrameRotation<A, C> {
        FrameRotation::from_matrix(next.matrix * self.matrix)
    }
}

/// Coordinate axis of an elementary rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Elementary rotation of the coordinate axes by `angle` about `axis`.
///
/// Arguments
/// ---------
/// * `angle`: rotation angle in radians, positive counter-clockwise seen from the positive
///   end of the axis.
/// * `axis`: the axis kept fixed.
///
/// Returns
/// --------
/// * The 3×3 matrix `R` such that the components of a fixed vector in the rotated axes are
///   `R · v`.
pub fn rotation_matrix(angle: Radian, axis: Axis) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    match axis {
        Axis::X => Matrix3::new(1.0, 0.0, 0.0, 0.0, c, s, 0.0, -s, c),
        Axis::Y => Matrix3::new(c, 0.0, -s, 0.0, 1.0, 0.0, s, 0.0, c),
        Axis::Z => Matrix3::new(c, s, 0.0, -s, c, 0.0, 0.0, 0.0, 1.0),
    }
}

/// Convert a Cartesian vector to `(longitude, latitude, radius)`.
///
/// The longitude is normalised to `[0, 2π)`; a zero vector maps to `(0, 0, 0)`.
pub fn cartesian_to_spherical(v: &Vector3<f64>) -> (Radian, Radian, f64) {
    let norm = v.norm();
    if norm == 0.0 {
        return (0.0, 0.0, 0.0);
    }

    let latitude = (v.z / norm).clamp(-1.0, 1.0).asin();
    let longitude = v.y.atan2(v.x).rem_euclid(DPI);
    // rem_euclid can round a tiny negative angle up to exactly 2π
    let longitude = if longitude >= DPI { 0.0 } else { longitude };
    (longitude, latitude, norm)
}
