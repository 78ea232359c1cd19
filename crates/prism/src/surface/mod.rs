//! Closed sampling surfaces: ray intersection, projected area, impact sampling.
//!
//! Purpose
//! - One query contract (`Surface`) shared by every shape the generators
//!   sample on: extruded convex polygons, z-aligned cylinders, spheres.
//! - Shapes built only from vertical sides and horizontal caps additionally
//!   get closed-form acceptance integrals (`UprightSurface`).
//!
//! Assumptions and conventions
//! - Surfaces are immutable values; all derived geometry is computed at
//!   construction, so shared `&self` queries need no synchronisation.
//! - `intersect` returns parameters `t` along `origin + t·direction` (entry
//!   first). `(NaN, NaN)` means the ray misses; negative values lie behind
//!   the origin.
//! - Arrival directions point from the surface towards the source; a sampled
//!   ray propagates along the negated arrival direction. `cos θ = 1` is a
//!   down-going ray.
//! - Randomness is always an explicit `Rng` handle owned by the caller.
//!
//! Code cross-refs: `geom2::compute_hull`, `error::SurfaceError`

mod any;
mod cylinder;
mod polygon;
mod sphere;

pub use any::AnySurface;
pub use cylinder::{Cylinder, CylinderRecord};
pub use polygon::{ExtrudedPolygon, PolygonRecord};
pub use sphere::{Sphere, SphereRecord};

use crate::error::{Result, SurfaceError};
use crate::geom2::Point2;
use nalgebra::Vector3;
use rand::Rng;
use std::f64::consts::{PI, TAU};

/// Returned by `intersect` when the ray misses the surface.
pub const NO_INTERSECTION: (f64, f64) = (f64::NAN, f64::NAN);

/// A closed surface with ray-intersection and projected-area queries.
pub trait Surface: Send + Sync {
    /// Entry and exit parameters of the ray `origin + t·direction`.
    ///
    /// Errors with [`SurfaceError::InvalidDirection`] for a zero or
    /// non-finite direction.
    fn intersect(&self, origin: Vector3<f64>, direction: Vector3<f64>) -> Result<(f64, f64)>;

    /// Area of the silhouette seen by rays travelling along `direction`.
    ///
    /// The direction is normalised first; only its orientation matters.
    fn projected_area(&self, direction: Vector3<f64>) -> Result<f64>;

    /// Whether the horizontal cross-section contains `point` (boundary inclusive).
    fn contains_xy(&self, point: Point2) -> bool;

    /// Short shape name for logs.
    fn name(&self) -> &'static str;
}

/// A surface made of vertical sides and two horizontal caps.
///
/// The azimuth-averaged projected area at zenith `θ` is
/// `cap·|cos θ| + side·sin θ`, which integrates in closed form.
pub trait UprightSurface: Surface {
    /// Area of one cap.
    fn cap_area(&self) -> f64;
    /// Projected area of the sides for a horizontal view, averaged over azimuth.
    fn mean_side_area(&self) -> f64;
    /// Vertical extent `(z_min, z_max)`.
    fn z_range(&self) -> (f64, f64);

    #[inline]
    fn length(&self) -> f64 {
        let (lo, hi) = self.z_range();
        hi - lo
    }

    /// Azimuth-averaged projected area at `cos θ`.
    fn differential_area(&self, cos_zenith: f64) -> f64 {
        let sin_zenith = (1.0 - cos_zenith * cos_zenith).max(0.0).sqrt();
        self.cap_area() * cos_zenith.abs() + self.mean_side_area() * sin_zenith
    }

    /// Maximum of [`UprightSurface::differential_area`] over all zenith angles.
    fn max_differential_area(&self) -> f64 {
        self.cap_area().hypot(self.mean_side_area())
    }

    /// Projected area integrated over solid angle for `cos θ ∈ [cos_min, cos_max]`.
    fn acceptance(&self, cos_min: f64, cos_max: f64) -> Result<f64> {
        check_zenith_range(cos_min, cos_max)?;
        let (cap, side) = (self.cap_area(), self.mean_side_area());
        let total = if cos_min >= 0.0 {
            integrate_area(cos_min, cos_max, cap, side)
        } else if cos_max <= 0.0 {
            integrate_area(-cos_max, -cos_min, cap, side)
        } else {
            integrate_area(0.0, -cos_min, cap, side) + integrate_area(0.0, cos_max, cap, side)
        };
        Ok(total)
    }
}

/// `2π ∫_a^b (cap·c + side·sqrt(1 − c²)) dc` for `0 <= a <= b <= 1`.
fn integrate_area(a: f64, b: f64, cap: f64, side: f64) -> f64 {
    let arc = |c: f64| c * (1.0 - c * c).max(0.0).sqrt() - c.acos();
    TAU * (cap * (b * b - a * a) / 2.0 + side * (arc(b) - arc(a)) / 2.0)
}

/// A ray drawn on a sampling surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImpactRay {
    /// Entry point on the surface.
    pub position: Vector3<f64>,
    /// Unit propagation direction.
    pub direction: Vector3<f64>,
    /// Projected area of the surface seen along `direction`.
    pub projected_area: f64,
}

/// A surface that can draw rays from an isotropic flux.
pub trait SamplingSurface: Surface {
    /// Draw an arrival direction uniform in `cos θ ∈ [cos_min, cos_max]` and
    /// azimuth, then an impact point uniform over the projected silhouette.
    fn sample_impact_ray<R: Rng>(
        &self,
        rng: &mut R,
        cos_min: f64,
        cos_max: f64,
    ) -> Result<ImpactRay>;
}

/// Propagation direction plus an orthonormal basis of the transverse plane.
///
/// `across` is horizontal; `up` lies in the vertical plane containing the
/// direction, with `|up.z| = sin θ`.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ArrivalFrame {
    pub direction: Vector3<f64>,
    pub across: Vector3<f64>,
    pub up: Vector3<f64>,
    pub cos_zenith: f64,
    pub sin_zenith: f64,
}

impl ArrivalFrame {
    pub(crate) fn new(cos_zenith: f64, azimuth: f64) -> Self {
        let sin_zenith = (1.0 - cos_zenith * cos_zenith).max(0.0).sqrt();
        let (sin_az, cos_az) = azimuth.sin_cos();
        let direction = -Vector3::new(sin_zenith * cos_az, sin_zenith * sin_az, cos_zenith);
        let across = Vector3::new(-sin_az, cos_az, 0.0);
        let up = direction.cross(&across);
        Self {
            direction,
            across,
            up,
            cos_zenith,
            sin_zenith,
        }
    }

    /// Uniform in `cos θ` and azimuth.
    pub(crate) fn sample<R: Rng>(rng: &mut R, cos_min: f64, cos_max: f64) -> Result<Self> {
        check_zenith_range(cos_min, cos_max)?;
        let cos_zenith = if cos_min < cos_max {
            rng.gen_range(cos_min..=cos_max)
        } else {
            cos_min
        };
        let azimuth = rng.gen_range(0.0..TAU);
        Ok(Self::new(cos_zenith, azimuth))
    }
}

pub(crate) fn check_zenith_range(cos_min: f64, cos_max: f64) -> Result<()> {
    if (-1.0..=1.0).contains(&cos_min) && (-1.0..=1.0).contains(&cos_max) && cos_min <= cos_max {
        Ok(())
    } else {
        Err(SurfaceError::InvalidZenithRange { cos_min, cos_max })
    }
}

/// Reject zero or non-finite directions.
pub(crate) fn check_direction(direction: &Vector3<f64>) -> Result<()> {
    if direction.iter().all(|c| c.is_finite()) && direction.norm_squared() > 0.0 {
        Ok(())
    } else {
        Err(SurfaceError::InvalidDirection)
    }
}

pub(crate) fn unit_direction(direction: &Vector3<f64>) -> Result<Vector3<f64>> {
    check_direction(direction)?;
    Ok(direction.normalize())
}

pub(crate) fn check_origin(origin: &Vector3<f64>) -> Result<()> {
    if origin.iter().all(|c| c.is_finite()) {
        Ok(())
    } else {
        Err(SurfaceError::NonFinite)
    }
}

pub(crate) fn check_dimension(name: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(SurfaceError::InvalidDimension { name, value })
    }
}

/// Smallest and largest non-NaN candidate, or [`NO_INTERSECTION`].
pub(crate) fn extremes(candidates: impl IntoIterator<Item = f64>) -> (f64, f64) {
    // `f64::min`/`max` return the other operand when one is NaN.
    candidates
        .into_iter()
        .fold(NO_INTERSECTION, |(lo, hi), t| (lo.min(t), hi.max(t)))
}

/// Projected area of a disk of radius `r` (sphere silhouette).
#[inline]
pub(crate) fn disk_area(r: f64) -> f64 {
    PI * r * r
}
