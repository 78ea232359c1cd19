use nalgebra::Vector3;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::{
    check_dimension, check_direction, check_origin, disk_area, unit_direction, ArrivalFrame,
    ImpactRay, SamplingSurface, Surface, UprightSurface, NO_INTERSECTION,
};
use crate::error::{Result, SurfaceError};
use crate::geom2::Point2;

/// A cylinder aligned with the z axis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CylinderRecord", into = "CylinderRecord")]
pub struct Cylinder {
    length: f64,
    radius: f64,
    center: Vector3<f64>,
}

/// Persisted form of a [`Cylinder`]; the center defaults to the origin.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CylinderRecord {
    pub length: f64,
    pub radius: f64,
    #[serde(default)]
    pub center: [f64; 3],
}

impl Cylinder {
    pub fn new(length: f64, radius: f64, center: Vector3<f64>) -> Result<Self> {
        check_origin(&center)?;
        Ok(Self {
            length: check_dimension("length", length)?,
            radius: check_dimension("radius", radius)?,
            center,
        })
    }
    #[inline]
    pub fn radius(&self) -> f64 {
        self.radius
    }
    #[inline]
    pub fn center(&self) -> Vector3<f64> {
        self.center
    }
    /// Grow the radius by `padding` and the length by `2 · padding`.
    pub fn expand(&self, padding: f64) -> Result<Self> {
        Self::new(
            self.length + 2.0 * padding,
            self.radius + padding,
            self.center,
        )
    }
}

impl TryFrom<CylinderRecord> for Cylinder {
    type Error = SurfaceError;
    fn try_from(r: CylinderRecord) -> Result<Self> {
        Self::new(r.length, r.radius, Vector3::from(r.center))
    }
}

impl From<Cylinder> for CylinderRecord {
    fn from(c: Cylinder) -> Self {
        Self {
            length: c.length,
            radius: c.radius,
            center: c.center.into(),
        }
    }
}

#[inline]
fn sorted((a, b): (f64, f64)) -> (f64, f64) {
    if a > b {
        (b, a)
    } else {
        (a, b)
    }
}

impl Surface for Cylinder {
    fn intersect(&self, origin: Vector3<f64>, direction: Vector3<f64>) -> Result<(f64, f64)> {
        check_direction(&direction)?;
        check_origin(&origin)?;
        let p = origin - self.center;
        let half = self.length / 2.0;
        let a = direction.x * direction.x + direction.y * direction.y;

        if a == 0.0 {
            // Perfectly vertical tracks never intersect the sides
            // rim inclusive, matching `contains_xy`
            if p.x.hypot(p.y) > self.radius {
                return Ok(NO_INTERSECTION);
            }
            return Ok(sorted(((-half - p.z) / direction.z, (half - p.z) / direction.z)));
        }

        // |p_xy + t d_xy|² = r²  →  a t² + 2 b t + c = 0
        let b = p.x * direction.x + p.y * direction.y;
        let c = p.x * p.x + p.y * p.y - self.radius * self.radius;
        let disc = b * b - a * c;
        if disc <= 0.0 {
            return Ok(NO_INTERSECTION);
        }
        let root = disc.sqrt();
        let sides = ((-b - root) / a, (-b + root) / a);

        if direction.z == 0.0 {
            // Perfectly horizontal tracks never intersect the caps
            return Ok(if p.z > -half && p.z < half {
                sides
            } else {
                NO_INTERSECTION
            });
        }
        // For general tracks, take the last entrance and first exit
        let caps = sorted(((-half - p.z) / direction.z, (half - p.z) / direction.z));
        if caps.0 >= sides.1 || caps.1 <= sides.0 {
            return Ok(NO_INTERSECTION);
        }
        Ok((caps.0.max(sides.0), caps.1.min(sides.1)))
    }

    fn projected_area(&self, direction: Vector3<f64>) -> Result<f64> {
        let d = unit_direction(&direction)?;
        let sin_zenith = (1.0 - d.z * d.z).max(0.0).sqrt();
        Ok(disk_area(self.radius) * d.z.abs() + 2.0 * self.radius * self.length * sin_zenith)
    }

    fn contains_xy(&self, point: Point2) -> bool {
        (point - self.center.xy()).norm() <= self.radius
    }

    fn name(&self) -> &'static str {
        "cylinder"
    }
}

impl UprightSurface for Cylinder {
    fn cap_area(&self) -> f64 {
        disk_area(self.radius)
    }
    fn mean_side_area(&self) -> f64 {
        2.0 * self.radius * self.length
    }
    fn z_range(&self) -> (f64, f64) {
        let half = self.length / 2.0;
        (self.center.z - half, self.center.z + half)
    }
}

impl SamplingSurface for Cylinder {
    /// The silhouette is a `2r × L sin θ` rectangle capped by two half-ellipses
    /// with semi-axes `r` and `r |cos θ|`; draw a point uniformly over it and
    /// project back to the entry point.
    fn sample_impact_ray<R: Rng>(
        &self,
        rng: &mut R,
        cos_min: f64,
        cos_max: f64,
    ) -> Result<ImpactRay> {
        let frame = ArrivalFrame::sample(rng, cos_min, cos_max)?;
        let r = self.radius;
        let a = frame.sin_zenith * self.length / 2.0;
        let b = frame.cos_zenith.abs() * r;
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let x = r * rng.gen_range(-1.0..1.0);
            let y = (a + b) * rng.gen_range(-1.0..1.0);
            if y.abs() > a + b * (1.0 - (x * x) / (r * r)).sqrt() {
                continue;
            }
            let transverse = self.center + frame.across * x + frame.up * y;
            let (near, _) = self.intersect(transverse, frame.direction)?;
            // Points on the silhouette rim can graze; redraw those.
            if near.is_nan() {
                continue;
            }
            trace!(attempts, cos_zenith = frame.cos_zenith, "sampled impact");
            return Ok(ImpactRay {
                position: transverse + frame.direction * near,
                direction: frame.direction,
                projected_area: self.projected_area(frame.direction)?,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::vector;
    use rand::{rngs::StdRng, SeedableRng};
    use std::f64::consts::PI;

    fn can() -> Cylinder {
        Cylinder::new(1000.0, 500.0, vector![0.0, 0.0, 0.0]).unwrap()
    }

    #[test]
    fn rejects_bad_dimensions() {
        assert_eq!(
            Cylinder::new(0.0, 1.0, Vector3::zeros()),
            Err(SurfaceError::InvalidDimension {
                name: "length",
                value: 0.0
            })
        );
        assert!(Cylinder::new(1.0, f64::NAN, Vector3::zeros()).is_err());
    }

    #[test]
    fn vertical_track_crosses_caps() {
        let (near, far) = can()
            .intersect(vector![100.0, 0.0, 1000.0], vector![0.0, 0.0, -1.0])
            .unwrap();
        assert_relative_eq!(near, 500.0);
        assert_relative_eq!(far, 1500.0);
        let (near, far) = can()
            .intersect(vector![600.0, 0.0, 1000.0], vector![0.0, 0.0, -1.0])
            .unwrap();
        assert!(near.is_nan() && far.is_nan());
    }

    #[test]
    fn vertical_track_on_the_rim_counts_as_inside() {
        let c = can();
        let rim = vector![0.0, 500.0];
        assert!(c.contains_xy(rim));
        let (near, far) = c
            .intersect(vector![rim.x, rim.y, 1000.0], vector![0.0, 0.0, -1.0])
            .unwrap();
        assert_relative_eq!(near, 500.0);
        assert_relative_eq!(far, 1500.0);
    }

    #[test]
    fn horizontal_track_crosses_sides() {
        let (near, far) = can()
            .intersect(vector![-1000.0, 0.0, 0.0], vector![1.0, 0.0, 0.0])
            .unwrap();
        assert_relative_eq!(near, 500.0);
        assert_relative_eq!(far, 1500.0);
        let (near, _) = can()
            .intersect(vector![-1000.0, 0.0, 600.0], vector![1.0, 0.0, 0.0])
            .unwrap();
        assert!(near.is_nan());
    }

    #[test]
    fn oblique_track_takes_last_entrance_and_first_exit() {
        let d = vector![1.0, 0.0, -1.0].normalize();
        // enters the top cap at x = -100, leaves the side at x = 500 (z = -100)
        let o = vector![-100.0, 0.0, 500.0] - d * 10.0;
        let (near, far) = can().intersect(o, d).unwrap();
        assert_relative_eq!(near, 10.0, epsilon = 1e-9);
        assert_relative_eq!(far, 10.0 + 600.0 * 2f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn projected_area_matches_upright_average() {
        let c = can();
        for cos in [0.0f64, 0.3, 0.7, 1.0] {
            let d = -vector![(1.0 - cos * cos).sqrt(), 0.0, cos];
            assert_relative_eq!(
                c.projected_area(d).unwrap(),
                c.differential_area(cos),
                epsilon = 1e-6
            );
        }
        assert_relative_eq!(c.differential_area(1.0), PI * 500.0 * 500.0);
    }

    #[test]
    fn full_sky_acceptance_is_pi_times_surface_area() {
        let c = can();
        let surface_area = 2.0 * PI * 500.0 * 500.0 + 2.0 * PI * 500.0 * 1000.0;
        assert_relative_eq!(
            c.acceptance(-1.0, 1.0).unwrap(),
            PI * surface_area,
            max_relative = 1e-12
        );
    }

    #[test]
    fn sampled_impacts_lie_on_the_surface() {
        let c = can();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let ray = c.sample_impact_ray(&mut rng, 0.0, 1.0).unwrap();
            let p = ray.position;
            let radial = p.xy().norm();
            let on_side = (radial - 500.0).abs() < 1e-6 && p.z.abs() <= 500.0 + 1e-6;
            let on_cap = radial <= 500.0 + 1e-6 && (p.z.abs() - 500.0).abs() < 1e-6;
            assert!(on_side || on_cap, "{p:?} is not on the cylinder");
            assert!(ray.direction.z <= 0.0);
        }
    }

    #[test]
    fn expand_pads_radius_and_length() {
        let c = can().expand(10.0).unwrap();
        assert_eq!(c.radius(), 510.0);
        assert_eq!(c.z_range(), (-510.0, 510.0));
    }
}
