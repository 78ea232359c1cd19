use nalgebra::Vector3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{
    check_dimension, check_direction, check_origin, check_zenith_range, disk_area,
    unit_direction, ArrivalFrame, ImpactRay, SamplingSurface, Surface, NO_INTERSECTION,
};
use crate::error::{Result, SurfaceError};
use crate::geom2::Point2;
use std::f64::consts::TAU;

/// A sphere around `center`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SphereRecord", into = "SphereRecord")]
pub struct Sphere {
    radius: f64,
    center: Vector3<f64>,
}

/// Persisted form of a [`Sphere`]; the center defaults to the origin.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SphereRecord {
    pub radius: f64,
    #[serde(default)]
    pub center: [f64; 3],
}

impl Sphere {
    pub fn new(radius: f64, center: Vector3<f64>) -> Result<Self> {
        check_origin(&center)?;
        Ok(Self {
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
    pub fn expand(&self, padding: f64) -> Result<Self> {
        Self::new(self.radius + padding, self.center)
    }
    /// The silhouette never changes, so acceptance is `π r² · ΔΩ`.
    pub fn acceptance(&self, cos_min: f64, cos_max: f64) -> Result<f64> {
        check_zenith_range(cos_min, cos_max)?;
        Ok(disk_area(self.radius) * TAU * (cos_max - cos_min))
    }
}

impl TryFrom<SphereRecord> for Sphere {
    type Error = SurfaceError;
    fn try_from(r: SphereRecord) -> Result<Self> {
        Self::new(r.radius, Vector3::from(r.center))
    }
}

impl From<Sphere> for SphereRecord {
    fn from(s: Sphere) -> Self {
        Self {
            radius: s.radius,
            center: s.center.into(),
        }
    }
}

impl Surface for Sphere {
    fn intersect(&self, origin: Vector3<f64>, direction: Vector3<f64>) -> Result<(f64, f64)> {
        check_direction(&direction)?;
        check_origin(&origin)?;
        let p = origin - self.center;
        let a = direction.norm_squared();
        let b = p.dot(&direction);
        let c = p.norm_squared() - self.radius * self.radius;
        let disc = b * b - a * c;
        if disc <= 0.0 {
            return Ok(NO_INTERSECTION);
        }
        let root = disc.sqrt();
        Ok(((-b - root) / a, (-b + root) / a))
    }

    fn projected_area(&self, direction: Vector3<f64>) -> Result<f64> {
        unit_direction(&direction)?;
        Ok(disk_area(self.radius))
    }

    fn contains_xy(&self, point: Point2) -> bool {
        (point - self.center.xy()).norm() <= self.radius
    }

    fn name(&self) -> &'static str {
        "sphere"
    }
}

impl SamplingSurface for Sphere {
    fn sample_impact_ray<R: Rng>(
        &self,
        rng: &mut R,
        cos_min: f64,
        cos_max: f64,
    ) -> Result<ImpactRay> {
        let frame = ArrivalFrame::sample(rng, cos_min, cos_max)?;
        loop {
            // uniform on the transverse disk
            let rho = self.radius * rng.gen::<f64>().sqrt();
            let phi = rng.gen_range(0.0..TAU);
            let transverse =
                self.center + frame.across * (rho * phi.cos()) + frame.up * (rho * phi.sin());
            let (near, _) = self.intersect(transverse, frame.direction)?;
            if near.is_nan() {
                continue;
            }
            return Ok(ImpactRay {
                position: transverse + frame.direction * near,
                direction: frame.direction,
                projected_area: disk_area(self.radius),
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

    #[test]
    fn ray_through_center() {
        let s = Sphere::new(2.0, vector![1.0, 1.0, 1.0]).unwrap();
        let (near, far) = s
            .intersect(vector![1.0, 1.0, -9.0], vector![0.0, 0.0, 1.0])
            .unwrap();
        assert_relative_eq!(near, 8.0);
        assert_relative_eq!(far, 12.0);
        let (near, _) = s
            .intersect(vector![10.0, 1.0, -9.0], vector![0.0, 0.0, 1.0])
            .unwrap();
        assert!(near.is_nan());
    }

    #[test]
    fn area_and_acceptance() {
        let s = Sphere::new(1.0, Vector3::zeros()).unwrap();
        assert_relative_eq!(
            s.projected_area(vector![0.3, -0.2, 0.9]).unwrap(),
            std::f64::consts::PI
        );
        // 4π sr times π r²
        assert_relative_eq!(
            s.acceptance(-1.0, 1.0).unwrap(),
            4.0 * std::f64::consts::PI * std::f64::consts::PI
        );
        assert!(s.acceptance(0.5, 0.2).is_err());
    }

    #[test]
    fn sampled_impacts_lie_on_the_sphere() {
        let s = Sphere::new(3.0, vector![0.0, 0.0, -1.0]).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let ray = s.sample_impact_ray(&mut rng, -1.0, 1.0).unwrap();
            assert_relative_eq!((ray.position - s.center()).norm(), 3.0, epsilon = 1e-9);
            assert!((ray.position - s.center()).dot(&ray.direction) <= 1e-9);
        }
    }
}
