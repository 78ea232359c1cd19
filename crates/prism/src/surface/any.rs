use nalgebra::Vector3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{
    Cylinder, ExtrudedPolygon, ImpactRay, SamplingSurface, Sphere, Surface, UprightSurface,
};
use crate::error::Result;
use crate::geom2::Point2;

/// Any supported surface shape, tagged by `shape` when serialised.
///
/// ```json
/// {"shape": "extruded_polygon", "xy_points": [[0, 0], [1, 0], [0, 1]], "z_range": [-1, 1]}
/// {"shape": "cylinder", "length": 1000, "radius": 500, "center": [0, 0, 0]}
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum AnySurface {
    ExtrudedPolygon(ExtrudedPolygon),
    Cylinder(Cylinder),
    Sphere(Sphere),
}

impl AnySurface {
    /// Padded copy: polygon footprints are offset, cylinders and spheres grow.
    pub fn expand(&self, padding: f64) -> Result<Self> {
        Ok(match self {
            Self::ExtrudedPolygon(s) => Self::ExtrudedPolygon(s.expand(padding)?),
            Self::Cylinder(s) => Self::Cylinder(s.expand(padding)?),
            Self::Sphere(s) => Self::Sphere(s.expand(padding)?),
        })
    }

    /// Projected area integrated over `cos θ ∈ [cos_min, cos_max]` and azimuth.
    pub fn acceptance(&self, cos_min: f64, cos_max: f64) -> Result<f64> {
        match self {
            Self::ExtrudedPolygon(s) => s.acceptance(cos_min, cos_max),
            Self::Cylinder(s) => s.acceptance(cos_min, cos_max),
            Self::Sphere(s) => s.acceptance(cos_min, cos_max),
        }
    }

    /// The upright view of this surface, if it has one.
    pub fn as_upright(&self) -> Option<&dyn UprightSurface> {
        match self {
            Self::ExtrudedPolygon(s) => Some(s),
            Self::Cylinder(s) => Some(s),
            Self::Sphere(_) => None,
        }
    }

    fn as_surface(&self) -> &dyn Surface {
        match self {
            Self::ExtrudedPolygon(s) => s,
            Self::Cylinder(s) => s,
            Self::Sphere(s) => s,
        }
    }
}

impl From<ExtrudedPolygon> for AnySurface {
    fn from(s: ExtrudedPolygon) -> Self {
        Self::ExtrudedPolygon(s)
    }
}

impl From<Cylinder> for AnySurface {
    fn from(s: Cylinder) -> Self {
        Self::Cylinder(s)
    }
}

impl From<Sphere> for AnySurface {
    fn from(s: Sphere) -> Self {
        Self::Sphere(s)
    }
}

impl Surface for AnySurface {
    fn intersect(&self, origin: Vector3<f64>, direction: Vector3<f64>) -> Result<(f64, f64)> {
        self.as_surface().intersect(origin, direction)
    }
    fn projected_area(&self, direction: Vector3<f64>) -> Result<f64> {
        self.as_surface().projected_area(direction)
    }
    fn contains_xy(&self, point: Point2) -> bool {
        self.as_surface().contains_xy(point)
    }
    fn name(&self) -> &'static str {
        self.as_surface().name()
    }
}

impl SamplingSurface for AnySurface {
    fn sample_impact_ray<R: Rng>(
        &self,
        rng: &mut R,
        cos_min: f64,
        cos_max: f64,
    ) -> Result<ImpactRay> {
        match self {
            Self::ExtrudedPolygon(s) => s.sample_impact_ray(rng, cos_min, cos_max),
            Self::Cylinder(s) => s.sample_impact_ray(rng, cos_min, cos_max),
            Self::Sphere(s) => s.sample_impact_ray(rng, cos_min, cos_max),
        }
    }
}
