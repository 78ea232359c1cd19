//! Curated internal API (UNSTABLE).
//!
//! Important
//! - This is not a public API. It is a convenience surface for the CLI and
//!   experiments. Breaking changes are allowed and expected.

// 2D footprints
pub use crate::geom2::{compute_hull, cross, perp, signed_area, ConvexHull, Point2};
// Surfaces
pub use crate::surface::{
    AnySurface, Cylinder, CylinderRecord, ExtrudedPolygon, ImpactRay, PolygonRecord,
    SamplingSurface, Sphere, SphereRecord, Surface, UprightSurface, NO_INTERSECTION,
};
// Errors
pub use crate::error::{Result, SurfaceError};

/// Arrival direction for zenith `cos θ` and azimuth `φ` (radians):
/// `(sin θ cos φ, sin θ sin φ, cos θ)`. Rays travel along its negation.
#[inline]
pub fn arrival_direction(cos_zenith: f64, azimuth: f64) -> nalgebra::Vector3<f64> {
    let sin_zenith = (1.0 - cos_zenith * cos_zenith).max(0.0).sqrt();
    nalgebra::Vector3::new(
        sin_zenith * azimuth.cos(),
        sin_zenith * azimuth.sin(),
        cos_zenith,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrival_direction_is_unit_and_points_up_at_zenith() {
        let d = arrival_direction(1.0, 0.3);
        assert_eq!(d, nalgebra::Vector3::new(0.0, 0.0, 1.0));
        let d = arrival_direction(0.5, 2.0);
        assert!((d.norm() - 1.0).abs() < 1e-12);
        assert!((d.z - 0.5).abs() < 1e-15);
    }
}
