//! 2D footprint geometry: convex hulls of detector footprints.
//!
//! Purpose
//! - Reduce an arbitrary xy point cloud to the ccw convex hull that bounds an
//!   extruded surface. Everything downstream assumes this winding.
//!
//! Assumptions and conventions
//! - Exact predicates: collinear points are dropped with `cross <= 0.0`, no
//!   epsilon. The hull therefore never exposes zero-length edges.
//! - Coordinates are plain `nalgebra::Vector2<f64>`; finiteness is checked by
//!   the surface builder, not here.
//!
//! Code cross-refs: `surface::ExtrudedPolygon`

mod hull;

pub use hull::{compute_hull, cross, perp, signed_area, ConvexHull, Point2};

#[cfg(test)]
mod tests;
