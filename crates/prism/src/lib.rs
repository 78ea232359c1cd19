//! Sampling surfaces for detector geometries.
//!
//! A detector footprint (string positions) is reduced to its convex hull and
//! extruded along z; the resulting prism, or a cylinder or sphere, answers
//! ray-intersection, projected-area and acceptance queries and can draw impact
//! rays from an isotropic flux.
//!
//! Cross-refs live in doc comments:
//! VK: UUIDs refer to Vibe Kanban tickets.
//!
//! API Policy
//! - This crate is project-internal. There is no stable public API.
//! - Prefer `prism::api` or `prism::prelude` re-exports over deep paths.

pub mod api;
mod cfg;
pub mod error;
pub mod geom2;
pub mod surface;

/// Library version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use error::{Result, SurfaceError};
pub use nalgebra::{Vector2 as Vec2, Vector3 as Vec3};

/// Common exports for quick imports in callers.
pub mod prelude {
    pub use crate::error::{Result, SurfaceError};
    pub use crate::geom2::{compute_hull, ConvexHull, Point2};
    pub use crate::surface::{
        AnySurface, Cylinder, ExtrudedPolygon, ImpactRay, SamplingSurface, Sphere, Surface,
        UprightSurface,
    };
    pub use nalgebra::{Vector2 as Vec2, Vector3 as Vec3};
}
