//! Tolerance defaults for surface geometry (internal).
//!
//! Policy
//! - Fixed constants, no per-call tolerance juggling. Queries stay exact where
//!   the half-open rules already decide ties; tolerances only guard divisions
//!   and boundary inclusion.

/// Smallest |sin| between adjacent unit edge directions accepted by `expand`.
pub(crate) const DET_EPS: f64 = 1e-12;
/// Relative distance under which a point counts as lying on a hull edge.
pub(crate) const BOUNDARY_EPS: f64 = 1e-9;
/// Relative slack when checking that a side crossing lies within the z range.
pub(crate) const Z_EPS: f64 = 1e-9;
