use thiserror::Error;

/// Errors raised while building or querying a surface.
///
/// Every variant is an input-validation failure: operations are pure, so the
/// caller has to supply different input rather than retry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SurfaceError {
    #[error("degenerate geometry: {reason}")]
    DegenerateGeometry { reason: String },

    #[error("direction vector must be finite and have non-zero length")]
    InvalidDirection,

    #[error("z range [{lo}, {hi}] must be finite with positive height")]
    InvalidZRange { lo: f64, hi: f64 },

    #[error("input coordinates must be finite")]
    NonFinite,

    #[error("{name} = {value} must be finite and positive")]
    InvalidDimension { name: &'static str, value: f64 },

    #[error("zenith range [{cos_min}, {cos_max}] is not an ordered subrange of [-1, 1]")]
    InvalidZenithRange { cos_min: f64, cos_max: f64 },
}

impl SurfaceError {
    pub(crate) fn degenerate(reason: impl Into<String>) -> Self {
        Self::DegenerateGeometry {
            reason: reason.into(),
        }
    }
}

/// Convenience alias for results using [`SurfaceError`].
pub type Result<T> = std::result::Result<T, SurfaceError>;
