use thiserror::Error;

/// Top-level error type for the Geoseam contour assembly engine.
#[derive(Debug, Error)]
pub enum GeoseamError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Assembly(#[from] AssemblyError),
}

/// Errors raised by the polyline/polygon data model.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("geometry is immutable: {0}")]
    Immutable(&'static str),

    #[error("hole bounds are not contained in the shell bounds")]
    HoleOutsideShell,

    #[error("range {lower}..{upper} is out of bounds for {len} points")]
    RangeOutOfBounds {
        lower: usize,
        upper: usize,
        len: usize,
    },

    #[error("degenerate geometry: {0}")]
    Degenerate(String),
}

/// Errors raised by coordinate transforms.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("transform is not invertible")]
    NotInvertible,

    #[error("point ({x}, {y}) is outside the transform domain")]
    OutOfDomain { x: f64, y: f64 },

    #[error("transform produced a non-finite coordinate")]
    NonFinite,
}

/// Errors raised while assembling fragments into rings.
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("reference point is {distance} away from the boundary (limit {limit})")]
    ReferenceTooFar { distance: f64, limit: f64 },

    #[error("border completion requested without a boundary shape")]
    MissingBoundary,

    #[error("degenerate boundary: {0}")]
    DegenerateBoundary(String),

    #[error("invalid assembly parameters: {0}")]
    InvalidParameters(String),

    #[error("assembly cancelled")]
    Cancelled,
}

/// Convenience type alias for results using [`GeoseamError`].
pub type Result<T> = std::result::Result<T, GeoseamError>;
