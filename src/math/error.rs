// src/math/error.rs
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NavmeshError {
    #[error("Insufficient points for operation: expected at least {expected}, got {actual}")]
    InsufficientPoints { expected: usize, actual: usize },

    #[error("Open contour passed to {operation}; a closed contour is required")]
    OpenContour { operation: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("Triangulation failed: {reason}")]
    TriangulationFailed { reason: String },

    #[error("Geometric calculation failed: {operation}")]
    GeometricFailure { operation: String },

    #[error("Transform of {entity} is not invertible (determinant {determinant})")]
    NonInvertibleTransform { entity: String, determinant: f64 },

    #[error("Unknown sector {0}")]
    UnknownSector(usize),

    #[error("Unknown hole {0}")]
    UnknownHole(usize),

    #[error("Invalid terrain metadata: {message}")]
    InvalidMetadata { message: String },
}

pub type NavResult<T> = Result<T, NavmeshError>;
