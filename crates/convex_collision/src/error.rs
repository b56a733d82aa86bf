//! Collision subsystem errors
//!
//! Only handle misuse and configuration problems are errors. Numerical
//! trouble inside the solver is reported through `Termination` and
//! `SolverStats` instead.

use crate::pool::LinkId;
use crate::world::ShapeKey;
use thiserror::Error;

/// Errors returned by [`CollisionWorld`](crate::world::CollisionWorld) operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollisionError {
    /// The shape handle is stale or belongs to another world
    #[error("Unknown shape: {0:?}")]
    UnknownShape(ShapeKey),

    /// The collision state handle is stale
    #[error("Unknown collision state: {0:?}")]
    UnknownState(LinkId),

    /// The configuration failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result alias for collision world operations
pub type CollisionResult<T> = Result<T, CollisionError>;
