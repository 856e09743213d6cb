//! Errors raised by the interval algebra and coverage computation.

use thiserror::Error;

use crate::span::Span;

/// Misuse of the span/location API. These are contract violations rather than
/// transient failures, so callers propagate them instead of retrying.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("invalid operation: {0}")]
    InvalidOperation(&'static str),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl LocationError {
    pub(crate) fn empty_location() -> Self {
        Self::InvalidOperation("location has no segments")
    }

    pub(crate) fn disjoint(one: Span, other: Span) -> Self {
        Self::InvalidArgument(format!("spans {} and {} do not overlap", one, other))
    }

    pub fn is_invalid_operation(&self) -> bool {
        matches!(self, Self::InvalidOperation(_))
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }
}

pub type LocationResult<T> = Result<T, LocationError>;
