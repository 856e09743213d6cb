//! Coverage of a reference axis by aligned segments.

use serde::{Deserialize, Serialize};

use crate::error::{LocationError, LocationResult};
use crate::location::Location;
use crate::span::{SeqPos, Span};

/// Covered fraction of `reference_length`, truncated to two decimals.
///
/// The percentage is taken with integer division before scaling back, so
/// `1 / 3` yields `0.33` and `299 / 300` yields `0.99`, never a rounded value.
pub fn coverage_ratio(total_length: SeqPos, reference_length: SeqPos) -> LocationResult<f64> {
    if reference_length <= 0 {
        return Err(LocationError::InvalidArgument(format!(
            "reference length must be positive, got {}",
            reference_length
        )));
    }

    let percent = (total_length as i128 * 100) / reference_length as i128;
    Ok(percent as f64 / 100.0)
}

/// Accumulates segment coordinates on one axis (query or hit).
#[derive(Debug, Clone, Default)]
pub struct CoverageTracker {
    location: Location,
}

impl CoverageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unions `from..to` into the covered region. Returns whether the segment
    /// adds coverage, i.e. it was not already contained in a single segment.
    pub fn add(&mut self, from: SeqPos, to: SeqPos) -> bool {
        let span = Span::new(from, to);
        let novel = !self.location.is_superset_of(&span);
        self.location.union_with(span);
        novel
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn into_location(self) -> Location {
        self.location
    }

    pub fn total_length(&self) -> SeqPos {
        self.location.total_length()
    }

    pub fn ratio(&self, reference_length: SeqPos) -> LocationResult<f64> {
        coverage_ratio(self.total_length(), reference_length)
    }

    pub fn summary(&self, reference_length: Option<SeqPos>) -> LocationResult<AxisCoverage> {
        let ratio = match reference_length {
            Some(length) => Some(self.ratio(length)?),
            None => None,
        };

        Ok(AxisCoverage {
            covered: self.total_length(),
            from: self.location.from().ok(),
            to: self.location.to().ok(),
            ratio,
        })
    }
}

/// Covered length, bounding range and ratio for one axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisCoverage {
    pub covered: SeqPos,
    pub from: Option<SeqPos>,
    pub to: Option<SeqPos>,
    /// `None` when the reference length is unknown.
    pub ratio: Option<f64>,
}
