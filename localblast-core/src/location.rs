//! Discontinuous regions built from disjoint spans.
//!
//! A [`Location`] keeps its segments sorted by start, pairwise disjoint and
//! never adjacent (`previous.to + 1 < next.from`). Every mutating method
//! restores that shape before it returns, so readers can rely on it at all
//! times.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{LocationError, LocationResult};
use crate::span::{SeqPos, Span};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Span>", into = "Vec<Span>")]
pub struct Location {
    segments: Vec<Span>,
}

impl Location {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn number_of_segments(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[Span] {
        &self.segments
    }

    /// Number of positions covered by the location, saturating at
    /// `SeqPos::MAX`.
    pub fn total_length(&self) -> SeqPos {
        self.segments
            .iter()
            .map(Span::len)
            .fold(0, SeqPos::saturating_add)
    }

    /// Start of the first segment.
    pub fn from(&self) -> LocationResult<SeqPos> {
        self.segments
            .first()
            .map(Span::from)
            .ok_or_else(LocationError::empty_location)
    }

    /// End of the last segment.
    pub fn to(&self) -> LocationResult<SeqPos> {
        self.segments
            .last()
            .map(Span::to)
            .ok_or_else(LocationError::empty_location)
    }

    pub fn overlaps(&self, span: &Span) -> bool {
        for segment in &self.segments {
            if segment.overlaps(span) {
                return true;
            }
            // Later segments start even further right.
            if span.to() < segment.from() {
                return false;
            }
        }
        false
    }

    pub fn overlaps_location(&self, other: &Location) -> bool {
        other.segments.iter().any(|span| self.overlaps(span))
    }

    /// True when a single segment contains `span`. Coverage pieced together
    /// from several segments does not count, since segments never touch.
    pub fn is_superset_of(&self, span: &Span) -> bool {
        for segment in &self.segments {
            if segment.is_superset_of(span) {
                return true;
            }
            if segment.overlaps(span) {
                return false;
            }
        }
        false
    }

    pub fn is_superset_of_location(&self, other: &Location) -> bool {
        other.segments.iter().all(|span| self.is_superset_of(span))
    }

    /// Adds `span`, merging it with every segment it overlaps or touches.
    pub fn union_with(&mut self, span: Span) {
        // Segments strictly left of `span` with at least one free position between.
        let start = self
            .segments
            .partition_point(|segment| segment.to().saturating_add(1) < span.from());

        let mut merged = span;
        let mut end = start;
        while end < self.segments.len() && merged.can_merge(&self.segments[end]) {
            merged = Span::union(merged, self.segments[end]);
            end += 1;
        }

        self.segments.splice(start..end, std::iter::once(merged));
        debug_assert!(self.is_canonical(), "union_with broke ordering: {}", self);
    }

    /// Clips every segment to `span`, dropping segments outside it.
    pub fn intersect_with(&mut self, span: Span) {
        self.segments = self
            .segments
            .iter()
            .filter_map(|segment| Span::intersect(*segment, span).ok())
            .collect();
        debug_assert!(self.is_canonical(), "intersect_with broke ordering: {}", self);
    }

    /// Replaces the location with its intersection with `other`, computed as
    /// the union of the pairwise segment intersections.
    pub fn intersect_with_location(&mut self, other: &Location) {
        if self.is_empty() {
            return;
        }
        if other.is_empty() {
            self.segments.clear();
            return;
        }

        let mut pieces: Vec<Span> = self
            .segments
            .iter()
            .flat_map(|one| {
                other
                    .segments
                    .iter()
                    .filter_map(move |two| Span::intersect(*one, *two).ok())
            })
            .collect();
        pieces.sort();

        self.segments.clear();
        for piece in pieces {
            self.union_with(piece);
        }
    }

    /// Consistency self-check: ascending, disjoint and non-adjacent segments.
    pub fn is_canonical(&self) -> bool {
        self.segments
            .windows(2)
            .all(|pair| pair[0].to().saturating_add(1) < pair[1].from())
    }
}

impl Extend<Span> for Location {
    fn extend<I: IntoIterator<Item = Span>>(&mut self, iter: I) {
        for span in iter {
            self.union_with(span);
        }
    }
}

impl FromIterator<Span> for Location {
    fn from_iter<I: IntoIterator<Item = Span>>(iter: I) -> Self {
        let mut location = Location::new();
        location.extend(iter);
        location
    }
}

impl From<Span> for Location {
    fn from(span: Span) -> Self {
        Self {
            segments: vec![span],
        }
    }
}

impl From<Vec<Span>> for Location {
    fn from(spans: Vec<Span>) -> Self {
        spans.into_iter().collect()
    }
}

impl From<Location> for Vec<Span> {
    fn from(location: Location) -> Self {
        location.segments
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.segments.as_slice() {
            [] => write!(f, "NumberOfSegments = 0"),
            [single] => write!(f, "{}", single),
            segments => {
                write!(f, "join(")?;
                for (i, segment) in segments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", segment)?;
                }
                write!(f, ")")
            }
        }
    }
}
