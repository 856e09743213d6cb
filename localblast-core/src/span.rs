//! Closed integer intervals on a sequence axis.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{LocationError, LocationResult};

/// Sequence coordinate as reported by alignment tools (1-based, inclusive).
pub type SeqPos = i64;

/// A closed interval `[from, to]` with `from <= to`.
///
/// Spans order by `from` ascending, and among spans sharing a start the longer
/// one sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(SeqPos, SeqPos)", into = "(SeqPos, SeqPos)")]
pub struct Span {
    from: SeqPos,
    to: SeqPos,
}

impl Span {
    /// Builds a span from two endpoints given in either order.
    pub fn new(a: SeqPos, b: SeqPos) -> Self {
        Self {
            from: a.min(b),
            to: a.max(b),
        }
    }

    pub fn point(pos: SeqPos) -> Self {
        Self { from: pos, to: pos }
    }

    pub fn from(&self) -> SeqPos {
        self.from
    }

    pub fn to(&self) -> SeqPos {
        self.to
    }

    /// Number of positions covered. Saturates at `SeqPos::MAX` for spans
    /// wider than that.
    pub fn len(&self) -> SeqPos {
        self.to.saturating_sub(self.from).saturating_add(1)
    }

    pub fn contains(&self, point: SeqPos) -> bool {
        self.from <= point && point <= self.to
    }

    /// Closed-interval overlap: `1..5` and `5..9` share position 5.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.from <= other.to && other.from <= self.to
    }

    /// True when the spans are disjoint but consecutive, e.g. `1..4` and `5..9`.
    pub fn is_neighbor(&self, other: &Span) -> bool {
        self.to.checked_add(1) == Some(other.from) || other.to.checked_add(1) == Some(self.from)
    }

    pub fn is_superset_of(&self, other: &Span) -> bool {
        self.from <= other.from && other.to <= self.to
    }

    pub fn is_subset_of(&self, other: &Span) -> bool {
        other.is_superset_of(self)
    }

    /// Smallest span covering both inputs. The spans need not touch; callers
    /// only use this when a merge is intended.
    pub fn union(one: Span, other: Span) -> Span {
        Span {
            from: one.from.min(other.from),
            to: one.to.max(other.to),
        }
    }

    /// Common part of two overlapping spans.
    pub fn intersect(one: Span, other: Span) -> LocationResult<Span> {
        if !one.overlaps(&other) {
            return Err(LocationError::disjoint(one, other));
        }

        Ok(Span {
            from: one.from.max(other.from),
            to: one.to.min(other.to),
        })
    }

    /// Overlapping or adjacent spans collapse into one segment of a location.
    pub(crate) fn can_merge(&self, other: &Span) -> bool {
        self.overlaps(other) || self.is_neighbor(other)
    }
}

impl Ord for Span {
    fn cmp(&self, other: &Self) -> Ordering {
        self.from
            .cmp(&other.from)
            .then_with(|| other.to.cmp(&self.to))
    }
}

impl PartialOrd for Span {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.from == self.to {
            write!(f, "{}", self.from)
        } else {
            write!(f, "{}..{}", self.from, self.to)
        }
    }
}

impl From<(SeqPos, SeqPos)> for Span {
    fn from((a, b): (SeqPos, SeqPos)) -> Self {
        Span::new(a, b)
    }
}

impl From<Span> for (SeqPos, SeqPos) {
    fn from(span: Span) -> Self {
        (span.from, span.to)
    }
}
