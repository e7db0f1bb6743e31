//! Time intervals over [`Timestamp`]s.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::ids::Timestamp;

/// One end of a [`TimeInterval`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "limit", rename_all = "camelCase")]
pub enum TemporalBound {
    Unbounded,
    Inclusive(Timestamp),
    Exclusive(Timestamp),
}

/// An interval of time from `start` to `end`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start: TemporalBound,
    pub end: TemporalBound,
}

impl TimeInterval {
    pub fn new(start: TemporalBound, end: TemporalBound) -> Self {
        Self { start, end }
    }

    /// `[start, end)`, or `[start, ∞)` when `end` is `None`.
    ///
    /// This is the validity interval of an edition that starts at `start` and
    /// is superseded by the edition at `end`.
    pub fn for_edition(start: Timestamp, end: Option<Timestamp>) -> Self {
        Self {
            start: TemporalBound::Inclusive(start),
            end: end.map_or(TemporalBound::Unbounded, TemporalBound::Exclusive),
        }
    }

    /// The interval containing exactly one instant.
    pub fn at(timestamp: Timestamp) -> Self {
        Self {
            start: TemporalBound::Inclusive(timestamp.clone()),
            end: TemporalBound::Inclusive(timestamp),
        }
    }

    pub fn unbounded() -> Self {
        Self {
            start: TemporalBound::Unbounded,
            end: TemporalBound::Unbounded,
        }
    }

    pub fn contains_timestamp(&self, timestamp: &Timestamp) -> bool {
        let after_start = match &self.start {
            TemporalBound::Unbounded => true,
            TemporalBound::Inclusive(limit) => limit <= timestamp,
            TemporalBound::Exclusive(limit) => limit < timestamp,
        };
        let before_end = match &self.end {
            TemporalBound::Unbounded => true,
            TemporalBound::Inclusive(limit) => timestamp <= limit,
            TemporalBound::Exclusive(limit) => timestamp < limit,
        };
        after_start && before_end
    }

    /// True if the two intervals share at least one instant.
    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        self.intersection(other).is_some()
    }

    /// The overlapping part of two intervals, if any.
    pub fn intersection(&self, other: &TimeInterval) -> Option<TimeInterval> {
        let start = later_start(&self.start, &other.start).clone();
        let end = earlier_end(&self.end, &other.end).clone();
        let interval = TimeInterval { start, end };
        interval.is_non_empty().then_some(interval)
    }

    fn is_non_empty(&self) -> bool {
        match (&self.start, &self.end) {
            (TemporalBound::Unbounded, _) | (_, TemporalBound::Unbounded) => true,
            (TemporalBound::Inclusive(start), TemporalBound::Inclusive(end)) => start <= end,
            (TemporalBound::Inclusive(start), TemporalBound::Exclusive(end))
            | (TemporalBound::Exclusive(start), TemporalBound::Inclusive(end))
            | (TemporalBound::Exclusive(start), TemporalBound::Exclusive(end)) => start < end,
        }
    }
}

fn limit(bound: &TemporalBound) -> Option<&Timestamp> {
    match bound {
        TemporalBound::Unbounded => None,
        TemporalBound::Inclusive(limit) | TemporalBound::Exclusive(limit) => Some(limit),
    }
}

fn later_start<'a>(a: &'a TemporalBound, b: &'a TemporalBound) -> &'a TemporalBound {
    match (limit(a), limit(b)) {
        (None, _) => b,
        (_, None) => a,
        (Some(x), Some(y)) => match x.cmp(y) {
            Ordering::Greater => a,
            Ordering::Less => b,
            // At equal limits the exclusive bound is the tighter start.
            Ordering::Equal if matches!(a, TemporalBound::Exclusive(_)) => a,
            Ordering::Equal => b,
        },
    }
}

fn earlier_end<'a>(a: &'a TemporalBound, b: &'a TemporalBound) -> &'a TemporalBound {
    match (limit(a), limit(b)) {
        (None, _) => b,
        (_, None) => a,
        (Some(x), Some(y)) => match x.cmp(y) {
            Ordering::Less => a,
            Ordering::Greater => b,
            Ordering::Equal if matches!(a, TemporalBound::Exclusive(_)) => a,
            Ordering::Equal => b,
        },
    }
}
