//! Rectangles, scalar ranges and the relations between them.
//!
//! Coordinates use a top-left origin with `y` growing downward, the way
//! page geometry is delivered by the source.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle `(x0, y0, x1, y1)`.
///
/// Serialized as a four-element array, the same shape as the bounding boxes
/// in decoded page geometry.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct Rect {
    /// Left edge
    pub x0: f64,
    /// Top edge
    pub y0: f64,
    /// Right edge
    pub x1: f64,
    /// Bottom edge
    pub y1: f64,
}

/// How two rectangles relate to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// No shared area. Rectangles that only share an edge are disjoint.
    Disjoint,
    /// The first rectangle contains the second.
    AContainsB,
    /// The second rectangle contains the first.
    BContainsA,
    /// Positive-area overlap without containment.
    Overlap,
}

impl Relation {
    /// Check if the relation is [`Relation::Disjoint`].
    pub fn is_disjoint(self) -> bool {
        self == Relation::Disjoint
    }
}

impl Rect {
    /// Create a new rectangle.
    pub const fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Width (`x1 - x0`).
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    /// Height (`y1 - y0`).
    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    /// Check if either pair of edges is swapped.
    pub fn is_inverted(&self) -> bool {
        self.x0 > self.x1 || self.y0 > self.y1
    }

    /// Return a copy with swapped edges fixed so that `x0 <= x1` and `y0 <= y1`.
    pub fn normalized(&self) -> Self {
        Self {
            x0: self.x0.min(self.x1),
            y0: self.y0.min(self.y1),
            x1: self.x0.max(self.x1),
            y1: self.y0.max(self.y1),
        }
    }

    /// Shrink by `amount` on every side.
    pub fn shrink(&self, amount: f64) -> Self {
        Self {
            x0: self.x0 + amount,
            y0: self.y0 + amount,
            x1: self.x1 - amount,
            y1: self.y1 - amount,
        }
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Rect) -> Self {
        Self {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Check if `self` fully contains `other` (edges may coincide).
    pub fn contains(&self, other: &Rect) -> bool {
        self.x0 <= other.x0 && other.x1 <= self.x1 && self.y0 <= other.y0 && other.y1 <= self.y1
    }

    /// Check if the two rectangles share positive area, or one contains the other.
    pub fn intersects(&self, other: &Rect) -> bool {
        !self.relation(other).is_disjoint()
    }

    /// Check if the rectangles touch along an edge or corner without overlapping.
    pub fn touches(&self, other: &Rect) -> bool {
        let x_meet = self.x0 <= other.x1 && other.x0 <= self.x1;
        let y_meet = self.y0 <= other.y1 && other.y0 <= self.y1;
        x_meet && y_meet && !self.overlaps_strictly(other)
    }

    /// Classify the relation between `self` (a) and `other` (b).
    ///
    /// Containment is checked first, so a rectangle always contains itself.
    /// Edge-touching rectangles are [`Relation::Disjoint`].
    pub fn relation(&self, other: &Rect) -> Relation {
        if self.contains(other) {
            Relation::AContainsB
        } else if other.contains(self) {
            Relation::BContainsA
        } else if self.overlaps_strictly(other) {
            Relation::Overlap
        } else {
            Relation::Disjoint
        }
    }

    fn overlaps_strictly(&self, other: &Rect) -> bool {
        self.x0 < other.x1 && other.x0 < self.x1 && self.y0 < other.y1 && other.y0 < self.y1
    }
}

impl From<[f64; 4]> for Rect {
    fn from(v: [f64; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<Rect> for [f64; 4] {
    fn from(r: Rect) -> Self {
        [r.x0, r.y0, r.x1, r.y1]
    }
}

/// Free-function form of [`Rect::intersects`].
pub fn intersects(a: &Rect, b: &Rect) -> bool {
    a.intersects(b)
}

/// Free-function form of [`Rect::contains`].
pub fn contains(a: &Rect, b: &Rect) -> bool {
    a.contains(b)
}

/// Free-function form of [`Rect::relation`].
pub fn classify(a: &Rect, b: &Rect) -> Relation {
    a.relation(b)
}

/// A closed scalar interval `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Range {
    /// Lower bound
    pub min: f64,
    /// Upper bound
    pub max: f64,
}

impl Range {
    /// Create a new range.
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Range spanning every value yielded by the iterator, or `None` if it is empty.
    pub fn spanning<I: IntoIterator<Item = f64>>(values: I) -> Option<Self> {
        values.into_iter().fold(None, |acc, v| match acc {
            None => Some(Range::new(v, v)),
            Some(r) => Some(Range::new(r.min.min(v), r.max.max(v))),
        })
    }

    /// Length of the interval.
    pub fn len(&self) -> f64 {
        self.max - self.min
    }

    /// Check if the interval has zero length.
    pub fn is_empty(&self) -> bool {
        self.len() <= 0.0
    }

    /// Check if `value` lies inside the interval (inclusive).
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }

    /// Check if `value` lies inside `[min * (1 - tolerance), max * (1 + tolerance)]`.
    pub fn contains_with_tolerance(&self, value: f64, tolerance: f64) -> bool {
        self.min * (1.0 - tolerance) <= value && value <= self.max * (1.0 + tolerance)
    }

    /// Check if two intervals share at least one point.
    pub fn overlaps(&self, other: &Range) -> bool {
        self.min <= other.max && other.min <= self.max
    }
}

/// Merge overlapping or touching intervals.
///
/// The result is sorted by `min` and contains no two intervals that share a point.
pub fn merge_intervals(mut ranges: Vec<Range>) -> Vec<Range> {
    ranges.sort_by(|a, b| a.min.total_cmp(&b.min));

    let mut merged: Vec<Range> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if last.overlaps(&range) => last.max = last.max.max(range.max),
            _ => merged.push(range),
        }
    }
    merged
}
