use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in a source text. Lines are 1-based, columns are 0-based,
/// matching what tokenizers usually report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Point {
    pub line: u32,
    pub column: u32,
}

impl Point {
    /// The start of any source text.
    pub const START: Point = Point { line: 1, column: 0 };

    pub fn new(line: u32, column: u32) -> Point {
        Point { line, column }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A contiguous region of a source text, from `start` (inclusive) to `end` (exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: Point,
    pub end: Point,
}

impl Range {
    pub fn new(start: Point, end: Point) -> Range {
        Range { start, end }
    }

    /// A zero-width range at the given point.
    pub fn at(point: Point) -> Range {
        Range {
            start: point,
            end: point,
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        self.start <= point && point < self.end
    }

    /// The smallest range covering both `self` and `other`.
    pub fn union(&self, other: &Range) -> Range {
        Range {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_is_end_exclusive() {
        let range = Range::new(Point::new(1, 0), Point::new(1, 5));
        assert!(range.contains(Point::new(1, 0)));
        assert!(range.contains(Point::new(1, 4)));
        assert!(!range.contains(Point::new(1, 5)));
        assert!(!range.contains(Point::new(2, 0)));
    }

    #[test]
    fn union_spans_both_ranges() {
        let a = Range::new(Point::new(1, 2), Point::new(1, 6));
        let b = Range::new(Point::new(3, 0), Point::new(3, 4));
        assert_eq!(a.union(&b), Range::new(Point::new(1, 2), Point::new(3, 4)));
        assert_eq!(b.union(&a), a.union(&b));
    }
}
