//! Source location tracking

/// A span covers a run of columns on a single source line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    /// Line number (1-based)
    pub line: usize,
    /// First column (1-based)
    pub start_col: usize,
    /// Last column (inclusive)
    pub end_col: usize,
}

impl Span {
    /// Create a new span
    pub fn new(line: usize, start_col: usize, end_col: usize) -> Self {
        Self { line, start_col, end_col }
    }

    /// Create a dummy span (for testing)
    #[cfg(test)]
    pub fn dummy() -> Self {
        Self { line: 0, start_col: 0, end_col: 0 }
    }

    /// Merge two spans.
    ///
    /// Spans only ever describe one line, so a span from a later line
    /// leaves `self` untouched.
    pub fn merge(&self, other: &Span) -> Span {
        if other.line != self.line {
            return *self;
        }
        Span {
            line: self.line,
            start_col: self.start_col.min(other.start_col),
            end_col: self.end_col.max(other.end_col),
        }
    }

    /// Number of columns covered (at least one)
    pub fn width(&self) -> usize {
        (self.end_col + 1).saturating_sub(self.start_col).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_same_line() {
        let a = Span::new(3, 5, 6);
        let b = Span::new(3, 10, 14);
        assert_eq!(a.merge(&b), Span::new(3, 5, 14));
        assert_eq!(b.merge(&a), Span::new(3, 5, 14));
    }

    #[test]
    fn test_merge_other_line_is_ignored() {
        let a = Span::new(3, 5, 6);
        let b = Span::new(4, 1, 20);
        assert_eq!(a.merge(&b), a);
    }

    #[test]
    fn test_width() {
        assert_eq!(Span::new(1, 4, 4).width(), 1);
        assert_eq!(Span::new(1, 4, 8).width(), 5);
    }
}
