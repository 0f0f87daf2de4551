use crate::BytePosition;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
  pub start: BytePosition,
  pub end: BytePosition,
}

impl Span {
  /// Create a new span with validation.
  ///
  /// # Panics
  /// Panics in debug mode if `start > end`.
  pub fn new(
    start: u32,
    end: u32,
  ) -> Self {
    debug_assert!(
      start <= end,
      "Span::new() called with invalid range: start {} > end {}",
      start,
      end
    );
    Self {
      start: BytePosition(start),
      end: BytePosition(end),
    }
  }

  pub fn empty_at(pos: BytePosition) -> Self {
    Self { start: pos, end: pos }
  }

  pub fn merge(
    a: &Self,
    b: &Self,
  ) -> Self {
    Self {
      start: a.start.min(b.start),
      end: a.end.max(b.end),
    }
  }

  /// Inclusive on both ends, so a caret right after the last character still counts.
  pub fn contains(
    &self,
    pos: BytePosition,
  ) -> bool {
    self.start <= pos && pos <= self.end
  }

  pub fn ends_before(
    &self,
    pos: BytePosition,
  ) -> bool {
    self.end <= pos
  }

  pub fn len(&self) -> usize {
    if self.end.0 >= self.start.0 {
      (self.end.0 - self.start.0) as usize
    } else {
      0
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl std::fmt::Display for Span {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>,
  ) -> std::fmt::Result {
    write!(f, "{}..{}", self.start, self.end)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_contains_is_inclusive() {
    let span = Span::new(4, 10);
    assert!(span.contains(BytePosition(4)));
    assert!(span.contains(BytePosition(10)));
    assert!(!span.contains(BytePosition(11)));
    assert!(!span.contains(BytePosition(3)));
  }

  #[test]
  fn test_merge() {
    let merged = Span::merge(&Span::new(8, 12), &Span::new(2, 5));
    assert_eq!(merged, Span::new(2, 12));
    assert_eq!(merged.len(), 10);
  }
}
