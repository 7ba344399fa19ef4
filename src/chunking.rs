//! Time-range chunk planning: split `[start, end)` into equal-width sub-ranges so
//! each one is expected to return about `target_chunk_size` documents.

use std::fmt;

/// Half-open epoch interval `[start, stop)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeChunk {
    pub start: i64,
    pub stop: i64,
}

impl TimeChunk {
    pub fn new(start: i64, stop: i64) -> Self {
        Self { start, stop }
    }

    /// Exclusive lower bound in index terms (`created_utc > after`).
    pub fn after(&self) -> i64 {
        self.start - 1
    }

    /// Exclusive upper bound in index terms (`created_utc < before`).
    pub fn before(&self) -> i64 {
        self.stop
    }

    pub fn width(&self) -> i64 {
        self.stop - self.start
    }

    pub fn contains(&self, epoch: i64) -> bool {
        epoch >= self.start && epoch < self.stop
    }
}

impl fmt::Display for TimeChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.stop)
    }
}

/// `ceil(estimated / target)`, never below 1.
pub fn chunk_count(estimated: u64, target: u64) -> usize {
    let target = target.max(1);
    estimated.div_ceil(target).max(1) as usize
}

/// Contiguous, strictly increasing sub-ranges covering `[start, end)` exactly.
///
/// Widths are `(end - start) / n` whole seconds; the last chunk absorbs the
/// remainder. The chunk count is capped at the range width so no chunk is empty.
/// An empty or inverted range yields no chunks.
pub fn plan_chunks(start: i64, end: i64, estimated: u64, target: u64) -> Vec<TimeChunk> {
    if end <= start {
        return Vec::new();
    }
    let span = end - start;
    let n = (chunk_count(estimated, target) as i64).min(span);
    let width = span / n;

    let mut out = Vec::with_capacity(n as usize);
    let mut lo = start;
    for i in 0..n {
        let hi = if i == n - 1 { end } else { lo + width };
        out.push(TimeChunk::new(lo, hi));
        lo = hi;
    }
    out
}
