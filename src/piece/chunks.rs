use std::collections::BTreeMap;
use std::ops::Range;

/// A chunk request within a piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkSpec {
    pub piece: usize,
    pub begin: u64,
    pub length: u64,
}

/// Set of byte ranges received for one piece.
///
/// Ranges are kept merged, so re-delivery of the same chunk (endgame
/// duplicates, retransmits) never counts twice.
#[derive(Debug, Clone, Default)]
pub struct ReceivedRanges {
    /// start -> end, disjoint and non-adjacent.
    ranges: BTreeMap<u64, u64>,
    covered: u64,
}

impl ReceivedRanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `[start, end)` and returns how many bytes were new.
    pub fn insert(&mut self, start: u64, end: u64) -> u64 {
        if start >= end {
            return 0;
        }
        let before = self.covered;

        let touching: Vec<(u64, u64)> = self
            .ranges
            .range(..=end)
            .rev()
            .take_while(|&(_, &e)| e >= start)
            .map(|(&s, &e)| (s, e))
            .collect();

        let (mut start, mut end) = (start, end);
        for (s, e) in touching {
            self.ranges.remove(&s);
            self.covered -= e - s;
            start = start.min(s);
            end = end.max(e);
        }
        self.ranges.insert(start, end);
        self.covered += end - start;

        self.covered - before
    }

    /// Number of distinct bytes received.
    pub fn covered(&self) -> u64 {
        self.covered
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
        self.covered = 0;
    }

    pub fn contains(&self, range: Range<u64>) -> bool {
        self.ranges
            .range(..=range.start)
            .next_back()
            .is_some_and(|(_, &e)| e >= range.end)
    }

    /// Gaps within `[0, length)`.
    pub fn missing(&self, length: u64) -> Vec<Range<u64>> {
        let mut gaps = Vec::new();
        let mut cursor = 0;
        for (&s, &e) in &self.ranges {
            if s >= length {
                break;
            }
            if s > cursor {
                gaps.push(cursor..s);
            }
            cursor = cursor.max(e);
        }
        if cursor < length {
            gaps.push(cursor..length);
        }
        gaps
    }
}
