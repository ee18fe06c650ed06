//! Binary max-heap over `(symbol, frequency)` pairs.
//!
//! Used to stage the used symbols of an alphabet for code length
//! assignment. Popping yields the most frequent symbol first; equal
//! frequencies come out in ascending symbol order so that code lengths are
//! deterministic.

/// A heap entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapEntry {
    /// Symbol index in its alphabet.
    pub symbol: u16,
    /// Occurrence count.
    pub frequency: u64,
}

impl HeapEntry {
    /// Whether `self` must be popped before `other`.
    #[inline]
    fn outranks(&self, other: &Self) -> bool {
        self.frequency > other.frequency
            || (self.frequency == other.frequency && self.symbol < other.symbol)
    }
}

/// Binary max-heap keyed by frequency.
#[derive(Debug, Clone, Default)]
pub struct PriorityHeap {
    entries: Vec<HeapEntry>,
}

impl PriorityHeap {
    /// Create an empty heap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty heap with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the heap is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert a symbol with its frequency.
    pub fn push(&mut self, symbol: u16, frequency: u64) {
        self.entries.push(HeapEntry { symbol, frequency });

        let mut child = self.entries.len() - 1;
        while child > 0 {
            let parent = (child - 1) / 2;
            if !self.entries[child].outranks(&self.entries[parent]) {
                break;
            }
            self.entries.swap(child, parent);
            child = parent;
        }
    }

    /// Remove and return the most frequent entry.
    pub fn pop(&mut self) -> Option<HeapEntry> {
        let last = self.entries.len().checked_sub(1)?;
        self.entries.swap(0, last);
        let top = self.entries.pop();

        let len = self.entries.len();
        let mut parent = 0;
        loop {
            let left = 2 * parent + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let child = if right < len && self.entries[right].outranks(&self.entries[left]) {
                right
            } else {
                left
            };
            if !self.entries[child].outranks(&self.entries[parent]) {
                break;
            }
            self.entries.swap(child, parent);
            parent = child;
        }

        top
    }

    /// Peek at the most frequent entry.
    pub fn peek(&self) -> Option<&HeapEntry> {
        self.entries.first()
    }
}

impl Iterator for PriorityHeap {
    type Item = HeapEntry;

    fn next(&mut self) -> Option<HeapEntry> {
        self.pop()
    }
}
