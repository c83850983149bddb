//! A generic k-way merge over anything that can hand back one sorted
//! line at a time. Used directly by the external sorter to fold
//! spilled runs back together, and reused by the join stage to merge
//! the sorted sitelink stream against every sorted monthly pageview
//! stream without re-sorting any of them.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::io::{self, BufRead};

/// A single already-sorted stream of lines, tagged for diagnostics
/// (typically the spill file path or the name of the input it came
/// from).
pub trait LineSource {
    fn tag(&self) -> &str;
    fn next_line(&mut self) -> io::Result<Option<String>>;
}

struct HeapEntry {
    line: String,
    source: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.line == other.line
    }
}
impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so `BinaryHeap`, which is a max-heap, yields the
        // lexicographically smallest line first.
        other.line.cmp(&self.line).then_with(|| other.source.cmp(&self.source))
    }
}

/// Merges any number of sorted [`LineSource`]s into a single sorted
/// stream, advancing each source lazily as its head is consumed.
pub struct KWayMerger<S: LineSource> {
    sources: Vec<S>,
    heap: BinaryHeap<HeapEntry>,
    primed: bool,
}

impl<S: LineSource> KWayMerger<S> {
    pub fn new(sources: Vec<S>) -> Self {
        Self { sources, heap: BinaryHeap::new(), primed: false }
    }

    fn prime(&mut self) -> io::Result<()> {
        for (idx, source) in self.sources.iter_mut().enumerate() {
            if let Some(line) = source.next_line()? {
                self.heap.push(HeapEntry { line, source: idx });
            }
        }
        self.primed = true;
        Ok(())
    }

    /// Returns the tag of the source the next line would come from,
    /// without consuming it. Useful for callers that need to know
    /// which scanner produced a record (e.g. the join stage).
    pub fn peek_source_tag(&mut self) -> io::Result<Option<&str>> {
        if !self.primed {
            self.prime()?;
        }
        Ok(self.heap.peek().map(|entry| self.sources[entry.source].tag()))
    }

    /// Pops the smallest remaining line and refills from the source
    /// it came from.
    pub fn next_line(&mut self) -> io::Result<Option<String>> {
        if !self.primed {
            self.prime()?;
        }
        let Some(entry) = self.heap.pop() else { return Ok(None) };
        if let Some(line) = self.sources[entry.source].next_line()? {
            self.heap.push(HeapEntry { line, source: entry.source });
        }
        Ok(Some(entry.line))
    }
}

/// A [`LineSource`] over any `BufRead`, tagged with a fixed label.
/// Lets callers build a homogeneous `Vec` of sources out of otherwise
/// unrelated readers (a sitelinks file, a dozen monthly pageview
/// files) for [`KWayMerger`].
pub struct BufLineSource<R> {
    tag: String,
    lines: io::Lines<R>,
}

impl<R: BufRead> BufLineSource<R> {
    pub fn new(tag: impl Into<String>, reader: R) -> Self {
        Self { tag: tag.into(), lines: reader.lines() }
    }
}

impl<R: BufRead> LineSource for BufLineSource<R> {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn next_line(&mut self) -> io::Result<Option<String>> {
        self.lines.next().transpose()
    }
}
