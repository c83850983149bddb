//! Chunked in-memory sort, disk spill and k-way merge. The one sort
//! engine every line-encoded stage (sitelinks, pageviews, per-entity
//! counts) runs through, since they all share the `<key> <value>`
//! line format.

use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};

use rayon::prelude::*;

use crate::cancellation::{CancellationToken, PollGuard};
use crate::errors::SortError;
use crate::merger::{KWayMerger, LineSource};

/// How many lines are sorted in memory before a run is spilled to
/// disk. Tuned down for predictable memory use rather than for raw
/// throughput; callers processing huge inputs should lower this
/// further if they run many stages concurrently.
const DEFAULT_CHUNK_LINES: usize = 1_000_000;

pub struct ExternalSorter {
    chunk_lines: usize,
    workers: usize,
}

impl Default for ExternalSorter {
    fn default() -> Self {
        Self { chunk_lines: DEFAULT_CHUNK_LINES, workers: num_cpus::get().max(1) }
    }
}

impl ExternalSorter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunk_lines(mut self, n: usize) -> Self {
        self.chunk_lines = n.max(1);
        self
    }

    pub fn with_workers(mut self, n: usize) -> Self {
        self.workers = n.max(1);
        self
    }

    /// Sorts every line from `input`, combining lines that share a key
    /// via `combine`, and writes the result to `output` in ascending
    /// order with no duplicate keys remaining.
    ///
    /// `combine` is only ever called on two lines whose keys (the text
    /// before the first space) are equal; it decides how they merge
    /// (e.g. summing a trailing count, or rejecting the merge if
    /// duplicate keys are themselves an error for this stream).
    pub fn sort_lines<R, W>(
        &self,
        input: R,
        mut output: W,
        cancellation: &CancellationToken,
        combine: impl Fn(&str, &str) -> Result<String, SortError> + Sync,
    ) -> Result<(), SortError>
    where
        R: BufRead,
        W: Write,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .map_err(|e| SortError::Io(std::io::Error::other(e)))?;

        let mut runs: Vec<SpillFile> = Vec::new();
        let mut chunk: Vec<String> = Vec::with_capacity(self.chunk_lines);
        let mut guard = PollGuard::new(cancellation);

        for line in input.lines() {
            let line = line?;
            if guard.tick() {
                return Err(SortError::Cancelled);
            }
            chunk.push(line);
            if chunk.len() >= self.chunk_lines {
                runs.push(Self::spill_sorted_chunk(&pool, std::mem::take(&mut chunk))?);
            }
        }
        if !chunk.is_empty() {
            runs.push(Self::spill_sorted_chunk(&pool, chunk)?);
        }

        let sources: Vec<SpillFile> = runs;
        let mut merger = KWayMerger::new(sources);

        let mut pending: Option<String> = None;
        loop {
            if cancellation.is_cancelled() {
                return Err(SortError::Cancelled);
            }
            match merger.next_line()? {
                Some(line) => {
                    pending = Some(match pending {
                        None => line,
                        Some(prev) if key_of(&prev) == key_of(&line) => combine(&prev, &line)?,
                        Some(prev) => {
                            writeln!(output, "{prev}")?;
                            line
                        }
                    });
                }
                None => break,
            }
        }
        if let Some(last) = pending {
            writeln!(output, "{last}")?;
        }
        Ok(())
    }

    fn spill_sorted_chunk(pool: &rayon::ThreadPool, mut chunk: Vec<String>) -> Result<SpillFile, SortError> {
        pool.install(|| chunk.par_sort_unstable());

        let mut file = tempfile::tempfile()?;
        for line in &chunk {
            writeln!(file, "{line}")?;
        }
        file.seek(SeekFrom::Start(0))?;
        Ok(SpillFile { reader: BufReader::new(file) })
    }
}

fn key_of(line: &str) -> &str {
    line.split_once(' ').map(|(key, _)| key).unwrap_or(line)
}

struct SpillFile {
    reader: BufReader<std::fs::File>,
}

impl LineSource for SpillFile {
    fn tag(&self) -> &str {
        "spill"
    }

    fn next_line(&mut self) -> std::io::Result<Option<String>> {
        let mut buf = String::new();
        let read = self.reader.read_line(&mut buf)?;
        if read == 0 {
            return Ok(None);
        }
        if buf.ends_with('\n') {
            buf.pop();
            if buf.ends_with('\r') {
                buf.pop();
            }
        }
        Ok(Some(buf))
    }
}
