//! C7 — orders entities by view count descending (ties broken by
//! entity id ascending) and writes the published CSV: a header row
//! followed by one `Entity,QRank` row per entity, in that order. A
//! row's position in the file is its rank; the file itself stores no
//! ordinal. Reuses the same external sorter as every other stage by
//! encoding the rank order as a sortable string key.

use std::io::{BufRead, Write};

use qrank_core_sort::cancellation::CancellationToken;
use qrank_core_sort::{ExternalSorter, SortError};
use qrank_domain_models::entity::EntityId;
use qrank_domain_models::errors::PipelineError;
use qrank_domain_models::records::{PerEntityViews, RankRecord};

const CSV_HEADER: &str = "Entity,QRank";

/// A line that sorts ascending exactly in rank order: views descending
/// (via `u64::MAX - views`, zero-padded so string order matches
/// numeric order) then entity id ascending.
fn rank_sort_key(record: &PerEntityViews) -> String {
    format!("{:020} {:020} {}", u64::MAX - record.views, record.entity.get(), record.views)
}

fn reject_duplicate_entities(a: &str, _b: &str) -> Result<String, SortError> {
    Err(SortError::UnmergeableDuplicate(a.to_string()))
}

/// Reads unsorted `PerEntityViews` lines from `input`, writes a header
/// row followed by `Entity,QRank` CSV rows to `csv_output` in rank
/// order, and returns the same rows for the stats stage to summarise.
pub fn build_ranks<R, W>(
    input: R,
    mut csv_output: W,
    sorter: &ExternalSorter,
    cancellation: &CancellationToken,
) -> Result<Vec<RankRecord>, PipelineError>
where
    R: BufRead,
    W: Write,
{
    let mut keyed = String::new();
    for line in input.lines() {
        let record = PerEntityViews::decode(&line?)?;
        keyed.push_str(&rank_sort_key(&record));
        keyed.push('\n');
    }

    let mut sorted = Vec::new();
    sorter
        .sort_lines(keyed.as_bytes(), &mut sorted, cancellation, reject_duplicate_entities)
        .map_err(|e| match e {
            SortError::Cancelled => PipelineError::Cancelled,
            SortError::Io(io) => PipelineError::Io(io),
            SortError::UnmergeableDuplicate(key) => {
                PipelineError::InputMalformedFile { detail: format!("duplicate entity in rank input: {key}") }
            }
        })?;

    writeln!(csv_output, "{CSV_HEADER}")?;

    let mut rows = Vec::new();
    for line in std::str::from_utf8(&sorted)
        .map_err(|e| PipelineError::InputMalformedFile { detail: e.to_string() })?
        .lines()
    {
        let mut columns = line.split(' ');
        let _rank_bucket = columns.next();
        let entity_value: u64 = columns
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| PipelineError::InputMalformedFile { detail: format!("malformed rank row: {line:?}") })?;
        let views: u64 = columns
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| PipelineError::InputMalformedFile { detail: format!("malformed rank row: {line:?}") })?;

        let record = RankRecord { entity: EntityId::new(entity_value)?, views };
        writeln!(csv_output, "{record}")?;
        rows.push(record);
    }
    Ok(rows)
}
