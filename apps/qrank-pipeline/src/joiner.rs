//! C6 — merges the sorted sitelink stream against every sorted
//! monthly pageview stream on their shared `<wiki>.<site>/<title>`
//! key, via the same `KWayMerger` the external sorter uses to fold
//! spilled chunks back together. A merged line's value token tells
//! the two record kinds apart: `Q`-prefixed is a sitelink's entity id,
//! anything else is a pageview month's view count. Per key, the
//! entity id and every month's count are accumulated locally (several
//! wikis can point at the same entity under different keys, which the
//! merge alone cannot group), and an entity's total is only emitted
//! once both an entity and a positive view count were seen for it.

use std::io::{BufRead, Write};

use qrank_core_sort::cancellation::{CancellationToken, PollGuard};
use qrank_core_sort::{BufLineSource, KWayMerger};
use qrank_domain_models::entity::EntityId;
use qrank_domain_models::errors::PipelineError;
use qrank_domain_models::records::PerEntityViews;

const SITELINKS_TAG: &str = "sitelinks";

pub fn join_sitelinks_and_pageviews<R, W>(
    sitelinks: R,
    pageviews: Vec<R>,
    mut output: W,
    cancellation: &CancellationToken,
) -> Result<(), PipelineError>
where
    R: BufRead,
    W: Write,
{
    let mut sources = Vec::with_capacity(1 + pageviews.len());
    sources.push(BufLineSource::new(SITELINKS_TAG, sitelinks));
    for (idx, month) in pageviews.into_iter().enumerate() {
        sources.push(BufLineSource::new(format!("pageviews-{idx}"), month));
    }
    let mut merger = KWayMerger::new(sources);
    let mut guard = PollGuard::new(cancellation);

    let mut current_key: Option<String> = None;
    let mut current_entity: Option<EntityId> = None;
    let mut current_views: u64 = 0;

    while let Some(line) = merger.next_line().map_err(PipelineError::Io)? {
        if guard.tick() {
            return Err(PipelineError::Cancelled);
        }
        let (key, value) = line.split_once(' ').ok_or_else(|| PipelineError::InputMalformedFile {
            detail: format!("joined record {line:?} has no key/value separator"),
        })?;

        if current_key.as_deref() != Some(key) {
            flush(&mut output, current_key.take(), current_entity.take(), current_views)?;
            current_key = Some(key.to_string());
            current_views = 0;
        }

        if value.starts_with('Q') {
            current_entity = Some(EntityId::parse_qid(value)?);
        } else {
            let views: u64 = value.parse().map_err(|_| PipelineError::InputMalformedFile {
                detail: format!("joined record {line:?} has a non-numeric view count"),
            })?;
            current_views += views;
        }
    }
    flush(&mut output, current_key, current_entity, current_views)?;
    Ok(())
}

fn flush<W: Write>(
    output: &mut W,
    key: Option<String>,
    entity: Option<EntityId>,
    views: u64,
) -> Result<(), PipelineError> {
    if key.is_none() {
        return Ok(());
    }
    if let Some(entity) = entity {
        if views > 0 {
            let record = PerEntityViews { entity, views };
            output.write_all(record.encode().as_bytes())?;
            output.write_all(b"\n")?;
        }
    }
    Ok(())
}
