//! C2 — scans the entity dump (one JSON object per line) for sitelink
//! titles, without building a DOM: locate the id, locate the bounds of
//! the `sitelinks` object by brace-matching, then locate each
//! `"site":"..."`/`"title":"..."` pair by literal byte search.

use std::io::{BufRead, Write};

use qrank_core_sort::cancellation::{CancellationToken, PollGuard};
use qrank_domain_models::errors::{Counters, PipelineError};
use qrank_domain_models::entity::EntityId;
use qrank_domain_models::json_escape::unquote;
use qrank_domain_models::normalize::normalise;
use qrank_domain_models::records::{join_key, SitelinkRecord};
use qrank_domain_models::wiki::{canonicalise, split_sitelink_key};

const ID_MARKER: &str = ",\"id\":\"Q";
const SITELINKS_MARKER: &str = ",\"sitelinks\":{";
const SITE_MARKER: &str = "\"site\":\"";
const TITLE_MARKER: &str = "\"title\":\"";

/// Reads one JSON entity object per line from `input`, writes one
/// unsorted `SitelinkRecord` line per sitelink to `output`. Sorting is
/// the caller's job (`qrank_core_sort::ExternalSorter`).
pub fn extract_sitelinks<R: BufRead, W: Write>(
    input: R,
    mut output: W,
    cancellation: &CancellationToken,
    counters: &Counters,
) -> Result<(), PipelineError> {
    let mut guard = PollGuard::new(cancellation);

    for line in input.lines() {
        let line = line?;
        if guard.tick() {
            return Err(PipelineError::Cancelled);
        }
        for record in sitelinks_in_line(&line, counters) {
            output.write_all(record.encode().as_bytes())?;
            output.write_all(b"\n")?;
        }
    }
    Ok(())
}

fn sitelinks_in_line(line: &str, counters: &Counters) -> Vec<SitelinkRecord> {
    let mut out = Vec::new();

    let Some(entity) = extract_entity_id(line) else {
        return out;
    };

    let Some(sitelinks_open) = line.find(SITELINKS_MARKER).map(|idx| idx + SITELINKS_MARKER.len() - 1) else {
        return out;
    };
    let Some(sitelinks_close) = find_matching_brace(line.as_bytes(), sitelinks_open) else {
        counters.record_malformed_sitelink();
        return out;
    };
    let segment = &line[sitelinks_open..=sitelinks_close];

    let mut cursor = 0usize;
    while let Some(site_rel) = segment[cursor..].find(SITE_MARKER) {
        let site_value_start = cursor + site_rel + SITE_MARKER.len();
        let Some(site_value_end) = find_unescaped_quote(segment.as_bytes(), site_value_start) else {
            break;
        };
        let site_key = &segment[site_value_start..site_value_end];

        let Some(title_rel) = segment[site_value_end..].find(TITLE_MARKER) else {
            cursor = site_value_end;
            continue;
        };
        let title_value_start = site_value_end + title_rel + TITLE_MARKER.len();
        let Some(title_value_end) = find_unescaped_quote(segment.as_bytes(), title_value_start) else {
            break;
        };
        let raw_title_literal = format!("\"{}\"", &segment[title_value_start..title_value_end]);

        cursor = title_value_end + 1;

        let Some(split) = split_sitelink_key(site_key) else {
            counters.record_unmapped_wiki_code();
            continue;
        };
        let Some(raw_title) = unquote(&raw_title_literal) else {
            counters.record_malformed_sitelink();
            continue;
        };
        let Some(canonical) = canonicalise(&split.wiki, &split.site, &raw_title) else {
            continue;
        };
        let normalised = normalise(&canonical.title, &canonical.wiki);
        let key = join_key(&canonical.wiki, &canonical.site, &normalised);
        out.push(SitelinkRecord { key, entity });
    }

    out
}

fn extract_entity_id(line: &str) -> Option<EntityId> {
    let marker_idx = line.find(ID_MARKER)?;
    let digits_start = marker_idx + ID_MARKER.len() - 1;
    let digits_end = line[digits_start..].find('"').map(|rel| digits_start + rel)?;
    EntityId::parse_qid(&line[digits_start..digits_end]).ok()
}

/// Scans forward from a `"` at `start` for the next unescaped `"`,
/// returning its byte index.
fn find_unescaped_quote(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return Some(i),
            _ => i += 1,
        }
    }
    None
}

/// Finds the index of the `}` matching the `{` at `open_idx`, treating
/// bytes inside JSON string literals as opaque.
fn find_matching_brace(bytes: &[u8], open_idx: usize) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut i = open_idx;
    while i < bytes.len() {
        match bytes[i] {
            b'"' if !in_string => in_string = true,
            b'"' if in_string => in_string = false,
            b'\\' if in_string => {
                i += 1;
            }
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}
