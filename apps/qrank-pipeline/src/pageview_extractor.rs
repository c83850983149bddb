//! C3 — scans one day's pageview file (six whitespace-separated
//! columns per line) for the wiki code, title and view count, folding
//! each title onto the same normalised join key the sitelink
//! extractor produces. The driver runs this once per daily bzip2 file
//! and sums the results per month via the external sorter (C4).

use std::io::{BufRead, Write};

use percent_encoding::percent_decode_str;
use qrank_core_sort::cancellation::{CancellationToken, PollGuard};
use qrank_domain_models::errors::{Counters, PipelineError};
use qrank_domain_models::normalize::normalise;
use qrank_domain_models::records::{join_key, PageviewRecord};
use qrank_domain_models::wiki::canonicalise;

const EXPECTED_COLUMNS: usize = 6;
const WIKI_COLUMN: usize = 0;
const TITLE_COLUMN: usize = 1;
const COUNT_COLUMN: usize = 4;

pub fn extract_pageviews<R: BufRead, W: Write>(
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
        if let Some(record) = pageview_in_line(&line, counters) {
            output.write_all(record.encode().as_bytes())?;
            output.write_all(b"\n")?;
        }
    }
    Ok(())
}

fn pageview_in_line(line: &str, counters: &Counters) -> Option<PageviewRecord> {
    let columns: Vec<&str> = line.split_whitespace().collect();
    if columns.len() != EXPECTED_COLUMNS {
        counters.record_malformed_pageview();
        return None;
    }

    let Some((wiki, site)) = columns[WIKI_COLUMN].split_once('.') else {
        counters.record_malformed_pageview();
        return None;
    };

    let views: u64 = match columns[COUNT_COLUMN].parse() {
        Ok(v) => v,
        Err(_) => {
            counters.record_malformed_pageview();
            return None;
        }
    };

    let title = decode_pageview_title(columns[TITLE_COLUMN]);
    let Some(canonical) = canonicalise(wiki, site, &title) else {
        return None;
    };
    let normalised = normalise(&canonical.title, &canonical.wiki);
    let key = join_key(&canonical.wiki, &canonical.site, &normalised);
    Some(PageviewRecord { key, views })
}

/// Undoes the pageview dump's title encoding: percent-escapes first
/// (falling back to the raw bytes if they are not valid UTF-8 once
/// decoded), then underscores standing in for spaces.
fn decode_pageview_title(raw: &str) -> String {
    let decoded = percent_decode_str(raw)
        .decode_utf8()
        .map(|cow| cow.into_owned())
        .unwrap_or_else(|_| raw.to_string());
    decoded.replace('_', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn counters() -> Counters {
        Counters::new()
    }

    #[test]
    fn parses_a_well_formed_line() {
        let line = "als.wikipedia Ägypte 4623 mobile-web 2 N1P1";
        let record = pageview_in_line(line, &counters()).unwrap();
        assert_eq!(record.key, "gsw.wikipedia/ägypte");
        assert_eq!(record.views, 2);
    }

    #[test]
    fn decodes_percent_escapes_and_underscores() {
        assert_eq!(decode_pageview_title("New_York_City"), "New York City");
        assert_eq!(decode_pageview_title("Caf%C3%A9"), "Café");
    }

    #[test]
    fn rejects_lines_with_the_wrong_column_count() {
        let line = "en.wikipedia Foo 1 2 3";
        assert!(pageview_in_line(line, &counters()).is_none());
    }

    #[test]
    fn rejects_non_numeric_counts() {
        let line = "en.wikipedia Foo 1 desktop NaN X";
        assert!(pageview_in_line(line, &counters()).is_none());
    }

    #[test]
    fn extract_pageviews_writes_one_line_per_record() {
        let input = "en.wikipedia Zurich 1 desktop 7 X\n";
        let mut output = Vec::new();
        extract_pageviews(Cursor::new(input), &mut output, &CancellationToken::new(), &counters()).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "en.wikipedia/zurich 7\n");
    }
}
