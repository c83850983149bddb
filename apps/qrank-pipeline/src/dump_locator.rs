//! C1 — locates the entity dump to process and the twelve full
//! calendar months of daily pageview files that precede it. Pure
//! filesystem resolution: no network access. The entity dump is
//! reached by resolving the `latest-all.json.bz2` alias, which is a
//! symlink into a dated `YYYYMMDD` subdirectory; that directory name,
//! not anything embedded in a filename, is the dump date.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use qrank_domain_models::PipelineError;

const ENTITY_DUMP_LATEST_LINK: &str = "latest-all.json.bz2";
const MONTHS_OF_PAGEVIEWS: u32 = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedDump {
    pub entity_dump_path: PathBuf,
    pub dump_date: NaiveDate,
}

/// One month's worth of daily pageview files, earliest day first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyPageviewDays {
    pub year: i32,
    pub month: u32,
    pub daily_files: Vec<PathBuf>,
}

pub struct DumpLocator {
    input_root: PathBuf,
}

impl DumpLocator {
    pub fn new(input_root: impl Into<PathBuf>) -> Self {
        Self { input_root: input_root.into() }
    }

    /// Resolves `<root>/wikidatawiki/entities/latest-all.json.bz2`,
    /// which is expected to be a symlink into a dated `YYYYMMDD`
    /// subdirectory, and reads the dump date off that directory name.
    pub fn locate_entity_dump(&self) -> Result<LocatedDump, PipelineError> {
        let link = self.input_root.join("wikidatawiki").join("entities").join(ENTITY_DUMP_LATEST_LINK);

        fs::read_link(&link)
            .map_err(|e| PipelineError::InputMissing { detail: format!("{}: {e}", link.display()) })?;
        let resolved = fs::canonicalize(&link)
            .map_err(|e| PipelineError::InputMissing { detail: format!("{}: {e}", link.display()) })?;

        let dump_date = dated_directory_component(&resolved).ok_or_else(|| PipelineError::InputMalformedFile {
            detail: format!("no YYYYMMDD directory component in {}", resolved.display()),
        })?;

        Ok(LocatedDump { entity_dump_path: resolved, dump_date })
    }

    /// The twelve full calendar months immediately preceding
    /// `dump_date`'s month, earliest first, each with every calendar
    /// day's pageview file resolved and checked for existence.
    pub fn locate_pageview_months(&self, dump_date: NaiveDate) -> Result<Vec<MonthlyPageviewDays>, PipelineError> {
        let mut months = Vec::with_capacity(MONTHS_OF_PAGEVIEWS as usize);

        for months_back in (1..=MONTHS_OF_PAGEVIEWS).rev() {
            let month_start = subtract_months(dump_date, months_back);
            let year = month_start.year();
            let month = month_start.month();

            let month_dir = self
                .input_root
                .join("other")
                .join("pageview_complete")
                .join(format!("{year:04}"))
                .join(format!("{year:04}-{month:02}"));

            let mut daily_files = Vec::with_capacity(31);
            for day in 1..=days_in_month(year, month) {
                let date = NaiveDate::from_ymd_opt(year, month, day).expect("day is within the month");
                let path = month_dir.join(format!("pageviews-{}-user.bz2", date.format("%Y%m%d")));
                if !path.exists() {
                    return Err(PipelineError::InputMissing { detail: format!("{}", path.display()) });
                }
                daily_files.push(path);
            }
            months.push(MonthlyPageviewDays { year, month, daily_files });
        }
        Ok(months)
    }
}

/// Scans `path`'s directory components, nearest to the file first,
/// for an 8-digit segment parseable as `%Y%m%d`.
fn dated_directory_component(path: &Path) -> Option<NaiveDate> {
    let parent = path.parent()?;
    parent.components().rev().find_map(|component| {
        let segment = component.as_os_str().to_str()?;
        if segment.len() == 8 && segment.bytes().all(|b| b.is_ascii_digit()) {
            NaiveDate::parse_from_str(segment, "%Y%m%d").ok()
        } else {
            None
        }
    })
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let first_of_next = NaiveDate::from_ymd_opt(next_year, next_month, 1).expect("computed month is always valid");
    first_of_next.pred_opt().expect("the day before the 1st always exists").day()
}

/// The first day of the month `months_back` months before `date`'s
/// month.
fn subtract_months(date: NaiveDate, months_back: u32) -> NaiveDate {
    let total_months = date.year() as i64 * 12 + date.month0() as i64 - months_back as i64;
    let year = total_months.div_euclid(12) as i32;
    let month0 = total_months.rem_euclid(12) as u32;
    NaiveDate::from_ymd_opt(year, month0 + 1, 1).expect("computed month is always valid")
}
