//! C9 — the pipeline driver. Runs every stage in order (extraction
//! fanned out over sibling threads, a fail-fast group that cancels the
//! others the moment one errors), consults and updates the cache
//! manifest, and publishes the final artifacts atomically.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Cursor, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use bzip2::read::BzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use qrank_core_sort::cancellation::CancellationToken;
use qrank_core_sort::{ExternalSorter, SortError};
use qrank_domain_models::errors::{Counters, PipelineError};
use qrank_infra_storage::{LocalFsStore, ObjectStore};
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use tracing::{info, instrument, warn};

use crate::cache::{evict_stale, eviction_anchor, CacheManifest};
use crate::dump_locator::{DumpLocator, MonthlyPageviewDays};
use crate::entity_extractor::extract_sitelinks;
use crate::joiner::join_sitelinks_and_pageviews;
use crate::pageview_extractor::extract_pageviews;
use crate::rank_builder::build_ranks;
use crate::stats_builder::{build_stats, DEFAULT_SAMPLE_COUNT, DEFAULT_TOP_N};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Published,
    AlreadyPublished,
}

pub struct Driver {
    pub input_root: PathBuf,
    pub work_dir: PathBuf,
    pub output_dir: PathBuf,
    pub workers: usize,
}

fn sum_counts(a: &str, b: &str) -> Result<String, SortError> {
    let (key, va) = a.split_once(' ').ok_or_else(|| SortError::UnmergeableDuplicate(a.to_string()))?;
    let (_, vb) = b.split_once(' ').ok_or_else(|| SortError::UnmergeableDuplicate(b.to_string()))?;
    let sum: u64 = va.parse::<u64>().unwrap_or(0) + vb.parse::<u64>().unwrap_or(0);
    Ok(format!("{key} {sum}"))
}

fn reject_duplicates(a: &str, _b: &str) -> Result<String, SortError> {
    Err(SortError::UnmergeableDuplicate(a.to_string()))
}

fn open_bz2(path: &PathBuf) -> Result<BufReader<BzDecoder<File>>, PipelineError> {
    let file = File::open(path)?;
    Ok(BufReader::new(BzDecoder::new(file)))
}

fn gzip_bytes(data: &[u8]) -> Result<Vec<u8>, PipelineError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish().map_err(PipelineError::Io)
}

fn month_sorted_path(work_dir: &std::path::Path, month: &MonthlyPageviewDays) -> PathBuf {
    work_dir.join(format!("pageviews-{:04}{:02}.sorted", month.year, month.month))
}

impl Driver {
    #[instrument(skip(self))]
    pub fn run(&self, dry_run: bool) -> Result<PublishOutcome, PipelineError> {
        fs::create_dir_all(&self.work_dir)?;
        let cache_dir = self.work_dir.join("cache");

        let manifest = CacheManifest::load(&cache_dir)?.unwrap_or_default();
        if let Some(anchor) = eviction_anchor(&manifest) {
            let evicted = evict_stale(&cache_dir, anchor)?;
            if !evicted.is_empty() {
                info!(count = evicted.len(), "evicted stale cache intermediates");
            }
        }

        let locator = DumpLocator::new(&self.input_root);
        let located = locator.locate_entity_dump()?;
        info!(dump_date = %located.dump_date, path = %located.entity_dump_path.display(), "located entity dump");

        if manifest.already_published(located.dump_date) {
            info!(dump_date = %located.dump_date, "dump already published, nothing to do");
            return Ok(PublishOutcome::AlreadyPublished);
        }

        let csv_key = format!("public/qrank-{}.csv.gz", located.dump_date.format("%Y%m%d"));
        let stats_key = format!("public/qrank-stats-{}.json", located.dump_date.format("%Y%m%d"));
        let store = LocalFsStore::new(&self.output_dir);
        if !dry_run {
            let csv_present = store.stat(&csv_key).map_err(|e| PipelineError::Storage(e.to_string()))?.is_some();
            let stats_present = store.stat(&stats_key).map_err(|e| PipelineError::Storage(e.to_string()))?.is_some();
            if csv_present && stats_present {
                info!(%csv_key, %stats_key, "both artifacts already present in storage, skipping upload");
                CacheManifest::publish(&cache_dir, located.dump_date, self.artifact_paths(&csv_key, &stats_key))?;
                return Ok(PublishOutcome::AlreadyPublished);
            }
        }

        let months = locator.locate_pageview_months(located.dump_date)?;

        let cancellation = CancellationToken::new();
        let sorter = ExternalSorter::new().with_workers(self.workers);
        let counters = Counters::new();

        let sitelinks_sorted_path = self.work_dir.join("sitelinks.sorted");
        let month_paths: Vec<PathBuf> = months.iter().map(|m| month_sorted_path(&self.work_dir, m)).collect();

        let entity_dump_path = located.entity_dump_path.clone();
        let sitelinks_cancellation = cancellation.clone();
        let sitelinks_out_path = sitelinks_sorted_path.clone();

        let pageviews_cancellation = cancellation.clone();

        let errors: Mutex<Vec<PipelineError>> = Mutex::new(Vec::new());

        std::thread::scope(|scope| {
            let sorter_ref = &sorter;
            let counters_ref = &counters;
            let errors_ref = &errors;
            let workers_for_cancel = cancellation.clone();
            let months_ref = &months;
            let month_paths_ref = &month_paths;

            let sitelinks_handle = scope.spawn(move || {
                let result = (|| -> Result<(), PipelineError> {
                    let reader = open_bz2(&entity_dump_path)?;
                    let mut unsorted = Vec::new();
                    extract_sitelinks(reader, &mut unsorted, &sitelinks_cancellation, counters_ref)?;
                    let file = File::create(&sitelinks_out_path)?;
                    let mut writer = BufWriter::new(file);
                    sorter_ref
                        .sort_lines(Cursor::new(unsorted), &mut writer, &sitelinks_cancellation, reject_duplicates)
                        .map_err(map_sort_error)?;
                    writer.flush()?;
                    Ok(())
                })();
                if let Err(e) = result {
                    errors_ref.lock().unwrap().push(e);
                    workers_for_cancel.cancel();
                }
            });

            let pageviews_cancel_for_propagation = cancellation.clone();
            let pageviews_handle = scope.spawn(move || {
                let result: Result<(), PipelineError> = months_ref.par_iter().zip(month_paths_ref.par_iter()).try_for_each(
                    |(month, out_path)| -> Result<(), PipelineError> {
                        let day_buffers: Vec<Result<Vec<u8>, PipelineError>> = month
                            .daily_files
                            .par_iter()
                            .map(|day_path| {
                                let reader = open_bz2(day_path)?;
                                let mut buf = Vec::new();
                                extract_pageviews(reader, &mut buf, &pageviews_cancellation, counters_ref)?;
                                Ok(buf)
                            })
                            .collect();

                        let mut unsorted = Vec::new();
                        for buf in day_buffers {
                            unsorted.extend(buf?);
                        }
                        let file = File::create(out_path)?;
                        let mut writer = BufWriter::new(file);
                        sorter_ref
                            .sort_lines(Cursor::new(unsorted), &mut writer, &pageviews_cancellation, sum_counts)
                            .map_err(map_sort_error)?;
                        writer.flush()?;
                        Ok(())
                    },
                );
                if let Err(e) = result {
                    errors_ref.lock().unwrap().push(e);
                    pageviews_cancel_for_propagation.cancel();
                }
            });

            sitelinks_handle.join().expect("sitelinks extraction thread panicked");
            pageviews_handle.join().expect("pageview extraction thread panicked");
        });

        if let Some(error) = errors.into_inner().unwrap().into_iter().next() {
            warn!(malformed_records = counters.total(), "pipeline stage failed");
            return Err(error);
        }
        if counters.total() > 0 {
            warn!(
                malformed_sitelinks = counters.malformed_sitelinks(),
                malformed_pageviews = counters.malformed_pageviews(),
                unmapped_wiki_codes = counters.unmapped_wiki_codes(),
                "skipped malformed records"
            );
        }

        let per_entity_path = self.work_dir.join("per_entity.unsorted");
        {
            let sitelinks_reader = BufReader::new(File::open(&sitelinks_sorted_path)?);
            let month_readers: Vec<BufReader<File>> =
                month_paths.iter().map(|p| File::open(p).map(BufReader::new)).collect::<Result<_, _>>()?;
            let mut writer = BufWriter::new(File::create(&per_entity_path)?);
            join_sitelinks_and_pageviews(sitelinks_reader, month_readers, &mut writer, &cancellation)?;
            writer.flush()?;
        }

        let mut csv_bytes = Vec::new();
        let ranks = {
            let reader = BufReader::new(File::open(&per_entity_path)?);
            build_ranks(reader, &mut csv_bytes, &sorter, &cancellation)?
        };

        let stats = build_stats(&ranks, DEFAULT_TOP_N, DEFAULT_SAMPLE_COUNT);
        let stats_bytes = serde_json::to_vec_pretty(&stats).map_err(|e| PipelineError::Storage(e.to_string()))?;

        if dry_run {
            info!(ranked_entities = ranks.len(), "dry run: not publishing");
            return Ok(PublishOutcome::Published);
        }

        let gzipped_csv = gzip_bytes(&csv_bytes)?;
        let csv_digest = hex::encode(Sha256::digest(&gzipped_csv));
        let stats_digest = hex::encode(Sha256::digest(&stats_bytes));

        store
            .put_stream(&csv_key, "text/csv", Box::new(Cursor::new(gzipped_csv)))
            .map_err(|e| PipelineError::Storage(e.to_string()))?;
        store
            .put_stream(&stats_key, "application/json", Box::new(Cursor::new(stats_bytes)))
            .map_err(|e| PipelineError::Storage(e.to_string()))?;
        info!(qrank_csv_sha256 = %csv_digest, qrank_stats_sha256 = %stats_digest, "sealed published artifacts");

        CacheManifest::publish(&cache_dir, located.dump_date, self.artifact_paths(&csv_key, &stats_key))?;

        info!(ranked_entities = ranks.len(), dump_date = %located.dump_date, "published {csv_key} and {stats_key}");
        Ok(PublishOutcome::Published)
    }

    fn artifact_paths(&self, csv_key: &str, stats_key: &str) -> std::collections::HashMap<String, String> {
        let mut artifacts = std::collections::HashMap::new();
        artifacts.insert("csv".to_string(), self.output_dir.join(csv_key).display().to_string());
        artifacts.insert("stats".to_string(), self.output_dir.join(stats_key).display().to_string());
        artifacts
    }
}

fn map_sort_error(e: SortError) -> PipelineError {
    match e {
        SortError::Cancelled => PipelineError::Cancelled,
        SortError::Io(io) => PipelineError::Io(io),
        SortError::UnmergeableDuplicate(key) => {
            PipelineError::InputMalformedFile { detail: format!("duplicate key after sort: {key}") }
        }
    }
}
