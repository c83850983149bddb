//! End-to-end coverage of the full driver: a tiny two-entity, two-wiki
//! corpus run through extraction, sort, join, ranking and publication.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::os::unix::fs::symlink;

use bzip2::write::BzEncoder;
use bzip2::Compression as BzCompression;
use chrono::{Datelike, NaiveDate};
use flate2::read::GzDecoder;
use qrank_pipeline::driver::{Driver, PublishOutcome};
use serde_json::Value;

fn write_bz2(path: &std::path::Path, contents: &str) {
    let file = File::create(path).unwrap();
    let mut encoder = BzEncoder::new(file, BzCompression::best());
    encoder.write_all(contents.as_bytes()).unwrap();
    encoder.finish().unwrap();
}

fn write_entity_dump(path: &std::path::Path) {
    let lines = concat!(
        "{\"id\":\"Q72\",\"sitelinks\":{\"enwiki\":{\"site\":\"enwiki\",\"title\":\"Zurich\"},",
        "\"dewiki\":{\"site\":\"dewiki\",\"title\":\"Z\\u00fcrich\"}}}\n",
        "{\"id\":\"Q1\",\"sitelinks\":{\"enwiki\":{\"site\":\"enwiki\",\"title\":\"Bern\"}}}\n",
    );
    write_bz2(path, lines);
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1).unwrap().pred_opt().unwrap().day()
}

/// Builds the symlinked entity-dump layout plus twelve months of daily
/// pageview files. Only the first day of each month carries matching
/// pageview lines; every other day is present (so C1's existence
/// check passes) but empty, which keeps the expected totals simple.
fn build_fixture_corpus(root: &std::path::Path, dump_date: NaiveDate, zurich_views: u64, bern_views: u64) {
    let entities_dir = root.join("wikidatawiki").join("entities").join(dump_date.format("%Y%m%d").to_string());
    fs::create_dir_all(&entities_dir).unwrap();
    let dump_path = entities_dir.join(format!("wikidata-{}-all.json.bz2", dump_date.format("%Y%m%d")));
    write_entity_dump(&dump_path);
    symlink(&dump_path, root.join("wikidatawiki").join("entities").join("latest-all.json.bz2")).unwrap();

    for months_back in 1..=12u32 {
        let total = dump_date.year() as i64 * 12 + dump_date.month0() as i64 - months_back as i64;
        let year = total.div_euclid(12) as i32;
        let month = (total.rem_euclid(12) as u32) + 1;
        let month_dir = root
            .join("other")
            .join("pageview_complete")
            .join(format!("{year:04}"))
            .join(format!("{year:04}-{month:02}"));
        fs::create_dir_all(&month_dir).unwrap();

        for day in 1..=days_in_month(year, month) {
            let date = NaiveDate::from_ymd_opt(year, month, day).unwrap();
            let path = month_dir.join(format!("pageviews-{}-user.bz2", date.format("%Y%m%d")));
            if day == 1 {
                let contents = format!(
                    "en.wikipedia Zurich 1 desktop {zurich_views} X\nde.wikipedia Z%C3%BCrich 1 desktop 0 X\nen.wikipedia Bern 1 desktop {bern_views} X\n"
                );
                write_bz2(&path, &contents);
            } else {
                write_bz2(&path, "");
            }
        }
    }
}

fn read_gzipped_csv(path: &std::path::Path) -> String {
    let mut decoder = GzDecoder::new(File::open(path).unwrap());
    let mut out = String::new();
    decoder.read_to_string(&mut out).unwrap();
    out
}

#[test]
fn full_pipeline_publishes_ranked_csv_and_stats() {
    let workspace = tempfile::tempdir().unwrap();
    let input_root = workspace.path().join("in");
    let dump_date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
    build_fixture_corpus(&input_root, dump_date, 100, 50);

    let driver = Driver {
        input_root,
        work_dir: workspace.path().join("work"),
        output_dir: workspace.path().join("dist"),
        workers: 2,
    };

    let outcome = driver.run(false).unwrap();
    assert_eq!(outcome, PublishOutcome::Published);

    let csv_path = workspace.path().join("dist/public/qrank-20240115.csv.gz");
    let csv = read_gzipped_csv(&csv_path);
    let rows: Vec<&str> = csv.lines().collect();
    assert_eq!(rows[0], "Entity,QRank");
    assert_eq!(rows[1], "Q72,1200");
    assert_eq!(rows[2], "Q1,600");

    let stats_path = workspace.path().join("dist/public/qrank-stats-20240115.json");
    let stats: Value = serde_json::from_str(&fs::read_to_string(&stats_path).unwrap()).unwrap();
    assert_eq!(stats["Median"], 1);
    assert_eq!(stats["Samples"], serde_json::json!([["Q72", 1, 1200], ["Q1", 2, 600]]));

    assert!(workspace.path().join("work/cache/manifest.json").exists());
    assert!(!workspace.path().join("work/cache/manifest.json.tmp").exists());
}

#[test]
fn rerunning_an_already_published_dump_is_a_no_op() {
    let workspace = tempfile::tempdir().unwrap();
    let input_root = workspace.path().join("in");
    let dump_date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
    build_fixture_corpus(&input_root, dump_date, 100, 50);

    let driver = Driver {
        input_root,
        work_dir: workspace.path().join("work"),
        output_dir: workspace.path().join("dist"),
        workers: 1,
    };

    assert_eq!(driver.run(false).unwrap(), PublishOutcome::Published);
    let csv_path = workspace.path().join("dist/public/qrank-20240115.csv.gz");
    let first_csv = fs::read(&csv_path).unwrap();

    assert_eq!(driver.run(false).unwrap(), PublishOutcome::AlreadyPublished);
    let second_csv = fs::read(&csv_path).unwrap();
    assert_eq!(first_csv, second_csv);
}

#[test]
fn republishing_after_a_local_cache_wipe_does_not_reupload() {
    let workspace = tempfile::tempdir().unwrap();
    let input_root = workspace.path().join("in");
    let dump_date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
    build_fixture_corpus(&input_root, dump_date, 100, 50);

    let driver = Driver {
        input_root,
        work_dir: workspace.path().join("work"),
        output_dir: workspace.path().join("dist"),
        workers: 1,
    };

    assert_eq!(driver.run(false).unwrap(), PublishOutcome::Published);
    fs::remove_dir_all(workspace.path().join("work/cache")).unwrap();

    let csv_path = workspace.path().join("dist/public/qrank-20240115.csv.gz");
    let published_at = fs::metadata(&csv_path).unwrap().modified().unwrap();

    assert_eq!(driver.run(false).unwrap(), PublishOutcome::AlreadyPublished);
    assert_eq!(fs::metadata(&csv_path).unwrap().modified().unwrap(), published_at);
    assert!(workspace.path().join("work/cache/manifest.json").exists());
}

#[test]
fn dry_run_does_not_publish_artifacts() {
    let workspace = tempfile::tempdir().unwrap();
    let input_root = workspace.path().join("in");
    let dump_date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
    build_fixture_corpus(&input_root, dump_date, 100, 50);

    let driver = Driver {
        input_root,
        work_dir: workspace.path().join("work"),
        output_dir: workspace.path().join("dist"),
        workers: 1,
    };

    let outcome = driver.run(true).unwrap();
    assert_eq!(outcome, PublishOutcome::Published);
    assert!(!workspace.path().join("dist/public/qrank-20240115.csv.gz").exists());
    assert!(!workspace.path().join("work/cache/manifest.json").exists());
}

