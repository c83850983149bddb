//! C11 — the cache manifest: a small JSON sidecar recording the date
//! of the most recently published run and the artifacts it produced.
//! Read at the start of every run to decide whether there is anything
//! to do; written atomically (temp file + rename) once a run
//! completes, so a crash mid-publish never leaves a manifest pointing
//! at partial output.

use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::NaiveDate;
use qrank_domain_models::errors::PipelineError;
use serde::{Deserialize, Serialize};
use tracing::info;

const MANIFEST_FILE: &str = "manifest.json";
const STALE_AFTER_DAYS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheManifest {
    pub last_successful_date: Option<NaiveDate>,
    pub artifacts: HashMap<String, String>,
}

impl Default for CacheManifest {
    fn default() -> Self {
        Self { last_successful_date: None, artifacts: HashMap::new() }
    }
}

impl CacheManifest {
    /// Returns `Ok(None)` if no manifest has ever been written here.
    pub fn load(cache_dir: &Path) -> Result<Option<Self>, PipelineError> {
        let path = cache_dir.join(MANIFEST_FILE);
        match fs::read_to_string(&path) {
            Ok(contents) => {
                let manifest = serde_json::from_str(&contents)
                    .map_err(|e| PipelineError::InputMalformedFile { detail: format!("{}: {e}", path.display()) })?;
                Ok(Some(manifest))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// `true` once this dump's date has already been published
    /// successfully, so the driver can skip a redundant run.
    pub fn already_published(&self, dump_date: NaiveDate) -> bool {
        self.last_successful_date == Some(dump_date)
    }

    /// Writes the manifest via a temp file + rename so a reader never
    /// observes a half-written manifest.
    pub fn publish(cache_dir: &Path, dump_date: NaiveDate, artifacts: HashMap<String, String>) -> Result<(), PipelineError> {
        fs::create_dir_all(cache_dir)?;
        let manifest = CacheManifest { last_successful_date: Some(dump_date), artifacts };
        let final_path = cache_dir.join(MANIFEST_FILE);
        let tmp_path = cache_dir.join(format!("{MANIFEST_FILE}.tmp"));
        {
            let file = File::create(&tmp_path)?;
            serde_json::to_writer_pretty(&file, &manifest)
                .map_err(|e| PipelineError::Storage(e.to_string()))?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &final_path)?;
        Ok(())
    }
}

/// The point in time eviction is anchored to: midnight UTC of the
/// most recent successful completion. `None` until a run has ever
/// published successfully, which makes eviction a no-op until then.
pub fn eviction_anchor(manifest: &CacheManifest) -> Option<SystemTime> {
    let date = manifest.last_successful_date?;
    let seconds = date.and_hms_opt(0, 0, 0).expect("midnight is always a valid time").timestamp();
    Some(SystemTime::UNIX_EPOCH + Duration::from_secs(seconds.max(0) as u64))
}

/// Deletes regular files directly under `cache_dir` (not the manifest
/// itself) whose modification time is older than 30 days, relative to
/// `now`. Returns the paths removed.
pub fn evict_stale(cache_dir: &Path, now: SystemTime) -> Result<Vec<PathBuf>, PipelineError> {
    let threshold = now.checked_sub(Duration::from_secs(STALE_AFTER_DAYS * 24 * 3600));
    let Some(threshold) = threshold else { return Ok(Vec::new()) };

    let mut removed = Vec::new();
    let entries = match fs::read_dir(cache_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(removed),
        Err(e) => return Err(e.into()),
    };

    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.file_name().and_then(|n| n.to_str()) == Some(MANIFEST_FILE) {
            continue;
        }
        if !path.is_file() {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        if modified < threshold {
            fs::remove_file(&path)?;
            info!(path = %path.display(), "evicted stale cache intermediate");
            removed.push(path);
        }
    }
    Ok(removed)
}
