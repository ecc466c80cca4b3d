//! Cry inspection: descriptive statistics over a pet's trailing 30 days.
//!
//! Reports are memoized to one JSON file per (pet, window) under the cache
//! directory. A cached report is returned verbatim; cries written after the
//! report was computed do not invalidate it within the same window.

use crate::error::ApiResult;
use crate::pet_store::{Cry, CryStore, FullStore, PetStore};
use anyhow::Context;
use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

pub const INSPECTION_WINDOW_DAYS: i64 = 30;

/// Below this many cries in the window no report is produced; the sample is
/// too small to be worth charting.
pub const MIN_SAMPLE_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateFrequencies {
    pub date: Vec<String>,
    pub freqs: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationOfType {
    #[serde(rename = "type")]
    pub types: Vec<String>,
    pub duration: Vec<f64>,
    pub bar_percent: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectionReport {
    #[serde(rename = "logId")]
    pub log_id: String,
    /// Cry counts per UTC hour of day, all 24 buckets.
    pub cry_freq_hour: Vec<u64>,
    pub cry_freq_date: DateFrequencies,
    /// State → count, ascending by count (ties by state name).
    pub type_freq: serde_json::Map<String, Value>,
    /// States ascending by mean duration; `duration` is mean minus the
    /// minimum mean, `bar_percent` that value scaled into [0, 1].
    pub duration_of_type: DurationOfType,
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Aggregates a window of cries into a report. Orders are deterministic so
/// that concurrent computations of the same window write identical bytes.
pub fn compute_report(log_id: &str, cries: &[Cry]) -> InspectionReport {
    let mut cry_freq_hour = vec![0u64; 24];
    for cry in cries {
        cry_freq_hour[cry.time.hour() as usize] += 1;
    }

    let mut by_date: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for cry in cries {
        *by_date.entry(cry.time.date_naive()).or_default() += 1;
    }
    let cry_freq_date = DateFrequencies {
        date: by_date
            .keys()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .collect(),
        freqs: by_date.values().copied().collect(),
    };

    let mut state_counts: BTreeMap<&'static str, u64> = BTreeMap::new();
    let mut state_durations: BTreeMap<&'static str, (f64, u64)> = BTreeMap::new();
    for cry in cries {
        let state = cry.state.canonical();
        *state_counts.entry(state).or_default() += 1;
        let entry = state_durations.entry(state).or_default();
        entry.0 += cry.duration;
        entry.1 += 1;
    }

    let mut counts: Vec<(&'static str, u64)> = state_counts.into_iter().collect();
    counts.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(b.0)));
    let mut type_freq = serde_json::Map::new();
    for (state, count) in counts {
        type_freq.insert(state.to_string(), Value::from(count));
    }

    let mut means: Vec<(&'static str, f64)> = state_durations
        .into_iter()
        .map(|(state, (sum, n))| (state, sum / n as f64))
        .collect();
    means.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap().then(a.0.cmp(b.0)));

    let min_mean = means.first().map(|(_, mean)| *mean).unwrap_or(0.0);
    let shifted: Vec<f64> = means.iter().map(|(_, mean)| mean - min_mean).collect();
    let max_shifted = shifted.iter().cloned().fold(0.0, f64::max);
    let duration_of_type = DurationOfType {
        types: means.iter().map(|(state, _)| state.to_string()).collect(),
        duration: shifted.iter().map(|v| round3(*v)).collect(),
        // all means equal leaves nothing to scale against; every bar is zero
        bar_percent: shifted
            .iter()
            .map(|v| {
                if max_shifted > 0.0 {
                    round3(v / max_shifted)
                } else {
                    0.0
                }
            })
            .collect(),
    };

    InspectionReport {
        log_id: log_id.to_string(),
        cry_freq_hour,
        cry_freq_date,
        type_freq,
        duration_of_type,
    }
}

pub struct InspectionEngine {
    store: Arc<dyn FullStore>,
    cache_dir: PathBuf,
}

impl InspectionEngine {
    pub fn new(store: Arc<dyn FullStore>, cache_dir: PathBuf) -> anyhow::Result<Self> {
        fs::create_dir_all(&cache_dir)?;
        Ok(Self { store, cache_dir })
    }

    pub fn inspect(
        &self,
        pet_id: i64,
        requester_uid: &str,
    ) -> ApiResult<Option<InspectionReport>> {
        self.inspect_at(pet_id, requester_uid, Utc::now())
    }

    pub fn inspect_at(
        &self,
        pet_id: i64,
        requester_uid: &str,
        now: DateTime<Utc>,
    ) -> ApiResult<Option<InspectionReport>> {
        let pet = self.store.get_pet(pet_id, requester_uid)?;

        let end_date = now;
        let start_date = now - Duration::days(INSPECTION_WINDOW_DAYS);
        let log_id = format!(
            "{}_{}_{}",
            pet.id,
            start_date.format("%Y-%m-%d"),
            end_date.format("%Y-%m-%d")
        );
        let cache_path = self.cache_dir.join(format!("{}.json", log_id));

        if cache_path.exists() {
            debug!("inspection cache hit for {}", log_id);
            let cached = fs::read_to_string(&cache_path)?;
            return Ok(Some(serde_json::from_str(&cached)?));
        }

        let cries = self
            .store
            .list_cries_window(pet_id, start_date, end_date, requester_uid)?;
        if cries.len() < MIN_SAMPLE_SIZE {
            debug!(
                "not inspecting {}: {} cries in window, need {}",
                log_id,
                cries.len(),
                MIN_SAMPLE_SIZE
            );
            return Ok(None);
        }

        let report = compute_report(&log_id, &cries);
        fs::write(&cache_path, serde_json::to_string_pretty(&report)?)
            .context("Failed to persist inspection report")?;
        Ok(Some(report))
    }
}
