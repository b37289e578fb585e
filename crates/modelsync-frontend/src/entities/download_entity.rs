//! In-flight download tracking and transfer speed estimation.

use std::collections::BTreeMap;
use std::time::Duration;

use modelsync_bridge::{config::SelectorConfig, events::DownloadProgress};
use serde::Serialize;
use tokio::time::Instant;

use crate::formatting::{
    BYTES_PER_MEBIBYTE, clamp_percentage, format_bytes, format_eta, format_speed,
};

/// Throttle and smoothing applied to download speed samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedPolicy {
    /// Samples closer than this to the last accepted one do not recompute the
    /// published speed.
    pub min_interval: Duration,
    /// Weight of the newest instantaneous rate in the moving average.
    pub smoothing: f64,
}

impl SpeedPolicy {
    pub fn from_config(config: &SelectorConfig) -> Self {
        Self {
            min_interval: Duration::from_millis(config.speed_sample_interval_ms),
            smoothing: if config.speed_smoothing.is_finite() {
                config.speed_smoothing.clamp(0.0, 1.0)
            } else {
                SpeedPolicy::default().smoothing
            },
        }
    }
}

impl Default for SpeedPolicy {
    fn default() -> Self {
        Self::from_config(&SelectorConfig::default())
    }
}

/// Speed bookkeeping for one download.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DownloadStats {
    pub started_at: Instant,
    /// Time of the last sample that recomputed the speed.
    pub last_update: Instant,
    /// Bytes downloaded as of `last_update`.
    pub total_downloaded: u64,
    /// Smoothed transfer rate in MiB/s, never negative.
    pub speed: f64,
}

impl DownloadStats {
    /// Starts tracking from a first sample. A single sample carries no rate.
    pub fn new(downloaded: u64, now: Instant) -> Self {
        Self {
            started_at: now,
            last_update: now,
            total_downloaded: downloaded,
            speed: 0.0,
        }
    }

    /// Feeds a progress sample. Returns `true` when the sample was accepted
    /// and the speed recomputed, `false` when it fell inside the throttle
    /// window and was ignored.
    pub fn record(&mut self, downloaded: u64, now: Instant, policy: &SpeedPolicy) -> bool {
        let elapsed = now.saturating_duration_since(self.last_update);
        if elapsed < policy.min_interval || elapsed.is_zero() {
            return false;
        }

        let seconds = elapsed.as_secs_f64();
        let delta = downloaded as f64 - self.total_downloaded as f64;
        // out-of-order samples can go backwards
        let current = (delta / BYTES_PER_MEBIBYTE / seconds).max(0.0);

        let smoothed = if self.speed > 0.0 {
            self.speed * (1.0 - policy.smoothing) + current * policy.smoothing
        } else {
            current
        };

        self.last_update = now;
        self.total_downloaded = downloaded;
        self.speed = smoothed.max(0.0);
        true
    }

    pub fn bytes_per_second(&self) -> f64 {
        self.speed * BYTES_PER_MEBIBYTE
    }
}

/// Latest progress report of a download together with its speed estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveDownload {
    pub progress: DownloadProgress,
    pub stats: DownloadStats,
}

impl ActiveDownload {
    /// Seconds until completion at the current speed, if it can be estimated.
    pub fn remaining_seconds(&self) -> Option<f64> {
        let rate = self.stats.bytes_per_second();
        if rate <= 0.0 || self.progress.total == 0 {
            return None;
        }
        let remaining = self.progress.total.saturating_sub(self.progress.downloaded);
        Some(remaining as f64 / rate)
    }
}

/// Presentation-ready view of one in-flight download.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadSnapshot {
    pub model_id: String,
    pub downloaded: u64,
    pub total: u64,
    /// Whole percent inside `0..=100`.
    pub percentage: u8,
    /// Smoothed speed in MiB/s.
    pub speed: f64,
    /// One-line summary, e.g. `12.00 MiB of 100.00 MiB (2.50 MiB/s), 00:35 left`.
    pub summary: String,
}

impl From<&ActiveDownload> for DownloadSnapshot {
    fn from(download: &ActiveDownload) -> Self {
        let progress = &download.progress;
        let mut summary = format!(
            "{} of {} ({})",
            format_bytes(progress.downloaded),
            format_bytes(progress.total),
            format_speed(download.stats.speed),
        );
        if let Some(seconds) = download.remaining_seconds() {
            summary.push_str(&format!(", {} left", format_eta(seconds)));
        }

        Self {
            model_id: progress.model_id.clone(),
            downloaded: progress.downloaded,
            total: progress.total,
            percentage: clamp_percentage(progress.percentage),
            speed: download.stats.speed,
            summary,
        }
    }
}

/// All downloads currently in flight, keyed by model id.
///
/// Progress and speed stats live in one entry so they are always created and
/// discarded together.
#[derive(Debug, Clone, Default)]
pub struct DownloadEntity {
    downloads: BTreeMap<String, ActiveDownload>,
    policy: SpeedPolicy,
}

impl DownloadEntity {
    pub fn new(policy: SpeedPolicy) -> Self {
        Self {
            downloads: BTreeMap::new(),
            policy,
        }
    }

    /// Stores the latest progress report and folds it into the speed
    /// estimate.
    pub fn record(&mut self, progress: DownloadProgress, now: Instant) {
        match self.downloads.get_mut(&progress.model_id) {
            Some(download) => {
                download.stats.record(progress.downloaded, now, &self.policy);
                download.progress = progress;
            }
            None => {
                let stats = DownloadStats::new(progress.downloaded, now);
                self.downloads
                    .insert(progress.model_id.clone(), ActiveDownload { progress, stats });
            }
        }
    }

    /// Stops tracking `model_id`, discarding its progress and stats.
    pub fn finish(&mut self, model_id: &str) -> Option<ActiveDownload> {
        self.downloads.remove(model_id)
    }

    pub fn get(&self, model_id: &str) -> Option<&ActiveDownload> {
        self.downloads.get(model_id)
    }

    pub fn len(&self) -> usize {
        self.downloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.downloads.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActiveDownload> {
        self.downloads.values()
    }
}
