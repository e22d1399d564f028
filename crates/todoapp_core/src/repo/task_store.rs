//! Versioned task snapshot persistence.
//!
//! # Responsibility
//! - Serialize the full task collection into one key of a `KeyValueStore`.
//! - Guard writes with an availability probe and a capacity estimate.
//! - Maintain the schema version marker stored next to the snapshot.
//!
//! # Invariants
//! - A rejected save leaves the previous snapshot untouched.
//! - `load` never fails on malformed payloads; it degrades to what can be
//!   decoded (possibly nothing) and logs a diagnostic.
//! - Task text is never written to logs.

use crate::model::task::Task;
use crate::repo::kv_store::{KeyValueStore, KvError};
use log::{debug, info, warn};
use serde_json::Value;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const DEFAULT_TASKS_KEY: &str = "todoapp_tasks";
pub const DEFAULT_VERSION_KEY: &str = "todoapp_version";
pub const CURRENT_SCHEMA_VERSION: &str = "1.0";
/// Conservative ceiling for local storage media.
pub const DEFAULT_CAPACITY_BYTES: u64 = 5 * 1024 * 1024;
pub const DEFAULT_GUARD_BAND_PERCENT: u8 = 90;

const PROBE_KEY: &str = "__storage_probe__";

pub type StoreResult<T> = Result<T, StoreError>;

/// Task store failure.
#[derive(Debug)]
pub enum StoreError {
    /// The availability probe (write + delete of a throwaway key) failed.
    Unavailable(KvError),
    /// Estimated usage after the write would exceed the guard band.
    Quota {
        estimated_bytes: u64,
        limit_bytes: u64,
    },
    Serialization(serde_json::Error),
    /// The medium failed a read or write after a successful probe.
    Backend(KvError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(err) => write!(f, "storage is not available: {err}"),
            Self::Quota {
                estimated_bytes,
                limit_bytes,
            } => write!(
                f,
                "storage quota exceeded: estimated {estimated_bytes} bytes, limit {limit_bytes} bytes"
            ),
            Self::Serialization(err) => write!(f, "failed to serialize tasks: {err}"),
            Self::Backend(err) => write!(f, "storage operation failed: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Unavailable(err) | Self::Backend(err) => Some(err),
            Self::Serialization(err) => Some(err),
            Self::Quota { .. } => None,
        }
    }
}

impl StoreError {
    /// Whether this failure means the medium is full (or nearly so).
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::Quota { .. })
    }

    /// Stable machine-readable code for log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "storage_unavailable",
            Self::Quota { .. } => "storage_quota",
            Self::Serialization(_) => "serialization",
            Self::Backend(_) => "storage_backend",
        }
    }
}

/// Keys, version tag and capacity limits used by a `TaskStore`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub tasks_key: String,
    pub version_key: String,
    pub schema_version: String,
    pub capacity_bytes: u64,
    /// Share of `capacity_bytes` (in percent) that writes may fill.
    pub guard_band_percent: u8,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            tasks_key: DEFAULT_TASKS_KEY.to_string(),
            version_key: DEFAULT_VERSION_KEY.to_string(),
            schema_version: CURRENT_SCHEMA_VERSION.to_string(),
            capacity_bytes: DEFAULT_CAPACITY_BYTES,
            guard_band_percent: DEFAULT_GUARD_BAND_PERCENT,
        }
    }
}

impl StoreConfig {
    /// Largest estimated usage a save may reach.
    pub fn limit_bytes(&self) -> u64 {
        self.capacity_bytes * u64::from(self.guard_band_percent.min(100)) / 100
    }
}

/// Read-only diagnostic summary of the persisted snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StorageInfo {
    /// Snapshot payload size in bytes.
    pub size: u64,
    pub task_count: usize,
    pub formatted_size: String,
}

impl StorageInfo {
    fn zeroed() -> Self {
        Self {
            size: 0,
            task_count: 0,
            formatted_size: format_bytes(0),
        }
    }
}

/// Durable store for the ordered task collection.
pub struct TaskStore<S: KeyValueStore> {
    medium: S,
    config: StoreConfig,
}

impl<S: KeyValueStore> TaskStore<S> {
    pub fn new(medium: S) -> Self {
        Self::with_config(medium, StoreConfig::default())
    }

    pub fn with_config(medium: S, config: StoreConfig) -> Self {
        Self { medium, config }
    }

    pub fn medium(&self) -> &S {
        &self.medium
    }

    pub fn medium_mut(&mut self) -> &mut S {
        &mut self.medium
    }

    /// Reads the persisted collection.
    ///
    /// Initializes the version marker on first access. Missing or malformed
    /// snapshots yield an empty list; entries that fail to decode, or repeat
    /// an earlier id, are skipped.
    ///
    /// # Errors
    /// - `Unavailable` when the probe fails.
    /// - `Backend` when the snapshot read fails.
    pub fn load(&mut self) -> StoreResult<Vec<Task>> {
        self.probe()?;
        self.ensure_version_marker()?;

        let raw = self
            .medium
            .get(&self.config.tasks_key)
            .map_err(StoreError::Backend)?;
        let tasks = match raw {
            Some(raw) if !raw.trim().is_empty() => decode_snapshot(&raw),
            _ => Vec::new(),
        };

        debug!(
            "event=tasks_load module=store status=ok task_count={}",
            tasks.len()
        );
        Ok(tasks)
    }

    /// Overwrites the persisted snapshot with `tasks`.
    ///
    /// The version marker is written before the snapshot, so a failed write
    /// never leaves a new snapshot behind an error.
    ///
    /// # Errors
    /// - `Unavailable` when the probe fails.
    /// - `Quota` when current usage plus the new payload exceeds the guard
    ///   band; nothing is written in that case.
    /// - `Backend` when the medium rejects the write.
    pub fn save(&mut self, tasks: &[Task]) -> StoreResult<()> {
        self.probe()?;

        let payload = serde_json::to_string(tasks).map_err(StoreError::Serialization)?;
        self.check_quota(payload.len() as u64)?;

        self.medium
            .set(&self.config.version_key, &self.config.schema_version)
            .map_err(StoreError::Backend)?;
        self.medium
            .set(&self.config.tasks_key, &payload)
            .map_err(StoreError::Backend)?;

        info!(
            "event=tasks_save module=store status=ok task_count={} bytes={}",
            tasks.len(),
            payload.len()
        );
        Ok(())
    }

    /// Deletes the persisted snapshot. The version marker is kept.
    pub fn clear(&mut self) -> StoreResult<()> {
        self.probe()?;
        self.medium
            .remove(&self.config.tasks_key)
            .map_err(StoreError::Backend)?;
        info!("event=tasks_clear module=store status=ok");
        Ok(())
    }

    /// Returns the stored schema version marker, if any.
    pub fn schema_version(&self) -> StoreResult<Option<String>> {
        self.medium
            .get(&self.config.version_key)
            .map_err(StoreError::Backend)
    }

    /// Summarizes the snapshot; any failure is reported as zeroed info.
    pub fn storage_info(&self) -> StorageInfo {
        let raw = match self.medium.get(&self.config.tasks_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return StorageInfo::zeroed(),
            Err(err) => {
                debug!("event=storage_info module=store status=error error={err}");
                return StorageInfo::zeroed();
            }
        };

        let task_count = match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(items)) => items.len(),
            _ => return StorageInfo::zeroed(),
        };

        let size = raw.len() as u64;
        StorageInfo {
            size,
            task_count,
            formatted_size: format_bytes(size),
        }
    }

    /// Checks that the medium accepts a write and a delete.
    pub fn probe(&mut self) -> StoreResult<()> {
        self.medium
            .set(PROBE_KEY, PROBE_KEY)
            .and_then(|()| self.medium.remove(PROBE_KEY))
            .map_err(|err| {
                warn!("event=storage_probe module=store status=error error={err}");
                StoreError::Unavailable(err)
            })
    }

    fn check_quota(&self, payload_bytes: u64) -> StoreResult<()> {
        let current = self.medium.usage_bytes().map_err(StoreError::Backend)?;
        let estimated_bytes = current + payload_bytes;
        let limit_bytes = self.config.limit_bytes();

        if estimated_bytes > limit_bytes {
            warn!(
                "event=tasks_save module=store status=error error_code=storage_quota estimated_bytes={estimated_bytes} limit_bytes={limit_bytes}"
            );
            return Err(StoreError::Quota {
                estimated_bytes,
                limit_bytes,
            });
        }
        Ok(())
    }

    fn ensure_version_marker(&mut self) -> StoreResult<()> {
        let stored = self
            .medium
            .get(&self.config.version_key)
            .map_err(StoreError::Backend)?;

        match stored {
            None => {
                self.medium
                    .set(&self.config.version_key, &self.config.schema_version)
                    .map_err(StoreError::Backend)?;
                info!(
                    "event=schema_version_init module=store status=ok version={}",
                    self.config.schema_version
                );
            }
            // No migrations exist yet; a foreign version is read as-is.
            Some(version) if version != self.config.schema_version => {
                warn!(
                    "event=schema_version_mismatch module=store status=warn stored={} expected={}",
                    version, self.config.schema_version
                );
            }
            Some(_) => {}
        }
        Ok(())
    }
}

fn decode_snapshot(raw: &str) -> Vec<Task> {
    let items = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => items,
        Ok(_) => {
            warn!("event=tasks_load module=store status=degraded error_code=not_an_array");
            return Vec::new();
        }
        Err(err) => {
            warn!(
                "event=tasks_load module=store status=degraded error_code=invalid_json category={:?} line={} column={}",
                err.classify(),
                err.line(),
                err.column()
            );
            return Vec::new();
        }
    };

    let mut seen = HashSet::new();
    let mut tasks = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<Task>(item) {
            Ok(task) if seen.insert(task.id.clone()) => tasks.push(task),
            Ok(task) => warn!(
                "event=tasks_load module=store status=degraded error_code=duplicate_id index={index} id={}",
                task.id
            ),
            Err(err) => warn!(
                "event=tasks_load module=store status=degraded error_code=malformed_task index={index} category={:?}",
                err.classify()
            ),
        }
    }
    tasks
}

/// Formats a byte count as `B`, `KB` or `MB` with at most two decimals.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["B", "KB", "MB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut unit = 0;
    let mut threshold = 1024u64;
    while unit + 1 < UNITS.len() && bytes >= threshold {
        unit += 1;
        threshold = threshold.saturating_mul(1024);
    }

    let scaled = bytes as f64 / 1024f64.powi(unit as i32);
    let formatted = format!("{scaled:.2}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", UNITS[unit])
}
