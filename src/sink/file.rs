// src/sink/file.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::rotation::Rotation;
use super::RecordSink;
use crate::config::LoggingConfig;
use crate::record::Record;

/// JSON Lines file with time-based rollover and bounded backups.
///
/// The active file keeps its configured name; closed periods are renamed to
/// `<name>.<suffix>` and the oldest backups beyond `backup_count` are removed.
pub struct RotatingFileSink {
    path: PathBuf,
    rotation: Rotation,
    backup_count: usize,
    file: Option<File>,
    rollover_at: DateTime<Utc>,
}

impl RotatingFileSink {
    pub fn open(cfg: &LoggingConfig) -> Result<Self> {
        let rotation: Rotation = cfg.log_rotation_interval.parse()?;
        Self::open_at(&cfg.log_file_path, rotation, cfg.log_backup_count, Utc::now())
    }

    /// Open as if the current time were `now`.
    ///
    /// An existing file keeps its own period: the first boundary is computed
    /// from its mtime, so a restart after a boundary rolls it over on the
    /// first write.
    pub fn open_at(
        path: impl AsRef<Path>,
        rotation: Rotation,
        backup_count: usize,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let dir = parent_dir(&path);
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .with_context(|| format!("creating log directory {}", dir.display()))?;
        }
        let period_ref = fs::metadata(&path)
            .and_then(|m| m.modified())
            .map(DateTime::<Utc>::from)
            .unwrap_or(now);
        let file = open_append(&path)?;
        Ok(Self {
            path,
            rotation,
            backup_count,
            file: Some(file),
            rollover_at: rotation.next_boundary(period_ref),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rollover_at(&self) -> DateTime<Utc> {
        self.rollover_at
    }

    /// Append one record as written at `now`, rolling over first if a boundary passed.
    pub fn write_at(&mut self, record: &Record, now: DateTime<Utc>) -> Result<()> {
        if now >= self.rollover_at {
            self.rollover(now)?;
        }
        let mut line = record.to_json_line().context("serializing record")?;
        line.push('\n');

        // a failed rollover leaves no handle behind
        let file = match self.file.take() {
            Some(f) => f,
            None => open_append(&self.path)?,
        };
        let path = &self.path;
        let file = self.file.insert(file);
        file.write_all(line.as_bytes())
            .and_then(|_| file.flush())
            .with_context(|| format!("writing {}", path.display()))
    }

    fn rollover(&mut self, now: DateTime<Utc>) -> Result<()> {
        // close before renaming
        self.file.take();

        let backup = self.backup_path(&self.rotation.suffix(self.rollover_at));
        if backup.exists() {
            fs::remove_file(&backup)
                .with_context(|| format!("removing stale backup {}", backup.display()))?;
        }
        if self.path.exists() {
            fs::rename(&self.path, &backup).with_context(|| {
                format!("rotating {} to {}", self.path.display(), backup.display())
            })?;
        }
        self.prune()?;

        self.file = Some(open_append(&self.path)?);
        self.rollover_at = self.rotation.next_boundary(now);
        counter!("sink_rotations_total").increment(1);
        tracing::info!(
            backup = %backup.display(),
            next = %self.rollover_at,
            "log file rotated"
        );
        Ok(())
    }

    fn backup_path(&self, suffix: &str) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".");
        name.push(suffix);
        PathBuf::from(name)
    }

    /// Backups of this file, oldest first.
    pub fn backups(&self) -> Result<Vec<PathBuf>> {
        let Some(base) = self.path.file_name().and_then(|n| n.to_str()) else {
            return Ok(Vec::new());
        };
        let prefix = format!("{base}.");
        let pattern = self.rotation.suffix_pattern();
        let dir = parent_dir(&self.path);

        let mut found = Vec::new();
        for entry in fs::read_dir(&dir)
            .with_context(|| format!("listing {}", dir.display()))?
            .flatten()
        {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(suffix) = name.strip_prefix(&prefix) {
                if pattern.is_match(suffix) {
                    found.push(entry.path());
                }
            }
        }
        // suffixes are zero-padded timestamps, so lexical order is chronological
        found.sort();
        Ok(found)
    }

    fn prune(&self) -> Result<()> {
        if self.backup_count == 0 {
            return Ok(());
        }
        let backups = self.backups()?;
        let excess = backups.len().saturating_sub(self.backup_count);
        for old in &backups[..excess] {
            fs::remove_file(old)
                .with_context(|| format!("pruning backup {}", old.display()))?;
            tracing::debug!(file = %old.display(), "pruned log backup");
        }
        Ok(())
    }
}

#[async_trait]
impl RecordSink for RotatingFileSink {
    async fn write(&mut self, record: &Record) -> Result<()> {
        self.write_at(record, Utc::now())
    }

    fn target(&self) -> String {
        self.path.display().to_string()
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))
}
