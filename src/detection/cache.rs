use crate::constants::{CACHE_FILE_EXTENSION, SECONDS_PER_DAY};
use crate::detection::DetectionField;
use crate::errors::{RadarError, RadarResult};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

/// On-disk store of detection fields, one file per configuration fingerprint
#[derive(Debug, Clone)]
pub struct FieldCache {
    dir: PathBuf,
}

impl FieldCache {
    /// Open (and create if needed) a cache rooted at `dir`
    pub fn open<P: Into<PathBuf>>(dir: P) -> RadarResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| RadarError::CacheUnavailable {
            path: dir.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self { dir })
    }

    /// Open the cache in the default per-user cache directory
    pub fn open_default() -> RadarResult<Self> {
        Self::open(crate::config::default_cache_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the entry stored under `fingerprint`
    pub fn entry_path(&self, fingerprint: &str) -> PathBuf {
        self.dir
            .join(fingerprint)
            .with_extension(CACHE_FILE_EXTENSION)
    }

    /// Load the field stored under `fingerprint`
    ///
    /// Returns `Ok(None)` on a miss. Entries that fail to decode or whose
    /// shape differs from `height`x`width` are reported as corrupted.
    pub fn load(
        &self,
        fingerprint: &str,
        height: usize,
        width: usize,
    ) -> RadarResult<Option<DetectionField>> {
        let path = self.entry_path(fingerprint);
        if !path.exists() {
            return Ok(None);
        }

        let data = fs::read(&path).map_err(|e| RadarError::CorruptedCacheEntry {
            fingerprint: fingerprint.to_string(),
            reason: format!("failed to read {}: {e}", path.display()),
        })?;

        let (field, _): (DetectionField, usize) =
            bincode::serde::decode_from_slice(&data, bincode::config::standard()).map_err(
                |e| RadarError::CorruptedCacheEntry {
                    fingerprint: fingerprint.to_string(),
                    reason: format!("failed to deserialize detection field: {e}"),
                },
            )?;

        if field.height() != height || field.width() != width || !field.is_well_formed() {
            return Err(RadarError::CorruptedCacheEntry {
                fingerprint: fingerprint.to_string(),
                reason: format!(
                    "cached field is {}x{} with {} values, expected {height}x{width}",
                    field.height(),
                    field.width(),
                    field.values().len()
                ),
            });
        }

        Ok(Some(field))
    }

    /// Persist `field` under `fingerprint`, replacing any previous entry
    pub fn store(&self, fingerprint: &str, field: &DetectionField) -> RadarResult<()> {
        let path = self.entry_path(fingerprint);

        let data = bincode::serde::encode_to_vec(field, bincode::config::standard()).map_err(
            |e| RadarError::CacheUnavailable {
                path: path.clone(),
                reason: format!("failed to serialize detection field: {e}"),
            },
        )?;

        fs::write(&path, data).map_err(|e| RadarError::CacheUnavailable {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        debug!("Stored detection field {fingerprint} at {}", path.display());
        Ok(())
    }

    /// Paths of every cache entry currently on disk
    pub fn entries(&self) -> RadarResult<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let is_entry = path.is_file()
                && path.extension().and_then(|ext| ext.to_str()) == Some(CACHE_FILE_EXTENSION);
            if is_entry {
                entries.push(path);
            }
        }
        entries.sort();
        Ok(entries)
    }

    /// Delete all entries, or only those last modified more than `older_than_days` ago
    ///
    /// Individual failures are logged and skipped. Returns the number of
    /// entries removed.
    pub fn clear(&self, older_than_days: Option<u64>) -> usize {
        let entries = match self.entries() {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to list cache directory {}: {e}", self.dir.display());
                return 0;
            }
        };

        // Thresholds past u64::MAX seconds keep everything
        let max_age = older_than_days
            .map(|days| Duration::from_secs(days.saturating_mul(SECONDS_PER_DAY)));
        let now = SystemTime::now();
        let mut removed = 0;

        for path in entries {
            if let Some(max_age) = max_age {
                let modified = match fs::metadata(&path).and_then(|meta| meta.modified()) {
                    Ok(modified) => modified,
                    Err(e) => {
                        warn!("Skipping cache entry {}: {e}", path.display());
                        continue;
                    }
                };
                // Entries stamped in the future count as fresh
                let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
                if age <= max_age {
                    continue;
                }
            }

            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => warn!("Failed to remove cache entry {}: {e}", path.display()),
            }
        }

        debug!("Removed {removed} cache entries from {}", self.dir.display());
        removed
    }

    /// Total size in bytes of every cache entry
    pub fn size(&self) -> u64 {
        let entries = match self.entries() {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to list cache directory {}: {e}", self.dir.display());
                return 0;
            }
        };

        entries
            .iter()
            .filter_map(|path| fs::metadata(path).ok())
            .map(|meta| meta.len())
            .sum()
    }
}
