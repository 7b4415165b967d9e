//! Parsed-table cache keyed by file content.
//!
//! Loading and deriving does not depend on the selection or the costs, so a
//! caller that re-runs reports can keep the parsed table around. The
//! pipeline itself never consults this cache.
use crate::error::LoadError;
use crate::loader::{load_bytes, LoadOptions, LoadReport, SourceKind};
use crate::types::DerivedRecord;
use blake3::Hasher;
use std::sync::Arc;
use tracing::debug;

/// blake3 hex digest of the file bytes and the options that change parsing.
pub fn fingerprint(bytes: &[u8], opts: &LoadOptions) -> String {
    let mut hasher = Hasher::new();
    hasher.update(bytes);
    hasher.update(opts.sheet.as_deref().unwrap_or("").as_bytes());
    hasher.update(&[opts.day_first as u8]);
    for slot in &opts.slots {
        hasher.update(slot.channel.as_bytes());
        hasher.update(&[0]);
        hasher.update(slot.revenue.as_bytes());
        hasher.update(&[0]);
    }
    hasher.finalize().to_hex().to_string()
}

/// A parsed table together with the counters from the load that produced it.
#[derive(Debug, Clone)]
pub struct CachedLoad {
    pub records: Arc<Vec<DerivedRecord>>,
    pub report: LoadReport,
}

/// Holds the most recently loaded file only; loading a different file
/// replaces it.
#[derive(Debug, Default)]
pub struct LoadCache {
    latest: Option<(String, CachedLoad)>,
}

impl LoadCache {
    /// Parse `bytes` unless it is the same file as the last load. Failed
    /// loads leave the cached entry untouched.
    pub fn get_or_load(
        &mut self,
        bytes: &[u8],
        kind: SourceKind,
        opts: &LoadOptions,
    ) -> Result<CachedLoad, LoadError> {
        let key = fingerprint(bytes, opts);
        if let Some((cached_key, hit)) = &self.latest {
            if *cached_key == key {
                debug!(fingerprint = %key, "load cache hit");
                return Ok(hit.clone());
            }
        }
        let (records, report) = load_bytes(bytes, kind, opts)?;
        let loaded = CachedLoad {
            records: Arc::new(records),
            report,
        };
        self.latest = Some((key, loaded.clone()));
        Ok(loaded)
    }
}
