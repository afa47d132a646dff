use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;

use crate::download::{Company, Download, Template};

/// Identifies one finished download.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub template_id: String,
    pub template_version: u64,
    pub company_id: String,
}

impl CacheKey {
    pub fn new(template: &Template, company: &Company) -> Self {
        Self {
            template_id: template.id.clone(),
            template_version: template.version,
            company_id: company.id.clone(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Entries dropped because a newer template version was cached or the template was
    /// invalidated. LRU evictions are not counted.
    pub invalidated: u64,
}

struct Inner {
    entries: LruCache<CacheKey, Arc<Download>>,
    stats: CacheStats,
}

impl Inner {
    fn remove_where(&mut self, mut pred: impl FnMut(&CacheKey) -> bool) -> usize {
        let stale: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|(key, _)| pred(key))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            self.entries.pop(key);
        }
        self.stats.invalidated += stale.len() as u64;
        stale.len()
    }
}

/// In-memory LRU of finished downloads keyed by `(template_id, template_version, company_id)`.
///
/// Company details are not part of the key; callers that edit a company's address should
/// invalidate the templates it downloaded or rebuild the cache.
#[derive(Clone)]
pub struct PersonalizedCache {
    inner: Arc<Mutex<Inner>>,
}

impl PersonalizedCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                entries: LruCache::new(capacity),
                stats: CacheStats::default(),
            })),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<Download>> {
        let mut inner = self.inner.lock().expect("download cache mutex poisoned");
        let hit = inner.entries.get(key).cloned();
        if hit.is_some() {
            inner.stats.hits += 1;
        } else {
            inner.stats.misses += 1;
        }
        hit
    }

    /// Cache `download`, dropping entries for older versions of the same template.
    pub fn insert(&self, key: CacheKey, download: Arc<Download>) {
        let mut inner = self.inner.lock().expect("download cache mutex poisoned");
        let dropped = inner.remove_where(|cached| {
            cached.template_id == key.template_id && cached.template_version < key.template_version
        });
        if dropped > 0 {
            log::debug!(
                "dropped {dropped} cached download(s) of template {} older than version {}",
                key.template_id,
                key.template_version
            );
        }
        inner.entries.put(key, download);
    }

    /// Drop every cached download of `template_id`. Returns the number of entries removed.
    pub fn invalidate_template(&self, template_id: &str) -> usize {
        let mut inner = self.inner.lock().expect("download cache mutex poisoned");
        inner.remove_where(|cached| cached.template_id == template_id)
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.lock().expect("download cache mutex poisoned");
        inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().expect("download cache mutex poisoned");
        inner.stats
    }
}
