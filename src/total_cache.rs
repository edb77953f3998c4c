//! LRU cache for aggregate totals.
//!
//! Totals are the expensive half of a page request, and most requests
//! repeat the same coarse filters. The cache keys on the subset of
//! criteria that is cheap to normalise; any request carrying a volatile
//! filter (free-text search, order numbers, geography...) bypasses the
//! cache entirely. The whole cache is dropped when the materialized view
//! refreshes.

use std::future::Future;
use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::Result;
use crate::model::Total;
use crate::params::LineQueryParams;

/// Normalised cache key. Filter lists are sorted so equivalent requests
/// collide; the drill-down chain keeps its order, which is significant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TotalCacheKey {
    source_region: Option<Vec<String>>,
    additional_source_region: Option<String>,
    data_source: Option<String>,
    source: Option<String>,
    theme: Option<Vec<String>>,
    categorie_juridique: Option<Vec<String>>,
    annee: Vec<i64>,
    referentiel_programmation: Option<Vec<String>>,
    tags: Option<Vec<String>>,
    grouping: Option<Vec<&'static str>>,
    grouped: Option<Vec<String>>,
}

fn sorted(values: &[String]) -> Vec<String> {
    let mut out = values.to_vec();
    out.sort();
    out
}

impl TotalCacheKey {
    /// Derive a key from the request, or None when the request carries a
    /// filter the cache does not normalise.
    pub fn derive(
        params: &LineQueryParams,
        source_region: Option<&[String]>,
        additional_source_region: Option<&str>,
    ) -> Option<Self> {
        let blacklisted = params.search.is_some()
            || params.n_ej.is_some()
            || params.code_programme.is_some()
            || params.niveau_geo.is_some()
            || params.ref_qpv.is_some()
            || params.beneficiaire_code.is_some()
            || params.centres_couts.is_some()
            || params.domaine_fonctionnel.is_some()
            || params.is_group_request();
        if blacklisted {
            return None;
        }
        let mut annee = params.annee.clone();
        annee.sort_unstable();
        Some(Self {
            source_region: source_region.map(sorted),
            additional_source_region: additional_source_region.map(str::to_string),
            data_source: params.data_source.clone(),
            source: params.source.map(|s| s.as_str().to_string()),
            theme: params.theme.as_deref().map(sorted),
            categorie_juridique: params
                .beneficiaire_categorie_juridique_type
                .as_deref()
                .map(sorted),
            annee,
            referentiel_programmation: params.referentiel_programmation.as_deref().map(sorted),
            tags: params.tags.as_deref().map(sorted),
            grouping: params
                .grouping
                .as_ref()
                .map(|chain| chain.iter().map(|c| c.code).collect()),
            grouped: params.grouped.clone(),
        })
    }
}

/// Shared, thread-safe totals cache. The lock is never held across an
/// await: lookup, compute, insert are three separate critical sections.
pub struct TotalCache {
    entries: Mutex<LruCache<TotalCacheKey, Total>>,
    enabled: bool,
}

impl TotalCache {
    pub fn new(size: usize, enabled: bool) -> Self {
        let capacity = NonZeroUsize::new(size.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            enabled,
        }
    }

    /// Return the cached total for `key`, or compute, store and return it.
    /// An ineligible request (`key` = None) or a disabled cache always
    /// computes.
    pub async fn retrieve_total<F, Fut>(&self, key: Option<TotalCacheKey>, compute: F) -> Result<Total>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Total>>,
    {
        let Some(key) = (if self.enabled { key } else { None }) else {
            return compute().await;
        };

        if let Some(total) = self.entries.lock().get(&key).cloned() {
            debug!("total served from cache");
            return Ok(total);
        }

        let total = compute().await?;
        self.entries.lock().put(key, total.clone());
        Ok(total)
    }

    /// Drop every entry. Called when the underlying view refreshes.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}
