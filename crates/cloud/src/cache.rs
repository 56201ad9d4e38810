//! LRU cache for radar summaries.
//!
//! Entries are keyed on every input that shapes a summary: AOI bounds, the
//! window dates, collection, band and the full analysis grid. Only successful
//! summaries are stored.

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;
use lru::LruCache;

use sarwatch_core::{AreaOfInterest, GridSpec, StackSummary, TimeWindow};

use crate::error::Result;
use crate::provider::{RadarProvider, RadarQuery};

/// Key for cached summaries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SummaryKey {
    pub aoi: [u64; 4],
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub collection: String,
    pub band: &'static str,
    pub grid: [u64; 6],
}

impl SummaryKey {
    pub fn new(aoi: &AreaOfInterest, window: &TimeWindow, query: &RadarQuery, grid: &GridSpec) -> Self {
        Self {
            aoi: aoi.cache_key(),
            start: window.start(),
            end: window.end(),
            collection: query.collection.clone(),
            band: query.band(),
            grid: grid.cache_key(),
        }
    }
}

/// [`RadarProvider`] wrapper that memoizes summaries in an LRU cache.
pub struct CachedRadarProvider<P> {
    inner: P,
    cache: Mutex<LruCache<SummaryKey, StackSummary>>,
}

impl<P: RadarProvider> CachedRadarProvider<P> {
    /// Create a cache holding at most `capacity` summaries.
    pub fn new(inner: P, capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Mutex::new(LruCache::new(cap)),
        }
    }

    /// Number of summaries currently cached.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Clear all cached summaries.
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<SummaryKey, StackSummary>> {
        // A panic mid-insert leaves the map itself consistent
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<P: RadarProvider> RadarProvider for CachedRadarProvider<P> {
    fn summarize(
        &self,
        aoi: &AreaOfInterest,
        window: &TimeWindow,
        query: &RadarQuery,
        grid: &GridSpec,
    ) -> Result<StackSummary> {
        let key = SummaryKey::new(aoi, window, query, grid);

        if let Some(hit) = self.lock().get(&key) {
            tracing::debug!(%window, "radar summary cache hit");
            return Ok(hit.clone());
        }

        // The lock is not held across the remote call
        let summary = self.inner.summarize(aoi, window, query, grid)?;
        self.lock().put(key, summary.clone());
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CloudError;
    use sarwatch_core::{Polarization, SampleStats};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns the window's start year as the mean and counts calls
    struct Counting {
        calls: AtomicUsize,
        fail: bool,
    }

    impl Counting {
        fn new(fail: bool) -> Self {
            Self { calls: AtomicUsize::new(0), fail }
        }
    }

    impl RadarProvider for Counting {
        fn summarize(
            &self,
            _aoi: &AreaOfInterest,
            window: &TimeWindow,
            _query: &RadarQuery,
            grid: &GridSpec,
        ) -> Result<StackSummary> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(CloudError::Network("down".into()));
            }
            let year = chrono::Datelike::year(&window.start()) as f64;
            Ok(StackSummary::uniform(grid, SampleStats::new(year, 1.0, 5)))
        }
    }

    fn aoi() -> AreaOfInterest {
        "37.45, 47.05, 37.65, 47.15".parse().unwrap()
    }

    fn grid(aoi: &AreaOfInterest) -> GridSpec {
        aoi.grid_spec(0.01).unwrap()
    }

    #[test]
    fn test_repeat_request_hits_cache() {
        let cached = CachedRadarProvider::new(Counting::new(false), 8);
        let a = aoi();
        let w: TimeWindow = "2021-01-01..2021-12-31".parse().unwrap();
        let q = RadarQuery::default();

        cached.summarize(&a, &w, &q, &grid(&a)).unwrap();
        cached.summarize(&a, &w, &q, &grid(&a)).unwrap();
        assert_eq!(cached.inner().calls.load(Ordering::SeqCst), 1);
        assert_eq!(cached.len(), 1);
    }

    #[test]
    fn test_keys_never_cross() {
        let cached = CachedRadarProvider::new(Counting::new(false), 8);
        let a = aoi();
        let b = AreaOfInterest::new(37.45, 47.05, 37.65, 47.16).unwrap();
        let pre: TimeWindow = "2021-01-01..2021-12-31".parse().unwrap();
        let post: TimeWindow = "2024-06-01..2024-12-31".parse().unwrap();
        let vv = RadarQuery::default();
        let vh = RadarQuery::new(Polarization::VH);

        let s_pre = cached.summarize(&a, &pre, &vv, &grid(&a)).unwrap();
        let s_post = cached.summarize(&a, &post, &vv, &grid(&a)).unwrap();
        cached.summarize(&b, &pre, &vv, &grid(&b)).unwrap();
        cached.summarize(&a, &pre, &vh, &grid(&a)).unwrap();
        cached.summarize(&a, &pre, &vv, &a.grid_spec(0.02).unwrap()).unwrap();

        assert_eq!(cached.inner().calls.load(Ordering::SeqCst), 5);
        assert_eq!(s_pre.at(0, 0).unwrap().mean, 2021.0);
        assert_eq!(s_post.at(0, 0).unwrap().mean, 2024.0);
    }

    #[test]
    fn test_failures_not_cached() {
        let cached = CachedRadarProvider::new(Counting::new(true), 8);
        let a = aoi();
        let w: TimeWindow = "2021-01-01..2021-12-31".parse().unwrap();
        assert!(cached.summarize(&a, &w, &RadarQuery::default(), &grid(&a)).is_err());
        assert!(cached.is_empty());
    }

    #[test]
    fn test_eviction() {
        let cached = CachedRadarProvider::new(Counting::new(false), 1);
        let a = aoi();
        let q = RadarQuery::default();
        let w1: TimeWindow = "2021-01-01..2021-12-31".parse().unwrap();
        let w2: TimeWindow = "2022-01-01..2022-12-31".parse().unwrap();

        cached.summarize(&a, &w1, &q, &grid(&a)).unwrap();
        cached.summarize(&a, &w2, &q, &grid(&a)).unwrap();
        cached.summarize(&a, &w1, &q, &grid(&a)).unwrap();
        assert_eq!(cached.inner().calls.load(Ordering::SeqCst), 3);
        assert_eq!(cached.len(), 1);
    }
}
