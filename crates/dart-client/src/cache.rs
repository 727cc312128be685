use std::time::Duration;

use analysis_core::{AnalysisError, LineItem, StatementRequest, StatementSource};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

struct CacheEntry {
    items: Vec<LineItem>,
    cached_at: DateTime<Utc>,
}

/// Memoizes non-empty statement lists of any [`StatementSource`].
///
/// Empty answers and errors pass through uncached so a later filing, or a recovered
/// network, is picked up on the next call.
pub struct CachingSource<S> {
    inner: S,
    entries: DashMap<StatementRequest, CacheEntry>,
    ttl: Option<Duration>,
}

impl<S: StatementSource> CachingSource<S> {
    /// `ttl = None` keeps entries forever
    pub fn new(inner: S, ttl: Option<Duration>) -> Self {
        Self {
            inner,
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        match self.ttl {
            None => true,
            Some(ttl) => {
                let age = (Utc::now() - entry.cached_at).num_milliseconds();
                age >= 0 && (age as u128) < ttl.as_millis()
            }
        }
    }
}

#[async_trait]
impl<S: StatementSource> StatementSource for CachingSource<S> {
    async fn fetch_statements(
        &self,
        request: &StatementRequest,
    ) -> Result<Vec<LineItem>, AnalysisError> {
        if let Some(entry) = self.entries.get(request) {
            if self.is_fresh(&entry) {
                tracing::trace!(%request, "Statement cache hit");
                return Ok(entry.items.clone());
            }
        }

        let items = self.inner.fetch_statements(request).await?;
        if !items.is_empty() {
            self.entries.insert(
                request.clone(),
                CacheEntry {
                    items: items.clone(),
                    cached_at: Utc::now(),
                },
            );
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{Consolidation, ReportType, StatementType, Term};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        rows: usize,
    }

    #[async_trait]
    impl StatementSource for CountingSource {
        async fn fetch_statements(
            &self,
            _request: &StatementRequest,
        ) -> Result<Vec<LineItem>, AnalysisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok((0..self.rows)
                .map(|_| {
                    LineItem::new(StatementType::BalanceSheet, "ifrs-full_Equity", "자본총계")
                        .with_amount(Term::Current, "100")
                })
                .collect())
        }
    }

    fn request(year: i32) -> StatementRequest {
        StatementRequest::new("00126380", year, ReportType::Annual, Consolidation::Consolidated)
    }

    #[tokio::test]
    async fn test_repeated_request_hits_cache() {
        let source = CachingSource::new(
            CountingSource {
                calls: AtomicUsize::new(0),
                rows: 2,
            },
            None,
        );

        assert_eq!(source.fetch_statements(&request(2023)).await.unwrap().len(), 2);
        assert_eq!(source.fetch_statements(&request(2023)).await.unwrap().len(), 2);
        assert_eq!(source.inner().calls.load(Ordering::SeqCst), 1);

        source.fetch_statements(&request(2022)).await.unwrap();
        assert_eq!(source.inner().calls.load(Ordering::SeqCst), 2);
        assert_eq!(source.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_results_are_not_cached() {
        let source = CachingSource::new(
            CountingSource {
                calls: AtomicUsize::new(0),
                rows: 0,
            },
            None,
        );

        source.fetch_statements(&request(2023)).await.unwrap();
        source.fetch_statements(&request(2023)).await.unwrap();
        assert_eq!(source.inner().calls.load(Ordering::SeqCst), 2);
        assert!(source.is_empty());
    }

    #[tokio::test]
    async fn test_expired_entries_are_refetched() {
        let source = CachingSource::new(
            CountingSource {
                calls: AtomicUsize::new(0),
                rows: 1,
            },
            Some(Duration::ZERO),
        );

        source.fetch_statements(&request(2023)).await.unwrap();
        source.fetch_statements(&request(2023)).await.unwrap();
        assert_eq!(source.inner().calls.load(Ordering::SeqCst), 2);
    }
}
