use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::expiring::ExpiringIndex;
use crate::config::SnapshotConfig;
use crate::models::{PackageOverview, SnapshotInfo};

/// Something that can produce the full package overview list.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_overview(&self) -> Result<Vec<PackageOverview>>;
}

/// Fetches the overview list from the external data endpoint.
pub struct HttpSnapshotSource {
    client: reqwest::Client,
    config: SnapshotConfig,
}

impl HttpSnapshotSource {
    pub fn new(client: reqwest::Client, config: SnapshotConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    async fn fetch_overview(&self) -> Result<Vec<PackageOverview>> {
        let resp = self
            .client
            .get(&self.config.url)
            .bearer_auth(&self.config.token)
            .send()
            .await
            .context("Failed to call snapshot endpoint")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Snapshot endpoint returned {status}: {body}");
        }

        resp.json()
            .await
            .context("Failed to parse package overview snapshot")
    }
}

struct Snapshot {
    packages: Arc<Vec<PackageOverview>>,
    fetched_at: DateTime<Utc>,
}

/// Process-lifetime copy of the package overview list, refetched wholesale
/// once its TTL elapses.
pub struct SnapshotCache {
    source: Arc<dyn SnapshotSource>,
    ttl: Duration,
    current: RwLock<Option<ExpiringIndex<Snapshot>>>,
    refresh: tokio::sync::Mutex<()>,
}

impl SnapshotCache {
    pub fn new(source: Arc<dyn SnapshotSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            current: RwLock::new(None),
            refresh: tokio::sync::Mutex::new(()),
        }
    }

    fn fresh(&self) -> Option<Arc<Vec<PackageOverview>>> {
        self.current
            .read()
            .as_ref()
            .and_then(|entry| entry.fresh())
            .map(|snapshot| snapshot.packages.clone())
    }

    /// Return the cached overview list, fetching it first when the cache is
    /// empty or expired. Fetch errors are returned as-is.
    pub async fn get_all_overview_packages(&self) -> Result<Arc<Vec<PackageOverview>>> {
        if let Some(packages) = self.fresh() {
            return Ok(packages);
        }

        let _guard = self.refresh.lock().await;
        // Another caller may have refreshed while we waited
        if let Some(packages) = self.fresh() {
            return Ok(packages);
        }

        let packages = Arc::new(self.source.fetch_overview().await?);
        tracing::info!("Fetched package overview snapshot: {} rows", packages.len());

        *self.current.write() = Some(ExpiringIndex::new(
            Snapshot {
                packages: packages.clone(),
                fetched_at: Utc::now(),
            },
            self.ttl,
        ));
        Ok(packages)
    }

    /// Look up one package by exact name.
    pub async fn find_package(&self, name: &str) -> Result<Option<PackageOverview>> {
        let packages = self.get_all_overview_packages().await?;
        Ok(packages.iter().find(|p| p.name == name).cloned())
    }

    /// Drop the cached snapshot so the next call refetches.
    pub fn invalidate(&self) {
        *self.current.write() = None;
    }

    pub fn info(&self) -> SnapshotInfo {
        let current = self.current.read();
        match current.as_ref() {
            Some(entry) => SnapshotInfo {
                loaded: entry.fresh().is_some(),
                package_count: entry.value.packages.len(),
                fetched_at: Some(entry.value.fetched_at),
            },
            None => SnapshotInfo {
                loaded: false,
                package_count: 0,
                fetched_at: None,
            },
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// In-memory source that counts fetches and can be told to fail.
    pub(crate) struct FakeSource {
        pub rows: Vec<PackageOverview>,
        pub fetches: AtomicUsize,
        pub fail: AtomicBool,
    }

    impl FakeSource {
        pub fn new(rows: Vec<PackageOverview>) -> Arc<Self> {
            Arc::new(Self {
                rows,
                fetches: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
            })
        }

        pub fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SnapshotSource for FakeSource {
        async fn fetch_overview(&self) -> Result<Vec<PackageOverview>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("snapshot endpoint unavailable");
            }
            Ok(self.rows.clone())
        }
    }

    pub(crate) fn overview(name: &str, title: &str) -> PackageOverview {
        PackageOverview {
            name: name.to_string(),
            title: title.to_string(),
            slug: name.to_lowercase(),
            author_names: vec![],
        }
    }

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn test_same_arc_within_ttl() {
        let source = FakeSource::new(vec![overview("ggplot2", "Grammar of Graphics")]);
        let cache = SnapshotCache::new(source.clone(), TTL);

        let first = cache.get_all_overview_packages().await.unwrap();
        let second = cache.get_all_overview_packages().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refetch_after_ttl() {
        let source = FakeSource::new(vec![overview("dplyr", "")]);
        let cache = SnapshotCache::new(source.clone(), TTL);

        let first = cache.get_all_overview_packages().await.unwrap();
        tokio::time::advance(TTL).await;
        let at_deadline = cache.get_all_overview_packages().await.unwrap();
        assert!(Arc::ptr_eq(&first, &at_deadline));

        tokio::time::advance(Duration::from_secs(1)).await;
        let second = cache.get_all_overview_packages().await.unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_error_propagates_without_retry() {
        let source = FakeSource::new(vec![]);
        source.fail.store(true, Ordering::SeqCst);
        let cache = SnapshotCache::new(source.clone(), TTL);

        let err = cache.get_all_overview_packages().await.unwrap_err();
        assert!(err.to_string().contains("unavailable"));
        assert_eq!(source.fetch_count(), 1);
        assert!(!cache.info().loaded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_forces_refetch() {
        let source = FakeSource::new(vec![overview("tidyr", "")]);
        let cache = SnapshotCache::new(source.clone(), TTL);

        cache.get_all_overview_packages().await.unwrap();
        cache.invalidate();
        assert_eq!(cache.info().package_count, 0);
        cache.get_all_overview_packages().await.unwrap();
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_fetch() {
        let source = FakeSource::new(vec![overview("shiny", "")]);
        let cache = Arc::new(SnapshotCache::new(source.clone(), TTL));

        let (a, b, c) = tokio::join!(
            cache.get_all_overview_packages(),
            cache.get_all_overview_packages(),
            cache.get_all_overview_packages(),
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_find_package_by_exact_name() {
        let source = FakeSource::new(vec![overview("data.table", "Extension of data.frame")]);
        let cache = SnapshotCache::new(source, TTL);

        let found = cache.find_package("data.table").await.unwrap();
        assert_eq!(found.unwrap().title, "Extension of data.frame");
        assert!(cache.find_package("Data.Table").await.unwrap().is_none());
    }
}
