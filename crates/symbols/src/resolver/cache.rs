use std::sync::Arc;

use dashmap::DashMap;
use log::{debug, info, warn};
use tokio::sync::Mutex;
use tokio::task;

use super::diagnostics::{NotFound, Resolution, ResolutionDiagnostics};
use super::static_table::StaticSymbolTable;
use crate::errors::SymbolError;
use crate::models::{InstrumentRecord, ResolutionKey, ResolvedSecurity, Tier};
use crate::remote::{LookupOutcome, RemoteLookupClient};
use crate::store::DatasetStore;

/// Tiered symbol -> security id resolver.
///
/// Tiers are consulted in order, returning on the first hit:
///
/// 1. memory: exact key lookup, no I/O
/// 2. dataset: first matching row of the store's current view
/// 3. remote: brokerage catalog lookup, written back to the dataset on a hit
/// 4. static fallback: built-in table, only while the dataset is unavailable
///
/// Constructed once at startup and shared behind an `Arc`.
pub struct ResolutionCache {
    memory: DashMap<ResolutionKey, String>,
    store: Arc<DatasetStore>,
    remote: Option<RemoteLookupClient>,
    fallback: Option<StaticSymbolTable>,
    write_gate: Mutex<()>,
}

impl ResolutionCache {
    /// A cache backed by `store` alone. Add tiers with the `with_*` builders.
    pub fn new(store: Arc<DatasetStore>) -> Self {
        Self {
            memory: DashMap::new(),
            store,
            remote: None,
            fallback: None,
            write_gate: Mutex::new(()),
        }
    }

    pub fn with_remote(mut self, remote: RemoteLookupClient) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn with_static_fallback(mut self, table: StaticSymbolTable) -> Self {
        self.fallback = Some(table);
        self
    }

    pub fn store(&self) -> &Arc<DatasetStore> {
        &self.store
    }

    /// Number of keys in the memory tier.
    pub fn memory_len(&self) -> usize {
        self.memory.len()
    }

    /// Number of entries in the static tier, zero when disabled.
    pub fn static_len(&self) -> usize {
        self.fallback.as_ref().map(StaticSymbolTable::len).unwrap_or(0)
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Resolve `symbol` to a broker security id.
    ///
    /// Arguments are compared exactly; callers normalise case beforehand.
    /// Tier failures are recorded in the diagnostics of the returned
    /// [`NotFound`] and never abort resolution.
    pub async fn resolve(&self, symbol: &str, instrument_type: &str, exchange: &str) -> Resolution {
        let key = ResolutionKey::new(symbol, instrument_type, exchange);
        let mut diagnostics = ResolutionDiagnostics::new();

        // 1. Memory
        if let Some(security_id) = self.memory.get(&key).map(|entry| entry.value().clone()) {
            debug!("Memory hit for {}: {}", key, security_id);
            return Ok(ResolvedSecurity {
                security_id,
                tier: Tier::Memory,
            });
        }
        diagnostics.record_miss(Tier::Memory);

        // 2. Dataset
        let dataset = self.store.snapshot();
        if let Some(record) = dataset.find(&key) {
            debug!("Dataset hit for {}: {}", key, record.security_id);
            self.memory.insert(key, record.security_id.clone());
            return Ok(ResolvedSecurity {
                security_id: record.security_id.clone(),
                tier: Tier::Dataset,
            });
        }
        match dataset.load_error_message() {
            Some(message) => diagnostics.record_skip(
                Tier::Dataset,
                format!("dataset failed to load: {}", message),
            ),
            None => diagnostics.record_miss(Tier::Dataset),
        }

        // 3. Remote
        match &self.remote {
            Some(remote) => {
                info!("{} not in dataset, asking {} catalog", key, remote.catalog_id());
                match remote.lookup(&key).await {
                    LookupOutcome::Found(security_id) => {
                        self.write_back(&key, &security_id).await;
                        return Ok(ResolvedSecurity {
                            security_id,
                            tier: Tier::Remote,
                        });
                    }
                    LookupOutcome::NotListed { catalog_entries } => {
                        debug!(
                            "{} not listed among {} catalog entries",
                            key, catalog_entries
                        );
                        diagnostics.record_miss(Tier::Remote);
                    }
                    LookupOutcome::Failed(e) => diagnostics.record_failure(Tier::Remote, &e),
                }
            }
            None => diagnostics.record_skip(Tier::Remote, "remote lookup not configured"),
        }

        // 4. Static fallback
        if let Some(table) = &self.fallback {
            let dataset = self.store.snapshot();
            if !dataset.is_unavailable() {
                diagnostics.record_skip(Tier::StaticFallback, "dataset available");
            } else if let Some(security_id) = table.get(&key) {
                warn!(
                    "Resolved {} from static fallback table ({}); dataset is {}",
                    key,
                    security_id,
                    dataset.origin()
                );
                return Ok(ResolvedSecurity {
                    security_id: security_id.to_string(),
                    tier: Tier::StaticFallback,
                });
            } else {
                diagnostics.record_miss(Tier::StaticFallback);
            }
        }

        let dataset_records = self.store.snapshot().len();
        info!(
            "Symbol {} not found ({} dataset records): {}",
            key,
            dataset_records,
            diagnostics.summary()
        );
        Err(NotFound::new(&key, dataset_records, diagnostics))
    }

    /// Persist a remotely learned id, refresh the view and promote it to
    /// memory as one serialized step.
    ///
    /// The append re-reads the whole file, so it runs on the blocking pool.
    async fn write_back(&self, key: &ResolutionKey, security_id: &str) {
        let _gate = self.write_gate.lock().await;

        let store = self.store.clone();
        let record = InstrumentRecord::from_key(key, security_id);
        let appended = task::spawn_blocking(move || store.append_if_absent(&record))
            .await
            .map_err(SymbolError::from)
            .and_then(|result| result);
        match appended {
            Ok(true) => info!("Learned {} = {} from remote catalog", key, security_id),
            Ok(false) => debug!("{} was already persisted", key),
            Err(e) => warn!(
                "Could not persist {} = {}; keeping it in memory only: {}",
                key, security_id, e
            ),
        }
        self.memory.insert(key.clone(), security_id.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{Result, SymbolError};
    use crate::models::DatasetOrigin;
    use crate::remote::{CatalogPayload, CatalogRow, InstrumentCatalog, RemoteLookupConfig};
    use crate::resolver::TierOutcome;
    use async_trait::async_trait;
    use std::fs;
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::{Duration, Instant};
    use tempfile::tempdir;

    const HEADER: &str = "SEM_EXM_EXCH_ID,SEM_TRADING_SYMBOL,SEM_SERIES,SEM_SMST_SECURITY_ID\n";

    struct FakeCatalog {
        rows: Vec<CatalogRow>,
        calls: AtomicUsize,
    }

    impl FakeCatalog {
        fn with(rows: &[(&str, &str, &str, &str)]) -> Arc<Self> {
            Arc::new(Self {
                rows: rows
                    .iter()
                    .map(|(exchange, symbol, series, id)| CatalogRow {
                        exchange: exchange.to_string(),
                        trading_symbol: symbol.to_string(),
                        series: series.to_string(),
                        security_id: id.to_string(),
                    })
                    .collect(),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl InstrumentCatalog for FakeCatalog {
        fn id(&self) -> &'static str {
            "FAKE"
        }

        async fn fetch_catalog(&self) -> Result<CatalogPayload> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(CatalogPayload::Rows(self.rows.clone()))
        }
    }

    struct HangingCatalog;

    #[async_trait]
    impl InstrumentCatalog for HangingCatalog {
        fn id(&self) -> &'static str {
            "HANGING"
        }

        async fn fetch_catalog(&self) -> Result<CatalogPayload> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Err(SymbolError::Catalog {
                message: "unreachable".to_string(),
            })
        }
    }

    fn store_with(path: &Path, body: &str) -> Arc<DatasetStore> {
        fs::write(path, body).unwrap();
        let store = Arc::new(DatasetStore::new(path));
        store.load();
        store
    }

    fn count_rows(path: &Path, symbol: &str) -> usize {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .filter(|line| line.split(',').nth(1) == Some(symbol))
            .count()
    }

    #[tokio::test]
    async fn test_memory_tier_wins_over_dataset() {
        let dir = tempdir().unwrap();
        let store = store_with(
            &dir.path().join("ids.csv"),
            &format!("{}NSE,INFY,EQ,1594\n", HEADER),
        );
        let cache = ResolutionCache::new(store);
        cache
            .memory
            .insert(ResolutionKey::new("INFY", "EQ", "NSE"), "9999".to_string());

        let resolved = cache.resolve("INFY", "EQ", "NSE").await.unwrap();

        assert_eq!(resolved.security_id, "9999");
        assert_eq!(resolved.tier, Tier::Memory);
    }

    #[tokio::test]
    async fn test_dataset_hit_populates_memory_and_survives_unreadable_dataset() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ids.csv");
        let store = store_with(&path, &format!("{}NSE,INFY,EQ,1594\n", HEADER));
        let cache = ResolutionCache::new(store.clone());

        let first = cache.resolve("INFY", "EQ", "NSE").await.unwrap();
        assert_eq!(first.security_id, "1594");
        assert_eq!(first.tier, Tier::Dataset);
        assert_eq!(cache.memory_len(), 1);

        fs::remove_file(&path).unwrap();
        assert_eq!(store.load().origin(), DatasetOrigin::LoadError);

        let second = cache.resolve("INFY", "EQ", "NSE").await.unwrap();
        assert_eq!(second.security_id, "1594");
        assert_eq!(second.tier, Tier::Memory);
    }

    #[tokio::test]
    async fn test_duplicate_rows_resolve_to_first() {
        let dir = tempdir().unwrap();
        let store = store_with(
            &dir.path().join("ids.csv"),
            &format!("{}NSE,INFY,EQ,1594\nNSE,INFY,EQ,7777\n", HEADER),
        );
        let cache = ResolutionCache::new(store);

        let resolved = cache.resolve("INFY", "EQ", "NSE").await.unwrap();

        assert_eq!(resolved.security_id, "1594");
    }

    #[tokio::test]
    async fn test_remote_write_back_happens_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ids.csv");
        let store = store_with(&path, HEADER);
        let catalog = FakeCatalog::with(&[("NSE", "TCS", "EQ", "11536")]);
        let cache = ResolutionCache::new(store.clone())
            .with_remote(RemoteLookupClient::new(catalog.clone()));

        let first = cache.resolve("TCS", "EQ", "NSE").await.unwrap();
        assert_eq!(first.security_id, "11536");
        assert_eq!(first.tier, Tier::Remote);

        let second = cache.resolve("TCS", "EQ", "NSE").await.unwrap();
        assert_eq!(second.security_id, "11536");
        assert_eq!(second.tier, Tier::Memory);

        assert_eq!(catalog.calls(), 1);
        assert_eq!(count_rows(&path, "TCS"), 1);
        assert!(store
            .snapshot()
            .contains(&ResolutionKey::new("TCS", "EQ", "NSE")));
    }

    #[tokio::test]
    async fn test_learned_row_serves_a_fresh_process() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ids.csv");
        let catalog = FakeCatalog::with(&[("NSE", "SBIN", "EQ", "3045")]);
        {
            let cache = ResolutionCache::new(store_with(&path, HEADER))
                .with_remote(RemoteLookupClient::new(catalog.clone()));
            cache.resolve("SBIN", "EQ", "NSE").await.unwrap();
        }

        let restarted = Arc::new(DatasetStore::new(&path));
        restarted.load();
        let cache = ResolutionCache::new(restarted)
            .with_remote(RemoteLookupClient::new(catalog.clone()));
        let resolved = cache.resolve("SBIN", "EQ", "NSE").await.unwrap();

        assert_eq!(resolved.tier, Tier::Dataset);
        assert_eq!(catalog.calls(), 1);
    }

    #[tokio::test]
    async fn test_miss_has_no_side_effects() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ids.csv");
        let body = format!("{}NSE,INFY,EQ,1594\n", HEADER);
        let store = store_with(&path, &body);
        let catalog = FakeCatalog::with(&[("NSE", "TCS", "EQ", "11536")]);
        let cache = ResolutionCache::new(store.clone())
            .with_remote(RemoteLookupClient::new(catalog.clone()))
            .with_static_fallback(StaticSymbolTable::builtin());

        let miss = cache.resolve("WIPRO", "EQ", "NSE").await.unwrap_err();

        assert_eq!(miss.symbol, "WIPRO");
        assert_eq!(miss.instrument, "EQ");
        assert_eq!(miss.exchange, "NSE");
        assert_eq!(miss.dataset_records, 1);
        assert_eq!(miss.diagnostics.outcome(Tier::Remote), Some(&TierOutcome::Miss));
        assert!(matches!(
            miss.diagnostics.outcome(Tier::StaticFallback),
            Some(TierOutcome::Skipped { .. })
        ));
        assert_eq!(cache.memory_len(), 0);
        assert_eq!(fs::read_to_string(&path).unwrap(), body);
        assert_eq!(store.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn test_remote_timeout_is_a_miss() {
        let dir = tempdir().unwrap();
        let store = store_with(&dir.path().join("ids.csv"), HEADER);
        let cache = ResolutionCache::new(store).with_remote(RemoteLookupClient::with_config(
            Arc::new(HangingCatalog),
            RemoteLookupConfig::from_millis(20),
        ));

        let miss = cache.resolve("INFY", "EQ", "NSE").await.unwrap_err();

        match miss.diagnostics.outcome(Tier::Remote) {
            Some(TierOutcome::Failed { message, .. }) => assert!(message.contains("timed out")),
            other => panic!("Expected remote failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_static_fallback_only_when_dataset_unavailable() {
        let dir = tempdir().unwrap();

        // Unavailable: the file does not exist.
        let missing = Arc::new(DatasetStore::new(dir.path().join("missing.csv")));
        missing.load();
        let cache = ResolutionCache::new(missing.clone())
            .with_static_fallback(StaticSymbolTable::builtin());

        let resolved = cache.resolve("RELIANCE", "EQ", "NSE").await.unwrap();
        assert_eq!(resolved.security_id, "2885");
        assert_eq!(resolved.tier, Tier::StaticFallback);
        assert_eq!(cache.memory_len(), 0);
        assert!(!dir.path().join("missing.csv").exists());

        // Available but lacking the symbol: the static table stays unused.
        let store = store_with(
            &dir.path().join("ids.csv"),
            &format!("{}NSE,INFY,EQ,1594\n", HEADER),
        );
        let cache =
            ResolutionCache::new(store).with_static_fallback(StaticSymbolTable::builtin());

        assert!(cache.resolve("RELIANCE", "EQ", "NSE").await.is_err());
    }

    #[tokio::test]
    async fn test_static_fallback_consulted_after_remote_miss() {
        let dir = tempdir().unwrap();
        let store = Arc::new(DatasetStore::new(dir.path().join("ids.csv")));
        store.create_empty().unwrap();
        let catalog = FakeCatalog::with(&[]);
        let cache = ResolutionCache::new(store)
            .with_remote(RemoteLookupClient::new(catalog.clone()))
            .with_static_fallback(StaticSymbolTable::builtin());

        let resolved = cache.resolve("ITC", "EQ", "NSE").await.unwrap();

        assert_eq!(catalog.calls(), 1);
        assert_eq!(resolved.tier, Tier::StaticFallback);
        assert_eq!(resolved.security_id, "1660");
    }

    #[tokio::test]
    async fn test_write_back_into_missing_file_creates_it() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ids.csv");
        let store = Arc::new(DatasetStore::new(&path));
        store.load();
        let catalog = FakeCatalog::with(&[("NSE", "HDFCBANK", "EQ", "1333")]);
        let cache =
            ResolutionCache::new(store).with_remote(RemoteLookupClient::new(catalog.clone()));

        cache.resolve("HDFCBANK", "EQ", "NSE").await.unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, format!("{}NSE,HDFCBANK,EQ,1333\n", HEADER));
    }

    #[tokio::test]
    async fn test_write_back_keeps_runtime_responsive() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ids.csv");
        let mut body = String::from(HEADER);
        for i in 0..100_000 {
            body.push_str(&format!("NSE,SYM{},EQ,{}\n", i, 100_000 + i));
        }
        let store = store_with(&path, &body);
        let catalog = FakeCatalog::with(&[("NSE", "TCS", "EQ", "11536")]);
        let cache = ResolutionCache::new(store).with_remote(RemoteLookupClient::new(catalog));

        // Single-threaded runtime: the ticker only runs while resolve yields.
        let done = Arc::new(AtomicBool::new(false));
        let ticker = tokio::spawn({
            let done = done.clone();
            async move {
                let mut last = Instant::now();
                let mut max_gap = Duration::ZERO;
                while !done.load(Ordering::SeqCst) {
                    tokio::time::sleep(Duration::from_millis(1)).await;
                    let now = Instant::now();
                    max_gap = max_gap.max(now - last);
                    last = now;
                }
                max_gap
            }
        });
        tokio::task::yield_now().await;

        let resolved = cache.resolve("TCS", "EQ", "NSE").await.unwrap();
        done.store(true, Ordering::SeqCst);
        let max_gap = ticker.await.unwrap();

        assert_eq!(resolved.tier, Tier::Remote);
        assert_eq!(count_rows(&path, "TCS"), 1);
        assert!(max_gap < Duration::from_millis(250), "runtime stalled for {:?}", max_gap);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_write_backs_persist_each_key_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ids.csv");
        let store = store_with(&path, HEADER);
        let listed: Vec<(String, String)> = (0..20)
            .map(|i| (format!("NEW{}", i), (50_000 + i).to_string()))
            .collect();
        let rows: Vec<(&str, &str, &str, &str)> = listed
            .iter()
            .map(|(symbol, id)| ("NSE", symbol.as_str(), "EQ", id.as_str()))
            .collect();
        let cache = Arc::new(
            ResolutionCache::new(store.clone())
                .with_remote(RemoteLookupClient::new(FakeCatalog::with(&rows))),
        );

        // Every symbol is requested three times at once.
        let mut handles = Vec::new();
        for _ in 0..3 {
            for (symbol, _) in &listed {
                let cache = cache.clone();
                let symbol = symbol.clone();
                handles.push(tokio::spawn(async move {
                    cache.resolve(&symbol, "EQ", "NSE").await
                }));
            }
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        for (symbol, id) in &listed {
            assert_eq!(count_rows(&path, symbol), 1, "{}", symbol);
            assert_eq!(
                store
                    .find(&ResolutionKey::new(symbol.as_str(), "EQ", "NSE"))
                    .map(|r| r.security_id),
                Some(id.clone())
            );
        }
        assert_eq!(store.snapshot().len(), listed.len());
        assert_eq!(cache.memory_len(), listed.len());
        assert_eq!(DatasetStore::new(&path).load().len(), listed.len());
    }
}
