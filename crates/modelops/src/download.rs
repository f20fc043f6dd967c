//! Ensures model weights exist in the local cache.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{CatalogError, DownloadError};
use crate::manifest::{manifest_hash, verify_artifacts};
use crate::retry::RetryPolicy;
use crate::{ArtifactSpec, DownloadRecord, ModelCatalog, ModelDescriptor};

/// Transfers a single artifact to `dest`. Implementations must never leave a
/// partial file at `dest` itself.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    async fn fetch(
        &self,
        descriptor: &ModelDescriptor,
        artifact: &ArtifactSpec,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> Result<u64, DownloadError>;
}

/// Fetches from a HuggingFace-compatible `resolve` endpoint.
pub struct HfFetcher {
    endpoint: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl HfFetcher {
    pub fn new(endpoint: impl Into<String>, token: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            token,
            client: reqwest::Client::builder()
                .user_agent(concat!("modelops/", env!("CARGO_PKG_VERSION")))
                .connect_timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    fn url_for(&self, descriptor: &ModelDescriptor, artifact: &ArtifactSpec) -> String {
        let file = artifact
            .rel_path
            .split('/')
            .map(|seg| urlencoding::encode(seg).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!(
            "{}/{}/resolve/{}/{}",
            self.endpoint,
            descriptor.remote_id,
            urlencoding::encode(&descriptor.revision),
            file
        )
    }
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

fn disk(e: std::io::Error) -> DownloadError {
    DownloadError::Disk(e.to_string())
}

#[async_trait]
impl ArtifactFetcher for HfFetcher {
    async fn fetch(
        &self,
        descriptor: &ModelDescriptor,
        artifact: &ArtifactSpec,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> Result<u64, DownloadError> {
        let url = self.url_for(descriptor, artifact);
        debug!(url = %url, "fetching artifact");

        let mut req = self.client.get(&url);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let mut resp = tokio::select! {
            _ = cancel.cancelled() => return Err(DownloadError::Cancelled),
            r = req.send() => r.map_err(|e| DownloadError::Network(e.to_string()))?,
        };

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(DownloadError::Auth(format!("HTTP {status} for {url}")));
        }
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(DownloadError::Network(format!("HTTP {status} for {url}")));
        }
        if !status.is_success() {
            return Err(DownloadError::Verification(format!("HTTP {status} for {url}")));
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(disk)?;
        }
        let part = part_path(dest);
        let mut file = tokio::fs::File::create(&part).await.map_err(disk)?;
        let mut written: u64 = 0;

        let outcome: Result<(), DownloadError> = loop {
            let chunk = tokio::select! {
                _ = cancel.cancelled() => break Err(DownloadError::Cancelled),
                c = resp.chunk() => c,
            };
            match chunk {
                Ok(Some(bytes)) => {
                    if let Err(e) = file.write_all(&bytes).await {
                        break Err(disk(e));
                    }
                    written += bytes.len() as u64;
                }
                Ok(None) => break Ok(()),
                Err(e) => break Err(DownloadError::Network(e.to_string())),
            }
        };

        let outcome = match outcome {
            Ok(()) => file.sync_all().await.map_err(disk),
            Err(e) => Err(e),
        };
        drop(file);

        if let Err(e) = outcome {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(e);
        }
        tokio::fs::rename(&part, dest).await.map_err(disk)?;
        Ok(written)
    }
}

/// Cancellation shared by every caller waiting on one key, queued or
/// transferring. A cancelled entry is replaced by the next caller to arrive.
struct ActiveDownload {
    token: CancellationToken,
    generation: u64,
    holders: usize,
}

#[derive(Default)]
struct ActiveSet {
    entries: HashMap<String, ActiveDownload>,
    next_generation: u64,
}

/// Drops one caller's hold on a key's token.
struct ActiveGuard<'a> {
    active: &'a Mutex<ActiveSet>,
    key: String,
    generation: u64,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        let Ok(mut set) = self.active.lock() else {
            return;
        };
        let finished = match set.entries.get_mut(&self.key) {
            Some(entry) if entry.generation == self.generation => {
                entry.holders -= 1;
                entry.holders == 0
            }
            _ => false,
        };
        if finished {
            set.entries.remove(&self.key);
        }
    }
}

pub struct DownloadManager {
    catalog: ModelCatalog,
    fetcher: Arc<dyn ArtifactFetcher>,
    retry: RetryPolicy,
    records: RwLock<HashMap<String, DownloadRecord>>,
    key_locks: HashMap<String, Arc<tokio::sync::Mutex<()>>>,
    active: Mutex<ActiveSet>,
}

impl DownloadManager {
    /// Builds the manager and derives every record from what is on disk.
    pub fn new(catalog: ModelCatalog, fetcher: Arc<dyn ArtifactFetcher>, retry: RetryPolicy) -> Self {
        let key_locks = catalog
            .keys()
            .map(|k| (k.to_string(), Arc::new(tokio::sync::Mutex::new(()))))
            .collect();
        let mgr = Self {
            catalog,
            fetcher,
            retry,
            records: RwLock::new(HashMap::new()),
            key_locks,
            active: Mutex::new(ActiveSet::default()),
        };
        mgr.rescan();
        mgr
    }

    /// Re-derives all records from the local cache.
    pub fn rescan(&self) {
        let mut fresh = HashMap::new();
        for d in self.catalog.iter() {
            let rec = match verify_artifacts(&d.local_path, &d.artifacts) {
                Ok(files) => DownloadRecord {
                    present: true,
                    verified_at: Some(chrono::Utc::now()),
                    manifest_hash: Some(manifest_hash(files.clone())),
                    files,
                },
                Err(_) => DownloadRecord::default(),
            };
            fresh.insert(d.key.clone(), rec);
        }
        let present = fresh.values().filter(|r| r.present).count();
        info!(models = fresh.len(), present, root = %self.catalog.models_root().display(), "download cache scanned");
        if let Ok(mut records) = self.records.write() {
            *records = fresh;
        }
    }

    pub fn is_downloaded(&self, key: &str) -> bool {
        self.record(key).map(|r| r.present).unwrap_or(false)
    }

    pub fn record(&self, key: &str) -> Option<DownloadRecord> {
        self.records.read().ok()?.get(key).cloned()
    }

    pub fn records(&self) -> HashMap<String, DownloadRecord> {
        self.records.read().map(|r| r.clone()).unwrap_or_default()
    }

    /// Marks a cache entry absent so the next download re-checks every file.
    pub fn invalidate(&self, key: &str) {
        if let Ok(mut records) = self.records.write() {
            if let Some(r) = records.get_mut(key) {
                *r = DownloadRecord::default();
            }
        }
    }

    pub fn is_downloading(&self, key: &str) -> bool {
        self.active
            .lock()
            .map(|a| a.entries.get(key).is_some_and(|e| !e.token.is_cancelled()))
            .unwrap_or(false)
    }

    /// Joins the key's live token, or starts a fresh one.
    fn join(&self, key: &str) -> Result<(CancellationToken, ActiveGuard<'_>), DownloadError> {
        let mut set = self
            .active
            .lock()
            .map_err(|_| DownloadError::Disk("download registry poisoned".into()))?;
        let live = set
            .entries
            .get_mut(key)
            .filter(|e| !e.token.is_cancelled())
            .map(|e| {
                e.holders += 1;
                (e.token.clone(), e.generation)
            });
        let (token, generation) = match live {
            Some(joined) => joined,
            None => {
                set.next_generation += 1;
                let generation = set.next_generation;
                let token = CancellationToken::new();
                set.entries.insert(
                    key.to_string(),
                    ActiveDownload { token: token.clone(), generation, holders: 1 },
                );
                (token, generation)
            }
        };
        Ok((token, ActiveGuard { active: &self.active, key: key.to_string(), generation }))
    }

    /// `true` once the artifacts are verified on disk; `false` on any
    /// download failure (the cause is logged).
    pub async fn ensure_downloaded(&self, key: &str) -> Result<bool, CatalogError> {
        let descriptor = self.catalog.get(key)?;
        match self.download(&descriptor).await {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!(key = %key, error = %e, "download failed");
                Ok(false)
            }
        }
    }

    /// Detailed form of [`ensure_downloaded`](Self::ensure_downloaded).
    pub async fn download(&self, descriptor: &ModelDescriptor) -> Result<(), DownloadError> {
        if self.is_downloaded(&descriptor.key) {
            return Ok(());
        }

        // joined before queueing so a cancel also reaches waiters
        let (cancel, _guard) = self.join(&descriptor.key)?;

        let lock = self
            .key_locks
            .get(&descriptor.key)
            .cloned()
            .unwrap_or_else(|| Arc::new(tokio::sync::Mutex::new(())));
        let _held = tokio::select! {
            _ = cancel.cancelled() => return Err(DownloadError::Cancelled),
            held = lock.lock() => held,
        };

        // a concurrent caller may have finished while we waited
        if self.is_downloaded(&descriptor.key) {
            return Ok(());
        }
        if cancel.is_cancelled() {
            return Err(DownloadError::Cancelled);
        }

        info!(key = %descriptor.key, remote_id = %descriptor.remote_id, "downloading model");
        tokio::fs::create_dir_all(&descriptor.local_path)
            .await
            .map_err(disk)?;

        for artifact in &descriptor.artifacts {
            let dest = descriptor.local_path.join(&artifact.rel_path);
            if artifact_ok(&dest, artifact).await {
                debug!(file = %artifact.rel_path, "already present");
                continue;
            }
            self.fetch_with_retry(descriptor, artifact, &dest, &cancel).await?;
        }

        let dir = descriptor.local_path.clone();
        let specs = descriptor.artifacts.clone();
        let files = tokio::task::spawn_blocking(move || verify_artifacts(&dir, &specs))
            .await
            .map_err(|e| DownloadError::Disk(format!("verify task failed: {e}")))?
            .map_err(|problems| DownloadError::Verification(problems.join("; ")))?;
        if cancel.is_cancelled() {
            return Err(DownloadError::Cancelled);
        }

        let record = DownloadRecord {
            present: true,
            verified_at: Some(chrono::Utc::now()),
            manifest_hash: Some(manifest_hash(files.clone())),
            files,
        };
        if let Ok(mut records) = self.records.write() {
            records.insert(descriptor.key.clone(), record);
        }
        info!(key = %descriptor.key, "model download verified");
        Ok(())
    }

    async fn fetch_with_retry(
        &self,
        descriptor: &ModelDescriptor,
        artifact: &ArtifactSpec,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), DownloadError> {
        let mut retry = 0;
        loop {
            match self.fetcher.fetch(descriptor, artifact, dest, cancel).await {
                Ok(bytes) => {
                    debug!(file = %artifact.rel_path, bytes, "artifact fetched");
                    return Ok(());
                }
                Err(e) if e.is_retryable() && retry < self.retry.max_retries => {
                    let delay = self.retry.delay_for(retry);
                    warn!(
                        key = %descriptor.key,
                        file = %artifact.rel_path,
                        retry = retry + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying after backoff"
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(DownloadError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    retry += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Aborts an in-flight download and every caller queued behind it.
    /// The record stays absent.
    pub fn cancel(&self, key: &str) -> bool {
        let Ok(active) = self.active.lock() else {
            return false;
        };
        match active.entries.get(key) {
            Some(entry) if !entry.token.is_cancelled() => {
                info!(key = %key, waiters = entry.holders, "cancelling download");
                entry.token.cancel();
                true
            }
            _ => false,
        }
    }

    pub fn cancel_all(&self) {
        if let Ok(active) = self.active.lock() {
            for entry in active.entries.values() {
                entry.token.cancel();
            }
        }
    }
}

async fn artifact_ok(path: &Path, spec: &ArtifactSpec) -> bool {
    match tokio::fs::metadata(path).await {
        Ok(m) if m.is_file() && m.len() > 0 => spec.size.map_or(true, |s| s == m.len()),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogEntry;
    use crate::{ExecutionBackend, ModelFamily};

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn catalog_with(root: &Path, artifacts: Vec<ArtifactSpec>) -> ModelCatalog {
        ModelCatalog::from_entries(
            root,
            vec![CatalogEntry {
                key: "tiny".into(),
                family: ModelFamily::CausalLm,
                remote_id: "org/tiny".into(),
                revision: "main".into(),
                estimated_memory_mb: 10,
                backend_hints: vec![ExecutionBackend::Eager],
                quantization: None,
                artifacts,
            }],
        )
        .unwrap()
    }

    fn tiny_catalog(root: &Path, endpoint_files: &[&str]) -> ModelCatalog {
        catalog_with(root, endpoint_files.iter().map(|f| ArtifactSpec::new(f)).collect())
    }

    /// Either fails with a full disk or stalls until cancelled.
    #[derive(Default)]
    struct LocalFetcher {
        disk_full: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ArtifactFetcher for LocalFetcher {
        async fn fetch(
            &self,
            _d: &ModelDescriptor,
            _artifact: &ArtifactSpec,
            dest: &Path,
            cancel: &CancellationToken,
        ) -> Result<u64, DownloadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.disk_full {
                return Err(DownloadError::Disk("No space left on device (os error 28)".into()));
            }
            tokio::select! {
                _ = cancel.cancelled() => Err(DownloadError::Cancelled),
                _ = tokio::time::sleep(Duration::from_secs(30)) => {
                    tokio::fs::write(dest, b"weights").await.map_err(disk)?;
                    Ok(7)
                }
            }
        }
    }

    async fn wait_until(mut cond: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !cond() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    fn holders(mgr: &DownloadManager, key: &str) -> usize {
        mgr.active.lock().unwrap().entries.get(key).map_or(0, |e| e.holders)
    }

    #[tokio::test]
    async fn hf_fetch_writes_file_and_is_idempotent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/org/tiny/resolve/main/model.safetensors")
            .with_status(200)
            .with_body("weights")
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let catalog = tiny_catalog(dir.path(), &["model.safetensors"]);
        let fetcher = Arc::new(HfFetcher::new(server.url(), None));
        let mgr = DownloadManager::new(catalog, fetcher, RetryPolicy::immediate(0));

        assert!(!mgr.is_downloaded("tiny"));
        assert!(mgr.ensure_downloaded("tiny").await.unwrap());
        assert!(mgr.ensure_downloaded("tiny").await.unwrap());
        mock.assert_async().await;

        let rec = mgr.record("tiny").unwrap();
        assert!(rec.present);
        assert!(rec.manifest_hash.is_some());
        assert_eq!(
            std::fs::read(dir.path().join("tiny/model.safetensors")).unwrap(),
            b"weights"
        );
    }

    #[tokio::test]
    async fn server_errors_retry_then_report_false() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/org/tiny/resolve/main/model.safetensors")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let catalog = tiny_catalog(dir.path(), &["model.safetensors"]);
        let fetcher = Arc::new(HfFetcher::new(server.url(), None));
        let mgr = DownloadManager::new(catalog, fetcher, RetryPolicy::immediate(2));

        assert!(!mgr.ensure_downloaded("tiny").await.unwrap());
        mock.assert_async().await;
        assert!(!mgr.is_downloaded("tiny"));
        assert!(!dir.path().join("tiny/model.safetensors").exists());
    }

    #[tokio::test]
    async fn auth_failure_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/org/tiny/resolve/main/model.safetensors")
            .with_status(401)
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let catalog = tiny_catalog(dir.path(), &["model.safetensors"]);
        let fetcher = Arc::new(HfFetcher::new(server.url(), Some("hf_x".into())));
        let mgr = DownloadManager::new(catalog.clone(), fetcher, RetryPolicy::immediate(5));

        let d = catalog.get("tiny").unwrap();
        assert!(matches!(mgr.download(&d).await, Err(DownloadError::Auth(_))));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn size_mismatch_after_transfer_is_not_marked_present() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/org/tiny/resolve/main/model.safetensors")
            .with_status(200)
            .with_body("weights")
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let catalog = catalog_with(
            dir.path(),
            vec![ArtifactSpec { rel_path: "model.safetensors".into(), size: Some(100) }],
        );
        let fetcher = Arc::new(HfFetcher::new(server.url(), None));
        let mgr = DownloadManager::new(catalog.clone(), fetcher, RetryPolicy::immediate(3));

        let d = catalog.get("tiny").unwrap();
        assert!(matches!(mgr.download(&d).await, Err(DownloadError::Verification(_))));
        mock.assert_async().await;
        assert!(!mgr.is_downloaded("tiny"));
        assert!(mgr.record("tiny").unwrap().manifest_hash.is_none());
    }

    #[tokio::test]
    async fn disk_failure_is_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = tiny_catalog(dir.path(), &["model.safetensors"]);
        let fetcher = Arc::new(LocalFetcher { disk_full: true, ..Default::default() });
        let mgr = DownloadManager::new(catalog.clone(), fetcher.clone(), RetryPolicy::immediate(5));

        let d = catalog.get("tiny").unwrap();
        assert!(matches!(mgr.download(&d).await, Err(DownloadError::Disk(_))));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert!(!mgr.is_downloaded("tiny"));
    }

    #[tokio::test]
    async fn cancel_mid_transfer_removes_partial_file() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 2048];
            let _ = sock.read(&mut buf).await;
            sock.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 1000000\r\n\r\npartial weights")
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let dir = tempfile::tempdir().unwrap();
        let catalog = tiny_catalog(dir.path(), &["model.safetensors"]);
        let fetcher = Arc::new(HfFetcher::new(format!("http://{addr}"), None));
        let mgr = Arc::new(DownloadManager::new(catalog, fetcher, RetryPolicy::immediate(0)));

        let task = tokio::spawn({
            let mgr = mgr.clone();
            async move { mgr.ensure_downloaded("tiny").await.unwrap() }
        });
        let part = dir.path().join("tiny/model.safetensors.part");
        wait_until(|| part.exists()).await;
        assert!(mgr.is_downloading("tiny"));

        assert!(mgr.cancel("tiny"));
        assert!(!task.await.unwrap());
        assert!(!part.exists());
        assert!(!dir.path().join("tiny/model.safetensors").exists());
        assert!(!mgr.is_downloaded("tiny"));
        assert!(!mgr.is_downloading("tiny"));
    }

    #[tokio::test]
    async fn cancel_reaches_callers_queued_on_the_same_key() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = tiny_catalog(dir.path(), &["model.safetensors"]);
        let fetcher = Arc::new(LocalFetcher::default());
        let mgr = Arc::new(DownloadManager::new(catalog, fetcher.clone(), RetryPolicy::immediate(0)));

        let spawn_download = || {
            let mgr = mgr.clone();
            tokio::spawn(async move { mgr.ensure_downloaded("tiny").await.unwrap() })
        };
        let first = spawn_download();
        let second = spawn_download();
        wait_until(|| holders(&mgr, "tiny") == 2 && fetcher.calls.load(Ordering::SeqCst) == 1).await;

        assert!(mgr.cancel("tiny"));
        assert!(!first.await.unwrap());
        assert!(!second.await.unwrap());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert!(!mgr.is_downloaded("tiny"));
        assert_eq!(holders(&mgr, "tiny"), 0);
        assert!(!mgr.cancel("tiny"));
    }

    #[tokio::test]
    async fn unknown_key_is_an_error_not_false() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = tiny_catalog(dir.path(), &["a.bin"]);
        let mgr = DownloadManager::new(catalog, Arc::new(HfFetcher::new("http://127.0.0.1:9", None)), RetryPolicy::immediate(0));
        assert!(matches!(mgr.ensure_downloaded("other").await, Err(CatalogError::UnknownKey(_))));
    }

    #[test]
    fn rescan_picks_up_existing_cache() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("tiny")).unwrap();
        std::fs::write(dir.path().join("tiny/a.bin"), b"x").unwrap();

        let catalog = tiny_catalog(dir.path(), &["a.bin", "b.bin"]);
        let mgr = DownloadManager::new(catalog, Arc::new(HfFetcher::new("http://127.0.0.1:9", None)), RetryPolicy::immediate(0));
        assert!(!mgr.is_downloaded("tiny"));

        std::fs::write(dir.path().join("tiny/b.bin"), b"y").unwrap();
        mgr.rescan();
        assert!(mgr.is_downloaded("tiny"));
    }

    #[test]
    fn url_encodes_segments() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = tiny_catalog(dir.path(), &["sub dir/model file.bin"]);
        let d = catalog.get("tiny").unwrap();
        let f = HfFetcher::new("https://hf.example/", None);
        assert_eq!(
            f.url_for(&d, &d.artifacts[0]),
            "https://hf.example/org/tiny/resolve/main/sub%20dir/model%20file.bin"
        );
    }
}
