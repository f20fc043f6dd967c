//! Residency state machine: EMPTY -> DOWNLOADING -> LOADING -> RESIDENT ->
//! UNLOADING -> EMPTY. Every device-affecting operation runs under one
//! process-wide slot lock.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

use crate::device::DeviceMemory;
use crate::download::DownloadManager;
use crate::error::{LoadError, ResidencyError, Result};
use crate::manifest::verify_artifacts;
use crate::runtime::{GenerationRequest, GenerationResult, LoadOutcome, RuntimeSet};
use crate::slot::{FailureRecord, LoadedModel, ResidencyPhase, ResidencySlot, SlotSnapshot};
use crate::{ModelCatalog, ModelDescriptor, ModelFamily};

struct Inner {
    catalog: ModelCatalog,
    downloads: Arc<DownloadManager>,
    runtimes: RuntimeSet,
    device: Arc<DeviceMemory>,
    slot: Arc<Mutex<ResidencySlot>>,
    snapshot: watch::Sender<SlotSnapshot>,
}

/// Owns the residency slot. Cheap to clone; clones share the slot.
///
/// Each operation is spawned onto the runtime before it waits for the slot,
/// so a caller that drops the returned future (timeout, disconnect) never
/// aborts a half-done device operation. The slot lock is FIFO-fair.
#[derive(Clone)]
pub struct ResidencyManager {
    inner: Arc<Inner>,
}

impl ResidencyManager {
    pub fn new(
        catalog: ModelCatalog,
        downloads: Arc<DownloadManager>,
        runtimes: RuntimeSet,
        device: Arc<DeviceMemory>,
    ) -> Self {
        let (snapshot, _) = watch::channel(SlotSnapshot::default());
        Self {
            inner: Arc::new(Inner {
                catalog,
                downloads,
                runtimes,
                device,
                slot: Arc::new(Mutex::new(ResidencySlot::default())),
                snapshot,
            }),
        }
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.inner.catalog
    }

    pub fn downloads(&self) -> &Arc<DownloadManager> {
        &self.inner.downloads
    }

    pub fn device(&self) -> &Arc<DeviceMemory> {
        &self.inner.device
    }

    /// Latest published state. Never waits on the slot lock.
    pub fn snapshot(&self) -> SlotSnapshot {
        self.inner.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SlotSnapshot> {
        self.inner.snapshot.subscribe()
    }

    pub fn current_key(&self) -> Option<String> {
        self.inner.snapshot.borrow().resident.as_ref().map(|r| r.key.clone())
    }

    /// Loads `key` into an empty slot. `Ok(false)` means the attempt failed
    /// and the slot is empty; the cause is in the snapshot's `last_failure`.
    pub async fn load(&self, key: &str) -> Result<bool> {
        let descriptor = self.inner.catalog.get(key)?;
        self.spawn_op("load", move |inner| async move {
            let mut slot = inner.slot.clone().lock_owned().await;
            inner.load_locked(&mut slot, descriptor).await
        })
        .await
    }

    /// Releases the resident model, if any. Always ends with an empty slot.
    pub async fn unload(&self) -> Result<bool> {
        self.spawn_op("unload", |inner| async move {
            let mut slot = inner.slot.clone().lock_owned().await;
            Ok(inner.unload_locked(&mut slot).await)
        })
        .await
    }

    /// Unload then load, under one hold of the slot lock. A failed load
    /// leaves the slot empty; the previous model is not restored.
    pub async fn switch(&self, key: &str) -> Result<bool> {
        let descriptor = self.inner.catalog.get(key)?;
        self.spawn_op("switch", move |inner| async move {
            let mut slot = inner.slot.clone().lock_owned().await;
            if slot.current_key() == Some(descriptor.key.as_str()) {
                debug!(key = %descriptor.key, "switch target already resident");
                return Ok(true);
            }
            inner.unload_locked(&mut slot).await;
            inner.load_locked(&mut slot, descriptor).await
        })
        .await
    }

    /// Runs one generation against the resident model. Callers should go
    /// through [`GenerationDispatcher`](crate::GenerationDispatcher), which
    /// validates the request first.
    pub(crate) async fn run_generation(&self, request: GenerationRequest) -> Result<GenerationResult> {
        self.spawn_op("generate", move |inner| async move {
            let mut slot = inner.slot.clone().lock_owned().await;
            inner.generate_locked(&mut slot, request).await
        })
        .await
    }

    /// Teardown: stops downloads and releases the resident model.
    pub async fn shutdown(&self) {
        self.inner.downloads.cancel_all();
        match self.unload().await {
            Ok(_) => info!("residency manager shut down"),
            Err(e) => error!(error = %e, "unload during shutdown failed"),
        }
    }

    async fn spawn_op<T, F, Fut>(&self, op: &'static str, f: F) -> Result<T>
    where
        F: FnOnce(Arc<Inner>) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let inner = self.inner.clone();
        let task = f(inner.clone());
        tokio::spawn(async move {
            match tokio::spawn(task).await {
                Ok(result) => result,
                Err(e) => {
                    error!(op, error = %e, "residency task aborted; republishing slot state");
                    inner.recover(op, &e.to_string()).await;
                    Err(ResidencyError::Aborted(format!("{op}: {e}")))
                }
            }
        })
        .await
        .map_err(|e| ResidencyError::Aborted(format!("{op}: {e}")))?
    }
}

impl Inner {
    fn set_phase(&self, phase: ResidencyPhase) {
        debug!(phase = phase.name(), "residency phase");
        self.snapshot.send_modify(|s| s.phase = phase);
    }

    /// Publishes the slot's settled state (resident or empty).
    fn settle(&self, slot: &ResidencySlot) {
        let resident = slot.resident().map(|m| m.info());
        let phase = match &resident {
            Some(r) => ResidencyPhase::Resident { key: r.key.clone() },
            None => ResidencyPhase::Empty,
        };
        self.snapshot.send_modify(|s| {
            s.phase = phase;
            s.resident = resident;
        });
    }

    fn record_failure(&self, key: &str, cause: String) {
        self.snapshot.send_modify(|s| {
            s.last_failure = Some(FailureRecord { key: key.to_string(), cause, at: Utc::now() });
        });
    }

    /// Re-publishes the slot after a task died mid-operation, so the
    /// snapshot never sticks in a transitional phase.
    async fn recover(&self, op: &str, cause: &str) {
        let key = self.snapshot.borrow().phase.key().map(str::to_string);
        if let Some(key) = key {
            self.record_failure(&key, format!("{op} aborted: {cause}"));
        }
        let slot = self.slot.clone().lock_owned().await;
        self.settle(&slot);
    }

    async fn load_locked(&self, slot: &mut ResidencySlot, descriptor: Arc<ModelDescriptor>) -> Result<bool> {
        if let Some(current) = slot.current_key() {
            if current == descriptor.key {
                debug!(key = %descriptor.key, "already resident");
                return Ok(true);
            }
            return Err(ResidencyError::InvalidState(format!(
                "{current} is resident; use switch to replace it with {}",
                descriptor.key
            )));
        }

        let started = Instant::now();
        let outcome = self.instantiate(&descriptor).await;
        let result = match outcome {
            Ok(model) => {
                info!(
                    key = %model.key,
                    backend = %model.backend_used,
                    memory_mb = model.actual_memory_mb,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "model resident"
                );
                match slot.fill(model) {
                    Ok(()) => Ok(true),
                    Err(model) => {
                        if let Err(e) = model.handle.release().await {
                            error!(key = %model.key, error = %e, "release fault after lost slot race");
                        }
                        self.device.release(model.actual_memory_mb);
                        Err(ResidencyError::InvalidState("slot became occupied during load".into()))
                    }
                }
            }
            Err(e) => {
                warn!(key = %descriptor.key, error = %e, "load failed; slot left empty");
                self.record_failure(&descriptor.key, e.to_string());
                Ok(false)
            }
        };
        self.settle(slot);
        result
    }

    async fn instantiate(&self, d: &ModelDescriptor) -> std::result::Result<LoadedModel, LoadError> {
        if !self.downloads.is_downloaded(&d.key) {
            self.set_phase(ResidencyPhase::Downloading { key: d.key.clone() });
        }
        self.downloads.download(d).await?;
        if let Err(problems) = verify_local(d).await {
            warn!(key = %d.key, problems = %problems, "cached artifacts damaged; re-fetching");
            self.downloads.invalidate(&d.key);
            self.downloads.download(d).await?;
            verify_local(d).await.map_err(LoadError::MissingArtifacts)?;
        }

        if !self.device.fits(d.estimated_memory_mb) {
            return Err(LoadError::OutOfMemory(format!(
                "needs ~{} MB, {} MB free",
                d.estimated_memory_mb,
                self.device.free_mb().unwrap_or(0)
            )));
        }

        let runtime = self.runtimes.for_family(d.family);
        let mut incompatible = Vec::new();

        for &backend in &d.backend_hints {
            self.set_phase(ResidencyPhase::Loading { key: d.key.clone(), backend: Some(backend) });
            info!(key = %d.key, family = %d.family, backend = %backend, "instantiating model");

            match runtime.load(d, backend).await {
                LoadOutcome::Loaded(handle) => {
                    let actual_memory_mb = handle.memory_mb();
                    self.device.reserve(actual_memory_mb);
                    return Ok(LoadedModel {
                        key: d.key.clone(),
                        family: d.family,
                        companion: handle.companion(),
                        handle,
                        backend_used: backend,
                        actual_memory_mb,
                        loaded_at: Utc::now(),
                    });
                }
                LoadOutcome::Incompatible(reason) => {
                    warn!(key = %d.key, backend = %backend, reason = %reason, "backend incompatible; trying next hint");
                    incompatible.push(format!("{backend}: {reason}"));
                }
                LoadOutcome::OutOfMemory(reason) => return Err(LoadError::OutOfMemory(reason)),
                LoadOutcome::Failed(reason) => {
                    return Err(LoadError::Runtime(format!("{backend}: {reason}")));
                }
            }
        }

        match incompatible.len() {
            1 => Err(LoadError::UnsupportedBackend {
                backend: d.backend_hints[0].to_string(),
                reason: incompatible.remove(0),
            }),
            _ => Err(LoadError::NoCompatibleBackend(incompatible.join("; "))),
        }
    }

    async fn unload_locked(&self, slot: &mut ResidencySlot) -> bool {
        let Some(model) = slot.take() else {
            return true;
        };
        let key = model.key.clone();
        let memory_mb = model.actual_memory_mb;
        self.set_phase(ResidencyPhase::Unloading { key: key.clone() });
        info!(key = %key, "unloading model");

        if let Err(e) = model.handle.release().await {
            // a half-released handle is never served again
            error!(key = %key, error = %e, "release fault; slot cleared anyway");
            self.record_failure(&key, e.to_string());
        }
        self.device.release(memory_mb);
        self.settle(slot);
        true
    }

    async fn generate_locked(&self, slot: &mut ResidencySlot, request: GenerationRequest) -> Result<GenerationResult> {
        let Some(model) = slot.model_mut() else {
            return Err(ResidencyError::InvalidState("no model is resident".into()));
        };
        if !request.attachments.is_empty() && model.family != ModelFamily::Multimodal {
            return Err(ResidencyError::InvalidRequest(format!(
                "{} ({}) does not accept attachments",
                model.key, model.family
            )));
        }

        let started = Instant::now();
        let key = model.key.clone();
        let backend = model.backend_used;
        let outcome = model.handle.generate(&request).await;
        match outcome {
            Ok(text) => {
                let latency_ms = started.elapsed().as_millis() as u64;
                debug!(key = %key, latency_ms, chars = text.len(), "generation complete");
                Ok(GenerationResult {
                    text,
                    latency_ms,
                    model_key: key,
                    backend,
                    request_id: uuid::Uuid::new_v4(),
                })
            }
            Err(e) if e.is_device_fault() => {
                error!(key = %key, error = %e, "device fault during generation; unloading");
                self.record_failure(&key, e.to_string());
                self.unload_locked(slot).await;
                Err(e.into())
            }
            Err(e) => {
                warn!(key = %key, error = %e, "generation failed");
                Err(e.into())
            }
        }
    }
}

async fn verify_local(d: &ModelDescriptor) -> std::result::Result<(), String> {
    let dir = d.local_path.clone();
    let specs = d.artifacts.clone();
    match tokio::task::spawn_blocking(move || verify_artifacts(&dir, &specs)).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(problems)) => Err(problems.join("; ")),
        Err(e) => Err(format!("verify task failed: {e}")),
    }
}
