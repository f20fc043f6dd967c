//! Worker-process runtimes for the three model families.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::worker::{WorkerCommand, WorkerErrorKind, WorkerEvent, WorkerProcess, WorkerRequest};
use super::{Companion, FamilyRuntime, GenerationRequest, LoadOutcome, ModelHandle};
use crate::error::{looks_like_device_fault, GenerationError, ReleaseError};
use crate::{ExecutionBackend, ModelDescriptor, ModelFamily};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Messages from runtimes that reject an attention implementation without
/// tagging the error kind.
/// Device faults never count, even when they name an attention kernel.
const UNSUPPORTED_MARKERS: &[&str] = &["flash_attn", "flash attention", "flashattention", "attn_implementation"];

fn looks_unsupported(message: &str) -> bool {
    if looks_like_device_fault(message) {
        return false;
    }
    let lower = message.to_ascii_lowercase();
    UNSUPPORTED_MARKERS.iter().any(|m| lower.contains(m))
}

/// Runs causal-LM and multimodal models in a Python worker that speaks
/// NDJSON on stdio.
pub struct PythonWorkerRuntime {
    python: String,
    script: PathBuf,
    family: ModelFamily,
}

impl PythonWorkerRuntime {
    pub fn causal_lm(python: impl Into<String>, script: impl Into<PathBuf>) -> Self {
        Self { python: python.into(), script: script.into(), family: ModelFamily::CausalLm }
    }

    pub fn multimodal(python: impl Into<String>, script: impl Into<PathBuf>) -> Self {
        Self { python: python.into(), script: script.into(), family: ModelFamily::Multimodal }
    }

    fn command(&self, d: &ModelDescriptor, backend: ExecutionBackend) -> WorkerCommand {
        let task = match self.family {
            ModelFamily::Multimodal => "multimodal",
            _ => "causal-lm",
        };
        let mut cmd = WorkerCommand::new(&self.python)
            .arg(self.script.to_string_lossy())
            .arg("--task")
            .arg(task)
            .arg("--model-path")
            .arg(d.local_path.to_string_lossy())
            .arg("--attn-implementation")
            .arg(backend.as_str());
        if let Some(q) = d.quantization {
            cmd = cmd.arg("--quantization").arg(q.as_str());
        }
        cmd
    }
}

#[async_trait]
impl FamilyRuntime for PythonWorkerRuntime {
    async fn load(&self, descriptor: &ModelDescriptor, backend: ExecutionBackend) -> LoadOutcome {
        let cmd = self.command(descriptor, backend);
        load_worker(cmd, descriptor, self.family, backend).await
    }
}

/// Runs edge-packaged models through an interpreter binary.
pub struct EdgeRuntime {
    interpreter: String,
}

impl EdgeRuntime {
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self { interpreter: interpreter.into() }
    }

    fn model_file(d: &ModelDescriptor) -> PathBuf {
        d.artifacts
            .iter()
            .find(|a| a.rel_path.ends_with(".litertlm"))
            .or_else(|| d.artifacts.first())
            .map(|a| d.local_path.join(&a.rel_path))
            .unwrap_or_else(|| d.local_path.clone())
    }
}

#[async_trait]
impl FamilyRuntime for EdgeRuntime {
    async fn load(&self, descriptor: &ModelDescriptor, backend: ExecutionBackend) -> LoadOutcome {
        if !matches!(backend, ExecutionBackend::Gpu | ExecutionBackend::Cpu) {
            return LoadOutcome::Incompatible(format!("edge runtime has no {backend} backend"));
        }
        let cmd = WorkerCommand::new(&self.interpreter)
            .arg("--model")
            .arg(Self::model_file(descriptor).to_string_lossy())
            .arg("--backend")
            .arg(backend.as_str())
            .arg("--serve-ndjson");
        load_worker(cmd, descriptor, ModelFamily::EdgeRuntime, backend).await
    }
}

async fn load_worker(
    cmd: WorkerCommand,
    descriptor: &ModelDescriptor,
    family: ModelFamily,
    backend: ExecutionBackend,
) -> LoadOutcome {
    let label = format!("{}@{}", descriptor.key, backend);
    let mut worker = match WorkerProcess::spawn(&cmd, &label) {
        Ok(w) => w,
        Err(e) => return LoadOutcome::Failed(format!("spawn {}: {e}", cmd.program)),
    };
    debug!(worker = %label, program = %cmd.program, "worker spawned");

    let event = match worker.next_event().await {
        Ok(ev) => ev,
        Err(e) => {
            worker.kill().await;
            return LoadOutcome::Failed(format!("reading worker output: {e}"));
        }
    };

    match event {
        Some(WorkerEvent::Ready { backend: reported, memory_mb, companion }) => {
            info!(worker = %label, backend = %reported, memory_mb, "worker ready");
            let memory_mb = if memory_mb == 0 { descriptor.estimated_memory_mb } else { memory_mb };
            LoadOutcome::Loaded(Box::new(WorkerHandle {
                worker: Some(worker),
                label,
                family,
                memory_mb,
                companion: parse_companion(companion.as_deref(), family),
            }))
        }
        Some(WorkerEvent::Error { kind, message }) => {
            worker.kill().await;
            match kind {
                WorkerErrorKind::IncompatibleBackend => LoadOutcome::Incompatible(message),
                WorkerErrorKind::OutOfMemory => LoadOutcome::OutOfMemory(message),
                WorkerErrorKind::Other if looks_unsupported(&message) => LoadOutcome::Incompatible(message),
                _ => LoadOutcome::Failed(message),
            }
        }
        Some(other) => {
            worker.kill().await;
            LoadOutcome::Failed(format!("unexpected worker event before ready: {other:?}"))
        }
        None => {
            let status = worker.exit_status().await;
            worker.kill().await;
            LoadOutcome::Failed(format!("worker exited before ready ({status})"))
        }
    }
}

fn parse_companion(reported: Option<&str>, family: ModelFamily) -> Option<Companion> {
    match reported {
        Some("processor") => Some(Companion::Processor),
        Some("tokenizer") => Some(Companion::Tokenizer),
        Some(_) => None,
        None => match family {
            ModelFamily::CausalLm => Some(Companion::Tokenizer),
            ModelFamily::Multimodal => Some(Companion::Processor),
            ModelFamily::EdgeRuntime => None,
        },
    }
}

struct WorkerHandle {
    // taken on release
    worker: Option<WorkerProcess>,
    label: String,
    family: ModelFamily,
    memory_mb: u64,
    companion: Option<Companion>,
}

impl WorkerHandle {
    fn check_attachments(&self, request: &GenerationRequest) -> Result<(), GenerationError> {
        if request.attachments.is_empty() {
            return Ok(());
        }
        if self.family != ModelFamily::Multimodal {
            return Err(GenerationError::rejected(format!(
                "{} models do not accept attachments",
                self.family
            )));
        }
        for a in &request.attachments {
            if !Path::new(&a.path).is_file() {
                return Err(GenerationError::rejected(format!(
                    "attachment not found: {}",
                    a.path.display()
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ModelHandle for WorkerHandle {
    fn memory_mb(&self) -> u64 {
        self.memory_mb
    }

    fn companion(&self) -> Option<Companion> {
        self.companion
    }

    async fn generate(&mut self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.check_attachments(request)?;
        let family = self.family;
        let worker = self
            .worker
            .as_mut()
            .ok_or_else(|| GenerationError::device_fault("worker already released"))?;

        let req = match family {
            ModelFamily::EdgeRuntime => WorkerRequest::Run {
                input: &request.prompt,
                max_tokens: request.max_length,
                temperature: request.temperature,
            },
            _ => WorkerRequest::Generate {
                prompt: &request.prompt,
                max_new_tokens: request.max_length,
                temperature: request.temperature,
                attachments: &request.attachments,
            },
        };
        worker
            .send(&req)
            .await
            .map_err(|e| GenerationError::device_fault(format!("worker stdin closed: {e}")))?;

        match worker.next_event().await {
            Ok(Some(WorkerEvent::Result { text })) => Ok(text),
            Ok(Some(WorkerEvent::Error { kind, message })) => {
                if kind == WorkerErrorKind::DeviceFault || looks_like_device_fault(&message) {
                    Err(GenerationError::device_fault(message))
                } else {
                    Err(GenerationError::runtime(message))
                }
            }
            Ok(Some(other)) => Err(GenerationError::runtime(format!("unexpected worker event: {other:?}"))),
            Ok(None) => {
                let status = worker.exit_status().await;
                warn!(worker = %self.label, %status, "worker died mid-generation");
                Err(GenerationError::device_fault(format!("worker exited mid-generation ({status})")))
            }
            Err(e) => Err(GenerationError::device_fault(format!("worker stdout: {e}"))),
        }
    }

    async fn release(mut self: Box<Self>) -> Result<(), ReleaseError> {
        match self.worker.take() {
            Some(w) => w.shutdown(SHUTDOWN_GRACE).await,
            None => Ok(()),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::ArtifactSpec;

    fn descriptor(dir: &Path, family: ModelFamily) -> ModelDescriptor {
        ModelDescriptor {
            key: "fake".into(),
            family,
            remote_id: "org/fake".into(),
            revision: "main".into(),
            local_path: dir.to_path_buf(),
            estimated_memory_mb: 100,
            backend_hints: vec![ExecutionBackend::FlashAttention2, ExecutionBackend::Eager],
            quantization: None,
            artifacts: vec![ArtifactSpec::new("model.safetensors")],
        }
    }

    /// A shell worker that rejects flash attention and echoes prompts.
    fn write_script(dir: &Path) -> PathBuf {
        let script = dir.join("worker.sh");
        std::fs::write(
            &script,
            r#"
case "$*" in
  *flash_attention_2*)
    echo '{"type":"error","kind":"other","message":"FlashAttention2 has been toggled on, but flash_attn is not installed"}'
    exit 1 ;;
  *sdpa*)
    echo '{"type":"error","kind":"other","message":"RuntimeError: CUDA error: operation not supported when launching kernel"}'
    exit 1 ;;
esac
echo '{"type":"ready","backend":"eager","memory_mb":0}'
while read line; do
  case "$line" in
    *shutdown*) exit 0 ;;
    *crash*) exit 139 ;;
    *) echo '{"type":"result","text":"ok"}' ;;
  esac
done
"#,
        )
        .unwrap();
        script
    }

    #[tokio::test]
    async fn untagged_flash_attention_error_is_incompatible() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path());
        let rt = PythonWorkerRuntime::causal_lm("sh", &script);
        let d = descriptor(dir.path(), ModelFamily::CausalLm);

        let outcome = rt.load(&d, ExecutionBackend::FlashAttention2).await;
        assert!(matches!(outcome, LoadOutcome::Incompatible(_)), "{outcome:?}");
    }

    #[tokio::test]
    async fn cuda_not_supported_error_is_a_failure_not_a_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path());
        let rt = PythonWorkerRuntime::causal_lm("sh", &script);
        let d = descriptor(dir.path(), ModelFamily::CausalLm);

        let outcome = rt.load(&d, ExecutionBackend::Sdpa).await;
        assert!(matches!(outcome, LoadOutcome::Failed(_)), "{outcome:?}");
    }

    #[test]
    fn generic_unsupported_wording_is_not_incompatible() {
        assert!(looks_unsupported("flash_attn is not installed"));
        assert!(looks_unsupported("attn_implementation=sdpa is not available for this model"));
        assert!(!looks_unsupported("cudaErrorNotSupported: operation not supported"));
        assert!(!looks_unsupported("this tokenizer does not support chat templates"));
    }

    #[tokio::test]
    async fn generate_and_release() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path());
        let rt = PythonWorkerRuntime::causal_lm("sh", &script);
        let d = descriptor(dir.path(), ModelFamily::CausalLm);

        let LoadOutcome::Loaded(mut handle) = rt.load(&d, ExecutionBackend::Eager).await else {
            panic!("expected eager load to succeed");
        };
        assert_eq!(handle.memory_mb(), 100);
        assert_eq!(handle.companion(), Some(Companion::Tokenizer));
        assert_eq!(handle.generate(&GenerationRequest::new("hello", 8)).await.unwrap(), "ok");
        handle.release().await.unwrap();
    }

    #[tokio::test]
    async fn worker_exit_mid_generation_is_a_device_fault() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path());
        let rt = PythonWorkerRuntime::causal_lm("sh", &script);
        let d = descriptor(dir.path(), ModelFamily::CausalLm);

        let LoadOutcome::Loaded(mut handle) = rt.load(&d, ExecutionBackend::Eager).await else {
            panic!("expected eager load to succeed");
        };
        let err = handle.generate(&GenerationRequest::new("crash", 8)).await.unwrap_err();
        assert!(err.is_device_fault());
    }

    #[tokio::test]
    async fn causal_models_reject_attachments() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path());
        let rt = PythonWorkerRuntime::causal_lm("sh", &script);
        let d = descriptor(dir.path(), ModelFamily::CausalLm);

        let LoadOutcome::Loaded(mut handle) = rt.load(&d, ExecutionBackend::Eager).await else {
            panic!("expected eager load to succeed");
        };
        let req = GenerationRequest::new("describe", 8).with_attachment(super::super::Modality::Audio, "/tmp/a.wav");
        let err = handle.generate(&req).await.unwrap_err();
        assert_eq!(err.fault, crate::error::GenerationFault::Rejected);
        handle.release().await.unwrap();
    }

    #[tokio::test]
    async fn edge_runtime_refuses_attention_backends() {
        let dir = tempfile::tempdir().unwrap();
        let rt = EdgeRuntime::new("/nonexistent/interpreter");
        let d = descriptor(dir.path(), ModelFamily::EdgeRuntime);
        assert!(matches!(rt.load(&d, ExecutionBackend::Sdpa).await, LoadOutcome::Incompatible(_)));
        assert!(matches!(rt.load(&d, ExecutionBackend::Cpu).await, LoadOutcome::Failed(_)));
    }
}
