use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: String,

    pub models_root: PathBuf,
    pub catalog_path: Option<PathBuf>,
    pub hf_endpoint: String,
    pub hf_token: Option<String>,
    pub download_max_retries: u32,

    pub worker_python: String,
    pub worker_script: PathBuf,
    pub edge_interpreter: String,

    pub device_memory_mb: Option<u64>,
    pub device_baseline_mb: u64,

    pub default_model: Option<String>,
    pub generate_timeout: Duration,
    pub load_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let opt = |k: &str| var(k).filter(|v| !v.trim().is_empty());
        let or = |k: &str, d: &str| opt(k).unwrap_or_else(|| d.to_string());

        let hf_endpoint = or("HF_ENDPOINT", "https://huggingface.co");
        let generate_timeout_secs: u64 = parse(&opt, "GENERATE_TIMEOUT_SECS")?.unwrap_or(300);
        let load_timeout_secs: u64 = parse(&opt, "LOAD_TIMEOUT_SECS")?.unwrap_or(900);

        // Tiny sanity checks (fail fast, fail loud)
        if !hf_endpoint.starts_with("http://") && !hf_endpoint.starts_with("https://") {
            bail!("HF_ENDPOINT must start with http:// or https://");
        }
        if generate_timeout_secs == 0 || load_timeout_secs == 0 {
            bail!("GENERATE_TIMEOUT_SECS and LOAD_TIMEOUT_SECS must be positive");
        }

        Ok(Self {
            bind_addr: or("ANALYZER_BIND_ADDR", "0.0.0.0:8080"),
            models_root: PathBuf::from(or("MODELS_ROOT", "./models")),
            catalog_path: opt("MODEL_CATALOG_PATH").map(PathBuf::from),
            hf_endpoint,
            hf_token: opt("HF_TOKEN"),
            download_max_retries: parse(&opt, "DOWNLOAD_MAX_RETRIES")?.unwrap_or(4),
            worker_python: or("WORKER_PYTHON", "python3"),
            worker_script: PathBuf::from(or("WORKER_SCRIPT", "workers/model_worker.py")),
            edge_interpreter: or("EDGE_INTERPRETER", "litert_lm_main"),
            device_memory_mb: parse(&opt, "DEVICE_MEMORY_MB")?,
            device_baseline_mb: parse(&opt, "DEVICE_BASELINE_MB")?.unwrap_or(0),
            default_model: opt("DEFAULT_MODEL"),
            generate_timeout: Duration::from_secs(generate_timeout_secs),
            load_timeout: Duration::from_secs(load_timeout_secs),
        })
    }
}

fn parse<T>(opt: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    opt(key)
        .map(|v| v.trim().parse::<T>().with_context(|| format!("Invalid value for {key}: {v}")))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn cfg(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let c = cfg(&[]).unwrap();
        assert_eq!(c.bind_addr, "0.0.0.0:8080");
        assert_eq!(c.models_root, PathBuf::from("./models"));
        assert_eq!(c.hf_endpoint, "https://huggingface.co");
        assert_eq!(c.download_max_retries, 4);
        assert_eq!(c.generate_timeout, Duration::from_secs(300));
        assert!(c.device_memory_mb.is_none());
        assert!(c.default_model.is_none());
    }

    #[test]
    fn overrides_and_blank_values() {
        let c = cfg(&[
            ("DEVICE_MEMORY_MB", "81920"),
            ("DEFAULT_MODEL", "gemma-3-12b"),
            ("HF_TOKEN", "  "),
            ("DOWNLOAD_MAX_RETRIES", "0"),
        ])
        .unwrap();
        assert_eq!(c.device_memory_mb, Some(81_920));
        assert_eq!(c.default_model.as_deref(), Some("gemma-3-12b"));
        assert!(c.hf_token.is_none());
        assert_eq!(c.download_max_retries, 0);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(cfg(&[("HF_ENDPOINT", "huggingface.co")]).is_err());
        assert!(cfg(&[("DEVICE_MEMORY_MB", "lots")]).is_err());
        assert!(cfg(&[("GENERATE_TIMEOUT_SECS", "0")]).is_err());
    }
}
