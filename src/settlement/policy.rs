use anyhow::{Context, Result};
use async_trait::async_trait;
use std::{io::ErrorKind, path::PathBuf};
use tracing::{debug, warn};

use crate::domain::PolicyTariffs;

/// Where the policy tariffs for the next cycle come from.
#[async_trait]
pub trait PolicySource: Send + Sync {
    /// Never fails; falls back to `default` when nothing better is available.
    async fn current(&self, default: &PolicyTariffs) -> PolicyTariffs;
}

/// Always the configured policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticPolicySource;

#[async_trait]
impl PolicySource for StaticPolicySource {
    async fn current(&self, default: &PolicyTariffs) -> PolicyTariffs {
        *default
    }
}

/// Tariff override file, edited by operators and re-read every cycle.
#[derive(Debug, Clone)]
pub struct FilePolicySource {
    path: PathBuf,
}

impl FilePolicySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read(&self) -> Result<Option<PolicyTariffs>> {
        let body = match tokio::fs::read(&self.path).await {
            Ok(body) => body,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", self.path.display()))
            }
        };
        let policy: PolicyTariffs = serde_json::from_slice(&body)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        Ok(Some(policy))
    }
}

#[async_trait]
impl PolicySource for FilePolicySource {
    async fn current(&self, default: &PolicyTariffs) -> PolicyTariffs {
        match self.read().await {
            Ok(Some(policy)) => policy,
            Ok(None) => {
                debug!(path = %self.path.display(), "no tariff override file, using defaults");
                *default
            }
            Err(e) => {
                warn!(error = %format!("{e:#}"), "tariff override unusable, using defaults");
                *default
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn defaults() -> PolicyTariffs {
        PolicyTariffs {
            pv_payout_rate: 20.0,
            grid_import_rate: 30.0,
            grid_export_rate: 6.0,
        }
    }

    #[tokio::test]
    async fn test_missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let src = FilePolicySource::new(dir.path().join("tariffs.json"));
        assert_eq!(src.current(&defaults()).await, defaults());
    }

    #[tokio::test]
    async fn test_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"p_pv": 28.0, "p_grid_con": 31.0, "p_grid_del": 5.5}}"#).unwrap();
        let src = FilePolicySource::new(file.path());
        let p = src.current(&defaults()).await;
        assert_eq!(p.pv_payout_rate, 28.0);
        assert_eq!(p.grid_import_rate, 31.0);
        assert_eq!(p.grid_export_rate, 5.5);
    }

    #[tokio::test]
    async fn test_file_is_reread_each_call() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tariffs.json");
        let src = FilePolicySource::new(&path);

        std::fs::write(&path, r#"{"p_pv": 21, "p_grid_con": 30, "p_grid_del": 6}"#).unwrap();
        assert_eq!(src.current(&defaults()).await.pv_payout_rate, 21.0);

        std::fs::write(&path, r#"{"p_pv": 25, "p_grid_con": 30, "p_grid_del": 6}"#).unwrap();
        assert_eq!(src.current(&defaults()).await.pv_payout_rate, 25.0);
    }

    #[tokio::test]
    async fn test_invalid_file_falls_back() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"p_pv": 28.0"#).unwrap();
        let src = FilePolicySource::new(file.path());
        assert_eq!(src.current(&defaults()).await, defaults());
    }

    #[tokio::test]
    async fn test_out_of_range_tariff_falls_back() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"p_pv": 1e999, "p_grid_con": 30, "p_grid_del": 6}}"#).unwrap();
        let src = FilePolicySource::new(file.path());
        assert!(src.read().await.is_err());
        assert_eq!(src.current(&defaults()).await, defaults());
    }

    #[tokio::test]
    async fn test_static_source() {
        assert_eq!(StaticPolicySource.current(&defaults()).await, defaults());
    }
}
