//! Read/update access to the externally owned pipeline records
//! (`config/pipeline.json`, keyed by pipeline name).
//!
//! Only the fields the executor consumes are typed; everything else is
//! carried through `extra` untouched. Updates lock the file, re-read it,
//! and change a single record, so concurrent writers touching different
//! pipelines do not lose each other's changes. Records are decoded one at
//! a time: a malformed record is skipped on read and left byte-for-byte
//! alone when a sibling is updated.

use crate::error::{OpsgateError, Result};
use crate::io::{self, LockFile};
use crate::paths;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy_path: Option<String>,
    /// Working copy managed by the deploy tooling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker_compose_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker_compose_dir: Option<String>,
    /// Compose service name when it differs from the pipeline name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker_service: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired_replicas: Option<u64>,
    #[serde(
        default,
        deserialize_with = "deserialize_timestamp_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub desired_replicas_updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired_replicas_region: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_timestamp_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub paused_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused_reason: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_enabled() -> bool {
    true
}

/// Other writers of this file emit naive ISO timestamps in local time
/// alongside RFC 3339 ones; accept both.
fn deserialize_timestamp_opt<'de, D>(d: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(d)?;
    opt.map(|raw| parse_timestamp(&raw).map_err(<D::Error as serde::de::Error>::custom))
        .transpose()
}

fn parse_timestamp(raw: &str) -> std::result::Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .map_err(|_| format!("unrecognised timestamp: {raw}"))?;
    Ok(match Local.from_local_datetime(&naive).earliest() {
        Some(local) => local.with_timezone(&Utc),
        // Skipped by a DST jump; no local reading exists.
        None => naive.and_utc(),
    })
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            branch: None,
            deploy_path: None,
            deployment_dir: None,
            docker_compose_file: None,
            docker_compose_dir: None,
            docker_service: None,
            enabled: default_enabled(),
            desired_replicas: None,
            desired_replicas_updated_at: None,
            desired_replicas_region: None,
            paused_at: None,
            paused_reason: None,
            extra: Map::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PipelineStore {
    path: PathBuf,
}

impl PipelineStore {
    pub fn open(home: &Path) -> Self {
        Self {
            path: paths::pipelines_path(home),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        let mut p = self.path.clone().into_os_string();
        p.push(".lock");
        PathBuf::from(p)
    }

    /// Raw records by name. A missing or empty file is an empty set.
    fn load_raw(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    /// All decodable pipelines by name. Records that fail to decode are
    /// logged and left out.
    pub fn load_all(&self) -> Result<BTreeMap<String, Pipeline>> {
        let mut all = BTreeMap::new();
        for (name, raw) in self.load_raw()? {
            match decode(&name, raw) {
                Ok(pipeline) => {
                    all.insert(name, pipeline);
                }
                Err(e) => tracing::warn!(pipeline = %name, error = %e, "skipping unreadable pipeline record"),
            }
        }
        Ok(all)
    }

    /// Every record name, decodable or not.
    pub fn names(&self) -> Result<Vec<String>> {
        Ok(self.load_raw()?.into_iter().map(|(name, _)| name).collect())
    }

    pub fn get(&self, name: &str) -> Result<Pipeline> {
        let raw = self
            .load_raw()?
            .remove(name)
            .ok_or_else(|| OpsgateError::PipelineNotFound(name.to_string()))?;
        decode(name, raw)
    }

    /// Apply `change` to one pipeline under the store lock and persist it.
    /// Other records are written back exactly as read.
    pub fn update<F>(&self, name: &str, change: F) -> Result<Pipeline>
    where
        F: FnOnce(&mut Pipeline),
    {
        let _lock = LockFile::acquire(&self.lock_path())?;
        let mut all = self.load_raw()?;
        let raw = all
            .remove(name)
            .ok_or_else(|| OpsgateError::PipelineNotFound(name.to_string()))?;
        let mut pipeline = decode(name, raw)?;
        change(&mut pipeline);
        all.insert(name.to_string(), serde_json::to_value(&pipeline)?);

        let data = serde_json::to_string_pretty(&all)?;
        io::atomic_write(&self.path, data.as_bytes())?;
        tracing::debug!(pipeline = name, "pipeline record updated");
        Ok(pipeline)
    }
}

fn decode(name: &str, raw: Value) -> Result<Pipeline> {
    serde_json::from_value(raw).map_err(|e| OpsgateError::InvalidPipeline {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
