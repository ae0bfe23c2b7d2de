//! Service configuration, read once from the environment at startup.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use agroplan_ai::{FeatureSchema, HeuristicRecommender};
use agroplan_core::IngestMode;
use agroplan_infra::{CoordinatorConfig, RefreshPolicy};

pub const ENV_BIND: &str = "AGROPLAN_BIND";
pub const ENV_MODEL_PATH: &str = "AGROPLAN_MODEL_PATH";
pub const ENV_LABELS_PATH: &str = "AGROPLAN_LABELS_PATH";
pub const ENV_FEATURE_ORDER: &str = "AGROPLAN_FEATURE_ORDER";
pub const ENV_REFRESH: &str = "AGROPLAN_REFRESH";
pub const ENV_INGEST_MODE: &str = "AGROPLAN_INGEST_MODE";
pub const ENV_FALLBACK: &str = "AGROPLAN_FALLBACK";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub model_path: PathBuf,
    pub labels_path: PathBuf,
    /// Must match the column order the deployed classifier was trained with.
    pub feature_order: FeatureSchema,
    pub refresh: RefreshPolicy,
    pub ingest_mode: IngestMode,
    pub fallback: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 10000)),
            model_path: PathBuf::from("crop_recommendation_model.json"),
            labels_path: PathBuf::from("label_encoder.json"),
            feature_order: FeatureSchema::default(),
            refresh: RefreshPolicy::default(),
            ingest_mode: IngestMode::default(),
            fallback: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup (unset or blank keys keep defaults).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(v) = get(ENV_BIND) {
            config.bind = v
                .trim()
                .parse()
                .with_context(|| format!("{ENV_BIND}: '{v}' is not a socket address"))?;
        }
        if let Some(v) = get(ENV_MODEL_PATH) {
            config.model_path = PathBuf::from(v);
        }
        if let Some(v) = get(ENV_LABELS_PATH) {
            config.labels_path = PathBuf::from(v);
        }
        if let Some(v) = get(ENV_FEATURE_ORDER) {
            config.feature_order = v.parse().context(ENV_FEATURE_ORDER)?;
        }
        if let Some(v) = get(ENV_REFRESH) {
            config.refresh = v.parse().context(ENV_REFRESH)?;
        }
        if let Some(v) = get(ENV_INGEST_MODE) {
            config.ingest_mode = v.parse().context(ENV_INGEST_MODE)?;
        }
        if let Some(v) = get(ENV_FALLBACK) {
            config.fallback = parse_flag(ENV_FALLBACK, &v)?;
        }

        Ok(config)
    }

    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            refresh: self.refresh,
            ingest_mode: self.ingest_mode,
            fallback: self.fallback.then(HeuristicRecommender::default),
        }
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("{key}: expected a boolean, got '{other}'"),
    }
}
