//! Process-wide listener configuration.

use serde::{Deserialize, Serialize};

use crate::config::endpoint::{parse_properties, DISABLED_CRON};
use crate::core::{CronSchedule, IdlePolicy};

/// Prefix of every environment variable read by [`StreamListenerConfig::from_env`].
pub const ENV_PREFIX: &str = "STREAM_LISTENER_";

/// Default size of the scheduling runtime.
pub const DEFAULT_WORKER_THREADS: usize = 10;

/// Defaults shared by every endpoint of the process.
///
/// Every endpoint option left unset on an endpoint falls back to the value
/// here, and then to a hard-coded default (see
/// [`resolve_settings`](crate::config::resolve_settings)).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamListenerConfig {
    /// Master switch; when false `startup` arms nothing.
    pub enabled: bool,
    /// Default endpoint id prefix.
    pub id: Option<String>,
    /// Default consumer-group label.
    pub group_id: Option<String>,
    /// Default topic.
    pub topics: Option<String>,
    /// Default delay between polls, in milliseconds.
    pub delay_ms: Option<u64>,
    /// Default run mode; continuous when true.
    pub auto_startup: Option<bool>,
    /// Default concurrency flag.
    pub concurrency: Option<bool>,
    /// Default cron expression; `-` disables cron.
    pub cron: Option<String>,
    /// Default idle policy for continuous endpoints.
    pub idle_policy: Option<IdlePolicy>,
    /// Use the endpoint id as group id when nothing else provides one.
    pub id_is_group: bool,
    /// Worker threads of the scheduling runtime.
    pub worker_threads: usize,
    /// Default consumer properties payloads.
    pub properties: Vec<String>,
    /// Application name, last-resort group id.
    pub application_name: Option<String>,
}

impl Default for StreamListenerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            id: None,
            group_id: None,
            topics: None,
            delay_ms: None,
            auto_startup: None,
            concurrency: None,
            cron: None,
            idle_policy: None,
            id_is_group: true,
            worker_threads: DEFAULT_WORKER_THREADS,
            properties: Vec::new(),
            application_name: None,
        }
    }
}

impl StreamListenerConfig {
    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.worker_threads == 0 {
            return Err("worker_threads must be greater than 0".into());
        }
        if let Some(cron) = self.cron.as_deref() {
            if cron.trim() != DISABLED_CRON {
                CronSchedule::parse(cron).map_err(|e| e.to_string())?;
            }
        }
        if self.topics.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err("topics must not be blank".into());
        }
        for payload in &self.properties {
            parse_properties(payload).map_err(|e| e.to_string())?;
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a description of the parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from `STREAM_LISTENER_*` environment variables,
    /// reading a `.env` file first when one is present.
    ///
    /// # Errors
    ///
    /// Returns a description of the first unparsable or invalid value.
    pub fn from_env() -> Result<Self, String> {
        // A missing .env file is the normal case.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// Keys are the upper-case field names with the [`ENV_PREFIX`], e.g.
    /// `STREAM_LISTENER_DELAY_MS`. `STREAM_LISTENER_PROPERTIES` holds a single
    /// properties payload.
    ///
    /// # Errors
    ///
    /// Returns a description of the first unparsable or invalid value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(&format!("{ENV_PREFIX}{name}"))
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut cfg = Self::default();
        if let Some(enabled) = get("ENABLED") {
            cfg.enabled = parse_value("ENABLED", &enabled)?;
        }
        cfg.id = get("ID");
        cfg.group_id = get("GROUP_ID");
        cfg.topics = get("TOPICS");
        cfg.delay_ms = get("DELAY_MS")
            .map(|v| parse_value("DELAY_MS", &v))
            .transpose()?;
        cfg.auto_startup = get("AUTO_STARTUP")
            .map(|v| parse_value("AUTO_STARTUP", &v))
            .transpose()?;
        cfg.concurrency = get("CONCURRENCY")
            .map(|v| parse_value("CONCURRENCY", &v))
            .transpose()?;
        cfg.cron = get("CRON");
        cfg.idle_policy = get("IDLE_POLICY")
            .map(|v| parse_idle_policy(&v))
            .transpose()?;
        if let Some(id_is_group) = get("ID_IS_GROUP") {
            cfg.id_is_group = parse_value("ID_IS_GROUP", &id_is_group)?;
        }
        if let Some(threads) = get("WORKER_THREADS") {
            cfg.worker_threads = parse_value("WORKER_THREADS", &threads)?;
        }
        cfg.properties = get("PROPERTIES").into_iter().collect();
        cfg.application_name = get("APPLICATION_NAME");

        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_value<V>(name: &str, raw: &str) -> Result<V, String>
where
    V: std::str::FromStr,
    V::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e| format!("{ENV_PREFIX}{name}=`{raw}`: {e}"))
}

fn parse_idle_policy(raw: &str) -> Result<IdlePolicy, String> {
    match raw.to_ascii_lowercase().as_str() {
        "drain" => Ok(IdlePolicy::Drain),
        "poll" => Ok(IdlePolicy::Poll),
        other => Err(format!(
            "{ENV_PREFIX}IDLE_POLICY=`{other}`: expected `drain` or `poll`"
        )),
    }
}
