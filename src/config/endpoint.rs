//! Per-endpoint options and their resolution against process defaults.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::StreamListenerConfig;
use crate::core::{CronSchedule, EndpointSettings, IdlePolicy, ListenerError};

/// Delay between polls when neither the endpoint nor the process sets one.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(250);

/// Cron used in timer mode when nothing else is configured: every minute.
pub const DEFAULT_CRON: &str = "0 */1 * ? * *";

/// Cron value that turns cron off and selects the fixed-delay timer.
pub const DISABLED_CRON: &str = "-";

/// Properties the engine owns; payload entries for them are dropped.
const RESERVED_PROPERTIES: [&str; 2] = ["group.id", "client.id"];

const ID_SUFFIX_LEN: usize = 7;

/// Explicit values for one endpoint. Anything left `None` falls back to the
/// process defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointOptions {
    /// Endpoint id, used verbatim.
    pub id: Option<String>,
    /// Use the endpoint id as group id when nothing else provides one.
    pub id_is_group: Option<bool>,
    /// Consumer-group label.
    pub group_id: Option<String>,
    /// Topic to consume.
    pub topics: Option<String>,
    /// Delay between polls, in milliseconds.
    pub delay_ms: Option<u64>,
    /// Continuous mode when true.
    pub auto_startup: Option<bool>,
    /// Informational concurrency flag.
    pub concurrency: Option<bool>,
    /// Expected listener kind; checked against the handler by the builder.
    pub batch: Option<bool>,
    /// Cron expression; `-` disables cron.
    pub cron: Option<String>,
    /// Idle behaviour in continuous mode.
    pub idle_policy: Option<IdlePolicy>,
    /// Consumer properties payloads; override the process defaults.
    pub properties: Vec<String>,
}

/// Merge `options` over `defaults` for the endpoint registered as `name`.
///
/// Precedence is explicit option, then process default, then the hard-coded
/// fallback.
///
/// # Errors
///
/// - [`ListenerError::Misconfiguration`] when no topic is configured, a
///   properties payload is ambiguous, or a polling endpoint has no delay
/// - [`ListenerError::InvalidCron`] when the cron expression does not parse
pub fn resolve_settings(
    name: &str,
    options: &EndpointOptions,
    defaults: &StreamListenerConfig,
) -> Result<EndpointSettings, ListenerError> {
    let id = resolve_id(name, options.id.as_deref(), defaults.id.as_deref());
    let id_is_group = options.id_is_group.unwrap_or(defaults.id_is_group);
    let group_id = resolve_group_id(
        &id,
        options.group_id.as_deref(),
        defaults.group_id.as_deref(),
        hostname().as_deref(),
        id_is_group,
        defaults.application_name.as_deref(),
    );

    let topic = non_blank(options.topics.as_deref())
        .or_else(|| non_blank(defaults.topics.as_deref()))
        .ok_or_else(|| {
            ListenerError::misconfigured(format!("topic is required for endpoint [{id}]"))
        })?
        .to_string();

    let delay = options
        .delay_ms
        .or(defaults.delay_ms)
        .map_or(DEFAULT_DELAY, Duration::from_millis);
    let auto_startup = options.auto_startup.or(defaults.auto_startup).unwrap_or(false);
    let concurrency = options.concurrency.or(defaults.concurrency).unwrap_or(false);
    let idle_policy = options
        .idle_policy
        .or(defaults.idle_policy)
        .unwrap_or_default();

    let cron_expression = non_blank(options.cron.as_deref())
        .or_else(|| non_blank(defaults.cron.as_deref()))
        .unwrap_or(DEFAULT_CRON);
    let cron = if cron_expression == DISABLED_CRON {
        None
    } else {
        Some(CronSchedule::parse(cron_expression)?)
    };

    if auto_startup && idle_policy == IdlePolicy::Poll && delay.is_zero() {
        return Err(ListenerError::misconfigured(format!(
            "endpoint [{id}] polls while idle and needs a non-zero delay"
        )));
    }

    let mut properties = BTreeMap::new();
    for payload in defaults.properties.iter().chain(&options.properties) {
        properties.extend(parse_properties(payload)?);
    }

    Ok(EndpointSettings {
        id,
        group_id,
        topic,
        auto_startup,
        concurrency,
        delay,
        cron,
        idle_policy,
        properties,
    })
}

/// Parse a properties payload: one `key=value`, `key:value` or `key value`
/// entry per line, `#` and `!` comment lines and blank lines skipped.
///
/// `group.id` and `client.id` entries are dropped.
///
/// # Errors
///
/// Returns [`ListenerError::Misconfiguration`] for a line with an empty key.
pub fn parse_properties(payload: &str) -> Result<BTreeMap<String, String>, ListenerError> {
    let mut properties = BTreeMap::new();
    for (index, raw) in payload.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }

        let split = line
            .find(|c: char| c == '=' || c == ':' || c.is_whitespace())
            .unwrap_or(line.len());
        let key = line[..split].trim();
        let rest = line[split..].trim_start();
        let value = rest
            .strip_prefix(['=', ':'])
            .unwrap_or(rest)
            .trim();

        if key.is_empty() {
            return Err(ListenerError::misconfigured(format!(
                "ambiguous properties payload, line {} has no key: `{line}`",
                index + 1
            )));
        }
        if RESERVED_PROPERTIES.contains(&key) {
            continue;
        }
        properties.insert(key.to_string(), value.to_string());
    }
    Ok(properties)
}

fn resolve_id(name: &str, explicit: Option<&str>, default: Option<&str>) -> String {
    if let Some(id) = non_blank(explicit) {
        return id.to_string();
    }
    let base = non_blank(default).unwrap_or(name);
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{base}_{}", &suffix[..ID_SUFFIX_LEN])
}

fn resolve_group_id(
    id: &str,
    explicit: Option<&str>,
    default: Option<&str>,
    hostname: Option<&str>,
    id_is_group: bool,
    application_name: Option<&str>,
) -> String {
    non_blank(explicit)
        .or_else(|| non_blank(default))
        .or_else(|| non_blank(hostname))
        .or_else(|| id_is_group.then_some(id))
        .or_else(|| non_blank(application_name))
        .unwrap_or(id)
        .to_string()
}

fn hostname() -> Option<String> {
    std::env::var("HOSTNAME").ok()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
