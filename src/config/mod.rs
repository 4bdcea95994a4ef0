//! Configuration models for the listener process and its endpoints.

pub mod endpoint;
pub mod listener;

pub use endpoint::{
    parse_properties, resolve_settings, EndpointOptions, DEFAULT_CRON, DEFAULT_DELAY,
    DISABLED_CRON,
};
pub use listener::{StreamListenerConfig, DEFAULT_WORKER_THREADS, ENV_PREFIX};
